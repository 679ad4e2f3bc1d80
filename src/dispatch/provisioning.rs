use super::error::DispatchError;
use super::strategy::{Dispatch, DispatchRequest, DispatchStatus, DispatchStrategy, Pending};
use crate::shared::logging::RunLog;
use crate::workspace::{create_next_slot, WorkerSlot, WorkspaceError};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

// With `claim` set, the returned slot is already locked for the caller.
pub trait SlotProvisioner: Send + Sync {
    fn provision(&self, claim: Option<&str>) -> Result<WorkerSlot, WorkspaceError>;
}

#[derive(Debug, Clone)]
pub struct WorkspaceProvisioner {
    root: PathBuf,
    template: Option<PathBuf>,
}

impl WorkspaceProvisioner {
    pub fn new(root: &Path, template: Option<&Path>) -> Self {
        Self {
            root: root.to_path_buf(),
            template: template.map(Path::to_path_buf),
        }
    }
}

impl SlotProvisioner for WorkspaceProvisioner {
    fn provision(&self, claim: Option<&str>) -> Result<WorkerSlot, WorkspaceError> {
        create_next_slot(&self.root, self.template.as_deref(), claim)
    }
}

pub struct ProvisioningManager {
    provisioner: Arc<dyn SlotProvisioner>,
    guard: Mutex<()>,
    log: RunLog,
}

impl std::fmt::Debug for ProvisioningManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisioningManager")
            .field("log", &self.log)
            .finish_non_exhaustive()
    }
}

impl ProvisioningManager {
    pub fn new(provisioner: Arc<dyn SlotProvisioner>, log: RunLog) -> Self {
        Self {
            provisioner,
            guard: Mutex::new(()),
            log,
        }
    }

    pub fn dispatch(
        &self,
        strategy: &DispatchStrategy,
        request: &DispatchRequest,
    ) -> (Dispatch, Result<Pending, DispatchError>) {
        let mut dispatch = Dispatch::new(request.query.id.clone(), strategy.kind());
        dispatch.status = DispatchStatus::Running;
        self.log.info(
            "dispatch.started",
            &format!("{} strategy={}", request.dispatch_id(), dispatch.strategy),
        );

        let outcome = match strategy.dispatch(request, None) {
            Err(err) if err.is_exhaustion() => {
                self.log
                    .warn("dispatch.exhausted", &format!("{}: {err}", request.dispatch_id()));
                dispatch.status = DispatchStatus::ExhaustedRetried;
                dispatch.retries += 1;
                self.retry_on_new_slot(strategy, request, err)
            }
            other => other,
        };

        dispatch.status = match &outcome {
            Ok(Pending::Completed(_)) => DispatchStatus::Succeeded,
            Ok(Pending::Launched(_)) => DispatchStatus::Running,
            Err(err) => {
                self.log
                    .error("dispatch.failed", &format!("{}: {err}", request.dispatch_id()));
                DispatchStatus::Failed
            }
        };
        (dispatch, outcome)
    }

    fn retry_on_new_slot(
        &self,
        strategy: &DispatchStrategy,
        request: &DispatchRequest,
        exhausted: DispatchError,
    ) -> Result<Pending, DispatchError> {
        let query = &request.query.id;
        let slot = {
            let _serialized = self
                .guard
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            self.provisioner.provision(strategy.lock_name()).map_err(|err| {
                DispatchError::failure(query, format!("{exhausted}; provisioning failed: {err}"))
            })?
        };
        self.log.info(
            "slot.provisioned",
            &format!("{} slot={}", request.dispatch_id(), slot.dir.display()),
        );

        self.log.info("dispatch.retried", &request.dispatch_id());
        let bound = match strategy {
            DispatchStrategy::WorkerProcess(_) => Some(&slot),
            DispatchStrategy::Direct(_) => None,
        };
        strategy.dispatch(request, bound).map_err(|err| match err {
            DispatchError::ResourceExhaustion { reason } => {
                DispatchError::failure(query, format!("still exhausted after retry: {reason}"))
            }
            other => other,
        })
    }
}
