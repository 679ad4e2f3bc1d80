use super::barrier::{RunContext, Sleeper, WaitBarrier};
use super::collector::{collect_group, IssuedDispatch, QueryOutcome};
use super::error::{DispatchError, RunError};
use super::grouping::group_queries;
use super::provisioning::{ProvisioningManager, WorkspaceProvisioner};
use super::query::{Query, QueryGroup};
use super::strategy::{
    DirectInvoker, Dispatch, DispatchRequest, DispatchStatus, DispatchStrategy, Pending,
    RunInputs,
};
use super::worker_process::WorkerProcessBackend;
use crate::config::{ConfigError, Settings};
use crate::instruction::{resolve_imports, ImportPath, InstructionDocument};
use crate::shared::ids::RunId;
use crate::shared::logging::{dispatch_log_path, RunLog};
use std::sync::{mpsc, Arc};
use std::thread;

#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub imports: Vec<ImportPath>,
    pub groups: Vec<Vec<QueryOutcome>>,
}

impl RunReport {
    pub fn outcomes(&self) -> impl Iterator<Item = &QueryOutcome> {
        self.groups.iter().flatten()
    }

    pub fn lines(&self) -> Vec<String> {
        self.outcomes().map(QueryOutcome::render_line).collect()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes().filter(|outcome| outcome.is_failure()).count()
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    strategy: DispatchStrategy,
    provisioning: Arc<ProvisioningManager>,
    barrier: WaitBarrier,
    log: RunLog,
}

impl Dispatcher {
    pub fn new(
        strategy: DispatchStrategy,
        provisioning: ProvisioningManager,
        barrier: WaitBarrier,
        log: RunLog,
    ) -> Self {
        Self {
            strategy,
            provisioning: Arc::new(provisioning),
            barrier,
            log,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        direct: Option<Arc<dyn DirectInvoker>>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Result<Self, ConfigError> {
        let slot_root = settings.resolve_slot_root()?;
        let log = RunLog::to_file(dispatch_log_path(&settings.resolve_state_root()?));
        let worker =
            WorkerProcessBackend::from_settings(settings, &slot_root).with_log(log.clone());
        let provisioner = WorkspaceProvisioner::new(&slot_root, settings.template.as_deref());
        Ok(Self::new(
            DispatchStrategy::select(direct, worker),
            ProvisioningManager::new(Arc::new(provisioner), log.clone()),
            WaitBarrier::new(&settings.barrier, sleeper),
            log,
        ))
    }

    pub fn strategy(&self) -> &DispatchStrategy {
        &self.strategy
    }

    pub fn run(
        &self,
        instruction: InstructionDocument,
        queries: &[Query],
    ) -> Result<RunReport, RunError> {
        let imports = resolve_imports(&instruction);
        let groups = group_queries(queries).inspect_err(|err| {
            self.log.error("run.rejected", &err.to_string());
        })?;
        let run_id = RunId::generate(chrono::Utc::now().timestamp()).map_err(RunError::RunId)?;
        self.log.info(
            "run.started",
            &format!(
                "{run_id} queries={} groups={} imports={} strategy={}",
                queries.len(),
                groups.len(),
                imports.len(),
                self.strategy.kind()
            ),
        );

        let inputs = Arc::new(RunInputs {
            run_id: run_id.clone(),
            instruction,
            imports,
        });
        let mut ctx = RunContext::new(run_id.clone());
        let mut collected = Vec::with_capacity(groups.len());
        for group in &groups {
            self.log.info(
                "group.started",
                &format!("{run_id} group={} size={}", group.index, group.queries.len()),
            );
            let issued = self.issue_group(&inputs, group);
            let launched = issued
                .iter()
                .any(|entry| matches!(entry.outcome, Ok(Pending::Launched(_))));
            if self.strategy.needs_barrier() && launched {
                self.barrier.wait(&mut ctx, &self.log);
            }
            let outcomes = collect_group(issued, &self.log);
            self.log.info(
                "group.completed",
                &format!(
                    "{run_id} group={} failed={}",
                    group.index,
                    outcomes.iter().filter(|outcome| outcome.is_failure()).count()
                ),
            );
            collected.push(outcomes);
        }

        let report = RunReport {
            run_id,
            imports: inputs.imports.clone(),
            groups: collected,
        };
        self.log.info(
            "run.completed",
            &format!("{} failed={}", report.run_id, report.failed_count()),
        );
        Ok(report)
    }

    fn issue_group(&self, inputs: &Arc<RunInputs>, group: &QueryGroup) -> Vec<IssuedDispatch> {
        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::with_capacity(group.queries.len());
        for (index, query) in group.queries.iter().enumerate() {
            let tx = tx.clone();
            let strategy = self.strategy.clone();
            let provisioning = Arc::clone(&self.provisioning);
            let request = DispatchRequest {
                inputs: Arc::clone(inputs),
                query: query.clone(),
            };
            handles.push(thread::spawn(move || {
                let (dispatch, outcome) = provisioning.dispatch(&strategy, &request);
                let _ = tx.send(IssuedDispatch {
                    index,
                    dispatch,
                    outcome,
                });
            }));
        }
        drop(tx);
        for handle in handles {
            if handle.join().is_err() {
                self.log.error("dispatch.panicked", "dispatch thread panicked");
            }
        }

        let mut issued: Vec<IssuedDispatch> = rx.into_iter().collect();
        for (index, query) in group.queries.iter().enumerate() {
            if issued.iter().any(|entry| entry.index == index) {
                continue;
            }
            let mut dispatch = Dispatch::new(query.id.clone(), self.strategy.kind());
            dispatch.status = DispatchStatus::Failed;
            issued.push(IssuedDispatch {
                index,
                dispatch,
                outcome: Err(DispatchError::failure(&query.id, "dispatch thread panicked")),
            });
        }
        issued
    }
}
