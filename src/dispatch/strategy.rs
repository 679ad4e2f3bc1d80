use super::error::DispatchError;
use super::query::Query;
use super::worker_process::{LaunchedWorker, WorkerProcessBackend};
use crate::instruction::{ImportPath, InstructionDocument};
use crate::shared::ids::{QueryId, RunId};
use crate::workspace::WorkerSlot;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvokeError {
    #[error("{0}")]
    Exhausted(String),
    #[error("{0}")]
    Failed(String),
}

pub trait DirectInvoker: Send + Sync {
    fn invoke(&self, query: &str, attachments: &[PathBuf]) -> Result<String, InvokeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Direct,
    WorkerProcess,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Direct => write!(f, "direct"),
            StrategyKind::WorkerProcess => write!(f, "worker-process"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    ExhaustedRetried,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub query_id: QueryId,
    pub strategy: StrategyKind,
    pub retries: u32,
    pub status: DispatchStatus,
}

impl Dispatch {
    pub fn new(query_id: QueryId, strategy: StrategyKind) -> Self {
        Self {
            query_id,
            strategy,
            retries: 0,
            status: DispatchStatus::Pending,
        }
    }
}

#[derive(Debug)]
pub struct RunInputs {
    pub run_id: RunId,
    pub instruction: InstructionDocument,
    pub imports: Vec<ImportPath>,
}

impl RunInputs {
    pub fn attachments(&self) -> Vec<PathBuf> {
        self.imports
            .iter()
            .map(|import| import.path().to_path_buf())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub inputs: Arc<RunInputs>,
    pub query: Query,
}

impl DispatchRequest {
    pub fn dispatch_id(&self) -> String {
        format!("{}-{}", self.inputs.run_id, self.query.id)
    }
}

#[derive(Debug)]
pub enum Pending {
    Completed(String),
    Launched(LaunchedWorker),
}

#[derive(Clone)]
pub enum DispatchStrategy {
    Direct(Arc<dyn DirectInvoker>),
    WorkerProcess(Arc<WorkerProcessBackend>),
}

impl std::fmt::Debug for DispatchStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchStrategy::Direct(_) => f.write_str("DispatchStrategy::Direct"),
            DispatchStrategy::WorkerProcess(backend) => f
                .debug_tuple("DispatchStrategy::WorkerProcess")
                .field(backend)
                .finish(),
        }
    }
}

impl DispatchStrategy {
    pub fn select(direct: Option<Arc<dyn DirectInvoker>>, worker: WorkerProcessBackend) -> Self {
        match direct {
            Some(invoker) => DispatchStrategy::Direct(invoker),
            None => DispatchStrategy::WorkerProcess(Arc::new(worker)),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            DispatchStrategy::Direct(_) => StrategyKind::Direct,
            DispatchStrategy::WorkerProcess(_) => StrategyKind::WorkerProcess,
        }
    }

    pub fn needs_barrier(&self) -> bool {
        matches!(self, DispatchStrategy::WorkerProcess(_))
    }

    pub fn lock_name(&self) -> Option<&str> {
        match self {
            DispatchStrategy::Direct(_) => None,
            DispatchStrategy::WorkerProcess(backend) => Some(backend.lock_name()),
        }
    }

    pub fn dispatch(
        &self,
        request: &DispatchRequest,
        slot: Option<&WorkerSlot>,
    ) -> Result<Pending, DispatchError> {
        match self {
            DispatchStrategy::Direct(invoker) => invoker
                .invoke(&request.query.text, &request.inputs.attachments())
                .map(Pending::Completed)
                .map_err(|err| match err {
                    InvokeError::Exhausted(reason) => DispatchError::ResourceExhaustion { reason },
                    InvokeError::Failed(reason) => {
                        DispatchError::failure(&request.query.id, reason)
                    }
                }),
            DispatchStrategy::WorkerProcess(backend) => {
                backend.launch(request, slot).map(Pending::Launched)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use std::path::Path;
    use std::sync::Mutex;

    struct EchoInvoker {
        seen: Mutex<Vec<(String, Vec<PathBuf>)>>,
    }

    impl DirectInvoker for EchoInvoker {
        fn invoke(&self, query: &str, attachments: &[PathBuf]) -> Result<String, InvokeError> {
            self.seen
                .lock()
                .expect("lock")
                .push((query.to_string(), attachments.to_vec()));
            match query {
                "busy" => Err(InvokeError::Exhausted("pool empty".to_string())),
                "bad" => Err(InvokeError::Failed("rejected".to_string())),
                other => Ok(format!("echo: {other}")),
            }
        }
    }

    fn request(text: &str) -> DispatchRequest {
        let instruction = InstructionDocument::from_text(
            "/work/task.prompt.md",
            "---\nimports: [skill.md, context.md]\n---\n",
        );
        let imports = crate::instruction::resolve_imports(&instruction);
        DispatchRequest {
            inputs: Arc::new(RunInputs {
                run_id: RunId::parse("run-test").expect("run id"),
                instruction,
                imports,
            }),
            query: Query::new(QueryId::parse("q1").expect("id"), text),
        }
    }

    fn worker_backend() -> WorkerProcessBackend {
        WorkerProcessBackend::from_settings(&Settings::default(), Path::new("/tmp/agents"))
    }

    #[test]
    fn direct_is_selected_when_an_invoker_is_available() {
        let invoker: Arc<dyn DirectInvoker> = Arc::new(EchoInvoker {
            seen: Mutex::new(Vec::new()),
        });
        let strategy = DispatchStrategy::select(Some(invoker), worker_backend());
        assert_eq!(strategy.kind(), StrategyKind::Direct);
        assert!(!strategy.needs_barrier());

        let strategy = DispatchStrategy::select(None, worker_backend());
        assert_eq!(strategy.kind(), StrategyKind::WorkerProcess);
        assert!(strategy.needs_barrier());
        assert_eq!(strategy.lock_name(), Some("subagent.lock"));
    }

    #[test]
    fn direct_dispatch_passes_every_attachment_and_maps_errors() {
        let invoker = Arc::new(EchoInvoker {
            seen: Mutex::new(Vec::new()),
        });
        let strategy = DispatchStrategy::Direct(invoker.clone());

        match strategy.dispatch(&request("hello"), None) {
            Ok(Pending::Completed(text)) => assert_eq!(text, "echo: hello"),
            other => panic!("unexpected outcome: {other:?}"),
        }
        let err = strategy
            .dispatch(&request("busy"), None)
            .expect_err("exhausted");
        assert!(err.is_exhaustion());
        let err = strategy.dispatch(&request("bad"), None).expect_err("failed");
        assert_eq!(err.to_string(), "dispatch for query `q1` failed: rejected");

        let seen = invoker.seen.lock().expect("lock");
        assert_eq!(
            seen[0].1,
            vec![
                PathBuf::from("/work/skill.md"),
                PathBuf::from("/work/context.md")
            ]
        );
    }

    #[test]
    fn dispatch_ids_combine_run_and_query() {
        assert_eq!(request("x").dispatch_id(), "run-test-q1");
    }
}
