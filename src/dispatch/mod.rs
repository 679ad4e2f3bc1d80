pub mod barrier;
pub mod collector;
pub mod error;
pub mod grouping;
pub mod provisioning;
pub mod query;
pub mod run;
pub mod strategy;
pub mod worker_process;
pub use barrier::{RunContext, Sleeper, ThreadSleeper, WaitBarrier};
pub use collector::{collect_group, IssuedDispatch, QueryOutcome};
pub use error::{BatchError, DispatchError, GroupingError, RunError};
pub use grouping::group_queries;
pub use provisioning::{ProvisioningManager, SlotProvisioner, WorkspaceProvisioner};
pub use query::{BatchFile, Query, QueryGroup};
pub use run::{Dispatcher, RunReport};
pub use strategy::{
    DirectInvoker, Dispatch, DispatchRequest, DispatchStatus, DispatchStrategy, InvokeError,
    Pending, RunInputs, StrategyKind,
};
pub use worker_process::{
    InvocationSpec, LaunchedWorker, WorkerProcessBackend, DISPATCH_ID_ENV, RESULT_FILE_ENV,
    SLOT_DIR_ENV,
};
