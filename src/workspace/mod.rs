pub mod error;
pub mod provision;
pub mod slots;
pub mod unlock;
pub mod warmup;
pub use error::WorkspaceError;
pub use provision::{create_next_slot, provision_slots, ProvisionReport, ProvisionRequest};
pub use slots::{
    claim_next_unlocked, claim_slot, ensure_slot_layout, find_unlocked_slot, list_slots,
    release_slot, slot_statuses, slot_workspaces, SlotStatus, WorkerSlot,
    DEFAULT_WORKSPACE_CONTENT, MESSAGES_DIR, SLOT_PREFIX, WORKSPACE_TEMPLATE_FILE,
};
pub use unlock::unlock_slots;
pub use warmup::{warmup_slots, Launcher, ProcessLauncher, WarmupReport};

use std::path::Path;

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> WorkspaceError {
    WorkspaceError::Io {
        path: path.display().to_string(),
        source,
    }
}
