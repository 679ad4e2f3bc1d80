use super::{io_error, WorkspaceError};
use crate::shared::fs_atomic::{atomic_write_file, create_exclusive};
use std::fs;
use std::path::{Path, PathBuf};

pub const SLOT_PREFIX: &str = "subagent-";
pub const WORKSPACE_TEMPLATE_FILE: &str = "subagent.code-workspace";
pub const MESSAGES_DIR: &str = "messages";
pub const DEFAULT_WORKSPACE_CONTENT: &str = "{\n  \"folders\": [\n    { \"path\": \".\" }\n  ]\n}\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSlot {
    pub number: u32,
    pub dir: PathBuf,
}

impl WorkerSlot {
    pub fn new(root: &Path, number: u32) -> Self {
        Self {
            number,
            dir: root.join(slot_name(number)),
        }
    }

    pub fn name(&self) -> String {
        slot_name(self.number)
    }

    pub fn workspace_file(&self) -> PathBuf {
        self.dir.join(format!("{}.code-workspace", self.name()))
    }

    pub fn lock_path(&self, lock_name: &str) -> PathBuf {
        self.dir.join(lock_name)
    }

    pub fn is_locked(&self, lock_name: &str) -> bool {
        self.lock_path(lock_name).exists()
    }

    pub fn messages_dir(&self) -> PathBuf {
        self.dir.join(MESSAGES_DIR)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotStatus {
    pub slot: WorkerSlot,
    pub locked: bool,
    pub has_workspace: bool,
}

pub(crate) fn slot_name(number: u32) -> String {
    format!("{SLOT_PREFIX}{number}")
}

pub(crate) fn parse_slot_number(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(SLOT_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    digits.parse::<u32>().ok().filter(|number| *number > 0)
}

pub fn list_slots(root: &Path) -> Result<Vec<WorkerSlot>, WorkspaceError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(root).map_err(|err| io_error(root, err))?;
    let mut slots = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| io_error(root, err))?;
        if !entry.path().is_dir() {
            continue;
        }
        let Some(number) = entry.file_name().to_str().and_then(parse_slot_number) else {
            continue;
        };
        slots.push(WorkerSlot {
            number,
            dir: entry.path(),
        });
    }
    slots.sort_by_key(|slot| slot.number);
    Ok(slots)
}

pub fn slot_statuses(root: &Path, lock_name: &str) -> Result<Vec<SlotStatus>, WorkspaceError> {
    Ok(list_slots(root)?
        .into_iter()
        .map(|slot| SlotStatus {
            locked: slot.is_locked(lock_name),
            has_workspace: slot.workspace_file().is_file(),
            slot,
        })
        .collect())
}

pub fn slot_workspaces(root: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    Ok(list_slots(root)?
        .into_iter()
        .map(|slot| slot.workspace_file())
        .filter(|path| path.is_file())
        .collect())
}

pub fn find_unlocked_slot(
    root: &Path,
    lock_name: &str,
) -> Result<Option<WorkerSlot>, WorkspaceError> {
    Ok(list_slots(root)?
        .into_iter()
        .find(|slot| !slot.is_locked(lock_name)))
}

/// Writes the default workspace file and the messages directory when a slot
/// lacks them. Existing files are left alone.
pub fn ensure_slot_layout(slot: &WorkerSlot) -> Result<(), WorkspaceError> {
    let messages = slot.messages_dir();
    fs::create_dir_all(&messages).map_err(|err| io_error(&messages, err))?;
    let workspace = slot.workspace_file();
    if !workspace.exists() {
        atomic_write_file(&workspace, DEFAULT_WORKSPACE_CONTENT.as_bytes())
            .map_err(|err| io_error(&workspace, err))?;
    }
    Ok(())
}

pub fn claim_slot(slot: &WorkerSlot, lock_name: &str) -> Result<bool, WorkspaceError> {
    let lock = slot.lock_path(lock_name);
    match create_exclusive(&lock, std::process::id().to_string().as_bytes()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(io_error(&lock, err)),
    }
}

pub fn claim_next_unlocked(
    root: &Path,
    lock_name: &str,
) -> Result<Option<WorkerSlot>, WorkspaceError> {
    for slot in list_slots(root)? {
        if !claim_slot(&slot, lock_name)? {
            continue;
        }
        // Bare slot directories are populated once they belong to the caller.
        if let Err(err) = ensure_slot_layout(&slot) {
            release_slot(&slot, lock_name)?;
            return Err(err);
        }
        return Ok(Some(slot));
    }
    Ok(None)
}

pub fn release_slot(slot: &WorkerSlot, lock_name: &str) -> Result<(), WorkspaceError> {
    let lock = slot.lock_path(lock_name);
    match fs::remove_file(&lock) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_error(&lock, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const LOCK: &str = "subagent.lock";

    fn make_slot(root: &Path, number: u32, locked: bool) -> WorkerSlot {
        let slot = WorkerSlot::new(root, number);
        fs::create_dir_all(&slot.dir).expect("create slot");
        if locked {
            fs::write(slot.lock_path(LOCK), "").expect("lock");
        }
        slot
    }

    fn make_ready_slot(root: &Path, number: u32, locked: bool) -> WorkerSlot {
        let slot = make_slot(root, number, locked);
        fs::write(slot.workspace_file(), "{}").expect("workspace");
        slot
    }

    #[test]
    fn slot_names_parse_only_positive_numbers() {
        assert_eq!(parse_slot_number("subagent-12"), Some(12));
        assert_eq!(parse_slot_number("subagent-0"), None);
        assert_eq!(parse_slot_number("subagent-"), None);
        assert_eq!(parse_slot_number("subagent-1a"), None);
        assert_eq!(parse_slot_number("other-dir"), None);
    }

    #[test]
    fn list_slots_sorts_numerically_and_ignores_other_entries() {
        let dir = tempdir().expect("tempdir");
        for number in [10, 2, 1] {
            make_slot(dir.path(), number, false);
        }
        fs::create_dir_all(dir.path().join("other-dir")).expect("other dir");
        fs::write(dir.path().join("subagent-3"), "not a dir").expect("file");

        let numbers: Vec<u32> = list_slots(dir.path())
            .expect("list")
            .iter()
            .map(|slot| slot.number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }

    #[test]
    fn missing_root_has_no_slots() {
        let dir = tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        assert!(list_slots(&missing).expect("list").is_empty());
        assert!(find_unlocked_slot(&missing, LOCK).expect("find").is_none());
    }

    #[test]
    fn find_unlocked_skips_locked_slots() {
        let dir = tempdir().expect("tempdir");
        make_ready_slot(dir.path(), 1, true);
        make_slot(dir.path(), 2, false);
        make_ready_slot(dir.path(), 3, false);

        let found = find_unlocked_slot(dir.path(), LOCK)
            .expect("find")
            .expect("slot");
        assert_eq!(found.name(), "subagent-2");
    }

    #[test]
    fn claiming_a_bare_slot_directory_populates_it() {
        let dir = tempdir().expect("tempdir");
        make_ready_slot(dir.path(), 1, true);
        let bare = make_slot(dir.path(), 2, false);

        let claimed = claim_next_unlocked(dir.path(), LOCK)
            .expect("claim next")
            .expect("slot");
        assert_eq!(claimed, bare);
        assert!(bare.is_locked(LOCK));
        assert_eq!(
            fs::read_to_string(bare.workspace_file()).expect("workspace"),
            DEFAULT_WORKSPACE_CONTENT
        );
        assert!(bare.messages_dir().is_dir());
    }

    #[test]
    fn slot_layout_keeps_an_existing_workspace_file() {
        let dir = tempdir().expect("tempdir");
        let slot = make_ready_slot(dir.path(), 1, false);
        ensure_slot_layout(&slot).expect("layout");
        assert_eq!(fs::read_to_string(slot.workspace_file()).expect("workspace"), "{}");
        assert!(slot.messages_dir().is_dir());
    }

    #[test]
    fn claim_is_exclusive_until_release() {
        let dir = tempdir().expect("tempdir");
        let slot = make_ready_slot(dir.path(), 1, false);

        assert!(claim_slot(&slot, LOCK).expect("claim"));
        assert!(!claim_slot(&slot, LOCK).expect("second claim"));
        assert!(claim_next_unlocked(dir.path(), LOCK)
            .expect("claim next")
            .is_none());

        release_slot(&slot, LOCK).expect("release");
        release_slot(&slot, LOCK).expect("release twice");
        assert_eq!(
            claim_next_unlocked(dir.path(), LOCK).expect("claim next"),
            Some(slot)
        );
    }

    #[test]
    fn workspaces_require_the_numbered_workspace_file() {
        let dir = tempdir().expect("tempdir");
        for number in [1, 3, 2] {
            let slot = make_slot(dir.path(), number, false);
            fs::write(slot.workspace_file(), "{}").expect("workspace");
        }
        make_slot(dir.path(), 4, false);

        let workspaces = slot_workspaces(dir.path()).expect("workspaces");
        assert_eq!(workspaces.len(), 3);
        assert!(workspaces[0].ends_with("subagent-1/subagent-1.code-workspace"));
        assert!(workspaces[2].ends_with("subagent-3/subagent-3.code-workspace"));

        let statuses = slot_statuses(dir.path(), LOCK).expect("statuses");
        assert_eq!(statuses.len(), 4);
        assert!(!statuses[3].has_workspace);
    }
}
