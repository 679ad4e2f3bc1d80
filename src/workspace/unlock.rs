use super::slots::{list_slots, parse_slot_number, WorkerSlot};
use super::{io_error, WorkspaceError};
use std::fs;
use std::path::{Path, PathBuf};

pub fn unlock_slots(
    root: &Path,
    lock_name: &str,
    slot_name: Option<&str>,
    unlock_all: bool,
    dry_run: bool,
) -> Result<Vec<PathBuf>, WorkspaceError> {
    if slot_name.is_some() == unlock_all {
        return Err(WorkspaceError::UnlockSelection);
    }
    if !root.is_dir() {
        return Err(WorkspaceError::MissingRoot {
            path: root.display().to_string(),
        });
    }

    let targets = match slot_name {
        Some(name) => {
            let slot = parse_slot_number(name)
                .map(|number| WorkerSlot::new(root, number))
                .filter(|slot| slot.dir.is_dir())
                .ok_or_else(|| WorkspaceError::MissingSlot {
                    name: name.to_string(),
                    root: root.display().to_string(),
                })?;
            vec![slot]
        }
        None => list_slots(root)?,
    };

    let mut unlocked = Vec::new();
    for slot in targets {
        let lock = slot.lock_path(lock_name);
        if !lock.exists() {
            continue;
        }
        if !dry_run {
            fs::remove_file(&lock).map_err(|err| io_error(&lock, err))?;
        }
        unlocked.push(slot.dir);
    }
    Ok(unlocked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    const LOCK: &str = "subagent.lock";

    fn root_with_locks(dir: &TempDir) -> PathBuf {
        let root = dir.path().join("agents");
        for number in 1..=3 {
            let slot = root.join(format!("subagent-{number}"));
            fs::create_dir_all(&slot).expect("slot");
            if number != 2 {
                fs::write(slot.join(LOCK), "").expect("lock");
            }
        }
        root
    }

    #[test]
    fn unlocks_one_named_slot() {
        let dir = tempdir().expect("tempdir");
        let root = root_with_locks(&dir);

        let unlocked = unlock_slots(&root, LOCK, Some("subagent-1"), false, false).expect("unlock");
        assert_eq!(unlocked, vec![root.join("subagent-1")]);
        assert!(!root.join("subagent-1").join(LOCK).exists());
        assert!(root.join("subagent-3").join(LOCK).exists());
    }

    #[test]
    fn named_slot_without_lock_returns_empty() {
        let dir = tempdir().expect("tempdir");
        let root = root_with_locks(&dir);
        let unlocked = unlock_slots(&root, LOCK, Some("subagent-2"), false, false).expect("unlock");
        assert!(unlocked.is_empty());
    }

    #[test]
    fn unlock_all_returns_slots_in_number_order() {
        let dir = tempdir().expect("tempdir");
        let root = root_with_locks(&dir);

        let unlocked = unlock_slots(&root, LOCK, None, true, false).expect("unlock");
        assert_eq!(
            unlocked,
            vec![root.join("subagent-1"), root.join("subagent-3")]
        );
        assert!(!root.join("subagent-3").join(LOCK).exists());
    }

    #[test]
    fn dry_run_keeps_lock_files() {
        let dir = tempdir().expect("tempdir");
        let root = root_with_locks(&dir);

        let unlocked = unlock_slots(&root, LOCK, None, true, true).expect("unlock");
        assert_eq!(unlocked.len(), 2);
        assert!(root.join("subagent-1").join(LOCK).exists());
        assert!(root.join("subagent-3").join(LOCK).exists());
    }

    #[test]
    fn missing_root_or_slot_is_reported() {
        let dir = tempdir().expect("tempdir");
        let err = unlock_slots(&dir.path().join("missing"), LOCK, Some("subagent-1"), false, false)
            .expect_err("missing root");
        assert!(err.to_string().contains("does not exist"));

        let root = root_with_locks(&dir);
        let err = unlock_slots(&root, LOCK, Some("subagent-99"), false, false)
            .expect_err("missing slot");
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn exactly_one_selection_is_required() {
        let dir = tempdir().expect("tempdir");
        let root = root_with_locks(&dir);
        let err = unlock_slots(&root, LOCK, None, false, false).expect_err("neither");
        assert!(err.to_string().contains("must specify either"));
        let err = unlock_slots(&root, LOCK, Some("subagent-1"), true, false).expect_err("both");
        assert!(err.to_string().contains("must specify either"));
    }
}
