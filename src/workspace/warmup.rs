use super::slots::slot_workspaces;
use super::WorkspaceError;
use crate::shared::logging::RunLog;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

pub trait Launcher {
    fn launch(&self, program: &str, target: &Path) -> std::io::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(&self, program: &str, target: &Path) -> std::io::Result<()> {
        Command::new(program)
            .arg(target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmupReport {
    pub opened: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

pub fn warmup_slots(
    root: &Path,
    count: usize,
    editor_command: &str,
    dry_run: bool,
    launcher: &dyn Launcher,
    log: &RunLog,
) -> Result<WarmupReport, WorkspaceError> {
    let workspaces = slot_workspaces(root)?;
    if workspaces.is_empty() {
        return Err(WorkspaceError::NoWorkspaces {
            root: root.display().to_string(),
        });
    }

    let mut report = WarmupReport::default();
    for workspace in workspaces.into_iter().take(count.max(1)) {
        if dry_run {
            report.opened.push(workspace);
            continue;
        }
        match launcher.launch(editor_command, &workspace) {
            Ok(()) => {
                log.info("warmup.opened", &workspace.display().to_string());
                report.opened.push(workspace);
            }
            Err(err) => {
                log.warn(
                    "warmup.failed",
                    &format!("{}: {err}", workspace.display()),
                );
                report.failed.push((workspace, err.to_string()));
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    #[derive(Default)]
    struct RecordingLauncher {
        calls: RefCell<Vec<(String, PathBuf)>>,
        fail: bool,
    }

    impl Launcher for RecordingLauncher {
        fn launch(&self, program: &str, target: &Path) -> std::io::Result<()> {
            self.calls
                .borrow_mut()
                .push((program.to_string(), target.to_path_buf()));
            if self.fail {
                return Err(std::io::Error::other("failed to open"));
            }
            Ok(())
        }
    }

    fn root_with_workspaces(root: &Path, count: u32) {
        for number in 1..=count {
            let slot = root.join(format!("subagent-{number}"));
            fs::create_dir_all(&slot).expect("slot");
            fs::write(slot.join(format!("subagent-{number}.code-workspace")), "{}")
                .expect("workspace");
        }
    }

    #[test]
    fn empty_root_is_an_error() {
        let dir = tempdir().expect("tempdir");
        let launcher = RecordingLauncher::default();
        let err = warmup_slots(dir.path(), 1, "code", true, &launcher, &RunLog::disabled())
            .expect_err("no workspaces");
        assert!(matches!(err, WorkspaceError::NoWorkspaces { .. }));
    }

    #[test]
    fn dry_run_never_launches() {
        let dir = tempdir().expect("tempdir");
        root_with_workspaces(dir.path(), 1);
        let launcher = RecordingLauncher::default();
        let report = warmup_slots(dir.path(), 1, "code", true, &launcher, &RunLog::disabled())
            .expect("warmup");
        assert_eq!(report.opened.len(), 1);
        assert!(launcher.calls.borrow().is_empty());
    }

    #[test]
    fn opens_requested_count_with_editor_command() {
        let dir = tempdir().expect("tempdir");
        root_with_workspaces(dir.path(), 5);
        let launcher = RecordingLauncher::default();
        let report = warmup_slots(
            dir.path(),
            2,
            "code-insiders",
            false,
            &launcher,
            &RunLog::disabled(),
        )
        .expect("warmup");

        assert_eq!(report.opened.len(), 2);
        let calls = launcher.calls.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "code-insiders");
        assert!(calls[1].1.ends_with("subagent-2/subagent-2.code-workspace"));
    }

    #[test]
    fn launch_errors_are_recorded_and_skipped() {
        let dir = tempdir().expect("tempdir");
        root_with_workspaces(dir.path(), 1);
        let launcher = RecordingLauncher {
            fail: true,
            ..RecordingLauncher::default()
        };
        let report = warmup_slots(dir.path(), 1, "code", false, &launcher, &RunLog::disabled())
            .expect("warmup completes");
        assert!(report.opened.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(launcher.calls.borrow().len(), 1);
    }
}
