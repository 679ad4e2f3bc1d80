use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DISPATCH_LOG_RELATIVE_PATH: &str = "logs/dispatch.log";

pub fn dispatch_log_path(state_root: &Path) -> PathBuf {
    state_root.join(DISPATCH_LOG_RELATIVE_PATH)
}

#[derive(Debug, Clone, Default)]
pub struct RunLog {
    path: Option<PathBuf>,
}

impl RunLog {
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn info(&self, event: &str, message: &str) {
        self.append("info", event, message);
    }

    pub fn warn(&self, event: &str, message: &str) {
        self.append("warn", event, message);
    }

    pub fn error(&self, event: &str, message: &str) {
        self.append("error", event, message);
    }

    pub fn append(&self, level: &str, event: &str, message: &str) {
        let Some(path) = &self.path else {
            return;
        };
        let payload = serde_json::json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "level": level,
            "event": event,
            "message": message,
        });
        let Ok(line) = serde_json::to_string(&payload) else {
            return;
        };

        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let Ok(mut file) = fs::OpenOptions::new().create(true).append(true).open(path) else {
            return;
        };
        let _ = writeln!(file, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::tempdir;

    #[test]
    fn log_lines_are_json_objects_with_event_fields() {
        let dir = tempdir().expect("tempdir");
        let log = RunLog::to_file(dispatch_log_path(dir.path()));
        log.info("run.started", "run-1 queries=2");
        log.error("dispatch.failed", "q1: boom");

        let raw = fs::read_to_string(dispatch_log_path(dir.path())).expect("read log");
        let lines: Vec<Value> = raw
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "run.started");
        assert_eq!(lines[1]["level"], "error");
        assert!(lines[1]["timestamp"].as_str().is_some());
    }

    #[test]
    fn disabled_log_writes_nothing() {
        let log = RunLog::disabled();
        log.info("run.started", "ignored");
        assert!(log.path().is_none());
    }
}
