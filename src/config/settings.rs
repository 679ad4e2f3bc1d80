use super::{default_slot_root, default_state_root, ConfigError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LOCK_NAME: &str = "subagent.lock";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub slot_root: Option<PathBuf>,
    #[serde(default)]
    pub state_root: Option<PathBuf>,
    #[serde(default)]
    pub template: Option<PathBuf>,
    #[serde(default = "default_lock_name")]
    pub lock_name: String,
    #[serde(default = "default_editor_command")]
    pub editor_command: String,
    #[serde(default)]
    pub barrier: BarrierConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            slot_root: None,
            state_root: None,
            template: None,
            lock_name: default_lock_name(),
            editor_command: default_editor_command(),
            barrier: BarrierConfig::default(),
            worker: WorkerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct BarrierConfig {
    #[serde(
        default = "default_initial_wait_interval",
        alias = "initialWaitInterval"
    )]
    pub initial_wait_interval: u64,
    #[serde(
        default = "default_subsequent_wait_interval",
        alias = "subsequentWaitInterval"
    )]
    pub subsequent_wait_interval: u64,
}

impl Default for BarrierConfig {
    fn default() -> Self {
        Self {
            initial_wait_interval: default_initial_wait_interval(),
            subsequent_wait_interval: default_subsequent_wait_interval(),
        }
    }
}

impl BarrierConfig {
    pub fn initial(&self) -> Duration {
        Duration::from_secs(self.initial_wait_interval)
    }

    pub fn subsequent(&self) -> Duration {
        Duration::from_secs(self.subsequent_wait_interval)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct WorkerConfig {
    #[serde(default = "default_worker_command")]
    pub command: Vec<String>,
    #[serde(default = "default_messages_dir")]
    pub messages_dir: String,
    #[serde(default = "default_result_suffix")]
    pub result_suffix: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            command: default_worker_command(),
            messages_dir: default_messages_dir(),
            result_suffix: default_result_suffix(),
        }
    }
}

fn default_lock_name() -> String {
    DEFAULT_LOCK_NAME.to_string()
}

fn default_editor_command() -> String {
    "code".to_string()
}

fn default_initial_wait_interval() -> u64 {
    30
}

fn default_subsequent_wait_interval() -> u64 {
    15
}

fn default_worker_command() -> Vec<String> {
    vec![
        "subagent".to_string(),
        "code".to_string(),
        "chat".to_string(),
    ]
}

fn default_messages_dir() -> String {
    crate::workspace::MESSAGES_DIR.to_string()
}

fn default_result_suffix() -> String {
    "_res.md".to_string()
}

fn is_plain_file_name(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains('/') && !value.contains('\\') && value != ".."
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [
            ("slot_root", &self.slot_root),
            ("state_root", &self.state_root),
            ("template", &self.template),
        ] {
            if let Some(path) = value {
                if !path.is_absolute() {
                    return Err(ConfigError::Settings(format!(
                        "`{key}` must be an absolute path"
                    )));
                }
            }
        }

        if !is_plain_file_name(&self.lock_name) {
            return Err(ConfigError::Settings(
                "`lock_name` must be a non-empty file name".to_string(),
            ));
        }
        if self.editor_command.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`editor_command` must be non-empty".to_string(),
            ));
        }

        match self.worker.command.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => {
                return Err(ConfigError::Settings(
                    "`worker.command` must start with a non-empty program".to_string(),
                ))
            }
        }
        if !is_plain_file_name(&self.worker.messages_dir) {
            return Err(ConfigError::Settings(
                "`worker.messages_dir` must be a non-empty directory name".to_string(),
            ));
        }
        if !is_plain_file_name(&self.worker.result_suffix) {
            return Err(ConfigError::Settings(
                "`worker.result_suffix` must be a non-empty file name suffix".to_string(),
            ));
        }

        Ok(())
    }

    pub fn resolve_slot_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.slot_root {
            Some(path) => Ok(path.clone()),
            None => default_slot_root(),
        }
    }

    pub fn resolve_state_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.state_root {
            Some(path) => Ok(path.clone()),
            None => default_state_root(),
        }
    }
}
