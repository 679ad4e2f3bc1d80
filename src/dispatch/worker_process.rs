use super::error::DispatchError;
use super::strategy::DispatchRequest;
use crate::config::Settings;
use crate::shared::logging::RunLog;
use crate::workspace::{
    claim_next_unlocked, claim_slot, release_slot, WorkerSlot, WorkspaceError,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};

pub const SLOT_DIR_ENV: &str = "SUBAGENT_SLOT_DIR";
pub const RESULT_FILE_ENV: &str = "SUBAGENT_RESULT_FILE";
pub const DISPATCH_ID_ENV: &str = "SUBAGENT_DISPATCH_ID";
pub const ATTACHMENT_FLAG: &str = "-a";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub binary: String,
    pub args: Vec<String>,
}

impl InvocationSpec {
    pub fn command_form(&self) -> String {
        std::iter::once(self.binary.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_word)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_word(word: &str) -> String {
    if !word.is_empty()
        && word
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || "-_./=:".contains(ch))
    {
        return word.to_string();
    }
    format!("\"{}\"", word.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Debug, Clone)]
pub struct WorkerProcessBackend {
    slot_root: PathBuf,
    lock_name: String,
    command: Vec<String>,
    messages_dir: String,
    result_suffix: String,
    log: RunLog,
}

#[derive(Debug)]
pub struct LaunchedWorker {
    pub slot: WorkerSlot,
    pub result_file: PathBuf,
    pub command_form: String,
    lock_name: String,
    child: Child,
}

impl LaunchedWorker {
    pub fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    pub fn release(&self) -> Result<(), WorkspaceError> {
        release_slot(&self.slot, &self.lock_name)
    }

    /// Blocks until the worker exits, then releases its slot.
    pub fn wait_and_release(mut self) -> Result<Option<ExitStatus>, WorkspaceError> {
        let status = self.child.wait().ok();
        self.release()?;
        Ok(status)
    }
}

impl WorkerProcessBackend {
    pub fn from_settings(settings: &Settings, slot_root: &Path) -> Self {
        Self {
            slot_root: slot_root.to_path_buf(),
            lock_name: settings.lock_name.clone(),
            command: settings.worker.command.clone(),
            messages_dir: settings.worker.messages_dir.clone(),
            result_suffix: settings.worker.result_suffix.clone(),
            log: RunLog::disabled(),
        }
    }

    pub fn with_log(mut self, log: RunLog) -> Self {
        self.log = log;
        self
    }

    pub fn slot_root(&self) -> &Path {
        &self.slot_root
    }

    pub fn lock_name(&self) -> &str {
        &self.lock_name
    }

    pub fn result_file(&self, slot: &WorkerSlot, dispatch_id: &str) -> PathBuf {
        slot.dir
            .join(&self.messages_dir)
            .join(format!("{dispatch_id}{}", self.result_suffix))
    }

    pub fn build_invocation(&self, request: &DispatchRequest) -> InvocationSpec {
        let mut words = self.command.iter().cloned();
        let binary = words.next().unwrap_or_default();
        let mut args: Vec<String> = words.collect();
        args.push(request.inputs.instruction.path().display().to_string());
        args.push(request.query.text.clone());
        for import in &request.inputs.imports {
            args.push(ATTACHMENT_FLAG.to_string());
            args.push(import.path().display().to_string());
        }
        InvocationSpec { binary, args }
    }

    pub fn launch(
        &self,
        request: &DispatchRequest,
        slot: Option<&WorkerSlot>,
    ) -> Result<LaunchedWorker, DispatchError> {
        let query = &request.query.id;
        let slot = match slot {
            Some(slot) if slot.is_locked(&self.lock_name) => slot.clone(),
            Some(slot) => {
                let claimed = claim_slot(slot, &self.lock_name)
                    .map_err(|err| DispatchError::failure(query, err.to_string()))?;
                if !claimed {
                    return Err(DispatchError::failure(
                        query,
                        format!("provisioned slot `{}` was claimed elsewhere", slot.name()),
                    ));
                }
                slot.clone()
            }
            None => claim_next_unlocked(&self.slot_root, &self.lock_name)
                .map_err(|err| DispatchError::failure(query, err.to_string()))?
                .ok_or_else(|| DispatchError::ResourceExhaustion {
                    reason: format!("no unlocked subagent in {}", self.slot_root.display()),
                })?,
        };

        match self.spawn_in_slot(request, &slot) {
            Ok(launched) => Ok(launched),
            Err(err) => {
                if let Err(release_err) = release_slot(&slot, &self.lock_name) {
                    self.log.warn("slot.release_failed", &release_err.to_string());
                }
                Err(err)
            }
        }
    }

    fn spawn_in_slot(
        &self,
        request: &DispatchRequest,
        slot: &WorkerSlot,
    ) -> Result<LaunchedWorker, DispatchError> {
        let query = &request.query.id;
        let dispatch_id = request.dispatch_id();
        let result_file = self.result_file(slot, &dispatch_id);
        if let Some(parent) = result_file.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                DispatchError::failure(query, format!("{}: {err}", parent.display()))
            })?;
        }
        match fs::remove_file(&result_file) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(DispatchError::failure(
                    query,
                    format!("{}: {err}", result_file.display()),
                ))
            }
        }

        let spec = self.build_invocation(request);
        let command_form = spec.command_form();
        let child = Command::new(&spec.binary)
            .args(&spec.args)
            .current_dir(&slot.dir)
            .env(SLOT_DIR_ENV, &slot.dir)
            .env(RESULT_FILE_ENV, &result_file)
            .env(DISPATCH_ID_ENV, &dispatch_id)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| {
                if err.kind() == std::io::ErrorKind::NotFound {
                    DispatchError::failure(query, format!("worker binary `{}` not found", spec.binary))
                } else {
                    DispatchError::failure(query, format!("failed to spawn worker: {err}"))
                }
            })?;

        self.log.info(
            "dispatch.launched",
            &format!("{dispatch_id} slot={} cmd={command_form}", slot.name()),
        );
        Ok(LaunchedWorker {
            slot: slot.clone(),
            result_file,
            command_form,
            lock_name: self.lock_name.clone(),
            child,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::query::Query;
    use crate::dispatch::strategy::RunInputs;
    use crate::instruction::{resolve_imports, InstructionDocument};
    use crate::shared::ids::{QueryId, RunId};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn request(text: &str) -> DispatchRequest {
        let instruction = InstructionDocument::from_text(
            "/work/task.prompt.md",
            "---\nimports:\n  - skill.md\n  - context.md\n---\n@import notes/extra.md\n",
        );
        let imports = resolve_imports(&instruction);
        DispatchRequest {
            inputs: Arc::new(RunInputs {
                run_id: RunId::parse("run-1").expect("run id"),
                instruction,
                imports,
            }),
            query: Query::new(QueryId::parse("q").expect("id"), text),
        }
    }

    #[test]
    fn invocation_embeds_instruction_query_and_every_import() {
        let backend = WorkerProcessBackend::from_settings(&Settings::default(), Path::new("/a"));
        let spec = backend.build_invocation(&request("what changed?"));
        assert_eq!(spec.binary, "subagent");
        assert_eq!(
            spec.args,
            vec![
                "code",
                "chat",
                "/work/task.prompt.md",
                "what changed?",
                "-a",
                "/work/skill.md",
                "-a",
                "/work/context.md",
                "-a",
                "/work/notes/extra.md",
            ]
        );
        assert_eq!(
            spec.command_form(),
            "subagent code chat /work/task.prompt.md \"what changed?\" -a /work/skill.md -a /work/context.md -a /work/notes/extra.md"
        );
    }

    #[test]
    fn empty_root_reports_resource_exhaustion() {
        let dir = tempdir().expect("tempdir");
        let backend = WorkerProcessBackend::from_settings(&Settings::default(), dir.path());
        let err = backend.launch(&request("q"), None).expect_err("no slots");
        assert!(err.is_exhaustion());
    }

    fn missing_worker_backend(dir: &Path) -> WorkerProcessBackend {
        let mut settings = Settings::default();
        settings.worker.command = vec![dir.join("missing-worker").display().to_string()];
        WorkerProcessBackend::from_settings(&settings, dir)
    }

    fn ready_slot(root: &Path, number: u32) -> WorkerSlot {
        let slot = WorkerSlot::new(root, number);
        fs::create_dir_all(&slot.dir).expect("slot");
        fs::write(slot.workspace_file(), "{}").expect("workspace");
        slot
    }

    #[test]
    fn missing_binary_fails_and_releases_the_slot() {
        let dir = tempdir().expect("tempdir");
        let slot = ready_slot(dir.path(), 1);
        let backend = missing_worker_backend(dir.path());

        let err = backend.launch(&request("q"), None).expect_err("missing binary");
        assert!(!err.is_exhaustion());
        assert!(err.to_string().contains("not found"));
        assert!(!slot.is_locked(backend.lock_name()));
    }

    #[test]
    fn provisioned_slot_is_used_whether_or_not_it_was_pre_locked() {
        let dir = tempdir().expect("tempdir");
        let backend = missing_worker_backend(dir.path());
        let unlocked = ready_slot(dir.path(), 1);
        let prelocked = ready_slot(dir.path(), 2);
        fs::write(prelocked.lock_path(backend.lock_name()), "").expect("lock");

        for slot in [&unlocked, &prelocked] {
            let err = backend
                .launch(&request("q"), Some(slot))
                .expect_err("missing binary");
            assert!(err.to_string().contains("not found"), "{err}");
            assert!(!slot.is_locked(backend.lock_name()));
        }
    }
}
