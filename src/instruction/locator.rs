use super::InstructionError;
use crate::shared::fs_atomic::atomic_write_file;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const PROMPT_FILE_SUFFIX: &str = ".prompt.md";
pub const FALLBACK_INSTRUCTION_FILE: &str = "instructions.md";

const GENERATED_INSTRUCTIONS: &str = "---\nimports: []\n---\n\n# Instructions\n\nAnswer the query using only the attached files and the current workspace.\n";

pub trait InstructionLocator {
    fn find_instruction_document(&self, context: &Path) -> Option<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryLocator;

impl InstructionLocator for DirectoryLocator {
    fn find_instruction_document(&self, context: &Path) -> Option<PathBuf> {
        if context.is_file() {
            return Some(context.to_path_buf());
        }
        let entries = fs::read_dir(context).ok()?;
        let mut prompts: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.ends_with(PROMPT_FILE_SUFFIX))
            })
            .collect();
        prompts.sort();
        if let Some(first) = prompts.into_iter().next() {
            return Some(first);
        }
        let fallback = context.join(FALLBACK_INSTRUCTION_FILE);
        fallback.is_file().then_some(fallback)
    }
}

pub fn locate_or_generate(
    locator: &dyn InstructionLocator,
    context: &Path,
    state_root: &Path,
) -> Result<PathBuf, InstructionError> {
    if let Some(found) = locator.find_instruction_document(context) {
        return Ok(found);
    }
    let generated = generated_document_path(context, state_root);
    if !generated.is_file() {
        atomic_write_file(&generated, GENERATED_INSTRUCTIONS.as_bytes()).map_err(|source| {
            InstructionError::Generate {
                path: generated.display().to_string(),
                source,
            }
        })?;
    }
    Ok(generated)
}

fn generated_document_path(context: &Path, state_root: &Path) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(context.display().to_string().as_bytes());
    let digest = hasher.finalize();
    let hash = digest[..8]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect::<String>();
    state_root
        .join("generated")
        .join(format!("{hash}{PROMPT_FILE_SUFFIX}"))
}
