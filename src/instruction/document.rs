use super::InstructionError;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDocument {
    path: PathBuf,
    text: String,
}

impl InstructionDocument {
    pub fn load(path: &Path) -> Result<Self, InstructionError> {
        let text = fs::read_to_string(path).map_err(|source| InstructionError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::from_text(path, text))
    }

    pub fn from_text(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }
}
