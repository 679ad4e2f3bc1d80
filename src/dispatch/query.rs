use super::error::BatchError;
use crate::shared::ids::QueryId;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub text: String,
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<QueryId>,
}

impl Query {
    pub fn new(id: QueryId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            depends_on: Vec::new(),
        }
    }

    pub fn depending_on(mut self, dependency: QueryId) -> Self {
        self.depends_on.push(dependency);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryGroup {
    pub index: usize,
    pub queries: Vec<Query>,
}

impl QueryGroup {
    pub fn ids(&self) -> Vec<&QueryId> {
        self.queries.iter().map(|query| &query.id).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchFile {
    #[serde(default)]
    pub instructions: Option<PathBuf>,
    pub queries: Vec<Query>,
}

impl BatchFile {
    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let raw = fs::read_to_string(path).map_err(|source| BatchError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let batch: Self = serde_yaml::from_str(&raw).map_err(|source| BatchError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        if batch.queries.is_empty() {
            return Err(BatchError::Empty {
                path: path.display().to_string(),
            });
        }
        if let Some(query) = batch.queries.iter().find(|q| q.text.trim().is_empty()) {
            return Err(BatchError::EmptyQuery {
                query: query.id.clone(),
            });
        }
        Ok(batch)
    }

    pub fn resolved_instructions(&self, batch_path: &Path) -> Option<PathBuf> {
        let declared = self.instructions.as_ref()?;
        if declared.is_absolute() {
            return Some(declared.clone());
        }
        Some(
            batch_path
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(declared),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn batch_file_parses_dependencies_and_relative_instructions() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("batch.yaml");
        fs::write(
            &path,
            r#"
instructions: prompts/task.prompt.md
queries:
  - id: a
    text: summarize the design
  - id: b
    text: list open risks
    depends_on: [a]
  - id: c
    text: draft the changelog
    dependsOn: [a, b]
"#,
        )
        .expect("write batch");

        let batch = BatchFile::load(&path).expect("load batch");
        assert_eq!(batch.queries.len(), 3);
        assert_eq!(batch.queries[1].depends_on[0].as_str(), "a");
        assert_eq!(batch.queries[2].depends_on.len(), 2);
        assert_eq!(
            batch.resolved_instructions(&path),
            Some(dir.path().join("prompts/task.prompt.md"))
        );
    }

    #[test]
    fn empty_batches_and_blank_queries_are_rejected() {
        let dir = tempdir().expect("tempdir");
        let empty = dir.path().join("empty.yaml");
        fs::write(&empty, "queries: []\n").expect("write");
        assert!(matches!(
            BatchFile::load(&empty),
            Err(BatchError::Empty { .. })
        ));

        let blank = dir.path().join("blank.yaml");
        fs::write(&blank, "queries:\n  - id: a\n    text: '  '\n").expect("write");
        assert!(matches!(
            BatchFile::load(&blank),
            Err(BatchError::EmptyQuery { .. })
        ));
    }

    #[test]
    fn invalid_query_ids_fail_to_parse() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "queries:\n  - id: 'has space'\n    text: hi\n").expect("write");
        let err = BatchFile::load(&path).expect_err("invalid id");
        assert!(err.to_string().contains("invalid yaml"));
    }
}
