use crate::shared::ids::QueryId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GroupingError {
    #[error("cyclic dependency among queries: {}", join_ids(.queries))]
    CyclicDependency { queries: Vec<QueryId> },
    #[error("query `{query}` depends on unknown query `{dependency}`")]
    UnknownDependency { query: QueryId, dependency: QueryId },
    #[error("query id `{query}` is used more than once")]
    DuplicateQuery { query: QueryId },
}

fn join_ids(ids: &[QueryId]) -> String {
    ids.iter()
        .map(QueryId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("no execution slot available: {reason}")]
    ResourceExhaustion { reason: String },
    #[error("dispatch for query `{query}` failed: {reason}")]
    DispatchFailure { query: QueryId, reason: String },
    #[error("no result for query `{query}` at {path}: {reason}")]
    MissingResult {
        query: QueryId,
        path: String,
        reason: String,
    },
}

impl DispatchError {
    pub fn is_exhaustion(&self) -> bool {
        matches!(self, Self::ResourceExhaustion { .. })
    }

    pub(crate) fn failure(query: &QueryId, reason: impl Into<String>) -> Self {
        Self::DispatchFailure {
            query: query.clone(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("failed to read batch file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in batch file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("batch file {path} contains no queries")]
    Empty { path: String },
    #[error("query `{query}` has empty text")]
    EmptyQuery { query: QueryId },
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Grouping(#[from] GroupingError),
    #[error("failed to allocate run id: {0}")]
    RunId(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> QueryId {
        QueryId::parse(raw).expect("query id")
    }

    #[test]
    fn cyclic_dependency_names_every_involved_query() {
        let err = GroupingError::CyclicDependency {
            queries: vec![id("a"), id("b")],
        };
        assert_eq!(err.to_string(), "cyclic dependency among queries: a, b");
    }

    #[test]
    fn only_resource_exhaustion_counts_as_exhaustion() {
        assert!(DispatchError::ResourceExhaustion {
            reason: "busy".to_string()
        }
        .is_exhaustion());
        assert!(!DispatchError::failure(&id("x"), "boom").is_exhaustion());
        assert_eq!(
            DispatchError::failure(&id("x"), "boom").to_string(),
            "dispatch for query `x` failed: boom"
        );
    }
}
