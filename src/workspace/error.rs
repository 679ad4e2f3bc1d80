#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("template `{path}` is not a directory")]
    InvalidTemplate { path: String },
    #[error("subagent count must be a positive integer, got {count}")]
    InvalidCount { count: usize },
    #[error("target root `{path}` does not exist")]
    MissingRoot { path: String },
    #[error("subagent `{name}` does not exist in `{root}`")]
    MissingSlot { name: String, root: String },
    #[error("must specify either --subagent <name> or --all, but not both")]
    UnlockSelection,
    #[error("no subagent workspaces found in `{root}`")]
    NoWorkspaces { root: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
