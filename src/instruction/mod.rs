pub mod document;
pub mod imports;
pub mod locator;
pub use document::InstructionDocument;
pub use imports::{resolve_imports, ImportPath};
pub use locator::{locate_or_generate, DirectoryLocator, InstructionLocator};

#[derive(Debug, thiserror::Error)]
pub enum InstructionError {
    #[error("failed to read instruction document {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write generated instruction document {path}: {source}")]
    Generate {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
