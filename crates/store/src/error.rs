use relative_path::RelativePathBuf;

/// Storage failures, surfaced to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No document exists at the path.
    #[error("Document not found: {0}")]
    NotFound(RelativePathBuf),
    /// The path resolves outside the documents root.
    #[error("Invalid document path: {0}")]
    OutsideRoot(String),
    /// The underlying filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
