#![deny(missing_docs)]
//! Storage for mdxwiki documents.
//!
//! The engine in `mdxwiki-core` never touches the filesystem; this crate is
//! the collaborator it hands text to. Documents are addressed by logical
//! paths relative to a fixed root, and no path may resolve outside of it.

mod error;
mod fs;
mod memory;
mod session;

pub use error::StoreError;
pub use fs::FsStore;
pub use memory::MemoryStore;
pub use session::EditingSession;

use relative_path::{Component, RelativePath, RelativePathBuf};

/// Where document text is loaded from and saved to.
pub trait DocumentStore {
    /// Text of the document at `path`.
    fn load(&self, path: &RelativePath) -> Result<String, StoreError>;

    /// Replaces the document at `path` with `text`, creating it if needed.
    fn save(&self, path: &RelativePath, text: &str) -> Result<(), StoreError>;

    /// Every stored document, sorted.
    fn list(&self) -> Result<Vec<RelativePathBuf>, StoreError>;
}

/// Resolves `.` and `..` lexically. Paths that climb above the root, or name
/// nothing at all, are rejected.
pub(crate) fn normalize(path: &RelativePath) -> Result<RelativePathBuf, StoreError> {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(StoreError::OutsideRoot(path.as_str().to_string()));
                }
            }
            Component::Normal(name) => parts.push(name),
        }
    }
    if parts.is_empty() {
        return Err(StoreError::OutsideRoot(path.as_str().to_string()));
    }
    Ok(RelativePathBuf::from(parts.join("/")))
}
