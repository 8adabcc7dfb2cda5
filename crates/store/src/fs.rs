//! Filesystem-backed store.

use crate::{DocumentStore, StoreError, normalize};
use relative_path::{RelativePath, RelativePathBuf};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Documents stored as files under one root directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    extension: String,
}

impl FsStore {
    /// Store rooted at `root`, holding `.mdx` files.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "mdx".to_string(),
        }
    }

    /// Uses `extension` (without the dot) instead of `mdx`.
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// The documents root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Normalized logical path with the extension appended when missing.
    pub fn logical_path(&self, path: &RelativePath) -> Result<RelativePathBuf, StoreError> {
        let logical = normalize(path)?;
        if logical.extension() == Some(self.extension.as_str()) {
            return Ok(logical);
        }
        Ok(RelativePathBuf::from(format!(
            "{logical}.{}",
            self.extension
        )))
    }

    fn file_path(&self, path: &RelativePath) -> Result<(RelativePathBuf, PathBuf), StoreError> {
        let logical = self.logical_path(path)?;
        let full = logical.to_path(&self.root);
        Ok((logical, full))
    }

    fn collect(
        &self,
        dir: &Path,
        prefix: &RelativePath,
        out: &mut Vec<RelativePathBuf>,
    ) -> Result<(), StoreError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                log::debug!("skipping non UTF-8 entry in {}", dir.display());
                continue;
            };
            let logical = prefix.join(name);
            let path = entry.path();
            if path.is_dir() {
                self.collect(&path, &logical, out)?;
            } else if logical.extension() == Some(self.extension.as_str()) {
                out.push(logical);
            }
        }
        Ok(())
    }
}

impl DocumentStore for FsStore {
    fn load(&self, path: &RelativePath) -> Result<String, StoreError> {
        let (logical, full) = self.file_path(path)?;
        log::debug!("loading {logical}");
        fs::read_to_string(&full).map_err(|err| match err.kind() {
            ErrorKind::NotFound => StoreError::NotFound(logical),
            _ => StoreError::Io(err),
        })
    }

    fn save(&self, path: &RelativePath, text: &str) -> Result<(), StoreError> {
        let (logical, full) = self.file_path(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, text)?;
        log::debug!("saved {logical} ({} bytes)", text.len());
        Ok(())
    }

    fn list(&self) -> Result<Vec<RelativePathBuf>, StoreError> {
        let mut documents = Vec::new();
        if self.root.is_dir() {
            self.collect(&self.root, RelativePath::new(""), &mut documents)?;
        }
        documents.sort();
        Ok(documents)
    }
}
