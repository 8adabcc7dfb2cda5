use crate::{DocumentStore, StoreError, normalize};
use relative_path::{RelativePath, RelativePathBuf};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// In-memory store for tests and embedding hosts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<BTreeMap<RelativePathBuf, String>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `(path, text)` pairs.
    pub fn with_documents<'a>(
        documents: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for (path, text) in documents {
            store.save(RelativePath::new(path), text)?;
        }
        Ok(store)
    }

    fn documents(&self) -> std::sync::MutexGuard<'_, BTreeMap<RelativePathBuf, String>> {
        self.documents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, path: &RelativePath) -> Result<String, StoreError> {
        let path = normalize(path)?;
        self.documents()
            .get(&path)
            .cloned()
            .ok_or(StoreError::NotFound(path))
    }

    fn save(&self, path: &RelativePath, text: &str) -> Result<(), StoreError> {
        let path = normalize(path)?;
        self.documents().insert(path, text.to_string());
        Ok(())
    }

    fn list(&self) -> Result<Vec<RelativePathBuf>, StoreError> {
        Ok(self.documents().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_under_normalized_paths() {
        let store = MemoryStore::with_documents([("b", "two"), ("./a", "one")]).unwrap();
        assert_eq!(store.load(RelativePath::new("x/../a")).unwrap(), "one");
        let listed: Vec<_> = store.list().unwrap();
        assert_eq!(listed, vec![RelativePathBuf::from("a"), RelativePathBuf::from("b")]);
    }

    #[test]
    fn missing_and_escaping_paths() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.load(RelativePath::new("a")),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.save(RelativePath::new("../a"), ""),
            Err(StoreError::OutsideRoot(_))
        ));
    }
}
