//! On-disk layout for fine-tuned model artifacts.
//!
//! Each trained model gets a numeric id and a directory under the store
//! root; the head artifact lives at a fixed name inside it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

const HEAD_FILE: &str = "head.safetensors";

/// Identifier of a stored model, unique within one [`ModelStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelId(pub u64);

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Directory of trained model artifacts.
pub struct ModelStore {
    root: PathBuf,
}

impl ModelStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create model store at {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the artifacts of `id`.
    pub fn model_dir(&self, id: ModelId) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Path of the trained-head artifact for `id`.
    pub fn head_path(&self, id: ModelId) -> PathBuf {
        self.model_dir(id).join(HEAD_FILE)
    }

    /// Allocate the next free id and create its directory.
    pub fn allocate(&self) -> anyhow::Result<ModelId> {
        let next = self
            .existing_ids()?
            .last()
            .map_or(0, |ModelId(highest)| highest + 1);
        let id = ModelId(next);
        fs::create_dir_all(self.model_dir(id))
            .with_context(|| format!("failed to create directory for model {id}"))?;
        tracing::debug!(model = %id, "allocated model directory");
        Ok(id)
    }

    pub fn exists(&self, id: ModelId) -> bool {
        self.model_dir(id).is_dir()
    }

    /// Remove a stored model and all of its artifacts.
    pub fn delete(&self, id: ModelId) -> anyhow::Result<()> {
        let dir = self.model_dir(id);
        fs::remove_dir_all(&dir)
            .with_context(|| format!("failed to delete model {id} at {}", dir.display()))?;
        Ok(())
    }

    /// Ids present in the store, ascending.
    pub fn existing_ids(&self) -> anyhow::Result<Vec<ModelId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            if let Some(n) = entry.file_name().to_str().and_then(|s| s.parse::<u64>().ok()) {
                ids.push(ModelId(n));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_creates_sequential_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::open(dir.path()).unwrap();

        let a = store.allocate().unwrap();
        let b = store.allocate().unwrap();
        assert_eq!(a, ModelId(0));
        assert_eq!(b, ModelId(1));
        assert!(store.exists(a));
        assert!(store.exists(b));
    }

    #[test]
    fn allocation_skips_past_existing_models() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("7")).unwrap();
        let store = ModelStore::open(dir.path()).unwrap();

        assert_eq!(store.allocate().unwrap(), ModelId(8));
    }

    #[test]
    fn non_numeric_entries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("scratch")).unwrap();
        let store = ModelStore::open(dir.path()).unwrap();

        assert_eq!(store.existing_ids().unwrap(), Vec::new());
        assert_eq!(store.allocate().unwrap(), ModelId(0));
    }

    #[test]
    fn delete_removes_the_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::open(dir.path()).unwrap();
        let id = store.allocate().unwrap();

        store.delete(id).unwrap();
        assert!(!store.exists(id));
        assert!(store.delete(id).is_err());
    }

    #[test]
    fn head_path_is_inside_the_model_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ModelStore::open(dir.path()).unwrap();
        let id = store.allocate().unwrap();

        let head = store.head_path(id);
        assert!(head.starts_with(store.model_dir(id)));
        assert_eq!(head.file_name().unwrap(), "head.safetensors");
    }
}
