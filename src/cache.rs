use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// On-disk store for the saved bearer token
///
/// Only credentials live here; Graph responses are never cached.
#[derive(Debug, Clone)]
pub struct Cache {
    cache_dir: PathBuf,
}

impl Cache {
    /// Open the cache in the project cache directory
    pub fn new() -> Result<Self> {
        Self::at(&Config::cache_dir()?)
    }

    /// Open a cache rooted at `dir`
    pub fn at(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {:?}", dir))?;
        Ok(Self {
            cache_dir: dir.to_path_buf(),
        })
    }

    /// Get the path for a cache file
    fn file_path(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Save data to cache
    pub fn save<T: Serialize>(&self, filename: &str, data: &T) -> Result<()> {
        let path = self.file_path(filename);
        let content = serde_json::to_string_pretty(data).context("Failed to serialize data")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write cache file: {:?}", path))?;
        Ok(())
    }

    /// Load data from cache
    pub fn load<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        let path = self.file_path(filename);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {:?}", path))?;
        let data = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache file: {:?}", path))?;
        Ok(Some(data))
    }

    /// Delete a cache file
    pub fn delete(&self, filename: &str) -> Result<()> {
        let path = self.file_path(filename);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete cache file: {:?}", path))?;
        }
        Ok(())
    }
}

// Token cache file name
pub const TOKENS_FILE: &str = "tokens.json";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccessToken, TokenStore};

    #[test]
    fn test_save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::at(&dir.path().join("nested")).unwrap();

        assert!(cache.load::<TokenStore>(TOKENS_FILE).unwrap().is_none());

        let mut store = TokenStore::default();
        store.set_graph_token(AccessToken {
            value: "abc".to_string(),
            expires: 42,
        });
        cache.save(TOKENS_FILE, &store).unwrap();

        let loaded: TokenStore = cache.load(TOKENS_FILE).unwrap().unwrap();
        assert_eq!(loaded.graph_token().unwrap().value, "abc");

        cache.delete(TOKENS_FILE).unwrap();
        assert!(cache.load::<TokenStore>(TOKENS_FILE).unwrap().is_none());
        cache.delete(TOKENS_FILE).unwrap();
    }
}
