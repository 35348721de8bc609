use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("profile {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// What the watcher remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalProfile {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    /// Attempts counted so far, per problem slug.
    #[serde(default)]
    pub attempts: BTreeMap<String, u32>,
}

impl LocalProfile {
    pub fn attempts_for(&self, slug: &str) -> u32 {
        self.attempts.get(slug).copied().unwrap_or(0)
    }
}

/// A JSON file holding one [`LocalProfile`]. No locking: two watchers sharing
/// a file may overwrite each other's counters.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty profile.
    pub async fn load(&self) -> Result<LocalProfile, ProfileError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LocalProfile::default()),
            Err(source) => {
                return Err(ProfileError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        serde_json::from_slice(&raw).map_err(|source| ProfileError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes to a sibling temp file first so a crash never leaves half a profile.
    pub async fn save(&self, profile: &LocalProfile) -> Result<(), ProfileError> {
        let io_err = |source| ProfileError::Io {
            path: self.path.clone(),
            source,
        };
        let json = serde_json::to_vec_pretty(profile).map_err(|source| ProfileError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profile.json"));
        assert_eq!(store.load().await.unwrap(), LocalProfile::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("nested").join("profile.json"));
        let mut profile = LocalProfile {
            email: Some("a@b.com".into()),
            username: Some("alice".into()),
            ..Default::default()
        };
        profile.attempts.insert("two-sum".into(), 3);
        store.save(&profile).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, profile);
        assert_eq!(loaded.attempts_for("two-sum"), 3);
        assert_eq!(loaded.attempts_for("three-sum"), 0);
    }

    #[tokio::test]
    async fn partial_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");

        std::fs::write(&path, r#"{"email":"a@b.com"}"#).unwrap();
        let store = ProfileStore::new(&path);
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.email.as_deref(), Some("a@b.com"));
        assert!(loaded.attempts.is_empty());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(store.load().await, Err(ProfileError::Json { .. })));
    }
}
