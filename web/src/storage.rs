//! Session persistence.
//!
//! The registry lives in memory; a `SessionStore` keeps a copy on disk so a
//! restart resumes every match where it stood.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use match_core::Session;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const SNAPSHOT_VERSION: u32 = 1;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load every persisted session. A store that was never written is empty.
    async fn load(&self) -> Result<Vec<Session>>;

    /// Replace the persisted state with `sessions`.
    async fn save(&self, sessions: &[Session]) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotFile {
    version: u32,
    saved_at: DateTime<Utc>,
    sessions: Vec<Session>,
}

/// Stores all sessions in a single JSON document.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Session>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No snapshot at {}", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()))
            }
        };

        let snapshot: SnapshotFile = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        if snapshot.version != SNAPSHOT_VERSION {
            bail!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            );
        }
        Ok(snapshot.sessions)
    }

    /// Write-then-rename so a crash never leaves a truncated snapshot.
    async fn save(&self, sessions: &[Session]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let snapshot = SnapshotFile {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            sessions: sessions.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&snapshot).context("serializing sessions")?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json)
            .await
            .with_context(|| format!("writing {}", temp_path.display()))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e).with_context(|| format!("renaming to {}", self.path.display()));
        }

        debug!(sessions = sessions.len(), "Wrote snapshot to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use match_core::{SessionConfig, SessionRegistry, Status};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("sessions.json"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_restores_registry() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/sessions.json"));

        let registry = SessionRegistry::new();
        let id = registry
            .create(SessionConfig::new("saved", 0.5, "0xHOST").with_password("pw"))
            .unwrap()
            .id();
        registry.join_public(id, "0xA", Some("pw")).unwrap();
        registry.record_stake(id, "0xA", 0.5).unwrap();
        registry.record_stake(id, "0xB", 0.5).unwrap();

        store.save(&registry.snapshot()).await.unwrap();
        assert!(!store.temp_path().exists());

        let restored = SessionRegistry::new();
        restored.restore(store.load().await.unwrap()).unwrap();
        let session = restored.get(id).unwrap();
        assert_eq!(session.status(), Status::Active);
        assert_eq!(session.players().len(), 2);
        // Password survives the round trip, so private joins keep working
        assert!(restored.join_public(id, "0xA", Some("pw")).is_ok());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_snapshot() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("sessions.json"));
        let registry = SessionRegistry::new();

        registry
            .create(SessionConfig::new("first", 0.1, "0xHOST"))
            .unwrap();
        store.save(&registry.snapshot()).await.unwrap();
        registry
            .create(SessionConfig::new("second", 0.1, "0xHOST"))
            .unwrap();
        store.save(&registry.snapshot()).await.unwrap();

        assert_eq!(store.load().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, b"{ not json").unwrap();
        assert!(JsonFileStore::new(&path).load().await.is_err());

        std::fs::write(&path, br#"{"version":99,"savedAt":"2024-01-01T00:00:00Z","sessions":[]}"#)
            .unwrap();
        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version"));
    }
}
