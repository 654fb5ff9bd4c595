//! File-backed session persistence.
//!
//! The whole session mapping lives in a single JSON file, loaded once at
//! startup and rewritten on every mutation. Writes go to a temp file first
//! and are renamed into place, so a crash mid-write never leaves a
//! truncated store. An internal mutex serializes writers; callers for
//! different users may persist concurrently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::error::{Result, StoreError};
use super::Session;

/// Durable store for the full session mapping.
pub struct FileSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSessionStore {
    /// Create a store backed by the given file path.
    ///
    /// The file does not need to exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all sessions from disk.
    ///
    /// A missing or unreadable file yields an empty mapping; the condition
    /// is logged and the process keeps going. Recovery must never crash.
    pub async fn load_all(&self) -> HashMap<i64, Session> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no sessions file, starting empty");
                return HashMap::new();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read sessions file, starting empty");
                return HashMap::new();
            }
        };

        match serde_json::from_str::<HashMap<i64, Session>>(&contents) {
            Ok(sessions) => {
                info!(path = %self.path.display(), sessions = sessions.len(), "loaded sessions");
                sessions
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "corrupt sessions file, starting empty");
                HashMap::new()
            }
        }
    }

    /// Persist the full session mapping atomically.
    pub async fn save_all(&self, sessions: &HashMap<i64, Session>) -> Result<()> {
        let _write = self.write_lock.lock().await;
        self.write_file(sessions).await
    }

    /// Remove one session from the persisted mapping.
    ///
    /// A later `load_all` will not resurrect it. Deleting a user that was
    /// never persisted is a no-op. An unreadable or unparsable file is an
    /// error, never a reason to rewrite the store empty; the file is left
    /// untouched for repair.
    pub async fn delete(&self, user_id: i64) -> Result<()> {
        let _write = self.write_lock.lock().await;
        let mut sessions = self.read_for_update().await?;
        if sessions.remove(&user_id).is_none() {
            return Ok(());
        }
        self.write_file(&sessions).await
    }

    /// Read the mapping ahead of a rewrite. Only a missing file maps to
    /// empty; every other failure propagates.
    async fn read_for_update(&self) -> Result<HashMap<i64, Session>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    async fn write_file(&self, sessions: &HashMap<i64, Session>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let json = serde_json::to_string_pretty(sessions)?;
        let temp_path = self.path.with_extension("json.tmp");

        fs::write(&temp_path, json.as_bytes())
            .await
            .map_err(|e| StoreError::io(&temp_path, e))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::io(&self.path, e))?;

        Ok(())
    }
}
