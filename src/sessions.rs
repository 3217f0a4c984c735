use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{catalog::GpuId, i18n::Language, models::MarketSnapshot};

// Telegram chat id
pub type SessionKey = i64;

/// Persistent stages of the ROI flow. Validation and computation happen
/// inside a single cost-input step and never outlive it.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RoiStage {
    #[default]
    AwaitingGpuSelection,
    AwaitingCostInput {
        gpu_id: GpuId,
        snapshot: MarketSnapshot,
    },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct Session {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub stage: RoiStage,
}

pub trait FileSerializable: Sized {
    async fn deserialize(path: &Path) -> Self;
    async fn serialize(&self, path: &Path);

    async fn deserialize_load(path: &Path) -> Option<String> {
        match tokio::fs::read_to_string(path).await {
            Ok(it) => Some(it),
            Err(err) => {
                match err.kind() {
                    std::io::ErrorKind::NotFound => warn!("No saved state at {}", path.display()),
                    _ => warn!("Failed to load state from {}: {:?}", path.display(), err),
                }

                None
            }
        }
    }

    async fn serialize_to_file(path: &Path, serialized: String) {
        // Write next to the target and rename so a crash never leaves half a file
        let tmp_path = path.with_extension("tmp");
        let result = match tokio::fs::write(&tmp_path, serialized).await {
            Ok(_) => tokio::fs::rename(&tmp_path, path).await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            error!("Failed to save state to {}: {:?}", path.display(), err);
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct SessionStore {
    sessions: HashMap<SessionKey, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore {
            sessions: HashMap::new(),
        }
    }

    pub fn get_size(&self) -> usize {
        self.sessions.len()
    }

    pub fn get(&self, key: SessionKey) -> Session {
        self.sessions.get(&key).cloned().unwrap_or_default()
    }

    // Default sessions carry nothing worth keeping
    pub fn put(&mut self, key: SessionKey, session: Session) {
        if session == Session::default() {
            self.sessions.remove(&key);
        } else {
            self.sessions.insert(key, session);
        }
    }

    /// Resets cost-input stages whose snapshot is older than `max_age`, then
    /// drops sessions left with nothing but defaults. Returns how many
    /// sessions were dropped.
    pub fn prune_stale(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        for session in self.sessions.values_mut() {
            if let RoiStage::AwaitingCostInput { snapshot, .. } = &session.stage {
                if snapshot.is_stale(max_age, now) {
                    session.stage = RoiStage::AwaitingGpuSelection;
                }
            }
        }

        let before = self.sessions.len();
        self.sessions.retain(|_, session| *session != Session::default());
        before - self.sessions.len()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Serializes under the lock, writes the file after releasing it so chats
/// are not blocked on disk I/O.
pub async fn save_shared(path: &Path, sessions: &Mutex<SessionStore>) {
    let (size, serialized) = {
        let sessions_locked = sessions.lock().await;
        (sessions_locked.get_size(), sessions_locked.to_json())
    };

    let serialized = match serialized {
        Ok(serialized) => serialized,
        Err(err) => {
            error!("Failed to serialize sessions: {:?}", err);
            return;
        }
    };

    let _start = Instant::now();
    SessionStore::serialize_to_file(path, serialized).await;
    let _duration = _start.elapsed();

    info!("Saved {} sessions to {} in {:?}", size, path.display(), _duration);
}

impl FileSerializable for SessionStore {
    async fn deserialize(path: &Path) -> SessionStore {
        let Some(serialized) = SessionStore::deserialize_load(path).await else {
            return SessionStore::new();
        };

        match serde_json::from_str::<SessionStore>(&serialized) {
            Ok(store) => store,
            Err(err) => {
                warn!(
                    "Session file {} is corrupted, starting empty: {:?}",
                    path.display(),
                    err
                );
                SessionStore::new()
            }
        }
    }

    async fn serialize(&self, path: &Path) {
        match self.to_json() {
            Ok(serialized) => SessionStore::serialize_to_file(path, serialized).await,
            Err(err) => error!("Failed to serialize sessions: {:?}", err),
        }
    }
}
