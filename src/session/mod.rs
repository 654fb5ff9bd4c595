//! Game session state and persistence.
//!
//! A session tracks one user's progress through the castle: the current
//! room, its generated content, and the failed-attempt counter. Sessions
//! live in memory while the process runs and are mirrored to a JSON file
//! on every mutation.

mod error;
mod store;

pub use error::{Result, StoreError};
pub use store::FileSessionStore;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::generator::RoomContent;

/// One user's game session.
///
/// The content triple (`description`, `buggy_snippet`, `correct_snippet`)
/// always belongs to `room_number`; it is only ever overwritten as a whole.
/// The on-disk field names match the original `user_sessions.json` layout so
/// existing save files load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub room_number: u32,
    pub description: String,
    pub buggy_snippet: String,
    pub correct_snippet: String,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub is_complete: bool,
}

impl Session {
    /// Create a fresh session in room 1 with the given content.
    pub fn first_room(user_id: i64, room: RoomContent) -> Self {
        Self {
            user_id,
            room_number: 1,
            description: room.description,
            buggy_snippet: room.buggy_snippet,
            correct_snippet: room.correct_snippet,
            attempts: 0,
            is_complete: false,
        }
    }

    /// Move to the next room, replacing the content triple as a whole and
    /// resetting the attempt counter.
    pub fn advance(&mut self, room: RoomContent) {
        self.room_number += 1;
        self.attempts = 0;
        self.description = room.description;
        self.buggy_snippet = room.buggy_snippet;
        self.correct_snippet = room.correct_snippet;
    }

    /// Whether this session still accepts submissions.
    pub fn is_active(&self) -> bool {
        !self.is_complete
    }
}

/// In-memory session mapping, shared across dispatcher tasks.
#[derive(Clone, Default)]
pub struct Sessions {
    inner: Arc<RwLock<HashMap<i64, Session>>>,
}

impl Sessions {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mapping from recovered state.
    pub fn from_map(map: HashMap<i64, Session>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Get a session by user id.
    pub async fn get(&self, user_id: i64) -> Option<Session> {
        let sessions = self.inner.read().await;
        sessions.get(&user_id).cloned()
    }

    /// Insert or replace a session.
    pub async fn insert(&self, session: Session) {
        let mut sessions = self.inner.write().await;
        sessions.insert(session.user_id, session);
    }

    /// Remove a session, returning it if one existed.
    pub async fn remove(&self, user_id: i64) -> Option<Session> {
        let mut sessions = self.inner.write().await;
        sessions.remove(&user_id)
    }

    /// Clone the full mapping for persistence.
    pub async fn snapshot(&self) -> HashMap<i64, Session> {
        let sessions = self.inner.read().await;
        sessions.clone()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        let sessions = self.inner.read().await;
        sessions.len()
    }
}
