//! Common test utilities.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use bugcastle::generator::{GenerationError, RoomContent, RoomGenerator};

/// Generator that replays a script of canned results.
///
/// Each call consumes the next entry; an exhausted script answers with an
/// API failure so a test that over-consumes fails loudly.
pub struct ScriptedGenerator {
    rooms: Mutex<VecDeque<Result<RoomContent, GenerationError>>>,
    hints: Mutex<VecDeque<Result<String, GenerationError>>>,
}

impl ScriptedGenerator {
    pub fn new(
        rooms: Vec<Result<RoomContent, GenerationError>>,
        hints: Vec<Result<String, GenerationError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: Mutex::new(rooms.into()),
            hints: Mutex::new(hints.into()),
        })
    }
}

#[async_trait]
impl RoomGenerator for ScriptedGenerator {
    async fn generate_room(
        &self,
        _room_number: u32,
        _prior: Option<&RoomContent>,
    ) -> Result<RoomContent, GenerationError> {
        self.rooms
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(exhausted()))
    }

    async fn generate_hint(&self, _room: &RoomContent) -> Result<String, GenerationError> {
        self.hints
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(exhausted()))
    }
}

fn exhausted() -> GenerationError {
    GenerationError::Api {
        status: 503,
        message: "script exhausted".to_string(),
    }
}

/// Canned content for room `n`.
pub fn room(n: u32) -> RoomContent {
    RoomContent {
        description: format!("a haunted hall numbered {n}"),
        buggy_snippet: format!("ghosts = {n}\nprint(ghsts)"),
        correct_snippet: format!("ghosts = {n}\nprint(ghosts)"),
    }
}

/// A generic generation failure.
pub fn gen_failure() -> GenerationError {
    GenerationError::Api {
        status: 500,
        message: "the castle shudders".to_string(),
    }
}
