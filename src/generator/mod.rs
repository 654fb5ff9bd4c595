//! Content generation for castle rooms.
//!
//! The generator is an opaque external collaborator: one call, one attempt,
//! a structured result or a [`GenerationError`]. Retries are the caller's
//! decision, never hidden here.

mod error;
mod groq;
mod prompts;

pub use error::GenerationError;
pub use groq::GroqGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Content for a single generated room.
///
/// The field names double as the JSON keys the generator is instructed to
/// produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomContent {
    pub description: String,
    pub buggy_snippet: String,
    pub correct_snippet: String,
}

impl RoomContent {
    /// Reject rooms with any empty field.
    pub fn validate(self) -> Result<Self, GenerationError> {
        for (field, value) in [
            ("description", &self.description),
            ("buggy_snippet", &self.buggy_snippet),
            ("correct_snippet", &self.correct_snippet),
        ] {
            if value.trim().is_empty() {
                return Err(GenerationError::InvalidRoom(format!("empty field: {field}")));
            }
        }
        Ok(self)
    }
}

/// External room content generator.
///
/// Implementations perform exactly one attempt per call, bounded by their
/// own transport timeout.
#[async_trait]
pub trait RoomGenerator: Send + Sync {
    /// Generate the content for `room_number`.
    ///
    /// `prior` is the previous room's content, passed so the generator can
    /// vary its challenges; it is `None` for room 1.
    async fn generate_room(
        &self,
        room_number: u32,
        prior: Option<&RoomContent>,
    ) -> Result<RoomContent, GenerationError>;

    /// Generate a hint for the given room without revealing the solution.
    async fn generate_hint(&self, room: &RoomContent) -> Result<String, GenerationError>;
}
