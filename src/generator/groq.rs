//! Groq room generator using the OpenAI-compatible chat completions API.

use reqwest::Client;

use async_trait::async_trait;

use super::error::GenerationError;
use super::prompts::{hint_request, room_request, HINT_SYSTEM_PROMPT, ROOM_SYSTEM_PROMPT};
use super::{RoomContent, RoomGenerator};

/// Room generator backed by Groq's chat completions endpoint.
///
/// The injected [`Client`] carries the request timeout; a timed-out call
/// surfaces as [`GenerationError::Request`] rather than hanging.
pub struct GroqGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GroqGenerator {
    #[must_use]
    pub fn new(
        client: Client,
        api_key: String,
        base_url: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
            temperature,
            max_tokens,
        }
    }

    /// Perform one chat completion call and return the message content.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: String,
        json_mode: bool,
    ) -> Result<String, GenerationError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = Request {
            model: &self.model,
            messages: vec![
                RequestMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                RequestMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: json_mode.then_some(ResponseFormat {
                format: "json_object",
            }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api { status, message });
        }

        let body = response.text().await?;
        let completion: Response = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| {
                GenerationError::MalformedResponse("no message content in completion".to_string())
            })
    }
}

#[async_trait]
impl RoomGenerator for GroqGenerator {
    async fn generate_room(
        &self,
        room_number: u32,
        prior: Option<&RoomContent>,
    ) -> Result<RoomContent, GenerationError> {
        let content = self
            .complete(ROOM_SYSTEM_PROMPT, room_request(room_number, prior), true)
            .await?;

        let room: RoomContent = serde_json::from_str(&content)
            .map_err(|e| GenerationError::InvalidRoom(e.to_string()))?;
        room.validate()
    }

    async fn generate_hint(&self, room: &RoomContent) -> Result<String, GenerationError> {
        let hint = self
            .complete(HINT_SYSTEM_PROMPT, hint_request(room), false)
            .await?;
        Ok(hint.trim().to_string())
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(serde::Serialize)]
struct Request<'a> {
    model: &'a str,
    messages: Vec<RequestMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(serde::Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(serde::Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format: &'static str,
}

#[derive(serde::Deserialize)]
struct Response {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(serde::Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
