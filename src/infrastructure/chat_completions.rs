//! Chat-completions generation client (OpenAI-compatible API)
//!
//! The whole rendered prompt goes out as a single user message, framed by the
//! preamble and ending with the speaker's name so the model continues as that
//! speaker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{GenerationSettings, LlmConfig};
use crate::application::ports::outbound::{GenerationBackend, GenerationError};

/// Client for any OpenAI-compatible chat-completions endpoint
#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: Client,
    api_url: String,
    api_token: String,
    model: String,
    settings: GenerationSettings,
}

impl ChatCompletionsClient {
    pub fn new(config: &LlmConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            model: config.model.clone(),
            settings: config.generation.clone(),
        }
    }

    fn build_request(&self, prompt: &str, role_label: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: frame_prompt(&self.settings.preamble, prompt, role_label),
            }],
            temperature: self.settings.temperature,
            top_p: self.settings.top_p,
            top_k: self.settings.top_k,
            repetition_penalty: self.settings.repetition_penalty,
            max_tokens: self.settings.max_tokens,
            frequency_penalty: self.settings.frequency_penalty,
            presence_penalty: self.settings.presence_penalty,
            stop: self.settings.stop.clone(),
        }
    }
}

#[async_trait]
impl GenerationBackend for ChatCompletionsClient {
    async fn generate(&self, prompt: &str, role_label: &str) -> Result<String, GenerationError> {
        let request = self.build_request(prompt, role_label);
        debug!(url = %self.api_url, model = %self.model, "Sending generation request");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .map_err(|e| GenerationError::RequestFailed(e.to_string()))?;
            return Err(GenerationError::RequestFailed(format!("{}: {}", status, error_text)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        first_choice(body)
    }
}

fn frame_prompt(preamble: &str, prompt: &str, role_label: &str) -> String {
    format!("\n{}\n***\n{}\n{}:", preamble, prompt, role_label)
}

fn first_choice(body: ChatResponse) -> Result<String, GenerationError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| GenerationError::InvalidResponse("No content in the response".to_string()))
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repetition_penalty: f32,
    max_tokens: u32,
    frequency_penalty: f32,
    presence_penalty: f32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
