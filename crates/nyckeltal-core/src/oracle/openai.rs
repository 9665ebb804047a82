use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{Oracle, OracleError};
use crate::error::NyckeltalError;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            temperature: 0.5,
            timeout_secs: 120,
        }
    }
}

/// Blocking HTTP client for `/chat/completions`.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    temperature: f32,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl OpenAiClient {
    pub fn new(config: &OracleConfig, api_key: &str) -> Result<Self, NyckeltalError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NyckeltalError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    /// Build a client with the key taken from `OPENAI_API_KEY`.
    pub fn from_env(config: &OracleConfig) -> Result<Self, NyckeltalError> {
        let key = std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NyckeltalError::Config(format!("{API_KEY_ENV} is not set")))?;
        Self::new(config, &key)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl Oracle for OpenAiClient {
    fn call(
        &self,
        system_prompt: &str,
        user_text: &str,
        model: &str,
    ) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_text,
                },
            ],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    OracleError::Connection(self.base_url.clone())
                } else {
                    OracleError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        reply_text(parsed)
    }
}

fn classify_status(status: u16, body: String) -> OracleError {
    match status {
        429 => OracleError::RateLimited,
        401 | 403 => OracleError::Unauthorized(status),
        408 | 504 => OracleError::Timeout(0),
        _ => OracleError::Api { status, body },
    }
}

fn reply_text(parsed: ChatResponse) -> Result<String, OracleError> {
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| OracleError::Malformed("response has no choices".into()))?;

    match choice.finish_reason.as_deref() {
        None | Some("stop") => {}
        Some(other) => {
            return Err(OracleError::Truncated {
                finish_reason: other.to_string(),
            })
        }
    }

    let content = choice
        .message
        .content
        .ok_or_else(|| OracleError::Malformed("response has no message content".into()))?;
    tracing::debug!(chars = content.len(), "oracle reply received");
    Ok(content.trim().to_string())
}
