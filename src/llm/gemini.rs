//! Gemini `generateContent` client

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Message, Role, TextCompletion};
use crate::config::LlmConfig;
use crate::{Error, Result};

/// Gemini REST client
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GeminiClient {
    /// Create a client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.resolve_api_key();
        if api_key.is_empty() {
            return Err(Error::Config(
                "No LLM API key configured (set llm.api_key or GEMINI_API_KEY)".to_string(),
            ));
        }

        let mut key = HeaderValue::from_str(&api_key)
            .map_err(|_| Error::Config("Invalid LLM API key format".to_string()))?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", key);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    fn build_request(&self, messages: &[Message]) -> GenerateRequest {
        let system: Vec<Part> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| Part {
                text: m.content.clone(),
            })
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(
                    match m.role {
                        Role::Assistant => "model",
                        _ => "user",
                    }
                    .to_string(),
                ),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        GenerateRequest {
            system_instruction: (!system.is_empty()).then_some(Content {
                role: None,
                parts: system,
            }),
            contents,
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        }
    }

    fn extract_text(response: GenerateResponse) -> Option<String> {
        let text: String = response
            .candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[async_trait]
impl TextCompletion for GeminiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = self.build_request(messages);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(format!("LLM model '{}'", self.model))
                } else {
                    Error::Llm(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Llm(format!(
                "Gemini returned {}: {}",
                status,
                error_text.chars().take(500).collect::<String>()
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Llm(format!("Failed to parse response: {e}")))?;

        let text = Self::extract_text(parsed)
            .ok_or_else(|| Error::Llm("No response from Gemini API".to_string()))?;
        debug!(model = %self.model, chars = text.len(), "LLM completion received");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
