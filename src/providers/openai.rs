//! OpenAI chat completions backend

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{non_empty, read_body, transport_error, translation_prompt, TranslationBackend};
use crate::core::errors::{Result, TranslationError};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
const SYSTEM_PROMPT: &str = "You are a professional translator. Translate accurately and naturally.";

/// OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(
        client: reqwest::Client,
        endpoint: Option<String>,
        api_key: String,
        model: Option<String>,
    ) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl TranslationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": translation_prompt(text, source, target)}
            ],
            "max_tokens": 4000,
            "temperature": 0.3
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let body = read_body(response).await?;
        parse_response(&body)
    }
}

pub fn parse_response(body: &str) -> Result<String> {
    let json: Value = serde_json::from_str(body)?;

    if let Some(tokens) = json["usage"]["total_tokens"].as_u64() {
        debug!("OpenAI translation used {} tokens", tokens);
    }

    let content = json["choices"]
        .get(0)
        .and_then(|c| c["message"]["content"].as_str())
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "No translation in response".to_string(),
        })?;

    non_empty(content.to_string())
}
