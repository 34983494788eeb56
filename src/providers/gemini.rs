//! Gemini generateContent backend

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{non_empty, read_body, transport_error, translation_prompt, TranslationBackend};
use crate::core::errors::{Result, TranslationError};

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini `generateContent` with a translation prompt
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
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
impl TranslationBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let body = json!({
            "contents": [{"parts": [{"text": translation_prompt(text, source, target)}]}],
            "generationConfig": {
                "temperature": 0.3,
                "topP": 0.8,
                "topK": 40,
                "maxOutputTokens": 2048
            }
        });

        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.endpoint, self.model))
            .query(&[("key", self.api_key.as_str())])
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

    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(TranslationError::Fatal {
            message: format!("Gemini blocked the prompt: {}", reason),
        });
    }

    let text: String = json["candidates"]
        .get(0)
        .and_then(|c| c["content"]["parts"].as_array())
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "No candidates in response".to_string(),
        })?
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    non_empty(text)
}
