//! LibreTranslate backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{non_empty, read_body, transport_error, TranslationBackend};
use crate::core::errors::{Result, TranslationError};

const DEFAULT_ENDPOINT: &str = "https://libretranslate.com";

/// Self-hosted or public LibreTranslate instance
#[derive(Debug, Clone)]
pub struct LibreTranslateBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: Option<String>,
    error: Option<String>,
}

impl LibreTranslateBackend {
    pub fn new(client: reqwest::Client, endpoint: Option<String>, api_key: Option<String>) -> Self {
        let endpoint = endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl TranslationBackend for LibreTranslateBackend {
    fn name(&self) -> &str {
        "libre"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let request = LibreRequest {
            q: text,
            source,
            target,
            format: "text",
            api_key: self.api_key.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/translate", self.endpoint))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let body = read_body(response).await?;
        parse_response(&body)
    }
}

pub fn parse_response(body: &str) -> Result<String> {
    let response: LibreResponse = serde_json::from_str(body)?;
    match (response.translated_text, response.error) {
        (Some(text), _) => non_empty(text),
        (None, Some(error)) => Err(TranslationError::Fatal { message: error }),
        (None, None) => Err(TranslationError::InvalidResponseError {
            message: "Missing translatedText".to_string(),
        }),
    }
}
