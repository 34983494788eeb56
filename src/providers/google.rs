//! Google's unofficial web translation endpoint

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{non_empty, read_body, transport_error, TranslationBackend};
use crate::core::errors::{Result, TranslationError};

const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Keyless `client=gtx` endpoint; throttles aggressively without telling you
#[derive(Debug, Clone)]
pub struct GoogleWebBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleWebBackend {
    pub fn new(client: reqwest::Client, endpoint: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        }
    }
}

#[async_trait]
impl TranslationBackend for GoogleWebBackend {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        debug!("Google request: {} chars, {} -> {}", text.chars().count(), source, target);

        let response = self
            .client
            .get(&self.endpoint)
            .header("User-Agent", USER_AGENT)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let body = read_body(response).await?;
        parse_response(&body)
    }
}

/// Join the translated segments of `[[["seg", "orig", ...], ...], ...]`
pub fn parse_response(body: &str) -> Result<String> {
    let json: Value = serde_json::from_str(body).map_err(|e| TranslationError::InvalidResponseError {
        message: format!("Google response is not JSON: {}", e),
    })?;

    let segments = json
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "Google response has no segments".to_string(),
        })?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    non_empty(translated)
}
