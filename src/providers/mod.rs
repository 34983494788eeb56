//! Translation backends behind a common async trait

pub mod gemini;
pub mod google;
pub mod libre;
pub mod openai;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::ProviderKind;
use crate::utils::languages::{self, AUTO};

pub use gemini::GeminiBackend;
pub use google::GoogleWebBackend;
pub use libre::LibreTranslateBackend;
pub use openai::OpenAiBackend;

/// A remote translation capability
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Short provider name for logs and responses
    fn name(&self) -> &str;

    /// Model behind the backend, for providers that have one
    fn model(&self) -> Option<&str> {
        None
    }

    /// Translate `text` from `source` to `target` language codes
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String>;
}

/// Build the backend selected by `config`
pub fn build_backend(config: &TranslatorConfig) -> Result<Arc<dyn TranslationBackend>> {
    let client = http_client(config.timeout())?;
    let endpoint = config.api_endpoint.clone();
    let model = config.model.clone();

    let backend: Arc<dyn TranslationBackend> = match config.provider {
        ProviderKind::Google => Arc::new(GoogleWebBackend::new(client, endpoint)),
        ProviderKind::Libre => Arc::new(LibreTranslateBackend::new(
            client,
            endpoint,
            config.api_key.clone(),
        )),
        ProviderKind::OpenAi => Arc::new(OpenAiBackend::new(
            client,
            endpoint,
            required_key(config)?,
            model,
        )),
        ProviderKind::Gemini => Arc::new(GeminiBackend::new(
            client,
            endpoint,
            required_key(config)?,
            model,
        )),
    };

    info!("Using {} translation backend", backend.name());
    Ok(backend)
}

fn required_key(config: &TranslatorConfig) -> Result<String> {
    config
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| TranslationError::ConfigError {
            message: format!("API key is required for provider {}", config.provider),
        })
}

/// Shared HTTP client with the configured timeout
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(30)))
        .pool_max_idle_per_host(10)
        .build()?;
    Ok(client)
}

/// Map transport failures onto the error taxonomy
pub(crate) fn transport_error(err: reqwest::Error) -> TranslationError {
    if err.is_timeout() {
        TranslationError::TimeoutError
    } else if err.is_connect() || err.is_request() {
        TranslationError::NetworkError {
            message: err.to_string(),
        }
    } else {
        TranslationError::HttpError(err)
    }
}

/// Read a response body, turning non-2xx statuses into `ApiError`
pub(crate) async fn read_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;
    if status.is_success() {
        Ok(body)
    } else {
        Err(TranslationError::from_status(status.as_u16(), body))
    }
}

/// Instruction prompt for LLM-backed providers
pub(crate) fn translation_prompt(text: &str, source: &str, target: &str) -> String {
    let target_name = languages::name_for(target).unwrap_or(target);
    let instruction = if source.eq_ignore_ascii_case(AUTO) {
        format!("Translate the following text to {}.", target_name)
    } else {
        let source_name = languages::name_for(source).unwrap_or(source);
        format!("Translate the following text from {} to {}.", source_name, target_name)
    };

    format!(
        "{}\nMaintain the original meaning, tone, and style.\nOnly return the translated text, nothing else.\n\nText to translate: {}",
        instruction, text
    )
}

/// Reject blank provider output
pub(crate) fn non_empty(text: String) -> Result<String> {
    let text = text.trim().to_string();
    if text.is_empty() {
        Err(TranslationError::InvalidResponseError {
            message: "No translation in response".to_string(),
        })
    } else {
        Ok(text)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory backend for pipeline tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    type Rule = Box<dyn Fn(&str, u32) -> Result<String> + Send + Sync>;

    /// Backend whose replies come from a closure of (text, call number)
    pub struct ScriptedBackend {
        rule: Rule,
        delays: Mutex<VecDeque<Duration>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        pub fn new(rule: impl Fn(&str, u32) -> Result<String> + Send + Sync + 'static) -> Self {
            Self {
                rule: Box::new(rule),
                delays: Mutex::new(VecDeque::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Uppercases every input
        pub fn uppercase() -> Self {
            Self::new(|text, _| Ok(text.to_uppercase()))
        }

        /// Per-call latencies, consumed in order
        pub fn with_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
            *self.delays.lock().unwrap() = delays.into_iter().collect();
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> u32 {
            self.calls.lock().unwrap().len() as u32
        }
    }

    #[async_trait]
    impl TranslationBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String> {
            let delay = self.delays.lock().unwrap().pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let call = {
                let mut calls = self.calls.lock().unwrap();
                calls.push(text.to_string());
                calls.len() as u32
            };
            (self.rule)(text, call)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_languages() {
        let prompt = translation_prompt("Hola", "es", "en");
        assert!(prompt.starts_with("Translate the following text from Spanish to English."));
        assert!(prompt.ends_with("Text to translate: Hola"));

        let prompt = translation_prompt("Hola", "auto", "de");
        assert!(prompt.starts_with("Translate the following text to German."));
    }

    #[test]
    fn test_blank_output_is_invalid() {
        assert!(non_empty("  \n".to_string()).is_err());
        assert_eq!(non_empty(" Bonjour ".to_string()).unwrap(), "Bonjour");
    }

    #[test]
    fn test_build_backend_requires_key_for_llms() {
        let config = TranslatorConfig {
            provider: ProviderKind::Gemini,
            ..Default::default()
        };
        assert!(build_backend(&config).is_err());

        let config = TranslatorConfig::default();
        assert_eq!(build_backend(&config).unwrap().name(), "google");
    }
}
