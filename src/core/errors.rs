//! Custom error types for translation operations

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Provider is throttling or temporarily unavailable
    #[error("Transient provider error: {message}")]
    Transient {
        message: String,
    },

    /// Provider rejected the request itself
    #[error("Fatal provider error: {message}")]
    Fatal {
        message: String,
    },

    /// Transient failures survived every allowed attempt
    #[error("Retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        attempts: u32,
        last_error: Box<TranslationError>,
    },

    /// Nothing to translate
    #[error("Text cannot be empty")]
    EmptyInput,

    /// API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// A chunk failed under the abort policy
    #[error("Translation failed for chunk {}: {source}", .index + 1)]
    ChunkFailed {
        index: usize,
        source: Box<TranslationError>,
    },

    /// Batch exceeds the configured size
    #[error("Maximum {max} texts allowed per batch, got {len}")]
    BatchTooLarge {
        len: usize,
        max: usize,
    },

    /// Language name or code not in the table
    #[error("Unsupported language: {language}")]
    UnsupportedLanguage {
        language: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Phrases providers use when throttling or overloaded
fn transient_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)\b429\b|rate[ _-]?limit|too many requests|quota exceeded|resource[ _]exhausted|server (is )?busy|overloaded|temporarily unavailable|service unavailable|timed? ?out",
        )
        .expect("transient error pattern is valid")
    })
}

impl TranslationError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            TranslationError::Transient { .. }
            | TranslationError::NetworkError { .. }
            | TranslationError::TimeoutError => true,
            TranslationError::ApiError { status, message } => {
                matches!(status, 408 | 429 | 500..=599) || transient_pattern().is_match(message)
            }
            TranslationError::HttpError(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map_or(false, |s| s.as_u16() == 429 || s.is_server_error())
            }
            TranslationError::InternalError(message) => transient_pattern().is_match(message),
            _ => false,
        }
    }

    /// Build a provider error from an HTTP status and body
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        TranslationError::ApiError {
            status,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;
