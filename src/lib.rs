//! Throttled Translator - rate-limited, chunking translation relay
//!
//! This library gates every outbound translation call through a sliding-window
//! admission controller, splits long text into provider-sized chunks, retries
//! throttled chunks with backoff, and reassembles the output in order. Backends
//! for Google, LibreTranslate, OpenAI and Gemini plus an HTTP API sit around it.

#![forbid(unsafe_code)]

pub mod core;
pub mod providers;
pub mod server;
pub mod cli;
pub mod utils;

// Re-export key types for convenience
pub use crate::core::{
    chunker::TextSplitter,
    client::ChunkedTranslator,
    config::TranslatorConfig,
    models::{
        AggregateResult, AggregateStatus, BatchResult, Chunk, FailurePolicy, ProviderKind,
        RateBudget, TranslationRequest,
    },
    errors::TranslationError,
    rate_limiter::AdmissionController,
};

pub use crate::providers::TranslationBackend;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
