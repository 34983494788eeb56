//! HTTP API server implementation

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::client::ChunkedTranslator;
use crate::core::errors::TranslationError;
use crate::core::models::{
    AggregateResult, AggregateStatus, BatchItem, BatchTranslationRequest, Chunk, TranslationRequest,
};
use crate::core::rate_limiter::RateLimitStatus;
use crate::utils::languages;

/// Application state
#[derive(Clone)]
pub struct AppState {
    translator: Arc<ChunkedTranslator>,
}

impl AppState {
    pub fn new(translator: Arc<ChunkedTranslator>) -> Self {
        Self { translator }
    }
}

/// Health check response
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    service: String,
    version: String,
    provider: String,
}

#[derive(Serialize)]
struct LanguagesResponse {
    languages: Vec<&'static str>,
    total_count: usize,
}

#[derive(Serialize)]
struct RateLimitStatusResponse {
    checked_at: String,
    provider: String,
    #[serde(flatten)]
    status: RateLimitStatus,
}

/// Live check of the configured backend
#[derive(Debug, Serialize)]
pub struct TestTranslationResponse {
    pub success: bool,
    pub test_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub message: String,
}

/// Sentence sent by the live check
const TEST_TEXT: &str = "Hello, how are you today?";

/// A chunk that kept its original text
#[derive(Debug, Serialize)]
pub struct FailedChunk {
    pub index: usize,
    pub reason: String,
}

/// Common envelope for one translated text
#[derive(Debug, Serialize)]
pub struct TranslationResponse {
    pub success: bool,
    pub translated_text: String,
    pub source_lang: String,
    pub target_lang: String,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AggregateStatus>,
    pub chunks: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_chunks: Vec<FailedChunk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TranslationResponse {
    fn from_result(source_lang: &str, target_lang: &str, provider: &str, result: AggregateResult) -> Self {
        let failed_chunks: Vec<FailedChunk> = result
            .failures()
            .into_iter()
            .map(|(index, reason)| FailedChunk {
                index,
                reason: reason.to_string(),
            })
            .collect();

        let message = (!failed_chunks.is_empty()).then(|| {
            format!(
                "{} of {} chunks could not be translated and were left in the original language",
                failed_chunks.len(),
                result.outcomes.len()
            )
        });

        Self {
            success: result.is_success(),
            translated_text: result.text,
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            provider: provider.to_string(),
            status: Some(result.status),
            chunks: result.outcomes.len(),
            failed_chunks,
            message,
        }
    }

    fn failed(source_lang: &str, target_lang: &str, provider: &str, reason: &str) -> Self {
        Self {
            success: false,
            translated_text: String::new(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            provider: provider.to_string(),
            status: Some(AggregateStatus::AllFailed),
            chunks: 0,
            failed_chunks: Vec::new(),
            message: Some(format!("Translation failed: {}", reason)),
        }
    }
}

/// Batch envelope
#[derive(Debug, Serialize)]
pub struct BatchTranslationResponse {
    pub success: bool,
    pub translations: Vec<TranslationResponse>,
    pub total_texts: usize,
    pub successful_translations: usize,
    pub status: AggregateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(err: impl ToString) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: ErrorDetail {
                message: err.to_string(),
                code: Some("invalid_request".to_string()),
                r#type: Some("invalid_request_error".to_string()),
            },
        }),
    )
}

/// Service information
async fn root(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let config = state.translator.config();
    Json(serde_json::json!({
        "message": "Rate-limited multi-language translator API",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.translator.backend_name(),
        "max_chunk_size": config.max_chunk_size,
        "max_batch_size": config.max_batch_size,
        "failure_policy": config.failure_policy,
        "budgets": config.budgets,
    }))
}

/// Health check handler
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        provider: state.translator.backend_name().to_string(),
    })
}

async fn get_languages() -> Json<LanguagesResponse> {
    let languages = languages::supported();
    Json(LanguagesResponse {
        total_count: languages.len(),
        languages,
    })
}

async fn rate_limit_status(State(state): State<Arc<AppState>>) -> Json<RateLimitStatusResponse> {
    Json(RateLimitStatusResponse {
        checked_at: chrono::Utc::now().to_rfc3339(),
        provider: state.translator.backend_name().to_string(),
        status: state.translator.controller().status().await,
    })
}

/// Single text translation handler
async fn translate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TranslationRequest>,
) -> Result<Json<TranslationResponse>, ApiError> {
    if payload.text.trim().is_empty() {
        return Err(bad_request(TranslationError::EmptyInput));
    }

    let source = languages::resolve_source(&payload.source_lang).map_err(bad_request)?;
    let target = languages::resolve_target(&payload.target_lang).map_err(bad_request)?;
    let provider = state.translator.backend_name();

    let response = match state.translator.translate(&payload.text, source, target).await {
        Ok(result) => {
            TranslationResponse::from_result(&payload.source_lang, &payload.target_lang, provider, result)
        }
        Err(e) => {
            warn!("Translation failed: {}", e);
            TranslationResponse::failed(&payload.source_lang, &payload.target_lang, provider, &e.to_string())
        }
    };

    Ok(Json(response))
}

/// Batch translation handler
async fn translate_batch(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<BatchTranslationRequest>,
) -> Result<Json<BatchTranslationResponse>, ApiError> {
    let max = state.translator.config().max_batch_size;
    if payload.texts.is_empty() {
        return Err(bad_request("Texts list cannot be empty"));
    }
    if payload.texts.len() > max {
        return Err(bad_request(TranslationError::BatchTooLarge {
            len: payload.texts.len(),
            max,
        }));
    }
    if payload.texts.iter().any(|t| t.trim().is_empty()) {
        return Err(bad_request(TranslationError::EmptyInput));
    }

    let source = languages::resolve_source(&payload.source_lang).map_err(bad_request)?;
    let target = languages::resolve_target(&payload.target_lang).map_err(bad_request)?;
    let provider = state.translator.backend_name();

    let batch = state
        .translator
        .translate_batch(&payload.texts, source, target)
        .await
        .map_err(bad_request)?;

    let successful = batch.successful();
    let status = batch.status;
    let translations: Vec<TranslationResponse> = batch
        .items
        .into_iter()
        .map(|item| match item {
            BatchItem::Completed(result) => TranslationResponse::from_result(
                &payload.source_lang,
                &payload.target_lang,
                provider,
                result,
            ),
            BatchItem::Failed { reason } => {
                TranslationResponse::failed(&payload.source_lang, &payload.target_lang, provider, &reason)
            }
        })
        .collect();

    let message = (status != AggregateStatus::AllSucceeded).then(|| {
        format!(
            "{} of {} texts translated successfully",
            successful,
            translations.len()
        )
    });

    Ok(Json(BatchTranslationResponse {
        success: status == AggregateStatus::AllSucceeded,
        total_texts: translations.len(),
        successful_translations: successful,
        translations,
        status,
        message,
    }))
}

/// Send a fixed sentence through the admission controller and the real backend
async fn test_translation(State(state): State<Arc<AppState>>) -> Json<TestTranslationResponse> {
    let translator = &state.translator;
    let chunk = Chunk {
        index: 0,
        text: TEST_TEXT.to_string(),
        trailing: String::new(),
    };

    let result = translator.translate_chunk(&chunk, "en", "es").await;
    let (success, translated_text, message) = match result {
        Ok(text) => (true, Some(text), "Test translation successful".to_string()),
        Err(e) => {
            warn!("Test translation failed: {}", e);
            (false, None, format!("Test translation failed: {}", e))
        }
    };

    Json(TestTranslationResponse {
        success,
        test_text: TEST_TEXT.to_string(),
        translated_text,
        source_lang: "English".to_string(),
        target_lang: "Spanish".to_string(),
        provider: translator.backend_name().to_string(),
        model: translator.backend_model().map(str::to_string),
        message,
    })
}

/// Build the router around shared state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/languages", get(get_languages))
        .route("/rate-limit-status", get(rate_limit_status))
        .route("/translate", post(translate))
        .route("/translate_batch", post(translate_batch))
        .route("/test-translation", get(test_translation))
        .with_state(state)
}

/// Run the HTTP server
pub async fn run_server(host: String, port: u16) -> anyhow::Result<()> {
    // One translator, and so one controller, for every request
    let translator = Arc::new(ChunkedTranslator::from_env()?);
    let state = Arc::new(AppState::new(translator));
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
