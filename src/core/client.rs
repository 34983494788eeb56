//! Chunked translation pipeline with admission control and retry

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::core::chunker::TextSplitter;
use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::{
    AggregateResult, AttemptOutcome, BatchItem, BatchResult, Chunk, ChunkOutcome, ChunkState,
    FailurePolicy, TranslationAttempt,
};
use crate::core::rate_limiter::AdmissionController;
use crate::providers::{self, TranslationBackend};

/// Translates long text chunk by chunk through a shared admission controller
#[derive(Clone)]
pub struct ChunkedTranslator {
    backend: Arc<dyn TranslationBackend>,
    controller: Arc<AdmissionController>,
    splitter: TextSplitter,
    config: Arc<TranslatorConfig>,
}

impl fmt::Debug for ChunkedTranslator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChunkedTranslator")
            .field("backend", &self.backend.name())
            .field("controller", &self.controller)
            .field("splitter", &self.splitter)
            .finish()
    }
}

impl ChunkedTranslator {
    /// Create a translator around an explicitly shared controller
    pub fn new(
        config: TranslatorConfig,
        backend: Arc<dyn TranslationBackend>,
        controller: Arc<AdmissionController>,
    ) -> Result<Self> {
        config.validate()?;

        let splitter = TextSplitter::new(config.max_chunk_size, config.sentence_delimiter.clone());

        Ok(Self {
            backend,
            controller,
            splitter,
            config: Arc::new(config),
        })
    }

    /// Build backend and controller from configuration
    pub fn from_config(config: TranslatorConfig) -> Result<Self> {
        let backend = providers::build_backend(&config)?;
        let controller = Arc::new(AdmissionController::new(config.budgets.iter().copied())?);
        Self::new(config, backend, controller)
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = TranslatorConfig::load()?;
        Self::from_config(config)
    }

    pub fn controller(&self) -> &Arc<AdmissionController> {
        &self.controller
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn backend_model(&self) -> Option<&str> {
        self.backend.model()
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Split text with the configured chunk size and delimiter
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        self.splitter.split(text)
    }

    /// Translate one chunk, retrying transient failures with backoff
    pub async fn translate_chunk(&self, chunk: &Chunk, source: &str, target: &str) -> Result<String> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut state = ChunkState::Pending;
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.controller.block_until_admitted().await;
            state = advance(chunk.index, state, ChunkState::InFlight);

            let content = chunk.text.trim_start();
            let result = self
                .backend
                .translate(content, source, target)
                .await
                .and_then(|translated| reject_unchanged(content, translated, source, target));

            let record = TranslationAttempt {
                chunk_index: chunk.index,
                attempt_number: attempt,
                outcome: match &result {
                    Ok(text) => AttemptOutcome::Success(text.clone()),
                    Err(e) if e.is_transient() => AttemptOutcome::TransientFailure(e.to_string()),
                    Err(e) => AttemptOutcome::FatalFailure(e.to_string()),
                },
            };
            debug!("{:?}", record);

            match result {
                Ok(text) => {
                    advance(chunk.index, state, ChunkState::Succeeded);
                    if attempt > 1 {
                        info!("Chunk {} translated after {} attempts", chunk.index + 1, attempt);
                    }
                    return Ok(text);
                }
                Err(err) if err.is_transient() => {
                    if attempt >= max_attempts {
                        advance(chunk.index, state, ChunkState::Exhausted);
                        warn!("Chunk {} exhausted {} attempts: {}", chunk.index + 1, attempt, err);
                        return Err(TranslationError::RetriesExhausted {
                            attempts: attempt,
                            last_error: Box::new(err),
                        });
                    }

                    state = advance(chunk.index, state, ChunkState::TransientlyFailed);
                    let delay = backoff_delay(self.config.base_backoff(), attempt);
                    warn!(
                        "Chunk {} attempt {} failed: {}, retrying in {:?}",
                        chunk.index + 1,
                        attempt,
                        err,
                        delay
                    );
                    sleep(delay).await;
                }
                Err(err) => {
                    advance(chunk.index, state, ChunkState::FatallyFailed);
                    warn!("Chunk {} failed: {}", chunk.index + 1, err);
                    return Err(err);
                }
            }
        }
    }

    /// Split, translate every chunk in order, and reassemble
    pub async fn translate_long_text(
        &self,
        text: &str,
        source: &str,
        target: &str,
        policy: FailurePolicy,
    ) -> Result<AggregateResult> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        let chunks = self.split(text);
        if chunks.len() > 1 {
            info!(
                "Translating {} chars in {} chunks ({} -> {})",
                text.chars().count(),
                chunks.len(),
                source,
                target
            );
        }

        let mut outcomes = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            if chunk.index > 0 {
                sleep(self.config.inter_chunk_delay()).await;
            }

            debug!(
                "Translating chunk {}/{} (length: {})",
                chunk.index + 1,
                chunks.len(),
                chunk.text.chars().count()
            );

            match self.translate_chunk(chunk, source, target).await {
                Ok(translated) => outcomes.push(ChunkOutcome::Translated {
                    index: chunk.index,
                    text: translated,
                }),
                Err(err) => match policy {
                    FailurePolicy::Abort => {
                        return Err(TranslationError::ChunkFailed {
                            index: chunk.index,
                            source: Box::new(err),
                        });
                    }
                    FailurePolicy::BestEffort => outcomes.push(ChunkOutcome::Failed {
                        index: chunk.index,
                        original: chunk.text.clone(),
                        reason: err.to_string(),
                    }),
                },
            }
        }

        let result = AggregateResult::assemble(&chunks, outcomes);
        if !result.is_success() {
            warn!(
                "Translation finished with status {} ({} of {} chunks failed)",
                result.status,
                result.failures().len(),
                chunks.len()
            );
        }
        Ok(result)
    }

    /// Translate with the configured failure policy
    pub async fn translate(&self, text: &str, source: &str, target: &str) -> Result<AggregateResult> {
        self.translate_long_text(text, source, target, self.config.failure_policy)
            .await
    }

    /// Translate several texts in order; one failure never aborts the rest
    pub async fn translate_batch(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> Result<BatchResult> {
        if texts.is_empty() {
            return Err(TranslationError::EmptyInput);
        }
        if texts.len() > self.config.max_batch_size {
            return Err(TranslationError::BatchTooLarge {
                len: texts.len(),
                max: self.config.max_batch_size,
            });
        }

        let mut items = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            if i > 0 {
                sleep(self.config.inter_item_delay()).await;
            }

            let item = match self.translate(text, source, target).await {
                Ok(result) => BatchItem::Completed(result),
                Err(err) => {
                    warn!("Batch item {} failed: {}", i + 1, err);
                    BatchItem::Failed {
                        reason: err.to_string(),
                    }
                }
            };
            items.push(item);
        }

        let result = BatchResult::new(items);
        info!(
            "Batch finished: {}/{} succeeded ({})",
            result.successful(),
            texts.len(),
            result.status
        );
        Ok(result)
    }
}

/// Log a chunk state transition and return the new state
fn advance(index: usize, from: ChunkState, to: ChunkState) -> ChunkState {
    debug_assert!(!from.is_terminal(), "chunk {} left terminal state {:?}", index, from);
    if from != to {
        debug!("Chunk {}: {:?} -> {:?}", index + 1, from, to);
    }
    to
}

/// An unchanged reply usually means the provider silently did nothing
fn reject_unchanged(original: &str, translated: String, source: &str, target: &str) -> Result<String> {
    let translatable = original.chars().any(char::is_alphabetic);
    let same_language = source.eq_ignore_ascii_case(target);
    if translatable && !same_language && translated.trim() == original.trim() {
        return Err(TranslationError::Transient {
            message: "provider returned the input unchanged".to_string(),
        });
    }
    Ok(translated)
}

/// `base * 2^(attempt-1)` plus uniform jitter in `[0, base]`
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let jitter_ms = rand::thread_rng().gen_range(0..=base.as_millis() as u64);
    base.saturating_mul(1 << exponent) + Duration::from_millis(jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{AggregateStatus, RateBudget};
    use crate::providers::testing::ScriptedBackend;
    use tokio::time::Instant;
    use tokio_test::{assert_err, assert_ok};

    fn test_config() -> TranslatorConfig {
        TranslatorConfig {
            budgets: vec![RateBudget::per_second(1000)],
            max_attempts: 3,
            base_backoff_ms: 100,
            max_chunk_size: 7,
            inter_chunk_delay_ms: 0,
            inter_item_delay_ms: 0,
            ..Default::default()
        }
    }

    fn translator(backend: &Arc<ScriptedBackend>, config: TranslatorConfig) -> ChunkedTranslator {
        let controller = Arc::new(AdmissionController::new(config.budgets.clone()).unwrap());
        let backend: Arc<dyn TranslationBackend> = backend.clone();
        ChunkedTranslator::new(config, backend, controller).unwrap()
    }

    fn single(text: &str) -> Chunk {
        Chunk {
            index: 0,
            text: text.to_string(),
            trailing: String::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_after_rate_limit() {
        let backend = Arc::new(ScriptedBackend::new(|text, call| {
            if call <= 2 {
                Err(TranslationError::from_status(429, "Too Many Requests"))
            } else {
                Ok(format!("T:{}", text))
            }
        }));
        let translator = translator(&backend, test_config());

        let start = Instant::now();
        let result = translator.translate_chunk(&single("Hello"), "en", "es").await;

        assert_eq!(assert_ok!(result), "T:Hello");
        assert_eq!(backend.call_count(), 3);
        // Two backoff sleeps: 100ms and 200ms, each plus up to 100ms jitter
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300), "elapsed {:?}", elapsed);
        assert!(elapsed <= Duration::from_millis(500), "elapsed {:?}", elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_exhaust_attempts() {
        let backend = Arc::new(ScriptedBackend::new(|_, _| {
            Err(TranslationError::Transient {
                message: "server busy".to_string(),
            })
        }));
        let translator = translator(&backend, TranslatorConfig {
            max_attempts: 4,
            ..test_config()
        });

        let err = assert_err!(translator.translate_chunk(&single("Hello"), "en", "es").await);
        assert!(matches!(err, TranslationError::RetriesExhausted { attempts: 4, .. }));
        assert_eq!(backend.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_error_is_not_retried() {
        let backend = Arc::new(ScriptedBackend::new(|_, _| {
            Err(TranslationError::from_status(400, "invalid target language"))
        }));
        let translator = translator(&backend, test_config());

        let err = assert_err!(translator.translate_chunk(&single("Hello"), "en", "xx").await);
        assert!(matches!(err, TranslationError::ApiError { status: 400, .. }));
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_reply_is_retried() {
        let backend = Arc::new(ScriptedBackend::new(|text, call| {
            if call == 1 {
                Ok(text.to_string())
            } else {
                Ok("Hola".to_string())
            }
        }));
        let translator = translator(&backend, test_config());

        let result = translator.translate_chunk(&single("Hello"), "en", "es").await;
        assert_eq!(assert_ok!(result), "Hola");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_numbers_are_accepted() {
        let backend = Arc::new(ScriptedBackend::new(|text, _| Ok(text.to_string())));
        let translator = translator(&backend, test_config());

        let result = translator.translate_chunk(&single("12:30"), "en", "es").await;
        assert_eq!(assert_ok!(result), "12:30");
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chunk_order_survives_uneven_latency() {
        let backend = Arc::new(
            ScriptedBackend::new(|text, _| Ok(format!("<{}>", text.to_uppercase()))).with_delays([
                Duration::from_millis(300),
                Duration::from_millis(10),
                Duration::from_millis(200),
                Duration::from_millis(50),
            ]),
        );
        let translator = translator(&backend, test_config());

        let result = translator
            .translate_long_text("One. Two. Three. Four.", "en", "es", FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(backend.calls(), vec!["One.", "Two.", "Three.", "Four."]);
        assert_eq!(result.text, "<ONE.> <TWO.> <THREE.> <FOUR.>");
        assert_eq!(result.status, AggregateStatus::AllSucceeded);
        let indices: Vec<usize> = result.outcomes.iter().map(ChunkOutcome::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    fn fails_on_two() -> ScriptedBackend {
        ScriptedBackend::new(|text, _| {
            if text.contains("Two") {
                Err(TranslationError::Fatal {
                    message: "malformed input".to_string(),
                })
            } else {
                Ok(text.to_uppercase())
            }
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_best_effort_reports_failed_chunks() {
        let backend = Arc::new(fails_on_two());
        let translator = translator(&backend, test_config());

        let result = translator
            .translate_long_text("One. Two. Three.", "en", "es", FailurePolicy::BestEffort)
            .await
            .unwrap();

        assert_eq!(result.status, AggregateStatus::Partial);
        assert_eq!(result.text, "ONE. Two. THREE.");
        let failures = result.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert!(failures[0].1.contains("malformed input"));
        assert_eq!(backend.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_policy_stops_at_first_failure() {
        let backend = Arc::new(fails_on_two());
        let translator = translator(&backend, test_config());

        let err = assert_err!(
            translator
                .translate_long_text("One. Two. Three.", "en", "es", FailurePolicy::Abort)
                .await
        );
        assert!(matches!(err, TranslationError::ChunkFailed { index: 1, .. }));
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_makes_no_calls() {
        let backend = Arc::new(ScriptedBackend::uppercase());
        let translator = translator(&backend, test_config());

        let err = assert_err!(translator.translate("   \n", "en", "es").await);
        assert!(matches!(err, TranslationError::EmptyInput));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_leading_whitespace_adds_no_chunks() {
        let backend = Arc::new(ScriptedBackend::uppercase());
        let translator = translator(&backend, TranslatorConfig {
            max_chunk_size: 5,
            ..test_config()
        });

        let result = translator
            .translate_long_text("      abcdefgh", "en", "es", FailurePolicy::Abort)
            .await
            .unwrap();

        assert_eq!(backend.calls(), vec!["abcde", "fgh"]);
        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.text, "ABCDEFGH");
    }

    #[tokio::test(start_paused = true)]
    async fn test_inter_chunk_delay_and_admission_are_applied() {
        let backend = Arc::new(ScriptedBackend::uppercase());
        let translator = translator(&backend, TranslatorConfig {
            budgets: vec![RateBudget::per_second(2)],
            inter_chunk_delay_ms: 200,
            ..test_config()
        });

        let start = Instant::now();
        let result = translator
            .translate_long_text("One. Two. Three. Four.", "en", "es", FailurePolicy::Abort)
            .await
            .unwrap();

        assert!(result.is_success());
        // Third call waits for the first to leave the 1s window
        assert!(start.elapsed() >= Duration::from_secs(1));
        let status = translator.controller().status().await;
        assert!(status.budgets[0].in_window <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_with_one_fatal_item_is_partial() {
        let backend = Arc::new(ScriptedBackend::new(|text, _| {
            if text == "second" {
                Err(TranslationError::from_status(400, "unsupported language pair"))
            } else {
                Ok(format!("[{}]", text))
            }
        }));
        let translator = translator(&backend, TranslatorConfig {
            max_chunk_size: 800,
            inter_item_delay_ms: 300,
            ..test_config()
        });

        let texts = vec!["first".to_string(), "second".to_string(), "third".to_string()];
        let result = translator.translate_batch(&texts, "en", "es").await.unwrap();

        assert_eq!(result.successful(), 2);
        assert_eq!(result.status, AggregateStatus::Partial);
        assert!(!result.items[1].is_success());
        match &result.items[1] {
            BatchItem::Completed(item) => {
                assert_eq!(item.status, AggregateStatus::AllFailed);
                assert!(item.failures()[0].1.contains("unsupported language pair"));
            }
            BatchItem::Failed { .. } => panic!("best effort keeps the item result"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_limits() {
        let backend = Arc::new(ScriptedBackend::uppercase());
        let translator = translator(&backend, test_config());

        let too_many: Vec<String> = (0..11).map(|i| format!("text {}", i)).collect();
        let err = assert_err!(translator.translate_batch(&too_many, "en", "es").await);
        assert!(matches!(err, TranslationError::BatchTooLarge { len: 11, max: 10 }));

        let err = assert_err!(translator.translate_batch(&[], "en", "es").await);
        assert!(matches!(err, TranslationError::EmptyInput));
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_backoff_delay_bounds() {
        let base = Duration::from_millis(100);
        for attempt in 1..=4 {
            let delay = backoff_delay(base, attempt);
            let floor = base * 2u32.pow(attempt - 1);
            assert!(delay >= floor && delay <= floor + base, "attempt {}: {:?}", attempt, delay);
        }
    }
}
