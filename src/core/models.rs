//! Core data models for translation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Backend selected for outbound calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Google's unofficial web endpoint
    Google,
    /// Self-hosted or public LibreTranslate
    Libre,
    /// OpenAI chat completions
    #[serde(rename = "openai")]
    OpenAi,
    /// Gemini generateContent
    Gemini,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::Libre => write!(f, "libre"),
            ProviderKind::OpenAi => write!(f, "openai"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "google" => Ok(ProviderKind::Google),
            "libre" | "libretranslate" => Ok(ProviderKind::Libre),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(anyhow::anyhow!("Unknown provider: {}", other)),
        }
    }
}

/// What to do when a chunk exhausts its attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failed chunk and discard partial output
    Abort,
    /// Keep going; failed chunks are reported and keep their original text
    #[default]
    BestEffort,
}

impl FromStr for FailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "best_effort" => Ok(FailurePolicy::BestEffort),
            other => Err(anyhow::anyhow!("Unknown failure policy: {}", other)),
        }
    }
}

/// One request budget: at most `max_requests` calls per trailing `window_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBudget {
    pub max_requests: usize,
    pub window_ms: u64,
}

impl RateBudget {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: window.as_millis() as u64,
        }
    }

    pub fn per_second(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn per_day(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(86_400))
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// A budget must admit something and cover a non-empty window
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_requests == 0 {
            anyhow::bail!("max_requests must be greater than 0");
        }
        if self.window_ms == 0 {
            anyhow::bail!("window_ms must be at least 1 ms");
        }
        Ok(())
    }
}

/// A provider-sized slice of the input text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    /// Content sent to the provider
    pub text: String,
    /// Whitespace that followed `text` in the input
    pub trailing: String,
}

impl Chunk {
    /// Separator to place after this chunk's translation when reassembling
    pub fn joiner(&self) -> &'static str {
        match self.trailing.matches('\n').count() {
            0 if self.trailing.is_empty() => "",
            0 => " ",
            1 => "\n",
            _ => "\n\n",
        }
    }

    /// Reconstruct the exact input from its chunks
    pub fn concat(chunks: &[Chunk]) -> String {
        chunks
            .iter()
            .flat_map(|c| [c.text.as_str(), c.trailing.as_str()])
            .collect()
    }
}

/// Lifecycle of one chunk inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Pending,
    InFlight,
    Succeeded,
    TransientlyFailed,
    FatallyFailed,
    Exhausted,
}

impl ChunkState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChunkState::Succeeded | ChunkState::FatallyFailed | ChunkState::Exhausted
        )
    }
}

/// Result of a single backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    TransientFailure(String),
    FatalFailure(String),
}

/// One backend call made on behalf of a chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationAttempt {
    pub chunk_index: usize,
    pub attempt_number: u32,
    pub outcome: AttemptOutcome,
}

/// Final outcome of one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChunkOutcome {
    /// Provider output for the chunk
    Translated {
        index: usize,
        text: String,
    },
    /// The chunk kept its input text; `reason` is the last error
    Failed {
        index: usize,
        original: String,
        reason: String,
    },
}

impl ChunkOutcome {
    pub fn index(&self) -> usize {
        match self {
            ChunkOutcome::Translated { index, .. } | ChunkOutcome::Failed { index, .. } => *index,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChunkOutcome::Translated { .. })
    }

    /// Translated text, or the original text for failed chunks
    pub fn text(&self) -> &str {
        match self {
            ChunkOutcome::Translated { text, .. } => text,
            ChunkOutcome::Failed { original, .. } => original,
        }
    }
}

/// Overall status derived from per-unit outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateStatus {
    AllSucceeded,
    Partial,
    AllFailed,
}

impl AggregateStatus {
    /// Derive from success flags; an empty set counts as all failed
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        let (mut ok, mut failed) = (0usize, 0usize);
        for flag in flags {
            if flag {
                ok += 1;
            } else {
                failed += 1;
            }
        }
        match (ok, failed) {
            (_, 0) if ok > 0 => AggregateStatus::AllSucceeded,
            (0, _) => AggregateStatus::AllFailed,
            _ => AggregateStatus::Partial,
        }
    }
}

impl fmt::Display for AggregateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregateStatus::AllSucceeded => write!(f, "all_succeeded"),
            AggregateStatus::Partial => write!(f, "partial"),
            AggregateStatus::AllFailed => write!(f, "all_failed"),
        }
    }
}

/// Ordered outcomes for one top-level text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateResult {
    pub outcomes: Vec<ChunkOutcome>,
    pub status: AggregateStatus,
    /// Assembled text; failed chunks keep their original text
    pub text: String,
}

impl AggregateResult {
    /// Assemble outcomes in chunk order using each chunk's joiner
    pub fn assemble(chunks: &[Chunk], outcomes: Vec<ChunkOutcome>) -> Self {
        let status = AggregateStatus::from_flags(outcomes.iter().map(ChunkOutcome::is_success));

        let mut text = String::new();
        let last = outcomes.len().saturating_sub(1);
        for (i, outcome) in outcomes.iter().enumerate() {
            text.push_str(outcome.text().trim());
            if i < last {
                text.push_str(chunks.get(i).map_or(" ", Chunk::joiner));
            }
        }

        Self {
            outcomes,
            status,
            text,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == AggregateStatus::AllSucceeded
    }

    /// Failed chunks as (index, reason)
    pub fn failures(&self) -> Vec<(usize, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o {
                ChunkOutcome::Failed { index, reason, .. } => Some((*index, reason.as_str())),
                ChunkOutcome::Translated { .. } => None,
            })
            .collect()
    }
}

/// Outcome of one batch item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchItem {
    Completed(AggregateResult),
    Failed { reason: String },
}

impl BatchItem {
    pub fn is_success(&self) -> bool {
        matches!(self, BatchItem::Completed(result) if result.is_success())
    }
}

/// Ordered results for a batch request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
    pub status: AggregateStatus,
}

impl BatchResult {
    pub fn new(items: Vec<BatchItem>) -> Self {
        let status = AggregateStatus::from_flags(items.iter().map(BatchItem::is_success));
        Self { items, status }
    }

    pub fn successful(&self) -> usize {
        self.items.iter().filter(|i| i.is_success()).count()
    }
}

/// Translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
}

impl TranslationRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: default_source_lang(),
            target_lang: target_lang.into(),
        }
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }
}

/// Batch translation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTranslationRequest {
    pub texts: Vec<String>,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
}

fn default_source_lang() -> String {
    "Auto".to_string()
}

fn default_target_lang() -> String {
    "English".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str, trailing: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
            trailing: trailing.to_string(),
        }
    }

    #[test]
    fn test_status_derivation() {
        assert_eq!(AggregateStatus::from_flags([true, true]), AggregateStatus::AllSucceeded);
        assert_eq!(AggregateStatus::from_flags([true, false]), AggregateStatus::Partial);
        assert_eq!(AggregateStatus::from_flags([false, false]), AggregateStatus::AllFailed);
        assert_eq!(AggregateStatus::from_flags([]), AggregateStatus::AllFailed);
    }

    #[test]
    fn test_assemble_uses_joiners() {
        let chunks = vec![
            chunk(0, "One.", " "),
            chunk(1, "Two.", "\n\n"),
            chunk(2, "Thr", ""),
            chunk(3, "ee.", ""),
        ];
        let outcomes = vec![
            ChunkOutcome::Translated { index: 0, text: "Uno.".into() },
            ChunkOutcome::Translated { index: 1, text: " Dos. ".into() },
            ChunkOutcome::Translated { index: 2, text: "Tr".into() },
            ChunkOutcome::Translated { index: 3, text: "es.".into() },
        ];

        let result = AggregateResult::assemble(&chunks, outcomes);
        assert_eq!(result.text, "Uno. Dos.\n\nTres.");
        assert!(result.is_success());
    }

    #[test]
    fn test_failed_chunk_is_reported() {
        let chunks = vec![chunk(0, "Hello.", " "), chunk(1, "World.", "")];
        let outcomes = vec![
            ChunkOutcome::Translated { index: 0, text: "Hola.".into() },
            ChunkOutcome::Failed {
                index: 1,
                original: "World.".into(),
                reason: "quota".into(),
            },
        ];

        let result = AggregateResult::assemble(&chunks, outcomes);
        assert_eq!(result.status, AggregateStatus::Partial);
        assert_eq!(result.text, "Hola. World.");
        assert_eq!(result.failures(), vec![(1, "quota")]);
    }

    #[test]
    fn test_parse_enums() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("best-effort".parse::<FailurePolicy>().unwrap(), FailurePolicy::BestEffort);
        assert!("deepl".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let request: TranslationRequest = serde_json::from_str(r#"{"text": "hi"}"#).unwrap();
        assert_eq!(request.source_lang, "Auto");
        assert_eq!(request.target_lang, "English");
    }
}
