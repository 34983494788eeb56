//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

use crate::core::chunker::DEFAULT_DELIMITER;
use crate::core::models::{FailurePolicy, ProviderKind, RateBudget};

/// Configuration for translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub budgets: Vec<RateBudget>,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_chunk_size: usize,
    pub sentence_delimiter: String,
    pub inter_chunk_delay_ms: u64,
    pub inter_item_delay_ms: u64,
    pub max_batch_size: usize,
    pub failure_policy: FailurePolicy,
    pub timeout_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Google,
            api_key: None,
            api_endpoint: None,
            model: None,
            budgets: default_budgets(ProviderKind::Google),
            max_attempts: 3,
            base_backoff_ms: 500,
            max_chunk_size: 800,
            sentence_delimiter: DEFAULT_DELIMITER.to_string(),
            inter_chunk_delay_ms: 200,
            inter_item_delay_ms: 300,
            max_batch_size: 10,
            failure_policy: FailurePolicy::BestEffort,
            timeout_ms: 30000,
        }
    }
}

/// Conservative budgets per provider free tier
fn default_budgets(provider: ProviderKind) -> Vec<RateBudget> {
    match provider {
        ProviderKind::Google | ProviderKind::Libre => {
            vec![RateBudget::per_second(5), RateBudget::per_day(1000)]
        }
        ProviderKind::OpenAi => vec![RateBudget::per_minute(60)],
        ProviderKind::Gemini => vec![RateBudget::per_minute(10), RateBudget::per_day(1000)],
    }
}

/// Read and parse an optional environment variable
fn env_parse<T>(name: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {}={:?}: {}", name, raw, e)),
        _ => Ok(None),
    }
}

impl TranslatorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let provider = env_parse::<ProviderKind>("TRANSLATOR_PROVIDER")?.unwrap_or(ProviderKind::Google);
        let mut config = Self {
            provider,
            budgets: default_budgets(provider),
            ..Self::default()
        };

        config.api_key = std::env::var("TRANSLATOR_API_KEY").ok().filter(|k| !k.is_empty());
        config.api_endpoint = std::env::var("TRANSLATOR_ENDPOINT").ok().filter(|e| !e.is_empty());
        config.model = std::env::var("TRANSLATOR_MODEL").ok().filter(|m| !m.is_empty());

        let per_window = env_parse::<usize>("MAX_REQUESTS_PER_WINDOW")?;
        let window_ms = env_parse::<u64>("WINDOW_SIZE_MS")?;
        let daily = env_parse::<usize>("DAILY_REQUEST_LIMIT")?;
        // The first budget is the short window; budgets not named keep their defaults
        if per_window.is_some() || window_ms.is_some() {
            let short = config.budgets.first().copied().unwrap_or(RateBudget::per_second(5));
            let replaced = RateBudget {
                max_requests: per_window.unwrap_or(short.max_requests),
                window_ms: window_ms.unwrap_or(short.window_ms),
            };
            match config.budgets.first_mut() {
                Some(first) => *first = replaced,
                None => config.budgets.push(replaced),
            }
        }
        if let Some(daily) = daily {
            let day = RateBudget::per_day(daily);
            config.budgets.retain(|b| b.window_ms != day.window_ms);
            config.budgets.push(day);
        }

        if let Some(v) = env_parse("MAX_RETRY_ATTEMPTS")? {
            config.max_attempts = v;
        }
        if let Some(v) = env_parse("BASE_BACKOFF_MS")? {
            config.base_backoff_ms = v;
        }
        if let Some(v) = env_parse("MAX_CHUNK_SIZE")? {
            config.max_chunk_size = v;
        }
        if let Ok(v) = std::env::var("SENTENCE_DELIMITER") {
            config.sentence_delimiter = v;
        }
        if let Some(v) = env_parse("INTER_CHUNK_DELAY_MS")? {
            config.inter_chunk_delay_ms = v;
        }
        if let Some(v) = env_parse("INTER_ITEM_DELAY_MS")? {
            config.inter_item_delay_ms = v;
        }
        if let Some(v) = env_parse("MAX_BATCH_SIZE")? {
            config.max_batch_size = v;
        }
        if let Some(v) = env_parse("FAILURE_POLICY")? {
            config.failure_policy = v;
        }
        if let Some(v) = env_parse("REQUEST_TIMEOUT_MS")? {
            config.timeout_ms = v;
        }

        Ok(config)
    }

    /// Load configuration from the environment and validate it
    pub fn load() -> anyhow::Result<Self> {
        let config = Self::from_env()?;
        config.validate()?;
        info!(
            "Loaded {} configuration with {} rate budget(s)",
            config.provider,
            config.budgets.len()
        );
        Ok(config)
    }

    /// Load from a JSON or YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => serde_json::to_string_pretty(self)?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.budgets.is_empty() {
            warn!("No rate budgets configured, outbound calls are unthrottled");
        }

        for budget in &self.budgets {
            budget.validate()?;
        }

        if self.max_attempts == 0 {
            return Err(anyhow::anyhow!("max_attempts must be greater than 0"));
        }

        if self.max_chunk_size == 0 {
            return Err(anyhow::anyhow!("max_chunk_size must be greater than 0"));
        }

        if self.sentence_delimiter.is_empty() {
            return Err(anyhow::anyhow!("sentence_delimiter cannot be empty"));
        }

        if self.max_batch_size == 0 {
            return Err(anyhow::anyhow!("max_batch_size must be greater than 0"));
        }

        let needs_key = matches!(self.provider, ProviderKind::OpenAi | ProviderKind::Gemini);
        if needs_key && self.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(anyhow::anyhow!("API key is required for provider {}", self.provider));
        }

        Ok(())
    }

    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn inter_chunk_delay(&self) -> Duration {
        Duration::from_millis(self.inter_chunk_delay_ms)
    }

    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.inter_item_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
