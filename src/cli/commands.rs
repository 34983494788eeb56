//! CLI command definitions and handlers

use clap::Subcommand;
use std::path::PathBuf;

use crate::core::client::ChunkedTranslator;
use crate::core::models::{BatchItem, FailurePolicy};
use crate::utils::languages;

/// Commands for the translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a text or a file, chunking long input
    Translate {
        /// Text to translate
        #[arg(short = 'x', long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the text from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Source language name or code
        #[arg(long, default_value = "Auto")]
        source_lang: String,

        /// Target language name or code
        #[arg(short, long, default_value = "English")]
        target_lang: String,

        /// Failure policy: abort or best_effort
        #[arg(long)]
        policy: Option<FailurePolicy>,
    },

    /// Translate every non-empty line of a file as one batch
    Batch {
        /// File with one text per line
        #[arg(short, long)]
        file: PathBuf,

        /// Source language name or code
        #[arg(long, default_value = "Auto")]
        source_lang: String,

        /// Target language name or code
        #[arg(short, long, default_value = "English")]
        target_lang: String,
    },

    /// Start HTTP API server
    Server {
        /// Bind address (default: 0.0.0.0)
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Listen port (default: 8000)
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },

    /// List supported languages
    Languages,
}

/// Handle translate command
pub async fn handle_translate(
    text: Option<String>,
    file: Option<PathBuf>,
    source_lang: String,
    target_lang: String,
    policy: Option<FailurePolicy>,
) -> anyhow::Result<()> {
    use std::time::Instant;
    use tracing::info;

    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(file)) => tokio::fs::read_to_string(&file).await?,
        (None, None) => anyhow::bail!("Either --text or --file is required"),
    };

    let source = languages::resolve_source(&source_lang)?;
    let target = languages::resolve_target(&target_lang)?;

    let translator = ChunkedTranslator::from_env()?;
    let policy = policy.unwrap_or(translator.config().failure_policy);
    let start_time = Instant::now();

    info!("Translating {} -> {} with {}", source, target, translator.backend_name());

    let result = translator.translate_long_text(&text, source, target, policy).await?;

    println!("{}", result.text);

    let failures = result.failures();
    if !failures.is_empty() {
        eprintln!(
            "\n⚠️  {} of {} chunks were left untranslated ({}):",
            failures.len(),
            result.outcomes.len(),
            result.status
        );
        for (index, reason) in failures {
            eprintln!("   Chunk {}: {}", index + 1, reason);
        }
    }

    info!(
        "Completed {} chunk(s) in {:?}",
        result.outcomes.len(),
        start_time.elapsed()
    );

    Ok(())
}

/// Handle batch command
pub async fn handle_batch(file: PathBuf, source_lang: String, target_lang: String) -> anyhow::Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use std::time::Instant;
    use tracing::info;

    let content = tokio::fs::read_to_string(&file).await?;
    let texts: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if texts.is_empty() {
        anyhow::bail!("No texts found in {}", file.display());
    }

    let source = languages::resolve_source(&source_lang)?;
    let target = languages::resolve_target(&target_lang)?;
    let translator = ChunkedTranslator::from_env()?;
    let batch_size = translator.config().max_batch_size;
    let start_time = Instant::now();

    info!("Translating {} texts from {}", texts.len(), file.display());

    let pb = ProgressBar::new(texts.len() as u64);
    pb.set_style(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
        .progress_chars("=>-"));

    let mut succeeded = 0;
    let mut failed = 0;

    for group in texts.chunks(batch_size) {
        pb.set_message(format!("{} texts", group.len()));
        let batch = translator.translate_batch(group, source, target).await?;

        for (text, item) in group.iter().zip(batch.items) {
            match item {
                BatchItem::Completed(result) if result.is_success() => {
                    succeeded += 1;
                    pb.println(result.text);
                }
                BatchItem::Completed(result) => {
                    failed += 1;
                    let reasons: Vec<String> = result
                        .failures()
                        .into_iter()
                        .map(|(i, reason)| format!("chunk {}: {}", i + 1, reason))
                        .collect();
                    pb.println(format!("✗ {} ({})", text, reasons.join("; ")));
                }
                BatchItem::Failed { reason } => {
                    failed += 1;
                    pb.println(format!("✗ {} ({})", text, reason));
                }
            }
            pb.inc(1);
        }
    }

    pb.finish_with_message("Completed");

    let duration = start_time.elapsed();
    info!(
        "Completed: {} succeeded, {} failed in {:?}",
        succeeded, failed, duration
    );

    println!("\n✅ Batch translation completed!");
    println!("   Succeeded: {}", succeeded);
    println!("   Failed: {}", failed);
    println!("   Time: {:?}", duration);

    Ok(())
}

/// Handle server command
pub async fn handle_server(host: String, port: u16) -> anyhow::Result<()> {
    use crate::server::api::run_server;
    use tracing::info;

    info!("Starting HTTP server on {}:{}", host, port);
    println!("🚀 Server starting on http://{}:{}", host, port);

    run_server(host, port).await?;

    Ok(())
}

/// Handle languages command
pub fn handle_languages() {
    for (name, code) in languages::LANGUAGES {
        println!("{:<24} {}", name, code);
    }
}
