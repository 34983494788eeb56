//! Main entry point for the throttled translator CLI

#![forbid(unsafe_code)]

use clap::Parser;
use dotenvy::dotenv;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use throttled_translator::cli::{self, commands::Commands};
use throttled_translator::core::models::ProviderKind;

/// Rate-limited, chunking translation relay
#[derive(Parser, Debug)]
#[command(name = "throttled-translator", version, about, long_about = None)]
struct Args {
    /// Translation backend (overrides TRANSLATOR_PROVIDER)
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// API key for the backend (overrides TRANSLATOR_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv().ok();

    let args = Args::parse();

    let debug = args.verbose || matches!(args.command, Some(Commands::Server { debug: true, .. }));
    let log_level = if debug { "debug" } else { "info" };
    let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}={}", crate_target, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Override config with CLI args if provided
    if let Some(provider) = args.provider {
        std::env::set_var("TRANSLATOR_PROVIDER", provider.to_string());
    }

    if let Some(api_key) = args.api_key {
        std::env::set_var("TRANSLATOR_API_KEY", api_key);
    }

    // Execute command
    match args.command {
        Some(Commands::Translate {
            text,
            file,
            source_lang,
            target_lang,
            policy,
        }) => {
            cli::commands::handle_translate(text, file, source_lang, target_lang, policy).await?;
        }
        Some(Commands::Batch {
            file,
            source_lang,
            target_lang,
        }) => {
            cli::commands::handle_batch(file, source_lang, target_lang).await?;
        }
        Some(Commands::Server { host, port, .. }) => {
            cli::commands::handle_server(host, port).await?;
        }
        Some(Commands::Languages) => {
            cli::commands::handle_languages();
        }
        None => {
            println!("Please specify a command. Use --help for more information.");
        }
    }

    Ok(())
}
