//! Digest application binary - composition root.
//!
//! 1. Load `.env`, parse CLI arguments, load configuration from TOML
//! 2. Overlay environment variables and CLI flags
//! 3. Open the SQLite article store
//! 4. Dispatch the subcommand (run, import, similar, search, purge)

mod app;
mod cli;

use clap::Parser;

use digest_core::config::DigestConfig;
use digest_pipeline::PipelineError;

use cli::{CliArgs, Command};

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; variables may come from the environment.
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();

    let config_file = args.resolve_config_path();
    let mut config = DigestConfig::load_or_default(&config_file);
    init_tracing(&args.resolve_log_level(&config.general.log_level));
    config.apply_env_overrides();

    tracing::info!(
        path = %config_file.display(),
        "Starting digest v{}",
        env!("CARGO_PKG_VERSION")
    );

    match args.command {
        Command::Run {
            duration,
            import,
            dry_run,
        } => {
            if let Some(days) = duration {
                config.general.window_days = days;
            }
            config.validate()?;

            let store = app::open_store(&config)?;
            match app::run_digest(&config, store, import.as_deref(), dry_run).await {
                Ok(done) => {
                    println!("{}", done.result);
                    println!("{}", serde_json::to_string_pretty(&done.report)?);
                }
                Err(PipelineError::Timeout { secs, report }) => {
                    eprintln!("Partial report:\n{}", serde_json::to_string_pretty(&report)?);
                    return Err(PipelineError::Timeout { secs, report }.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Import { file } => {
            let store = app::open_store(&config)?;
            let report = app::import(store.as_ref(), &file).await?;
            println!(
                "Imported {} of {} records ({} duplicates, {} skipped)",
                report.inserted, report.read, report.duplicates, report.skipped
            );
        }
        Command::Similar { text, limit } => {
            let store = app::open_store(&config)?;
            let embedder = app::build_embedder(&config)?;
            let ranked = app::similar(store.as_ref(), embedder.as_ref(), &text, limit).await?;
            if ranked.is_empty() {
                println!("No embedded articles to compare against");
            }
            for (score, title, link) in ranked {
                println!("{:.3}  {}  <{}>", score, title, link);
            }
        }
        Command::Search { query, limit } => {
            let store = app::open_store(&config)?;
            let hits = app::search(store.as_ref(), &query, limit)?;
            if hits.is_empty() {
                println!("No matches for {:?}", query);
            }
            for hit in hits {
                println!(
                    "{:.3}  [{}] {}  <{}>",
                    hit.rank,
                    hit.article.category_key(),
                    hit.article.title,
                    hit.article.link
                );
            }
        }
        Command::Purge { yes } => {
            let store = app::open_store(&config)?;
            let removed = app::purge(store.as_ref(), yes)?;
            println!("Removed {} articles", removed);
        }
    }

    Ok(())
}
