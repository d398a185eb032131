//! CLI argument definitions for the digest binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.
//! Secrets are never taken from flags; they come from the config file or
//! the environment.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Daily news digest: cluster the day's articles by topic, summarize each
/// topic, and deliver the digest.
#[derive(Parser, Debug)]
#[command(name = "digest", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Run the pipeline over the current window and deliver the digest.
    Run {
        /// Window length in days, counted back from today's midnight (UTC).
        #[arg(long)]
        duration: Option<u32>,
        /// Import a JSON file of articles before reading the window.
        #[arg(long)]
        import: Option<PathBuf>,
        /// Log the digest instead of sending it.
        #[arg(long)]
        dry_run: bool,
    },
    /// Import a JSON file of articles into the store.
    Import { file: PathBuf },
    /// List stored articles closest in meaning to TEXT.
    Similar {
        text: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// Full-text search over stored titles and bodies.
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Delete every stored article.
    Purge {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > DIGEST_CONFIG env var > ~/.digest/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("DIGEST_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE");
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME");
    home.ok().map(PathBuf::from)
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".digest").join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
