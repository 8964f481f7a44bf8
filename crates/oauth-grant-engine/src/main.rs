//! Grant Engine CLI - Entry Point
//!
//! Generates tokens or drives grant exchanges against an in-memory store,
//! one JSON request per stdin line.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use oauth_grant_engine::config::MAX_TOKEN_LENGTH;
use oauth_grant_engine::{EngineConfig, GrantEngine, MemoryStorage, Request, TokenGenerator, TokenOptions};

#[derive(Parser, Debug)]
#[command(name = "grant-engine")]
#[command(about = "OAuth2 token issuance engine")]
#[command(version)]
struct Cli {
    /// Access token lifetime in seconds
    #[arg(long, global = true, env = "ACCESS_TOKEN_LIFETIME")]
    access_token_lifetime: Option<i64>,

    /// Refresh token lifetime in seconds (0 = refresh half expires on issue)
    #[arg(long, global = true, env = "REFRESH_TOKEN_LIFETIME")]
    refresh_token_lifetime: Option<i64>,

    /// Generated access token length
    #[arg(long, global = true, env = "ACCESS_TOKEN_LENGTH")]
    access_token_length: Option<usize>,

    /// Generated refresh token length
    #[arg(long, global = true, env = "REFRESH_TOKEN_LENGTH")]
    refresh_token_length: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print freshly generated tokens
    Generate {
        /// Token length (defaults to the configured access token length)
        #[arg(long)]
        length: Option<usize>,

        /// Number of tokens to print
        #[arg(long, default_value = "1")]
        count: usize,
    },
    /// Read JSON requests from stdin (one per line) and print one JSON result per line
    Exchange {
        /// JSON file mapping usernames to passwords
        #[arg(long)]
        users: Option<PathBuf>,

        /// Issue extended (90 day / 365 day) tokens on password grants
        #[arg(long)]
        extended: bool,
    },
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            access_token_lifetime: self.access_token_lifetime,
            refresh_token_lifetime: self.refresh_token_lifetime,
            access_token_length: self.access_token_length,
            refresh_token_length: self.refresh_token_length,
        }
    }
}

/// Length for the `generate` subcommand: `--length`, else the engine's access length.
fn generate_length(requested: Option<usize>, engine: &GrantEngine) -> anyhow::Result<usize> {
    let length = requested.unwrap_or_else(|| engine.access_token_length());
    anyhow::ensure!(
        (1..=MAX_TOKEN_LENGTH).contains(&length),
        "--length must be between 1 and {MAX_TOKEN_LENGTH}, got {length}"
    );
    Ok(length)
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // Logs go to stderr so stdout stays machine-readable.
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr)).init();
    }
}

async fn load_users(storage: &MemoryStorage, path: &Path) -> anyhow::Result<usize> {
    let raw = tokio::fs::read_to_string(path).await.with_context(|| format!("reading {}", path.display()))?;
    let users: HashMap<String, String> =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;

    let count = users.len();
    for (username, password) in users {
        storage.add_user(username, &password).await;
    }
    Ok(count)
}

async fn run_exchange(engine: &GrantEngine, users: Option<PathBuf>, extended: bool) -> anyhow::Result<()> {
    let storage = Arc::new(MemoryStorage::new());
    if let Some(path) = users {
        let count = load_users(&storage, &path).await?;
        tracing::info!(count, "Loaded users");
    }
    let cleanup = Arc::clone(&storage).start_cleanup_task();

    let options = extended.then(TokenOptions::extended);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let output = match serde_json::from_str::<Request>(&line) {
            Ok(request) => match engine.exchange(&request, storage.as_ref(), options.as_ref()).await {
                Ok(token) => serde_json::to_value(token)?,
                Err(e) => serde_json::json!({
                    "error": e.error_code(),
                    "error_description": e.to_string(),
                }),
            },
            Err(e) => serde_json::json!({
                "error": "invalid_request",
                "error_description": format!("Malformed request: {e}"),
            }),
        };

        println!("{output}");
    }

    cleanup.abort();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting grant engine");

    let engine = GrantEngine::new(&cli.engine_config())?;

    match cli.command {
        Command::Generate { length, count } => {
            let generator = TokenGenerator::new(generate_length(length, &engine)?);
            for _ in 0..count {
                println!("{}", generator.generate()?);
            }
        }
        Command::Exchange { users, extended } => {
            run_exchange(&engine, users, extended).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> (Cli, GrantEngine) {
        let cli = Cli::try_parse_from(args).unwrap();
        let engine = GrantEngine::new(&cli.engine_config()).unwrap();
        (cli, engine)
    }

    fn requested_length(cli: &Cli) -> Option<usize> {
        match cli.command {
            Command::Generate { length, .. } => length,
            Command::Exchange { .. } => None,
        }
    }

    #[test]
    fn test_generate_defaults_to_configured_access_length() {
        let (cli, engine) = parse(&["grant-engine", "--access-token-length", "24", "generate"]);
        assert_eq!(generate_length(requested_length(&cli), &engine).unwrap(), 24);

        let (cli, engine) = parse(&["grant-engine", "generate"]);
        assert_eq!(generate_length(requested_length(&cli), &engine).unwrap(), 64);
    }

    #[test]
    fn test_generate_explicit_length_wins() {
        let (cli, engine) = parse(&["grant-engine", "--access-token-length", "24", "generate", "--length", "12"]);
        assert_eq!(generate_length(requested_length(&cli), &engine).unwrap(), 12);
    }

    #[test]
    fn test_generate_rejects_out_of_range_length() {
        let (_, engine) = parse(&["grant-engine", "generate"]);
        assert!(generate_length(Some(0), &engine).is_err());
        assert!(generate_length(Some(MAX_TOKEN_LENGTH + 1), &engine).is_err());
    }
}
