// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! `ohcloud` - OpenHands Cloud from the command line.
//!
//! # Examples
//!
//! ```bash
//! # List conversations
//! ohcloud v0 list --max-pages 2
//!
//! # Events of one conversation, falling back to its runtime
//! ohcloud v0 events abc123 --limit 50 --pretty
//!
//! # Wait for a conversation to stop
//! ohcloud v0 poll abc123 --interval 10 --timeout-s 600
//!
//! # Export, then make a redacted short copy and a transcript
//! ohcloud export --conversation-id abc123 --out exports/abc123.json
//! ohcloud truncate --in exports/abc123.json --out exports/abc123.short.json
//! ohcloud render --in exports/abc123.json --out exports/abc123.md
//! ```

mod commands;
mod output;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ohcloud_api::ApiError;
use ohcloud_core::CoreError;
use ohcloud_export::ExportError;
use ohcloud_fetch::{ClientConfig, FetchError};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{PollIncomplete, agent, export, render, truncate, v0, v1};

// ============================================================================
// CLI Definition
// ============================================================================

/// OpenHands Cloud API client.
#[derive(Parser)]
#[command(name = "ohcloud")]
#[command(about = "OpenHands Cloud API client")]
#[command(long_about = r#"
ohcloud talks to the OpenHands Cloud API.

Reads of conversation events and trajectories fall back to the
conversation's runtime (V0) or agent server (V1) when the app host
answers with a maintenance page or 503.

Environment:
  OPENHANDS_API_KEY    API key (required for v0, v1 and export)
  OPENHANDS_APP_BASE   App base URL (default https://app.all-hands.dev)
  GITHUB_TOKEN         Token for `v0 github-comment`
  RUST_LOG             Refines logging

Exit codes:
  0 success, 1 failure, 2 missing configuration, 3 service unavailable,
  4 authentication failure, 5 polling ended before a terminal status
"#)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Commands,

    /// App base URL (overrides OPENHANDS_APP_BASE).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout in seconds.
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "json", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging, no error message).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Builds the client configuration from the environment and flags.
    pub fn client_config(&self) -> Result<ClientConfig, FetchError> {
        let mut builder = ClientConfig::builder()
            .lookup(|name| std::env::var(name).ok())
            .base_url_opt(self.base_url.clone());
        if let Some(timeout) = self.request_timeout() {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Per-request timeout from `--timeout`, if given.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// V0 conversation API (`/api`).
    V0(v0::V0Args),

    /// V1 app-server API (`/api/v1`).
    V1(v1::V1Args),

    /// Agent server of a running sandbox.
    Agent(agent::AgentArgs),

    /// Export a conversation and all of its events to JSON.
    Export(export::ExportArgs),

    /// Write a redacted copy of a JSON file with long strings shortened.
    Truncate(truncate::TruncateArgs),

    /// Render an export as a Markdown transcript.
    Render(render::RenderArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// JSON output for scripting.
    #[default]
    Json,
    /// Human-readable text.
    Text,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Credentials or configuration missing.
    MissingConfig = 2,
    /// Service unavailable, after any fallback.
    Unavailable = 3,
    /// Authentication failed.
    AuthFailed = 4,
    /// Polling stopped before a terminal status.
    PollIncomplete = 5,
}

impl ExitCode {
    /// Picks the exit code for the first recognised error in the chain.
    pub fn for_error(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.is::<PollIncomplete>() {
                return Self::PollIncomplete;
            }
            if let Some(e) = cause.downcast_ref::<ExportError>() {
                return Self::classify(e.is_missing_config(), e.is_unavailable(), e.is_auth());
            }
            if let Some(e) = cause.downcast_ref::<ApiError>() {
                return Self::classify(e.is_missing_config(), e.is_unavailable(), e.is_auth());
            }
            if let Some(e) = cause.downcast_ref::<FetchError>() {
                return Self::classify(e.is_missing_config(), e.is_unavailable(), e.is_auth());
            }
            if let Some(CoreError::MissingCredentials(_)) = cause.downcast_ref::<CoreError>() {
                return Self::MissingConfig;
            }
        }
        Self::Error
    }

    fn classify(missing_config: bool, unavailable: bool, auth: bool) -> Self {
        if missing_config {
            Self::MissingConfig
        } else if unavailable {
            Self::Unavailable
        } else if auth {
            Self::AuthFailed
        } else {
            Self::Error
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let default_directive = if verbose {
        "ohcloud=debug,info"
    } else {
        "ohcloud=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Commands::V0(args) => v0::run(args, &cli).await,
        Commands::V1(args) => v1::run(args, &cli).await,
        Commands::Agent(args) => agent::run(args, &cli).await,
        Commands::Export(args) => export::run(args, &cli).await,
        Commands::Truncate(args) => truncate::run(args).await,
        Commands::Render(args) => render::run(args).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ohcloud", "v0", "events", "abc123", "--limit", "5", "--pretty", "-f", "text",
            "--base-url", "http://localhost:3000",
        ])
        .unwrap();
        assert!(cli.pretty);
        assert_eq!(cli.format, OutputFormat::Text);
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:3000"));
    }

    #[test]
    fn test_exit_codes() {
        let missing: anyhow::Error =
            FetchError::from(CoreError::MissingCredentials("OPENHANDS_API_KEY is not set".into()))
                .into();
        assert_eq!(ExitCode::for_error(&missing), ExitCode::MissingConfig);

        let unavailable: anyhow::Error = ApiError::from(FetchError::Unavailable {
            url: "https://app.all-hands.dev/api/conversations".into(),
            reason: "HTML maintenance page".into(),
        })
        .into();
        assert_eq!(ExitCode::for_error(&unavailable), ExitCode::Unavailable);

        let auth: anyhow::Error = ExportError::from(ApiError::from(
            FetchError::AuthenticationFailed {
                status: 401,
                body: "{}".into(),
            },
        ))
        .into();
        assert_eq!(ExitCode::for_error(&auth), ExitCode::AuthFailed);

        let poll: anyhow::Error = PollIncomplete {
            attempts: 3,
            status: "RUNNING".into(),
        }
        .into();
        assert_eq!(ExitCode::for_error(&poll), ExitCode::PollIncomplete);

        let other = anyhow::anyhow!("boom").context("while listing");
        assert_eq!(ExitCode::for_error(&other), ExitCode::Error);
    }
}
