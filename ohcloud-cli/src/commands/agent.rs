//! Agent-server commands.
//!
//! The agent server is addressed either directly (`--agent-url` and
//! `--session-key`) or through the app conversation that owns it
//! (`--conversation-id`).

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use ohcloud_api::{AgentServerClient, AppServerClient};
use ohcloud_export::save_bytes;
use ohcloud_fetch::HttpClient;
use serde_json::json;
use tracing::info;

use crate::Cli;
use crate::output::print_value;

/// Arguments for the agent command.
#[derive(Args)]
pub struct AgentArgs {
    /// Agent server URL (e.g. the sandbox `conversation_url` without its path).
    #[arg(long, requires = "session_key", conflicts_with = "conversation_id")]
    pub agent_url: Option<String>,

    /// Session API key of the sandbox.
    #[arg(long)]
    pub session_key: Option<String>,

    /// App conversation whose agent server to use.
    #[arg(long)]
    pub conversation_id: Option<String>,

    #[command(subcommand)]
    pub action: AgentAction,
}

/// Agent subcommands.
#[derive(Subcommand)]
pub enum AgentAction {
    /// Search events of a conversation.
    SearchEvents {
        /// Conversation ID on the agent server.
        conversation_id: String,
        /// Page size.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Count events of a conversation.
    CountEvents {
        /// Conversation ID on the agent server.
        conversation_id: String,
    },

    /// Run a shell command in the sandbox.
    Bash {
        /// Command line.
        command: String,
        /// Working directory.
        #[arg(long)]
        cwd: Option<String>,
    },

    /// Download a file from the sandbox.
    Download {
        /// Path inside the sandbox.
        path: String,
        /// Local file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Upload a file into the sandbox.
    Upload {
        /// Path inside the sandbox.
        path: String,
        /// Local file to upload.
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        /// Literal content to upload.
        #[arg(long)]
        content: Option<String>,
    },
}

/// Runs the agent command.
pub async fn run(args: &AgentArgs, cli: &Cli) -> Result<()> {
    let client = connect(args, cli).await?;
    info!(agent = client.base_url(), "Using agent server");

    match &args.action {
        AgentAction::SearchEvents {
            conversation_id,
            limit,
        } => {
            print_value(cli, &client.search_events(conversation_id, *limit).await?)?;
        }
        AgentAction::CountEvents { conversation_id } => {
            print_value(cli, &client.count_events(conversation_id).await?)?;
        }
        AgentAction::Bash { command, cwd } => {
            print_value(cli, &client.execute_bash(command, cwd.as_deref()).await?)?;
        }
        AgentAction::Download { path, out } => {
            let data = client.download_file(path).await?;
            if let Some(out) = out {
                save_bytes(out, &data).await?;
                print_value(cli, &json!({ "path": out, "bytes": data.len() }))?;
            } else {
                std::io::stdout()
                    .write_all(&data)
                    .context("writing file to stdout")?;
            }
        }
        AgentAction::Upload {
            path,
            file,
            content,
        } => {
            let data = match (file, content) {
                (Some(file), _) => tokio::fs::read(file)
                    .await
                    .with_context(|| format!("reading {}", file.display()))?,
                (None, Some(content)) => content.clone().into_bytes(),
                (None, None) => bail!("upload needs --file or --content"),
            };
            print_value(cli, &client.upload_file(path, data).await?)?;
        }
    }

    Ok(())
}

async fn connect(args: &AgentArgs, cli: &Cli) -> Result<AgentServerClient> {
    if let Some(conversation_id) = &args.conversation_id {
        let config = cli.client_config()?;
        let app = AppServerClient::new(&config)?;
        return Ok(app.agent_client(conversation_id).await?);
    }

    let (Some(url), Some(key)) = (&args.agent_url, &args.session_key) else {
        bail!("agent commands need --conversation-id or --agent-url with --session-key");
    };
    let http = match cli.request_timeout() {
        Some(timeout) => HttpClient::with_timeout(timeout)?,
        None => HttpClient::new()?,
    };
    Ok(AgentServerClient::new(http, url, key.clone()))
}
