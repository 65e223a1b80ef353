//! V1 commands - the app server (`/api/v1`).

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use ohcloud_api::{AppServerClient, StartConversation};
use ohcloud_export::save_bytes;
use serde_json::json;
use tracing::info;

use super::{PageArgs, PollArgs, PollIncomplete};
use crate::output::{JsonFormatter, TextFormatter, print_value};
use crate::{Cli, OutputFormat};

/// Arguments for the v1 command.
#[derive(Args)]
pub struct V1Args {
    #[command(subcommand)]
    pub action: V1Action,
}

/// V1 subcommands.
#[derive(Subcommand)]
pub enum V1Action {
    /// Search app conversations.
    SearchConversations {
        /// Page size.
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Follow `next_page_id` within the page bounds.
        #[arg(long)]
        all: bool,
        /// Page token to start from.
        #[arg(long)]
        page_id: Option<String>,
        #[command(flatten)]
        pages: PageArgs,
    },

    /// Count app conversations.
    CountConversations,

    /// Show one app conversation.
    GetConversation {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Start a conversation; prints the start task.
    StartConversation {
        /// Initial message.
        message: String,
        /// Repository (`owner/repo`).
        #[arg(long)]
        repo: Option<String>,
        /// Branch.
        #[arg(long)]
        branch: Option<String>,
        /// Title.
        #[arg(long)]
        title: Option<String>,
        /// Wait for the start task to finish.
        #[arg(long)]
        wait: bool,
        #[command(flatten)]
        poll: PollArgs,
    },

    /// Show a start task.
    StartTask {
        /// Task ID.
        task_id: String,
    },

    /// Poll a start task until it is READY or ERROR.
    WaitStartTask {
        /// Task ID.
        task_id: String,
        #[command(flatten)]
        poll: PollArgs,
    },

    /// Search sandboxes.
    SearchSandboxes {
        /// Page size.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Search sandbox specs.
    SearchSandboxSpecs {
        /// Page size.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Resume a paused sandbox.
    ResumeSandbox {
        /// Sandbox ID.
        sandbox_id: String,
    },

    /// Pause a running sandbox.
    PauseSandbox {
        /// Sandbox ID.
        sandbox_id: String,
    },

    /// Search events, falling back to the agent server.
    SearchEvents {
        /// Conversation ID.
        conversation_id: String,
        /// Page size.
        #[arg(long, default_value = "20")]
        limit: u32,
    },

    /// Count events, falling back to the agent server.
    CountEvents {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Show the authenticated user.
    User,

    /// Write the trajectory archive (zip) to a file.
    DownloadTrajectory {
        /// Conversation ID.
        conversation_id: String,
        /// Output file (default `trajectory_{id}.zip`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Runs the v1 command.
#[allow(clippy::too_many_lines)]
pub async fn run(args: &V1Args, cli: &Cli) -> Result<()> {
    let config = cli.client_config()?;
    let client = AppServerClient::new(&config)?;

    match &args.action {
        V1Action::SearchConversations {
            limit,
            all,
            page_id,
            pages,
        } => {
            if *all {
                let result = client
                    .search_all_app_conversations(*limit, pages.limits())
                    .await?;
                match cli.format {
                    OutputFormat::Json => {
                        println!("{}", JsonFormatter::new(cli.pretty).format_paginated(&result)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{}",
                            TextFormatter::new(!cli.no_color).format_app_conversations(&result)
                        );
                    }
                }
            } else {
                let page = client
                    .search_app_conversations(*limit, page_id.as_deref())
                    .await?;
                print_value(cli, &page)?;
            }
        }
        V1Action::CountConversations => {
            print_value(cli, &client.count_app_conversations().await?)?;
        }
        V1Action::GetConversation { conversation_id } => {
            print_value(cli, &client.get_app_conversation(conversation_id).await?)?;
        }
        V1Action::StartConversation {
            message,
            repo,
            branch,
            title,
            wait,
            poll,
        } => {
            let params = StartConversation {
                selected_repository: repo.clone(),
                selected_branch: branch.clone(),
                title: title.clone(),
                ..StartConversation::new(message.clone())
            };
            let task = client.start_app_conversation(&params).await?;
            if *wait && !task.status.is_terminal() {
                wait_for_task(&client, &task.id, poll, cli).await?;
            } else {
                print_value(cli, &task)?;
            }
        }
        V1Action::StartTask { task_id } => {
            print_value(cli, &client.get_start_task(task_id).await?)?;
        }
        V1Action::WaitStartTask { task_id, poll } => {
            wait_for_task(&client, task_id, poll, cli).await?;
        }
        V1Action::SearchSandboxes { limit } => {
            print_value(cli, &client.search_sandboxes(*limit).await?)?;
        }
        V1Action::SearchSandboxSpecs { limit } => {
            print_value(cli, &client.search_sandbox_specs(*limit).await?)?;
        }
        V1Action::ResumeSandbox { sandbox_id } => {
            print_value(cli, &client.resume_sandbox(sandbox_id).await?)?;
        }
        V1Action::PauseSandbox { sandbox_id } => {
            print_value(cli, &client.pause_sandbox(sandbox_id).await?)?;
        }
        V1Action::SearchEvents {
            conversation_id,
            limit,
        } => {
            discover_agent(&client, conversation_id).await?;
            print_value(cli, &client.search_events(conversation_id, *limit).await?)?;
        }
        V1Action::CountEvents { conversation_id } => {
            discover_agent(&client, conversation_id).await?;
            print_value(cli, &client.count_events(conversation_id).await?)?;
        }
        V1Action::User => print_value(cli, &client.get_current_user().await?)?,
        V1Action::DownloadTrajectory {
            conversation_id,
            out,
        } => {
            let archive = client.download_trajectory(conversation_id).await?;
            let path = out
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("trajectory_{conversation_id}.zip")));
            save_bytes(&path, &archive.data).await?;
            info!(path = %path.display(), bytes = archive.data.len(), "Trajectory archive written");
            print_value(
                cli,
                &json!({
                    "path": path,
                    "bytes": archive.data.len(),
                    "content_type": archive.content_type,
                }),
            )?;
        }
    }

    Ok(())
}

/// Fetches the app conversation so its agent server can serve as a fallback.
///
/// A missing conversation is not an error here; the event call reports it.
async fn discover_agent(client: &AppServerClient, conversation_id: &str) -> Result<()> {
    match client.get_app_conversation(conversation_id).await {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn wait_for_task(
    client: &AppServerClient,
    task_id: &str,
    poll: &PollArgs,
    cli: &Cli,
) -> Result<()> {
    let outcome = client.wait_for_start_task(task_id, poll.settings()).await?;
    let status = outcome.last.status.to_string();
    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format_poll(&outcome)?),
        OutputFormat::Text => {
            println!("{}", TextFormatter::new(!cli.no_color).format_poll(&outcome, &status));
        }
    }
    if outcome.is_terminal() {
        Ok(())
    } else {
        Err(PollIncomplete {
            attempts: outcome.attempts,
            status,
        }
        .into())
    }
}
