//! V0 commands - conversations on the `/api` surface.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use ohcloud_api::{CloudClient, EventQuery};
use ohcloud_api::v0::DEFAULT_COMMON_TAIL_PATH;
use ohcloud_core::{ConversationStatus, CoreError};
use serde_json::json;
use tracing::info;

use super::{PageArgs, PollArgs, PollIncomplete};
use crate::output::{JsonFormatter, TextFormatter, print_value};
use crate::{Cli, OutputFormat};

/// Arguments for the v0 command.
#[derive(Args)]
pub struct V0Args {
    #[command(subcommand)]
    pub action: V0Action,
}

/// V0 subcommands.
#[derive(Subcommand)]
pub enum V0Action {
    /// List conversations.
    List {
        /// Page size (1-100).
        #[arg(long, default_value = "100")]
        limit: u32,
        #[command(flatten)]
        pages: PageArgs,
    },

    /// Show one conversation.
    Get {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Create a conversation from a message.
    Create {
        /// Initial user message.
        message: String,
        /// Repository (`owner/repo`).
        #[arg(long)]
        repo: Option<String>,
        /// Branch.
        #[arg(long)]
        branch: Option<String>,
    },

    /// Create a conversation from a prompt file plus the common tail.
    CreateFromFile {
        /// Prompt file.
        prompt: PathBuf,
        /// Repository (`owner/repo`).
        #[arg(long)]
        repo: Option<String>,
        /// Tail appended when the file exists.
        #[arg(long, default_value = DEFAULT_COMMON_TAIL_PATH)]
        tail: PathBuf,
    },

    /// Show the full trajectory.
    Trajectory {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Write the trajectory to a JSON file.
    DownloadTrajectory {
        /// Conversation ID.
        conversation_id: String,
        /// Output file (default `trajectory_{id}.json`).
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show events.
    Events {
        /// Conversation ID.
        conversation_id: String,
        /// First event id.
        #[arg(long, default_value = "0")]
        start_id: u64,
        /// Last event id.
        #[arg(long)]
        end_id: Option<u64>,
        /// Newest first.
        #[arg(long)]
        reverse: bool,
        /// Page size (1-100).
        #[arg(long, default_value = "20")]
        limit: u32,
        /// Follow pages until the end (within the page bounds).
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        pages: PageArgs,
    },

    /// Show details, event count, model and first message.
    Summary {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Poll until the conversation stops.
    Poll {
        /// Conversation ID.
        conversation_id: String,
        #[command(flatten)]
        poll: PollArgs,
    },

    /// Delete a conversation.
    Delete {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Start the agent loop.
    Start {
        /// Conversation ID.
        conversation_id: String,
        /// Git provider to enable (e.g. `github`).
        #[arg(long)]
        provider: Option<String>,
    },

    /// Stop a conversation.
    Stop {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Send a message.
    Message {
        /// Conversation ID.
        conversation_id: String,
        /// Message text.
        message: String,
    },

    /// List workspace files.
    Files {
        /// Conversation ID.
        conversation_id: String,
        /// Sub-path.
        #[arg(long)]
        path: Option<String>,
    },

    /// Show the runtime configuration.
    RuntimeConfig {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Show the VS Code URL.
    VscodeUrl {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Show the runtime web hosts.
    WebHosts {
        /// Conversation ID.
        conversation_id: String,
    },

    /// List microagents.
    Microagents {
        /// Conversation ID.
        conversation_id: String,
    },

    /// Submit feedback.
    Feedback {
        /// Conversation ID.
        conversation_id: String,
        /// Feedback type (e.g. `positive`, `negative`).
        feedback_type: String,
        /// Feedback text.
        text: String,
        /// Event the feedback is about.
        #[arg(long)]
        event_id: Option<u64>,
    },

    /// Show account settings.
    Settings,

    /// Store LLM settings.
    StoreSettings {
        /// Model name.
        model: String,
        /// LLM base URL.
        #[arg(long)]
        llm_base_url: Option<String>,
        /// LLM API key.
        #[arg(long)]
        llm_api_key: Option<String>,
    },

    /// Show the authenticated user.
    User,

    /// Comment on a GitHub issue or pull request.
    GithubComment {
        /// Repository (`owner/repo`).
        repo: String,
        /// Issue or pull request number.
        issue_number: u64,
        /// Comment text.
        comment: String,
        /// GitHub token (default: `GITHUB_TOKEN`).
        #[arg(long)]
        github_token: Option<String>,
    },
}

/// Runs the v0 command.
#[allow(clippy::too_many_lines)]
pub async fn run(args: &V0Args, cli: &Cli) -> Result<()> {
    let config = cli.client_config()?;
    let client = CloudClient::new(&config)?;

    match &args.action {
        V0Action::List { limit, pages } => {
            let result = client.list_conversations(*limit, pages.limits()).await?;
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format_paginated(&result)?);
                }
                OutputFormat::Text => {
                    println!("{}", TextFormatter::new(!cli.no_color).format_conversations(&result));
                }
            }
        }
        V0Action::Get { conversation_id } => {
            print_value(cli, &client.get_conversation(conversation_id).await?)?;
        }
        V0Action::Create {
            message,
            repo,
            branch,
        } => {
            let created = client
                .create_conversation(message, repo.as_deref(), branch.as_deref())
                .await?;
            print_value(cli, &created)?;
        }
        V0Action::CreateFromFile { prompt, repo, tail } => {
            let created = client
                .create_conversation_from_files(prompt, repo.as_deref(), Some(tail))
                .await?;
            print_value(cli, &created)?;
        }
        V0Action::Trajectory { conversation_id } => {
            client.discover_runtime(conversation_id).await?;
            print_value(cli, &client.get_trajectory(conversation_id).await?)?;
        }
        V0Action::DownloadTrajectory {
            conversation_id,
            out,
        } => {
            client.discover_runtime(conversation_id).await?;
            let path = client
                .download_trajectory(conversation_id, out.as_deref())
                .await?;
            info!(path = %path.display(), "Trajectory written");
            print_value(cli, &json!({ "path": path }))?;
        }
        V0Action::Events {
            conversation_id,
            start_id,
            end_id,
            reverse,
            limit,
            all,
            pages,
        } => {
            client.discover_runtime(conversation_id).await?;
            if *all {
                let result = client
                    .iter_all_events(conversation_id, *limit, pages.limits())
                    .await?;
                match cli.format {
                    OutputFormat::Json => {
                        println!("{}", JsonFormatter::new(cli.pretty).format_paginated(&result)?);
                    }
                    OutputFormat::Text => {
                        println!("{}", TextFormatter::new(!cli.no_color).format_events(&result.items));
                    }
                }
            } else {
                let query = EventQuery {
                    start_id: *start_id,
                    end_id: *end_id,
                    reverse: *reverse,
                    limit: *limit,
                };
                let page = client.get_events(conversation_id, &query).await?;
                match cli.format {
                    OutputFormat::Json => print_value(cli, &page)?,
                    OutputFormat::Text => {
                        println!("{}", TextFormatter::new(!cli.no_color).format_events(&page.events));
                    }
                }
            }
        }
        V0Action::Summary { conversation_id } => {
            let summary = client.get_conversation_summary(conversation_id).await?;
            match cli.format {
                OutputFormat::Json => print_value(cli, &summary)?,
                OutputFormat::Text => {
                    println!("{}", TextFormatter::new(!cli.no_color).format_summary(&summary));
                }
            }
        }
        V0Action::Poll {
            conversation_id,
            poll,
        } => {
            let outcome = client
                .poll_until_stopped(conversation_id, poll.settings())
                .await?;
            let status = outcome
                .last
                .status
                .as_ref()
                .map_or("unknown", ConversationStatus::as_str)
                .to_string();
            match cli.format {
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::new(cli.pretty).format_poll(&outcome)?);
                }
                OutputFormat::Text => {
                    println!("{}", TextFormatter::new(!cli.no_color).format_poll(&outcome, &status));
                }
            }
            if !outcome.is_terminal() {
                return Err(PollIncomplete {
                    attempts: outcome.attempts,
                    status,
                }
                .into());
            }
        }
        V0Action::Delete { conversation_id } => {
            print_value(cli, &client.delete_conversation(conversation_id).await?)?;
        }
        V0Action::Start {
            conversation_id,
            provider,
        } => {
            let started = client
                .start_conversation(conversation_id, provider.as_deref())
                .await?;
            print_value(cli, &started)?;
        }
        V0Action::Stop { conversation_id } => {
            print_value(cli, &client.stop_conversation(conversation_id).await?)?;
        }
        V0Action::Message {
            conversation_id,
            message,
        } => {
            print_value(cli, &client.send_message(conversation_id, message).await?)?;
        }
        V0Action::Files {
            conversation_id,
            path,
        } => {
            print_value(cli, &client.list_files(conversation_id, path.as_deref()).await?)?;
        }
        V0Action::RuntimeConfig { conversation_id } => {
            print_value(cli, &client.get_runtime_config(conversation_id).await?)?;
        }
        V0Action::VscodeUrl { conversation_id } => {
            let url = client.get_vscode_url(conversation_id).await?;
            print_value(cli, &json!({ "vscode_url": url }))?;
        }
        V0Action::WebHosts { conversation_id } => {
            let hosts = client.get_web_hosts(conversation_id).await?;
            print_value(cli, &json!({ "hosts": hosts }))?;
        }
        V0Action::Microagents { conversation_id } => {
            print_value(cli, &client.get_microagents(conversation_id).await?)?;
        }
        V0Action::Feedback {
            conversation_id,
            feedback_type,
            text,
            event_id,
        } => {
            let result = client
                .submit_feedback(conversation_id, feedback_type, text, *event_id)
                .await?;
            print_value(cli, &result)?;
        }
        V0Action::Settings => print_value(cli, &client.get_settings().await?)?,
        V0Action::StoreSettings {
            model,
            llm_base_url,
            llm_api_key,
        } => {
            let stored = client
                .store_llm_settings(model, llm_base_url.as_deref(), llm_api_key.as_deref())
                .await
                .context("storing LLM settings")?;
            print_value(cli, &stored)?;
        }
        V0Action::User => print_value(cli, &client.get_user_info().await?)?,
        V0Action::GithubComment {
            repo,
            issue_number,
            comment,
            github_token,
        } => {
            let token =
                resolve_github_token(github_token.as_deref(), |name| std::env::var(name).ok())?;
            let created = client
                .post_github_comment(repo, *issue_number, comment, &token)
                .await?;
            print_value(cli, &created)?;
        }
    }

    Ok(())
}

/// Environment variable holding the GitHub token.
const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";

/// `--github-token`, else `GITHUB_TOKEN`.
fn resolve_github_token(
    flag: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, CoreError> {
    flag.map(str::to_string)
        .or_else(|| lookup(GITHUB_TOKEN_ENV))
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            CoreError::MissingCredentials(format!(
                "pass --github-token or set {GITHUB_TOKEN_ENV}"
            ))
        })
}
