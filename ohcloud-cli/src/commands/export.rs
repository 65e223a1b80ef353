//! Export command - one conversation and all of its events to JSON.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use ohcloud_api::CloudClient;
use ohcloud_core::ConversationStatus;
use ohcloud_export::export_conversation;
use ohcloud_fetch::PageLimits;
use serde_json::json;
use tracing::info;

use crate::output::print_value;
use crate::{Cli, OutputFormat};

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    /// Conversation ID.
    #[arg(long)]
    pub conversation_id: String,

    /// Output file (default `exports/{id}.json`).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Events per page (1-100).
    #[arg(long, default_value = "100")]
    pub limit: u32,

    /// Stop after this many pages.
    #[arg(long, default_value = "1000")]
    pub max_pages: usize,

    /// Stop after this many events.
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Seconds to wait between pages.
    #[arg(long, default_value = "0")]
    pub sleep_s: f64,
}

impl ExportArgs {
    fn page_delay(&self) -> Result<Duration> {
        match Duration::try_from_secs_f64(self.sleep_s) {
            Ok(delay) => Ok(delay),
            Err(e) => bail!("--sleep-s must be a non-negative number of seconds: {e}"),
        }
    }

    fn out_path(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("exports/{}.json", self.conversation_id)))
    }
}

/// Runs the export command.
pub async fn run(args: &ExportArgs, cli: &Cli) -> Result<()> {
    let delay = args.page_delay()?;
    let config = cli.client_config()?;
    let client = CloudClient::new(&config)?;
    let limits = PageLimits::pages(args.max_pages).with_max_items_opt(args.max_items);

    let export =
        export_conversation(&client, &args.conversation_id, args.limit, limits, delay).await?;
    let path = args.out_path();
    export.document.save(&path).await?;

    let conversation = &export.details;
    let status = conversation
        .status
        .as_ref()
        .map_or("unknown", ConversationStatus::as_str);
    let title = conversation.title.as_deref().unwrap_or("");
    info!(path = %path.display(), events = export.document.events.len(), "Export written");

    match cli.format {
        OutputFormat::Json => print_value(
            cli,
            &json!({
                "path": path,
                "conversation_id": conversation.conversation_id,
                "events": export.document.events.len(),
                "pages": export.pages,
                "truncated": export.is_truncated(),
                "status": status,
                "title": title,
            }),
        )?,
        OutputFormat::Text => println!(
            "Wrote {} events to {} (status={status}, title={title})",
            export.document.events.len(),
            path.display()
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(sleep_s: f64) -> ExportArgs {
        ExportArgs {
            conversation_id: "abc123".into(),
            out: None,
            limit: 100,
            max_pages: 1000,
            max_items: None,
            sleep_s,
        }
    }

    #[test]
    fn test_default_out_path() {
        assert_eq!(args(0.0).out_path(), PathBuf::from("exports/abc123.json"));
    }

    #[test]
    fn test_page_delay() {
        assert_eq!(args(0.5).page_delay().unwrap(), Duration::from_millis(500));
        assert!(args(-1.0).page_delay().is_err());
        assert!(args(f64::NAN).page_delay().is_err());
        assert!(args(f64::INFINITY).page_delay().is_err());
        assert!(args(1e30).page_delay().is_err());
    }
}
