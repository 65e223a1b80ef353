//! Render command - an export as a Markdown transcript.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ohcloud_export::{RenderOptions, load_json, render_markdown, save_text};
use serde_json::Value;
use tracing::info;

/// Arguments for the render command.
#[derive(Args)]
pub struct RenderArgs {
    /// Export JSON file.
    #[arg(long = "in")]
    pub input: PathBuf,

    /// Markdown output file.
    #[arg(long)]
    pub out: PathBuf,

    /// Characters kept from the start of long observations.
    #[arg(long, default_value = "100")]
    pub head: usize,

    /// Characters kept from the end of long observations.
    #[arg(long, default_value = "100")]
    pub tail: usize,
}

/// Runs the render command.
pub async fn run(args: &RenderArgs) -> Result<()> {
    let document: Value = load_json(&args.input).await?;
    let options = RenderOptions {
        head: args.head,
        tail: args.tail,
    };
    let markdown = render_markdown(&document, &options)?;
    save_text(&args.out, &markdown).await?;
    info!(out = %args.out.display(), bytes = markdown.len(), "Transcript written");
    println!("Wrote {}", args.out.display());
    Ok(())
}
