//! Truncate command - a redacted, shortened copy of a JSON file.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use ohcloud_export::{TruncateOptions, load_json, save_json, truncate_value};
use serde_json::Value;
use tracing::info;

/// Arguments for the truncate command.
#[derive(Args)]
pub struct TruncateArgs {
    /// Input JSON file.
    #[arg(long = "in")]
    pub input: PathBuf,

    /// Output JSON file.
    #[arg(long)]
    pub out: PathBuf,

    /// Strings longer than this are shortened.
    #[arg(long, default_value = "5000")]
    pub max_len: usize,

    /// Characters kept from the start of a shortened string.
    #[arg(long, default_value = "100")]
    pub head: usize,

    /// Characters kept from the end of a shortened string.
    #[arg(long, default_value = "100")]
    pub tail: usize,
}

impl TruncateArgs {
    fn options(&self) -> TruncateOptions {
        TruncateOptions {
            max_len: self.max_len,
            head: self.head,
            tail: self.tail,
        }
    }
}

/// Runs the truncate command.
pub async fn run(args: &TruncateArgs) -> Result<()> {
    let data: Value = load_json(&args.input).await?;
    let shortened = truncate_value(&data, &args.options());
    save_json(&args.out, &shortened).await?;
    info!(
        input = %args.input.display(),
        out = %args.out.display(),
        "Truncated copy written"
    );
    println!("Wrote {}", args.out.display());
    Ok(())
}
