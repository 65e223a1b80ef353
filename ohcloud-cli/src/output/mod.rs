//! Output formatting for CLI.

mod json;
mod text;

use anyhow::Result;
use serde::Serialize;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::{Cli, OutputFormat};

/// Prints a payload in the selected format.
pub fn print_value<T: Serialize + ?Sized>(cli: &Cli, value: &T) -> Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", JsonFormatter::new(cli.pretty).format(value)?),
        OutputFormat::Text => {
            let value = serde_json::to_value(value)?;
            println!("{}", TextFormatter::new(!cli.no_color).format_value(&value));
        }
    }
    Ok(())
}
