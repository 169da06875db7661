//! Shared output helpers for CLI commands.

use console::style;
use serde::Serialize;

use tandem_types::error::CoreError;
use tandem_types::message::MessageStatus;
use tandem_types::outcome::OperationResult;

/// Output mode resolved from the global flags.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    /// Print `result` as an [`OperationResult`] in JSON mode, or hand the
    /// success value to `render` otherwise.
    ///
    /// Failures become an error exit in both modes.
    pub fn finish<T: Serialize>(
        self,
        result: Result<T, CoreError>,
        render: impl FnOnce(&T),
    ) -> anyhow::Result<()> {
        if self.json {
            let failed = result.as_ref().err().map(|e| e.kind());
            println!(
                "{}",
                serde_json::to_string_pretty(&OperationResult::from(result))?
            );
            if let Some(kind) = failed {
                anyhow::bail!("operation failed ({kind})");
            }
            return Ok(());
        }

        let value = result?;
        if !self.quiet {
            render(&value);
        }
        Ok(())
    }
}

pub fn success(message: impl std::fmt::Display) {
    println!();
    println!("  {} {message}", style("✓").green().bold());
    println!();
}

pub fn hint(message: impl std::fmt::Display) {
    println!("  {}", style(message).dim());
    println!();
}

pub fn status_cell(status: MessageStatus) -> comfy_table::Cell {
    use comfy_table::{Cell, Color};
    let color = match status {
        MessageStatus::Sent => Color::Yellow,
        MessageStatus::Delivered => Color::Cyan,
        MessageStatus::Read => Color::Green,
    };
    Cell::new(status.to_string()).fg(color)
}

/// Shorten `text` to `max` characters for table cells.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
