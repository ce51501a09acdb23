//! Output helpers shared by commands.

use colored::Colorize;
use serde::Serialize;

use crate::error::{FhError, Result, StructuredError};

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)
        .map_err(|err| FhError::Serialization(format!("serialize output: {err}")))?;
    println!("{payload}");
    Ok(())
}

/// Report a command failure: structured JSON on stdout in robot mode,
/// a message plus suggestion on stderr otherwise.
pub fn emit_error(err: &FhError, robot: bool) {
    let structured = StructuredError::from_error(err);
    if robot {
        let payload = serde_json::json!({ "error": structured });
        println!("{}", serde_json::to_string(&payload).unwrap_or_default());
    } else {
        eprintln!("{} {}", "Error:".red().bold(), structured.message);
        eprintln!("  {} {}", "hint:".dimmed(), structured.suggestion);
    }
}

pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 14,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.bold().to_string());
        self.lines.push("-".repeat(text.len().max(3)));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines.push(format!("{} {value}", padded.dimmed()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_layout_pads_keys() {
        colored::control::set_override(false);
        let mut layout = HumanLayout::new();
        layout.title("Hedging").kv("Source", "relational").blank();
        let rendered = layout.build();
        assert!(rendered.starts_with("Hedging\n\n"));
        assert!(rendered.contains("Source         relational"));
    }
}
