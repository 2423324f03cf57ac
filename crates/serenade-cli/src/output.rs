//! Output formatting for CLI

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format options
pub enum OutputFormat {
    Text,
    Json,
    Table,
}

impl From<&str> for OutputFormat {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputFormat::Json,
            "table" => OutputFormat::Table,
            _ => OutputFormat::Text,
        }
    }
}

/// Render rows in the selected format.
///
/// `text` falls back to one line per row built by `line`.
pub fn format_rows<T, F>(rows: &[T], format: &str, line: F) -> String
where
    T: Serialize + Tabled,
    F: Fn(&T) -> String,
{
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            serde_json::to_string_pretty(rows).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Text => rows.iter().map(line).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single value as JSON, or `None` when the caller prints text
pub fn format_json<T: Serialize>(data: &T, format: &str) -> Option<String> {
    match OutputFormat::from(format) {
        OutputFormat::Json => {
            Some(serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string()))
        }
        OutputFormat::Table | OutputFormat::Text => None,
    }
}
