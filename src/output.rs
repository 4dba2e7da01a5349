//! Human-readable and JSON output for CLI commands.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines and tables
    #[default]
    Pretty,
    /// JSON output
    Json,
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat, empty: &str) {
    match format {
        OutputFormat::Pretty => {
            if items.is_empty() {
                println!("{empty}");
            } else {
                println!("{}", Table::new(items));
            }
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print a single item as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(item: &T) {
    let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "null".to_string());
    println!("{json}");
}

/// Print one JSON value per line.
pub fn print_json_line<T: Serialize>(item: &T) {
    match serde_json::to_string(item) {
        Ok(line) => println!("{line}"),
        Err(e) => print_error(&format!("Failed to serialize output: {e}")),
    }
}

/// Print a status line prefixed with the local wall-clock time.
pub fn print_timestamped(at: DateTime<Utc>, msg: &str) {
    println!("[{}] {msg}", at.with_timezone(&Local).format("%H:%M:%S"));
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<20} {value}", format!("{key}:"));
}
