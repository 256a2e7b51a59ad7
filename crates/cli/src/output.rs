//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled>(items: &[T], empty_message: &str) {
    if items.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Pretty-print any serializable value
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(60));
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format seconds as `1d 2h 3m`
pub fn format_duration(secs: u64) -> String {
    let days = secs / 86_400;
    let hours = (secs % 86_400) / 3_600;
    let minutes = (secs % 3_600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

/// Format Unix milliseconds as UTC `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp_ms(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// Color a status label by how good it is
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "optimal" | "healthy" | "excellent" | "good" | "protected" | "stable" | "improving"
        | "low" | "normal" => status.green().to_string(),
        "stressed" | "degraded" | "warning" | "fair" | "vigilant" | "fluctuating" | "medium"
        | "moderate" | "insufficient_data" => status.yellow().to_string(),
        "critical" | "unhealthy" | "poor" | "alert" | "under_siege" | "turbulent" | "chaotic"
        | "degrading" | "high" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a 0-100 score
pub fn color_score(score: f64) -> String {
    let formatted = format!("{:.1}", score);
    if score >= 80.0 {
        formatted.green().to_string()
    } else if score >= 60.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
