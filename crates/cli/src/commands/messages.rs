//! Message feed and data export commands

use anyhow::{Context, Result};
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ChatMessage, MessageRequest};
use crate::output::{
    format_timestamp_ms, print_heading, print_info, print_json, print_success, print_table,
    OutputFormat,
};

#[derive(Tabled)]
struct MessageRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Author")]
    author: String,
    #[tabled(rename = "Message")]
    text: String,
}

/// List the recent message history
pub async fn list_messages(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let messages: Vec<ChatMessage> = client.get("api/messages").await?;

    match format {
        OutputFormat::Json => print_json(&messages)?,
        OutputFormat::Table => {
            print_heading("Recent Messages");
            let rows: Vec<MessageRow> = messages
                .iter()
                .map(|m| MessageRow {
                    time: format_timestamp_ms(m.timestamp_ms),
                    author: m.author.clone(),
                    text: m.text.clone(),
                })
                .collect();
            print_table(&rows, "No messages yet");
        }
    }

    Ok(())
}

/// Post a message to every connected client
pub async fn send_message(
    client: &ApiClient,
    text: String,
    author: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let request = MessageRequest { text, author };
    let message: ChatMessage = client.post("api/messages", &request).await?;

    match format {
        OutputFormat::Json => print_json(&message)?,
        OutputFormat::Table => {
            print_success(&format!("Message {} sent", message.id.cyan()));
            println!("Author:     {}", message.author);
            println!("Text:       {}", message.text);
        }
    }

    Ok(())
}

/// Download the full monitoring export
pub async fn export(
    client: &ApiClient,
    output: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let export: serde_json::Value = client.get("api/monitoring/export").await?;
    let json = serde_json::to_string_pretty(&export)?;

    if let Some(output_path) = output {
        std::fs::write(&output_path, &json)
            .with_context(|| format!("Failed to write {}", output_path))?;
        print_success(&format!("Monitoring data exported to {}", output_path));
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", json),
        OutputFormat::Table => {
            print_heading("Monitoring Export");
            if let Some(sections) = export.as_object() {
                for (key, value) in sections {
                    let size = match value {
                        serde_json::Value::Array(items) => format!("{} entries", items.len()),
                        serde_json::Value::Object(fields) => format!("{} fields", fields.len()),
                        other => other.to_string(),
                    };
                    println!("{:<24}{}", key, size);
                }
            }
            println!();
            print_info("Use --output <file> to save to a file");
            print_info("Use --format json to see full data");
        }
    }

    Ok(())
}
