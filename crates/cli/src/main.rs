//! Vigil CLI
//!
//! A command-line tool for reading the dashboard server's monitors,
//! posting messages and exporting monitoring data.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{messages, monitors, overview};

/// Vigil dashboard CLI
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about = "CLI for the Vigil monitoring dashboard", long_about = None)]
pub struct Cli {
    /// Dashboard server URL (can also be set via VIGIL_SERVER_URL env var)
    #[arg(long, env = "VIGIL_SERVER_URL", default_value = "http://localhost:3001")]
    pub server_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the dashboard summary
    Status,

    /// Show host resource metrics
    System,

    /// Show external API performance
    Api,

    /// Show agent connectivity and connected clients
    Agents,

    /// Show security events and threat level
    Security,

    /// Show health scores, anomalies and recommendations
    Analytics,

    /// List recent messages
    Messages,

    /// Send a message to all connected clients
    Send {
        /// Message text
        text: String,

        /// Author name (defaults to anonymous on the server)
        #[arg(long, short)]
        author: Option<String>,
    },

    /// Export all monitoring data as JSON
    Export {
        /// Output file path
        #[arg(long, short)]
        output: Option<String>,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let client = client::ApiClient::new(&cli.server_url)?;

    if cli.verbose {
        output::print_info(&format!("Server: {}", client.base_url()));
    }

    match cli.command {
        Commands::Status => overview::show_status(&client, cli.format).await?,
        Commands::System => monitors::show_system(&client, cli.format).await?,
        Commands::Api => monitors::show_api(&client, cli.format).await?,
        Commands::Agents => monitors::show_agents(&client, cli.format).await?,
        Commands::Security => monitors::show_security(&client, cli.format).await?,
        Commands::Analytics => monitors::show_analytics(&client, cli.format).await?,
        Commands::Messages => messages::list_messages(&client, cli.format).await?,
        Commands::Send { text, author } => {
            messages::send_message(&client, text, author, cli.format).await?
        }
        Commands::Export { output } => messages::export(&client, output, cli.format).await?,
        Commands::Health => overview::show_health(&client, cli.format).await?,
    }

    Ok(())
}
