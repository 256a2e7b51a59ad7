//! Dashboard summary and server health commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, DashboardView, HealthReport, Liveness};
use crate::output::{
    color_score, color_status, format_duration, print_heading, print_json, print_table,
    OutputFormat,
};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Show the one-screen dashboard summary
pub async fn show_status(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let view: DashboardView = client.get_data("api/monitoring/dashboard").await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let s = &view.summary;
            print_heading("Dashboard Summary");
            println!("Overall Health:         {}", color_score(s.overall_health));
            println!("System Uptime:          {}", format_duration(s.system_uptime));
            println!("Connected Agents:       {}", s.total_connected_agents);
            println!();
            println!("System:                 {}", color_status(&s.system_health));
            println!("APIs:                   {}", color_status(&s.api_health));
            println!("Gateway:                {}", color_status(&s.gateway_stability));
            println!("Security:               {}", color_status(&s.security_status));
            println!("Agents:                 {}", color_status(&s.agent_health));
        }
    }

    Ok(())
}

/// Show server liveness and per-component health
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let liveness: Liveness = client.get("api/health").await?;
    let (status, report): (_, HealthReport) = client.get_probe("healthz").await?;

    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "liveness": liveness,
            "health": report,
        }))?,
        OutputFormat::Table => {
            print_heading("Server Health");
            println!("Version:                {}", liveness.version.cyan());
            println!("Uptime:                 {}", format_duration(liveness.uptime_seconds));
            println!("Status:                 {}", color_status(&report.status));
            println!();

            let rows: Vec<ComponentRow> = report
                .components
                .iter()
                .map(|(name, c)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&c.status),
                    message: c.message.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_table(&rows, "No components registered");
        }
    }

    if !status.is_success() {
        anyhow::bail!("Server reports {} ({})", report.status, status);
    }
    Ok(())
}
