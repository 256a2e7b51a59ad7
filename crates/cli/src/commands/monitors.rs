//! Per-monitor views: system, APIs, agents, security and health analytics

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{AgentsView, AnalyticsView, ApiClient, ApiPerformance, SecurityView, SystemView};
use crate::output::{
    color_score, color_status, format_duration, format_percent, format_timestamp_ms,
    print_heading, print_json, print_table, OutputFormat,
};

#[derive(Tabled)]
struct ApiRow {
    #[tabled(rename = "API")]
    name: String,
    #[tabled(rename = "Requests")]
    requests: u64,
    #[tabled(rename = "Avg Latency")]
    latency: String,
    #[tabled(rename = "Success")]
    success: String,
    #[tabled(rename = "Rate Limited")]
    rate_limited: String,
    #[tabled(rename = "Stability")]
    stability: String,
    #[tabled(rename = "Trend")]
    trend: String,
}

#[derive(Tabled)]
struct ClientRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Registered")]
    registered: String,
}

#[derive(Tabled)]
struct ConnectionRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Event")]
    kind: String,
    #[tabled(rename = "Connection")]
    connection: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

#[derive(Tabled)]
struct SecurityEventRow {
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Event")]
    kind: String,
    #[tabled(rename = "Severity")]
    severity: String,
}

#[derive(Tabled)]
struct AnomalyRow {
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Severity")]
    severity: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Baseline")]
    baseline: String,
    #[tabled(rename = "Deviation")]
    deviation: String,
}

#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Recommendation")]
    recommendation: String,
    #[tabled(rename = "Action")]
    action: String,
}

/// Keep table columns readable for uuid connection ids
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Show host resource metrics
pub async fn show_system(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let view: SystemView = client.get_data("api/monitoring/system").await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            print_heading("System Metrics");
            println!("Source:                 {}", view.source.cyan());
            println!(
                "Health:                 {} ({})",
                color_status(&view.health),
                color_score(view.health_score)
            );
            println!(
                "Uptime:                 {} ({})",
                format_duration(view.uptime_secs),
                view.uptime_class
            );
            println!();

            println!("{}", "CPU".bold());
            println!("{}", "-".repeat(60));
            println!(
                "Load:                   {} ({})",
                format_percent(view.cpu.load_percent),
                color_status(&view.cpu.load_class)
            );
            println!(
                "Load Average:           {:.2} {:.2} {:.2}",
                view.cpu.load_average[0], view.cpu.load_average[1], view.cpu.load_average[2]
            );
            println!("Cores:                  {}", view.cpu.cores);
            println!();

            println!("{}", "Memory".bold());
            println!("{}", "-".repeat(60));
            println!(
                "Used:                   {:.0} / {:.0} MB ({})",
                view.memory.used_mb,
                view.memory.total_mb,
                format_percent(view.memory.utilization_percent)
            );
            println!("Pressure:               {}", color_status(&view.memory.pressure));
            println!("Status:                 {}", color_status(&view.memory.status));
            println!();

            println!("{}", "Disk".bold());
            println!("{}", "-".repeat(60));
            println!(
                "Used:                   {:.1} / {:.1} GB ({})",
                view.disk.used_gb,
                view.disk.total_gb,
                format_percent(view.disk.utilization_percent)
            );
            println!("Status:                 {}", color_status(&view.disk.status));
        }
    }

    Ok(())
}

/// Show per-API performance with trends
pub async fn show_api(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let view: ApiPerformance = client.get_data("api/monitoring/api-performance").await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let summary = &view.summary;
            print_heading("API Performance");
            println!(
                "Health:                 {} ({})",
                color_status(&summary.health),
                color_score(summary.health_score)
            );
            println!(
                "Gateway Stability:      {}",
                color_status(&summary.gateway_stability)
            );
            println!(
                "Combined:               {} requests, {:.0} ms avg, {} success",
                summary.combined.total_requests,
                summary.combined.avg_latency_ms,
                format_percent(summary.combined.success_rate_percent)
            );
            println!(
                "Combined Trend:         {}",
                color_status(&view.trends.combined)
            );
            println!();

            let rows: Vec<ApiRow> = summary
                .apis
                .iter()
                .map(|api| ApiRow {
                    name: api.name.clone(),
                    requests: api.total_requests,
                    latency: format!("{:.0} ms", api.avg_latency_ms),
                    success: format_percent(api.success_rate_percent),
                    rate_limited: format_percent(api.rate_limit_rate_percent),
                    stability: color_status(&api.stability),
                    trend: view
                        .trends
                        .apis
                        .get(&api.name)
                        .map(|t| color_status(t))
                        .unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_table(&rows, "No APIs tracked");
        }
    }

    Ok(())
}

/// Show agent connectivity, the client directory and recent connection events
pub async fn show_agents(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let view: AgentsView = client.get_data("api/monitoring/agents").await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            let m = &view.metrics;
            print_heading("Agent Connectivity");
            println!(
                "Health:                 {} ({})",
                color_status(&m.health),
                color_score(m.overall_score)
            );
            println!("Connected:              {}", m.connected);
            println!("Total Connections:      {}", m.total_connections);
            println!("Active Streams:         {}", m.active_streams);
            println!("Messages / Minute:      {}", m.messages_per_minute);
            println!("Stability Score:        {}", color_score(m.stability_score));
            println!();

            println!("{}", "Clients".bold());
            let clients: Vec<ClientRow> = view
                .clients
                .iter()
                .map(|c| ClientRow {
                    id: short_id(&c.id),
                    name: c.name.clone().unwrap_or_else(|| "-".to_string()),
                    kind: c.kind.clone().unwrap_or_else(|| "-".to_string()),
                    registered: if c.registered { "yes" } else { "no" }.to_string(),
                })
                .collect();
            print_table(&clients, "No clients connected");
            println!();

            println!("{}", "Recent Connections".bold());
            let events: Vec<ConnectionRow> = view
                .connection_history
                .iter()
                .map(|e| ConnectionRow {
                    time: format_timestamp_ms(e.timestamp_ms),
                    kind: e.kind.clone(),
                    connection: short_id(&e.connection_id),
                    reason: e.reason.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_table(&events, "No connection history");
        }
    }

    Ok(())
}

/// Show threat level and recent security events
pub async fn show_security(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let view: SecurityView = client.get_data("api/monitoring/security").await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            print_heading("Security");
            println!(
                "Status:                 {} (threat score {}, level {:.2})",
                color_status(&view.threat.status),
                view.threat.score,
                view.threat.level
            );
            println!("Intrusion Attempts:     {}", view.intrusion_attempts);
            println!("Critical Events:        {}", view.critical_events);
            println!("Suspicious Connections: {}", view.suspicious_connections);
            println!("Unique IPs:             {}", view.unique_ips);
            println!("Events (last hour):     {}", view.event_frequency);
            println!(
                "Enforcement:            {}",
                format_percent(view.enforcement_effectiveness)
            );
            println!();

            let rows: Vec<SecurityEventRow> = view
                .recent_events
                .iter()
                .map(|e| SecurityEventRow {
                    time: format_timestamp_ms(e.timestamp_ms),
                    kind: e.kind.clone(),
                    severity: match e.severity.as_str() {
                        "CRITICAL" | "HIGH" => e.severity.red().to_string(),
                        "MEDIUM" => e.severity.yellow().to_string(),
                        _ => e.severity.clone(),
                    },
                })
                .collect();
            print_table(&rows, "No security events recorded");
        }
    }

    Ok(())
}

/// Show composite health scores, trends, anomalies and recommendations
pub async fn show_analytics(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let view: AnalyticsView = client.get_data("api/monitoring/health-analytics").await?;

    match format {
        OutputFormat::Json => print_json(&view)?,
        OutputFormat::Table => {
            print_heading("Health Analytics");
            println!("Overall:                {}", color_score(view.current.overall));
            println!("Snapshots:              {}", view.snapshot_count);
            println!("Harmony Index:          {:.1}", view.harmony_index);
            println!("Stability Index:        {:.1}", view.stability_index);
            if !view.current.missing.is_empty() {
                println!(
                    "Missing:                {}",
                    view.current.missing.join(", ").yellow()
                );
            }
            println!();

            println!("{}", "Categories".bold());
            println!("{}", "-".repeat(60));
            for (category, score) in &view.current.scores {
                let trend = view
                    .trends
                    .get(category)
                    .map(|t| color_status(t))
                    .unwrap_or_else(|| "-".to_string());
                println!("{:<24}{:>8}   {}", category, color_score(*score), trend);
            }
            println!();

            println!("{}", "Anomalies".bold());
            let anomalies: Vec<AnomalyRow> = view
                .anomalies
                .iter()
                .map(|a| AnomalyRow {
                    category: a.category.clone(),
                    metric: a.metric.clone(),
                    severity: color_status(&a.severity),
                    value: format!("{:.1}", a.value),
                    baseline: format!("{:.1}", a.baseline),
                    deviation: format_percent(a.deviation_percent),
                })
                .collect();
            print_table(&anomalies, "No anomalies detected");
            println!();

            println!("{}", "Recommendations".bold());
            let recommendations: Vec<RecommendationRow> = view
                .recommendations
                .iter()
                .map(|r| RecommendationRow {
                    priority: color_status(&r.priority),
                    category: r.category.clone(),
                    score: color_score(r.score),
                    recommendation: r.recommendation.clone(),
                    action: r.action.clone(),
                })
                .collect();
            print_table(&recommendations, "No recommendations");
        }
    }

    Ok(())
}
