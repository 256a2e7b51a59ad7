//! API client for communicating with the Vigil dashboard server

use anyhow::{Context, Result};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// API client for the dashboard server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent(concat!("vigil-cli/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid server URL")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }

    /// GET a `{success, data, timestamp}` monitoring route and unwrap `data`
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let envelope: Envelope<T> = self.get(path).await?;
        if !envelope.success {
            anyhow::bail!("Server reported failure for {}", path);
        }
        Ok(envelope.data)
    }

    /// GET that also accepts 503, for probes that report failure in the body
    pub async fn get_probe<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.json().await.context("Failed to parse response")?;
            return Ok((status, body));
        }
        Ok((status, parse_response(response).await?))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => match err.code {
                Some(code) => anyhow::bail!("API error ({}): {} [{}]", status, err.error, code),
                None => anyhow::bail!("API error ({}): {}", status, err.error),
            },
            Err(_) => anyhow::bail!("API error ({}): {}", status, body),
        }
    }

    response.json().await.context("Failed to parse response")
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liveness {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentView {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub components: BTreeMap<String, ComponentView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuView {
    pub load_percent: f64,
    pub load_average: [f64; 3],
    pub cores: usize,
    pub load_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryView {
    pub total_mb: f64,
    pub used_mb: f64,
    pub utilization_percent: f64,
    pub pressure: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskView {
    pub total_gb: f64,
    pub used_gb: f64,
    pub utilization_percent: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemView {
    pub source: String,
    pub cpu: CpuView,
    pub memory: MemoryView,
    pub disk: DiskView,
    pub uptime_secs: u64,
    pub uptime_class: String,
    pub health_score: f64,
    pub health: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiView {
    pub name: String,
    pub total_requests: u64,
    pub avg_latency_ms: f64,
    pub success_rate_percent: f64,
    pub rate_limit_rate_percent: f64,
    pub stability: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedView {
    pub total_requests: u64,
    pub avg_latency_ms: f64,
    pub success_rate_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSummaryView {
    pub apis: Vec<ApiView>,
    pub combined: CombinedView,
    pub gateway_stability: String,
    pub health_score: f64,
    pub health: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTrendsView {
    pub apis: BTreeMap<String, String>,
    pub combined: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPerformance {
    pub summary: ApiSummaryView,
    pub trends: ApiTrendsView,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMetricsView {
    pub connected: usize,
    pub total_connections: u64,
    pub active_streams: usize,
    pub messages_per_minute: usize,
    pub stability_score: f64,
    pub overall_score: f64,
    pub health: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionEventView {
    pub kind: String,
    pub connection_id: String,
    pub timestamp_ms: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientView {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    pub registered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsView {
    pub metrics: AgentMetricsView,
    pub connection_history: Vec<ConnectionEventView>,
    pub clients: Vec<ClientView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatView {
    pub score: u32,
    pub level: f64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEventView {
    pub kind: String,
    pub severity: String,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityView {
    pub intrusion_attempts: usize,
    pub critical_events: usize,
    pub suspicious_connections: usize,
    pub unique_ips: usize,
    pub event_frequency: usize,
    pub enforcement_effectiveness: f64,
    pub threat: ThreatView,
    pub recent_events: Vec<SecurityEventView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentView {
    pub overall: f64,
    pub scores: BTreeMap<String, f64>,
    #[serde(default)]
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationView {
    pub category: String,
    pub priority: String,
    pub score: f64,
    pub recommendation: String,
    pub action: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyView {
    pub category: String,
    pub metric: String,
    pub severity: String,
    pub value: f64,
    pub baseline: f64,
    pub deviation_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsView {
    pub snapshot_count: usize,
    pub current: CurrentView,
    pub trends: BTreeMap<String, String>,
    pub harmony_index: f64,
    pub stability_index: f64,
    pub anomalies: Vec<AnomalyView>,
    pub recommendations: Vec<RecommendationView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub overall_health: f64,
    pub total_connected_agents: usize,
    pub system_uptime: u64,
    pub system_health: String,
    pub api_health: String,
    pub gateway_stability: String,
    pub security_status: String,
    pub agent_health: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub summary: DashboardSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub text: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    pub timestamp_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}
