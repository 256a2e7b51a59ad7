//! Host resource monitor
//!
//! Reads CPU load, memory, disk, process and network counters through a
//! [`MetricSource`] and derives fixed-threshold classifications from them.
//! No read failure is surfaced: an unreadable counter falls back to zero.

use crate::clock::SharedClock;
use crate::stats::{clamp_score, round2};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Disks, Networks, System};
use tracing::debug;

const MB: f64 = 1024.0 * 1024.0;
const GB: f64 = MB * 1024.0;

/// Load above this fraction of the core count is "overloaded"
const OVERLOADED_LOAD_RATIO: f64 = 0.9;
/// Load above this fraction of the core count is "intense"
const INTENSE_LOAD_RATIO: f64 = 0.7;
const USAGE_CRITICAL_PERCENT: f64 = 90.0;
const USAGE_WARNING_PERCENT: f64 = 80.0;
/// Network deltas cover at least this much clock time
pub const NETWORK_DELTA_WINDOW: Duration = Duration::from_secs(5);
/// Longest a sample waits on the sysinfo disk scan
pub const DISK_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// 1, 5 and 15 minute load averages
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}

/// Raw memory counters in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryInfo {
    pub total: u64,
    pub free: u64,
    pub available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Raw disk counters in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DiskUsage {
    pub total: u64,
    pub available: u64,
}

/// Cumulative interface counters, loopback excluded
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkTotals {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub interfaces: usize,
}

/// Provider of raw host counters
///
/// Every method may fail; the monitor maps failures to documented fallbacks.
pub trait MetricSource: Send + Sync {
    fn name(&self) -> &'static str;
    fn cpu_count(&self) -> usize;
    fn load_average(&self) -> io::Result<LoadAverage>;
    fn memory(&self) -> io::Result<MemoryInfo>;
    fn disk(&self) -> io::Result<DiskUsage>;
    fn process_rss_bytes(&self) -> io::Result<u64>;
    fn network_totals(&self) -> io::Result<NetworkTotals>;
    fn uptime_secs(&self) -> io::Result<u64>;
}

/// Which [`MetricSource`] the server runs with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Host,
    Simulated,
}

impl SourceKind {
    pub fn build(&self) -> Arc<dyn MetricSource> {
        match self {
            SourceKind::Host => Arc::new(HostSource::default()),
            SourceKind::Simulated => Arc::new(SimulatedSource::new()),
        }
    }
}

fn invalid_data(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Parse `/proc/loadavg`
pub fn parse_loadavg(content: &str) -> io::Result<LoadAverage> {
    let mut fields = content.split_whitespace().map(str::parse::<f64>);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(Ok(one)), Some(Ok(five)), Some(Ok(fifteen))) => Ok(LoadAverage { one, five, fifteen }),
        _ => Err(invalid_data("malformed loadavg")),
    }
}

/// Parse `/proc/meminfo` (values reported in kB)
pub fn parse_meminfo(content: &str) -> io::Result<MemoryInfo> {
    let field = |key: &str| -> Option<u64> {
        content.lines().find_map(|line| {
            let rest = line.strip_prefix(key)?.strip_prefix(':')?;
            rest.split_whitespace().next()?.parse::<u64>().ok().map(|kb| kb * 1024)
        })
    };

    let total = field("MemTotal").ok_or_else(|| invalid_data("MemTotal missing"))?;
    let free = field("MemFree").unwrap_or(0);
    let buffers = field("Buffers").unwrap_or(0);
    let cached = field("Cached").unwrap_or(0);
    let available = field("MemAvailable").unwrap_or(free + buffers + cached);

    Ok(MemoryInfo {
        total,
        free,
        available,
        buffers,
        cached,
        swap_total: field("SwapTotal").unwrap_or(0),
        swap_free: field("SwapFree").unwrap_or(0),
    })
}

/// Parse `/proc/net/dev`, skipping the loopback interface
pub fn parse_net_dev(content: &str) -> io::Result<NetworkTotals> {
    let mut totals = NetworkTotals::default();

    // two header lines
    for line in content.lines().skip(2) {
        let Some((iface, counters)) = line.split_once(':') else {
            continue;
        };
        if iface.trim() == "lo" {
            continue;
        }
        let fields: Vec<u64> = counters
            .split_whitespace()
            .filter_map(|f| f.parse().ok())
            .collect();
        if fields.len() < 9 {
            return Err(invalid_data(format!("malformed net/dev line for {}", iface.trim())));
        }
        totals.rx_bytes += fields[0];
        totals.tx_bytes += fields[8];
        totals.interfaces += 1;
    }

    Ok(totals)
}

/// Parse `VmRSS` from `/proc/self/status`
pub fn parse_status_rss(content: &str) -> io::Result<u64> {
    content
        .lines()
        .find_map(|line| {
            let rest = line.strip_prefix("VmRSS:")?;
            rest.split_whitespace().next()?.parse::<u64>().ok()
        })
        .map(|kb| kb * 1024)
        .ok_or_else(|| invalid_data("VmRSS missing"))
}

/// Parse `/proc/uptime`
pub fn parse_uptime(content: &str) -> io::Result<u64> {
    content
        .split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| secs as u64)
        .ok_or_else(|| invalid_data("malformed uptime"))
}

/// Reads the real host: `/proc` first, `sysinfo` where `/proc` is unavailable
type DiskReader = Arc<dyn Fn() -> io::Result<DiskUsage> + Send + Sync>;

/// Host counters from procfs, with sysinfo as the fallback
///
/// The disk scan runs on a helper thread so a hung mount cannot stall a
/// sample past [`DISK_READ_TIMEOUT`]. A scan still running from an earlier
/// sample is awaited again instead of starting another.
pub struct HostSource {
    proc_root: PathBuf,
    disk_reader: DiskReader,
    disk_timeout: Duration,
    pending_disk: Mutex<Option<mpsc::Receiver<io::Result<DiskUsage>>>>,
}

impl Default for HostSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl HostSource {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
            disk_reader: Arc::new(read_root_disk),
            disk_timeout: DISK_READ_TIMEOUT,
            pending_disk: Mutex::new(None),
        }
    }

    pub fn with_disk_reader(
        mut self,
        reader: impl Fn() -> io::Result<DiskUsage> + Send + Sync + 'static,
        timeout: Duration,
    ) -> Self {
        self.disk_reader = Arc::new(reader);
        self.disk_timeout = timeout;
        self
    }

    fn read_proc(&self, relative: &str) -> io::Result<String> {
        std::fs::read_to_string(self.proc_root.join(relative))
    }
}

fn read_root_disk() -> io::Result<DiskUsage> {
    let disks = Disks::new_with_refreshed_list();
    let root = disks
        .iter()
        .find(|d| d.mount_point() == std::path::Path::new("/"))
        .or_else(|| disks.iter().next())
        .ok_or_else(|| invalid_data("no disks reported"))?;

    Ok(DiskUsage {
        total: root.total_space(),
        available: root.available_space(),
    })
}

impl MetricSource for HostSource {
    fn name(&self) -> &'static str {
        "host"
    }

    fn cpu_count(&self) -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    fn load_average(&self) -> io::Result<LoadAverage> {
        self.read_proc("loadavg")
            .and_then(|c| parse_loadavg(&c))
            .or_else(|_| {
                let load = System::load_average();
                Ok(LoadAverage {
                    one: load.one,
                    five: load.five,
                    fifteen: load.fifteen,
                })
            })
    }

    fn memory(&self) -> io::Result<MemoryInfo> {
        self.read_proc("meminfo")
            .and_then(|c| parse_meminfo(&c))
            .or_else(|_| {
                let mut sys = System::new();
                sys.refresh_memory();
                if sys.total_memory() == 0 {
                    return Err(invalid_data("memory totals unavailable"));
                }
                Ok(MemoryInfo {
                    total: sys.total_memory(),
                    free: sys.free_memory(),
                    available: sys.available_memory(),
                    buffers: 0,
                    cached: 0,
                    swap_total: sys.total_swap(),
                    swap_free: sys.free_swap(),
                })
            })
    }

    fn disk(&self) -> io::Result<DiskUsage> {
        let mut pending = self.pending_disk.lock();
        let rx = match pending.take() {
            Some(rx) => rx,
            None => {
                let (tx, rx) = mpsc::channel();
                let reader = self.disk_reader.clone();
                std::thread::Builder::new()
                    .name("vigil-disk".to_string())
                    .spawn(move || {
                        let _ = tx.send(reader());
                    })?;
                rx
            }
        };

        match rx.recv_timeout(self.disk_timeout) {
            Ok(usage) => usage,
            Err(RecvTimeoutError::Timeout) => {
                *pending = Some(rx);
                Err(io::Error::new(io::ErrorKind::TimedOut, "disk scan timed out"))
            }
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::Other,
                "disk scan thread exited",
            )),
        }
    }

    fn process_rss_bytes(&self) -> io::Result<u64> {
        self.read_proc("self/status").and_then(|c| parse_status_rss(&c))
    }

    fn network_totals(&self) -> io::Result<NetworkTotals> {
        self.read_proc("net/dev")
            .and_then(|c| parse_net_dev(&c))
            .or_else(|_| {
                let networks = Networks::new_with_refreshed_list();
                let mut totals = NetworkTotals::default();
                for (name, data) in networks.iter() {
                    if name == "lo" || name == "lo0" {
                        continue;
                    }
                    totals.rx_bytes += data.total_received();
                    totals.tx_bytes += data.total_transmitted();
                    totals.interfaces += 1;
                }
                Ok(totals)
            })
    }

    fn uptime_secs(&self) -> io::Result<u64> {
        self.read_proc("uptime")
            .and_then(|c| parse_uptime(&c))
            .or_else(|_| Ok(System::uptime()))
    }
}

/// Random-walk host used when no real host metrics are wanted
pub struct SimulatedSource {
    state: Mutex<SimState>,
}

struct SimState {
    rng: StdRng,
    load: f64,
    memory_used_ratio: f64,
    rx_bytes: u64,
    tx_bytes: u64,
    uptime_secs: u64,
}

const SIM_CORES: usize = 8;
const SIM_MEMORY_TOTAL: u64 = 16 * 1024 * 1024 * 1024;
const SIM_DISK_TOTAL: u64 = 512 * 1024 * 1024 * 1024;

impl SimulatedSource {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: Mutex::new(SimState {
                rng,
                load: 2.0,
                memory_used_ratio: 0.45,
                rx_bytes: 0,
                tx_bytes: 0,
                uptime_secs: 3_600,
            }),
        }
    }
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SimulatedSource {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn cpu_count(&self) -> usize {
        SIM_CORES
    }

    fn load_average(&self) -> io::Result<LoadAverage> {
        let mut state = self.state.lock();
        let step = state.rng.gen_range(-0.5..0.5);
        state.load = (state.load + step).clamp(0.1, SIM_CORES as f64 * 1.2);
        Ok(LoadAverage {
            one: state.load,
            five: state.load * 0.9,
            fifteen: state.load * 0.8,
        })
    }

    fn memory(&self) -> io::Result<MemoryInfo> {
        let mut state = self.state.lock();
        let step = state.rng.gen_range(-0.03..0.03);
        state.memory_used_ratio = (state.memory_used_ratio + step).clamp(0.2, 0.95);
        let used = (SIM_MEMORY_TOTAL as f64 * state.memory_used_ratio) as u64;
        let free = SIM_MEMORY_TOTAL - used;
        Ok(MemoryInfo {
            total: SIM_MEMORY_TOTAL,
            free,
            available: free,
            buffers: 0,
            cached: 0,
            swap_total: 0,
            swap_free: 0,
        })
    }

    fn disk(&self) -> io::Result<DiskUsage> {
        let mut state = self.state.lock();
        let used_ratio = state.rng.gen_range(0.40..0.60);
        Ok(DiskUsage {
            total: SIM_DISK_TOTAL,
            available: (SIM_DISK_TOTAL as f64 * (1.0 - used_ratio)) as u64,
        })
    }

    fn process_rss_bytes(&self) -> io::Result<u64> {
        let mut state = self.state.lock();
        Ok(state.rng.gen_range(40..120) * 1024 * 1024)
    }

    fn network_totals(&self) -> io::Result<NetworkTotals> {
        let mut state = self.state.lock();
        let rx = state.rng.gen_range(10_000..500_000);
        let tx = state.rng.gen_range(5_000..200_000);
        state.rx_bytes += rx;
        state.tx_bytes += tx;
        Ok(NetworkTotals {
            rx_bytes: state.rx_bytes,
            tx_bytes: state.tx_bytes,
            interfaces: 2,
        })
    }

    fn uptime_secs(&self) -> io::Result<u64> {
        let mut state = self.state.lock();
        state.uptime_secs += 5;
        Ok(state.uptime_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadClass {
    Balanced,
    Intense,
    Overloaded,
}

/// Memory pressure from the available/total ratio
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    Low,
    Moderate,
    High,
}

/// Utilization class shared by memory and disk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageClass {
    Healthy,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UptimeClass {
    Fresh,
    Stable,
    LongRunning,
}

/// Overall host health, best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostHealth {
    Optimal,
    Healthy,
    Stressed,
    Critical,
}

pub fn classify_load(load_one: f64, cores: usize) -> LoadClass {
    let cores = cores.max(1) as f64;
    if load_one > cores * OVERLOADED_LOAD_RATIO {
        LoadClass::Overloaded
    } else if load_one > cores * INTENSE_LOAD_RATIO {
        LoadClass::Intense
    } else {
        LoadClass::Balanced
    }
}

pub fn classify_usage(percent: f64) -> UsageClass {
    if percent > USAGE_CRITICAL_PERCENT {
        UsageClass::Critical
    } else if percent > USAGE_WARNING_PERCENT {
        UsageClass::Warning
    } else {
        UsageClass::Healthy
    }
}

pub fn classify_pressure(available: u64, total: u64) -> MemoryPressure {
    let total = total as f64;
    let available = available as f64;
    if available < total * 0.1 {
        MemoryPressure::High
    } else if available < total * 0.2 {
        MemoryPressure::Moderate
    } else {
        MemoryPressure::Low
    }
}

pub fn classify_uptime(secs: u64) -> UptimeClass {
    if secs > 86_400 {
        UptimeClass::LongRunning
    } else if secs > 3_600 {
        UptimeClass::Stable
    } else {
        UptimeClass::Fresh
    }
}

/// Host health score from cpu, memory and disk utilization percentages
pub fn host_health_score(cpu: f64, memory: f64, disk: f64) -> f64 {
    let mut score = 100.0;

    if cpu > 80.0 {
        score -= 20.0;
    } else if cpu > 60.0 {
        score -= 10.0;
    }

    if memory > 90.0 {
        score -= 25.0;
    } else if memory > 80.0 {
        score -= 15.0;
    }

    if disk > 90.0 {
        score -= 20.0;
    } else if disk > 80.0 {
        score -= 10.0;
    }

    clamp_score(score)
}

pub fn classify_host_health(score: f64) -> HostHealth {
    if score >= 80.0 {
        HostHealth::Optimal
    } else if score >= 60.0 {
        HostHealth::Healthy
    } else if score >= 40.0 {
        HostHealth::Stressed
    } else {
        HostHealth::Critical
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpuMetrics {
    /// 1-minute load normalized by core count, as a percentage
    pub load_percent: f64,
    pub load_average: [f64; 3],
    pub cores: usize,
    pub load_class: LoadClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetrics {
    pub total_mb: f64,
    pub used_mb: f64,
    pub available_mb: f64,
    pub buffer_cache_mb: f64,
    pub swap_used_mb: f64,
    pub utilization_percent: f64,
    pub pressure: MemoryPressure,
    pub status: UsageClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiskMetrics {
    pub total_gb: f64,
    pub used_gb: f64,
    pub available_gb: f64,
    pub utilization_percent: f64,
    pub status: UsageClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessMetrics {
    pub pid: u32,
    pub rss_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkMetrics {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    /// Bytes received over the last completed delta window
    pub rx_delta_bytes: u64,
    pub tx_delta_bytes: u64,
    pub interfaces: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetrics {
    pub timestamp_ms: i64,
    pub source: String,
    pub cpu: CpuMetrics,
    pub memory: MemoryMetrics,
    pub disk: DiskMetrics,
    pub process: ProcessMetrics,
    pub network: NetworkMetrics,
    pub uptime_secs: u64,
    pub uptime_class: UptimeClass,
    pub health_score: f64,
    pub health: HostHealth,
}

/// Counters at the start of the current delta window
#[derive(Debug, Clone, Copy)]
struct NetworkBaseline {
    totals: NetworkTotals,
    taken_ms: i64,
    rx_delta: u64,
    tx_delta: u64,
}

/// Host resource monitor
///
/// Network deltas only advance once [`NETWORK_DELTA_WINDOW`] has passed, so
/// every reader within a window sees the same figures.
pub struct SystemMonitor {
    source: Arc<dyn MetricSource>,
    clock: SharedClock,
    network_baseline: Mutex<Option<NetworkBaseline>>,
}

impl SystemMonitor {
    pub fn new(source: Arc<dyn MetricSource>, clock: SharedClock) -> Self {
        Self {
            source,
            clock,
            network_baseline: Mutex::new(None),
        }
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Read the host and derive classifications; never fails
    pub fn sample(&self) -> SystemMetrics {
        let cores = self.source.cpu_count().max(1);

        let load = self.source.load_average().unwrap_or_else(|e| {
            debug!(error = %e, "Load average unavailable, using fallback");
            LoadAverage::default()
        });
        let load_percent = clamp_score(load.one / cores as f64 * 100.0);

        let memory = self.memory_metrics();
        let disk = self.disk_metrics();

        let rss = self.source.process_rss_bytes().unwrap_or_else(|e| {
            debug!(error = %e, "Process RSS unavailable, using fallback");
            0
        });

        let network = self.network_metrics();

        let uptime_secs = self.source.uptime_secs().unwrap_or_else(|e| {
            debug!(error = %e, "Uptime unavailable, using fallback");
            0
        });

        let health_score = host_health_score(
            load_percent,
            memory.utilization_percent,
            disk.utilization_percent,
        );

        SystemMetrics {
            timestamp_ms: self.clock.now_ms(),
            source: self.source.name().to_string(),
            cpu: CpuMetrics {
                load_percent: round2(load_percent),
                load_average: [load.one, load.five, load.fifteen],
                cores,
                load_class: classify_load(load.one, cores),
            },
            memory,
            disk,
            process: ProcessMetrics {
                pid: std::process::id(),
                rss_mb: round2(rss as f64 / MB),
            },
            network,
            uptime_secs,
            uptime_class: classify_uptime(uptime_secs),
            health_score,
            health: classify_host_health(health_score),
        }
    }

    fn memory_metrics(&self) -> MemoryMetrics {
        let info = self.source.memory().unwrap_or_else(|e| {
            debug!(error = %e, "Memory counters unavailable, using fallback");
            MemoryInfo::default()
        });

        let used = info
            .total
            .saturating_sub(info.free)
            .saturating_sub(info.buffers)
            .saturating_sub(info.cached);
        let utilization = if info.total > 0 {
            clamp_score(used as f64 / info.total as f64 * 100.0)
        } else {
            0.0
        };

        MemoryMetrics {
            total_mb: round2(info.total as f64 / MB),
            used_mb: round2(used as f64 / MB),
            available_mb: round2(info.available as f64 / MB),
            buffer_cache_mb: round2((info.buffers + info.cached) as f64 / MB),
            swap_used_mb: round2(info.swap_total.saturating_sub(info.swap_free) as f64 / MB),
            utilization_percent: round2(utilization),
            pressure: if info.total > 0 {
                classify_pressure(info.available, info.total)
            } else {
                MemoryPressure::Low
            },
            status: classify_usage(utilization),
        }
    }

    fn disk_metrics(&self) -> DiskMetrics {
        let usage = self.source.disk().unwrap_or_else(|e| {
            debug!(error = %e, "Disk usage unavailable, using fallback");
            DiskUsage::default()
        });

        let used = usage.total.saturating_sub(usage.available);
        let utilization = if usage.total > 0 {
            clamp_score(used as f64 / usage.total as f64 * 100.0)
        } else {
            0.0
        };

        DiskMetrics {
            total_gb: round2(usage.total as f64 / GB),
            used_gb: round2(used as f64 / GB),
            available_gb: round2(usage.available as f64 / GB),
            utilization_percent: round2(utilization),
            status: classify_usage(utilization),
        }
    }

    fn network_metrics(&self) -> NetworkMetrics {
        let totals = self.source.network_totals().unwrap_or_else(|e| {
            debug!(error = %e, "Network counters unavailable, using fallback");
            NetworkTotals::default()
        });

        let now = self.clock.now_ms();
        let window_ms = NETWORK_DELTA_WINDOW.as_millis() as i64;

        let mut baseline = self.network_baseline.lock();
        let current = match *baseline {
            Some(base) if now - base.taken_ms < window_ms => base,
            // counter resets produce zero deltas rather than negative ones
            Some(base) => NetworkBaseline {
                totals,
                taken_ms: now,
                rx_delta: totals.rx_bytes.saturating_sub(base.totals.rx_bytes),
                tx_delta: totals.tx_bytes.saturating_sub(base.totals.tx_bytes),
            },
            None => NetworkBaseline {
                totals,
                taken_ms: now,
                rx_delta: 0,
                tx_delta: 0,
            },
        };
        *baseline = Some(current);

        NetworkMetrics {
            rx_bytes: totals.rx_bytes,
            tx_bytes: totals.tx_bytes,
            rx_delta_bytes: current.rx_delta,
            tx_delta_bytes: current.tx_delta,
            interfaces: totals.interfaces,
        }
    }
}
