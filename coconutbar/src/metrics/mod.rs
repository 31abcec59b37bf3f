//! Host telemetry sampling for the bar
//!
//! Reads Linux kernel counters directly:
//! - CPU load from the aggregate jiffies line of `/proc/stat`
//! - Memory pressure from `/proc/meminfo`
//! - Network throughput from `/proc/net/dev`
//! - Temperature from the last `/sys/class/thermal/thermal_zone*`
//! - Default outbound IP via an unsent UDP "connect"
//!
//! Every read is isolated: a failure becomes a `NaN` reading plus a log line
//! and never affects the other metrics.

pub mod procfs;

use crate::error::SampleError;
use crate::rate::{self, RateState};
use std::fmt;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Text shown in place of the IP when no route exists
pub const NO_NETWORK: &str = "No network";

/// Never actually reached; only used to make the kernel pick a source address
pub const DEFAULT_IP_PROBE: ([u8; 4], u16) = ([255, 0, 0, 0], 1);

/// A metric value, or the `NaN` sentinel when it could not be sampled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading<T>(Option<T>);

impl<T> Reading<T> {
    pub fn value(value: T) -> Self {
        Self(Some(value))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }
}

impl<T: fmt::Display> fmt::Display for Reading<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("NaN"),
        }
    }
}

/// Upload/download megabytes moved since the previous sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetRates {
    pub up_mbs: f64,
    pub down_mbs: f64,
}

impl NetRates {
    pub fn format_rate(mbs: f64) -> String {
        format!("{mbs:.1}Mb/s")
    }
}

/// Point-in-time metrics
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    pub cpu_percent: Reading<u8>,
    pub mem_percent: Reading<u8>,
    pub temp_celsius: Reading<i64>,
    pub ip: String,
    pub network: Reading<NetRates>,
}

/// Source of individual metric readings.
///
/// Each call may hit the OS; callers only ask for what they display.
pub trait Telemetry {
    fn cpu(&mut self) -> Reading<u8>;
    fn memory(&mut self) -> Reading<u8>;
    fn temperature(&mut self) -> Reading<i64>;
    fn ip(&mut self) -> String;
    fn network(&mut self) -> Reading<NetRates>;
}

impl Telemetry for MetricSnapshot {
    fn cpu(&mut self) -> Reading<u8> {
        self.cpu_percent
    }

    fn memory(&mut self) -> Reading<u8> {
        self.mem_percent
    }

    fn temperature(&mut self) -> Reading<i64> {
        self.temp_celsius
    }

    fn ip(&mut self) -> String {
        self.ip.clone()
    }

    fn network(&mut self) -> Reading<NetRates> {
        self.network
    }
}

/// Locations of the kernel pseudo-files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcSources {
    pub stat: PathBuf,
    pub meminfo: PathBuf,
    pub net_dev: PathBuf,
    pub thermal: PathBuf,
}

impl Default for ProcSources {
    fn default() -> Self {
        Self::under("/")
    }
}

impl ProcSources {
    /// Same layout as a live system, rooted at `root`
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            stat: root.join("proc/stat"),
            meminfo: root.join("proc/meminfo"),
            net_dev: root.join("proc/net/dev"),
            thermal: root.join("sys/class/thermal"),
        }
    }
}

/// Stateful telemetry sampler.
///
/// Owns the CPU and network rate counters; everything else is stateless.
#[derive(Debug)]
pub struct Sampler {
    sources: ProcSources,
    cpu_rate: RateState,
    net_rate: RateState,
    ip_probe: SocketAddr,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new(ProcSources::default())
    }
}

impl Sampler {
    pub fn new(sources: ProcSources) -> Self {
        Self {
            sources,
            cpu_rate: RateState::new(),
            net_rate: RateState::new(),
            ip_probe: SocketAddr::from(DEFAULT_IP_PROBE),
        }
    }

    #[cfg(test)]
    fn with_ip_probe(mut self, probe: SocketAddr) -> Self {
        self.ip_probe = probe;
        self
    }

    /// Busy CPU percentage since the previous call
    pub fn sample_cpu(&mut self) -> Reading<u8> {
        let result = self.read_cpu();
        report("cpu", result)
    }

    /// Temperature of the lexicographically last thermal zone, whole °C
    pub fn sample_temperature(&mut self) -> Reading<i64> {
        let result = self.read_temperature();
        report("temperature", result)
    }

    /// Default outbound source address, or [`NO_NETWORK`]
    pub fn sample_ip(&mut self) -> String {
        match outbound_ip(self.ip_probe) {
            Ok(ip) => ip.to_string(),
            Err(e) => {
                debug!(error = %e, "no default route");
                NO_NETWORK.to_string()
            }
        }
    }

    /// Megabytes sent/received across all interfaces since the previous call
    pub fn sample_network(&mut self) -> Reading<NetRates> {
        let result = self.read_network();
        report("network", result)
    }

    /// Used memory percentage, counting free and page cache as available
    pub fn sample_memory(&mut self) -> Reading<u8> {
        let result = self.read_memory();
        report("memory", result)
    }

    /// Every metric at once
    pub fn snapshot(&mut self) -> MetricSnapshot {
        MetricSnapshot {
            cpu_percent: self.sample_cpu(),
            mem_percent: self.sample_memory(),
            temp_celsius: self.sample_temperature(),
            ip: self.sample_ip(),
            network: self.sample_network(),
        }
    }

    fn read_cpu(&mut self) -> Result<u8, SampleError> {
        let stat = read_source(&self.sources.stat)?;
        let current = procfs::parse_cpu_line(&stat)?;
        let previous = self
            .cpu_rate
            .advance(current)
            .ok_or(SampleError::WarmingUp("cpu"))?;
        rate::busy_percent(previous, current).ok_or(SampleError::Stalled("cpu"))
    }

    fn read_temperature(&self) -> Result<i64, SampleError> {
        let dir = &self.sources.thermal;
        let entries = std::fs::read_dir(dir).map_err(|e| SampleError::read(dir, e))?;
        let names = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned());
        let zone = procfs::pick_thermal_zone(names)
            .ok_or_else(|| SampleError::NoThermalZone(dir.clone()))?;

        let raw = read_source(&dir.join(&zone).join("temp"))?;
        procfs::parse_millidegrees(&raw)
    }

    fn read_network(&mut self) -> Result<NetRates, SampleError> {
        let net_dev = read_source(&self.sources.net_dev)?;
        let current = procfs::parse_net_dev(&net_dev)?;
        let previous = self
            .net_rate
            .advance(current)
            .ok_or(SampleError::WarmingUp("network"))?;
        let (up_mbs, down_mbs) =
            rate::megabytes_moved(previous, current).ok_or(SampleError::Stalled("network"))?;
        Ok(NetRates { up_mbs, down_mbs })
    }

    fn read_memory(&self) -> Result<u8, SampleError> {
        let meminfo = read_source(&self.sources.meminfo)?;
        procfs::parse_meminfo(&meminfo)?.used_percent()
    }
}

impl Telemetry for Sampler {
    fn cpu(&mut self) -> Reading<u8> {
        self.sample_cpu()
    }

    fn memory(&mut self) -> Reading<u8> {
        self.sample_memory()
    }

    fn temperature(&mut self) -> Reading<i64> {
        self.sample_temperature()
    }

    fn ip(&mut self) -> String {
        self.sample_ip()
    }

    fn network(&mut self) -> Reading<NetRates> {
        self.sample_network()
    }
}

fn read_source(path: &Path) -> Result<String, SampleError> {
    std::fs::read_to_string(path).map_err(|e| SampleError::read(path, e))
}

fn outbound_ip(probe: SocketAddr) -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0))?;
    socket.connect(probe)?;
    Ok(socket.local_addr()?.ip())
}

fn report<T>(metric: &'static str, result: Result<T, SampleError>) -> Reading<T> {
    match result {
        Ok(value) => Reading::value(value),
        Err(e) if e.is_expected() => {
            debug!(metric, "{}", e);
            Reading::unavailable()
        }
        Err(e) => {
            warn!(metric, error = %e, "sampling failed");
            Reading::unavailable()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coconutbar_devkit::ProcFixture;

    fn fixture() -> (ProcFixture, Sampler) {
        let fx = ProcFixture::new().unwrap();
        let sampler = Sampler::new(ProcSources::under(fx.root()));
        (fx, sampler)
    }

    #[test]
    fn test_reading_display() {
        assert_eq!(Reading::value(42u8).to_string(), "42");
        assert_eq!(Reading::<u8>::unavailable().to_string(), "NaN");
        assert_eq!(NetRates::format_rate(1.0), "1.0Mb/s");
        assert_eq!(NetRates::format_rate(12.3), "12.3Mb/s");
    }

    #[test]
    fn test_sources_under_root() {
        let sources = ProcSources::under("/tmp/fake");
        assert_eq!(sources.stat, PathBuf::from("/tmp/fake/proc/stat"));
        assert_eq!(sources.thermal, PathBuf::from("/tmp/fake/sys/class/thermal"));
        assert_eq!(ProcSources::default().meminfo, PathBuf::from("/proc/meminfo"));
    }

    #[test]
    fn test_cpu_first_sample_is_warmup() {
        let (fx, mut sampler) = fixture();
        fx.write_stat(100, 0, 100, 800).unwrap();
        assert_eq!(sampler.sample_cpu(), Reading::unavailable());

        // +30 busy, +70 idle
        fx.write_stat(120, 0, 110, 870).unwrap();
        assert_eq!(sampler.sample_cpu(), Reading::value(30));
    }

    #[test]
    fn test_cpu_unchanged_counters_is_sentinel() {
        let (fx, mut sampler) = fixture();
        fx.write_stat(100, 0, 100, 800).unwrap();
        sampler.sample_cpu();
        assert_eq!(sampler.sample_cpu(), Reading::unavailable());
    }

    #[test]
    fn test_cpu_missing_file_is_sentinel() {
        let (_fx, mut sampler) = fixture();
        assert_eq!(sampler.sample_cpu(), Reading::unavailable());
    }

    #[test]
    fn test_memory_percent() {
        let (fx, mut sampler) = fixture();
        fx.write_meminfo(8_000_000, 1_000_000, 3_000_000).unwrap();
        assert_eq!(sampler.sample_memory(), Reading::value(50));
    }

    #[test]
    fn test_memory_malformed_is_sentinel() {
        let (fx, mut sampler) = fixture();
        fx.write_file("proc/meminfo", "this is not meminfo\n").unwrap();
        assert_eq!(sampler.sample_memory(), Reading::unavailable());

        fx.write_file("proc/meminfo", "MemTotal: lots kB\n").unwrap();
        assert_eq!(sampler.sample_memory(), Reading::unavailable());
    }

    #[test]
    fn test_temperature_uses_last_zone() {
        let (fx, mut sampler) = fixture();
        fx.add_thermal_zone("thermal_zone10", 90_000).unwrap();
        fx.add_thermal_zone("thermal_zone2", 41_999).unwrap();
        assert_eq!(sampler.sample_temperature(), Reading::value(41));
    }

    #[test]
    fn test_temperature_without_zones_is_sentinel() {
        let (_fx, mut sampler) = fixture();
        assert_eq!(sampler.sample_temperature(), Reading::unavailable());
    }

    #[test]
    fn test_network_rates() {
        let (fx, mut sampler) = fixture();
        fx.write_net_dev(&[("lo", 1000, 1000), ("eth0", 5_000_000, 1_000_000)])
            .unwrap();
        assert_eq!(sampler.sample_network(), Reading::unavailable());

        fx.write_net_dev(&[("lo", 1000, 1000), ("eth0", 7_500_000, 1_250_000)])
            .unwrap();
        let rates = sampler.sample_network();
        assert_eq!(rates, Reading::value(NetRates { up_mbs: 0.2, down_mbs: 2.5 }));
    }

    #[test]
    fn test_network_counter_reset_reprimes() {
        let (fx, mut sampler) = fixture();
        fx.write_net_dev(&[("eth0", 5_000_000, 5_000_000)]).unwrap();
        sampler.sample_network();
        fx.write_net_dev(&[("eth0", 10, 10)]).unwrap();
        assert_eq!(sampler.sample_network(), Reading::unavailable());
        fx.write_net_dev(&[("eth0", 1_000_010, 10)]).unwrap();
        assert_eq!(
            sampler.sample_network(),
            Reading::value(NetRates { up_mbs: 0.0, down_mbs: 1.0 })
        );
    }

    #[test]
    fn test_failures_are_isolated() {
        let (fx, mut sampler) = fixture();
        fx.write_meminfo(1000, 250, 250).unwrap();
        let snapshot = sampler.snapshot();
        assert_eq!(snapshot.mem_percent, Reading::value(50));
        assert!(!snapshot.cpu_percent.is_available());
        assert!(!snapshot.temp_celsius.is_available());
        assert!(!snapshot.network.is_available());
    }

    #[test]
    fn test_ip_unreachable_probe_is_no_network() {
        // an IPv4 socket cannot connect to an IPv6 peer
        let probe = SocketAddr::from((std::net::Ipv6Addr::LOCALHOST, 1));
        let mut sampler = Sampler::default().with_ip_probe(probe);
        assert_eq!(sampler.sample_ip(), NO_NETWORK);
    }

    #[test]
    fn test_ip_is_stable() {
        let mut sampler = Sampler::default();
        let first = sampler.sample_ip();
        let second = sampler.sample_ip();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }
}
