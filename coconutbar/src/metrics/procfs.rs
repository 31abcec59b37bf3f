//! Parsers for the kernel pseudo-files the sampler reads
//!
//! Pure functions over file contents, so they can be tested without a
//! live `/proc`.

use crate::error::SampleError;
use std::collections::HashMap;

/// `(busy, total)` jiffies from the aggregate `cpu` line of `/proc/stat`.
///
/// busy is user + nice + system; total sums every field on the line.
pub fn parse_cpu_line(stat: &str) -> Result<(u64, u64), SampleError> {
    let line = stat
        .lines()
        .next()
        .ok_or_else(|| SampleError::malformed("stat", "empty file"))?;

    let mut fields = line.split_whitespace();
    match fields.next() {
        Some("cpu") => {}
        other => {
            return Err(SampleError::malformed(
                "stat",
                format!("expected aggregate cpu line, got {:?}", other.unwrap_or("")),
            ))
        }
    }

    let jiffies = fields
        .map(|f| {
            f.parse::<u64>()
                .map_err(|e| SampleError::malformed("stat", format!("{f:?}: {e}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if jiffies.len() < 4 {
        return Err(SampleError::malformed(
            "stat",
            format!("expected at least 4 cpu fields, got {}", jiffies.len()),
        ));
    }

    let busy = jiffies[..3].iter().sum();
    let total = jiffies.iter().sum();
    Ok((busy, total))
}

/// Memory counters needed for the used-percentage formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemInfo {
    pub total_kb: u64,
    pub free_kb: u64,
    pub cached_kb: u64,
}

impl MemInfo {
    /// `trunc(100 - (free + cached) / total * 100)`, in integer arithmetic
    /// so exact ratios do not lose a point to float error.
    pub fn used_percent(&self) -> Result<u8, SampleError> {
        if self.total_kb == 0 {
            return Err(SampleError::malformed("meminfo", "MemTotal is zero"));
        }
        let reclaimable = self.free_kb.saturating_add(self.cached_kb);
        let used = self.total_kb.saturating_sub(reclaimable);
        Ok((used.saturating_mul(100) / self.total_kb).min(100) as u8)
    }
}

/// Name-keyed parse of `/proc/meminfo`
pub fn parse_meminfo(meminfo: &str) -> Result<MemInfo, SampleError> {
    let mut values: HashMap<&str, u64> = HashMap::new();
    for line in meminfo.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        if let Some(value) = rest.split_whitespace().next() {
            let parsed = value
                .parse::<u64>()
                .map_err(|e| SampleError::malformed("meminfo", format!("{key}: {e}")))?;
            values.insert(key.trim(), parsed);
        }
    }

    let field = |name: &'static str| {
        values
            .get(name)
            .copied()
            .ok_or(SampleError::MissingField(name))
    };

    Ok(MemInfo {
        total_kb: field("MemTotal")?,
        free_kb: field("MemFree")?,
        cached_kb: field("Cached")?,
    })
}

/// Cumulative `(transmitted, received)` bytes summed over every interface
/// listed in `/proc/net/dev`.
pub fn parse_net_dev(net_dev: &str) -> Result<(u64, u64), SampleError> {
    let mut up = 0u64;
    let mut down = 0u64;

    for line in net_dev.lines().skip(2) {
        if line.trim().is_empty() {
            continue;
        }
        // Wide counters can touch the colon: "eth0:123456 ..."
        let (name, counters) = line
            .split_once(':')
            .ok_or_else(|| SampleError::malformed("net/dev", format!("no interface in {line:?}")))?;
        let counters: Vec<&str> = counters.split_whitespace().collect();
        if counters.len() < 9 {
            return Err(SampleError::malformed(
                "net/dev",
                format!("{}: expected 9+ counters, got {}", name.trim(), counters.len()),
            ));
        }
        let parse = |raw: &str| {
            raw.parse::<u64>()
                .map_err(|e| SampleError::malformed("net/dev", format!("{}: {e}", name.trim())))
        };
        down = down.wrapping_add(parse(counters[0])?);
        up = up.wrapping_add(parse(counters[8])?);
    }

    Ok((up, down))
}

/// Lexicographically last `thermal_zone*` entry
pub fn pick_thermal_zone<I, S>(entries: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    entries
        .into_iter()
        .map(Into::into)
        .filter(|name| name.contains("thermal_zone"))
        .max()
}

/// Whole degrees Celsius from a millidegree reading
pub fn parse_millidegrees(raw: &str) -> Result<i64, SampleError> {
    let milli = raw
        .trim()
        .parse::<i64>()
        .map_err(|e| SampleError::malformed("thermal zone temp", format!("{:?}: {e}", raw.trim())))?;
    Ok(milli / 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT: &str = "cpu  4705 356 584 3699 23 23 0 0 0 0\ncpu0 1393 280 227 1770 7 2 0 0 0 0\nintr 114930548\n";

    const MEMINFO: &str = "MemTotal:       16000000 kB\n\
MemFree:         4000000 kB\n\
MemAvailable:    9000000 kB\n\
Buffers:          200000 kB\n\
Cached:          4000000 kB\n\
SwapCached:            0 kB\n";

    const NET_DEV: &str = "Inter-|   Receive                                                |  Transmit\n \
face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n    \
lo:    5000      50    0    0    0     0          0         0     5000      50    0    0    0     0       0          0\n  \
eth0: 1000000    900    0    0    0     0          0        12   250000     400    0    0    0     0       0          0\n";

    #[test]
    fn test_parse_cpu_line() {
        let (busy, total) = parse_cpu_line(STAT).unwrap();
        assert_eq!(busy, 4705 + 356 + 584);
        assert_eq!(total, 4705 + 356 + 584 + 3699 + 23 + 23);
    }

    #[test]
    fn test_parse_cpu_line_rejects_per_core_first() {
        assert!(parse_cpu_line("cpu0 1 2 3 4\n").is_err());
        assert!(parse_cpu_line("").is_err());
        assert!(parse_cpu_line("cpu 1 2 x 4\n").is_err());
        assert!(parse_cpu_line("cpu 1 2\n").is_err());
    }

    #[test]
    fn test_parse_meminfo_by_name() {
        let info = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(info.total_kb, 16_000_000);
        assert_eq!(info.free_kb, 4_000_000);
        assert_eq!(info.cached_kb, 4_000_000);
        assert_eq!(info.used_percent().unwrap(), 50);
    }

    #[test]
    fn test_parse_meminfo_order_independent() {
        let shuffled = "Cached: 1000 kB\nMemFree: 2000 kB\nMemTotal: 10000 kB\n";
        let info = parse_meminfo(shuffled).unwrap();
        // 100 - 30 = 70
        assert_eq!(info.used_percent().unwrap(), 70);
    }

    #[test]
    fn test_parse_meminfo_missing_field() {
        let err = parse_meminfo("MemTotal: 100 kB\nMemFree: 10 kB\n").unwrap_err();
        assert!(matches!(err, SampleError::MissingField("Cached")));
    }

    #[test]
    fn test_used_percent_truncates() {
        let info = MemInfo { total_kb: 1000, free_kb: 300, cached_kb: 5 };
        // 100 - 30.5 = 69.5
        assert_eq!(info.used_percent().unwrap(), 69);
        let empty = MemInfo { total_kb: 0, free_kb: 0, cached_kb: 0 };
        assert!(empty.used_percent().is_err());
    }

    #[test]
    fn test_parse_net_dev_sums_all_interfaces() {
        let (up, down) = parse_net_dev(NET_DEV).unwrap();
        assert_eq!(down, 5000 + 1_000_000);
        assert_eq!(up, 5000 + 250_000);
    }

    #[test]
    fn test_parse_net_dev_glued_counters() {
        let raw = "h1\nh2\neth0:123 0 0 0 0 0 0 0 456 0 0 0 0 0 0 0\n";
        assert_eq!(parse_net_dev(raw).unwrap(), (456, 123));
    }

    #[test]
    fn test_parse_net_dev_short_line() {
        assert!(parse_net_dev("h1\nh2\neth0: 1 2 3\n").is_err());
    }

    #[test]
    fn test_pick_thermal_zone_is_lexicographic() {
        let zones = ["cooling_device0", "thermal_zone2", "thermal_zone10", "thermal_zone0"];
        assert_eq!(pick_thermal_zone(zones), Some("thermal_zone2".to_string()));
        assert_eq!(pick_thermal_zone(["cooling_device0"]), None);
    }

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_millidegrees("47500\n").unwrap(), 47);
        assert_eq!(parse_millidegrees("999").unwrap(), 0);
        assert!(parse_millidegrees("hot").is_err());
    }
}
