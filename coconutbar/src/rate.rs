//! Rate computation over monotonically increasing kernel counters
//!
//! A `RateState` remembers the previous pair of cumulative counters. The
//! first sample only primes it, so every rate-based metric reports one
//! `NaN` reading after startup.

/// Bytes per megabyte for network rates
pub const BYTES_PER_MB: f64 = 1_000_000.0;

/// Previous cumulative counters for one rated metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateState {
    previous: Option<(u64, u64)>,
}

impl RateState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous counters, `None` until the first sample
    pub fn previous(&self) -> Option<(u64, u64)> {
        self.previous
    }

    /// Record `current` and return the counters it replaced
    pub fn advance(&mut self, current: (u64, u64)) -> Option<(u64, u64)> {
        self.previous.replace(current)
    }
}

/// `(cur - prev) / scale` for both counters.
///
/// `None` when `scale` is zero or either counter went backwards.
pub fn compute_rate(prev: (u64, u64), cur: (u64, u64), scale: f64) -> Option<(f64, f64)> {
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let delta_a = cur.0.checked_sub(prev.0)?;
    let delta_b = cur.1.checked_sub(prev.1)?;
    Some((delta_a as f64 / scale, delta_b as f64 / scale))
}

/// Busy share of elapsed jiffies as a truncated percentage in `[0, 100]`.
///
/// Both pairs are `(busy, total)`.
pub fn busy_percent(prev: (u64, u64), cur: (u64, u64)) -> Option<u8> {
    let elapsed = cur.1.checked_sub(prev.1)?;
    let busy = cur.0.checked_sub(prev.0)?;
    if elapsed == 0 {
        return None;
    }
    Some((busy.saturating_mul(100) / elapsed).min(100) as u8)
}

/// Megabytes moved between two byte-counter pairs, one decimal each.
///
/// Both pairs are `(up, down)`. Halves round to even: 0.25 MB is `0.2`.
pub fn megabytes_moved(prev: (u64, u64), cur: (u64, u64)) -> Option<(f64, f64)> {
    let (up, down) = compute_rate(prev, cur, BYTES_PER_MB)?;
    Some((round_tenth(up), round_tenth(down)))
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
