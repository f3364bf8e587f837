//! Timing harness comparing the legacy and optimized active-promotion queries.
//!
//! Both fetches are warmed up, then timed one call at a time on the calling
//! thread. Samples are nanoseconds from [`Clock::monotonic_nanos`]; every
//! reported figure is in microseconds.

use promobench_common::{ComparisonReport, Stats, MAX_ITERATIONS, STATS_UNIT, WARMUP_ITERATIONS};
use tracing::{debug, info};

use crate::error::ServerError;
use crate::{format_date, Clock};

/// Resolve the requested iteration count, falling back to `default`.
pub fn validate_iterations(raw: Option<i64>, default: u32) -> Result<u32, ServerError> {
    let got = raw.unwrap_or(i64::from(default));
    if got < 1 || got > i64::from(MAX_ITERATIONS) {
        return Err(ServerError::InvalidIterations { got, max: MAX_ITERATIONS });
    }
    Ok(got as u32)
}

/// Run the warm-up and both measurement phases, then summarize.
///
/// `optimized` receives the same `YYYYMMDD` reference date on every call; it is
/// read from `clock` once, before warm-up. Any fetch error aborts the run.
pub fn run_comparison<T, U, L, O>(
    iterations: u32,
    clock: &dyn Clock,
    mut legacy: L,
    mut optimized: O,
) -> Result<ComparisonReport, ServerError>
where
    L: FnMut() -> Result<T, ServerError>,
    O: FnMut(&str) -> Result<U, ServerError>,
{
    if iterations == 0 || iterations > MAX_ITERATIONS {
        return Err(ServerError::InvalidIterations { got: i64::from(iterations), max: MAX_ITERATIONS });
    }
    let reference_date = format_date(clock.today());

    for _ in 0..WARMUP_ITERATIONS {
        legacy()?;
        optimized(&reference_date)?;
    }
    debug!(warmup = WARMUP_ITERATIONS, %reference_date, "warm-up finished");

    let legacy_samples = measure(iterations, clock, &mut legacy)?;
    let optimized_samples = measure(iterations, clock, || optimized(&reference_date))?;

    let legacy_stats = compute_stats(&legacy_samples)
        .ok_or(ServerError::InvalidIterations { got: 0, max: MAX_ITERATIONS })?;
    let optimized_stats = compute_stats(&optimized_samples)
        .ok_or(ServerError::InvalidIterations { got: 0, max: MAX_ITERATIONS })?;
    let improvement_percent = improvement_percent(legacy_stats.avg, optimized_stats.avg)?;

    info!(
        iterations,
        legacy_avg_us = legacy_stats.avg,
        optimized_avg_us = optimized_stats.avg,
        improvement = %improvement_percent,
        "benchmark finished"
    );

    Ok(ComparisonReport {
        iterations,
        legacy: legacy_stats,
        optimized: optimized_stats,
        improvement_percent,
    })
}

/// Time `iterations` sequential calls of `fetch`, one sample per call.
pub fn measure<T, F>(iterations: u32, clock: &dyn Clock, mut fetch: F) -> Result<Vec<u64>, ServerError>
where
    F: FnMut() -> Result<T, ServerError>,
{
    let mut samples = Vec::with_capacity(iterations as usize);
    for _ in 0..iterations {
        let start = clock.monotonic_nanos();
        let result = fetch();
        let elapsed = clock.monotonic_nanos().saturating_sub(start);
        result?;
        samples.push(elapsed);
    }
    Ok(samples)
}

/// Summarize nanosecond samples. Returns `None` for an empty slice.
///
/// Percentiles are floor indices into the ascending sort: p50 at `n / 2`,
/// p95 at `floor(n * 0.95)`. The mean uses integer nanosecond division.
pub fn compute_stats(samples: &[u64]) -> Option<Stats> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();

    let n = sorted.len();
    let sum: u128 = sorted.iter().map(|&t| u128::from(t)).sum();
    let mean_ns = sum / n as u128;

    Some(Stats {
        avg: to_micros(mean_ns as f64),
        min: to_micros(sorted[0] as f64),
        max: to_micros(sorted[n - 1] as f64),
        p50: to_micros(sorted[n / 2] as f64),
        p95: to_micros(sorted[p95_index(n)] as f64),
        unit: STATS_UNIT.to_string(),
    })
}

pub fn p95_index(n: usize) -> usize {
    ((n as f64 * 0.95) as usize).min(n.saturating_sub(1))
}

/// `(legacy - optimized) / legacy * 100` rendered as `"12.34%"`.
///
/// Rounding applies to the exact binary value, so a quotient printed as
/// `1.005` renders as `"1.00%"`.
pub fn improvement_percent(legacy_avg: f64, optimized_avg: f64) -> Result<String, ServerError> {
    if legacy_avg == 0.0 {
        return Err(ServerError::DegenerateBaseline);
    }
    let improvement = (legacy_avg - optimized_avg) / legacy_avg * 100.0;
    Ok(format!("{improvement:.2}%"))
}

fn to_micros(nanos: f64) -> f64 {
    nanos / 1000.0
}
