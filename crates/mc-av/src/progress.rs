//! Progress math for transcode engines.
//!
//! Engines report progress either as a timemark (elapsed media time, e.g.
//! `00:01:10.52`) or as a ready-made percentage. Timemarks are turned into
//! a percentage of the probed source duration.

/// A raw progress report from an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineProgress {
    /// Elapsed media time in `[[HH:]MM:]SS[.frac]` form.
    Timemark(String),
    /// Percentage computed by the engine itself.
    Percent(f64),
}

impl EngineProgress {
    /// Convert this report into a percentage of `duration_secs`.
    ///
    /// Returns `None` for a timemark that cannot be parsed. The result is
    /// not clamped; a slightly wrong probe can yield values above 100.
    pub fn percent(&self, duration_secs: Option<f64>) -> Option<f64> {
        match self {
            Self::Timemark(mark) => {
                parse_timemark(mark).map(|elapsed| progress_percent(elapsed, duration_secs))
            }
            Self::Percent(pct) => Some(*pct),
        }
    }
}

/// Parse a timemark into seconds.
///
/// Components are read right to left: seconds (may be fractional), then
/// minutes, then hours. `"01:01:10"` is 3670 seconds and a bare `"10"` is
/// 10 seconds.
pub fn parse_timemark(timemark: &str) -> Option<f64> {
    let mut parts = timemark.trim().rsplit(':');

    let seconds: f64 = parts.next()?.trim().parse().ok()?;
    if !seconds.is_finite() {
        return None;
    }

    let mut total = seconds;
    for multiplier in [60.0, 3600.0] {
        match parts.next() {
            Some(part) => {
                let value: i64 = part.trim().parse().ok()?;
                total += value as f64 * multiplier;
            }
            None => return Some(total),
        }
    }

    // More than three components is not a timemark.
    if parts.next().is_some() {
        return None;
    }

    Some(total)
}

/// Percentage of `duration_secs` covered by `elapsed_secs`.
///
/// Unknown, zero or non-finite durations yield 0 instead of dividing by zero.
pub fn progress_percent(elapsed_secs: f64, duration_secs: Option<f64>) -> f64 {
    match duration_secs {
        Some(duration) if duration > 0.0 && duration.is_finite() => {
            elapsed_secs / duration * 100.0
        }
        _ => 0.0,
    }
}
