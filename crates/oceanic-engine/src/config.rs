//! Engine configuration from environment.

use std::env;
use std::str::FromStr;

use oceanic_core::ProbeConfig;

/// Build the probe configuration, overriding defaults from `OCEANIC_*`
/// environment variables where set. Unparseable values fall back to the
/// defaults.
pub fn from_env() -> ProbeConfig {
    let defaults = ProbeConfig::default();
    ProbeConfig {
        check_interval_ms: parse_var("OCEANIC_CHECK_INTERVAL_MS", defaults.check_interval_ms),
        advisory_threshold_hours: parse_var(
            "OCEANIC_ADVISORY_HOURS",
            defaults.advisory_threshold_hours,
        ),
        imminent_threshold_minutes: parse_var(
            "OCEANIC_IMMINENT_MINUTES",
            defaults.imminent_threshold_minutes,
        ),
        actual_threshold_minutes: parse_var(
            "OCEANIC_ACTUAL_MINUTES",
            defaults.actual_threshold_minutes,
        ),
        same_track_max_angle_deg: parse_var(
            "OCEANIC_SAME_TRACK_MAX_DEG",
            defaults.same_track_max_angle_deg,
        ),
        reciprocal_min_angle_deg: parse_var(
            "OCEANIC_RECIPROCAL_MIN_DEG",
            defaults.reciprocal_min_angle_deg,
        ),
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
