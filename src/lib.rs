pub mod aggregate;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod model;
pub mod resolver;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod upstream;

pub use aggregate::{
    AccountSummary, Aggregator, CompareEntry, CompareOptions, CompareStatus, Provisioner, TopPost,
    Totals,
};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use metrics::{analyze_cohort, CohortNormalizer, Counters, PostMetrics, Rates};
pub use store::{FileStore, MetricsStore};
pub use sync::{SyncReport, Synchronizer};
pub use upstream::{ContentSource, Diagnostics, HttpContentSource, Probe, ProbeAttempt};

/// Rounds to two decimals, half away from zero. Non-finite input maps to 0.
///
/// The scaled value is first snapped to six decimals so that a decimal tie
/// such as `1.005`, stored as `1.00499...`, still rounds away from zero.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scaled = ((value * 100.0) * 1e6).round() / 1e6;
    scaled.round() / 100.0
}

pub fn format_number(value: f64) -> String {
    let rounded = value.round().max(0.0) as i64;
    let mut chars: Vec<char> = rounded.to_string().chars().collect();
    let mut result = String::new();
    let mut count = 0usize;

    while let Some(ch) = chars.pop() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(ch);
        count += 1;
    }

    result.chars().rev().collect()
}

/// Formats a value that is already a percentage.
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
