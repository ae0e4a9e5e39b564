//! Output artifact type and the presentation helpers used by store listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed, persisted result file.
///
/// Created by [`crate::store::OutputStore::create`] on a successful
/// submission; never mutated afterwards; removed only by an explicit
/// delete or delete-all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputArtifact {
    /// Stored filename, always carrying the `.pdf` suffix.
    pub filename: String,
    /// Size in bytes.
    pub size: u64,
    /// Filesystem-derived creation time.
    pub created_at: DateTime<Utc>,
}

impl OutputArtifact {
    /// Human-formatted size for listings.
    pub fn display_size(&self) -> String {
        human_size(self.size)
    }

    /// Relative creation age against `now`.
    pub fn age(&self, now: DateTime<Utc>) -> String {
        relative_age(self.created_at, now)
    }
}

const UNITS: [&str; 5] = ["B", "kB", "MB", "GB", "TB"];
const DECIMALS: [usize; 5] = [0, 1, 2, 2, 3];

/// Format a byte count with base-1024 units.
///
/// Tier boundaries sit exactly at 1024^i; each tier has a fixed maximum
/// number of decimal places (see [`DECIMALS`]) with trailing zeros trimmed:
/// `0` → `"0B"`, `1536` → `"1.5kB"`, `1_048_576` → `"1MB"`.
pub fn human_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }
    // floor(log1024(n)) == floor(log2(n) / 10) for n ≥ 1.
    let tier = (((63 - bytes.leading_zeros()) / 10) as usize).min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(tier as i32);
    let mut s = format!("{:.*}", DECIMALS[tier], value);
    if s.contains('.') {
        s = s.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{}{}", s, UNITS[tier])
}

/// Coarse human-readable age, newest-granularity-first.
pub fn relative_age(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - created_at).num_seconds().max(0);
    match secs {
        0..=4 => "just now".to_string(),
        5..=59 => plural(secs, "second"),
        60..=3_599 => plural(secs / 60, "minute"),
        3_600..=86_399 => plural(secs / 3_600, "hour"),
        86_400..=2_591_999 => plural(secs / 86_400, "day"),
        2_592_000..=31_535_999 => plural(secs / 2_592_000, "month"),
        _ => plural(secs / 31_536_000, "year"),
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}
