// SPDX-License-Identifier: MIT

//! Leaderboard output models and time-window filters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time_utils::{month_window, year_window};

/// Time window applied when aggregating volunteer hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    /// Current calendar month
    Monthly,
    /// Current calendar year
    Annually,
    /// All time
    Total,
}

impl TimeFilter {
    /// Resolve the half-open `[start, end)` window for this filter.
    ///
    /// `None` means unbounded: either the filter is `Total`, or the
    /// calendar could not produce a boundary (in which case we degrade to
    /// all-time rather than failing the whole computation).
    pub fn window(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match self {
            TimeFilter::Monthly => month_window(now),
            TimeFilter::Annually => year_window(now),
            TimeFilter::Total => None,
        }
    }

    /// Whether `event_date` falls inside this filter's window.
    pub fn contains(&self, now: DateTime<Utc>, event_date: DateTime<Utc>) -> bool {
        match self.window(now) {
            Some((start, end)) => event_date >= start && event_date < end,
            None => true,
        }
    }
}

impl Default for TimeFilter {
    fn default() -> Self {
        TimeFilter::Total
    }
}

/// One leaderboard entry, already ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedUser {
    /// User document ID
    pub id: String,
    /// Dense competition rank (ties share a rank, next distinct total
    /// advances the rank by exactly 1)
    pub rank: u32,
    /// Resolved display name, or a fallback derived from the ID
    pub username: String,
    /// Total volunteer hours in the active window; always > 0
    pub total_hours: f64,
}

/// Result of one leaderboard computation.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardSnapshot {
    /// Filter the snapshot was computed for
    pub filter: TimeFilter,
    /// Ranked entries, descending by hours
    pub entries: Vec<RankedUser>,
    /// When the snapshot was computed (ISO 8601)
    pub updated_at: String,
}
