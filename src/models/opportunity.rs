// SPDX-License-Identifier: MIT

//! Volunteering opportunity model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stored opportunity record in Firestore.
///
/// Attendance is denormalized onto the event document: once a manager
/// records who showed up, the leaderboard can be computed from the
/// `opportunities` collection alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    /// Document ID
    pub id: String,
    /// Event title
    pub title: String,
    /// User ID of the manager who created the event
    pub organizer_id: String,
    /// Free-form location description
    pub location: Option<String>,
    /// Event start date/time
    pub event_date: DateTime<Utc>,
    /// Hours credited to each present attendee; absent means no credit
    pub duration_hours: Option<f64>,
    /// User ID -> attendance status ("present", "absent", ...)
    ///
    /// Status strings are compared case-insensitively against "present".
    /// Absent map means attendance was never recorded.
    pub attendance: Option<HashMap<String, String>>,
}

impl Opportunity {
    /// Hours credited per present attendee, clamped to be non-negative.
    ///
    /// A missing or negative duration contributes nothing rather than
    /// failing the computation.
    pub fn credited_hours(&self) -> f64 {
        self.duration_hours.unwrap_or(0.0).max(0.0)
    }
}

/// Attendance status value that counts toward volunteer hours.
pub const STATUS_PRESENT: &str = "present";

/// Whether a raw status string counts as attended.
pub fn is_present(status: &str) -> bool {
    status.eq_ignore_ascii_case(STATUS_PRESENT)
}
