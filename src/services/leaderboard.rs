// SPDX-License-Identifier: MIT

//! Leaderboard computation service.
//!
//! Handles the core workflow:
//! 1. Fetch opportunity and user snapshots from the store
//! 2. Filter opportunities to the active calendar window
//! 3. Aggregate volunteer hours per present attendee
//! 4. Resolve display names through a process-lifetime cache
//! 5. Sort and assign dense competition ranks
//!
//! The whole computation runs to completion from full snapshots on every
//! call; there is no incremental diffing. At most one refresh runs per
//! service instance at a time.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::error::AppError;
use crate::models::opportunity::is_present;
use crate::models::{LeaderboardSnapshot, Opportunity, RankedUser, TimeFilter, User};
use crate::time_utils::format_utc_rfc3339;

/// Characters of the user ID kept when no username can be resolved.
const FALLBACK_NAME_PREFIX_LEN: usize = 4;

/// Supplies "now" for window resolution. Injectable so tests can pin the
/// calendar.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of opportunity and user snapshots.
///
/// Implemented by the Firestore layer in production and by in-memory
/// stores in tests. The engine never retries a failed fetch; that is the
/// caller's responsibility.
pub trait RecordStore {
    fn fetch_opportunities(
        &self,
    ) -> impl Future<Output = Result<Vec<Opportunity>, AppError>> + Send;

    fn fetch_users(&self) -> impl Future<Output = Result<Vec<User>, AppError>> + Send;
}

/// Errors surfaced by a leaderboard refresh.
#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("Leaderboard refresh already in progress")]
    AlreadyInProgress,

    #[error("Failed to fetch leaderboard source data: {0}")]
    SourceFetch(String),
}

/// Computes and caches the volunteer-hours leaderboard.
pub struct LeaderboardService<S, C = SystemClock> {
    store: S,
    clock: C,
    /// User ID -> resolved display name. Persists for the life of the
    /// process and only ever holds non-empty names.
    name_cache: DashMap<String, String>,
    /// True while a refresh is running. Overlapping refreshes are
    /// rejected, never queued.
    in_flight: AtomicBool,
    last: RwLock<Option<LeaderboardSnapshot>>,
}

impl<S, C> LeaderboardService<S, C>
where
    S: RecordStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            name_cache: DashMap::new(),
            in_flight: AtomicBool::new(false),
            last: RwLock::new(None),
        }
    }

    /// Recompute the leaderboard for `filter` from fresh store snapshots.
    ///
    /// Fails with [`LeaderboardError::AlreadyInProgress`] if another
    /// refresh is still running on this instance; the previous snapshot
    /// stays untouched in that case.
    pub async fn refresh(
        &self,
        filter: TimeFilter,
    ) -> Result<LeaderboardSnapshot, LeaderboardError> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            tracing::debug!(?filter, "Refresh rejected: already in progress");
            return Err(LeaderboardError::AlreadyInProgress);
        }

        let result = self.refresh_inner(filter).await;
        self.in_flight.store(false, Ordering::Release);
        result
    }

    async fn refresh_inner(
        &self,
        filter: TimeFilter,
    ) -> Result<LeaderboardSnapshot, LeaderboardError> {
        let opportunities = self
            .store
            .fetch_opportunities()
            .await
            .map_err(|e| LeaderboardError::SourceFetch(e.to_string()))?;
        let users = self
            .store
            .fetch_users()
            .await
            .map_err(|e| LeaderboardError::SourceFetch(e.to_string()))?;

        let now = self.clock.now();
        let entries = rank_users(filter, now, &opportunities, &users, &self.name_cache);

        tracing::info!(
            ?filter,
            opportunities = opportunities.len(),
            ranked_users = entries.len(),
            "Leaderboard refreshed"
        );

        let snapshot = LeaderboardSnapshot {
            filter,
            entries,
            updated_at: format_utc_rfc3339(now),
        };

        // Poisoning only happens if a writer panicked; propagate the data
        // from the poisoned lock rather than panicking again.
        let mut last = self.last.write().unwrap_or_else(|e| e.into_inner());
        *last = Some(snapshot.clone());

        Ok(snapshot)
    }

    /// The underlying record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Most recently computed snapshot, if any refresh has completed.
    pub fn last_snapshot(&self) -> Option<LeaderboardSnapshot> {
        self.last
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// Aggregate, filter, sort and rank: the pure core of the leaderboard.
///
/// `name_cache` is consulted before the `users` snapshot and updated with
/// any newly resolved non-empty username, so names survive later snapshots
/// that no longer contain the user.
pub fn rank_users(
    filter: TimeFilter,
    now: DateTime<Utc>,
    opportunities: &[Opportunity],
    users: &[User],
    name_cache: &DashMap<String, String>,
) -> Vec<RankedUser> {
    let mut totals: HashMap<String, f64> = HashMap::new();

    for opportunity in opportunities {
        if !filter.contains(now, opportunity.event_date) {
            continue;
        }

        if opportunity.duration_hours.is_some_and(|h| h < 0.0) {
            tracing::debug!(
                opportunity_id = %opportunity.id,
                "Negative duration clamped to zero"
            );
        }
        let hours = opportunity.credited_hours();

        let Some(attendance) = &opportunity.attendance else {
            continue;
        };
        for (user_id, status) in attendance {
            if is_present(status) {
                *totals.entry(user_id.clone()).or_insert(0.0) += hours;
            }
        }
    }

    let users_by_id: HashMap<&str, &User> =
        users.iter().map(|user| (user.id.as_str(), user)).collect();

    // Users who never accumulated positive hours are dropped entirely.
    let mut scored: Vec<(String, f64)> = totals
        .into_iter()
        .filter(|(_, hours)| *hours > 0.0)
        .collect();

    // Descending by hours; ties broken by user ID ascending so the order
    // is deterministic regardless of map iteration.
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let mut ranked = Vec::with_capacity(scored.len());
    let mut rank = 0u32;
    // Sentinel below any valid total so the first entry always gets rank 1.
    let mut previous_hours = -1.0_f64;

    for (id, total_hours) in scored {
        if total_hours != previous_hours {
            rank += 1;
            previous_hours = total_hours;
        }
        let username = resolve_name(&id, &users_by_id, name_cache);
        ranked.push(RankedUser {
            id,
            rank,
            username,
            total_hours,
        });
    }

    ranked
}

/// Resolve a display name: cache first, then the user snapshot, then a
/// fallback built from the ID.
fn resolve_name(
    user_id: &str,
    users_by_id: &HashMap<&str, &User>,
    name_cache: &DashMap<String, String>,
) -> String {
    if let Some(cached) = name_cache.get(user_id) {
        return cached.clone();
    }

    if let Some(name) = users_by_id.get(user_id).and_then(|user| user.display_name()) {
        name_cache.insert(user_id.to_string(), name.to_string());
        return name.to_string();
    }

    fallback_name(user_id)
}

/// First characters of the ID plus an ellipsis marker.
fn fallback_name(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(FALLBACK_NAME_PREFIX_LEN).collect();
    format!("{}...", prefix)
}
