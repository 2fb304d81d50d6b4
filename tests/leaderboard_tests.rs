// SPDX-License-Identifier: MIT

//! Leaderboard service behavior: refresh lifecycle, busy flag, name cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;
use volunteer_tracker::error::AppError;
use volunteer_tracker::models::{Opportunity, TimeFilter, User};
use volunteer_tracker::services::{Clock, LeaderboardError, LeaderboardService, RecordStore};

fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap()
}

/// Fixed clock so window boundaries are deterministic.
struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// In-memory store; contents can be swapped between refreshes.
#[derive(Default)]
struct MemoryStore {
    opportunities: Mutex<Vec<Opportunity>>,
    users: Mutex<Vec<User>>,
}

impl RecordStore for MemoryStore {
    async fn fetch_opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        Ok(self.opportunities.lock().unwrap().clone())
    }

    async fn fetch_users(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.lock().unwrap().clone())
    }
}

/// Store whose first fetch blocks until released, to hold a refresh open.
struct BlockingStore {
    entered: Notify,
    release: Notify,
}

impl RecordStore for BlockingStore {
    async fn fetch_opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        self.entered.notify_one();
        self.release.notified().await;
        // Re-arm the permit so only the first fetch blocks; later fetches
        // pass straight through once the store has been released.
        self.release.notify_one();
        Ok(vec![])
    }

    async fn fetch_users(&self) -> Result<Vec<User>, AppError> {
        Ok(vec![])
    }
}

/// Store that always fails, simulating an unreachable backend.
struct FailingStore;

impl RecordStore for FailingStore {
    async fn fetch_opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        Err(AppError::Database("connection refused".to_string()))
    }

    async fn fetch_users(&self) -> Result<Vec<User>, AppError> {
        Err(AppError::Database("connection refused".to_string()))
    }
}

fn make_opportunity(id: &str, hours: f64, present: &[&str]) -> Opportunity {
    Opportunity {
        id: id.to_string(),
        title: format!("Event {}", id),
        organizer_id: "mgr".to_string(),
        location: None,
        event_date: test_now(),
        duration_hours: Some(hours),
        attendance: Some(
            present
                .iter()
                .map(|u| (u.to_string(), "present".to_string()))
                .collect::<HashMap<_, _>>(),
        ),
    }
}

fn make_user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: Some(username.to_string()),
        email: None,
        is_manager: false,
        created_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

#[tokio::test]
async fn test_refresh_produces_ranked_snapshot() {
    let store = MemoryStore::default();
    *store.opportunities.lock().unwrap() = vec![
        make_opportunity("o1", 4.0, &["u1"]),
        make_opportunity("o2", 2.0, &["u1", "u2"]),
    ];
    *store.users.lock().unwrap() = vec![make_user("u1", "ada"), make_user("u2", "grace")];

    let service = LeaderboardService::new(store, FixedClock(test_now()));
    let snapshot = service.refresh(TimeFilter::Total).await.unwrap();

    assert_eq!(snapshot.entries.len(), 2);
    assert_eq!(snapshot.entries[0].id, "u1");
    assert_eq!(snapshot.entries[0].total_hours, 6.0);
    assert_eq!(snapshot.entries[0].rank, 1);
    assert_eq!(snapshot.entries[0].username, "ada");
    assert_eq!(snapshot.entries[1].id, "u2");
    assert_eq!(snapshot.entries[1].rank, 2);
    assert_eq!(snapshot.updated_at, "2024-03-15T12:00:00Z");

    let last = service.last_snapshot().expect("snapshot stored");
    assert_eq!(last.entries.len(), 2);
}

#[tokio::test]
async fn test_refresh_rejected_while_in_flight() {
    let store = BlockingStore {
        entered: Notify::new(),
        release: Notify::new(),
    };
    let service = Arc::new(LeaderboardService::new(store, FixedClock(test_now())));

    let background = {
        let service = service.clone();
        tokio::spawn(async move { service.refresh(TimeFilter::Total).await })
    };

    // Wait until the first refresh is inside the store fetch.
    service.store().entered.notified().await;

    let err = service.refresh(TimeFilter::Monthly).await.unwrap_err();
    assert!(matches!(err, LeaderboardError::AlreadyInProgress));
    // The rejected call must not clobber anything.
    assert!(service.last_snapshot().is_none());

    service.store().release.notify_one();
    let first = background.await.unwrap();
    assert!(first.is_ok());

    // Flag released: a new refresh goes through.
    assert!(service.refresh(TimeFilter::Total).await.is_ok());
}

#[tokio::test]
async fn test_fetch_failure_surfaces_and_releases_flag() {
    let service = LeaderboardService::new(FailingStore, FixedClock(test_now()));

    let err = service.refresh(TimeFilter::Total).await.unwrap_err();
    match err {
        LeaderboardError::SourceFetch(detail) => {
            assert!(detail.contains("connection refused"));
        }
        other => panic!("expected SourceFetch, got {:?}", other),
    }
    assert!(service.last_snapshot().is_none());

    // The busy flag must be released after a failure.
    let err = service.refresh(TimeFilter::Total).await.unwrap_err();
    assert!(matches!(err, LeaderboardError::SourceFetch(_)));
}

#[tokio::test]
async fn test_name_cache_persists_across_refreshes() {
    let store = MemoryStore::default();
    *store.opportunities.lock().unwrap() = vec![make_opportunity("o1", 1.0, &["u1"])];
    *store.users.lock().unwrap() = vec![make_user("u1", "ada")];

    let service = LeaderboardService::new(store, FixedClock(test_now()));

    let snapshot = service.refresh(TimeFilter::Total).await.unwrap();
    assert_eq!(snapshot.entries[0].username, "ada");

    // User record disappears from the store; cached name still resolves.
    service.store().users.lock().unwrap().clear();
    let snapshot = service.refresh(TimeFilter::Total).await.unwrap();
    assert_eq!(snapshot.entries[0].username, "ada");
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_snapshot() {
    let store = MemoryStore::default();
    *store.opportunities.lock().unwrap() = vec![make_opportunity("o1", 3.0, &["u1"])];

    let service = LeaderboardService::new(store, FixedClock(test_now()));
    service.refresh(TimeFilter::Total).await.unwrap();
    assert!(service.last_snapshot().is_some());

    // Swap in an empty store result set; a successful refresh replaces the
    // snapshot, so verify the stored one tracks the latest compute.
    service.store().opportunities.lock().unwrap().clear();
    let snapshot = service.refresh(TimeFilter::Total).await.unwrap();
    assert!(snapshot.entries.is_empty());
    assert!(service.last_snapshot().unwrap().entries.is_empty());
}
