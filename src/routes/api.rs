// SPDX-License-Identifier: MIT

//! API routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{LeaderboardSnapshot, Opportunity, TimeFilter};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/leaderboard", get(get_leaderboard))
        .route("/api/opportunities", get(get_opportunities))
        .route("/api/opportunities/{id}", get(get_opportunity))
        .route("/api/opportunities/{id}/attendance", put(put_attendance))
        .route("/api/users/{id}", get(get_user))
}

// ─── Leaderboard ─────────────────────────────────────────────

#[derive(Deserialize)]
struct LeaderboardQuery {
    /// Time window: "monthly", "annually" or "total" (default)
    #[serde(default)]
    filter: TimeFilter,
}

/// Recompute and return the leaderboard for the requested window.
///
/// Returns 409 if a refresh is already running and 502 if the record
/// store cannot be read; the client may simply retry in both cases.
async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardSnapshot>> {
    let snapshot = state.leaderboard.refresh(query.filter).await?;
    Ok(Json(snapshot))
}

// ─── Opportunities ───────────────────────────────────────────

#[derive(Deserialize)]
struct OpportunitiesQuery {
    /// Filter by event date (ISO 8601)
    after: Option<String>,
    /// Pagination: page number (1-indexed)
    #[serde(default = "default_page")]
    page: u32,
    /// Pagination: items per page
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    50
}

const MAX_PER_PAGE: u32 = 100;

/// Parse and normalize the `after` parameter.
///
/// Stored event dates serialize with a `Z` suffix, so the comparison
/// value must use the same rendering for the string ordering in the
/// store query to hold.
fn validate_after(after: Option<&str>) -> Result<Option<String>> {
    after
        .map(|raw| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .map(|dt| crate::time_utils::format_utc_rfc3339(dt.with_timezone(&chrono::Utc)))
                .map_err(|_| {
                    AppError::BadRequest(
                        "Invalid 'after' parameter: must be RFC3339 datetime".to_string(),
                    )
                })
        })
        .transpose()
}

#[derive(Serialize)]
pub struct OpportunitiesResponse {
    pub opportunities: Vec<Opportunity>,
    pub page: u32,
    pub per_page: u32,
}

/// List opportunities, newest first.
async fn get_opportunities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OpportunitiesQuery>,
) -> Result<Json<OpportunitiesResponse>> {
    if query.page == 0 {
        return Err(AppError::BadRequest("'page' must be >= 1".to_string()));
    }
    if query.per_page == 0 || query.per_page > MAX_PER_PAGE {
        return Err(AppError::BadRequest(format!(
            "'per_page' must be between 1 and {}",
            MAX_PER_PAGE
        )));
    }

    let after = validate_after(query.after.as_deref())?;
    let offset = (query.page - 1)
        .checked_mul(query.per_page)
        .ok_or_else(|| AppError::BadRequest("'page' is out of range".to_string()))?;

    let opportunities = state
        .db
        .get_opportunities(after.as_deref(), query.per_page, offset)
        .await?;

    Ok(Json(OpportunitiesResponse {
        opportunities,
        page: query.page,
        per_page: query.per_page,
    }))
}

/// Get a single opportunity by ID.
async fn get_opportunity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Opportunity>> {
    let opportunity = state
        .db
        .get_opportunity(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Opportunity {} not found", id)))?;
    Ok(Json(opportunity))
}

// ─── Attendance ──────────────────────────────────────────────

const MAX_ATTENDANCE_UPDATES: usize = 500;
const MAX_STATUS_LEN: usize = 32;

#[derive(Deserialize)]
struct AttendanceRequest {
    /// User ID -> status ("present", "absent", ...)
    statuses: HashMap<String, String>,
}

/// Record attendance statuses for an opportunity.
///
/// Statuses for listed users replace any previous value; other users'
/// statuses are untouched.
async fn put_attendance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<AttendanceRequest>,
) -> Result<Json<Opportunity>> {
    if request.statuses.is_empty() {
        return Err(AppError::BadRequest(
            "'statuses' must not be empty".to_string(),
        ));
    }
    if request.statuses.len() > MAX_ATTENDANCE_UPDATES {
        return Err(AppError::BadRequest(format!(
            "At most {} statuses per request",
            MAX_ATTENDANCE_UPDATES
        )));
    }
    if request
        .statuses
        .iter()
        .any(|(user_id, status)| user_id.is_empty() || status.len() > MAX_STATUS_LEN)
    {
        return Err(AppError::BadRequest(
            "Status entries must have a non-empty user id and a short status".to_string(),
        ));
    }

    let opportunity = state.db.set_attendance(&id, &request.statuses).await?;

    tracing::info!(
        opportunity_id = %id,
        updated = request.statuses.len(),
        "Attendance updated"
    );

    Ok(Json(opportunity))
}

// ─── Users ───────────────────────────────────────────────────

/// Public user profile (email omitted).
#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: Option<String>,
    pub is_manager: bool,
    pub created_at: String,
}

/// Get a user's public profile.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>> {
    let user = state
        .db
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

    Ok(Json(UserResponse {
        id: user.id,
        username: user.username,
        is_manager: user.is_manager,
        created_at: user.created_at,
    }))
}
