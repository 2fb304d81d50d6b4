// SPDX-License-Identifier: MIT

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (profile storage)
//! - Opportunities (volunteering events with denormalized attendance)
//!
//! Also implements [`RecordStore`] so the leaderboard service can pull
//! full snapshots of both collections.

use std::collections::HashMap;

use crate::db::collections;
use crate::error::AppError;
use crate::models::{Opportunity, User};
use crate::services::RecordStore;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        // Use ExternalJwtFunctionSource to provide a dummy token without needing
        // a custom TokenSource implementation struct.
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by document ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &User) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get all users (leaderboard snapshot).
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USERS)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Opportunity Operations ──────────────────────────────────

    /// Get an opportunity by document ID.
    pub async fn get_opportunity(
        &self,
        opportunity_id: &str,
    ) -> Result<Option<Opportunity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::OPPORTUNITIES)
            .obj()
            .one(opportunity_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get opportunities with optional date filter and pagination.
    ///
    /// Results are ordered by event date descending.
    pub async fn get_opportunities(
        &self,
        after_date: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Opportunity>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::OPPORTUNITIES);

        let query = if let Some(date) = after_date {
            let date = date.to_string();
            query.filter(move |q| q.for_all([q.field("event_date").greater_than(date.clone())]))
        } else {
            query
        };

        query
            .order_by([("event_date", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .offset(offset)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get all opportunities (leaderboard snapshot).
    pub async fn list_opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::OPPORTUNITIES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update an opportunity.
    pub async fn upsert_opportunity(&self, opportunity: &Opportunity) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::OPPORTUNITIES)
            .document_id(&opportunity.id)
            .object(opportunity)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Merge attendance statuses onto an opportunity.
    ///
    /// Fetch-modify-write: existing statuses for other users are kept,
    /// statuses for the given users are replaced.
    pub async fn set_attendance(
        &self,
        opportunity_id: &str,
        statuses: &HashMap<String, String>,
    ) -> Result<Opportunity, AppError> {
        let mut opportunity = self
            .get_opportunity(opportunity_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Opportunity {} not found", opportunity_id))
            })?;

        opportunity
            .attendance
            .get_or_insert_with(HashMap::new)
            .extend(statuses.iter().map(|(k, v)| (k.clone(), v.clone())));

        self.upsert_opportunity(&opportunity).await?;

        tracing::debug!(
            opportunity_id,
            updated = statuses.len(),
            "Attendance recorded"
        );

        Ok(opportunity)
    }
}

impl RecordStore for FirestoreDb {
    async fn fetch_opportunities(&self) -> Result<Vec<Opportunity>, AppError> {
        self.list_opportunities().await
    }

    async fn fetch_users(&self) -> Result<Vec<User>, AppError> {
        self.list_users().await
    }
}
