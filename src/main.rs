// SPDX-License-Identifier: MIT

//! Volunteer-Tracker API Server
//!
//! Serves volunteering opportunities and a community leaderboard of
//! volunteer hours aggregated from recorded attendance.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use volunteer_tracker::{
    config::Config,
    db::FirestoreDb,
    services::{LeaderboardService, SystemClock},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env();
    tracing::info!(port = config.port, "Starting Volunteer-Tracker API");

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");

    // Leaderboard service owns the name cache and busy flag for the
    // lifetime of the process.
    let leaderboard = LeaderboardService::new(db.clone(), SystemClock);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        leaderboard,
    });

    // Build router
    let app = volunteer_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("volunteer_tracker=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
