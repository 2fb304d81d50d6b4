// SPDX-License-Identifier: MIT

//! Volunteer-Tracker: backend for a volunteering-opportunities app
//!
//! This crate provides the API for browsing volunteering events and the
//! community leaderboard computed from recorded attendance hours.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{LeaderboardService, SystemClock};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub leaderboard: LeaderboardService<FirestoreDb, SystemClock>,
}
