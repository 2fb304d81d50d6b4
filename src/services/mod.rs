// SPDX-License-Identifier: MIT

//! Services module - business logic layer.

pub mod leaderboard;

pub use leaderboard::{
    Clock, LeaderboardError, LeaderboardService, RecordStore, SystemClock,
};
