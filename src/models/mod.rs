// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod leaderboard;
pub mod opportunity;
pub mod user;

pub use leaderboard::{LeaderboardSnapshot, RankedUser, TimeFilter};
pub use opportunity::Opportunity;
pub use user::User;
