//! Domain models
//!
//! This module contains all domain models used throughout the application.

pub mod job;
pub mod leaderboard;
pub mod problem;
pub mod submission;

pub use job::*;
pub use leaderboard::*;
pub use problem::*;
pub use submission::*;
