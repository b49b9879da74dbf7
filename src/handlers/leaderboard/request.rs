//! Leaderboard request DTOs

use serde::Deserialize;

/// Leaderboard query parameters
#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    /// `all-time` (default), `monthly` or `weekly`
    pub period: Option<String>,
}
