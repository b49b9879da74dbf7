//! Leaderboard models

use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use super::Difficulty;

/// Time window a leaderboard is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaderboardPeriod {
    #[default]
    AllTime,
    Monthly,
    Weekly,
}

impl LeaderboardPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllTime => "all-time",
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }

    /// Earliest submission time counted, or `None` for no lower bound.
    ///
    /// Weekly is a trailing seven days; monthly starts at midnight of the same
    /// calendar day in the previous month (clamped to that month's last day).
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::AllTime => None,
            Self::Weekly => Some(now - Duration::days(7)),
            Self::Monthly => now
                .date_naive()
                .checked_sub_months(Months::new(1))
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight.and_utc()),
        }
    }
}

/// Error when parsing an unknown period
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid leaderboard period '{0}', expected all-time, monthly or weekly")]
pub struct ParsePeriodError(pub String);

impl FromStr for LeaderboardPeriod {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all-time" => Ok(Self::AllTime),
            "monthly" => Ok(Self::Monthly),
            "weekly" => Ok(Self::Weekly),
            other => Err(ParsePeriodError(other.to_string())),
        }
    }
}

/// One accepted (user, problem) pair joined with the problem's difficulty
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AcceptedSolve {
    pub user_id: Uuid,
    pub username: String,
    pub problem_id: Uuid,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
}

/// A user's graded submission counts over their whole history
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct SubmissionTotals {
    pub user_id: Uuid,
    pub total: i64,
    pub accepted: i64,
}

/// Ranked leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub username: String,
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
    pub problems_solved: u32,
    pub score: u32,
    pub acceptance_rate: f64,
}
