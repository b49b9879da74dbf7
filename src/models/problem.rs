//! Problem model
//!
//! Problems are authored elsewhere; this service only reads their limits and
//! difficulty. Test cases never pass through here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Execution limits of a problem as stored
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProblemLimits {
    pub id: Uuid,
    /// Time limit in seconds
    pub time_limit: Option<i32>,
    /// Memory limit in megabytes
    pub memory_limit: Option<i32>,
}

impl ProblemLimits {
    /// Time limit, or `default` when the problem has none
    pub fn time_limit_or(&self, default: i32) -> i32 {
        self.time_limit.filter(|t| *t > 0).unwrap_or(default)
    }

    /// Memory limit, or `default` when the problem has none
    pub fn memory_limit_or(&self, default: i32) -> i32 {
        self.memory_limit.filter(|m| *m > 0).unwrap_or(default)
    }
}

/// Problem difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Easy => write!(f, "Easy"),
            Self::Medium => write!(f, "Medium"),
            Self::Hard => write!(f, "Hard"),
        }
    }
}

/// Error when parsing an unknown difficulty label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid difficulty '{0}'")]
pub struct ParseDifficultyError(pub String);

impl FromStr for Difficulty {
    type Err = ParseDifficultyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" => Ok(Self::Easy),
            "Medium" => Ok(Self::Medium),
            "Hard" => Ok(Self::Hard),
            other => Err(ParseDifficultyError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Difficulty {
    type Error = ParseDifficultyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
