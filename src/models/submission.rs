//! Submission model and its status lifecycle

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::constants::languages;

/// Submission database model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing)]
    pub source_code: String,
    #[sqlx(try_from = "String")]
    pub language: Language,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    pub verdict: String,
    /// Wall time in milliseconds
    pub execution_time: Option<i32>,
    /// Peak memory in kilobytes
    pub memory_used: Option<i32>,
    pub test_cases_passed: Option<i32>,
    pub total_test_cases: Option<i32>,
    pub judged_at: Option<DateTime<Utc>>,
    pub is_test_run: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to persist a new submission; status is always `Pending`
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub problem_id: Uuid,
    pub user_id: Uuid,
    pub language: Language,
    pub source_code: String,
    pub is_test_run: bool,
}

/// Submission lifecycle status.
///
/// `Pending` and `Judging` are transient; every other status is terminal.
/// The serialized form is the human-readable label stored in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "Judging")]
    Judging,
    #[serde(rename = "Accepted")]
    Accepted,
    #[serde(rename = "Wrong Answer")]
    WrongAnswer,
    #[serde(rename = "Time Limit Exceeded")]
    TimeLimitExceeded,
    #[serde(rename = "Memory Limit Exceeded")]
    MemoryLimitExceeded,
    #[serde(rename = "Compilation Error")]
    CompilationError,
    #[serde(rename = "Runtime Error")]
    RuntimeError,
    #[serde(rename = "Internal Error")]
    InternalError,
}

impl SubmissionStatus {
    /// All possible status values
    pub const ALL: &'static [SubmissionStatus] = &[
        Self::Pending,
        Self::Judging,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::MemoryLimitExceeded,
        Self::CompilationError,
        Self::RuntimeError,
        Self::InternalError,
    ];

    /// Get status as its stored label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Judging => "Judging",
            Self::Accepted => "Accepted",
            Self::WrongAnswer => "Wrong Answer",
            Self::TimeLimitExceeded => "Time Limit Exceeded",
            Self::MemoryLimitExceeded => "Memory Limit Exceeded",
            Self::CompilationError => "Compilation Error",
            Self::RuntimeError => "Runtime Error",
            Self::InternalError => "Internal Error",
        }
    }

    /// Check if judging has finished
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Judging)
    }

    /// Check if this status means the solution was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic.
    ///
    /// `Pending -> Judging -> terminal`, with `Pending -> terminal` allowed for
    /// workers that skip the judging notification and for queue-failure
    /// compensation. Terminal statuses never change.
    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        match self {
            Self::Pending => next != Self::Pending,
            Self::Judging => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid submission status '{0}'")]
pub struct ParseStatusError(pub String);

impl FromStr for SubmissionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

impl TryFrom<String> for SubmissionStatus {
    type Error = ParseStatusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Supported submission languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    Java,
    Python,
    Javascript,
}

impl Language {
    /// Get language as its wire identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpp => languages::CPP,
            Self::Java => languages::JAVA,
            Self::Python => languages::PYTHON,
            Self::Javascript => languages::JAVASCRIPT,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an unsupported language identifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported language '{0}'")]
pub struct ParseLanguageError(pub String);

impl FromStr for Language {
    type Err = ParseLanguageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            languages::CPP => Ok(Self::Cpp),
            languages::JAVA => Ok(Self::Java),
            languages::PYTHON => Ok(Self::Python),
            languages::JAVASCRIPT => Ok(Self::Javascript),
            other => Err(ParseLanguageError(other.to_string())),
        }
    }
}

impl TryFrom<String> for Language {
    type Error = ParseLanguageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Result written back by the judging worker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeReport {
    pub status: SubmissionStatus,
    #[serde(default)]
    pub verdict: String,
    pub execution_time: Option<i32>,
    pub memory_used: Option<i32>,
    pub test_cases_passed: Option<i32>,
    pub total_test_cases: Option<i32>,
    pub judged_at: Option<DateTime<Utc>>,
}

/// What a status write did to the stored record
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    /// The record moved to the requested status
    Applied(Submission),
    /// The record already held the requested terminal status
    Unchanged(Submission),
}

impl TransitionOutcome {
    pub fn submission(&self) -> &Submission {
        match self {
            Self::Applied(s) | Self::Unchanged(s) => s,
        }
    }
}

/// Filters for listing a user's submissions
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub offset: i64,
    pub limit: i64,
}
