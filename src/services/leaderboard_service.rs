//! Leaderboard service

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    constants::{scoring, LEADERBOARD_SIZE},
    db::repositories::SubmissionStore,
    error::AppResult,
    models::{AcceptedSolve, Difficulty, LeaderboardEntry, LeaderboardPeriod, SubmissionTotals},
};

/// Builds the ranked leaderboard from accepted submissions
pub struct LeaderboardService {
    submissions: Arc<dyn SubmissionStore>,
}

impl LeaderboardService {
    pub fn new(submissions: Arc<dyn SubmissionStore>) -> Self {
        Self { submissions }
    }

    /// Top users for `period`
    pub async fn leaderboard(&self, period: LeaderboardPeriod) -> AppResult<Vec<LeaderboardEntry>> {
        let solves = self
            .submissions
            .accepted_solves(period.since(Utc::now()))
            .await?;

        let user_ids: Vec<Uuid> = solves
            .iter()
            .map(|s| s.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let totals = self.submissions.submission_totals(&user_ids).await?;

        Ok(rank(solves, &totals, LEADERBOARD_SIZE))
    }
}

#[derive(Default)]
struct Tally {
    username: String,
    easy: u32,
    medium: u32,
    hard: u32,
}

/// Rank users by score, then problems solved.
///
/// Each (user, problem) pair counts once no matter how many accepted
/// submissions it has. Users without an accepted solve never appear.
/// Acceptance rate comes from `totals`, which are not windowed.
pub fn rank(
    solves: Vec<AcceptedSolve>,
    totals: &[SubmissionTotals],
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut seen = HashSet::new();
    let mut tallies: HashMap<Uuid, Tally> = HashMap::new();

    for solve in solves {
        if !seen.insert((solve.user_id, solve.problem_id)) {
            continue;
        }

        let tally = tallies.entry(solve.user_id).or_default();
        if tally.username.is_empty() {
            tally.username = solve.username;
        }
        match solve.difficulty {
            Difficulty::Easy => tally.easy += 1,
            Difficulty::Medium => tally.medium += 1,
            Difficulty::Hard => tally.hard += 1,
        }
    }

    let totals: HashMap<Uuid, &SubmissionTotals> = totals.iter().map(|t| (t.user_id, t)).collect();

    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(user_id, tally)| LeaderboardEntry {
            rank: 0,
            user_id,
            problems_solved: tally.easy + tally.medium + tally.hard,
            score: tally.easy * scoring::EASY_POINTS
                + tally.medium * scoring::MEDIUM_POINTS
                + tally.hard * scoring::HARD_POINTS,
            acceptance_rate: totals
                .get(&user_id)
                .map_or(0.0, |t| acceptance_rate(t.accepted, t.total)),
            username: tally.username,
            easy: tally.easy,
            medium: tally.medium,
            hard: tally.hard,
        })
        .collect();

    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| b.problems_solved.cmp(&a.problems_solved))
            .then_with(|| a.username.cmp(&b.username))
    });
    entries.truncate(limit);

    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = position as u32 + 1;
    }

    entries
}

fn acceptance_rate(accepted: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    accepted as f64 / total as f64 * 100.0
}
