//! Goal progress, aggregate statistics and the per-user leaderboard.

use crate::core::records::Goal;
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// Progress of `current` towards `target` as a rounded percentage.
///
/// Never negative, but not capped: overachieving a goal yields more than 100.
/// A target of zero counts as a target of one.
pub fn progress(current: i64, target: i64) -> i64 {
    let target = if target == 0 { 1 } else { target };
    let percent = (current as f64 / target as f64 * 100.0).round() as i64;
    percent.max(0)
}

/// Progress capped at 100, as shown for a single goal.
pub fn completion(current: i64, target: i64) -> i64 {
    progress(current, target).min(100)
}

impl Goal {
    pub fn progress(&self) -> i64 {
        progress(self.current_value, self.target_value)
    }

    pub fn completion(&self) -> i64 {
        completion(self.current_value, self.target_value)
    }

    pub fn is_completed(&self) -> bool {
        self.current_value >= self.target_value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub user_id: String,
    pub name: String,
    pub avatar_url: Option<String>,
    /// Sum of uncapped per-goal progress.
    pub total_progress: i64,
    pub goal_count: usize,
    pub completed_count: usize,
    pub average: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoalStats {
    pub total_goals: usize,
    pub completed_goals: usize,
    pub total_target: i64,
    pub total_current: i64,
    pub average_progress: i64,
    pub top_performer: Option<RankingEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoalSummary {
    pub stats: GoalStats,
    /// Users ordered by descending average progress; ties keep the order in
    /// which the users first appear in the goal list.
    pub rankings: Vec<RankingEntry>,
}

/// Ranks users with at least one assigned goal. Team-wide goals are skipped.
pub fn rank_users(goals: &[Goal]) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for goal in goals {
        let Some(user_id) = goal.user_id.as_deref() else {
            continue;
        };
        let slot = *index.entry(user_id).or_insert_with(|| {
            let assignee = goal.assignee.as_ref();
            entries.push(RankingEntry {
                user_id: user_id.to_string(),
                name: assignee
                    .and_then(|a| a.name.clone())
                    .unwrap_or_else(|| "Sem Nome".to_string()),
                avatar_url: assignee.and_then(|a| a.avatar_url.clone()),
                total_progress: 0,
                goal_count: 0,
                completed_count: 0,
                average: 0,
            });
            entries.len() - 1
        });

        let entry = &mut entries[slot];
        let p = goal.progress();
        entry.total_progress = entry.total_progress.saturating_add(p);
        entry.goal_count += 1;
        if p >= 100 {
            entry.completed_count += 1;
        }
    }

    for entry in &mut entries {
        entry.average = (entry.total_progress as f64 / entry.goal_count as f64).round() as i64;
    }
    // `sort_by` is stable.
    entries.sort_by(|a, b| b.average.cmp(&a.average));
    entries
}

fn saturating_sum(values: impl Iterator<Item = i64>) -> i64 {
    values.fold(0, i64::saturating_add)
}

pub fn summarize(goals: &[Goal]) -> GoalSummary {
    if goals.is_empty() {
        return GoalSummary::default();
    }

    let rankings = rank_users(goals);
    let progress_sum = saturating_sum(goals.iter().map(Goal::completion));
    let stats = GoalStats {
        total_goals: goals.len(),
        completed_goals: goals.iter().filter(|g| g.is_completed()).count(),
        total_target: saturating_sum(goals.iter().map(|g| g.target_value)),
        total_current: saturating_sum(goals.iter().map(|g| g.current_value)),
        average_progress: (progress_sum as f64 / goals.len() as f64).round() as i64,
        top_performer: rankings.first().cloned(),
    };
    debug!(
        "Summarized {} goals across {} ranked users",
        stats.total_goals,
        rankings.len()
    );

    GoalSummary { stats, rankings }
}

/// Which goals a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoalFilter {
    #[default]
    All,
    /// Goals assigned to the current user.
    Mine,
    /// Team-wide goals.
    General,
}

impl GoalFilter {
    pub fn keeps(&self, goal: &Goal, user_id: Option<&str>) -> bool {
        match self {
            GoalFilter::All => true,
            GoalFilter::Mine => user_id.is_some() && goal.user_id.as_deref() == user_id,
            GoalFilter::General => goal.is_team_wide(),
        }
    }
}

impl FromStr for GoalFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(GoalFilter::All),
            "mine" => Ok(GoalFilter::Mine),
            "general" => Ok(GoalFilter::General),
            _ => Err(anyhow::anyhow!("Invalid goal filter: {}", s)),
        }
    }
}

/// A change to a goal's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressUpdate {
    Set(i64),
    Increment,
    Decrement,
}

impl ProgressUpdate {
    /// New current value; never below zero.
    pub fn apply(&self, current: i64) -> i64 {
        let next = match self {
            ProgressUpdate::Set(value) => *value,
            ProgressUpdate::Increment => current.saturating_add(1),
            ProgressUpdate::Decrement => current.saturating_sub(1),
        };
        next.max(0)
    }
}
