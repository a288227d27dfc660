//! Goal board loading and goal writes.

use crate::core::error::{ServiceError, ServiceResult};
use crate::core::goals::{GoalFilter, GoalStats, ProgressUpdate, RankingEntry, summarize};
use crate::core::period::GoalPeriod;
use crate::core::records::{Goal, Profile};
use crate::core::roles::Permission;
use crate::core::session::Session;
use crate::core::store::{Query, Record, Store, fetch_record, fetch_records, insert_record, update_record};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};

/// Everything the goals page renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GoalBoard {
    /// Computed over every goal, whatever the filter.
    pub stats: GoalStats,
    pub rankings: Vec<RankingEntry>,
    /// Goals kept by the filter, newest first.
    pub goals: Vec<Goal>,
}

fn attach_assignees(goals: &mut [Goal], profiles: &[Profile]) {
    let by_id: HashMap<&str, &Profile> = profiles.iter().map(|p| (p.id.as_str(), p)).collect();
    for goal in goals {
        goal.assignee = goal
            .user_id
            .as_deref()
            .and_then(|id| by_id.get(id))
            .map(|profile| profile.as_assignee());
    }
}

pub async fn load_board(
    store: &dyn Store,
    session: &Session,
    filter: GoalFilter,
) -> ServiceResult<GoalBoard> {
    let goals_query = Query::new().order_by("created_at", false);
    let profiles_query = Query::new();
    let (mut goals, profiles) = futures::try_join!(
        fetch_records::<Goal>(store, &goals_query),
        fetch_records::<Profile>(store, &profiles_query),
    )?;
    attach_assignees(&mut goals, &profiles);

    let summary = summarize(&goals);
    let user_id = session.user_id();
    let goals: Vec<Goal> = goals
        .into_iter()
        .filter(|goal| filter.keeps(goal, user_id))
        .collect();
    debug!(
        "Goal board: {} goals shown with filter {:?}, {} ranked users",
        goals.len(),
        filter,
        summary.rankings.len()
    );

    Ok(GoalBoard {
        stats: summary.stats,
        rankings: summary.rankings,
        goals,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    /// `None` creates a team-wide goal.
    pub user_id: Option<String>,
    pub kind: String,
    pub target_value: i64,
    pub period: GoalPeriod,
}

/// Creates a goal with no progress yet.
pub async fn add_goal(store: &dyn Store, session: &Session, new: NewGoal) -> ServiceResult<Goal> {
    session.require(Permission::EditGoals)?;
    let kind = new.kind.trim();
    if kind.is_empty() {
        return Err(ServiceError::Invalid("Goal type must not be empty".to_string()));
    }
    if new.target_value <= 0 {
        return Err(ServiceError::Invalid(format!(
            "Goal target must be positive, got {}",
            new.target_value
        )));
    }
    if let Some(user_id) = new.user_id.as_deref() {
        fetch_record::<Profile>(store, user_id).await?;
    }

    let goal = Goal {
        id: String::new(),
        user_id: new.user_id,
        kind: kind.to_string(),
        target_value: new.target_value,
        current_value: 0,
        period: new.period,
        created_at: None,
        assignee: None,
    };
    let stored = insert_record(store, &goal).await?;
    info!(
        "Added {} goal {} ({} target {})",
        stored.period, stored.id, stored.kind, stored.target_value
    );
    Ok(stored)
}

/// Applies a progress change; the current value never drops below zero.
pub async fn update_progress(
    store: &dyn Store,
    id: &str,
    update: ProgressUpdate,
) -> ServiceResult<Goal> {
    let goal: Goal = fetch_record(store, id).await?;
    let next = update.apply(goal.current_value);
    if next == goal.current_value {
        debug!("Goal {} already at {}", id, next);
        return Ok(goal);
    }
    let updated: Goal = update_record(store, id, json!({"current_value": next})).await?;
    info!(
        "Goal {} progress {} -> {} of {}",
        id, goal.current_value, updated.current_value, updated.target_value
    );
    Ok(updated)
}

pub async fn delete_goal(store: &dyn Store, session: &Session, id: &str) -> ServiceResult<()> {
    session.require(Permission::EditGoals)?;
    store.delete(Goal::TABLE, id).await?;
    info!("Deleted goal {}", id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StoreError;
    use crate::core::store::Table;
    use crate::store::memory::MemoryStore;

    fn profile(id: &str, name: &str, role: &str) -> Profile {
        Profile {
            id: id.to_string(),
            name: Some(name.to_string()),
            email: None,
            role: Some(role.to_string()),
            avatar_url: None,
            theme: None,
            created_at: None,
        }
    }

    async fn seeded() -> (MemoryStore, Session) {
        let store = MemoryStore::new();
        let ana = profile("u1", "Ana", "manager");
        insert_record(&store, &ana).await.unwrap();
        insert_record(&store, &profile("u2", "Bruno", "consultant"))
            .await
            .unwrap();
        (store, Session::for_profile(ana))
    }

    fn new_goal(user_id: Option<&str>, target: i64) -> NewGoal {
        NewGoal {
            user_id: user_id.map(str::to_string),
            kind: "Reuniões Agendadas".to_string(),
            target_value: target,
            period: GoalPeriod::Mensal,
        }
    }

    #[tokio::test]
    async fn test_board_filters_but_ranks_everything() {
        let (store, session) = seeded().await;
        let mine = add_goal(&store, &session, new_goal(Some("u1"), 10)).await.unwrap();
        let bruno = add_goal(&store, &session, new_goal(Some("u2"), 4)).await.unwrap();
        add_goal(&store, &session, new_goal(None, 100)).await.unwrap();

        update_progress(&store, &mine.id, ProgressUpdate::Set(5)).await.unwrap();
        update_progress(&store, &bruno.id, ProgressUpdate::Set(4)).await.unwrap();

        let board = load_board(&store, &session, GoalFilter::Mine).await.unwrap();
        assert_eq!(board.goals.len(), 1);
        assert_eq!(board.goals[0].id, mine.id);
        assert_eq!(
            board.goals[0].assignee.as_ref().and_then(|a| a.name.as_deref()),
            Some("Ana")
        );
        assert_eq!(board.stats.total_goals, 3);
        assert_eq!(board.stats.completed_goals, 1);
        assert_eq!(board.rankings.len(), 2);
        assert_eq!(board.rankings[0].name, "Bruno");
        assert_eq!(board.rankings[0].average, 100);
        assert_eq!(board.rankings[1].average, 50);

        let general = load_board(&store, &session, GoalFilter::General).await.unwrap();
        assert_eq!(general.goals.len(), 1);
        assert!(general.goals[0].is_team_wide());
        assert!(general.goals[0].assignee.is_none());
    }

    #[tokio::test]
    async fn test_add_goal_validation_and_permission() {
        let (store, session) = seeded().await;

        let zero = add_goal(&store, &session, new_goal(None, 0)).await;
        assert!(matches!(zero, Err(ServiceError::Invalid(_))));

        let unknown = add_goal(&store, &session, new_goal(Some("ghost"), 3)).await;
        assert!(matches!(
            unknown,
            Err(ServiceError::Store(StoreError::NotFound { .. }))
        ));

        let consultant = Session::for_profile(profile("u2", "Bruno", "consultant"));
        let denied = add_goal(&store, &consultant, new_goal(None, 3)).await;
        assert!(matches!(
            denied,
            Err(ServiceError::PermissionDenied(Permission::EditGoals))
        ));

        let goal = add_goal(&store, &session, new_goal(None, 3)).await.unwrap();
        assert_eq!(goal.current_value, 0);
        assert!(matches!(
            delete_goal(&store, &consultant, &goal.id).await,
            Err(ServiceError::PermissionDenied(_))
        ));
        delete_goal(&store, &session, &goal.id).await.unwrap();
        assert!(store.fetch(Table::Goals, &Query::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_never_goes_negative() {
        let (store, session) = seeded().await;
        let goal = add_goal(&store, &session, new_goal(None, 3)).await.unwrap();

        let goal_after = update_progress(&store, &goal.id, ProgressUpdate::Decrement)
            .await
            .unwrap();
        assert_eq!(goal_after.current_value, 0);

        update_progress(&store, &goal.id, ProgressUpdate::Increment).await.unwrap();
        let goal_after = update_progress(&store, &goal.id, ProgressUpdate::Increment)
            .await
            .unwrap();
        assert_eq!(goal_after.current_value, 2);

        let goal_after = update_progress(&store, &goal.id, ProgressUpdate::Set(-7))
            .await
            .unwrap();
        assert_eq!(goal_after.current_value, 0);
    }
}
