use super::ui;
use crate::core::Session;
use crate::core::goals::{GoalFilter, ProgressUpdate};
use crate::core::period::{GoalPeriod, period_key, period_label};
use crate::core::records::Goal;
use crate::core::store::Store;
use crate::services::goals::{self, GoalBoard, NewGoal};
use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use comfy_table::{Cell, Color};

fn assignee_name(goal: &Goal) -> String {
    match (&goal.user_id, &goal.assignee) {
        (None, _) => "Equipe".to_string(),
        (Some(_), Some(assignee)) => assignee
            .name
            .clone()
            .unwrap_or_else(|| "Sem Nome".to_string()),
        (Some(id), None) => id.clone(),
    }
}

impl GoalBoard {
    pub fn display_as_tables(&self, today: NaiveDate) -> String {
        let stats = &self.stats;
        let mut summary = format!(
            "{} {}/{}   {} {}%",
            ui::style_text("Completed:", ui::StyleType::TotalLabel),
            stats.completed_goals,
            stats.total_goals,
            ui::style_text("Average progress:", ui::StyleType::TotalLabel),
            stats.average_progress,
        );
        if let Some(top) = &stats.top_performer {
            summary.push_str(&format!(
                "   {} {} ({}%)",
                ui::style_text("Top performer:", ui::StyleType::TotalLabel),
                ui::style_text(&top.name, ui::StyleType::TotalValue),
                top.average
            ));
        }

        let mut ranking = ui::new_styled_table();
        ranking.set_header(vec![
            ui::header_cell("#"),
            ui::header_cell("User"),
            ui::header_cell("Goals"),
            ui::header_cell("Completed"),
            ui::header_cell("Average"),
        ]);
        for (position, entry) in self.rankings.iter().enumerate() {
            ranking.add_row(vec![
                Cell::new(position + 1),
                Cell::new(&entry.name),
                Cell::new(entry.goal_count),
                Cell::new(entry.completed_count),
                ui::progress_cell(entry.average),
            ]);
        }

        let mut list = ui::new_styled_table();
        list.set_header(vec![
            ui::header_cell("Id"),
            ui::header_cell("Goal"),
            ui::header_cell("Owner"),
            ui::header_cell("Period"),
            ui::header_cell("Progress"),
            ui::header_cell("Done"),
        ]);
        for goal in &self.goals {
            list.add_row(vec![
                Cell::new(&goal.id).fg(Color::DarkGrey),
                Cell::new(&goal.kind),
                Cell::new(assignee_name(goal)),
                Cell::new(period_label(&period_key(goal.period, today))),
                Cell::new(format!("{}/{}", goal.current_value, goal.target_value)),
                ui::progress_cell(goal.completion()),
            ]);
        }

        format!(
            "{}\n\n{}\n\n{}\n\n{}\n\n{}",
            ui::style_text("Goals", ui::StyleType::Title),
            summary,
            ranking,
            ui::style_text("Goal list", ui::StyleType::Title),
            list
        )
    }
}

pub async fn run_board(
    store: &dyn Store,
    session: &Session,
    filter: GoalFilter,
    today: NaiveDate,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching goals...");
    let board = goals::load_board(store, session, filter).await;
    pb.finish_and_clear();

    println!("{}", board?.display_as_tables(today));
    Ok(())
}

#[derive(Debug, Clone, Subcommand)]
pub enum GoalAction {
    /// Create a goal
    Add {
        /// What is measured, e.g. "Reuniões Agendadas"
        kind: String,
        target: i64,
        /// Profile id of the owner; team-wide when omitted
        #[arg(long)]
        user: Option<String>,
        #[arg(long, default_value = "Mensal")]
        period: GoalPeriod,
    },
    /// Set a goal's current value
    Set {
        id: String,
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },
    /// Add one to a goal's current value
    Inc { id: String },
    /// Subtract one from a goal's current value
    Dec { id: String },
    /// Delete a goal
    Delete { id: String },
}

fn describe_goal(goal: &Goal) -> String {
    format!(
        "{} {} {}/{} ({}%)",
        goal.id,
        goal.kind,
        goal.current_value,
        goal.target_value,
        goal.completion()
    )
}

pub async fn run_goal(store: &dyn Store, session: &Session, action: GoalAction) -> Result<()> {
    let (id, update) = match action {
        GoalAction::Add {
            kind,
            target,
            user,
            period,
        } => {
            let new = NewGoal {
                user_id: user,
                kind,
                target_value: target,
                period,
            };
            let goal = goals::add_goal(store, session, new).await?;
            ui::print_success(&format!("Goal added: {}", describe_goal(&goal)));
            return Ok(());
        }
        GoalAction::Delete { id } => {
            goals::delete_goal(store, session, &id).await?;
            ui::print_success(&format!("Goal {id} deleted"));
            return Ok(());
        }
        GoalAction::Set { id, value } => (id, ProgressUpdate::Set(value)),
        GoalAction::Inc { id } => (id, ProgressUpdate::Increment),
        GoalAction::Dec { id } => (id, ProgressUpdate::Decrement),
    };

    let goal = goals::update_progress(store, &id, update).await?;
    ui::print_success(&format!("Goal updated: {}", describe_goal(&goal)));
    Ok(())
}
