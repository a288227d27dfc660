pub mod cli;
pub mod core;
pub mod services;
pub mod store;

use crate::cli::finance::{ExpenseAction, RecoveryAction, RetainerAction};
use crate::cli::goals::GoalAction;
use crate::cli::users::UserAction;
use crate::core::config::AppConfig;
use crate::core::goals::GoalFilter;
use crate::core::Session;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub enum AppCommand {
    Finance,
    Goals { filter: GoalFilter },
    Recovery(RecoveryAction),
    Retainer(RetainerAction),
    Expense(ExpenseAction),
    Goal(GoalAction),
    User(UserAction),
}

fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    match config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let today = Local::now().date_naive();
    run_command_on(command, config_path, today).await
}

/// Runs `command` as if the current date were `today`.
pub async fn run_command_on(
    command: AppCommand,
    config_path: Option<&str>,
    today: NaiveDate,
) -> Result<()> {
    info!("taxdesk starting...");
    let config = load_config(config_path)?;
    debug!("Loaded config: {config:#?}");

    let store = store::open_store(&config)?;
    let session = Session::resolve(store.as_ref(), config.session.user_id.as_deref())
        .await
        .context("Failed to resolve the configured session user")?;
    let store = store.as_ref();
    let currency = config.currency.as_str();

    match command {
        AppCommand::Finance => cli::finance::run_dashboard(store, &session, today, currency).await,
        AppCommand::Goals { filter } => cli::goals::run_board(store, &session, filter, today).await,
        AppCommand::Recovery(action) => {
            cli::finance::run_recovery(store, &session, action, currency).await
        }
        AppCommand::Retainer(action) => {
            cli::finance::run_retainer(store, &session, action, today, currency).await
        }
        AppCommand::Expense(action) => {
            cli::finance::run_expense(store, &session, action, today, currency).await
        }
        AppCommand::Goal(action) => cli::goals::run_goal(store, &session, action).await,
        AppCommand::User(action) => cli::users::run_user(store, &session, action).await,
    }
}
