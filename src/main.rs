use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use taxdesk::cli::finance::{ExpenseAction, RecoveryAction, RetainerAction};
use taxdesk::cli::goals::GoalAction;
use taxdesk::cli::users::UserAction;
use taxdesk::core::goals::GoalFilter;
use taxdesk::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for taxdesk::AppCommand {
    fn from(cmd: Commands) -> taxdesk::AppCommand {
        match cmd {
            Commands::Finance => taxdesk::AppCommand::Finance,
            Commands::Goals { filter } => taxdesk::AppCommand::Goals { filter },
            Commands::Recovery { action } => taxdesk::AppCommand::Recovery(action),
            Commands::Retainer { action } => taxdesk::AppCommand::Retainer(action),
            Commands::Expense { action } => taxdesk::AppCommand::Expense(action),
            Commands::Goal { action } => taxdesk::AppCommand::Goal(action),
            Commands::User { action } => taxdesk::AppCommand::User(action),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Display the financial dashboard
    Finance,
    /// Display goals, statistics and the leaderboard
    Goals {
        /// all, mine or general
        #[arg(long, default_value = "all")]
        filter: GoalFilter,
    },
    /// Manage tax recoveries
    Recovery {
        #[command(subcommand)]
        action: RecoveryAction,
    },
    /// Manage retainers and their monthly payments
    Retainer {
        #[command(subcommand)]
        action: RetainerAction,
    },
    /// Manage expenses
    Expense {
        #[command(subcommand)]
        action: ExpenseAction,
    },
    /// Manage goals and their progress
    Goal {
        #[command(subcommand)]
        action: GoalAction,
    },
    /// Manage team profiles and roles
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => taxdesk::cli::setup::setup_at_path(path),
            None => taxdesk::cli::setup::setup(),
        },
        Some(cmd) => taxdesk::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
