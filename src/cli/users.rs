use super::ui;
use crate::core::Session;
use crate::core::records::Profile;
use crate::core::roles::Role;
use crate::core::store::Store;
use crate::services::users::{self, NewProfile, ProfileEdit};
use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color};

pub fn display_profiles(profiles: &[Profile], current_user: Option<&str>) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Name"),
        ui::header_cell("Email"),
        ui::header_cell("Role"),
    ]);
    for profile in profiles {
        let mut name = Cell::new(profile.display_name());
        if current_user == Some(profile.id.as_str()) {
            name = name.fg(Color::Green);
        }
        table.add_row(vec![
            Cell::new(&profile.id).fg(Color::DarkGrey),
            name,
            Cell::new(profile.email.as_deref().unwrap_or("")),
            Cell::new(profile.role().map_or("Sem papel", |r| r.label())),
        ]);
    }
    format!(
        "{}\n\n{}",
        ui::style_text("Team", ui::StyleType::Title),
        table
    )
}

#[derive(Debug, Clone, Subcommand)]
pub enum UserAction {
    /// List every profile
    List,
    /// Add a profile (the first one may be added without signing in)
    Add {
        name: String,
        /// manager, consultant or analyst
        #[arg(long)]
        role: Role,
        #[arg(long)]
        email: Option<String>,
        /// Use this id instead of a generated one
        #[arg(long)]
        id: Option<String>,
    },
    /// Change another user's role
    Role { user_id: String, role: Role },
    /// Edit your own name, email or avatar
    Edit {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Remove another user's profile
    Delete { user_id: String },
}

pub async fn run_user(store: &dyn Store, session: &Session, action: UserAction) -> Result<()> {
    match action {
        UserAction::List => {
            let pb = ui::new_spinner("Fetching profiles...");
            let profiles = users::list_profiles(store).await;
            pb.finish_and_clear();
            println!("{}", display_profiles(&profiles?, session.user_id()));
        }
        UserAction::Add {
            name,
            role,
            email,
            id,
        } => {
            let new = NewProfile {
                id,
                name,
                email,
                role,
            };
            let profile = users::add_profile(store, session, new).await?;
            ui::print_success(&format!(
                "Added {} {} with id {}",
                role.label(),
                profile.display_name(),
                profile.id
            ));
        }
        UserAction::Role { user_id, role } => {
            let profile = users::change_role(store, session, &user_id, role).await?;
            ui::print_success(&format!(
                "{} is now {}",
                profile.display_name(),
                role.label()
            ));
        }
        UserAction::Edit {
            name,
            email,
            avatar_url,
        } => {
            let edit = ProfileEdit {
                name,
                email,
                avatar_url,
            };
            let profile = users::update_own_profile(store, session, edit).await?;
            ui::print_success(&format!("Updated profile of {}", profile.display_name()));
        }
        UserAction::Delete { user_id } => {
            users::delete_profile(store, session, &user_id).await?;
            ui::print_success(&format!("Removed user {user_id}"));
        }
    }
    Ok(())
}
