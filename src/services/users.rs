//! Team profiles and their roles.

use crate::core::error::{ServiceError, ServiceResult};
use crate::core::records::Profile;
use crate::core::roles::{Permission, Role};
use crate::core::session::Session;
use crate::core::store::{Query, Record, Store, fetch_records, insert_record, update_record};
use serde_json::{Value, json};
use tracing::info;

pub async fn list_profiles(store: &dyn Store) -> ServiceResult<Vec<Profile>> {
    let query = Query::new().order_by("name", true);
    Ok(fetch_records(store, &query).await?)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    /// Explicit id, e.g. the user id from the identity provider.
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub role: Role,
}

/// Adds a team member. Managers may always do this; anyone may while no
/// profile exists yet, so the first manager can be created.
pub async fn add_profile(
    store: &dyn Store,
    session: &Session,
    new: NewProfile,
) -> ServiceResult<Profile> {
    if !session.can(Permission::ManageSettings) {
        let existing = store
            .fetch(Profile::TABLE, &Query::new().limit(1))
            .await?;
        if !existing.is_empty() {
            return Err(ServiceError::PermissionDenied(Permission::ManageSettings));
        }
        info!("No profiles yet, creating the first one");
    }

    let name = new.name.trim();
    if name.is_empty() {
        return Err(ServiceError::Invalid("Name must not be empty".to_string()));
    }
    let profile = Profile {
        id: new.id.unwrap_or_default(),
        name: Some(name.to_string()),
        email: new.email,
        role: Some(new.role.as_str().to_string()),
        avatar_url: None,
        theme: None,
        created_at: None,
    };
    let stored = insert_record(store, &profile).await?;
    info!("Added {} {} ({})", new.role.label(), name, stored.id);
    Ok(stored)
}

/// Fields a user may change on their own profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileEdit {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Updates the signed-in user's own profile. Role changes go through
/// [`change_role`].
pub async fn update_own_profile(
    store: &dyn Store,
    session: &Session,
    edit: ProfileEdit,
) -> ServiceResult<Profile> {
    let Some(user_id) = session.user_id() else {
        return Err(ServiceError::Invalid("Sign in to edit your profile".to_string()));
    };

    let mut patch = serde_json::Map::new();
    if let Some(name) = edit.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::Invalid("Name must not be empty".to_string()));
        }
        patch.insert("name".to_string(), json!(name));
    }
    if let Some(email) = edit.email {
        patch.insert("email".to_string(), json!(email.trim()));
    }
    if let Some(avatar_url) = edit.avatar_url {
        patch.insert("avatar_url".to_string(), json!(avatar_url.trim()));
    }
    if patch.is_empty() {
        return Err(ServiceError::Invalid("Nothing to update".to_string()));
    }

    let updated: Profile = update_record(store, user_id, Value::Object(patch)).await?;
    info!("Updated profile of {}", updated.display_name());
    Ok(updated)
}

/// Removes another user's profile. Nobody can remove themselves.
pub async fn delete_profile(
    store: &dyn Store,
    session: &Session,
    user_id: &str,
) -> ServiceResult<()> {
    session.require(Permission::ManageSettings)?;
    if session.user_id() == Some(user_id) {
        return Err(ServiceError::Invalid(
            "You cannot remove your own user".to_string(),
        ));
    }
    store.delete(Profile::TABLE, user_id).await?;
    info!("Removed user {user_id}");
    Ok(())
}

/// Changes another user's role. Nobody can change their own.
pub async fn change_role(
    store: &dyn Store,
    session: &Session,
    user_id: &str,
    role: Role,
) -> ServiceResult<Profile> {
    session.require(Permission::ManageSettings)?;
    if session.user_id() == Some(user_id) {
        return Err(ServiceError::Invalid(
            "You cannot change your own role".to_string(),
        ));
    }
    let updated: Profile = update_record(store, user_id, json!({"role": role.as_str()})).await?;
    info!("{} is now {}", updated.display_name(), role.label());
    Ok(updated)
}
