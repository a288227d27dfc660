//! The signed-in user, passed explicitly to every service call.

use crate::core::error::{ServiceError, StoreError};
use crate::core::records::Profile;
use crate::core::roles::{Permission, Role, has_permission};
use crate::core::store::{Store, fetch_record};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    profile: Option<Profile>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile: Some(profile),
        }
    }

    /// Loads the profile for `user_id`. A missing id gives an anonymous
    /// session; an id without a profile is an error.
    pub async fn resolve(store: &dyn Store, user_id: Option<&str>) -> Result<Self, StoreError> {
        let Some(user_id) = user_id else {
            debug!("No session user configured, continuing anonymously");
            return Ok(Self::anonymous());
        };
        let profile: Profile = fetch_record(store, user_id).await?;
        info!(
            "Signed in as {} ({})",
            profile.display_name(),
            profile.role.as_deref().unwrap_or("no role")
        );
        Ok(Self::for_profile(profile))
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.profile.as_ref().map(|p| p.id.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.profile.as_ref().and_then(Profile::role)
    }

    pub fn can(&self, permission: Permission) -> bool {
        has_permission(self.role(), permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), ServiceError> {
        if self.can(permission) {
            Ok(())
        } else {
            debug!("Session lacks permission: {permission}");
            Err(ServiceError::PermissionDenied(permission))
        }
    }
}
