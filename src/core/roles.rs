//! User roles and the permissions they grant.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Consultant,
    Analyst,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Consultant => "consultant",
            Role::Analyst => "analyst",
        }
    }

    /// Display label used across the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Manager => "Gestor",
            Role::Consultant => "Consultor",
            Role::Analyst => "Analista",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "consultant" => Ok(Role::Consultant),
            "analyst" => Ok(Role::Analyst),
            _ => Err(anyhow::anyhow!("Invalid role: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewFinancial,
    EditGoals,
    ManageSettings,
}

impl Permission {
    pub fn granted_to(&self) -> &'static [Role] {
        match self {
            Permission::ViewFinancial
            | Permission::EditGoals
            | Permission::ManageSettings => &[Role::Manager],
        }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Permission::ViewFinancial => "view financial data",
            Permission::EditGoals => "edit goals",
            Permission::ManageSettings => "manage settings",
        };
        f.write_str(name)
    }
}

/// Users without a role hold no permissions.
pub fn has_permission(role: Option<Role>, permission: Permission) -> bool {
    role.is_some_and(|role| permission.granted_to().contains(&role))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Manager".parse::<Role>().unwrap(), Role::Manager);
        assert_eq!(" ANALYST ".parse::<Role>().unwrap(), Role::Analyst);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_only_managers_hold_permissions() {
        assert!(has_permission(Some(Role::Manager), Permission::ViewFinancial));
        assert!(has_permission(Some(Role::Manager), Permission::ManageSettings));
        assert!(!has_permission(Some(Role::Consultant), Permission::EditGoals));
        assert!(!has_permission(Some(Role::Analyst), Permission::ViewFinancial));
        assert!(!has_permission(None, Permission::ViewFinancial));
    }
}
