//! Typed rows for every table the dashboard reads. Rows are validated here,
//! at the fetch boundary; null numeric fields decode as zero.

use crate::core::dates::{self, null_as_default};
use crate::core::period::GoalPeriod;
use crate::core::roles::Role;
use crate::core::store::{Record, Table};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Commission applied to retainers that never had one configured.
pub const DEFAULT_COMMISSION_PERCENT: f64 = 20.0;

/// Day of month a retainer payment falls due when the contract has no start date.
pub const DEFAULT_DUE_DAY: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryStatus {
    #[default]
    Analysis,
    Restitution,
    Paid,
}

impl FromStr for RecoveryStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "analysis" => Ok(RecoveryStatus::Analysis),
            "restitution" => Ok(RecoveryStatus::Restitution),
            "paid" => Ok(RecoveryStatus::Paid),
            _ => Err(anyhow::anyhow!("Invalid recovery status: {}", s)),
        }
    }
}

impl Display for RecoveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RecoveryStatus::Analysis => "analysis",
            RecoveryStatus::Restitution => "restitution",
            RecoveryStatus::Paid => "paid",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recovery {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub client_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_recovered: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub partner_percent: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub partner_amount: f64,
    #[serde(default)]
    pub my_company_percent: Option<f64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub my_company_amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub other_office_amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: RecoveryStatus,
    #[serde(default, with = "dates::optional_day")]
    pub payment_date: Option<NaiveDate>,
    #[serde(
        default,
        with = "dates::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Recovery {
    const TABLE: Table = Table::Recoveries;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Retainer {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub client_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub monthly_fee: f64,
    #[serde(default)]
    pub commission_percent: Option<f64>,
    /// Cached projection of `monthly_fee` x commission, rewritten on every edit.
    #[serde(default, deserialize_with = "null_as_default")]
    pub our_share: f64,
    #[serde(default, with = "dates::optional_day")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(
        default,
        with = "dates::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Retainer {
    pub fn commission(&self) -> f64 {
        self.commission_percent.unwrap_or(DEFAULT_COMMISSION_PERCENT)
    }

    pub fn due_day(&self) -> u32 {
        self.start_date.map_or(DEFAULT_DUE_DAY, |d| d.day())
    }
}

impl Record for Retainer {
    const TABLE: Table = Table::Retainers;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Overdue,
}

impl FromStr for PaymentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "overdue" => Ok(PaymentStatus::Overdue),
            _ => Err(anyhow::anyhow!("Invalid payment status: {}", s)),
        }
    }
}

impl PaymentStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "Pendente",
            PaymentStatus::Paid => "Pago",
            PaymentStatus::Overdue => "Atrasado",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetainerPayment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub retainer_id: Option<String>,
    #[serde(with = "dates::day")]
    pub due_date: NaiveDate,
    #[serde(default, with = "dates::optional_day")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: PaymentStatus,
    #[serde(
        default,
        with = "dates::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl RetainerPayment {
    /// Day the payment counts towards revenue: when it was paid, or when it
    /// fell due if no payment date was recorded.
    pub fn effective_date(&self) -> NaiveDate {
        self.payment_date.unwrap_or(self.due_date)
    }
}

impl Record for RetainerPayment {
    const TABLE: Table = Table::RetainerPayments;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ExpenseCategory {
    Operacional,
    Pessoal,
    Marketing,
    Impostos,
    #[default]
    Outros,
}

impl FromStr for ExpenseCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "operacional" => Ok(ExpenseCategory::Operacional),
            "pessoal" => Ok(ExpenseCategory::Pessoal),
            "marketing" => Ok(ExpenseCategory::Marketing),
            "impostos" => Ok(ExpenseCategory::Impostos),
            "outros" => Ok(ExpenseCategory::Outros),
            _ => Err(anyhow::anyhow!("Invalid expense category: {}", s)),
        }
    }
}

impl Display for ExpenseCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: ExpenseCategory,
    #[serde(with = "dates::day")]
    pub date: NaiveDate,
    #[serde(
        default,
        with = "dates::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Record for Expense {
    const TABLE: Table = Table::Expenses;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Profile details attached to a goal for display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Assignee {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// `None` marks a team-wide goal.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_value: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_value: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub period: GoalPeriod,
    #[serde(
        default,
        with = "dates::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Joined from `profiles`; never written back.
    #[serde(default, skip_serializing)]
    pub assignee: Option<Assignee>,
}

impl Goal {
    pub fn is_team_wide(&self) -> bool {
        self.user_id.is_none()
    }
}

impl Record for Goal {
    const TABLE: Table = Table::Goals;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(
        default,
        with = "dates::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// Unknown role strings grant nothing.
    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(|r| r.parse().ok())
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Sem Nome")
    }

    pub fn as_assignee(&self) -> Assignee {
        Assignee {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

impl Record for Profile {
    const TABLE: Table = Table::Profiles;

    fn id(&self) -> &str {
        &self.id
    }
}
