//! Financial dashboard loading and the bookkeeping writes behind it.
//!
//! Every operation needs the `ViewFinancial` permission.

use crate::core::dates::{Month, format_day};
use crate::core::error::{ServiceError, ServiceResult};
use crate::core::finance::{FinancialSnapshot, RecoverySplit, aggregate, commission_share};
use crate::core::records::{
    Expense, ExpenseCategory, PaymentStatus, Recovery, RecoveryStatus, Retainer, RetainerPayment,
};
use crate::core::roles::Permission;
use crate::core::session::Session;
use crate::core::store::{
    Filter, Query, Record, Store, decode, encode, fetch_record, fetch_records, insert_record,
    update_record,
};
use chrono::NaiveDate;
use serde_json::{Map, Value, json};
use tracing::{debug, info};

fn require_finance(session: &Session) -> ServiceResult<()> {
    session.require(Permission::ViewFinancial)
}

fn validate_name(name: &str, what: &str) -> ServiceResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Invalid(format!("{what} must not be empty")));
    }
    Ok(name.to_string())
}

fn validate_amount(amount: f64, what: &str) -> ServiceResult<f64> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ServiceError::Invalid(format!(
            "{what} must be a non-negative number, got {amount}"
        )));
    }
    Ok(amount)
}

fn validate_percent(percent: f64, what: &str) -> ServiceResult<f64> {
    if !(0.0..=100.0).contains(&percent) {
        return Err(ServiceError::Invalid(format!(
            "{what} must be between 0 and 100, got {percent}"
        )));
    }
    Ok(percent)
}

/// Fetches the four financial tables concurrently and aggregates them.
///
/// A failure on any fetch aborts the whole load; no partial snapshot is
/// ever built.
pub async fn load_dashboard(
    store: &dyn Store,
    session: &Session,
    today: NaiveDate,
) -> ServiceResult<FinancialSnapshot> {
    require_finance(session)?;

    let recoveries_query = Query::new().order_by("created_at", false);
    let retainers_query = Query::new();
    let payments_query = Query::new();
    let expenses_query = Query::new().order_by("date", false);

    let (recoveries, retainers, payments, expenses) = futures::try_join!(
        fetch_records::<Recovery>(store, &recoveries_query),
        fetch_records::<Retainer>(store, &retainers_query),
        fetch_records::<RetainerPayment>(store, &payments_query),
        fetch_records::<Expense>(store, &expenses_query),
    )?;
    debug!(
        "Loaded {} recoveries, {} retainers, {} payments, {} expenses",
        recoveries.len(),
        retainers.len(),
        payments.len(),
        expenses.len()
    );

    Ok(aggregate(&recoveries, &retainers, &payments, &expenses, today))
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecovery {
    pub client_name: String,
    pub total_recovered: f64,
    pub fee_percent: f64,
    pub partner_percent: f64,
    pub my_company_percent: f64,
    pub status: RecoveryStatus,
    pub payment_date: Option<NaiveDate>,
}

impl NewRecovery {
    /// A recovery in analysis with the default split percentages.
    pub fn new(client_name: &str, total_recovered: f64) -> Self {
        Self {
            client_name: client_name.to_string(),
            total_recovered,
            fee_percent: crate::core::finance::DEFAULT_FEE_PERCENT,
            partner_percent: crate::core::finance::DEFAULT_PARTNER_PERCENT,
            my_company_percent: crate::core::finance::DEFAULT_MY_COMPANY_PERCENT,
            status: RecoveryStatus::Analysis,
            payment_date: None,
        }
    }
}

pub async fn add_recovery(
    store: &dyn Store,
    session: &Session,
    new: NewRecovery,
) -> ServiceResult<Recovery> {
    require_finance(session)?;
    let client_name = validate_name(&new.client_name, "Client name")?;
    let total = validate_amount(new.total_recovered, "Recovered amount")?;
    let split = RecoverySplit::compute(
        total,
        validate_percent(new.fee_percent, "Fee percent")?,
        validate_percent(new.partner_percent, "Partner percent")?,
        validate_percent(new.my_company_percent, "Company percent")?,
    );
    debug!("Computed recovery split: {:?}", split);

    let recovery = Recovery {
        id: String::new(),
        client_name,
        total_recovered: total,
        partner_percent: new.partner_percent,
        partner_amount: split.partner_amount,
        my_company_percent: Some(new.my_company_percent),
        my_company_amount: split.my_company_amount,
        other_office_amount: split.other_office_amount,
        status: new.status,
        payment_date: new.payment_date,
        created_at: None,
    };
    let stored = insert_record(store, &recovery).await?;
    info!("Added recovery {} for {}", stored.id, stored.client_name);
    Ok(stored)
}

/// Fields of a recovery that can change after creation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryEdit {
    pub client_name: Option<String>,
    pub status: Option<RecoveryStatus>,
    pub payment_date: Option<NaiveDate>,
}

pub async fn edit_recovery(
    store: &dyn Store,
    session: &Session,
    id: &str,
    edit: RecoveryEdit,
) -> ServiceResult<Recovery> {
    require_finance(session)?;
    let mut patch = Map::new();
    if let Some(name) = &edit.client_name {
        patch.insert("client_name".into(), json!(validate_name(name, "Client name")?));
    }
    if let Some(status) = edit.status {
        patch.insert("status".into(), json!(status));
    }
    if let Some(day) = edit.payment_date {
        patch.insert("payment_date".into(), json!(format_day(day)));
    }
    let updated: Recovery = update_record(store, id, Value::Object(patch)).await?;
    info!("Updated recovery {} ({})", updated.id, updated.status);
    Ok(updated)
}

pub async fn delete_recovery(store: &dyn Store, session: &Session, id: &str) -> ServiceResult<()> {
    require_finance(session)?;
    store.delete(Recovery::TABLE, id).await?;
    info!("Deleted recovery {}", id);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRetainer {
    pub client_name: String,
    pub monthly_fee: f64,
    /// `None` falls back to the default commission.
    pub commission_percent: Option<f64>,
    pub start_date: Option<NaiveDate>,
}

pub async fn add_retainer(
    store: &dyn Store,
    session: &Session,
    new: NewRetainer,
) -> ServiceResult<Retainer> {
    require_finance(session)?;
    if let Some(percent) = new.commission_percent {
        validate_percent(percent, "Commission percent")?;
    }
    let mut retainer = Retainer {
        id: String::new(),
        client_name: validate_name(&new.client_name, "Client name")?,
        monthly_fee: validate_amount(new.monthly_fee, "Monthly fee")?,
        commission_percent: new.commission_percent,
        our_share: 0.0,
        start_date: new.start_date,
        active: true,
        created_at: None,
    };
    retainer.our_share = commission_share(retainer.monthly_fee, retainer.commission());

    let stored = insert_record(store, &retainer).await?;
    info!(
        "Added retainer {} for {} ({} / month)",
        stored.id, stored.client_name, stored.monthly_fee
    );
    Ok(stored)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetainerEdit {
    pub client_name: Option<String>,
    pub monthly_fee: Option<f64>,
    pub commission_percent: Option<f64>,
    pub start_date: Option<NaiveDate>,
}

/// Applies `edit` and rewrites the cached `our_share` from the resulting fee
/// and commission.
pub async fn edit_retainer(
    store: &dyn Store,
    session: &Session,
    id: &str,
    edit: RetainerEdit,
) -> ServiceResult<Retainer> {
    require_finance(session)?;
    let mut retainer: Retainer = fetch_record(store, id).await?;

    if let Some(name) = &edit.client_name {
        retainer.client_name = validate_name(name, "Client name")?;
    }
    if let Some(fee) = edit.monthly_fee {
        retainer.monthly_fee = validate_amount(fee, "Monthly fee")?;
    }
    if let Some(percent) = edit.commission_percent {
        retainer.commission_percent = Some(validate_percent(percent, "Commission percent")?);
    }
    if edit.start_date.is_some() {
        retainer.start_date = edit.start_date;
    }
    retainer.our_share = commission_share(retainer.monthly_fee, retainer.commission());

    let patch = json!({
        "client_name": retainer.client_name,
        "monthly_fee": retainer.monthly_fee,
        "commission_percent": retainer.commission_percent,
        "our_share": retainer.our_share,
        "start_date": retainer.start_date.map(format_day),
    });
    let updated: Retainer = update_record(store, id, patch).await?;
    info!("Updated retainer {}", updated.id);
    Ok(updated)
}

/// Retainers are never deleted; they stop being active.
pub async fn deactivate_retainer(
    store: &dyn Store,
    session: &Session,
    id: &str,
) -> ServiceResult<Retainer> {
    require_finance(session)?;
    let updated: Retainer = update_record(store, id, json!({"active": false})).await?;
    info!("Deactivated retainer {} ({})", updated.id, updated.client_name);
    Ok(updated)
}

/// Every payment recorded for a retainer, newest due date first.
pub async fn retainer_history(
    store: &dyn Store,
    session: &Session,
    retainer_id: &str,
) -> ServiceResult<Vec<RetainerPayment>> {
    require_finance(session)?;
    let query = Query::new()
        .eq("retainer_id", retainer_id)
        .order_by("due_date", false);
    Ok(fetch_records(store, &query).await?)
}

/// Marks the retainer's payment for the month of `today` as paid.
///
/// Updates the payment already due this month if there is one, otherwise
/// records a new one due on the contract's billing day for the full monthly
/// fee. Calling it again within the month never adds a second payment.
pub async fn mark_paid(
    store: &dyn Store,
    session: &Session,
    retainer_id: &str,
    today: NaiveDate,
) -> ServiceResult<RetainerPayment> {
    require_finance(session)?;
    let retainer: Retainer = fetch_record(store, retainer_id).await?;

    let month = Month::of(today);
    let key = [
        Filter::eq("retainer_id", retainer_id),
        Filter::Gte("due_date".to_string(), json!(format_day(month.first_day()))),
        Filter::Lt("due_date".to_string(), json!(format_day(month.next().first_day()))),
    ];
    let patch = json!({
        "status": PaymentStatus::Paid,
        "payment_date": format_day(today),
    });
    let payment = RetainerPayment {
        id: String::new(),
        retainer_id: Some(retainer.id.clone()),
        due_date: month.day(retainer.due_day()),
        payment_date: Some(today),
        amount: retainer.monthly_fee,
        status: PaymentStatus::Paid,
        created_at: None,
    };

    let row = store
        .upsert(RetainerPayment::TABLE, &key, patch, encode(&payment)?)
        .await?;
    let stored: RetainerPayment = decode(row)?;
    info!(
        "Marked {} paid for {} (payment {})",
        retainer.client_name, month, stored.id
    );
    Ok(stored)
}

/// Reverts a payment to pending and clears its payment date.
pub async fn set_pending(
    store: &dyn Store,
    session: &Session,
    payment_id: &str,
) -> ServiceResult<RetainerPayment> {
    require_finance(session)?;
    let patch = json!({
        "status": PaymentStatus::Pending,
        "payment_date": Value::Null,
    });
    let updated: RetainerPayment = update_record(store, payment_id, patch).await?;
    info!("Payment {} set back to pending", updated.id);
    Ok(updated)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentEdit {
    pub amount: Option<f64>,
    pub payment_date: Option<NaiveDate>,
    pub status: Option<PaymentStatus>,
}

pub async fn edit_payment(
    store: &dyn Store,
    session: &Session,
    payment_id: &str,
    edit: PaymentEdit,
) -> ServiceResult<RetainerPayment> {
    require_finance(session)?;
    let mut patch = Map::new();
    if let Some(amount) = edit.amount {
        patch.insert("amount".into(), json!(validate_amount(amount, "Amount")?));
    }
    if let Some(day) = edit.payment_date {
        patch.insert("payment_date".into(), json!(format_day(day)));
    }
    if let Some(status) = edit.status {
        patch.insert("status".into(), json!(status));
    }
    let updated: RetainerPayment = update_record(store, payment_id, Value::Object(patch)).await?;
    info!("Updated payment {}", updated.id);
    Ok(updated)
}

pub async fn delete_payment(
    store: &dyn Store,
    session: &Session,
    payment_id: &str,
) -> ServiceResult<()> {
    require_finance(session)?;
    store.delete(RetainerPayment::TABLE, payment_id).await?;
    info!("Deleted payment {}", payment_id);
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub description: String,
    pub amount: f64,
    pub category: Option<ExpenseCategory>,
    pub date: Option<NaiveDate>,
}

/// Records an expense; the category defaults to `Outros` and the date to
/// `today`.
pub async fn add_expense(
    store: &dyn Store,
    session: &Session,
    new: NewExpense,
    today: NaiveDate,
) -> ServiceResult<Expense> {
    require_finance(session)?;
    let expense = Expense {
        id: String::new(),
        description: validate_name(&new.description, "Description")?,
        amount: validate_amount(new.amount, "Amount")?,
        category: new.category.unwrap_or_default(),
        date: new.date.unwrap_or(today),
        created_at: None,
    };
    let stored = insert_record(store, &expense).await?;
    info!(
        "Added expense {} ({}, {})",
        stored.id, stored.category, stored.amount
    );
    Ok(stored)
}

pub async fn delete_expense(store: &dyn Store, session: &Session, id: &str) -> ServiceResult<()> {
    require_finance(session)?;
    store.delete(Expense::TABLE, id).await?;
    info!("Deleted expense {}", id);
    Ok(())
}
