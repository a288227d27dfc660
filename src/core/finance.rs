//! Financial aggregation over recoveries, retainers, retainer payments and
//! expenses already fetched from the store.
//!
//! Everything here is a pure calculation: the same inputs (and the same
//! `today`) always produce the same snapshot.
use crate::core::dates::Month;
use crate::core::records::{
    Expense, PaymentStatus, Recovery, RecoveryStatus, Retainer, RetainerPayment,
};
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

/// Number of months covered by the revenue-vs-expense series.
pub const SERIES_MONTHS: usize = 6;

/// Number of expenses listed on the dashboard.
pub const RECENT_EXPENSES_LIMIT: usize = 10;

pub const DEFAULT_FEE_PERCENT: f64 = 30.0;
pub const DEFAULT_PARTNER_PERCENT: f64 = 50.0;
pub const DEFAULT_MY_COMPANY_PERCENT: f64 = 40.0;

/// The consultancy's cut of `amount` at `commission_percent`.
///
/// Used both for the cached `our_share` on a retainer and for the revenue of
/// every paid retainer payment, so the two always agree.
pub fn commission_share(amount: f64, commission_percent: f64) -> f64 {
    amount * (commission_percent / 100.0)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinancialMetrics {
    pub total_revenue: f64,
    pub net_profit: f64,
    pub pending_analysis_count: usize,
    pub total_recovered_volume: f64,
    pub total_expenses: f64,
    pub pending_revenue: f64,
    pub realized_revenue: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPoint {
    pub month: Month,
    pub revenue: f64,
    pub expense: f64,
}

impl MonthlyPoint {
    pub fn label(&self) -> &'static str {
        self.month.abbreviation()
    }
}

/// Everything the financial dashboard renders.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FinancialSnapshot {
    pub metrics: FinancialMetrics,
    pub monthly: Vec<MonthlyPoint>,
    /// Restitution-stage recoveries followed by analysis-stage ones.
    pub in_progress_recoveries: Vec<Recovery>,
    pub active_retainers: Vec<Retainer>,
    pub recent_expenses: Vec<Expense>,
    /// Payments whose due date falls in the current month.
    pub current_month_payments: Vec<RetainerPayment>,
}

impl FinancialSnapshot {
    pub fn current_payment(&self, retainer_id: &str) -> Option<&RetainerPayment> {
        self.current_month_payments
            .iter()
            .find(|p| p.retainer_id.as_deref() == Some(retainer_id))
    }
}

/// Revenue attributable to a paid retainer payment. Payments pointing at a
/// retainer that no longer exists contribute nothing.
fn payment_revenue(payment: &RetainerPayment, retainers: &HashMap<&str, &Retainer>) -> f64 {
    payment
        .retainer_id
        .as_deref()
        .and_then(|id| retainers.get(id))
        .map_or(0.0, |retainer| {
            commission_share(payment.amount, retainer.commission())
        })
}

/// Computes dashboard metrics, the trailing monthly series ending at the
/// month of `today`, and the filtered lists shown alongside them.
///
/// `recoveries` and `expenses` are expected newest first; their order is kept
/// in the output lists.
pub fn aggregate(
    recoveries: &[Recovery],
    retainers: &[Retainer],
    payments: &[RetainerPayment],
    expenses: &[Expense],
    today: NaiveDate,
) -> FinancialSnapshot {
    let by_status = |status: RecoveryStatus| {
        recoveries
            .iter()
            .filter(move |r| r.status == status)
            .collect::<Vec<_>>()
    };
    let paid_recoveries = by_status(RecoveryStatus::Paid);
    let restitution_recoveries = by_status(RecoveryStatus::Restitution);
    let analysis_recoveries = by_status(RecoveryStatus::Analysis);

    let retainers_by_id: HashMap<&str, &Retainer> =
        retainers.iter().map(|r| (r.id.as_str(), r)).collect();
    let paid_payments: Vec<&RetainerPayment> = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Paid)
        .collect();

    let recovery_revenue: f64 = paid_recoveries.iter().map(|r| r.my_company_amount).sum();
    let retainer_revenue: f64 = paid_payments
        .iter()
        .map(|p| payment_revenue(p, &retainers_by_id))
        .sum();
    let realized_revenue = recovery_revenue + retainer_revenue;
    let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();

    let metrics = FinancialMetrics {
        total_revenue: realized_revenue,
        net_profit: realized_revenue - total_expenses,
        pending_analysis_count: analysis_recoveries.len(),
        total_recovered_volume: recoveries.iter().map(|r| r.total_recovered).sum(),
        total_expenses,
        pending_revenue: restitution_recoveries
            .iter()
            .map(|r| r.my_company_amount)
            .sum(),
        realized_revenue,
    };
    debug!(
        "Aggregated {} recoveries, {} paid payments, {} expenses: {:?}",
        recoveries.len(),
        paid_payments.len(),
        expenses.len(),
        metrics
    );

    let current_month = Month::of(today);
    let monthly = current_month
        .trailing(SERIES_MONTHS)
        .into_iter()
        .map(|month| {
            let recovery_revenue: f64 = paid_recoveries
                .iter()
                .filter(|r| r.created_at.is_some_and(|ts| month.contains(ts.date_naive())))
                .map(|r| r.my_company_amount)
                .sum();
            let retainer_revenue: f64 = paid_payments
                .iter()
                .filter(|p| month.contains(p.effective_date()))
                .map(|p| payment_revenue(p, &retainers_by_id))
                .sum();
            let expense: f64 = expenses
                .iter()
                .filter(|e| month.contains(e.date))
                .map(|e| e.amount)
                .sum();
            MonthlyPoint {
                month,
                revenue: recovery_revenue + retainer_revenue,
                expense,
            }
        })
        .collect();

    FinancialSnapshot {
        metrics,
        monthly,
        in_progress_recoveries: restitution_recoveries
            .into_iter()
            .chain(analysis_recoveries)
            .cloned()
            .collect(),
        active_retainers: retainers.iter().filter(|r| r.active).cloned().collect(),
        recent_expenses: expenses.iter().take(RECENT_EXPENSES_LIMIT).cloned().collect(),
        current_month_payments: payments
            .iter()
            .filter(|p| current_month.contains(p.due_date))
            .cloned()
            .collect(),
    }
}

/// How a recovered amount is split between the partner, this company and the
/// other office.
///
/// The success fee is a percentage of the recovered total. The partner takes
/// its percentage of the fee; this company takes its percentage of what
/// remains and the other office keeps the rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoverySplit {
    pub fee_amount: f64,
    pub partner_amount: f64,
    pub my_company_amount: f64,
    pub other_office_amount: f64,
}

impl RecoverySplit {
    pub fn compute(
        total_recovered: f64,
        fee_percent: f64,
        partner_percent: f64,
        my_company_percent: f64,
    ) -> Self {
        let fee_amount = total_recovered * (fee_percent / 100.0);
        let partner_amount = fee_amount * (partner_percent / 100.0);
        let remainder = fee_amount - partner_amount;
        Self {
            fee_amount,
            partner_amount,
            my_company_amount: remainder * (my_company_percent / 100.0),
            other_office_amount: remainder * ((100.0 - my_company_percent) / 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::records::ExpenseCategory;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn recovery(status: RecoveryStatus, total: f64, mine: f64, created: NaiveDate) -> Recovery {
        Recovery {
            id: format!("rec-{total}-{mine}"),
            client_name: "Cliente".to_string(),
            total_recovered: total,
            partner_percent: 50.0,
            partner_amount: 0.0,
            my_company_percent: Some(40.0),
            my_company_amount: mine,
            other_office_amount: 0.0,
            status,
            payment_date: None,
            created_at: Some(
                Utc.from_utc_datetime(&created.and_hms_opt(12, 0, 0).unwrap()),
            ),
        }
    }

    fn retainer(id: &str, commission: Option<f64>, active: bool) -> Retainer {
        Retainer {
            id: id.to_string(),
            client_name: format!("Client {id}"),
            monthly_fee: 1000.0,
            commission_percent: commission,
            our_share: 0.0,
            start_date: Some(date(2024, 1, 5)),
            active,
            created_at: None,
        }
    }

    fn payment(
        retainer_id: Option<&str>,
        amount: f64,
        status: PaymentStatus,
        due: NaiveDate,
        paid: Option<NaiveDate>,
    ) -> RetainerPayment {
        RetainerPayment {
            id: format!("pay-{amount}"),
            retainer_id: retainer_id.map(str::to_string),
            due_date: due,
            payment_date: paid,
            amount,
            status,
            created_at: None,
        }
    }

    fn expense(amount: f64, day: NaiveDate) -> Expense {
        Expense {
            id: format!("exp-{amount}"),
            description: "Despesa".to_string(),
            amount,
            category: ExpenseCategory::Operacional,
            date: day,
            created_at: None,
        }
    }

    #[test]
    fn test_paid_recovery_minus_expense() {
        let today = date(2025, 6, 15);
        let snapshot = aggregate(
            &[recovery(RecoveryStatus::Paid, 5000.0, 1000.0, today)],
            &[],
            &[],
            &[expense(200.0, today)],
            today,
        );
        assert_eq!(snapshot.metrics.realized_revenue, 1000.0);
        assert_eq!(snapshot.metrics.total_revenue, 1000.0);
        assert_eq!(snapshot.metrics.net_profit, 800.0);
        assert_eq!(snapshot.metrics.total_expenses, 200.0);
    }

    #[test]
    fn test_paid_retainer_payment_contributes_commission() {
        let today = date(2025, 6, 15);
        let snapshot = aggregate(
            &[],
            &[retainer("r1", Some(20.0), true)],
            &[payment(
                Some("r1"),
                500.0,
                PaymentStatus::Paid,
                date(2025, 6, 5),
                Some(date(2025, 6, 6)),
            )],
            &[],
            today,
        );
        assert_eq!(snapshot.metrics.realized_revenue, 100.0);
        assert_eq!(snapshot.monthly.last().unwrap().revenue, 100.0);
    }

    #[test]
    fn test_orphaned_and_unpaid_payments_contribute_nothing() {
        let today = date(2025, 6, 15);
        let snapshot = aggregate(
            &[],
            &[retainer("r1", Some(20.0), true)],
            &[
                payment(Some("gone"), 500.0, PaymentStatus::Paid, today, Some(today)),
                payment(None, 700.0, PaymentStatus::Paid, today, Some(today)),
                payment(Some("r1"), 900.0, PaymentStatus::Pending, today, None),
                payment(Some("r1"), 300.0, PaymentStatus::Overdue, today, None),
            ],
            &[],
            today,
        );
        assert_eq!(snapshot.metrics.realized_revenue, 0.0);
        assert!(snapshot.monthly.iter().all(|p| p.revenue == 0.0));
    }

    #[test]
    fn test_missing_commission_defaults_to_twenty_percent() {
        let today = date(2025, 6, 15);
        let snapshot = aggregate(
            &[],
            &[retainer("r1", None, true)],
            &[payment(Some("r1"), 1000.0, PaymentStatus::Paid, today, None)],
            &[],
            today,
        );
        assert_eq!(snapshot.metrics.realized_revenue, 200.0);
    }

    #[test]
    fn test_pending_revenue_and_volume_by_status() {
        let today = date(2025, 6, 15);
        let recoveries = vec![
            recovery(RecoveryStatus::Analysis, 10_000.0, 400.0, today),
            recovery(RecoveryStatus::Restitution, 20_000.0, 800.0, today),
            recovery(RecoveryStatus::Restitution, 5_000.0, 200.0, today),
            recovery(RecoveryStatus::Paid, 1_000.0, 40.0, today),
        ];
        let snapshot = aggregate(&recoveries, &[], &[], &[], today);

        assert_eq!(snapshot.metrics.pending_revenue, 1000.0);
        assert_eq!(snapshot.metrics.pending_analysis_count, 1);
        assert_eq!(snapshot.metrics.total_recovered_volume, 36_000.0);
        assert_eq!(snapshot.metrics.realized_revenue, 40.0);

        let statuses: Vec<RecoveryStatus> = snapshot
            .in_progress_recoveries
            .iter()
            .map(|r| r.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                RecoveryStatus::Restitution,
                RecoveryStatus::Restitution,
                RecoveryStatus::Analysis
            ]
        );
    }

    #[test]
    fn test_monthly_series_wraps_year_and_buckets_by_date() {
        let today = date(2025, 2, 10);
        let recoveries = vec![
            recovery(RecoveryStatus::Paid, 0.0, 300.0, date(2024, 12, 20)),
            recovery(RecoveryStatus::Paid, 0.0, 999.0, date(2024, 8, 31)),
            recovery(RecoveryStatus::Restitution, 0.0, 50.0, date(2025, 2, 1)),
        ];
        let retainers = vec![retainer("r1", Some(10.0), false)];
        let payments = vec![
            // Paid in January although due in December.
            payment(
                Some("r1"),
                1000.0,
                PaymentStatus::Paid,
                date(2024, 12, 5),
                Some(date(2025, 1, 3)),
            ),
            // No payment date: bucketed by due date.
            payment(Some("r1"), 2000.0, PaymentStatus::Paid, date(2024, 11, 5), None),
        ];
        let expenses = vec![
            expense(120.0, date(2025, 2, 3)),
            expense(80.0, date(2024, 9, 1)),
            expense(5.0, date(2024, 2, 1)),
        ];

        let snapshot = aggregate(&recoveries, &retainers, &payments, &expenses, today);

        let labels: Vec<&str> = snapshot.monthly.iter().map(|p| p.label()).collect();
        assert_eq!(labels, vec!["Set", "Out", "Nov", "Dez", "Jan", "Fev"]);
        let revenue: Vec<f64> = snapshot.monthly.iter().map(|p| p.revenue).collect();
        assert_eq!(revenue, vec![0.0, 0.0, 200.0, 300.0, 100.0, 0.0]);
        let expense: Vec<f64> = snapshot.monthly.iter().map(|p| p.expense).collect();
        assert_eq!(expense, vec![80.0, 0.0, 0.0, 0.0, 0.0, 120.0]);

        // Totals are not restricted to the series window.
        assert_eq!(snapshot.metrics.total_expenses, 205.0);
        assert_eq!(snapshot.metrics.realized_revenue, 1299.0 + 300.0);
    }

    #[test]
    fn test_lists_for_dashboard() {
        let today = date(2025, 6, 15);
        let retainers = vec![
            retainer("r1", Some(20.0), true),
            retainer("r2", Some(20.0), false),
        ];
        let payments = vec![
            payment(Some("r1"), 1000.0, PaymentStatus::Pending, date(2025, 6, 5), None),
            payment(Some("r1"), 1000.0, PaymentStatus::Paid, date(2025, 5, 5), None),
        ];
        let expenses: Vec<Expense> = (0..12).map(|i| expense(i as f64, today)).collect();

        let snapshot = aggregate(&[], &retainers, &payments, &expenses, today);

        assert_eq!(snapshot.active_retainers.len(), 1);
        assert_eq!(snapshot.active_retainers[0].id, "r1");
        assert_eq!(snapshot.recent_expenses.len(), RECENT_EXPENSES_LIMIT);
        assert_eq!(snapshot.recent_expenses[0].amount, 0.0);
        assert_eq!(snapshot.current_month_payments.len(), 1);
        assert_eq!(
            snapshot.current_payment("r1").map(|p| p.status),
            Some(PaymentStatus::Pending)
        );
        assert!(snapshot.current_payment("r2").is_none());
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let today = date(2025, 6, 15);
        let recoveries = vec![recovery(RecoveryStatus::Paid, 10.0, 3.0, today)];
        let retainers = vec![retainer("r1", Some(25.0), true)];
        let payments = vec![payment(Some("r1"), 400.0, PaymentStatus::Paid, today, None)];
        let expenses = vec![expense(1.5, today)];

        let first = aggregate(&recoveries, &retainers, &payments, &expenses, today);
        let second = aggregate(&recoveries, &retainers, &payments, &expenses, today);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_inputs() {
        let snapshot = aggregate(&[], &[], &[], &[], date(2025, 1, 1));
        assert_eq!(snapshot.metrics, FinancialMetrics::default());
        assert_eq!(snapshot.monthly.len(), SERIES_MONTHS);
    }

    #[test]
    fn test_recovery_split_defaults() {
        let split = RecoverySplit::compute(
            100_000.0,
            DEFAULT_FEE_PERCENT,
            DEFAULT_PARTNER_PERCENT,
            DEFAULT_MY_COMPANY_PERCENT,
        );
        assert_eq!(split.fee_amount, 30_000.0);
        assert_eq!(split.partner_amount, 15_000.0);
        assert_eq!(split.my_company_amount, 6_000.0);
        assert_eq!(split.other_office_amount, 9_000.0);
    }

    #[test]
    fn test_commission_share_matches_cached_projection() {
        assert_eq!(commission_share(1000.0, 20.0), 200.0);
        assert_eq!(commission_share(2500.0, 0.0), 0.0);
    }
}
