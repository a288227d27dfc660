use super::ui;
use crate::core::Session;
use crate::core::finance::FinancialSnapshot;
use crate::core::records::{
    ExpenseCategory, PaymentStatus, Recovery, RecoveryStatus, Retainer, RetainerPayment,
};
use crate::core::store::{Store, fetch_record};
use crate::services::finance::{
    self, NewExpense, NewRecovery, NewRetainer, PaymentEdit, RecoveryEdit, RetainerEdit,
};
use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use comfy_table::{Cell, Color};

fn recovery_status_label(status: RecoveryStatus) -> &'static str {
    match status {
        RecoveryStatus::Analysis => "Em Análise",
        RecoveryStatus::Restitution => "Em Restituição",
        RecoveryStatus::Paid => "Pago",
    }
}

fn payment_status_cell(payment: Option<&RetainerPayment>) -> Cell {
    match payment {
        Some(p) => {
            let color = match p.status {
                PaymentStatus::Paid => Color::Green,
                PaymentStatus::Pending => Color::Yellow,
                PaymentStatus::Overdue => Color::Red,
            };
            Cell::new(p.status.label()).fg(color)
        }
        None => Cell::new("Sem registro").fg(Color::DarkGrey),
    }
}

impl FinancialSnapshot {
    pub fn display_as_tables(&self, currency: &str) -> String {
        let m = &self.metrics;
        let mut kpis = ui::new_styled_table();
        kpis.set_header(vec![ui::header_cell("Indicator"), ui::header_cell("Value")]);
        kpis.add_row(vec![
            Cell::new("Total revenue"),
            ui::money_cell(m.total_revenue, currency),
        ]);
        kpis.add_row(vec![
            Cell::new("Total expenses"),
            ui::money_cell(m.total_expenses, currency),
        ]);
        kpis.add_row(vec![
            Cell::new("Net profit"),
            ui::money_cell(m.net_profit, currency),
        ]);
        kpis.add_row(vec![
            Cell::new("Pending revenue"),
            ui::money_cell(m.pending_revenue, currency),
        ]);
        kpis.add_row(vec![
            Cell::new("Recovered volume"),
            ui::money_cell(m.total_recovered_volume, currency),
        ]);
        kpis.add_row(vec![
            Cell::new("Recoveries in analysis"),
            Cell::new(m.pending_analysis_count),
        ]);

        let mut monthly = ui::new_styled_table();
        monthly.set_header(vec![
            ui::header_cell("Month"),
            ui::header_cell("Revenue"),
            ui::header_cell("Expenses"),
            ui::header_cell("Result"),
        ]);
        for point in &self.monthly {
            monthly.add_row(vec![
                Cell::new(format!("{} {}", point.label(), point.month.year)),
                ui::money_cell(point.revenue, currency),
                ui::money_cell(point.expense, currency),
                ui::money_cell(point.revenue - point.expense, currency),
            ]);
        }

        let mut recoveries = ui::new_styled_table();
        recoveries.set_header(vec![
            ui::header_cell("Client"),
            ui::header_cell("Status"),
            ui::header_cell("Recovered"),
            ui::header_cell("Our share"),
        ]);
        for recovery in &self.in_progress_recoveries {
            recoveries.add_row(vec![
                Cell::new(&recovery.client_name),
                Cell::new(recovery_status_label(recovery.status)),
                ui::money_cell(recovery.total_recovered, currency),
                ui::money_cell(recovery.my_company_amount, currency),
            ]);
        }

        let mut retainers = ui::new_styled_table();
        retainers.set_header(vec![
            ui::header_cell("Id"),
            ui::header_cell("Client"),
            ui::header_cell("Monthly fee"),
            ui::header_cell("Commission"),
            ui::header_cell("Our share"),
            ui::header_cell("This month"),
        ]);
        for retainer in &self.active_retainers {
            retainers.add_row(vec![
                Cell::new(&retainer.id).fg(Color::DarkGrey),
                Cell::new(&retainer.client_name),
                ui::money_cell(retainer.monthly_fee, currency),
                Cell::new(format!("{:.0}%", retainer.commission())),
                ui::money_cell(retainer.our_share, currency),
                payment_status_cell(self.current_payment(&retainer.id)),
            ]);
        }

        let mut expenses = ui::new_styled_table();
        expenses.set_header(vec![
            ui::header_cell("Date"),
            ui::header_cell("Description"),
            ui::header_cell("Category"),
            ui::header_cell("Amount"),
        ]);
        for expense in &self.recent_expenses {
            expenses.add_row(vec![
                Cell::new(expense.date.format("%d/%m/%Y")),
                Cell::new(&expense.description),
                Cell::new(expense.category),
                ui::money_cell(expense.amount, currency),
            ]);
        }

        let sections = [
            ("Financial overview", kpis),
            ("Last six months", monthly),
            ("Recoveries in progress", recoveries),
            ("Active retainers", retainers),
            ("Recent expenses", expenses),
        ];
        sections
            .iter()
            .map(|(title, table)| {
                format!("{}\n\n{}", ui::style_text(title, ui::StyleType::Title), table)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

pub fn display_payment_history(
    retainer: &Retainer,
    payments: &[RetainerPayment],
    currency: &str,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Id"),
        ui::header_cell("Due"),
        ui::header_cell("Paid on"),
        ui::header_cell("Amount"),
        ui::header_cell("Status"),
    ]);
    for payment in payments {
        table.add_row(vec![
            Cell::new(&payment.id).fg(Color::DarkGrey),
            Cell::new(payment.due_date.format("%d/%m/%Y")),
            ui::format_optional_cell(payment.payment_date, |d| d.format("%d/%m/%Y").to_string()),
            ui::money_cell(payment.amount, currency),
            payment_status_cell(Some(payment)),
        ]);
    }

    let total_paid: f64 = payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Paid)
        .map(|p| p.amount)
        .sum();
    format!(
        "Payments: {}\n\n{}\n\n{}: {}",
        ui::style_text(&retainer.client_name, ui::StyleType::Title),
        table,
        ui::style_text("Total paid", ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_money(total_paid, currency), ui::StyleType::TotalValue)
    )
}

fn describe_recovery(recovery: &Recovery, currency: &str) -> String {
    format!(
        "{} {} ({}, our share {})",
        recovery.id,
        recovery.client_name,
        recovery_status_label(recovery.status),
        ui::format_money(recovery.my_company_amount, currency)
    )
}

pub async fn run_dashboard(
    store: &dyn Store,
    session: &Session,
    today: NaiveDate,
    currency: &str,
) -> Result<()> {
    let pb = ui::new_spinner("Fetching financial data...");
    let snapshot = finance::load_dashboard(store, session, today).await;
    pb.finish_and_clear();

    println!("{}", snapshot?.display_as_tables(currency));
    Ok(())
}

#[derive(Debug, Clone, Subcommand)]
pub enum RecoveryAction {
    /// Register a tax recovery and compute its split
    Add {
        client_name: String,
        total_recovered: f64,
        /// Success fee over the recovered total (%)
        #[arg(long, default_value_t = crate::core::finance::DEFAULT_FEE_PERCENT)]
        fee: f64,
        /// Partner share of the fee (%)
        #[arg(long, default_value_t = crate::core::finance::DEFAULT_PARTNER_PERCENT)]
        partner: f64,
        /// Our share of what remains after the partner (%)
        #[arg(long, default_value_t = crate::core::finance::DEFAULT_MY_COMPANY_PERCENT)]
        mine: f64,
        #[arg(long, default_value = "analysis")]
        status: RecoveryStatus,
        #[arg(long)]
        payment_date: Option<NaiveDate>,
    },
    /// Change a recovery's client, status or payment date
    Edit {
        id: String,
        #[arg(long)]
        client_name: Option<String>,
        #[arg(long)]
        status: Option<RecoveryStatus>,
        #[arg(long)]
        payment_date: Option<NaiveDate>,
    },
    /// Delete a recovery
    Delete { id: String },
}

pub async fn run_recovery(
    store: &dyn Store,
    session: &Session,
    action: RecoveryAction,
    currency: &str,
) -> Result<()> {
    match action {
        RecoveryAction::Add {
            client_name,
            total_recovered,
            fee,
            partner,
            mine,
            status,
            payment_date,
        } => {
            let new = NewRecovery {
                client_name,
                total_recovered,
                fee_percent: fee,
                partner_percent: partner,
                my_company_percent: mine,
                status,
                payment_date,
            };
            let recovery = finance::add_recovery(store, session, new).await?;
            ui::print_success(&format!(
                "Recovery added: {}",
                describe_recovery(&recovery, currency)
            ));
        }
        RecoveryAction::Edit {
            id,
            client_name,
            status,
            payment_date,
        } => {
            let edit = RecoveryEdit {
                client_name,
                status,
                payment_date,
            };
            let recovery = finance::edit_recovery(store, session, &id, edit).await?;
            ui::print_success(&format!(
                "Recovery updated: {}",
                describe_recovery(&recovery, currency)
            ));
        }
        RecoveryAction::Delete { id } => {
            finance::delete_recovery(store, session, &id).await?;
            ui::print_success(&format!("Recovery {id} deleted"));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Subcommand)]
pub enum RetainerAction {
    /// Register a monthly retainer contract
    Add {
        client_name: String,
        monthly_fee: f64,
        /// Commission over the monthly fee (%), defaults to 20
        #[arg(long)]
        commission: Option<f64>,
        /// Contract start; its day of month is the billing day
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },
    /// Change a retainer's terms
    Edit {
        id: String,
        #[arg(long)]
        client_name: Option<String>,
        #[arg(long)]
        monthly_fee: Option<f64>,
        #[arg(long)]
        commission: Option<f64>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
    },
    /// Stop tracking a retainer without deleting its history
    Deactivate { id: String },
    /// Mark this month's payment as paid
    Pay { id: String },
    /// Set a payment back to pending
    Unpay { payment_id: String },
    /// Change a recorded payment
    EditPayment {
        payment_id: String,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        payment_date: Option<NaiveDate>,
        #[arg(long)]
        status: Option<PaymentStatus>,
    },
    /// Delete a recorded payment
    DeletePayment { payment_id: String },
    /// List every payment of a retainer
    History { id: String },
}

pub async fn run_retainer(
    store: &dyn Store,
    session: &Session,
    action: RetainerAction,
    today: NaiveDate,
    currency: &str,
) -> Result<()> {
    match action {
        RetainerAction::Add {
            client_name,
            monthly_fee,
            commission,
            start_date,
        } => {
            let new = NewRetainer {
                client_name,
                monthly_fee,
                commission_percent: commission,
                start_date,
            };
            let retainer = finance::add_retainer(store, session, new).await?;
            ui::print_success(&format!(
                "Retainer added: {} {} (our share {} / month)",
                retainer.id,
                retainer.client_name,
                ui::format_money(retainer.our_share, currency)
            ));
        }
        RetainerAction::Edit {
            id,
            client_name,
            monthly_fee,
            commission,
            start_date,
        } => {
            let edit = RetainerEdit {
                client_name,
                monthly_fee,
                commission_percent: commission,
                start_date,
            };
            let retainer = finance::edit_retainer(store, session, &id, edit).await?;
            ui::print_success(&format!(
                "Retainer updated: {} (our share {} / month)",
                retainer.client_name,
                ui::format_money(retainer.our_share, currency)
            ));
        }
        RetainerAction::Deactivate { id } => {
            let retainer = finance::deactivate_retainer(store, session, &id).await?;
            ui::print_success(&format!("Retainer {} deactivated", retainer.client_name));
        }
        RetainerAction::Pay { id } => {
            let payment = finance::mark_paid(store, session, &id, today).await?;
            ui::print_success(&format!(
                "Payment {} due {} marked as paid ({})",
                payment.id,
                payment.due_date.format("%d/%m/%Y"),
                ui::format_money(payment.amount, currency)
            ));
        }
        RetainerAction::Unpay { payment_id } => {
            let payment = finance::set_pending(store, session, &payment_id).await?;
            ui::print_success(&format!("Payment {} is pending again", payment.id));
        }
        RetainerAction::EditPayment {
            payment_id,
            amount,
            payment_date,
            status,
        } => {
            let edit = PaymentEdit {
                amount,
                payment_date,
                status,
            };
            let payment = finance::edit_payment(store, session, &payment_id, edit).await?;
            ui::print_success(&format!(
                "Payment {} updated ({}, {})",
                payment.id,
                payment.status.label(),
                ui::format_money(payment.amount, currency)
            ));
        }
        RetainerAction::DeletePayment { payment_id } => {
            finance::delete_payment(store, session, &payment_id).await?;
            ui::print_success(&format!("Payment {payment_id} deleted"));
        }
        RetainerAction::History { id } => {
            let pb = ui::new_spinner("Fetching payments...");
            let loaded = async {
                let payments = finance::retainer_history(store, session, &id).await?;
                let retainer: Retainer = fetch_record(store, &id).await?;
                anyhow::Ok((retainer, payments))
            }
            .await;
            pb.finish_and_clear();

            let (retainer, payments) = loaded?;
            println!("{}", display_payment_history(&retainer, &payments, currency));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Subcommand)]
pub enum ExpenseAction {
    /// Record an expense
    Add {
        description: String,
        amount: f64,
        /// Operacional, Pessoal, Marketing, Impostos or Outros
        #[arg(long)]
        category: Option<ExpenseCategory>,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Delete an expense
    Delete { id: String },
}

pub async fn run_expense(
    store: &dyn Store,
    session: &Session,
    action: ExpenseAction,
    today: NaiveDate,
    currency: &str,
) -> Result<()> {
    match action {
        ExpenseAction::Add {
            description,
            amount,
            category,
            date,
        } => {
            let new = NewExpense {
                description,
                amount,
                category,
                date,
            };
            let expense = finance::add_expense(store, session, new, today).await?;
            ui::print_success(&format!(
                "Expense added: {} {} ({}, {})",
                expense.id,
                expense.description,
                expense.category,
                ui::format_money(expense.amount, currency)
            ));
        }
        ExpenseAction::Delete { id } => {
            finance::delete_expense(store, session, &id).await?;
            ui::print_success(&format!("Expense {id} deleted"));
        }
    }
    Ok(())
}
