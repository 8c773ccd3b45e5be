//! Billing cycle engine - monthly roll-up of unpaid ledger entries.
//!
//! `generate_bills` walks every active customer and folds their unpaid
//! ledger entries for one period into a single monthly bill. The run is
//! idempotent: a customer already billed for the period is skipped, so the
//! scheduler can re-run it on every tick without creating duplicates. Each
//! customer is processed in its own transaction and its own error scope;
//! one failure never aborts the run.
//!
//! Bill numbers are `{prefix}{YYYYMM}{seq:04}` where the sequence counts
//! bills dated in the current calendar month across all customers.

use crate::{
    core::{
        customer, email_log,
        ledger::{self, PeriodTotals},
        period::BillingPeriod,
        settings,
    },
    entities::{
        BillStatus, LedgerStatus, MonthlyBill, NotificationKind, customer::Model as CustomerModel,
        ledger_entry, monthly_bill,
    },
    errors::{Error, Result},
    notify::{self, Notifier},
};
use chrono::{Duration, Utc};
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, PaginatorTrait, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use tracing::{error, info, instrument};

/// Paid/due amounts within this of zero are treated as settled.
const SETTLEMENT_EPSILON: f64 = 0.005;

/// What happened to one customer during a billing run.
#[derive(Debug, Clone, PartialEq)]
pub enum BillOutcome {
    /// A new bill was created
    Created(monthly_bill::Model),
    /// The customer already has a bill for this period
    AlreadyBilled,
    /// The period's entries net to zero or less, so no bill is owed
    NothingOwed,
}

/// One bill created during a billing run.
#[derive(Debug, Clone)]
pub struct BillCreated {
    /// Customer the bill belongs to
    pub customer_id: i64,
    /// Customer display name
    pub customer_name: String,
    /// Generated bill number
    pub bill_number: String,
    /// Bill total including tax
    pub total_amount: f64,
}

/// Summary of one billing run.
#[derive(Debug, Clone)]
pub struct BillingRunResult {
    /// Period the run covered
    pub period: BillingPeriod,
    /// Bills created this run
    pub bills_created: Vec<BillCreated>,
    /// Customers skipped because a bill already existed
    pub skipped_existing: usize,
    /// Customers skipped because they owed nothing for the period
    pub skipped_zero: usize,
    /// Customers whose bill failed, with the error message
    pub failures: Vec<(i64, String)>,
}

/// Fetches a bill by primary key.
pub async fn get_bill_by_id(
    db: &DatabaseConnection,
    bill_id: i64,
) -> Result<Option<monthly_bill::Model>> {
    MonthlyBill::find_by_id(bill_id).one(db).await.map_err(Into::into)
}

/// The customer's bill for a period, if one has been generated.
pub async fn find_bill_for_period<C>(
    db: &C,
    customer_id: i64,
    period: &BillingPeriod,
) -> Result<Option<monthly_bill::Model>>
where
    C: ConnectionTrait,
{
    MonthlyBill::find()
        .filter(monthly_bill::Column::CustomerId.eq(customer_id))
        .filter(monthly_bill::Column::BillMonth.eq(period.to_string()))
        .one(db)
        .await
        .map_err(Into::into)
}

/// All bills for a customer, newest first.
pub async fn bills_for_customer(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<Vec<monthly_bill::Model>> {
    use sea_orm::QueryOrder;
    MonthlyBill::find()
        .filter(monthly_bill::Column::CustomerId.eq(customer_id))
        .order_by_desc(monthly_bill::Column::BillDate)
        .order_by_desc(monthly_bill::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Sum of `due_amount` across a customer's unpaid bills. This is the
/// balance compared against the credit limit.
pub async fn outstanding_due(db: &DatabaseConnection, customer_id: i64) -> Result<f64> {
    let bills = MonthlyBill::find()
        .filter(monthly_bill::Column::CustomerId.eq(customer_id))
        .filter(monthly_bill::Column::Status.eq(BillStatus::Unpaid))
        .all(db)
        .await?;
    Ok(bills.iter().map(|b| b.due_amount).sum())
}

/// Allocates the next bill number. The `YYYYMM` segment comes from the
/// billed period; the sequence counts bills dated in the current calendar
/// month, so numbers stay gapless within a month of issuance.
async fn next_bill_number(txn: &DatabaseTransaction, period: &BillingPeriod) -> Result<String> {
    let issue_month = BillingPeriod::current();
    let issued_this_month = MonthlyBill::find()
        .filter(monthly_bill::Column::BillDate.between(issue_month.first_day(), issue_month.last_day()))
        .count(txn)
        .await?;

    let prefix = match settings::get(txn, settings::KEY_BILL_PREFIX).await? {
        Some(p) => p,
        None => "INV".to_string(),
    };
    Ok(format!(
        "{prefix}{}{:04}",
        period.number_segment(),
        issued_this_month + 1
    ))
}

/// Rolls one customer's unpaid entries for the period into a bill.
///
/// Runs inside a single transaction: the duplicate pre-check, the totals
/// query, and the insert either all happen or none do.
async fn bill_one_customer(
    db: &DatabaseConnection,
    cust: &CustomerModel,
    period: &BillingPeriod,
) -> Result<BillOutcome> {
    let txn = db.begin().await?;

    if find_bill_for_period(&txn, cust.id, period).await?.is_some() {
        txn.rollback().await?;
        return Ok(BillOutcome::AlreadyBilled);
    }

    let totals: PeriodTotals = ledger::unpaid_totals_for_period(&txn, cust.id, period).await?;
    if totals.entry_count == 0 || totals.total() <= 0.0 {
        txn.rollback().await?;
        return Ok(BillOutcome::NothingOwed);
    }

    let bill_number = next_bill_number(&txn, period).await?;
    let today = Utc::now().date_naive();
    let due_date = today + Duration::days(i64::from(cust.payment_days_limit));
    let total = totals.total();

    let bill = monthly_bill::ActiveModel {
        customer_id: Set(cust.id),
        bill_number: Set(bill_number),
        bill_month: Set(period.to_string()),
        subtotal: Set(totals.subtotal),
        tax_amount: Set(totals.tax),
        total_amount: Set(total),
        paid_amount: Set(0.0),
        due_amount: Set(total),
        bill_date: Set(today),
        due_date: Set(due_date),
        status: Set(BillStatus::Unpaid),
        sent_date: Set(today),
        last_reminder_date: Set(None),
        reminder_count: Set(0),
        ..Default::default()
    };

    let created = bill.insert(&txn).await?;
    txn.commit().await?;

    info!(
        customer_id = cust.id,
        bill_number = %created.bill_number,
        total = created.total_amount,
        "Created monthly bill"
    );
    Ok(BillOutcome::Created(created))
}

/// Generates monthly bills for every active customer and dispatches the
/// issuance emails. Idempotent per (customer, period).
#[instrument(skip(db, notifier), fields(period = %period))]
pub async fn generate_bills(
    db: &DatabaseConnection,
    notifier: &Notifier,
    period: &BillingPeriod,
) -> Result<BillingRunResult> {
    let customers = customer::list_active_customers(db).await?;
    let profile = settings::business_profile(db).await?;
    let symbol = settings::currency_symbol(db).await?;

    let mut result = BillingRunResult {
        period: *period,
        bills_created: Vec::new(),
        skipped_existing: 0,
        skipped_zero: 0,
        failures: Vec::new(),
    };

    for cust in customers {
        match bill_one_customer(db, &cust, period).await {
            Ok(BillOutcome::Created(bill)) => {
                let message = notify::bill_issued_message(
                    &profile.name,
                    &symbol,
                    &cust.email,
                    &cust.name,
                    &bill.bill_number,
                    &bill.bill_month,
                    bill.total_amount,
                    bill.due_date,
                );
                let subject = message.subject.clone();
                let outcome = notifier.dispatch(message);
                if let Err(e) = email_log::append(
                    db,
                    cust.id,
                    NotificationKind::BillIssued,
                    outcome.as_str(),
                    &subject,
                )
                .await
                {
                    // The bill stands; only the audit row is lost
                    error!(customer_id = cust.id, error = %e, "Failed to log bill notification");
                    result.failures.push((cust.id, e.to_string()));
                }

                result.bills_created.push(BillCreated {
                    customer_id: cust.id,
                    customer_name: cust.name.clone(),
                    bill_number: bill.bill_number.clone(),
                    total_amount: bill.total_amount,
                });
            }
            Ok(BillOutcome::AlreadyBilled) => result.skipped_existing += 1,
            Ok(BillOutcome::NothingOwed) => result.skipped_zero += 1,
            Err(e) => {
                error!(customer_id = cust.id, error = %e, "Billing failed for customer");
                result.failures.push((cust.id, e.to_string()));
            }
        }
    }

    info!(
        period = %period,
        created = result.bills_created.len(),
        skipped_existing = result.skipped_existing,
        skipped_zero = result.skipped_zero,
        failures = result.failures.len(),
        "Billing run finished"
    );
    Ok(result)
}

/// Records a payment against a bill, keeping `due_amount` equal to
/// `total_amount - paid_amount`. A bill whose due amount reaches zero flips
/// to `Paid` and the period's unpaid ledger entries settle with it.
pub async fn record_bill_payment(
    db: &DatabaseConnection,
    bill_id: i64,
    amount: f64,
) -> Result<monthly_bill::Model> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let bill = MonthlyBill::find_by_id(bill_id)
        .one(&txn)
        .await?
        .ok_or(Error::BillNotFound { id: bill_id })?;

    if amount > bill.due_amount + SETTLEMENT_EPSILON {
        txn.rollback().await?;
        return Err(Error::InvalidAmount { amount });
    }

    let paid = bill.paid_amount + amount;
    let mut due = bill.total_amount - paid;
    let settled = due.abs() <= SETTLEMENT_EPSILON;
    if settled {
        due = 0.0;
    }

    let customer_id = bill.customer_id;
    let bill_month = bill.bill_month.clone();

    let mut active_model: monthly_bill::ActiveModel = bill.into();
    active_model.paid_amount = Set(paid);
    active_model.due_amount = Set(due);
    if settled {
        active_model.status = Set(BillStatus::Paid);
    }
    let updated = active_model.update(&txn).await?;

    if settled {
        let period: BillingPeriod = bill_month.parse()?;
        crate::entities::LedgerEntry::update_many()
            .col_expr(ledger_entry::Column::Status, Expr::value(LedgerStatus::Paid))
            .filter(ledger_entry::Column::CustomerId.eq(customer_id))
            .filter(ledger_entry::Column::Status.eq(LedgerStatus::Unpaid))
            .filter(ledger_entry::Column::EntryDate.between(period.first_day(), period.last_day()))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    info!(
        bill_id,
        amount,
        due = updated.due_amount,
        settled,
        "Recorded bill payment"
    );
    Ok(updated)
}
