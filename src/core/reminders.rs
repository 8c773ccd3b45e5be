//! Reminder scans - overdue bills and exceeded credit limits.
//!
//! Both scans are rate limited to one email per subject per week, but the
//! cooldowns are tracked differently. Overdue reminders are per bill and
//! persisted on the bill itself (`last_reminder_date`, `reminder_count`),
//! so the cadence survives restarts with the bill. Credit-limit reminders
//! are per customer and derived from the most recent
//! `credit_limit_exceeded` entry in the email log, since there is no
//! natural row to hang the date on. Each item is its own error scope.

use crate::{
    core::{billing, customer, email_log},
    entities::{
        BillStatus, MonthlyBill, NotificationKind, customer::Model as CustomerModel, monthly_bill,
    },
    errors::{Error, Result},
    notify::{self, Notifier},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use tracing::{error, info, instrument, warn};

/// Minimum days between two reminders for the same bill or customer.
pub const REMINDER_COOLDOWN_DAYS: i64 = 7;

/// Summary of one reminder scan pass.
#[derive(Debug, Clone, Default)]
pub struct ReminderScanResult {
    /// Overdue reminders dispatched
    pub overdue_sent: usize,
    /// Overdue bills skipped because a reminder went out within the week
    pub overdue_skipped_cooldown: usize,
    /// Credit-limit reminders dispatched
    pub credit_sent: usize,
    /// Over-limit customers skipped because of the weekly cooldown
    pub credit_skipped_cooldown: usize,
    /// Items that failed, with the error message
    pub failures: Vec<(i64, String)>,
}

impl ReminderScanResult {
    fn merge(mut self, other: Self) -> Self {
        self.overdue_sent += other.overdue_sent;
        self.overdue_skipped_cooldown += other.overdue_skipped_cooldown;
        self.credit_sent += other.credit_sent;
        self.credit_skipped_cooldown += other.credit_skipped_cooldown;
        self.failures.extend(other.failures);
        self
    }
}

fn within_cooldown(last: Option<NaiveDate>, today: NaiveDate) -> bool {
    last.is_some_and(|date| (today - date).num_days() < REMINDER_COOLDOWN_DAYS)
}

async fn remind_overdue_bill(
    db: &DatabaseConnection,
    notifier: &Notifier,
    business_name: &str,
    symbol: &str,
    bill: monthly_bill::Model,
    today: NaiveDate,
) -> Result<()> {
    let cust = customer::get_customer_by_id(db, bill.customer_id)
        .await?
        .ok_or_else(|| Error::CustomerNotFound {
            id: bill.customer_id.to_string(),
        })?;

    let days_overdue = (today - bill.due_date).num_days();
    let message = notify::overdue_notice_message(
        business_name,
        symbol,
        &cust.email,
        &cust.name,
        &bill.bill_number,
        bill.due_amount,
        days_overdue,
    );
    let subject = message.subject.clone();
    let outcome = notifier.dispatch(message);
    email_log::append(
        db,
        cust.id,
        NotificationKind::OverdueNotice,
        outcome.as_str(),
        &subject,
    )
    .await?;

    let reminder_count = bill.reminder_count + 1;
    let bill_id = bill.id;
    let mut active_model: monthly_bill::ActiveModel = bill.into();
    active_model.last_reminder_date = Set(Some(today));
    active_model.reminder_count = Set(reminder_count);
    active_model.update(db).await?;

    info!(
        bill_id,
        customer_id = cust.id,
        days_overdue,
        reminder_count,
        "Sent overdue reminder"
    );
    Ok(())
}

/// Walks every unpaid bill past its due date and sends an overdue reminder
/// to each, at most once per bill per week.
#[instrument(skip(db, notifier))]
pub async fn run_overdue_scan(
    db: &DatabaseConnection,
    notifier: &Notifier,
) -> Result<ReminderScanResult> {
    let today = Utc::now().date_naive();
    let profile = crate::core::settings::business_profile(db).await?;
    let symbol = crate::core::settings::currency_symbol(db).await?;

    let overdue = MonthlyBill::find()
        .filter(monthly_bill::Column::Status.eq(BillStatus::Unpaid))
        .filter(monthly_bill::Column::DueDate.lt(today))
        .all(db)
        .await?;

    let mut result = ReminderScanResult::default();
    for bill in overdue {
        if within_cooldown(bill.last_reminder_date, today) {
            result.overdue_skipped_cooldown += 1;
            continue;
        }

        let bill_id = bill.id;
        match remind_overdue_bill(db, notifier, &profile.name, &symbol, bill, today).await {
            Ok(()) => result.overdue_sent += 1,
            Err(e) => {
                error!(bill_id, error = %e, "Overdue reminder failed");
                result.failures.push((bill_id, e.to_string()));
            }
        }
    }

    info!(
        sent = result.overdue_sent,
        skipped = result.overdue_skipped_cooldown,
        failures = result.failures.len(),
        "Overdue scan finished"
    );
    Ok(result)
}

async fn remind_over_limit(
    db: &DatabaseConnection,
    notifier: &Notifier,
    business_name: &str,
    symbol: &str,
    cust: &CustomerModel,
    total_due: f64,
) -> Result<()> {
    let message = notify::credit_limit_message(
        business_name,
        symbol,
        &cust.email,
        &cust.name,
        total_due,
        cust.credit_limit,
    );
    let subject = message.subject.clone();
    let outcome = notifier.dispatch(message);
    email_log::append(
        db,
        cust.id,
        NotificationKind::CreditLimitExceeded,
        outcome.as_str(),
        &subject,
    )
    .await?;

    warn!(
        customer_id = cust.id,
        total_due,
        credit_limit = cust.credit_limit,
        "Sent credit-limit reminder"
    );
    Ok(())
}

enum CreditCheck {
    WithinLimit,
    Reminded,
    OnCooldown,
}

async fn check_one_credit_limit(
    db: &DatabaseConnection,
    notifier: &Notifier,
    business_name: &str,
    symbol: &str,
    cust: &CustomerModel,
) -> Result<CreditCheck> {
    let total_due = billing::outstanding_due(db, cust.id).await?;
    if total_due <= cust.credit_limit {
        return Ok(CreditCheck::WithinLimit);
    }

    let now = Utc::now();
    let last = email_log::latest_for(db, cust.id, NotificationKind::CreditLimitExceeded).await?;
    if last.is_some_and(|entry| (now - entry.sent_at).num_days() < REMINDER_COOLDOWN_DAYS) {
        return Ok(CreditCheck::OnCooldown);
    }

    remind_over_limit(db, notifier, business_name, symbol, cust, total_due).await?;
    Ok(CreditCheck::Reminded)
}

/// Checks every customer's outstanding balance against their credit limit
/// and reminds those over it, at most once per customer per week.
#[instrument(skip(db, notifier))]
pub async fn run_credit_limit_scan(
    db: &DatabaseConnection,
    notifier: &Notifier,
) -> Result<ReminderScanResult> {
    let profile = crate::core::settings::business_profile(db).await?;
    let symbol = crate::core::settings::currency_symbol(db).await?;
    let customers = customer::list_all_customers(db).await?;

    let mut result = ReminderScanResult::default();
    for cust in customers {
        match check_one_credit_limit(db, notifier, &profile.name, &symbol, &cust).await {
            Ok(CreditCheck::Reminded) => result.credit_sent += 1,
            Ok(CreditCheck::OnCooldown) => result.credit_skipped_cooldown += 1,
            Ok(CreditCheck::WithinLimit) => {}
            Err(e) => {
                error!(customer_id = cust.id, error = %e, "Credit-limit check failed");
                result.failures.push((cust.id, e.to_string()));
            }
        }
    }

    info!(
        sent = result.credit_sent,
        skipped = result.credit_skipped_cooldown,
        failures = result.failures.len(),
        "Credit-limit scan finished"
    );
    Ok(result)
}

/// Runs both reminder scans and merges their summaries.
pub async fn run_reminder_scans(
    db: &DatabaseConnection,
    notifier: &Notifier,
) -> Result<ReminderScanResult> {
    let overdue = run_overdue_scan(db, notifier).await?;
    let credit = run_credit_limit_scan(db, notifier).await?;
    Ok(overdue.merge(credit))
}
