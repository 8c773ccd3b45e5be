//! Shared test utilities for `BillBook`.
//!
//! This module provides common helper functions for setting up test
//! databases and creating test entities with sensible defaults.

#![allow(clippy::expect_used)]

use crate::{
    core::{customer, ledger},
    entities::{self, NotificationKind},
    errors::Result,
    notify::{Mailer, MockMailer, Notifier},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;

/// Creates an in-memory `SQLite` database with all tables initialized and
/// the default settings seeded. This is the standard setup for all
/// integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = setup_bare_db().await?;
    crate::core::settings::seed_defaults(&db).await?;
    Ok(db)
}

/// Creates an in-memory database with tables but no seeded settings, for
/// tests that exercise the defaults themselves.
pub async fn setup_bare_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Starts a notifier backed by a [`MockMailer`] so tests can assert on
/// dispatched email without a transport.
#[must_use]
pub fn test_notifier() -> (Notifier, Arc<MockMailer>) {
    let mailer = Arc::new(MockMailer::new());
    let notifier = Notifier::start(Arc::clone(&mailer) as Arc<dyn Mailer>, 64, 1);
    (notifier, mailer)
}

/// Shorthand for a calendar date in tests.
///
/// # Panics
/// Panics on an invalid calendar date.
#[must_use]
pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
}

/// Creates a test customer with sensible defaults.
///
/// # Arguments
/// * `db` - Database connection
/// * `name` - Customer name
/// * `email` - Customer email (must be unique per database)
///
/// # Defaults
/// * `credit_limit`: 1000.0
/// * `payment_days_limit`: 30
pub async fn create_test_customer(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
) -> Result<entities::customer::Model> {
    customer::register_customer(
        db,
        customer::NewCustomer {
            name: name.to_string(),
            email: email.to_string(),
            phone: "555-0100".to_string(),
            address: None,
            tax_id: None,
            credit_limit: 1000.0,
            payment_days_limit: 30,
        },
    )
    .await
}

/// Records a test sale with sensible defaults.
///
/// # Defaults
/// * `description`: `"Test sale"`
/// * `due_date`: None
/// * `payment_mode`: "credit"
pub async fn create_test_sale(
    db: &DatabaseConnection,
    customer_id: i64,
    amount: f64,
    entry_date: NaiveDate,
) -> Result<entities::ledger_entry::Model> {
    ledger::record_sale(
        db,
        customer_id,
        amount,
        "Test sale".to_string(),
        entry_date,
        None,
        "credit".to_string(),
        None,
    )
    .await
}

/// Inserts an unpaid bill directly, bypassing the billing engine, for
/// reminder and payment tests that need a bill with a chosen due date.
pub async fn insert_test_bill(
    db: &DatabaseConnection,
    customer_id: i64,
    bill_number: &str,
    total: f64,
    due_date: NaiveDate,
) -> Result<entities::monthly_bill::Model> {
    let bill_date = due_date - chrono::Duration::days(30);
    let bill = entities::monthly_bill::ActiveModel {
        customer_id: Set(customer_id),
        bill_number: Set(bill_number.to_string()),
        bill_month: Set(crate::core::period::BillingPeriod::from_date(bill_date).to_string()),
        subtotal: Set(total),
        tax_amount: Set(0.0),
        total_amount: Set(total),
        paid_amount: Set(0.0),
        due_amount: Set(total),
        bill_date: Set(bill_date),
        due_date: Set(due_date),
        status: Set(entities::BillStatus::Unpaid),
        sent_date: Set(bill_date),
        last_reminder_date: Set(None),
        reminder_count: Set(0),
        ..Default::default()
    };
    bill.insert(db).await.map_err(Into::into)
}

/// Overwrites a bill's `last_reminder_date` for cooldown tests.
///
/// # Panics
/// Panics if the bill does not exist.
pub async fn set_last_reminder(
    db: &DatabaseConnection,
    bill_id: i64,
    last_reminder_date: Option<NaiveDate>,
) -> Result<entities::monthly_bill::Model> {
    use sea_orm::EntityTrait;
    let bill = entities::MonthlyBill::find_by_id(bill_id)
        .one(db)
        .await?
        .expect("bill inserted by the test");
    let mut model: entities::monthly_bill::ActiveModel = bill.into();
    model.last_reminder_date = Set(last_reminder_date);
    model.update(db).await.map_err(Into::into)
}

/// Inserts an email log row with an explicit timestamp, for cooldown tests
/// that need back-dated history.
pub async fn insert_log_entry_at(
    db: &DatabaseConnection,
    customer_id: i64,
    kind: NotificationKind,
    sent_at: DateTime<Utc>,
    message: &str,
) -> Result<entities::email_log::Model> {
    let entry = entities::email_log::ActiveModel {
        customer_id: Set(customer_id),
        kind: Set(kind),
        sent_at: Set(sent_at),
        outcome: Set("queued".to_string()),
        message: Set(message.to_string()),
        ..Default::default()
    };
    entry.insert(db).await.map_err(Into::into)
}
