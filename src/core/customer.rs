//! Customer business logic - registration, lookup, and status management.
//!
//! Customers are never hard-deleted; deactivation flips `status` to
//! `Inactive`, which removes them from billing runs while preserving their
//! ledger history.

use crate::{
    entities::{Customer, CustomerStatus, customer},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Fields required to register a new customer.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    /// Display name
    pub name: String,
    /// Contact email, must be unique
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Postal address, if known
    pub address: Option<String>,
    /// Tax registration number, if any
    pub tax_id: Option<String>,
    /// Outstanding-balance ceiling before credit-limit reminders fire
    pub credit_limit: f64,
    /// Days after the bill date before a bill falls due
    pub payment_days_limit: i32,
}

/// Registers a new customer with status `Active` and today's date.
///
/// The unique index on `email` rejects duplicates at the store; that
/// surfaces as a `Database` error for this record only.
pub async fn register_customer(
    db: &DatabaseConnection,
    new: NewCustomer,
) -> Result<customer::Model> {
    if new.name.trim().is_empty() {
        return Err(Error::Config {
            message: "Customer name cannot be empty".to_string(),
        });
    }
    if new.email.trim().is_empty() || !new.email.contains('@') {
        return Err(Error::Config {
            message: format!("Invalid customer email: '{}'", new.email),
        });
    }
    if !new.credit_limit.is_finite() || new.credit_limit < 0.0 {
        return Err(Error::InvalidAmount {
            amount: new.credit_limit,
        });
    }
    if new.payment_days_limit < 0 {
        return Err(Error::Config {
            message: format!("payment_days_limit cannot be negative: {}", new.payment_days_limit),
        });
    }

    let model = customer::ActiveModel {
        name: Set(new.name.trim().to_string()),
        email: Set(new.email.trim().to_string()),
        phone: Set(new.phone),
        address: Set(new.address),
        tax_id: Set(new.tax_id),
        credit_limit: Set(new.credit_limit),
        payment_days_limit: Set(new.payment_days_limit),
        registered_on: Set(Utc::now().date_naive()),
        status: Set(CustomerStatus::Active),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

/// Fetches a customer by primary key.
pub async fn get_customer_by_id(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<Option<customer::Model>> {
    Customer::find_by_id(customer_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a customer by their unique email.
pub async fn find_customer_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<customer::Model>> {
    Customer::find()
        .filter(customer::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists all `Active` customers ordered by name.
pub async fn list_active_customers(db: &DatabaseConnection) -> Result<Vec<customer::Model>> {
    Customer::find()
        .filter(customer::Column::Status.eq(CustomerStatus::Active))
        .order_by_asc(customer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists every customer regardless of status, ordered by name.
pub async fn list_all_customers(db: &DatabaseConnection) -> Result<Vec<customer::Model>> {
    Customer::find()
        .order_by_asc(customer::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Toggles a customer between `Active` and `Inactive`, returning the
/// updated record. Customers are never deleted.
pub async fn toggle_customer_status(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<customer::Model> {
    let existing = get_customer_by_id(db, customer_id)
        .await?
        .ok_or_else(|| Error::CustomerNotFound {
            id: customer_id.to_string(),
        })?;

    let new_status = match existing.status {
        CustomerStatus::Active => CustomerStatus::Inactive,
        CustomerStatus::Inactive => CustomerStatus::Active,
    };

    let mut active_model: customer::ActiveModel = existing.into();
    active_model.status = Set(new_status);
    active_model.update(db).await.map_err(Into::into)
}
