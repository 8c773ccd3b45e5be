//! Administrative record edits with per-entity field allow-lists.
//!
//! Operators can patch individual fields on customers, ledger entries, and
//! bills by name. Each entity exposes a closed set of editable fields;
//! anything else is rejected before the store is touched. Values arrive as
//! strings and are parsed for the target field's type. Editing a bill's
//! `total_amount` or `paid_amount` recomputes `due_amount` so the
//! settlement invariant survives manual corrections.

use crate::{
    core::period::BillingPeriod,
    entities::{
        BillStatus, Customer, CustomerStatus, LedgerEntry, LedgerStatus, MonthlyBill, customer,
        ledger_entry, monthly_bill,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, Set, prelude::*};
use std::str::FromStr;
use tracing::info;

/// Editable customer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerField {
    Name,
    Email,
    Phone,
    Address,
    TaxId,
    CreditLimit,
    PaymentDaysLimit,
    Status,
}

impl FromStr for CustomerField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "name" => Ok(Self::Name),
            "email" => Ok(Self::Email),
            "phone" => Ok(Self::Phone),
            "address" => Ok(Self::Address),
            "tax_id" => Ok(Self::TaxId),
            "credit_limit" => Ok(Self::CreditLimit),
            "payment_days_limit" => Ok(Self::PaymentDaysLimit),
            "status" => Ok(Self::Status),
            other => Err(Error::FieldNotEditable {
                entity: "customer",
                field: other.to_string(),
            }),
        }
    }
}

/// Editable ledger entry fields. The entry kind is deliberately absent:
/// changing a sale into a refund would invalidate its derived amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerField {
    Amount,
    TaxAmount,
    TotalAmount,
    Description,
    EntryDate,
    DueDate,
    Status,
    PaymentMode,
    ReferenceNumber,
}

impl FromStr for LedgerField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "amount" => Ok(Self::Amount),
            "tax_amount" => Ok(Self::TaxAmount),
            "total_amount" => Ok(Self::TotalAmount),
            "description" => Ok(Self::Description),
            "entry_date" => Ok(Self::EntryDate),
            "due_date" => Ok(Self::DueDate),
            "status" => Ok(Self::Status),
            "payment_mode" => Ok(Self::PaymentMode),
            "reference_number" => Ok(Self::ReferenceNumber),
            other => Err(Error::FieldNotEditable {
                entity: "ledger entry",
                field: other.to_string(),
            }),
        }
    }
}

/// Editable bill fields. `bill_number` is deliberately absent: numbers are
/// allocated once and referenced from sent emails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillField {
    BillMonth,
    Subtotal,
    TaxAmount,
    TotalAmount,
    PaidAmount,
    DueAmount,
    BillDate,
    DueDate,
    Status,
    SentDate,
    LastReminderDate,
    ReminderCount,
}

impl FromStr for BillField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bill_month" => Ok(Self::BillMonth),
            "subtotal" => Ok(Self::Subtotal),
            "tax_amount" => Ok(Self::TaxAmount),
            "total_amount" => Ok(Self::TotalAmount),
            "paid_amount" => Ok(Self::PaidAmount),
            "due_amount" => Ok(Self::DueAmount),
            "bill_date" => Ok(Self::BillDate),
            "due_date" => Ok(Self::DueDate),
            "status" => Ok(Self::Status),
            "sent_date" => Ok(Self::SentDate),
            "last_reminder_date" => Ok(Self::LastReminderDate),
            "reminder_count" => Ok(Self::ReminderCount),
            other => Err(Error::FieldNotEditable {
                entity: "bill",
                field: other.to_string(),
            }),
        }
    }
}

fn invalid(field: &str, value: &str) -> Error {
    Error::InvalidFieldValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn parse_f64(field: &str, value: &str) -> Result<f64> {
    let parsed: f64 = value.trim().parse().map_err(|_| invalid(field, value))?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(invalid(field, value))
    }
}

fn parse_i32(field: &str, value: &str) -> Result<i32> {
    value.trim().parse().map_err(|_| invalid(field, value))
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid(field, value))
}

/// An empty string clears an optional date.
fn parse_opt_date(field: &str, value: &str) -> Result<Option<NaiveDate>> {
    if value.trim().is_empty() {
        Ok(None)
    } else {
        parse_date(field, value).map(Some)
    }
}

fn parse_customer_status(value: &str) -> Result<CustomerStatus> {
    match value.trim() {
        "Active" | "active" => Ok(CustomerStatus::Active),
        "Inactive" | "inactive" => Ok(CustomerStatus::Inactive),
        other => Err(invalid("status", other)),
    }
}

fn parse_settlement_status(value: &str) -> Result<bool> {
    match value.trim() {
        "Paid" | "paid" => Ok(true),
        "Unpaid" | "unpaid" => Ok(false),
        other => Err(invalid("status", other)),
    }
}

/// Patches one field on a customer record.
pub async fn edit_customer(
    db: &DatabaseConnection,
    customer_id: i64,
    field: &str,
    value: &str,
) -> Result<customer::Model> {
    let target: CustomerField = field.parse()?;

    let existing = Customer::find_by_id(customer_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::CustomerNotFound {
            id: customer_id.to_string(),
        })?;

    let mut model: customer::ActiveModel = existing.into();
    match target {
        CustomerField::Name => {
            if value.trim().is_empty() {
                return Err(invalid(field, value));
            }
            model.name = Set(value.trim().to_string());
        }
        CustomerField::Email => {
            if !value.contains('@') {
                return Err(invalid(field, value));
            }
            model.email = Set(value.trim().to_string());
        }
        CustomerField::Phone => model.phone = Set(value.trim().to_string()),
        CustomerField::Address => {
            let trimmed = value.trim();
            model.address = Set((!trimmed.is_empty()).then(|| trimmed.to_string()));
        }
        CustomerField::TaxId => {
            let trimmed = value.trim();
            model.tax_id = Set((!trimmed.is_empty()).then(|| trimmed.to_string()));
        }
        CustomerField::CreditLimit => {
            let limit = parse_f64(field, value)?;
            if limit < 0.0 {
                return Err(invalid(field, value));
            }
            model.credit_limit = Set(limit);
        }
        CustomerField::PaymentDaysLimit => {
            let days = parse_i32(field, value)?;
            if days < 0 {
                return Err(invalid(field, value));
            }
            model.payment_days_limit = Set(days);
        }
        CustomerField::Status => model.status = Set(parse_customer_status(value)?),
    }

    let updated = model.update(db).await?;
    info!(customer_id, field, "Edited customer record");
    Ok(updated)
}

/// Patches one field on a ledger entry.
pub async fn edit_ledger_entry(
    db: &DatabaseConnection,
    entry_id: i64,
    field: &str,
    value: &str,
) -> Result<ledger_entry::Model> {
    let target: LedgerField = field.parse()?;

    let existing = LedgerEntry::find_by_id(entry_id)
        .one(db)
        .await?
        .ok_or(Error::LedgerEntryNotFound { id: entry_id })?;

    let mut model: ledger_entry::ActiveModel = existing.into();
    match target {
        LedgerField::Amount => model.amount = Set(parse_f64(field, value)?),
        LedgerField::TaxAmount => model.tax_amount = Set(parse_f64(field, value)?),
        LedgerField::TotalAmount => model.total_amount = Set(parse_f64(field, value)?),
        LedgerField::Description => model.description = Set(value.to_string()),
        LedgerField::EntryDate => model.entry_date = Set(parse_date(field, value)?),
        LedgerField::DueDate => model.due_date = Set(parse_opt_date(field, value)?),
        LedgerField::Status => {
            let status = if parse_settlement_status(value)? {
                LedgerStatus::Paid
            } else {
                LedgerStatus::Unpaid
            };
            model.status = Set(status);
        }
        LedgerField::PaymentMode => model.payment_mode = Set(value.trim().to_string()),
        LedgerField::ReferenceNumber => {
            let trimmed = value.trim();
            model.reference_number = Set((!trimmed.is_empty()).then(|| trimmed.to_string()));
        }
    }

    let updated = model.update(db).await?;
    info!(entry_id, field, "Edited ledger entry");
    Ok(updated)
}

/// Patches one field on a monthly bill. Edits to `total_amount` and
/// `paid_amount` recompute `due_amount`; `due_amount` itself stays directly
/// editable for corrections that bypass the invariant on purpose.
pub async fn edit_bill(
    db: &DatabaseConnection,
    bill_id: i64,
    field: &str,
    value: &str,
) -> Result<monthly_bill::Model> {
    let target: BillField = field.parse()?;

    let existing = MonthlyBill::find_by_id(bill_id)
        .one(db)
        .await?
        .ok_or(Error::BillNotFound { id: bill_id })?;
    let (current_total, current_paid) = (existing.total_amount, existing.paid_amount);

    let mut model: monthly_bill::ActiveModel = existing.into();
    match target {
        BillField::BillMonth => {
            let period: BillingPeriod = value.trim().parse().map_err(|_| invalid(field, value))?;
            model.bill_month = Set(period.to_string());
        }
        BillField::Subtotal => model.subtotal = Set(parse_f64(field, value)?),
        BillField::TaxAmount => model.tax_amount = Set(parse_f64(field, value)?),
        BillField::TotalAmount => {
            let total = parse_f64(field, value)?;
            model.total_amount = Set(total);
            model.due_amount = Set(total - current_paid);
        }
        BillField::PaidAmount => {
            let paid = parse_f64(field, value)?;
            model.paid_amount = Set(paid);
            model.due_amount = Set(current_total - paid);
        }
        BillField::DueAmount => model.due_amount = Set(parse_f64(field, value)?),
        BillField::BillDate => model.bill_date = Set(parse_date(field, value)?),
        BillField::DueDate => model.due_date = Set(parse_date(field, value)?),
        BillField::Status => {
            let status = if parse_settlement_status(value)? {
                BillStatus::Paid
            } else {
                BillStatus::Unpaid
            };
            model.status = Set(status);
        }
        BillField::SentDate => model.sent_date = Set(parse_date(field, value)?),
        BillField::LastReminderDate => {
            model.last_reminder_date = Set(parse_opt_date(field, value)?);
        }
        BillField::ReminderCount => {
            let count = parse_i32(field, value)?;
            if count < 0 {
                return Err(invalid(field, value));
            }
            model.reminder_count = Set(count);
        }
    }

    let updated = model.update(db).await?;
    info!(bill_id, field, "Edited bill record");
    Ok(updated)
}
