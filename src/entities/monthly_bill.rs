//! Monthly bill entity - One bill per customer per billing period.
//!
//! Bills are created by the billing cycle engine from a customer's unpaid
//! ledger entries for a calendar month. The reminder scheduler mutates only
//! the reminder bookkeeping fields; payment recording mutates
//! `paid_amount` / `due_amount` / `status`. The invariant
//! `due_amount = total_amount - paid_amount` holds after every mutation.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Settlement status of a bill
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum BillStatus {
    /// Fully settled: `due_amount` reached zero
    #[sea_orm(string_value = "Paid")]
    Paid,
    /// Outstanding balance remains
    #[sea_orm(string_value = "Unpaid")]
    Unpaid,
}

/// Monthly bill database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monthly_bills")]
pub struct Model {
    /// Unique identifier for the bill
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the customer this bill belongs to
    pub customer_id: i64,
    /// User-visible bill number: `{prefix}{YYYYMM}{seq:04}`
    #[sea_orm(unique)]
    pub bill_number: String,
    /// Billing period in `YYYY-MM` form
    pub bill_month: String,
    /// Sum of signed base amounts over the period's unpaid entries
    pub subtotal: f64,
    /// Sum of tax over the period's unpaid entries
    pub tax_amount: f64,
    /// `subtotal + tax_amount`
    pub total_amount: f64,
    /// Amount paid so far against this bill
    pub paid_amount: f64,
    /// Remaining unpaid portion: `total_amount - paid_amount`
    pub due_amount: f64,
    /// Date the bill was generated
    pub bill_date: Date,
    /// `bill_date + customer.payment_days_limit` days
    pub due_date: Date,
    /// Settlement status
    pub status: BillStatus,
    /// Date the issuance notification was dispatched
    pub sent_date: Date,
    /// Date of the most recent overdue reminder, if any
    pub last_reminder_date: Option<Date>,
    /// Number of overdue reminders sent for this bill
    pub reminder_count: i32,
}

/// Defines relationships between MonthlyBill and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each bill belongs to one customer
    #[sea_orm(
        belongs_to = "super::customer::Entity",
        from = "Column::CustomerId",
        to = "super::customer::Column::Id"
    )]
    Customer,
}

impl Related<super::customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
