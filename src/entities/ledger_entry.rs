//! Ledger entry entity - Represents a single customer transaction.
//!
//! Each entry belongs to one customer and records a sale, payment, or
//! refund. `total_amount` is signed: sales carry `amount + tax_amount`,
//! refunds carry `-amount`. Entries are immutable outside explicit admin
//! edits.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of ledger entry. `customer_id` and `kind` are never editable
/// after creation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LedgerKind {
    /// Credit sale: `total_amount = amount + tax_amount`
    #[sea_orm(string_value = "Sale")]
    Sale,
    /// Payment received against the account
    #[sea_orm(string_value = "Payment")]
    Payment,
    /// Refund issued: `total_amount = -amount`, no tax
    #[sea_orm(string_value = "Refund")]
    Refund,
}

/// Settlement status of a ledger entry
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum LedgerStatus {
    /// Entry has been settled
    #[sea_orm(string_value = "Paid")]
    Paid,
    /// Entry is outstanding and eligible for the next monthly bill
    #[sea_orm(string_value = "Unpaid")]
    Unpaid,
}

/// Ledger entry database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the customer this entry belongs to
    pub customer_id: i64,
    /// Kind of entry (sale, payment, refund)
    pub kind: LedgerKind,
    /// Base amount before tax, always positive
    pub amount: f64,
    /// Tax computed from the `tax_rate` setting (zero for payments/refunds)
    pub tax_amount: f64,
    /// Signed total: `amount + tax_amount` for sales, `-amount` for refunds
    pub total_amount: f64,
    /// Free-text description
    pub description: String,
    /// Date the transaction occurred
    pub entry_date: Date,
    /// Due date, set only for credit sales
    pub due_date: Option<Date>,
    /// Settlement status
    pub status: LedgerStatus,
    /// Payment mode (e.g. "cash", "upi", "bank transfer")
    pub payment_mode: String,
    /// External reference number, if any
    pub reference_number: Option<String>,
}

/// Defines relationships between LedgerEntry and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one customer
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
