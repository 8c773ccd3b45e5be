//! Customer entity - Represents a billed customer account.
//!
//! Each customer has contact details, a credit limit, a payment-terms window
//! (`payment_days_limit`) and a status. Customers are never hard-deleted;
//! `status` flips to `Inactive` instead.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account status. Inactive customers are excluded from billing runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum CustomerStatus {
    /// Customer is billed and receives reminders
    #[sea_orm(string_value = "Active")]
    Active,
    /// Customer is retained for history but excluded from billing
    #[sea_orm(string_value = "Inactive")]
    Inactive,
}

/// Customer database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    /// Unique identifier for the customer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Contact email, unique across all customers
    #[sea_orm(unique)]
    pub email: String,
    /// Contact phone number
    pub phone: String,
    /// Postal address, if known
    pub address: Option<String>,
    /// Tax registration number, if any
    pub tax_id: Option<String>,
    /// Ceiling on total outstanding unpaid balance before reminders fire
    pub credit_limit: f64,
    /// Days after the bill date before a bill falls due
    pub payment_days_limit: i32,
    /// Date the customer was registered
    pub registered_on: Date,
    /// Account status
    pub status: CustomerStatus,
}

/// Defines relationships between Customer and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One customer has many ledger entries
    #[sea_orm(has_many = "super::ledger_entry::Entity")]
    LedgerEntries,
    /// One customer has many monthly bills
    #[sea_orm(has_many = "super::monthly_bill::Entity")]
    MonthlyBills,
    /// One customer has many email log entries
    #[sea_orm(has_many = "super::email_log::Entity")]
    EmailLogs,
}

impl Related<super::ledger_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LedgerEntries.def()
    }
}

impl Related<super::monthly_bill::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonthlyBills.def()
    }
}

impl Related<super::email_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EmailLogs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
