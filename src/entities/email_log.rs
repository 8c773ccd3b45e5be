//! Email log entity - Append-only audit record of notification attempts.
//!
//! One row per dispatch attempt: customer, notification kind, timestamp,
//! outcome and the message subject. Rows are never mutated or deleted; the
//! credit-limit cooldown is derived from the most recent
//! `credit_limit_exceeded` row per customer.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of notification being logged
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum NotificationKind {
    /// Initial bill issuance email
    #[sea_orm(string_value = "bill_issued")]
    BillIssued,
    /// Overdue payment reminder
    #[sea_orm(string_value = "overdue_notice")]
    OverdueNotice,
    /// Outstanding balance exceeded the customer's credit limit
    #[sea_orm(string_value = "credit_limit_exceeded")]
    CreditLimitExceeded,
}

/// Email log database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "email_logs")]
pub struct Model {
    /// Unique identifier for the log entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the customer the notification was addressed to
    pub customer_id: i64,
    /// Kind of notification
    pub kind: NotificationKind,
    /// When the dispatch was attempted
    pub sent_at: DateTimeUtc,
    /// Outcome at dispatch time (`"queued"`, `"dropped"`, `"skipped: ..."`)
    pub outcome: String,
    /// Message subject or short description
    pub message: String,
}

/// Defines relationships between EmailLog and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each log entry belongs to one customer
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
