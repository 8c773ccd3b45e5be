//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod customer;
pub mod email_log;
pub mod ledger_entry;
pub mod monthly_bill;
pub mod setting;

// Re-export specific types to avoid conflicts
pub use customer::{
    Column as CustomerColumn, CustomerStatus, Entity as Customer, Model as CustomerModel,
};
pub use email_log::{
    Column as EmailLogColumn, Entity as EmailLog, Model as EmailLogModel, NotificationKind,
};
pub use ledger_entry::{
    Column as LedgerEntryColumn, Entity as LedgerEntry, LedgerKind, LedgerStatus,
    Model as LedgerEntryModel,
};
pub use monthly_bill::{
    BillStatus, Column as MonthlyBillColumn, Entity as MonthlyBill, Model as MonthlyBillModel,
};
pub use setting::{Column as SettingColumn, Entity as Setting, Model as SettingModel};
