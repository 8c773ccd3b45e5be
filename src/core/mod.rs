//! Core business logic - framework-agnostic billing, ledger, and reminder
//! operations. Everything here works against a `DatabaseConnection` (or a
//! transaction) and returns structured results that outer layers format.

/// Typed admin edits for customers, ledger entries, and bills
pub mod admin;
/// Billing cycle engine - monthly bill generation and payment recording
pub mod billing;
/// Customer registration, lookup, and status management
pub mod customer;
/// Append-only audit log of notification attempts
pub mod email_log;
/// Sale / payment / refund recording and period aggregates
pub mod ledger;
/// Billing period (year-month) value type
pub mod period;
/// Overdue and credit-limit reminder scans
pub mod reminders;
/// Business settings stored in the database, plus currency formatting
pub mod settings;
