//! Unified error types for `BillBook`.
//!
//! All fallible operations in the crate return [`Result`], which wraps the
//! single [`Error`] enum defined here. Batch engines (billing, reminders)
//! catch these per item and fold them into their summary results instead of
//! aborting the run.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration problem (missing file, bad TOML, absent setting).
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable description of what is misconfigured
        message: String,
    },

    /// Underlying database failure, including unique-constraint rejections.
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O error (config file reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable missing or malformed
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// No customer with the given id (or email, for lookups by email)
    #[error("Customer not found: {id}")]
    CustomerNotFound {
        /// Identifier used in the failed lookup
        id: String,
    },

    /// No ledger entry with the given id
    #[error("Ledger entry not found: {id}")]
    LedgerEntryNotFound {
        /// Primary key of the missing entry
        id: i64,
    },

    /// No monthly bill with the given id
    #[error("Bill not found: {id}")]
    BillNotFound {
        /// Primary key of the missing bill
        id: i64,
    },

    /// Amount failed validation (zero, negative where disallowed, or non-finite)
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: f64,
    },

    /// Billing period string did not parse as `YYYY-MM`
    #[error("Invalid billing period: {value}")]
    InvalidPeriod {
        /// The rejected input
        value: String,
    },

    /// Admin edit referenced a field outside the editable set for the entity
    #[error("Editing '{field}' is not allowed on {entity}")]
    FieldNotEditable {
        /// Entity the edit targeted ("customer", "ledger entry", "bill")
        entity: &'static str,
        /// The rejected field name
        field: String,
    },

    /// Admin edit value did not parse for the target field's type
    #[error("Invalid value '{value}' for field '{field}'")]
    InvalidFieldValue {
        /// Field the value was destined for
        field: String,
        /// The rejected raw value
        value: String,
    },

    /// Email construction or SMTP failure, caught at the dispatcher boundary
    #[error("Mail error: {message}")]
    Mail {
        /// Description from the mail transport
        message: String,
    },
}

/// Convenience `Result` type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
