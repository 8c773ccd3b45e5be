//! Database configuration module for `BillBook`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! It provides functions for establishing database connections and creating all necessary
//! tables based on the entity definitions. The module uses `SeaORM`'s
//! `Schema::create_table_from_entity` method to automatically generate SQL statements
//! from the entity models, ensuring that the database schema matches the Rust struct
//! definitions without requiring manual SQL.

use crate::entities::{Customer, EmailLog, LedgerEntry, MonthlyBill, Setting};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/billbook.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL`
/// environment variable, falling back to a default local `SQLite` file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation
/// from entity definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let customer_table = schema.create_table_from_entity(Customer);
    let ledger_table = schema.create_table_from_entity(LedgerEntry);
    let bill_table = schema.create_table_from_entity(MonthlyBill);
    let setting_table = schema.create_table_from_entity(Setting);
    let email_log_table = schema.create_table_from_entity(EmailLog);

    db.execute(builder.build(&customer_table)).await?;
    db.execute(builder.build(&ledger_table)).await?;
    db.execute(builder.build(&bill_table)).await?;
    db.execute(builder.build(&setting_table)).await?;
    db.execute(builder.build(&email_log_table)).await?;

    Ok(())
}
