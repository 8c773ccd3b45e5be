/// Runtime configuration loading from config.toml
pub mod app;

/// Database configuration and connection management
pub mod database;
