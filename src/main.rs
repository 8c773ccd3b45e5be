use billbook::{
    config,
    core::settings,
    errors::Result,
    notify::{DisabledMailer, Mailer, Notifier, SmtpMailer, SmtpSettings},
    scheduler::Scheduler,
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file (as early as possible)
    dotenv().ok(); // Non-fatal, env vars can be set externally
    info!("Attempted to load .env file.");

    // 3. Load runtime configuration
    let app_config = config::app::load_default_config()?;
    info!(
        scan_interval_secs = app_config.scan_interval_secs,
        "Loaded application configuration"
    );

    // 4. Initialize database and schema
    let db = config::database::create_connection().await?;
    config::database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 5. Seed default business settings
    let seeded = settings::seed_defaults(&db).await?;
    if seeded > 0 {
        info!(seeded, "Seeded default settings");
    }

    // 6. Start the email dispatcher; without SMTP settings it runs disabled
    let mailer: Arc<dyn Mailer> = match SmtpSettings::load(&db).await? {
        Some(smtp) => {
            info!(host = %smtp.host, port = smtp.port, "SMTP transport configured");
            Arc::new(SmtpMailer::new(&smtp)?)
        }
        None => {
            warn!("SMTP settings absent; email delivery disabled");
            Arc::new(DisabledMailer)
        }
    };
    let notifier = Arc::new(Notifier::start(
        mailer,
        app_config.mail_queue_depth,
        app_config.mail_workers,
    ));

    // 7. Run the scheduler loop
    let scheduler = Scheduler::new(db, notifier, app_config.scan_interval_secs);
    scheduler.run().await;

    Ok(())
}
