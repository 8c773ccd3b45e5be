//! Notification dispatcher - fire-and-forget email delivery.
//!
//! Callers hand an [`EmailMessage`] to the [`Notifier`], which queues it on
//! a bounded channel and returns immediately. A small pool of background
//! workers drains the queue and delivers through a [`Mailer`]. Delivery
//! failures are caught and logged at this boundary, never propagated; there
//! is no retry and no delivery confirmation back to the caller. A full
//! queue drops the message with a log line, which bounds resource usage
//! under bursty bill generation.

use crate::{
    core::settings,
    errors::{Error, Result},
};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use sea_orm::DatabaseConnection;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};

/// Bounded timeout on each SMTP conversation so a stuck send cannot wedge
/// a worker indefinitely.
const SMTP_TIMEOUT: Duration = Duration::from_secs(20);

/// An optional file attached to an outgoing email.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    /// File name shown to the recipient
    pub filename: String,
    /// MIME type, e.g. `"application/pdf"`
    pub content_type: String,
    /// Raw file bytes
    pub data: Vec<u8>,
}

/// One outgoing email.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
    /// Optional attachment
    pub attachment: Option<EmailAttachment>,
}

/// Result of handing a message to the dispatcher. `Dropped` means the
/// queue was full; the message will not be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Message accepted onto the queue
    Queued,
    /// Queue full, message discarded
    Dropped,
}

impl DispatchOutcome {
    /// Stable string form recorded in the email log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Dropped => "dropped",
        }
    }
}

/// Delivery backend behind the dispatcher.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message. Errors are caught by the dispatch worker.
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// SMTP credentials read from the settings table.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    /// SMTP relay host
    pub host: String,
    /// SMTP port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Login password
    pub password: String,
    /// From address, e.g. `"Billing <billing@example.com>"`
    pub from: String,
}

impl SmtpSettings {
    /// Loads SMTP settings from the settings table. Returns `None` when the
    /// required keys are absent - email delivery is then skipped, not fatal.
    pub async fn load(db: &DatabaseConnection) -> Result<Option<Self>> {
        let host = settings::get(db, settings::KEY_SMTP_HOST).await?;
        let user = settings::get(db, settings::KEY_SMTP_USER).await?;
        let password = settings::get(db, settings::KEY_SMTP_PASSWORD).await?;
        let from = settings::get(db, settings::KEY_SMTP_FROM).await?;

        let (Some(host), Some(user), Some(password), Some(from)) = (host, user, password, from)
        else {
            return Ok(None);
        };

        let port = match settings::get(db, settings::KEY_SMTP_PORT).await? {
            Some(raw) => raw.trim().parse().map_err(|_| Error::Config {
                message: format!("Setting 'smtp_port' is not a port number: {raw}"),
            })?,
            None => 587,
        };

        Ok(Some(Self {
            host,
            port,
            user,
            password,
            from,
        }))
    }
}

/// Production mailer delivering over SMTP with STARTTLS.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Builds the transport from SMTP settings.
    pub fn new(smtp: &SmtpSettings) -> Result<Self> {
        let from: Mailbox = smtp.from.parse().map_err(|e| Error::Config {
            message: format!("Invalid smtp_from address '{}': {e}", smtp.from),
        })?;

        let creds = Credentials::new(smtp.user.clone(), smtp.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
            .map_err(|e| Error::Config {
                message: format!("Failed to create SMTP relay for {}: {e}", smtp.host),
            })?
            .port(smtp.port)
            .credentials(creds)
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let to: Mailbox = message.to.parse().map_err(|e| Error::Mail {
            message: format!("Invalid recipient '{}': {e}", message.to),
        })?;

        let builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject.clone());

        let email = match &message.attachment {
            Some(attachment) => {
                let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                    Error::Mail {
                        message: format!(
                            "Invalid attachment content type '{}': {e}",
                            attachment.content_type
                        ),
                    }
                })?;
                builder
                    .multipart(
                        MultiPart::mixed()
                            .singlepart(
                                SinglePart::builder()
                                    .header(ContentType::TEXT_HTML)
                                    .body(message.html_body.clone()),
                            )
                            .singlepart(
                                Attachment::new(attachment.filename.clone())
                                    .body(attachment.data.clone(), content_type),
                            ),
                    )
                    .map_err(|e| Error::Mail {
                        message: format!("Failed to build message: {e}"),
                    })?
            }
            None => builder
                .header(ContentType::TEXT_HTML)
                .body(message.html_body.clone())
                .map_err(|e| Error::Mail {
                    message: format!("Failed to build message: {e}"),
                })?,
        };

        self.transport.send(email).await.map_err(|e| Error::Mail {
            message: format!("SMTP send failed: {e}"),
        })?;

        info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }
}

/// Stand-in mailer used when SMTP settings are absent. Logs and discards.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        warn!(
            to = %message.to,
            subject = %message.subject,
            "SMTP not configured; dropping email"
        );
        Ok(())
    }
}

/// Recording mailer for tests: counts sends and keeps the messages.
#[derive(Default)]
pub struct MockMailer {
    send_count: AtomicU64,
    sent: std::sync::Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl MockMailer {
    /// A mock that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock whose every send fails, for failure-isolation tests.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of sends attempted.
    #[must_use]
    pub fn send_count(&self) -> u64 {
        self.send_count.load(Ordering::SeqCst)
    }

    /// Clones of every message handed to this mailer.
    ///
    /// # Panics
    /// Panics if the internal lock is poisoned (test-only type).
    #[must_use]
    pub fn messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().expect("mock mailer lock poisoned").clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Mail {
                message: "mock failure".to_string(),
            });
        }
        self.sent
            .lock()
            .map_err(|_| Error::Mail {
                message: "mock mailer lock poisoned".to_string(),
            })?
            .push(message.clone());
        Ok(())
    }
}

/// Fire-and-forget email dispatcher: bounded queue plus worker pool.
pub struct Notifier {
    tx: mpsc::Sender<EmailMessage>,
    workers: Vec<JoinHandle<()>>,
}

impl Notifier {
    /// Starts the worker pool. `queue_depth` bounds how many messages may
    /// wait for delivery; `worker_count` is clamped to at least one.
    #[must_use]
    pub fn start(mailer: Arc<dyn Mailer>, queue_depth: usize, worker_count: usize) -> Self {
        let (tx, rx) = mpsc::channel::<EmailMessage>(queue_depth.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..worker_count.max(1))
            .map(|worker_id| {
                let rx = Arc::clone(&rx);
                let mailer = Arc::clone(&mailer);
                tokio::spawn(async move {
                    loop {
                        let next = { rx.lock().await.recv().await };
                        let Some(message) = next else { break };

                        if let Err(e) = mailer.send(&message).await {
                            // Best-effort delivery: log and move on
                            warn!(
                                worker_id,
                                to = %message.to,
                                subject = %message.subject,
                                error = %e,
                                "Email delivery failed"
                            );
                        }
                    }
                })
            })
            .collect();

        Self { tx, workers }
    }

    /// Queues a message without blocking. Returns `Dropped` when the queue
    /// is full; the caller records the outcome in the email log and moves on.
    pub fn dispatch(&self, message: EmailMessage) -> DispatchOutcome {
        match self.tx.try_send(message) {
            Ok(()) => DispatchOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!(to = %dropped.to, subject = %dropped.subject, "Mail queue full; dropping email");
                DispatchOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(dropped)) => {
                warn!(to = %dropped.to, subject = %dropped.subject, "Mail queue closed; dropping email");
                DispatchOutcome::Dropped
            }
        }
    }

    /// Closes the queue and waits for the workers to drain it.
    pub async fn close(self) {
        drop(self.tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "Mail worker panicked");
            }
        }
    }
}

/// Renders the bill-issuance email.
#[must_use]
pub fn bill_issued_message(
    business_name: &str,
    symbol: &str,
    to: &str,
    customer_name: &str,
    bill_number: &str,
    bill_month: &str,
    total_amount: f64,
    due_date: chrono::NaiveDate,
) -> EmailMessage {
    let total = settings::format_currency(symbol, total_amount);
    EmailMessage {
        to: to.to_string(),
        subject: format!("{business_name}: Bill {bill_number} for {bill_month}"),
        html_body: format!(
            "<p>Dear {customer_name},</p>\
             <p>Your bill <b>{bill_number}</b> for {bill_month} has been generated.</p>\
             <p>Amount due: <b>{total}</b><br>\
             Due date: <b>{due_date}</b></p>\
             <p>Regards,<br>{business_name}</p>"
        ),
        attachment: None,
    }
}

/// Renders the overdue-payment reminder email.
#[must_use]
pub fn overdue_notice_message(
    business_name: &str,
    symbol: &str,
    to: &str,
    customer_name: &str,
    bill_number: &str,
    due_amount: f64,
    days_overdue: i64,
) -> EmailMessage {
    let due = settings::format_currency(symbol, due_amount);
    EmailMessage {
        to: to.to_string(),
        subject: format!("{business_name}: Payment overdue for bill {bill_number}"),
        html_body: format!(
            "<p>Dear {customer_name},</p>\
             <p>Bill <b>{bill_number}</b> is <b>{days_overdue} day(s) overdue</b>.</p>\
             <p>Outstanding amount: <b>{due}</b></p>\
             <p>Please arrange payment at the earliest.</p>\
             <p>Regards,<br>{business_name}</p>"
        ),
        attachment: None,
    }
}

/// Renders the credit-limit-exceeded email.
#[must_use]
pub fn credit_limit_message(
    business_name: &str,
    symbol: &str,
    to: &str,
    customer_name: &str,
    total_due: f64,
    credit_limit: f64,
) -> EmailMessage {
    let due = settings::format_currency(symbol, total_due);
    let limit = settings::format_currency(symbol, credit_limit);
    EmailMessage {
        to: to.to_string(),
        subject: format!("{business_name}: Credit limit exceeded"),
        html_body: format!(
            "<p>Dear {customer_name},</p>\
             <p>Your outstanding balance of <b>{due}</b> has exceeded your \
             credit limit of <b>{limit}</b>.</p>\
             <p>Please clear pending bills to continue purchasing on credit.</p>\
             <p>Regards,<br>{business_name}</p>"
        ),
        attachment: None,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn test_message(subject: &str) -> EmailMessage {
        EmailMessage {
            to: "customer@example.com".to_string(),
            subject: subject.to_string(),
            html_body: "<p>hello</p>".to_string(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn test_dispatch_delivers_through_mailer() {
        let mailer = Arc::new(MockMailer::new());
        let notifier = Notifier::start(Arc::clone(&mailer) as Arc<dyn Mailer>, 16, 2);

        assert_eq!(notifier.dispatch(test_message("one")), DispatchOutcome::Queued);
        assert_eq!(notifier.dispatch(test_message("two")), DispatchOutcome::Queued);
        notifier.close().await;

        assert_eq!(mailer.send_count(), 2);
        let subjects: Vec<String> = mailer.messages().into_iter().map(|m| m.subject).collect();
        assert!(subjects.contains(&"one".to_string()));
        assert!(subjects.contains(&"two".to_string()));
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let mailer = Arc::new(MockMailer::failing());
        let notifier = Notifier::start(Arc::clone(&mailer) as Arc<dyn Mailer>, 16, 1);

        assert_eq!(notifier.dispatch(test_message("doomed")), DispatchOutcome::Queued);
        // close() would hang forever if the worker propagated the error and died
        notifier.close().await;

        assert_eq!(mailer.send_count(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops() {
        // A mailer that never completes, so the queue stays full
        struct StuckMailer;

        #[async_trait]
        impl Mailer for StuckMailer {
            async fn send(&self, _message: &EmailMessage) -> Result<()> {
                std::future::pending::<()>().await;
                Ok(())
            }
        }

        let notifier = Notifier::start(Arc::new(StuckMailer), 1, 1);

        // First message may be picked up by the worker; fill until the
        // channel itself reports full.
        let mut dropped = false;
        for i in 0..8 {
            if notifier.dispatch(test_message(&format!("m{i}"))) == DispatchOutcome::Dropped {
                dropped = true;
                break;
            }
        }
        assert!(dropped, "bounded queue never reported full");
    }

    async fn configure_smtp(db: &sea_orm::DatabaseConnection) -> Result<()> {
        settings::set(db, settings::KEY_SMTP_HOST, "smtp.example.com").await?;
        settings::set(db, settings::KEY_SMTP_USER, "billing").await?;
        settings::set(db, settings::KEY_SMTP_PASSWORD, "secret").await?;
        settings::set(db, settings::KEY_SMTP_FROM, "Billing <billing@example.com>").await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_smtp_settings_absent_yields_none() -> Result<()> {
        let db = crate::test_utils::setup_bare_db().await?;
        assert!(SmtpSettings::load(&db).await?.is_none());

        // A partial configuration still disables delivery
        settings::set(&db, settings::KEY_SMTP_HOST, "smtp.example.com").await?;
        assert!(SmtpSettings::load(&db).await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_smtp_settings_default_port() -> Result<()> {
        let db = crate::test_utils::setup_bare_db().await?;
        configure_smtp(&db).await?;

        let smtp = SmtpSettings::load(&db).await?.unwrap();
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.from, "Billing <billing@example.com>");

        settings::set(&db, settings::KEY_SMTP_PORT, "2525").await?;
        let smtp = SmtpSettings::load(&db).await?.unwrap();
        assert_eq!(smtp.port, 2525);

        Ok(())
    }

    #[tokio::test]
    async fn test_smtp_settings_bad_port_is_config_error() -> Result<()> {
        let db = crate::test_utils::setup_bare_db().await?;
        configure_smtp(&db).await?;
        settings::set(&db, settings::KEY_SMTP_PORT, "not-a-port").await?;

        let result = SmtpSettings::load(&db).await;
        assert!(matches!(result, Err(Error::Config { .. })));

        Ok(())
    }

    #[test]
    fn test_templates_mention_amounts() {
        let issued = bill_issued_message(
            "Acme Traders",
            "₹",
            "c@example.com",
            "Ravi",
            "INV2025080001",
            "2025-08",
            590.0,
            chrono::NaiveDate::from_ymd_opt(2025, 9, 7).unwrap(),
        );
        assert!(issued.subject.contains("INV2025080001"));
        assert!(issued.html_body.contains("₹590.00"));

        let overdue = overdue_notice_message(
            "Acme Traders",
            "₹",
            "c@example.com",
            "Ravi",
            "INV2025080001",
            390.0,
            12,
        );
        assert!(overdue.html_body.contains("12 day(s) overdue"));
        assert!(overdue.html_body.contains("₹390.00"));

        let credit = credit_limit_message("Acme Traders", "₹", "c@example.com", "Ravi", 1500.0, 1000.0);
        assert!(credit.html_body.contains("₹1,500.00"));
        assert!(credit.html_body.contains("₹1,000.00"));
    }
}
