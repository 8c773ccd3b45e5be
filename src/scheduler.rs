//! Background scheduler driving the billing and reminder batch jobs.
//!
//! One task ticks at a fixed interval and runs a cycle: generate bills for
//! the current period, then run both reminder scans. Every job in a cycle
//! is its own error scope; a failed billing run still lets the reminder
//! scans go out, and no error ever stops the loop. A [`CooldownMap`] paces
//! each job class so manual triggers and scheduled ticks cannot stack runs
//! back to back.

use crate::{
    core::{
        billing::{self, BillingRunResult},
        period::BillingPeriod,
        reminders::{self, ReminderScanResult},
    },
    errors::Result,
    gate::CooldownMap,
    notify::Notifier,
};
use chrono::TimeDelta;
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

const GATE_BILLING: &str = "billing";
const GATE_REMINDERS: &str = "reminders";

/// Periodic runner for the billing cycle engine and reminder scans.
pub struct Scheduler {
    db: DatabaseConnection,
    notifier: Arc<Notifier>,
    gate: CooldownMap,
    scan_interval: Duration,
}

impl Scheduler {
    /// Creates a scheduler ticking every `scan_interval_secs` seconds.
    #[must_use]
    pub fn new(db: DatabaseConnection, notifier: Arc<Notifier>, scan_interval_secs: u64) -> Self {
        Self {
            db,
            notifier,
            gate: CooldownMap::new(),
            scan_interval: Duration::from_secs(scan_interval_secs.max(1)),
        }
    }

    fn pacing(&self) -> TimeDelta {
        // Jobs may re-run at most once per tick, however the cycle was started
        TimeDelta::from_std(self.scan_interval).unwrap_or_else(|_| TimeDelta::hours(1))
    }

    /// Runs the scheduler loop forever. The first cycle fires immediately.
    pub async fn run(&self) {
        let mut ticker = interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = self.scan_interval.as_secs(), "Scheduler started");

        loop {
            ticker.tick().await;
            self.run_cycle().await;
        }
    }

    /// Runs one scheduled cycle: billing for the current period, then the
    /// reminder scans. Errors are logged and swallowed.
    pub async fn run_cycle(&self) {
        let pacing = self.pacing();

        if self.gate.try_acquire(GATE_BILLING, pacing).await {
            let period = BillingPeriod::current();
            match billing::generate_bills(&self.db, &self.notifier, &period).await {
                Ok(result) if !result.failures.is_empty() => {
                    error!(
                        period = %period,
                        failures = result.failures.len(),
                        "Billing run finished with per-customer failures"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(period = %period, error = %e, "Billing run aborted"),
            }
        }

        if self.gate.try_acquire(GATE_REMINDERS, pacing).await {
            match reminders::run_reminder_scans(&self.db, &self.notifier).await {
                Ok(result) if !result.failures.is_empty() => {
                    error!(
                        failures = result.failures.len(),
                        "Reminder scan finished with per-item failures"
                    );
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Reminder scan aborted"),
            }
        }
    }

    /// Runs billing for the given period immediately, bypassing the gate,
    /// then closes it so the next tick backs off.
    pub async fn run_billing_now(&self, period: &BillingPeriod) -> Result<BillingRunResult> {
        let result = billing::generate_bills(&self.db, &self.notifier, period).await;
        self.gate.touch(GATE_BILLING).await;
        result
    }

    /// Runs both reminder scans immediately, bypassing the gate, then
    /// closes it so the next tick backs off.
    pub async fn run_reminder_scan_now(&self) -> Result<ReminderScanResult> {
        let result = reminders::run_reminder_scans(&self.db, &self.notifier).await;
        self.gate.touch(GATE_REMINDERS).await;
        result
    }

    /// The pacing gate, for inspection.
    #[must_use]
    pub fn gate(&self) -> &CooldownMap {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{EntityTrait, PaginatorTrait};

    fn test_scheduler(db: DatabaseConnection) -> (Scheduler, Arc<crate::notify::MockMailer>) {
        let mailer = Arc::new(crate::notify::MockMailer::new());
        let notifier = Arc::new(Notifier::start(
            Arc::clone(&mailer) as Arc<dyn crate::notify::Mailer>,
            16,
            1,
        ));
        (Scheduler::new(db, notifier, 3600), mailer)
    }

    #[tokio::test]
    async fn test_cycle_bills_current_period() -> Result<()> {
        let db = setup_test_db().await?;
        let (scheduler, _mailer) = test_scheduler(db);
        let db = &scheduler.db;
        let cust = create_test_customer(db, "Acme", "acme@example.com").await?;
        create_test_sale(db, cust.id, 100.0, chrono::Utc::now().date_naive()).await?;

        scheduler.run_cycle().await;

        let period = BillingPeriod::current();
        assert!(
            billing::find_bill_for_period(db, cust.id, &period)
                .await?
                .is_some()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_back_to_back_cycles_are_gated() -> Result<()> {
        let db = setup_test_db().await?;
        let (scheduler, _mailer) = test_scheduler(db);
        let db = &scheduler.db;
        let cust = create_test_customer(db, "Acme", "acme@example.com").await?;
        create_test_sale(db, cust.id, 100.0, chrono::Utc::now().date_naive()).await?;

        scheduler.run_cycle().await;
        assert!(scheduler.gate().last_call("billing").await.is_some());
        assert!(scheduler.gate().last_call("reminders").await.is_some());
        let first_billing = scheduler.gate().last_call("billing").await;

        // Second cycle inside the interval leaves the gate timestamps alone
        scheduler.run_cycle().await;
        assert_eq!(scheduler.gate().last_call("billing").await, first_billing);

        let bill_count = crate::entities::MonthlyBill::find().count(db).await?;
        assert_eq!(bill_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_manual_trigger_closes_the_gate() -> Result<()> {
        let db = setup_test_db().await?;
        let (scheduler, _mailer) = test_scheduler(db);
        let db = &scheduler.db;
        let cust = create_test_customer(db, "Acme", "acme@example.com").await?;
        create_test_sale(db, cust.id, 100.0, chrono::Utc::now().date_naive()).await?;

        let result = scheduler.run_billing_now(&BillingPeriod::current()).await?;
        assert_eq!(result.bills_created.len(), 1);
        assert!(scheduler.gate().last_call("billing").await.is_some());

        let scan = scheduler.run_reminder_scan_now().await?;
        assert!(scan.failures.is_empty());
        assert!(scheduler.gate().last_call("reminders").await.is_some());

        Ok(())
    }
}
