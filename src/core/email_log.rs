//! Append-only audit log of notification attempts.
//!
//! Every dispatch writes one row here at enqueue time. Rows are never
//! mutated or deleted; the credit-limit cooldown is derived from the most
//! recent `credit_limit_exceeded` row per customer, which is why this module
//! exposes `latest_for`.

use crate::{
    entities::{EmailLog, NotificationKind, email_log},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Appends one audit row for a notification attempt.
pub async fn append<C>(
    db: &C,
    customer_id: i64,
    kind: NotificationKind,
    outcome: &str,
    message: &str,
) -> Result<email_log::Model>
where
    C: ConnectionTrait,
{
    let entry = email_log::ActiveModel {
        customer_id: Set(customer_id),
        kind: Set(kind),
        sent_at: Set(Utc::now()),
        outcome: Set(outcome.to_string()),
        message: Set(message.to_string()),
        ..Default::default()
    };

    entry.insert(db).await.map_err(Into::into)
}

/// The most recent log entry of the given kind for a customer, if any.
pub async fn latest_for(
    db: &DatabaseConnection,
    customer_id: i64,
    kind: NotificationKind,
) -> Result<Option<email_log::Model>> {
    EmailLog::find()
        .filter(email_log::Column::CustomerId.eq(customer_id))
        .filter(email_log::Column::Kind.eq(kind))
        .order_by_desc(email_log::Column::SentAt)
        .one(db)
        .await
        .map_err(Into::into)
}

/// All log entries for a customer, newest first.
pub async fn entries_for_customer(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<Vec<email_log::Model>> {
    EmailLog::find()
        .filter(email_log::Column::CustomerId.eq(customer_id))
        .order_by_desc(email_log::Column::SentAt)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_append_and_latest() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        assert!(
            latest_for(&db, customer.id, NotificationKind::OverdueNotice)
                .await?
                .is_none()
        );

        append(
            &db,
            customer.id,
            NotificationKind::OverdueNotice,
            "queued",
            "Payment overdue",
        )
        .await?;

        let latest = latest_for(&db, customer.id, NotificationKind::OverdueNotice)
            .await?
            .unwrap();
        assert_eq!(latest.outcome, "queued");
        assert_eq!(latest.message, "Payment overdue");

        Ok(())
    }

    #[tokio::test]
    async fn test_latest_is_kind_scoped() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        append(
            &db,
            customer.id,
            NotificationKind::BillIssued,
            "queued",
            "Bill INV2025080001",
        )
        .await?;

        assert!(
            latest_for(&db, customer.id, NotificationKind::CreditLimitExceeded)
                .await?
                .is_none()
        );
        assert!(
            latest_for(&db, customer.id, NotificationKind::BillIssued)
                .await?
                .is_some()
        );

        Ok(())
    }

    #[tokio::test]
    async fn test_latest_picks_newest() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        // Insert an older row directly with a back-dated timestamp
        insert_log_entry_at(
            &db,
            customer.id,
            NotificationKind::CreditLimitExceeded,
            Utc::now() - chrono::Duration::days(10),
            "old entry",
        )
        .await?;
        append(
            &db,
            customer.id,
            NotificationKind::CreditLimitExceeded,
            "queued",
            "new entry",
        )
        .await?;

        let latest = latest_for(&db, customer.id, NotificationKind::CreditLimitExceeded)
            .await?
            .unwrap();
        assert_eq!(latest.message, "new entry");

        let all = entries_for_customer(&db, customer.id).await?;
        assert_eq!(all.len(), 2);

        Ok(())
    }
}
