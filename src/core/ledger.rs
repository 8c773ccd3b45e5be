//! Ledger business logic - recording sales, payments, and refunds.
//!
//! Sales compute tax from the global `tax_rate` setting and carry
//! `total = amount + tax`; refunds carry `total = -amount` with no tax.
//! Unpaid entries are what the billing cycle engine rolls up into monthly
//! bills, so sales start `Unpaid` and refunds start `Unpaid` too (they
//! offset the same period's bill). Payments settle on the spot and start
//! `Paid`.

use crate::{
    core::{period::BillingPeriod, settings},
    entities::{Customer, LedgerKind, LedgerStatus, ledger_entry},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};

/// Aggregate of a customer's unpaid ledger entries for one period.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodTotals {
    /// Signed sum of base amounts (sales add, refunds/payments subtract)
    pub subtotal: f64,
    /// Sum of tax amounts
    pub tax: f64,
    /// Number of entries aggregated
    pub entry_count: usize,
}

impl PeriodTotals {
    /// `subtotal + tax`.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.subtotal + self.tax
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

async fn require_customer(db: &DatabaseConnection, customer_id: i64) -> Result<()> {
    Customer::find_by_id(customer_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::CustomerNotFound {
            id: customer_id.to_string(),
        })?;
    Ok(())
}

/// Records a credit sale. Tax is computed from the `tax_rate` setting and
/// `total_amount = amount + tax_amount`. The entry starts `Unpaid` and is
/// picked up by the next billing run for its period.
#[allow(clippy::too_many_arguments)]
pub async fn record_sale(
    db: &DatabaseConnection,
    customer_id: i64,
    amount: f64,
    description: String,
    entry_date: NaiveDate,
    due_date: Option<NaiveDate>,
    payment_mode: String,
    reference_number: Option<String>,
) -> Result<ledger_entry::Model> {
    validate_amount(amount)?;
    require_customer(db, customer_id).await?;

    let rate = settings::tax_rate(db).await?;
    let tax_amount = amount * rate / 100.0;

    let entry = ledger_entry::ActiveModel {
        customer_id: Set(customer_id),
        kind: Set(LedgerKind::Sale),
        amount: Set(amount),
        tax_amount: Set(tax_amount),
        total_amount: Set(amount + tax_amount),
        description: Set(description),
        entry_date: Set(entry_date),
        due_date: Set(due_date),
        status: Set(LedgerStatus::Unpaid),
        payment_mode: Set(payment_mode),
        reference_number: Set(reference_number),
        ..Default::default()
    };

    entry.insert(db).await.map_err(Into::into)
}

/// Records a payment received on the account. Payments carry no tax and
/// settle immediately (`Paid`); payments against a specific bill go through
/// `billing::record_bill_payment` instead.
pub async fn record_payment(
    db: &DatabaseConnection,
    customer_id: i64,
    amount: f64,
    description: String,
    entry_date: NaiveDate,
    payment_mode: String,
    reference_number: Option<String>,
) -> Result<ledger_entry::Model> {
    validate_amount(amount)?;
    require_customer(db, customer_id).await?;

    let entry = ledger_entry::ActiveModel {
        customer_id: Set(customer_id),
        kind: Set(LedgerKind::Payment),
        amount: Set(amount),
        tax_amount: Set(0.0),
        total_amount: Set(amount),
        description: Set(description),
        entry_date: Set(entry_date),
        due_date: Set(None),
        status: Set(LedgerStatus::Paid),
        payment_mode: Set(payment_mode),
        reference_number: Set(reference_number),
        ..Default::default()
    };

    entry.insert(db).await.map_err(Into::into)
}

/// Records a refund. Refunds carry `total_amount = -amount`, no tax, and
/// start `Unpaid` so they offset the same period's bill.
pub async fn record_refund(
    db: &DatabaseConnection,
    customer_id: i64,
    amount: f64,
    description: String,
    entry_date: NaiveDate,
    payment_mode: String,
    reference_number: Option<String>,
) -> Result<ledger_entry::Model> {
    validate_amount(amount)?;
    require_customer(db, customer_id).await?;

    let entry = ledger_entry::ActiveModel {
        customer_id: Set(customer_id),
        kind: Set(LedgerKind::Refund),
        amount: Set(amount),
        tax_amount: Set(0.0),
        total_amount: Set(-amount),
        description: Set(description),
        entry_date: Set(entry_date),
        due_date: Set(None),
        status: Set(LedgerStatus::Unpaid),
        payment_mode: Set(payment_mode),
        reference_number: Set(reference_number),
        ..Default::default()
    };

    entry.insert(db).await.map_err(Into::into)
}

/// All ledger entries for a customer, newest first.
pub async fn entries_for_customer(
    db: &DatabaseConnection,
    customer_id: i64,
) -> Result<Vec<ledger_entry::Model>> {
    crate::entities::LedgerEntry::find()
        .filter(ledger_entry::Column::CustomerId.eq(customer_id))
        .order_by_desc(ledger_entry::Column::EntryDate)
        .order_by_desc(ledger_entry::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// A ledger entry by primary key.
pub async fn get_entry_by_id(
    db: &DatabaseConnection,
    entry_id: i64,
) -> Result<Option<ledger_entry::Model>> {
    crate::entities::LedgerEntry::find_by_id(entry_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Sums a customer's `Unpaid` entries dated inside the period. Sales add
/// their base amount and tax; refunds and (unsettled) payments subtract
/// their base amount.
pub async fn unpaid_totals_for_period<C>(
    db: &C,
    customer_id: i64,
    period: &BillingPeriod,
) -> Result<PeriodTotals>
where
    C: ConnectionTrait,
{
    let entries = crate::entities::LedgerEntry::find()
        .filter(ledger_entry::Column::CustomerId.eq(customer_id))
        .filter(ledger_entry::Column::Status.eq(LedgerStatus::Unpaid))
        .filter(ledger_entry::Column::EntryDate.between(period.first_day(), period.last_day()))
        .all(db)
        .await?;

    let mut totals = PeriodTotals::default();
    for entry in entries {
        match entry.kind {
            LedgerKind::Sale => {
                totals.subtotal += entry.amount;
                totals.tax += entry.tax_amount;
            }
            LedgerKind::Refund | LedgerKind::Payment => {
                totals.subtotal -= entry.amount;
            }
        }
        totals.entry_count += 1;
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_record_sale_computes_tax() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        // Default seeded tax rate is 18%
        let sale = create_test_sale(&db, customer.id, 500.0, date(2025, 8, 5)).await?;
        assert_eq!(sale.kind, LedgerKind::Sale);
        assert_eq!(sale.amount, 500.0);
        assert_eq!(sale.tax_amount, 90.0);
        assert_eq!(sale.total_amount, 590.0);
        assert_eq!(sale.status, LedgerStatus::Unpaid);

        Ok(())
    }

    #[tokio::test]
    async fn test_record_sale_uses_configured_rate() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        settings::set(&db, settings::KEY_TAX_RATE, "5.0").await?;
        let sale = create_test_sale(&db, customer.id, 200.0, date(2025, 8, 5)).await?;
        assert_eq!(sale.tax_amount, 10.0);
        assert_eq!(sale.total_amount, 210.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_record_refund_is_negative_total() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        let refund = record_refund(
            &db,
            customer.id,
            100.0,
            "Returned goods".to_string(),
            date(2025, 8, 10),
            "cash".to_string(),
            None,
        )
        .await?;

        assert_eq!(refund.kind, LedgerKind::Refund);
        assert_eq!(refund.tax_amount, 0.0);
        assert_eq!(refund.total_amount, -100.0);
        assert_eq!(refund.status, LedgerStatus::Unpaid);

        Ok(())
    }

    #[tokio::test]
    async fn test_record_payment_settles_immediately() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        let payment = record_payment(
            &db,
            customer.id,
            250.0,
            "On account".to_string(),
            date(2025, 8, 12),
            "upi".to_string(),
            Some("UPI-123".to_string()),
        )
        .await?;

        assert_eq!(payment.kind, LedgerKind::Payment);
        assert_eq!(payment.status, LedgerStatus::Paid);
        assert_eq!(payment.total_amount, 250.0);
        assert_eq!(payment.reference_number, Some("UPI-123".to_string()));

        Ok(())
    }

    #[tokio::test]
    async fn test_amount_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        for bad in [0.0, -10.0, f64::NAN, f64::INFINITY] {
            let result = record_sale(
                &db,
                customer.id,
                bad,
                "bad".to_string(),
                date(2025, 8, 1),
                None,
                "cash".to_string(),
                None,
            )
            .await;
            assert!(matches!(result, Err(Error::InvalidAmount { .. })));
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_sale_for_missing_customer() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_test_sale(&db, 999, 50.0, date(2025, 8, 1)).await;
        assert!(matches!(result, Err(Error::CustomerNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_unpaid_totals_scoped_to_period_and_status() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;
        let period: BillingPeriod = "2025-08".parse()?;

        // In-period sales
        create_test_sale(&db, customer.id, 300.0, date(2025, 8, 3)).await?;
        create_test_sale(&db, customer.id, 200.0, date(2025, 8, 28)).await?;
        // Out-of-period sale
        create_test_sale(&db, customer.id, 1000.0, date(2025, 7, 31)).await?;
        // In-period refund offsets the subtotal
        record_refund(
            &db,
            customer.id,
            100.0,
            "Return".to_string(),
            date(2025, 8, 15),
            "cash".to_string(),
            None,
        )
        .await?;

        let totals = unpaid_totals_for_period(&db, customer.id, &period).await?;
        assert_eq!(totals.entry_count, 3);
        assert_eq!(totals.subtotal, 400.0); // 300 + 200 - 100
        assert_eq!(totals.tax, 90.0); // 18% of 500
        assert_eq!(totals.total(), 490.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_entries_for_customer_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let customer = create_test_customer(&db, "Acme", "acme@example.com").await?;

        create_test_sale(&db, customer.id, 100.0, date(2025, 8, 1)).await?;
        create_test_sale(&db, customer.id, 200.0, date(2025, 8, 20)).await?;

        let entries = entries_for_customer(&db, customer.id).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, 200.0);
        assert_eq!(entries[1].amount, 100.0);

        Ok(())
    }
}
