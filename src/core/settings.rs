//! Business settings stored in the `settings` table.
//!
//! Flat key-value configuration read by every other component: tax rate,
//! bill numbering prefix, currency symbol, business identity, and SMTP
//! credentials. Missing keys fall back to crate defaults; `seed_defaults`
//! inserts the defaults on startup so operators can edit them in place.

use crate::{
    entities::{Setting, setting},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{Set, prelude::*};

/// Global tax rate applied to sales, in percent.
pub const KEY_TAX_RATE: &str = "tax_rate";
/// Prefix for generated bill numbers.
pub const KEY_BILL_PREFIX: &str = "bill_prefix";
/// Currency symbol used in formatted amounts and emails.
pub const KEY_CURRENCY_SYMBOL: &str = "currency_symbol";
/// Business name shown in notification emails.
pub const KEY_BUSINESS_NAME: &str = "business_name";
/// Business postal address.
pub const KEY_BUSINESS_ADDRESS: &str = "business_address";
/// Business contact phone.
pub const KEY_BUSINESS_PHONE: &str = "business_phone";
/// Business contact email.
pub const KEY_BUSINESS_EMAIL: &str = "business_email";
/// SMTP relay host; absent disables email delivery.
pub const KEY_SMTP_HOST: &str = "smtp_host";
/// SMTP relay port (defaults to 587 when unset).
pub const KEY_SMTP_PORT: &str = "smtp_port";
/// SMTP login user.
pub const KEY_SMTP_USER: &str = "smtp_user";
/// SMTP login password.
pub const KEY_SMTP_PASSWORD: &str = "smtp_password";
/// From address on outgoing mail.
pub const KEY_SMTP_FROM: &str = "smtp_from";

/// Keys seeded on startup when absent, with their default values.
const DEFAULTS: &[(&str, &str)] = &[
    (KEY_TAX_RATE, "18.0"),
    (KEY_BILL_PREFIX, "INV"),
    (KEY_CURRENCY_SYMBOL, "₹"),
    (KEY_BUSINESS_NAME, "My Business"),
    (KEY_BUSINESS_ADDRESS, ""),
    (KEY_BUSINESS_PHONE, ""),
    (KEY_BUSINESS_EMAIL, ""),
];

/// Business identity fields used in email templates.
#[derive(Debug, Clone)]
pub struct BusinessProfile {
    /// Business display name
    pub name: String,
    /// Postal address
    pub address: String,
    /// Contact phone
    pub phone: String,
    /// Contact email
    pub email: String,
}

/// Reads a setting value, `None` when the key is absent.
pub async fn get<C>(db: &C, key: &str) -> Result<Option<String>>
where
    C: ConnectionTrait,
{
    let row = Setting::find()
        .filter(setting::Column::Key.eq(key))
        .one(db)
        .await?;
    Ok(row.map(|s| s.value))
}

/// Writes a setting value, inserting the row when the key is new.
pub async fn set<C>(db: &C, key: &str, value: &str) -> Result<()>
where
    C: ConnectionTrait,
{
    let now = Utc::now().naive_utc();

    let existing = Setting::find()
        .filter(setting::Column::Key.eq(key))
        .one(db)
        .await?;

    if let Some(row) = existing {
        let mut active_model: setting::ActiveModel = row.into();
        active_model.value = Set(value.to_string());
        active_model.updated_at = Set(now);
        active_model.update(db).await?;
    } else {
        let new_row = setting::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(now),
            ..Default::default()
        };
        new_row.insert(db).await?;
    }

    Ok(())
}

/// Inserts every default setting that is not already present.
/// Returns the number of keys seeded.
pub async fn seed_defaults(db: &DatabaseConnection) -> Result<usize> {
    let mut seeded = 0;
    for (key, value) in DEFAULTS {
        if get(db, key).await?.is_none() {
            set(db, key, value).await?;
            seeded += 1;
        }
    }
    Ok(seeded)
}

/// Global tax rate in percent (default 18.0).
pub async fn tax_rate(db: &DatabaseConnection) -> Result<f64> {
    match get(db, KEY_TAX_RATE).await? {
        Some(raw) => raw.trim().parse().map_err(|_| Error::Config {
            message: format!("Setting '{KEY_TAX_RATE}' is not a number: {raw}"),
        }),
        None => Ok(18.0),
    }
}

/// Bill numbering prefix (default "INV").
pub async fn bill_prefix(db: &DatabaseConnection) -> Result<String> {
    Ok(get(db, KEY_BILL_PREFIX).await?.unwrap_or_else(|| "INV".to_string()))
}

/// Currency symbol (default "₹").
pub async fn currency_symbol(db: &DatabaseConnection) -> Result<String> {
    Ok(get(db, KEY_CURRENCY_SYMBOL)
        .await?
        .unwrap_or_else(|| "₹".to_string()))
}

/// Business identity for email templates; absent keys become empty strings.
pub async fn business_profile(db: &DatabaseConnection) -> Result<BusinessProfile> {
    Ok(BusinessProfile {
        name: get(db, KEY_BUSINESS_NAME)
            .await?
            .unwrap_or_else(|| "My Business".to_string()),
        address: get(db, KEY_BUSINESS_ADDRESS).await?.unwrap_or_default(),
        phone: get(db, KEY_BUSINESS_PHONE).await?.unwrap_or_default(),
        email: get(db, KEY_BUSINESS_EMAIL).await?.unwrap_or_default(),
    })
}

/// Formats an amount as `<symbol><amount>` with thousands separators and
/// two decimal places, e.g. `₹1,234.50`. Negative amounts render as
/// `-₹1,234.50`.
#[must_use]
pub fn format_currency(symbol: &str, amount: f64) -> String {
    let rendered = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = rendered.split_once('.').unwrap_or((rendered.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}{symbol}{int_grouped}.{frac_part}")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::test_utils::setup_bare_db;

    #[tokio::test]
    async fn test_get_missing_key_is_none() -> Result<()> {
        let db = setup_bare_db().await?;
        assert!(get(&db, "no_such_key").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_set_then_get() -> Result<()> {
        let db = setup_bare_db().await?;

        set(&db, KEY_BILL_PREFIX, "BILL").await?;
        assert_eq!(get(&db, KEY_BILL_PREFIX).await?, Some("BILL".to_string()));

        // Overwrite keeps a single row
        set(&db, KEY_BILL_PREFIX, "ACME").await?;
        assert_eq!(get(&db, KEY_BILL_PREFIX).await?, Some("ACME".to_string()));

        let count = Setting::find()
            .filter(setting::Column::Key.eq(KEY_BILL_PREFIX))
            .count(&db)
            .await?;
        assert_eq!(count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_defaults_is_idempotent() -> Result<()> {
        let db = setup_bare_db().await?;

        let first = seed_defaults(&db).await?;
        assert_eq!(first, DEFAULTS.len());

        let second = seed_defaults(&db).await?;
        assert_eq!(second, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite_operator_values() -> Result<()> {
        let db = setup_bare_db().await?;

        set(&db, KEY_TAX_RATE, "5.0").await?;
        seed_defaults(&db).await?;

        assert_eq!(tax_rate(&db).await?, 5.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_typed_getters_fall_back_to_defaults() -> Result<()> {
        let db = setup_bare_db().await?;

        assert_eq!(tax_rate(&db).await?, 18.0);
        assert_eq!(bill_prefix(&db).await?, "INV");
        assert_eq!(currency_symbol(&db).await?, "₹");

        Ok(())
    }

    #[tokio::test]
    async fn test_bad_tax_rate_is_config_error() -> Result<()> {
        let db = setup_bare_db().await?;

        set(&db, KEY_TAX_RATE, "eighteen").await?;
        let result = tax_rate(&db).await;
        assert!(matches!(result, Err(Error::Config { .. })));

        Ok(())
    }

    #[test]
    fn test_format_currency_grouping() {
        assert_eq!(format_currency("₹", 0.0), "₹0.00");
        assert_eq!(format_currency("₹", 590.0), "₹590.00");
        assert_eq!(format_currency("₹", 1234.5), "₹1,234.50");
        assert_eq!(format_currency("$", 1_000_000.0), "$1,000,000.00");
        assert_eq!(format_currency("₹", -1234.5), "-₹1,234.50");
        assert_eq!(format_currency("₹", 999.999), "₹1,000.00");
    }
}
