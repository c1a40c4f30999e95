//! Dimension row types - the descriptive side of the star
//!
//! Four dimensions, each keyed by a surrogate integer and identified to the
//! outside world by a natural key:
//! - `DateRow`: one row per calendar date, key encoded as YYYYMMDD
//! - `Customer`: who bought
//! - `Product`: what was bought
//! - `Store`: where it was bought
//!
//! Natural keys are unique per dimension and immutable once a surrogate key
//! has been allocated for them. No dimension references another dimension.

use crate::{Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Sales channel of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Physical storefront
    Offline,
    /// Web storefront
    Online,
}

impl Channel {
    /// Get the string representation of the channel
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Offline => "offline",
            Channel::Online => "online",
        }
    }

    /// Get all channels
    pub fn all() -> &'static [Channel] {
        &[Channel::Offline, Channel::Online]
    }
}

impl FromStr for Channel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "offline" | "store" | "retail" | "instore" => Ok(Channel::Offline),
            "online" | "web" | "ecommerce" => Ok(Channel::Online),
            _ => Err(Error::InvalidRecord(format!("Unknown channel: {}", s))),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the date dimension.
///
/// The surrogate key is content-derived: the calendar date encoded as
/// YYYYMMDD. All other fields are derived from the date and must stay
/// consistent with it; `validate` re-derives and compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRow {
    /// Surrogate key, YYYYMMDD encoding of `calendar_date`
    pub date_key: i64,
    /// The calendar date this row describes (unique per row)
    pub calendar_date: NaiveDate,
    pub year: i32,
    /// Calendar quarter, 1-4
    pub quarter: u32,
    /// Month, 1-12
    pub month: u32,
    /// Day of month, 1-31
    pub day_of_month: u32,
    /// Day of week, 0 = Monday .. 6 = Sunday
    pub day_of_week: u32,
    /// True for Saturday and Sunday
    pub is_weekend: bool,
}

impl DateRow {
    /// Build the row for a calendar date, deriving every field
    pub fn from_date(date: NaiveDate) -> Self {
        let day_of_week = date.weekday().num_days_from_monday();
        Self {
            date_key: date_key_for(date),
            calendar_date: date,
            year: date.year(),
            quarter: (date.month() + 2) / 3,
            month: date.month(),
            day_of_month: date.day(),
            day_of_week,
            is_weekend: day_of_week >= 5,
        }
    }

    /// Check that every derived field matches the calendar date
    pub fn validate(&self) -> Result<()> {
        let expected = DateRow::from_date(self.calendar_date);
        if *self != expected {
            return Err(Error::ConstraintViolation(format!(
                "date row for {} has fields inconsistent with the calendar date (expected key {})",
                self.calendar_date, expected.date_key
            )));
        }
        Ok(())
    }
}

/// Encode a calendar date as a YYYYMMDD surrogate key
pub fn date_key_for(date: NaiveDate) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day() as i64
}

/// A row of the customer dimension (without its surrogate key).
///
/// The surrogate key is allocated by the store at insert time and returned
/// to the caller; it never appears on the input type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    /// Natural business identifier, unique across the dimension
    pub customer_id: String,
    pub name: String,
    pub gender: Option<String>,
    /// Categorical bucket such as "18-25" or "36-45"
    pub age_band: Option<String>,
    pub country: Option<String>,
    pub signup_date: Option<NaiveDate>,
}

impl Customer {
    pub fn new(customer_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            name: name.into(),
            gender: None,
            age_band: None,
            country: None,
            signup_date: None,
        }
    }

    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = Some(gender.into());
        self
    }

    pub fn with_age_band(mut self, age_band: impl Into<String>) -> Self {
        self.age_band = Some(age_band.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_signup_date(mut self, date: NaiveDate) -> Self {
        self.signup_date = Some(date);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_natural_key("customer", &self.customer_id)?;
        if self.name.trim().is_empty() {
            return Err(Error::ConstraintViolation(format!(
                "customer {} has an empty name",
                self.customer_id
            )));
        }
        Ok(())
    }
}

/// A row of the product dimension (without its surrogate key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Natural product identifier, unique across the dimension
    pub product_id: String,
    pub name: String,
    pub category: Option<String>,
    pub brand: Option<String>,
    /// Non-negative when set
    pub list_price: Option<f64>,
    /// Retired products keep their row; historical facts stay valid
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Product {
    pub fn new(product_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            category: None,
            brand: None,
            list_price: None,
            active: true,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_list_price(mut self, price: f64) -> Self {
        self.list_price = Some(price);
        self
    }

    pub fn retired(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_natural_key("product", &self.product_id)?;
        if self.name.trim().is_empty() {
            return Err(Error::ConstraintViolation(format!(
                "product {} has an empty name",
                self.product_id
            )));
        }
        if let Some(price) = self.list_price {
            if !price.is_finite() || price < 0.0 {
                return Err(Error::ConstraintViolation(format!(
                    "product {} has a negative or non-finite list price: {}",
                    self.product_id, price
                )));
            }
        }
        Ok(())
    }
}

/// A row of the store dimension (without its surrogate key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Store {
    /// Natural store identifier, unique across the dimension
    pub store_id: String,
    pub name: String,
    pub region: Option<String>,
    pub channel: Option<Channel>,
}

impl Store {
    pub fn new(store_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            store_id: store_id.into(),
            name: name.into(),
            region: None,
            channel: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_natural_key("store", &self.store_id)?;
        Ok(())
    }
}

fn validate_natural_key(dimension: &str, key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::ConstraintViolation(format!(
            "{} natural key must not be empty",
            dimension
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_roundtrip() {
        for channel in Channel::all() {
            let s = channel.as_str();
            let parsed: Channel = s.parse().unwrap();
            assert_eq!(*channel, parsed);
        }
    }

    #[test]
    fn test_channel_aliases() {
        assert_eq!(Channel::from_str("web").unwrap(), Channel::Online);
        assert_eq!(Channel::from_str("retail").unwrap(), Channel::Offline);
        assert!(Channel::from_str("carrier-pigeon").is_err());
    }

    #[test]
    fn test_date_row_derivation() {
        // 2025-01-15 is a Wednesday
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let row = DateRow::from_date(date);

        assert_eq!(row.date_key, 20250115);
        assert_eq!(row.year, 2025);
        assert_eq!(row.quarter, 1);
        assert_eq!(row.month, 1);
        assert_eq!(row.day_of_month, 15);
        assert_eq!(row.day_of_week, 2);
        assert!(!row.is_weekend);
        row.validate().unwrap();
    }

    #[test]
    fn test_date_row_weekend() {
        // 2025-01-18 is a Saturday
        let row = DateRow::from_date(NaiveDate::from_ymd_opt(2025, 1, 18).unwrap());
        assert_eq!(row.day_of_week, 5);
        assert!(row.is_weekend);

        // 2025-01-20 is a Monday
        let row = DateRow::from_date(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap());
        assert_eq!(row.day_of_week, 0);
        assert!(!row.is_weekend);
    }

    #[test]
    fn test_date_row_quarters() {
        for (month, quarter) in [(1, 1), (3, 1), (4, 2), (6, 2), (7, 3), (9, 3), (10, 4), (12, 4)] {
            let row = DateRow::from_date(NaiveDate::from_ymd_opt(2025, month, 1).unwrap());
            assert_eq!(row.quarter, quarter, "month {}", month);
        }
    }

    #[test]
    fn test_date_row_inconsistent_fields_rejected() {
        let mut row = DateRow::from_date(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        row.quarter = 3;
        assert!(matches!(row.validate(), Err(Error::ConstraintViolation(_))));
    }

    #[test]
    fn test_customer_builder() {
        let customer = Customer::new("C1", "Ada")
            .with_gender("F")
            .with_age_band("26-35")
            .with_country("PT");

        customer.validate().unwrap();
        assert_eq!(customer.customer_id, "C1");
        assert_eq!(customer.age_band.as_deref(), Some("26-35"));
    }

    #[test]
    fn test_empty_natural_key_rejected() {
        let customer = Customer::new("  ", "Nobody");
        assert!(matches!(customer.validate(), Err(Error::ConstraintViolation(_))));
    }

    #[test]
    fn test_product_negative_list_price_rejected() {
        let product = Product::new("P1", "Widget").with_list_price(-1.0);
        assert!(matches!(product.validate(), Err(Error::ConstraintViolation(_))));
    }

    #[test]
    fn test_retired_product_stays_valid() {
        let product = Product::new("P1", "Widget").retired();
        product.validate().unwrap();
        assert!(!product.active);
    }
}
