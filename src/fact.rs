//! Sales fact type - the measure side of the star
//!
//! A fact row references all four dimensions by surrogate key and carries
//! three numeric measures: quantity, unit price, and total amount. Fact rows
//! are append-only event records; corrections are explicit inserts/deletes,
//! never updates in place.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How the stored `total_amount` relates to `quantity * unit_price`.
///
/// The source systems this mart ingests from write `total_amount` as a plain
/// column, so a mismatched total is representable. `Enforce` rejects such
/// rows at insert; `Trust` accepts any non-negative total (line-level
/// discounts, rounding done upstream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalsPolicy {
    /// Reject totals that deviate from quantity * unit_price
    #[default]
    Enforce,
    /// Accept any non-negative total as-is
    Trust,
}

impl TotalsPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            TotalsPolicy::Enforce => "enforce",
            TotalsPolicy::Trust => "trust",
        }
    }
}

impl FromStr for TotalsPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "enforce" | "strict" => Ok(TotalsPolicy::Enforce),
            "trust" | "lax" => Ok(TotalsPolicy::Trust),
            _ => Err(Error::InvalidRecord(format!("Unknown totals policy: {}", s))),
        }
    }
}

impl std::fmt::Display for TotalsPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Relative tolerance for Enforce-mode total comparison.
const TOTAL_EPSILON: f64 = 1e-6;

/// One sales event, ready for insertion into the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRecord {
    /// Date dimension key (YYYYMMDD)
    pub date_key: i64,
    pub customer_key: i64,
    pub product_key: i64,
    pub store_key: i64,
    /// Units sold, non-negative
    pub quantity: i64,
    /// Price per unit, non-negative
    pub unit_price: f64,
    /// Stored line total, non-negative
    pub total_amount: f64,
}

impl SalesRecord {
    /// Create a record with the total computed from quantity and unit price
    pub fn new(
        date_key: i64,
        customer_key: i64,
        product_key: i64,
        store_key: i64,
        quantity: i64,
        unit_price: f64,
    ) -> Self {
        Self {
            date_key,
            customer_key,
            product_key,
            store_key,
            quantity,
            unit_price,
            total_amount: quantity as f64 * unit_price,
        }
    }

    /// Override the stored total (subject to the totals policy at insert)
    pub fn with_total(mut self, total_amount: f64) -> Self {
        self.total_amount = total_amount;
        self
    }

    /// The total implied by quantity and unit price
    pub fn computed_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }

    /// Validate the measures against the given totals policy.
    ///
    /// Referential checks against the dimensions happen at insert time in
    /// the store, not here.
    pub fn validate(&self, policy: TotalsPolicy) -> Result<()> {
        if self.quantity < 0 {
            return Err(Error::ConstraintViolation(format!(
                "negative quantity: {}",
                self.quantity
            )));
        }
        if !self.unit_price.is_finite() || self.unit_price < 0.0 {
            return Err(Error::ConstraintViolation(format!(
                "negative or non-finite unit price: {}",
                self.unit_price
            )));
        }
        if !self.total_amount.is_finite() || self.total_amount < 0.0 {
            return Err(Error::ConstraintViolation(format!(
                "negative or non-finite total amount: {}",
                self.total_amount
            )));
        }
        if policy == TotalsPolicy::Enforce {
            let expected = self.computed_total();
            let tolerance = TOTAL_EPSILON * expected.abs().max(1.0);
            if (self.total_amount - expected).abs() > tolerance {
                return Err(Error::ConstraintViolation(format!(
                    "total amount {} does not equal quantity * unit price ({} * {} = {})",
                    self.total_amount, self.quantity, self.unit_price, expected
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SalesRecord {
        SalesRecord::new(20250101, 1, 1, 1, 3, 10.0)
    }

    #[test]
    fn test_totals_policy_roundtrip() {
        for policy in [TotalsPolicy::Enforce, TotalsPolicy::Trust] {
            let parsed: TotalsPolicy = policy.as_str().parse().unwrap();
            assert_eq!(policy, parsed);
        }
        assert_eq!(TotalsPolicy::default(), TotalsPolicy::Enforce);
    }

    #[test]
    fn test_new_computes_total() {
        let record = sample_record();
        assert_eq!(record.total_amount, 30.0);
        record.validate(TotalsPolicy::Enforce).unwrap();
    }

    #[test]
    fn test_negative_quantity_rejected() {
        let mut record = sample_record();
        record.quantity = -1;
        assert!(matches!(
            record.validate(TotalsPolicy::Trust),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_negative_unit_price_rejected() {
        let mut record = sample_record();
        record.unit_price = -0.5;
        record.total_amount = 0.0;
        assert!(matches!(
            record.validate(TotalsPolicy::Trust),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_enforce_rejects_mismatched_total() {
        let record = sample_record().with_total(29.0);
        assert!(matches!(
            record.validate(TotalsPolicy::Enforce),
            Err(Error::ConstraintViolation(_))
        ));
    }

    #[test]
    fn test_trust_accepts_discounted_total() {
        let record = sample_record().with_total(25.0);
        record.validate(TotalsPolicy::Trust).unwrap();
    }

    #[test]
    fn test_enforce_tolerates_float_noise() {
        // 3 * 0.1 is not exactly 0.3 in binary floating point
        let record = SalesRecord::new(20250101, 1, 1, 1, 3, 0.1).with_total(0.3);
        record.validate(TotalsPolicy::Enforce).unwrap();
    }

    #[test]
    fn test_zero_quantity_is_valid() {
        let record = SalesRecord::new(20250101, 1, 1, 1, 0, 10.0);
        assert_eq!(record.total_amount, 0.0);
        record.validate(TotalsPolicy::Enforce).unwrap();
    }
}
