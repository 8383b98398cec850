//! Premium rate table models.
//!
//! A rate table is a list of standard-reward brackets. Each row carries the
//! health (with and without long-term care), and pension premiums for the
//! bracket's canonical standard reward.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Premium figures for one insurance type within a rate table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumRate {
    /// The full premium for the bracket's standard reward.
    pub total_premium: Decimal,
    /// Half of the full premium, borne by the employee before rounding.
    pub half_share: Decimal,
    /// The premium rate as a percentage (e.g. `11.58`).
    pub rate: Decimal,
}

impl PremiumRate {
    /// Derives the premium figures for a standard amount and percentage rate.
    ///
    /// ```
    /// use premium_engine::models::PremiumRate;
    /// use rust_decimal::Decimal;
    /// use std::str::FromStr;
    ///
    /// let rate = PremiumRate::from_rate(Decimal::from(300_000), Decimal::from_str("9.98").unwrap());
    /// assert_eq!(rate.total_premium, Decimal::from(29_940));
    /// assert_eq!(rate.half_share, Decimal::from(14_970));
    /// ```
    pub fn from_rate(standard_amount: Decimal, rate: Decimal) -> Self {
        let total_premium = standard_amount * rate / Decimal::ONE_HUNDRED;
        Self {
            total_premium,
            half_share: total_premium / Decimal::TWO,
            rate,
        }
    }

    /// Returns the half share for an arbitrary standard amount at this row's rate.
    pub fn half_share_for(&self, standard_amount: Decimal) -> Decimal {
        standard_amount * self.rate / Decimal::ONE_HUNDRED / Decimal::TWO
    }
}

/// One bracket of an organization's premium rate table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTableEntry {
    /// The organization this row belongs to.
    pub organization_id: String,
    /// The health insurance grade.
    pub grade: u32,
    /// The pension grade, absent for brackets without a pension mapping.
    #[serde(default)]
    pub pension_grade: Option<u32>,
    /// Lower bound of the bracket (inclusive).
    pub min_amount: Decimal,
    /// Upper bound of the bracket (inclusive); `None` or zero means open-ended.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
    /// The canonical standard reward for the bracket.
    pub standard_reward_amount: Decimal,
    /// Health insurance including long-term care (ages 40-64).
    pub health_insurance_with_care: PremiumRate,
    /// Health insurance without long-term care.
    pub health_insurance_without_care: PremiumRate,
    /// Employee pension insurance.
    pub pension_insurance: PremiumRate,
    /// First day the row applies.
    pub effective_from: NaiveDate,
    /// Last day the row applies; `None` means open-ended.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
}

impl RateTableEntry {
    /// Returns true if `amount` falls inside this row's bracket.
    pub fn contains_amount(&self, amount: Decimal) -> bool {
        if amount < self.min_amount {
            return false;
        }
        match self.max_amount {
            None => true,
            Some(max) if max.is_zero() => true,
            Some(max) => amount <= max,
        }
    }

    /// Returns the health premium figures applicable with or without care insurance.
    pub fn health_rate(&self, with_care: bool) -> &PremiumRate {
        if with_care {
            &self.health_insurance_with_care
        } else {
            &self.health_insurance_without_care
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn entry(min: &str, max: Option<&str>) -> RateTableEntry {
        let standard = dec("300000");
        RateTableEntry {
            organization_id: "org_001".to_string(),
            grade: 22,
            pension_grade: Some(19),
            min_amount: dec(min),
            max_amount: max.map(dec),
            standard_reward_amount: standard,
            health_insurance_with_care: PremiumRate::from_rate(standard, dec("11.58")),
            health_insurance_without_care: PremiumRate::from_rate(standard, dec("9.98")),
            pension_insurance: PremiumRate::from_rate(standard, dec("18.3")),
            effective_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            effective_to: None,
        }
    }

    #[test]
    fn test_contains_amount_is_inclusive() {
        let row = entry("290000", Some("310000"));
        assert!(row.contains_amount(dec("290000")));
        assert!(row.contains_amount(dec("310000")));
        assert!(!row.contains_amount(dec("289999")));
        assert!(!row.contains_amount(dec("310001")));
    }

    #[test]
    fn test_zero_max_amount_is_open_ended() {
        let row = entry("1355000", Some("0"));
        assert!(row.contains_amount(dec("99999999")));
        let row = entry("1355000", None);
        assert!(row.contains_amount(dec("1355000")));
    }

    #[test]
    fn test_premium_rate_from_rate() {
        let rate = PremiumRate::from_rate(dec("300000"), dec("11.58"));
        assert_eq!(rate.total_premium, dec("34740"));
        assert_eq!(rate.half_share, dec("17370"));
    }

    #[test]
    fn test_half_share_for_other_amount() {
        let rate = PremiumRate::from_rate(dec("300000"), dec("18.3"));
        assert_eq!(rate.half_share_for(dec("730000")), dec("66795"));
    }

    #[test]
    fn test_health_rate_selects_care_variant() {
        let row = entry("290000", Some("310000"));
        assert_eq!(row.health_rate(true).rate, dec("11.58"));
        assert_eq!(row.health_rate(false).rate, dec("9.98"));
    }
}
