//! Rate table resolution.
//!
//! This module selects the rate table rows effective for a month and maps a
//! standard reward (or standard bonus) amount to its health grade and
//! pension grade row.

use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{Period, RateTableEntry};

/// Returns the organization's rows whose effective window contains the target month.
///
/// Effective windows are compared at month granularity: a row effective from
/// the 15th of a month already applies to that whole month.
///
/// # Errors
///
/// Returns `RateTableNotFound` when no row is effective.
///
/// # Example
///
/// ```
/// use premium_engine::calculation::select_effective_tables;
/// use premium_engine::models::Period;
///
/// let result = select_effective_tables(&[], "org_001", Period::new(2025, 4).unwrap());
/// assert!(result.is_err());
/// ```
pub fn select_effective_tables(
    rows: &[RateTableEntry],
    organization_id: &str,
    period: Period,
) -> EngineResult<Vec<RateTableEntry>> {
    let effective: Vec<RateTableEntry> = rows
        .iter()
        .filter(|row| row.organization_id == organization_id)
        .filter(|row| is_effective(row, period))
        .cloned()
        .collect();

    if effective.is_empty() {
        return Err(EngineError::RateTableNotFound {
            organization_id: organization_id.to_string(),
            period,
        });
    }

    Ok(effective)
}

fn is_effective(row: &RateTableEntry, period: Period) -> bool {
    let from = Period::containing(row.effective_from);
    let to_ok = row
        .effective_to
        .is_none_or(|to| period <= Period::containing(to));
    from <= period && to_ok
}

/// Finds the health grade row whose bracket contains `amount`.
///
/// The first matching row wins; tables are expected to hold a single
/// effective period, so at most one row should match.
pub fn resolve_grade<'a>(
    amount: Decimal,
    tables: &'a [RateTableEntry],
    employee_number: &str,
    period: Period,
) -> EngineResult<&'a RateTableEntry> {
    tables
        .iter()
        .find(|row| row.contains_amount(amount))
        .ok_or_else(|| EngineError::GradeNotFound {
            employee_number: employee_number.to_string(),
            period,
            amount,
        })
}

/// Finds the pension grade row whose bracket contains `amount`.
///
/// Only rows carrying a pension grade are considered. The pension scale
/// tops out below the health scale, so an amount above the highest
/// pension-graded bracket resolves to that bracket.
pub fn resolve_pension_grade<'a>(
    amount: Decimal,
    tables: &'a [RateTableEntry],
    employee_number: &str,
    period: Period,
) -> EngineResult<&'a RateTableEntry> {
    let graded = tables.iter().filter(|row| row.pension_grade.is_some());
    if let Some(row) = graded.clone().find(|row| row.contains_amount(amount)) {
        return Ok(row);
    }

    graded
        .max_by_key(|row| row.min_amount)
        .filter(|top| top.max_amount.is_some_and(|max| amount > max))
        .ok_or_else(|| EngineError::PensionGradeNotFound {
            employee_number: employee_number.to_string(),
            period,
            amount,
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::PremiumRate;
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn period(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    /// Builds a row with the 2024 Tokyo rates.
    pub(crate) fn row(
        grade: u32,
        pension_grade: Option<u32>,
        min: i64,
        max: Option<i64>,
        standard: i64,
    ) -> RateTableEntry {
        let standard = Decimal::from(standard);
        RateTableEntry {
            organization_id: "org_001".to_string(),
            grade,
            pension_grade,
            min_amount: Decimal::from(min),
            max_amount: max.map(Decimal::from),
            standard_reward_amount: standard,
            health_insurance_with_care: PremiumRate::from_rate(standard, dec("11.58")),
            health_insurance_without_care: PremiumRate::from_rate(standard, dec("9.98")),
            pension_insurance: PremiumRate::from_rate(standard, dec("18.3")),
            effective_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            effective_to: None,
        }
    }

    /// A compact table: contiguous brackets from zero, open-ended at the top,
    /// with the top grade lacking a pension mapping.
    pub(crate) fn create_test_table() -> Vec<RateTableEntry> {
        vec![
            row(1, Some(1), 0, Some(62_999), 58_000),
            row(2, Some(1), 63_000, Some(72_999), 68_000),
            row(21, Some(18), 270_000, Some(289_999), 280_000),
            row(22, Some(19), 290_000, Some(309_999), 300_000),
            row(23, Some(20), 310_000, Some(329_999), 320_000),
            row(35, Some(32), 635_000, Some(664_999), 650_000),
            row(50, None, 1_355_000, None, 1_390_000),
        ]
    }

    #[test]
    fn test_resolve_grade_finds_bracket() {
        let table = create_test_table();
        let entry = resolve_grade(dec("300000"), &table, "E001", period(2025, 4)).unwrap();
        assert_eq!(entry.grade, 22);
        assert_eq!(entry.pension_grade, Some(19));
    }

    #[test]
    fn test_resolve_grade_open_ended_top_bracket() {
        let table = create_test_table();
        let entry = resolve_grade(dec("5000000"), &table, "E001", period(2025, 4)).unwrap();
        assert_eq!(entry.grade, 50);
    }

    #[test]
    fn test_resolve_grade_outside_brackets_returns_error() {
        let table = create_test_table();
        let result = resolve_grade(dec("100000"), &table, "E001", period(2025, 4));
        match result {
            Err(EngineError::GradeNotFound {
                employee_number,
                amount,
                ..
            }) => {
                assert_eq!(employee_number, "E001");
                assert_eq!(amount, dec("100000"));
            }
            other => panic!("Expected GradeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_pension_grade_skips_rows_without_pension() {
        let table = create_test_table();
        let entry = resolve_pension_grade(dec("650000"), &table, "E001", period(2025, 4)).unwrap();
        assert_eq!(entry.pension_grade, Some(32));
        assert_eq!(entry.grade, 35);
    }

    #[test]
    fn test_resolve_pension_grade_above_top_pension_bracket_uses_top_row() {
        let table = create_test_table();
        for amount in ["665000", "1400000", "5000000"] {
            let entry = resolve_pension_grade(dec(amount), &table, "E001", period(2025, 4)).unwrap();
            assert_eq!(entry.grade, 35);
            assert_eq!(entry.pension_grade, Some(32));
        }
    }

    #[test]
    fn test_resolve_pension_grade_inside_gap_returns_error() {
        let table = create_test_table();
        let result = resolve_pension_grade(dec("100000"), &table, "E001", period(2025, 4));
        match result {
            Err(EngineError::PensionGradeNotFound { amount, .. }) => {
                assert_eq!(amount, dec("100000"));
            }
            other => panic!("Expected PensionGradeNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_pension_grade_without_pension_rows_returns_error() {
        let table = vec![row(50, None, 1_355_000, None, 1_390_000)];
        let result = resolve_pension_grade(dec("1400000"), &table, "E001", period(2025, 4));
        assert!(matches!(result, Err(EngineError::PensionGradeNotFound { .. })));
    }

    #[test]
    fn test_select_effective_tables_month_granularity() {
        let mut old = row(22, Some(19), 290_000, Some(309_999), 300_000);
        old.effective_from = NaiveDate::from_ymd_opt(2023, 3, 1).unwrap();
        old.effective_to = Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        let mut new = row(22, Some(19), 290_000, Some(309_999), 300_000);
        new.effective_from = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();

        let rows = vec![old.clone(), new.clone()];

        let feb = select_effective_tables(&rows, "org_001", period(2024, 2)).unwrap();
        assert_eq!(feb, vec![old.clone()]);

        // Both windows touch March once truncated to months.
        let march = select_effective_tables(&rows, "org_001", period(2024, 3)).unwrap();
        assert_eq!(march.len(), 2);

        let april = select_effective_tables(&rows, "org_001", period(2024, 4)).unwrap();
        assert_eq!(april, vec![new]);
    }

    #[test]
    fn test_select_effective_tables_filters_organization() {
        let rows = create_test_table();
        let result = select_effective_tables(&rows, "org_999", period(2025, 4));
        match result {
            Err(EngineError::RateTableNotFound {
                organization_id,
                period: p,
            }) => {
                assert_eq!(organization_id, "org_999");
                assert_eq!(p, period(2025, 4));
            }
            other => panic!("Expected RateTableNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_select_effective_tables_before_first_effective_month() {
        let rows = create_test_table();
        assert!(select_effective_tables(&rows, "org_001", period(2024, 2)).is_err());
    }

    proptest! {
        #[test]
        fn prop_amounts_inside_contiguous_brackets_resolve_to_one_grade(amount in 270_000i64..330_000) {
            let table = create_test_table();
            let amount = Decimal::from(amount);
            let matches = table.iter().filter(|r| r.contains_amount(amount)).count();
            prop_assert_eq!(matches, 1);
            let entry = resolve_grade(amount, &table, "E001", period(2025, 4)).unwrap();
            prop_assert!(entry.contains_amount(amount));
        }
    }
}
