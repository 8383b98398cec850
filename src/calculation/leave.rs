//! Leave eligibility evaluation.
//!
//! Classifies an employee's leave state for a target month and decides
//! whether premiums are exempt, deferred (postpaid) or collected by direct
//! transfer. All functions are pure and take the target period explicitly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{DeferredShare, LeaveCollectionMethod, LeaveRecord, Period};

/// Minimum length, in days, of an approved spell that starts and ends
/// within the same month for it to exempt that month.
pub const SAME_MONTH_EXEMPTION_MIN_DAYS: i64 = 14;

/// The employee's leave state for a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveState {
    /// Working, or on an approved leave too short to exempt the month.
    Active,
    /// On leave that is not officially approved.
    OnLeaveUnapproved,
    /// On approved leave that exempts the month.
    OnLeaveApprovedExempt,
}

/// Why an approved spell exempts premiums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionReason {
    /// The leave has no end date yet.
    OpenEnded,
    /// The leave starts and ends (return day) in different months.
    SpansMonths,
    /// The leave starts and ends in one month but lasts 14 days or more.
    FourteenDaysOrMore,
}

/// The result of evaluating leave for one employee and month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveEvaluation {
    /// The classified state.
    pub state: LeaveState,
    /// The spell that determined the state, if any.
    pub spell: Option<LeaveRecord>,
    /// Set when the state is `OnLeaveApprovedExempt`.
    pub exemption: Option<ExemptionReason>,
    /// The collection method in force, set when the state is `OnLeaveUnapproved`.
    pub collection_method: Option<LeaveCollectionMethod>,
    /// An approved spell covers the month but is too short to exempt it.
    pub short_approved_leave: bool,
    /// Deferred shares to collect this month on return from unapproved leave.
    pub carry_forward: Vec<DeferredShare>,
}

impl LeaveEvaluation {
    /// Returns true when premiums are fully exempt.
    pub fn is_exempt(&self) -> bool {
        self.state == LeaveState::OnLeaveApprovedExempt
    }

    /// Returns true when the employee share is deferred under postpaid collection.
    pub fn is_postpaid(&self) -> bool {
        self.state == LeaveState::OnLeaveUnapproved
            && self.collection_method == Some(LeaveCollectionMethod::Postpaid)
    }

    /// Returns true when the employee pays directly with inverted rounding.
    pub fn is_direct_transfer(&self) -> bool {
        self.state == LeaveState::OnLeaveUnapproved
            && self.collection_method == Some(LeaveCollectionMethod::DirectTransfer)
    }

    /// Sum of the carried-forward deferred shares.
    pub fn carry_forward_total(&self) -> Decimal {
        self.carry_forward.iter().map(|d| d.amount).sum()
    }
}

/// Returns true if the spell covers the target month.
///
/// A spell covers every month from the one containing its start date up to
/// and including the one containing its end date. Open-ended spells never
/// exit.
///
/// ```
/// use premium_engine::calculation::spell_covers;
/// use premium_engine::models::{LeaveRecord, LeaveType, Period};
/// use chrono::NaiveDate;
///
/// let leave = LeaveRecord {
///     leave_type: LeaveType::Childcare,
///     start_date: NaiveDate::from_ymd_opt(2025, 4, 20).unwrap(),
///     end_date: Some(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()),
///     is_approved: true,
/// };
/// assert!(!spell_covers(&leave, Period::new(2025, 3).unwrap()));
/// assert!(spell_covers(&leave, Period::new(2025, 4).unwrap()));
/// assert!(spell_covers(&leave, Period::new(2025, 6).unwrap()));
/// assert!(!spell_covers(&leave, Period::new(2025, 7).unwrap()));
/// ```
pub fn spell_covers(leave: &LeaveRecord, period: Period) -> bool {
    let first_day = period.first_day();
    if first_day < Period::containing(leave.start_date).first_day() {
        return false;
    }
    match leave.end_date {
        None => true,
        Some(end) => first_day < Period::containing(end).next().first_day(),
    }
}

/// Returns the month containing the day after the leave ends.
pub fn return_period(leave: &LeaveRecord) -> Option<Period> {
    leave
        .end_date
        .and_then(|end| end.succ_opt())
        .map(Period::containing)
}

/// Returns the first month no longer covered by the spell, when it has ended.
pub fn carry_forward_period(leave: &LeaveRecord) -> Option<Period> {
    leave.end_date.map(|end| Period::containing(end).next())
}

/// Returns the length of a closed spell in days, counting both ends.
pub fn spell_length_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Applies the approved-leave exemption rule to one spell.
///
/// Rules are evaluated in order, first match wins:
/// 1. no end date: exempt;
/// 2. the return month differs from the start month: exempt;
/// 3. same month: exempt only if the spell lasts 14 days or more.
pub fn approved_exemption(leave: &LeaveRecord) -> Option<ExemptionReason> {
    let Some(end) = leave.end_date else {
        return Some(ExemptionReason::OpenEnded);
    };
    let start_month = Period::containing(leave.start_date);
    if return_period(leave) != Some(start_month) {
        return Some(ExemptionReason::SpansMonths);
    }
    if spell_length_days(leave.start_date, end) >= SAME_MONTH_EXEMPTION_MIN_DAYS {
        Some(ExemptionReason::FourteenDaysOrMore)
    } else {
        None
    }
}

/// Returns the months of a closed spell, from its start month to its end month.
pub fn spell_months(leave: &LeaveRecord) -> Vec<Period> {
    match carry_forward_period(leave) {
        Some(after) => Period::containing(leave.start_date).until(after).collect(),
        None => Vec::new(),
    }
}

/// Evaluates the employee's leave state for the target month.
///
/// When several spells cover the month, an exempting approved spell wins
/// over an unapproved spell, which wins over a short approved spell.
/// Independently of the state, deferred shares of unapproved spells whose
/// carry-forward month is `period` are surfaced for collection.
pub fn evaluate_leave(
    leave_records: &[LeaveRecord],
    period: Period,
    collection_method: LeaveCollectionMethod,
    deferred_history: &[DeferredShare],
) -> LeaveEvaluation {
    let covering: Vec<&LeaveRecord> = leave_records
        .iter()
        .filter(|leave| spell_covers(leave, period))
        .collect();

    let carry_forward = collect_carry_forward(leave_records, period, deferred_history);

    let exempting = covering
        .iter()
        .filter(|leave| leave.is_approved)
        .find_map(|leave| approved_exemption(leave).map(|reason| (*leave, reason)));

    if let Some((leave, reason)) = exempting {
        return LeaveEvaluation {
            state: LeaveState::OnLeaveApprovedExempt,
            spell: Some(leave.clone()),
            exemption: Some(reason),
            collection_method: None,
            short_approved_leave: false,
            carry_forward,
        };
    }

    if let Some(leave) = covering.iter().find(|leave| !leave.is_approved) {
        return LeaveEvaluation {
            state: LeaveState::OnLeaveUnapproved,
            spell: Some((*leave).clone()),
            exemption: None,
            collection_method: Some(collection_method),
            short_approved_leave: false,
            carry_forward,
        };
    }

    let short = covering.iter().find(|leave| leave.is_approved);
    LeaveEvaluation {
        state: LeaveState::Active,
        spell: short.map(|leave| (*leave).clone()),
        exemption: None,
        collection_method: None,
        short_approved_leave: short.is_some(),
        carry_forward,
    }
}

fn collect_carry_forward(
    leave_records: &[LeaveRecord],
    period: Period,
    deferred_history: &[DeferredShare],
) -> Vec<DeferredShare> {
    let mut collected: Vec<DeferredShare> = Vec::new();
    for leave in leave_records
        .iter()
        .filter(|leave| !leave.is_approved && carry_forward_period(leave) == Some(period))
    {
        let months = spell_months(leave);
        for share in deferred_history
            .iter()
            .filter(|share| months.contains(&share.period) && !share.amount.is_zero())
        {
            if !collected.iter().any(|c| c.calculation_id == share.calculation_id) {
                collected.push(share.clone());
            }
        }
    }
    collected.sort_by_key(|share| share.period);
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CalculationKind, LeaveType};
    use uuid::Uuid;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn period(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn leave(start: NaiveDate, end: Option<NaiveDate>, is_approved: bool) -> LeaveRecord {
        LeaveRecord {
            leave_type: LeaveType::Childcare,
            start_date: start,
            end_date: end,
            is_approved,
        }
    }

    fn deferred(period: Period, amount: i64) -> DeferredShare {
        DeferredShare {
            calculation_id: Uuid::new_v4(),
            period,
            kind: CalculationKind::Monthly,
            amount: Decimal::from(amount),
        }
    }

    #[test]
    fn test_no_leave_is_active() {
        let evaluation = evaluate_leave(&[], period(2025, 4), LeaveCollectionMethod::Postpaid, &[]);
        assert_eq!(evaluation.state, LeaveState::Active);
        assert!(!evaluation.short_approved_leave);
        assert!(evaluation.carry_forward.is_empty());
    }

    #[test]
    fn test_open_ended_approved_leave_is_exempt() {
        let records = vec![leave(date(2025, 3, 10), None, true)];
        let evaluation =
            evaluate_leave(&records, period(2026, 1), LeaveCollectionMethod::Postpaid, &[]);
        assert!(evaluation.is_exempt());
        assert_eq!(evaluation.exemption, Some(ExemptionReason::OpenEnded));
    }

    #[test]
    fn test_spanning_approved_leave_is_exempt() {
        let records = vec![leave(date(2025, 4, 20), Some(date(2025, 6, 10)), true)];
        let evaluation =
            evaluate_leave(&records, period(2025, 5), LeaveCollectionMethod::Postpaid, &[]);
        assert!(evaluation.is_exempt());
        assert_eq!(evaluation.exemption, Some(ExemptionReason::SpansMonths));
    }

    #[test]
    fn test_leave_ending_on_month_end_returns_next_month() {
        // Return day is 1 May, so start and return months differ.
        let record = leave(date(2025, 4, 20), Some(date(2025, 4, 30)), true);
        assert_eq!(return_period(&record), Some(period(2025, 5)));
        assert_eq!(approved_exemption(&record), Some(ExemptionReason::SpansMonths));
    }

    #[test]
    fn test_same_month_thirteen_days_is_not_exempt() {
        let records = vec![leave(date(2025, 4, 1), Some(date(2025, 4, 13)), true)];
        assert_eq!(spell_length_days(date(2025, 4, 1), date(2025, 4, 13)), 13);

        let evaluation =
            evaluate_leave(&records, period(2025, 4), LeaveCollectionMethod::Postpaid, &[]);
        assert_eq!(evaluation.state, LeaveState::Active);
        assert!(evaluation.short_approved_leave);
        assert_eq!(evaluation.exemption, None);
    }

    #[test]
    fn test_same_month_fourteen_days_is_exempt() {
        let records = vec![leave(date(2025, 4, 1), Some(date(2025, 4, 14)), true)];
        let evaluation =
            evaluate_leave(&records, period(2025, 4), LeaveCollectionMethod::Postpaid, &[]);
        assert!(evaluation.is_exempt());
        assert_eq!(evaluation.exemption, Some(ExemptionReason::FourteenDaysOrMore));
    }

    #[test]
    fn test_leave_outside_target_month_is_ignored() {
        let records = vec![leave(date(2025, 4, 1), Some(date(2025, 5, 20)), true)];
        let evaluation =
            evaluate_leave(&records, period(2025, 6), LeaveCollectionMethod::Postpaid, &[]);
        assert_eq!(evaluation.state, LeaveState::Active);
        assert!(!evaluation.short_approved_leave);
    }

    #[test]
    fn test_unapproved_leave_reports_collection_method() {
        let records = vec![leave(date(2025, 4, 1), Some(date(2025, 6, 30)), false)];

        let postpaid =
            evaluate_leave(&records, period(2025, 5), LeaveCollectionMethod::Postpaid, &[]);
        assert_eq!(postpaid.state, LeaveState::OnLeaveUnapproved);
        assert!(postpaid.is_postpaid());
        assert!(!postpaid.is_direct_transfer());

        let direct =
            evaluate_leave(&records, period(2025, 5), LeaveCollectionMethod::DirectTransfer, &[]);
        assert!(direct.is_direct_transfer());
    }

    #[test]
    fn test_exempting_spell_wins_over_unapproved_spell() {
        let records = vec![
            leave(date(2025, 4, 1), Some(date(2025, 6, 30)), false),
            leave(date(2025, 5, 1), None, true),
        ];
        let evaluation =
            evaluate_leave(&records, period(2025, 5), LeaveCollectionMethod::Postpaid, &[]);
        assert!(evaluation.is_exempt());
    }

    #[test]
    fn test_carry_forward_on_month_after_unapproved_leave() {
        let records = vec![leave(date(2025, 4, 10), Some(date(2025, 5, 20)), false)];
        let history = vec![
            deferred(period(2025, 4), 15_000),
            deferred(period(2025, 5), 15_000),
            deferred(period(2025, 2), 9_999),
        ];

        // May is still covered by the spell.
        let may = evaluate_leave(&records, period(2025, 5), LeaveCollectionMethod::Postpaid, &history);
        assert_eq!(may.state, LeaveState::OnLeaveUnapproved);
        assert!(may.carry_forward.is_empty());

        let june =
            evaluate_leave(&records, period(2025, 6), LeaveCollectionMethod::Postpaid, &history);
        assert_eq!(june.state, LeaveState::Active);
        assert_eq!(june.carry_forward.len(), 2);
        assert_eq!(june.carry_forward_total(), Decimal::from(30_000));
        assert_eq!(june.carry_forward[0].period, period(2025, 4));
    }

    #[test]
    fn test_carry_forward_skips_zero_deferrals() {
        let records = vec![leave(date(2025, 4, 10), Some(date(2025, 4, 30)), false)];
        let history = vec![deferred(period(2025, 4), 0)];
        let evaluation =
            evaluate_leave(&records, period(2025, 5), LeaveCollectionMethod::Postpaid, &history);
        assert!(evaluation.carry_forward.is_empty());
    }

    #[test]
    fn test_spell_months() {
        let record = leave(date(2025, 11, 10), Some(date(2026, 1, 5)), false);
        assert_eq!(
            spell_months(&record),
            vec![period(2025, 11), period(2025, 12), period(2026, 1)]
        );
        assert!(spell_months(&leave(date(2025, 11, 10), None, false)).is_empty());
    }
}
