//! Request types for the Premium Engine API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::{Period, RecalculationMode};

/// A year and month as sent by clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PeriodRequest {
    /// The calendar year.
    pub year: i32,
    /// The calendar month (1-12).
    pub month: u32,
}

impl PeriodRequest {
    /// Validates the pair into a period.
    pub fn to_period(self) -> EngineResult<Period> {
        Period::new(self.year, self.month)
    }
}

/// Request body for `POST /calculations/monthly` and `POST /calculations/bonus`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// The employee to calculate.
    pub employee_id: String,
    /// The target month.
    #[serde(flatten)]
    pub period: PeriodRequest,
    /// The user triggering the calculation.
    pub actor: String,
}

/// Request body for the bulk calculation endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkCalculationRequest {
    /// The organization whose employees are calculated.
    pub organization_id: String,
    /// The target month.
    #[serde(flatten)]
    pub period: PeriodRequest,
    /// The user triggering the run.
    pub actor: String,
}

/// Request body for status transitions (`confirm`, `export`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorRequest {
    /// The user performing the transition.
    pub actor: String,
}

/// Request body for `POST /calculations/{id}/recalculate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecalculateRequest {
    /// Frozen (`historical`) or live (`current`) inputs.
    pub mode: RecalculationMode,
    /// The user triggering the recalculation.
    pub actor: String,
    /// Why the record is being recalculated.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Request body for `POST /calculations/{id}/retroactive-deductions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetroactiveDeductionRequest {
    /// The months that receive the correction.
    pub target_months: Vec<PeriodRequest>,
    /// The premium difference added to each target month.
    pub amount: Decimal,
    /// The user applying the correction.
    pub actor: String,
}

impl RetroactiveDeductionRequest {
    /// Validates the target months.
    pub fn periods(&self) -> EngineResult<Vec<Period>> {
        self.target_months.iter().map(|p| p.to_period()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculation_request_flattens_period() {
        let json = r#"{"employee_id": "emp_001", "year": 2025, "month": 4, "actor": "officer"}"#;
        let request: CalculationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.employee_id, "emp_001");
        assert_eq!(request.period.to_period().unwrap(), Period::new(2025, 4).unwrap());
    }

    #[test]
    fn test_invalid_month_is_rejected_on_conversion() {
        let request = PeriodRequest {
            year: 2025,
            month: 13,
        };
        assert!(request.to_period().is_err());
    }

    #[test]
    fn test_recalculate_request_reason_is_optional() {
        let json = r#"{"mode": "historical", "actor": "auditor"}"#;
        let request: RecalculateRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.mode, RecalculationMode::Historical);
        assert!(request.reason.is_none());
    }

    #[test]
    fn test_retroactive_request_parses_amount_from_string() {
        let json = r#"{
            "target_months": [{"year": 2025, "month": 5}, {"year": 2025, "month": 6}],
            "amount": "1200",
            "actor": "officer"
        }"#;
        let request: RetroactiveDeductionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.amount, Decimal::from(1200));
        assert_eq!(request.periods().unwrap().len(), 2);
    }
}
