//! Audit trail accumulation.

use crate::models::AuditStep;

/// Collects numbered audit steps while a calculation runs.
#[derive(Debug, Default)]
pub struct AuditTrail {
    steps: Vec<AuditStep>,
}

impl AuditTrail {
    /// Creates an empty trail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step, numbering it after the previous one.
    pub fn record(
        &mut self,
        rule_id: &str,
        rule_name: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        reasoning: impl Into<String>,
    ) {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(AuditStep {
            step_number,
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            input,
            output,
            reasoning: reasoning.into(),
        });
    }

    /// Consumes the trail, returning its steps.
    pub fn into_steps(self) -> Vec<AuditStep> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_are_numbered_sequentially() {
        let mut trail = AuditTrail::new();
        trail.record("a", "A", serde_json::json!({}), serde_json::json!({}), "first");
        trail.record("b", "B", serde_json::json!({}), serde_json::json!({}), "second");

        let steps = trail.into_steps();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].step_number, 1);
        assert_eq!(steps[1].step_number, 2);
        assert_eq!(steps[1].rule_id, "b");
    }
}
