//! Result report emitted by a calculation run.

use indexmap::IndexMap;
use serde::Serialize;

use crate::value::Value;

/// Per-slug outcome: exactly one of `value` / `error` is populated.
///
/// Evaluation failures of every kind collapse to the single message
/// `"Invalid Test"`; cyclic slugs carry the fixed `"Cyclic dependency"`
/// message and are never evaluated. The coarse outward message is a
/// deliberate information-hiding policy for semi-trusted procedure content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub value: Option<Value>,
    pub error: Option<String>,
}

impl TestResult {
    pub fn ok(value: Value) -> Self {
        TestResult {
            value: Some(value),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        TestResult {
            value: None,
            error: Some(message.into()),
        }
    }
}

/// The complete report for one calculation run.
///
/// `success` is false only when the run was rejected before any evaluation
/// (missing composite ids or missing input values); per-slug failures do
/// not affect it. `results` holds exactly one entry per known procedure
/// slug, in evaluation/seeding order.
#[derive(Debug, Clone, Serialize)]
pub struct CalcReport {
    pub success: bool,
    pub errors: Vec<String>,
    pub results: IndexMap<String, TestResult>,
}

impl CalcReport {
    /// A report for a run that was rejected before evaluation started.
    pub fn rejected(message: impl Into<String>) -> Self {
        CalcReport {
            success: false,
            errors: vec![message.into()],
            results: IndexMap::new(),
        }
    }

    /// An empty successful report, filled in as evaluation proceeds.
    pub fn empty() -> Self {
        CalcReport {
            success: true,
            errors: Vec::new(),
            results: IndexMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_output_contract_shape() {
        let mut report = CalcReport::empty();
        report
            .results
            .insert("avg".into(), TestResult::ok(Value::Number(2.5)));
        report
            .results
            .insert("bad".into(), TestResult::failed("Invalid Test"));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["results"]["avg"]["value"], serde_json::json!(2.5));
        assert_eq!(json["results"]["avg"]["error"], serde_json::Value::Null);
        assert_eq!(json["results"]["bad"]["value"], serde_json::Value::Null);
        assert_eq!(
            json["results"]["bad"]["error"],
            serde_json::json!("Invalid Test")
        );
    }

    #[test]
    fn rejected_report_has_no_results() {
        let report = CalcReport::rejected("No Valid Composite ID's");
        assert!(!report.success);
        assert_eq!(report.errors, vec!["No Valid Composite ID's".to_string()]);
        assert!(report.results.is_empty());
    }
}
