//! Request payload for a calculation run.
//!
//! Mirrors the shape an enclosing request-handling layer would supply:
//! which composite tests to calculate, the raw QA values entered for the
//! non-composite tests, and any already-materialized upload payloads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Input contract for one calculation run.
///
/// `qavalues` and `upload_data` keep their raw JSON shape here; coercion to
/// runtime values happens when the engine builds the execution context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalcRequest {
    /// Identifiers of the composite tests to calculate, resolved into
    /// slug/source pairs by the procedure store.
    #[serde(default)]
    pub composite_ids: Vec<String>,

    /// Raw external input values keyed by test slug. Absent (`None`) is
    /// distinct from empty: a request with neither values nor uploads is
    /// rejected before any evaluation.
    #[serde(default)]
    pub qavalues: Option<IndexMap<String, serde_json::Value>>,

    /// Upload payloads keyed by name, treated as opaque data.
    #[serde(default)]
    pub upload_data: Option<IndexMap<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_partial_payload() {
        let req: CalcRequest =
            serde_json::from_str(r#"{"composite_ids": ["average_dose"]}"#).unwrap();
        assert_eq!(req.composite_ids, vec!["average_dose".to_string()]);
        assert!(req.qavalues.is_none());
        assert!(req.upload_data.is_none());
    }

    #[test]
    fn deserializes_full_payload() {
        let req: CalcRequest = serde_json::from_str(
            r#"{
                "composite_ids": ["t1", "t2"],
                "qavalues": {"dose": "3.5", "temp": 22},
                "upload_data": {"scan": [1, 2, 3]}
            }"#,
        )
        .unwrap();
        let values = req.qavalues.unwrap();
        assert_eq!(values["dose"], serde_json::json!("3.5"));
        assert_eq!(values["temp"], serde_json::json!(22));
        assert!(req.upload_data.unwrap().contains_key("scan"));
    }
}
