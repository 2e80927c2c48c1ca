//! Configuration for the problem factory and the recovery layer.

use serde::{Deserialize, Serialize};

/// Problem details configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProblemsConfig {
    /// Request context key whose string value is stamped onto every problem
    /// as its trace identifier. No key means problems carry no trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_key: Option<String>,

    /// Request header used to seed the trace key in the request context
    /// when the context does not already carry one (e.g. `x-request-id`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_header: Option<String>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg: ProblemsConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(cfg, ProblemsConfig::default());
    }

    #[test]
    fn reads_trace_settings() {
        let cfg: ProblemsConfig = serde_json::from_value(json!({
            "trace_key": "trace-id",
            "trace_header": "x-request-id"
        }))
        .unwrap();
        assert_eq!(cfg.trace_key.as_deref(), Some("trace-id"));
        assert_eq!(cfg.trace_header.as_deref(), Some("x-request-id"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let res = serde_json::from_value::<ProblemsConfig>(json!({ "trace": "x" }));
        assert!(res.is_err());
    }
}
