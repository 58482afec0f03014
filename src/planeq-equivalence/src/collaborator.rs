//! External collaborators of the equivalence checker.
//!
//! The checker never parses SQL, talks to a model or runs `EXPLAIN` itself.
//! Those capabilities are supplied through the traits below.

use common_error::{PlanEqError, PlanEqResult, plan_err};
use planeq_logical::LogicalPlanNode;

use crate::RuleSuggestion;

/// Produces a logical plan for a query.
pub trait PlanSource: Send + Sync {
    /// Build the plan for `query`, failing with `ParseOrPlanError` on bad input.
    fn to_plan(&self, query: &str) -> PlanEqResult<LogicalPlanNode>;
}

/// Suggests rewrite rules that may bring two plans together.
pub trait RuleAdvisor: Send + Sync {
    /// Suggest rules for the two plan summaries.
    ///
    /// `schema_summary` is passed through from the configuration untouched.
    fn suggest_rules(
        &self,
        plan_a: &str,
        plan_b: &str,
        schema_summary: Option<&str>,
    ) -> PlanEqResult<RuleSuggestion>;
}

/// Produces a physical plan for a query, compared only for exact equality.
pub trait PlanOracle: Send + Sync {
    /// The cleaned physical plan of `query`, or `OracleUnavailable`.
    fn explain(&self, query: &str) -> PlanEqResult<String>;
}

/// Reads plans serialized as JSON.
///
/// The query text is the JSON encoding of a [`LogicalPlanNode`]; a trailing
/// `;` is tolerated.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonPlanSource;

impl PlanSource for JsonPlanSource {
    fn to_plan(&self, query: &str) -> PlanEqResult<LogicalPlanNode> {
        let text = query.trim().trim_end_matches(';').trim_end();
        if text.is_empty() {
            plan_err!("empty plan text");
        }
        serde_json::from_str(text).map_err(|e| PlanEqError::plan(format!("invalid plan JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_plan_source() {
        let plan = JsonPlanSource
            .to_plan(r#"{"Scan": {"table": "orders"}};"#)
            .unwrap();
        assert_eq!(plan, LogicalPlanNode::scan("orders"));
    }

    #[test]
    fn test_json_plan_source_errors() {
        let err = JsonPlanSource.to_plan("SELECT 1").unwrap_err();
        assert!(matches!(err, PlanEqError::ParseOrPlanError(_)));

        let err = JsonPlanSource.to_plan("  ;").unwrap_err();
        assert!(err.to_string().contains("empty plan text"));
    }
}
