//! Aggregate rules.

use std::sync::Arc;

use common_error::PlanEqResult;
use planeq_logical::LogicalPlanNode;

use super::RewriteRule;

/// Removes a grouping-only aggregate whose input is already distinct on the
/// same keys.
///
/// Matches an aggregate without calls that groups by every input column in
/// order, sitting over another aggregate without calls.
pub struct AggregateRemoveRule;

impl RewriteRule for AggregateRemoveRule {
    fn name(&self) -> &'static str {
        "AggregateRemoveRule"
    }

    fn description(&self) -> &'static str {
        "Remove a DISTINCT over input that is already distinct"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Aggregate {
            group_keys,
            calls,
            input,
        } = node
        else {
            return Ok(None);
        };
        if !calls.is_empty() {
            return Ok(None);
        }
        let LogicalPlanNode::Aggregate {
            group_keys: inner_keys,
            calls: inner_calls,
            ..
        } = input.as_ref()
        else {
            return Ok(None);
        };
        let identity = group_keys.len() == inner_keys.len()
            && group_keys
                .iter()
                .enumerate()
                .all(|(i, k)| k.as_index() == Some(i));
        if !identity || !inner_calls.is_empty() {
            return Ok(None);
        }
        Ok(Some(Arc::unwrap_or_clone(Arc::clone(input))))
    }
}
