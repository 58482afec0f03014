//! Sort rules.

use std::sync::Arc;

use common_error::PlanEqResult;
use planeq_logical::LogicalPlanNode;

use super::RewriteRule;

/// Drops unbounded sorts feeding operators that do not preserve order.
///
/// Aggregates, joins and set operations consume their inputs as bags, so a
/// sort without fetch or offset beneath them has no observable effect.
pub struct SortRemoveRule;

impl RewriteRule for SortRemoveRule {
    fn name(&self) -> &'static str {
        "SortRemoveRule"
    }

    fn description(&self) -> &'static str {
        "Remove sorts whose ordering is discarded by the consuming operator"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        if !matches!(
            node,
            LogicalPlanNode::Aggregate { .. } | LogicalPlanNode::Join { .. } | LogicalPlanNode::SetOp { .. }
        ) {
            return Ok(None);
        }
        if !node.inputs().iter().any(|input| is_unbounded_sort(input)) {
            return Ok(None);
        }
        Ok(Some(node.map_children(|child| match child.as_ref() {
            LogicalPlanNode::Sort {
                fetch: None,
                offset: None,
                input,
                ..
            } => Arc::clone(input),
            _ => Arc::clone(child),
        })))
    }
}

fn is_unbounded_sort(node: &LogicalPlanNode) -> bool {
    matches!(
        node,
        LogicalPlanNode::Sort {
            fetch: None,
            offset: None,
            ..
        }
    )
}
