//! Projection rules.

use std::sync::Arc;

use common_error::{PlanEqError, PlanEqResult};
use planeq_logical::{Expr, LogicalPlanNode};

use super::RewriteRule;

/// Merges a projection into the projection beneath it.
///
/// `Project[e1..en](Project[f1..fm](X))` becomes `Project[e1'..en'](X)` where
/// every `$i` of the outer expressions is replaced by `fi`. Only applies when
/// the outer expressions use positional references exclusively.
pub struct ProjectMergeRule;

impl RewriteRule for ProjectMergeRule {
    fn name(&self) -> &'static str {
        "ProjectMergeRule"
    }

    fn description(&self) -> &'static str {
        "Merge adjacent projections by substituting the inner expressions"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Project { exprs, input } = node else {
            return Ok(None);
        };
        let LogicalPlanNode::Project {
            exprs: inner_exprs,
            input: inner_input,
        } = input.as_ref()
        else {
            return Ok(None);
        };
        if !exprs.iter().all(Expr::is_positional) {
            return Ok(None);
        }

        let merged = exprs
            .iter()
            .map(|e| {
                e.substitute_indices(inner_exprs).ok_or_else(|| {
                    PlanEqError::rule(format!(
                        "projection {e} references a column beyond the {} inner expressions",
                        inner_exprs.len()
                    ))
                })
            })
            .collect::<PlanEqResult<Vec<_>>>()?;

        Ok(Some(LogicalPlanNode::Project {
            exprs: merged,
            input: Arc::clone(inner_input),
        }))
    }
}

/// Removes a projection that outputs its input unchanged.
pub struct ProjectRemoveRule;

impl RewriteRule for ProjectRemoveRule {
    fn name(&self) -> &'static str {
        "ProjectRemoveRule"
    }

    fn description(&self) -> &'static str {
        "Remove identity projections"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Project { exprs, input } = node else {
            return Ok(None);
        };
        let is_identity = exprs
            .iter()
            .enumerate()
            .all(|(i, e)| e.as_index() == Some(i));
        if is_identity && input.output_width() == Some(exprs.len()) {
            Ok(Some(input.as_ref().clone()))
        } else {
            Ok(None)
        }
    }
}
