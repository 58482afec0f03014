//! Filter rules.

use std::sync::Arc;

use common_error::{PlanEqError, PlanEqResult};
use planeq_logical::{Expr, JoinKind, LogicalPlanNode};

use super::RewriteRule;

/// Combines two stacked filters into one conjunction.
pub struct FilterMergeRule;

impl RewriteRule for FilterMergeRule {
    fn name(&self) -> &'static str {
        "FilterMergeRule"
    }

    fn description(&self) -> &'static str {
        "Merge stacked filters into a single conjunctive filter"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Filter { predicate, input } = node else {
            return Ok(None);
        };
        let LogicalPlanNode::Filter {
            predicate: inner,
            input: inner_input,
        } = input.as_ref()
        else {
            return Ok(None);
        };

        let mut conjuncts = inner.clone().into_conjuncts();
        conjuncts.extend(predicate.clone().into_conjuncts());
        Ok(Some(LogicalPlanNode::Filter {
            predicate: Expr::conjunction(conjuncts),
            input: Arc::clone(inner_input),
        }))
    }
}

/// Pushes a filter beneath a projection, rewriting the predicate in terms
/// of the projection's input.
pub struct FilterProjectTransposeRule;

impl RewriteRule for FilterProjectTransposeRule {
    fn name(&self) -> &'static str {
        "FilterProjectTransposeRule"
    }

    fn description(&self) -> &'static str {
        "Push a filter past the projection beneath it"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Filter { predicate, input } = node else {
            return Ok(None);
        };
        let LogicalPlanNode::Project {
            exprs,
            input: project_input,
        } = input.as_ref()
        else {
            return Ok(None);
        };
        if !predicate.is_positional() || exprs.iter().any(Expr::contains_subquery) {
            return Ok(None);
        }

        let pushed = predicate.substitute_indices(exprs).ok_or_else(|| {
            PlanEqError::rule(format!(
                "filter {predicate} references a column beyond the {} projected expressions",
                exprs.len()
            ))
        })?;
        Ok(Some(LogicalPlanNode::Project {
            exprs: exprs.clone(),
            input: Arc::new(LogicalPlanNode::Filter {
                predicate: pushed,
                input: Arc::clone(project_input),
            }),
        }))
    }
}

/// Folds a filter above an inner join into the join condition.
pub struct FilterIntoJoinRule;

impl RewriteRule for FilterIntoJoinRule {
    fn name(&self) -> &'static str {
        "FilterIntoJoinRule"
    }

    fn description(&self) -> &'static str {
        "Merge a filter into the condition of the inner join beneath it"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Filter { predicate, input } = node else {
            return Ok(None);
        };
        let LogicalPlanNode::Join {
            kind: JoinKind::Inner,
            condition,
            left,
            right,
        } = input.as_ref()
        else {
            return Ok(None);
        };

        let mut conjuncts: Vec<Expr> = condition
            .clone()
            .into_conjuncts()
            .into_iter()
            .filter(|c| !c.is_true_literal())
            .collect();
        conjuncts.extend(predicate.clone().into_conjuncts());
        Ok(Some(LogicalPlanNode::Join {
            kind: JoinKind::Inner,
            condition: Expr::conjunction(conjuncts),
            left: Arc::clone(left),
            right: Arc::clone(right),
        }))
    }
}
