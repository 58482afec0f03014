//! Expression simplification rules.

use std::sync::Arc;

use common_error::PlanEqResult;
use planeq_logical::{Expr, LogicalPlanNode, OperatorKind};

use super::RewriteRule;

/// Folds boolean constants in node expressions.
///
/// `AND`/`OR` absorb and drop literal operands, `NOT` of a literal is
/// evaluated and double negation cancels. A filter whose predicate reduces
/// to `true` is removed.
pub struct ReduceExpressionsRule {
    name: &'static str,
    filters: bool,
    projects: bool,
    joins: bool,
}

impl ReduceExpressionsRule {
    /// Reduces filter predicates only.
    pub const FILTER: Self = Self {
        name: "FilterReduceExpressionsRule",
        filters: true,
        projects: false,
        joins: false,
    };

    /// Reduces projection expressions only.
    pub const PROJECT: Self = Self {
        name: "ProjectReduceExpressionsRule",
        filters: false,
        projects: true,
        joins: false,
    };

    /// Reduces join conditions only.
    pub const JOIN: Self = Self {
        name: "JoinReduceExpressionsRule",
        filters: false,
        projects: false,
        joins: true,
    };

    /// Reduces filters, projections and join conditions.
    pub const ALL: Self = Self {
        name: "ReduceExpressionsRule",
        filters: true,
        projects: true,
        joins: true,
    };
}

impl RewriteRule for ReduceExpressionsRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Fold boolean constants and remove always-true filters"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let reduced = rewrite_expressions(node, self.filters, self.projects, self.joins, reduce);
        if self.filters {
            if let LogicalPlanNode::Filter { predicate, input } = reduced.as_ref().unwrap_or(node) {
                if predicate.is_true_literal() {
                    return Ok(Some(Arc::unwrap_or_clone(Arc::clone(input))));
                }
            }
        }
        Ok(reduced)
    }
}

/// Pushes `NOT` towards the leaves.
///
/// Applies De Morgan's laws, cancels double negation and replaces negated
/// comparisons with their complements. All of these hold under three-valued
/// logic.
pub struct PushNotDownRule;

impl RewriteRule for PushNotDownRule {
    fn name(&self) -> &'static str {
        "PushNotDownRule"
    }

    fn description(&self) -> &'static str {
        "Push negation down to comparisons and atoms"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        Ok(rewrite_expressions(node, true, true, true, push_not_down))
    }
}

/// Apply `f` to the selected expressions of `node`; `None` when nothing changed.
fn rewrite_expressions(
    node: &LogicalPlanNode,
    filters: bool,
    projects: bool,
    joins: bool,
    f: fn(Expr) -> Expr,
) -> Option<LogicalPlanNode> {
    match node {
        LogicalPlanNode::Filter { predicate, input } if filters => {
            let rewritten = f(predicate.clone());
            (&rewritten != predicate).then(|| LogicalPlanNode::Filter {
                predicate: rewritten,
                input: Arc::clone(input),
            })
        }
        LogicalPlanNode::Project { exprs, input } if projects => {
            let rewritten: Vec<Expr> = exprs.iter().cloned().map(f).collect();
            (&rewritten != exprs).then(|| LogicalPlanNode::Project {
                exprs: rewritten,
                input: Arc::clone(input),
            })
        }
        LogicalPlanNode::Join {
            kind,
            condition,
            left,
            right,
        } if joins => {
            let rewritten = f(condition.clone());
            (&rewritten != condition).then(|| LogicalPlanNode::Join {
                kind: *kind,
                condition: rewritten,
                left: Arc::clone(left),
                right: Arc::clone(right),
            })
        }
        _ => None,
    }
}

/// Fold boolean constants bottom-up.
pub fn reduce(expr: Expr) -> Expr {
    expr.rewrite(&mut |e| match e {
        Expr::Call {
            op: OperatorKind::And,
            operands,
        } => {
            if operands.iter().any(Expr::is_false_literal) {
                return Expr::false_literal();
            }
            let kept: Vec<Expr> = operands.into_iter().filter(|o| !o.is_true_literal()).collect();
            Expr::conjunction(kept)
        }
        Expr::Call {
            op: OperatorKind::Or,
            operands,
        } => {
            if operands.iter().any(Expr::is_true_literal) {
                return Expr::true_literal();
            }
            let mut kept: Vec<Expr> = operands.into_iter().filter(|o| !o.is_false_literal()).collect();
            match kept.len() {
                0 => Expr::false_literal(),
                1 => kept.remove(0),
                _ => Expr::call(OperatorKind::Or, kept),
            }
        }
        Expr::Call {
            op: OperatorKind::Not,
            mut operands,
        } if operands.len() == 1 => match operands.remove(0) {
            inner if inner.is_true_literal() => Expr::false_literal(),
            inner if inner.is_false_literal() => Expr::true_literal(),
            Expr::Call {
                op: OperatorKind::Not,
                operands: mut nested,
            } if nested.len() == 1 => nested.remove(0),
            inner => inner.not(),
        },
        other => other,
    })
}

/// Push every `NOT` in `expr` as far down as it will go.
pub fn push_not_down(expr: Expr) -> Expr {
    expr.rewrite(&mut |e| match e {
        Expr::Call {
            op: OperatorKind::Not,
            mut operands,
        } if operands.len() == 1 => negate(operands.remove(0)),
        other => other,
    })
}

/// The negation of an expression whose own `NOT`s have already been pushed.
fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Call {
            op: OperatorKind::Not,
            mut operands,
        } if operands.len() == 1 => operands.remove(0),
        Expr::Call {
            op: OperatorKind::And,
            operands,
        } => Expr::call(OperatorKind::Or, operands.into_iter().map(negate).collect()),
        Expr::Call {
            op: OperatorKind::Or,
            operands,
        } => Expr::call(OperatorKind::And, operands.into_iter().map(negate).collect()),
        Expr::Call { op, operands } => match complement(&op) {
            Some(complement) => Expr::call(complement, operands),
            None => Expr::Call { op, operands }.not(),
        },
        e if e.is_true_literal() => Expr::false_literal(),
        e if e.is_false_literal() => Expr::true_literal(),
        other => other.not(),
    }
}

fn complement(op: &OperatorKind) -> Option<OperatorKind> {
    Some(match op {
        OperatorKind::Equals => OperatorKind::NotEquals,
        OperatorKind::NotEquals => OperatorKind::Equals,
        OperatorKind::LessThan => OperatorKind::GreaterThanOrEqual,
        OperatorKind::GreaterThanOrEqual => OperatorKind::LessThan,
        OperatorKind::GreaterThan => OperatorKind::LessThanOrEqual,
        OperatorKind::LessThanOrEqual => OperatorKind::GreaterThan,
        OperatorKind::IsNull => OperatorKind::IsNotNull,
        OperatorKind::IsNotNull => OperatorKind::IsNull,
        _ => return None,
    })
}
