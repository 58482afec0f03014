//! Join reordering rules.

use std::sync::Arc;

use common_error::PlanEqResult;
use planeq_canonical::canonical_digest;
use planeq_logical::{ColumnRef, Expr, JoinKind, LogicalPlanNode};

use super::RewriteRule;

/// Orients the inputs of an inner join by canonical digest.
///
/// When the right input's digest sorts before the left's, the inputs are
/// swapped, the condition is remapped and a projection restores the original
/// column order. Requires both input widths to be known.
pub struct JoinCommuteRule;

impl RewriteRule for JoinCommuteRule {
    fn name(&self) -> &'static str {
        "JoinCommuteRule"
    }

    fn description(&self) -> &'static str {
        "Swap inner join inputs into canonical order, restoring column order with a projection"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Join {
            kind: JoinKind::Inner,
            condition,
            left,
            right,
        } = node
        else {
            return Ok(None);
        };
        let (Some(lw), Some(rw)) = (left.output_width(), right.output_width()) else {
            return Ok(None);
        };
        if condition.contains_subquery() || canonical_digest(right) >= canonical_digest(left) {
            return Ok(None);
        }

        let swapped_condition = condition.clone().rewrite(&mut |e| match e {
            Expr::Column(ColumnRef::Index(i)) if i < lw => Expr::Column(ColumnRef::Index(i + rw)),
            Expr::Column(ColumnRef::Index(i)) => Expr::Column(ColumnRef::Index(i - lw)),
            other => other,
        });
        let restore = (rw..rw + lw).chain(0..rw).map(planeq_logical::col_idx).collect();

        Ok(Some(LogicalPlanNode::project(
            restore,
            LogicalPlanNode::Join {
                kind: JoinKind::Inner,
                condition: swapped_condition,
                left: Arc::clone(right),
                right: Arc::clone(left),
            },
        )))
    }
}

/// Re-associates `(A ⋈ B) ⋈ C` into `A ⋈ (B ⋈ C)` for inner joins.
///
/// Column order is unchanged. Conjuncts of the upper condition that only
/// reference `B` and `C` move into the new inner join; the rest stay on top.
pub struct JoinAssociateRule;

impl RewriteRule for JoinAssociateRule {
    fn name(&self) -> &'static str {
        "JoinAssociateRule"
    }

    fn description(&self) -> &'static str {
        "Re-associate left-deep inner joins to the right"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::Join {
            kind: JoinKind::Inner,
            condition: upper,
            left,
            right: c,
        } = node
        else {
            return Ok(None);
        };
        let LogicalPlanNode::Join {
            kind: JoinKind::Inner,
            condition: lower,
            left: a,
            right: b,
        } = left.as_ref()
        else {
            return Ok(None);
        };
        let Some(aw) = a.output_width() else {
            return Ok(None);
        };
        if upper.contains_subquery() || lower.contains_subquery() {
            return Ok(None);
        }

        let mut top: Vec<Expr> = lower
            .clone()
            .into_conjuncts()
            .into_iter()
            .filter(|c| !c.is_true_literal())
            .collect();
        let mut moved = Vec::new();
        for conjunct in upper.clone().into_conjuncts() {
            if conjunct.is_true_literal() {
                continue;
            }
            if conjunct.is_positional() && conjunct.indices_within(aw..usize::MAX) {
                moved.push(conjunct.shift_indices(aw, -(aw as isize)));
            } else {
                top.push(conjunct);
            }
        }

        Ok(Some(LogicalPlanNode::Join {
            kind: JoinKind::Inner,
            condition: Expr::conjunction(top),
            left: Arc::clone(a),
            right: Arc::new(LogicalPlanNode::Join {
                kind: JoinKind::Inner,
                condition: Expr::conjunction(moved),
                left: Arc::clone(b),
                right: Arc::clone(c),
            }),
        }))
    }
}

#[cfg(test)]
mod tests {
    use planeq_logical::{col, col_idx, lit};

    use super::*;

    fn table(name: &str, width: usize) -> LogicalPlanNode {
        LogicalPlanNode::scan_with_columns(name, (0..width).map(|i| format!("{name}_{i}")))
    }

    #[test]
    fn test_join_commute_orients_inputs() {
        // "Scan(orders)" sorts after "Scan(customer)"
        let plan = LogicalPlanNode::join(
            JoinKind::Inner,
            col_idx(1).eq(col_idx(2)),
            table("orders", 2),
            table("customer", 3),
        );

        let swapped = JoinCommuteRule.rewrite(&plan).unwrap().unwrap();
        assert_eq!(
            swapped,
            LogicalPlanNode::project(
                vec![col_idx(3), col_idx(4), col_idx(0), col_idx(1), col_idx(2)],
                LogicalPlanNode::join(
                    JoinKind::Inner,
                    col_idx(4).eq(col_idx(0)),
                    table("customer", 3),
                    table("orders", 2),
                ),
            )
        );

        let LogicalPlanNode::Project { input, .. } = &swapped else {
            panic!("expected projection");
        };
        assert!(JoinCommuteRule.rewrite(input).unwrap().is_none());
    }

    #[test]
    fn test_join_commute_needs_widths() {
        let plan = LogicalPlanNode::join(
            JoinKind::Inner,
            lit("true"),
            LogicalPlanNode::scan("orders"),
            LogicalPlanNode::scan("customer"),
        );
        assert!(JoinCommuteRule.rewrite(&plan).unwrap().is_none());
    }

    #[test]
    fn test_join_commute_ignores_outer_joins() {
        let plan = LogicalPlanNode::join(JoinKind::Left, lit("true"), table("orders", 1), table("customer", 1));
        assert!(JoinCommuteRule.rewrite(&plan).unwrap().is_none());
    }

    #[test]
    fn test_join_associate() {
        // (a ⋈ b) ⋈ c with widths 2, 1, 1
        let plan = LogicalPlanNode::join(
            JoinKind::Inner,
            col_idx(2).eq(col_idx(3)).and(col_idx(0).eq(col_idx(3))),
            LogicalPlanNode::join(JoinKind::Inner, col_idx(1).eq(col_idx(2)), table("a", 2), table("b", 1)),
            table("c", 1),
        );

        let rotated = JoinAssociateRule.rewrite(&plan).unwrap().unwrap();
        assert_eq!(
            rotated,
            LogicalPlanNode::join(
                JoinKind::Inner,
                col_idx(1).eq(col_idx(2)).and(col_idx(0).eq(col_idx(3))),
                table("a", 2),
                LogicalPlanNode::join(JoinKind::Inner, col_idx(0).eq(col_idx(1)), table("b", 1), table("c", 1)),
            )
        );
    }

    #[test]
    fn test_join_associate_keeps_named_conjuncts_on_top() {
        let plan = LogicalPlanNode::join(
            JoinKind::Inner,
            col("b_0").eq(col("c_0")),
            LogicalPlanNode::join(JoinKind::Inner, lit("true"), table("a", 1), table("b", 1)),
            table("c", 1),
        );

        let rotated = JoinAssociateRule.rewrite(&plan).unwrap().unwrap();
        let LogicalPlanNode::Join { condition, right, .. } = &rotated else {
            panic!("expected join");
        };
        assert_eq!(condition, &col("b_0").eq(col("c_0")));
        assert!(matches!(right.as_ref(), LogicalPlanNode::Join { condition, .. } if condition.is_true_literal()));
    }
}
