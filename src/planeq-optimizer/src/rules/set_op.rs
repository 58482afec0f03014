//! Set operation rules.

use std::sync::Arc;

use common_error::PlanEqResult;
use planeq_logical::{LogicalPlanNode, SetOpKind};

use super::RewriteRule;

/// Flattens nested set operations of the same kind and quantifier.
///
/// For `UNION` and `INTERSECT` every matching child is spliced in place.
/// `EXCEPT` only splices its first input, since `(a - b) - c` is `a - b - c`
/// while `a - (b - c)` is not.
pub struct SetOpMergeRule {
    name: &'static str,
    kind: SetOpKind,
}

impl SetOpMergeRule {
    /// Merges nested `UNION`s.
    pub const UNION: Self = Self {
        name: "UnionMergeRule",
        kind: SetOpKind::Union,
    };

    /// Merges nested `INTERSECT`s.
    pub const INTERSECT: Self = Self {
        name: "IntersectMergeRule",
        kind: SetOpKind::Intersect,
    };

    /// Merges a left-nested `EXCEPT` chain.
    pub const MINUS: Self = Self {
        name: "MinusMergeRule",
        kind: SetOpKind::Except,
    };

    fn splices(&self, position: usize, child: &LogicalPlanNode, all: bool) -> bool {
        if self.kind == SetOpKind::Except && position > 0 {
            return false;
        }
        matches!(child, LogicalPlanNode::SetOp { kind, all: a, .. } if *kind == self.kind && *a == all)
    }
}

impl RewriteRule for SetOpMergeRule {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        "Flatten nested set operations of the same kind"
    }

    fn rewrite(&self, node: &LogicalPlanNode) -> PlanEqResult<Option<LogicalPlanNode>> {
        let LogicalPlanNode::SetOp {
            kind,
            all,
            children,
        } = node
        else {
            return Ok(None);
        };
        if *kind != self.kind
            || !children
                .iter()
                .enumerate()
                .any(|(i, c)| self.splices(i, c, *all))
        {
            return Ok(None);
        }

        let mut merged = Vec::with_capacity(children.len());
        for (i, child) in children.iter().enumerate() {
            match child.as_ref() {
                LogicalPlanNode::SetOp {
                    children: nested, ..
                } if self.splices(i, child, *all) => merged.extend(nested.iter().map(Arc::clone)),
                _ => merged.push(Arc::clone(child)),
            }
        }
        Ok(Some(LogicalPlanNode::SetOp {
            kind: *kind,
            all: *all,
            children: merged,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(table: &str) -> Arc<LogicalPlanNode> {
        Arc::new(LogicalPlanNode::scan(table))
    }

    #[test]
    fn test_union_merge() {
        let plan = LogicalPlanNode::set_op(
            SetOpKind::Union,
            true,
            vec![
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Union, true, vec![scan("a"), scan("b")])),
                scan("c"),
            ],
        );
        assert_eq!(
            SetOpMergeRule::UNION.rewrite(&plan).unwrap(),
            Some(LogicalPlanNode::set_op(
                SetOpKind::Union,
                true,
                vec![scan("a"), scan("b"), scan("c")]
            ))
        );
    }

    #[test]
    fn test_mixed_quantifiers_not_merged() {
        let plan = LogicalPlanNode::set_op(
            SetOpKind::Union,
            false,
            vec![
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Union, true, vec![scan("a"), scan("b")])),
                scan("c"),
            ],
        );
        assert!(SetOpMergeRule::UNION.rewrite(&plan).unwrap().is_none());
    }

    #[test]
    fn test_minus_merges_first_input_only() {
        let nested = Arc::new(LogicalPlanNode::set_op(SetOpKind::Except, false, vec![scan("b"), scan("c")]));
        let right_nested = LogicalPlanNode::set_op(SetOpKind::Except, false, vec![scan("a"), Arc::clone(&nested)]);
        assert!(SetOpMergeRule::MINUS.rewrite(&right_nested).unwrap().is_none());

        let left_nested = LogicalPlanNode::set_op(SetOpKind::Except, false, vec![nested, scan("d")]);
        assert_eq!(
            SetOpMergeRule::MINUS.rewrite(&left_nested).unwrap(),
            Some(LogicalPlanNode::set_op(
                SetOpKind::Except,
                false,
                vec![scan("b"), scan("c"), scan("d")]
            ))
        );
    }

    #[test]
    fn test_kind_must_match_rule() {
        let plan = LogicalPlanNode::set_op(
            SetOpKind::Intersect,
            true,
            vec![
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Intersect, true, vec![scan("a"), scan("b")])),
                scan("c"),
            ],
        );
        assert!(SetOpMergeRule::UNION.rewrite(&plan).unwrap().is_none());
        assert!(SetOpMergeRule::INTERSECT.rewrite(&plan).unwrap().is_some());
    }
}
