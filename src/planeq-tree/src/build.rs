//! Lowering of logical plans into labeled comparison trees.

use planeq_logical::{JoinKind, LogicalPlanNode, SetOpKind};

use crate::RelTreeNode;
use crate::term::Term;

/// Builds [`RelTreeNode`] trees from plans.
///
/// Tracks the nodes currently being lowered so that re-entry produces a
/// `<Tag>:cycle` leaf instead of recursing.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    active: Vec<*const LogicalPlanNode>,
}

impl TreeBuilder {
    /// Create a builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower `plan` into a labeled tree.
    pub fn build(&mut self, plan: &LogicalPlanNode) -> RelTreeNode {
        let id: *const LogicalPlanNode = plan;
        if self.active.contains(&id) {
            return RelTreeNode::leaf(format!("{}:cycle", plan.name()));
        }
        self.active.push(id);
        let tree = self.lower(plan);
        self.active.pop();
        tree
    }

    fn lower(&mut self, plan: &LogicalPlanNode) -> RelTreeNode {
        match plan {
            LogicalPlanNode::Scan { table, .. } => RelTreeNode::leaf(format!("Scan:{table}")),
            LogicalPlanNode::Filter { predicate, input } => {
                let terms = self.conjunct_terms(predicate);
                let input = self.build(input);
                if terms.is_empty() {
                    return input;
                }
                let mut children = predicate_leaves(&terms);
                children.push(input);
                RelTreeNode::new("Filter", children)
            }
            LogicalPlanNode::Project { exprs, input } => {
                let columns: Vec<String> = exprs.iter().map(|e| length_prefixed(&self.term(e).print())).collect();
                RelTreeNode::new(
                    format!("Project:({})", columns.join(", ")),
                    vec![self.build(input)],
                )
            }
            LogicalPlanNode::Join {
                kind: JoinKind::Inner,
                ..
            } => {
                let mut inputs = Vec::new();
                let mut terms = Vec::new();
                self.gather_inner(plan, &mut inputs, &mut terms);
                terms.retain(|t| !t.is_true());
                terms.sort();
                terms.dedup();
                let mut children = predicate_leaves(&terms);
                children.extend(inputs);
                RelTreeNode::new("Join:INNER", children)
            }
            LogicalPlanNode::Join {
                kind,
                condition,
                left,
                right,
            } => {
                let mut children = predicate_leaves(&self.conjunct_terms(condition));
                children.extend(RelTreeNode::positional(vec![
                    self.build(left),
                    self.build(right),
                ]));
                RelTreeNode::new(format!("Join:{kind}"), children)
            }
            LogicalPlanNode::Aggregate {
                group_keys,
                calls,
                input,
            } => {
                let mut children: Vec<RelTreeNode> = group_keys
                    .iter()
                    .map(|k| RelTreeNode::leaf(format!("key:{}", self.term(k).print())))
                    .collect();
                for call in calls {
                    let args: Vec<String> = call.args.iter().map(|a| length_prefixed(&self.term(a).print())).collect();
                    let distinct = if call.distinct { " distinct" } else { "" };
                    children.push(RelTreeNode::leaf(format!(
                        "call:{}{distinct}({})",
                        call.function.to_ascii_lowercase(),
                        args.join(", ")
                    )));
                }
                children.push(self.build(input));
                RelTreeNode::new("Aggregate", children)
            }
            LogicalPlanNode::Sort {
                keys,
                fetch,
                offset,
                input,
            } => {
                let mut label = "Sort".to_string();
                if fetch.is_some() || offset.is_some() {
                    let keys: Vec<String> = keys
                        .iter()
                        .map(|k| format!("{} {}", length_prefixed(&self.term(&k.expr).print()), k.direction))
                        .collect();
                    label.push_str(&format!(":by=({})", keys.join(", ")));
                }
                if let Some(fetch) = fetch {
                    label.push_str(&format!(":fetch={}", self.term(fetch).print()));
                }
                if let Some(offset) = offset {
                    label.push_str(&format!(":offset={}", self.term(offset).print()));
                }
                RelTreeNode::new(label, vec![self.build(input)])
            }
            LogicalPlanNode::SetOp {
                kind: SetOpKind::Except,
                all,
                children,
            } => {
                let lowered = children.iter().map(|c| self.build(c)).collect();
                RelTreeNode::new(
                    format!("Except:{}", set_quantifier(*all)),
                    RelTreeNode::positional(lowered),
                )
            }
            LogicalPlanNode::SetOp {
                kind,
                all,
                children,
            } => {
                let mut lowered = Vec::new();
                for child in children {
                    match child.as_ref() {
                        LogicalPlanNode::SetOp {
                            kind: k,
                            all: a,
                            ..
                        } if k == kind && a == all => {
                            // merge a same-kind child's inputs into this node
                            let nested = self.build(child);
                            if nested.label().ends_with(":cycle") {
                                lowered.push(nested);
                            } else {
                                lowered.extend(nested.children().iter().cloned());
                            }
                        }
                        _ => lowered.push(self.build(child)),
                    }
                }
                RelTreeNode::new(format!("{kind}:{}", set_quantifier(*all)), lowered)
            }
            LogicalPlanNode::Correlate {
                kind, left, right, ..
            } => RelTreeNode::new(
                format!("Correlate:{kind}"),
                RelTreeNode::positional(vec![self.build(left), self.build(right)]),
            ),
            LogicalPlanNode::Generic {
                type_tag,
                attributes,
                children,
            } => {
                let attrs: Vec<String> = attributes.iter().map(|(k, v)| format!("{k}={v}")).collect();
                let lowered = children.iter().map(|c| self.build(c)).collect();
                RelTreeNode::new(
                    format!("{type_tag}:{{{}}}", attrs.join(",")),
                    RelTreeNode::positional(lowered),
                )
            }
        }
    }

    /// Collect inputs and condition terms of directly nested inner joins.
    fn gather_inner(&mut self, join: &LogicalPlanNode, inputs: &mut Vec<RelTreeNode>, terms: &mut Vec<Term>) {
        let LogicalPlanNode::Join {
            condition,
            left,
            right,
            ..
        } = join
        else {
            return;
        };
        terms.extend(self.conjunct_terms(condition));
        for side in [left, right] {
            let id: *const LogicalPlanNode = side.as_ref();
            let nested_inner = matches!(
                side.as_ref(),
                LogicalPlanNode::Join {
                    kind: JoinKind::Inner,
                    ..
                }
            );
            if nested_inner && !self.active.contains(&id) {
                self.active.push(id);
                self.gather_inner(side, inputs, terms);
                self.active.pop();
            } else {
                inputs.push(self.build(side));
            }
        }
    }
}

fn predicate_leaves(terms: &[Term]) -> Vec<RelTreeNode> {
    terms
        .iter()
        .map(|t| RelTreeNode::leaf(format!("pred:{}", t.print())))
        .collect()
}

/// `len:text`, so joined lists cannot be re-split differently.
fn length_prefixed(text: &str) -> String {
    format!("{}:{text}", text.len())
}

fn set_quantifier(all: bool) -> &'static str {
    if all { "all" } else { "distinct" }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use planeq_logical::{AggregateCall, Expr, PlanBuilder, SortKey, col, col_idx, lit};

    use super::*;

    fn scan(table: &str) -> Arc<LogicalPlanNode> {
        Arc::new(LogicalPlanNode::scan(table))
    }

    fn digest(plan: &LogicalPlanNode) -> String {
        TreeBuilder::new().build(plan).digest()
    }

    #[test]
    fn test_scan_leaf() {
        assert_eq!(digest(&LogicalPlanNode::scan("orders")), "Scan:orders[]");
    }

    #[test]
    fn test_filter_tree() {
        let plan = PlanBuilder::scan("orders")
            .filter(col("o_orderstatus").eq(lit("'F'")))
            .build();
        assert_eq!(digest(&plan), "Filter[Scan:orders[];pred:={'F' o_orderstatus}[]]");
    }

    #[test]
    fn test_inner_join_nested_flattened() {
        let a = LogicalPlanNode::join(
            JoinKind::Inner,
            col("s_nationkey").eq(col("n_nationkey")),
            LogicalPlanNode::join(JoinKind::Inner, col("ps_suppkey").eq(col("s_suppkey")), scan("partsupp"), scan("supplier")),
            scan("nation"),
        );
        let b = LogicalPlanNode::join(
            JoinKind::Inner,
            col("s_suppkey").eq(col("ps_suppkey")),
            scan("partsupp"),
            LogicalPlanNode::join(JoinKind::Inner, col("n_nationkey").eq(col("s_nationkey")), scan("supplier"), scan("nation")),
        );
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn test_left_join_positions() {
        let a = LogicalPlanNode::join(JoinKind::Left, lit("true"), scan("a"), scan("b"));
        let b = LogicalPlanNode::join(JoinKind::Left, lit("true"), scan("b"), scan("a"));
        assert_ne!(digest(&a), digest(&b));
    }

    #[test]
    fn test_join_kind_distinguished() {
        let inner = LogicalPlanNode::join(JoinKind::Inner, col("x").eq(col("y")), scan("a"), scan("b"));
        let left = LogicalPlanNode::join(JoinKind::Left, col("x").eq(col("y")), scan("a"), scan("b"));
        assert_ne!(digest(&inner), digest(&left));
    }

    #[test]
    fn test_aggregate_uses_all_arguments() {
        let a = PlanBuilder::scan("t")
            .aggregate(vec![col_idx(0)], vec![AggregateCall::new("CORR", vec![col("x"), col("y")])])
            .build();
        let b = PlanBuilder::scan("t")
            .aggregate(vec![col_idx(0)], vec![AggregateCall::new("CORR", vec![col("x"), col("z")])])
            .build();
        assert_ne!(digest(&a), digest(&b));
    }

    #[test]
    fn test_project_columns_length_prefixed() {
        let plan = PlanBuilder::scan("nation").project(vec![col("n_name"), col_idx(2)]).build();
        assert_eq!(digest(&plan), "Project:(6:n_name, 1:?)[Scan:nation[]]");

        let one = PlanBuilder::scan("t").project(vec![lit("'a, b'")]).build();
        let two = PlanBuilder::scan("t").project(vec![lit("'a"), lit("b'")]).build();
        assert_ne!(digest(&one), digest(&two));
    }

    #[test]
    fn test_sort_keys_labelled_when_bounded() {
        let sorted = |key: &str, fetch: Option<Expr>| {
            let plan = PlanBuilder::scan("orders")
                .sort_limit(vec![SortKey::desc(col(key))], fetch, None)
                .build();
            digest(&plan)
        };
        assert_eq!(sorted("o_orderdate", None), sorted("o_totalprice", None));
        assert_ne!(
            sorted("o_orderdate", Some(lit("10"))),
            sorted("o_totalprice", Some(lit("10")))
        );
        assert!(sorted("o_orderdate", Some(lit("10"))).starts_with("Sort:by=(11:o_orderdate DESC):fetch=10["));
    }

    #[test]
    fn test_union_merged() {
        let nested = LogicalPlanNode::set_op(
            SetOpKind::Union,
            false,
            vec![
                scan("c"),
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Union, false, vec![scan("b"), scan("a")])),
            ],
        );
        let flat = LogicalPlanNode::set_op(SetOpKind::Union, false, vec![scan("a"), scan("b"), scan("c")]);
        assert_eq!(digest(&nested), digest(&flat));
    }

    #[test]
    fn test_except_positional() {
        let a = LogicalPlanNode::set_op(SetOpKind::Except, true, vec![scan("a"), scan("b")]);
        let b = LogicalPlanNode::set_op(SetOpKind::Except, true, vec![scan("b"), scan("a")]);
        assert_ne!(digest(&a), digest(&b));
    }

    #[test]
    fn test_generic_attributes_labelled() {
        let mut attrs = BTreeMap::new();
        attrs.insert("frame".to_string(), "ROWS".to_string());
        let plan = LogicalPlanNode::generic("Window", attrs, vec![scan("a")]);
        assert_eq!(digest(&plan), "Window:{frame=ROWS}[#0[Scan:a[]]]");
    }

    #[test]
    fn test_reentry_leaf() {
        let plan = LogicalPlanNode::scan("a");
        let mut builder = TreeBuilder::new();
        builder.active.push(&plan);
        assert_eq!(builder.build(&plan).digest(), "Scan:cycle[]");
    }
}
