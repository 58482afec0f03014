//! Canonical plan digests.

use std::sync::Arc;

use log::trace;
use planeq_logical::{Expr, JoinKind, LogicalPlanNode, SetOpKind};

use crate::Canonicalizer;

/// Marker emitted in place of a node re-entered along the active path.
pub const CYCLE_MARKER: &str = "[...cycle...]";

impl Canonicalizer {
    /// Canonical digest of the plan rooted at `node`.
    pub fn plan(&mut self, node: &LogicalPlanNode) -> String {
        if !self.path.enter(node) {
            trace!("re-entered {} along the active path", node.name());
            return format!("{}{CYCLE_MARKER}", node.name());
        }
        let digest = self.plan_node(node);
        self.path.exit(node);
        digest
    }

    fn plan_node(&mut self, node: &LogicalPlanNode) -> String {
        match node {
            LogicalPlanNode::Scan { table, .. } => format!("Scan({table})"),
            LogicalPlanNode::Project { exprs, input } => {
                let exprs: Vec<String> = exprs.iter().map(|e| format!("{:?}", self.expr(e))).collect();
                format!("Project[{}]->{}", exprs.join(","), self.plan(input))
            }
            LogicalPlanNode::Filter { predicate, input } => {
                let conjuncts = self.conjunct_set([predicate]);
                let input = self.plan(input);
                if conjuncts.is_empty() {
                    input
                } else {
                    format!("Filter({})->{input}", conjuncts.join("&"))
                }
            }
            LogicalPlanNode::Join {
                kind: JoinKind::Inner,
                ..
            } => self.inner_join(node),
            LogicalPlanNode::Join {
                kind,
                condition,
                left,
                right,
            } => {
                let condition = self.expr(condition);
                format!(
                    "Join({kind},{condition}){{{}|{}}}",
                    self.plan(left),
                    self.plan(right)
                )
            }
            LogicalPlanNode::SetOp {
                kind,
                all,
                children,
            } => self.set_op(*kind, *all, children),
            LogicalPlanNode::Sort {
                keys,
                fetch,
                offset,
                input,
            } => {
                // Keys only matter when a bound picks which rows survive.
                let mut bounds = Vec::new();
                if fetch.is_some() || offset.is_some() {
                    let keys: Vec<String> = keys
                        .iter()
                        .map(|k| format!("{:?} {}", self.expr(&k.expr), k.direction))
                        .collect();
                    bounds.push(format!("keys=[{}]", keys.join(",")));
                }
                if let Some(fetch) = fetch {
                    bounds.push(format!("fetch={}", self.expr(fetch)));
                }
                if let Some(offset) = offset {
                    bounds.push(format!("offset={}", self.expr(offset)));
                }
                let input = self.plan(input);
                if bounds.is_empty() {
                    format!("Sort->{input}")
                } else {
                    format!("Sort({})->{input}", bounds.join(","))
                }
            }
            LogicalPlanNode::Aggregate {
                group_keys,
                calls,
                input,
            } => {
                let mut groups: Vec<String> = group_keys.iter().map(|k| self.expr(k)).collect();
                groups.sort();
                let mut descriptors: Vec<String> = calls
                    .iter()
                    .map(|call| {
                        let first = call
                            .args
                            .first()
                            .map_or_else(|| "*".to_string(), |a| self.expr(a));
                        let distinct = if call.distinct { ":DISTINCT" } else { "" };
                        format!("{}@{first}{distinct}", call.function.to_uppercase())
                    })
                    .collect();
                descriptors.sort();
                format!(
                    "Aggregate(groups=[{}], calls=[{}])->{}",
                    groups.join(","),
                    descriptors.join(","),
                    self.plan(input)
                )
            }
            LogicalPlanNode::Correlate {
                kind, left, right, ..
            } => format!(
                "Correlate({kind})[{}|{}]",
                self.plan(left),
                self.plan(right)
            ),
            LogicalPlanNode::Generic {
                type_tag, children, ..
            } => {
                let children: Vec<String> = children.iter().map(|c| self.plan(c)).collect();
                format!("{type_tag}[{}]", children.join("|"))
            }
        }
    }

    /// Digest of a maximal inner-join subtree as sorted factors plus a
    /// sorted, deduplicated conjunct set.
    fn inner_join(&mut self, root: &LogicalPlanNode) -> String {
        let mut factors = Vec::new();
        let mut conjuncts = Vec::new();
        self.collect_inner_join(root, &mut factors, &mut conjuncts);

        factors.sort();
        conjuncts.sort();
        conjuncts.dedup();
        let condition = if conjuncts.is_empty() {
            "true".to_string()
        } else {
            conjuncts.join("&")
        };
        format!("Join(INNER,{condition}){{{}}}", factors.join("|"))
    }

    /// Walk an inner join already on the active path, digesting factors and
    /// conditions while their ancestors are entered.
    fn collect_inner_join(
        &mut self,
        join: &LogicalPlanNode,
        factors: &mut Vec<String>,
        conjuncts: &mut Vec<String>,
    ) {
        let LogicalPlanNode::Join {
            condition,
            left,
            right,
            ..
        } = join
        else {
            return;
        };
        conjuncts.extend(self.conjunct_set([condition]));

        for input in [left, right] {
            let input: &LogicalPlanNode = input;
            match flattenable_inner_join(input) {
                Some(inner) if !self.path.contains(input) && !self.path.contains(inner) => {
                    self.path.enter(input);
                    if !std::ptr::eq(input, inner) {
                        self.path.enter(inner);
                    }
                    self.collect_inner_join(inner, factors, conjuncts);
                    if !std::ptr::eq(input, inner) {
                        self.path.exit(inner);
                    }
                    self.path.exit(input);
                }
                // re-entered joins fall through to `plan`, which emits the marker
                _ => factors.push(self.plan(input)),
            }
        }
    }

    fn set_op(&mut self, kind: SetOpKind, all: bool, children: &[Arc<LogicalPlanNode>]) -> String {
        let label = format!("{kind}({})", if all { "ALL" } else { "DISTINCT" });
        let digests = if kind.is_commutative() {
            let mut digests = Vec::new();
            self.collect_set_op(kind, all, children, &mut digests);
            digests.sort();
            digests
        } else {
            let mut digests = self.except_chain(all, children);
            if digests.len() > 1 {
                digests[1..].sort();
            }
            digests
        };
        format!("{label}[{}]", digests.join("|"))
    }

    fn collect_set_op(
        &mut self,
        kind: SetOpKind,
        all: bool,
        children: &[Arc<LogicalPlanNode>],
        digests: &mut Vec<String>,
    ) {
        for child in children {
            match child.as_ref() {
                LogicalPlanNode::SetOp {
                    kind: k,
                    all: a,
                    children: nested,
                } if *k == kind && *a == all && self.path.enter(child) => {
                    self.collect_set_op(kind, all, nested, digests);
                    self.path.exit(child);
                }
                other => digests.push(self.plan(other)),
            }
        }
    }

    /// Digests of a left-nested EXCEPT chain: the innermost minuend first,
    /// then every subtrahend.
    fn except_chain(&mut self, all: bool, children: &[Arc<LogicalPlanNode>]) -> Vec<String> {
        let Some((minuend, subtrahends)) = children.split_first() else {
            return Vec::new();
        };
        let mut digests = match minuend.as_ref() {
            LogicalPlanNode::SetOp {
                kind: SetOpKind::Except,
                all: a,
                children: nested,
            } if *a == all && self.path.enter(minuend) => {
                let digests = self.except_chain(all, nested);
                self.path.exit(minuend);
                digests
            }
            other => vec![self.plan(other)],
        };
        digests.extend(subtrahends.iter().map(|s| self.plan(s)));
        digests
    }
}

/// The inner join reached from `node`, directly or through a pass-through project.
fn flattenable_inner_join(node: &LogicalPlanNode) -> Option<&LogicalPlanNode> {
    match node {
        LogicalPlanNode::Join {
            kind: JoinKind::Inner,
            ..
        } => Some(node),
        LogicalPlanNode::Project { exprs, input } if exprs.iter().all(Expr::is_column) => {
            match input.as_ref() {
                join @ LogicalPlanNode::Join {
                    kind: JoinKind::Inner,
                    ..
                } => Some(join),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use planeq_logical::{AggregateCall, PlanBuilder, SortKey, col, col_idx, lit};

    use super::*;
    use crate::canonical_digest;

    fn scan(table: &str) -> Arc<LogicalPlanNode> {
        Arc::new(LogicalPlanNode::scan(table))
    }

    #[test]
    fn test_scan_and_project() {
        let plan = PlanBuilder::scan("nation")
            .project(vec![col("n_name"), col_idx(2)])
            .build();
        assert_eq!(canonical_digest(&plan), r#"Project["n_name","$x"]->Scan(nation)"#);
    }

    #[test]
    fn test_project_order_is_significant() {
        let a = PlanBuilder::scan("nation")
            .project(vec![col("n_name"), col("n_regionkey")])
            .build();
        let b = PlanBuilder::scan("nation")
            .project(vec![col("n_regionkey"), col("n_name")])
            .build();
        assert_ne!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn test_inner_join_commutes() {
        let a = LogicalPlanNode::join(
            JoinKind::Inner,
            col("o_custkey").eq(col("c_custkey")),
            scan("orders"),
            scan("customer"),
        );
        let b = LogicalPlanNode::join(
            JoinKind::Inner,
            col("c_custkey").eq(col("o_custkey")),
            scan("customer"),
            scan("orders"),
        );
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
        assert_eq!(
            canonical_digest(&a),
            "Join(INNER,(c_custkey = o_custkey)){Scan(customer)|Scan(orders)}"
        );
    }

    #[test]
    fn test_inner_join_tree_flattened() {
        // (orders ⋈ customer) ⋈ nation versus orders ⋈ (customer ⋈ nation)
        let left_deep = LogicalPlanNode::join(
            JoinKind::Inner,
            col("c_nationkey").eq(col("n_nationkey")),
            LogicalPlanNode::join(
                JoinKind::Inner,
                col("o_custkey").eq(col("c_custkey")),
                scan("orders"),
                scan("customer"),
            ),
            scan("nation"),
        );
        let right_deep = LogicalPlanNode::join(
            JoinKind::Inner,
            col("o_custkey").eq(col("c_custkey")),
            scan("orders"),
            LogicalPlanNode::project(
                vec![col_idx(0), col_idx(1)],
                LogicalPlanNode::join(
                    JoinKind::Inner,
                    col("n_nationkey").eq(col("c_nationkey")).and(lit("true")),
                    scan("customer"),
                    scan("nation"),
                ),
            ),
        );
        assert_eq!(canonical_digest(&left_deep), canonical_digest(&right_deep));
    }

    #[test]
    fn test_computing_project_blocks_flattening() {
        let plan = LogicalPlanNode::join(
            JoinKind::Inner,
            lit("true"),
            scan("orders"),
            LogicalPlanNode::project(
                vec![col_idx(0).plus(lit("1"))],
                LogicalPlanNode::join(JoinKind::Inner, lit("true"), scan("customer"), scan("nation")),
            ),
        );
        let digest = canonical_digest(&plan);
        assert!(digest.starts_with("Join(INNER,true){Project["));
    }

    #[test]
    fn test_outer_join_keeps_sides() {
        let a = LogicalPlanNode::join(JoinKind::Left, lit("true"), scan("orders"), scan("customer"));
        let b = LogicalPlanNode::join(JoinKind::Left, lit("true"), scan("customer"), scan("orders"));
        assert_ne!(canonical_digest(&a), canonical_digest(&b));
        assert_eq!(canonical_digest(&a), "Join(LEFT,true){Scan(orders)|Scan(customer)}");
    }

    #[test]
    fn test_filter_true_elided() {
        let base = PlanBuilder::scan("region").build();
        let wrapped = PlanBuilder::scan("region").filter(lit("true")).build();
        assert_eq!(canonical_digest(&base), canonical_digest(&wrapped));
    }

    #[test]
    fn test_filter_conjuncts_sorted() {
        let a = PlanBuilder::scan("t")
            .filter(col("a").gt(lit("10")).and(col("b").eq(lit("5"))).and(col("c").lt(lit("3"))))
            .build();
        let b = PlanBuilder::scan("t")
            .filter(col("c").lt(lit("3")).and(col("b").eq(lit("5")).and(col("a").gt(lit("10")))))
            .build();
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn test_sort_digest() {
        let unbounded = PlanBuilder::scan("orders")
            .sort(vec![SortKey::desc(col("o_totalprice"))])
            .build();
        assert_eq!(canonical_digest(&unbounded), "Sort->Scan(orders)");

        let bounded = PlanBuilder::scan("orders")
            .sort_limit(vec![SortKey::asc(col("o_orderdate"))], Some(lit("10")), Some(lit("5")))
            .build();
        assert_eq!(
            canonical_digest(&bounded),
            r#"Sort(keys=["o_orderdate" ASC],fetch=10,offset=5)->Scan(orders)"#
        );
    }

    #[test]
    fn test_sort_keys_ignored_only_without_bounds() {
        let sorted = |key: &str, fetch: Option<Expr>| {
            PlanBuilder::scan("orders")
                .sort_limit(vec![SortKey::asc(col(key))], fetch, None)
                .build()
        };
        assert_eq!(
            canonical_digest(&sorted("o_orderdate", None)),
            canonical_digest(&sorted("o_totalprice", None))
        );
        assert_ne!(
            canonical_digest(&sorted("o_orderdate", Some(lit("10")))),
            canonical_digest(&sorted("o_totalprice", Some(lit("10"))))
        );

        let asc = PlanBuilder::scan("orders")
            .sort_limit(vec![SortKey::asc(col("o_orderdate"))], Some(lit("1")), None)
            .build();
        let desc = PlanBuilder::scan("orders")
            .sort_limit(vec![SortKey::desc(col("o_orderdate"))], Some(lit("1")), None)
            .build();
        assert_ne!(canonical_digest(&asc), canonical_digest(&desc));
    }

    #[test]
    fn test_project_columns_do_not_run_together() {
        let a = PlanBuilder::scan("t").project(vec![lit("'a,b'")]).build();
        let b = PlanBuilder::scan("t").project(vec![lit("'a'"), lit("'b'")]).build();
        let c = PlanBuilder::scan("t").project(vec![lit("'a"), lit("b'")]).build();
        assert_ne!(canonical_digest(&a), canonical_digest(&c));
        assert_ne!(canonical_digest(&b), canonical_digest(&c));
        assert_ne!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn test_aggregate_order_insensitive() {
        let a = PlanBuilder::scan("lineitem")
            .aggregate(
                vec![col("a"), col("b")],
                vec![AggregateCall::sum(col("x")), AggregateCall::count(col("y"))],
            )
            .build();
        let b = PlanBuilder::scan("lineitem")
            .aggregate(
                vec![col("b"), col("a")],
                vec![AggregateCall::count(col("y")), AggregateCall::sum(col("x"))],
            )
            .build();
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
        assert_eq!(
            canonical_digest(&a),
            "Aggregate(groups=[a,b], calls=[COUNT@y,SUM@x])->Scan(lineitem)"
        );
    }

    #[test]
    fn test_aggregate_distinct_and_star() {
        let plan = PlanBuilder::scan("orders")
            .aggregate(
                vec![],
                vec![AggregateCall::count(col("o_custkey")).distinct(), AggregateCall::count_star()],
            )
            .build();
        assert_eq!(
            canonical_digest(&plan),
            "Aggregate(groups=[], calls=[COUNT@*,COUNT@o_custkey:DISTINCT])->Scan(orders)"
        );
    }

    #[test]
    fn test_union_flattened_and_sorted() {
        let nested = LogicalPlanNode::set_op(
            SetOpKind::Union,
            true,
            vec![
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Union, true, vec![scan("a"), scan("b")])),
                scan("c"),
            ],
        );
        let flat = LogicalPlanNode::set_op(SetOpKind::Union, true, vec![scan("c"), scan("a"), scan("b")]);
        assert_eq!(canonical_digest(&nested), canonical_digest(&flat));
        assert_eq!(
            canonical_digest(&flat),
            "Union(ALL)[Scan(a)|Scan(b)|Scan(c)]"
        );
    }

    #[test]
    fn test_union_distinct_not_merged_with_all() {
        let mixed = LogicalPlanNode::set_op(
            SetOpKind::Union,
            true,
            vec![
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Union, false, vec![scan("a"), scan("b")])),
                scan("c"),
            ],
        );
        let flat = LogicalPlanNode::set_op(SetOpKind::Union, true, vec![scan("a"), scan("b"), scan("c")]);
        assert_ne!(canonical_digest(&mixed), canonical_digest(&flat));
    }

    #[test]
    fn test_except_keeps_minuend() {
        let a = LogicalPlanNode::set_op(SetOpKind::Except, false, vec![scan("a"), scan("b")]);
        let b = LogicalPlanNode::set_op(SetOpKind::Except, false, vec![scan("b"), scan("a")]);
        assert_ne!(canonical_digest(&a), canonical_digest(&b));

        // (a - c) - b == (a - b) - c
        let chained = LogicalPlanNode::set_op(
            SetOpKind::Except,
            false,
            vec![
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Except, false, vec![scan("a"), scan("c")])),
                scan("b"),
            ],
        );
        let reordered = LogicalPlanNode::set_op(
            SetOpKind::Except,
            false,
            vec![
                Arc::new(LogicalPlanNode::set_op(SetOpKind::Except, false, vec![scan("a"), scan("b")])),
                scan("c"),
            ],
        );
        assert_eq!(canonical_digest(&chained), canonical_digest(&reordered));
        assert_eq!(
            canonical_digest(&chained),
            "Except(DISTINCT)[Scan(a)|Scan(b)|Scan(c)]"
        );
    }

    #[test]
    fn test_generic_keeps_child_order() {
        let a = LogicalPlanNode::generic("Window", BTreeMap::new(), vec![scan("a"), scan("b")]);
        let b = LogicalPlanNode::generic("Window", BTreeMap::new(), vec![scan("b"), scan("a")]);
        assert_eq!(canonical_digest(&a), "Window[Scan(a)|Scan(b)]");
        assert_ne!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn test_shared_subtree_is_not_a_cycle() {
        let shared = Arc::new(
            PlanBuilder::scan("lineitem")
                .filter(col("l_quantity").gt(lit("24")))
                .build(),
        );
        let plan = LogicalPlanNode::set_op(
            SetOpKind::Union,
            true,
            vec![Arc::clone(&shared), Arc::clone(&shared)],
        );
        let digest = canonical_digest(&plan);
        assert!(!digest.contains(CYCLE_MARKER));
        assert_eq!(
            digest,
            "Union(ALL)[Filter((24 < l_quantity))->Scan(lineitem)|Filter((24 < l_quantity))->Scan(lineitem)]"
        );
    }

    #[test]
    fn test_reentry_emits_marker() {
        let node = PlanBuilder::scan("orders").filter(lit("x")).build();
        let mut canonicalizer = Canonicalizer::new();
        assert!(canonicalizer.path.enter(&node));
        assert_eq!(canonicalizer.plan(&node), "Filter[...cycle...]");
        canonicalizer.path.exit(&node);
        assert!(canonicalizer.path.is_empty());
        assert_eq!(canonicalizer.plan(&node), "Filter(x)->Scan(orders)");
    }
}
