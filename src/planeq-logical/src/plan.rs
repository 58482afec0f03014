//! Logical plan structure.
//!
//! A plan is a tree of [`LogicalPlanNode`] values whose children are held in
//! [`Arc`]s, so one subtree may be referenced from several parents (a DAG)
//! without copying.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use common_display::{DisplayTree, TreeNode};
use serde::{Deserialize, Serialize};

use crate::expr::{CorrelationId, Expr};
use crate::ops::{AggregateCall, JoinKind, SetOpKind, SortKey};

/// A node of a relational query plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalPlanNode {
    /// Table scan (leaf).
    Scan {
        /// Qualified table name.
        table: String,
        /// Output column names, if known. Used only to derive output width.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        columns: Vec<String>,
    },
    /// Row filter.
    Filter {
        /// Predicate rows must satisfy.
        predicate: Expr,
        /// Input plan.
        input: Arc<LogicalPlanNode>,
    },
    /// Projection; expression order defines output column positions.
    Project {
        /// Output expressions in output order.
        exprs: Vec<Expr>,
        /// Input plan.
        input: Arc<LogicalPlanNode>,
    },
    /// Binary join.
    Join {
        /// Join kind.
        kind: JoinKind,
        /// Join condition over the concatenated left and right rows.
        condition: Expr,
        /// Left input.
        left: Arc<LogicalPlanNode>,
        /// Right input.
        right: Arc<LogicalPlanNode>,
    },
    /// Grouped aggregation; output is group keys followed by calls.
    Aggregate {
        /// Grouping keys (a set).
        #[serde(default)]
        group_keys: Vec<Expr>,
        /// Aggregate calls.
        #[serde(default)]
        calls: Vec<AggregateCall>,
        /// Input plan.
        input: Arc<LogicalPlanNode>,
    },
    /// Ordering with optional limit and offset.
    Sort {
        /// Sort keys in order of precedence.
        #[serde(default)]
        keys: Vec<SortKey>,
        /// Row limit.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fetch: Option<Expr>,
        /// Rows to skip.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        offset: Option<Expr>,
        /// Input plan.
        input: Arc<LogicalPlanNode>,
    },
    /// N-ary set operation.
    SetOp {
        /// Operation kind.
        kind: SetOpKind,
        /// Whether duplicates are retained.
        #[serde(default)]
        all: bool,
        /// Inputs in order.
        children: Vec<Arc<LogicalPlanNode>>,
    },
    /// Correlated join: `right` is evaluated per row of `left` with the
    /// correlation variable bound to that row.
    Correlate {
        /// Correlation variable bound by this node.
        correlation: CorrelationId,
        /// Join kind.
        kind: JoinKind,
        /// Outer input.
        left: Arc<LogicalPlanNode>,
        /// Correlated inner input.
        right: Arc<LogicalPlanNode>,
    },
    /// Any node kind without dedicated handling.
    Generic {
        /// Node type tag.
        type_tag: String,
        /// Node attributes.
        #[serde(default)]
        attributes: BTreeMap<String, String>,
        /// Inputs in order.
        #[serde(default)]
        children: Vec<Arc<LogicalPlanNode>>,
    },
}

impl LogicalPlanNode {
    // ========== Constructors ==========

    /// Scan a table with unknown columns.
    pub fn scan(table: impl Into<String>) -> Self {
        Self::Scan {
            table: table.into(),
            columns: Vec::new(),
        }
    }

    /// Scan a table with known output columns.
    pub fn scan_with_columns<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Scan {
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Filter `input` by `predicate`.
    pub fn filter(predicate: Expr, input: impl Into<Arc<Self>>) -> Self {
        Self::Filter {
            predicate,
            input: input.into(),
        }
    }

    /// Project `exprs` from `input`.
    pub fn project(exprs: Vec<Expr>, input: impl Into<Arc<Self>>) -> Self {
        Self::Project {
            exprs,
            input: input.into(),
        }
    }

    /// Join two inputs.
    pub fn join(
        kind: JoinKind,
        condition: Expr,
        left: impl Into<Arc<Self>>,
        right: impl Into<Arc<Self>>,
    ) -> Self {
        Self::Join {
            kind,
            condition,
            left: left.into(),
            right: right.into(),
        }
    }

    /// Aggregate `input`.
    pub fn aggregate(
        group_keys: Vec<Expr>,
        calls: Vec<AggregateCall>,
        input: impl Into<Arc<Self>>,
    ) -> Self {
        Self::Aggregate {
            group_keys,
            calls,
            input: input.into(),
        }
    }

    /// Sort `input` without limit.
    pub fn sort(keys: Vec<SortKey>, input: impl Into<Arc<Self>>) -> Self {
        Self::Sort {
            keys,
            fetch: None,
            offset: None,
            input: input.into(),
        }
    }

    /// N-ary set operation.
    pub fn set_op(kind: SetOpKind, all: bool, children: Vec<Arc<Self>>) -> Self {
        Self::SetOp {
            kind,
            all,
            children,
        }
    }

    /// Correlated join.
    pub fn correlate(
        correlation: CorrelationId,
        kind: JoinKind,
        left: impl Into<Arc<Self>>,
        right: impl Into<Arc<Self>>,
    ) -> Self {
        Self::Correlate {
            correlation,
            kind,
            left: left.into(),
            right: right.into(),
        }
    }

    /// Node without dedicated handling.
    pub fn generic(
        type_tag: impl Into<String>,
        attributes: BTreeMap<String, String>,
        children: Vec<Arc<Self>>,
    ) -> Self {
        Self::Generic {
            type_tag: type_tag.into(),
            attributes,
            children,
        }
    }

    // ========== Accessors ==========

    /// Type tag of this node.
    pub fn name(&self) -> &str {
        match self {
            Self::Scan { .. } => "Scan",
            Self::Filter { .. } => "Filter",
            Self::Project { .. } => "Project",
            Self::Join { .. } => "Join",
            Self::Aggregate { .. } => "Aggregate",
            Self::Sort { .. } => "Sort",
            Self::SetOp { kind, .. } => kind.name(),
            Self::Correlate { .. } => "Correlate",
            Self::Generic { type_tag, .. } => type_tag,
        }
    }

    /// Inputs in order.
    pub fn inputs(&self) -> Vec<&Arc<LogicalPlanNode>> {
        match self {
            Self::Scan { .. } => vec![],
            Self::Filter { input, .. }
            | Self::Project { input, .. }
            | Self::Aggregate { input, .. }
            | Self::Sort { input, .. } => vec![input],
            Self::Join { left, right, .. } | Self::Correlate { left, right, .. } => {
                vec![left, right]
            }
            Self::SetOp { children, .. } | Self::Generic { children, .. } => {
                children.iter().collect()
            }
        }
    }

    /// Number of inputs.
    pub fn input_count(&self) -> usize {
        self.inputs().len()
    }

    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.inputs().is_empty()
    }

    /// Scalar expressions attached to this node (not descending into inputs).
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            Self::Scan { .. } | Self::SetOp { .. } | Self::Correlate { .. } | Self::Generic { .. } => {
                vec![]
            }
            Self::Filter { predicate, .. } => vec![predicate],
            Self::Project { exprs, .. } => exprs.iter().collect(),
            Self::Join { condition, .. } => vec![condition],
            Self::Aggregate {
                group_keys, calls, ..
            } => group_keys
                .iter()
                .chain(calls.iter().flat_map(|c| c.args.iter()))
                .collect(),
            Self::Sort {
                keys,
                fetch,
                offset,
                ..
            } => keys
                .iter()
                .map(|k| &k.expr)
                .chain(fetch.iter())
                .chain(offset.iter())
                .collect(),
        }
    }

    /// Number of output columns, where derivable.
    pub fn output_width(&self) -> Option<usize> {
        match self {
            Self::Scan { columns, .. } => (!columns.is_empty()).then_some(columns.len()),
            Self::Filter { input, .. } | Self::Sort { input, .. } => input.output_width(),
            Self::Project { exprs, .. } => Some(exprs.len()),
            Self::Join {
                kind, left, right, ..
            }
            | Self::Correlate {
                kind, left, right, ..
            } => {
                if kind.projects_left_only() {
                    left.output_width()
                } else {
                    Some(left.output_width()? + right.output_width()?)
                }
            }
            Self::Aggregate {
                group_keys, calls, ..
            } => Some(group_keys.len() + calls.len()),
            Self::SetOp { children, .. } => children.first().and_then(|c| c.output_width()),
            Self::Generic { .. } => None,
        }
    }

    // ========== Traversal ==========

    /// Count the number of operators in the plan.
    pub fn operator_count(&self) -> usize {
        1 + self
            .inputs()
            .iter()
            .map(|i| i.operator_count())
            .sum::<usize>()
    }

    /// Get the maximum depth of the plan tree.
    pub fn depth(&self) -> usize {
        1 + self
            .inputs()
            .iter()
            .map(|i| i.depth())
            .max()
            .unwrap_or(0)
    }

    /// Check if the plan contains a node satisfying `predicate`.
    pub fn contains_node<F>(&self, predicate: F) -> bool
    where
        F: Fn(&LogicalPlanNode) -> bool,
    {
        fn check<F>(node: &LogicalPlanNode, predicate: &F) -> bool
        where
            F: Fn(&LogicalPlanNode) -> bool,
        {
            predicate(node) || node.inputs().iter().any(|i| check(i, predicate))
        }
        check(self, &predicate)
    }

    /// Rebuild this node with each input replaced by `f(input)`.
    #[must_use]
    pub fn map_children<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&Arc<LogicalPlanNode>) -> Arc<LogicalPlanNode>,
    {
        match self {
            Self::Scan { .. } => self.clone(),
            Self::Filter { predicate, input } => Self::Filter {
                predicate: predicate.clone(),
                input: f(input),
            },
            Self::Project { exprs, input } => Self::Project {
                exprs: exprs.clone(),
                input: f(input),
            },
            Self::Join {
                kind,
                condition,
                left,
                right,
            } => Self::Join {
                kind: *kind,
                condition: condition.clone(),
                left: f(left),
                right: f(right),
            },
            Self::Aggregate {
                group_keys,
                calls,
                input,
            } => Self::Aggregate {
                group_keys: group_keys.clone(),
                calls: calls.clone(),
                input: f(input),
            },
            Self::Sort {
                keys,
                fetch,
                offset,
                input,
            } => Self::Sort {
                keys: keys.clone(),
                fetch: fetch.clone(),
                offset: offset.clone(),
                input: f(input),
            },
            Self::SetOp {
                kind,
                all,
                children,
            } => Self::SetOp {
                kind: *kind,
                all: *all,
                children: children.iter().map(&mut f).collect(),
            },
            Self::Correlate {
                correlation,
                kind,
                left,
                right,
            } => Self::Correlate {
                correlation: *correlation,
                kind: *kind,
                left: f(left),
                right: f(right),
            },
            Self::Generic {
                type_tag,
                attributes,
                children,
            } => Self::Generic {
                type_tag: type_tag.clone(),
                attributes: attributes.clone(),
                children: children.iter().map(&mut f).collect(),
            },
        }
    }

    /// Transform the plan by applying `f` to each node (bottom-up).
    ///
    /// Subtrees that `f` leaves untouched keep their original allocation.
    pub fn transform<F>(self: &Arc<Self>, f: &F) -> Arc<Self>
    where
        F: Fn(&LogicalPlanNode) -> Option<LogicalPlanNode>,
    {
        let mut changed = false;
        let rebuilt = self.map_children(|child| {
            let new_child = child.transform(f);
            changed |= !Arc::ptr_eq(&new_child, child);
            new_child
        });
        match f(&rebuilt) {
            Some(replaced) => Arc::new(replaced),
            None if changed => Arc::new(rebuilt),
            None => Arc::clone(self),
        }
    }

    /// Fallible variant of [`LogicalPlanNode::transform`].
    pub fn try_transform<F, E>(self: &Arc<Self>, f: &F) -> Result<Arc<Self>, E>
    where
        F: Fn(&LogicalPlanNode) -> Result<Option<LogicalPlanNode>, E>,
    {
        let mut changed = false;
        let mut failure = None;
        let rebuilt = self.map_children(|child| {
            if failure.is_some() {
                return Arc::clone(child);
            }
            match child.try_transform(f) {
                Ok(new_child) => {
                    changed |= !Arc::ptr_eq(&new_child, child);
                    new_child
                }
                Err(e) => {
                    failure = Some(e);
                    Arc::clone(child)
                }
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        Ok(match f(&rebuilt)? {
            Some(replaced) => Arc::new(replaced),
            None if changed => Arc::new(rebuilt),
            None => Arc::clone(self),
        })
    }

    // ========== Explain ==========

    /// One-line description of this node without its inputs.
    pub fn describe(&self) -> String {
        match self {
            Self::Scan { table, .. } => format!("Scan(table={table})"),
            Self::Filter { predicate, .. } => format!("Filter(condition={predicate})"),
            Self::Project { exprs, .. } => format!("Project(exprs=[{}])", join(exprs)),
            Self::Join {
                kind, condition, ..
            } => format!("Join(kind={kind}, condition={condition})"),
            Self::Aggregate {
                group_keys, calls, ..
            } => format!(
                "Aggregate(group=[{}], calls=[{}])",
                join(group_keys),
                join(calls)
            ),
            Self::Sort {
                keys,
                fetch,
                offset,
                ..
            } => {
                let mut out = format!("Sort(keys=[{}]", join(keys));
                if let Some(fetch) = fetch {
                    let _ = write!(out, ", fetch={fetch}");
                }
                if let Some(offset) = offset {
                    let _ = write!(out, ", offset={offset}");
                }
                out.push(')');
                out
            }
            Self::SetOp { kind, all, .. } => format!("{kind}(all={all})"),
            Self::Correlate {
                correlation, kind, ..
            } => format!("Correlate(correlation={correlation}, kind={kind})"),
            Self::Generic {
                type_tag,
                attributes,
                ..
            } => {
                let attrs = attributes
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{type_tag}({attrs})")
            }
        }
    }

    /// Indented explanation, one node per line.
    ///
    /// This plain traversal performs no normalization and serves as the raw
    /// structural digest of the plan.
    pub fn explain(&self) -> String {
        let mut output = String::new();
        self.explain_into(0, &mut output);
        output
    }

    fn explain_into(&self, indent: usize, output: &mut String) {
        output.push_str(&"  ".repeat(indent));
        output.push_str(&self.describe());
        output.push('\n');
        for input in self.inputs() {
            input.explain_into(indent + 1, output);
        }
    }

    /// Box-drawing rendering of the plan.
    pub fn display_tree(&self) -> String {
        DisplayTree::new(self).to_string()
    }
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl std::fmt::Display for LogicalPlanNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())?;
        let inputs = self.inputs();
        if !inputs.is_empty() {
            write!(f, "[")?;
            for (i, input) in inputs.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{input}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

impl TreeNode for LogicalPlanNode {
    fn label(&self) -> Cow<'_, str> {
        Cow::Owned(self.describe())
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        self.inputs()
            .into_iter()
            .map(|i| i.as_ref() as &dyn TreeNode)
            .collect()
    }
}

/// Builder for constructing logical plans fluently.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    node: LogicalPlanNode,
}

impl PlanBuilder {
    /// Start building from a scan.
    pub fn scan(table: impl Into<String>) -> Self {
        Self {
            node: LogicalPlanNode::scan(table),
        }
    }

    /// Start building from a scan with known columns.
    pub fn scan_with_columns<I, S>(table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            node: LogicalPlanNode::scan_with_columns(table, columns),
        }
    }

    /// Start building from an existing node.
    pub fn from_node(node: LogicalPlanNode) -> Self {
        Self { node }
    }

    /// Add a filter.
    pub fn filter(self, predicate: Expr) -> Self {
        Self {
            node: LogicalPlanNode::filter(predicate, self.node),
        }
    }

    /// Add a project.
    pub fn project(self, exprs: Vec<Expr>) -> Self {
        Self {
            node: LogicalPlanNode::project(exprs, self.node),
        }
    }

    /// Join with `right`.
    pub fn join(self, kind: JoinKind, condition: Expr, right: impl Into<Arc<LogicalPlanNode>>) -> Self {
        Self {
            node: LogicalPlanNode::join(kind, condition, self.node, right),
        }
    }

    /// Add an aggregate.
    pub fn aggregate(self, group_keys: Vec<Expr>, calls: Vec<AggregateCall>) -> Self {
        Self {
            node: LogicalPlanNode::aggregate(group_keys, calls, self.node),
        }
    }

    /// Add a sort.
    pub fn sort(self, keys: Vec<SortKey>) -> Self {
        Self {
            node: LogicalPlanNode::sort(keys, self.node),
        }
    }

    /// Add a sort with limit and offset.
    pub fn sort_limit(self, keys: Vec<SortKey>, fetch: Option<Expr>, offset: Option<Expr>) -> Self {
        Self {
            node: LogicalPlanNode::Sort {
                keys,
                fetch,
                offset,
                input: Arc::new(self.node),
            },
        }
    }

    /// Add a limit without ordering.
    pub fn limit(self, fetch: Expr) -> Self {
        self.sort_limit(vec![], Some(fetch), None)
    }

    /// Combine with `others` in a set operation.
    pub fn set_op(self, kind: SetOpKind, all: bool, others: Vec<Arc<LogicalPlanNode>>) -> Self {
        let mut children = vec![Arc::new(self.node)];
        children.extend(others);
        Self {
            node: LogicalPlanNode::set_op(kind, all, children),
        }
    }

    /// Build the final plan.
    pub fn build(self) -> LogicalPlanNode {
        self.node
    }

    /// Build the final plan behind an [`Arc`].
    pub fn build_arc(self) -> Arc<LogicalPlanNode> {
        Arc::new(self.node)
    }
}

impl From<LogicalPlanNode> for PlanBuilder {
    fn from(node: LogicalPlanNode) -> Self {
        Self::from_node(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, col_idx, lit};

    fn orders_customer() -> LogicalPlanNode {
        PlanBuilder::scan("orders")
            .join(
                JoinKind::Inner,
                col("o_custkey").eq(col("c_custkey")),
                LogicalPlanNode::scan("customer"),
            )
            .build()
    }

    #[test]
    fn test_plan_creation() {
        let plan = LogicalPlanNode::scan("lineitem");

        assert_eq!(plan.operator_count(), 1);
        assert_eq!(plan.depth(), 1);
        assert!(plan.is_leaf());
        assert_eq!(plan.output_width(), None);
    }

    #[test]
    fn test_plan_builder() {
        let plan = PlanBuilder::scan("orders")
            .filter(col("o_totalprice").gt(lit("1000")))
            .project(vec![col("o_orderkey"), col("o_totalprice")])
            .limit(lit("10"))
            .build();

        assert_eq!(plan.operator_count(), 4);
        assert_eq!(plan.depth(), 4);
        assert!(plan.contains_node(|n| matches!(n, LogicalPlanNode::Filter { .. })));
        assert_eq!(plan.output_width(), Some(2));
    }

    #[test]
    fn test_explain_is_indented() {
        let explain = orders_customer().explain();
        assert_eq!(
            explain,
            "Join(kind=INNER, condition==(o_custkey, c_custkey))\n  Scan(table=orders)\n  Scan(table=customer)\n"
        );
    }

    #[test]
    fn test_display_is_single_line() {
        let plan = PlanBuilder::scan("nation")
            .filter(col_idx(0).eq(lit("3")))
            .build();
        assert_eq!(
            plan.to_string(),
            "Filter(condition==($0, 3))[Scan(table=nation)]"
        );
    }

    #[test]
    fn test_display_tree() {
        let rendered = orders_customer().display_tree();
        assert!(rendered.starts_with("Join(kind=INNER"));
        assert!(rendered.contains("├─ Scan(table=orders)"));
        assert!(rendered.contains("└─ Scan(table=customer)"));
    }

    #[test]
    fn test_output_width() {
        let orders = LogicalPlanNode::scan_with_columns("orders", ["o_orderkey", "o_custkey"]);
        let customer = LogicalPlanNode::scan_with_columns("customer", ["c_custkey"]);

        let inner = LogicalPlanNode::join(JoinKind::Inner, lit("true"), orders.clone(), customer.clone());
        assert_eq!(inner.output_width(), Some(3));

        let semi = LogicalPlanNode::join(JoinKind::Semi, lit("true"), orders, customer);
        assert_eq!(semi.output_width(), Some(2));

        let agg = LogicalPlanNode::aggregate(
            vec![col_idx(0)],
            vec![AggregateCall::count_star(), AggregateCall::sum(col_idx(1))],
            semi,
        );
        assert_eq!(agg.output_width(), Some(3));
    }

    #[test]
    fn test_transform_preserves_untouched_subtrees() {
        let shared = Arc::new(LogicalPlanNode::scan("part"));
        let plan = Arc::new(LogicalPlanNode::join(
            JoinKind::Inner,
            lit("true"),
            Arc::clone(&shared),
            LogicalPlanNode::filter(lit("true"), Arc::clone(&shared)),
        ));

        let unchanged = plan.transform(&|_| None);
        assert!(Arc::ptr_eq(&unchanged, &plan));

        let stripped = plan.transform(&|node| match node {
            LogicalPlanNode::Filter { predicate, input } if predicate.is_true_literal() => {
                Some(input.as_ref().clone())
            }
            _ => None,
        });
        assert_eq!(stripped.operator_count(), 3);
        assert!(!stripped.contains_node(|n| matches!(n, LogicalPlanNode::Filter { .. })));
    }

    #[test]
    fn test_try_transform_propagates_error() {
        let plan = Arc::new(orders_customer());
        let result: Result<_, String> = plan.try_transform(&|node| match node {
            LogicalPlanNode::Scan { table, .. } if table == "customer" => {
                Err(format!("cannot rewrite {table}"))
            }
            _ => Ok(None),
        });
        assert_eq!(result.unwrap_err(), "cannot rewrite customer");
    }

    #[test]
    fn test_serde_roundtrip() {
        let plan = PlanBuilder::scan("region")
            .aggregate(vec![col_idx(1)], vec![AggregateCall::count_star()])
            .set_op(SetOpKind::Union, true, vec![Arc::new(LogicalPlanNode::scan("nation"))])
            .build();

        let json = serde_json::to_string(&plan).unwrap();
        let parsed: LogicalPlanNode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, plan);
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{"Filter": {"predicate": {"Literal": "true"}, "input": {"Scan": {"table": "orders"}}}}"#;
        let plan: LogicalPlanNode = serde_json::from_str(json).unwrap();
        assert_eq!(plan.name(), "Filter");
        assert_eq!(plan.input_count(), 1);
    }
}
