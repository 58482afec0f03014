//! Scalar expression tree.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::OperatorKind;
use crate::LogicalPlanNode;

/// Identifier of a correlation variable shared by a correlated subquery and
/// the operator that binds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorrelationId(pub u32);

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "$cor{}", self.0)
    }
}

/// A reference to an input column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRef {
    /// Positional reference into the input row (`$n`).
    Index(usize),
    /// Qualified or bare column name.
    Named(String),
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "${i}"),
            Self::Named(name) => write!(f, "{name}"),
        }
    }
}

/// Scalar expression used in predicates, projections and aggregate arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Column reference.
    Column(ColumnRef),
    /// Literal in its textual form (`10`, `'GERMANY'`, `true`).
    Literal(String),
    /// Operator application.
    Call {
        /// Operator.
        op: OperatorKind,
        /// Operands in source order.
        operands: Vec<Expr>,
    },
    /// Scalar subquery producing a single value.
    ScalarSubquery {
        /// The subquery plan.
        plan: Arc<LogicalPlanNode>,
        /// Correlation variable the subquery reads, if correlated.
        correlation: Option<CorrelationId>,
    },
    /// Reference to a column of the enclosing query through a correlation variable.
    OuterRef {
        /// Correlation variable.
        correlation: CorrelationId,
        /// Column of the correlated (left) input.
        column: ColumnRef,
    },
}

impl Expr {
    // ========== Constructors ==========

    /// Create a call expression.
    pub fn call(op: OperatorKind, operands: Vec<Expr>) -> Self {
        Self::Call { op, operands }
    }

    /// Create a boolean `true` literal.
    pub fn true_literal() -> Self {
        Self::Literal("true".to_string())
    }

    /// Create a boolean `false` literal.
    pub fn false_literal() -> Self {
        Self::Literal("false".to_string())
    }

    /// Create a cast of `self` to `target`.
    #[must_use]
    pub fn cast(self, target: impl Into<String>) -> Self {
        Self::call(OperatorKind::Cast(target.into()), vec![self])
    }

    /// Create a scalar subquery.
    pub fn scalar_subquery(plan: LogicalPlanNode, correlation: Option<CorrelationId>) -> Self {
        Self::ScalarSubquery {
            plan: Arc::new(plan),
            correlation,
        }
    }

    /// Create a correlated reference to an outer column.
    pub fn outer_ref(correlation: CorrelationId, column: ColumnRef) -> Self {
        Self::OuterRef {
            correlation,
            column,
        }
    }

    /// Build a conjunction; an empty list yields `true` and a singleton yields itself.
    pub fn conjunction(mut conjuncts: Vec<Expr>) -> Self {
        match conjuncts.len() {
            0 => Self::true_literal(),
            1 => conjuncts.remove(0),
            _ => Self::call(OperatorKind::And, conjuncts),
        }
    }

    // ========== Convenience builders ==========

    fn binary(self, op: OperatorKind, other: Expr) -> Self {
        Self::call(op, vec![self, other])
    }

    /// Logical AND.
    #[must_use]
    pub fn and(self, other: Expr) -> Self {
        self.binary(OperatorKind::And, other)
    }

    /// Logical OR.
    #[must_use]
    pub fn or(self, other: Expr) -> Self {
        self.binary(OperatorKind::Or, other)
    }

    /// Logical NOT.
    #[must_use]
    pub fn not(self) -> Self {
        Self::call(OperatorKind::Not, vec![self])
    }

    /// Equality comparison.
    #[must_use]
    pub fn eq(self, other: Expr) -> Self {
        self.binary(OperatorKind::Equals, other)
    }

    /// Inequality comparison.
    #[must_use]
    pub fn not_eq(self, other: Expr) -> Self {
        self.binary(OperatorKind::NotEquals, other)
    }

    /// Greater than comparison.
    #[must_use]
    pub fn gt(self, other: Expr) -> Self {
        self.binary(OperatorKind::GreaterThan, other)
    }

    /// Greater than or equal comparison.
    #[must_use]
    pub fn gt_eq(self, other: Expr) -> Self {
        self.binary(OperatorKind::GreaterThanOrEqual, other)
    }

    /// Less than comparison.
    #[must_use]
    pub fn lt(self, other: Expr) -> Self {
        self.binary(OperatorKind::LessThan, other)
    }

    /// Less than or equal comparison.
    #[must_use]
    pub fn lt_eq(self, other: Expr) -> Self {
        self.binary(OperatorKind::LessThanOrEqual, other)
    }

    /// Addition.
    #[must_use]
    pub fn plus(self, other: Expr) -> Self {
        self.binary(OperatorKind::Plus, other)
    }

    /// Subtraction.
    #[must_use]
    pub fn minus(self, other: Expr) -> Self {
        self.binary(OperatorKind::Minus, other)
    }

    /// Multiplication.
    #[must_use]
    pub fn times(self, other: Expr) -> Self {
        self.binary(OperatorKind::Times, other)
    }

    // ========== Inspection ==========

    /// Whether this is the literal `true` (case-insensitive).
    pub fn is_true_literal(&self) -> bool {
        matches!(self, Self::Literal(v) if v.eq_ignore_ascii_case("true"))
    }

    /// Whether this is the literal `false` (case-insensitive).
    pub fn is_false_literal(&self) -> bool {
        matches!(self, Self::Literal(v) if v.eq_ignore_ascii_case("false"))
    }

    /// Whether this is a plain column reference.
    pub const fn is_column(&self) -> bool {
        matches!(self, Self::Column(_))
    }

    /// The positional index if this is a `$n` reference.
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Column(ColumnRef::Index(i)) => Some(*i),
            _ => None,
        }
    }

    /// Split into top-level AND conjuncts, flattening nested ANDs.
    pub fn conjuncts(&self) -> Vec<&Expr> {
        fn collect<'a>(expr: &'a Expr, out: &mut Vec<&'a Expr>) {
            match expr {
                Expr::Call {
                    op: OperatorKind::And,
                    operands,
                } => operands.iter().for_each(|o| collect(o, out)),
                other => out.push(other),
            }
        }
        let mut out = Vec::new();
        collect(self, &mut out);
        out
    }

    /// Owned variant of [`Expr::conjuncts`].
    pub fn into_conjuncts(self) -> Vec<Expr> {
        match self {
            Self::Call {
                op: OperatorKind::And,
                operands,
            } => operands.into_iter().flat_map(Expr::into_conjuncts).collect(),
            other => vec![other],
        }
    }

    /// Visit this expression and all sub-expressions (pre-order).
    ///
    /// Does not descend into scalar subquery plans.
    pub fn visit<F: FnMut(&Expr)>(&self, f: &mut F) {
        f(self);
        if let Self::Call { operands, .. } = self {
            for operand in operands {
                operand.visit(f);
            }
        }
    }

    /// Whether any sub-expression satisfies `predicate`.
    pub fn any<F: Fn(&Expr) -> bool>(&self, predicate: F) -> bool {
        let mut found = false;
        self.visit(&mut |e| found = found || predicate(e));
        found
    }

    /// Whether the expression embeds a scalar subquery.
    pub fn contains_subquery(&self) -> bool {
        self.any(|e| matches!(e, Expr::ScalarSubquery { .. }))
    }

    /// Whether the expression references the given correlation variable.
    pub fn references_correlation(&self, id: CorrelationId) -> bool {
        self.any(|e| matches!(e, Expr::OuterRef { correlation, .. } if *correlation == id))
    }

    /// Largest positional index referenced, if any.
    pub fn max_index(&self) -> Option<usize> {
        let mut max = None;
        self.visit(&mut |e| {
            if let Some(i) = e.as_index() {
                max = Some(max.map_or(i, |m: usize| m.max(i)));
            }
        });
        max
    }

    /// Whether all positional references lie in `range`.
    pub fn indices_within(&self, range: std::ops::Range<usize>) -> bool {
        !self.any(|e| e.as_index().is_some_and(|i| !range.contains(&i)))
    }

    /// Whether the expression uses only positional column references.
    pub fn is_positional(&self) -> bool {
        !self.any(|e| {
            matches!(
                e,
                Expr::Column(ColumnRef::Named(_)) | Expr::ScalarSubquery { .. } | Expr::OuterRef { .. }
            )
        })
    }

    // ========== Rewriting ==========

    /// Rewrite bottom-up, applying `f` to every node after its operands.
    pub fn rewrite<F: FnMut(Expr) -> Expr>(self, f: &mut F) -> Expr {
        let rebuilt = match self {
            Self::Call { op, operands } => Self::Call {
                op,
                operands: operands.into_iter().map(|o| o.rewrite(f)).collect(),
            },
            other => other,
        };
        f(rebuilt)
    }

    /// Shift every positional reference `$i` with `i >= from` by `delta`.
    #[must_use]
    pub fn shift_indices(self, from: usize, delta: isize) -> Expr {
        self.rewrite(&mut |e| match e {
            Expr::Column(ColumnRef::Index(i)) if i >= from => {
                Expr::Column(ColumnRef::Index(i.saturating_add_signed(delta)))
            }
            other => other,
        })
    }

    /// Replace every `$i` with `exprs[i]`; `None` if an index is out of range.
    pub fn substitute_indices(&self, exprs: &[Expr]) -> Option<Expr> {
        if !self.indices_within(0..exprs.len()) {
            return None;
        }
        Some(self.clone().rewrite(&mut |e| match e.as_index() {
            Some(i) => exprs[i].clone(),
            None => e,
        }))
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column(col) => write!(f, "{col}"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Call {
                op: OperatorKind::Cast(target),
                operands,
            } => {
                write!(f, "CAST(")?;
                write_operands(f, operands)?;
                write!(f, " AS {target})")
            }
            Self::Call { op, operands } => {
                write!(f, "{op}(")?;
                write_operands(f, operands)?;
                write!(f, ")")
            }
            Self::ScalarSubquery { plan, correlation } => match correlation {
                Some(id) => write!(f, "$SCALAR_QUERY[{id}]({plan})"),
                None => write!(f, "$SCALAR_QUERY({plan})"),
            },
            Self::OuterRef {
                correlation,
                column,
            } => write!(f, "{correlation}.{column}"),
        }
    }
}

fn write_operands(f: &mut std::fmt::Formatter<'_>, operands: &[Expr]) -> std::fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{operand}")?;
    }
    Ok(())
}

impl From<ColumnRef> for Expr {
    fn from(col: ColumnRef) -> Self {
        Self::Column(col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, col_idx, lit};

    #[test]
    fn test_expression_building() {
        let expr = col("o_orderdate").gt_eq(lit("'1994-01-01'"));

        assert!(matches!(
            expr,
            Expr::Call {
                op: OperatorKind::GreaterThanOrEqual,
                ..
            }
        ));
        assert_eq!(expr.to_string(), ">=(o_orderdate, '1994-01-01')");
    }

    #[test]
    fn test_cast_display() {
        let expr = col_idx(3).cast("DECIMAL(15, 2)");
        assert_eq!(expr.to_string(), "CAST($3 AS DECIMAL(15, 2))");
    }

    #[test]
    fn test_conjuncts_flatten_nested_and() {
        let expr = col("a")
            .gt(lit("10"))
            .and(col("b").eq(lit("5")))
            .and(col("c").lt(lit("3")));

        let conjuncts = expr.conjuncts();
        assert_eq!(conjuncts.len(), 3);
        assert_eq!(conjuncts[2].to_string(), "<(c, 3)");
        assert_eq!(expr.into_conjuncts().len(), 3);
    }

    #[test]
    fn test_conjunction_builder() {
        assert!(Expr::conjunction(vec![]).is_true_literal());
        assert_eq!(Expr::conjunction(vec![col("a")]), col("a"));
        assert_eq!(
            Expr::conjunction(vec![col("a"), col("b")]).to_string(),
            "AND(a, b)"
        );
    }

    #[test]
    fn test_index_helpers() {
        let expr = col_idx(0).eq(col_idx(4));
        assert_eq!(expr.max_index(), Some(4));
        assert!(expr.indices_within(0..5));
        assert!(!expr.indices_within(0..4));

        let shifted = expr.clone().shift_indices(2, -2);
        assert_eq!(shifted.to_string(), "=($0, $2)");

        let substituted = expr
            .substitute_indices(&[col("x"), col("y"), col("z"), col("w"), col("v")])
            .unwrap();
        assert_eq!(substituted.to_string(), "=(x, v)");
        assert!(col_idx(9).substitute_indices(&[col("x")]).is_none());
    }

    #[test]
    fn test_correlation_detection() {
        let id = CorrelationId(0);
        let expr = col("l_partkey").eq(Expr::outer_ref(id, ColumnRef::Named("p_partkey".into())));

        assert!(expr.references_correlation(id));
        assert!(!expr.references_correlation(CorrelationId(1)));
        assert_eq!(expr.to_string(), "=(l_partkey, $cor0.p_partkey)");
        assert!(!expr.is_positional());
    }

    #[test]
    fn test_literal_predicates() {
        assert!(lit("TRUE").is_true_literal());
        assert!(lit("false").is_false_literal());
        assert!(!lit("'true'").is_true_literal());
    }
}
