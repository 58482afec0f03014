//! Scalar expression canonicalization.

use std::borrow::Cow;

use log::trace;
use planeq_logical::{ColumnRef, Expr, OperatorKind};

use crate::normalize::POSITION_PLACEHOLDER;
use crate::Canonicalizer;

/// Remove every cast, replacing each with its (stripped) operand.
///
/// Only calls whose operands actually changed are rebuilt.
pub fn strip_casts(expr: &Expr) -> Cow<'_, Expr> {
    match expr {
        Expr::Call {
            op: OperatorKind::Cast(_),
            operands,
        } if operands.len() == 1 => strip_casts(&operands[0]),
        Expr::Call { op, operands } => {
            let stripped: Vec<Cow<'_, Expr>> = operands.iter().map(strip_casts).collect();
            let unchanged = stripped
                .iter()
                .zip(operands)
                .all(|(s, original)| std::ptr::eq(s.as_ref(), original));
            if unchanged {
                Cow::Borrowed(expr)
            } else {
                Cow::Owned(Expr::Call {
                    op: op.clone(),
                    operands: stripped.into_iter().map(Cow::into_owned).collect(),
                })
            }
        }
        _ => Cow::Borrowed(expr),
    }
}

impl Canonicalizer {
    /// Canonical string form of `expr`.
    ///
    /// Positional references are placeheld structurally while rendering;
    /// literal and name text is never rewritten.
    pub fn expr(&mut self, expr: &Expr) -> String {
        let stripped = strip_casts(expr);
        let rendered = self.render(&stripped);
        trace!("canonical expr {expr} => {rendered}");
        rendered
    }

    /// Canonical forms of the top-level conjuncts of `predicate`, with
    /// tautologies dropped, deduplicated and sorted.
    ///
    /// Conjuncts are canonicalized before deduplication so that `a = b` and
    /// `b = a` collapse.
    pub fn conjunct_set<'a, I>(&mut self, predicates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a Expr>,
    {
        let mut conjuncts: Vec<String> = Vec::new();
        for predicate in predicates {
            let stripped = strip_casts(predicate);
            for conjunct in stripped.conjuncts() {
                let canonical = self.expr(conjunct);
                if !canonical.eq_ignore_ascii_case("true") && !conjuncts.contains(&canonical) {
                    conjuncts.push(canonical);
                }
            }
        }
        conjuncts.sort();
        conjuncts
    }

    fn render(&mut self, expr: &Expr) -> String {
        match expr {
            Expr::Column(ColumnRef::Index(_)) => POSITION_PLACEHOLDER.to_string(),
            Expr::Column(ColumnRef::Named(name)) => name.clone(),
            Expr::Literal(value) => value.clone(),
            Expr::OuterRef { column, .. } => match column {
                ColumnRef::Index(_) => format!("$cor.{POSITION_PLACEHOLDER}"),
                ColumnRef::Named(name) => format!("$cor.{name}"),
            },
            Expr::ScalarSubquery { plan, .. } => {
                format!("$SCALAR_QUERY({})", self.plan(plan))
            }
            Expr::Call {
                op: OperatorKind::Cast(_),
                operands,
            } if operands.len() == 1 => self.render(&operands[0]),
            Expr::Call { op, operands } if op.is_commutative() => {
                let mut flat = Vec::new();
                flatten_same_op(op, operands, &mut flat);
                let mut rendered: Vec<String> = flat.into_iter().map(|o| self.render(o)).collect();
                rendered.sort();
                format!("({})", rendered.join(&format!(" {} ", op.name())))
            }
            Expr::Call { op, operands } if op.is_symmetric_comparison() && operands.len() == 2 => {
                let mut pair = [self.render(&operands[0]), self.render(&operands[1])];
                pair.sort();
                format!("({} {} {})", pair[0], op.name(), pair[1])
            }
            Expr::Call { op, operands } if op.is_ordering_comparison() && operands.len() == 2 => {
                let lhs = self.render(&operands[0]);
                let rhs = self.render(&operands[1]);
                // `a > b` is `b < a`
                let (op, lhs, rhs) = match op {
                    OperatorKind::GreaterThan => (OperatorKind::LessThan, rhs, lhs),
                    OperatorKind::GreaterThanOrEqual => (OperatorKind::LessThanOrEqual, rhs, lhs),
                    other => (other.clone(), lhs, rhs),
                };
                let (op, lhs, rhs) = if lhs > rhs {
                    (op.reversed().unwrap_or(op), rhs, lhs)
                } else {
                    (op, lhs, rhs)
                };
                format!("({lhs} {} {rhs})", op.name())
            }
            Expr::Call { op, operands } => {
                let rendered: Vec<String> = operands.iter().map(|o| self.render(o)).collect();
                format!("{}({})", op.name(), rendered.join(","))
            }
        }
    }
}

/// Collect the operands of nested applications of the same commutative operator.
fn flatten_same_op<'a>(op: &OperatorKind, operands: &'a [Expr], out: &mut Vec<&'a Expr>) {
    for operand in operands {
        match operand {
            Expr::Call {
                op: inner,
                operands: nested,
            } if inner == op => flatten_same_op(op, nested, out),
            other => out.push(other),
        }
    }
}
