//! Expression terms for tree labels.
//!
//! Expressions are first lowered into a small term tree, normalized there,
//! and only then printed.

use planeq_logical::{ColumnRef, Expr, OperatorKind};

use crate::TreeBuilder;

/// Normalized expression term.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Term {
    Atom(String),
    Apply { head: String, args: Vec<Term> },
}

impl Term {
    fn apply(head: impl Into<String>, args: Vec<Term>) -> Self {
        Self::Apply {
            head: head.into(),
            args,
        }
    }

    pub(crate) fn print(&self) -> String {
        match self {
            Self::Atom(text) => text.clone(),
            Self::Apply { head, args } => {
                let args: Vec<String> = args.iter().map(Term::print).collect();
                format!("{head}{{{}}}", args.join(" "))
            }
        }
    }

    pub(crate) fn is_true(&self) -> bool {
        matches!(self, Self::Atom(text) if text.eq_ignore_ascii_case("true"))
    }
}

impl TreeBuilder {
    /// Lower an expression to a normalized term.
    pub(crate) fn term(&mut self, expr: &Expr) -> Term {
        match expr {
            Expr::Column(ColumnRef::Index(_)) => Term::Atom("?".to_string()),
            Expr::Column(ColumnRef::Named(name)) => Term::Atom(name.clone()),
            Expr::Literal(value) => Term::Atom(value.clone()),
            Expr::OuterRef { column, .. } => {
                let column = match column {
                    ColumnRef::Index(_) => "?".to_string(),
                    ColumnRef::Named(name) => name.clone(),
                };
                Term::apply("outer", vec![Term::Atom(column)])
            }
            Expr::ScalarSubquery { plan, .. } => {
                let tree = self.build(plan);
                Term::apply("subquery", vec![Term::Atom(tree.digest())])
            }
            Expr::Call { op, operands } => match (op, operands.as_slice()) {
                (OperatorKind::Cast(_), [inner]) => self.term(inner),
                (OperatorKind::And | OperatorKind::Or | OperatorKind::Plus | OperatorKind::Times, _) => {
                    let mut args = Vec::new();
                    for operand in operands {
                        match self.term(operand) {
                            Term::Apply { head, args: nested } if head == op.name() => {
                                args.extend(nested);
                            }
                            other => args.push(other),
                        }
                    }
                    args.sort();
                    Term::apply(op.name(), args)
                }
                (OperatorKind::Equals | OperatorKind::NotEquals, [lhs, rhs]) => {
                    let mut args = vec![self.term(lhs), self.term(rhs)];
                    args.sort();
                    Term::apply(op.name(), args)
                }
                (OperatorKind::LessThan, [lhs, rhs]) => self.less("<", ">", lhs, rhs),
                (OperatorKind::LessThanOrEqual, [lhs, rhs]) => self.less("<=", ">=", lhs, rhs),
                (OperatorKind::GreaterThan, [lhs, rhs]) => self.less("<", ">", rhs, lhs),
                (OperatorKind::GreaterThanOrEqual, [lhs, rhs]) => self.less("<=", ">=", rhs, lhs),
                _ => {
                    let args = operands.iter().map(|o| self.term(o)).collect();
                    Term::apply(op.name(), args)
                }
            },
        }
    }

    /// `lhs <op> rhs` with the smaller term first, mirroring the operator when swapped.
    fn less(&mut self, op: &str, mirrored: &str, lhs: &Expr, rhs: &Expr) -> Term {
        let lhs = self.term(lhs);
        let rhs = self.term(rhs);
        if lhs <= rhs {
            Term::apply(op, vec![lhs, rhs])
        } else {
            Term::apply(mirrored, vec![rhs, lhs])
        }
    }

    /// Top-level conjunct terms with tautologies dropped, deduplicated.
    pub(crate) fn conjunct_terms(&mut self, predicate: &Expr) -> Vec<Term> {
        let mut terms = match self.term(predicate) {
            Term::Apply { head, args } if head == OperatorKind::And.name() => args,
            other => vec![other],
        };
        terms.retain(|t| !t.is_true());
        terms.sort();
        terms.dedup();
        terms
    }
}
