//! Expression trees for logical plans.

#[allow(clippy::module_inception)]
mod expr;
mod operator;

pub use expr::{ColumnRef, CorrelationId, Expr};
pub use operator::OperatorKind;

/// Reference a column by name.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(ColumnRef::Named(name.into()))
}

/// Reference an input column by position (`$n`).
pub fn col_idx(index: usize) -> Expr {
    Expr::Column(ColumnRef::Index(index))
}

/// Literal in its textual form.
pub fn lit(value: impl Into<String>) -> Expr {
    Expr::Literal(value.into())
}

/// Cast `expr` to the named type.
pub fn cast(expr: Expr, target: impl Into<String>) -> Expr {
    expr.cast(target)
}

/// Call a named scalar function.
pub fn call(name: impl Into<String>, operands: Vec<Expr>) -> Expr {
    Expr::call(OperatorKind::Function(name.into()), operands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers() {
        assert_eq!(col("n_name").to_string(), "n_name");
        assert_eq!(col_idx(7).to_string(), "$7");
        assert_eq!(lit("'BUILDING'").to_string(), "'BUILDING'");
        assert_eq!(
            call("SUBSTRING", vec![col("c_phone"), lit("1"), lit("2")]).to_string(),
            "SUBSTRING(c_phone, 1, 2)"
        );
        assert_eq!(cast(col("x"), "BIGINT").to_string(), "CAST(x AS BIGINT)");
    }
}
