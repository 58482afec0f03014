//! Aggregate calls.

use serde::{Deserialize, Serialize};

use crate::expr::Expr;

/// One aggregate function application inside an `Aggregate` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateCall {
    /// Function name (`SUM`, `COUNT`, ...).
    pub function: String,
    /// Arguments; empty for `COUNT(*)`.
    #[serde(default)]
    pub args: Vec<Expr>,
    /// Whether the call aggregates distinct values only.
    #[serde(default)]
    pub distinct: bool,
}

impl AggregateCall {
    /// Create a call over the given arguments.
    pub fn new(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Self {
            function: function.into(),
            args,
            distinct: false,
        }
    }

    /// `SUM(expr)`.
    pub fn sum(expr: Expr) -> Self {
        Self::new("SUM", vec![expr])
    }

    /// `COUNT(expr)`.
    pub fn count(expr: Expr) -> Self {
        Self::new("COUNT", vec![expr])
    }

    /// `COUNT(*)`.
    pub fn count_star() -> Self {
        Self::new("COUNT", vec![])
    }

    /// `MIN(expr)`.
    pub fn min(expr: Expr) -> Self {
        Self::new("MIN", vec![expr])
    }

    /// `MAX(expr)`.
    pub fn max(expr: Expr) -> Self {
        Self::new("MAX", vec![expr])
    }

    /// `AVG(expr)`.
    pub fn avg(expr: Expr) -> Self {
        Self::new("AVG", vec![expr])
    }

    /// Mark the call DISTINCT.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Whether the call is a COUNT, whose value over an empty group is 0 rather than NULL.
    pub fn is_count(&self) -> bool {
        self.function.eq_ignore_ascii_case("COUNT")
    }
}

impl std::fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.function)?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        if self.args.is_empty() {
            write!(f, "*")?;
        }
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}
