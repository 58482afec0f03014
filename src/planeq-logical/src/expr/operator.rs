//! Operator kinds for call expressions.

use serde::{Deserialize, Serialize};

/// The operator of a [`Expr::Call`](super::Expr::Call).
///
/// `Cast` carries its target type name so that it can be rendered in raw
/// digests while remaining structurally distinguishable for elision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorKind {
    // Logical operators
    /// Logical AND (n-ary).
    And,
    /// Logical OR (n-ary).
    Or,
    /// Logical NOT.
    Not,

    // Arithmetic operators
    /// Addition (+).
    Plus,
    /// Subtraction (-).
    Minus,
    /// Multiplication (*).
    Times,
    /// Division (/).
    Divide,

    // Comparison operators
    /// Equality (=).
    Equals,
    /// Inequality (<>).
    NotEquals,
    /// Greater than (>).
    GreaterThan,
    /// Greater than or equal (>=).
    GreaterThanOrEqual,
    /// Less than (<).
    LessThan,
    /// Less than or equal (<=).
    LessThanOrEqual,

    // Predicates
    /// IS NULL.
    IsNull,
    /// IS NOT NULL.
    IsNotNull,
    /// LIKE pattern match.
    Like,
    /// IN list membership; the first operand is the value looked up.
    In,
    /// CASE WHEN ... THEN ... ELSE ... END, operands in source order.
    Case,

    // Conversions and functions
    /// Type conversion to the named target type.
    Cast(String),
    /// Any other named scalar function.
    Function(String),
}

impl OperatorKind {
    /// The operator name used in digests.
    pub fn name(&self) -> &str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Times => "*",
            Self::Divide => "/",
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::Case => "CASE",
            Self::Cast(_) => "CAST",
            Self::Function(name) => name,
        }
    }

    /// Whether operand order never affects the result (and nesting may be flattened).
    pub const fn is_commutative(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Plus | Self::Times)
    }

    /// Whether the operator is a symmetric comparison (`=` or `<>`).
    pub const fn is_symmetric_comparison(&self) -> bool {
        matches!(self, Self::Equals | Self::NotEquals)
    }

    /// Whether the operator is one of the four ordering comparisons.
    pub const fn is_ordering_comparison(&self) -> bool {
        matches!(
            self,
            Self::GreaterThan | Self::GreaterThanOrEqual | Self::LessThan | Self::LessThanOrEqual
        )
    }

    /// The operator obtained by swapping the operands of an ordering comparison.
    pub fn reversed(&self) -> Option<Self> {
        match self {
            Self::GreaterThan => Some(Self::LessThan),
            Self::GreaterThanOrEqual => Some(Self::LessThanOrEqual),
            Self::LessThan => Some(Self::GreaterThan),
            Self::LessThanOrEqual => Some(Self::GreaterThanOrEqual),
            Self::Equals => Some(Self::Equals),
            Self::NotEquals => Some(Self::NotEquals),
            _ => None,
        }
    }

    /// Whether this is a cast.
    pub const fn is_cast(&self) -> bool {
        matches!(self, Self::Cast(_))
    }
}

impl std::fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
