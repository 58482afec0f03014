//! Canonical forms for plans and expressions.
//!
//! `planeq-canonical` reduces scalar expressions and whole plan trees to
//! deterministic digest strings. Two subtrees are structurally equivalent
//! iff their digests are textually equal.
//!
//! The canonical forms are invariant under:
//!
//! - inner-join commutativity and associativity (including through
//!   pass-through projections)
//! - predicate conjunct order, duplicated conjuncts and `true` conjuncts
//! - operand order of commutative and symmetric operators
//! - orientation of ordering comparisons
//! - casts
//! - positional column numbering
//! - set-operation nesting and order (except for EXCEPT minuends)
//! - group key and aggregate call order
//!
//! Projection order, outer-join sides and sort limits are preserved.
//!
//! # Example
//!
//! ```rust
//! use planeq_canonical::canonical_digest;
//! use planeq_logical::{JoinKind, LogicalPlanNode, col};
//!
//! let a = LogicalPlanNode::join(
//!     JoinKind::Inner,
//!     col("o_custkey").eq(col("c_custkey")),
//!     LogicalPlanNode::scan("orders"),
//!     LogicalPlanNode::scan("customer"),
//! );
//! let b = LogicalPlanNode::join(
//!     JoinKind::Inner,
//!     col("c_custkey").eq(col("o_custkey")),
//!     LogicalPlanNode::scan("customer"),
//!     LogicalPlanNode::scan("orders"),
//! );
//! assert_eq!(canonical_digest(&a), canonical_digest(&b));
//! ```

mod expr;
mod normalize;
mod plan;
mod visit;

use planeq_logical::{Expr, LogicalPlanNode};

pub use expr::strip_casts;
pub use normalize::{POSITION_PLACEHOLDER, normalize_digest};
pub use plan::CYCLE_MARKER;
pub use visit::VisitPath;

/// Request-local canonicalization state.
///
/// Holds the active recursion path used for re-entry detection; create one
/// per comparison and never share it between threads.
#[derive(Debug, Default)]
pub struct Canonicalizer {
    path: VisitPath,
}

impl Canonicalizer {
    /// Create a canonicalizer with an empty path.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Canonical string form of a scalar expression.
pub fn canonicalize(expr: &Expr) -> String {
    Canonicalizer::new().expr(expr)
}

/// Canonical digest of a plan.
pub fn canonical_digest(plan: &LogicalPlanNode) -> String {
    Canonicalizer::new().plan(plan)
}

/// Raw structural digest: the plain explain traversal without normalization.
pub fn raw_digest(plan: &LogicalPlanNode) -> String {
    plan.explain()
}

/// Raw digest with positional references placeheld and whitespace collapsed.
pub fn normalized_digest(plan: &LogicalPlanNode) -> String {
    normalize_digest(&plan.explain())
}

#[cfg(test)]
mod tests {
    use planeq_logical::{PlanBuilder, col_idx, lit};

    use super::*;

    #[test]
    fn test_digest_tiers() {
        let a = PlanBuilder::scan("orders").filter(col_idx(1).gt(lit("5"))).build();
        let b = PlanBuilder::scan("orders").filter(col_idx(4).gt(lit("5"))).build();

        assert_ne!(raw_digest(&a), raw_digest(&b));
        assert_eq!(normalized_digest(&a), normalized_digest(&b));
        assert_eq!(normalized_digest(&a), "Filter(condition=>($x, 5)) Scan(table=orders)");
        assert_eq!(canonical_digest(&a), canonical_digest(&b));
    }

    #[test]
    fn test_canonicalizer_is_reusable() {
        let plan = PlanBuilder::scan("region").build();
        let mut canonicalizer = Canonicalizer::new();
        assert_eq!(canonicalizer.plan(&plan), canonicalizer.plan(&plan));
    }
}
