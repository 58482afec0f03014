//! planeq - query plan canonicalization and equivalence checking
//!
//! planeq decides whether two relational query plans compute the same
//! result. Plans are compared through a ladder of increasingly tolerant
//! structural tiers, optionally assisted by an external rule advisor and a
//! physical-plan oracle. A comparison that cannot be proven never reports
//! equivalence.

#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

// Re-export layer crates
pub use common_config as config;
pub use common_display as display;
pub use common_error as error;
pub use planeq_canonical as canonical;
pub use planeq_equivalence as equivalence;
pub use planeq_logical as logical;
pub use planeq_optimizer as optimizer;
pub use planeq_tree as tree;

use std::sync::Arc;

use planeq_equivalence::{Decision, EquivalenceChecker, JsonPlanSource};
use planeq_logical::LogicalPlanNode;

/// planeq version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compare two plans through the structural tiers with the default configuration.
pub fn compare_plans(a: &Arc<LogicalPlanNode>, b: &Arc<LogicalPlanNode>) -> Decision {
    EquivalenceChecker::new(JsonPlanSource).compare_plans(a, b)
}
