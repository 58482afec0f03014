//! Error types and result aliases for planeq.
//!
//! Every fallible operation in the workspace returns [`PlanEqResult`]. The
//! equivalence orchestrator converts any error reaching its boundary into a
//! "not equivalent" decision, so these errors never escape a comparison.

mod error;

pub use error::{PlanEqError, PlanEqResult};
