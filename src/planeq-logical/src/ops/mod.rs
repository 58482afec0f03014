//! Operator attributes carried by plan nodes.

mod aggregate;
mod join;
mod set_op;
mod sort;

pub use aggregate::AggregateCall;
pub use join::JoinKind;
pub use set_op::SetOpKind;
pub use sort::{SortDirection, SortKey};
