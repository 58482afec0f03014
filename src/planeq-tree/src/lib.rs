//! Independent tree comparison for logical plans.
//!
//! Plans are lowered into [`RelTreeNode`] trees whose labels carry each
//! operator's kind and normalized key attributes, and compared through an
//! order-insensitive digest of the form `label[sorted child digests]`.
//!
//! This crate deliberately has its own expression normalization: it does not
//! depend on `planeq-canonical`, so a defect in one normal form is unlikely to
//! produce a matching false positive in the other.

mod build;
mod node;
mod term;

use log::trace;
use planeq_logical::LogicalPlanNode;

pub use build::TreeBuilder;
pub use node::RelTreeNode;

/// Lower `plan` into a labeled comparison tree.
pub fn plan_tree(plan: &LogicalPlanNode) -> RelTreeNode {
    TreeBuilder::new().build(plan)
}

/// Order-insensitive digest of `plan`.
pub fn tree_digest(plan: &LogicalPlanNode) -> String {
    plan_tree(plan).digest()
}

/// Whether two plans lower to trees with equal digests.
pub fn trees_equal(a: &LogicalPlanNode, b: &LogicalPlanNode) -> bool {
    let (left, right) = (tree_digest(a), tree_digest(b));
    trace!("tree digests:\n  {left}\n  {right}");
    left == right
}
