//! Active recursion path used to detect re-entry into a node.

use planeq_logical::LogicalPlanNode;

/// Identities of the nodes on the current recursion path.
///
/// Identity is the node's address, so two structurally equal but distinct
/// subtrees are never conflated. Only ancestors are recorded: a subtree
/// shared by sibling branches is visited once per branch.
#[derive(Debug, Default)]
pub struct VisitPath {
    stack: Vec<usize>,
}

impl VisitPath {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    fn identity(node: &LogicalPlanNode) -> usize {
        std::ptr::from_ref(node) as usize
    }

    /// Whether `node` is already on the path.
    pub fn contains(&self, node: &LogicalPlanNode) -> bool {
        self.stack.contains(&Self::identity(node))
    }

    /// Push `node`; returns `false` without pushing if it is already on the path.
    pub fn enter(&mut self, node: &LogicalPlanNode) -> bool {
        let id = Self::identity(node);
        if self.stack.contains(&id) {
            return false;
        }
        self.stack.push(id);
        true
    }

    /// Pop `node`, which must be the most recently entered node.
    pub fn exit(&mut self, node: &LogicalPlanNode) {
        let popped = self.stack.pop();
        debug_assert_eq!(popped, Some(Self::identity(node)));
    }

    /// Number of nodes on the path.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether the path is empty.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }
}
