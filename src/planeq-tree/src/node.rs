//! Labeled tree with an order-insensitive digest.

use std::borrow::Cow;

use common_display::{DisplayTree, TreeNode};

/// A node of a labeled comparison tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelTreeNode {
    label: String,
    children: Vec<RelTreeNode>,
}

impl RelTreeNode {
    /// Create a node.
    pub fn new(label: impl Into<String>, children: Vec<RelTreeNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    /// Create a leaf.
    pub fn leaf(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }

    /// Wrap `children` in `#0`, `#1`, ... nodes so their positions survive
    /// the order-insensitive digest.
    pub fn positional(children: Vec<RelTreeNode>) -> Vec<RelTreeNode> {
        children
            .into_iter()
            .enumerate()
            .map(|(i, child)| Self::new(format!("#{i}"), vec![child]))
            .collect()
    }

    /// Node label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Child nodes.
    pub fn children(&self) -> &[RelTreeNode] {
        &self.children
    }

    /// Bottom-up digest `label[child;child;...]` with child digests sorted.
    pub fn digest(&self) -> String {
        if self.children.is_empty() {
            return format!("{}[]", self.label);
        }
        let mut digests: Vec<String> = self.children.iter().map(Self::digest).collect();
        digests.sort_unstable();
        format!("{}[{}]", self.label, digests.join(";"))
    }

    /// Box-drawing rendering.
    pub fn explain(&self) -> String {
        DisplayTree::new(self).to_string()
    }
}

impl TreeNode for RelTreeNode {
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.label)
    }

    fn children(&self) -> Vec<&dyn TreeNode> {
        self.children.iter().map(|c| c as &dyn TreeNode).collect()
    }
}
