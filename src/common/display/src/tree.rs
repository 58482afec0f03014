//! Tree display utilities for plan trees.

use std::borrow::Cow;
use std::fmt;

use crate::truncate_string;

/// A node that can be rendered by [`DisplayTree`].
pub trait TreeNode {
    /// Label printed for this node.
    fn label(&self) -> Cow<'_, str>;

    /// Children in display order.
    fn children(&self) -> Vec<&dyn TreeNode>;
}

/// Renders a [`TreeNode`] hierarchy with box-drawing connectors, one node
/// per line.
pub struct DisplayTree<'a> {
    root: &'a dyn TreeNode,
    max_label_width: Option<usize>,
}

impl<'a> DisplayTree<'a> {
    pub fn new(root: &'a dyn TreeNode) -> Self {
        Self {
            root,
            max_label_width: None,
        }
    }

    /// Truncate labels longer than `width` characters.
    #[must_use]
    pub fn with_max_label_width(mut self, width: usize) -> Self {
        self.max_label_width = Some(width);
        self
    }

    /// Write `node` after `lead`, then its children under `indent`.
    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: &dyn TreeNode,
        lead: &str,
        indent: &str,
    ) -> fmt::Result {
        let label = node.label();
        match self.max_label_width {
            Some(width) => writeln!(f, "{lead}{}", truncate_string(&label, width))?,
            None => writeln!(f, "{lead}{label}")?,
        }

        let children = node.children();
        let last = children.len().saturating_sub(1);
        for (i, child) in children.into_iter().enumerate() {
            let (branch, continuation) = if i == last {
                ("└─ ", "   ")
            } else {
                ("├─ ", "│  ")
            };
            self.write_node(
                f,
                child,
                &format!("{indent}{branch}"),
                &format!("{indent}{continuation}"),
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for DisplayTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_node(f, self.root, "", "")
    }
}
