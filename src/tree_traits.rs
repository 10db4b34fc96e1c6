//! Rendering and metrics over a composition tree.
//!
//! Children are visited in label order so output is stable despite the
//! unordered children map.

use std::sync::Arc;

use termtree::Tree;
use tracing::instrument;

use crate::domain::{Compose, Node};

/// How node labels are produced when rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Append the fully qualified type name to every label.
    pub full_type_names: bool,
}

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
    fn to_tree_with(&self, options: RenderOptions) -> Tree<String>;
}

impl<N: Node + ?Sized> TreeNodeConvert for N {
    fn to_tree_string(&self) -> Tree<String> {
        self.to_tree_with(RenderOptions::default())
    }

    #[instrument(level = "trace", skip(self))]
    fn to_tree_with(&self, options: RenderOptions) -> Tree<String> {
        let leaves: Vec<Tree<String>> = sorted_children(self.as_node())
            .iter()
            .map(|(_, child)| child.to_tree_with(options))
            .collect();

        Tree::new(label(self.as_node(), options)).with_leaves(leaves)
    }
}

fn label(node: &dyn Node, options: RenderOptions) -> String {
    if options.full_type_names {
        format!("{} [{}]", node.describe(), node.type_key().name())
    } else {
        node.describe()
    }
}

// Snapshot first: describe() and recursion must not run under the map lock.
fn children_of(node: &dyn Node) -> Vec<Arc<dyn Node>> {
    node.components().iter().map(|(_, c)| Arc::clone(c)).collect()
}

fn sorted_children(node: &dyn Node) -> Vec<(String, Arc<dyn Node>)> {
    let mut labelled: Vec<(String, Arc<dyn Node>)> = children_of(node)
        .into_iter()
        .map(|child| (child.describe(), child))
        .collect();
    labelled.sort_by(|a, b| a.0.cmp(&b.0));
    labelled
}

/// Number of levels in the tree rooted at `node` (a lone node has depth 1).
#[instrument(level = "trace", skip(node))]
pub fn depth(node: &dyn Node) -> usize {
    1 + children_of(node)
        .iter()
        .map(|child| depth(&**child))
        .max()
        .unwrap_or(0)
}

/// Number of nodes in the tree rooted at `node`, including `node`.
#[instrument(level = "trace", skip(node))]
pub fn count(node: &dyn Node) -> usize {
    1 + children_of(node)
        .iter()
        .map(|child| count(&**child))
        .sum::<usize>()
}

/// Labels of all nodes without children, in rendering order.
pub fn leaf_nodes(node: &dyn Node) -> Vec<String> {
    let children = sorted_children(node);
    if children.is_empty() {
        return vec![node.describe()];
    }
    children
        .iter()
        .flat_map(|(_, child)| leaf_nodes(&**child))
        .collect()
}
