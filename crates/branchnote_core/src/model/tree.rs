//! Outline tree model.
//!
//! # Responsibility
//! - Hold one ordered node sequence plus its branch relation to a parent.
//! - Provide the contiguous-descendants lookup used by insert, branch-out and
//!   branch-close.
//!
//! # Invariants
//! - The children of a node are the maximal run of immediately following
//!   nodes whose `level` is strictly greater than the node's own `level`.
//! - `parent_tree_id` and `parent_node_id` are both set or both unset.
//! - The tree with id `"main"` never has parent references.

use crate::model::node::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::ops::Range;
use uuid::Uuid;

/// Reserved identity of the always-present root tree.
pub const MAIN_TREE_ID: &str = "main";
/// Title given to the main tree.
pub const MAIN_TREE_TITLE: &str = "Main";
/// Branch titles longer than this many characters are truncated.
pub const TITLE_MAX_CHARS: usize = 20;
/// Characters kept from the source content when a title is truncated.
pub const TITLE_KEEP_CHARS: usize = 17;
/// Breadcrumbs longer than this collapse to `first, ..., last two`.
pub const BREADCRUMB_MAX_SEGMENTS: usize = 3;
/// Marker used for truncated titles and collapsed breadcrumbs.
pub const ELLIPSIS: &str = "...";

/// Opaque tree identity.
///
/// Serialized as a bare string so snapshots stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(String);

impl TreeId {
    /// Identity of the main tree.
    pub fn main() -> Self {
        Self(MAIN_TREE_ID.to_string())
    }

    /// Generates a fresh identity for a branched tree.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_main(&self) -> bool {
        self.0 == MAIN_TREE_ID
    }
}

impl Display for TreeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TreeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One outline view: the main outline or a branched-out subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: TreeId,
    pub title: String,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tree_id: Option<TreeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<NodeId>,
    #[serde(default)]
    pub breadcrumb: Vec<String>,
}

impl Tree {
    /// Creates an empty main tree.
    pub fn main() -> Self {
        Self {
            id: TreeId::main(),
            title: MAIN_TREE_TITLE.to_string(),
            nodes: Vec::new(),
            parent_tree_id: None,
            parent_node_id: None,
            breadcrumb: Vec::new(),
        }
    }

    pub fn is_main(&self) -> bool {
        self.id.is_main()
    }

    /// Returns `(parent_tree_id, parent_node_id)` when both are set.
    pub fn branch_origin(&self) -> Option<(&TreeId, NodeId)> {
        match (&self.parent_tree_id, self.parent_node_id) {
            (Some(tree_id), Some(node_id)) => Some((tree_id, node_id)),
            _ => None,
        }
    }

    /// Finds the sequence position of one node.
    pub fn position_of(&self, node_id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == node_id)
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|node| node.id == node_id)
    }

    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|node| node.id == node_id)
    }

    /// Returns the exclusive end of the subtree rooted at `index`.
    ///
    /// Scans forward while nodes are deeper than the root. The result is
    /// also the insertion point for a node placed "after" the root.
    pub fn subtree_end(&self, index: usize) -> usize {
        let Some(root) = self.nodes.get(index) else {
            return self.nodes.len();
        };
        let mut end = index + 1;
        while end < self.nodes.len() && self.nodes[end].level > root.level {
            end += 1;
        }
        end
    }

    /// Returns the node and all of its descendants as a sequence range.
    pub fn subtree_span(&self, node_id: NodeId) -> Option<Range<usize>> {
        let start = self.position_of(node_id)?;
        Some(start..self.subtree_end(start))
    }
}

/// Derives a branch title from the origin node's content.
pub fn branch_title(content: &str) -> String {
    if content.chars().count() <= TITLE_MAX_CHARS {
        return content.to_string();
    }
    let mut title = content.chars().take(TITLE_KEEP_CHARS).collect::<String>();
    title.push_str(ELLIPSIS);
    title
}

/// Derives the breadcrumb of a tree branched out of `parent`.
///
/// The main tree contributes no segment of its own.
pub fn branch_breadcrumb(parent: &Tree) -> Vec<String> {
    let mut segments = parent.breadcrumb.clone();
    if !parent.is_main() {
        segments.push(parent.title.clone());
    }
    collapse_breadcrumb(segments)
}

fn collapse_breadcrumb(segments: Vec<String>) -> Vec<String> {
    if segments.len() <= BREADCRUMB_MAX_SEGMENTS {
        return segments;
    }
    let tail = &segments[segments.len() - 2..];
    vec![
        segments[0].clone(),
        ELLIPSIS.to_string(),
        tail[0].clone(),
        tail[1].clone(),
    ]
}

#[cfg(test)]
mod tests {
    use super::{branch_breadcrumb, branch_title, Tree, TreeId};
    use crate::model::node::Node;

    fn tree_with_levels(levels: &[u32]) -> Tree {
        let mut tree = Tree::main();
        for (index, level) in levels.iter().enumerate() {
            tree.nodes.push(Node::new(format!("n{index}"), *level));
        }
        tree
    }

    #[test]
    fn subtree_end_stops_at_sibling() {
        let tree = tree_with_levels(&[0, 1, 2, 1, 0, 1]);
        assert_eq!(tree.subtree_end(0), 4);
        assert_eq!(tree.subtree_end(1), 3);
        assert_eq!(tree.subtree_end(2), 3);
        assert_eq!(tree.subtree_end(4), 6);
    }

    #[test]
    fn subtree_end_of_leaf_is_next_index() {
        let tree = tree_with_levels(&[0, 0, 0]);
        assert_eq!(tree.subtree_end(1), 2);
    }

    #[test]
    fn subtree_end_out_of_range_is_len() {
        let tree = tree_with_levels(&[0]);
        assert_eq!(tree.subtree_end(9), 1);
    }

    #[test]
    fn short_titles_are_kept() {
        assert_eq!(branch_title("Groceries"), "Groceries");
        assert_eq!(branch_title("exactly twenty chars"), "exactly twenty chars");
    }

    #[test]
    fn long_titles_are_truncated_by_chars() {
        assert_eq!(branch_title("Plan the trip itinerary"), "Plan the trip iti...");
        assert_eq!(
            branch_title("ééééééééééééééééééééé"),
            format!("{}...", "é".repeat(17))
        );
    }

    #[test]
    fn breadcrumb_skips_main_title() {
        let main = Tree::main();
        assert!(branch_breadcrumb(&main).is_empty());
    }

    #[test]
    fn breadcrumb_collapses_past_three_segments() {
        let mut parent = Tree::main();
        parent.id = TreeId::generate();
        parent.title = "D".to_string();
        parent.breadcrumb = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        assert_eq!(branch_breadcrumb(&parent), vec!["A", "...", "C", "D"]);
    }

    #[test]
    fn breadcrumb_keeps_three_segments() {
        let mut parent = Tree::main();
        parent.id = TreeId::generate();
        parent.title = "C".to_string();
        parent.breadcrumb = vec!["A".to_string(), "B".to_string()];

        assert_eq!(branch_breadcrumb(&parent), vec!["A", "B", "C"]);
    }
}
