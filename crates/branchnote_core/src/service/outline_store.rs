//! Outline store use-case service.
//!
//! # Responsibility
//! - Own the tree collection, the active tree pointer and the display filter.
//! - Perform every structural mutation (insert, delete, update, branch-out,
//!   branch-close) and persist the result synchronously.
//!
//! # Invariants
//! - Exactly one tree has id `"main"`; it is never removed or closed.
//! - At most `MAX_TREES` trees exist at once.
//! - `active_tree_index` always indexes an existing tree.
//! - Invalid input (unknown tree index or node id) is a no-op, reported to
//!   the caller as `false`/`None`, never as an error.
//! - A failed persistence write leaves the in-memory state untouched and is
//!   only logged.

use crate::model::filter::NodeFilter;
use crate::model::node::{Node, NodeId};
use crate::model::tree::{branch_breadcrumb, branch_title, Tree, TreeId};
use crate::repo::kv_repo::KvRepository;
use crate::repo::snapshot_codec::{decode_trees, encode_trees};
use log::{debug, info, warn};
use std::collections::HashSet;

/// Hard cap on concurrently open trees, main included.
pub const MAX_TREES: usize = 5;
/// Repository key holding the encoded tree collection.
pub const TREES_KEY: &str = "outline.trees";
/// Repository key holding the selected theme name.
pub const THEME_KEY: &str = "outline.theme";
/// Theme used when nothing was persisted.
pub const DEFAULT_THEME: &str = "default";

/// Read-only copy of store state for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSnapshot {
    pub trees: Vec<Tree>,
    pub active_tree_index: usize,
    pub current_filter: NodeFilter,
    pub theme: String,
}

/// Outline store facade over a key-value repository.
pub struct OutlineStore<R: KvRepository> {
    repo: R,
    trees: Vec<Tree>,
    active_tree_index: usize,
    current_filter: NodeFilter,
    theme: String,
}

impl<R: KvRepository> OutlineStore<R> {
    /// Restores state from `repo`.
    ///
    /// A missing, undecodable or empty snapshot yields a single main tree.
    /// The active index starts at the main tree and the filter at `All`.
    pub fn load(repo: R) -> Self {
        let trees = load_trees(&repo);
        let theme = load_theme(&repo);
        info!(
            "event=store_load module=store status=ok tree_count={} theme={}",
            trees.len(),
            theme
        );
        Self {
            repo,
            trees,
            active_tree_index: 0,
            current_filter: NodeFilter::All,
            theme,
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn active_tree_index(&self) -> usize {
        self.active_tree_index
    }

    /// Returns the tree currently selected for display.
    pub fn active_tree(&self) -> &Tree {
        &self.trees[self.active_tree_index]
    }

    pub fn current_filter(&self) -> NodeFilter {
        self.current_filter
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Clones the full presentation state.
    pub fn snapshot(&self) -> OutlineSnapshot {
        OutlineSnapshot {
            trees: self.trees.clone(),
            active_tree_index: self.active_tree_index,
            current_filter: self.current_filter,
            theme: self.theme.clone(),
        }
    }

    /// Selects the tree shown by the presentation layer.
    pub fn set_active_tree(&mut self, tree_index: usize) -> bool {
        if tree_index >= self.trees.len() {
            debug!("event=tree_select module=store status=skip tree_index={tree_index}");
            return false;
        }
        self.active_tree_index = tree_index;
        true
    }

    pub fn set_filter(&mut self, filter: NodeFilter) {
        self.current_filter = filter;
    }

    /// Inserts a new node and returns its id.
    ///
    /// With a resolvable `after` anchor the node lands right after the
    /// anchor's whole subtree; otherwise it is appended. `level` is taken
    /// as given.
    pub fn add_node(
        &mut self,
        content: impl Into<String>,
        tree_index: usize,
        after: Option<NodeId>,
        level: u32,
    ) -> Option<NodeId> {
        let Some(tree) = self.trees.get_mut(tree_index) else {
            debug!("event=node_add module=store status=skip tree_index={tree_index}");
            return None;
        };

        let node = Node::new(content, level);
        let node_id = node.id;
        let position = after
            .and_then(|anchor| tree.position_of(anchor))
            .map_or(tree.nodes.len(), |index| tree.subtree_end(index));
        tree.nodes.insert(position, node);

        debug!(
            "event=node_add module=store status=ok tree_index={tree_index} position={position} level={level}"
        );
        self.persist();
        Some(node_id)
    }

    /// Removes exactly one node. Its children stay where they are.
    pub fn delete_node(&mut self, node_id: NodeId, tree_index: usize) -> bool {
        let Some(tree) = self.trees.get_mut(tree_index) else {
            return false;
        };
        let Some(position) = tree.position_of(node_id) else {
            debug!("event=node_delete module=store status=skip tree_index={tree_index}");
            return false;
        };
        tree.nodes.remove(position);

        debug!("event=node_delete module=store status=ok tree_index={tree_index} position={position}");
        self.persist();
        true
    }

    /// Applies `mutator` to one node.
    ///
    /// The node id is restored afterwards; identity cannot change here.
    pub fn update_node(
        &mut self,
        node_id: NodeId,
        tree_index: usize,
        mutator: impl FnOnce(&mut Node),
    ) -> bool {
        let Some(node) = self
            .trees
            .get_mut(tree_index)
            .and_then(|tree| tree.node_mut(node_id))
        else {
            debug!("event=node_update module=store status=skip tree_index={tree_index}");
            return false;
        };
        mutator(node);
        node.id = node_id;

        self.persist();
        true
    }

    /// Replaces node content unless the node is the origin of an open branch
    /// of this tree.
    pub fn edit_node_content(
        &mut self,
        node_id: NodeId,
        tree_index: usize,
        content: impl Into<String>,
    ) -> bool {
        if self.is_branch_origin_in(tree_index, node_id) {
            debug!("event=node_edit module=store status=skip reason=branched tree_index={tree_index}");
            return false;
        }
        let content: String = content.into();
        self.update_node(node_id, tree_index, |node| node.content = content)
    }

    pub fn set_note(&mut self, node_id: NodeId, tree_index: usize, note: impl Into<String>) -> bool {
        let note: String = note.into();
        self.update_node(node_id, tree_index, |node| node.note = note)
    }

    /// Flips the task flag. Un-tasking also clears completion.
    pub fn toggle_task(&mut self, node_id: NodeId, tree_index: usize) -> bool {
        self.update_node(node_id, tree_index, |node| {
            node.is_task = !node.is_task;
            if !node.is_task {
                node.is_completed = false;
            }
        })
    }

    /// Flips completion of a task node. Plain nodes are left alone.
    pub fn toggle_completed(&mut self, node_id: NodeId, tree_index: usize) -> bool {
        if !self
            .find_node(tree_index, node_id)
            .is_some_and(|node| node.is_task)
        {
            return false;
        }
        self.update_node(node_id, tree_index, |node| {
            node.is_completed = !node.is_completed
        })
    }

    /// Increases the level by one. No-op when the level is already at the
    /// numeric ceiling.
    pub fn indent_node(&mut self, node_id: NodeId, tree_index: usize) -> bool {
        let Some(level) = self
            .find_node(tree_index, node_id)
            .and_then(|node| node.level.checked_add(1))
        else {
            debug!("event=node_indent module=store status=skip tree_index={tree_index}");
            return false;
        };
        self.update_node(node_id, tree_index, |node| node.level = level)
    }

    /// Decreases the level by one, stopping at `0`.
    pub fn outdent_node(&mut self, node_id: NodeId, tree_index: usize) -> bool {
        self.update_node(node_id, tree_index, |node| {
            node.level = node.level.saturating_sub(1)
        })
    }

    /// Copies a node and its subtree into a new tree and activates it.
    ///
    /// The copy is re-leveled so its root sits at level `0`. The origin node
    /// stays in the source tree. No-op when the tree cap is reached, the
    /// node is unknown, or the node already has an open branch.
    pub fn branch_out(&mut self, node_id: NodeId, tree_index: usize) -> Option<TreeId> {
        if self.trees.len() >= MAX_TREES {
            info!(
                "event=branch_out module=store status=skip reason=tree_cap tree_count={}",
                self.trees.len()
            );
            return None;
        }
        if self.is_node_branched_out(node_id) {
            debug!("event=branch_out module=store status=skip reason=already_branched");
            return None;
        }
        let source = self.trees.get(tree_index)?;
        let span = source.subtree_span(node_id)?;

        let root = &source.nodes[span.start];
        let root_level = root.level;
        let nodes = source.nodes[span.clone()]
            .iter()
            .cloned()
            .map(|mut node| {
                node.level -= root_level;
                node
            })
            .collect();
        let branch = Tree {
            id: TreeId::generate(),
            title: branch_title(&root.content),
            nodes,
            parent_tree_id: Some(source.id.clone()),
            parent_node_id: Some(node_id),
            breadcrumb: branch_breadcrumb(source),
        };
        let branch_id = branch.id.clone();

        self.trees.push(branch);
        self.active_tree_index = self.trees.len() - 1;
        info!(
            "event=branch_out module=store status=ok source_index={tree_index} node_count={} tree_count={}",
            span.len(),
            self.trees.len()
        );
        self.persist();
        Some(branch_id)
    }

    /// Splices a branched tree back into its parent and removes it.
    ///
    /// The anchor's current subtree in the parent is replaced by the branch
    /// nodes, each re-leveled by the anchor's level. Trees branched out of
    /// the closed tree are re-pointed at its parent.
    pub fn close_tree(&mut self, tree_index: usize) -> bool {
        let Some(closing) = self.trees.get(tree_index) else {
            return false;
        };
        let Some((parent_tree_id, anchor_id)) = closing.branch_origin() else {
            debug!("event=close_tree module=store status=skip reason=no_parent tree_index={tree_index}");
            return false;
        };
        let parent_tree_id = parent_tree_id.clone();
        let Some(parent_index) = self
            .trees
            .iter()
            .position(|tree| tree.id == parent_tree_id)
            .filter(|index| *index != tree_index)
        else {
            warn!("event=close_tree module=store status=skip reason=parent_missing tree_index={tree_index}");
            return false;
        };
        let Some(span) = self.trees[parent_index].subtree_span(anchor_id) else {
            warn!("event=close_tree module=store status=skip reason=anchor_missing tree_index={tree_index}");
            return false;
        };
        let anchor_level = self.trees[parent_index].nodes[span.start].level;
        let Some(rebased) = self.trees[tree_index]
            .nodes
            .iter()
            .map(|node| {
                node.level
                    .checked_add(anchor_level)
                    .map(|level| Node { level, ..node.clone() })
            })
            .collect::<Option<Vec<_>>>()
        else {
            warn!("event=close_tree module=store status=skip reason=level_overflow tree_index={tree_index}");
            return false;
        };

        let closed = self.trees.remove(tree_index);
        let parent_index = if parent_index > tree_index {
            parent_index - 1
        } else {
            parent_index
        };
        let replaced = span.len();
        let restored = rebased.len();
        self.trees[parent_index].nodes.splice(span, rebased);

        for tree in &mut self.trees {
            if tree.parent_tree_id.as_ref() == Some(&closed.id) {
                tree.parent_tree_id = Some(parent_tree_id.clone());
            }
        }

        if self.active_tree_index >= tree_index {
            self.active_tree_index = self.active_tree_index.saturating_sub(1);
        }
        self.active_tree_index = self.active_tree_index.min(self.trees.len() - 1);

        info!(
            "event=close_tree module=store status=ok tree_index={tree_index} replaced={replaced} restored={restored} tree_count={}",
            self.trees.len()
        );
        self.persist();
        true
    }

    /// Projects `nodes` through the current filter, preserving order.
    pub fn filtered_nodes<'a>(&self, nodes: &'a [Node]) -> Vec<&'a Node> {
        let origins = self.branch_origins();
        nodes
            .iter()
            .filter(|node| {
                self.current_filter
                    .keeps(node, |candidate| origins.contains(&candidate.id))
            })
            .collect()
    }

    /// Filtered nodes of the active tree.
    pub fn visible_nodes(&self) -> Vec<&Node> {
        self.filtered_nodes(&self.active_tree().nodes)
    }

    /// Returns whether any tree was branched out of this node.
    pub fn is_node_branched_out(&self, node_id: NodeId) -> bool {
        self.trees
            .iter()
            .any(|tree| tree.parent_node_id == Some(node_id))
    }

    /// Resets to one empty main tree.
    pub fn clear_all(&mut self) {
        self.trees = vec![Tree::main()];
        self.active_tree_index = 0;
        info!("event=store_clear module=store status=ok");
        self.persist();
    }

    /// Persists the selected theme name. Blank names are rejected.
    pub fn set_theme(&mut self, name: impl Into<String>) -> bool {
        let name: String = name.into();
        let name = name.trim().to_string();
        if name.is_empty() {
            return false;
        }
        if let Err(err) = self.repo.put(THEME_KEY, name.as_bytes()) {
            warn!("event=store_persist module=store status=error key={THEME_KEY} error={err}");
        }
        self.theme = name;
        true
    }

    fn find_node(&self, tree_index: usize, node_id: NodeId) -> Option<&Node> {
        self.trees.get(tree_index)?.node(node_id)
    }

    fn is_branch_origin_in(&self, tree_index: usize, node_id: NodeId) -> bool {
        let Some(owner) = self.trees.get(tree_index) else {
            return false;
        };
        self.trees.iter().any(|tree| {
            tree.parent_tree_id.as_ref() == Some(&owner.id) && tree.parent_node_id == Some(node_id)
        })
    }

    fn branch_origins(&self) -> HashSet<NodeId> {
        self.trees
            .iter()
            .filter_map(|tree| tree.parent_node_id)
            .collect()
    }

    fn persist(&self) {
        let bytes = match encode_trees(&self.trees) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("event=store_persist module=store status=error key={TREES_KEY} error={err}");
                return;
            }
        };
        match self.repo.put(TREES_KEY, &bytes) {
            Ok(()) => debug!(
                "event=store_persist module=store status=ok key={TREES_KEY} bytes={}",
                bytes.len()
            ),
            Err(err) => {
                warn!("event=store_persist module=store status=error key={TREES_KEY} error={err}")
            }
        }
    }
}

fn load_trees(repo: &impl KvRepository) -> Vec<Tree> {
    let bytes = match repo.get(TREES_KEY) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return vec![Tree::main()],
        Err(err) => {
            warn!("event=store_load module=store status=error key={TREES_KEY} error={err}");
            return vec![Tree::main()];
        }
    };
    match decode_trees(&bytes) {
        Ok(trees) if trees.is_empty() => vec![Tree::main()],
        Ok(trees) => repair_trees(trees),
        Err(err) => {
            warn!("event=store_load module=store status=error key={TREES_KEY} error={err}");
            vec![Tree::main()]
        }
    }
}

/// Restores the tree invariants on a decoded snapshot.
///
/// Keeps exactly one parentless main tree at index `0`. Branches with
/// half-set or dangling parent references are dropped and the collection
/// is capped at `MAX_TREES`, keeping the earliest branches.
fn repair_trees(trees: Vec<Tree>) -> Vec<Tree> {
    let mut main = None;
    let mut repaired = Vec::with_capacity(trees.len() + 1);
    for mut tree in trees {
        if tree.is_main() {
            if main.is_some() {
                warn!("event=store_load module=store status=repair reason=duplicate_main");
                continue;
            }
            tree.parent_tree_id = None;
            tree.parent_node_id = None;
            main = Some(tree);
        } else if tree.parent_tree_id.is_some() != tree.parent_node_id.is_some() {
            warn!("event=store_load module=store status=repair reason=half_parent_refs");
        } else {
            repaired.push(tree);
        }
    }
    let main = main.unwrap_or_else(|| {
        warn!("event=store_load module=store status=repair reason=main_missing");
        Tree::main()
    });
    repaired.insert(0, main);

    if repaired.len() > MAX_TREES {
        warn!(
            "event=store_load module=store status=repair reason=tree_cap tree_count={}",
            repaired.len()
        );
        repaired.truncate(MAX_TREES);
    }

    // Dropping a tree can orphan its own branches, so repeat until stable.
    loop {
        let ids = repaired
            .iter()
            .map(|tree| tree.id.clone())
            .collect::<HashSet<_>>();
        let before = repaired.len();
        repaired.retain(|tree| match &tree.parent_tree_id {
            Some(parent) => parent != &tree.id && ids.contains(parent),
            None => true,
        });
        if repaired.len() == before {
            break;
        }
        warn!(
            "event=store_load module=store status=repair reason=parent_missing dropped={}",
            before - repaired.len()
        );
    }
    repaired
}

fn load_theme(repo: &impl KvRepository) -> String {
    match repo.get(THEME_KEY) {
        Ok(Some(bytes)) => String::from_utf8(bytes)
            .ok()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_THEME.to_string()),
        Ok(None) => DEFAULT_THEME.to_string(),
        Err(err) => {
            warn!("event=store_load module=store status=error key={THEME_KEY} error={err}");
            DEFAULT_THEME.to_string()
        }
    }
}
