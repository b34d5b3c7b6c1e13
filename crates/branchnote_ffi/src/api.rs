//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the outline store operations to Dart via FRB.
//! - Own the one process-wide store and serialize access to it.
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - Ids cross the boundary as UTF-8 strings; tree positions as `u32`.
//! - A store no-op is reported as `ok=false` with a message, never an error
//!   code.

use branchnote_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    Node, NodeFilter, NodeId, OutlineStore, SqliteKvRepository, Tree,
};
use log::warn;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

const OUTLINE_DB_FILE_NAME: &str = "branchnote_outline.sqlite3";
const OUTLINE_DB_PATH_ENV: &str = "BRANCHNOTE_DB_PATH";

static OUTLINE_STORE: Mutex<Option<OutlineStore<SqliteKvRepository>>> = Mutex::new(None);

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Exposes the core crate version.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Returns empty string on success and an error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// One outline line as rendered by the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNodeItem {
    pub node_id: String,
    pub content: String,
    pub level: u32,
    pub note: String,
    pub is_task: bool,
    pub is_completed: bool,
    /// Whether an open branch was created from this node.
    pub is_branched: bool,
}

/// One tree tab with its breadcrumb trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineTreeItem {
    pub tree_id: String,
    pub title: String,
    pub breadcrumb: Vec<String>,
    /// Nodes after the active filter has been applied.
    pub nodes: Vec<OutlineNodeItem>,
    /// `false` for the main tree.
    pub can_close: bool,
}

/// Full presentation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineStateResponse {
    pub ok: bool,
    pub trees: Vec<OutlineTreeItem>,
    pub active_tree_index: u32,
    /// Active filter id (`all|tasks|notes|branched`).
    pub filter: String,
    pub theme: String,
    pub message: String,
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineActionResponse {
    /// Whether the operation changed state.
    pub ok: bool,
    /// Created node or tree id, when the action creates one.
    pub id: Option<String>,
    pub message: String,
}

impl OutlineActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            id: None,
            message: message.into(),
        }
    }

    fn created(message: impl Into<String>, id: String) -> Self {
        Self {
            ok: true,
            id: Some(id),
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            id: None,
            message: message.into(),
        }
    }

    fn from_outcome(applied: bool, success: &str, noop: &str) -> Self {
        if applied {
            Self::success(success)
        } else {
            Self::failure(noop)
        }
    }
}

/// Returns all trees (filtered), the active index, filter and theme.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_state() -> OutlineStateResponse {
    match with_store(|store| Ok(to_state_response(store))) {
        Ok(response) => response,
        Err(err) => OutlineStateResponse {
            ok: false,
            trees: Vec::new(),
            active_tree_index: 0,
            filter: NodeFilter::All.to_string(),
            theme: String::new(),
            message: format!("outline_state failed: {err}"),
        },
    }
}

/// Adds one line, optionally after an anchor node's subtree.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_add_node(
    content: String,
    tree_index: u32,
    after_node_id: Option<String>,
    level: u32,
) -> OutlineActionResponse {
    run_action("outline_add_node", |store| {
        let after = after_node_id.as_deref().map(parse_node_id).transpose()?;
        Ok(
            match store.add_node(content.trim(), tree_index as usize, after, level) {
                Some(node_id) => OutlineActionResponse::created("Node added.", node_id.to_string()),
                None => OutlineActionResponse::failure("Tree not found."),
            },
        )
    })
}

/// Deletes one line. Its children are kept.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_delete_node(node_id: String, tree_index: u32) -> OutlineActionResponse {
    node_action("outline_delete_node", &node_id, |store, id| {
        OutlineActionResponse::from_outcome(
            store.delete_node(id, tree_index as usize),
            "Node deleted.",
            "Node not found.",
        )
    })
}

/// Replaces line text. Refused for nodes with an open branch.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_edit_node(node_id: String, tree_index: u32, content: String) -> OutlineActionResponse {
    node_action("outline_edit_node", &node_id, |store, id| {
        OutlineActionResponse::from_outcome(
            store.edit_node_content(id, tree_index as usize, content.trim()),
            "Node updated.",
            "Node not found or branched out.",
        )
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn outline_set_note(node_id: String, tree_index: u32, note: String) -> OutlineActionResponse {
    node_action("outline_set_note", &node_id, |store, id| {
        OutlineActionResponse::from_outcome(
            store.set_note(id, tree_index as usize, note),
            "Note saved.",
            "Node not found.",
        )
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn outline_toggle_task(node_id: String, tree_index: u32) -> OutlineActionResponse {
    node_action("outline_toggle_task", &node_id, |store, id| {
        OutlineActionResponse::from_outcome(
            store.toggle_task(id, tree_index as usize),
            "Task toggled.",
            "Node not found.",
        )
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn outline_toggle_completed(node_id: String, tree_index: u32) -> OutlineActionResponse {
    node_action("outline_toggle_completed", &node_id, |store, id| {
        OutlineActionResponse::from_outcome(
            store.toggle_completed(id, tree_index as usize),
            "Completion toggled.",
            "Node not found or not a task.",
        )
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn outline_indent_node(node_id: String, tree_index: u32) -> OutlineActionResponse {
    node_action("outline_indent_node", &node_id, |store, id| {
        OutlineActionResponse::from_outcome(
            store.indent_node(id, tree_index as usize),
            "Node indented.",
            "Node not found or at maximum depth.",
        )
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn outline_outdent_node(node_id: String, tree_index: u32) -> OutlineActionResponse {
    node_action("outline_outdent_node", &node_id, |store, id| {
        OutlineActionResponse::from_outcome(
            store.outdent_node(id, tree_index as usize),
            "Node outdented.",
            "Node not found.",
        )
    })
}

/// Opens a node's subtree as a new active tree.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_branch_out(node_id: String, tree_index: u32) -> OutlineActionResponse {
    node_action("outline_branch_out", &node_id, |store, id| {
        match store.branch_out(id, tree_index as usize) {
            Some(tree_id) => OutlineActionResponse::created("Branch opened.", tree_id.to_string()),
            None => OutlineActionResponse::failure(
                "Cannot branch out: node missing, already branched, or tree limit reached.",
            ),
        }
    })
}

/// Merges a branch back into its parent and removes it.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_close_tree(tree_index: u32) -> OutlineActionResponse {
    run_action("outline_close_tree", |store| {
        Ok(OutlineActionResponse::from_outcome(
            store.close_tree(tree_index as usize),
            "Branch closed.",
            "Tree cannot be closed.",
        ))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn outline_select_tree(tree_index: u32) -> OutlineActionResponse {
    run_action("outline_select_tree", |store| {
        Ok(OutlineActionResponse::from_outcome(
            store.set_active_tree(tree_index as usize),
            "Tree selected.",
            "Tree not found.",
        ))
    })
}

/// Sets the display filter from its string id.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_set_filter(filter: String) -> OutlineActionResponse {
    run_action("outline_set_filter", |store| {
        let filter = filter.parse::<NodeFilter>().map_err(|err| err.to_string())?;
        store.set_filter(filter);
        Ok(OutlineActionResponse::success(format!("Filter set to {filter}.")))
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn outline_set_theme(name: String) -> OutlineActionResponse {
    run_action("outline_set_theme", |store| {
        Ok(OutlineActionResponse::from_outcome(
            store.set_theme(name),
            "Theme saved.",
            "Theme name must not be blank.",
        ))
    })
}

/// Drops every tree and starts over with an empty main tree.
#[flutter_rust_bridge::frb(sync)]
pub fn outline_clear_all() -> OutlineActionResponse {
    run_action("outline_clear_all", |store| {
        store.clear_all();
        Ok(OutlineActionResponse::success("Outline cleared."))
    })
}

fn resolve_outline_db_path() -> PathBuf {
    if let Ok(raw) = std::env::var(OUTLINE_DB_PATH_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    std::env::temp_dir().join(OUTLINE_DB_FILE_NAME)
}

fn lock_store() -> MutexGuard<'static, Option<OutlineStore<SqliteKvRepository>>> {
    OUTLINE_STORE.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("event=store_lock module=ffi status=recovered reason=poisoned");
        poisoned.into_inner()
    })
}

fn with_store<T>(
    f: impl FnOnce(&mut OutlineStore<SqliteKvRepository>) -> Result<T, String>,
) -> Result<T, String> {
    let mut guard = lock_store();
    if guard.is_none() {
        let db_path = resolve_outline_db_path();
        let repo = SqliteKvRepository::open(&db_path)
            .map_err(|err| format!("outline DB open failed: {err}"))?;
        *guard = Some(OutlineStore::load(repo));
    }
    match guard.as_mut() {
        Some(store) => f(store),
        None => Err("outline store unavailable".to_string()),
    }
}

fn run_action(
    name: &str,
    f: impl FnOnce(&mut OutlineStore<SqliteKvRepository>) -> Result<OutlineActionResponse, String>,
) -> OutlineActionResponse {
    match with_store(f) {
        Ok(response) => response,
        Err(err) => OutlineActionResponse::failure(format!("{name} failed: {err}")),
    }
}

fn node_action(
    name: &str,
    node_id: &str,
    f: impl FnOnce(&mut OutlineStore<SqliteKvRepository>, NodeId) -> OutlineActionResponse,
) -> OutlineActionResponse {
    run_action(name, |store| {
        let id = parse_node_id(node_id)?;
        Ok(f(store, id))
    })
}

fn parse_node_id(value: &str) -> Result<NodeId, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("invalid node id `{value}`"))
}

fn to_state_response(store: &OutlineStore<SqliteKvRepository>) -> OutlineStateResponse {
    let origins = store
        .trees()
        .iter()
        .filter_map(|tree| tree.parent_node_id)
        .collect::<HashSet<_>>();
    let trees = store
        .trees()
        .iter()
        .map(|tree| to_tree_item(store, tree, &origins))
        .collect();

    OutlineStateResponse {
        ok: true,
        trees,
        active_tree_index: store.active_tree_index() as u32,
        filter: store.current_filter().to_string(),
        theme: store.theme().to_string(),
        message: String::new(),
    }
}

fn to_tree_item(
    store: &OutlineStore<SqliteKvRepository>,
    tree: &Tree,
    origins: &HashSet<NodeId>,
) -> OutlineTreeItem {
    OutlineTreeItem {
        tree_id: tree.id.to_string(),
        title: tree.title.clone(),
        breadcrumb: tree.breadcrumb.clone(),
        nodes: store
            .filtered_nodes(&tree.nodes)
            .into_iter()
            .map(|node| to_node_item(node, origins.contains(&node.id)))
            .collect(),
        can_close: tree.branch_origin().is_some(),
    }
}

fn to_node_item(node: &Node, is_branched: bool) -> OutlineNodeItem {
    OutlineNodeItem {
        node_id: node.id.to_string(),
        content: node.content.clone(),
        level: node.level,
        note: node.note.clone(),
        is_task: node.is_task,
        is_completed: node.is_completed,
        is_branched,
    }
}
