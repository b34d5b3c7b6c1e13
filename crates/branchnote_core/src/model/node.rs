//! Outline node model.
//!
//! # Responsibility
//! - Define one line of an outline: text, indentation level, note and task
//!   flags.
//!
//! # Invariants
//! - `id` is stable for the node lifetime and never reused.
//! - `is_completed` is meaningful only when `is_task` is set.
//! - Hierarchy is not stored on the node; it is implied by position and
//!   `level` inside the owning tree.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for one outline node.
pub type NodeId = Uuid;

/// One outline line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub content: String,
    /// Indentation depth. `0` is a root line of its tree.
    pub level: u32,
    /// Free-text annotation. Empty means "no note".
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub is_task: bool,
    #[serde(default)]
    pub is_completed: bool,
}

impl Node {
    /// Creates a plain (non-task, note-less) node with a generated id.
    pub fn new(content: impl Into<String>, level: u32) -> Self {
        Self::with_id(Uuid::new_v4(), content, level)
    }

    /// Creates a node with a caller-provided id.
    ///
    /// Used by snapshot restore and tests where identity already exists.
    pub fn with_id(id: NodeId, content: impl Into<String>, level: u32) -> Self {
        Self {
            id,
            content: content.into(),
            level,
            note: String::new(),
            is_task: false,
            is_completed: false,
        }
    }

    /// Returns whether the note holds anything besides whitespace.
    pub fn has_note(&self) -> bool {
        !self.note.trim().is_empty()
    }

    /// Returns whether this node is a task that has been checked off.
    pub fn is_done(&self) -> bool {
        self.is_task && self.is_completed
    }
}
