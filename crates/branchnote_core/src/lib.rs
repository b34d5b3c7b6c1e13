//! Core domain logic for BranchNote.
//! This crate is the single source of truth for outline invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::filter::{NodeFilter, ParseFilterError};
pub use model::node::{Node, NodeId};
pub use model::tree::{Tree, TreeId, MAIN_TREE_ID};
pub use repo::kv_repo::{
    KvRepoError, KvRepoResult, KvRepository, MemoryKvRepository, SqliteKvRepository,
};
pub use repo::snapshot_codec::{decode_trees, encode_trees, CodecError};
pub use service::outline_store::{
    OutlineSnapshot, OutlineStore, DEFAULT_THEME, MAX_TREES, THEME_KEY, TREES_KEY,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
