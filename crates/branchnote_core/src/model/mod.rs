//! Outline domain model.
//!
//! # Responsibility
//! - Define nodes, trees and filters used by the outline store.
//! - Keep hierarchy as a flat sequence where `level` encodes nesting.
//!
//! # Invariants
//! - Every node and tree has a stable identity.
//! - The tree with id `"main"` always exists and is never branched from a
//!   parent.

pub mod filter;
pub mod node;
pub mod tree;
