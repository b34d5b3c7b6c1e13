//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the narrow key-value contract the outline store persists through.
//! - Isolate SQLite and JSON encoding details from the store.
//!
//! # Invariants
//! - Repositories never interpret stored bytes; the codec owns the format.

pub mod kv_repo;
pub mod snapshot_codec;
