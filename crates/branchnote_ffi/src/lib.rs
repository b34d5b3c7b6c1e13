//! Flutter-facing bindings over `branchnote_core`.

pub mod api;
