//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model mutations and repository persistence into use-case
//!   level APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod outline_store;
