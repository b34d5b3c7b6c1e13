//! JSON codec for persisted outline snapshots.
//!
//! The tree collection is stored as one JSON array mirroring `Tree`/`Node`
//! with camelCase field names (`parentTreeId`, `isTask`, ...).

use crate::model::tree::Tree;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Snapshot encode/decode failure.
#[derive(Debug)]
pub enum CodecError {
    Encode(serde_json::Error),
    Decode(serde_json::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Encode(err) => write!(f, "failed to encode tree snapshot: {err}"),
            Self::Decode(err) => write!(f, "failed to decode tree snapshot: {err}"),
        }
    }
}

impl Error for CodecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Encode(err) | Self::Decode(err) => Some(err),
        }
    }
}

/// Serializes the full tree collection.
pub fn encode_trees(trees: &[Tree]) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(trees).map_err(CodecError::Encode)
}

/// Deserializes a tree collection written by [`encode_trees`].
pub fn decode_trees(bytes: &[u8]) -> Result<Vec<Tree>, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}
