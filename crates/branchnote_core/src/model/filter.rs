//! Node list filters.

use crate::model::node::Node;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Projection applied to the active tree before display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFilter {
    /// Every node, unchanged.
    #[default]
    All,
    /// Task nodes only.
    Tasks,
    /// Nodes carrying a non-blank note.
    Notes,
    /// Nodes that are the origin of an open branch.
    Branched,
}

impl NodeFilter {
    /// Stable string id used across the FFI boundary.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Tasks => "tasks",
            Self::Notes => "notes",
            Self::Branched => "branched",
        }
    }

    /// Applies the filter to one node.
    ///
    /// `is_branched` answers whether a node is a branch origin; it is only
    /// consulted by `Branched`.
    pub fn keeps(self, node: &Node, is_branched: impl Fn(&Node) -> bool) -> bool {
        match self {
            Self::All => true,
            Self::Tasks => node.is_task,
            Self::Notes => node.has_note(),
            Self::Branched => is_branched(node),
        }
    }
}

impl Display for NodeFilter {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown filter id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFilterError(pub String);

impl Display for ParseFilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unsupported filter `{}`; expected all|tasks|notes|branched",
            self.0
        )
    }
}

impl Error for ParseFilterError {}

impl FromStr for NodeFilter {
    type Err = ParseFilterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "tasks" => Ok(Self::Tasks),
            "notes" => Ok(Self::Notes),
            "branched" => Ok(Self::Branched),
            other => Err(ParseFilterError(other.to_string())),
        }
    }
}
