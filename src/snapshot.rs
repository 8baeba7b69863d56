//! The observable view of a crawl: an immutable copy of the registry
//! annotated with live status flags.
//!
//! This is the only supported way to observe crawler internals; external
//! viewers and serializers consume nothing else.

use std::collections::BTreeMap;

/// A snapshot of the whole graph, keyed by `full_name`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "recording", derive(serde::Serialize))]
#[cfg_attr(feature = "recording", serde(transparent))]
pub struct GraphSnapshot {
    pub nodes: BTreeMap<String, NodeView>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "recording", derive(serde::Serialize))]
pub struct NodeView {
    /// The bare type name, without the module prefix.
    pub name: String,
    pub current: bool,
    pub next: bool,
    pub visited: bool,
    pub failed: bool,
    #[cfg_attr(feature = "recording", serde(rename = "_entry"))]
    pub entry: bool,
    /// Outgoing edges keyed by target `full_name`. Escape edges to the entry
    /// point are omitted.
    pub transitions: BTreeMap<String, EdgeView>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "recording", derive(serde::Serialize))]
pub struct EdgeView {
    pub name: String,
    pub cost: u32,
    pub visited: bool,
    pub failed: bool,
    pub current: bool,
    pub target: String,
    pub source: String,
}

impl GraphSnapshot {
    /// The full name of the state the crawler currently occupies.
    pub fn current(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(_, node)| node.current)
            .map(|(name, _)| name.as_str())
    }

    /// The full name of the state the crawler is stepping towards.
    pub fn next(&self) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(_, node)| node.next)
            .map(|(name, _)| name.as_str())
    }

    #[cfg(feature = "recording")]
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
