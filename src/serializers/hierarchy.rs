//! Groups snapshot nodes into a cluster tree by the dotted prefix of their
//! full names, for the DOT serializer's nested sub-graphs.

use std::collections::BTreeMap;

use crate::snapshot::{GraphSnapshot, NodeView};

pub enum Hierarchy<'a> {
    Cluster(BTreeMap<String, Hierarchy<'a>>),
    State {
        full_name: &'a str,
        node: &'a NodeView,
    },
}

/// The cluster hierarchy of every non-entry node in the snapshot.
pub fn create_hierarchy(graph: &GraphSnapshot) -> BTreeMap<String, Hierarchy<'_>> {
    let mut root = BTreeMap::new();
    for (full_name, node) in &graph.nodes {
        if node.entry {
            continue;
        }
        let mut segments: Vec<&str> = full_name.split('.').collect();
        let leaf = segments.pop().unwrap_or(full_name);
        let mut cursor = &mut root;
        for segment in segments {
            let entry = cursor
                .entry(segment.to_string())
                .or_insert_with(|| Hierarchy::Cluster(BTreeMap::new()));
            // a state name shadowed by a deeper one becomes a cluster
            if !matches!(entry, Hierarchy::Cluster(_)) {
                *entry = Hierarchy::Cluster(BTreeMap::new());
            }
            let Hierarchy::Cluster(children) = entry else {
                unreachable!()
            };
            cursor = children;
        }
        cursor.insert(leaf.to_string(), Hierarchy::State { full_name, node });
    }
    root
}
