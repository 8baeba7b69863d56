//! The plain-text serializer: a deterministic status listing, one state per
//! block.

use super::Serializer;
use crate::snapshot::{GraphSnapshot, NodeView};

pub struct TextSerializer;

impl Serializer for TextSerializer {
    fn mimetype(&self) -> &'static str {
        "text/plain"
    }

    fn serialize(&self, graph: &GraphSnapshot) -> anyhow::Result<Vec<u8>> {
        Ok(to_text(graph).into_bytes())
    }
}

pub fn to_text(graph: &GraphSnapshot) -> String {
    let mut out = String::new();
    for (full_name, node) in &graph.nodes {
        let flags = node_flags(node);
        if flags.is_empty() {
            out.push_str(&format!("{full_name}\n"));
        } else {
            out.push_str(&format!("{full_name} [{}]\n", flags.join(", ")));
        }
        for edge in node.transitions.values() {
            let status = if edge.failed {
                " failed"
            } else if edge.current {
                " current"
            } else if edge.visited {
                " visited"
            } else {
                ""
            };
            out.push_str(&format!(
                "  -({})-> {} cost={}{status}\n",
                edge.name, edge.target, edge.cost
            ));
        }
    }
    out
}

fn node_flags(node: &NodeView) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if node.entry {
        flags.push("entry");
    }
    if node.current {
        flags.push("current");
    }
    if node.next {
        flags.push("next");
    }
    if node.failed {
        flags.push("failed");
    }
    if node.visited {
        flags.push("visited");
    }
    flags
}
