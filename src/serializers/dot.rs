//! The DOT serializer: renders the snapshot as a graphviz digraph with
//! nested sub-graph clusters and node/edge colors reflecting the live
//! crawl status.

use std::collections::BTreeMap;

use super::hierarchy::{create_hierarchy, Hierarchy};
use super::Serializer;
use crate::snapshot::{EdgeView, GraphSnapshot, NodeView};

pub struct DotSerializer;

impl Serializer for DotSerializer {
    fn mimetype(&self) -> &'static str {
        "application/dot"
    }

    fn serialize(&self, graph: &GraphSnapshot) -> anyhow::Result<Vec<u8>> {
        Ok(to_dot(graph).into_bytes())
    }
}

pub fn to_dot(graph: &GraphSnapshot) -> String {
    let mut lines = vec![
        "digraph StateMachine {".to_string(),
        "    splines=polyline; concentrate=true; rankdir=LR;".to_string(),
    ];

    for (full_name, node) in &graph.nodes {
        if node.entry {
            lines.push(node_line(full_name, node));
        }
    }

    let mut cluster_index = 0;
    emit_clusters(&create_hierarchy(graph), &mut cluster_index, &mut lines);

    for node in graph.nodes.values() {
        for edge in node.transitions.values() {
            lines.push(edge_line(edge));
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}

fn emit_clusters(level: &BTreeMap<String, Hierarchy<'_>>, index: &mut usize, lines: &mut Vec<String>) {
    for (name, entry) in level {
        match entry {
            Hierarchy::Cluster(children) => {
                *index += 1;
                lines.push(format!(
                    "    subgraph cluster_{index} {{label=\"{name}\";color=blue;fontcolor=blue;"
                ));
                emit_clusters(children, index, lines);
                lines.push("    }".to_string());
            }
            Hierarchy::State { full_name, node } => lines.push(node_line(full_name, node)),
        }
    }
}

fn node_line(full_name: &str, node: &NodeView) -> String {
    let (shape, label) = if node.entry {
        ("doublecircle", "+")
    } else {
        ("box", node.name.as_str())
    };
    let (color, text_color) = if node.current {
        ("blue", "white")
    } else if node.next {
        ("dodgerblue", "black")
    } else if node.failed {
        (if node.visited { "orange" } else { "red" }, "black")
    } else if node.visited {
        ("forestgreen", "white")
    } else {
        ("white", "black")
    };
    format!(
        "    {} [style=filled label=\"{label}\" shape={shape} fillcolor={color} fontcolor={text_color}];",
        mangle(full_name)
    )
}

fn edge_line(edge: &EdgeView) -> String {
    let color = if edge.failed {
        if edge.visited {
            "orange"
        } else {
            "red"
        }
    } else if edge.current {
        "blue"
    } else if edge.visited {
        "forestgreen"
    } else {
        "black"
    };
    let label = if edge.cost == 1 {
        " ".to_string()
    } else {
        format!("${}", edge.cost)
    };
    format!(
        "    {} -> {} [color={color} fontcolor={color} label=\"{label}\"];",
        mangle(&edge.source),
        mangle(&edge.target)
    )
}

fn mangle(full_name: &str) -> String {
    full_name.replace('.', "_")
}
