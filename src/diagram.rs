//! Export a snapshot as a petgraph [`DiGraph`], for programmatic analysis
//! or a quick `Dot` rendering.

use std::collections::HashMap;

use petgraph::graph::DiGraph;

use crate::snapshot::GraphSnapshot;

/// Nodes carry the full state name, edges the transition name.
pub fn to_graph(snapshot: &GraphSnapshot) -> DiGraph<String, String> {
    let mut graph = DiGraph::new();
    let mut indices = HashMap::new();
    for name in snapshot.nodes.keys() {
        indices.insert(name.clone(), graph.add_node(name.clone()));
    }
    for (source, node) in &snapshot.nodes {
        for edge in node.transitions.values() {
            graph.add_edge(indices[source], indices[&edge.target], edge.name.clone());
        }
    }
    graph
}

pub fn to_dot<N, E>(graph: &DiGraph<N, E>, config: &[petgraph::dot::Config]) -> String
where
    N: core::fmt::Display,
    E: core::fmt::Display,
{
    format!("{}", petgraph::dot::Dot::with_config(graph, config))
}

pub fn write_dot<N, E>(
    filename: &str,
    graph: &DiGraph<N, E>,
    config: &[petgraph::dot::Config],
) -> std::io::Result<()>
where
    N: core::fmt::Display,
    E: core::fmt::Display,
{
    std::fs::write(filename, to_dot(graph, config))
}
