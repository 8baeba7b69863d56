//! The frozen registry graph and the reachability planner.
//!
//! Nodes are keyed by `full_name` throughout; the adjacency map and the
//! transition map are kept consistent by construction: `t ∈ adjacency[s]`
//! iff `(s, t)` is a key of the transition map.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::error::{CrawlerError, Result};
use crate::state::{MoveFn, VerifyFn};

/// Adjacency map of the registry graph, keyed by `full_name`.
pub type Adjacency = BTreeMap<String, BTreeSet<String>>;

/// A finalized transition with both endpoints bound to registered states.
pub(crate) struct Edge<S> {
    pub name: String,
    pub source: String,
    pub target: String,
    pub cost: u32,
    pub action: MoveFn<S>,
}

pub(crate) struct NodeRecord<S> {
    pub type_name: String,
    pub verify: VerifyFn<S>,
}

/// The frozen registry: every state and transition with resolved endpoints.
pub(crate) struct StateGraph<S> {
    pub nodes: BTreeMap<String, NodeRecord<S>>,
    pub adjacency: Adjacency,
    pub transitions: HashMap<(String, String), Edge<S>>,
}

impl<S> StateGraph<S> {
    /// Resolve a user query to a unique registered state by substring match
    /// on `full_name`.
    pub fn resolve(&self, query: &str) -> Result<String> {
        let matches: Vec<&String> = self.nodes.keys().filter(|n| n.contains(query)).collect();
        match matches.as_slice() {
            [] => Err(CrawlerError::NonExistentState {
                query: query.to_string(),
            }),
            [name] => Ok((*name).clone()),
            many => Err(CrawlerError::MultipleStates {
                query: query.to_string(),
                matches: itertools::join(many, ", "),
            }),
        }
    }

    pub fn node(&self, name: &str) -> &NodeRecord<S> {
        self.nodes
            .get(name)
            .expect("adjacency refers to an unregistered node")
    }

    pub fn edge(&self, source: &str, target: &str) -> &Edge<S> {
        self.transitions
            .get(&(source.to_string(), target.to_string()))
            .expect("adjacency and transition map out of sync")
    }

    pub fn edge_cost(&self, source: &str, target: &str) -> u32 {
        self.edge(source, target).cost
    }
}

/// The sub-graph reachable from `root` once the excluded states and edges
/// are removed. Nodes whose every incoming edge was excluded drop out
/// transitively.
pub fn filtered_adjacency(
    adjacency: &Adjacency,
    root: &str,
    excluded_states: &HashSet<String>,
    excluded_edges: &HashSet<(String, String)>,
) -> Adjacency {
    let mut filtered = Adjacency::new();
    if excluded_states.contains(root) {
        return filtered;
    }
    let mut stack = vec![root.to_string()];
    while let Some(node) = stack.pop() {
        if filtered.contains_key(&node) {
            continue;
        }
        let next: BTreeSet<String> = adjacency
            .get(&node)
            .into_iter()
            .flatten()
            .filter(|n| !excluded_states.contains(*n))
            .filter(|n| !excluded_edges.contains(&(node.clone(), (*n).clone())))
            .cloned()
            .collect();
        stack.extend(next.iter().filter(|n| !filtered.contains_key(*n)).cloned());
        filtered.insert(node, next);
    }
    filtered
}

/// Every node reachable from `root` in the full graph but absent from the
/// filtered one: the states that became unreachable under the exclusions.
pub fn missing_nodes(adjacency: &Adjacency, filtered: &Adjacency, root: &str) -> BTreeSet<String> {
    reachable(adjacency, root)
        .into_iter()
        .filter(|n| !filtered.contains_key(n))
        .collect()
}

/// The set of nodes reachable from `root`.
pub fn reachable(adjacency: &Adjacency, root: &str) -> BTreeSet<String> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![root.to_string()];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.clone()) {
            continue;
        }
        stack.extend(adjacency.get(&node).into_iter().flatten().cloned());
    }
    seen
}

/// The cheapest simple path from `start` to `end`, by summed transition
/// cost. Ties go to the lexicographically earlier neighbor, so the result
/// is deterministic. `None` when the nodes are not connected.
pub fn shortest_path(
    adjacency: &Adjacency,
    cost_of: &dyn Fn(&str, &str) -> u32,
    start: &str,
    end: &str,
) -> Option<im::Vector<String>> {
    let path = im::vector![start.to_string()];
    if start == end {
        return Some(path);
    }
    if !adjacency.contains_key(start) {
        return None;
    }
    let mut best: Option<(u32, im::Vector<String>)> = None;
    search(adjacency, cost_of, start, end, path, 0, &mut best);
    best.map(|(_, path)| path)
}

fn search(
    adjacency: &Adjacency,
    cost_of: &dyn Fn(&str, &str) -> u32,
    node: &str,
    end: &str,
    path: im::Vector<String>,
    cost: u32,
    best: &mut Option<(u32, im::Vector<String>)>,
) {
    if node == end {
        if best.as_ref().map_or(true, |(c, _)| cost < *c) {
            *best = Some((cost, path));
        }
        return;
    }
    for next in adjacency.get(node).into_iter().flatten() {
        if path.contains(next) {
            continue;
        }
        let mut longer = path.clone();
        longer.push_back(next.clone());
        search(
            adjacency,
            cost_of,
            next,
            end,
            longer,
            cost + cost_of(node, next),
            best,
        );
    }
}

/// A deterministic depth-first linearization of every node reachable from
/// `root`. Children are pushed in ascending name order, so they are visited
/// in descending order, which keeps the output reproducible.
pub fn dfs_order(adjacency: &Adjacency, root: &str) -> Vec<String> {
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root.to_string()];
    while let Some(node) = stack.pop() {
        if !seen.insert(node.clone()) {
            continue;
        }
        stack.extend(adjacency.get(&node).into_iter().flatten().cloned());
        order.push(node);
    }
    order
}
