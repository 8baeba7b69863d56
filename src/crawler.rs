//! The crawler: registration, planning and the execute-then-verify step
//! machine.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use itertools::Itertools;
use regex::Regex;

use crate::collection::StateCollection;
use crate::error::{CrawlerError, Result};
use crate::graph::{
    dfs_order, filtered_adjacency, missing_nodes, shortest_path, Adjacency, Edge, NodeRecord,
    StateGraph,
};
use crate::observer::{NullObserver, StateChangeObserver};
use crate::snapshot::{EdgeView, GraphSnapshot, NodeView};
use crate::state::{State, StateRef, Transition};

/// Full name of the synthetic entry point, the universal escape and start
/// node. Unique per crawler; always verified.
pub const ENTRY_POINT: &str = "statecrawl.crawler.EntryPoint";

/// Name of the implicit escape edge every registered state gets.
pub const ESCAPE_EDGE: &str = "tempo";

/// Orchestrates the transitions of the system under test.
///
/// All transitions change the internal state of the `sut` handle passed at
/// construction; the crawler itself never inspects it. The nominated
/// initial state must be registered and must declare the single entry
/// transition (see [`StateRef::Entry`]).
pub struct StateMachineCrawler<S> {
    sut: S,
    initial: String,
    registered: Vec<State<S>>,
    graph: Option<Arc<StateGraph<S>>>,
    current: String,
    next: Option<String>,
    current_edge: Option<(String, String)>,
    error_states: HashSet<String>,
    error_edges: HashSet<(String, String)>,
    visited_states: HashSet<String>,
    visited_edges: HashSet<(String, String)>,
    observer: Box<dyn StateChangeObserver>,
}

impl<S> StateMachineCrawler<S> {
    pub fn new(sut: S, initial_state: impl Into<String>) -> Self {
        tracing::info!("state machine crawler initialized");
        Self {
            sut,
            initial: initial_state.into(),
            registered: Vec::new(),
            graph: None,
            current: ENTRY_POINT.to_string(),
            next: None,
            current_edge: None,
            error_states: HashSet::new(),
            error_edges: HashSet::new(),
            visited_states: HashSet::from([ENTRY_POINT.to_string()]),
            visited_edges: HashSet::new(),
            observer: Box::new(NullObserver),
        }
    }

    /// The current registered state of the system.
    pub fn state(&self) -> &str {
        &self.current
    }

    pub fn sut(&self) -> &S {
        &self.sut
    }

    pub fn sut_mut(&mut self) -> &mut S {
        &mut self.sut
    }

    /// Install the observer invoked after every internal status change.
    pub fn set_on_state_change_handler(&mut self, handler: impl StateChangeObserver + 'static) {
        self.observer = Box::new(handler);
    }

    pub fn register_state(&mut self, state: State<S>) -> Result<()> {
        if state.full_name() == ENTRY_POINT {
            return Err(CrawlerError::declaration(format!(
                "{ENTRY_POINT} is reserved for the entry point"
            )));
        }
        if let Some(existing) = self
            .registered
            .iter()
            .find(|s| s.full_name() == state.full_name())
        {
            if existing.origin() == state.origin() {
                return Ok(());
            }
            return Err(CrawlerError::declaration(format!(
                "a different state named {} is already registered",
                state.full_name()
            )));
        }
        self.graph = None;
        self.registered.push(state);
        Ok(())
    }

    /// Register every state of a module (a module exposes its public states
    /// as a `states()` constructor).
    pub fn register_states(&mut self, states: impl IntoIterator<Item = State<S>>) -> Result<()> {
        for state in states {
            self.register_state(state)?;
        }
        Ok(())
    }

    /// Materialize a collection and merge its states into the registry.
    pub fn register_collection(&mut self, collection: &StateCollection<S>) -> Result<()> {
        self.register_states(collection.states()?)
    }

    /// A snapshot of the registry plus live crawl annotations.
    pub fn as_graph(&mut self) -> Result<GraphSnapshot> {
        let graph = self.freeze()?;
        Ok(self.build_snapshot(&graph))
    }

    /// Reset the exclusion and visited sets and return to the entry point.
    pub fn clear(&mut self) {
        self.error_states.clear();
        self.error_edges.clear();
        self.visited_states.clear();
        self.visited_edges.clear();
        self.visited_states.insert(ENTRY_POINT.to_string());
        self.current = ENTRY_POINT.to_string();
        self.next = None;
        self.current_edge = None;
        if let Some(graph) = self.graph.clone() {
            self.notify(&graph);
        }
    }

    /// Drive the system from the current state to the target, following the
    /// cheapest live path.
    ///
    /// The target is matched by substring against the registered full
    /// names; moving to the current state replays its self-transition (or
    /// re-verifies it when none is declared).
    pub fn move_to(&mut self, target: &str) -> Result<()> {
        let graph = self.freeze()?;
        let target = graph.resolve(target)?;
        let steps: Vec<String> = if target == self.current {
            vec![target]
        } else {
            let filtered = filtered_adjacency(
                &graph.adjacency,
                ENTRY_POINT,
                &self.error_states,
                &self.error_edges,
            );
            let costs = |s: &str, t: &str| graph.edge_cost(s, t);
            let path = shortest_path(&filtered, &costs, &self.current, &target).ok_or(
                CrawlerError::UnreachableState {
                    state: target.clone(),
                },
            )?;
            path.iter().skip(1).cloned().collect()
        };
        for next in steps {
            self.do_step(&graph, &next)?;
        }
        Ok(())
    }

    /// Visit every registered state reachable from the entry point, in
    /// depth-first order, collecting step failures instead of aborting.
    ///
    /// `pattern` restricts the targets by a regex over `full_name`; with
    /// `full` the currently-selected state is re-verified as well. Raises
    /// once at the end when any targeted state was never visited.
    pub fn verify_all_states(&mut self, pattern: Option<&str>, full: bool) -> Result<()> {
        let graph = self.freeze()?;
        let matcher = pattern
            .map(|p| {
                Regex::new(p).map_err(|err| {
                    CrawlerError::declaration(format!("invalid pattern {p:?}: {err}"))
                })
            })
            .transpose()?;
        let targets: Vec<String> = dfs_order(&graph.adjacency, ENTRY_POINT)
            .into_iter()
            .filter(|name| name != ENTRY_POINT)
            .filter(|name| matcher.as_ref().map_or(true, |re| re.is_match(name)))
            .collect();

        for target in &targets {
            if !full && *target == self.current {
                continue;
            }
            match self.move_to(target) {
                Ok(()) => {}
                Err(CrawlerError::Transition { .. }) | Err(CrawlerError::UnreachableState { .. }) => {}
                Err(other) => return Err(other),
            }
        }
        self.notify(&graph);

        let unvisited = targets
            .iter()
            .filter(|target| !self.visited_states.contains(*target))
            .sorted()
            .join(", ");
        if !unvisited.is_empty() {
            return Err(CrawlerError::transition(format!(
                "Failed to visit the following states: {unvisited}"
            )));
        }
        Ok(())
    }

    fn freeze(&mut self) -> Result<Arc<StateGraph<S>>> {
        if let Some(graph) = &self.graph {
            return Ok(graph.clone());
        }
        let graph = Arc::new(build_graph(&self.registered, &self.initial)?);
        self.graph = Some(graph.clone());
        Ok(graph)
    }

    fn do_step(&mut self, graph: &Arc<StateGraph<S>>, next: &str) -> Result<()> {
        let cur = self.current.clone();
        let key = (cur.clone(), next.to_string());
        self.current_edge = Some(key.clone());
        self.next = Some(next.to_string());
        self.notify(graph);

        match graph.transitions.get(&key).map(|edge| edge.action.clone()) {
            Some(action) => {
                tracing::info!("transition to state {next} started");
                let moved = action(&mut self.sut);
                tracing::info!("transition to state {next} finished");
                self.notify(graph);
                if let Err(cause) = moved {
                    tracing::error!("failed to move to {next}: {cause:#}");
                    self.error_edges.insert(key);
                    for target in graph.adjacency.get(next).into_iter().flatten() {
                        self.error_edges.insert((next.to_string(), target.clone()));
                    }
                    self.reset_to_entry(graph);
                    return Err(step_error(&cur, next, "transition failure"));
                }
            }
            // no declared self-loop: re-verify the current state only
            None => {}
        }

        tracing::info!("verification of state {next} started");
        let verify = graph.node(next).verify.clone();
        let verified = verify(&mut self.sut);
        tracing::info!("verification of state {next} finished");
        match verified {
            Ok(true) => {
                self.current = next.to_string();
                self.visited_states.insert(next.to_string());
                if graph.transitions.contains_key(&key) {
                    self.visited_edges.insert(key);
                }
                self.next = None;
                self.current_edge = None;
                tracing::info!("state changed to {next}");
                self.notify(graph);
                Ok(())
            }
            outcome => {
                match outcome {
                    Err(cause) => {
                        tracing::error!("failed to verify transition to {next}: {cause:#}")
                    }
                    _ => tracing::error!("state verification error for {next}"),
                }
                self.error_states.insert(next.to_string());
                let filtered = filtered_adjacency(
                    &graph.adjacency,
                    ENTRY_POINT,
                    &self.error_states,
                    &self.error_edges,
                );
                let missing = missing_nodes(&graph.adjacency, &filtered, ENTRY_POINT);
                self.error_states.extend(missing);
                let dead_edges: Vec<(String, String)> = self
                    .error_states
                    .iter()
                    .flat_map(|state| {
                        graph
                            .adjacency
                            .get(state)
                            .into_iter()
                            .flatten()
                            .map(move |target| (state.clone(), target.clone()))
                    })
                    .collect();
                self.error_edges.extend(dead_edges);
                self.reset_to_entry(graph);
                Err(step_error(&cur, next, "verification failure"))
            }
        }
    }

    fn reset_to_entry(&mut self, graph: &StateGraph<S>) {
        self.current = ENTRY_POINT.to_string();
        self.next = None;
        self.current_edge = None;
        self.notify(graph);
    }

    fn notify(&mut self, graph: &StateGraph<S>) {
        let snapshot = self.build_snapshot(graph);
        self.observer.on_change(&snapshot);
    }

    fn build_snapshot(&self, graph: &StateGraph<S>) -> GraphSnapshot {
        let mut nodes = BTreeMap::new();
        for (name, record) in &graph.nodes {
            let mut transitions = BTreeMap::new();
            for target in graph.adjacency.get(name).into_iter().flatten() {
                if target == ENTRY_POINT {
                    continue;
                }
                let edge = graph.edge(name, target);
                let key = (name.clone(), target.clone());
                transitions.insert(
                    target.clone(),
                    EdgeView {
                        name: edge.name.clone(),
                        cost: edge.cost,
                        visited: self.visited_edges.contains(&key),
                        failed: self.error_edges.contains(&key)
                            || self.error_states.contains(name)
                            || self.error_states.contains(target),
                        current: self.current_edge.as_ref() == Some(&key),
                        target: target.clone(),
                        source: name.clone(),
                    },
                );
            }
            nodes.insert(
                name.clone(),
                NodeView {
                    name: record.type_name.clone(),
                    current: self.current == *name,
                    next: self.next.as_deref() == Some(name.as_str()),
                    visited: self.visited_states.contains(name),
                    failed: self.error_states.contains(name),
                    entry: name == ENTRY_POINT,
                    transitions,
                },
            );
        }
        GraphSnapshot { nodes }
    }
}

fn step_error(current: &str, next: &str, stage: &str) -> CrawlerError {
    CrawlerError::transition(format!(
        "Move from state {current} to state {next} has failed: {stage}"
    ))
}

fn resolve_initial<S>(registered: &[State<S>], query: &str) -> Result<String> {
    if let Some(state) = registered.iter().find(|s| s.full_name() == query) {
        return Ok(state.full_name().to_string());
    }
    let matches: Vec<&str> = registered
        .iter()
        .map(|s| s.full_name())
        .filter(|name| name.contains(query))
        .collect();
    match matches.as_slice() {
        [] => Err(CrawlerError::declaration(format!(
            "{query} is not a registered state"
        ))),
        [name] => Ok((*name).to_string()),
        _ => Err(CrawlerError::declaration(format!(
            "{query} matches more than one registered state"
        ))),
    }
}

fn build_graph<S>(registered: &[State<S>], initial_query: &str) -> Result<StateGraph<S>> {
    let initial = resolve_initial(registered, initial_query)?;

    let mut nodes: BTreeMap<String, NodeRecord<S>> = BTreeMap::new();
    nodes.insert(
        ENTRY_POINT.to_string(),
        NodeRecord {
            type_name: "EntryPoint".to_string(),
            verify: Arc::new(|_| Ok(true)),
        },
    );
    for state in registered {
        let verify = state.verify_fn().ok_or_else(|| {
            CrawlerError::declaration(format!(
                "{} has no verification predicate",
                state.full_name()
            ))
        })?;
        nodes.insert(
            state.full_name().to_string(),
            NodeRecord {
                type_name: state.type_name().to_string(),
                verify,
            },
        );
    }

    let mut transitions: HashMap<(String, String), Edge<S>> = HashMap::new();
    let mut entry_edges = 0usize;
    for state in registered {
        for transition in state.transitions() {
            if transition.cost_value() == 0 {
                return Err(CrawlerError::declaration(format!(
                    "transition {}.{} must have a strictly positive cost",
                    state.full_name(),
                    transition.name()
                )));
            }
            let (source, target) =
                resolve_endpoints(state.full_name(), &initial, transition, &nodes)?;
            if source == ENTRY_POINT {
                entry_edges += 1;
                if entry_edges > 1 {
                    return Err(CrawlerError::declaration(format!(
                        "more than one entry transition declared for {initial}"
                    )));
                }
            }
            insert_edge(
                &mut transitions,
                Edge {
                    name: transition.name().to_string(),
                    source,
                    target,
                    cost: transition.cost_value(),
                    action: transition.action(),
                },
            );
        }
    }
    if entry_edges == 0 {
        return Err(CrawlerError::declaration(format!(
            "{initial} has no entry transition"
        )));
    }

    // the implicit escape edge from every registered state
    for state in registered {
        insert_edge(
            &mut transitions,
            Edge {
                name: ESCAPE_EDGE.to_string(),
                source: state.full_name().to_string(),
                target: ENTRY_POINT.to_string(),
                cost: 1,
                action: Arc::new(|_| Ok(())),
            },
        );
    }

    let mut adjacency: Adjacency = nodes
        .keys()
        .map(|name| (name.clone(), BTreeSet::new()))
        .collect();
    for (source, target) in transitions.keys() {
        if let Some(targets) = adjacency.get_mut(source) {
            targets.insert(target.clone());
        }
    }

    Ok(StateGraph {
        nodes,
        adjacency,
        transitions,
    })
}

fn resolve_endpoints<S>(
    declaring: &str,
    initial: &str,
    transition: &Transition<S>,
    nodes: &BTreeMap<String, NodeRecord<S>>,
) -> Result<(String, String)> {
    let resolve = |endpoint: &StateRef, is_source: bool| -> Result<String> {
        match endpoint {
            StateRef::SelfState => Ok(declaring.to_string()),
            StateRef::Entry if is_source => {
                if declaring == initial {
                    Ok(ENTRY_POINT.to_string())
                } else {
                    Err(CrawlerError::declaration(format!(
                        "entry transition {declaring}.{} declared outside the initial state {initial}",
                        transition.name()
                    )))
                }
            }
            StateRef::Entry => Err(CrawlerError::declaration(format!(
                "the entry point cannot be the target of {declaring}.{}",
                transition.name()
            ))),
            StateRef::Named(name) if name == ENTRY_POINT => {
                Err(CrawlerError::declaration(format!(
                    "the entry point cannot be referenced by name (in {declaring}.{})",
                    transition.name()
                )))
            }
            StateRef::Named(name) => {
                if nodes.contains_key(name) {
                    Ok(name.clone())
                } else {
                    Err(CrawlerError::declaration(format!(
                        "{name} is not a registered state (referenced by {declaring}.{})",
                        transition.name()
                    )))
                }
            }
            StateRef::Symbol(symbol) => Err(CrawlerError::declaration(format!(
                "No substitution found for {symbol} in {declaring}"
            ))),
        }
    };
    match (transition.source_ref(), transition.target_ref()) {
        (None, None) => Err(CrawlerError::declaration(format!(
            "No target nor source state is defined for {declaring}.{}",
            transition.name()
        ))),
        (Some(source), None) => Ok((resolve(source, true)?, declaring.to_string())),
        (None, Some(target)) => Ok((declaring.to_string(), resolve(target, false)?)),
        (Some(source), Some(target)) => Ok((resolve(source, true)?, resolve(target, false)?)),
    }
}

/// When several declared transitions share endpoints, the cheapest wins and
/// declaration order breaks ties.
fn insert_edge<S>(transitions: &mut HashMap<(String, String), Edge<S>>, edge: Edge<S>) {
    match transitions.entry((edge.source.clone(), edge.target.clone())) {
        std::collections::hash_map::Entry::Occupied(mut occupied) => {
            if edge.cost < occupied.get().cost {
                occupied.insert(edge);
            }
        }
        std::collections::hash_map::Entry::Vacant(vacant) => {
            vacant.insert(edge);
        }
    }
}
