//! Collections: named groups of template states that can be materialized
//! with rebindable endpoints.
//!
//! A template may reference its endpoints through abstract [`StateRef::Symbol`]
//! names; the collection's context map binds those to concrete states when
//! the collection is read. The same template can be instantiated under
//! several collections, yielding distinct namespaced states.

use std::collections::BTreeMap;

use crate::error::{CrawlerError, Result};
use crate::state::{State, StateRef};

pub struct StateCollection<S> {
    name: String,
    context: BTreeMap<String, String>,
    states: Vec<State<S>>,
    collections: Vec<StateCollection<S>>,
}

impl<S> StateCollection<S> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            context: BTreeMap::new(),
            states: Vec::new(),
            collections: Vec::new(),
        }
    }

    /// Bind a symbol to the full name of a concrete state.
    pub fn bind(mut self, symbol: impl Into<String>, state: impl Into<String>) -> Self {
        self.context.insert(symbol.into(), state.into());
        self
    }

    /// Build a collection out of a module's states, under the module's name
    /// or a user-supplied one.
    pub fn from_states(name: impl Into<String>, states: impl IntoIterator<Item = State<S>>) -> Self {
        let mut collection = Self::new(name);
        for state in states {
            collection.register_state(state);
        }
        collection
    }

    /// Add a template state to the collection.
    pub fn register_state(&mut self, state: State<S>) {
        if self.states.iter().any(|s| s.origin() == state.origin()) {
            return;
        }
        self.states.push(state);
    }

    /// Add a subcollection.
    pub fn register_collection(&mut self, collection: StateCollection<S>) {
        self.collections.push(collection);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Materialize the collection: fresh namespaced clones of every template
    /// with symbols bound through the context map and sibling references
    /// rewritten to the clones. The templates themselves are untouched, and
    /// reading twice yields the same set (by full name).
    pub fn states(&self) -> Result<Vec<State<S>>> {
        let rename: BTreeMap<String, String> = self
            .states
            .iter()
            .map(|s| {
                (
                    s.full_name().to_string(),
                    format!("{}.{}", self.name, s.type_name()),
                )
            })
            .collect();

        let mut materialized = Vec::new();
        for template in &self.states {
            let mut clone = template.clone();
            clone.set_full_name(rename[template.full_name()].clone());
            self.bind_symbols(&mut clone, &rename)?;
            materialized.push(clone);
        }

        for child in &self.collections {
            let mut batch = child.states()?;
            let prefixed: BTreeMap<String, String> = batch
                .iter()
                .map(|s| {
                    (
                        s.full_name().to_string(),
                        format!("{}.{}", self.name, s.full_name()),
                    )
                })
                .collect();
            for state in &mut batch {
                state.set_full_name(prefixed[state.full_name()].clone());
                for transition in state.transitions_mut() {
                    transition.rebind(|r| match r {
                        StateRef::Named(name) if prefixed.contains_key(name) => {
                            StateRef::Named(prefixed[name].clone())
                        }
                        other => other.clone(),
                    });
                }
            }
            materialized.append(&mut batch);
        }

        Ok(materialized)
    }

    fn bind_symbols(&self, state: &mut State<S>, rename: &BTreeMap<String, String>) -> Result<()> {
        let full_name = state.full_name().to_string();
        for transition in state.transitions_mut() {
            for endpoint in [transition.source_ref(), transition.target_ref()]
                .into_iter()
                .flatten()
            {
                if let StateRef::Symbol(symbol) = endpoint {
                    if !self.context.contains_key(symbol) {
                        return Err(CrawlerError::declaration(format!(
                            "No substitution found for {symbol} in {full_name} inside {}",
                            self.name
                        )));
                    }
                }
            }
            transition.rebind(|r| match r {
                StateRef::Symbol(symbol) => StateRef::Named(self.context[symbol].clone()),
                StateRef::Named(name) if rename.contains_key(name) => {
                    StateRef::Named(rename[name].clone())
                }
                other => other.clone(),
            });
        }
        Ok(())
    }
}
