//! The declaration model: states, transitions and endpoint references.
//!
//! A [`State`] is a plain record carrying its dotted `full_name`, a
//! verification predicate and the transitions declared on it. States are
//! immutable once registered with a crawler; collections clone them into
//! fresh, renamed records instead of mutating.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) type MoveFn<S> = Arc<dyn Fn(&mut S) -> anyhow::Result<()> + Send + Sync>;
pub(crate) type VerifyFn<S> = Arc<dyn Fn(&mut S) -> anyhow::Result<bool> + Send + Sync>;

/// Identity token of a declaration.
///
/// Every `State::new` and `Transition::new` mints a fresh id. Clones keep
/// the id, rebound copies made by collections get fresh ones, which is what
/// makes materialized transitions non-equivalent to their templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u64);

impl DeclId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        DeclId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A reference to a transition endpoint, resolved when the registry freezes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateRef {
    /// The declaring state itself.
    SelfState,
    /// The crawler's synthetic entry point. Only valid as the source of the
    /// single entry transition declared on the nominated initial state.
    Entry,
    /// A concrete state, referenced by its full name.
    Named(String),
    /// An abstract name, bound to a concrete state by a collection's
    /// context map.
    Symbol(String),
}

impl StateRef {
    pub fn named(name: impl Into<String>) -> Self {
        StateRef::Named(name.into())
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        StateRef::Symbol(name.into())
    }
}

impl From<&str> for StateRef {
    fn from(name: &str) -> Self {
        StateRef::Named(name.to_string())
    }
}

impl From<String> for StateRef {
    fn from(name: String) -> Self {
        StateRef::Named(name)
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateRef::SelfState => write!(f, "self"),
            StateRef::Entry => write!(f, "<entry>"),
            StateRef::Named(name) => write!(f, "{name}"),
            StateRef::Symbol(name) => write!(f, "${name}"),
        }
    }
}

/// A transformation of the system from one state into another.
///
/// The cost is the relative price of the transition; transitions that take
/// longer to run are more expensive, and the planner minimizes the summed
/// cost of a path. There can be only a `target` or only a `source` because a
/// possible transition from **A** to **B** does not imply that the opposite
/// move can be performed the same way; the missing endpoint is the declaring
/// state.
pub struct Transition<S> {
    name: String,
    source: Option<StateRef>,
    target: Option<StateRef>,
    cost: u32,
    decl: DeclId,
    action: MoveFn<S>,
}

impl<S> Transition<S> {
    pub fn new(
        name: impl Into<String>,
        action: impl Fn(&mut S) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            source: None,
            target: None,
            cost: 1,
            decl: DeclId::fresh(),
            action: Arc::new(action),
        }
    }

    /// The state to which the system should be transitioned.
    pub fn target(mut self, target: impl Into<StateRef>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// The state from which the system should be transitioned.
    pub fn source(mut self, source: impl Into<StateRef>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    /// Link this declaration to different endpoints without creating a new
    /// declaration, for the situation when multiple states can perform
    /// similar transitions. `None` keeps the endpoint as declared.
    pub fn link(&self, target: Option<StateRef>, source: Option<StateRef>) -> Self {
        Self {
            name: self.name.clone(),
            source: source.or_else(|| self.source.clone()),
            target: target.or_else(|| self.target.clone()),
            cost: self.cost,
            decl: self.decl,
            action: self.action.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaration(&self) -> DeclId {
        self.decl
    }

    pub(crate) fn source_ref(&self) -> Option<&StateRef> {
        self.source.as_ref()
    }

    pub(crate) fn target_ref(&self) -> Option<&StateRef> {
        self.target.as_ref()
    }

    pub(crate) fn cost_value(&self) -> u32 {
        self.cost
    }

    pub(crate) fn action(&self) -> MoveFn<S> {
        self.action.clone()
    }

    pub(crate) fn rebind(&mut self, f: impl Fn(&StateRef) -> StateRef) {
        self.source = self.source.as_ref().map(&f);
        self.target = self.target.as_ref().map(&f);
        self.decl = DeclId::fresh();
    }
}

// not derived: a clone shares the action, the SUT type need not be Clone
impl<S> Clone for Transition<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            source: self.source.clone(),
            target: self.target.clone(),
            cost: self.cost,
            decl: self.decl,
            action: self.action.clone(),
        }
    }
}

impl<S> fmt::Debug for Transition<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("target", &self.target)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

/// Two transitions are equivalent iff they are the same declared entity and
/// their endpoints match. Declarations rebound into distinct collection
/// clones are not equivalent.
pub fn equivalent<S>(a: Option<&Transition<S>>, b: Option<&Transition<S>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.decl == b.decl && a.source == b.source && a.target == b.target,
        _ => false,
    }
}

/// A state of the system under test: a named verification predicate plus the
/// transitions declared on it.
pub struct State<S> {
    full_name: String,
    type_name: String,
    origin: DeclId,
    verify: Option<VerifyFn<S>>,
    transitions: Vec<Transition<S>>,
}

impl<S> State<S> {
    /// Declare a state named `<module>.<name>`.
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        let type_name = name.into();
        Self {
            full_name: format!("{}.{}", module.into(), type_name),
            type_name,
            origin: DeclId::fresh(),
            verify: None,
            transitions: Vec::new(),
        }
    }

    /// The verification predicate: checks whether the system ended up in the
    /// desired state. Required; a state without one cannot be registered.
    pub fn verify(
        mut self,
        verify: impl Fn(&mut S) -> anyhow::Result<bool> + Send + Sync + 'static,
    ) -> Self {
        self.verify = Some(Arc::new(verify));
        self
    }

    pub fn transition(mut self, transition: Transition<S>) -> Self {
        self.transitions.push(transition);
        self
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn transitions(&self) -> &[Transition<S>] {
        &self.transitions
    }

    pub(crate) fn origin(&self) -> DeclId {
        self.origin
    }

    pub(crate) fn verify_fn(&self) -> Option<VerifyFn<S>> {
        self.verify.clone()
    }

    pub(crate) fn set_full_name(&mut self, full_name: String) {
        self.full_name = full_name;
    }

    pub(crate) fn transitions_mut(&mut self) -> &mut Vec<Transition<S>> {
        &mut self.transitions
    }
}

impl<S> Clone for State<S> {
    fn clone(&self) -> Self {
        Self {
            full_name: self.full_name.clone(),
            type_name: self.type_name.clone(),
            origin: self.origin,
            verify: self.verify.clone(),
            transitions: self.transitions.clone(),
        }
    }
}

impl<S> fmt::Debug for State<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("full_name", &self.full_name)
            .field("transitions", &self.transitions)
            .finish_non_exhaustive()
    }
}
