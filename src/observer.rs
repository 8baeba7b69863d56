//! Observation hooks: a callback invoked after every internal status
//! change, fed with the fresh [`GraphSnapshot`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::snapshot::GraphSnapshot;

/// A type which can observe crawler status changes.
///
/// The callback runs synchronously on the crawler thread at every status
/// change; implementations must be side-effect-light and must not call back
/// into the crawler.
pub trait StateChangeObserver: Send {
    fn on_change(&mut self, graph: &GraphSnapshot);
}

/// An observer which does nothing.
#[derive(Debug)]
pub struct NullObserver;

impl StateChangeObserver for NullObserver {
    fn on_change(&mut self, _: &GraphSnapshot) {}
}

/// Wraps a closure as an observer.
pub struct FnObserver<F>(F);

impl<F: FnMut(&GraphSnapshot) + Send> FnObserver<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F: FnMut(&GraphSnapshot) + Send> StateChangeObserver for FnObserver<F> {
    fn on_change(&mut self, graph: &GraphSnapshot) {
        (self.0)(graph)
    }
}

/// A shared cell holding the latest snapshot, for consumers running on
/// their own threads (the live viewer). The crawler side writes through the
/// observer returned by [`SnapshotCell::observer`]; readers take cheap
/// immutable copies.
#[derive(Clone, Default)]
pub struct SnapshotCell(Arc<Mutex<GraphSnapshot>>);

impl SnapshotCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer which keeps this cell up to date.
    pub fn observer(&self) -> impl StateChangeObserver {
        let cell = self.clone();
        FnObserver::new(move |graph: &GraphSnapshot| {
            *cell.0.lock() = graph.clone();
        })
    }

    /// The most recently published snapshot.
    pub fn latest(&self) -> GraphSnapshot {
        self.0.lock().clone()
    }
}
