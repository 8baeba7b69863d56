pub mod collection;
pub mod crawler;
pub mod error;
pub mod graph;
pub mod observer;
pub mod serializers;
pub mod snapshot;
pub mod state;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(feature = "diagrams")]
pub mod diagram;

#[cfg(feature = "webview")]
pub mod webview;

pub use collection::StateCollection;
pub use crawler::{StateMachineCrawler, ENTRY_POINT, ESCAPE_EDGE};
pub use error::{CrawlerError, Result};
pub use state::{State, StateRef, Transition};

pub mod prelude {
    pub use crate::collection::StateCollection;
    pub use crate::crawler::{StateMachineCrawler, ENTRY_POINT};
    pub use crate::error::{CrawlerError, Result};
    pub use crate::observer::{FnObserver, NullObserver, SnapshotCell, StateChangeObserver};
    pub use crate::snapshot::GraphSnapshot;
    pub use crate::state::{State, StateRef, Transition};
}
