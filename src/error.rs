//! The error taxonomy of the crawler toolkit.

use derive_more::{Display, Error};

/// Errors raised anywhere in the toolkit.
///
/// Declaration problems surface when the registry is frozen and are never
/// recovered. Runtime step failures are recorded into the crawler's
/// exclusion sets before being surfaced as [`CrawlerError::Transition`].
#[derive(Debug, Display, Error)]
pub enum CrawlerError {
    /// The declaration cannot be turned into a valid registry.
    #[display("{message}")]
    Declaration { message: String },

    /// A lookup by name or reference found no registered state.
    #[display("no registered state matches {query:?}")]
    NonExistentState { query: String },

    /// A lookup by name was ambiguous.
    #[display("too many registered states match {query:?}: {matches}")]
    MultipleStates { query: String, matches: String },

    /// The planner found no path under the current exclusions.
    #[display("There is no way to achieve state {state}")]
    UnreachableState { state: String },

    /// A step failed at runtime, or bulk traversal left states unvisited.
    #[display("{message}")]
    Transition { message: String },
}

impl CrawlerError {
    pub(crate) fn declaration(message: impl Into<String>) -> Self {
        Self::Declaration {
            message: message.into(),
        }
    }

    pub(crate) fn transition(message: impl Into<String>) -> Self {
        Self::Transition {
            message: message.into(),
        }
    }
}

pub type Result<T, E = CrawlerError> = std::result::Result<T, E>;
