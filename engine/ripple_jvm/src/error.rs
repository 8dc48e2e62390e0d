//! Engine-level failures.
//!
//! Per-node analysis trouble is never an error: the safe fallback on any
//! uncertainty is to schedule more recompilation, since under-affecting
//! silently miscompiles while over-affecting merely slows the build. Errors
//! here mean the engine cannot run at all.

use thiserror::Error;

/// Failure to run a differentiation round.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DifferentiateError {
    /// The graph was built without an index the strategy chain requires.
    #[error("required back-dependency index `{name}` is not registered on the graph")]
    MissingIndex {
        /// The missing index's registered name.
        name: &'static str,
    },
}
