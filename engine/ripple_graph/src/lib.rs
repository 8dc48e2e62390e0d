//! Ripple Graph - Persistent Dependency Graph Core
//!
//! Language-agnostic storage underneath the Ripple differentiation engine:
//!
//! - [`ReferenceId`] / [`NodeSource`] - stable identities for compiled units
//!   and their source files
//! - [`Node`] / [`Usage`] - the two capabilities the graph needs from a
//!   domain node model
//! - [`DependencyGraph`] - persistent multi-map with a built-in reverse-edge
//!   relation and named [`BackDependencyIndex`]es, mutated only by atomically
//!   integrating a round's [`Delta`]
//! - [`diff`] - keyed three-way diff algebra ([`Specifier`], [`Change`])
//!
//! # Round lifecycle
//!
//! A build coordinator produces a [`Delta`] per compilation round. The
//! differentiation driver (in a domain crate) borrows the graph shared and
//! overlays the delta to form present/future views; committing the round via
//! [`DependencyGraph::integrate`] requires exclusive access. That split is
//! the whole concurrency story: rounds either run one at a time against the
//! store, or against their own snapshot views.

mod delta;
pub mod diff;
mod graph;
mod node;
mod refs;

pub use delta::Delta;
pub use diff::{deep_diff, Change, Diff, DiffCapable, NoDiff, Specifier};
pub use graph::{BackDependencyIndex, DependencyGraph, IndexView};
pub use node::{Node, Usage};
pub use refs::{NodeSource, ReferenceId};
