//! The two capabilities the graph needs from domain types.
//!
//! The graph core is language-agnostic: it stores nodes, maintains reverse
//! edges, and feeds back-dependency indices. For that it only needs to know a
//! node's identity and the usages its compiled output records. Everything
//! else (members, metadata, diffing) belongs to the domain crate.

use crate::refs::ReferenceId;
use std::fmt::Debug;
use std::hash::Hash;

/// A recorded fact that a node's compiled output references a named symbol.
///
/// Usages have no lifecycle of their own: they are stored as part of a node's
/// outgoing facts and matched against changed symbols during differentiation.
pub trait Usage: Clone + Eq + Hash + Debug {
    /// The node or scope this usage is sensitive to.
    ///
    /// The graph derives its reverse edges from this: every node holding a
    /// usage with owner `O` is a depending node of `O`.
    fn element_owner(&self) -> &ReferenceId;
}

/// An immutable snapshot of a compiled unit's observable surface for one
/// compilation round.
///
/// Equality is content equality: the differentiation driver classifies a node
/// as "changed" when two snapshots under the same [`ReferenceId`] compare
/// unequal.
pub trait Node: Clone + PartialEq + Debug {
    /// The usage representation recorded by this node kind.
    type Usage: Usage;

    /// Stable identity of the compiled unit this node snapshots.
    fn reference_id(&self) -> &ReferenceId;

    /// The outgoing facts recorded in this node's compiled output.
    fn usages(&self) -> &[Self::Usage];
}
