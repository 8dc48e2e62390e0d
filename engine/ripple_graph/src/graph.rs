//! The persistent dependency graph and its derived reverse indices.
//!
//! The graph is a multi-map: a [`ReferenceId`] may be defined by several
//! sources (the duplicate-class case the differentiation rules must detect),
//! and one source may define several nodes. Alongside node storage the graph
//! maintains:
//!
//! - a built-in reverse-edge relation (`depending_nodes`): derived from every
//!   node's usages' element owners,
//! - any number of named back-dependency indices, each derived purely from
//!   node content via a registered [`BackDependencyIndex`] descriptor.
//!
//! Both are refcounted so that incremental maintenance under node add/remove
//! exactly matches a from-scratch rebuild (the idempotence property). The
//! only mutation entry point is [`DependencyGraph::integrate`], which commits
//! a round's [`Delta`] as one atomic step: node storage and every index are
//! never observable in a partially-updated state, because integration takes
//! `&mut self` while differentiation passes borrow the graph shared.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::debug;

use crate::delta::Delta;
use crate::node::{Node, Usage};
use crate::refs::{NodeSource, ReferenceId};

/// Descriptor of a named back-dependency index.
///
/// `keys` must be a pure function of the node's immutable content: no
/// external state, so rebuilding an index from the stored node set always
/// reproduces the same mapping.
pub trait BackDependencyIndex<N> {
    /// Name the index is registered and looked up under.
    fn name(&self) -> &'static str;

    /// The derived keys this node depends on.
    fn keys(&self, node: &N) -> SmallVec<[ReferenceId; 4]>;
}

/// Refcounted key -> set-of-dependents relation.
///
/// Two nodes sharing an id (duplicate definitions from different sources) may
/// contribute the same (key, dependent) pair; plain set semantics would drop
/// the pair too early when only one of them is removed.
#[derive(Debug, Default)]
struct RefCountedRelation {
    map: FxHashMap<ReferenceId, FxHashMap<ReferenceId, u32>>,
}

impl RefCountedRelation {
    fn add(&mut self, key: ReferenceId, dependent: ReferenceId) {
        *self.map.entry(key).or_default().entry(dependent).or_insert(0) += 1;
    }

    fn remove(&mut self, key: &ReferenceId, dependent: &ReferenceId) {
        if let Some(dependents) = self.map.get_mut(key) {
            if let Some(count) = dependents.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    dependents.remove(dependent);
                }
            }
            if dependents.is_empty() {
                self.map.remove(key);
            }
        }
    }

    fn get(&self, key: &ReferenceId) -> impl Iterator<Item = &ReferenceId> {
        self.map.get(key).into_iter().flatten().map(|(id, _)| id)
    }

    fn entries(&self) -> impl Iterator<Item = (&ReferenceId, impl Iterator<Item = &ReferenceId>)> {
        self.map
            .iter()
            .map(|(key, dependents)| (key, dependents.keys()))
    }
}

struct IndexStorage<N> {
    descriptor: Box<dyn BackDependencyIndex<N>>,
    relation: RefCountedRelation,
}

/// Read view over one named back-dependency index.
pub struct IndexView<'a> {
    relation: &'a RefCountedRelation,
}

impl IndexView<'_> {
    /// Ids of nodes depending on the derived key.
    pub fn dependents(&self, key: &ReferenceId) -> impl Iterator<Item = &ReferenceId> {
        self.relation.get(key)
    }

    /// Every (key, dependents) entry, for diagnostics and rebuild checks.
    pub fn entries(&self) -> impl Iterator<Item = (&ReferenceId, impl Iterator<Item = &ReferenceId>)> {
        self.relation.entries()
    }
}

/// The persistent node store plus its derived reverse indices.
pub struct DependencyGraph<N: Node> {
    nodes_by_source: FxHashMap<NodeSource, Vec<N>>,
    sources_by_id: FxHashMap<ReferenceId, FxHashSet<NodeSource>>,
    node_backdeps: RefCountedRelation,
    indices: Vec<IndexStorage<N>>,
}

impl<N: Node> DependencyGraph<N> {
    /// An empty graph with the given index descriptors registered.
    #[must_use]
    pub fn new(indices: Vec<Box<dyn BackDependencyIndex<N>>>) -> Self {
        Self {
            nodes_by_source: FxHashMap::default(),
            sources_by_id: FxHashMap::default(),
            node_backdeps: RefCountedRelation::default(),
            indices: indices
                .into_iter()
                .map(|descriptor| IndexStorage {
                    descriptor,
                    relation: RefCountedRelation::default(),
                })
                .collect(),
        }
    }

    /// Nodes currently stored under `id`, across all defining sources.
    pub fn nodes(&self, id: &ReferenceId) -> impl Iterator<Item = &N> {
        let id = id.clone();
        self.sources_by_id
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|source| self.nodes_by_source.get(source))
            .flatten()
            .filter(move |node| *node.reference_id() == id)
    }

    /// Sources that define `id`.
    pub fn sources(&self, id: &ReferenceId) -> impl Iterator<Item = &NodeSource> {
        self.sources_by_id.get(id).into_iter().flatten()
    }

    /// Nodes a source defines.
    #[must_use]
    pub fn nodes_of(&self, source: &NodeSource) -> &[N] {
        self.nodes_by_source
            .get(source)
            .map_or(&[], Vec::as_slice)
    }

    /// Every id with at least one stored node.
    pub fn registered_nodes(&self) -> impl Iterator<Item = &ReferenceId> {
        self.sources_by_id
            .iter()
            .filter(|(_, sources)| !sources.is_empty())
            .map(|(id, _)| id)
    }

    /// Ids of nodes whose recorded usages reference `id`.
    pub fn depending_nodes(&self, id: &ReferenceId) -> impl Iterator<Item = &ReferenceId> {
        self.node_backdeps.get(id)
    }

    /// The named back-dependency index, if registered.
    #[must_use]
    pub fn index(&self, name: &str) -> Option<IndexView<'_>> {
        self.indices
            .iter()
            .find(|storage| storage.descriptor.name() == name)
            .map(|storage| IndexView {
                relation: &storage.relation,
            })
    }

    /// Derive the named index's keys for a node that is not (or not yet)
    /// stored. Used to overlay a round's delta onto index queries.
    #[must_use]
    pub fn index_keys(&self, name: &str, node: &N) -> Option<SmallVec<[ReferenceId; 4]>> {
        self.indices
            .iter()
            .find(|storage| storage.descriptor.name() == name)
            .map(|storage| storage.descriptor.keys(node))
    }

    /// Commit a round's delta: remove nodes of deleted and recompiled
    /// sources, store the replacement nodes, and update the reverse relation
    /// and every named index incrementally.
    pub fn integrate(&mut self, delta: &Delta<N>) {
        for source in delta.deleted_sources().iter().chain(delta.base_sources()) {
            self.remove_source(source);
        }
        for source in delta.base_sources() {
            let nodes = delta.nodes_of(source);
            if nodes.is_empty() {
                continue;
            }
            for node in nodes {
                self.contribute(node);
                self.sources_by_id
                    .entry(node.reference_id().clone())
                    .or_default()
                    .insert(source.clone());
            }
            self.nodes_by_source
                .entry(source.clone())
                .or_default()
                .extend(nodes.iter().cloned());
        }
        debug!(
            base = delta.base_sources().len(),
            deleted = delta.deleted_sources().len(),
            "integrated delta"
        );
    }

    fn remove_source(&mut self, source: &NodeSource) {
        let Some(nodes) = self.nodes_by_source.remove(source) else {
            return;
        };
        for node in &nodes {
            self.retract(node);
            if let Some(sources) = self.sources_by_id.get_mut(node.reference_id()) {
                sources.remove(source);
                if sources.is_empty() {
                    self.sources_by_id.remove(node.reference_id());
                }
            }
        }
    }

    fn contribute(&mut self, node: &N) {
        let id = node.reference_id();
        for usage in node.usages() {
            self.node_backdeps
                .add(usage.element_owner().clone(), id.clone());
        }
        for storage in &mut self.indices {
            for key in storage.descriptor.keys(node) {
                storage.relation.add(key, id.clone());
            }
        }
    }

    fn retract(&mut self, node: &N) {
        let id = node.reference_id();
        for usage in node.usages() {
            self.node_backdeps.remove(usage.element_owner(), id);
        }
        for storage in &mut self.indices {
            for key in storage.descriptor.keys(node) {
                storage.relation.remove(&key, id);
            }
        }
    }
}

impl<N: Node> std::fmt::Debug for DependencyGraph<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("sources", &self.nodes_by_source.len())
            .field("ids", &self.sources_by_id.len())
            .field("indices", &self.indices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests;
