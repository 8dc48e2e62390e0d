//! Per-round change set fed to the engine by the build coordinator.
//!
//! A [`Delta`] carries the replacement nodes produced by one compilation
//! round, keyed by the sources that were actually recompiled
//! (`base_sources`), plus the sources deleted this round. It answers the same
//! id/source queries as the persistent graph so the differentiation driver
//! can form a "future" view (graph + delta overlay) without copying storage.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::node::Node;
use crate::refs::{NodeSource, ReferenceId};

/// The added/removed/changed node information for one compilation round.
#[derive(Debug)]
pub struct Delta<N: Node> {
    nodes_by_source: FxHashMap<NodeSource, Vec<N>>,
    sources_by_id: FxHashMap<ReferenceId, FxHashSet<NodeSource>>,
    base_sources: FxHashSet<NodeSource>,
    deleted_sources: FxHashSet<NodeSource>,
    source_only: bool,
}

impl<N: Node> Delta<N> {
    /// A delta for a round that recompiled `base_sources` and deleted
    /// `deleted_sources`.
    pub fn new(
        base_sources: impl IntoIterator<Item = NodeSource>,
        deleted_sources: impl IntoIterator<Item = NodeSource>,
    ) -> Self {
        Self {
            nodes_by_source: FxHashMap::default(),
            sources_by_id: FxHashMap::default(),
            base_sources: base_sources.into_iter().collect(),
            deleted_sources: deleted_sources.into_iter().collect(),
            source_only: false,
        }
    }

    /// A delta for a round where only source-level, non-semantic facts
    /// changed. Differentiation short-circuits for such rounds.
    pub fn source_only(base_sources: impl IntoIterator<Item = NodeSource>) -> Self {
        let mut delta = Self::new(base_sources, []);
        delta.source_only = true;
        delta
    }

    /// Record the nodes a recompiled source produced this round.
    ///
    /// The source is added to `base_sources` if not already present.
    pub fn associate(&mut self, source: NodeSource, nodes: Vec<N>) {
        for node in &nodes {
            self.sources_by_id
                .entry(node.reference_id().clone())
                .or_default()
                .insert(source.clone());
        }
        self.base_sources.insert(source.clone());
        self.nodes_by_source.entry(source).or_default().extend(nodes);
    }

    /// Replacement nodes recorded under `id` this round.
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

    /// Replacement nodes a recompiled source produced, if any.
    #[must_use]
    pub fn nodes_of(&self, source: &NodeSource) -> &[N] {
        self.nodes_by_source
            .get(source)
            .map_or(&[], Vec::as_slice)
    }

    /// Sources that produced a node under `id` this round.
    pub fn sources(&self, id: &ReferenceId) -> impl Iterator<Item = &NodeSource> {
        self.sources_by_id.get(id).into_iter().flatten()
    }

    /// Every replacement node in this delta.
    pub fn all_nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes_by_source.values().flatten()
    }

    /// Sources actually recompiled this round.
    #[must_use]
    pub fn base_sources(&self) -> &FxHashSet<NodeSource> {
        &self.base_sources
    }

    /// Sources deleted this round.
    #[must_use]
    pub fn deleted_sources(&self) -> &FxHashSet<NodeSource> {
        &self.deleted_sources
    }

    /// True when only source-level, non-semantic facts changed.
    #[must_use]
    pub fn is_source_only(&self) -> bool {
        self.source_only
    }
}
