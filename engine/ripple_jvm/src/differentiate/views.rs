//! Present and future graph views.
//!
//! A differentiation pass compares "what depended on the old node" against
//! "what would depend on the new node". The present view is the persistent
//! graph as-is; the future view overlays the round's delta copy-on-write:
//! nodes from recompiled or deleted sources are masked and the delta's
//! replacement nodes take their place. No storage is copied and the graph is
//! never mutated during a pass.

use ripple_graph::{Delta, DependencyGraph, NodeSource, ReferenceId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::index::{KotlinSubclassesIndex, SubclassesIndex};
use crate::model::{JvmClass, JvmMethod, KotlinMeta};

/// Pass-scoped memo of full subclass closures.
///
/// Lives for one differentiation pass and is passed by reference wherever
/// the closure is needed; never shared across passes or rounds. Present and
/// future views memoize separately: their closures legitimately differ.
#[derive(Debug, Default)]
pub struct SubclassCache {
    present: FxHashMap<ReferenceId, Vec<ReferenceId>>,
    future: FxHashMap<ReferenceId, Vec<ReferenceId>>,
}

/// A view over the graph, optionally overlaid with the round's delta.
#[derive(Copy, Clone)]
pub struct Utils<'a> {
    graph: &'a DependencyGraph<JvmClass>,
    delta: Option<&'a Delta<JvmClass>>,
}

impl<'a> Utils<'a> {
    /// The pre-round state: the graph alone.
    #[must_use]
    pub fn present(graph: &'a DependencyGraph<JvmClass>) -> Self {
        Self { graph, delta: None }
    }

    /// The post-round state: the graph with the delta applied on top.
    #[must_use]
    pub fn future(graph: &'a DependencyGraph<JvmClass>, delta: &'a Delta<JvmClass>) -> Self {
        Self {
            graph,
            delta: Some(delta),
        }
    }

    /// True when the stored facts of `source` are superseded this round.
    fn is_masked(&self, source: &NodeSource) -> bool {
        self.delta.is_some_and(|delta| {
            delta.base_sources().contains(source) || delta.deleted_sources().contains(source)
        })
    }

    /// True when every graph-stored definition of `id` is superseded.
    fn is_fully_masked(&self, id: &ReferenceId) -> bool {
        self.delta.is_some() && {
            let mut any = false;
            for source in self.graph.sources(id) {
                any = true;
                if !self.is_masked(source) {
                    return false;
                }
            }
            any
        }
    }

    /// Node snapshots visible under `id` in this view.
    #[must_use]
    pub fn nodes(&self, id: &ReferenceId) -> Vec<&'a JvmClass> {
        let mut out: Vec<&'a JvmClass> = Vec::new();
        if let Some(delta) = self.delta {
            out.extend(delta.nodes(id));
        }
        for source in self.graph.sources(id) {
            if !self.is_masked(source) {
                out.extend(
                    self.graph
                        .nodes_of(source)
                        .iter()
                        .filter(|node| node.id() == id),
                );
            }
        }
        out
    }

    /// The first node snapshot under `id`, if any.
    #[must_use]
    pub fn node(&self, id: &ReferenceId) -> Option<&'a JvmClass> {
        self.nodes(id).into_iter().next()
    }

    /// Sources defining `id` in this view.
    #[must_use]
    pub fn node_sources(&self, id: &ReferenceId) -> Vec<NodeSource> {
        let mut out: FxHashSet<NodeSource> = FxHashSet::default();
        if let Some(delta) = self.delta {
            out.extend(delta.sources(id).cloned());
        }
        for source in self.graph.sources(id) {
            if !self.is_masked(source) {
                out.insert(source.clone());
            }
        }
        out.into_iter().collect()
    }

    /// Dependents recorded under `key` in the named index, adjusted for the
    /// delta overlay: masked contributions drop out, delta nodes re-derive.
    #[must_use]
    pub fn index_dependents(&self, name: &str, key: &ReferenceId) -> FxHashSet<ReferenceId> {
        let mut out = FxHashSet::default();
        if let Some(view) = self.graph.index(name) {
            for dependent in view.dependents(key) {
                if !self.is_fully_masked(dependent) {
                    out.insert(dependent.clone());
                }
            }
        }
        if let Some(delta) = self.delta {
            for node in delta.all_nodes() {
                if let Some(keys) = self.graph.index_keys(name, node) {
                    if keys.contains(key) {
                        out.insert(node.id().clone());
                    }
                }
            }
        }
        out
    }

    /// Direct subclasses of `id` in this view.
    #[must_use]
    pub fn direct_subclasses(&self, id: &ReferenceId) -> FxHashSet<ReferenceId> {
        self.index_dependents(SubclassesIndex::NAME, id)
    }

    /// Direct Kotlin subclasses of `id` in this view.
    #[must_use]
    pub fn direct_kotlin_subclasses(&self, id: &ReferenceId) -> FxHashSet<ReferenceId> {
        self.index_dependents(KotlinSubclassesIndex::NAME, id)
    }

    /// Every supertype reachable from `id`. Dangling references contribute
    /// nothing.
    #[must_use]
    pub fn all_supertypes(&self, id: &ReferenceId) -> FxHashSet<ReferenceId> {
        let mut out = FxHashSet::default();
        let mut stack: Vec<ReferenceId> = Vec::new();
        for node in self.nodes(id) {
            stack.extend(node.supertypes().cloned());
        }
        while let Some(current) = stack.pop() {
            if !out.insert(current.clone()) {
                continue;
            }
            for node in self.nodes(&current) {
                stack.extend(node.supertypes().cloned());
            }
        }
        out
    }

    /// True when `id` inherits from `ancestor` in this view.
    #[must_use]
    pub fn is_inheritor_of(&self, id: &ReferenceId, ancestor: &ReferenceId) -> bool {
        self.all_supertypes(id).contains(ancestor)
    }

    /// Every transitive subclass of `id`, memoized per pass.
    pub fn all_subclasses(&self, id: &ReferenceId, cache: &mut SubclassCache) -> Vec<ReferenceId> {
        let memo = if self.delta.is_some() {
            &mut cache.future
        } else {
            &mut cache.present
        };
        if let Some(hit) = memo.get(id) {
            return hit.clone();
        }
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut stack: Vec<ReferenceId> = self.direct_subclasses(id).into_iter().collect();
        while let Some(current) = stack.pop() {
            if current == *id || !seen.insert(current.clone()) {
                continue;
            }
            stack.extend(self.direct_subclasses(&current));
            order.push(current);
        }
        let memo = if self.delta.is_some() {
            &mut cache.future
        } else {
            &mut cache.present
        };
        memo.insert(id.clone(), order.clone());
        order
    }

    /// `id` together with its transitive subclasses.
    pub fn with_all_subclasses(
        &self,
        id: &ReferenceId,
        cache: &mut SubclassCache,
    ) -> Vec<ReferenceId> {
        let mut out = vec![id.clone()];
        out.extend(self.all_subclasses(id, cache));
        out
    }

    /// Subclasses that can still see an inherited member with `probe`'s
    /// signature: descent stops at subclasses declaring their own.
    #[must_use]
    pub fn collect_subclasses_without_method(
        &self,
        id: &ReferenceId,
        probe: &JvmMethod,
    ) -> Vec<ReferenceId> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack: Vec<ReferenceId> = self.direct_subclasses(id).into_iter().collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let overrides = self
                .nodes(&current)
                .iter()
                .any(|node| node.find_method(probe).is_some());
            if overrides {
                continue;
            }
            stack.extend(self.direct_subclasses(&current));
            out.push(current);
        }
        out
    }

    /// Subclasses that can still see an inherited field named `name`:
    /// descent stops at subclasses declaring their own.
    #[must_use]
    pub fn collect_subclasses_without_field(
        &self,
        id: &ReferenceId,
        name: &str,
    ) -> Vec<ReferenceId> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        let mut stack: Vec<ReferenceId> = self.direct_subclasses(id).into_iter().collect();
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let hides = self
                .nodes(&current)
                .iter()
                .any(|node| node.find_field(name).is_some());
            if hides {
                continue;
            }
            stack.extend(self.direct_subclasses(&current));
            out.push(current);
        }
        out
    }

    /// True when `id` is usable as a lambda target: an interface exposing
    /// exactly one unimplemented abstract method across its hierarchy.
    #[must_use]
    pub fn is_lambda_target(&self, id: &ReferenceId) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if !node.is_interface() {
            return false;
        }
        let mut abstract_sigs: FxHashSet<(String, Vec<String>)> = FxHashSet::default();
        let mut concrete_sigs: FxHashSet<(String, Vec<String>)> = FxHashSet::default();
        let mut ids = vec![id.clone()];
        ids.extend(self.all_supertypes(id));
        for current in &ids {
            for cls in self.nodes(current) {
                for method in &cls.methods {
                    let sig = (method.name.clone(), method.arg_types.clone());
                    if method.is_abstract() {
                        abstract_sigs.insert(sig);
                    } else {
                        concrete_sigs.insert(sig);
                    }
                }
            }
        }
        abstract_sigs
            .iter()
            .filter(|sig| !concrete_sigs.contains(*sig))
            .count()
            == 1
    }

    /// True when `id` has a Kotlin-compiled node in this view.
    #[must_use]
    pub fn is_kotlin(&self, id: &ReferenceId) -> bool {
        self.nodes(id)
            .iter()
            .any(|node| !matches!(node.metadata, KotlinMeta::None))
    }
}

#[cfg(test)]
mod tests;
