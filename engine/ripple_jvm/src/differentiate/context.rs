//! The per-round mutable accumulator strategies write into.
//!
//! Strategies never touch the graph or the affected sets directly: every
//! side effect goes through [`DifferentiateContext`], which enforces the
//! already-compiled and deleted-source guards at each fan-out point. The
//! accumulation is strictly additive, which is what makes the driver's
//! fixpoint monotone.

use ripple_graph::{Delta, DependencyGraph, NodeSource, ReferenceId};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::model::{JvmClass, JvmUsage};

/// Per-round knobs supplied by the build coordinator.
pub struct DifferentiateParams {
    /// When false, a changed compile-time constant escalates to package-wide
    /// recompilation instead of usage-level affecting.
    pub process_constants_incrementally: bool,
    affection_filter: Option<Box<dyn Fn(&NodeSource) -> bool>>,
}

impl DifferentiateParams {
    /// Restrict which sources may be affected (e.g. to the current chunk).
    #[must_use]
    pub fn with_affection_filter(
        mut self,
        filter: impl Fn(&NodeSource) -> bool + 'static,
    ) -> Self {
        self.affection_filter = Some(Box::new(filter));
        self
    }

    /// True when the filter permits affecting `source`.
    #[must_use]
    pub fn affects(&self, source: &NodeSource) -> bool {
        self.affection_filter.as_ref().is_none_or(|f| f(source))
    }
}

impl Default for DifferentiateParams {
    fn default() -> Self {
        Self {
            process_constants_incrementally: true,
            affection_filter: None,
        }
    }
}

/// Restricts which dependent nodes an affected usage actually reaches.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UsageConstraint {
    /// Only dependents outside the package (access became package-local).
    OutsidePackage(String),
    /// Only dependents inside the package.
    InsidePackage(String),
    /// Only dependents that are neither in the package nor inheritors of the
    /// class (access became protected).
    OutsideInheritance {
        /// The class whose member access changed.
        class: ReferenceId,
        /// Its package.
        package: String,
    },
    /// Only dependents inheriting from the class.
    Inheritors(ReferenceId),
    /// Only Kotlin-compiled dependents.
    KotlinOnly,
    /// Only dependents holding a member call whose descriptor mentions the
    /// type (an overload that accepts it as a parameter).
    HasOverloadAccepting(ReferenceId),
}

impl UsageConstraint {
    /// True when the constraint permits affecting `node`.
    ///
    /// Inheritance checks run against the future view: what matters is
    /// whether the dependent will still be related to the class after the
    /// round is applied.
    #[must_use]
    pub fn permits(&self, node: &JvmClass, future: &super::views::Utils<'_>) -> bool {
        match self {
            Self::OutsidePackage(package) => node.package_name() != package.as_str(),
            Self::InsidePackage(package) => node.package_name() == package.as_str(),
            Self::OutsideInheritance { class, package } => {
                node.package_name() != package.as_str()
                    && !future.is_inheritor_of(node.id(), class)
            }
            Self::Inheritors(class) => future.is_inheritor_of(node.id(), class),
            Self::KotlinOnly => node.is_kotlin(),
            Self::HasOverloadAccepting(type_id) => {
                let needle = format!("L{type_id};");
                node.usages.iter().any(|usage| match usage {
                    JvmUsage::Method { descriptor, .. } => descriptor.contains(&needle),
                    _ => false,
                })
            }
        }
    }
}

/// One entry of the affected-usage set.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AffectedUsage {
    /// An exact usage, optionally constrained.
    Usage {
        /// The usage dependents must have recorded to be affected.
        usage: JvmUsage,
        /// Additional filter on the dependent node.
        constraint: Option<UsageConstraint>,
    },
    /// Any method call of `name` resolved against `owner`, regardless of
    /// descriptor (the conflicting-call-expression form).
    MethodQuery {
        /// Resolution owner.
        owner: ReferenceId,
        /// Method name.
        name: String,
        /// A dependent already recording this exact usage was compiled
        /// against the new version and is skipped.
        skip_if_has: Option<JvmUsage>,
    },
    /// Any field access of `name` resolved against `owner`, regardless of
    /// descriptor (the field-hiding form).
    FieldQuery {
        /// Resolution owner.
        owner: ReferenceId,
        /// Field name.
        name: String,
    },
}

/// Final output of one differentiation round.
#[derive(Debug, Default)]
pub struct Affected {
    /// Files that must be recompiled next round.
    pub sources: FxHashSet<NodeSource>,
    /// The exact usages that were affected; diagnostic only.
    pub usages: FxHashSet<JvmUsage>,
}

/// Per-round accumulator: affected usages, affected sources, and handles to
/// the graph and the round's delta. Created at round start, consumed into an
/// [`Affected`] at round end.
pub struct DifferentiateContext<'a> {
    graph: &'a DependencyGraph<JvmClass>,
    delta: &'a Delta<JvmClass>,
    params: DifferentiateParams,
    affected_usages: FxHashSet<AffectedUsage>,
    affected_sources: FxHashSet<NodeSource>,
}

impl<'a> DifferentiateContext<'a> {
    /// A fresh context for one round with default parameters.
    #[must_use]
    pub fn new(graph: &'a DependencyGraph<JvmClass>, delta: &'a Delta<JvmClass>) -> Self {
        Self::with_params(graph, delta, DifferentiateParams::default())
    }

    /// A fresh context with explicit parameters.
    #[must_use]
    pub fn with_params(
        graph: &'a DependencyGraph<JvmClass>,
        delta: &'a Delta<JvmClass>,
        params: DifferentiateParams,
    ) -> Self {
        Self {
            graph,
            delta,
            params,
            affected_usages: FxHashSet::default(),
            affected_sources: FxHashSet::default(),
        }
    }

    /// The persistent graph (the "present" state).
    #[must_use]
    pub fn graph(&self) -> &'a DependencyGraph<JvmClass> {
        self.graph
    }

    /// The round's delta.
    #[must_use]
    pub fn delta(&self) -> &'a Delta<JvmClass> {
        self.delta
    }

    /// The round's parameters.
    #[must_use]
    pub fn params(&self) -> &DifferentiateParams {
        &self.params
    }

    /// True when `source` was already recompiled this round.
    #[must_use]
    pub fn is_compiled(&self, source: &NodeSource) -> bool {
        self.delta.base_sources().contains(source)
    }

    /// Record an affected usage.
    pub fn affect_usage(&mut self, usage: JvmUsage) {
        self.affected_usages.insert(AffectedUsage::Usage {
            usage,
            constraint: None,
        });
    }

    /// Record an affected usage restricted by a constraint.
    pub fn affect_usage_with(&mut self, usage: JvmUsage, constraint: UsageConstraint) {
        self.affected_usages.insert(AffectedUsage::Usage {
            usage,
            constraint: Some(constraint),
        });
    }

    /// Record a conflicting-call query: any call of `name` against `owner`.
    pub fn affect_method_query(
        &mut self,
        owner: ReferenceId,
        name: impl Into<String>,
        skip_if_has: Option<JvmUsage>,
    ) {
        self.affected_usages.insert(AffectedUsage::MethodQuery {
            owner,
            name: name.into(),
            skip_if_has,
        });
    }

    /// Record a field-hiding query: any access of `name` against `owner`.
    pub fn affect_field_query(&mut self, owner: ReferenceId, name: impl Into<String>) {
        self.affected_usages.insert(AffectedUsage::FieldQuery {
            owner,
            name: name.into(),
        });
    }

    /// Schedule a source for recompilation, honoring the guards: sources
    /// already compiled this round, deleted this round, or rejected by the
    /// affection filter are skipped. Returns true when newly scheduled.
    pub fn affect_node_source(&mut self, source: &NodeSource) -> bool {
        if !self.params.affects(source)
            || self.is_compiled(source)
            || self.delta.deleted_sources().contains(source)
        {
            return false;
        }
        let added = self.affected_sources.insert(source.clone());
        if added {
            debug!(source = %source, "affected source");
        }
        added
    }

    /// Schedule a source bypassing the already-compiled guard. Used where a
    /// source must be forced into the next round (duplicate classes, alias
    /// collisions).
    pub fn affect_node_source_forced(&mut self, source: &NodeSource) {
        if !self.params.affects(source) || self.delta.deleted_sources().contains(source) {
            return;
        }
        if self.affected_sources.insert(source.clone()) {
            debug!(source = %source, "affected source (forced)");
        }
    }

    /// Number of affected sources so far; the driver's fixpoint measure.
    #[must_use]
    pub fn affected_source_count(&self) -> usize {
        self.affected_sources.len()
    }

    /// True when `source` is already scheduled.
    #[must_use]
    pub fn is_source_affected(&self, source: &NodeSource) -> bool {
        self.affected_sources.contains(source)
    }

    /// Snapshot of the affected-usage set for the expansion phase.
    #[must_use]
    pub fn usages_snapshot(&self) -> Vec<AffectedUsage> {
        self.affected_usages.iter().cloned().collect()
    }

    /// Consume the context into the round's output.
    #[must_use]
    pub fn into_affected(self) -> Affected {
        let usages = self
            .affected_usages
            .into_iter()
            .filter_map(|entry| match entry {
                AffectedUsage::Usage { usage, .. } => Some(usage),
                _ => None,
            })
            .collect();
        Affected {
            sources: self.affected_sources,
            usages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::new_graph;
    use ripple_graph::Delta;

    #[test]
    fn test_source_guards() {
        let graph = new_graph();
        let compiled = NodeSource::new("compiled.kt");
        let deleted = NodeSource::new("deleted.kt");
        let other = NodeSource::new("other.kt");
        let delta = Delta::new([compiled.clone()], [deleted.clone()]);
        let mut cx = DifferentiateContext::new(&graph, &delta);

        assert!(!cx.affect_node_source(&compiled));
        assert!(!cx.affect_node_source(&deleted));
        assert!(cx.affect_node_source(&other));
        assert!(!cx.affect_node_source(&other), "second affect is a no-op");
        assert_eq!(cx.affected_source_count(), 1);

        cx.affect_node_source_forced(&compiled);
        assert_eq!(cx.affected_source_count(), 2);
        assert!(cx.is_source_affected(&compiled));
    }

    #[test]
    fn test_affection_filter() {
        let graph = new_graph();
        let delta = Delta::new([], []);
        let params = DifferentiateParams::default()
            .with_affection_filter(|s| s.path().starts_with("chunk/"));
        let mut cx = DifferentiateContext::with_params(&graph, &delta, params);

        assert!(cx.affect_node_source(&NodeSource::new("chunk/a.kt")));
        assert!(!cx.affect_node_source(&NodeSource::new("outside/b.kt")));
    }

    #[test]
    fn test_constraint_evaluation() {
        use crate::differentiate::Utils;
        use crate::model::{KmClass, KmClassKind, KotlinMeta};

        let mut graph = new_graph();
        let base = JvmClass::new("p/Base");
        let sub = JvmClass::new("p/Sub").with_superclass("p/Base");
        let kotlin = JvmClass::new("q/K")
            .with_metadata(KotlinMeta::Class(KmClass::new(KmClassKind::Class)));
        let caller = JvmClass::new("q/Caller").with_usages([JvmUsage::Method {
            owner: ReferenceId::new("q/Api"),
            name: "accept".into(),
            descriptor: "(Lp/Base;)V".into(),
        }]);
        for (source, node) in [
            ("base.java", &base),
            ("sub.java", &sub),
            ("k.kt", &kotlin),
            ("caller.java", &caller),
        ] {
            let mut delta = Delta::new([NodeSource::new(source)], []);
            delta.associate(NodeSource::new(source), vec![node.clone()]);
            graph.integrate(&delta);
        }
        let empty = Delta::new([], []);
        let future = Utils::future(&graph, &empty);

        let outside = UsageConstraint::OutsidePackage("p".into());
        assert!(!outside.permits(&base, &future));
        assert!(outside.permits(&kotlin, &future));

        let inside = UsageConstraint::InsidePackage("p".into());
        assert!(inside.permits(&sub, &future));
        assert!(!inside.permits(&kotlin, &future));

        let inheritors = UsageConstraint::Inheritors(ReferenceId::new("p/Base"));
        assert!(inheritors.permits(&sub, &future));
        assert!(!inheritors.permits(&kotlin, &future));

        let protected = UsageConstraint::OutsideInheritance {
            class: ReferenceId::new("p/Base"),
            package: "p".into(),
        };
        assert!(!protected.permits(&sub, &future), "inheritors keep access");
        assert!(protected.permits(&kotlin, &future));

        assert!(UsageConstraint::KotlinOnly.permits(&kotlin, &future));
        assert!(!UsageConstraint::KotlinOnly.permits(&base, &future));

        let accepting =
            UsageConstraint::HasOverloadAccepting(ReferenceId::new("p/Base"));
        assert!(accepting.permits(&caller, &future));
        assert!(!accepting.permits(&base, &future));
    }

    #[test]
    fn test_usage_accumulation_dedups() {
        let graph = new_graph();
        let delta = Delta::new([], []);
        let mut cx = DifferentiateContext::new(&graph, &delta);

        let usage = JvmUsage::Class(ReferenceId::new("a/B"));
        cx.affect_usage(usage.clone());
        cx.affect_usage(usage.clone());
        cx.affect_usage_with(usage.clone(), UsageConstraint::KotlinOnly);
        assert_eq!(cx.usages_snapshot().len(), 2);

        let affected = cx.into_affected();
        assert!(affected.usages.contains(&usage));
    }
}
