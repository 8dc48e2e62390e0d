//! The differentiate strategy chain.
//!
//! A strategy is a pluggable rule set reacting to added, removed and changed
//! nodes by marking more usages and sources affected. Strategies are applied
//! in registered order and compose by additive side effects on the shared
//! context; a hook returning `false` stops the chain early for the node at
//! hand (used rarely, to suppress further processing once a rule has fully
//! handled a case). The general JVM rules always run first, language rules
//! layer on top.

mod jvm;
mod kotlin;

pub use jvm::JvmDifferentiateStrategy;
pub use kotlin::KotlinDifferentiateStrategy;

use ripple_graph::diff::Change;
use ripple_graph::{NodeSource, ReferenceId};
use tracing::debug;

use crate::differentiate::{DifferentiateContext, SubclassCache, UsageConstraint, Utils};
use crate::model::class::{package_of, short_name_of};
use crate::model::{ClassDiff, JvmClass, JvmField, JvmMethod, JvmUsage};

/// A changed node: both snapshots plus their computed delta.
#[derive(Clone, Copy)]
pub struct ClassChange<'a> {
    /// Snapshot from the previous round.
    pub past: &'a JvmClass,
    /// Snapshot from the current round.
    pub now: &'a JvmClass,
    /// Structural delta between the two.
    pub diff: &'a ClassDiff,
}

/// Present and future graph views plus the pass-scoped subclass cache,
/// handed to every hook.
pub struct Views<'a> {
    /// The pre-round graph state.
    pub present: Utils<'a>,
    /// The graph with the round's delta overlaid.
    pub future: Utils<'a>,
    /// Subclass-closure memo for this pass.
    pub subclasses: SubclassCache,
}

/// One rule set in the differentiation chain.
///
/// Every hook defaults to "no opinion, continue". Hooks mutate the shared
/// [`DifferentiateContext`] only.
pub trait DifferentiateStrategy {
    /// Strategy name, for logging.
    fn name(&self) -> &'static str;

    /// A class disappeared this round.
    fn process_removed_class(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _removed: &JvmClass,
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// All classes added this round, as one batch (cross-class checks).
    fn process_added_classes(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _added: &[JvmClass],
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// One class added this round.
    fn process_added_class(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _added: &JvmClass,
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// One class changed this round.
    fn process_changed_class(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _change: &ClassChange<'_>,
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// A method appeared on a changed class.
    fn process_added_method(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _change: &ClassChange<'_>,
        _method: &JvmMethod,
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// A method of a changed class changed.
    fn process_changed_method(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _change: &ClassChange<'_>,
        _method: &Change<JvmMethod>,
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// A field disappeared from a changed class.
    fn process_removed_field(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _change: &ClassChange<'_>,
        _field: &JvmField,
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// A field of a changed class changed.
    fn process_changed_field(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _change: &ClassChange<'_>,
        _field: &Change<JvmField>,
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }

    /// Units that compiled with errors this round; their binary facts are
    /// untrustworthy.
    fn process_nodes_with_errors(
        &self,
        _cx: &mut DifferentiateContext<'_>,
        _nodes: &[JvmClass],
        _views: &mut Views<'_>,
    ) -> bool {
        true
    }
}

/// The default chain: general JVM rules first, then the Kotlin rules.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn DifferentiateStrategy>> {
    vec![
        Box::new(JvmDifferentiateStrategy),
        Box::new(KotlinDifferentiateStrategy),
    ]
}

/// Affect a member usage and the matching by-name lookup for every owner in
/// `owners`: exact-descriptor callers and by-name resolvers both re-check.
pub(crate) fn affect_member_usages(
    cx: &mut DifferentiateContext<'_>,
    owners: impl IntoIterator<Item = ReferenceId>,
    name: &str,
    make_usage: impl Fn(&ReferenceId) -> JvmUsage,
    constraint: Option<UsageConstraint>,
) {
    for owner in owners {
        let member = make_usage(&owner);
        let lookup = JvmUsage::lookup(owner.clone(), name);
        match &constraint {
            Some(c) => {
                cx.affect_usage_with(member, c.clone());
                cx.affect_usage_with(lookup, c.clone());
            }
            None => {
                cx.affect_usage(member);
                cx.affect_usage(lookup);
            }
        }
        debug!(owner = %owner, member = name, "affected member usages");
    }
}

/// Affect every source defining `id` in `view`.
pub(crate) fn affect_node_sources(
    cx: &mut DifferentiateContext<'_>,
    view: &Utils<'_>,
    id: &ReferenceId,
    reason: &str,
) {
    for source in view.node_sources(id) {
        if cx.affect_node_source(&source) {
            debug!(class = %id, source = %source, reason, "affected source");
        }
    }
}

/// Affect the sources of `from` and all its transitive subclasses in the
/// future view; optionally also affect their class and class-lookup usages
/// (hierarchy changes re-route method resolution in dependents).
pub(crate) fn affect_subclasses(
    cx: &mut DifferentiateContext<'_>,
    views: &mut Views<'_>,
    from: &ReferenceId,
    affect_usages: bool,
) {
    debug!(class = %from, affect_usages, "affecting subclasses");
    for id in views.future.with_all_subclasses(from, &mut views.subclasses) {
        affect_node_sources(cx, &views.future, &id, "subclass of a changed class");
        if affect_usages {
            cx.affect_usage(JvmUsage::Class(id.clone()));
            cx.affect_usage(JvmUsage::lookup(
                package_of(id.as_str()),
                short_name_of(id.as_str()),
            ));
        }
    }
}

/// Affect the by-name class lookup of `class` in its package: a name that
/// appears or disappears can shadow or re-route resolution for any file
/// resolving that simple name in the same scope.
pub(crate) fn affect_class_lookup(cx: &mut DifferentiateContext<'_>, class: &JvmClass) {
    cx.affect_usage(JvmUsage::lookup(class.package_id(), class.short_name()));
}

/// Sources of `id` visible in `view`, filtered to those the context may
/// affect. Used where sources must be force-scheduled.
pub(crate) fn affectable_sources(
    cx: &DifferentiateContext<'_>,
    view: &Utils<'_>,
    id: &ReferenceId,
) -> Vec<NodeSource> {
    view.node_sources(id)
        .into_iter()
        .filter(|source| cx.params().affects(source))
        .collect()
}
