//! The differentiation driver.
//!
//! One round works on three node sets (before, after, compiled-with-errors)
//! and a shared [`DifferentiateContext`]. The driver classifies nodes into
//! added/removed/changed by identity and content, drives every registered
//! strategy's hooks over the classification in a fixed order, then expands
//! the accumulated affected usages into affected sources. Strategy passes
//! and expansion repeat until the affected-source set stops growing; every
//! fan-out point is guarded against re-affecting already-compiled sources,
//! which bounds the iteration.

mod context;
mod views;

pub use context::{
    Affected, AffectedUsage, DifferentiateContext, DifferentiateParams, UsageConstraint,
};
pub use views::{SubclassCache, Utils};

use ripple_graph::diff::{deep_diff, Specifier};
use ripple_graph::{NodeSource, ReferenceId, Usage as _};
use tracing::{debug, warn};

use crate::error::DifferentiateError;
use crate::index::{KotlinSubclassesIndex, LookupsIndex, SubclassesIndex, TypealiasesIndex};
use crate::model::{JvmClass, JvmUsage};
use crate::strategy::{ClassChange, DifferentiateStrategy, Views};

/// Run one differentiation round.
///
/// Classifies `nodes_before`/`nodes_after`, drives the strategy chain to a
/// fixpoint, and leaves the affected sets in `cx` (consume them with
/// [`DifferentiateContext::into_affected`]).
///
/// Per-node analysis trouble never fails the round; strategies over-affect
/// instead. An `Err` means the graph itself is unusable for differentiation
/// (a required index was not registered).
pub fn differentiate(
    cx: &mut DifferentiateContext<'_>,
    nodes_before: &[JvmClass],
    nodes_after: &[JvmClass],
    nodes_with_errors: &[JvmClass],
    strategies: &[Box<dyn DifferentiateStrategy>],
) -> Result<(), DifferentiateError> {
    for name in [
        LookupsIndex::NAME,
        TypealiasesIndex::NAME,
        KotlinSubclassesIndex::NAME,
        SubclassesIndex::NAME,
    ] {
        if cx.graph().index(name).is_none() {
            return Err(DifferentiateError::MissingIndex { name });
        }
    }

    if cx.delta().is_source_only() {
        debug!("source-only delta; nothing to differentiate");
        return Ok(());
    }

    let classes_diff = deep_diff(nodes_before, nodes_after);
    let mut views = Views {
        present: Utils::present(cx.graph()),
        future: Utils::future(cx.graph(), cx.delta()),
        subclasses: SubclassCache::default(),
    };

    let mut pass = 0_u32;
    loop {
        pass += 1;
        let before_count = cx.affected_source_count();
        run_chain(cx, &classes_diff, nodes_with_errors, strategies, &mut views);
        expand_affected_usages(cx, &mut views);
        let grown = cx.affected_source_count() - before_count;
        debug!(pass, affected = cx.affected_source_count(), "differentiation pass finished");
        if grown == 0 {
            break;
        }
    }
    Ok(())
}

/// Hook order: removed classes, added classes (batch then per-class),
/// changed classes with their member diffs, then error nodes.
fn run_chain(
    cx: &mut DifferentiateContext<'_>,
    classes_diff: &Specifier<JvmClass>,
    nodes_with_errors: &[JvmClass],
    strategies: &[Box<dyn DifferentiateStrategy>],
    views: &mut Views<'_>,
) {
    for removed in classes_diff.removed() {
        for strategy in strategies {
            if !strategy.process_removed_class(cx, removed, views) {
                debug!(strategy = strategy.name(), class = removed.name(), "chain stopped");
                break;
            }
        }
    }

    for strategy in strategies {
        if !strategy.process_added_classes(cx, classes_diff.added(), views) {
            debug!(strategy = strategy.name(), "chain stopped for the added-class batch");
            break;
        }
    }
    for added in classes_diff.added() {
        for strategy in strategies {
            if !strategy.process_added_class(cx, added, views) {
                debug!(strategy = strategy.name(), class = added.name(), "chain stopped");
                break;
            }
        }
    }

    for change in classes_diff.changed() {
        let class_change = ClassChange {
            past: &change.past,
            now: &change.now,
            diff: &change.diff,
        };
        let mut handled_fully = false;
        for strategy in strategies {
            if !strategy.process_changed_class(cx, &class_change, views) {
                debug!(
                    strategy = strategy.name(),
                    class = change.past.name(),
                    "chain stopped; skipping member hooks"
                );
                handled_fully = true;
                break;
            }
        }
        if handled_fully {
            continue;
        }

        for method in class_change.diff.methods.added() {
            for strategy in strategies {
                if !strategy.process_added_method(cx, &class_change, method, views) {
                    break;
                }
            }
        }
        for method_change in class_change.diff.methods.changed() {
            for strategy in strategies {
                if !strategy.process_changed_method(cx, &class_change, method_change, views) {
                    break;
                }
            }
        }
        for field in class_change.diff.fields.removed() {
            for strategy in strategies {
                if !strategy.process_removed_field(cx, &class_change, field, views) {
                    break;
                }
            }
        }
        for field_change in class_change.diff.fields.changed() {
            for strategy in strategies {
                if !strategy.process_changed_field(cx, &class_change, field_change, views) {
                    break;
                }
            }
        }
    }

    if !nodes_with_errors.is_empty() {
        for strategy in strategies {
            if !strategy.process_nodes_with_errors(cx, nodes_with_errors, views) {
                break;
            }
        }
    }
}

/// Resolve every accumulated affected usage to the dependents that recorded
/// a matching usage and schedule their sources.
fn expand_affected_usages(cx: &mut DifferentiateContext<'_>, views: &mut Views<'_>) {
    for entry in cx.usages_snapshot() {
        match entry {
            AffectedUsage::Usage {
                usage: JvmUsage::Lookup { scope, name },
                constraint,
            } => {
                // By-name resolution expands through the lookups index: it
                // answers exactly "who resolves this name in this scope".
                let key = JvmUsage::lookup_key(&scope, &name);
                let dependents: Vec<ReferenceId> = views
                    .present
                    .index_dependents(LookupsIndex::NAME, &key)
                    .into_iter()
                    .collect();
                for dependent in dependents {
                    affect_dependent(cx, views, &dependent, constraint.as_ref());
                }
            }
            AffectedUsage::Usage { usage, constraint } => {
                let owner = usage.element_owner().clone();
                let dependents: Vec<ReferenceId> =
                    cx.graph().depending_nodes(&owner).cloned().collect();
                for dependent in dependents {
                    let recorded = cx
                        .graph()
                        .nodes(&dependent)
                        .any(|node| node.has_usage(&usage));
                    if recorded {
                        affect_dependent(cx, views, &dependent, constraint.as_ref());
                    }
                }
            }
            AffectedUsage::MethodQuery {
                owner,
                name,
                skip_if_has,
            } => {
                let dependents: Vec<ReferenceId> =
                    cx.graph().depending_nodes(&owner).cloned().collect();
                for dependent in dependents {
                    let mut matched = false;
                    let mut already_compiled = false;
                    for node in cx.graph().nodes(&dependent) {
                        if let Some(guard) = &skip_if_has {
                            if node.has_usage(guard) {
                                // The dependent already references the new
                                // signature: it was compiled against the new
                                // version and re-affecting it is redundant.
                                already_compiled = true;
                                break;
                            }
                        }
                        matched |= node.usages.iter().any(|usage| {
                            matches!(
                                usage,
                                JvmUsage::Method { owner: o, name: n, .. }
                                    if *o == owner && *n == name
                            )
                        });
                    }
                    if matched && !already_compiled {
                        affect_dependent(cx, views, &dependent, None);
                    }
                }
            }
            AffectedUsage::FieldQuery { owner, name } => {
                let dependents: Vec<ReferenceId> =
                    cx.graph().depending_nodes(&owner).cloned().collect();
                for dependent in dependents {
                    let matched = cx.graph().nodes(&dependent).any(|node| {
                        node.usages.iter().any(|usage| {
                            matches!(
                                usage,
                                JvmUsage::Field { owner: o, name: n, .. }
                                    if *o == owner && *n == name
                            )
                        })
                    });
                    if matched {
                        affect_dependent(cx, views, &dependent, None);
                    }
                }
            }
        }
    }
}

/// Schedule the sources of one dependent, honoring its constraint.
///
/// A dangling dependent (no stored nodes) contributes nothing. A dependent
/// produced by an annotation processor is scheduled unconditionally: its
/// binary facts cannot be trusted to be regenerated without it.
fn affect_dependent(
    cx: &mut DifferentiateContext<'_>,
    views: &mut Views<'_>,
    dependent: &ReferenceId,
    constraint: Option<&UsageConstraint>,
) {
    let nodes: Vec<&JvmClass> = cx.graph().nodes(dependent).collect();
    if nodes.is_empty() {
        return;
    }
    if let Some(constraint) = constraint {
        let permitted = nodes
            .iter()
            .any(|node| constraint.permits(node, &views.future));
        if !permitted {
            return;
        }
    }
    let generated = nodes.iter().any(|node| node.is_generated());
    let sources: Vec<NodeSource> = cx.graph().sources(dependent).cloned().collect();
    for source in &sources {
        if generated {
            warn!(
                class = %dependent,
                source = %source,
                "affected dependent is annotation-processor output; forcing recompilation"
            );
            cx.affect_node_source_forced(source);
        } else {
            cx.affect_node_source(source);
        }
    }
}
