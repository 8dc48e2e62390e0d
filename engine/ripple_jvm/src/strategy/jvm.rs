//! General JVM differentiation rules.
//!
//! Language-independent consequences of classfile changes: hierarchy edits,
//! access changes, overload resolution and constant inlining. Language rules
//! build on top of these; they never replace them.

use ripple_graph::diff::Change;
use ripple_graph::{NodeSource, ReferenceId};
use tracing::{debug, warn};

use crate::differentiate::{DifferentiateContext, UsageConstraint};
use crate::model::class::package_of;
use crate::model::{AccessLevel, JvmClass, JvmField, JvmFlags, JvmMethod, JvmUsage};

use super::{
    affect_class_lookup, affect_member_usages, affect_node_sources, affect_subclasses,
    affectable_sources, ClassChange, DifferentiateStrategy, Views,
};

/// The base rule set; always registered first.
pub struct JvmDifferentiateStrategy;

impl DifferentiateStrategy for JvmDifferentiateStrategy {
    fn name(&self) -> &'static str {
        "jvm"
    }

    fn process_added_classes(
        &self,
        cx: &mut DifferentiateContext<'_>,
        added: &[JvmClass],
        views: &mut Views<'_>,
    ) -> bool {
        for cls in added {
            // Duplicate detection: the same top-level class already known to
            // the graph from a source that is neither deleted nor part of
            // this round means two files now define one name.
            if cls.is_anonymous() || cls.is_local() || cls.outer_name().is_some() {
                continue;
            }
            let deleted = cx.delta().deleted_sources();
            let candidates: Vec<NodeSource> = views
                .present
                .node_sources(cls.id())
                .into_iter()
                .filter(|source| !deleted.contains(source) && cx.params().affects(source))
                .collect();
            if candidates.iter().any(|source| !cx.is_compiled(source)) {
                warn!(
                    class = cls.name(),
                    "possibly duplicated classes in the same compilation chunk"
                );
                let own: Vec<NodeSource> = cx.delta().sources(cls.id()).cloned().collect();
                for source in candidates.iter().chain(&own) {
                    cx.affect_node_source_forced(source);
                }
            }
        }
        true
    }

    fn process_added_class(
        &self,
        cx: &mut DifferentiateContext<'_>,
        added: &JvmClass,
        _views: &mut Views<'_>,
    ) -> bool {
        if added.is_anonymous() || added.is_local() {
            return true;
        }
        debug!(class = added.name(), "added class; affecting name resolution in its package");
        affect_class_lookup(cx, added);
        true
    }

    fn process_removed_class(
        &self,
        cx: &mut DifferentiateContext<'_>,
        removed: &JvmClass,
        _views: &mut Views<'_>,
    ) -> bool {
        debug!(class = removed.name(), "removed class; affecting its usages");
        cx.affect_usage(JvmUsage::Class(removed.id().clone()));
        if !removed.is_private() {
            affect_class_lookup(cx, removed);
        }
        true
    }

    fn process_changed_class(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        views: &mut Views<'_>,
    ) -> bool {
        let diff = change.diff;
        let changed_class = change.past;

        if diff.hierarchy_narrowed() {
            let extends_narrowed = diff.superclass_changed && !superclass_widened(change, views);
            let affect_usages = extends_narrowed || !diff.interfaces.removed().is_empty();
            debug!(
                class = changed_class.name(),
                affect_usages, "supertype surface changed; affecting subclasses"
            );
            affect_subclasses(cx, views, change.now.id(), affect_usages);
        }

        let added_flags = diff.flags.added();
        let removed_flags = diff.flags.removed();

        if added_flags.contains(JvmFlags::INTERFACE) || removed_flags.contains(JvmFlags::INTERFACE)
        {
            debug!(class = changed_class.name(), "class/interface conversion");
            cx.affect_usage(JvmUsage::Class(changed_class.id().clone()));
        }

        if added_flags.contains(JvmFlags::PROTECTED) {
            debug!(class = changed_class.name(), "class became protected");
            cx.affect_usage_with(
                JvmUsage::Class(changed_class.id().clone()),
                UsageConstraint::OutsideInheritance {
                    class: changed_class.id().clone(),
                    package: changed_class.package_name().to_string(),
                },
            );
        }

        if !changed_class.flags.is_package_local() && change.now.flags.is_package_local() {
            debug!(class = changed_class.name(), "class became package-local");
            cx.affect_usage_with(
                JvmUsage::Class(changed_class.id().clone()),
                UsageConstraint::OutsidePackage(changed_class.package_name().to_string()),
            );
        }

        if added_flags.contains(JvmFlags::FINAL) || added_flags.contains(JvmFlags::PRIVATE) {
            debug!(class = changed_class.name(), "class became final or private");
            cx.affect_usage(JvmUsage::Class(changed_class.id().clone()));
        }

        if added_flags.contains(JvmFlags::ABSTRACT) || added_flags.contains(JvmFlags::STATIC) {
            debug!(class = changed_class.name(), "class became abstract or static");
            cx.affect_usage(JvmUsage::ClassNew(changed_class.id().clone()));
        }

        if changed_class.is_annotation() && !diff.methods.unchanged() {
            debug!(class = changed_class.name(), "annotation attributes changed");
            cx.affect_usage(JvmUsage::Annotation(changed_class.id().clone()));
            if diff.methods.added().iter().any(|m| m.value.is_none()) {
                // A new attribute without a default breaks every existing
                // application site.
                cx.affect_usage(JvmUsage::Class(changed_class.id().clone()));
            }
        }

        for removed in diff.methods.removed() {
            self.process_removed_method(cx, change, removed, views);
        }

        for added in diff.fields.added() {
            self.process_added_field(cx, change, added, views);
        }

        true
    }

    fn process_added_method(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        method: &JvmMethod,
        views: &mut Views<'_>,
    ) -> bool {
        if change.past.is_annotation() || method.is_private() {
            return true;
        }
        let cls = change.now;
        debug!(class = cls.name(), method = %method.name, "processing added method");

        if cls.is_interface() || cls.flags.contains(JvmFlags::ABSTRACT) || method.is_abstract() {
            debug!("added method on an abstract surface; affecting all subclasses");
            affect_subclasses(cx, views, cls.id(), false);
        }

        if cls.is_interface() && method.is_abstract() {
            affect_lambda_instantiations(cx, views, cls.id());
        }

        // Overload-resolution conflicts: any existing call of this name on
        // the class or a subclass that can see it may now bind differently.
        // A dependent that already records the new signature was compiled
        // against the new version and must not be re-affected.
        if !method.arg_types.is_empty() {
            let guard = method.create_usage(cls.id());
            cx.affect_method_query(cls.id().clone(), method.name.clone(), Some(guard.clone()));
            if method.name != "<init>" {
                for sub in views
                    .future
                    .collect_subclasses_without_method(cls.id(), method)
                {
                    cx.affect_method_query(sub, method.name.clone(), Some(guard.clone()));
                }
            }
        }
        true
    }

    fn process_changed_method(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        method: &Change<JvmMethod>,
        views: &mut Views<'_>,
    ) -> bool {
        let cls = change.past;
        let past_method = &method.past;
        let diff = &method.diff;
        debug!(class = cls.name(), method = %past_method.name, "processing changed method");

        if cls.is_annotation() {
            if diff.value_changed() {
                debug!("annotation attribute default changed");
                cx.affect_usage(JvmUsage::Annotation(cls.id().clone()));
            }
            return true;
        }

        if cls.is_interface() && diff.flags().removed().contains(JvmFlags::ABSTRACT) {
            // The interface may stop being a single-abstract-method target.
            affect_lambda_instantiations(cx, views, cls.id());
        }

        let propagated: Vec<ReferenceId> = views
            .future
            .collect_subclasses_without_method(cls.id(), past_method);
        let owners = || {
            std::iter::once(cls.id().clone()).chain(propagated.iter().cloned())
        };

        if diff.became_package_local() {
            debug!("method became package-private; affecting usages outside the package");
            affect_member_usages(
                cx,
                owners(),
                &past_method.name,
                |id| past_method.create_usage(id),
                Some(UsageConstraint::OutsidePackage(cls.package_name().to_string())),
            );
        }

        if diff.return_type_changed() || !diff.exceptions().unchanged() || diff.value_changed() {
            debug!("return type, throws list or body-level value changed");
            affect_member_usages(
                cx,
                owners(),
                &past_method.name,
                |id| past_method.create_usage(id),
                None,
            );
            affect_overriding_sources(cx, views, cls.id(), past_method);
        } else if diff.flags().changed() {
            let added = diff.flags().added();
            let removed = diff.flags().removed();
            if added.intersects(
                JvmFlags::STATIC | JvmFlags::PRIVATE | JvmFlags::SYNTHETIC | JvmFlags::BRIDGE,
            ) || removed.contains(JvmFlags::STATIC)
            {
                debug!("binding-relevant modifier changed; affecting method usages");
                affect_member_usages(
                    cx,
                    owners(),
                    &past_method.name,
                    |id| past_method.create_usage(id),
                    None,
                );
            } else {
                if added.intersects(JvmFlags::FINAL | JvmFlags::PUBLIC | JvmFlags::ABSTRACT) {
                    debug!("added final, public or abstract; affecting subclasses");
                    affect_subclasses(cx, views, cls.id(), false);
                    if cls.is_interface() && added.contains(JvmFlags::ABSTRACT) {
                        affect_lambda_instantiations(cx, views, cls.id());
                    }
                }
                if added.contains(JvmFlags::PROTECTED) && !removed.contains(JvmFlags::PRIVATE) {
                    debug!("method became protected; affecting non-inheritor usages");
                    affect_member_usages(
                        cx,
                        owners(),
                        &past_method.name,
                        |id| past_method.create_usage(id),
                        Some(UsageConstraint::OutsideInheritance {
                            class: cls.id().clone(),
                            package: cls.package_name().to_string(),
                        }),
                    );
                }
            }
        }

        if diff.access_expanded() {
            // A widened method can win overload resolution over siblings it
            // previously lost to; re-check callers of every same-named
            // overload.
            for overload in cls
                .methods
                .iter()
                .filter(|m| m.name == past_method.name && !m.same_signature(past_method))
            {
                debug!(overload = %overload.descriptor(), "method became more accessible; affecting overload usages");
                let overload_propagated = views
                    .future
                    .collect_subclasses_without_method(cls.id(), overload);
                affect_member_usages(
                    cx,
                    std::iter::once(cls.id().clone()).chain(overload_propagated),
                    &overload.name,
                    |id| overload.create_usage(id),
                    None,
                );
            }
        }

        true
    }

    fn process_removed_field(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        field: &JvmField,
        views: &mut Views<'_>,
    ) -> bool {
        let cls = change.past;
        debug!(class = cls.name(), field = %field.name, "processing removed field");

        if !field.is_private() && field.is_inlinable() && field.value.is_some() {
            self.process_constant_change(cx, change, field, views);
        }

        let propagated = views
            .present
            .collect_subclasses_without_field(cls.id(), &field.name);
        affect_member_usages(
            cx,
            std::iter::once(cls.id().clone()).chain(propagated),
            &field.name,
            |id| field.create_usage(id),
            None,
        );
        true
    }

    fn process_changed_field(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        field: &Change<JvmField>,
        views: &mut Views<'_>,
    ) -> bool {
        let cls = change.past;
        let past_field = &field.past;
        let diff = &field.diff;
        debug!(class = cls.name(), field = %past_field.name, "processing changed field");

        let harmful_flags = diff.flags().added().intersects(JvmFlags::STATIC | JvmFlags::FINAL)
            || diff
                .flags()
                .removed()
                .intersects(JvmFlags::STATIC | JvmFlags::FINAL);

        if !past_field.is_private()
            && past_field.is_inlinable()
            && past_field.value.is_some()
            && (harmful_flags || diff.value_changed() || diff.access_restricted())
        {
            // Consumers copied the old constant into their own bytecode;
            // they must recompile even without a structural reference.
            self.process_constant_change(cx, change, past_field, views);
        }

        let propagated: Vec<ReferenceId> = views
            .future
            .collect_subclasses_without_field(cls.id(), &past_field.name);
        let owners = || std::iter::once(cls.id().clone()).chain(propagated.iter().cloned());

        if diff.type_changed() {
            debug!("field type changed; affecting field usages");
            affect_member_usages(
                cx,
                owners(),
                &past_field.name,
                |id| past_field.create_usage(id),
                None,
            );
        } else if diff.flags().changed() {
            let added = diff.flags().added();
            let removed = diff.flags().removed();
            if added.intersects(JvmFlags::STATIC | JvmFlags::PRIVATE | JvmFlags::VOLATILE)
                || removed.contains(JvmFlags::STATIC)
            {
                debug!("binding-relevant field modifier changed; affecting field usages");
                affect_member_usages(
                    cx,
                    owners(),
                    &past_field.name,
                    |id| past_field.create_usage(id),
                    None,
                );
            } else if removed.contains(JvmFlags::PUBLIC) {
                let constraint = if added.contains(JvmFlags::PROTECTED) {
                    UsageConstraint::OutsideInheritance {
                        class: cls.id().clone(),
                        package: cls.package_name().to_string(),
                    }
                } else {
                    UsageConstraint::OutsidePackage(cls.package_name().to_string())
                };
                debug!("field visibility narrowed; affecting out-of-scope usages");
                affect_member_usages(
                    cx,
                    owners(),
                    &past_field.name,
                    |id| past_field.create_usage(id),
                    Some(constraint),
                );
            }
        }
        true
    }

    fn process_nodes_with_errors(
        &self,
        cx: &mut DifferentiateContext<'_>,
        nodes: &[JvmClass],
        views: &mut Views<'_>,
    ) -> bool {
        for node in nodes {
            debug!(
                class = node.name(),
                "unit compiled with errors; conservatively affecting its inlinable members"
            );
            for field in &node.fields {
                if field.is_private() || !field.is_inlinable() || field.value.is_none() {
                    continue;
                }
                let propagated = views
                    .present
                    .collect_subclasses_without_field(node.id(), &field.name);
                affect_member_usages(
                    cx,
                    std::iter::once(node.id().clone()).chain(propagated),
                    &field.name,
                    |id| field.create_usage(id),
                    None,
                );
            }
        }
        true
    }
}

impl JvmDifferentiateStrategy {
    /// A removed method: anything that resolved it, by descriptor or by
    /// name, must re-check; overriding subclasses lose their supertype
    /// method and recompile outright.
    fn process_removed_method(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        method: &JvmMethod,
        views: &mut Views<'_>,
    ) {
        let cls = change.past;
        debug!(class = cls.name(), method = %method.name, "processing removed method");
        if method.is_private() {
            return;
        }
        let propagated = views
            .future
            .collect_subclasses_without_method(cls.id(), method);
        affect_member_usages(
            cx,
            std::iter::once(cls.id().clone()).chain(propagated),
            &method.name,
            |id| method.create_usage(id),
            None,
        );
        affect_overriding_sources(cx, views, cls.id(), method);
    }

    /// A non-private field appeared: it can hide an inherited field of the
    /// same name anywhere below, so by-name accesses through the class and
    /// its non-hiding subclasses re-check.
    fn process_added_field(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        field: &JvmField,
        views: &mut Views<'_>,
    ) {
        if field.is_private() {
            return;
        }
        let cls = change.now;
        debug!(class = cls.name(), field = %field.name, "processing added field");
        cx.affect_field_query(cls.id().clone(), field.name.clone());
        for sub in views
            .future
            .collect_subclasses_without_field(cls.id(), &field.name)
        {
            cx.affect_field_query(sub, field.name.clone());
        }
    }

    /// A compile-time constant changed. Usage-level affecting when constants
    /// are processed incrementally; otherwise the blast radius widens to the
    /// package (and subclasses for protected constants), because constant
    /// inlining leaves no usage trace to follow.
    fn process_constant_change(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        field: &JvmField,
        views: &mut Views<'_>,
    ) {
        let cls = change.past;
        let propagated = views
            .future
            .collect_subclasses_without_field(cls.id(), &field.name);
        debug!(
            class = cls.name(),
            field = %field.name,
            "potentially inlined constant changed"
        );
        affect_member_usages(
            cx,
            std::iter::once(cls.id().clone()).chain(propagated.iter().cloned()),
            &field.name,
            |id| field.create_usage(id),
            None,
        );

        if cx.params().process_constants_incrementally {
            return;
        }

        // Escalation path: recompile everything that could have inlined it.
        let access = field.flags.access_level();
        if access >= AccessLevel::Protected {
            for id in &propagated {
                affect_node_sources(cx, &views.future, id, "subclass of a constant owner");
            }
        }
        if access == AccessLevel::Public {
            warn!(
                class = cls.name(),
                field = %field.name,
                "public compile-time constant changed; over-affecting its package"
            );
        }
        let package = cls.package_name().to_string();
        let in_package: Vec<ReferenceId> = cx
            .graph()
            .registered_nodes()
            .filter(|id| package_of(id.as_str()) == package)
            .cloned()
            .collect();
        for id in in_package {
            let sources = affectable_sources(cx, &views.present, &id);
            for source in sources {
                cx.affect_node_source(&source);
            }
        }
    }
}

/// Future-view check: did the superclass change keep the old superclass
/// reachable (a widening insertion into the chain)?
fn superclass_widened(change: &ClassChange<'_>, views: &mut Views<'_>) -> bool {
    match &change.past.superclass {
        Some(old) => views.future.all_supertypes(change.now.id()).contains(old),
        None => true,
    }
}

/// Affect the sources of every future subclass that declares a method with
/// the probe's signature.
fn affect_overriding_sources(
    cx: &mut DifferentiateContext<'_>,
    views: &mut Views<'_>,
    class: &ReferenceId,
    probe: &JvmMethod,
) {
    for sub in views.future.all_subclasses(class, &mut views.subclasses) {
        let overrides = views
            .future
            .nodes(&sub)
            .iter()
            .any(|node| node.find_method(probe).is_some());
        if overrides {
            affect_node_sources(cx, &views.future, &sub, "overrides a changed method");
        }
    }
}

/// Affect instantiation usages of every lambda-shaped type at or below
/// `from`: the interface may stop being a single-abstract-method target.
fn affect_lambda_instantiations(
    cx: &mut DifferentiateContext<'_>,
    views: &mut Views<'_>,
    from: &ReferenceId,
) {
    for id in views.present.with_all_subclasses(from, &mut views.subclasses) {
        if views.present.is_lambda_target(&id) {
            debug!(class = %id, "affecting lambda instantiations");
            cx.affect_usage(JvmUsage::ClassNew(id.clone()));
        }
    }
}
