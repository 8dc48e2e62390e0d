//! Kotlin-specific differentiation rules, layered on the JVM base rules.
//!
//! Kotlin resolves top-level and companion declarations by scope+name,
//! inlines function bodies into callers, generates synthetic overloads for
//! default parameters, and checks sealed hierarchies for exhaustiveness.
//! Each of those mechanisms leaks compiled details across files in ways the
//! descriptor-exact JVM rules cannot see; the rules here follow the by-name
//! resolution edges instead.

use ripple_graph::diff::Specifier;
use ripple_graph::{NodeSource, ReferenceId};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::differentiate::{DifferentiateContext, UsageConstraint, Utils};
use crate::index::TypealiasesIndex;
use crate::model::{
    JvmClass, JvmUsage, KmClassKind, KmFunction, KmProperty, KmTypeAlias, KotlinMeta,
    KotlinMetaDiff,
};
use crate::model::diff::{KmClassDiff, KmFacadeDiff};

use super::{affect_class_lookup, ClassChange, DifferentiateStrategy, Views};

/// The Kotlin rule set; registered after the JVM base rules.
pub struct KotlinDifferentiateStrategy;

impl DifferentiateStrategy for KotlinDifferentiateStrategy {
    fn name(&self) -> &'static str {
        "kotlin"
    }

    fn process_added_class(
        &self,
        cx: &mut DifferentiateContext<'_>,
        added: &JvmClass,
        views: &mut Views<'_>,
    ) -> bool {
        // A new direct subclass of a sealed type breaks exhaustiveness in
        // the whole hierarchy.
        for supertype in added.supertypes() {
            if is_sealed_in(&views.present, supertype) || is_sealed_in(&views.future, supertype) {
                self.affect_sealed_closure(cx, views, supertype);
            }
        }

        if added.outer_name().is_none() && !added.is_local() {
            self.check_class_against_aliases(cx, views, added);
        }
        for alias in added.metadata.type_aliases() {
            self.check_alias_against_classes(cx, views, added, alias);
        }

        // Newly importable declarations can shadow existing by-name
        // resolutions in their scope.
        if added.metadata.is_importable_scope() {
            let scopes = importable_scopes(added);
            for function in added.metadata.functions() {
                affect_lookups(cx, &scopes, &function.name, None);
            }
            for property in added.metadata.properties() {
                affect_lookups(cx, &scopes, &property.name, None);
            }
            for alias in added.metadata.type_aliases() {
                affect_lookups(cx, &scopes, &alias.name, None);
            }
        }
        true
    }

    fn process_removed_class(
        &self,
        cx: &mut DifferentiateContext<'_>,
        removed: &JvmClass,
        views: &mut Views<'_>,
    ) -> bool {
        for supertype in removed.supertypes() {
            if is_sealed_in(&views.present, supertype) || is_sealed_in(&views.future, supertype) {
                self.affect_sealed_closure(cx, views, supertype);
            }
        }
        if removed.metadata.is_importable_scope() {
            let scopes = importable_scopes(removed);
            for function in removed.metadata.functions() {
                affect_lookups(cx, &scopes, &function.name, None);
            }
            for property in removed.metadata.properties() {
                affect_lookups(cx, &scopes, &property.name, None);
            }
            for alias in removed.metadata.type_aliases() {
                affect_lookups(cx, &scopes, &alias.name, None);
            }
        }
        true
    }

    fn process_changed_class(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        views: &mut Views<'_>,
    ) -> bool {
        match &change.diff.metadata {
            KotlinMetaDiff::Unchanged => {}
            KotlinMetaDiff::ContainerChanged => {
                // Declaration-container semantics shifted wholesale; affect
                // both exact and by-name references to the class.
                debug!(class = change.now.name(), "metadata container changed");
                cx.affect_usage(JvmUsage::Class(change.now.id().clone()));
                affect_class_lookup(cx, change.now);
            }
            KotlinMetaDiff::Class(km_diff) => {
                self.process_class_meta(cx, change, km_diff, views);
            }
            KotlinMetaDiff::FileFacade(facade_diff) => {
                self.process_facade_meta(cx, change, facade_diff, views);
            }
        }

        // Re-parenting can attach to or detach from a sealed hierarchy.
        if change.diff.superclass_changed || !change.diff.interfaces.unchanged() {
            let supertypes: FxHashSet<ReferenceId> = change
                .past
                .supertypes()
                .chain(change.now.supertypes())
                .cloned()
                .collect();
            for supertype in &supertypes {
                if is_sealed_in(&views.present, supertype) || is_sealed_in(&views.future, supertype)
                {
                    self.affect_sealed_closure(cx, views, supertype);
                }
            }
        }

        // A type that newly qualifies as a lambda target makes lambda
        // arguments ambiguous at call sites with overloads accepting it.
        let id = change.now.id();
        if !views.present.is_lambda_target(id) && views.future.is_lambda_target(id) {
            debug!(class = change.now.name(), "class became a lambda target");
            cx.affect_usage_with(
                JvmUsage::Class(id.clone()),
                UsageConstraint::HasOverloadAccepting(id.clone()),
            );
        }

        // A non-private Java field whose name matches a property (or its
        // getter exactly) silently re-routes Kotlin's field-as-property
        // resolution.
        for field in change.diff.fields.added() {
            if field.is_private() {
                continue;
            }
            for property in change.now.metadata.properties() {
                let shadows_property = field.name.eq_ignore_ascii_case(&property.name);
                let shadows_getter = property.getter_name.as_deref() == Some(field.name.as_str());
                if !shadows_property && !shadows_getter {
                    continue;
                }
                warn!(
                    class = change.now.name(),
                    field = %field.name,
                    property = %property.name,
                    "added field shadows a property accessor"
                );
                for accessor in [&property.getter_name, &property.setter_name]
                    .into_iter()
                    .flatten()
                {
                    cx.affect_method_query(change.now.id().clone(), accessor.clone(), None);
                }
            }
        }
        true
    }

    fn process_nodes_with_errors(
        &self,
        cx: &mut DifferentiateContext<'_>,
        nodes: &[JvmClass],
        _views: &mut Views<'_>,
    ) -> bool {
        for node in nodes {
            let scopes = importable_scopes(node);
            for function in node.metadata.functions() {
                if function.is_inline {
                    debug!(
                        class = node.name(),
                        function = %function.name,
                        "error-compiled unit declares an inline function; affecting by-name usages"
                    );
                    affect_lookups(cx, &scopes, &function.name, None);
                }
            }
            for property in node.metadata.properties() {
                if property.has_inline_accessors || property.is_const {
                    affect_lookups(cx, &scopes, &property.name, None);
                }
            }
        }
        true
    }
}

impl KotlinDifferentiateStrategy {
    fn process_class_meta(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        diff: &KmClassDiff,
        views: &mut Views<'_>,
    ) {
        if diff.sealed_changed || !diff.sealed_subclasses.unchanged() {
            self.affect_sealed_closure(cx, views, change.now.id());
        }

        if diff.visibility_expanded || diff.visibility_restricted {
            affect_class_lookup(cx, change.now);
        }

        self.process_declarations(
            cx,
            change,
            &diff.functions,
            &diff.properties,
            &diff.type_aliases,
            views,
        );

        for constructor in diff.constructors.changed() {
            if constructor.diff.has_default_declaration_changes() {
                // Synthetic constructor overloads changed; call sites may
                // bind to a different one, so the whole class resolution
                // re-checks.
                debug!(
                    class = change.now.name(),
                    "constructor default parameters changed"
                );
                affect_class_lookup(cx, change.now);
                cx.affect_usage(JvmUsage::ClassNew(change.now.id().clone()));
            }
        }
    }

    fn process_facade_meta(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        diff: &KmFacadeDiff,
        views: &mut Views<'_>,
    ) {
        self.process_declarations(
            cx,
            change,
            &diff.functions,
            &diff.properties,
            &diff.type_aliases,
            views,
        );
    }

    fn process_declarations(
        &self,
        cx: &mut DifferentiateContext<'_>,
        change: &ClassChange<'_>,
        functions: &Specifier<KmFunction>,
        properties: &Specifier<KmProperty>,
        aliases: &Specifier<KmTypeAlias>,
        views: &mut Views<'_>,
    ) {
        let cls = change.now;
        let scopes = importable_scopes(cls);
        let importable =
            cls.metadata.is_importable_scope() || change.past.metadata.is_importable_scope();

        if importable {
            for function in functions.added().iter().chain(functions.removed()) {
                debug!(name = %function.name, "importable function added or removed");
                affect_lookups(cx, &scopes, &function.name, None);
            }
            for property in properties.added().iter().chain(properties.removed()) {
                affect_lookups(cx, &scopes, &property.name, None);
            }
            for alias in aliases.added().iter().chain(aliases.removed()) {
                affect_lookups(cx, &scopes, &alias.name, None);
            }
        }

        for alias in aliases.added() {
            self.check_alias_against_classes(cx, views, cls, alias);
        }

        for function in functions.added() {
            if function.is_operator && function.name == "invoke" {
                // The class is now callable as a function value; every
                // Kotlin instantiation site may resolve calls differently.
                debug!(class = cls.name(), "operator invoke added");
                cx.affect_usage_with(
                    JvmUsage::ClassNew(cls.id().clone()),
                    UsageConstraint::KotlinOnly,
                );
            }
        }

        for function in functions.changed() {
            let diff = &function.diff;
            if diff.access_expanded() || diff.access_restricted() {
                affect_lookups(cx, &scopes, &function.past.name, None);
            }
            if (function.past.is_inline || function.now.is_inline)
                && (diff.body_changed() || diff.inline_changed())
            {
                // Callers embedded the old body.
                debug!(
                    class = cls.name(),
                    function = %function.past.name,
                    "inline function body changed"
                );
                affect_lookups(cx, &scopes, &function.past.name, None);
            }
            if diff.has_default_declaration_changes() {
                debug!(
                    class = cls.name(),
                    function = %function.past.name,
                    "default parameters changed"
                );
                affect_lookups(cx, &scopes, &function.past.name, None);
            }
            if diff.became_nullable() || diff.args_became_not_null() {
                affect_lookups(
                    cx,
                    &scopes,
                    &function.past.name,
                    Some(UsageConstraint::KotlinOnly),
                );
            }
            if diff.operator_added() && function.now.name == "invoke" {
                debug!(class = cls.name(), "function became operator invoke");
                cx.affect_usage_with(
                    JvmUsage::ClassNew(cls.id().clone()),
                    UsageConstraint::KotlinOnly,
                );
            }
        }

        for property in properties.changed() {
            let diff = &property.diff;
            if diff.access_expanded()
                || diff.access_restricted()
                || diff.const_changed()
                || diff.inline_accessors_changed()
            {
                affect_lookups(cx, &scopes, &property.past.name, None);
            }
            if diff.became_nullable() {
                affect_lookups(
                    cx,
                    &scopes,
                    &property.past.name,
                    Some(UsageConstraint::KotlinOnly),
                );
            }
            if let Some(getter) = diff.getter_removed() {
                if property.now.setter_name.is_some() {
                    warn!(
                        class = cls.name(),
                        property = %property.past.name,
                        "getter removed while setter remains"
                    );
                    cx.affect_method_query(cls.id().clone(), getter.to_string(), None);
                }
            }
            if let Some(setter) = diff.setter_removed() {
                if property.now.getter_name.is_some() {
                    warn!(
                        class = cls.name(),
                        property = %property.past.name,
                        "setter removed while getter remains"
                    );
                    cx.affect_method_query(cls.id().clone(), setter.to_string(), None);
                }
            }
        }

        for alias in aliases.changed() {
            let diff = &alias.diff;
            if diff.expansion_changed() || diff.access_expanded() || diff.access_restricted() {
                affect_lookups(cx, &scopes, &alias.past.name, None);
            }
        }
    }

    /// Affect the full sealed-restricted closure of `seed` as one unit.
    ///
    /// Exhaustiveness checking requires the sealed type and every subclass
    /// reachable through sealed links to recompile together. If every source
    /// of the closure is already scheduled or compiled this round, this is a
    /// no-op, which is what bounds the fixpoint.
    fn affect_sealed_closure(
        &self,
        cx: &mut DifferentiateContext<'_>,
        views: &mut Views<'_>,
        seed: &ReferenceId,
    ) {
        debug!(class = %seed, "sealed hierarchy changed; collecting its closure");
        let mut closure: FxHashSet<ReferenceId> = FxHashSet::default();
        let mut stack = vec![seed.clone()];
        while let Some(current) = stack.pop() {
            if !closure.insert(current.clone()) {
                continue;
            }
            let sealed_here = current == *seed
                || is_sealed_in(&views.present, &current)
                || is_sealed_in(&views.future, &current);
            if !sealed_here {
                // Leaves join the closure but do not extend it.
                continue;
            }

            let derived = views.future.direct_kotlin_subclasses(&current);
            let mut declared: FxHashSet<ReferenceId> = FxHashSet::default();
            for node in views
                .future
                .nodes(&current)
                .into_iter()
                .chain(views.present.nodes(&current))
            {
                if let Some(km) = node.metadata.as_class() {
                    declared.extend(km.sealed_subclasses.iter().cloned());
                }
            }
            if !declared.is_empty() && declared != derived {
                // Metadata and graph disagree about the subclass set; keep
                // the union and recompile the whole hierarchy.
                warn!(
                    class = %current,
                    "sealed-subclass metadata diverges from graph-derived subclasses"
                );
            }
            stack.extend(derived);
            stack.extend(declared);
            stack.extend(views.present.direct_kotlin_subclasses(&current));
        }

        let mut candidates: FxHashSet<NodeSource> = FxHashSet::default();
        for id in &closure {
            candidates.extend(views.future.node_sources(id));
            candidates.extend(views.present.node_sources(id));
        }
        candidates.retain(|source| cx.params().affects(source));

        let any_unscheduled = candidates
            .iter()
            .any(|source| !cx.is_compiled(source) && !cx.is_source_affected(source));
        if !any_unscheduled {
            return;
        }
        for source in &candidates {
            cx.affect_node_source_forced(source);
        }
    }

    /// An added class may collide with a type alias of the same
    /// fully-qualified name declared elsewhere in the chunk.
    fn check_class_against_aliases(
        &self,
        cx: &mut DifferentiateContext<'_>,
        views: &mut Views<'_>,
        added: &JvmClass,
    ) {
        let declarers = views
            .future
            .index_dependents(TypealiasesIndex::NAME, added.id());
        if declarers.is_empty() {
            return;
        }
        warn!(
            class = added.name(),
            "added class collides with a type alias of the same name"
        );
        self.force_in_collision_parties(cx, views, &declarers);
        affect_class_lookup(cx, added);
    }

    /// An added type alias may collide with an existing class of the same
    /// fully-qualified name.
    fn check_alias_against_classes(
        &self,
        cx: &mut DifferentiateContext<'_>,
        views: &mut Views<'_>,
        declaring: &JvmClass,
        alias: &KmTypeAlias,
    ) {
        let package = declaring.package_name();
        let key = if package.is_empty() {
            ReferenceId::new(alias.name.as_str())
        } else {
            ReferenceId::new(format!("{package}/{}", alias.name))
        };
        if views.future.nodes(&key).is_empty() {
            return;
        }
        warn!(
            alias = %alias.name,
            class = %key,
            "added type alias collides with an existing class"
        );
        let parties: FxHashSet<ReferenceId> =
            [key.clone(), declaring.id().clone()].into_iter().collect();
        self.force_in_collision_parties(cx, views, &parties);
        cx.affect_usage(JvmUsage::lookup(
            declaring.package_id(),
            alias.name.as_str(),
        ));
    }

    /// Colliding declarations must both be in the next round even when their
    /// sources were not otherwise scheduled.
    fn force_in_collision_parties(
        &self,
        cx: &mut DifferentiateContext<'_>,
        views: &mut Views<'_>,
        parties: &FxHashSet<ReferenceId>,
    ) {
        for id in parties {
            let sources: Vec<NodeSource> = views
                .future
                .node_sources(id)
                .into_iter()
                .chain(views.present.node_sources(id))
                .filter(|source| cx.params().affects(source))
                .collect();
            for source in sources {
                cx.affect_node_source_forced(&source);
            }
        }
    }
}

/// Scopes in which a container's declarations resolve by unqualified name.
fn importable_scopes(cls: &JvmClass) -> Vec<ReferenceId> {
    match &cls.metadata {
        KotlinMeta::FileFacade(_) => vec![cls.package_id()],
        KotlinMeta::Class(km) if km.kind == KmClassKind::CompanionObject => {
            let mut scopes = vec![cls.package_id()];
            if let Some(outer) = cls.outer_name() {
                scopes.push(outer);
            }
            scopes
        }
        _ => vec![cls.id().clone()],
    }
}

/// Affect the by-name lookup of `name` in every scope.
fn affect_lookups(
    cx: &mut DifferentiateContext<'_>,
    scopes: &[ReferenceId],
    name: &str,
    constraint: Option<UsageConstraint>,
) {
    for scope in scopes {
        let usage = JvmUsage::lookup(scope.clone(), name);
        match &constraint {
            Some(c) => cx.affect_usage_with(usage, c.clone()),
            None => cx.affect_usage(usage),
        }
    }
}

/// True when any node of `id` in `view` is a sealed declaration.
fn is_sealed_in(view: &Utils<'_>, id: &ReferenceId) -> bool {
    view.nodes(id).iter().any(|node| node.is_sealed())
}
