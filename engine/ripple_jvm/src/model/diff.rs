//! Structural diffs over the JVM and Kotlin model.
//!
//! Members are keyed by name plus argument signature, Kotlin declarations by
//! name. Every predicate is computed once from the two snapshots and is pure
//! thereafter; strategies never re-derive deltas.

use ripple_graph::diff::{deep_diff, Diff, DiffCapable, Specifier};
use ripple_graph::ReferenceId;

use super::class::JvmClass;
use super::flags::{AccessLevel, FlagsDiff};
use super::kotlin::{
    KmClass, KmConstructor, KmFileFacade, KmFunction, KmProperty, KmTypeAlias, KotlinMeta,
};
use super::member::{JvmField, JvmMethod};

/// Delta between two snapshots of one method (same name and arguments).
#[derive(Clone, Debug)]
pub struct MethodDiff {
    flags: FlagsDiff,
    return_type_changed: bool,
    value_changed: bool,
    exceptions: Specifier<ReferenceId>,
}

impl MethodDiff {
    /// Flag delta.
    #[must_use]
    pub fn flags(&self) -> &FlagsDiff {
        &self.flags
    }

    /// Return type differs.
    #[must_use]
    pub fn return_type_changed(&self) -> bool {
        self.return_type_changed
    }

    /// Annotation default or body fingerprint differs.
    #[must_use]
    pub fn value_changed(&self) -> bool {
        self.value_changed
    }

    /// Declared thrown exceptions delta.
    #[must_use]
    pub fn exceptions(&self) -> &Specifier<ReferenceId> {
        &self.exceptions
    }

    /// The method became less visible.
    #[must_use]
    pub fn access_restricted(&self) -> bool {
        self.flags.access_restricted()
    }

    /// The method became more visible.
    #[must_use]
    pub fn access_expanded(&self) -> bool {
        self.flags.access_expanded()
    }

    /// The method became package-local.
    #[must_use]
    pub fn became_package_local(&self) -> bool {
        self.flags.access_restricted() && self.flags.now_access() == AccessLevel::PackageLocal
    }
}

impl Diff for MethodDiff {
    fn unchanged(&self) -> bool {
        !self.flags.changed()
            && !self.return_type_changed
            && !self.value_changed
            && self.exceptions.unchanged()
    }
}

impl DiffCapable for JvmMethod {
    type Key = (String, Vec<String>);
    type Diff = MethodDiff;

    fn diff_key(&self) -> Self::Key {
        (self.name.clone(), self.arg_types.clone())
    }

    fn diff(&self, now: &Self) -> MethodDiff {
        MethodDiff {
            flags: FlagsDiff::of(self.flags, now.flags),
            return_type_changed: self.return_type != now.return_type,
            value_changed: self.value != now.value,
            exceptions: deep_diff(&self.exceptions, &now.exceptions),
        }
    }
}

/// Delta between two snapshots of one field (same name).
#[derive(Clone, Debug)]
pub struct FieldDiff {
    flags: FlagsDiff,
    type_changed: bool,
    value_changed: bool,
}

impl FieldDiff {
    /// Flag delta.
    #[must_use]
    pub fn flags(&self) -> &FlagsDiff {
        &self.flags
    }

    /// Type descriptor differs.
    #[must_use]
    pub fn type_changed(&self) -> bool {
        self.type_changed
    }

    /// Compile-time constant value differs.
    #[must_use]
    pub fn value_changed(&self) -> bool {
        self.value_changed
    }

    /// The field became less visible.
    #[must_use]
    pub fn access_restricted(&self) -> bool {
        self.flags.access_restricted()
    }
}

impl Diff for FieldDiff {
    fn unchanged(&self) -> bool {
        !self.flags.changed() && !self.type_changed && !self.value_changed
    }
}

impl DiffCapable for JvmField {
    type Key = String;
    type Diff = FieldDiff;

    fn diff_key(&self) -> Self::Key {
        self.name.clone()
    }

    fn diff(&self, now: &Self) -> FieldDiff {
        FieldDiff {
            flags: FlagsDiff::of(self.flags, now.flags),
            type_changed: self.descriptor != now.descriptor,
            value_changed: self.value != now.value,
        }
    }
}

/// Delta between two snapshots of one Kotlin function (same name).
#[derive(Clone, Debug, Default)]
pub struct KmFunctionDiff {
    visibility_restricted: bool,
    visibility_expanded: bool,
    inline_changed: bool,
    body_changed: bool,
    default_declarations_changed: bool,
    became_nullable: bool,
    args_became_not_null: bool,
    operator_added: bool,
}

impl KmFunctionDiff {
    /// Visibility narrowed.
    #[must_use]
    pub fn access_restricted(&self) -> bool {
        self.visibility_restricted
    }

    /// Visibility widened.
    #[must_use]
    pub fn access_expanded(&self) -> bool {
        self.visibility_expanded
    }

    /// `inline` was added or removed.
    #[must_use]
    pub fn inline_changed(&self) -> bool {
        self.inline_changed
    }

    /// The compiled body fingerprint differs.
    #[must_use]
    pub fn body_changed(&self) -> bool {
        self.body_changed
    }

    /// A parameter gained or lost a default value.
    #[must_use]
    pub fn has_default_declaration_changes(&self) -> bool {
        self.default_declarations_changed
    }

    /// The return type became nullable.
    #[must_use]
    pub fn became_nullable(&self) -> bool {
        self.became_nullable
    }

    /// A parameter type became not-null.
    #[must_use]
    pub fn args_became_not_null(&self) -> bool {
        self.args_became_not_null
    }

    /// `operator` was added.
    #[must_use]
    pub fn operator_added(&self) -> bool {
        self.operator_added
    }
}

impl Diff for KmFunctionDiff {
    fn unchanged(&self) -> bool {
        !(self.visibility_restricted
            || self.visibility_expanded
            || self.inline_changed
            || self.body_changed
            || self.default_declarations_changed
            || self.became_nullable
            || self.args_became_not_null
            || self.operator_added)
    }
}

impl DiffCapable for KmFunction {
    type Key = String;
    type Diff = KmFunctionDiff;

    fn diff_key(&self) -> Self::Key {
        self.name.clone()
    }

    fn diff(&self, now: &Self) -> KmFunctionDiff {
        let default_declarations_changed = self.value_parameters.len()
            != now.value_parameters.len()
            || self
                .value_parameters
                .iter()
                .zip(&now.value_parameters)
                .any(|(past, now)| past.has_default != now.has_default);
        let args_became_not_null = self
            .value_parameters
            .iter()
            .zip(&now.value_parameters)
            .any(|(past, now)| past.is_nullable && !now.is_nullable);
        KmFunctionDiff {
            visibility_restricted: now.visibility < self.visibility,
            visibility_expanded: now.visibility > self.visibility,
            inline_changed: self.is_inline != now.is_inline,
            body_changed: self.body_fingerprint != now.body_fingerprint,
            default_declarations_changed,
            became_nullable: !self.returns_nullable && now.returns_nullable,
            args_became_not_null,
            operator_added: !self.is_operator && now.is_operator,
        }
    }
}

/// Delta between two snapshots of one Kotlin property (same name).
#[derive(Clone, Debug, Default)]
pub struct KmPropertyDiff {
    visibility_restricted: bool,
    visibility_expanded: bool,
    const_changed: bool,
    inline_accessors_changed: bool,
    became_nullable: bool,
    getter_removed: Option<String>,
    setter_removed: Option<String>,
}

impl KmPropertyDiff {
    /// Visibility narrowed.
    #[must_use]
    pub fn access_restricted(&self) -> bool {
        self.visibility_restricted
    }

    /// Visibility widened.
    #[must_use]
    pub fn access_expanded(&self) -> bool {
        self.visibility_expanded
    }

    /// `const` was added or removed.
    #[must_use]
    pub fn const_changed(&self) -> bool {
        self.const_changed
    }

    /// An accessor's `inline` status changed.
    #[must_use]
    pub fn inline_accessors_changed(&self) -> bool {
        self.inline_accessors_changed
    }

    /// The property type became nullable.
    #[must_use]
    pub fn became_nullable(&self) -> bool {
        self.became_nullable
    }

    /// JVM name of a getter that disappeared while the property survived.
    #[must_use]
    pub fn getter_removed(&self) -> Option<&str> {
        self.getter_removed.as_deref()
    }

    /// JVM name of a setter that disappeared while the property survived.
    #[must_use]
    pub fn setter_removed(&self) -> Option<&str> {
        self.setter_removed.as_deref()
    }
}

impl Diff for KmPropertyDiff {
    fn unchanged(&self) -> bool {
        !(self.visibility_restricted
            || self.visibility_expanded
            || self.const_changed
            || self.inline_accessors_changed
            || self.became_nullable
            || self.getter_removed.is_some()
            || self.setter_removed.is_some())
    }
}

impl DiffCapable for KmProperty {
    type Key = String;
    type Diff = KmPropertyDiff;

    fn diff_key(&self) -> Self::Key {
        self.name.clone()
    }

    fn diff(&self, now: &Self) -> KmPropertyDiff {
        let getter_removed = match (&self.getter_name, &now.getter_name) {
            (Some(name), None) => Some(name.clone()),
            _ => None,
        };
        let setter_removed = match (&self.setter_name, &now.setter_name) {
            (Some(name), None) => Some(name.clone()),
            _ => None,
        };
        KmPropertyDiff {
            visibility_restricted: now.visibility < self.visibility,
            visibility_expanded: now.visibility > self.visibility,
            const_changed: self.is_const != now.is_const,
            inline_accessors_changed: self.has_inline_accessors != now.has_inline_accessors,
            became_nullable: !self.is_nullable && now.is_nullable,
            getter_removed,
            setter_removed,
        }
    }
}

/// Delta between two snapshots of one constructor (same parameter names).
#[derive(Clone, Debug, Default)]
pub struct KmConstructorDiff {
    visibility_restricted: bool,
    visibility_expanded: bool,
    default_declarations_changed: bool,
}

impl KmConstructorDiff {
    /// Visibility narrowed.
    #[must_use]
    pub fn access_restricted(&self) -> bool {
        self.visibility_restricted
    }

    /// Visibility widened.
    #[must_use]
    pub fn access_expanded(&self) -> bool {
        self.visibility_expanded
    }

    /// A parameter gained or lost a default value.
    #[must_use]
    pub fn has_default_declaration_changes(&self) -> bool {
        self.default_declarations_changed
    }
}

impl Diff for KmConstructorDiff {
    fn unchanged(&self) -> bool {
        !(self.visibility_restricted
            || self.visibility_expanded
            || self.default_declarations_changed)
    }
}

impl DiffCapable for KmConstructor {
    type Key = Vec<String>;
    type Diff = KmConstructorDiff;

    fn diff_key(&self) -> Self::Key {
        self.value_parameters.iter().map(|p| p.name.clone()).collect()
    }

    fn diff(&self, now: &Self) -> KmConstructorDiff {
        KmConstructorDiff {
            visibility_restricted: now.visibility < self.visibility,
            visibility_expanded: now.visibility > self.visibility,
            default_declarations_changed: self
                .value_parameters
                .iter()
                .zip(&now.value_parameters)
                .any(|(past, now)| past.has_default != now.has_default),
        }
    }
}

/// Delta between two snapshots of one type alias (same name).
#[derive(Clone, Debug, Default)]
pub struct KmTypeAliasDiff {
    visibility_restricted: bool,
    visibility_expanded: bool,
    expansion_changed: bool,
}

impl KmTypeAliasDiff {
    /// Visibility narrowed.
    #[must_use]
    pub fn access_restricted(&self) -> bool {
        self.visibility_restricted
    }

    /// Visibility widened.
    #[must_use]
    pub fn access_expanded(&self) -> bool {
        self.visibility_expanded
    }

    /// The aliased type differs.
    #[must_use]
    pub fn expansion_changed(&self) -> bool {
        self.expansion_changed
    }
}

impl Diff for KmTypeAliasDiff {
    fn unchanged(&self) -> bool {
        !(self.visibility_restricted || self.visibility_expanded || self.expansion_changed)
    }
}

impl DiffCapable for KmTypeAlias {
    type Key = String;
    type Diff = KmTypeAliasDiff;

    fn diff_key(&self) -> Self::Key {
        self.name.clone()
    }

    fn diff(&self, now: &Self) -> KmTypeAliasDiff {
        KmTypeAliasDiff {
            visibility_restricted: now.visibility < self.visibility,
            visibility_expanded: now.visibility > self.visibility,
            expansion_changed: self.expansion != now.expansion,
        }
    }
}

/// Delta of the declarations in a class container.
#[derive(Clone, Debug)]
pub struct KmClassDiff {
    /// Declaration visibility widened (e.g. `internal` to `public`).
    pub visibility_expanded: bool,
    /// Declaration visibility narrowed.
    pub visibility_restricted: bool,
    /// `sealed` was added or removed.
    pub sealed_changed: bool,
    /// Sealed-subclass list delta.
    pub sealed_subclasses: Specifier<ReferenceId>,
    /// Member function delta.
    pub functions: Specifier<KmFunction>,
    /// Member property delta.
    pub properties: Specifier<KmProperty>,
    /// Constructor delta.
    pub constructors: Specifier<KmConstructor>,
    /// Nested type alias delta.
    pub type_aliases: Specifier<KmTypeAlias>,
}

impl KmClassDiff {
    fn of(past: &KmClass, now: &KmClass) -> Self {
        Self {
            visibility_expanded: now.visibility > past.visibility,
            visibility_restricted: now.visibility < past.visibility,
            sealed_changed: past.is_sealed != now.is_sealed,
            sealed_subclasses: deep_diff(&past.sealed_subclasses, &now.sealed_subclasses),
            functions: deep_diff(&past.functions, &now.functions),
            properties: deep_diff(&past.properties, &now.properties),
            constructors: deep_diff(&past.constructors, &now.constructors),
            type_aliases: deep_diff(&past.type_aliases, &now.type_aliases),
        }
    }

    fn unchanged(&self) -> bool {
        !self.visibility_expanded
            && !self.visibility_restricted
            && !self.sealed_changed
            && self.sealed_subclasses.unchanged()
            && self.functions.unchanged()
            && self.properties.unchanged()
            && self.constructors.unchanged()
            && self.type_aliases.unchanged()
    }
}

/// Delta of the declarations in a file facade.
#[derive(Clone, Debug)]
pub struct KmFacadeDiff {
    /// Top-level function delta.
    pub functions: Specifier<KmFunction>,
    /// Top-level property delta.
    pub properties: Specifier<KmProperty>,
    /// Top-level type alias delta.
    pub type_aliases: Specifier<KmTypeAlias>,
}

impl KmFacadeDiff {
    fn of(past: &KmFileFacade, now: &KmFileFacade) -> Self {
        Self {
            functions: deep_diff(&past.functions, &now.functions),
            properties: deep_diff(&past.properties, &now.properties),
            type_aliases: deep_diff(&past.type_aliases, &now.type_aliases),
        }
    }

    fn unchanged(&self) -> bool {
        self.functions.unchanged() && self.properties.unchanged() && self.type_aliases.unchanged()
    }
}

/// Delta of a node's Kotlin metadata.
#[derive(Clone, Debug)]
pub enum KotlinMetaDiff {
    /// Metadata identical (or absent on both sides).
    Unchanged,
    /// Metadata attached, detached, or its container kind flipped; fine-
    /// grained declaration diffs are meaningless across such a change.
    ContainerChanged,
    /// Both sides are class containers of the same kind.
    Class(KmClassDiff),
    /// Both sides are file facades.
    FileFacade(KmFacadeDiff),
}

impl KotlinMetaDiff {
    fn of(past: &KotlinMeta, now: &KotlinMeta) -> Self {
        match (past, now) {
            (KotlinMeta::None, KotlinMeta::None) => Self::Unchanged,
            (KotlinMeta::Class(p), KotlinMeta::Class(n)) if p.kind == n.kind => {
                let diff = KmClassDiff::of(p, n);
                if diff.unchanged() {
                    Self::Unchanged
                } else {
                    Self::Class(diff)
                }
            }
            (KotlinMeta::FileFacade(p), KotlinMeta::FileFacade(n)) => {
                let diff = KmFacadeDiff::of(p, n);
                if diff.unchanged() {
                    Self::Unchanged
                } else {
                    Self::FileFacade(diff)
                }
            }
            _ => Self::ContainerChanged,
        }
    }

    /// True when the metadata is observably identical.
    #[must_use]
    pub fn unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Delta between two snapshots of one class node.
#[derive(Clone, Debug)]
pub struct ClassDiff {
    /// Flag delta.
    pub flags: FlagsDiff,
    /// Direct superclass differs.
    pub superclass_changed: bool,
    /// Implemented-interface delta.
    pub interfaces: Specifier<ReferenceId>,
    /// Method delta.
    pub methods: Specifier<JvmMethod>,
    /// Field delta.
    pub fields: Specifier<JvmField>,
    /// Kotlin metadata delta.
    pub metadata: KotlinMetaDiff,
}

impl ClassDiff {
    /// The supertype surface changed in a way that can re-route method
    /// resolution: superclass swapped or interfaces removed.
    #[must_use]
    pub fn hierarchy_narrowed(&self) -> bool {
        self.superclass_changed || !self.interfaces.removed().is_empty()
    }
}

impl Diff for ClassDiff {
    fn unchanged(&self) -> bool {
        !self.flags.changed()
            && !self.superclass_changed
            && self.interfaces.unchanged()
            && self.methods.unchanged()
            && self.fields.unchanged()
            && self.metadata.unchanged()
    }
}

impl DiffCapable for JvmClass {
    type Key = ReferenceId;
    type Diff = ClassDiff;

    fn diff_key(&self) -> Self::Key {
        self.id().clone()
    }

    fn diff(&self, now: &Self) -> ClassDiff {
        ClassDiff {
            flags: FlagsDiff::of(self.flags, now.flags),
            superclass_changed: self.superclass != now.superclass,
            interfaces: deep_diff(&self.interfaces, &now.interfaces),
            methods: deep_diff(&self.methods, &now.methods),
            fields: deep_diff(&self.fields, &now.fields),
            metadata: KotlinMetaDiff::of(&self.metadata, &now.metadata),
        }
    }
}

#[cfg(test)]
mod tests;
