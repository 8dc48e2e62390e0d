//! The class node: one compiled unit's observable surface for one round.

use ripple_graph::{Node, ReferenceId};

use super::flags::JvmFlags;
use super::kotlin::KotlinMeta;
use super::member::{JvmField, JvmMethod};
use super::usages::JvmUsage;

/// Package part of a canonical binary name; empty for the default package.
#[must_use]
pub fn package_of(name: &str) -> &str {
    match name.rfind('/') {
        Some(pos) => &name[..pos],
        None => "",
    }
}

/// Simple name part of a canonical binary name: after the last `/` and the
/// last `$`.
#[must_use]
pub fn short_name_of(name: &str) -> &str {
    let tail = match name.rfind('/') {
        Some(pos) => &name[pos + 1..],
        None => name,
    };
    match tail.rfind('$') {
        Some(pos) => &tail[pos + 1..],
        None => tail,
    }
}

/// Immutable snapshot of a compiled class for one compilation round.
///
/// A new round produces a new snapshot under the same [`ReferenceId`]; the
/// driver classifies a unit as changed when two snapshots compare unequal.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct JvmClass {
    id: ReferenceId,
    /// Direct superclass, absent only for root types.
    pub superclass: Option<ReferenceId>,
    /// Directly implemented interfaces.
    pub interfaces: Vec<ReferenceId>,
    /// Access and modifier bits.
    pub flags: JvmFlags,
    /// Declared methods.
    pub methods: Vec<JvmMethod>,
    /// Declared fields.
    pub fields: Vec<JvmField>,
    /// Attached Kotlin facts, if the unit is Kotlin-compiled.
    pub metadata: KotlinMeta,
    /// Outgoing facts recorded in the compiled output.
    pub usages: Vec<JvmUsage>,
}

impl JvmClass {
    /// A public class with the given canonical binary name (`com/example/Foo`).
    pub fn new(name: impl Into<ReferenceId>) -> Self {
        Self {
            id: name.into(),
            superclass: Some(ReferenceId::new("java/lang/Object")),
            interfaces: Vec::new(),
            flags: JvmFlags::PUBLIC,
            methods: Vec::new(),
            fields: Vec::new(),
            metadata: KotlinMeta::None,
            usages: Vec::new(),
        }
    }

    /// Replace the access and modifier bits.
    #[must_use]
    pub fn with_flags(mut self, flags: JvmFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Replace the direct superclass.
    #[must_use]
    pub fn with_superclass(mut self, superclass: impl Into<ReferenceId>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Replace the implemented interfaces.
    #[must_use]
    pub fn with_interfaces(
        mut self,
        interfaces: impl IntoIterator<Item = impl Into<ReferenceId>>,
    ) -> Self {
        self.interfaces = interfaces.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the declared methods.
    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = JvmMethod>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    /// Replace the declared fields.
    #[must_use]
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = JvmField>) -> Self {
        self.fields = fields.into_iter().collect();
        self
    }

    /// Attach Kotlin metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: KotlinMeta) -> Self {
        self.metadata = metadata;
        self
    }

    /// Replace the recorded outgoing usages.
    #[must_use]
    pub fn with_usages(mut self, usages: impl IntoIterator<Item = JvmUsage>) -> Self {
        self.usages = usages.into_iter().collect();
        self
    }

    /// Stable identity: the canonical binary name.
    #[must_use]
    pub fn id(&self) -> &ReferenceId {
        &self.id
    }

    /// The canonical binary name as a string.
    #[must_use]
    pub fn name(&self) -> &str {
        self.id.as_str()
    }

    /// Package part of the binary name; empty for the default package.
    #[must_use]
    pub fn package_name(&self) -> &str {
        package_of(self.name())
    }

    /// The package as a lookup scope.
    #[must_use]
    pub fn package_id(&self) -> ReferenceId {
        ReferenceId::new(self.package_name())
    }

    /// Simple name: after the last `/` and the last `$`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        short_name_of(self.name())
    }

    /// Binary name of the enclosing class for nested classes.
    #[must_use]
    pub fn outer_name(&self) -> Option<ReferenceId> {
        self.name()
            .rfind('$')
            .map(|pos| ReferenceId::new(&self.name()[..pos]))
    }

    /// Direct supertypes: superclass then interfaces.
    pub fn supertypes(&self) -> impl Iterator<Item = &ReferenceId> {
        self.superclass.iter().chain(&self.interfaces)
    }

    /// True for `private` classes.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.flags.contains(JvmFlags::PRIVATE)
    }

    /// True for interfaces (including annotation types).
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.flags.contains(JvmFlags::INTERFACE)
    }

    /// True for annotation types.
    #[must_use]
    pub fn is_annotation(&self) -> bool {
        self.flags.contains(JvmFlags::ANNOTATION)
    }

    /// True for classes declared inside a method body.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.flags.contains(JvmFlags::LOCAL)
    }

    /// True for anonymous classes.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.flags.contains(JvmFlags::ANONYMOUS)
    }

    /// True for annotation-processor output.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.flags.contains(JvmFlags::GENERATED)
    }

    /// True when the node is Kotlin-compiled.
    #[must_use]
    pub fn is_kotlin(&self) -> bool {
        self.metadata.is_kotlin()
    }

    /// True for Kotlin `sealed` declarations.
    #[must_use]
    pub fn is_sealed(&self) -> bool {
        self.metadata.as_class().is_some_and(|km| km.is_sealed)
    }

    /// A declared method with the given name and argument signature.
    #[must_use]
    pub fn find_method(&self, probe: &JvmMethod) -> Option<&JvmMethod> {
        self.methods.iter().find(|m| m.same_signature(probe))
    }

    /// A declared field with the given name.
    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&JvmField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Declared abstract methods.
    pub fn abstract_methods(&self) -> impl Iterator<Item = &JvmMethod> {
        self.methods.iter().filter(|m| m.is_abstract())
    }

    /// True when this node records `usage` in its compiled output.
    #[must_use]
    pub fn has_usage(&self, usage: &JvmUsage) -> bool {
        self.usages.contains(usage)
    }
}

impl Node for JvmClass {
    type Usage = JvmUsage;

    fn reference_id(&self) -> &ReferenceId {
        &self.id
    }

    fn usages(&self) -> &[JvmUsage] {
        &self.usages
    }
}
