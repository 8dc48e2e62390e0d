//! Kotlin metadata attached to class nodes.
//!
//! The metadata container is a closed sum: a node either carries no Kotlin
//! facts, describes a class-like declaration, or describes a file facade
//! (the synthetic class holding a file's top-level declarations). Exhaustive
//! matching replaces any "null means not Kotlin" convention.

use ripple_graph::ReferenceId;

/// Kotlin facts attached to a JVM class node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum KotlinMeta {
    /// Not Kotlin-compiled.
    #[default]
    None,
    /// A class-like declaration container.
    Class(KmClass),
    /// A file facade holding top-level declarations.
    FileFacade(KmFileFacade),
}

impl KotlinMeta {
    /// True when the node was produced by the Kotlin compiler.
    #[must_use]
    pub fn is_kotlin(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// The class container, if this is a class-like declaration.
    #[must_use]
    pub fn as_class(&self) -> Option<&KmClass> {
        match self {
            Self::Class(km) => Some(km),
            _ => None,
        }
    }

    /// Functions declared in the container, any container kind.
    #[must_use]
    pub fn functions(&self) -> &[KmFunction] {
        match self {
            Self::None => &[],
            Self::Class(km) => &km.functions,
            Self::FileFacade(facade) => &facade.functions,
        }
    }

    /// Properties declared in the container, any container kind.
    #[must_use]
    pub fn properties(&self) -> &[KmProperty] {
        match self {
            Self::None => &[],
            Self::Class(km) => &km.properties,
            Self::FileFacade(facade) => &facade.properties,
        }
    }

    /// Type aliases declared in the container, any container kind.
    #[must_use]
    pub fn type_aliases(&self) -> &[KmTypeAlias] {
        match self {
            Self::None => &[],
            Self::Class(km) => &km.type_aliases,
            Self::FileFacade(facade) => &facade.type_aliases,
        }
    }

    /// True when declarations in this container are importable by
    /// unqualified name: top-level declarations and companion members.
    #[must_use]
    pub fn is_importable_scope(&self) -> bool {
        match self {
            Self::None => false,
            Self::FileFacade(_) => true,
            Self::Class(km) => km.kind == KmClassKind::CompanionObject,
        }
    }
}

/// Kind of a class-like Kotlin declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum KmClassKind {
    /// `class`.
    Class,
    /// `interface`.
    Interface,
    /// `object`.
    Object,
    /// `companion object`.
    CompanionObject,
    /// `enum class`.
    EnumClass,
    /// `annotation class`.
    AnnotationClass,
}

/// Kotlin declaration visibility, ordered from least to most visible.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum KmVisibility {
    /// `private`.
    Private,
    /// `internal`.
    Internal,
    /// `protected`.
    Protected,
    /// `public`.
    Public,
}

/// A class-like declaration container.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct KmClass {
    /// Declaration kind.
    pub kind: KmClassKind,
    /// Declaration visibility.
    pub visibility: KmVisibility,
    /// True for `sealed` classes and interfaces.
    pub is_sealed: bool,
    /// Direct subclasses listed in the sealed-class metadata.
    pub sealed_subclasses: Vec<ReferenceId>,
    /// True for declarations inside a function body.
    pub is_local: bool,
    /// Member functions.
    pub functions: Vec<KmFunction>,
    /// Member properties.
    pub properties: Vec<KmProperty>,
    /// Constructors.
    pub constructors: Vec<KmConstructor>,
    /// Nested type aliases.
    pub type_aliases: Vec<KmTypeAlias>,
}

impl KmClass {
    /// A public, non-sealed container of the given kind with no members.
    #[must_use]
    pub fn new(kind: KmClassKind) -> Self {
        Self {
            kind,
            visibility: KmVisibility::Public,
            is_sealed: false,
            sealed_subclasses: Vec::new(),
            is_local: false,
            functions: Vec::new(),
            properties: Vec::new(),
            constructors: Vec::new(),
            type_aliases: Vec::new(),
        }
    }
}

/// A file facade container.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct KmFileFacade {
    /// Top-level functions.
    pub functions: Vec<KmFunction>,
    /// Top-level properties.
    pub properties: Vec<KmProperty>,
    /// Top-level type aliases.
    pub type_aliases: Vec<KmTypeAlias>,
}

/// One Kotlin function declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct KmFunction {
    /// Function name.
    pub name: String,
    /// Declaration visibility.
    pub visibility: KmVisibility,
    /// True for `inline fun`.
    pub is_inline: bool,
    /// True for `operator fun`.
    pub is_operator: bool,
    /// Value parameters, in order.
    pub value_parameters: Vec<KmValueParameter>,
    /// True when the return type is nullable.
    pub returns_nullable: bool,
    /// Fingerprint of the compiled body; differs when the body differs.
    /// Consulted only for inline functions, whose bodies callers embed.
    pub body_fingerprint: Option<u64>,
}

impl KmFunction {
    /// A public function with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: KmVisibility::Public,
            is_inline: false,
            is_operator: false,
            value_parameters: Vec::new(),
            returns_nullable: false,
            body_fingerprint: None,
        }
    }
}

/// One value parameter of a function or constructor.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct KmValueParameter {
    /// Parameter name.
    pub name: String,
    /// True when a default value is declared.
    pub has_default: bool,
    /// True when the parameter type is nullable.
    pub is_nullable: bool,
}

impl KmValueParameter {
    /// A non-null parameter without a default value.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            has_default: false,
            is_nullable: false,
        }
    }
}

/// One Kotlin property declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct KmProperty {
    /// Property name.
    pub name: String,
    /// Declaration visibility.
    pub visibility: KmVisibility,
    /// True for `const val`.
    pub is_const: bool,
    /// True when the getter or setter is declared `inline`.
    pub has_inline_accessors: bool,
    /// True when the property type is nullable.
    pub is_nullable: bool,
    /// JVM name of the getter, when one is exposed to Java.
    pub getter_name: Option<String>,
    /// JVM name of the setter, when one is exposed to Java.
    pub setter_name: Option<String>,
}

impl KmProperty {
    /// A public read-only property with a default-named getter.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let getter = default_getter_name(&name);
        Self {
            name,
            visibility: KmVisibility::Public,
            is_const: false,
            has_inline_accessors: false,
            is_nullable: false,
            getter_name: Some(getter),
            setter_name: None,
        }
    }
}

/// The Java-visible getter name Kotlin derives for a property.
#[must_use]
pub fn default_getter_name(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("get{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => "get".to_string(),
    }
}

/// One Kotlin constructor declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct KmConstructor {
    /// Declaration visibility.
    pub visibility: KmVisibility,
    /// Value parameters, in order.
    pub value_parameters: Vec<KmValueParameter>,
}

impl KmConstructor {
    /// A public constructor with the given parameters.
    #[must_use]
    pub fn new(value_parameters: Vec<KmValueParameter>) -> Self {
        Self {
            visibility: KmVisibility::Public,
            value_parameters,
        }
    }
}

/// One Kotlin type alias declaration.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct KmTypeAlias {
    /// Alias name.
    pub name: String,
    /// Declaration visibility.
    pub visibility: KmVisibility,
    /// Fully-qualified name of the aliased type.
    pub expansion: String,
}

impl KmTypeAlias {
    /// A public alias for `expansion`.
    pub fn new(name: impl Into<String>, expansion: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility: KmVisibility::Public,
            expansion: expansion.into(),
        }
    }
}
