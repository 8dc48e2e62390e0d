//! Usages: the outgoing facts recorded in a node's compiled output.

use ripple_graph::{ReferenceId, Usage};

/// One recorded dependency of a node's compiled output on a named symbol.
///
/// Usages exist only to be matched against changed symbols during
/// differentiation; they carry no lifecycle of their own.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum JvmUsage {
    /// A type reference.
    Class(ReferenceId),
    /// An instantiation (`new`, constructor call).
    ClassNew(ReferenceId),
    /// A member call with an exact descriptor.
    Method {
        /// Class the call was resolved against.
        owner: ReferenceId,
        /// Method name.
        name: String,
        /// Full JVM descriptor `(args)ret`.
        descriptor: String,
    },
    /// A field access with an exact descriptor.
    Field {
        /// Class the access was resolved against.
        owner: ReferenceId,
        /// Field name.
        name: String,
        /// Type descriptor.
        descriptor: String,
    },
    /// Name resolution by scope: how Kotlin resolves top-level functions,
    /// properties and extensions (by scope+name, not by receiver descriptor).
    Lookup {
        /// Package or container the name was resolved in.
        scope: ReferenceId,
        /// Simple name that was resolved.
        name: String,
    },
    /// An annotation applied from this node.
    Annotation(ReferenceId),
}

impl JvmUsage {
    /// A lookup usage in `scope` for `name`.
    pub fn lookup(scope: impl Into<ReferenceId>, name: impl Into<String>) -> Self {
        Self::Lookup {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// The derived index key of a lookup usage, `scope.name`.
    #[must_use]
    pub fn lookup_key(scope: &ReferenceId, name: &str) -> ReferenceId {
        scope.scoped(name)
    }
}

impl Usage for JvmUsage {
    fn element_owner(&self) -> &ReferenceId {
        match self {
            Self::Class(id) | Self::ClassNew(id) | Self::Annotation(id) => id,
            Self::Method { owner, .. } | Self::Field { owner, .. } => owner,
            Self::Lookup { scope, .. } => scope,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_owner_per_variant() {
        let owner = ReferenceId::new("com/example/Foo");
        let usage = JvmUsage::Method {
            owner: owner.clone(),
            name: "bar".into(),
            descriptor: "()V".into(),
        };
        assert_eq!(usage.element_owner(), &owner);

        let lookup = JvmUsage::lookup("com/example", "bar");
        assert_eq!(lookup.element_owner(), &ReferenceId::new("com/example"));
    }

    #[test]
    fn test_lookup_key_format() {
        let key = JvmUsage::lookup_key(&ReferenceId::new("com/example"), "topFn");
        assert_eq!(key.as_str(), "com/example.topFn");
    }
}
