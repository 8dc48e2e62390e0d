//! Back-dependency indices derived from stored class nodes.
//!
//! Each index answers "who depends on symbol X" for one key shape. Key
//! derivation is a pure function of a node's immutable content, so an index
//! rebuilt from the current node set always matches one maintained
//! incrementally across the same adds and removes.

use ripple_graph::{BackDependencyIndex, DependencyGraph, ReferenceId};
use smallvec::SmallVec;

use crate::model::{JvmClass, JvmUsage, KotlinMeta};

/// Keys a class node contributes to a back-dependency index.
pub type IndexKeys = SmallVec<[ReferenceId; 4]>;

/// Maps `scope.symbolName` keys to the nodes that resolve that name.
///
/// Kotlin resolves top-level functions, properties and extensions by
/// scope+name rather than by exact descriptor; this index answers "who might
/// call or resolve symbol X by name".
pub struct LookupsIndex;

impl LookupsIndex {
    /// Registered index name.
    pub const NAME: &'static str = "lookups";
}

impl BackDependencyIndex<JvmClass> for LookupsIndex {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn keys(&self, node: &JvmClass) -> IndexKeys {
        node.usages
            .iter()
            .filter_map(|usage| match usage {
                JvmUsage::Lookup { scope, name } => Some(JvmUsage::lookup_key(scope, name)),
                _ => None,
            })
            .collect()
    }
}

/// Maps fully-qualified type-alias names to the nodes declaring them.
///
/// Used to detect a class and an alias colliding on the same name, which is
/// legal per-file but not across a resolved compilation chunk.
pub struct TypealiasesIndex;

impl TypealiasesIndex {
    /// Registered index name.
    pub const NAME: &'static str = "type-aliases";
}

impl BackDependencyIndex<JvmClass> for TypealiasesIndex {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn keys(&self, node: &JvmClass) -> IndexKeys {
        let package = node.package_name();
        node.metadata
            .type_aliases()
            .iter()
            .map(|alias| {
                if package.is_empty() {
                    ReferenceId::new(alias.name.as_str())
                } else {
                    ReferenceId::new(format!("{package}/{}", alias.name))
                }
            })
            .collect()
    }
}

/// Maps a supertype id to its direct Kotlin subclasses.
///
/// Only non-local Kotlin class containers contribute, and the implicit root
/// types are never used as keys; the value side therefore holds Kotlin nodes
/// only. Used to reconstruct direct-subclass edges for sealed-class closure
/// checks.
pub struct KotlinSubclassesIndex;

impl KotlinSubclassesIndex {
    /// Registered index name.
    pub const NAME: &'static str = "kotlin-subclasses";

    fn is_root(id: &ReferenceId) -> bool {
        matches!(id.as_str(), "java/lang/Object" | "kotlin/Any")
    }
}

impl BackDependencyIndex<JvmClass> for KotlinSubclassesIndex {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn keys(&self, node: &JvmClass) -> IndexKeys {
        match &node.metadata {
            KotlinMeta::Class(km) if !km.is_local => node
                .supertypes()
                .filter(|id| !Self::is_root(id))
                .cloned()
                .collect(),
            _ => IndexKeys::new(),
        }
    }
}

/// Maps a supertype id to its direct subclasses, for every class node.
///
/// The general reverse hierarchy edge the JVM rules traverse when a change
/// must propagate to subclasses.
pub struct SubclassesIndex;

impl SubclassesIndex {
    /// Registered index name.
    pub const NAME: &'static str = "subclasses";
}

impl BackDependencyIndex<JvmClass> for SubclassesIndex {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn keys(&self, node: &JvmClass) -> IndexKeys {
        node.supertypes()
            .filter(|id| id.as_str() != "java/lang/Object")
            .cloned()
            .collect()
    }
}

/// The index set the differentiation driver requires.
#[must_use]
pub fn jvm_indices() -> Vec<Box<dyn BackDependencyIndex<JvmClass>>> {
    vec![
        Box::new(LookupsIndex),
        Box::new(TypealiasesIndex),
        Box::new(KotlinSubclassesIndex),
        Box::new(SubclassesIndex),
    ]
}

/// An empty dependency graph with all required indices registered.
#[must_use]
pub fn new_graph() -> DependencyGraph<JvmClass> {
    DependencyGraph::new(jvm_indices())
}

#[cfg(test)]
mod tests;
