//! Stable identifiers for graph nodes and their source files.
//!
//! A [`ReferenceId`] names a compiled unit (for JVM classes this is the
//! canonical binary name, e.g. `com/example/Foo`). Identity is the string
//! itself: two ids compare equal exactly when their strings match. Ids are
//! also used as derived index keys (`scope.symbolName` and similar), so they
//! are cheap to clone and hash.
//!
//! A [`NodeSource`] is the normalized path of a source file. It is the unit
//! of the engine's output: the affected-source set is a set of `NodeSource`s.

use std::fmt;
use std::sync::Arc;

/// Stable, opaque identifier for a compiled unit or a derived index key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferenceId(Arc<str>);

impl ReferenceId {
    /// Create an id from its identity string.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// The identity string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a scoped key `scope.symbol` in this id's namespace.
    ///
    /// Used by back-dependency indices that key on (scope, name) pairs.
    #[must_use]
    pub fn scoped(&self, symbol: &str) -> ReferenceId {
        ReferenceId::new(format!("{}.{symbol}", self.0))
    }
}

impl fmt::Debug for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReferenceId({})", self.0)
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReferenceId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ReferenceId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

#[cfg(feature = "cache")]
impl serde::Serialize for ReferenceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "cache")]
impl<'de> serde::Deserialize<'de> for ReferenceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// Normalized path of a source file tracked by the graph.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeSource(Arc<str>);

impl NodeSource {
    /// Create a source from its normalized path.
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self(path.into())
    }

    /// The normalized path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeSource({})", self.0)
    }
}

impl fmt::Display for NodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeSource {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for NodeSource {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

#[cfg(feature = "cache")]
impl serde::Serialize for NodeSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "cache")]
impl<'de> serde::Deserialize<'de> for NodeSource {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_id_identity() {
        let a = ReferenceId::new("com/example/Foo");
        let b = ReferenceId::from("com/example/Foo");
        let c = ReferenceId::from("com/example/Bar");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "com/example/Foo");
    }

    #[test]
    fn test_reference_id_hash_identity() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ReferenceId::new("a/B"));
        set.insert(ReferenceId::new("a/B"));
        set.insert(ReferenceId::new("a/C"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_scoped_key() {
        let scope = ReferenceId::new("com/example");
        assert_eq!(scope.scoped("topLevelFn").as_str(), "com/example.topLevelFn");
    }

    #[test]
    fn test_node_source_path() {
        let src = NodeSource::new("src/main/kotlin/Foo.kt");
        assert_eq!(src.path(), "src/main/kotlin/Foo.kt");
        assert_eq!(src, NodeSource::from("src/main/kotlin/Foo.kt".to_string()));
    }
}
