//! Diff algebra: keyed three-way partition of two collections.
//!
//! For any two collections of comparable items with a stable key,
//! [`deep_diff`] splits them into `added` (in `now` only), `removed` (in
//! `past` only) and `changed` (same key, different content). Each changed
//! pair carries a typed diff object exposing named predicates, so strategies
//! ask questions like "was access restricted" without re-deriving anything.
//!
//! Diff computation is pure and deterministic: predicates are side-effect
//! free and evaluable in any order. When both inputs are empty the result is
//! the empty diff, which allocates nothing (`Vec::new` is allocation-free).

use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A structural delta between two snapshots of the same item.
pub trait Diff {
    /// True when the two snapshots are observably identical.
    fn unchanged(&self) -> bool;
}

/// An item that can participate in keyed diffing.
pub trait DiffCapable: Clone {
    /// Stable identity within one collection (name+descriptor for JVM
    /// members, name for Kotlin declarations).
    type Key: Eq + Hash + Clone + Debug;

    /// The typed diff produced for a same-key pair.
    type Diff: Diff + Clone + Debug;

    /// The item's identity key.
    fn diff_key(&self) -> Self::Key;

    /// Compute the structural delta from `self` (the past snapshot) to `now`.
    fn diff(&self, now: &Self) -> Self::Diff;
}

/// A same-key pair whose content differs, with the computed delta.
#[derive(Clone, Debug)]
pub struct Change<T: DiffCapable> {
    /// Snapshot from the previous round.
    pub past: T,
    /// Snapshot from the current round.
    pub now: T,
    /// The structural delta between the two.
    pub diff: T::Diff,
}

/// Three-way partition of two keyed collections.
#[derive(Clone, Debug)]
pub struct Specifier<T: DiffCapable> {
    added: Vec<T>,
    removed: Vec<T>,
    changed: Vec<Change<T>>,
}

impl<T: DiffCapable> Specifier<T> {
    /// The empty ("unchanged") diff.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            added: Vec::new(),
            removed: Vec::new(),
            changed: Vec::new(),
        }
    }

    /// Items present only in the `now` collection, in `now` order.
    #[must_use]
    pub fn added(&self) -> &[T] {
        &self.added
    }

    /// Items present only in the `past` collection, in `past` order.
    #[must_use]
    pub fn removed(&self) -> &[T] {
        &self.removed
    }

    /// Same-key pairs whose content differs, in `past` order.
    #[must_use]
    pub fn changed(&self) -> &[Change<T>] {
        &self.changed
    }

    /// True when nothing was added, removed or changed.
    #[must_use]
    pub fn unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Partition `past` and `now` by key and diff the same-key pairs.
///
/// A same-key pair lands in `changed` only when its computed diff reports a
/// difference; key-equal, content-equal items are dropped entirely.
pub fn deep_diff<T: DiffCapable>(past: &[T], now: &[T]) -> Specifier<T> {
    if past.is_empty() && now.is_empty() {
        return Specifier::empty();
    }

    let mut now_by_key: FxHashMap<T::Key, &T> = FxHashMap::default();
    for item in now {
        now_by_key.insert(item.diff_key(), item);
    }

    let mut removed = Vec::new();
    let mut changed = Vec::new();
    for past_item in past {
        match now_by_key.remove(&past_item.diff_key()) {
            None => removed.push(past_item.clone()),
            Some(now_item) => {
                let diff = past_item.diff(now_item);
                if !diff.unchanged() {
                    changed.push(Change {
                        past: past_item.clone(),
                        now: now_item.clone(),
                        diff,
                    });
                }
            }
        }
    }

    // Whatever survived in the map was never matched by a past key.
    let added = now
        .iter()
        .filter(|item| now_by_key.contains_key(&item.diff_key()))
        .cloned()
        .collect();

    Specifier {
        added,
        removed,
        changed,
    }
}

/// Diff for items whose identity is their whole content (e.g. supertype
/// references): a same-key pair can never be "changed".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoDiff;

impl Diff for NoDiff {
    fn unchanged(&self) -> bool {
        true
    }
}

impl DiffCapable for crate::refs::ReferenceId {
    type Key = crate::refs::ReferenceId;
    type Diff = NoDiff;

    fn diff_key(&self) -> Self::Key {
        self.clone()
    }

    fn diff(&self, _now: &Self) -> NoDiff {
        NoDiff
    }
}
