//! JVM access and modifier flags.
//!
//! One bit set per classfile fact the differentiation rules care about.
//! Flags are captured by the front end when a node snapshot is built and
//! never recomputed.

use bitflags::bitflags;

bitflags! {
    /// Access and modifier bits of a class, method or field.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct JvmFlags: u32 {
        // === Access (bits 0-2) ===
        // Absence of all three means package-local.

        /// `public` access.
        const PUBLIC = 1 << 0;
        /// `private` access.
        const PRIVATE = 1 << 1;
        /// `protected` access.
        const PROTECTED = 1 << 2;

        // === Modifiers (bits 4-9) ===

        /// `static` member or nested class.
        const STATIC = 1 << 4;
        /// `final` class, method or field.
        const FINAL = 1 << 5;
        /// `abstract` class or method.
        const ABSTRACT = 1 << 6;
        /// `volatile` field.
        const VOLATILE = 1 << 7;
        /// Compiler-generated member.
        const SYNTHETIC = 1 << 8;
        /// Bridge method emitted for generics erasure.
        const BRIDGE = 1 << 9;

        // === Kind (bits 12-14) ===

        /// The class is an interface.
        const INTERFACE = 1 << 12;
        /// The class is an annotation type.
        const ANNOTATION = 1 << 13;
        /// The class is an enum.
        const ENUM = 1 << 14;

        // === Placement (bits 16-18) ===

        /// Declared inside a method body.
        const LOCAL = 1 << 16;
        /// Anonymous class.
        const ANONYMOUS = 1 << 17;
        /// Produced by an annotation processor.
        const GENERATED = 1 << 18;
    }
}

impl JvmFlags {
    /// True when none of the explicit access bits is set.
    #[must_use]
    pub fn is_package_local(self) -> bool {
        !self.intersects(Self::PUBLIC | Self::PRIVATE | Self::PROTECTED)
    }

    /// The access level encoded in these flags.
    #[must_use]
    pub fn access_level(self) -> AccessLevel {
        if self.contains(Self::PUBLIC) {
            AccessLevel::Public
        } else if self.contains(Self::PROTECTED) {
            AccessLevel::Protected
        } else if self.contains(Self::PRIVATE) {
            AccessLevel::Private
        } else {
            AccessLevel::PackageLocal
        }
    }
}

/// Access levels ordered from least to most visible.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum AccessLevel {
    /// `private`.
    Private,
    /// No access modifier.
    PackageLocal,
    /// `protected`.
    Protected,
    /// `public`.
    Public,
}

/// Flag delta between two snapshots of the same element.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlagsDiff {
    added: JvmFlags,
    removed: JvmFlags,
    past_access: AccessLevel,
    now_access: AccessLevel,
}

impl FlagsDiff {
    /// Compute the delta from `past` to `now`.
    #[must_use]
    pub fn of(past: JvmFlags, now: JvmFlags) -> Self {
        Self {
            added: now - past,
            removed: past - now,
            past_access: past.access_level(),
            now_access: now.access_level(),
        }
    }

    /// Bits set in `now` but not in `past`.
    #[must_use]
    pub fn added(&self) -> JvmFlags {
        self.added
    }

    /// Bits set in `past` but not in `now`.
    #[must_use]
    pub fn removed(&self) -> JvmFlags {
        self.removed
    }

    /// True when any bit changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// The element became less visible.
    #[must_use]
    pub fn access_restricted(&self) -> bool {
        self.now_access < self.past_access
    }

    /// The element became more visible.
    #[must_use]
    pub fn access_expanded(&self) -> bool {
        self.now_access > self.past_access
    }

    /// The element's access after the change.
    #[must_use]
    pub fn now_access(&self) -> AccessLevel {
        self.now_access
    }
}

#[cfg(feature = "cache")]
impl serde::Serialize for JvmFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.bits())
    }
}

#[cfg(feature = "cache")]
impl<'de> serde::Deserialize<'de> for JvmFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_level_ordering() {
        assert!(AccessLevel::Private < AccessLevel::PackageLocal);
        assert!(AccessLevel::PackageLocal < AccessLevel::Protected);
        assert!(AccessLevel::Protected < AccessLevel::Public);
    }

    #[test]
    fn test_package_local_detection() {
        assert!(JvmFlags::STATIC.is_package_local());
        assert!(!(JvmFlags::PUBLIC | JvmFlags::STATIC).is_package_local());
        assert_eq!(JvmFlags::STATIC.access_level(), AccessLevel::PackageLocal);
    }

    #[test]
    fn test_flags_diff_access() {
        let diff = FlagsDiff::of(JvmFlags::PUBLIC, JvmFlags::PROTECTED);
        assert!(diff.access_restricted());
        assert!(!diff.access_expanded());
        assert_eq!(diff.added(), JvmFlags::PROTECTED);
        assert_eq!(diff.removed(), JvmFlags::PUBLIC);

        let widened = FlagsDiff::of(JvmFlags::empty(), JvmFlags::PUBLIC);
        assert!(widened.access_expanded());
        assert!(widened.changed());
    }
}
