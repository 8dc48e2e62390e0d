//! Typed node and usage model for JVM compilation units.
//!
//! A [`JvmClass`] snapshots everything the differentiation rules can observe
//! about one compiled unit: hierarchy, members, attached Kotlin metadata and
//! recorded outgoing usages. The [`diff`] submodule supplies the structural
//! delta types the strategy chain consumes.

pub mod class;
pub mod diff;
pub mod flags;
pub mod kotlin;
pub mod member;
pub mod usages;

pub use class::{package_of, short_name_of, JvmClass};
pub use diff::{ClassDiff, FieldDiff, KmClassDiff, KmFacadeDiff, KotlinMetaDiff, MethodDiff};
pub use flags::{AccessLevel, FlagsDiff, JvmFlags};
pub use kotlin::{
    KmClass, KmClassKind, KmConstructor, KmFileFacade, KmFunction, KmProperty, KmTypeAlias,
    KmValueParameter, KmVisibility, KotlinMeta,
};
pub use member::{ConstValue, JvmField, JvmMethod};
pub use usages::JvmUsage;
