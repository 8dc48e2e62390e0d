//! Methods, fields and compile-time constant values.

use ripple_graph::ReferenceId;

use super::flags::JvmFlags;
use super::usages::JvmUsage;

/// A compile-time constant attached to a field or annotation method.
///
/// Floats are stored as raw bits so values hash and compare totally.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstValue {
    /// `int`, `short`, `char`, `byte` or `boolean` constant.
    Int(i32),
    /// `long` constant.
    Long(i64),
    /// `float` constant, raw bits.
    Float(u32),
    /// `double` constant, raw bits.
    Double(u64),
    /// `String` constant.
    Str(String),
}

/// Observable surface of one method for one compilation round.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct JvmMethod {
    /// Method name.
    pub name: String,
    /// Argument type descriptors, in order.
    pub arg_types: Vec<String>,
    /// Return type descriptor.
    pub return_type: String,
    /// Access and modifier bits.
    pub flags: JvmFlags,
    /// Annotation default value, or a fingerprint of an inlinable body.
    pub value: Option<ConstValue>,
    /// Declared thrown exception types.
    pub exceptions: Vec<ReferenceId>,
}

impl JvmMethod {
    /// A method with the given signature; refine with the `with_*` builders.
    pub fn new(
        name: impl Into<String>,
        arg_types: impl IntoIterator<Item = impl Into<String>>,
        return_type: impl Into<String>,
        flags: JvmFlags,
    ) -> Self {
        Self {
            name: name.into(),
            arg_types: arg_types.into_iter().map(Into::into).collect(),
            return_type: return_type.into(),
            flags,
            value: None,
            exceptions: Vec::new(),
        }
    }

    /// Attach a constant value or body fingerprint.
    #[must_use]
    pub fn with_value(mut self, value: ConstValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Attach declared thrown exceptions.
    #[must_use]
    pub fn with_exceptions(mut self, exceptions: impl IntoIterator<Item = ReferenceId>) -> Self {
        self.exceptions = exceptions.into_iter().collect();
        self
    }

    /// The JVM descriptor `(args)ret`.
    #[must_use]
    pub fn descriptor(&self) -> String {
        let mut out = String::from("(");
        for arg in &self.arg_types {
            out.push_str(arg);
        }
        out.push(')');
        out.push_str(&self.return_type);
        out
    }

    /// True for `private` methods.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.flags.contains(JvmFlags::PRIVATE)
    }

    /// True for `abstract` methods.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.flags.contains(JvmFlags::ABSTRACT)
    }

    /// Same name and argument signature (return type may differ).
    #[must_use]
    pub fn same_signature(&self, other: &JvmMethod) -> bool {
        self.name == other.name && self.arg_types == other.arg_types
    }

    /// The usage a call site of this method on `owner` records.
    #[must_use]
    pub fn create_usage(&self, owner: &ReferenceId) -> JvmUsage {
        JvmUsage::Method {
            owner: owner.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor(),
        }
    }
}

/// Observable surface of one field for one compilation round.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "cache", derive(serde::Serialize, serde::Deserialize))]
pub struct JvmField {
    /// Field name.
    pub name: String,
    /// Type descriptor.
    pub descriptor: String,
    /// Access and modifier bits.
    pub flags: JvmFlags,
    /// Compile-time constant value, if any.
    pub value: Option<ConstValue>,
}

impl JvmField {
    /// A field; refine with [`JvmField::with_value`].
    pub fn new(name: impl Into<String>, descriptor: impl Into<String>, flags: JvmFlags) -> Self {
        Self {
            name: name.into(),
            descriptor: descriptor.into(),
            flags,
            value: None,
        }
    }

    /// Attach a compile-time constant value.
    #[must_use]
    pub fn with_value(mut self, value: ConstValue) -> Self {
        self.value = Some(value);
        self
    }

    /// True for `private` fields.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.flags.contains(JvmFlags::PRIVATE)
    }

    /// A `final` field whose value consumers may have copied into their own
    /// bytecode (constant inlining).
    #[must_use]
    pub fn is_inlinable(&self) -> bool {
        self.flags.contains(JvmFlags::FINAL)
    }

    /// The usage an access of this field on `owner` records.
    #[must_use]
    pub fn create_usage(&self, owner: &ReferenceId) -> JvmUsage {
        JvmUsage::Field {
            owner: owner.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }
}
