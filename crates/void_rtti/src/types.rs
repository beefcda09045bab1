//! Type table
//!
//! Maps each supported static type to its runtime [`VarType`], canonical
//! name, default value and string form. Building a variant over any other
//! type fails at compile time on the [`VarTypeInfo`] bound.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RttiError;
use crate::object::ObjectHandle;
use crate::value::VarValue;

/// Runtime type identifier of a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    String,
    Pointer,
    Reference,
    #[serde(rename = "object")]
    ObjectPointer,
    Invalid,
}

impl VarType {
    /// Every type, in declaration order
    pub const ALL: [VarType; 17] = [
        VarType::Void,
        VarType::Bool,
        VarType::Int8,
        VarType::Int16,
        VarType::Int32,
        VarType::Int64,
        VarType::UInt8,
        VarType::UInt16,
        VarType::UInt32,
        VarType::UInt64,
        VarType::Float,
        VarType::Double,
        VarType::String,
        VarType::Pointer,
        VarType::Reference,
        VarType::ObjectPointer,
        VarType::Invalid,
    ];

    /// Canonical type name
    pub const fn name(self) -> &'static str {
        match self {
            VarType::Void => "void",
            VarType::Bool => "bool",
            VarType::Int8 => "int8",
            VarType::Int16 => "int16",
            VarType::Int32 => "int32",
            VarType::Int64 => "int64",
            VarType::UInt8 => "uint8",
            VarType::UInt16 => "uint16",
            VarType::UInt32 => "uint32",
            VarType::UInt64 => "uint64",
            VarType::Float => "float",
            VarType::Double => "double",
            VarType::String => "string",
            VarType::Pointer => "pointer",
            VarType::Reference => "reference",
            VarType::ObjectPointer => "object",
            VarType::Invalid => "invalid",
        }
    }

    /// Look a type up by canonical name. `int` is accepted for `int32`.
    pub fn from_name(name: &str) -> Result<Self, RttiError> {
        let name = name.trim();
        if name == "int" {
            return Ok(VarType::Int32);
        }
        VarType::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| RttiError::UnknownType(name.to_string()))
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            VarType::Int8
                | VarType::Int16
                | VarType::Int32
                | VarType::Int64
                | VarType::UInt8
                | VarType::UInt16
                | VarType::UInt32
                | VarType::UInt64
        )
    }

    pub const fn is_numeric(self) -> bool {
        self.is_integer() || matches!(self, VarType::Float | VarType::Double)
    }

    /// Types whose values are addresses rather than data
    pub const fn is_address(self) -> bool {
        matches!(
            self,
            VarType::Pointer | VarType::Reference | VarType::ObjectPointer
        )
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Opaque host address carried by a `pointer` variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawPointer(pub usize);

/// Opaque host address carried by a `reference` variant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RawReference(pub usize);

/// Static type to runtime type mapping
pub trait VarTypeInfo: Clone + PartialEq + 'static {
    const TYPE: VarType;

    fn type_name() -> &'static str {
        Self::TYPE.name()
    }

    fn default_value() -> Self;

    fn into_value(self) -> VarValue;

    /// Best-effort conversion out of any value kind
    fn from_value(value: &VarValue) -> Self;

    fn to_var_string(&self) -> String {
        self.clone().into_value().to_string_repr()
    }

    fn from_var_string(text: &str) -> Self {
        Self::from_value(&VarValue::parse(Self::TYPE, text))
    }
}

macro_rules! impl_numeric_type {
    ($ty:ty, $var:ident, $conv:ident) => {
        impl VarTypeInfo for $ty {
            const TYPE: VarType = VarType::$var;

            fn default_value() -> Self {
                <$ty>::default()
            }

            fn into_value(self) -> VarValue {
                VarValue::$var(self)
            }

            fn from_value(value: &VarValue) -> Self {
                value.$conv()
            }
        }
    };
}

impl_numeric_type!(i8, Int8, to_i8);
impl_numeric_type!(i16, Int16, to_i16);
impl_numeric_type!(i32, Int32, to_i32);
impl_numeric_type!(i64, Int64, to_i64);
impl_numeric_type!(u8, UInt8, to_u8);
impl_numeric_type!(u16, UInt16, to_u16);
impl_numeric_type!(u32, UInt32, to_u32);
impl_numeric_type!(u64, UInt64, to_u64);
impl_numeric_type!(f32, Float, to_f32);
impl_numeric_type!(f64, Double, to_f64);
impl_numeric_type!(bool, Bool, to_bool);

impl VarTypeInfo for String {
    const TYPE: VarType = VarType::String;

    fn default_value() -> Self {
        String::new()
    }

    fn into_value(self) -> VarValue {
        VarValue::String(self)
    }

    fn from_value(value: &VarValue) -> Self {
        value.to_string_repr()
    }

    fn to_var_string(&self) -> String {
        self.clone()
    }

    fn from_var_string(text: &str) -> Self {
        text.to_string()
    }
}

impl VarTypeInfo for RawPointer {
    const TYPE: VarType = VarType::Pointer;

    fn default_value() -> Self {
        RawPointer(0)
    }

    fn into_value(self) -> VarValue {
        VarValue::Pointer(self.0)
    }

    fn from_value(value: &VarValue) -> Self {
        RawPointer(value.to_address())
    }
}

impl VarTypeInfo for RawReference {
    const TYPE: VarType = VarType::Reference;

    fn default_value() -> Self {
        RawReference(0)
    }

    fn into_value(self) -> VarValue {
        VarValue::Reference(self.0)
    }

    fn from_value(value: &VarValue) -> Self {
        RawReference(value.to_address())
    }
}

impl VarTypeInfo for ObjectHandle {
    const TYPE: VarType = VarType::ObjectPointer;

    fn default_value() -> Self {
        ObjectHandle::null()
    }

    fn into_value(self) -> VarValue {
        VarValue::Object(self)
    }

    fn from_value(value: &VarValue) -> Self {
        value.to_object()
    }
}
