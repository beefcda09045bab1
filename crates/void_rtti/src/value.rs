//! Tagged variant values
//!
//! [`VarValue`] holds exactly one value of any [`VarType`]. Every
//! cross-kind conversion lives here as an exhaustive match, so adding a
//! kind is a compile error until each conversion handles it.
//!
//! Conversion rules:
//! - integer narrowing truncates (`as` casts), float to integer saturates
//! - strings are parsed leniently; unparsable text converts to zero
//! - a string is `true` when it reads `true`/`yes`/`on` (any case) or
//!   parses as a nonzero number
//! - bool renders as `true`/`false`, object handles as their decimal bits

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::ObjectHandle;
use crate::types::VarType;

/// One runtime value of any supported kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VarValue {
    Void,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Pointer(usize),
    Reference(usize),
    Object(#[serde(with = "handle_bits")] ObjectHandle),
    Invalid,
}

impl VarValue {
    pub fn var_type(&self) -> VarType {
        match self {
            VarValue::Void => VarType::Void,
            VarValue::Bool(_) => VarType::Bool,
            VarValue::Int8(_) => VarType::Int8,
            VarValue::Int16(_) => VarType::Int16,
            VarValue::Int32(_) => VarType::Int32,
            VarValue::Int64(_) => VarType::Int64,
            VarValue::UInt8(_) => VarType::UInt8,
            VarValue::UInt16(_) => VarType::UInt16,
            VarValue::UInt32(_) => VarType::UInt32,
            VarValue::UInt64(_) => VarType::UInt64,
            VarValue::Float(_) => VarType::Float,
            VarValue::Double(_) => VarType::Double,
            VarValue::String(_) => VarType::String,
            VarValue::Pointer(_) => VarType::Pointer,
            VarValue::Reference(_) => VarType::Reference,
            VarValue::Object(_) => VarType::ObjectPointer,
            VarValue::Invalid => VarType::Invalid,
        }
    }

    /// Zero value of a type
    pub fn default_for(ty: VarType) -> VarValue {
        match ty {
            VarType::Void => VarValue::Void,
            VarType::Bool => VarValue::Bool(false),
            VarType::Int8 => VarValue::Int8(0),
            VarType::Int16 => VarValue::Int16(0),
            VarType::Int32 => VarValue::Int32(0),
            VarType::Int64 => VarValue::Int64(0),
            VarType::UInt8 => VarValue::UInt8(0),
            VarType::UInt16 => VarValue::UInt16(0),
            VarType::UInt32 => VarValue::UInt32(0),
            VarType::UInt64 => VarValue::UInt64(0),
            VarType::Float => VarValue::Float(0.0),
            VarType::Double => VarValue::Double(0.0),
            VarType::String => VarValue::String(String::new()),
            VarType::Pointer => VarValue::Pointer(0),
            VarType::Reference => VarValue::Reference(0),
            VarType::ObjectPointer => VarValue::Object(ObjectHandle::null()),
            VarType::Invalid => VarValue::Invalid,
        }
    }

    /// Parse text into a value of `ty`
    pub fn parse(ty: VarType, text: &str) -> VarValue {
        match ty {
            VarType::String => VarValue::String(text.to_string()),
            _ => VarValue::String(text.to_string()).convert(ty),
        }
    }

    /// Convert into another kind using the rules in the module docs
    pub fn convert(&self, ty: VarType) -> VarValue {
        if self.var_type() == ty {
            return self.clone();
        }
        match ty {
            VarType::Void => VarValue::Void,
            VarType::Bool => VarValue::Bool(self.to_bool()),
            VarType::Int8 => VarValue::Int8(self.to_i8()),
            VarType::Int16 => VarValue::Int16(self.to_i16()),
            VarType::Int32 => VarValue::Int32(self.to_i32()),
            VarType::Int64 => VarValue::Int64(self.to_i64()),
            VarType::UInt8 => VarValue::UInt8(self.to_u8()),
            VarType::UInt16 => VarValue::UInt16(self.to_u16()),
            VarType::UInt32 => VarValue::UInt32(self.to_u32()),
            VarType::UInt64 => VarValue::UInt64(self.to_u64()),
            VarType::Float => VarValue::Float(self.to_f32()),
            VarType::Double => VarValue::Double(self.to_f64()),
            VarType::String => VarValue::String(self.to_string_repr()),
            VarType::Pointer => VarValue::Pointer(self.to_address()),
            VarType::Reference => VarValue::Reference(self.to_address()),
            VarType::ObjectPointer => VarValue::Object(self.to_object()),
            VarType::Invalid => VarValue::Invalid,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, VarValue::Void | VarValue::Invalid)
    }

    pub fn to_bool(&self) -> bool {
        match self {
            VarValue::Void | VarValue::Invalid => false,
            VarValue::Bool(b) => *b,
            VarValue::Int8(n) => *n != 0,
            VarValue::Int16(n) => *n != 0,
            VarValue::Int32(n) => *n != 0,
            VarValue::Int64(n) => *n != 0,
            VarValue::UInt8(n) => *n != 0,
            VarValue::UInt16(n) => *n != 0,
            VarValue::UInt32(n) => *n != 0,
            VarValue::UInt64(n) => *n != 0,
            VarValue::Float(f) => *f != 0.0,
            VarValue::Double(f) => *f != 0.0,
            VarValue::String(s) => string_truthy(s),
            VarValue::Pointer(a) | VarValue::Reference(a) => *a != 0,
            VarValue::Object(h) => !h.is_null(),
        }
    }

    pub fn to_i64(&self) -> i64 {
        match self {
            VarValue::Void | VarValue::Invalid => 0,
            VarValue::Bool(b) => *b as i64,
            VarValue::Int8(n) => *n as i64,
            VarValue::Int16(n) => *n as i64,
            VarValue::Int32(n) => *n as i64,
            VarValue::Int64(n) => *n,
            VarValue::UInt8(n) => *n as i64,
            VarValue::UInt16(n) => *n as i64,
            VarValue::UInt32(n) => *n as i64,
            VarValue::UInt64(n) => *n as i64,
            VarValue::Float(f) => *f as i64,
            VarValue::Double(f) => *f as i64,
            VarValue::String(s) => parse_i64(s),
            VarValue::Pointer(a) | VarValue::Reference(a) => *a as i64,
            VarValue::Object(h) => h.to_bits() as i64,
        }
    }

    pub fn to_u64(&self) -> u64 {
        match self {
            VarValue::UInt64(n) => *n,
            VarValue::Float(f) => *f as u64,
            VarValue::Double(f) => *f as u64,
            VarValue::String(s) => parse_u64(s),
            VarValue::Pointer(a) | VarValue::Reference(a) => *a as u64,
            VarValue::Object(h) => h.to_bits(),
            other => other.to_i64() as u64,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            VarValue::Void | VarValue::Invalid => 0.0,
            VarValue::Bool(b) => *b as u8 as f64,
            VarValue::Int8(n) => *n as f64,
            VarValue::Int16(n) => *n as f64,
            VarValue::Int32(n) => *n as f64,
            VarValue::Int64(n) => *n as f64,
            VarValue::UInt8(n) => *n as f64,
            VarValue::UInt16(n) => *n as f64,
            VarValue::UInt32(n) => *n as f64,
            VarValue::UInt64(n) => *n as f64,
            VarValue::Float(f) => *f as f64,
            VarValue::Double(f) => *f,
            VarValue::String(s) => parse_f64(s),
            VarValue::Pointer(a) | VarValue::Reference(a) => *a as f64,
            VarValue::Object(h) => h.to_bits() as f64,
        }
    }

    pub fn to_i8(&self) -> i8 {
        self.to_i64() as i8
    }

    pub fn to_i16(&self) -> i16 {
        self.to_i64() as i16
    }

    pub fn to_i32(&self) -> i32 {
        self.to_i64() as i32
    }

    pub fn to_u8(&self) -> u8 {
        self.to_u64() as u8
    }

    pub fn to_u16(&self) -> u16 {
        self.to_u64() as u16
    }

    pub fn to_u32(&self) -> u32 {
        self.to_u64() as u32
    }

    pub fn to_f32(&self) -> f32 {
        self.to_f64() as f32
    }

    pub fn to_address(&self) -> usize {
        self.to_u64() as usize
    }

    pub fn to_object(&self) -> ObjectHandle {
        match self {
            VarValue::Object(h) => *h,
            VarValue::Void | VarValue::Invalid | VarValue::Bool(_) => ObjectHandle::null(),
            other => ObjectHandle::from_bits(other.to_u64()),
        }
    }

    /// Canonical string form
    pub fn to_string_repr(&self) -> String {
        match self {
            VarValue::Void | VarValue::Invalid => String::new(),
            VarValue::Bool(b) => b.to_string(),
            VarValue::Int8(n) => n.to_string(),
            VarValue::Int16(n) => n.to_string(),
            VarValue::Int32(n) => n.to_string(),
            VarValue::Int64(n) => n.to_string(),
            VarValue::UInt8(n) => n.to_string(),
            VarValue::UInt16(n) => n.to_string(),
            VarValue::UInt32(n) => n.to_string(),
            VarValue::UInt64(n) => n.to_string(),
            VarValue::Float(f) => f.to_string(),
            VarValue::Double(f) => f.to_string(),
            VarValue::String(s) => s.clone(),
            VarValue::Pointer(a) | VarValue::Reference(a) => a.to_string(),
            VarValue::Object(h) => h.to_bits().to_string(),
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_repr())
    }
}

impl From<bool> for VarValue {
    fn from(v: bool) -> Self {
        VarValue::Bool(v)
    }
}

impl From<i32> for VarValue {
    fn from(v: i32) -> Self {
        VarValue::Int32(v)
    }
}

impl From<i64> for VarValue {
    fn from(v: i64) -> Self {
        VarValue::Int64(v)
    }
}

impl From<f64> for VarValue {
    fn from(v: f64) -> Self {
        VarValue::Double(v)
    }
}

impl From<&str> for VarValue {
    fn from(v: &str) -> Self {
        VarValue::String(v.to_string())
    }
}

impl From<String> for VarValue {
    fn from(v: String) -> Self {
        VarValue::String(v)
    }
}

impl From<ObjectHandle> for VarValue {
    fn from(v: ObjectHandle) -> Self {
        VarValue::Object(v)
    }
}

fn string_truthy(s: &str) -> bool {
    let s = s.trim();
    if ["true", "yes", "on"].iter().any(|t| s.eq_ignore_ascii_case(t)) {
        return true;
    }
    s.parse::<f64>().map(|n| n != 0.0).unwrap_or(false)
}

fn parse_i64(s: &str) -> i64 {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return n;
    }
    if let Ok(n) = s.parse::<u64>() {
        return n as i64;
    }
    if let Ok(f) = s.parse::<f64>() {
        return f as i64;
    }
    string_truthy(s) as i64
}

fn parse_u64(s: &str) -> u64 {
    let s = s.trim();
    if let Ok(n) = s.parse::<u64>() {
        return n;
    }
    parse_i64(s) as u64
}

fn parse_f64(s: &str) -> f64 {
    let s = s.trim();
    match s.parse::<f64>() {
        Ok(f) => f,
        Err(_) => string_truthy(s) as u8 as f64,
    }
}

mod handle_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::object::ObjectHandle;

    pub fn serialize<S: Serializer>(handle: &ObjectHandle, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(handle.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<ObjectHandle, D::Error> {
        u64::deserialize(d).map(ObjectHandle::from_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_truthiness() {
        assert!(VarValue::from("true").to_bool());
        assert!(VarValue::from(" YES ").to_bool());
        assert!(VarValue::from("1").to_bool());
        assert!(VarValue::from("-0.5").to_bool());
        assert!(!VarValue::from("0").to_bool());
        assert!(!VarValue::from("false").to_bool());
        assert!(!VarValue::from("").to_bool());
        assert!(!VarValue::from("banana").to_bool());
    }

    #[test]
    fn test_narrowing_truncates() {
        assert_eq!(VarValue::Int64(0x1_0000_0005).to_i32(), 5);
        assert_eq!(VarValue::Int32(-1).to_u8(), 255);
        assert_eq!(VarValue::Double(3.9).to_i32(), 3);
        assert_eq!(VarValue::Double(1e20).to_i32(), i64::MAX as i32);
        assert_eq!(VarValue::Double(-7.5).to_u64(), 0);
    }

    #[test]
    fn test_string_parsing_is_lenient() {
        assert_eq!(VarValue::from("42").to_i32(), 42);
        assert_eq!(VarValue::from(" 2.75 ").to_i32(), 2);
        assert_eq!(VarValue::from("nope").to_i64(), 0);
        assert_eq!(VarValue::from("18446744073709551615").to_u64(), u64::MAX);
        assert_eq!(VarValue::from("true").to_f64(), 1.0);
    }

    #[test]
    fn test_convert_every_kind_from_string() {
        for ty in VarType::ALL {
            let v = VarValue::parse(ty, "7");
            assert_eq!(v.var_type(), ty);
        }
        assert_eq!(VarValue::parse(VarType::Double, "7"), VarValue::Double(7.0));
        assert_eq!(VarValue::parse(VarType::Bool, "7"), VarValue::Bool(true));
    }

    #[test]
    fn test_string_repr() {
        assert_eq!(VarValue::Bool(true).to_string_repr(), "true");
        assert_eq!(VarValue::Double(3.5).to_string_repr(), "3.5");
        assert_eq!(VarValue::Double(5.0).to_string_repr(), "5");
        assert_eq!(VarValue::Void.to_string_repr(), "");
        assert_eq!(VarValue::Object(ObjectHandle::null()).to_string_repr(), "0");
    }

    #[test]
    fn test_object_round_trip_through_string() {
        let h = ObjectHandle::new(3, 9);
        let text = VarValue::Object(h).to_string_repr();
        assert_eq!(VarValue::parse(VarType::ObjectPointer, &text), VarValue::Object(h));
        assert!(VarValue::Bool(true).to_object().is_null());
    }

    #[test]
    fn test_defaults() {
        for ty in VarType::ALL {
            assert_eq!(VarValue::default_for(ty).var_type(), ty);
        }
        assert!(!VarValue::default_for(VarType::String).to_bool());
    }
}
