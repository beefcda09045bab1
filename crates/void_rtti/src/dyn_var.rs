//! Type-erased variant interface
//!
//! [`DynVar`] is what the scripting bridge and descriptors see. An
//! implementation supplies `get`/`set` over [`VarValue`]; every typed
//! accessor is derived from those two and converts as documented in
//! [`crate::value`]. Setters take `&self`: storage is interior-mutable so
//! one variant can be shared between an owner and its descriptors.

use crate::object::ObjectHandle;
use crate::storage::StorageKind;
use crate::types::VarType;
use crate::value::VarValue;

pub trait DynVar {
    fn var_type(&self) -> VarType;

    fn type_name(&self) -> &'static str {
        self.var_type().name()
    }

    /// Current value, in this variant's own kind
    fn get(&self) -> VarValue;

    /// Store `value`, converting it to this variant's kind.
    ///
    /// Returns `false` when the access policy ignored the write.
    fn set(&self, value: VarValue) -> bool;

    fn default_value(&self) -> VarValue;

    fn is_read_only(&self) -> bool;

    /// Where the value ultimately lives, following delegation
    fn base_storage_kind(&self) -> StorageKind;

    fn is_default(&self) -> bool {
        self.get() == self.default_value()
    }

    fn set_default(&self) -> bool {
        self.set(self.default_value())
    }

    fn default_as_string(&self) -> String {
        self.default_value().to_string_repr()
    }

    /// Copy from another variant. Same kinds copy directly, anything else
    /// goes through the source's string form.
    fn set_from_var(&self, other: &dyn DynVar) -> bool {
        if other.var_type() == self.var_type() {
            self.set(other.get())
        } else {
            self.set_string(&other.get_string())
        }
    }

    fn get_string(&self) -> String {
        self.get().to_string_repr()
    }

    fn set_string(&self, text: &str) -> bool {
        self.set(VarValue::parse(self.var_type(), text))
    }

    fn get_bool(&self) -> bool {
        self.get().to_bool()
    }

    fn set_bool(&self, v: bool) -> bool {
        self.set(VarValue::Bool(v))
    }

    fn get_int8(&self) -> i8 {
        self.get().to_i8()
    }

    fn set_int8(&self, v: i8) -> bool {
        self.set(VarValue::Int8(v))
    }

    fn get_int16(&self) -> i16 {
        self.get().to_i16()
    }

    fn set_int16(&self, v: i16) -> bool {
        self.set(VarValue::Int16(v))
    }

    fn get_int32(&self) -> i32 {
        self.get().to_i32()
    }

    fn set_int32(&self, v: i32) -> bool {
        self.set(VarValue::Int32(v))
    }

    fn get_int(&self) -> i32 {
        self.get_int32()
    }

    fn set_int(&self, v: i32) -> bool {
        self.set_int32(v)
    }

    fn get_int64(&self) -> i64 {
        self.get().to_i64()
    }

    fn set_int64(&self, v: i64) -> bool {
        self.set(VarValue::Int64(v))
    }

    fn get_uint8(&self) -> u8 {
        self.get().to_u8()
    }

    fn set_uint8(&self, v: u8) -> bool {
        self.set(VarValue::UInt8(v))
    }

    fn get_uint16(&self) -> u16 {
        self.get().to_u16()
    }

    fn set_uint16(&self, v: u16) -> bool {
        self.set(VarValue::UInt16(v))
    }

    fn get_uint32(&self) -> u32 {
        self.get().to_u32()
    }

    fn set_uint32(&self, v: u32) -> bool {
        self.set(VarValue::UInt32(v))
    }

    fn get_uint64(&self) -> u64 {
        self.get().to_u64()
    }

    fn set_uint64(&self, v: u64) -> bool {
        self.set(VarValue::UInt64(v))
    }

    fn get_float(&self) -> f32 {
        self.get().to_f32()
    }

    fn set_float(&self, v: f32) -> bool {
        self.set(VarValue::Float(v))
    }

    fn get_double(&self) -> f64 {
        self.get().to_f64()
    }

    fn set_double(&self, v: f64) -> bool {
        self.set(VarValue::Double(v))
    }

    fn get_pointer(&self) -> usize {
        self.get().to_address()
    }

    fn set_pointer(&self, address: usize) -> bool {
        self.set(VarValue::Pointer(address))
    }

    fn get_reference(&self) -> usize {
        self.get().to_address()
    }

    fn set_reference(&self, address: usize) -> bool {
        self.set(VarValue::Reference(address))
    }

    fn get_object(&self) -> ObjectHandle {
        self.get().to_object()
    }

    fn set_object(&self, handle: ObjectHandle) -> bool {
        self.set(VarValue::Object(handle))
    }

    /// Typed read by runtime kind
    fn get_as(&self, ty: VarType) -> VarValue {
        self.get().convert(ty)
    }
}
