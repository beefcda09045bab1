//! Callable host members
//!
//! Everything the script bridge can call implements [`Invokable`]. The
//! typed entry point takes `VarValue`s; the text entry point takes a
//! parameter string in the format described in [`crate::params`].

use std::fmt;

use crate::descriptor::{MemberDesc, MemberKind, ParamDesc};
use crate::object::HostObject;
use crate::params::{ParamBlock, TempStrings};
use crate::signal::{conform_args, Slot};
use crate::types::VarType;
use crate::value::VarValue;

pub trait Invokable {
    fn name(&self) -> &str;

    fn params(&self) -> &[ParamDesc];

    /// `VarType::Void` when nothing is returned
    fn return_type(&self) -> VarType;

    /// Call with typed arguments. Missing arguments take type defaults.
    fn call_typed(&self, object: &HostObject, args: &[VarValue]) -> Option<VarValue>;

    /// Call with a parameter string. The result comes back in its canonical
    /// string form; an empty string stands for "no result".
    fn call_with_string(&self, object: &HostObject, wire: &str, temps: &TempStrings) -> String {
        let block = ParamBlock::parse(wire, self.params(), temps);
        match self.call_typed(object, block.values()) {
            Some(value) if !value.is_void() => value.to_string_repr(),
            _ => String::new(),
        }
    }
}

type MethodBody = Box<dyn Fn(&HostObject, &[VarValue]) -> Option<VarValue>>;

pub struct Method {
    desc: MemberDesc,
    params: Vec<ParamDesc>,
    return_type: VarType,
    body: MethodBody,
}

impl Method {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&HostObject, &[VarValue]) -> Option<VarValue> + 'static,
    ) -> Self {
        Self {
            desc: MemberDesc::new(MemberKind::Method, name),
            params: Vec::new(),
            return_type: VarType::Void,
            body: Box::new(body),
        }
    }

    pub fn param(mut self, name: impl Into<String>, var_type: VarType) -> Self {
        self.params.push(ParamDesc::new(name, var_type));
        self
    }

    pub fn param_ref(mut self, name: impl Into<String>, var_type: VarType) -> Self {
        self.params.push(ParamDesc::by_ref(name, var_type));
        self
    }

    pub fn returns(mut self, var_type: VarType) -> Self {
        self.return_type = var_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.desc.description = description.into();
        self
    }

    pub fn desc(&self) -> &MemberDesc {
        &self.desc
    }
}

impl Invokable for Method {
    fn name(&self) -> &str {
        &self.desc.name
    }

    fn params(&self) -> &[ParamDesc] {
        &self.params
    }

    fn return_type(&self) -> VarType {
        self.return_type
    }

    fn call_typed(&self, object: &HostObject, args: &[VarValue]) -> Option<VarValue> {
        let args = conform_args(&self.params, args);
        let result = (self.body)(object, &args);
        match (self.return_type, result) {
            (VarType::Void, _) => None,
            (ty, Some(value)) => Some(value.convert(ty)),
            (_, None) => None,
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.desc.name)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .finish()
    }
}

impl Invokable for Slot {
    fn name(&self) -> &str {
        Slot::name(self)
    }

    fn params(&self) -> &[ParamDesc] {
        Slot::params(self)
    }

    fn return_type(&self) -> VarType {
        VarType::Void
    }

    fn call_typed(&self, _object: &HostObject, args: &[VarValue]) -> Option<VarValue> {
        self.invoke(args);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::Class;
    use crate::params::ParamWriter;
    use std::rc::Rc;

    fn subject() -> HostObject {
        HostObject::builder("calc", Rc::new(Class::new("Calculator"))).build()
    }

    fn add() -> Method {
        Method::new("Add", |_, args| Some(VarValue::Int64(args[0].to_i64() + args[1].to_i64())))
            .param("a", VarType::Int32)
            .param("b", VarType::Int32)
            .returns(VarType::Int32)
    }

    #[test]
    fn test_call_typed_converts() {
        let obj = subject();
        let result = add().call_typed(&obj, &[VarValue::Double(2.9), VarValue::from("40")]);
        assert_eq!(result, Some(VarValue::Int32(42)));
    }

    #[test]
    fn test_call_typed_pads_missing_args() {
        let obj = subject();
        assert_eq!(add().call_typed(&obj, &[VarValue::Int32(5)]), Some(VarValue::Int32(5)));
    }

    #[test]
    fn test_call_with_string() {
        let obj = subject();
        let method = add();
        let mut w = ParamWriter::new();
        w.push_integer("a", 1);
        w.push_integer("b", 2);
        let (wire, temps) = w.finish();
        assert_eq!(method.call_with_string(&obj, &wire, &temps), "3");
    }

    #[test]
    fn test_void_and_empty_string_look_alike_on_text_path() {
        let obj = subject();
        let void = Method::new("Nothing", |_, _| None);
        let empty = Method::new("Empty", |_, _| Some(VarValue::from(""))).returns(VarType::String);
        let temps = TempStrings::new();
        assert_eq!(void.call_with_string(&obj, "", &temps), "");
        assert_eq!(empty.call_with_string(&obj, "", &temps), "");
        assert_eq!(empty.call_typed(&obj, &[]), Some(VarValue::String(String::new())));
        assert_eq!(void.call_typed(&obj, &[]), None);
    }

    #[test]
    fn test_slot_is_invokable() {
        let obj = subject();
        let hits = Rc::new(std::cell::Cell::new(0));
        let h = hits.clone();
        let slot = Slot::new("OnPing", vec![ParamDesc::new("n", VarType::Int32)], move |args| {
            h.set(h.get() + args[0].to_i32())
        });
        let temps = TempStrings::new();
        assert_eq!(slot.call_with_string(&obj, "n=4 ", &temps), "");
        assert_eq!(hits.get(), 4);
    }
}
