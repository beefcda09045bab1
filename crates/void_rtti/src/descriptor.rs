//! Member descriptors
//!
//! Static, name-addressable metadata for reflected members. A
//! [`VarDesc`] can also fetch the live variant for a member from a given
//! host object; the fetched handle is meant for the call site only.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::dyn_var::DynVar;
use crate::object::HostObject;
use crate::types::VarType;

/// Kind of reflected member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Attribute,
    Method,
    Constructor,
    /// A signal
    Event,
    /// A slot
    EventHandler,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemberKind::Attribute => "attribute",
            MemberKind::Method => "method",
            MemberKind::Constructor => "constructor",
            MemberKind::Event => "event",
            MemberKind::EventHandler => "event handler",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDesc {
    pub kind: MemberKind,
    pub name: String,
    pub description: String,
    pub annotation: String,
}

impl MemberDesc {
    pub fn new(kind: MemberKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: String::new(),
            annotation: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = annotation.into();
        self
    }
}

/// One declared parameter of a method, slot or signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDesc {
    pub name: String,
    pub var_type: VarType,
    /// Passed by reference or pointer. For strings this routes the value
    /// through a call-scoped temporary.
    pub by_ref: bool,
}

impl ParamDesc {
    pub fn new(name: impl Into<String>, var_type: VarType) -> Self {
        Self {
            name: name.into(),
            var_type,
            by_ref: false,
        }
    }

    pub fn by_ref(name: impl Into<String>, var_type: VarType) -> Self {
        Self {
            name: name.into(),
            var_type,
            by_ref: true,
        }
    }

    /// Positional parameters named `Param0`, `Param1`, ...
    pub fn positional(types: &[VarType]) -> Vec<ParamDesc> {
        types
            .iter()
            .enumerate()
            .map(|(i, ty)| ParamDesc::new(format!("Param{i}"), *ty))
            .collect()
    }
}

type FetchFn = Rc<dyn Fn(&HostObject) -> Option<Rc<dyn DynVar>>>;

/// Descriptor of a variable member
#[derive(Clone)]
pub struct VarDesc {
    pub member: MemberDesc,
    pub var_type: VarType,
    pub type_name: &'static str,
    fetch: FetchFn,
}

impl VarDesc {
    /// Descriptor that fetches the object's attribute of the same name
    pub fn new(name: impl Into<String>, var_type: VarType) -> Self {
        let member = MemberDesc::new(MemberKind::Attribute, name);
        let lookup = member.name.clone();
        Self {
            member,
            var_type,
            type_name: var_type.name(),
            fetch: Rc::new(move |obj| obj.attribute(&lookup).map(|a| a.var())),
        }
    }

    /// Descriptor with a custom fetch, e.g. one that builds an accessor
    /// variant over the object's state on demand
    pub fn with_fetch(
        name: impl Into<String>,
        var_type: VarType,
        fetch: impl Fn(&HostObject) -> Option<Rc<dyn DynVar>> + 'static,
    ) -> Self {
        Self {
            member: MemberDesc::new(MemberKind::Attribute, name),
            var_type,
            type_name: var_type.name(),
            fetch: Rc::new(fetch),
        }
    }

    pub fn name(&self) -> &str {
        &self.member.name
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.member.description = description.into();
        self
    }

    /// Variant for this member on `object`. Do not cache the result across
    /// mutations of the object.
    pub fn fetch(&self, object: &HostObject) -> Option<Rc<dyn DynVar>> {
        let var = (self.fetch)(object)?;
        if var.var_type() != self.var_type {
            log::warn!(
                "descriptor '{}' declares {} but fetched a {} variant",
                self.member.name,
                self.var_type,
                var.var_type()
            );
        }
        Some(var)
    }
}

impl fmt::Debug for VarDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarDesc")
            .field("member", &self.member)
            .field("var_type", &self.var_type)
            .finish()
    }
}
