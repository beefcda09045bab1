//! Named variants registered on a host object

use std::fmt;
use std::rc::Rc;

use crate::access::AccessPolicy;
use crate::descriptor::{MemberDesc, MemberKind};
use crate::dyn_var::DynVar;
use crate::storage::VarStorage;
use crate::var::Var;

#[derive(Clone)]
pub struct Attribute {
    desc: MemberDesc,
    var: Rc<dyn DynVar>,
}

impl Attribute {
    pub fn new<S, A>(name: impl Into<String>, var: Var<S, A>) -> Self
    where
        S: VarStorage + 'static,
        A: AccessPolicy,
    {
        Self::from_dyn(name, var.into_dyn())
    }

    pub fn from_dyn(name: impl Into<String>, var: Rc<dyn DynVar>) -> Self {
        Self {
            desc: MemberDesc::new(MemberKind::Attribute, name),
            var,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.desc.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.desc.name
    }

    pub fn desc(&self) -> &MemberDesc {
        &self.desc
    }

    /// Shared handle to the variant
    pub fn var(&self) -> Rc<dyn DynVar> {
        self.var.clone()
    }
}

impl std::ops::Deref for Attribute {
    type Target = dyn DynVar;

    fn deref(&self) -> &Self::Target {
        &*self.var
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.desc.name)
            .field("type", &self.var.var_type())
            .field("value", &self.var.get_string())
            .finish()
    }
}
