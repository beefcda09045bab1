//! Minimal class descriptors
//!
//! A [`Class`] names a kind of host object, carries a read-only string
//! property table and the descriptors of its members.

use std::collections::BTreeMap;

use crate::descriptor::{MemberDesc, VarDesc};

#[derive(Debug, Clone, Default)]
pub struct Class {
    name: String,
    properties: BTreeMap<String, String>,
    var_descs: Vec<VarDesc>,
    members: Vec<MemberDesc>,
}

impl Class {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a read-only string property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn with_var(mut self, desc: VarDesc) -> Self {
        self.var_descs.push(desc);
        self
    }

    pub fn with_member(mut self, desc: MemberDesc) -> Self {
        self.members.push(desc);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn var_desc(&self, name: &str) -> Option<&VarDesc> {
        self.var_descs.iter().find(|d| d.name() == name)
    }

    pub fn var_descs(&self) -> &[VarDesc] {
        &self.var_descs
    }

    pub fn member(&self, name: &str) -> Option<&MemberDesc> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn members(&self) -> &[MemberDesc] {
        &self.members
    }
}
