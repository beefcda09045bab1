//! Call signatures for staged guest calls
//!
//! Text form: parameter types, `->`, return types, each side a comma list
//! of type names. Either side may be empty: `"int32,string->bool"`,
//! `"->double"`, `"string"`.

use void_rtti::VarType;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Signature {
    pub params: Vec<VarType>,
    pub returns: Vec<VarType>,
}

impl Signature {
    pub fn parse(text: &str) -> Result<Self> {
        let (params, returns) = match text.split_once("->") {
            Some((params, returns)) => (params, returns),
            None => (text, ""),
        };
        if returns.contains("->") {
            return Err(BridgeError::Signature(text.to_string()));
        }
        Ok(Self {
            params: parse_list(text, params)?,
            returns: parse_list(text, returns)?,
        })
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

fn parse_list(signature: &str, list: &str) -> Result<Vec<VarType>> {
    let mut types = Vec::new();
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        match VarType::from_name(name) {
            // a lone `void` spells out an empty side
            Ok(VarType::Void) => continue,
            Ok(VarType::Invalid) | Err(_) => {
                return Err(BridgeError::Signature(signature.to_string()));
            }
            Ok(ty) => types.push(ty),
        }
    }
    Ok(types)
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let join = |types: &[VarType]| {
            types.iter().map(|t| t.name()).collect::<Vec<_>>().join(",")
        };
        write!(f, "{}->{}", join(&self.params), join(&self.returns))
    }
}
