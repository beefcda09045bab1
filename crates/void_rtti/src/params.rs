//! Text parameter wire format
//!
//! Arguments cross the text calling path as a flat string of
//! `Name=Value ` tokens in declared order:
//!
//! ```text
//! Param0=1 Param1="text" Param2=3.5 Param3=
//! ```
//!
//! Quoting rules for string values:
//! - `"..."` is the default. Inside it `\\` and `\"` are escapes and the
//!   encoder always doubles backslashes.
//! - `'...'` is literal and is used when the text contains `"` but no `'`.
//! - text with both quote characters goes in `"..."` with `\"` escapes.
//!
//! Booleans travel as `1`/`0`, object handles as their decimal handle bits
//! (`0` for none). By-reference string parameters carry the decimal address
//! of a call-scoped temporary owned by [`TempStrings`]; the address is only
//! ever compared against the live temporaries, never dereferenced.

use crate::descriptor::ParamDesc;
use crate::object::ObjectHandle;
use crate::types::VarType;
use crate::value::VarValue;

/// Call-scoped owner of by-reference string arguments
#[derive(Debug, Default)]
pub struct TempStrings {
    strings: Vec<Box<String>>,
}

impl TempStrings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `text` alive for the call and return its address token
    pub fn store(&mut self, text: impl Into<String>) -> usize {
        let boxed = Box::new(text.into());
        let address = &*boxed as *const String as usize;
        self.strings.push(boxed);
        address
    }

    /// Text stored under `address`, if it belongs to this call
    pub fn resolve(&self, address: usize) -> Option<&str> {
        self.strings
            .iter()
            .find(|s| &***s as *const String as usize == address)
            .map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Builds a parameter string token by token
#[derive(Debug, Default)]
pub struct ParamWriter {
    buf: String,
    count: usize,
    temps: TempStrings,
}

impl ParamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `name=value ` with `value` already encoded
    pub fn push_raw(&mut self, name: &str, value: &str) {
        self.buf.push_str(name);
        self.buf.push('=');
        self.buf.push_str(value);
        self.buf.push(' ');
        self.count += 1;
    }

    pub fn push_bool(&mut self, name: &str, value: bool) {
        self.push_raw(name, if value { "1" } else { "0" });
    }

    pub fn push_integer(&mut self, name: &str, value: i64) {
        self.push_raw(name, &value.to_string());
    }

    pub fn push_unsigned(&mut self, name: &str, value: u64) {
        self.push_raw(name, &value.to_string());
    }

    pub fn push_number(&mut self, name: &str, value: f64) {
        self.push_raw(name, &value.to_string());
    }

    pub fn push_object(&mut self, name: &str, handle: Option<ObjectHandle>) {
        let bits = handle.map(|h| h.to_bits()).unwrap_or(0);
        self.push_raw(name, &bits.to_string());
    }

    pub fn push_string(&mut self, name: &str, text: &str) {
        self.push_raw(name, &quote(text));
    }

    /// Route `text` through a temporary and send its address
    pub fn push_string_ref(&mut self, name: &str, text: &str) {
        let address = self.temps.store(text);
        self.push_raw(name, &address.to_string());
    }

    /// Placeholder for a parameter the caller did not supply
    pub fn push_missing(&mut self, param: &ParamDesc) {
        if param.by_ref && param.var_type == VarType::String {
            self.push_string_ref(&param.name, "");
        } else {
            self.push_raw(&param.name, "");
        }
    }

    /// Encode a host value for `param`
    pub fn push_value(&mut self, param: &ParamDesc, value: &VarValue) {
        let name = param.name.as_str();
        match param.var_type {
            VarType::Bool => self.push_bool(name, value.to_bool()),
            VarType::Int8 | VarType::Int16 | VarType::Int32 | VarType::Int64 => {
                self.push_integer(name, value.to_i64())
            }
            VarType::UInt8
            | VarType::UInt16
            | VarType::UInt32
            | VarType::UInt64
            | VarType::Pointer
            | VarType::Reference => self.push_unsigned(name, value.to_u64()),
            VarType::Float | VarType::Double => self.push_number(name, value.to_f64()),
            VarType::String if param.by_ref => {
                self.push_string_ref(name, &value.to_string_repr())
            }
            VarType::String => self.push_string(name, &value.to_string_repr()),
            VarType::ObjectPointer => {
                let handle = value.to_object();
                self.push_object(name, (!handle.is_null()).then_some(handle))
            }
            VarType::Void | VarType::Invalid => self.push_raw(name, ""),
        }
    }

    pub fn token_count(&self) -> usize {
        self.count
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// The finished string and the temporaries it refers to
    pub fn finish(self) -> (String, TempStrings) {
        (self.buf, self.temps)
    }
}

/// Quote a string value for the wire
pub fn quote(text: &str) -> String {
    let has_double = text.contains('"');
    let has_single = text.contains('\'');
    if has_double && !has_single {
        return format!("'{text}'");
    }
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// One `name=value` pair as read off the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamToken {
    pub name: String,
    pub value: String,
    pub quoted: bool,
}

/// Split a parameter string into tokens. Malformed input never fails: an
/// unterminated quote runs to the end and a name without `=` gets an empty
/// value.
pub fn parse_tokens(input: &str) -> Vec<ParamToken> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut name = String::new();
        let mut has_value = false;
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                break;
            }
            chars.next();
            if c == '=' {
                has_value = true;
                break;
            }
            name.push(c);
        }

        let mut value = String::new();
        let mut quoted = false;
        if has_value {
            match chars.peek().copied() {
                Some('"') => {
                    chars.next();
                    quoted = true;
                    while let Some(c) = chars.next() {
                        match c {
                            '"' => break,
                            '\\' => match chars.peek().copied() {
                                Some(next @ ('"' | '\\')) => {
                                    chars.next();
                                    value.push(next);
                                }
                                _ => value.push('\\'),
                            },
                            c => value.push(c),
                        }
                    }
                }
                Some('\'') => {
                    chars.next();
                    quoted = true;
                    for c in chars.by_ref() {
                        if c == '\'' {
                            break;
                        }
                        value.push(c);
                    }
                }
                _ => {
                    while let Some(&c) = chars.peek() {
                        if c.is_whitespace() {
                            break;
                        }
                        value.push(c);
                        chars.next();
                    }
                }
            }
        }

        tokens.push(ParamToken { name, value, quoted });
    }

    tokens
}

/// Decoded arguments, one per declared parameter
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamBlock {
    values: Vec<VarValue>,
}

impl ParamBlock {
    /// Decode `input` against `params`. Tokens are matched by name, falling
    /// back to position; absent or empty values become type defaults.
    pub fn parse(input: &str, params: &[ParamDesc], temps: &TempStrings) -> Self {
        let tokens = parse_tokens(input);
        let values = params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let token = tokens
                    .iter()
                    .find(|t| t.name == param.name)
                    .or_else(|| tokens.get(i));
                match token {
                    Some(token) => decode_value(param, token, temps),
                    None => VarValue::default_for(param.var_type),
                }
            })
            .collect();
        Self { values }
    }

    pub fn values(&self) -> &[VarValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<VarValue> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<&VarValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

fn decode_value(param: &ParamDesc, token: &ParamToken, temps: &TempStrings) -> VarValue {
    if token.value.is_empty() && !token.quoted {
        return VarValue::default_for(param.var_type);
    }
    match param.var_type {
        VarType::String if param.by_ref => {
            let address = token.value.trim().parse::<usize>().unwrap_or(0);
            match temps.resolve(address) {
                Some(text) => VarValue::String(text.to_string()),
                None => {
                    log::warn!(
                        "parameter '{}' refers to unknown temporary {}",
                        param.name,
                        token.value
                    );
                    VarValue::String(String::new())
                }
            }
        }
        ty => VarValue::parse(ty, &token.value),
    }
}
