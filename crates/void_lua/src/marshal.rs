//! Value marshalling between host variants and Lua values
//!
//! Host to guest goes through [`push_value`], one arm per [`VarValue`]
//! kind. Guest to host depends on the call:
//!
//! - targets without parameters are called typed and their result pushed
//!   directly
//! - in text mode, arguments are encoded into a parameter string (see
//!   [`void_rtti::params`]) that the target parses back; the result comes
//!   back as text and is converted to the declared return type. An empty
//!   result string means "no result", so a method returning an empty
//!   string looks like one returning nothing.
//! - in typed mode, arguments are converted straight to the declared
//!   parameter types and the typed result is pushed

use std::rc::Rc;

use mlua::{Lua, MultiValue, Value};
use void_rtti::{HostObject, Invokable, ParamDesc, ParamWriter, TempStrings, VarType, VarValue};

use crate::config::MarshalMode;
use crate::system::BridgeState;
use crate::wrapper::ObjectWrapper;

/// Convert a host value into a Lua value
pub(crate) fn push_value(
    lua: &Lua,
    bridge: &Rc<BridgeState>,
    value: &VarValue,
) -> mlua::Result<Value> {
    let pushed = match value {
        VarValue::Void | VarValue::Invalid => Value::Nil,
        VarValue::Bool(b) => Value::Boolean(*b),
        VarValue::Int8(n) => Value::Integer(*n as i64),
        VarValue::Int16(n) => Value::Integer(*n as i64),
        VarValue::Int32(n) => Value::Integer(*n as i64),
        VarValue::Int64(n) => Value::Integer(*n),
        VarValue::UInt8(n) => Value::Integer(*n as i64),
        VarValue::UInt16(n) => Value::Integer(*n as i64),
        VarValue::UInt32(n) => Value::Integer(*n as i64),
        VarValue::UInt64(n) => match i64::try_from(*n) {
            Ok(n) => Value::Integer(n),
            Err(_) => Value::Number(*n as f64),
        },
        VarValue::Float(f) => Value::Number(*f as f64),
        VarValue::Double(f) => Value::Number(*f),
        VarValue::String(s) => Value::String(lua.create_string(s)?),
        VarValue::Pointer(a) | VarValue::Reference(a) => Value::Integer(*a as i64),
        VarValue::Object(handle) => BridgeState::wrap_object(bridge, lua, *handle)?,
    };
    Ok(pushed)
}

/// Convert a Lua value into a host value of type `ty`
pub(crate) fn read_value(value: &Value, ty: VarType) -> VarValue {
    match value {
        Value::Nil => VarValue::default_for(ty),
        Value::Boolean(b) => VarValue::Bool(*b).convert(ty),
        Value::Integer(n) => VarValue::Int64(*n).convert(ty),
        Value::Number(n) => VarValue::Double(*n).convert(ty),
        Value::String(s) => VarValue::parse(ty, &s.to_string_lossy()),
        Value::UserData(_) => match object_target(value) {
            Some(handle) => VarValue::Object(handle).convert(ty),
            None => VarValue::default_for(ty),
        },
        other => {
            log::debug!("cannot convert a Lua {} to {}", other.type_name(), ty);
            VarValue::default_for(ty)
        }
    }
}

/// Convert a Lua value into the host value closest to its own kind
pub(crate) fn infer_value(value: &Value) -> VarValue {
    match value {
        Value::Nil => VarValue::Void,
        Value::Boolean(b) => VarValue::Bool(*b),
        Value::Integer(n) => VarValue::Int64(*n),
        Value::Number(n) => VarValue::Double(*n),
        Value::String(s) => VarValue::String(s.to_string_lossy().to_string()),
        Value::UserData(_) => match object_target(value) {
            Some(handle) => VarValue::Object(handle),
            None => VarValue::Void,
        },
        _ => VarValue::Void,
    }
}

/// Host object behind an object wrapper value, if it is still bound
pub(crate) fn object_target(value: &Value) -> Option<void_rtti::ObjectHandle> {
    let Value::UserData(userdata) = value else {
        return None;
    };
    let wrapper = userdata.borrow::<ObjectWrapper>().ok()?;
    wrapper.0.target()
}

/// Encode guest arguments as a parameter string: exactly one token per
/// declared parameter, missing trailing arguments as empty placeholders
pub(crate) fn encode_arguments(params: &[ParamDesc], args: &[Value]) -> (String, TempStrings) {
    let mut writer = ParamWriter::new();
    for (i, param) in params.iter().enumerate() {
        match args.get(i) {
            Some(arg) => encode_argument(&mut writer, param, arg),
            None => writer.push_missing(param),
        }
    }
    writer.finish()
}

fn encode_argument(writer: &mut ParamWriter, param: &ParamDesc, arg: &Value) {
    let name = param.name.as_str();
    if param.by_ref && param.var_type == VarType::String {
        let text = match arg {
            Value::Nil => String::new(),
            Value::Boolean(b) => String::from(if *b { "1" } else { "0" }),
            Value::Integer(n) => n.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => s.to_string_lossy().to_string(),
            other => {
                log::debug!("'{}' cannot take a Lua {} by reference", name, other.type_name());
                String::new()
            }
        };
        writer.push_string_ref(name, &text);
        return;
    }

    match arg {
        Value::Nil if param.var_type.is_address() => writer.push_object(name, None),
        Value::Nil => writer.push_missing(param),
        Value::Boolean(b) => writer.push_bool(name, *b),
        Value::Integer(n) => writer.push_integer(name, *n),
        Value::Number(n) => writer.push_number(name, *n),
        Value::String(s) => writer.push_string(name, &s.to_string_lossy()),
        Value::UserData(_) => match object_target(arg) {
            Some(handle) => writer.push_object(name, Some(handle)),
            None => writer.push_object(name, None),
        },
        other => {
            log::debug!("dropping Lua {} passed as '{}'", other.type_name(), name);
            writer.push_missing(param);
        }
    }
}

/// Call `target` on `object` with guest arguments and push its result
pub(crate) fn invoke(
    lua: &Lua,
    bridge: &Rc<BridgeState>,
    object: &HostObject,
    target: &dyn Invokable,
    args: &[Value],
) -> mlua::Result<MultiValue> {
    let params = target.params();
    if params.is_empty() {
        let result = target.call_typed(object, &[]);
        return push_result(lua, bridge, result);
    }

    match bridge.config.marshal.mode {
        MarshalMode::Text => {
            let (wire, temps) = encode_arguments(params, args);
            log::trace!("calling '{}' with '{}'", target.name(), wire);
            let text = target.call_with_string(object, &wire, &temps);
            let return_type = target.return_type();
            if return_type == VarType::Void || text.is_empty() {
                return Ok(MultiValue::new());
            }
            push_result(lua, bridge, Some(VarValue::parse(return_type, &text)))
        }
        MarshalMode::Typed => {
            let values: Vec<VarValue> = params
                .iter()
                .enumerate()
                .map(|(i, param)| match args.get(i) {
                    Some(arg) => read_value(arg, param.var_type),
                    None => VarValue::default_for(param.var_type),
                })
                .collect();
            let result = target.call_typed(object, &values);
            push_result(lua, bridge, result)
        }
    }
}

fn push_result(
    lua: &Lua,
    bridge: &Rc<BridgeState>,
    result: Option<VarValue>,
) -> mlua::Result<MultiValue> {
    match result {
        Some(value) if !value.is_void() => {
            let pushed = push_value(lua, bridge, &value)?;
            Ok(MultiValue::from_vec(vec![pushed]))
        }
        _ => Ok(MultiValue::new()),
    }
}
