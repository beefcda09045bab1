//! Guest runtime
//!
//! A [`ScriptRuntime`] owns one Lua state and holds one reference on its
//! [`ScriptSystem`] for as long as it lives. Besides running source it
//! exposes host-side access to guest variables (dot paths resolve nested
//! tables) and a staged call surface:
//!
//! ```ignore
//! runtime.begin_call("Add", "int32,int32->int32", Some("Math"))?;
//! runtime.push_argument(VarValue::Int32(2))?;
//! runtime.push_argument(VarValue::Int32(3))?;
//! let count = runtime.end_call()?;
//! assert_eq!(runtime.get_return(), Some(VarValue::Int32(5)));
//! ```

use std::collections::VecDeque;
use std::rc::Rc;

use mlua::{Function, Lua, MultiValue, Table, Value};
use void_rtti::{ObjectHandle, VarType, VarValue};

use crate::error::{BridgeError, FaultKind, Result};
use crate::events::{self, RuntimeId};
use crate::marshal;
use crate::signature::Signature;
use crate::system::{BridgeState, ScriptSystem};
use crate::wrapper::ObjectWrapper;

/// Call staged by `begin_call`, completed by `end_call`
struct PendingCall {
    path: String,
    function: Function,
    signature: Signature,
    args: Vec<VarValue>,
}

/// Releases its system reference when dropped
struct SystemReference(ScriptSystem);

impl Drop for SystemReference {
    fn drop(&mut self) {
        self.0.release_reference();
    }
}

pub struct ScriptRuntime {
    // dropped in declaration order: pending call, Lua state (which
    // finalizes every wrapper), bridge, then the system reference
    call: Option<PendingCall>,
    returns: VecDeque<VarValue>,
    lua: Lua,
    id: u64,
    bridge: Rc<BridgeState>,
    reference: SystemReference,
}

fn new_state(id: u64) -> Lua {
    let lua = Lua::new();
    lua.set_app_data(RuntimeId(id));
    lua
}

impl ScriptRuntime {
    /// Create a runtime with an empty Lua state, starting `system` if this
    /// is its first reference
    pub fn new(system: &ScriptSystem) -> Result<Self> {
        system.add_reference();
        let reference = SystemReference(system.clone());
        let bridge = system.state().ok_or(BridgeError::NotRunning)?;
        let id = system.next_runtime_id();
        log::debug!("script runtime {} created", id);
        Ok(Self {
            call: None,
            returns: VecDeque::new(),
            lua: new_state(id),
            id,
            bridge,
            reference,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn system(&self) -> &ScriptSystem {
        &self.reference.0
    }

    /// The underlying Lua state
    pub fn lua(&self) -> &Lua {
        &self.lua
    }

    /// Replace the Lua state with a fresh one and run `source` in it.
    /// Wrappers and event registrations of the old state are released.
    pub fn set_source_code(&mut self, source: &str) -> Result<()> {
        events::remove_runtime(&self.bridge, self.id);
        self.call = None;
        self.returns.clear();
        self.id = self.reference.0.next_runtime_id();
        self.lua = new_state(self.id);
        self.execute(source)
    }

    /// Run `source` in the current Lua state
    pub fn execute(&mut self, source: &str) -> Result<()> {
        let chunk_name = self.bridge.config.runtime.chunk_name.as_str();
        self.lua
            .load(source)
            .set_name(chunk_name)
            .exec()
            .map_err(|err| self.fault("execute", err))
    }

    fn fault(&self, context: &str, err: mlua::Error) -> BridgeError {
        let kind = FaultKind::classify(&err);
        log::error!(
            "{} failed in runtime {} ({} fault): {}",
            context,
            self.id,
            kind,
            err
        );
        BridgeError::Lua(err)
    }

    // ---- variables ----

    fn lookup(&self, path: &str) -> mlua::Result<Value> {
        let mut current = Value::Table(self.lua.globals());
        for part in path.split('.') {
            let Value::Table(table) = current else {
                return Ok(Value::Nil);
            };
            current = table.get::<Value>(part)?;
        }
        Ok(current)
    }

    fn assign(&self, path: &str, value: Value) -> mlua::Result<()> {
        let (parent, leaf) = match path.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, path),
        };
        let mut table: Table = self.lua.globals();
        if let Some(parent) = parent {
            for part in parent.split('.') {
                table = match table.get::<Value>(part)? {
                    Value::Table(next) => next,
                    Value::Nil => {
                        let next = self.lua.create_table()?;
                        table.set(part, next.clone())?;
                        next
                    }
                    other => {
                        return Err(mlua::Error::RuntimeError(format!(
                            "'{}' in '{}' is a {}, not a table",
                            part,
                            path,
                            other.type_name()
                        )));
                    }
                };
            }
        }
        table.set(leaf, value)
    }

    /// Read a guest variable converted to `ty`; `None` when it is unset
    pub fn get_var(&self, name: &str, ty: VarType) -> Option<VarValue> {
        match self.lookup(name) {
            Ok(Value::Nil) => None,
            Ok(value) => Some(marshal::read_value(&value, ty)),
            Err(err) => {
                log::debug!("cannot read '{}': {}", name, err);
                None
            }
        }
    }

    /// Assign a host value to a guest variable, creating missing tables
    /// along a dot path
    pub fn set_var(&mut self, name: &str, value: &VarValue) -> Result<()> {
        let pushed = marshal::push_value(&self.lua, &self.bridge, value)?;
        self.assign(name, pushed)?;
        Ok(())
    }

    /// Expose a host object to the guest under `name`. `None`, a null or a
    /// stale handle all assign `nil`.
    pub fn set_object(&mut self, name: &str, object: Option<ObjectHandle>) -> Result<()> {
        let pushed = match object {
            Some(handle) => BridgeState::wrap_object(&self.bridge, &self.lua, handle)?,
            None => Value::Nil,
        };
        self.assign(name, pushed)?;
        Ok(())
    }

    /// Whether the guest variable is set and holds a value of kind `ty`
    pub fn is_var(&self, name: &str, ty: VarType) -> bool {
        let Ok(value) = self.lookup(name) else {
            return false;
        };
        match (&value, ty) {
            (Value::Nil, VarType::Void) => true,
            (Value::Nil, _) => false,
            (Value::Boolean(_), VarType::Bool) => true,
            (Value::Integer(_), ty) => ty.is_numeric() || ty.is_address(),
            (Value::Number(_), ty) => ty.is_numeric(),
            (Value::String(_), VarType::String) => true,
            (Value::UserData(userdata), VarType::ObjectPointer) => {
                userdata.borrow::<ObjectWrapper>().is_ok()
            }
            (Value::LightUserData(_), VarType::Pointer | VarType::Reference) => true,
            _ => false,
        }
    }

    // ---- staged calls ----

    /// Stage a call to the guest function `name`, looked up inside
    /// `namespace` when given. Replaces any call still pending.
    pub fn begin_call(&mut self, name: &str, signature: &str, namespace: Option<&str>) -> Result<()> {
        let signature = Signature::parse(signature)?;
        if let Some(previous) = self.call.take() {
            log::warn!("discarding unfinished call to '{}'", previous.path);
        }
        self.returns.clear();

        let path = match namespace {
            Some(namespace) if !namespace.is_empty() => format!("{}.{}", namespace, name),
            _ => name.to_string(),
        };
        let function = match self.lookup(&path) {
            Ok(Value::Function(function)) => function,
            Ok(_) => return Err(BridgeError::NoCallTarget(path)),
            Err(err) => return Err(self.fault("begin_call", err)),
        };
        self.call = Some(PendingCall {
            path,
            function,
            signature,
            args: Vec::new(),
        });
        Ok(())
    }

    /// Add the next argument, converted to its declared type
    pub fn push_argument(&mut self, value: VarValue) -> Result<()> {
        let Some(call) = self.call.as_mut() else {
            return Err(BridgeError::CallProtocol(
                "push_argument without begin_call".to_string(),
            ));
        };
        let value = match call.signature.params.get(call.args.len()) {
            Some(ty) => value.convert(*ty),
            None => {
                log::debug!(
                    "argument {} to '{}' is beyond its signature",
                    call.args.len() + 1,
                    call.path
                );
                value
            }
        };
        call.args.push(value);
        Ok(())
    }

    /// Run the staged call. Returns the number of results available through
    /// [`get_return`](Self::get_return).
    pub fn end_call(&mut self) -> Result<usize> {
        let Some(call) = self.call.take() else {
            return Err(BridgeError::CallProtocol(
                "end_call without begin_call".to_string(),
            ));
        };
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(marshal::push_value(&self.lua, &self.bridge, arg)?);
        }
        let results = match call.function.call::<MultiValue>(MultiValue::from_vec(args)) {
            Ok(results) => results,
            Err(err) => return Err(self.fault(&format!("call to '{}'", call.path), err)),
        };

        self.returns = results
            .into_iter()
            .enumerate()
            .map(|(i, value)| match call.signature.returns.get(i) {
                Some(ty) => marshal::read_value(&value, *ty),
                None => marshal::infer_value(&value),
            })
            .collect();
        log::trace!("'{}' returned {} value(s)", call.path, self.returns.len());
        Ok(self.returns.len())
    }

    /// Next result of the last completed call
    pub fn get_return(&mut self) -> Option<VarValue> {
        self.returns.pop_front()
    }

    /// Run a full garbage collection cycle, finalizing unreachable wrappers
    pub fn collect_garbage(&self) -> Result<()> {
        self.lua.gc_collect()?;
        Ok(())
    }
}

impl Drop for ScriptRuntime {
    fn drop(&mut self) {
        events::remove_runtime(&self.bridge, self.id);
        log::debug!("script runtime {} closed", self.id);
    }
}

impl std::fmt::Debug for ScriptRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRuntime")
            .field("id", &self.id)
            .field("pending_call", &self.call.as_ref().map(|c| c.path.as_str()))
            .field("returns", &self.returns.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_rtti::ObjectTable;

    fn runtime() -> ScriptRuntime {
        let system = ScriptSystem::with_defaults(Rc::new(ObjectTable::new()));
        ScriptRuntime::new(&system).unwrap()
    }

    #[test]
    fn test_runtime_holds_a_reference() {
        let system = ScriptSystem::with_defaults(Rc::new(ObjectTable::new()));
        let first = ScriptRuntime::new(&system).unwrap();
        let second = ScriptRuntime::new(&system).unwrap();
        assert_eq!(system.reference_count(), 2);
        assert_ne!(first.id(), second.id());
        drop(first);
        assert!(system.is_running());
        drop(second);
        assert!(!system.is_running());
    }

    #[test]
    fn test_dot_paths() {
        let mut rt = runtime();
        rt.set_var("Config.Window.Width", &VarValue::Int32(640)).unwrap();
        assert_eq!(rt.get_var("Config.Window.Width", VarType::Int32), Some(VarValue::Int32(640)));
        assert!(rt.is_var("Config.Window.Width", VarType::Int32));
        assert!(!rt.is_var("Config.Window.Width", VarType::String));
        assert_eq!(rt.get_var("Config.Missing.Width", VarType::Int32), None);

        rt.execute("Flat = 'x'").unwrap();
        assert!(rt.set_var("Flat.Nested", &VarValue::Bool(true)).is_err());
    }

    #[test]
    fn test_staged_call() {
        let mut rt = runtime();
        rt.execute("Math = {} function Math.Add(a, b) return a + b, 'sum' end").unwrap();
        rt.begin_call("Add", "int32,int32->double", Some("Math")).unwrap();
        rt.push_argument(VarValue::from("2")).unwrap();
        rt.push_argument(VarValue::Int32(3)).unwrap();
        assert_eq!(rt.end_call().unwrap(), 2);
        assert_eq!(rt.get_return(), Some(VarValue::Double(5.0)));
        assert_eq!(rt.get_return(), Some(VarValue::from("sum")));
        assert_eq!(rt.get_return(), None);
    }

    #[test]
    fn test_call_protocol_errors() {
        let mut rt = runtime();
        assert!(matches!(rt.push_argument(VarValue::Int32(1)), Err(BridgeError::CallProtocol(_))));
        assert!(matches!(rt.end_call(), Err(BridgeError::CallProtocol(_))));
        assert!(matches!(rt.begin_call("Nope", "", None), Err(BridgeError::NoCallTarget(_))));
        assert!(matches!(rt.begin_call("print", "vec3", None), Err(BridgeError::Signature(_))));
    }

    #[test]
    fn test_faults_are_classified() {
        let mut rt = runtime();
        let err = rt.execute("this is not lua").unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::Syntax));
        let err = rt.execute("error('boom')").unwrap_err();
        assert_eq!(err.fault_kind(), Some(FaultKind::Runtime));
    }

    #[test]
    fn test_set_source_code_starts_fresh() {
        let mut rt = runtime();
        rt.execute("Leftover = 1").unwrap();
        let before = rt.id();
        rt.set_source_code("Fresh = 2").unwrap();
        assert_ne!(rt.id(), before);
        assert_eq!(rt.get_var("Leftover", VarType::Int32), None);
        assert_eq!(rt.get_var("Fresh", VarType::Int32), Some(VarValue::Int32(2)));
    }
}
