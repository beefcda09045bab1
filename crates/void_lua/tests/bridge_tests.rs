//! Integration tests for the void_lua script bridge

use std::cell::{Cell, RefCell};
use std::io::Write;
use std::rc::Rc;

use void_lua::*;
use void_rtti::{
    Class, HostObject, Method, ObjectHandle, ObjectTable, ParamDesc, Signal, Slot, Var, VarDesc,
    VarType, VarValue,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn player_class() -> Rc<Class> {
    Rc::new(
        Class::new("Player")
            .with_property("Category", "Actors")
            .with_var(VarDesc::new("Count", VarType::Int32)),
    )
}

/// Host object with one of every member kind. `hits` records what the
/// `Record` method and `OnHit` slot receive.
fn player(name: &str, hits: &Rc<RefCell<Vec<VarValue>>>) -> HostObject {
    let record = hits.clone();
    let slot_hits = hits.clone();
    HostObject::builder(name, player_class())
        .var("Count", Var::direct(0i32))
        .var("Label", Var::direct(String::new()))
        .var("Target", Var::direct(ObjectHandle::null()))
        .method(
            Method::new("Add", |_, args| {
                Some(VarValue::Int32(args[0].to_i32() + args[1].to_i32()))
            })
            .param("A", VarType::Int32)
            .param("B", VarType::Int32)
            .returns(VarType::Int32),
        )
        .method(
            Method::new("Greet", |_, args| {
                Some(VarValue::String(format!("hello {}", args[0].to_string_repr())))
            })
            .param("Name", VarType::String)
            .returns(VarType::String),
        )
        .method(
            Method::new("Length", |_, args| {
                Some(VarValue::Int32(args[0].to_string_repr().len() as i32))
            })
            .param_ref("Text", VarType::String)
            .returns(VarType::Int32),
        )
        .method(
            Method::new("Empty", |_, _| Some(VarValue::from("")))
                .param("Unused", VarType::Int32)
                .returns(VarType::String),
        )
        .method(
            Method::new("Record", move |_, args| {
                record.borrow_mut().extend_from_slice(args);
                None
            })
            .param("Amount", VarType::Int32)
            .param("Note", VarType::String),
        )
        .method(
            Method::new("Echo", |_, args| Some(args[0].clone()))
                .param("Other", VarType::ObjectPointer)
                .returns(VarType::ObjectPointer),
        )
        .method(Method::new("Name", |obj, _| Some(VarValue::from(obj.name()))).returns(VarType::String))
        .signal(Signal::new("Changed", vec![ParamDesc::new("Amount", VarType::Int32)]))
        .signal(Signal::new("Spawned", vec![ParamDesc::new("Who", VarType::ObjectPointer)]))
        .slot(Slot::new(
            "OnHit",
            vec![ParamDesc::new("Amount", VarType::Int32)],
            move |args| slot_hits.borrow_mut().extend_from_slice(args),
        ))
        .build()
}

struct Fixture {
    objects: Rc<ObjectTable>,
    handle: ObjectHandle,
    hits: Rc<RefCell<Vec<VarValue>>>,
    system: ScriptSystem,
    runtime: ScriptRuntime,
}

fn fixture_with(config: BridgeConfig) -> Fixture {
    init_logging();
    let objects = Rc::new(ObjectTable::new());
    let hits = Rc::new(RefCell::new(Vec::new()));
    let handle = objects.insert(player("player", &hits));
    let system = ScriptSystem::new(objects.clone(), config);
    let mut runtime = ScriptRuntime::new(&system).unwrap();
    runtime.set_object("obj", Some(handle)).unwrap();
    Fixture {
        objects,
        handle,
        hits,
        system,
        runtime,
    }
}

fn fixture() -> Fixture {
    fixture_with(BridgeConfig::default())
}

fn typed_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.marshal.mode = MarshalMode::Typed;
    config
}

fn emit_changed(f: &Fixture, amount: i32) -> usize {
    let object = f.objects.get(f.handle).unwrap();
    object.signal("Changed").unwrap().emit(&[VarValue::Int32(amount)])
}

fn int(rt: &ScriptRuntime, name: &str) -> Option<i32> {
    rt.get_var(name, VarType::Int32).map(|v| v.to_i32())
}

#[test]
fn test_assign_number_then_read_as_int() {
    let mut f = fixture();
    f.runtime.execute("obj.Count = 5.0; result = obj.Count").unwrap();
    assert_eq!(f.runtime.get_var("result", VarType::Int32), Some(VarValue::Int32(5)));
    let count = f.objects.get(f.handle).unwrap().var("Count").unwrap();
    assert_eq!(count.get_int(), 5);
}

#[test]
fn test_assign_integer_keeps_precision() {
    let mut f = fixture();
    f.runtime
        .execute("obj.Label = 9007199254740993; exact = obj.Label; obj.Label = 2.5; float = obj.Label")
        .unwrap();
    assert_eq!(
        f.runtime.get_var("exact", VarType::String),
        Some(VarValue::from("9007199254740993"))
    );
    assert_eq!(f.runtime.get_var("float", VarType::String), Some(VarValue::from("2.5")));
}

#[test]
fn test_member_resolution() {
    let mut f = fixture();
    f.runtime
        .execute(
            r#"
            category = obj.Category
            obj.Label = "tagged"
            label = obj.Label
            is_method = tostring(obj.Add):find("method") ~= nil
            "#,
        )
        .unwrap();
    assert_eq!(f.runtime.get_var("category", VarType::String), Some(VarValue::from("Actors")));
    assert_eq!(f.runtime.get_var("label", VarType::String), Some(VarValue::from("tagged")));
    assert_eq!(f.runtime.get_var("is_method", VarType::Bool), Some(VarValue::Bool(true)));
}

#[test]
fn test_unknown_member_is_a_guest_error() {
    let mut f = fixture();
    assert!(f.runtime.execute("local x = obj.Missing").is_err());
    assert!(f.runtime.execute("obj.Missing = 1").is_err());
    // but a guarded lookup can recover
    f.runtime
        .execute("ok = pcall(function() return obj.Missing end)")
        .unwrap();
    assert_eq!(f.runtime.get_var("ok", VarType::Bool), Some(VarValue::Bool(false)));
    assert_eq!(f.objects.ref_count(f.handle), Some(2));
}

#[test]
fn test_unsupported_assignments_are_dropped() {
    let mut f = fixture();
    f.runtime
        .execute("obj.Count = 7; obj.Count = {}; obj.Count = print; obj.Count = nil")
        .unwrap();
    let count = f.objects.get(f.handle).unwrap().var("Count").unwrap();
    assert_eq!(count.get_int(), 7);
}

#[test]
fn test_object_assignment_and_nil() {
    let mut f = fixture();
    let other = f.objects.insert(player("other", &f.hits));
    f.runtime.set_object("other", Some(other)).unwrap();
    f.runtime.execute("obj.Target = other").unwrap();
    let target = f.objects.get(f.handle).unwrap().var("Target").unwrap();
    assert_eq!(target.get_object(), other);

    f.runtime.execute("same = obj.Target == other").unwrap();
    assert_eq!(f.runtime.get_var("same", VarType::Bool), Some(VarValue::Bool(true)));

    f.runtime.execute("obj.Target = nil").unwrap();
    assert!(target.get_object().is_null());
}

fn check_method_calls(mut f: Fixture) {
    f.runtime
        .execute(
            r#"
            sum = obj:Add(2, 3)
            dotted = obj.Add(4, 5)
            greeting = obj:Greet('bob "the builder"')
            length = obj:Length("abcd")
            name = obj:Name()
            "#,
        )
        .unwrap();
    assert_eq!(int(&f.runtime, "sum"), Some(5));
    assert_eq!(int(&f.runtime, "dotted"), Some(9));
    assert_eq!(
        f.runtime.get_var("greeting", VarType::String),
        Some(VarValue::from("hello bob \"the builder\""))
    );
    assert_eq!(int(&f.runtime, "length"), Some(4));
    assert_eq!(f.runtime.get_var("name", VarType::String), Some(VarValue::from("player")));
}

#[test]
fn test_method_calls_text_mode() {
    check_method_calls(fixture());
}

#[test]
fn test_method_calls_typed_mode() {
    check_method_calls(fixture_with(typed_config()));
}

#[test]
fn test_missing_arguments_get_defaults() {
    let mut f = fixture();
    f.runtime.execute("obj:Record(7)").unwrap();
    assert_eq!(
        *f.hits.borrow(),
        vec![VarValue::Int32(7), VarValue::from("")]
    );
}

#[test]
fn test_empty_string_result() {
    let mut f = fixture();
    f.runtime.execute("n = select('#', obj:Empty(1))").unwrap();
    assert_eq!(int(&f.runtime, "n"), Some(0));

    let mut f = fixture_with(typed_config());
    f.runtime.execute("n = select('#', obj:Empty(1)); s = obj:Empty(1)").unwrap();
    assert_eq!(int(&f.runtime, "n"), Some(1));
    assert_eq!(f.runtime.get_var("s", VarType::String), Some(VarValue::from("")));
}

#[test]
fn test_object_arguments_and_results() {
    let mut f = fixture();
    let other = f.objects.insert(player("other", &f.hits));
    f.runtime.set_object("other", Some(other)).unwrap();
    f.runtime
        .execute("echoed = obj:Echo(other); name = echoed:Name(); none = obj:Echo(nil)")
        .unwrap();
    assert_eq!(
        f.runtime.get_var("echoed", VarType::ObjectPointer),
        Some(VarValue::Object(other))
    );
    assert_eq!(f.runtime.get_var("name", VarType::String), Some(VarValue::from("other")));
    assert_eq!(f.runtime.get_var("none", VarType::ObjectPointer), None);
}

#[test]
fn test_destroyed_object_gives_safe_defaults() {
    let mut f = fixture();
    f.runtime
        .execute("m = obj.Add; s = obj.Changed; h = obj.OnHit")
        .unwrap();
    assert!(f.objects.destroy(f.handle));
    assert!(!f.objects.contains(f.handle));

    f.runtime
        .execute(
            r#"
            count = obj.Count
            missing = obj.Missing
            obj.Count = 3
            result = m(1, 2)
            connected = s:connect(function() end)
            emitted = s:emit(1)
            h(4)
            text = tostring(obj)
            "#,
        )
        .unwrap();
    assert_eq!(f.runtime.get_var("count", VarType::Int32), None);
    assert_eq!(f.runtime.get_var("missing", VarType::Int32), None);
    assert_eq!(f.runtime.get_var("result", VarType::Int32), None);
    assert_eq!(f.runtime.get_var("connected", VarType::Bool), Some(VarValue::Bool(false)));
    assert_eq!(int(&f.runtime, "emitted"), Some(0));
    assert!(f.hits.borrow().is_empty());
    let text = f.runtime.get_var("text", VarType::String).unwrap();
    assert!(text.to_string_repr().contains("invalid"));
    assert_eq!(f.system.bound_wrappers(), 0);
}

#[test]
fn test_finalized_wrappers_return_to_the_pool() {
    let mut config = BridgeConfig::default();
    config.pool.initial_capacity = 1;
    let mut f = fixture_with(config);
    assert_eq!(f.objects.ref_count(f.handle), Some(2));

    f.runtime.execute("obj = nil").unwrap();
    f.runtime.collect_garbage().unwrap();
    f.runtime.collect_garbage().unwrap();
    assert_eq!(f.objects.ref_count(f.handle), Some(1));
    let stats = f.system.pool_stats(WrapperKind::Object).unwrap();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.free, 1);

    // the recycled record carries nothing of its previous binding
    let other = f.objects.insert(player("other", &f.hits));
    f.runtime.set_object("b", Some(other)).unwrap();
    f.runtime.execute("name = b:Name()").unwrap();
    assert_eq!(f.runtime.get_var("name", VarType::String), Some(VarValue::from("other")));
    let stats = f.system.pool_stats(WrapperKind::Object).unwrap();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.reused, 2);
    f.runtime.collect_garbage().unwrap();
    assert_eq!(f.objects.ref_count(f.handle), Some(1));
    assert_eq!(f.objects.ref_count(other), Some(2));
}

#[test]
fn test_wrapper_equality() {
    let mut f = fixture();
    f.runtime.set_object("again", Some(f.handle)).unwrap();
    f.runtime
        .execute(
            r#"
            same_object = obj == again
            same_method = obj.Add == again.Add
            different_method = obj.Add == obj.Greet
            "#,
        )
        .unwrap();
    assert_eq!(f.runtime.get_var("same_object", VarType::Bool), Some(VarValue::Bool(true)));
    assert_eq!(f.runtime.get_var("same_method", VarType::Bool), Some(VarValue::Bool(true)));
    assert_eq!(
        f.runtime.get_var("different_method", VarType::Bool),
        Some(VarValue::Bool(false))
    );
}

#[test]
fn test_reconnect_does_not_duplicate_handlers() {
    let mut f = fixture();
    f.runtime
        .execute(
            r#"
            total = 0
            function on_changed(amount) total = total + amount end
            first = obj.Changed:connect(on_changed)
            second = obj.Changed:connect(on_changed)
            "#,
        )
        .unwrap();
    assert_eq!(f.runtime.get_var("first", VarType::Bool), Some(VarValue::Bool(true)));
    assert_eq!(f.runtime.get_var("second", VarType::Bool), Some(VarValue::Bool(false)));
    assert_eq!(emit_changed(&f, 2), 1);
    assert_eq!(int(&f.runtime, "total"), Some(2));
    assert_eq!(f.system.event_registrations(), 1);

    f.runtime.execute("obj.Changed:disconnect(on_changed)").unwrap();
    assert_eq!(emit_changed(&f, 2), 0);
    assert_eq!(int(&f.runtime, "total"), Some(2));
    assert_eq!(f.system.event_registrations(), 1);

    f.runtime.execute("obj.Changed:connect(on_changed)").unwrap();
    emit_changed(&f, 3);
    assert_eq!(int(&f.runtime, "total"), Some(5));
    assert_eq!(f.system.event_registrations(), 1);
}

#[test]
fn test_emit_without_handlers() {
    let mut f = fixture();
    assert_eq!(emit_changed(&f, 1), 0);
    f.runtime.execute("n = obj.Changed:emit(1)").unwrap();
    assert_eq!(int(&f.runtime, "n"), Some(0));
}

#[test]
fn test_handler_receives_object_argument() {
    let mut f = fixture();
    let other = f.objects.insert(player("other", &f.hits));
    f.runtime
        .execute(
            r#"
            spawned_name = ""
            obj.Spawned:connect(function(who) spawned_name = who:Name() end)
            "#,
        )
        .unwrap();
    let object = f.objects.get(f.handle).unwrap();
    let fired = object.signal("Spawned").unwrap().emit(&[VarValue::Object(other)]);
    assert_eq!(fired, 1);
    assert_eq!(
        f.runtime.get_var("spawned_name", VarType::String),
        Some(VarValue::from("other"))
    );
}

#[test]
fn test_failing_handler_does_not_reach_the_emitter() {
    let mut f = fixture();
    f.runtime
        .execute(
            r#"
            calls = 0
            obj.Changed:connect(function() error("handler failed") end)
            obj.Changed:connect(function() calls = calls + 1 end)
            "#,
        )
        .unwrap();
    assert_eq!(emit_changed(&f, 1), 2);
    assert_eq!(int(&f.runtime, "calls"), Some(1));
}

#[test]
fn test_slots_from_the_guest() {
    let mut f = fixture();
    f.runtime
        .execute(
            r#"
            obj.OnHit(4)
            obj.Changed:connect(obj.OnHit)
            obj.Changed:emit("9")
            "#,
        )
        .unwrap();
    assert_eq!(*f.hits.borrow(), vec![VarValue::Int32(4), VarValue::Int32(9)]);
    let object = f.objects.get(f.handle).unwrap();
    assert_eq!(object.signal("Changed").unwrap().connection_count(), 1);
}

#[test]
fn test_runtime_teardown_disconnects_its_handlers() {
    let f = fixture();
    let mut second = ScriptRuntime::new(&f.system).unwrap();
    second.set_object("obj", Some(f.handle)).unwrap();
    second
        .execute("obj.Changed:connect(function() end)")
        .unwrap();
    second.collect_garbage().unwrap();
    assert_eq!(f.system.event_registrations(), 1);
    assert_eq!(f.objects.ref_count(f.handle), Some(3));

    drop(second);
    assert_eq!(f.system.event_registrations(), 0);
    assert_eq!(emit_changed(&f, 1), 0);
    assert_eq!(f.objects.ref_count(f.handle), Some(2));
    assert!(f.system.is_running());
}

#[test]
fn test_last_runtime_shuts_the_system_down() {
    let f = fixture();
    let Fixture {
        objects,
        handle,
        system,
        runtime,
        ..
    } = f;
    assert_eq!(system.reference_count(), 1);
    drop(runtime);
    assert!(!system.is_running());
    assert_eq!(objects.ref_count(handle), Some(1));
    assert_eq!(system.pool_stats(WrapperKind::Object), None);
}

#[test]
fn test_accessor_attributes() {
    init_logging();
    let objects = Rc::new(ObjectTable::new());
    let health = Rc::new(Cell::new(100i32));
    let calls = Rc::new(Cell::new(0u32));
    let (read, write, counted) = (health.clone(), health.clone(), calls.clone());
    let handle = objects.insert(
        HostObject::builder("npc", player_class())
            .var(
                "Health",
                Var::get_set(
                    0i32,
                    move || {
                        counted.set(counted.get() + 1);
                        read.get()
                    },
                    move |v| write.set(v),
                ),
            )
            .build(),
    );
    assert_eq!(calls.get(), 0);

    let system = ScriptSystem::with_defaults(objects);
    let mut runtime = ScriptRuntime::new(&system).unwrap();
    runtime.set_object("npc", Some(handle)).unwrap();
    runtime.execute("npc.Health = npc.Health - 25").unwrap();
    assert_eq!(health.get(), 75);
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[pool]
initial_capacity = 2

[marshal]
mode = "typed"

[runtime]
chunk_name = "level_script"
"#
    )
    .unwrap();

    let config = BridgeConfig::load(file.path()).unwrap();
    assert_eq!(config.marshal.mode, MarshalMode::Typed);
    assert_eq!(config.runtime.chunk_name, "level_script");

    let f = fixture_with(config);
    let stats = f.system.pool_stats(WrapperKind::Method).unwrap();
    assert_eq!(stats.free, 2);

    let missing = BridgeConfig::load(file.path().with_extension("absent"));
    assert!(matches!(missing, Err(ConfigError::Io(_))));
}

#[test]
fn test_host_fault_classification() {
    let mut f = fixture();
    let err = f.runtime.execute("obj:Add(").unwrap_err();
    assert_eq!(err.fault_kind(), Some(FaultKind::Syntax));
    let err = f.runtime.execute("local x = obj.Missing").unwrap_err();
    assert_eq!(err.fault_kind(), Some(FaultKind::Handler));
    assert_eq!(BridgeError::NotRunning.fault_kind(), None);
}

#[test]
fn test_staged_call_with_objects() {
    let mut f = fixture();
    f.runtime
        .execute("Game = { Rules = {} } function Game.Rules.Score(p, bonus) return p.Count + bonus end")
        .unwrap();
    f.runtime.execute("obj.Count = 10").unwrap();
    f.runtime.begin_call("Score", "object,int32->int64", Some("Game.Rules")).unwrap();
    f.runtime.push_argument(VarValue::Object(f.handle)).unwrap();
    f.runtime.push_argument(VarValue::Int32(5)).unwrap();
    assert_eq!(f.runtime.end_call().unwrap(), 1);
    assert_eq!(f.runtime.get_return(), Some(VarValue::Int64(15)));
}
