//! Garbage collection tests: reclaiming call garbage, roots, re-entrancy

use super::*;
use flashvm::Value;

fn with_threshold(gc_threshold: usize) -> Settings {
    Settings {
        gc_threshold,
        ..Settings::default()
    }
}

/// `name()` with the result discarded.
fn call(name: &str) -> Vec<ActionRecord> {
    vec![push(vec![n(0.0), s(name)]), op(CALL_FUNCTION), op(POP)]
}

#[test]
fn test_repeated_calls_do_not_grow_the_heap() {
    let (mut avm, root) = create_runtime_with(with_threshold(100));
    run(&mut avm, root, vec![define_function("f", &[], vec![])]).unwrap();
    let calls = ActionsData::from_records(&call("f")).unwrap();
    avm.execute_actions(&calls, root).unwrap();
    let baseline = avm.heap().len();

    for _ in 0..1000 {
        avm.execute_actions(&calls, root).unwrap();
    }
    // at most one threshold's worth of garbage is pending
    assert!(avm.heap().len() <= baseline + 110, "{} live after 1000 calls", avm.heap().len());
    assert!(avm.heap().stats().pooled_objects > 0);
    assert!(avm.heap().stats().total_objects < baseline + 200);
}

#[test]
fn test_reachable_objects_survive_collection() {
    // o = new Object(); o.x = 5; function g() { return o.x; }
    let (mut avm, root) = create_test_runtime();
    let mut records = vec![push(vec![s("o"), n(0.0), s("Object")]), op(NEW_OBJECT), op(SET_VARIABLE)];
    records.extend(vec![push(vec![s("o")]), op(GET_VARIABLE), push(vec![s("x"), n(5.0)]), op(SET_MEMBER)]);
    records.push(define_function(
        "g",
        &[],
        vec![push(vec![s("o")]), op(GET_VARIABLE), push(vec![s("x")]), op(GET_MEMBER), op(RETURN)],
    ));
    run(&mut avm, root, records).unwrap();

    avm.collect_garbage();

    let mut records = vec![push(vec![s("r"), n(0.0), s("g")]), op(CALL_FUNCTION), op(SET_VARIABLE)];
    records.extend(vec![push(vec![s("t"), s("this")]), op(GET_VARIABLE), op(SET_VARIABLE)]);
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::Number(5.0));
    assert_eq!(avm.get(root, "t").unwrap(), Value::Object(root));
}

#[test]
fn test_unreachable_host_objects_are_collected_unless_rooted() {
    let (mut avm, _root) = create_test_runtime();
    let kept = avm.create_object();
    let dropped = avm.create_object();
    avm.add_root(kept);

    assert!(avm.collect_garbage() >= 1);
    assert!(avm.heap().is_live(kept));
    assert!(!avm.heap().is_live(dropped));

    avm.remove_root(kept);
    avm.collect_garbage();
    assert!(!avm.heap().is_live(kept));
}

#[test]
fn test_returned_object_survives_the_end_of_run_collection() {
    // function make() { return new Object(); }
    let (mut avm, root) = create_runtime_with(with_threshold(1));
    let body = vec![push(vec![n(0.0), s("Object")]), op(NEW_OBJECT), op(RETURN)];
    run(&mut avm, root, vec![define_function("make", &[], body)]).unwrap();
    let make = avm.get(root, "make").unwrap().as_object().unwrap();

    let made = avm.execute_function(make, Value::Object(root), &[]).unwrap();
    let made = made.as_object().unwrap();
    assert!(avm.heap().is_live(made));
    assert_eq!(avm.heap().prototype_of(made), Some(avm.builtins().object_prototype));
}

fn collect_now(avm: &mut Avm1, _this: Value, _args: &[Value]) -> AvmResult<Value> {
    Ok(Value::from(avm.collect_garbage() as f64))
}

#[test]
fn test_collection_is_skipped_while_scripts_run() {
    let (mut avm, root) = create_test_runtime();
    let native = avm.create_native_function("collectNow", Some(collect_now), None);
    let globals = avm.globals();
    avm.put(globals, "collectNow", Value::Object(native)).unwrap();

    let records = vec![push(vec![s("r"), n(0.0), s("collectNow")]), op(CALL_FUNCTION), op(SET_VARIABLE)];
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::Number(0.0));
}
