//! Property protocol tests: case folding, attributes, accessors, watchers, enumeration

use super::*;
use flashvm::Value;
use flashvm::avm1::PropertyFlags;

#[test]
fn test_names_fold_case_before_swf7() {
    let (mut avm, root) = create_runtime_with(Settings::for_swf_version(6));
    avm.put(root, "Score", Value::Number(1.0)).unwrap();
    assert_eq!(avm.get(root, "score").unwrap(), Value::Number(1.0));
    assert_eq!(avm.get(root, "SCORE").unwrap(), Value::Number(1.0));

    let (mut avm, root) = create_runtime_with(Settings::for_swf_version(7));
    avm.put(root, "Score", Value::Number(1.0)).unwrap();
    assert_eq!(avm.get(root, "score").unwrap(), Value::Undefined);
    assert_eq!(avm.get(root, "Score").unwrap(), Value::Number(1.0));
}

#[test]
fn test_enumeration_keeps_original_spelling() {
    let (mut avm, _root) = create_runtime_with(Settings::for_swf_version(6));
    let obj = avm.create_object();
    avm.put(obj, "Alpha", Value::Number(1.0)).unwrap();
    avm.put(obj, "beta", Value::Number(2.0)).unwrap();
    avm.put(obj, "ALPHA", Value::Number(3.0)).unwrap();
    let keys: Vec<String> = avm.keys(obj).iter().map(|k| k.as_str().to_string()).collect();
    assert_eq!(keys, vec!["Alpha", "beta"]);
    assert_eq!(avm.get(obj, "alpha").unwrap(), Value::Number(3.0));
}

#[test]
fn test_own_keys_shadow_prototype_keys() {
    let (mut avm, _root) = create_test_runtime();
    let proto = avm.create_object();
    avm.put(proto, "shared", Value::Number(1.0)).unwrap();
    avm.put(proto, "inherited", Value::Number(1.0)).unwrap();
    let obj = avm.create_object();
    avm.put(obj, "__proto__", Value::Object(proto)).unwrap();
    avm.put(obj, "shared", Value::Number(2.0)).unwrap();
    avm.put(obj, "own", Value::Number(3.0)).unwrap();

    let keys: Vec<String> = avm.keys(obj).iter().map(|k| k.as_str().to_string()).collect();
    assert_eq!(keys, vec!["shared", "own", "inherited"]);
    assert_eq!(avm.get(obj, "__proto__").unwrap(), Value::Object(proto));
}

#[test]
fn test_read_only_and_dont_delete() {
    let (mut avm, _root) = create_test_runtime();
    let obj = avm.create_object();
    avm.define_value(
        obj,
        "fixed",
        Value::Number(1.0),
        PropertyFlags::READ_ONLY | PropertyFlags::DONT_DELETE,
    );
    avm.put(obj, "fixed", Value::Number(2.0)).unwrap();
    assert_eq!(avm.get(obj, "fixed").unwrap(), Value::Number(1.0));
    assert!(!avm.delete_property(obj, "fixed"));
    assert!(avm.has_property(obj, "fixed"));

    avm.put(obj, "loose", Value::Number(1.0)).unwrap();
    assert!(avm.delete_property(obj, "loose"));
    assert!(!avm.has_property(obj, "loose"));
    // deleting what does not exist succeeds
    assert!(avm.delete_property(obj, "missing"));
}

#[test]
fn test_read_only_prototype_property_blocks_writes() {
    let (mut avm, _root) = create_test_runtime();
    let proto = avm.create_object();
    avm.define_value(proto, "locked", Value::Number(1.0), PropertyFlags::READ_ONLY);
    let obj = avm.create_object();
    avm.put(obj, "__proto__", Value::Object(proto)).unwrap();
    avm.put(obj, "locked", Value::Number(5.0)).unwrap();
    assert!(!avm.has_own_property(obj, "locked"));
    assert_eq!(avm.get(obj, "locked").unwrap(), Value::Number(1.0));
}

#[test]
fn test_as_set_prop_flags_hides_from_enumeration() {
    let (mut avm, root) = create_test_runtime();
    let obj = avm.create_object();
    avm.put(obj, "a", Value::Number(1.0)).unwrap();
    avm.put(obj, "b", Value::Number(2.0)).unwrap();
    avm.put(root, "o", Value::Object(obj)).unwrap();

    // ASSetPropFlags(o, "a", 1)
    let records = vec![
        push(vec![n(1.0), s("a"), s("o")]),
        op(GET_VARIABLE),
        push(vec![n(3.0), s("ASSetPropFlags")]),
        op(CALL_FUNCTION),
        op(0x17),
    ];
    run(&mut avm, root, records).unwrap();
    let keys: Vec<String> = avm.keys(obj).iter().map(|k| k.as_str().to_string()).collect();
    assert_eq!(keys, vec!["b"]);
}

#[test]
fn test_add_property_accessors() {
    let (mut avm, root) = create_test_runtime();
    // getter returns this._v * 2, setter stores into this._v
    let getter_body = vec![
        push(vec![s("this")]),
        op(GET_VARIABLE),
        push(vec![s("_v")]),
        op(GET_MEMBER),
        push(vec![n(2.0)]),
        op(0x0C),
        op(RETURN),
    ];
    let setter_body = vec![
        push(vec![s("this")]),
        op(GET_VARIABLE),
        push(vec![s("_v"), s("v")]),
        op(GET_VARIABLE),
        op(SET_MEMBER),
    ];
    run(
        &mut avm,
        root,
        vec![define_function("getter", &[], getter_body), define_function("setter", &["v"], setter_body)],
    )
    .unwrap();
    let getter = avm.get(root, "getter").unwrap();
    let setter = avm.get(root, "setter").unwrap();

    let obj = avm.create_object();
    let add_property = avm.get(obj, "addProperty").unwrap().as_object().unwrap();
    let added = avm
        .call_function(add_property, Value::Object(obj), &[Value::from("value"), getter, setter])
        .unwrap();
    assert_eq!(added, Value::Boolean(true));

    avm.put(obj, "value", Value::Number(21.0)).unwrap();
    assert_eq!(avm.get(obj, "_v").unwrap(), Value::Number(21.0));
    assert_eq!(avm.get(obj, "value").unwrap(), Value::Number(42.0));
}

fn double_new_value(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    let n = avm.to_number(&args[2])?;
    Ok(Value::Number(n * 2.0))
}

#[test]
fn test_watcher_rewrites_assigned_value() {
    let (mut avm, _root) = create_test_runtime();
    let obj = avm.create_object();
    let callback = avm.create_native_function("double", Some(double_new_value), None);
    assert!(avm.add_watcher(obj, "w", callback, Value::Undefined));
    // the watched property exists right away
    assert!(avm.has_own_property(obj, "w"));

    avm.put(obj, "w", Value::Number(4.0)).unwrap();
    assert_eq!(avm.get(obj, "w").unwrap(), Value::Number(8.0));

    assert!(avm.remove_watcher(obj, "w"));
    avm.put(obj, "w", Value::Number(4.0)).unwrap();
    assert_eq!(avm.get(obj, "w").unwrap(), Value::Number(4.0));
    assert!(!avm.remove_watcher(obj, "w"));
}

fn record_watch(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let target = this.as_object().unwrap();
    let entry = format!(
        "{}:{}->{}:{}",
        avm.to_avm_string(&args[0])?,
        avm.to_avm_string(&args[1])?,
        avm.to_avm_string(&args[2])?,
        avm.to_avm_string(&args[3])?
    );
    avm.define_value(target, "log", Value::from(entry), PropertyFlags::DONT_ENUM);
    Ok(args[2].clone())
}

#[test]
fn test_watcher_receives_name_values_and_user_data() {
    let (mut avm, _root) = create_test_runtime();
    let obj = avm.create_object();
    avm.put(obj, "hp", Value::Number(10.0)).unwrap();
    let callback = avm.create_native_function("record", Some(record_watch), None);
    avm.add_watcher(obj, "hp", callback, Value::from("tag"));
    avm.put(obj, "hp", Value::Number(7.0)).unwrap();
    assert_eq!(avm.get(obj, "log").unwrap(), Value::from("hp:10->7:tag"));
    assert_eq!(avm.get(obj, "hp").unwrap(), Value::Number(7.0));
}

#[test]
fn test_movie_clip_virtual_properties() {
    let (mut avm, root) = create_test_runtime();
    let child = avm.create_movie_clip(Some(root), "hero");
    let grandchild = avm.create_movie_clip(Some(child), "hat");

    assert_eq!(avm.get(root, "hero").unwrap(), Value::Object(child));
    assert_eq!(avm.get(grandchild, "_parent").unwrap(), Value::Object(child));
    assert_eq!(avm.get(grandchild, "_root").unwrap(), Value::Object(root));
    assert_eq!(avm.get(grandchild, "_name").unwrap(), Value::from("hat"));
    assert_eq!(avm.get(grandchild, "_target").unwrap(), Value::from("/hero/hat"));
    assert_eq!(avm.get(root, "_target").unwrap(), Value::from("/"));

    avm.remove_movie_clip(child);
    assert_eq!(avm.get(root, "hero").unwrap(), Value::Undefined);
}
