//! Scope and target tests: variable paths, setTarget, levels

use super::*;
use flashvm::Value;

/// `r = <expr>` where `<expr>` is a GetVariable of `path`.
fn read_into(result: &str, path: &str) -> Vec<ActionRecord> {
    vec![push(vec![s(result), s(path)]), op(GET_VARIABLE), op(SET_VARIABLE)]
}

struct Stage {
    avm: Avm1,
    root: ObjectId,
    a: ObjectId,
    b: ObjectId,
}

/// `_level0` with children `a` and `a.b`.
fn stage() -> Stage {
    let (mut avm, root) = create_test_runtime();
    let a = avm.create_movie_clip(Some(root), "a");
    let b = avm.create_movie_clip(Some(a), "b");
    Stage { avm, root, a, b }
}

#[test]
fn test_slash_path_from_root() {
    let mut st = stage();
    st.avm.put(st.b, "x", Value::Number(7.0)).unwrap();
    run(&mut st.avm, st.root, read_into("r", "/a/b:x")).unwrap();
    assert_eq!(st.avm.get(st.root, "r").unwrap(), Value::Number(7.0));
}

#[test]
fn test_dot_path() {
    let mut st = stage();
    st.avm.put(st.b, "x", Value::from("dotted")).unwrap();
    run(&mut st.avm, st.root, read_into("r", "a.b.x")).unwrap();
    assert_eq!(st.avm.get(st.root, "r").unwrap(), Value::from("dotted"));
}

#[test]
fn test_parent_path() {
    let mut st = stage();
    st.avm.put(st.root, "y", Value::Number(3.0)).unwrap();
    // runs on `a`; `../y` reads the root's variable
    run(&mut st.avm, st.a, read_into("r", "../y")).unwrap();
    assert_eq!(st.avm.get(st.a, "r").unwrap(), Value::Number(3.0));
}

#[test]
fn test_write_through_path() {
    let mut st = stage();
    let records = vec![push(vec![s("/a/b:score"), n(99.0)]), op(SET_VARIABLE)];
    run(&mut st.avm, st.root, records).unwrap();
    assert_eq!(st.avm.get(st.b, "score").unwrap(), Value::Number(99.0));
    assert_eq!(st.avm.get(st.root, "score").unwrap(), Value::Undefined);
}

#[test]
fn test_unresolvable_path_reads_undefined() {
    let mut st = stage();
    st.avm.put(st.root, "r", Value::from("before")).unwrap();
    run(&mut st.avm, st.root, read_into("r", "/nope/deeper:x")).unwrap();
    assert_eq!(st.avm.get(st.root, "r").unwrap(), Value::Undefined);
}

#[test]
fn test_level_and_root_names() {
    let mut st = stage();
    st.avm.put(st.root, "z", Value::Number(1.0)).unwrap();
    let mut records = read_into("viaLevel", "_level0.z");
    records.extend(read_into("viaRoot", "_root.z"));
    run(&mut st.avm, st.b, records).unwrap();
    assert_eq!(st.avm.get(st.b, "viaLevel").unwrap(), Value::Number(1.0));
    assert_eq!(st.avm.get(st.b, "viaRoot").unwrap(), Value::Number(1.0));
}

#[test]
fn test_this_and_global() {
    let mut st = stage();
    // me = this; _global.shared = 5;
    let records = vec![
        push(vec![s("me"), s("this")]),
        op(GET_VARIABLE),
        op(SET_VARIABLE),
        push(vec![s("_global")]),
        op(GET_VARIABLE),
        push(vec![s("shared"), n(5.0)]),
        op(SET_MEMBER),
    ];
    run(&mut st.avm, st.a, records).unwrap();
    assert_eq!(st.avm.get(st.a, "me").unwrap(), Value::Object(st.a));
    let globals = st.avm.globals();
    assert_eq!(st.avm.get(globals, "shared").unwrap(), Value::Number(5.0));

    // globals are visible from any target
    run(&mut st.avm, st.b, read_into("seen", "shared")).unwrap();
    assert_eq!(st.avm.get(st.b, "seen").unwrap(), Value::Number(5.0));
}

#[test]
fn test_set_target_redirects_writes_and_timeline_actions() {
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    let a = avm.create_movie_clip(Some(root), "a");

    let mut records = vec![ActionRecord::new(SET_TARGET, vec![s("a")])];
    records.extend(set_var("inside", n(1.0)));
    records.push(ActionRecord::new(GOTO_FRAME, vec![n(4.0)]));
    records.push(ActionRecord::new(SET_TARGET, vec![s("")]));
    records.extend(set_var("outside", n(1.0)));
    run(&mut avm, root, records).unwrap();

    assert_eq!(avm.get(a, "inside").unwrap(), Value::Number(1.0));
    assert_eq!(avm.get(root, "inside").unwrap(), Value::Undefined);
    assert_eq!(avm.get(root, "outside").unwrap(), Value::Number(1.0));
    assert_eq!(*log.borrow(), vec![format!("goto {:?} Number(5) false", a)]);
}

#[test]
fn test_set_target_to_missing_clip_keeps_original_target() {
    let (mut avm, root) = create_test_runtime();
    let mut records = vec![ActionRecord::new(SET_TARGET, vec![s("ghost")])];
    records.extend(set_var("v", n(1.0)));
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "v").unwrap(), Value::Number(1.0));
}

#[test]
fn test_define_local_at_top_level_writes_target() {
    let (mut avm, root) = create_test_runtime();
    let records = vec![push(vec![s("local"), n(8.0)]), op(DEFINE_LOCAL)];
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "local").unwrap(), Value::Number(8.0));
}
