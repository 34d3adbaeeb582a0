//! Control flow tests: branches, loops, with, try/catch/finally

use super::*;
use flashvm::Value;

// =============================================================================
// Branches and loops
// =============================================================================

#[test]
fn test_if_skips_forward() {
    // if (true) skip the first assignment
    let mut records = set_var("r", s("start"));
    records.push(push(vec![ActionArg::Boolean(true)]));
    records.push(branch_if(2.0));
    records.extend(set_var("r", s("not taken")));
    records.extend(set_var("done", n(1.0)));
    assert_eq!(eval_var(Settings::default(), records.clone(), "r"), Value::from("start"));
    assert_eq!(eval_var(Settings::default(), records, "done"), Value::Number(1.0));
}

#[test]
fn test_while_loop_sums() {
    // i = 0; sum = 0; while (i < 10) { sum = sum + i; i++; }
    let mut records = set_var("i", n(0.0));
    records.extend(set_var("sum", n(0.0)));
    records.extend([
        push(vec![s("i")]),
        op(GET_VARIABLE),
        push(vec![n(10.0)]),
        op(LESS2),
        op(NOT),
        branch_if(11.0),
        push(vec![s("sum"), s("sum")]),
        op(GET_VARIABLE),
        push(vec![s("i")]),
        op(GET_VARIABLE),
        op(ADD2),
        op(SET_VARIABLE),
        push(vec![s("i"), s("i")]),
        op(GET_VARIABLE),
        op(INCREMENT),
        op(SET_VARIABLE),
        jump(-17.0),
    ]);
    assert_eq!(eval_var(Settings::default(), records, "sum"), Value::Number(45.0));
}

#[test]
fn test_branch_out_of_the_blob_ends_it() {
    let mut records = vec![push(vec![ActionArg::Boolean(true)]), branch_if(100.0)];
    records.extend(set_var("r", n(1.0)));
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::Undefined);
}

#[test]
fn test_return_ends_top_level_script() {
    let mut records = set_var("a", n(1.0));
    records.push(op(RETURN));
    records.extend(set_var("b", n(2.0)));
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "a").unwrap(), Value::Number(1.0));
    assert_eq!(avm.get(root, "b").unwrap(), Value::Undefined);
}

#[test]
fn test_constant_pool_and_registers() {
    let records = vec![
        ActionRecord::new(
            CONSTANT_POOL,
            vec![ActionArg::Strings(vec!["greeting".into(), "hello".into()])],
        ),
        push(vec![ActionArg::Constant(1)]),
        ActionRecord::new(STORE_REGISTER, vec![n(2.0)]),
        op(0x17),
        push(vec![ActionArg::Constant(0), ActionArg::Register(2)]),
        op(SET_VARIABLE),
    ];
    assert_eq!(eval_var(Settings::default(), records, "greeting"), Value::from("hello"));
}

// =============================================================================
// with
// =============================================================================

#[test]
fn test_with_writes_existing_property_of_the_object() {
    let (mut avm, root) = create_test_runtime();
    let obj = avm.create_object();
    avm.put(obj, "x", Value::Number(0.0)).unwrap();
    avm.put(root, "o", Value::Object(obj)).unwrap();

    let mut body = set_var("x", n(1.0));
    body.extend(set_var("y", n(2.0)));
    let records = vec![
        push(vec![s("o")]),
        op(GET_VARIABLE),
        ActionRecord::new(WITH, vec![ActionArg::Body(body)]),
    ];
    run(&mut avm, root, records).unwrap();

    assert_eq!(avm.get(obj, "x").unwrap(), Value::Number(1.0));
    assert_eq!(avm.get(root, "x").unwrap(), Value::Undefined);
    // names the object lacks still go to the target
    assert_eq!(avm.get(root, "y").unwrap(), Value::Number(2.0));
    assert!(!avm.has_own_property(obj, "y"));
}

#[test]
fn test_with_reads_through_the_object() {
    let (mut avm, root) = create_test_runtime();
    let obj = avm.create_object();
    avm.put(obj, "secret", Value::from("inside")).unwrap();
    avm.put(root, "o", Value::Object(obj)).unwrap();

    let body = vec![push(vec![s("r"), s("secret")]), op(GET_VARIABLE), op(SET_VARIABLE)];
    let records = vec![
        push(vec![s("o")]),
        op(GET_VARIABLE),
        ActionRecord::new(WITH, vec![ActionArg::Body(body)]),
    ];
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::from("inside"));
}

#[test]
fn test_with_undefined_skips_body() {
    let records = vec![
        push(vec![ActionArg::Undefined]),
        ActionRecord::new(WITH, vec![ActionArg::Body(set_var("r", n(1.0)))]),
    ];
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::Undefined);
}

// =============================================================================
// try / catch / finally
// =============================================================================

fn try_block(flags: f64, target: ActionArg, try_body: Vec<ActionRecord>, catch_body: Vec<ActionRecord>, finally_body: Vec<ActionRecord>) -> ActionRecord {
    ActionRecord::new(
        TRY,
        vec![
            n(flags),
            target,
            ActionArg::Body(try_body),
            ActionArg::Body(catch_body),
            ActionArg::Body(finally_body),
        ],
    )
}

fn throw(value: &str) -> Vec<ActionRecord> {
    vec![push(vec![s(value)]), op(THROW)]
}

#[test]
fn test_catch_binds_variable() {
    let catch_body = vec![push(vec![s("r"), s("e")]), op(GET_VARIABLE), op(SET_VARIABLE)];
    let records = vec![try_block(1.0, s("e"), throw("boom"), catch_body, vec![])];
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::from("boom"));
}

#[test]
fn test_catch_binds_register() {
    let catch_body = vec![push(vec![s("r"), ActionArg::Register(3)]), op(SET_VARIABLE)];
    let records = vec![try_block(1.0, ActionArg::Register(3), throw("in register"), catch_body, vec![])];
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::from("in register"));
}

#[test]
fn test_finally_runs_after_normal_completion() {
    let records = vec![try_block(
        3.0,
        s("e"),
        set_var("a", n(1.0)),
        set_var("caught", n(1.0)),
        set_var("f", n(1.0)),
    )];
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "a").unwrap(), Value::Number(1.0));
    assert_eq!(avm.get(root, "caught").unwrap(), Value::Undefined);
    assert_eq!(avm.get(root, "f").unwrap(), Value::Number(1.0));
}

#[test]
fn test_uncaught_throw_runs_finally_and_ends_quietly() {
    let mut records = vec![try_block(2.0, s("e"), throw("escape"), vec![], set_var("f", n(1.0)))];
    records.extend(set_var("after", n(1.0)));
    let (mut avm, root) = create_test_runtime();
    // uncaught script exceptions are logged, not returned
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "f").unwrap(), Value::Number(1.0));
    assert_eq!(avm.get(root, "after").unwrap(), Value::Undefined);
    assert!(!avm.is_execution_prohibited());
}

#[test]
fn test_throw_from_catch_is_caught_by_outer_try() {
    let inner = try_block(1.0, s("e"), throw("first"), throw("second"), vec![]);
    let outer_catch = vec![push(vec![s("r"), s("e2")]), op(GET_VARIABLE), op(SET_VARIABLE)];
    let records = vec![try_block(1.0, s("e2"), vec![inner], outer_catch, vec![])];
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::from("second"));
}

#[test]
fn test_return_inside_try_leaves_function() {
    // function f() { try { return "t"; } finally { fin = 1; } }
    let body = vec![try_block(
        2.0,
        s("e"),
        vec![push(vec![s("t")]), op(RETURN)],
        vec![],
        set_var("fin", n(1.0)),
    )];
    let records = vec![
        define_function("f", &[], body),
        push(vec![s("r"), n(0.0), s("f")]),
        op(CALL_FUNCTION),
        op(SET_VARIABLE),
    ];
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::from("t"));
    assert_eq!(avm.get(root, "fin").unwrap(), Value::Number(1.0));
}
