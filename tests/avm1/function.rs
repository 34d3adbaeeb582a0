//! Function tests: DefineFunction(2), calls, constructors, prototypes

use super::*;
use flashvm::Value;
use flashvm::avm1::actions::RegisterParam;

fn param(register: u8, name: &str) -> RegisterParam {
    RegisterParam {
        register,
        name: name.to_string(),
    }
}

/// `DefineFunction2 name(params)` with `register_count` registers.
fn define_function2(
    name: &str,
    register_count: f64,
    flags: f64,
    params: Vec<RegisterParam>,
    body: Vec<ActionRecord>,
) -> ActionRecord {
    ActionRecord::new(
        DEFINE_FUNCTION2,
        vec![s(name), n(register_count), n(flags), ActionArg::Params(params), ActionArg::Body(body)],
    )
}

/// `r = name(args...)`, arguments given in source order.
fn call_into(result: &str, name: &str, args: &[f64]) -> Vec<ActionRecord> {
    let mut values = vec![s(result)];
    values.extend(args.iter().rev().map(|a| n(*a)));
    values.push(n(args.len() as f64));
    values.push(s(name));
    vec![push(values), op(CALL_FUNCTION), op(SET_VARIABLE)]
}

#[test]
fn test_define_function_with_named_params() {
    // function sub(a, b) { return a - b; }
    let body = vec![
        push(vec![s("a")]),
        op(GET_VARIABLE),
        push(vec![s("b")]),
        op(GET_VARIABLE),
        op(0x0B),
        op(RETURN),
    ];
    let mut records = vec![define_function("sub", &["a", "b"], body)];
    records.extend(call_into("r", "sub", &[10.0, 3.0]));
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::Number(7.0));
}

#[test]
fn test_missing_arguments_are_undefined() {
    let body = vec![push(vec![s("b")]), op(GET_VARIABLE), op(TYPE_OF), op(RETURN)];
    let mut records = vec![define_function("f", &["a", "b"], body)];
    records.extend(call_into("r", "f", &[1.0]));
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::from("undefined"));
}

#[test]
fn test_define_function2_register_params() {
    // function add(a /* r1 */, b /* r2 */) { return a + b; }
    let body = vec![
        push(vec![ActionArg::Register(1), ActionArg::Register(2)]),
        op(ADD2),
        op(RETURN),
    ];
    let mut records = vec![define_function2("add", 3.0, 0.0, vec![param(1, "a"), param(2, "b")], body)];
    records.extend(call_into("r", "add", &[2.0, 3.0]));
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::Number(5.0));
}

#[test]
fn test_register_params_are_not_locals() {
    // the register-bound parameter is invisible by name
    let body = vec![push(vec![s("a")]), op(GET_VARIABLE), op(TYPE_OF), op(RETURN)];
    let mut records = vec![define_function2("f", 2.0, 0.0, vec![param(1, "a")], body)];
    records.extend(call_into("r", "f", &[1.0]));
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::from("undefined"));
}

#[test]
fn test_define_function2_preloads_this() {
    // preload `this` into r1, suppress the `this` local
    let body = vec![
        push(vec![ActionArg::Register(1), s("tag")]),
        op(GET_MEMBER),
        op(RETURN),
    ];
    let (mut avm, root) = create_test_runtime();
    avm.put(root, "tag", Value::from("root clip")).unwrap();
    let mut records = vec![define_function2("f", 2.0, 3.0, vec![], body)];
    records.extend(call_into("r", "f", &[]));
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::from("root clip"));
}

#[test]
fn test_arguments_object() {
    let body = vec![
        push(vec![s("arguments")]),
        op(GET_VARIABLE),
        push(vec![s("length")]),
        op(GET_MEMBER),
        op(RETURN),
    ];
    let mut records = vec![define_function("count", &[], body)];
    records.extend(call_into("r", "count", &[1.0, 2.0, 3.0]));
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::Number(3.0));
}

#[test]
fn test_closure_sees_defining_scope() {
    // function outer() { var secret = 42; return function() { return secret; }; }
    let inner = ActionRecord::new(
        DEFINE_FUNCTION,
        vec![
            s(""),
            ActionArg::Strings(vec![]),
            ActionArg::Body(vec![push(vec![s("secret")]), op(GET_VARIABLE), op(RETURN)]),
        ],
    );
    let outer_body = vec![push(vec![s("secret"), n(42.0)]), op(DEFINE_LOCAL), inner, op(RETURN)];
    let mut records = vec![define_function("outer", &[], outer_body)];
    records.extend(call_into("getter", "outer", &[]));
    records.extend(call_into("r", "getter", &[]));
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::Number(42.0));
    // the local stayed in the activation
    assert_eq!(avm.get(root, "secret").unwrap(), Value::Undefined);
}

#[test]
fn test_calling_undefined_function_pushes_undefined() {
    let records = call_into("r", "nothing", &[1.0]);
    assert_eq!(eval_var(Settings::default(), records, "r"), Value::Undefined);
}

/// `function Point(x) { this.x = x; }`
fn point_constructor() -> ActionRecord {
    let body = vec![
        push(vec![s("this")]),
        op(GET_VARIABLE),
        push(vec![s("x"), s("x")]),
        op(GET_VARIABLE),
        op(SET_MEMBER),
    ];
    define_function("Point", &["x"], body)
}

#[test]
fn test_new_object_runs_constructor() {
    let records = vec![
        point_constructor(),
        push(vec![s("p"), n(5.0), n(1.0), s("Point")]),
        op(NEW_OBJECT),
        op(SET_VARIABLE),
        push(vec![s("ok"), s("p")]),
        op(GET_VARIABLE),
        push(vec![s("Point")]),
        op(GET_VARIABLE),
        op(INSTANCE_OF),
        op(SET_VARIABLE),
    ];
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();
    let p = avm.get(root, "p").unwrap().as_object().unwrap();
    assert_eq!(avm.get(p, "x").unwrap(), Value::Number(5.0));
    assert_eq!(avm.get(root, "ok").unwrap(), Value::Boolean(true));
}

#[test]
fn test_prototype_methods_and_extends() {
    // Point.prototype.sum = function () { return this.x + 1; }
    // function Point3() {}  Point3 extends Point
    let sum = ActionRecord::new(
        DEFINE_FUNCTION,
        vec![
            s(""),
            ActionArg::Strings(vec![]),
            ActionArg::Body(vec![
                push(vec![s("this")]),
                op(GET_VARIABLE),
                push(vec![s("x")]),
                op(GET_MEMBER),
                push(vec![n(1.0)]),
                op(ADD2),
                op(RETURN),
            ]),
        ],
    );
    let records = vec![
        point_constructor(),
        push(vec![s("Point")]),
        op(GET_VARIABLE),
        push(vec![s("prototype")]),
        op(GET_MEMBER),
        push(vec![s("sum")]),
        sum,
        op(SET_MEMBER),
        define_function("Point3", &[], vec![]),
        push(vec![s("Point3")]),
        op(GET_VARIABLE),
        push(vec![s("Point")]),
        op(GET_VARIABLE),
        op(EXTENDS),
    ];
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();

    let point3 = avm.get(root, "Point3").unwrap().as_object().unwrap();
    let q = avm.construct(point3, &[]).unwrap().as_object().unwrap();
    avm.put(q, "x", Value::Number(9.0)).unwrap();
    let sum = avm.get(q, "sum").unwrap().as_object().unwrap();
    assert_eq!(avm.call_function(sum, Value::Object(q), &[]).unwrap(), Value::Number(10.0));

    let point = avm.get(root, "Point").unwrap();
    assert!(avm.instance_of(&Value::Object(q), &point).unwrap());
}

#[test]
fn test_function_call_and_apply() {
    let (mut avm, root) = create_test_runtime();
    let body = vec![
        push(vec![s("this")]),
        op(GET_VARIABLE),
        push(vec![s("base")]),
        op(GET_MEMBER),
        push(vec![s("n")]),
        op(GET_VARIABLE),
        op(ADD2),
        op(RETURN),
    ];
    run(&mut avm, root, vec![define_function("f", &["n"], body)]).unwrap();
    let f = avm.get(root, "f").unwrap().as_object().unwrap();

    let receiver = avm.create_object();
    avm.put(receiver, "base", Value::Number(100.0)).unwrap();

    let call = avm.get(f, "call").unwrap().as_object().unwrap();
    let result = avm
        .call_function(call, Value::Object(f), &[Value::Object(receiver), Value::Number(1.0)])
        .unwrap();
    assert_eq!(result, Value::Number(101.0));

    let apply = avm.get(f, "apply").unwrap().as_object().unwrap();
    let args = avm.create_array(&[Value::Number(2.0)]);
    let result = avm
        .call_function(apply, Value::Object(f), &[Value::Object(receiver), Value::Object(args)])
        .unwrap();
    assert_eq!(result, Value::Number(102.0));
}

#[test]
fn test_init_object_and_array() {
    let records = vec![
        push(vec![s("o"), s("a"), n(1.0), s("b"), n(2.0), n(2.0)]),
        op(INIT_OBJECT),
        op(SET_VARIABLE),
        push(vec![s("arr"), n(30.0), n(20.0), n(10.0), n(3.0)]),
        op(INIT_ARRAY),
        op(SET_VARIABLE),
    ];
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();

    let o = avm.get(root, "o").unwrap().as_object().unwrap();
    assert_eq!(avm.get(o, "a").unwrap(), Value::Number(1.0));
    assert_eq!(avm.get(o, "b").unwrap(), Value::Number(2.0));

    let arr = avm.get(root, "arr").unwrap().as_object().unwrap();
    assert_eq!(avm.get(arr, "length").unwrap(), Value::Number(3.0));
    assert_eq!(avm.get(arr, "0").unwrap(), Value::Number(10.0));
    assert_eq!(avm.get(arr, "2").unwrap(), Value::Number(30.0));
    let text = avm.to_avm_string(&Value::Object(arr)).unwrap();
    assert_eq!(text.as_str(), "10,20,30");
}

#[test]
fn test_falling_off_the_end_returns_top_of_stack() {
    // function f() { push 7 } function g() {}
    let mut records = vec![
        define_function("f", &[], vec![push(vec![n(7.0)])]),
        define_function("g", &[], vec![]),
    ];
    records.extend(call_into("r", "f", &[]));
    records.extend(call_into("u", "g", &[]));
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::Number(7.0));
    assert_eq!(avm.get(root, "u").unwrap(), Value::Undefined);
}
