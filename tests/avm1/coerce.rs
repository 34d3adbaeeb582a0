//! Arithmetic, comparison and conversion tests across SWF versions

use super::*;
use flashvm::Value;

/// `r = a <op> b`
fn binary(a: ActionArg, b: ActionArg, code: u8) -> Vec<ActionRecord> {
    vec![push(vec![s("r"), a, b]), op(code), op(SET_VARIABLE)]
}

fn swf(version: u8) -> Settings {
    Settings::for_swf_version(version)
}

#[test]
fn test_swf4_add_is_numeric() {
    let r = eval_var(swf(4), binary(s("2"), s("3"), ADD), "r");
    assert_eq!(r, Value::Number(5.0));
}

#[test]
fn test_add2_concatenates_when_either_side_is_a_string() {
    assert_eq!(eval_var(swf(10), binary(s("a"), s("b"), ADD2), "r"), Value::from("ab"));
    assert_eq!(eval_var(swf(10), binary(n(1.0), s("2"), ADD2), "r"), Value::from("12"));
    assert_eq!(eval_var(swf(10), binary(n(1.0), n(2.0), ADD2), "r"), Value::Number(3.0));
    assert_eq!(
        eval_var(swf(10), binary(ActionArg::Boolean(true), n(2.0), ADD2), "r"),
        Value::Number(3.0)
    );
}

#[test]
fn test_add2_with_object_uses_to_string() {
    let (mut avm, root) = create_test_runtime();
    let obj = avm.create_object();
    avm.put(root, "o", Value::Object(obj)).unwrap();
    let records = vec![
        push(vec![s("r"), s("o")]),
        op(GET_VARIABLE),
        push(vec![s("!")]),
        op(ADD2),
        op(SET_VARIABLE),
    ];
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::from("[object Object]!"));
}

#[test]
fn test_division_by_zero() {
    assert_eq!(eval_var(swf(4), binary(n(1.0), n(0.0), DIVIDE), "r"), Value::from("#ERROR#"));
    assert_eq!(eval_var(swf(5), binary(n(1.0), n(0.0), DIVIDE), "r"), Value::Number(f64::INFINITY));
    assert_eq!(eval_var(swf(4), binary(n(6.0), n(3.0), DIVIDE), "r"), Value::Number(2.0));
}

#[test]
fn test_swf4_comparisons_yield_numbers() {
    assert_eq!(eval_var(swf(4), binary(n(2.0), n(2.0), EQUALS), "r"), Value::Number(1.0));
    assert_eq!(eval_var(swf(4), binary(n(2.0), n(3.0), EQUALS), "r"), Value::Number(0.0));
    assert_eq!(eval_var(swf(5), binary(n(2.0), n(2.0), EQUALS), "r"), Value::Boolean(true));
}

#[test]
fn test_undefined_converts_by_version() {
    // undefined + 1
    let records = |version| eval_var(swf(version), binary(ActionArg::Undefined, n(1.0), ADD2), "r");
    assert_eq!(records(6), Value::Number(1.0));
    match records(7) {
        Value::Number(n) => assert!(n.is_nan()),
        other => panic!("expected NaN, got {:?}", other),
    }
}

#[test]
fn test_non_empty_strings_are_true_at_every_version() {
    // r = !value
    let not = |version, value: &str| {
        eval_var(
            swf(version),
            vec![push(vec![s("r"), s(value)]), op(NOT), op(SET_VARIABLE)],
            "r",
        )
    };
    for version in [5, 6, 7, 10] {
        assert_eq!(not(version, "abc"), Value::Boolean(false), "swf {}", version);
        assert_eq!(not(version, "0"), Value::Boolean(false), "swf {}", version);
        assert_eq!(not(version, ""), Value::Boolean(true), "swf {}", version);
    }
}

#[test]
fn test_equals2_abstract_equality() {
    assert_eq!(eval_var(swf(10), binary(n(1.0), s("1"), EQUALS2), "r"), Value::Boolean(true));
    assert_eq!(eval_var(swf(10), binary(n(0.0), s(""), EQUALS2), "r"), Value::Boolean(false));
    assert_eq!(
        eval_var(swf(10), binary(ActionArg::Null, ActionArg::Undefined, EQUALS2), "r"),
        Value::Boolean(true)
    );
    assert_eq!(
        eval_var(swf(10), binary(ActionArg::Boolean(true), s("1"), EQUALS2), "r"),
        Value::Boolean(true)
    );
    assert_eq!(eval_var(swf(10), binary(n(1.0), s("1"), STRICT_EQUALS), "r"), Value::Boolean(false));
}

#[test]
fn test_less2_with_nan_is_undefined() {
    assert_eq!(eval_var(swf(10), binary(n(1.0), n(2.0), LESS2), "r"), Value::Boolean(true));
    assert_eq!(eval_var(swf(10), binary(s("b"), s("a"), LESS2), "r"), Value::Boolean(false));
    assert_eq!(eval_var(swf(10), binary(s("x"), n(2.0), LESS2), "r"), Value::Undefined);
}

#[test]
fn test_typeof() {
    let (mut avm, root) = create_test_runtime();
    let clip = avm.create_movie_clip(Some(root), "clip");
    avm.put(root, "c", Value::Object(clip)).unwrap();
    let type_of = |avm: &mut Avm1, value: ActionArg| {
        run(avm, root, vec![push(vec![s("t"), value]), op(TYPE_OF), op(SET_VARIABLE)]).unwrap();
        avm.get(root, "t").unwrap()
    };
    assert_eq!(type_of(&mut avm, n(1.0)), Value::from("number"));
    assert_eq!(type_of(&mut avm, s("x")), Value::from("string"));
    assert_eq!(type_of(&mut avm, ActionArg::Null), Value::from("null"));
    assert_eq!(type_of(&mut avm, ActionArg::Undefined), Value::from("undefined"));

    run(&mut avm, root, vec![push(vec![s("t"), s("c")]), op(GET_VARIABLE), op(TYPE_OF), op(SET_VARIABLE)]).unwrap();
    assert_eq!(avm.get(root, "t").unwrap(), Value::from("movieclip"));
}

#[test]
fn test_number_formatting() {
    let (mut avm, _root) = create_test_runtime();
    let cases = [
        (1.0, "1"),
        (-0.5, "-0.5"),
        (1e21, "1e+21"),
        (123456789012.0, "123456789012"),
        (0.000001, "0.000001"),
        (1.5e-7, "1.5e-7"),
        (f64::NAN, "NaN"),
        (f64::NEG_INFINITY, "-Infinity"),
    ];
    for (n, expected) in cases {
        assert_eq!(avm.to_avm_string(&Value::Number(n)).unwrap().as_str(), expected, "{}", n);
    }
}

#[test]
fn test_string_to_number() {
    let (mut avm, _root) = create_test_runtime();
    assert_eq!(avm.to_number(&Value::from("  42 ")).unwrap(), 42.0);
    assert_eq!(avm.to_number(&Value::from("0x1F")).unwrap(), 31.0);
    assert_eq!(avm.to_number(&Value::from("-Infinity")).unwrap(), f64::NEG_INFINITY);
    assert!(avm.to_number(&Value::from("12px")).unwrap().is_nan());
    assert_eq!(avm.to_number(&Value::Boolean(true)).unwrap(), 1.0);
}

#[test]
fn test_swf4_string_helpers() {
    let records = vec![
        push(vec![s("len"), s("hello")]),
        op(0x14),
        op(SET_VARIABLE),
        push(vec![s("sub"), s("hello"), n(2.0), n(3.0)]),
        op(0x15),
        op(SET_VARIABLE),
        push(vec![s("code"), s("A")]),
        op(0x32),
        op(SET_VARIABLE),
        push(vec![s("joined"), s("ab"), s("cd")]),
        op(0x21),
        op(SET_VARIABLE),
    ];
    let (mut avm, root) = create_runtime_with(swf(4));
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "len").unwrap(), Value::Number(5.0));
    assert_eq!(avm.get(root, "sub").unwrap(), Value::from("ell"));
    assert_eq!(avm.get(root, "code").unwrap(), Value::Number(65.0));
    assert_eq!(avm.get(root, "joined").unwrap(), Value::from("abcd"));
}

#[test]
fn test_enumerate2_pushes_keys_after_null_marker() {
    let (mut avm, root) = create_test_runtime();
    let obj = avm.create_object();
    avm.put(obj, "k1", Value::Number(1.0)).unwrap();
    avm.put(obj, "k2", Value::Number(2.0)).unwrap();
    avm.put(root, "o", Value::Object(obj)).unwrap();
    // collect keys into an array: the marker null ends the list
    let records = vec![
        push(vec![s("keys"), s("o")]),
        op(GET_VARIABLE),
        op(ENUMERATE2),
        push(vec![n(3.0)]),
        op(INIT_ARRAY),
        op(SET_VARIABLE),
    ];
    run(&mut avm, root, records).unwrap();
    let keys = avm.get(root, "keys").unwrap().as_object().unwrap();
    assert_eq!(avm.get(keys, "0").unwrap(), Value::from("k2"));
    assert_eq!(avm.get(keys, "1").unwrap(), Value::from("k1"));
    assert_eq!(avm.get(keys, "2").unwrap(), Value::Null);
}
