//! Error handling tests: recovery, fatal limits and the prohibition latch

use super::*;
use flashvm::{AvmError, Value};

/// `MovieClip.prototype.play()` called on the prototype itself, which is not
/// a clip: a recoverable TypeError.
fn faulting_call() -> Vec<ActionRecord> {
    vec![
        push(vec![n(0.0), s("MovieClip")]),
        op(GET_VARIABLE),
        push(vec![s("prototype")]),
        op(GET_MEMBER),
        push(vec![s("play")]),
        op(CALL_METHOD),
        op(0x17),
    ]
}

#[test]
fn test_recoverable_fault_is_absorbed() {
    let mut records = faulting_call();
    records.extend(set_var("after", n(1.0)));
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "after").unwrap(), Value::Number(1.0));
    assert!(!avm.is_execution_prohibited());
}

#[test]
fn test_faults_propagate_when_rethrown() {
    let settings = Settings {
        errors_rethrown: true,
        ..Settings::default()
    };
    let mut records = faulting_call();
    records.extend(set_var("after", n(1.0)));
    let (mut avm, root) = create_runtime_with(settings);
    let err = run(&mut avm, root, records).unwrap_err();
    assert!(matches!(err, AvmError::TypeError { .. }), "got {:?}", err);
    assert_eq!(avm.get(root, "after").unwrap(), Value::Undefined);
    assert!(!avm.is_execution_prohibited());
}

#[test]
fn test_error_budget_is_fatal() {
    let settings = Settings {
        max_errors: 2,
        ..Settings::default()
    };
    // separate the faults so each one starts a new error run
    let mut records = Vec::new();
    for _ in 0..3 {
        records.extend(faulting_call());
        records.extend(set_var("ok", n(1.0)));
    }
    let (mut avm, root) = create_runtime_with(settings);
    let err = run(&mut avm, root, records).unwrap_err();
    assert!(err.is_critical());
    assert!(err.to_string().contains("errors limit"));
    assert!(avm.is_execution_prohibited());
}

#[test]
fn test_hang_timeout_is_fatal_and_latches() {
    let (mut avm, root) = create_test_runtime();
    avm.set_hang_timeout_ms(Some(0));
    let err = run(&mut avm, root, vec![jump(-1.0)]).unwrap_err();
    assert!(err.is_critical());
    assert!(err.to_string().contains("hang timeout"));
    assert!(avm.is_execution_prohibited());

    // every later run is a no-op
    run(&mut avm, root, set_var("r", n(1.0))).unwrap();
    assert_eq!(avm.get(root, "r").unwrap(), Value::Undefined);
}

#[test]
fn test_no_timeout_lets_long_loops_finish() {
    let (mut avm, root) = create_test_runtime();
    avm.set_hang_timeout_ms(None);
    // count to 5000
    let mut records = set_var("i", n(0.0));
    records.extend([
        push(vec![s("i"), s("i")]),
        op(GET_VARIABLE),
        op(INCREMENT),
        op(SET_VARIABLE),
        push(vec![s("i")]),
        op(GET_VARIABLE),
        push(vec![n(5000.0)]),
        op(LESS2),
        branch_if(-9.0),
    ]);
    run(&mut avm, root, records).unwrap();
    assert_eq!(avm.get(root, "i").unwrap(), Value::Number(5000.0));
}

/// `depth = 0; function f() { depth++; f(); } f();`
fn runaway_recursion() -> Vec<ActionRecord> {
    let body = vec![
        push(vec![s("depth"), s("depth")]),
        op(GET_VARIABLE),
        op(INCREMENT),
        op(SET_VARIABLE),
        push(vec![n(0.0), s("f")]),
        op(CALL_FUNCTION),
    ];
    let mut records = set_var("depth", n(0.0));
    records.push(define_function("f", &[], body));
    records.push(push(vec![n(0.0), s("f")]));
    records.push(op(CALL_FUNCTION));
    records
}

#[test]
fn test_recursion_limit() {
    let (mut avm, root) = create_test_runtime();
    let err = run(&mut avm, root, runaway_recursion()).unwrap_err();
    assert!(err.is_critical());
    assert!(err.to_string().contains("recursion limit"));
    // the 256th nested call is refused before its body runs
    assert_eq!(avm.get(root, "depth").unwrap(), Value::Number(255.0));
    assert!(avm.is_execution_prohibited());
}

#[test]
fn test_recursion_limit_is_configurable() {
    let settings = Settings {
        max_stack_depth: 10,
        ..Settings::default()
    };
    let (mut avm, root) = create_runtime_with(settings);
    let err = run(&mut avm, root, runaway_recursion()).unwrap_err();
    assert!(err.is_critical());
    assert_eq!(avm.get(root, "depth").unwrap(), Value::Number(9.0));
}

#[test]
fn test_unknown_action_is_fatal() {
    let (mut avm, root) = create_test_runtime();
    let err = run(&mut avm, root, vec![op(0x01)]).unwrap_err();
    assert!(err.is_critical());
    assert!(avm.is_execution_prohibited());
}

#[test]
fn test_malformed_record_is_rejected_before_running() {
    let err = ActionsData::from_records(&[ActionRecord::new(PUSH, vec![ActionArg::Body(vec![])])]).unwrap_err();
    assert!(matches!(err, AvmError::InvalidAction { code: 0x96, .. }));

    let err = ActionsData::from_json("[{\"code\": \"x\"}]").unwrap_err();
    assert!(matches!(err, AvmError::InvalidAction { .. }));
}

#[test]
fn test_host_call_after_prohibition_returns_undefined() {
    let (mut avm, root) = create_test_runtime();
    run(&mut avm, root, vec![define_function("f", &[], vec![push(vec![n(1.0)]), op(RETURN)])]).unwrap();
    let f = avm.get(root, "f").unwrap().as_object().unwrap();
    assert_eq!(avm.execute_function(f, Value::Undefined, &[]).unwrap(), Value::Number(1.0));

    avm.set_hang_timeout_ms(Some(0));
    let _ = run(&mut avm, root, vec![jump(-1.0)]);
    assert!(avm.is_execution_prohibited());
    assert_eq!(avm.execute_function(f, Value::Undefined, &[]).unwrap(), Value::Undefined);
}
