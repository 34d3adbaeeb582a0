//! Host integration tests: trace output, timeline navigation, getURL and fscommand

use super::*;
use flashvm::Value;

#[test]
fn test_trace_converts_to_string() {
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    let records = vec![
        push(vec![s("hello")]),
        op(TRACE),
        push(vec![n(1.5)]),
        op(TRACE),
        push(vec![ActionArg::Undefined]),
        op(TRACE),
    ];
    run(&mut avm, root, records).unwrap();
    assert_eq!(*log.borrow(), vec!["trace hello", "trace 1.5", "trace undefined"]);
}

#[test]
fn test_goto_frame_is_one_based_for_the_host() {
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    run(&mut avm, root, vec![ActionRecord::new(GOTO_FRAME, vec![n(0.0)])]).unwrap();
    assert_eq!(*log.borrow(), vec![format!("goto {:?} Number(1) false", root)]);
}

#[test]
fn test_goto_frame2_with_number_and_play_flag() {
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    let records = vec![push(vec![n(7.0)]), ActionRecord::new(GOTO_FRAME2, vec![n(1.0)])];
    run(&mut avm, root, records).unwrap();
    assert_eq!(*log.borrow(), vec![format!("goto {:?} Number(7) true", root)]);
}

#[test]
fn test_goto_frame2_path_and_label() {
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    let a = avm.create_movie_clip(Some(root), "a");
    let records = vec![
        push(vec![s("/a:intro")]),
        ActionRecord::new(GOTO_FRAME2, vec![n(0.0)]),
        push(vec![s("12")]),
        ActionRecord::new(GOTO_FRAME2, vec![n(0.0)]),
    ];
    run(&mut avm, root, records).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            format!("goto {:?} Label(\"intro\") false", a),
            format!("goto {:?} Number(12) false", root),
        ]
    );
}

#[test]
fn test_get_url_and_fscommand() {
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    let records = vec![
        ActionRecord::new(GET_URL, vec![s("http://example.com/"), s("_blank")]),
        ActionRecord::new(GET_URL, vec![s("FSCommand:quit"), s("true")]),
        // getURL2 with the values on the stack
        push(vec![s("fscommand:fullscreen"), s("false")]),
        ActionRecord::new(0x9A, vec![n(0.0)]),
    ];
    run(&mut avm, root, records).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            "getURL http://example.com/ _blank",
            "fscommand quit true",
            "fscommand fullscreen false",
        ]
    );
}

#[test]
fn test_movie_clip_methods_reach_the_host() {
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    let a = avm.create_movie_clip(Some(root), "a");
    // a.gotoAndStop(3); a.gotoAndPlay("loop");
    let records = vec![
        push(vec![n(3.0), n(1.0), s("a")]),
        op(GET_VARIABLE),
        push(vec![s("gotoAndStop")]),
        op(CALL_METHOD),
        op(0x17),
        push(vec![s("loop"), n(1.0), s("a")]),
        op(GET_VARIABLE),
        push(vec![s("gotoAndPlay")]),
        op(CALL_METHOD),
        op(0x17),
    ];
    run(&mut avm, root, records).unwrap();
    assert_eq!(
        *log.borrow(),
        vec![
            format!("goto {:?} Number(3) false", a),
            format!("goto {:?} Label(\"loop\") true", a),
        ]
    );
}

#[test]
fn test_host_call_into_function_object() {
    // the host runs a handler defined by the movie
    let (mut avm, root, log) = create_recording_runtime(Settings::default());
    let body = vec![push(vec![s("clicked")]), op(TRACE)];
    run(&mut avm, root, vec![define_function("onPress", &[], body)]).unwrap();
    let handler = avm.get(root, "onPress").unwrap().as_object().unwrap();
    assert_eq!(avm.execute_function(handler, Value::Object(root), &[]).unwrap(), Value::Undefined);
    assert_eq!(*log.borrow(), vec!["trace clicked"]);
}
