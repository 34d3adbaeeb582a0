//! Integration tests for the AVM1 interpreter, organized by feature
//!
//! Programs are built from action records with the helpers below and run on
//! a `_level0` root clip through the public API.

mod coerce;
mod control_flow;
mod errors;
mod function;
mod gc;
mod host;
mod property;
mod scope;

use std::cell::RefCell;
use std::rc::Rc;

use flashvm::platform::SendVarsMethod;
use flashvm::{ActionArg, ActionHost, ActionRecord, ActionsData, Avm1, AvmResult, FrameRef, ObjectId, Settings, Value};

// Action codes used by the tests
pub const TRACE: u8 = 0x26;
pub const ADD: u8 = 0x0A;
pub const DIVIDE: u8 = 0x0D;
pub const EQUALS: u8 = 0x0E;
pub const NOT: u8 = 0x12;
pub const POP: u8 = 0x17;
pub const GET_VARIABLE: u8 = 0x1C;
pub const SET_VARIABLE: u8 = 0x1D;
pub const THROW: u8 = 0x2A;
pub const CALL_FUNCTION: u8 = 0x3D;
pub const RETURN: u8 = 0x3E;
pub const NEW_OBJECT: u8 = 0x40;
pub const DEFINE_LOCAL: u8 = 0x3C;
pub const INIT_ARRAY: u8 = 0x42;
pub const INIT_OBJECT: u8 = 0x43;
pub const TYPE_OF: u8 = 0x44;
pub const ENUMERATE2: u8 = 0x55;
pub const ADD2: u8 = 0x47;
pub const LESS2: u8 = 0x48;
pub const EQUALS2: u8 = 0x49;
pub const GET_MEMBER: u8 = 0x4E;
pub const SET_MEMBER: u8 = 0x4F;
pub const INCREMENT: u8 = 0x50;
pub const CALL_METHOD: u8 = 0x52;
pub const INSTANCE_OF: u8 = 0x54;
pub const STRICT_EQUALS: u8 = 0x66;
pub const EXTENDS: u8 = 0x69;
pub const GOTO_FRAME: u8 = 0x81;
pub const GET_URL: u8 = 0x83;
pub const STORE_REGISTER: u8 = 0x87;
pub const CONSTANT_POOL: u8 = 0x88;
pub const SET_TARGET: u8 = 0x8B;
pub const DEFINE_FUNCTION2: u8 = 0x8E;
pub const TRY: u8 = 0x8F;
pub const WITH: u8 = 0x94;
pub const PUSH: u8 = 0x96;
pub const JUMP: u8 = 0x99;
pub const DEFINE_FUNCTION: u8 = 0x9B;
pub const IF: u8 = 0x9D;
pub const GOTO_FRAME2: u8 = 0x9F;

pub fn s(value: &str) -> ActionArg {
    ActionArg::String(value.to_string())
}

pub fn n(value: f64) -> ActionArg {
    ActionArg::Number(value)
}

pub fn push(values: Vec<ActionArg>) -> ActionRecord {
    ActionRecord::new(PUSH, values)
}

pub fn op(code: u8) -> ActionRecord {
    ActionRecord::simple(code)
}

pub fn jump(offset: f64) -> ActionRecord {
    ActionRecord::new(JUMP, vec![n(offset)])
}

pub fn branch_if(offset: f64) -> ActionRecord {
    ActionRecord::new(IF, vec![n(offset)])
}

/// `name = value` for a constant value.
pub fn set_var(name: &str, value: ActionArg) -> Vec<ActionRecord> {
    vec![push(vec![s(name), value]), op(SET_VARIABLE)]
}

/// `DefineFunction name(params) { body }`
pub fn define_function(name: &str, params: &[&str], body: Vec<ActionRecord>) -> ActionRecord {
    ActionRecord::new(
        DEFINE_FUNCTION,
        vec![
            s(name),
            ActionArg::Strings(params.iter().map(|p| p.to_string()).collect()),
            ActionArg::Body(body),
        ],
    )
}

/// Create a context with default settings and a `_level0` root clip.
pub fn create_test_runtime() -> (Avm1, ObjectId) {
    create_runtime_with(Settings::default())
}

pub fn create_runtime_with(settings: Settings) -> (Avm1, ObjectId) {
    let mut avm = Avm1::new(settings);
    let root = avm.create_root_movie_clip(0);
    (avm, root)
}

/// Run `records` on `target`.
pub fn run(avm: &mut Avm1, target: ObjectId, records: Vec<ActionRecord>) -> AvmResult<()> {
    let actions = ActionsData::from_records(&records)?;
    avm.execute_actions(&actions, target)
}

/// Run `records` on a fresh root clip and return the root variable `name`.
#[allow(clippy::expect_used)]
pub fn eval_var(settings: Settings, records: Vec<ActionRecord>, name: &str) -> Value {
    let (mut avm, root) = create_runtime_with(settings);
    run(&mut avm, root, records).expect("run failed");
    avm.get(root, name).expect("get failed")
}

/// Shared log of host calls.
pub type HostLog = Rc<RefCell<Vec<String>>>;

/// Host that records trace output, navigation and network calls.
pub struct RecordingHost {
    log: HostLog,
}

impl ActionHost for RecordingHost {
    fn goto_frame(&mut self, clip: ObjectId, frame: FrameRef, play: bool) {
        self.log
            .borrow_mut()
            .push(format!("goto {:?} {:?} {}", clip, frame, play));
    }

    fn get_url(&mut self, url: &str, target: &str, _method: SendVarsMethod) {
        self.log.borrow_mut().push(format!("getURL {} {}", url, target));
    }

    fn fscommand(&mut self, command: &str, args: &str) {
        self.log.borrow_mut().push(format!("fscommand {} {}", command, args));
    }

    fn trace(&mut self, message: &str) {
        self.log.borrow_mut().push(format!("trace {}", message));
    }
}

pub fn create_recording_runtime(settings: Settings) -> (Avm1, ObjectId, HostLog) {
    let log = HostLog::default();
    let host = RecordingHost { log: Rc::clone(&log) };
    let mut avm = Avm1::with_host(settings, Box::new(host));
    let root = avm.create_root_movie_clip(0);
    (avm, root, log)
}
