//! Action records and their typed form
//!
//! Binary SWF decoding happens elsewhere; this crate consumes already decoded
//! `(code, args)` records, e.g. from JSON:
//!
//! ```json
//! { "code": 150, "args": [ { "type": "string", "value": "x" } ] }
//! ```
//!
//! Records are validated once into `Action` values. Branch operands are
//! counted in actions, not bytes: `Jump { offset: 0 }` falls through and
//! `offset: -1` jumps to itself.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::analyzer::AnalyzerResults;
use super::wellknown::WellKnown;
use crate::error::{AvmError, AvmResult};
use crate::value::{AvmString, Value};

/// One decoded action as produced by a SWF tag reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub code: u8,
    #[serde(default)]
    pub args: Vec<ActionArg>,
}

impl ActionRecord {
    pub fn new(code: u8, args: Vec<ActionArg>) -> Self {
        Self { code, args }
    }

    pub fn simple(code: u8) -> Self {
        Self::new(code, Vec::new())
    }
}

/// A register-bound DefineFunction2 parameter; register 0 means "not in a
/// register".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterParam {
    pub register: u8,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ActionArg {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Register(u8),
    Constant(u16),
    Strings(Vec<String>),
    Params(Vec<RegisterParam>),
    Body(Vec<ActionRecord>),
}

bitflags! {
    /// Special values a DefineFunction2 body can receive, either preloaded
    /// into registers or suppressed as locals.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ArgumentAssignmentType: u8 {
        const ARGUMENT = 1;
        const THIS = 2;
        const ARGUMENTS = 4;
        const SUPER = 8;
        const GLOBAL = 16;
        const PARENT = 32;
        const ROOT = 64;
    }
}

/// What a register of a DefineFunction2 body starts out holding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterAllocation {
    /// The argument at this index
    Argument(usize),
    This,
    Arguments,
    Super,
    Global,
    Parent,
    Root,
}

/// Everything DefineFunction/DefineFunction2 carry.
#[derive(Debug)]
pub struct FunctionDefinition {
    pub name: AvmString,
    pub params: Vec<AvmString>,
    pub register_count: usize,
    /// Indexed by register number
    pub registers_allocation: Vec<Option<RegisterAllocation>>,
    pub suppress: ArgumentAssignmentType,
    pub body: Rc<ActionsData>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatchTarget {
    Register(u8),
    Variable(AvmString),
}

#[derive(Debug)]
pub struct TryBlock {
    pub catch_target: CatchTarget,
    pub try_body: Rc<ActionsData>,
    pub catch_body: Option<Rc<ActionsData>>,
    pub finally_body: Option<Rc<ActionsData>>,
}

#[derive(Debug, Clone)]
pub enum PushValue {
    Value(Value),
    Register(u8),
    Constant(u16),
}

/// How GetURL2 sends variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetUrlFlags(pub u8);

impl GetUrlFlags {
    pub fn load_target(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub fn load_variables(self) -> bool {
        self.0 & 0x80 != 0
    }
}

/// A validated action.
#[derive(Debug)]
pub enum Action {
    /// 0x00 end-of-actions marker
    End,
    // SWF 3
    NextFrame,
    PrevFrame,
    Play,
    Stop,
    ToggleQuality,
    StopSounds,
    GotoFrame { frame: u32 },
    GetUrl { url: AvmString, target: AvmString },
    WaitForFrame { frame: u32, skip_count: usize },
    SetTarget { target: AvmString },
    GotoLabel { label: AvmString },
    // SWF 4
    Push(Vec<PushValue>),
    Pop,
    Add,
    Subtract,
    Multiply,
    Divide,
    Equals,
    Less,
    And,
    Or,
    Not,
    StringEquals,
    StringLength,
    MbStringLength,
    StringAdd,
    StringExtract,
    MbStringExtract,
    StringLess,
    ToInteger,
    CharToAscii,
    MbCharToAscii,
    AsciiToChar,
    MbAsciiToChar,
    Jump { offset: i32 },
    If { offset: i32 },
    Call,
    GetVariable,
    SetVariable,
    GetUrl2 { flags: GetUrlFlags },
    GotoFrame2 { play: bool, scene_bias: Option<u16> },
    SetTarget2,
    GetProperty,
    SetProperty,
    CloneSprite,
    RemoveSprite,
    StartDrag,
    EndDrag,
    WaitForFrame2 { skip_count: usize },
    Trace,
    GetTime,
    RandomNumber,
    // SWF 5
    CallFunction,
    CallMethod,
    ConstantPool(Rc<[Value]>),
    DefineFunction(Rc<FunctionDefinition>),
    DefineLocal,
    DefineLocal2,
    Delete,
    Delete2,
    Enumerate,
    Equals2,
    GetMember,
    InitArray,
    InitObject,
    NewMethod,
    NewObject,
    SetMember,
    TargetPath,
    With { body: Rc<ActionsData> },
    ToNumber,
    ToString,
    TypeOf,
    Add2,
    Less2,
    Modulo,
    BitAnd,
    BitLShift,
    BitOr,
    BitRShift,
    BitURShift,
    BitXor,
    Decrement,
    Increment,
    PushDuplicate,
    Return,
    StackSwap,
    StoreRegister { register: u8 },
    // SWF 6
    InstanceOf,
    Enumerate2,
    StrictEquals,
    Greater,
    StringGreater,
    // SWF 7
    DefineFunction2(Rc<FunctionDefinition>),
    Extends,
    CastOp,
    ImplementsOp,
    Try(Rc<TryBlock>),
    Throw,
    // Undocumented
    FsCommand2,
    StrictMode { mode: u8 },
    /// Decoded but not executable; running it is fatal
    Unknown { code: u8 },
}

/// Argument cursor used while validating one record.
struct Args<'a> {
    code: u8,
    args: &'a [ActionArg],
}

impl<'a> Args<'a> {
    fn get(&self, index: usize) -> AvmResult<&'a ActionArg> {
        self.args
            .get(index)
            .ok_or_else(|| AvmError::invalid_action(self.code, format!("missing argument {}", index)))
    }

    fn mismatch(&self, index: usize, expected: &str) -> AvmError {
        AvmError::invalid_action(self.code, format!("argument {} is not {}", index, expected))
    }

    fn number(&self, index: usize) -> AvmResult<f64> {
        match self.get(index)? {
            ActionArg::Number(n) => Ok(*n),
            ActionArg::Register(r) => Ok(f64::from(*r)),
            ActionArg::Constant(c) => Ok(f64::from(*c)),
            ActionArg::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            _ => Err(self.mismatch(index, "a number")),
        }
    }

    fn optional_number(&self, index: usize) -> AvmResult<Option<f64>> {
        if index < self.args.len() {
            self.number(index).map(Some)
        } else {
            Ok(None)
        }
    }

    fn string(&self, index: usize) -> AvmResult<AvmString> {
        match self.get(index)? {
            ActionArg::String(s) => Ok(AvmString::from(s.as_str())),
            _ => Err(self.mismatch(index, "a string")),
        }
    }

    fn strings(&self, index: usize) -> AvmResult<&'a [String]> {
        match self.get(index)? {
            ActionArg::Strings(list) => Ok(list),
            _ => Err(self.mismatch(index, "a string list")),
        }
    }

    fn body(&self, index: usize) -> AvmResult<Rc<ActionsData>> {
        match self.get(index)? {
            ActionArg::Body(records) => ActionsData::from_records(records),
            _ => Err(self.mismatch(index, "an action body")),
        }
    }
}

fn clamp_u32(n: f64) -> u32 {
    if n.is_nan() || n <= 0.0 {
        0
    } else {
        n.min(f64::from(u32::MAX)) as u32
    }
}

fn clamp_offset(n: f64) -> i32 {
    if n.is_nan() {
        0
    } else {
        n.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    }
}

impl Action {
    /// Validate a record. Unknown codes decode to `Action::Unknown`; known
    /// codes with malformed arguments are an `InvalidAction` error.
    pub fn decode(record: &ActionRecord) -> AvmResult<Action> {
        let a = Args {
            code: record.code,
            args: &record.args,
        };
        let action = match record.code {
            0x00 => Action::End,
            0x04 => Action::NextFrame,
            0x05 => Action::PrevFrame,
            0x06 => Action::Play,
            0x07 => Action::Stop,
            0x08 => Action::ToggleQuality,
            0x09 => Action::StopSounds,
            0x0A => Action::Add,
            0x0B => Action::Subtract,
            0x0C => Action::Multiply,
            0x0D => Action::Divide,
            0x0E => Action::Equals,
            0x0F => Action::Less,
            0x10 => Action::And,
            0x11 => Action::Or,
            0x12 => Action::Not,
            0x13 => Action::StringEquals,
            0x14 => Action::StringLength,
            0x15 => Action::StringExtract,
            0x17 => Action::Pop,
            0x18 => Action::ToInteger,
            0x1C => Action::GetVariable,
            0x1D => Action::SetVariable,
            0x20 => Action::SetTarget2,
            0x21 => Action::StringAdd,
            0x22 => Action::GetProperty,
            0x23 => Action::SetProperty,
            0x24 => Action::CloneSprite,
            0x25 => Action::RemoveSprite,
            0x26 => Action::Trace,
            0x27 => Action::StartDrag,
            0x28 => Action::EndDrag,
            0x29 => Action::StringLess,
            0x2A => Action::Throw,
            0x2B => Action::CastOp,
            0x2C => Action::ImplementsOp,
            0x2D => Action::FsCommand2,
            0x30 => Action::RandomNumber,
            0x31 => Action::MbStringLength,
            0x32 => Action::CharToAscii,
            0x33 => Action::AsciiToChar,
            0x34 => Action::GetTime,
            0x35 => Action::MbStringExtract,
            0x36 => Action::MbCharToAscii,
            0x37 => Action::MbAsciiToChar,
            0x3A => Action::Delete,
            0x3B => Action::Delete2,
            0x3C => Action::DefineLocal,
            0x3D => Action::CallFunction,
            0x3E => Action::Return,
            0x3F => Action::Modulo,
            0x40 => Action::NewObject,
            0x41 => Action::DefineLocal2,
            0x42 => Action::InitArray,
            0x43 => Action::InitObject,
            0x44 => Action::TypeOf,
            0x45 => Action::TargetPath,
            0x46 => Action::Enumerate,
            0x47 => Action::Add2,
            0x48 => Action::Less2,
            0x49 => Action::Equals2,
            0x4A => Action::ToNumber,
            0x4B => Action::ToString,
            0x4C => Action::PushDuplicate,
            0x4D => Action::StackSwap,
            0x4E => Action::GetMember,
            0x4F => Action::SetMember,
            0x50 => Action::Increment,
            0x51 => Action::Decrement,
            0x52 => Action::CallMethod,
            0x53 => Action::NewMethod,
            0x54 => Action::InstanceOf,
            0x55 => Action::Enumerate2,
            0x60 => Action::BitAnd,
            0x61 => Action::BitOr,
            0x62 => Action::BitXor,
            0x63 => Action::BitLShift,
            0x64 => Action::BitRShift,
            0x65 => Action::BitURShift,
            0x66 => Action::StrictEquals,
            0x67 => Action::Greater,
            0x68 => Action::StringGreater,
            0x69 => Action::Extends,
            0x81 => Action::GotoFrame {
                frame: clamp_u32(a.number(0)?),
            },
            0x83 => Action::GetUrl {
                url: a.string(0)?,
                target: a.string(1)?,
            },
            0x87 => Action::StoreRegister {
                register: clamp_u32(a.number(0)?).min(255) as u8,
            },
            0x88 => Action::ConstantPool(
                a.strings(0)?
                    .iter()
                    .map(|s| Value::from(s.as_str()))
                    .collect(),
            ),
            0x89 => Action::StrictMode {
                mode: clamp_u32(a.number(0)?).min(255) as u8,
            },
            0x8A => Action::WaitForFrame {
                frame: clamp_u32(a.number(0)?),
                skip_count: clamp_u32(a.number(1)?) as usize,
            },
            0x8B => Action::SetTarget {
                target: a.string(0)?,
            },
            0x8C => Action::GotoLabel {
                label: a.string(0)?,
            },
            0x8D => Action::WaitForFrame2 {
                skip_count: clamp_u32(a.number(0)?) as usize,
            },
            0x8E => Action::DefineFunction2(Rc::new(decode_define_function2(&a)?)),
            0x8F => Action::Try(Rc::new(decode_try(&a)?)),
            0x94 => Action::With { body: a.body(0)? },
            0x96 => Action::Push(decode_push(&a)?),
            0x99 => Action::Jump {
                offset: clamp_offset(a.number(0)?),
            },
            0x9A => Action::GetUrl2 {
                flags: GetUrlFlags(clamp_u32(a.number(0)?).min(255) as u8),
            },
            0x9B => Action::DefineFunction(Rc::new(FunctionDefinition {
                name: a.string(0)?,
                params: a.strings(1)?.iter().map(|s| AvmString::from(s.as_str())).collect(),
                register_count: super::context::DEFAULT_REGISTER_COUNT,
                registers_allocation: Vec::new(),
                suppress: ArgumentAssignmentType::empty(),
                body: a.body(2)?,
            })),
            0x9D => Action::If {
                offset: clamp_offset(a.number(0)?),
            },
            0x9E => Action::Call,
            0x9F => {
                let flags = clamp_u32(a.number(0)?);
                let scene_bias = if flags & 2 != 0 {
                    a.optional_number(1)?.map(|n| clamp_u32(n).min(0xFFFF) as u16)
                } else {
                    None
                };
                Action::GotoFrame2 {
                    play: flags & 1 != 0,
                    scene_bias,
                }
            }
            code => Action::Unknown { code },
        };
        Ok(action)
    }

    /// Action code this action was decoded from.
    pub fn code(&self) -> u8 {
        match self {
            Action::End => 0x00,
            Action::NextFrame => 0x04,
            Action::PrevFrame => 0x05,
            Action::Play => 0x06,
            Action::Stop => 0x07,
            Action::ToggleQuality => 0x08,
            Action::StopSounds => 0x09,
            Action::Add => 0x0A,
            Action::Subtract => 0x0B,
            Action::Multiply => 0x0C,
            Action::Divide => 0x0D,
            Action::Equals => 0x0E,
            Action::Less => 0x0F,
            Action::And => 0x10,
            Action::Or => 0x11,
            Action::Not => 0x12,
            Action::StringEquals => 0x13,
            Action::StringLength => 0x14,
            Action::StringExtract => 0x15,
            Action::Pop => 0x17,
            Action::ToInteger => 0x18,
            Action::GetVariable => 0x1C,
            Action::SetVariable => 0x1D,
            Action::SetTarget2 => 0x20,
            Action::StringAdd => 0x21,
            Action::GetProperty => 0x22,
            Action::SetProperty => 0x23,
            Action::CloneSprite => 0x24,
            Action::RemoveSprite => 0x25,
            Action::Trace => 0x26,
            Action::StartDrag => 0x27,
            Action::EndDrag => 0x28,
            Action::StringLess => 0x29,
            Action::Throw => 0x2A,
            Action::CastOp => 0x2B,
            Action::ImplementsOp => 0x2C,
            Action::FsCommand2 => 0x2D,
            Action::RandomNumber => 0x30,
            Action::MbStringLength => 0x31,
            Action::CharToAscii => 0x32,
            Action::AsciiToChar => 0x33,
            Action::GetTime => 0x34,
            Action::MbStringExtract => 0x35,
            Action::MbCharToAscii => 0x36,
            Action::MbAsciiToChar => 0x37,
            Action::Delete => 0x3A,
            Action::Delete2 => 0x3B,
            Action::DefineLocal => 0x3C,
            Action::CallFunction => 0x3D,
            Action::Return => 0x3E,
            Action::Modulo => 0x3F,
            Action::NewObject => 0x40,
            Action::DefineLocal2 => 0x41,
            Action::InitArray => 0x42,
            Action::InitObject => 0x43,
            Action::TypeOf => 0x44,
            Action::TargetPath => 0x45,
            Action::Enumerate => 0x46,
            Action::Add2 => 0x47,
            Action::Less2 => 0x48,
            Action::Equals2 => 0x49,
            Action::ToNumber => 0x4A,
            Action::ToString => 0x4B,
            Action::PushDuplicate => 0x4C,
            Action::StackSwap => 0x4D,
            Action::GetMember => 0x4E,
            Action::SetMember => 0x4F,
            Action::Increment => 0x50,
            Action::Decrement => 0x51,
            Action::CallMethod => 0x52,
            Action::NewMethod => 0x53,
            Action::InstanceOf => 0x54,
            Action::Enumerate2 => 0x55,
            Action::BitAnd => 0x60,
            Action::BitOr => 0x61,
            Action::BitXor => 0x62,
            Action::BitLShift => 0x63,
            Action::BitRShift => 0x64,
            Action::BitURShift => 0x65,
            Action::StrictEquals => 0x66,
            Action::Greater => 0x67,
            Action::StringGreater => 0x68,
            Action::Extends => 0x69,
            Action::GotoFrame { .. } => 0x81,
            Action::GetUrl { .. } => 0x83,
            Action::StoreRegister { .. } => 0x87,
            Action::ConstantPool(_) => 0x88,
            Action::StrictMode { .. } => 0x89,
            Action::WaitForFrame { .. } => 0x8A,
            Action::SetTarget { .. } => 0x8B,
            Action::GotoLabel { .. } => 0x8C,
            Action::WaitForFrame2 { .. } => 0x8D,
            Action::DefineFunction2(_) => 0x8E,
            Action::Try(_) => 0x8F,
            Action::With { .. } => 0x94,
            Action::Push(_) => 0x96,
            Action::Jump { .. } => 0x99,
            Action::GetUrl2 { .. } => 0x9A,
            Action::DefineFunction(_) => 0x9B,
            Action::If { .. } => 0x9D,
            Action::Call => 0x9E,
            Action::GotoFrame2 { .. } => 0x9F,
            Action::Unknown { code } => *code,
        }
    }

    /// Branch offset of Jump/If, in actions relative to the next action.
    pub fn branch_offset(&self) -> Option<i32> {
        match self {
            Action::Jump { offset } | Action::If { offset } => Some(*offset),
            _ => None,
        }
    }
}

fn decode_push(a: &Args<'_>) -> AvmResult<Vec<PushValue>> {
    a.args
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            Ok(match arg {
                ActionArg::Undefined => PushValue::Value(Value::Undefined),
                ActionArg::Null => PushValue::Value(Value::Null),
                ActionArg::Boolean(b) => PushValue::Value(Value::Boolean(*b)),
                ActionArg::Number(n) => PushValue::Value(Value::Number(*n)),
                ActionArg::String(s) => PushValue::Value(Value::from(s.as_str())),
                ActionArg::Register(r) => PushValue::Register(*r),
                ActionArg::Constant(c) => PushValue::Constant(*c),
                _ => return Err(a.mismatch(i, "a push value")),
            })
        })
        .collect()
}

const PRELOAD_THIS: u32 = 0x0001;
const SUPPRESS_THIS: u32 = 0x0002;
const PRELOAD_ARGUMENTS: u32 = 0x0004;
const SUPPRESS_ARGUMENTS: u32 = 0x0008;
const PRELOAD_SUPER: u32 = 0x0010;
const SUPPRESS_SUPER: u32 = 0x0020;
const PRELOAD_ROOT: u32 = 0x0040;
const PRELOAD_PARENT: u32 = 0x0080;
const PRELOAD_GLOBAL: u32 = 0x0100;

/// DefineFunction2 args: name, register count, flags, params, body.
fn decode_define_function2(a: &Args<'_>) -> AvmResult<FunctionDefinition> {
    let name = a.string(0)?;
    let register_count = clamp_u32(a.number(1)?) as usize;
    let flags = clamp_u32(a.number(2)?);
    let params = match a.get(3)? {
        ActionArg::Params(params) => params.as_slice(),
        _ => return Err(a.mismatch(3, "a parameter list")),
    };
    let body = a.body(4)?;

    let mut registers_allocation: Vec<Option<RegisterAllocation>> = Vec::new();
    let mut allocate = |register: usize, allocation: RegisterAllocation| {
        if registers_allocation.len() <= register {
            registers_allocation.resize(register + 1, None);
        }
        if let Some(slot) = registers_allocation.get_mut(register) {
            *slot = Some(allocation);
        }
    };
    for (index, param) in params.iter().enumerate() {
        if param.register != 0 {
            allocate(usize::from(param.register), RegisterAllocation::Argument(index));
        }
    }
    let mut next_register = 1;
    for (flag, allocation) in [
        (PRELOAD_THIS, RegisterAllocation::This),
        (PRELOAD_ARGUMENTS, RegisterAllocation::Arguments),
        (PRELOAD_SUPER, RegisterAllocation::Super),
        (PRELOAD_ROOT, RegisterAllocation::Root),
        (PRELOAD_PARENT, RegisterAllocation::Parent),
        (PRELOAD_GLOBAL, RegisterAllocation::Global),
    ] {
        if flags & flag != 0 {
            allocate(next_register, allocation);
            next_register += 1;
        }
    }

    let mut suppress = ArgumentAssignmentType::empty();
    suppress.set(ArgumentAssignmentType::THIS, flags & SUPPRESS_THIS != 0);
    suppress.set(ArgumentAssignmentType::ARGUMENTS, flags & SUPPRESS_ARGUMENTS != 0);
    suppress.set(ArgumentAssignmentType::SUPER, flags & SUPPRESS_SUPER != 0);

    Ok(FunctionDefinition {
        name,
        params: params.iter().map(|p| AvmString::from(p.name.as_str())).collect(),
        register_count,
        registers_allocation,
        suppress,
        body,
    })
}

const TRY_HAS_CATCH: u32 = 0x01;
const TRY_HAS_FINALLY: u32 = 0x02;

/// Try args: flags, catch target (name or register), try, catch and
/// finally bodies. Bodies absent from the flags may be omitted.
fn decode_try(a: &Args<'_>) -> AvmResult<TryBlock> {
    let flags = clamp_u32(a.number(0)?);
    let catch_target = match a.get(1)? {
        ActionArg::Register(r) => CatchTarget::Register(*r),
        ActionArg::String(s) => CatchTarget::Variable(AvmString::from(s.as_str())),
        _ => return Err(a.mismatch(1, "a catch target")),
    };
    let try_body = a.body(2)?;
    let catch_body = if flags & TRY_HAS_CATCH != 0 {
        Some(a.body(3)?)
    } else {
        None
    };
    let finally_body = if flags & TRY_HAS_FINALLY != 0 {
        Some(a.body(4)?)
    } else {
        None
    };
    Ok(TryBlock {
        catch_target,
        try_body,
        catch_body,
        finally_body,
    })
}

static NEXT_ACTIONS_ID: AtomicU64 = AtomicU64::new(1);

/// An immutable action blob plus its compile-once caches.
pub struct ActionsData {
    pub id: u64,
    pub actions: Vec<Action>,
    pub(crate) ir: OnceCell<Rc<AnalyzerResults>>,
    pub(crate) wellknown: OnceCell<Option<WellKnown>>,
}

impl ActionsData {
    pub fn new(actions: Vec<Action>) -> Rc<Self> {
        Rc::new(Self {
            id: NEXT_ACTIONS_ID.fetch_add(1, Ordering::Relaxed),
            actions,
            ir: OnceCell::new(),
            wellknown: OnceCell::new(),
        })
    }

    /// Validate a record list (recursively for nested bodies).
    pub fn from_records(records: &[ActionRecord]) -> AvmResult<Rc<Self>> {
        let actions = records.iter().map(Action::decode).collect::<AvmResult<Vec<_>>>()?;
        Ok(Self::new(actions))
    }

    /// Parse a JSON array of action records.
    pub fn from_json(json: &str) -> AvmResult<Rc<Self>> {
        let records: Vec<ActionRecord> = serde_json::from_str(json)
            .map_err(|e| AvmError::invalid_action(0, format!("malformed action records: {}", e)))?;
        Self::from_records(&records)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether the analysis pass already ran for this blob.
    pub fn is_analyzed(&self) -> bool {
        self.ir.get().is_some()
    }
}

impl fmt::Debug for ActionsData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionsData")
            .field("id", &self.id)
            .field("actions", &self.actions.len())
            .finish()
    }
}
