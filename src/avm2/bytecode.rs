//! AVM2 method and bytecode model
//!
//! Methods arrive already decoded: every instruction carries its original
//! byte offset (`pc`) and branch operands refer to those offsets.

use std::cell::OnceCell;
use std::rc::Rc;

use super::analysis::MethodAnalysis;

/// Byte offset of an instruction in the original method body.
pub type Pc = u32;

/// A property name reference. `name: None` means the name is taken from the
/// operand stack at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Multiname {
    pub namespace: Option<String>,
    pub name: Option<String>,
}

impl Multiname {
    pub fn public(name: impl Into<String>) -> Self {
        Multiname {
            namespace: None,
            name: Some(name.into()),
        }
    }

    pub fn qualified(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Multiname {
            namespace: Some(namespace.into()),
            name: Some(name.into()),
        }
    }

    pub fn runtime() -> Self {
        Multiname {
            namespace: None,
            name: None,
        }
    }

    pub fn is_runtime(&self) -> bool {
        self.name.is_none()
    }

    /// `ns::name`, or just `name` in the public namespace.
    pub fn qualified_name(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        Some(match self.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => format!("{}::{}", ns, name),
            _ => name.to_string(),
        })
    }
}

/// Per-file constant tables referenced by index from instructions.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    pub ints: Vec<i32>,
    pub uints: Vec<u32>,
    pub doubles: Vec<f64>,
    pub strings: Vec<String>,
    pub multinames: Vec<Multiname>,
}

/// Literal used for optional parameter defaults.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Undefined,
    Null,
    Boolean(bool),
    Int(i32),
    Uint(u32),
    Double(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub type_name: Option<String>,
    pub default: Option<ConstantValue>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            type_name: None,
            default: None,
        }
    }

    pub fn typed(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_default(mut self, default: ConstantValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// A catch region: instructions with `start_pc <= pc < end_pc` are covered.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionInfo {
    pub start_pc: Pc,
    pub end_pc: Pc,
    pub target_pc: Pc,
    /// `None` catches everything.
    pub type_name: Option<String>,
    pub var_name: Option<String>,
}

impl ExceptionInfo {
    pub fn covers(&self, pc: Pc) -> bool {
        self.start_pc <= pc && pc < self.end_pc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Nop,
    Label,
    Debug,
    DebugLine(u32),
    DebugFile(u32),

    PushNull,
    PushUndefined,
    PushTrue,
    PushFalse,
    PushNan,
    PushByte(i8),
    PushShort(i16),
    PushInt(u32),
    PushUint(u32),
    PushDouble(u32),
    PushString(u32),

    Pop,
    Dup,
    Swap,

    GetLocal(u32),
    SetLocal(u32),
    Kill(u32),
    IncLocal(u32),
    IncLocalI(u32),
    DecLocal(u32),
    DecLocalI(u32),

    PushScope,
    PushWith,
    PopScope,
    GetScopeObject(u32),
    GetGlobalScope,

    FindPropStrict(u32),
    FindProperty(u32),
    GetLex(u32),
    GetProperty(u32),
    SetProperty(u32),
    InitProperty(u32),
    DeleteProperty(u32),
    GetSlot(u32),
    SetSlot(u32),

    Call { argc: u32 },
    CallProperty { multiname: u32, argc: u32 },
    CallPropVoid { multiname: u32, argc: u32 },
    CallPropLex { multiname: u32, argc: u32 },
    CallSuper { multiname: u32, argc: u32 },
    CallSuperVoid { multiname: u32, argc: u32 },
    Construct { argc: u32 },
    ConstructProp { multiname: u32, argc: u32 },
    ConstructSuper { argc: u32 },
    NewObject { argc: u32 },
    NewArray { argc: u32 },
    NewActivation,
    NewFunction(u32),

    Add,
    AddI,
    Subtract,
    SubtractI,
    Multiply,
    MultiplyI,
    Divide,
    Modulo,
    Negate,
    NegateI,
    Increment,
    IncrementI,
    Decrement,
    DecrementI,
    Not,
    BitNot,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    URShift,

    Equals,
    StrictEquals,
    LessThan,
    LessEquals,
    GreaterThan,
    GreaterEquals,
    InstanceOf,
    IsTypeLate,
    AsTypeLate,
    In,
    TypeOf,

    ConvertI,
    ConvertU,
    ConvertD,
    ConvertB,
    ConvertS,
    CoerceA,
    CoerceS,
    Coerce(u32),

    Jump(Pc),
    IfTrue(Pc),
    IfFalse(Pc),
    IfEq(Pc),
    IfNe(Pc),
    IfLt(Pc),
    IfLe(Pc),
    IfGt(Pc),
    IfGe(Pc),
    IfNlt(Pc),
    IfNle(Pc),
    IfNgt(Pc),
    IfNge(Pc),
    IfStrictEq(Pc),
    IfStrictNe(Pc),
    LookupSwitch { default: Pc, cases: Vec<Pc> },

    ReturnVoid,
    ReturnValue,
    Throw,

    HasNext2 { object_register: u32, index_register: u32 },
    NextName,
    NextValue,
}

impl Op {
    /// Target of a conditional branch.
    pub fn conditional_target(&self) -> Option<Pc> {
        match self {
            Op::IfTrue(t)
            | Op::IfFalse(t)
            | Op::IfEq(t)
            | Op::IfNe(t)
            | Op::IfLt(t)
            | Op::IfLe(t)
            | Op::IfGt(t)
            | Op::IfGe(t)
            | Op::IfNlt(t)
            | Op::IfNle(t)
            | Op::IfNgt(t)
            | Op::IfNge(t)
            | Op::IfStrictEq(t)
            | Op::IfStrictNe(t) => Some(*t),
            _ => None,
        }
    }

    /// Control never reaches the next instruction.
    pub fn ends_flow(&self) -> bool {
        matches!(
            self,
            Op::Jump(_) | Op::LookupSwitch { .. } | Op::ReturnVoid | Op::ReturnValue | Op::Throw
        )
    }

    pub fn is_branch(&self) -> bool {
        self.ends_flow() || self.conditional_target().is_some()
    }

    /// False for instructions that never fault at runtime.
    pub fn can_throw(&self) -> bool {
        !matches!(
            self,
            Op::Nop
                | Op::Label
                | Op::Debug
                | Op::DebugLine(_)
                | Op::DebugFile(_)
                | Op::PushNull
                | Op::PushUndefined
                | Op::PushTrue
                | Op::PushFalse
                | Op::PushNan
                | Op::PushByte(_)
                | Op::PushShort(_)
                | Op::PushInt(_)
                | Op::PushUint(_)
                | Op::PushDouble(_)
                | Op::PushString(_)
                | Op::Pop
                | Op::Dup
                | Op::Swap
                | Op::GetLocal(_)
                | Op::SetLocal(_)
                | Op::Kill(_)
                | Op::PopScope
                | Op::GetScopeObject(_)
                | Op::GetGlobalScope
                | Op::Jump(_)
                | Op::ReturnVoid
                | Op::CoerceA
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub pc: Pc,
    pub op: Op,
    /// Set by type inference when a coercion is known to be an identity.
    pub no_coercion_needed: bool,
}

impl Instruction {
    pub fn new(pc: Pc, op: Op) -> Self {
        Instruction {
            pc,
            op,
            no_coercion_needed: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    pub code: Vec<Instruction>,
    pub local_count: u32,
    pub max_stack: u32,
    pub init_scope_depth: u32,
    pub max_scope_depth: u32,
    pub exceptions: Vec<ExceptionInfo>,
    pub(crate) analysis: OnceCell<Rc<MethodAnalysis>>,
}

impl MethodBody {
    /// Body built from a list of ops laid out one byte apart.
    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        let code = ops
            .into_iter()
            .enumerate()
            .map(|(pc, op)| Instruction::new(pc as Pc, op))
            .collect();
        MethodBody {
            code,
            ..Default::default()
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.analysis.get().is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MethodInfo {
    pub name: Option<String>,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub needs_rest: bool,
    pub needs_arguments: bool,
    pub body: Option<MethodBody>,
}
