//! Baseline compiler
//!
//! Translates one AVM2 method into the text of a procedure body. The operand
//! stack, local registers and scope stack become plain variables:
//!
//! - locals: `this`, `a`..`z`, then `l27`, `l28`, ...
//! - stack slots: `A`..`Z`, then `s26`, `s27`, ...
//! - scopes: `$0` is the method's outer scope, `$1`.. are pushed scopes
//!
//! Every basic block is emitted once with the stack and scope depths it is
//! entered with, and the blocks are stitched back into structured code by
//! the relooper. Runtime semantics live behind `rt.*` helpers supplied by
//! the code that embeds the procedure.

use std::collections::VecDeque;
use std::rc::Rc;

use super::analysis::{MethodAnalysis, analyzed};
use super::bytecode::{
    ConstantPool, ConstantValue, ExceptionInfo, Instruction, MethodBody, MethodInfo, Multiname, Op, Pc,
};
use super::emitter::{Emitter, escape_string};
use super::relooper::{BlockId, Relooper};
use crate::error::{AvmError, AvmResult};
use crate::value::number_to_string;

/// Procedure text plus its parameter names, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMethod {
    pub body: String,
    pub parameters: Vec<String>,
}

pub fn local_name(index: u32) -> String {
    match index {
        0 => "this".to_string(),
        1..=26 => char::from(b'a' + (index - 1) as u8).to_string(),
        _ => format!("l{}", index),
    }
}

pub fn stack_name(index: u32) -> String {
    match index {
        0..=25 => char::from(b'A' + index as u8).to_string(),
        _ => format!("s{}", index),
    }
}

pub fn scope_name(index: u32) -> String {
    format!("${}", index)
}

/// Expression converting `value` to `type_name`; `None` when the type
/// accepts anything.
pub fn coerce_expr(type_name: &str, value: &str) -> Option<String> {
    match type_name {
        "*" | "void" => None,
        "int" => Some(format!("{} | 0", value)),
        "uint" => Some(format!("{} >>> 0", value)),
        "Number" => Some(format!("+{}", value)),
        "Boolean" => Some(format!("!!{}", value)),
        "String" => Some(format!("rt.coerceString({})", value)),
        other => Some(format!("rt.coerce({}, {})", value, escape_string(other))),
    }
}

fn number_literal(n: f64) -> String {
    number_to_string(n)
}

fn constant_literal(value: &ConstantValue) -> String {
    match value {
        ConstantValue::Undefined => "undefined".to_string(),
        ConstantValue::Null => "null".to_string(),
        ConstantValue::Boolean(b) => b.to_string(),
        ConstantValue::Int(i) => i.to_string(),
        ConstantValue::Uint(u) => u.to_string(),
        ConstantValue::Double(d) => number_literal(*d),
        ConstantValue::String(s) => escape_string(s),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct State {
    stack: u32,
    scope: u32,
}

/// How control leaves a block; successors are analysis block ids.
#[derive(Debug)]
enum Exit {
    Fallthrough(usize),
    Jump(usize),
    Branch {
        condition: String,
        taken: usize,
        fallthrough: usize,
    },
    Switch {
        on: String,
        cases: Vec<usize>,
        default: usize,
    },
    Terminal,
}

impl Exit {
    fn successors(&self) -> Vec<usize> {
        match self {
            Exit::Fallthrough(next) | Exit::Jump(next) => vec![*next],
            Exit::Branch { taken, fallthrough, .. } => vec![*taken, *fallthrough],
            Exit::Switch { cases, default, .. } => {
                let mut all = vec![*default];
                all.extend(cases.iter().copied());
                all
            }
            Exit::Terminal => Vec::new(),
        }
    }
}

#[derive(Debug)]
struct EmittedBlock {
    code: String,
    exit: Exit,
}

pub struct BaselineCompiler<'a> {
    constants: &'a ConstantPool,
}

impl<'a> BaselineCompiler<'a> {
    pub fn new(constants: &'a ConstantPool) -> Self {
        BaselineCompiler { constants }
    }

    /// Compile `method`. `scope_template` is the expression for the outer
    /// scope; with `has_dynamic_scope` the caller passes it as the first
    /// parameter `$0` instead.
    pub fn compile(
        &self,
        method: &MethodInfo,
        scope_template: &str,
        has_dynamic_scope: bool,
    ) -> AvmResult<CompiledMethod> {
        let name = method.name.as_deref().unwrap_or("<anonymous>");
        let body = method
            .body
            .as_ref()
            .ok_or_else(|| AvmError::compile(format!("Method {} has no body", name)))?;
        log::debug!("Compiling method {} ({} instructions)", name, body.code.len());

        let mut compiler = MethodCompiler {
            constants: self.constants,
            method,
            body,
            analysis: analyzed(body)?,
            stack: 0,
            scope: 0,
            max_stack: 0,
            max_scope: 0,
            uses_temp: false,
            lines: Vec::new(),
        };
        let blocks = compiler.emit_blocks()?;
        let relooped = compiler.reloop(&blocks)?;
        Ok(compiler.assemble(relooped, scope_template, has_dynamic_scope))
    }
}

struct MethodCompiler<'a> {
    constants: &'a ConstantPool,
    method: &'a MethodInfo,
    body: &'a MethodBody,
    analysis: Rc<MethodAnalysis>,
    stack: u32,
    scope: u32,
    max_stack: u32,
    max_scope: u32,
    uses_temp: bool,
    lines: Vec<String>,
}

impl<'a> MethodCompiler<'a> {
    fn block_at(&self, pc: Pc) -> AvmResult<usize> {
        self.analysis
            .block_at(pc)
            .ok_or_else(|| AvmError::compile(format!("No block starts at offset {}", pc)))
    }

    /// Emit every reachable block, propagating entry states along edges.
    fn emit_blocks(&mut self) -> AvmResult<Vec<Option<EmittedBlock>>> {
        let count = self.analysis.blocks.len();
        let mut states: Vec<Option<State>> = vec![None; count];
        let mut emitted: Vec<Option<EmittedBlock>> = (0..count).map(|_| None).collect();
        let mut worklist = VecDeque::new();

        if count > 0 {
            join(&mut states, 0, State { stack: 0, scope: 0 })?;
            worklist.push_back(0);
        }
        for handler in &self.body.exceptions {
            let target = self.block_at(handler.target_pc)?;
            if join(&mut states, target, State { stack: 1, scope: 0 })? {
                worklist.push_back(target);
            }
        }

        while let Some(id) = worklist.pop_front() {
            let already_emitted = emitted.get(id).is_some_and(Option::is_some);
            let Some(state) = states.get(id).copied().flatten() else {
                continue;
            };
            if already_emitted {
                continue;
            }
            let (block, out) = self.emit_block(id, state)?;
            for succ in block.exit.successors() {
                if join(&mut states, succ, out)? {
                    worklist.push_back(succ);
                }
            }
            if let Some(slot) = emitted.get_mut(id) {
                *slot = Some(block);
            }
        }
        Ok(emitted)
    }

    fn emit_block(&mut self, id: usize, state: State) -> AvmResult<(EmittedBlock, State)> {
        let analysis = Rc::clone(&self.analysis);
        let block = analysis
            .blocks
            .get(id)
            .ok_or_else(|| AvmError::internal(format!("Unknown block {}", id)))?;
        self.stack = state.stack;
        self.scope = state.scope;
        self.max_stack = self.max_stack.max(state.stack);
        self.lines.clear();

        let body = self.body;
        let instructions = body.code.get(block.start..block.end).unwrap_or_default();
        let mut exit = None;
        for ins in instructions {
            if self.saves_pc(ins) {
                self.line(format!("pc = {};", ins.pc));
            }
            exit = self.emit_instruction(ins)?;
        }
        let exit = match exit {
            Some(exit) => exit,
            None if id + 1 < analysis.blocks.len() => Exit::Fallthrough(id + 1),
            None => {
                return Err(AvmError::compile(format!(
                    "Control falls off the end of method {}",
                    self.method.name.as_deref().unwrap_or("<anonymous>")
                )));
            }
        };
        let out = State {
            stack: self.stack,
            scope: self.scope,
        };
        let code = std::mem::take(&mut self.lines).join("\n");
        Ok((EmittedBlock { code, exit }, out))
    }

    fn saves_pc(&self, ins: &Instruction) -> bool {
        ins.op.can_throw() && self.body.exceptions.iter().any(|h| h.covers(ins.pc))
    }

    fn line(&mut self, text: String) {
        self.lines.push(text);
    }

    fn push(&mut self) -> String {
        let name = stack_name(self.stack);
        self.stack += 1;
        self.max_stack = self.max_stack.max(self.stack);
        name
    }

    fn pop(&mut self) -> AvmResult<String> {
        self.stack = self
            .stack
            .checked_sub(1)
            .ok_or_else(|| AvmError::compile("Operand stack underflow"))?;
        Ok(stack_name(self.stack))
    }

    fn pop_args(&mut self, argc: u32) -> AvmResult<String> {
        let mut args = (0..argc).map(|_| self.pop()).collect::<AvmResult<Vec<_>>>()?;
        args.reverse();
        Ok(args.join(", "))
    }

    fn assign(&mut self, expr: String) {
        let target = self.push();
        self.line(format!("{} = {};", target, expr));
    }

    fn unary(&mut self, f: impl FnOnce(&str) -> String) -> AvmResult<()> {
        let a = self.pop()?;
        self.assign(f(&a));
        Ok(())
    }

    fn binary(&mut self, f: impl FnOnce(&str, &str) -> String) -> AvmResult<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.assign(f(&a, &b));
        Ok(())
    }

    fn infix(&mut self, operator: &str) -> AvmResult<()> {
        self.binary(|a, b| format!("{} {} {}", a, operator, b))
    }

    fn compare(&mut self, operator: &str, negate: bool) -> AvmResult<String> {
        let b = self.pop()?;
        let a = self.pop()?;
        Ok(if negate {
            format!("!({} {} {})", a, operator, b)
        } else {
            format!("{} {} {}", a, operator, b)
        })
    }

    fn current_scope(&self) -> String {
        scope_name(self.scope)
    }

    fn multiname(&self, index: u32) -> AvmResult<&'a Multiname> {
        self.constants
            .multinames
            .get(index as usize)
            .ok_or_else(|| AvmError::compile(format!("Multiname {} out of range", index)))
    }

    /// Property name expression; runtime names come off the stack.
    fn name_operand(&mut self, index: u32) -> AvmResult<String> {
        match self.multiname(index)?.qualified_name() {
            Some(name) => Ok(escape_string(&name)),
            None => self.pop(),
        }
    }

    fn local(&self, index: u32) -> String {
        local_name(index)
    }

    fn emit_instruction(&mut self, ins: &Instruction) -> AvmResult<Option<Exit>> {
        let coercion_elided = ins.no_coercion_needed;
        match &ins.op {
            Op::Nop | Op::Label | Op::Debug | Op::DebugLine(_) | Op::DebugFile(_) => {}

            Op::PushNull => self.assign("null".to_string()),
            Op::PushUndefined => self.assign("undefined".to_string()),
            Op::PushTrue => self.assign("true".to_string()),
            Op::PushFalse => self.assign("false".to_string()),
            Op::PushNan => self.assign("NaN".to_string()),
            Op::PushByte(v) => self.assign(v.to_string()),
            Op::PushShort(v) => self.assign(v.to_string()),
            Op::PushInt(index) => {
                let v = constant(&self.constants.ints, *index, "int")?;
                self.assign(v.to_string());
            }
            Op::PushUint(index) => {
                let v = constant(&self.constants.uints, *index, "uint")?;
                self.assign(v.to_string());
            }
            Op::PushDouble(index) => {
                let v = constant(&self.constants.doubles, *index, "double")?;
                self.assign(number_literal(v));
            }
            Op::PushString(index) => {
                let s = self
                    .constants
                    .strings
                    .get(*index as usize)
                    .ok_or_else(|| AvmError::compile(format!("string constant {} out of range", index)))?;
                self.assign(escape_string(s));
            }

            Op::Pop => {
                self.pop()?;
            }
            Op::Dup => {
                let top = self.pop()?;
                self.push();
                self.assign(top);
            }
            Op::Swap => {
                let b = self.pop()?;
                let a = self.pop()?;
                self.push();
                self.push();
                self.uses_temp = true;
                self.line(format!("$t = {}; {} = {}; {} = $t;", a, a, b, b));
            }

            Op::GetLocal(index) => self.assign(self.local(*index)),
            Op::SetLocal(index) => {
                let value = self.pop()?;
                self.line(format!("{} = {};", self.local(*index), value));
            }
            Op::Kill(index) => self.line(format!("{} = undefined;", self.local(*index))),
            Op::IncLocal(index) => {
                let l = self.local(*index);
                self.line(format!("{} = +{} + 1;", l, l));
            }
            Op::IncLocalI(index) => {
                let l = self.local(*index);
                self.line(format!("{} = ({} | 0) + 1 | 0;", l, l));
            }
            Op::DecLocal(index) => {
                let l = self.local(*index);
                self.line(format!("{} = +{} - 1;", l, l));
            }
            Op::DecLocalI(index) => {
                let l = self.local(*index);
                self.line(format!("{} = ({} | 0) - 1 | 0;", l, l));
            }

            Op::PushScope | Op::PushWith => {
                let value = self.pop()?;
                let outer = self.current_scope();
                self.scope += 1;
                self.max_scope = self.max_scope.max(self.scope);
                let is_with = matches!(ins.op, Op::PushWith);
                self.line(format!(
                    "{} = rt.pushScope({}, {}, {});",
                    self.current_scope(),
                    outer,
                    value,
                    is_with
                ));
            }
            Op::PopScope => {
                self.scope = self
                    .scope
                    .checked_sub(1)
                    .ok_or_else(|| AvmError::compile("Scope stack underflow"))?;
            }
            Op::GetScopeObject(index) => {
                if *index >= self.scope {
                    return Err(AvmError::compile(format!("Scope {} out of range", index)));
                }
                self.assign(format!("rt.scopeObject({})", scope_name(index + 1)));
            }
            Op::GetGlobalScope => self.assign(format!("rt.globalObject({})", self.current_scope())),

            Op::FindPropStrict(index) | Op::FindProperty(index) => {
                let name = self.name_operand(*index)?;
                let strict = matches!(ins.op, Op::FindPropStrict(_));
                self.assign(format!("rt.findProperty({}, {}, {})", self.current_scope(), name, strict));
            }
            Op::GetLex(index) => {
                let name = self.name_operand(*index)?;
                self.assign(format!(
                    "rt.getProperty(rt.findProperty({}, {}, true), {})",
                    self.current_scope(),
                    name,
                    name
                ));
            }
            Op::GetProperty(index) => {
                let name = self.name_operand(*index)?;
                let obj = self.pop()?;
                self.assign(format!("rt.getProperty({}, {})", obj, name));
            }
            Op::SetProperty(index) | Op::InitProperty(index) => {
                let value = self.pop()?;
                let name = self.name_operand(*index)?;
                let obj = self.pop()?;
                let helper = if matches!(ins.op, Op::InitProperty(_)) {
                    "initProperty"
                } else {
                    "setProperty"
                };
                self.line(format!("rt.{}({}, {}, {});", helper, obj, name, value));
            }
            Op::DeleteProperty(index) => {
                let name = self.name_operand(*index)?;
                let obj = self.pop()?;
                self.assign(format!("rt.deleteProperty({}, {})", obj, name));
            }
            Op::GetSlot(slot) => {
                let obj = self.pop()?;
                self.assign(format!("rt.getSlot({}, {})", obj, slot));
            }
            Op::SetSlot(slot) => {
                let value = self.pop()?;
                let obj = self.pop()?;
                self.line(format!("rt.setSlot({}, {}, {});", obj, slot, value));
            }

            Op::Call { argc } => {
                let args = self.pop_args(*argc)?;
                let receiver = self.pop()?;
                let function = self.pop()?;
                self.assign(format!("rt.call({}, {}, [{}])", function, receiver, args));
            }
            Op::CallProperty { multiname, argc }
            | Op::CallPropVoid { multiname, argc }
            | Op::CallPropLex { multiname, argc }
            | Op::CallSuper { multiname, argc }
            | Op::CallSuperVoid { multiname, argc } => {
                let args = self.pop_args(*argc)?;
                let name = self.name_operand(*multiname)?;
                let obj = self.pop()?;
                let (helper, discard) = match ins.op {
                    Op::CallPropVoid { .. } => ("callProperty", true),
                    Op::CallPropLex { .. } => ("callPropertyLex", false),
                    Op::CallSuper { .. } => ("callSuper", false),
                    Op::CallSuperVoid { .. } => ("callSuper", true),
                    _ => ("callProperty", false),
                };
                let call = format!("rt.{}({}, {}, [{}])", helper, obj, name, args);
                if discard {
                    self.line(format!("{};", call));
                } else {
                    self.assign(call);
                }
            }
            Op::Construct { argc } => {
                let args = self.pop_args(*argc)?;
                let ctor = self.pop()?;
                self.assign(format!("rt.construct({}, [{}])", ctor, args));
            }
            Op::ConstructProp { multiname, argc } => {
                let args = self.pop_args(*argc)?;
                let name = self.name_operand(*multiname)?;
                let obj = self.pop()?;
                self.assign(format!("rt.constructProperty({}, {}, [{}])", obj, name, args));
            }
            Op::ConstructSuper { argc } => {
                let args = self.pop_args(*argc)?;
                let obj = self.pop()?;
                self.line(format!("rt.constructSuper({}, [{}]);", obj, args));
            }
            Op::NewObject { argc } => {
                let pairs = self.pop_args(argc * 2)?;
                self.assign(format!("rt.newObject([{}])", pairs));
            }
            Op::NewArray { argc } => {
                let items = self.pop_args(*argc)?;
                self.assign(format!("[{}]", items));
            }
            Op::NewActivation => self.assign("rt.newActivation()".to_string()),
            Op::NewFunction(index) => self.assign(format!("rt.newFunction({}, {})", index, self.current_scope())),

            Op::Add => self.binary(|a, b| format!("rt.add({}, {})", a, b))?,
            Op::AddI => self.binary(|a, b| format!("({} + {}) | 0", a, b))?,
            Op::Subtract => self.infix("-")?,
            Op::SubtractI => self.binary(|a, b| format!("({} - {}) | 0", a, b))?,
            Op::Multiply => self.infix("*")?,
            Op::MultiplyI => self.binary(|a, b| format!("Math.imul({}, {})", a, b))?,
            Op::Divide => self.infix("/")?,
            Op::Modulo => self.infix("%")?,
            Op::BitAnd => self.infix("&")?,
            Op::BitOr => self.infix("|")?,
            Op::BitXor => self.infix("^")?,
            Op::LShift => self.infix("<<")?,
            Op::RShift => self.infix(">>")?,
            Op::URShift => self.infix(">>>")?,
            Op::Equals => self.infix("==")?,
            Op::StrictEquals => self.infix("===")?,
            Op::LessThan => self.infix("<")?,
            Op::LessEquals => self.infix("<=")?,
            Op::GreaterThan => self.infix(">")?,
            Op::GreaterEquals => self.infix(">=")?,
            Op::InstanceOf => self.binary(|a, b| format!("rt.instanceOf({}, {})", a, b))?,
            Op::IsTypeLate => self.binary(|a, b| format!("rt.isType({}, {})", a, b))?,
            Op::AsTypeLate => self.binary(|a, b| format!("rt.asType({}, {})", a, b))?,
            Op::In => self.binary(|name, obj| format!("rt.hasProperty({}, {})", obj, name))?,

            Op::Negate => self.unary(|a| format!("-{}", a))?,
            Op::NegateI => self.unary(|a| format!("-{} | 0", a))?,
            Op::Increment => self.unary(|a| format!("+{} + 1", a))?,
            Op::IncrementI => self.unary(|a| format!("({} | 0) + 1 | 0", a))?,
            Op::Decrement => self.unary(|a| format!("+{} - 1", a))?,
            Op::DecrementI => self.unary(|a| format!("({} | 0) - 1 | 0", a))?,
            Op::Not => self.unary(|a| format!("!{}", a))?,
            Op::BitNot => self.unary(|a| format!("~{}", a))?,
            Op::TypeOf => self.unary(|a| format!("rt.typeOf({})", a))?,

            Op::CoerceA => {}
            Op::ConvertI | Op::ConvertU | Op::ConvertD | Op::ConvertB | Op::ConvertS | Op::CoerceS
                if coercion_elided => {}
            Op::ConvertI => self.unary(|a| format!("{} | 0", a))?,
            Op::ConvertU => self.unary(|a| format!("{} >>> 0", a))?,
            Op::ConvertD => self.unary(|a| format!("+{}", a))?,
            Op::ConvertB => self.unary(|a| format!("!!{}", a))?,
            Op::ConvertS => self.unary(|a| format!("rt.toString({})", a))?,
            Op::CoerceS => self.unary(|a| format!("rt.coerceString({})", a))?,
            Op::Coerce(index) => {
                let type_name = self
                    .multiname(*index)?
                    .qualified_name()
                    .ok_or_else(|| AvmError::compile("coerce needs a compile-time type name"))?;
                if !coercion_elided {
                    let value = self.pop()?;
                    match coerce_expr(&type_name, &value) {
                        Some(expr) => self.assign(expr),
                        None => {
                            self.push();
                        }
                    }
                }
            }

            Op::Jump(target) => return Ok(Some(Exit::Jump(self.block_at(*target)?))),
            Op::IfTrue(target) | Op::IfFalse(target) => {
                let value = self.pop()?;
                let condition = if matches!(ins.op, Op::IfTrue(_)) {
                    value
                } else {
                    format!("!{}", value)
                };
                return self.conditional(condition, *target, ins.pc).map(Some);
            }
            Op::IfEq(target) => return self.compare_and_branch("==", false, *target, ins.pc),
            Op::IfNe(target) => return self.compare_and_branch("!=", false, *target, ins.pc),
            Op::IfLt(target) => return self.compare_and_branch("<", false, *target, ins.pc),
            Op::IfLe(target) => return self.compare_and_branch("<=", false, *target, ins.pc),
            Op::IfGt(target) => return self.compare_and_branch(">", false, *target, ins.pc),
            Op::IfGe(target) => return self.compare_and_branch(">=", false, *target, ins.pc),
            Op::IfNlt(target) => return self.compare_and_branch("<", true, *target, ins.pc),
            Op::IfNle(target) => return self.compare_and_branch("<=", true, *target, ins.pc),
            Op::IfNgt(target) => return self.compare_and_branch(">", true, *target, ins.pc),
            Op::IfNge(target) => return self.compare_and_branch(">=", true, *target, ins.pc),
            Op::IfStrictEq(target) => return self.compare_and_branch("===", false, *target, ins.pc),
            Op::IfStrictNe(target) => return self.compare_and_branch("!==", false, *target, ins.pc),
            Op::LookupSwitch { default, cases } => {
                let on = self.pop()?;
                let cases = cases
                    .iter()
                    .map(|target| self.block_at(*target))
                    .collect::<AvmResult<Vec<_>>>()?;
                let default = self.block_at(*default)?;
                return Ok(Some(Exit::Switch { on, cases, default }));
            }

            Op::ReturnVoid => {
                self.line("return;".to_string());
                return Ok(Some(Exit::Terminal));
            }
            Op::ReturnValue => {
                let value = self.pop()?;
                let coerced = match self.method.return_type.as_deref() {
                    Some(type_name) if !coercion_elided => coerce_expr(type_name, &value),
                    _ => None,
                };
                self.line(format!("return {};", coerced.unwrap_or(value)));
                return Ok(Some(Exit::Terminal));
            }
            Op::Throw => {
                let value = self.pop()?;
                self.line(format!("throw {};", value));
                return Ok(Some(Exit::Terminal));
            }

            Op::HasNext2 {
                object_register,
                index_register,
            } => {
                let object = self.local(*object_register);
                let index = self.local(*index_register);
                self.uses_temp = true;
                self.line(format!("$t = rt.hasNext2({}, {});", object, index));
                self.line(format!("{} = $t.object;", object));
                self.line(format!("{} = $t.index;", index));
                self.assign(format!("{} > 0", index));
            }
            Op::NextName => self.binary(|obj, index| format!("rt.nextName({}, {})", obj, index))?,
            Op::NextValue => self.binary(|obj, index| format!("rt.nextValue({}, {})", obj, index))?,
        }
        Ok(None)
    }

    fn compare_and_branch(&mut self, operator: &str, negate: bool, target: Pc, pc: Pc) -> AvmResult<Option<Exit>> {
        let condition = self.compare(operator, negate)?;
        self.conditional(condition, target, pc).map(Some)
    }

    fn conditional(&self, condition: String, target: Pc, pc: Pc) -> AvmResult<Exit> {
        let taken = self.block_at(target)?;
        let index = self
            .analysis
            .index_of(pc)
            .ok_or_else(|| AvmError::internal(format!("Unknown offset {}", pc)))?;
        let fallthrough = self
            .body
            .code
            .get(index + 1)
            .and_then(|next| self.analysis.block_at(next.pc))
            .ok_or_else(|| AvmError::compile(format!("Branch at {} falls off the end of the method", pc)))?;
        Ok(Exit::Branch {
            condition,
            taken,
            fallthrough,
        })
    }

    /// Feed the emitted blocks to the relooper behind a synthetic entry
    /// block that also dispatches to catch handlers.
    fn reloop(&self, blocks: &[Option<EmittedBlock>]) -> AvmResult<String> {
        let mut relooper = Relooper::new();
        let entry = relooper.add_block("");
        let mut ids: Vec<Option<BlockId>> = Vec::with_capacity(blocks.len());
        for block in blocks {
            ids.push(block.as_ref().map(|block| match &block.exit {
                Exit::Switch { on, .. } => relooper.add_switch_block(block.code.clone(), on.clone()),
                _ => relooper.add_block(block.code.clone()),
            }));
        }
        let id_of = |block: usize| {
            ids.get(block)
                .copied()
                .flatten()
                .ok_or_else(|| AvmError::internal(format!("Block {} was never emitted", block)))
        };

        for (k, handler) in self.body.exceptions.iter().enumerate() {
            let target = id_of(self.block_at(handler.target_pc)?)?;
            relooper.add_branch(
                entry,
                target,
                Some(format!("$h === {}", k)),
                Some("$h = -1;".to_string()),
            );
        }
        if !blocks.is_empty() {
            relooper.add_branch(entry, id_of(0)?, None, None);
        }

        for (index, block) in blocks.iter().enumerate() {
            let Some(block) = block else {
                continue;
            };
            let from = id_of(index)?;
            match &block.exit {
                Exit::Fallthrough(next) | Exit::Jump(next) => relooper.add_branch(from, id_of(*next)?, None, None),
                Exit::Branch {
                    condition,
                    taken,
                    fallthrough,
                } => {
                    relooper.add_branch(from, id_of(*taken)?, Some(condition.clone()), None);
                    relooper.add_branch(from, id_of(*fallthrough)?, None, None);
                }
                Exit::Switch { cases, default, .. } => {
                    for (case, target) in cases.iter().enumerate() {
                        relooper.add_branch(from, id_of(*target)?, Some(case.to_string()), None);
                    }
                    relooper.add_branch(from, id_of(*default)?, None, None);
                }
                Exit::Terminal => {}
            }
        }
        relooper.render(entry)
    }

    fn assemble(&self, relooped: String, scope_template: &str, has_dynamic_scope: bool) -> CompiledMethod {
        let method = self.method;
        let params = &method.parameters;
        let param_offset = usize::from(has_dynamic_scope);

        let mut parameters = Vec::with_capacity(params.len() + param_offset);
        if has_dynamic_scope {
            parameters.push(scope_name(0));
        }
        parameters.extend((1..=params.len() as u32).map(local_name));

        let mut out = Emitter::new();
        if !has_dynamic_scope {
            out.write_line(&format!("var {} = {};", scope_name(0), scope_template));
        }
        for (i, param) in params.iter().enumerate() {
            let name = local_name(i as u32 + 1);
            if let Some(default) = &param.default {
                out.enter(&format!("if (arguments.length < {}) {{", i + 1 + param_offset));
                out.write_line(&format!("{} = {};", name, constant_literal(default)));
                out.leave("}");
            }
            if let Some(expr) = param.type_name.as_deref().and_then(|t| coerce_expr(t, &name)) {
                out.write_line(&format!("{} = {};", name, expr));
            }
        }

        let mut next_local = params.len() as u32 + 1;
        if method.needs_rest || method.needs_arguments {
            let skip = if method.needs_rest {
                params.len() + param_offset
            } else {
                param_offset
            };
            out.write_line(&format!(
                "var {} = Array.prototype.slice.call(arguments, {});",
                local_name(next_local),
                skip
            ));
            next_local += 1;
        }
        let local_count = self.body.local_count.max(next_local);
        let locals: Vec<String> = (next_local..local_count).map(local_name).collect();
        if !locals.is_empty() {
            out.write_line(&format!("var {};", locals.join(", ")));
        }

        let stack_depth = self.max_stack.max(self.body.max_stack);
        if stack_depth > 0 {
            let slots: Vec<String> = (0..stack_depth).map(stack_name).collect();
            out.write_line(&format!("var {};", slots.join(", ")));
        }
        if self.max_scope > 0 {
            let scopes: Vec<String> = (1..=self.max_scope).map(scope_name).collect();
            out.write_line(&format!("var {};", scopes.join(", ")));
        }
        if self.uses_temp {
            out.write_line("var $t;");
        }

        if self.body.exceptions.is_empty() {
            out.write_line(&relooped);
        } else {
            out.write_line("var pc = 0, $h = -1;");
            out.enter("while (true) {");
            out.enter("try {");
            out.write_line(&relooped);
            out.write_line("return;");
            out.leave_and_enter("} catch ($e) {");
            for (k, handler) in self.body.exceptions.iter().enumerate() {
                out.enter(&format!("if ({}) {{", handler_test(handler)));
                out.write_line(&format!("$h = {};", k));
                out.write_line(&format!("{} = $e;", stack_name(0)));
                out.write_line("continue;");
                out.leave("}");
            }
            out.write_line("throw $e;");
            out.leave("}");
            out.leave("}");
        }

        CompiledMethod {
            body: out.finish(),
            parameters,
        }
    }
}

fn handler_test(handler: &ExceptionInfo) -> String {
    let range = format!("pc >= {} && pc < {}", handler.start_pc, handler.end_pc);
    match handler.type_name.as_deref() {
        None | Some("*") => range,
        Some(type_name) => format!("{} && rt.isType($e, {})", range, escape_string(type_name)),
    }
}

fn constant<T: Copy>(table: &[T], index: u32, kind: &str) -> AvmResult<T> {
    table
        .get(index as usize)
        .copied()
        .ok_or_else(|| AvmError::compile(format!("{} constant {} out of range", kind, index)))
}

/// Record `state` as the entry state of `block`. Returns true the first
/// time; later edges must agree exactly.
fn join(states: &mut [Option<State>], block: usize, state: State) -> AvmResult<bool> {
    let slot = states
        .get_mut(block)
        .ok_or_else(|| AvmError::internal(format!("Unknown block {}", block)))?;
    match slot {
        None => {
            *slot = Some(state);
            Ok(true)
        }
        Some(known) if *known == state => Ok(false),
        Some(known) => Err(AvmError::compile(format!(
            "Inconsistent state entering block {}: stack {} scope {} vs stack {} scope {}",
            block, known.stack, known.scope, state.stack, state.scope
        ))),
    }
}
