//! Action handlers
//!
//! Every handler pops its operands off `ectx.stack` (right operand first) and
//! returns whether the analyzer's conditional branch should be taken.

use std::rc::Rc;

use super::actions::{Action, FunctionDefinition, PushValue};
use super::context::ExecutionContext;
use super::object::PropertyFlags;
use super::scope::ResolveFlags;
use super::{Avm1, avm1_warn};
use crate::error::{AvmError, AvmResult};
use crate::platform::{DragConstraint, FrameRef, SendVarsMethod};
use crate::value::{AvmString, CheapClone, ObjectId, Value};

/// Property names addressed by index in GetProperty/SetProperty.
const MOVIE_CLIP_PROPERTIES: [&str; 22] = [
    "_x",
    "_y",
    "_xscale",
    "_yscale",
    "_currentframe",
    "_totalframes",
    "_alpha",
    "_visible",
    "_width",
    "_height",
    "_rotation",
    "_target",
    "_framesloaded",
    "_name",
    "_droptarget",
    "_url",
    "_highquality",
    "_focusrect",
    "_soundbuftime",
    "_quality",
    "_xmouse",
    "_ymouse",
];

fn movie_clip_property(index: f64) -> Option<&'static str> {
    if index.is_nan() || index < 0.0 {
        return None;
    }
    MOVIE_CLIP_PROPERTIES.get(index as usize).copied()
}

fn is_empty_name(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

impl Avm1 {
    /// Dispatch one action.
    ///
    /// Actions that can enter another interpreter loop (calls, constructors,
    /// with/try bodies, accessors) go straight to their own handler so that
    /// each nested call level only keeps small frames on the native stack.
    pub(super) fn execute_action(&mut self, ectx: &mut ExecutionContext, action: &Action) -> AvmResult<bool> {
        match action {
            Action::CallFunction => self.action_call_function(ectx).map(|()| false),
            Action::CallMethod => self.action_call_method(ectx).map(|()| false),
            Action::NewObject => self.action_new_object(ectx).map(|()| false),
            Action::NewMethod => self.action_new_method(ectx).map(|()| false),
            Action::GetVariable => self.action_get_variable(ectx).map(|()| false),
            Action::SetVariable => self.action_set_variable(ectx).map(|()| false),
            Action::GetMember => self.action_get_member(ectx).map(|()| false),
            Action::SetMember => self.action_set_member(ectx).map(|()| false),
            Action::Call => self.action_call(ectx).map(|()| false),
            Action::With { body } => self.process_with(ectx, body),
            Action::Try(block) => self.process_try(ectx, block),
            _ => self.execute_simple_action(ectx, action),
        }
    }

    #[inline(never)]
    fn execute_simple_action(&mut self, ectx: &mut ExecutionContext, action: &Action) -> AvmResult<bool> {
        match action {
            Action::End | Action::StrictMode { .. } | Action::Jump { .. } => {}

            // SWF 3 timeline control
            Action::NextFrame => {
                if let Some(clip) = self.current_clip(ectx) {
                    self.host.next_frame(clip);
                }
            }
            Action::PrevFrame => {
                if let Some(clip) = self.current_clip(ectx) {
                    self.host.prev_frame(clip);
                }
            }
            Action::Play => {
                if let Some(clip) = self.current_clip(ectx) {
                    self.host.play(clip);
                }
            }
            Action::Stop => {
                if let Some(clip) = self.current_clip(ectx) {
                    self.host.stop(clip);
                }
            }
            Action::ToggleQuality => self.host.toggle_quality(),
            Action::StopSounds => self.host.stop_all_sounds(),
            Action::GotoFrame { frame } => {
                if let Some(clip) = self.current_clip(ectx) {
                    self.host.goto_frame(clip, FrameRef::Number(frame.saturating_add(1)), false);
                }
            }
            Action::GotoLabel { label } => {
                if let Some(clip) = self.current_clip(ectx) {
                    self.host.goto_frame(clip, FrameRef::Label(label.cheap_clone()), false);
                }
            }
            Action::GetUrl { url, target } => self.get_url(url.as_str(), target.as_str(), SendVarsMethod::None),
            Action::WaitForFrame { frame, .. } => {
                let frame = FrameRef::Number(frame.saturating_add(1));
                return Ok(self.current_clip(ectx).is_some_and(|clip| !self.host.if_frame_loaded(clip, &frame)));
            }
            Action::SetTarget { target } => {
                let scope_list = Rc::clone(&ectx.scope_list);
                self.set_target(&scope_list, &Value::String(target.cheap_clone()))?;
            }

            // SWF 4 stack machine
            Action::Push(values) => {
                for value in values {
                    let value = match value {
                        PushValue::Value(value) => value.cheap_clone(),
                        PushValue::Register(register) => ectx.register(usize::from(*register)),
                        PushValue::Constant(index) => ectx.constant(usize::from(*index)),
                    };
                    ectx.push(value);
                }
            }
            Action::Pop => {
                ectx.pop();
            }
            Action::Add => self.numeric_op(ectx, |b, a| b + a)?,
            Action::Subtract => self.numeric_op(ectx, |b, a| b - a)?,
            Action::Multiply => self.numeric_op(ectx, |b, a| b * a)?,
            Action::Divide => {
                let a = ectx.pop();
                let a = self.to_number(&a)?;
                let b = ectx.pop();
                let b = self.to_number(&b)?;
                let result = b / a;
                if !result.is_finite() && !self.is_swf_version5() {
                    ectx.push("#ERROR#");
                } else {
                    ectx.push(result);
                }
            }
            Action::Equals => {
                let a = ectx.pop();
                let a = self.to_number(&a)?;
                let b = ectx.pop();
                let b = self.to_number(&b)?;
                ectx.push(self.swf4_boolean(a == b));
            }
            Action::Less => {
                let a = ectx.pop();
                let a = self.to_number(&a)?;
                let b = ectx.pop();
                let b = self.to_number(&b)?;
                ectx.push(self.swf4_boolean(b < a));
            }
            Action::And => {
                let a = ectx.pop().to_boolean();
                let b = ectx.pop().to_boolean();
                ectx.push(self.swf4_boolean(a && b));
            }
            Action::Or => {
                let a = ectx.pop().to_boolean();
                let b = ectx.pop().to_boolean();
                ectx.push(self.swf4_boolean(a || b));
            }
            Action::Not => {
                let a = ectx.pop().to_boolean();
                ectx.push(self.swf4_boolean(!a));
            }
            Action::StringEquals => {
                let (b, a) = self.pop_string_pair(ectx)?;
                ectx.push(self.swf4_boolean(b == a));
            }
            Action::StringLess => {
                let (b, a) = self.pop_string_pair(ectx)?;
                ectx.push(self.swf4_boolean(super::coerce::utf16_less(b.as_str(), a.as_str())));
            }
            Action::StringGreater => {
                let (b, a) = self.pop_string_pair(ectx)?;
                ectx.push(self.swf4_boolean(super::coerce::utf16_less(a.as_str(), b.as_str())));
            }
            Action::StringAdd => {
                let (b, a) = self.pop_string_pair(ectx)?;
                ectx.push(format!("{}{}", b, a));
            }
            Action::StringLength | Action::MbStringLength => {
                let value = ectx.pop();
                let s = self.to_avm_string(&value)?;
                let length = match action {
                    Action::MbStringLength => self.host.mb_string_length(s.as_str()),
                    _ => self.host.string_length(s.as_str()),
                };
                ectx.push(length as f64);
            }
            Action::StringExtract | Action::MbStringExtract => {
                let count = ectx.pop();
                let count = self.to_integer(&count)?;
                let index = ectx.pop();
                let index = self.to_integer(&index)?;
                let value = ectx.pop();
                let s = self.to_avm_string(&value)?;
                let (index, count) = (clamp_i64(index), clamp_i64(count));
                let result = match action {
                    Action::MbStringExtract => self.host.mb_substring(s.as_str(), index, count),
                    _ => self.host.substring(s.as_str(), index, count),
                };
                ectx.push(result);
            }
            Action::ToInteger => {
                let value = ectx.pop();
                ectx.push(self.to_integer(&value)?);
            }
            Action::CharToAscii | Action::MbCharToAscii => {
                let value = ectx.pop();
                let s = self.to_avm_string(&value)?;
                let code = match action {
                    Action::MbCharToAscii => self.host.mb_ord(s.as_str()),
                    _ => self.host.ord(s.as_str()),
                };
                ectx.push(code);
            }
            Action::AsciiToChar | Action::MbAsciiToChar => {
                let value = ectx.pop();
                let code = super::coerce::to_uint32(self.to_number(&value)?);
                let s = match action {
                    Action::MbAsciiToChar => self.host.mb_chr(code),
                    _ => self.host.chr(code),
                };
                ectx.push(s);
            }
            Action::If { .. } => {
                let condition = ectx.pop();
                return Ok(condition.to_boolean());
            }
            Action::GetUrl2 { flags } => {
                let target = ectx.pop();
                let target = self.to_avm_string(&target)?;
                let url = ectx.pop();
                let url = self.to_avm_string(&url)?;
                let method = SendVarsMethod::from_flags(flags.0);
                if flags.load_variables() {
                    self.host.load_variables(url.as_str(), target.as_str(), method);
                } else if flags.load_target() {
                    self.host.load_movie(url.as_str(), target.as_str(), method);
                } else {
                    self.get_url(url.as_str(), target.as_str(), method);
                }
            }
            Action::GotoFrame2 { play, scene_bias } => self.action_goto_frame2(ectx, *play, *scene_bias)?,
            Action::SetTarget2 => {
                let target = ectx.pop();
                let scope_list = Rc::clone(&ectx.scope_list);
                self.set_target(&scope_list, &target)?;
            }
            Action::GetProperty => {
                let index = ectx.pop();
                let index = self.to_number(&index)?;
                let target = ectx.pop();
                let value = match (self.target_argument(ectx, &target)?, movie_clip_property(index)) {
                    (Some(clip), Some(name)) => self.get(clip, name)?,
                    (_, None) => {
                        avm1_warn!(self, "Invalid property index {}", index);
                        Value::Undefined
                    }
                    (None, _) => Value::Undefined,
                };
                ectx.push(value);
            }
            Action::SetProperty => {
                let value = ectx.pop();
                let index = ectx.pop();
                let index = self.to_number(&index)?;
                let target = ectx.pop();
                match (self.target_argument(ectx, &target)?, movie_clip_property(index)) {
                    (Some(clip), Some(name)) => self.put(clip, name, value)?,
                    (_, None) => avm1_warn!(self, "Invalid property index {}", index),
                    (None, _) => {}
                }
            }
            Action::CloneSprite => {
                let depth = ectx.pop();
                let depth = self.to_number(&depth)?;
                let name = ectx.pop();
                let name = self.to_avm_string(&name)?;
                let source = ectx.pop();
                if let Some(source) = self.target_argument(ectx, &source)? {
                    let parent = self.heap.get(source).as_movie_clip().and_then(|clip| clip.parent);
                    let clone = self.create_movie_clip(parent, name.as_str());
                    self.host.duplicate_movie_clip(source, clone, depth);
                }
            }
            Action::RemoveSprite => {
                let target = ectx.pop();
                if let Some(clip) = self.target_argument(ectx, &target)? {
                    self.remove_movie_clip(clip);
                    self.host.remove_movie_clip(clip);
                }
            }
            Action::StartDrag => self.action_start_drag(ectx)?,
            Action::EndDrag => self.host.stop_drag(),
            Action::WaitForFrame2 { .. } => {
                let frame = ectx.pop();
                let frame = self.to_frame_ref(&frame)?;
                return Ok(self.current_clip(ectx).is_some_and(|clip| !self.host.if_frame_loaded(clip, &frame)));
            }
            Action::Trace => {
                let value = ectx.pop();
                let message = self.to_avm_string(&value)?;
                self.host.trace(message.as_str());
            }
            Action::GetTime => {
                let time = self.host.get_timer();
                ectx.push(time);
            }
            Action::RandomNumber => {
                let max = ectx.pop();
                let max = self.to_int32(&max)?;
                let random = self.host.random();
                ectx.push((random * f64::from(max)).floor());
            }

            // SWF 5 objects and functions
            Action::ConstantPool(pool) => ectx.constant_pool = Rc::clone(pool),
            Action::DefineFunction(definition) | Action::DefineFunction2(definition) => {
                self.action_define_function(ectx, definition)?;
            }
            Action::DefineLocal => {
                let value = ectx.pop();
                let name = ectx.pop();
                let name = self.to_name(&name)?;
                self.put(ectx.scope_list.scope, name.as_str(), value)?;
            }
            Action::DefineLocal2 => {
                let name = ectx.pop();
                let name = self.to_name(&name)?;
                self.put(ectx.scope_list.scope, name.as_str(), Value::Undefined)?;
            }
            Action::Delete => {
                let name = ectx.pop();
                let name = self.to_name(&name)?;
                let obj = ectx.pop();
                let deleted = match obj.as_object() {
                    Some(obj) => self.delete_property(obj, name.as_str()),
                    None => {
                        avm1_warn!(self, "Cannot delete member {} of {:?}", name, obj);
                        false
                    }
                };
                ectx.push(deleted);
                self.sync_events(name.as_str());
            }
            Action::Delete2 => {
                let name = ectx.pop();
                let name = self.to_name(&name)?;
                let resolved = self.resolve_variable(&ectx.scope_list, name.as_str(), ResolveFlags::DELETE)?;
                let deleted = match resolved {
                    Some(resolved) => self.delete_property(resolved.scope, resolved.property_name.as_str()),
                    None => false,
                };
                ectx.push(deleted);
                self.sync_events(name.as_str());
            }
            Action::Enumerate => {
                let name = ectx.pop();
                let name = self.to_name(&name)?;
                let resolved = self.resolve_variable(
                    &ectx.scope_list,
                    name.as_str(),
                    ResolveFlags::READ | ResolveFlags::GET_VALUE,
                )?;
                ectx.push(Value::Null);
                match resolved {
                    Some(resolved) => self.push_keys(ectx, &resolved.value)?,
                    None => avm1_warn!(self, "Cannot enumerate {}", name),
                }
            }
            Action::Enumerate2 => {
                let obj = ectx.pop();
                ectx.push(Value::Null);
                self.push_keys(ectx, &obj)?;
            }
            Action::Equals2 => {
                let a = ectx.pop();
                let b = ectx.pop();
                let equal = self.equals(&b, &a)?;
                ectx.push(equal);
            }
            Action::InitArray => {
                let elements = self.read_function_args(ectx)?;
                let array = self.create_array(&elements);
                ectx.push(array);
            }
            Action::InitObject => {
                let count = ectx.pop();
                let count = self.to_number(&count)?;
                let count = self.fix_args_count(count, ectx.stack.len() / 2);
                let obj = self.create_object();
                for _ in 0..count {
                    let value = ectx.pop();
                    let name = ectx.pop();
                    let name = self.to_name(&name)?;
                    self.put(obj, name.as_str(), value)?;
                }
                ectx.push(obj);
            }
            Action::TargetPath => {
                let obj = ectx.pop();
                let path = match obj.as_object() {
                    Some(clip) if self.heap.get(clip).is_movie_clip() => self.get(clip, "_target")?,
                    _ => Value::Undefined,
                };
                ectx.push(path);
            }
            Action::ToNumber => {
                let value = ectx.pop();
                ectx.push(self.to_number(&value)?);
            }
            Action::ToString => {
                let value = ectx.pop();
                ectx.push(self.to_avm_string(&value)?);
            }
            Action::TypeOf => {
                let value = ectx.pop();
                ectx.push(self.type_of(&value));
            }
            Action::Add2 => {
                let a = ectx.pop();
                let a = self.to_primitive(&a, None)?;
                let b = ectx.pop();
                let b = self.to_primitive(&b, None)?;
                if a.is_string() || b.is_string() {
                    let b = self.to_avm_string(&b)?;
                    let a = self.to_avm_string(&a)?;
                    ectx.push(format!("{}{}", b, a));
                } else {
                    let b = self.to_number(&b)?;
                    let a = self.to_number(&a)?;
                    ectx.push(b + a);
                }
            }
            Action::Less2 => {
                let a = ectx.pop();
                let b = ectx.pop();
                let result = self.compare(&b, &a)?;
                ectx.push(result.map_or(Value::Undefined, Value::Boolean));
            }
            Action::Greater => {
                let a = ectx.pop();
                let b = ectx.pop();
                let result = self.compare(&a, &b)?;
                ectx.push(result.map_or(Value::Undefined, Value::Boolean));
            }
            Action::Modulo => self.numeric_op(ectx, |b, a| b % a)?,
            Action::BitAnd => self.bitwise_op(ectx, |b, a| f64::from(b & a))?,
            Action::BitOr => self.bitwise_op(ectx, |b, a| f64::from(b | a))?,
            Action::BitXor => self.bitwise_op(ectx, |b, a| f64::from(b ^ a))?,
            Action::BitLShift => self.bitwise_op(ectx, |b, a| f64::from(b.wrapping_shl(a as u32 & 31)))?,
            Action::BitRShift => self.bitwise_op(ectx, |b, a| f64::from(b.wrapping_shr(a as u32 & 31)))?,
            Action::BitURShift => self.bitwise_op(ectx, |b, a| f64::from((b as u32).wrapping_shr(a as u32 & 31)))?,
            Action::Increment => {
                let value = ectx.pop();
                ectx.push(self.to_number(&value)? + 1.0);
            }
            Action::Decrement => {
                let value = ectx.pop();
                ectx.push(self.to_number(&value)? - 1.0);
            }
            Action::PushDuplicate => {
                let top = ectx.peek();
                ectx.push(top);
            }
            Action::Return => ectx.is_end_of_actions = true,
            Action::StackSwap => {
                let a = ectx.pop();
                let b = ectx.pop();
                ectx.push(a);
                ectx.push(b);
            }
            Action::StoreRegister { register } => {
                let top = ectx.peek();
                ectx.set_register(usize::from(*register), top);
            }

            // SWF 6/7
            Action::InstanceOf => {
                let constructor = ectx.pop();
                let obj = ectx.pop();
                let result = self.instance_of(&obj, &constructor)?;
                ectx.push(result);
            }
            Action::StrictEquals => {
                let a = ectx.pop();
                let b = ectx.pop();
                ectx.push(b.strict_equals(&a));
            }
            Action::Extends => self.action_extends(ectx)?,
            Action::CastOp => {
                let obj = ectx.pop();
                let constructor = ectx.pop();
                let result = if self.instance_of(&obj, &constructor)? {
                    obj
                } else {
                    Value::Null
                };
                ectx.push(result);
            }
            Action::ImplementsOp => {
                let constructor = ectx.pop();
                let interfaces = self.read_function_args(ectx)?;
                let prototype = match constructor.as_object() {
                    Some(constructor) => self.get(constructor, "prototype")?.as_object(),
                    None => None,
                };
                match prototype {
                    Some(prototype) => self.heap.get_mut(prototype).interfaces = interfaces,
                    None => avm1_warn!(self, "ImplementsOp on a non-constructor {:?}", constructor),
                }
            }
            Action::Throw => {
                let value = ectx.pop();
                return Err(AvmError::thrown(value));
            }
            Action::FsCommand2 => {
                let args = self.read_function_args(ectx)?;
                let mut parts = Vec::with_capacity(args.len());
                for arg in &args {
                    parts.push(self.to_avm_string(arg)?);
                }
                let (command, rest) = parts.split_first().map_or(("", &[][..]), |(c, r)| (c.as_str(), r));
                let rest: Vec<&str> = rest.iter().map(AvmString::as_str).collect();
                self.host.fscommand(command, &rest.join(","));
            }
            Action::Unknown { code } => {
                return Err(AvmError::critical(format!("Unknown action code: 0x{:02X}", code)));
            }
            Action::CallFunction
            | Action::CallMethod
            | Action::NewObject
            | Action::NewMethod
            | Action::GetVariable
            | Action::SetVariable
            | Action::GetMember
            | Action::SetMember
            | Action::Call
            | Action::With { .. }
            | Action::Try(_) => return Err(AvmError::internal("re-entrant action reached the simple handler")),
        }
        Ok(false)
    }

    fn swf4_boolean(&self, value: bool) -> Value {
        if self.is_swf_version5() {
            Value::Boolean(value)
        } else {
            Value::Number(if value { 1.0 } else { 0.0 })
        }
    }

    fn numeric_op(&mut self, ectx: &mut ExecutionContext, op: impl Fn(f64, f64) -> f64) -> AvmResult<()> {
        let a = ectx.pop();
        let a = self.to_number(&a)?;
        let b = ectx.pop();
        let b = self.to_number(&b)?;
        ectx.push(op(b, a));
        Ok(())
    }

    fn bitwise_op(&mut self, ectx: &mut ExecutionContext, op: impl Fn(i32, i32) -> f64) -> AvmResult<()> {
        let a = ectx.pop();
        let a = self.to_int32(&a)?;
        let b = ectx.pop();
        let b = self.to_int32(&b)?;
        ectx.push(op(b, a));
        Ok(())
    }

    /// `(b, a)` where `a` was on top of the stack.
    fn pop_string_pair(&mut self, ectx: &mut ExecutionContext) -> AvmResult<(AvmString, AvmString)> {
        let a = ectx.pop();
        let a = self.to_avm_string(&a)?;
        let b = ectx.pop();
        let b = self.to_avm_string(&b)?;
        Ok((b, a))
    }

    /// Movie clip the timeline actions apply to.
    fn current_clip(&self, ectx: &ExecutionContext) -> Option<ObjectId> {
        let clip = self
            .get_target(&ectx.scope_list, true)
            .filter(|target| self.heap.get(*target).is_movie_clip());
        if clip.is_none() {
            avm1_warn!(self, "No movie clip target for timeline action");
        }
        clip
    }

    fn target_argument(&mut self, ectx: &ExecutionContext, target: &Value) -> AvmResult<Option<ObjectId>> {
        let scope_list = Rc::clone(&ectx.scope_list);
        self.resolve_target(&scope_list, target, true)
    }

    /// `getURL`; `FSCommand:` URLs are routed to `fscommand`.
    fn get_url(&mut self, url: &str, target: &str, method: SendVarsMethod) {
        const FSCOMMAND: &str = "fscommand:";
        match url.get(..FSCOMMAND.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(FSCOMMAND) => {
                self.host.fscommand(url.get(FSCOMMAND.len()..).unwrap_or(""), target);
            }
            _ => self.host.get_url(url, target, method),
        }
    }

    fn push_keys(&mut self, ectx: &mut ExecutionContext, value: &Value) -> AvmResult<()> {
        if value.is_null_or_undefined() {
            return Ok(());
        }
        let obj = self.to_object(value)?;
        for key in self.keys(obj) {
            ectx.push(key);
        }
        Ok(())
    }

    /// `call(frame)`: run the actions of another frame on the current target.
    fn action_call(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let frame = ectx.pop();
        let frame = self.to_frame_ref(&frame)?;
        let Some(clip) = self.current_clip(ectx) else {
            return Ok(());
        };
        match self.host.call_frame(clip, &frame) {
            Some(actions) => self.execute_actions_data(&actions, clip),
            None => {
                avm1_warn!(self, "Unable to call frame {:?}", frame);
                Ok(())
            }
        }
    }

    fn action_goto_frame2(
        &mut self,
        ectx: &mut ExecutionContext,
        play: bool,
        scene_bias: Option<u16>,
    ) -> AvmResult<()> {
        let frame = ectx.pop();
        let mut clip = self.current_clip(ectx);
        let frame = match &frame {
            // "path:label" addresses another clip
            Value::String(s) if s.as_str().contains(':') => {
                let (path, label) = s.as_str().rsplit_once(':').unwrap_or(("", s.as_str()));
                clip = self.target_argument(ectx, &Value::from(path))?;
                self.to_frame_ref(&Value::from(label))?
            }
            other => self.to_frame_ref(other)?,
        };
        let frame = match (frame, scene_bias) {
            (FrameRef::Number(n), Some(bias)) => FrameRef::Number(n.saturating_add(u32::from(bias))),
            (frame, _) => frame,
        };
        if let Some(clip) = clip {
            self.host.goto_frame(clip, frame, play);
        }
        Ok(())
    }

    fn action_start_drag(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let target = ectx.pop();
        let lock_center = ectx.pop().to_boolean();
        let constrain = ectx.pop().to_boolean();
        let constraint = if constrain {
            let mut coords = [0.0; 4];
            for coord in &mut coords {
                let value = ectx.pop();
                *coord = self.to_number(&value)?;
            }
            let [y2, x2, y1, x1] = coords;
            Some(DragConstraint { x1, y1, x2, y2 })
        } else {
            None
        };
        if let Some(clip) = self.target_argument(ectx, &target)? {
            self.host.start_drag(clip, lock_center, constraint);
        }
        Ok(())
    }

    fn action_get_variable(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let name = ectx.pop();
        let name = self.to_name(&name)?;
        let resolved = self.resolve_variable(
            &ectx.scope_list,
            name.as_str(),
            ResolveFlags::READ | ResolveFlags::GET_VALUE,
        )?;
        match resolved {
            Some(resolved) => ectx.push(resolved.value),
            None => {
                avm1_warn!(self, "Cannot look up variable '{}'", name);
                ectx.push(Value::Undefined);
            }
        }
        Ok(())
    }

    fn action_set_variable(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let value = ectx.pop();
        let name = ectx.pop();
        let name = self.to_name(&name)?;
        match self.resolve_variable(&ectx.scope_list, name.as_str(), ResolveFlags::WRITE)? {
            Some(resolved) => {
                self.put(resolved.scope, resolved.property_name.as_str(), value)?;
                self.sync_events(resolved.property_name.as_str());
            }
            None => avm1_warn!(self, "Cannot set variable '{}'", name),
        }
        Ok(())
    }

    fn action_define_function(&mut self, ectx: &mut ExecutionContext, definition: &Rc<FunctionDefinition>) -> AvmResult<()> {
        let function = self.define_function(ectx, definition);
        if definition.name.is_empty() {
            ectx.push(function);
        } else {
            self.put(ectx.scope_list.scope, definition.name.as_str(), Value::Object(function))?;
            self.sync_events(definition.name.as_str());
        }
        Ok(())
    }

    fn action_call_function(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let name = ectx.pop();
        let name = self.to_name(&name)?;
        let args = self.read_function_args(ectx)?;
        let resolved = self.resolve_variable(
            &ectx.scope_list,
            name.as_str(),
            ResolveFlags::READ | ResolveFlags::GET_VALUE,
        )?;
        let callable = resolved.and_then(|r| {
            r.value
                .as_object()
                .filter(|f| self.is_function(*f))
                .map(|f| (f, r.scope))
        });
        match callable {
            Some((function, scope)) => {
                let result = self.call_function(function, Value::Object(scope), &args)?;
                ectx.push(result);
            }
            None => {
                avm1_warn!(self, "Function '{}' is not defined", name);
                ectx.push(Value::Undefined);
            }
        }
        Ok(())
    }

    /// `obj[name](args)`, `super.name(args)` and `super(args)`.
    fn action_call_method(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let method_name = ectx.pop();
        let obj = ectx.pop();
        let args = self.read_function_args(ectx)?;
        let super_frame = self.super_frame(&obj);

        let mut target = Value::Undefined;
        let mut super_owner = None;
        let mut function = Value::Undefined;

        if is_empty_name(&method_name) {
            match &super_frame {
                Some(frame) => {
                    super_owner = self.find_super_property_owner(frame, "__constructor__");
                    if let Some(owner) = super_owner {
                        function = self.get(owner, "__constructor__")?;
                        target = frame.current_this.cheap_clone();
                    }
                }
                None => function = obj,
            }
        } else {
            let name = self.to_name(&method_name)?;
            match &super_frame {
                Some(frame) => {
                    super_owner = self.find_super_property_owner(frame, name.as_str());
                    if let Some(owner) = super_owner {
                        function = self.get(owner, name.as_str())?;
                        target = frame.current_this.cheap_clone();
                    }
                }
                None => {
                    if obj.is_null_or_undefined() {
                        avm1_warn!(self, "Cannot call method '{}' of {:?}", name, obj);
                        ectx.push(Value::Undefined);
                        return Ok(());
                    }
                    let receiver = self.to_object(&obj)?;
                    function = self.get(receiver, name.as_str())?;
                    target = Value::Object(receiver);
                }
            }
        }

        let Some(function) = function.as_object().filter(|f| self.is_function(*f)) else {
            avm1_warn!(self, "Method {:?} is not a function", method_name);
            ectx.push(Value::Undefined);
            return Ok(());
        };
        let frame = self.frame.clone();
        if let Some(frame) = &frame {
            frame.set_callee(target.cheap_clone(), super_owner, function);
        }
        let result = self.call_function(function, target, &args);
        if let Some(frame) = &frame {
            frame.reset_callee();
        }
        ectx.push(result?);
        Ok(())
    }

    fn action_get_member(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let name = ectx.pop();
        let name = self.to_name(&name)?;
        let obj = ectx.pop();
        if let Some(frame) = self.super_frame(&obj) {
            let value = match self.find_super_property_owner(&frame, name.as_str()) {
                Some(owner) => self.get(owner, name.as_str())?,
                None => Value::Undefined,
            };
            ectx.push(value);
            return Ok(());
        }
        if obj.is_null_or_undefined() {
            avm1_warn!(self, "Cannot get member '{}' of {:?}", name, obj);
            ectx.push(Value::Undefined);
            return Ok(());
        }
        let target = self.to_object(&obj)?;
        let value = self.get(target, name.as_str())?;
        ectx.push(value);
        Ok(())
    }

    fn action_set_member(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let value = ectx.pop();
        let name = ectx.pop();
        let name = self.to_name(&name)?;
        let obj = ectx.pop();
        if self.super_frame(&obj).is_some() {
            avm1_warn!(self, "Setting '{}' through super is not supported", name);
            return Ok(());
        }
        if obj.is_null_or_undefined() {
            avm1_warn!(self, "Cannot set member '{}' of {:?}", name, obj);
            return Ok(());
        }
        let target = self.to_object(&obj)?;
        self.put(target, name.as_str(), value)?;
        self.sync_events(name.as_str());
        Ok(())
    }

    fn action_new_method(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let method_name = ectx.pop();
        let obj = ectx.pop();
        let args = self.read_function_args(ectx)?;
        let constructor = if is_empty_name(&method_name) {
            obj
        } else if obj.is_null_or_undefined() {
            Value::Undefined
        } else {
            let name = self.to_name(&method_name)?;
            let receiver = self.to_object(&obj)?;
            self.get(receiver, name.as_str())?
        };
        match constructor.as_object().filter(|f| self.is_function(*f)) {
            Some(constructor) => {
                let result = self.construct(constructor, &args)?;
                ectx.push(result);
            }
            None => {
                avm1_warn!(self, "Method {:?} is not a constructor", method_name);
                ectx.push(Value::Undefined);
            }
        }
        Ok(())
    }

    fn action_new_object(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let name = ectx.pop();
        let name = self.to_name(&name)?;
        let args = self.read_function_args(ectx)?;
        let resolved = self.resolve_variable(
            &ectx.scope_list,
            name.as_str(),
            ResolveFlags::READ | ResolveFlags::GET_VALUE,
        )?;
        let constructor = resolved.and_then(|r| r.value.as_object()).filter(|f| self.is_function(*f));
        let Some(constructor) = constructor else {
            avm1_warn!(self, "Constructor '{}' is not defined", name);
            ectx.push(Value::Undefined);
            return Ok(());
        };
        let result = match self.create_builtin_type(constructor, &args)? {
            Some(result) => result,
            None => {
                let result = self.construct(constructor, &args)?;
                if result == Value::Undefined {
                    avm1_warn!(self, "Constructor '{}' returned undefined", name);
                }
                result
            }
        };
        ectx.push(result);
        Ok(())
    }

    /// `Sub extends Super`: `Sub.prototype` inherits from `Super.prototype`.
    fn action_extends(&mut self, ectx: &mut ExecutionContext) -> AvmResult<()> {
        let super_constructor = ectx.pop();
        let constructor = ectx.pop();
        let (Some(super_constructor), Some(constructor)) = (super_constructor.as_object(), constructor.as_object())
        else {
            avm1_warn!(self, "Invalid Extends operands");
            return Ok(());
        };
        let super_prototype = self.get(super_constructor, "prototype")?.as_object();
        let prototype = match self.get(constructor, "prototype")?.as_object() {
            Some(prototype) => prototype,
            None => {
                let prototype = self.create_object();
                self.define_value(
                    constructor,
                    "prototype",
                    Value::Object(prototype),
                    PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
                );
                prototype
            }
        };
        if !self.heap.set_prototype(prototype, super_prototype) {
            avm1_warn!(self, "Extends would create a prototype cycle");
        }
        self.define_value(
            prototype,
            "__constructor__",
            Value::Object(super_constructor),
            PropertyFlags::DONT_ENUM,
        );
        Ok(())
    }
}

fn clamp_i64(n: f64) -> i64 {
    if n.is_nan() { 0 } else { n.clamp(i64::MIN as f64, i64::MAX as f64) as i64 }
}
