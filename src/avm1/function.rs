//! Functions, closures and the call/construct protocol

use std::rc::Rc;

use super::actions::{ArgumentAssignmentType, FunctionDefinition, RegisterAllocation};
use super::context::ExecutionContext;
use super::frame::CallFrame;
use super::object::{Object, ObjectKind, PropertyFlags, Traceable};
use super::scope::ScopeListItem;
use super::{Avm1, avm1_warn};
use crate::error::{AvmError, AvmResult};
use crate::value::{AvmString, CheapClone, ObjectId, Value};

/// Host callable: `(context, this, args) -> result`.
pub type NativeFn = fn(&mut Avm1, Value, &[Value]) -> AvmResult<Value>;

#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub name: AvmString,
    pub invoke: Option<NativeFn>,
    /// Called by `new`; without it the function is not a constructor
    pub construct: Option<NativeFn>,
}

/// A closure created by DefineFunction/DefineFunction2.
///
/// Captures the scope list and constant pool in effect at definition time.
#[derive(Debug)]
pub struct InterpretedFunction {
    pub definition: Rc<FunctionDefinition>,
    pub scope_list: Rc<ScopeListItem>,
    pub constant_pool: Rc<[Value]>,
    /// Argument indices already delivered through registers
    skip_arguments: Vec<bool>,
    registers_length: usize,
}

impl InterpretedFunction {
    pub fn new(
        definition: Rc<FunctionDefinition>,
        scope_list: Rc<ScopeListItem>,
        constant_pool: Rc<[Value]>,
        max_registers: usize,
    ) -> Self {
        let mut skip_arguments = Vec::new();
        for allocation in definition.registers_allocation.iter().flatten() {
            if let RegisterAllocation::Argument(index) = allocation {
                if skip_arguments.len() <= *index {
                    skip_arguments.resize(index + 1, false);
                }
                if let Some(skip) = skip_arguments.get_mut(*index) {
                    *skip = true;
                }
            }
        }
        let allocation_count = definition.registers_allocation.len();
        let registers_length = definition
            .register_count
            .min(max_registers)
            .max(allocation_count + 1);
        Self {
            definition,
            scope_list,
            constant_pool,
            skip_arguments,
            registers_length,
        }
    }

    pub fn name(&self) -> &AvmString {
        &self.definition.name
    }

    pub fn registers_length(&self) -> usize {
        self.registers_length
    }

    fn skips_argument(&self, index: usize) -> bool {
        self.skip_arguments.get(index).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub enum FunctionKind {
    Native(NativeFunction),
    Interpreted(Rc<InterpretedFunction>),
}

impl Traceable for FunctionKind {
    fn trace<F: FnMut(ObjectId)>(&self, visitor: &mut F) {
        if let FunctionKind::Interpreted(closure) = self {
            closure.scope_list.trace(visitor);
            for constant in closure.constant_pool.iter() {
                constant.trace(visitor);
            }
        }
    }
}

impl Avm1 {
    /// Function object backed by host code.
    pub fn create_native_function(
        &mut self,
        name: &str,
        invoke: Option<NativeFn>,
        construct: Option<NativeFn>,
    ) -> ObjectId {
        let kind = FunctionKind::Native(NativeFunction {
            name: AvmString::from(name),
            invoke,
            construct,
        });
        self.heap.alloc(Object::new(
            ObjectKind::Function(kind),
            Some(self.builtins.function_prototype),
        ))
    }

    /// Install a native method as a non-enumerable property.
    pub fn register_method(&mut self, obj: ObjectId, name: &str, invoke: NativeFn) {
        let function = self.create_native_function(name, Some(invoke), None);
        self.define_value(obj, name, Value::Object(function), PropertyFlags::DONT_ENUM);
    }

    /// Create the closure for a DefineFunction(2) action in `ectx`.
    pub(crate) fn define_function(
        &mut self,
        ectx: &ExecutionContext,
        definition: &Rc<FunctionDefinition>,
    ) -> ObjectId {
        let closure = InterpretedFunction::new(
            Rc::clone(definition),
            Rc::clone(&ectx.scope_list),
            Rc::clone(&ectx.constant_pool),
            self.settings().max_registers,
        );
        let function = self.heap.alloc(Object::new(
            ObjectKind::Function(FunctionKind::Interpreted(Rc::new(closure))),
            Some(self.builtins.function_prototype),
        ));
        let prototype = self.create_object();
        self.define_value(
            prototype,
            "constructor",
            Value::Object(function),
            PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
        );
        self.define_value(
            function,
            "prototype",
            Value::Object(prototype),
            PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE,
        );
        function
    }

    fn function_kind(&self, function: ObjectId) -> Option<FunctionKind> {
        self.heap.get(function).as_function().cloned()
    }

    /// `[[Call]]`
    pub fn call_function(&mut self, function: ObjectId, this: Value, args: &[Value]) -> AvmResult<Value> {
        match self.function_kind(function) {
            Some(FunctionKind::Native(native)) => match native.invoke {
                Some(invoke) => invoke(self, this, args),
                None => Err(AvmError::type_error(format!("{} is not callable", native.name))),
            },
            Some(FunctionKind::Interpreted(closure)) => self.call_interpreted(function, &closure, this, args),
            None => Err(AvmError::type_error("not a function")),
        }
    }

    /// `[[Construct]]`: for interpreted functions a fresh object inheriting
    /// from `prototype` is passed as `this`; an object returned by the body
    /// replaces it.
    pub fn construct(&mut self, function: ObjectId, args: &[Value]) -> AvmResult<Value> {
        match self.function_kind(function) {
            Some(FunctionKind::Native(native)) => match native.construct {
                Some(construct) => construct(self, Value::Object(function), args),
                None => Err(AvmError::type_error(format!("{} is not a constructor", native.name))),
            },
            Some(FunctionKind::Interpreted(_)) => {
                let prototype = self
                    .get(function, "prototype")?
                    .as_object()
                    .unwrap_or(self.builtins.object_prototype);
                let obj = self
                    .heap
                    .alloc(Object::new(ObjectKind::Ordinary, Some(prototype)));
                self.define_value(obj, "__constructor__", Value::Object(function), PropertyFlags::DONT_ENUM);
                let result = self.call_function(function, Value::Object(obj), args)?;
                Ok(if result.is_object() { result } else { Value::Object(obj) })
            }
            None => Err(AvmError::type_error("not a constructor")),
        }
    }

    fn call_interpreted(
        &mut self,
        function: ObjectId,
        closure: &Rc<InterpretedFunction>,
        this: Value,
        args: &[Value],
    ) -> AvmResult<Value> {
        if self.is_execution_prohibited() {
            return Ok(Value::Undefined);
        }

        let activation = self
            .heap
            .alloc(Object::new(ObjectKind::Activation, Some(self.builtins.activation_prototype)));
        let scope_list = Rc::new(ScopeListItem::new(activation, Some(Rc::clone(&closure.scope_list))));
        let old_scope = closure.scope_list.scope;
        let this = if this.to_boolean() {
            this
        } else {
            Value::Object(old_scope)
        };

        let mut ectx = self.pool.create(
            Rc::clone(&scope_list),
            Rc::clone(&closure.constant_pool),
            closure.registers_length,
        );
        let caller = self.frame.as_ref().and_then(|frame| frame.function);
        let frame = Rc::new(CallFrame::new(
            self.frame.take(),
            this.cheap_clone(),
            Some(function),
            Rc::from(args),
            scope_list,
        ));
        self.frame = Some(Rc::clone(&frame));
        if self.tracer.is_some() {
            self.trace_call(closure.name());
        }

        self.stack_depth += 1;
        let result = if self.stack_depth >= self.settings().max_stack_depth {
            Err(AvmError::critical("long running script -- AVM1 recursion limit is reached"))
        } else {
            self.bind_arguments(&mut ectx, &frame, closure, activation, caller)
                .and_then(|()| self.interpret_actions_data(&mut ectx, &closure.definition.body))
        };
        self.stack_depth -= 1;

        if let Some(tracer) = self.tracer.as_mut() {
            tracer.unindent();
        }
        self.frame = frame.previous.clone();
        self.pool.dispose(ectx);
        result
    }

    #[cold]
    #[inline(never)]
    fn trace_call(&mut self, name: &AvmString) {
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.message(&format!("call {}", name));
            tracer.indent();
        }
    }

    /// Populate the activation and the preloaded registers.
    fn bind_arguments(
        &mut self,
        ectx: &mut ExecutionContext,
        frame: &Rc<CallFrame>,
        closure: &InterpretedFunction,
        activation: ObjectId,
        caller: Option<ObjectId>,
    ) -> AvmResult<()> {
        let definition = &closure.definition;
        let this = frame.current_this.cheap_clone();
        let args = &frame.args;
        let function = frame.function;
        let mut super_wrapper = None;

        if !definition.suppress.contains(ArgumentAssignmentType::ARGUMENTS) {
            let arguments = self.create_arguments(args, function, caller);
            self.put(activation, "arguments", Value::Object(arguments))?;
        }
        if !definition.suppress.contains(ArgumentAssignmentType::THIS) {
            self.put(activation, "this", this.cheap_clone())?;
        }
        if !definition.suppress.contains(ArgumentAssignmentType::SUPER) {
            let wrapper = self.create_super_wrapper(frame);
            super_wrapper = Some(wrapper);
            self.put(activation, "super", Value::Object(wrapper))?;
        }

        for (register, allocation) in definition.registers_allocation.iter().enumerate() {
            let Some(allocation) = allocation else {
                continue;
            };
            let value = match allocation {
                RegisterAllocation::Argument(index) => args.get(*index).cloned().unwrap_or_default(),
                RegisterAllocation::This => this.cheap_clone(),
                RegisterAllocation::Arguments => Value::Object(self.create_arguments(args, function, caller)),
                RegisterAllocation::Super => {
                    let wrapper = match super_wrapper {
                        Some(wrapper) => wrapper,
                        None => self.create_super_wrapper(frame),
                    };
                    super_wrapper = Some(wrapper);
                    Value::Object(wrapper)
                }
                RegisterAllocation::Global => Value::Object(self.globals()),
                RegisterAllocation::Parent => self.get(closure.scope_list.scope, "_parent")?,
                RegisterAllocation::Root => self.resolve_root(&ectx.scope_list).into(),
            };
            ectx.set_register(register, value);
        }

        for (index, name) in definition.params.iter().enumerate() {
            if closure.skips_argument(index) {
                continue;
            }
            let value = args.get(index).cloned().unwrap_or_default();
            self.put(activation, name.as_str(), value)?;
        }
        Ok(())
    }

    /// Array-like `arguments` object with `callee` and `caller`.
    fn create_arguments(&mut self, args: &[Value], callee: Option<ObjectId>, caller: Option<ObjectId>) -> ObjectId {
        let arguments = self
            .heap
            .alloc(Object::new(ObjectKind::Arguments, Some(self.builtins.array_prototype)));
        self.fill_array_like(arguments, args);
        self.define_value(arguments, "callee", callee.into(), PropertyFlags::DONT_ENUM);
        self.define_value(arguments, "caller", caller.into(), PropertyFlags::DONT_ENUM);
        arguments
    }

    fn create_super_wrapper(&mut self, frame: &Rc<CallFrame>) -> ObjectId {
        self.heap.alloc(Object::new(
            ObjectKind::SuperWrapper(Rc::clone(frame)),
            Some(self.builtins.object_prototype),
        ))
    }

    pub(crate) fn super_frame(&self, value: &Value) -> Option<Rc<CallFrame>> {
        match &self.heap.get(value.as_object()?).kind {
            ObjectKind::SuperWrapper(frame) => Some(Rc::clone(frame)),
            _ => None,
        }
    }

    /// Prototype a `super.name` lookup starts from: one link above the
    /// first object on `this`'s chain owning `name`, or above where the
    /// caller's super call stopped when this frame continues it. Always
    /// `None` before SWF 6.
    pub(crate) fn find_super_property_owner(&self, frame: &CallFrame, name: &str) -> Option<ObjectId> {
        if self.swf_version() < 6 {
            return None;
        }
        let owner = match frame.inherited_super() {
            Some(proto) => proto,
            None => {
                let this = frame.current_this.as_object()?;
                self.heap
                    .chain(this)
                    .find(|obj| self.get_own_property(*obj, name).is_some())?
            }
        };
        self.heap.prototype_of(owner)
    }

    /// Pop an argument count and that many arguments, clamped to the stack.
    pub(crate) fn read_function_args(&mut self, ectx: &mut ExecutionContext) -> AvmResult<Vec<Value>> {
        let count = ectx.pop();
        let count = self.to_number(&count)?;
        let count = self.fix_args_count(count, ectx.stack.len());
        Ok((0..count).map(|_| ectx.pop()).collect())
    }

    pub(crate) fn fix_args_count(&self, count: f64, max: usize) -> usize {
        if count.is_nan() || count < 0.0 {
            avm1_warn!(self, "Invalid amount of arguments: {}", count);
            return 0;
        }
        let count = count.trunc();
        if count > max as f64 {
            avm1_warn!(self, "Truncating amount of arguments: from {} to {}", count, max);
            return max;
        }
        count as usize
    }
}

/// Activation objects print as themselves.
pub(crate) fn activation_to_string(_avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    Ok(this)
}
