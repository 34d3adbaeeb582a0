//! Function constructor and Function.prototype

use super::arg;
use crate::avm1::Avm1;
use crate::error::{AvmError, AvmResult};
use crate::value::Value;

pub fn init_function_prototype(avm: &mut Avm1) {
    let proto = avm.builtins.function_prototype;
    avm.register_method(proto, "call", function_prototype_call);
    avm.register_method(proto, "apply", function_prototype_apply);
}

pub fn empty_function(_avm: &mut Avm1, _this: Value, _args: &[Value]) -> AvmResult<Value> {
    Ok(Value::Undefined)
}

/// Scripts cannot compile source at runtime; `Function()` yields a function
/// that does nothing.
pub fn function_call(avm: &mut Avm1, _this: Value, _args: &[Value]) -> AvmResult<Value> {
    let function = avm.create_native_function("anonymous", Some(empty_function), None);
    Ok(Value::Object(function))
}

pub fn function_construct(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    function_call(avm, this, args)
}

fn this_function(avm: &Avm1, this: &Value) -> AvmResult<crate::value::ObjectId> {
    this.as_object()
        .filter(|f| avm.is_function(*f))
        .ok_or_else(|| AvmError::type_error("Function.prototype method called on incompatible receiver"))
}

/// `fn.call(thisArg, ...args)`
pub fn function_prototype_call(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let function = this_function(avm, &this)?;
    let rest = args.get(1..).unwrap_or_default();
    avm.call_function(function, arg(args, 0), rest)
}

/// `fn.apply(thisArg, argsArray)`
pub fn function_prototype_apply(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let function = this_function(avm, &this)?;
    let call_args = match arg(args, 1).as_object() {
        Some(array) => avm.array_like_values(array)?,
        None => Vec::new(),
    };
    avm.call_function(function, arg(args, 0), &call_args)
}
