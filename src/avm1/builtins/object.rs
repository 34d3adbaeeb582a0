//! Object constructor and Object.prototype

use super::arg;
use crate::avm1::Avm1;
use crate::avm1::object::{PropertyDescriptor, PropertyFlags};
use crate::error::AvmResult;
use crate::value::{AvmString, Value};

pub fn init_object_prototype(avm: &mut Avm1) {
    let proto = avm.builtins.object_prototype;
    avm.register_method(proto, "toString", object_to_string);
    avm.register_method(proto, "valueOf", object_value_of);
    avm.register_method(proto, "hasOwnProperty", object_has_own_property);
    avm.register_method(proto, "isPropertyEnumerable", object_is_property_enumerable);
    avm.register_method(proto, "isPrototypeOf", object_is_prototype_of);
    avm.register_method(proto, "watch", object_watch);
    avm.register_method(proto, "unwatch", object_unwatch);
    avm.register_method(proto, "addProperty", object_add_property);
}

/// `Object(value)`: boxes primitives, creates an empty object for
/// undefined/null.
pub fn object_call(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    let value = arg(args, 0);
    if value.is_null_or_undefined() {
        return Ok(Value::Object(avm.create_object()));
    }
    Ok(Value::Object(avm.to_object(&value)?))
}

pub fn object_construct(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    object_call(avm, this, args)
}

pub fn object_to_string(_avm: &mut Avm1, _this: Value, _args: &[Value]) -> AvmResult<Value> {
    Ok(Value::from("[object Object]"))
}

pub fn object_value_of(_avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    Ok(this)
}

pub fn object_has_own_property(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let obj = avm.to_object(&this)?;
    let name = avm.to_avm_string(&arg(args, 0))?;
    Ok(Value::Boolean(avm.has_own_property(obj, name.as_str())))
}

pub fn object_is_property_enumerable(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let obj = avm.to_object(&this)?;
    let name = avm.to_avm_string(&arg(args, 0))?;
    let enumerable = avm
        .get_own_property(obj, name.as_str())
        .is_some_and(|desc| desc.is_enumerable());
    Ok(Value::Boolean(enumerable))
}

pub fn object_is_prototype_of(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let (Some(proto), Some(obj)) = (this.as_object(), arg(args, 0).as_object()) else {
        return Ok(Value::Boolean(false));
    };
    let found = avm.heap().chain(obj).skip(1).any(|p| p == proto);
    Ok(Value::Boolean(found))
}

/// `watch(name, callback[, userData])`
pub fn object_watch(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let obj = avm.to_object(&this)?;
    let name = avm.to_avm_string(&arg(args, 0))?;
    let Some(callback) = arg(args, 1).as_object().filter(|f| avm.is_function(*f)) else {
        return Ok(Value::Boolean(false));
    };
    Ok(Value::Boolean(avm.add_watcher(obj, name.as_str(), callback, arg(args, 2))))
}

pub fn object_unwatch(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let obj = avm.to_object(&this)?;
    let name = avm.to_avm_string(&arg(args, 0))?;
    Ok(Value::Boolean(avm.remove_watcher(obj, name.as_str())))
}

/// `addProperty(name, getter, setter)`: the getter must be a function, the
/// setter a function or null (read-only property).
pub fn object_add_property(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let obj = avm.to_object(&this)?;
    let name = avm.to_avm_string(&arg(args, 0))?;
    if name.is_empty() {
        return Ok(Value::Boolean(false));
    }
    let Some(getter) = arg(args, 1).as_object().filter(|f| avm.is_function(*f)) else {
        return Ok(Value::Boolean(false));
    };
    let setter = match arg(args, 2) {
        Value::Null => None,
        Value::Object(f) if avm.is_function(f) => Some(f),
        _ => return Ok(Value::Boolean(false)),
    };
    let desc = PropertyDescriptor::accessor(AvmString::from(name.as_str()), Some(getter), setter, PropertyFlags::empty());
    avm.set_own_property(obj, name.as_str(), desc);
    Ok(Value::Boolean(true))
}
