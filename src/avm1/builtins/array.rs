//! Array constructor and a minimal Array.prototype
//!
//! Arrays are ordinary property bags with index keys and a `length` data
//! property; only the methods below keep `length` in sync.

use crate::avm1::Avm1;
use crate::avm1::object::PropertyFlags;
use crate::error::AvmResult;
use crate::value::{AvmString, ObjectId, Value};

pub fn init_array_prototype(avm: &mut Avm1) {
    let proto = avm.builtins.array_prototype;
    avm.register_method(proto, "push", array_push);
    avm.register_method(proto, "pop", array_pop);
    avm.register_method(proto, "join", array_join);
    avm.register_method(proto, "toString", array_to_string);
    avm.define_value(proto, "length", Value::from(0), PropertyFlags::DONT_ENUM);
}

/// `Array(n)` makes `n` empty slots, `Array(a, b, ...)` holds the arguments.
pub fn array_call(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    if let [Value::Number(n)] = args {
        let array = avm.create_array(&[]);
        let length = if *n >= 0.0 && n.fract() == 0.0 { *n } else { 0.0 };
        avm.define_value(array, "length", Value::from(length), PropertyFlags::DONT_ENUM);
        return Ok(Value::Object(array));
    }
    Ok(Value::Object(avm.create_array(args)))
}

impl Avm1 {
    pub(crate) fn array_length(&mut self, array: ObjectId) -> AvmResult<usize> {
        let length = self.get(array, "length")?;
        let length = self.to_integer(&length)?;
        Ok(if length > 0.0 { length as usize } else { 0 })
    }

    /// Elements `0..length` of an array-like object.
    pub(crate) fn array_like_values(&mut self, array: ObjectId) -> AvmResult<Vec<Value>> {
        let length = self.array_length(array)?;
        (0..length).map(|i| self.get(array, &i.to_string())).collect()
    }

    fn set_array_length(&mut self, array: ObjectId, length: usize) {
        self.define_value(array, "length", Value::from(length as f64), PropertyFlags::DONT_ENUM);
    }
}

pub fn array_push(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let array = avm.to_object(&this)?;
    let mut length = avm.array_length(array)?;
    for value in args {
        avm.put(array, &length.to_string(), value.clone())?;
        length += 1;
    }
    avm.set_array_length(array, length);
    Ok(Value::from(length as f64))
}

pub fn array_pop(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let array = avm.to_object(&this)?;
    let length = avm.array_length(array)?;
    let Some(last) = length.checked_sub(1) else {
        return Ok(Value::Undefined);
    };
    let key = last.to_string();
    let value = avm.get(array, &key)?;
    avm.delete_property(array, &key);
    avm.set_array_length(array, last);
    Ok(value)
}

/// Undefined and null elements join as empty strings.
pub fn array_join(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let array = avm.to_object(&this)?;
    let separator = match args.first() {
        None | Some(Value::Undefined) => AvmString::from(","),
        Some(sep) => avm.to_avm_string(sep)?,
    };
    let values = avm.array_like_values(array)?;
    let mut parts = Vec::with_capacity(values.len());
    for value in &values {
        parts.push(if value.is_null_or_undefined() {
            String::new()
        } else {
            avm.to_avm_string(value)?.as_str().to_string()
        });
    }
    Ok(Value::from(parts.join(separator.as_str())))
}

pub fn array_to_string(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    array_join(avm, this, &[])
}
