//! Boolean, Number and String: boxing constructors and prototypes

use super::arg;
use crate::avm1::Avm1;
use crate::avm1::coerce::to_integer;
use crate::avm1::object::ObjectKind;
use crate::error::AvmResult;
use crate::value::{AvmString, CheapClone, Value, number_to_string};

pub fn init_primitive_prototypes(avm: &mut Avm1) {
    let b = avm.builtins.clone();
    avm.register_method(b.boolean_prototype, "toString", boolean_to_string);
    avm.register_method(b.boolean_prototype, "valueOf", primitive_value_of);

    avm.register_method(b.number_prototype, "toString", number_to_string_method);
    avm.register_method(b.number_prototype, "valueOf", primitive_value_of);

    avm.register_method(b.string_prototype, "toString", primitive_value_of);
    avm.register_method(b.string_prototype, "valueOf", primitive_value_of);
    avm.register_method(b.string_prototype, "charAt", string_char_at);
    avm.register_method(b.string_prototype, "charCodeAt", string_char_code_at);
    avm.register_method(b.string_prototype, "indexOf", string_index_of);
    avm.register_method(b.string_prototype, "substr", string_substr);
    avm.register_method(b.string_prototype, "toUpperCase", string_to_upper_case);
    avm.register_method(b.string_prototype, "toLowerCase", string_to_lower_case);
}

/// Primitive wrapped by `this`, or `this` itself when it is a primitive.
fn this_primitive(avm: &Avm1, this: &Value) -> Value {
    match this.as_object() {
        Some(obj) => avm.heap().get(obj).boxed_primitive().unwrap_or_else(|| this.cheap_clone()),
        None => this.cheap_clone(),
    }
}

// Boolean

pub fn boolean_call(_avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    Ok(Value::Boolean(arg(args, 0).to_boolean()))
}

pub fn boolean_construct(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    let value = arg(args, 0).to_boolean();
    Ok(Value::Object(avm.create_boxed(ObjectKind::Boolean(value))))
}

pub fn boolean_to_string(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let value = this_primitive(avm, &this).to_boolean();
    Ok(Value::from(if value { "true" } else { "false" }))
}

pub fn primitive_value_of(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    Ok(this_primitive(avm, &this))
}

// Number

/// `Number()` is 0, `Number(x)` converts.
pub fn number_call(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    match args.first() {
        None => Ok(Value::from(0)),
        Some(value) => Ok(Value::Number(avm.to_number(value)?)),
    }
}

pub fn number_construct(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let n = number_call(avm, this, args)?.as_number().unwrap_or(0.0);
    Ok(Value::Object(avm.create_boxed(ObjectKind::Number(n))))
}

/// `toString(radix)`; radix 2..36 applies to integral values only.
pub fn number_to_string_method(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let primitive = this_primitive(avm, &this);
    let n = avm.to_number(&primitive)?;
    let radix = match args.first() {
        None | Some(Value::Undefined) => 10.0,
        Some(radix) => avm.to_integer(radix)?,
    };
    if radix == 10.0 || !(2.0..=36.0).contains(&radix) || !n.is_finite() || n.fract() != 0.0 {
        return Ok(Value::from(number_to_string(n)));
    }
    Ok(Value::from(integer_to_radix(n, radix as u32)))
}

fn integer_to_radix(n: f64, radix: u32) -> String {
    let negative = n < 0.0;
    let mut magnitude = n.abs();
    let mut digits = Vec::new();
    while magnitude >= 1.0 {
        let digit = (magnitude % f64::from(radix)) as u32;
        digits.push(char::from_digit(digit, radix).unwrap_or('0'));
        magnitude = (magnitude / f64::from(radix)).floor();
    }
    if digits.is_empty() {
        digits.push('0');
    }
    if negative {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

// String

pub fn string_call(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    match args.first() {
        None => Ok(Value::from("")),
        Some(value) => Ok(Value::String(avm.to_avm_string(value)?)),
    }
}

pub fn string_construct(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let s = match string_call(avm, this, args)? {
        Value::String(s) => s,
        _ => AvmString::from(""),
    };
    Ok(Value::Object(avm.create_boxed(ObjectKind::String(s))))
}

fn this_units(avm: &mut Avm1, this: &Value) -> AvmResult<Vec<u16>> {
    let primitive = this_primitive(avm, this);
    Ok(avm.to_avm_string(&primitive)?.as_str().encode_utf16().collect())
}

fn index_arg(avm: &mut Avm1, args: &[Value], index: usize) -> AvmResult<f64> {
    Ok(to_integer(avm.to_number(&arg(args, index))?))
}

pub fn string_char_at(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let units = this_units(avm, &this)?;
    let index = index_arg(avm, args, 0)?;
    let unit = (index >= 0.0).then(|| units.get(index as usize)).flatten();
    Ok(Value::from(unit.map(|u| String::from_utf16_lossy(&[*u])).unwrap_or_default()))
}

pub fn string_char_code_at(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let units = this_units(avm, &this)?;
    let index = index_arg(avm, args, 0)?;
    let unit = (index >= 0.0).then(|| units.get(index as usize)).flatten();
    Ok(Value::Number(unit.map_or(f64::NAN, |u| f64::from(*u))))
}

pub fn string_index_of(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let units = this_units(avm, &this)?;
    let needle: Vec<u16> = avm.to_avm_string(&arg(args, 0))?.as_str().encode_utf16().collect();
    let start = index_arg(avm, args, 1)?.max(0.0) as usize;
    let found = (start..=units.len()).find(|i| units.get(*i..).is_some_and(|tail| tail.starts_with(&needle)));
    Ok(Value::from(found.map_or(-1.0, |i| i as f64)))
}

/// `substr(start[, length])`; a negative start counts from the end.
pub fn string_substr(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let units = this_units(avm, &this)?;
    let len = units.len() as f64;
    let mut start = index_arg(avm, args, 0)?;
    if start < 0.0 {
        start = (len + start).max(0.0);
    }
    let start = start.min(len);
    let count = match args.get(1) {
        None | Some(Value::Undefined) => len - start,
        Some(_) => index_arg(avm, args, 1)?.clamp(0.0, len - start),
    };
    let slice = units
        .get(start as usize..(start + count) as usize)
        .unwrap_or_default();
    Ok(Value::from(String::from_utf16_lossy(slice)))
}

pub fn string_to_upper_case(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let primitive = this_primitive(avm, &this);
    Ok(Value::from(avm.to_avm_string(&primitive)?.as_str().to_uppercase()))
}

pub fn string_to_lower_case(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let primitive = this_primitive(avm, &this);
    Ok(Value::from(avm.to_avm_string(&primitive)?.as_str().to_lowercase()))
}
