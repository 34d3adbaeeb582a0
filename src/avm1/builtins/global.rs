//! Global functions

use super::arg;
use crate::avm1::Avm1;
use crate::avm1::object::PropertyFlags;
use crate::error::AvmResult;
use crate::value::{AvmString, Value};

pub fn init_global_functions(avm: &mut Avm1) {
    let globals = avm.globals();
    avm.register_method(globals, "ASSetPropFlags", as_set_prop_flags);
    avm.register_method(globals, "isNaN", global_is_nan);
    avm.register_method(globals, "isFinite", global_is_finite);
}

/// `ASSetPropFlags(obj, names, set[, clear])`
///
/// `names` is null (every own property), a comma separated string, or an
/// array of names. Only the DONT_ENUM/DONT_DELETE/READ_ONLY bits apply.
pub fn as_set_prop_flags(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    let Some(obj) = arg(args, 0).as_object() else {
        return Ok(Value::Undefined);
    };
    let names: Option<Vec<AvmString>> = match arg(args, 1) {
        Value::Null | Value::Undefined => None,
        Value::Object(list) => Some(
            avm.array_like_values(list)?
                .iter()
                .map(|v| avm.to_avm_string(v))
                .collect::<AvmResult<_>>()?,
        ),
        other => {
            let list = avm.to_avm_string(&other)?;
            Some(list.as_str().split(',').map(AvmString::from).collect())
        }
    };
    let set = PropertyFlags::from_bits_truncate(avm.to_int32(&arg(args, 2))? as u8) & PropertyFlags::ATTRIBUTES;
    let clear = PropertyFlags::from_bits_truncate(avm.to_int32(&arg(args, 3))? as u8) & PropertyFlags::ATTRIBUTES;
    match names {
        None => avm.set_property_flags(obj, None, set, clear),
        Some(names) => {
            let names: Vec<&str> = names.iter().map(AvmString::as_str).collect();
            avm.set_property_flags(obj, Some(&names), set, clear);
        }
    }
    Ok(Value::Undefined)
}

pub fn global_is_nan(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    Ok(Value::Boolean(avm.to_number(&arg(args, 0))?.is_nan()))
}

pub fn global_is_finite(avm: &mut Avm1, _this: Value, args: &[Value]) -> AvmResult<Value> {
    Ok(Value::Boolean(avm.to_number(&arg(args, 0))?.is_finite()))
}
