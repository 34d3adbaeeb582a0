//! Value conversions and comparisons
//!
//! ECMAScript 3 conversions with the SWF version quirks of the Flash Player:
//! `undefined`/`null` convert to 0 and "" before SWF 7, and objects that fail
//! to produce a primitive convert to 0 before SWF 5.

use super::Avm1;
use super::object::ObjectKind;
use crate::error::{AvmError, AvmResult};
use crate::value::{AvmString, CheapClone, ObjectId, Value, number_to_string, string_to_number};

/// Preferred type for `[[DefaultValue]]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DefaultValueHint {
    #[default]
    Number,
    String,
}

/// ToInt32 on an already converted number.
pub fn to_int32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    let n = n.trunc() % 4_294_967_296.0;
    let n = if n < 0.0 { n + 4_294_967_296.0 } else { n };
    (n as u32) as i32
}

pub fn to_uint32(n: f64) -> u32 {
    to_int32(n) as u32
}

/// ToInteger on an already converted number.
pub fn to_integer(n: f64) -> f64 {
    if n.is_nan() {
        0.0
    } else if n == 0.0 || n.is_infinite() {
        n
    } else {
        n.trunc()
    }
}

impl Avm1 {
    /// `[[DefaultValue]]`: valueOf then toString for numbers, the reverse
    /// for strings. The first primitive result wins; the object itself is
    /// returned when neither method yields one.
    pub fn default_value(&mut self, obj: ObjectId, hint: DefaultValueHint) -> AvmResult<Value> {
        let order = match hint {
            DefaultValueHint::Number => ["valueOf", "toString"],
            DefaultValueHint::String => ["toString", "valueOf"],
        };
        for name in order {
            let method = self.get(obj, name)?;
            if let Some(method) = method.as_object().filter(|m| self.is_function(*m)) {
                let result = self.call_function(method, Value::Object(obj), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Ok(Value::Object(obj))
    }

    pub fn to_primitive(&mut self, value: &Value, hint: Option<DefaultValueHint>) -> AvmResult<Value> {
        match value {
            Value::Object(obj) => self.default_value(*obj, hint.unwrap_or_default()),
            other => Ok(other.cheap_clone()),
        }
    }

    pub fn to_number(&mut self, value: &Value) -> AvmResult<f64> {
        let swf_version = self.swf_version();
        let primitive = match value {
            Value::Object(_) => self.to_primitive(value, Some(DefaultValueHint::Number))?,
            other => other.cheap_clone(),
        };
        Ok(match primitive {
            Value::Undefined | Value::Null => {
                if swf_version >= 7 {
                    f64::NAN
                } else {
                    0.0
                }
            }
            Value::Object(_) => {
                if swf_version >= 5 {
                    f64::NAN
                } else {
                    0.0
                }
            }
            Value::Boolean(b) => {
                if b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => n,
            Value::String(s) => {
                if s.is_empty() && swf_version < 5 {
                    0.0
                } else {
                    string_to_number(s.as_str())
                }
            }
        })
    }

    pub fn to_integer(&mut self, value: &Value) -> AvmResult<f64> {
        Ok(to_integer(self.to_number(value)?))
    }

    pub fn to_int32(&mut self, value: &Value) -> AvmResult<i32> {
        Ok(to_int32(self.to_number(value)?))
    }

    pub fn to_avm_string(&mut self, value: &Value) -> AvmResult<AvmString> {
        let primitive = match value {
            Value::Object(_) => self.to_primitive(value, Some(DefaultValueHint::String))?,
            other => other.cheap_clone(),
        };
        Ok(match primitive {
            Value::Undefined => {
                if self.swf_version() >= 7 {
                    AvmString::from("undefined")
                } else {
                    AvmString::from("")
                }
            }
            Value::Null => AvmString::from("null"),
            Value::Object(obj) => {
                if self.is_function(obj) {
                    AvmString::from("[type Function]")
                } else {
                    AvmString::from("[type Object]")
                }
            }
            Value::Boolean(b) => AvmString::from(if b { "true" } else { "false" }),
            Value::Number(n) => AvmString::from(number_to_string(n)),
            Value::String(s) => s,
        })
    }

    /// Host-language string concatenation semantics (`'' + v`), used for
    /// names popped off the stack.
    pub fn to_name(&mut self, value: &Value) -> AvmResult<AvmString> {
        match value {
            Value::Undefined => Ok(AvmString::from("undefined")),
            other => self.to_avm_string(other),
        }
    }

    /// Box primitives; `undefined` and `null` have no object form.
    pub fn to_object(&mut self, value: &Value) -> AvmResult<ObjectId> {
        match value {
            Value::Undefined | Value::Null => {
                Err(AvmError::type_error(format!("{:?} cannot be converted to an object", value)))
            }
            Value::Object(obj) => Ok(*obj),
            Value::Boolean(b) => Ok(self.create_boxed(ObjectKind::Boolean(*b))),
            Value::Number(n) => Ok(self.create_boxed(ObjectKind::Number(*n))),
            Value::String(s) => Ok(self.create_boxed(ObjectKind::String(s.cheap_clone()))),
        }
    }

    /// `typeof` as reported by the TypeOf action.
    pub fn type_of(&self, value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Object(obj) => {
                let object = self.heap.get(*obj);
                if object.is_movie_clip() {
                    "movieclip"
                } else if object.is_function() {
                    "function"
                } else {
                    "object"
                }
            }
            other => other.primitive_type(),
        }
    }

    /// Abstract equality (ECMA-262 3rd edition, 11.9.3) with the AVM1 twist
    /// that the empty string never equals a number.
    pub fn equals(&mut self, x: &Value, y: &Value) -> AvmResult<bool> {
        use Value::*;
        if std::mem::discriminant(x) == std::mem::discriminant(y) {
            return Ok(x.strict_equals(y));
        }
        match (x, y) {
            (Null | Undefined, Null | Undefined) => return Ok(true),
            // null is typeof "object" but never equal to a real object
            (Null, Object(_)) | (Object(_), Null) => return Ok(false),
            (Number(n), String(s)) | (String(s), Number(n)) => {
                return Ok(!s.is_empty() && *n == string_to_number(s.as_str()));
            }
            _ => {}
        }

        let mut x = x.cheap_clone();
        let mut y = y.cheap_clone();
        if let Boolean(b) = x {
            x = Number(if b { 1.0 } else { 0.0 });
            if let Some(result) = number_equals_primitive(&x, &y) {
                return Ok(result);
            }
        }
        if let Boolean(b) = y {
            y = Number(if b { 1.0 } else { 0.0 });
            if let Some(result) = number_equals_primitive(&y, &x) {
                return Ok(result);
            }
        }
        match (&x, &y) {
            (Number(_) | String(_), Object(_)) => {
                let y = self.to_primitive(&y, None)?;
                if y.is_object() {
                    return Ok(false);
                }
                self.equals(&x, &y)
            }
            (Object(_), Number(_) | String(_)) => {
                let x = self.to_primitive(&x, None)?;
                if x.is_object() {
                    return Ok(false);
                }
                self.equals(&x, &y)
            }
            _ => Ok(false),
        }
    }

    /// `x < y`; `None` when either side converts to NaN.
    pub fn compare(&mut self, x: &Value, y: &Value) -> AvmResult<Option<bool>> {
        let x = self.to_primitive(x, None)?;
        let y = self.to_primitive(y, None)?;
        if let (Value::String(xs), Value::String(ys)) = (&x, &y) {
            return Ok(Some(utf16_less(xs.as_str(), ys.as_str())));
        }
        let xn = self.to_number(&x)?;
        let yn = self.to_number(&y)?;
        if xn.is_nan() || yn.is_nan() {
            Ok(None)
        } else {
            Ok(Some(xn < yn))
        }
    }

    /// Whether `ctor.prototype` is on `value`'s prototype chain. The boxing
    /// constructors also accept the matching primitives. Interfaces recorded
    /// by ImplementsOp on a prototype of the chain count as well.
    pub fn instance_of(&mut self, value: &Value, ctor: &Value) -> AvmResult<bool> {
        let Some(ctor) = ctor.as_object() else {
            return Ok(false);
        };
        if value.is_null_or_undefined() {
            return Ok(false);
        }
        let builtins = &self.builtins;
        if ctor == builtins.string {
            return Ok(value.is_string());
        } else if ctor == builtins.number {
            return Ok(matches!(value, Value::Number(_)));
        } else if ctor == builtins.boolean {
            return Ok(matches!(value, Value::Boolean(_)));
        } else if ctor == builtins.object {
            return Ok(value.is_object());
        }
        let Some(obj) = value.as_object() else {
            return Ok(false);
        };
        let Some(base_proto) = self.get(ctor, "prototype")?.as_object() else {
            return Ok(false);
        };
        let ctor = Value::Object(ctor);
        Ok(self.heap.chain(obj).any(|proto| {
            proto == base_proto || self.heap.get(proto).interfaces.iter().any(|i| i.strict_equals(&ctor))
        }))
    }
}

/// Step 18/19 of 11.9.3 after the boolean side became a number: decided when
/// the other side is a number or string.
fn number_equals_primitive(number: &Value, other: &Value) -> Option<bool> {
    let n = number.as_number()?;
    match other {
        Value::Number(m) => Some(n == *m),
        Value::String(s) => Some(!s.is_empty() && n == string_to_number(s.as_str())),
        _ => None,
    }
}

/// String `<` on UTF-16 code units, as the host language compares strings.
pub fn utf16_less(a: &str, b: &str) -> bool {
    a.encode_utf16().lt(b.encode_utf16())
}
