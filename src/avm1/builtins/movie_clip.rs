//! MovieClip.prototype: timeline control forwarded to the host

use super::arg;
use crate::avm1::Avm1;
use crate::error::{AvmError, AvmResult};
use crate::platform::FrameRef;
use crate::value::{ObjectId, Value};

pub fn init_movie_clip_prototype(avm: &mut Avm1) {
    let proto = avm.builtins.movie_clip_prototype;
    avm.register_method(proto, "play", movie_clip_play);
    avm.register_method(proto, "stop", movie_clip_stop);
    avm.register_method(proto, "nextFrame", movie_clip_next_frame);
    avm.register_method(proto, "prevFrame", movie_clip_prev_frame);
    avm.register_method(proto, "gotoAndPlay", movie_clip_goto_and_play);
    avm.register_method(proto, "gotoAndStop", movie_clip_goto_and_stop);
    avm.register_method(proto, "createEmptyMovieClip", movie_clip_create_empty);
    avm.register_method(proto, "removeMovieClip", movie_clip_remove);
}

/// Clips are created by the host or `createEmptyMovieClip`, never by `new`.
pub fn movie_clip_call(_avm: &mut Avm1, _this: Value, _args: &[Value]) -> AvmResult<Value> {
    Ok(Value::Undefined)
}

fn this_clip(avm: &Avm1, this: &Value) -> AvmResult<ObjectId> {
    this.as_object()
        .filter(|obj| avm.heap().get(*obj).is_movie_clip())
        .ok_or_else(|| AvmError::type_error("MovieClip method called on a non-clip"))
}

impl Avm1 {
    /// Frame argument of goto-style calls: numbers address frames, other
    /// values are labels unless they read as a number.
    pub(crate) fn to_frame_ref(&mut self, value: &Value) -> AvmResult<FrameRef> {
        if let Value::Number(n) = value {
            return Ok(FrameRef::Number(frame_number(*n)));
        }
        let label = self.to_avm_string(value)?;
        match label.as_str().trim().parse::<f64>() {
            Ok(n) => Ok(FrameRef::Number(frame_number(n))),
            Err(_) => Ok(FrameRef::Label(label)),
        }
    }
}

fn frame_number(n: f64) -> u32 {
    if n.is_finite() && n > 0.0 { n as u32 } else { 0 }
}

pub fn movie_clip_play(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let clip = this_clip(avm, &this)?;
    avm.host().play(clip);
    Ok(Value::Undefined)
}

pub fn movie_clip_stop(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let clip = this_clip(avm, &this)?;
    avm.host().stop(clip);
    Ok(Value::Undefined)
}

pub fn movie_clip_next_frame(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let clip = this_clip(avm, &this)?;
    avm.host().next_frame(clip);
    Ok(Value::Undefined)
}

pub fn movie_clip_prev_frame(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let clip = this_clip(avm, &this)?;
    avm.host().prev_frame(clip);
    Ok(Value::Undefined)
}

pub fn movie_clip_goto_and_play(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let clip = this_clip(avm, &this)?;
    let frame = avm.to_frame_ref(&arg(args, 0))?;
    avm.host().goto_frame(clip, frame, true);
    Ok(Value::Undefined)
}

pub fn movie_clip_goto_and_stop(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let clip = this_clip(avm, &this)?;
    let frame = avm.to_frame_ref(&arg(args, 0))?;
    avm.host().goto_frame(clip, frame, false);
    Ok(Value::Undefined)
}

/// `createEmptyMovieClip(name, depth)`
pub fn movie_clip_create_empty(avm: &mut Avm1, this: Value, args: &[Value]) -> AvmResult<Value> {
    let parent = this_clip(avm, &this)?;
    let name = avm.to_avm_string(&arg(args, 0))?;
    Ok(Value::Object(avm.create_movie_clip(Some(parent), name.as_str())))
}

pub fn movie_clip_remove(avm: &mut Avm1, this: Value, _args: &[Value]) -> AvmResult<Value> {
    let clip = this_clip(avm, &this)?;
    avm.remove_movie_clip(clip);
    avm.host().remove_movie_clip(clip);
    Ok(Value::Undefined)
}
