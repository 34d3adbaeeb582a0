//! Host action surface.
//!
//! Everything AVM1 scripts can do to the world outside the object model
//! (timeline navigation, network requests, clip lifecycle, drag, timers,
//! `trace`) is delegated to an [`ActionHost`]. Every method has a default so
//! hosts only implement what they support; [`NoOpActionHost`] implements
//! nothing at all.

#[cfg(feature = "std")]
mod std_impl;

#[cfg(feature = "std")]
pub use std_impl::StdActionHost;

use std::rc::Rc;

use crate::avm1::ActionsData;
use crate::value::{AvmString, ObjectId};

/// A frame addressed by number (1-based) or by label.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameRef {
    Number(u32),
    Label(AvmString),
}

/// How `getURL`/`loadVariables` send the target's variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendVarsMethod {
    #[default]
    None,
    Get,
    Post,
}

impl SendVarsMethod {
    /// Low two bits of the GetURL2 flags byte.
    pub fn from_flags(flags: u8) -> Self {
        match flags & 3 {
            1 => SendVarsMethod::Get,
            2 => SendVarsMethod::Post,
            _ => SendVarsMethod::None,
        }
    }
}

/// Drag rectangle of `startDrag`, in parent coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragConstraint {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Services the surrounding player provides to the action handlers.
#[allow(unused_variables)]
pub trait ActionHost {
    // Timeline navigation

    fn goto_frame(&mut self, clip: ObjectId, frame: FrameRef, play: bool) {}

    fn next_frame(&mut self, clip: ObjectId) {}

    fn prev_frame(&mut self, clip: ObjectId) {}

    fn play(&mut self, clip: ObjectId) {}

    fn stop(&mut self, clip: ObjectId) {}

    /// Whether `frame` of `clip` has been loaded; `WaitForFrame` skips its
    /// block while this is false.
    fn if_frame_loaded(&mut self, clip: ObjectId, frame: &FrameRef) -> bool {
        true
    }

    /// Actions of `frame` for the `call()` action, if the frame exists.
    fn call_frame(&mut self, clip: ObjectId, frame: &FrameRef) -> Option<Rc<ActionsData>> {
        None
    }

    // Global player state

    fn toggle_quality(&mut self) {}

    fn stop_all_sounds(&mut self) {}

    // Network

    fn get_url(&mut self, url: &str, target: &str, method: SendVarsMethod) {}

    fn load_movie(&mut self, url: &str, target: &str, method: SendVarsMethod) {}

    fn load_variables(&mut self, url: &str, target: &str, method: SendVarsMethod) {}

    fn fscommand(&mut self, command: &str, args: &str) {}

    // Clip lifecycle

    /// `clone` already exists in the object model next to `source`.
    fn duplicate_movie_clip(&mut self, source: ObjectId, clone: ObjectId, depth: f64) {}

    fn remove_movie_clip(&mut self, clip: ObjectId) {}

    fn start_drag(&mut self, clip: ObjectId, lock_center: bool, constraint: Option<DragConstraint>) {}

    fn stop_drag(&mut self) {}

    // Misc

    /// Milliseconds since the movie started.
    fn get_timer(&mut self) -> f64 {
        0.0
    }

    /// Uniform random number in `[0, 1)`.
    fn random(&mut self) -> f64 {
        0.0
    }

    fn trace(&mut self, message: &str) {}

    /// A script assigned or deleted an `on*` property.
    fn event_property_changed(&mut self, name: &str) {}

    // String utilities. The single byte variants operate on UTF-8 bytes,
    // the multibyte ones on characters.

    fn string_length(&self, s: &str) -> usize {
        s.len()
    }

    fn mb_string_length(&self, s: &str) -> usize {
        s.chars().count()
    }

    /// `substring(s, index, count)` with a 1-based index; a negative count
    /// extends to the end.
    fn substring(&self, s: &str, index: i64, count: i64) -> String {
        let bytes = s.as_bytes();
        let start = usize::try_from(index.saturating_sub(1).max(0)).unwrap_or(0).min(bytes.len());
        let end = match usize::try_from(count) {
            Ok(count) => start.saturating_add(count).min(bytes.len()),
            Err(_) => bytes.len(),
        };
        bytes
            .get(start..end)
            .map(|slice| String::from_utf8_lossy(slice).into_owned())
            .unwrap_or_default()
    }

    fn mb_substring(&self, s: &str, index: i64, count: i64) -> String {
        let start = usize::try_from(index.saturating_sub(1).max(0)).unwrap_or(0);
        let chars = s.chars().skip(start);
        match usize::try_from(count) {
            Ok(count) => chars.take(count).collect(),
            Err(_) => chars.collect(),
        }
    }

    fn ord(&self, s: &str) -> u32 {
        s.bytes().next().map_or(0, u32::from)
    }

    fn mb_ord(&self, s: &str) -> u32 {
        s.chars().next().map_or(0, u32::from)
    }

    fn chr(&self, code: u32) -> String {
        match code & 0xFF {
            0 => String::new(),
            byte => char::from(byte as u8).to_string(),
        }
    }

    fn mb_chr(&self, code: u32) -> String {
        match code {
            0 => String::new(),
            code => char::from_u32(code).map(String::from).unwrap_or_default(),
        }
    }
}

/// A host that ignores every action.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpActionHost;

impl ActionHost for NoOpActionHost {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_is_one_based_and_clamped() {
        let host = NoOpActionHost;
        assert_eq!(host.substring("hello", 2, 3), "ell");
        assert_eq!(host.substring("hello", 0, 2), "he");
        assert_eq!(host.substring("hello", 4, -1), "lo");
        assert_eq!(host.substring("hello", 9, 2), "");
        assert_eq!(host.mb_substring("héllo", 2, 2), "él");
    }

    #[test]
    fn char_codes() {
        let host = NoOpActionHost;
        assert_eq!(host.ord("A"), 65);
        assert_eq!(host.ord(""), 0);
        assert_eq!(host.chr(0x141), "A");
        assert_eq!(host.mb_ord("é"), 0xE9);
        assert_eq!(host.mb_chr(0x263A), "\u{263A}");
        assert_eq!(host.string_length("é"), 2);
        assert_eq!(host.mb_string_length("é"), 1);
    }

    #[test]
    fn send_vars_method_from_flags() {
        assert_eq!(SendVarsMethod::from_flags(0x41), SendVarsMethod::Get);
        assert_eq!(SendVarsMethod::from_flags(0x82), SendVarsMethod::Post);
        assert_eq!(SendVarsMethod::from_flags(0), SendVarsMethod::None);
    }
}
