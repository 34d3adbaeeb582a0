//! Call frames
//!
//! A frame is pushed for every top-level run and every interpreted call. Besides
//! linking to its caller it records the call currently being made *from* it
//! (the callee), which is how `super` knows where the previous lookup in a
//! chain of super calls stopped.

use std::cell::RefCell;
use std::rc::Rc;

use super::object::Traceable;
use super::scope::ScopeListItem;
use crate::value::{ObjectId, Value};

/// The call a frame is in the middle of making.
#[derive(Debug, Clone)]
pub struct Callee {
    pub this: Value,
    /// Prototype the callee was found on when called through `super`
    pub super_: Option<ObjectId>,
    pub function: ObjectId,
}

#[derive(Debug)]
pub struct CallFrame {
    pub previous: Option<Rc<CallFrame>>,
    pub current_this: Value,
    /// `None` for a top-level action blob
    pub function: Option<ObjectId>,
    pub args: Rc<[Value]>,
    /// Scope list the frame's body started with
    pub scope_list: Rc<ScopeListItem>,
    /// The caller was calling this same function on this same receiver
    pub in_sequence: bool,
    callee: RefCell<Option<Callee>>,
}

impl CallFrame {
    pub fn new(
        previous: Option<Rc<CallFrame>>,
        current_this: Value,
        function: Option<ObjectId>,
        args: Rc<[Value]>,
        scope_list: Rc<ScopeListItem>,
    ) -> Self {
        let in_sequence = previous.as_ref().is_some_and(|prev| {
            prev.callee.borrow().as_ref().is_some_and(|callee| {
                callee.this.strict_equals(&current_this) && Some(callee.function) == function
            })
        });
        Self {
            previous,
            current_this,
            function,
            args,
            scope_list,
            in_sequence,
            callee: RefCell::new(None),
        }
    }

    pub fn set_callee(&self, this: Value, super_: Option<ObjectId>, function: ObjectId) {
        *self.callee.borrow_mut() = Some(Callee {
            this,
            super_,
            function,
        });
    }

    pub fn reset_callee(&self) {
        *self.callee.borrow_mut() = None;
    }

    pub fn callee(&self) -> Option<Callee> {
        self.callee.borrow().clone()
    }

    /// Where the caller's super lookup left off, when this frame continues it.
    pub fn inherited_super(&self) -> Option<ObjectId> {
        if !self.in_sequence {
            return None;
        }
        self.previous
            .as_ref()
            .and_then(|prev| prev.callee())
            .and_then(|callee| callee.super_)
    }
}

impl Traceable for CallFrame {
    fn trace<F: FnMut(ObjectId)>(&self, visitor: &mut F) {
        let frames = std::iter::successors(Some(self), |frame| frame.previous.as_deref());
        for frame in frames {
            frame.current_this.trace(visitor);
            if let Some(function) = frame.function {
                visitor(function);
            }
            for arg in frame.args.iter() {
                arg.trace(visitor);
            }
            frame.scope_list.trace(visitor);
            if let Some(callee) = frame.callee.borrow().as_ref() {
                callee.this.trace(visitor);
                callee.super_.into_iter().for_each(&mut *visitor);
                visitor(callee.function);
            }
        }
    }
}
