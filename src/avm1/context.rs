//! Execution contexts and their free list

use std::rc::Rc;

use super::scope::ScopeListItem;
use crate::value::Value;

/// Register file size of top-level action blobs and DefineFunction bodies.
pub const DEFAULT_REGISTER_COUNT: usize = 4;

/// Mutable state one action loop operates on.
#[derive(Debug)]
pub struct ExecutionContext {
    pub scope_list: Rc<ScopeListItem>,
    pub constant_pool: Rc<[Value]>,
    pub registers: Vec<Value>,
    /// Operand stack
    pub stack: Vec<Value>,
    /// Set by Return (and the end-of-actions marker)
    pub is_end_of_actions: bool,
    /// The previous action faulted; suppresses reporting of consecutive faults
    pub recovering_from_error: bool,
}

impl ExecutionContext {
    pub fn pop(&mut self) -> Value {
        self.stack.pop().unwrap_or_default()
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.stack.push(value.into());
    }

    pub fn peek(&self) -> Value {
        self.stack.last().cloned().unwrap_or_default()
    }

    /// Out-of-range reads yield undefined.
    pub fn register(&self, index: usize) -> Value {
        self.registers.get(index).cloned().unwrap_or_default()
    }

    /// Out-of-range writes are ignored.
    pub fn set_register(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.registers.get_mut(index) {
            *slot = value;
        }
    }

    pub fn constant(&self, index: usize) -> Value {
        self.constant_pool.get(index).cloned().unwrap_or_default()
    }
}

/// Free list of register/stack buffers so calls do not allocate.
///
/// Reuse is invisible to scripts: buffers are cleared before they go back
/// into the list and resized on the way out.
#[derive(Debug)]
pub struct ExecutionContextPool {
    free: Vec<(Vec<Value>, Vec<Value>)>,
    capacity: usize,
}

impl ExecutionContextPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn create(
        &mut self,
        scope_list: Rc<ScopeListItem>,
        constant_pool: Rc<[Value]>,
        register_count: usize,
    ) -> ExecutionContext {
        let (mut registers, stack) = self.free.pop().unwrap_or_default();
        registers.resize(register_count, Value::Undefined);
        ExecutionContext {
            scope_list,
            constant_pool,
            registers,
            stack,
            is_end_of_actions: false,
            recovering_from_error: false,
        }
    }

    /// A fresh operand stack for a nested with/try body.
    pub fn take_stack(&mut self) -> Vec<Value> {
        self.free.pop().map(|(_, stack)| stack).unwrap_or_default()
    }

    pub fn give_stack(&mut self, mut stack: Vec<Value>) {
        stack.clear();
        if self.free.len() < self.capacity {
            self.free.push((Vec::new(), stack));
        }
    }

    pub fn dispose(&mut self, ectx: ExecutionContext) {
        let ExecutionContext {
            mut registers,
            mut stack,
            ..
        } = ectx;
        if self.free.len() < self.capacity {
            registers.clear();
            stack.clear();
            self.free.push((registers, stack));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ObjectId;

    fn scope() -> Rc<ScopeListItem> {
        Rc::new(ScopeListItem::new(ObjectId(0), None))
    }

    #[test]
    fn reused_contexts_are_reset() {
        let mut pool = ExecutionContextPool::new(2);
        let mut ectx = pool.create(scope(), Rc::from(Vec::new()), 4);
        ectx.push(1);
        ectx.set_register(3, Value::from("x"));
        pool.dispose(ectx);
        assert_eq!(pool.free.len(), 1);

        let ectx = pool.create(scope(), Rc::from(Vec::new()), 2);
        assert!(ectx.stack.is_empty());
        assert_eq!(ectx.registers.len(), 2);
        assert_eq!(ectx.register(1), Value::Undefined);
        assert_eq!(pool.free.len(), 0);
    }

    #[test]
    fn free_list_is_capped() {
        let mut pool = ExecutionContextPool::new(1);
        let a = pool.create(scope(), Rc::from(Vec::new()), 1);
        let b = pool.create(scope(), Rc::from(Vec::new()), 1);
        pool.dispose(a);
        pool.dispose(b);
        assert_eq!(pool.free.len(), 1);
    }

    #[test]
    fn bad_register_access_is_ignored() {
        let mut pool = ExecutionContextPool::new(1);
        let mut ectx = pool.create(scope(), Rc::from(Vec::new()), 2);
        ectx.set_register(7, Value::from(1));
        assert_eq!(ectx.register(7), Value::Undefined);
        assert_eq!(ectx.pop(), Value::Undefined);
    }
}
