//! Per-action execution trace
//!
//! Enabled with `Settings::trace_actions`; output goes to `log::trace!` under
//! the `avm1::trace` target.

use super::actions::Action;
use super::object::{Heap, ObjectKind};
use crate::value::Value;

#[derive(Debug, Default)]
pub struct ActionTracer {
    indentation: usize,
}

impl ActionTracer {
    pub fn new() -> Self {
        Self::default()
    }

    fn indent_string(&self) -> String {
        "..".repeat(self.indentation)
    }

    pub fn print(&self, heap: &Heap, position: usize, action: &Action, stack: &[Value]) {
        let stack_dump: Vec<String> = stack.iter().map(|item| describe(heap, item)).collect();
        log::trace!(
            target: "avm1::trace",
            "{}{}: {:?}({:x}), stack={}",
            self.indent_string(),
            position,
            action,
            action.code(),
            stack_dump.join(",")
        );
    }

    pub fn indent(&mut self) {
        self.indentation += 1;
    }

    pub fn unindent(&mut self) {
        self.indentation = self.indentation.saturating_sub(1);
    }

    pub fn message(&self, msg: &str) {
        log::trace!(target: "avm1::trace", "------- {}", msg);
    }
}

fn describe(heap: &Heap, value: &Value) -> String {
    match value {
        Value::Object(id) => {
            let kind = match &heap.get(*id).kind {
                ObjectKind::Function(_) => "Function",
                ObjectKind::Array | ObjectKind::Arguments => "Array",
                ObjectKind::MovieClip(_) => "MovieClip",
                ObjectKind::Boolean(_) => "Boolean",
                ObjectKind::Number(_) => "Number",
                ObjectKind::String(_) => "String",
                _ => "Object",
            };
            format!("[{}]", kind)
        }
        other => format!("{:?}", other),
    }
}
