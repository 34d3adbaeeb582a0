//! The action loop
//!
//! `interpret_actions_data` walks an analyzed action blob, dispatching every
//! action through the recovery layer. Nested bodies (`with`, `try`, function
//! bodies) re-enter the loop with their own operand stack.

use std::rc::Rc;

use super::actions::{Action, ActionsData, CatchTarget, TryBlock};
use super::analyzer::analyzed;
use super::context::{DEFAULT_REGISTER_COUNT, ExecutionContext};
use super::frame::CallFrame;
use super::scope::ScopeListItem;
use super::wellknown::{WellKnown, wellknown_of};
use super::{Avm1, avm1_warn};
use crate::error::{AvmError, AvmResult};
use crate::value::{ObjectId, Value};

impl Avm1 {
    /// Run a top-level action blob on `target`.
    ///
    /// The scope list is `target -> {this, _global} -> globals`, with the
    /// target node flagged as the write target.
    pub(crate) fn execute_actions_data(&mut self, actions: &Rc<ActionsData>, target: ObjectId) -> AvmResult<()> {
        let global_properties = self.global_properties(target);
        let scope_list = Rc::new(ScopeListItem::new_target(
            target,
            Some(Rc::new(ScopeListItem::new(global_properties, Some(self.initial_scope())))),
        ));
        let mut ectx = self
            .pool
            .create(Rc::clone(&scope_list), Rc::from(Vec::new()), DEFAULT_REGISTER_COUNT);
        let frame = Rc::new(CallFrame::new(
            self.frame.take(),
            Value::Object(target),
            None,
            Rc::from(Vec::new()),
            scope_list,
        ));
        self.frame = Some(Rc::clone(&frame));

        let result = self.interpret_actions_data(&mut ectx, actions);

        self.frame = frame.previous.clone();
        self.pool.dispose(ectx);
        match result {
            Ok(_) => Ok(()),
            Err(err) => {
                if err.is_critical() {
                    log::error!("{}", err);
                    self.prohibit_execution();
                }
                Err(err)
            }
        }
    }

    /// Execute `actions` on `ectx` until the end of the blob or a Return;
    /// the result is whatever is left on top of the stack.
    pub(crate) fn interpret_actions_data(
        &mut self,
        ectx: &mut ExecutionContext,
        actions: &Rc<ActionsData>,
    ) -> AvmResult<Value> {
        if self.is_execution_prohibited() {
            return Ok(Value::Undefined);
        }
        if self.settings().wellknown_enabled {
            if let Some(wellknown) = wellknown_of(actions) {
                self.execute_wellknown(ectx, wellknown);
                return Ok(Value::Undefined);
            }
        }

        let ir = analyzed(actions);
        let check_every = self.settings().check_hang_every;
        let mut executed: u64 = 0;
        let mut position = if actions.is_empty() { None } else { Some(0) };

        while let Some(current) = position {
            let (Some(action), Some(item)) = (actions.actions.get(current), ir.item(current)) else {
                break;
            };
            if let Some(tracer) = &self.tracer {
                tracer.print(&self.heap, current, action, &ectx.stack);
            }

            let branch = self.execute_action_with_recovery(ectx, action)?;

            executed += 1;
            if check_every > 0 && executed % check_every == 0 {
                self.check_timeout()?;
            }
            if ectx.is_end_of_actions {
                break;
            }
            position = if branch { item.conditional_jump_to } else { item.next };
        }
        Ok(ectx.pop())
    }

    fn execute_wellknown(&mut self, ectx: &ExecutionContext, wellknown: WellKnown) {
        if wellknown == WellKnown::Empty {
            return;
        }
        let Some(clip) = self
            .get_target(&ectx.scope_list, true)
            .filter(|target| self.heap.get(*target).is_movie_clip())
        else {
            avm1_warn!(self, "No movie clip to {:?}", wellknown);
            return;
        };
        match wellknown {
            WellKnown::Stop => self.host.stop(clip),
            WellKnown::Play => self.host.play(clip),
            WellKnown::Empty => {}
        }
    }

    /// Run one action, absorbing recoverable faults.
    ///
    /// Fatal errors and script throws always propagate. Any other fault is
    /// logged once per run of consecutive faulting actions and counted
    /// against the error budget; the action then behaves as a no-op.
    fn execute_action_with_recovery(&mut self, ectx: &mut ExecutionContext, action: &Action) -> AvmResult<bool> {
        match self.execute_action(ectx, action) {
            Ok(branch) => {
                ectx.recovering_from_error = false;
                Ok(branch)
            }
            Err(err) => {
                let err = err.cast_host_error();
                if err.is_critical() || err.is_thrown() {
                    return Err(err);
                }
                if self.settings().errors_rethrown && !self.is_try_catch_listening {
                    return Err(err);
                }
                if !ectx.recovering_from_error {
                    if self.errors_ignored >= self.settings().max_errors {
                        return Err(AvmError::critical("long running script -- AVM1 errors limit is reached"));
                    }
                    self.errors_ignored += 1;
                    log::error!("AVM1 error: {}", err);
                    ectx.recovering_from_error = true;
                }
                Ok(false)
            }
        }
    }

    /// Run a nested body on `ectx` with a fresh operand stack and optionally
    /// another scope list. Returns the value of a Return executed inside.
    fn run_nested(
        &mut self,
        ectx: &mut ExecutionContext,
        scope_list: Option<Rc<ScopeListItem>>,
        body: &Rc<ActionsData>,
    ) -> AvmResult<Option<Value>> {
        let saved_scope = scope_list.map(|scope| std::mem::replace(&mut ectx.scope_list, scope));
        let saved_stack = std::mem::replace(&mut ectx.stack, self.pool.take_stack());
        ectx.is_end_of_actions = false;
        if let Some(tracer) = self.tracer.as_mut() {
            tracer.indent();
        }

        let result = self.interpret_actions_data(ectx, body);

        if let Some(tracer) = self.tracer.as_mut() {
            tracer.unindent();
        }
        if let Some(scope) = saved_scope {
            ectx.scope_list = scope;
        }
        let inner = std::mem::replace(&mut ectx.stack, saved_stack);
        self.pool.give_stack(inner);
        let returned = std::mem::take(&mut ectx.is_end_of_actions);
        let value = result?;
        Ok(returned.then_some(value))
    }

    /// A Return inside a nested body ends the enclosing body too.
    fn propagate_return(ectx: &mut ExecutionContext, returned: Option<Value>) {
        if let Some(value) = returned {
            ectx.push(value);
            ectx.is_end_of_actions = true;
        }
    }

    pub(crate) fn process_with(&mut self, ectx: &mut ExecutionContext, body: &Rc<ActionsData>) -> AvmResult<bool> {
        let obj = ectx.pop();
        if obj.is_null_or_undefined() {
            avm1_warn!(self, "The with statement object cannot be undefined");
            return Ok(false);
        }
        let obj = self.to_object(&obj)?;
        let scope_list = Rc::new(ScopeListItem::new(obj, Some(Rc::clone(&ectx.scope_list))));
        let returned = self.run_nested(ectx, Some(scope_list), body)?;
        Self::propagate_return(ectx, returned);
        Ok(false)
    }

    /// try/catch/finally
    ///
    /// Only script throws are caught, and only when there is a catch body.
    /// The finally body runs after everything except fatal errors; a Return
    /// or error raised there replaces the pending outcome.
    pub(crate) fn process_try(&mut self, ectx: &mut ExecutionContext, block: &TryBlock) -> AvmResult<bool> {
        let saved_listening = self.is_try_catch_listening;
        self.is_try_catch_listening = true;
        let outcome = self.run_nested(ectx, None, &block.try_body);
        self.is_try_catch_listening = saved_listening;

        let outcome = match (outcome, &block.catch_body) {
            (Err(AvmError::Thrown { value }), Some(catch_body)) => self
                .bind_catch_target(ectx, &block.catch_target, value)
                .and_then(|()| self.run_nested(ectx, None, catch_body)),
            (outcome, _) => outcome,
        };

        let outcome = match (&block.finally_body, outcome) {
            (Some(_), Err(err)) if err.is_critical() => Err(err),
            (Some(finally_body), outcome) => match self.run_nested(ectx, None, finally_body) {
                Ok(None) => outcome,
                overriding => overriding,
            },
            (None, outcome) => outcome,
        };

        let returned = outcome?;
        Self::propagate_return(ectx, returned);
        Ok(false)
    }

    fn bind_catch_target(&mut self, ectx: &mut ExecutionContext, target: &CatchTarget, value: Value) -> AvmResult<()> {
        match target {
            CatchTarget::Register(register) => {
                ectx.set_register(usize::from(*register), value);
                Ok(())
            }
            CatchTarget::Variable(name) => {
                let scope = ectx.scope_list.scope;
                self.put(scope, name.as_str(), value)
            }
        }
    }
}
