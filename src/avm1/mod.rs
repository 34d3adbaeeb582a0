//! AVM1 (ActionScript 1/2) virtual machine
//!
//! `Avm1` owns everything one movie needs to run scripts: the object heap,
//! the global object and builtins, the call frame chain, the host surface and
//! the per-run bookkeeping (hang deadline, error budget, prohibition latch).
//!
//! The implementation is spread over several files that each add an
//! `impl Avm1` block:
//! - `properties.rs` - the property protocol (get/put/delete/keys, watchers)
//! - `coerce.rs` - ECMAScript conversions and comparisons
//! - `scope.rs` - scope lists and variable/target resolution
//! - `function.rs` - calling and constructing functions
//! - `interpreter.rs` - the action loop, recovery and with/try blocks
//! - `ops.rs` - the individual action handlers

/// Emit a rate-limited diagnostic for a condition AVM1 silently tolerates.
macro_rules! avm1_warn {
    ($avm:expr, $($arg:tt)+) => {
        if $avm.warnings_enabled() {
            $avm.report_warning(format_args!($($arg)+));
        }
    };
}
pub(crate) use avm1_warn;

pub mod actions;
pub mod analyzer;
pub mod builtins;
pub mod coerce;
pub mod context;
pub mod frame;
pub mod function;
pub mod interpreter;
pub mod object;
mod ops;
pub mod properties;
pub mod scope;
pub mod tracer;
pub mod wellknown;

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

pub use actions::{Action, ActionArg, ActionRecord, ActionsData};
pub use builtins::Builtins;
pub use coerce::DefaultValueHint;
pub use frame::CallFrame;
pub use function::{FunctionKind, InterpretedFunction, NativeFn, NativeFunction};
pub use object::{GcStats, Heap, MovieClip, Object, ObjectKind, PropertyDescriptor, PropertyFlags};
pub use scope::{ResolveFlags, ResolvedVariable, ScopeFlags, ScopeListItem};

use crate::error::{AvmError, AvmResult};
use crate::platform::{ActionHost, NoOpActionHost};
use crate::settings::Settings;
use crate::value::{AvmString, CheapClone, ObjectId, Value};
use context::ExecutionContextPool;
use object::Traceable;
use tracer::ActionTracer;

/// One AVM1 execution context (one per loaded movie).
pub struct Avm1 {
    settings: Settings,
    /// Every object created by scripts or the host
    pub(crate) heap: Heap,
    pub(crate) builtins: Builtins,
    /// `_global`
    globals: ObjectId,
    /// Outermost scope list node (the global object)
    initial_scope: Rc<ScopeListItem>,
    pub(crate) host: Box<dyn ActionHost>,
    /// `_levelN` roots
    levels: FxHashMap<u32, ObjectId>,
    /// `{this, _global}` scope object of top-level runs, per target
    global_properties: FxHashMap<ObjectId, ObjectId>,
    /// Objects the host keeps alive, with their `add_root` counts
    host_roots: FxHashMap<ObjectId, usize>,

    // ═══════════════════════════════════════════════════════════════
    // Call state
    // ═══════════════════════════════════════════════════════════════
    /// Innermost call frame
    pub(crate) frame: Option<Rc<CallFrame>>,
    /// Nested interpreted calls currently running
    pub(crate) stack_depth: usize,
    pub(crate) pool: ExecutionContextPool,
    pub(crate) is_try_catch_listening: bool,

    // ═══════════════════════════════════════════════════════════════
    // Per-run bookkeeping
    // ═══════════════════════════════════════════════════════════════
    /// A top-level entry point is on the Rust stack
    is_active: bool,
    /// Latched by the first fatal error; never cleared
    execution_prohibited: bool,
    /// Hang deadline of the current top-level run
    pub(crate) abort_execution_at: Option<Instant>,
    /// Recoverable faults absorbed during the current top-level run
    pub(crate) errors_ignored: u32,
    warnings_reported: Cell<u32>,
    pub(crate) tracer: Option<ActionTracer>,
}

impl Avm1 {
    /// Create a context that discards host actions.
    pub fn new(settings: Settings) -> Self {
        Self::with_host(settings, Box::new(NoOpActionHost))
    }

    /// Create a context whose navigation/network/trace actions go to `host`.
    pub fn with_host(settings: Settings, host: Box<dyn ActionHost>) -> Self {
        let mut heap = Heap::new();
        heap.set_gc_threshold(settings.gc_threshold);
        let builtins = Builtins::bootstrap(&mut heap);
        let globals = heap.alloc(Object::new(ObjectKind::Ordinary, Some(builtins.object_prototype)));
        let pool = ExecutionContextPool::new(settings.max_cached_contexts);
        let tracer = settings.trace_actions.then(ActionTracer::new);

        let mut avm = Self {
            settings,
            heap,
            builtins,
            globals,
            initial_scope: Rc::new(ScopeListItem::new(globals, None)),
            host,
            levels: FxHashMap::default(),
            global_properties: FxHashMap::default(),
            host_roots: FxHashMap::default(),
            frame: None,
            stack_depth: 0,
            pool,
            is_try_catch_listening: false,
            is_active: false,
            execution_prohibited: false,
            abort_execution_at: None,
            errors_ignored: 0,
            warnings_reported: Cell::new(0),
            tracer,
        };
        avm.init_builtins();
        avm
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn swf_version(&self) -> u8 {
        self.settings.swf_version
    }

    pub fn is_property_case_sensitive(&self) -> bool {
        self.settings.is_case_sensitive()
    }

    pub fn is_swf_version5(&self) -> bool {
        self.settings.is_swf_version5()
    }

    /// Change the per-run time budget; `None` disables hang detection.
    /// Takes effect at the next top-level entry.
    pub fn set_hang_timeout_ms(&mut self, timeout_ms: Option<u64>) {
        self.settings.hang_timeout_ms = timeout_ms;
    }

    pub fn globals(&self) -> ObjectId {
        self.globals
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub(crate) fn initial_scope(&self) -> Rc<ScopeListItem> {
        Rc::clone(&self.initial_scope)
    }

    pub fn host(&mut self) -> &mut dyn ActionHost {
        self.host.as_mut()
    }

    /// Whether a fatal error has disabled this context for good.
    pub fn is_execution_prohibited(&self) -> bool {
        self.execution_prohibited
    }

    pub(crate) fn prohibit_execution(&mut self) {
        if !self.execution_prohibited {
            log::error!("Disabling AVM1 execution");
        }
        self.execution_prohibited = true;
    }

    // ═══════════════════════════════════════════════════════════════
    // Diagnostics
    // ═══════════════════════════════════════════════════════════════

    pub fn warnings_enabled(&self) -> bool {
        self.settings.warnings_enabled && self.warnings_reported.get() <= self.settings.max_warnings
    }

    pub(crate) fn report_warning(&self, message: fmt::Arguments<'_>) {
        let reported = self.warnings_reported.get() + 1;
        self.warnings_reported.set(reported);
        if reported <= self.settings.max_warnings {
            log::warn!("AVM1 warning: {}", message);
        } else {
            log::warn!("AVM1 warning: further warnings suppressed");
        }
    }

    /// Re-enable warnings after the rate limit kicked in.
    pub fn reset_warnings(&self) {
        self.warnings_reported.set(0);
    }

    // ═══════════════════════════════════════════════════════════════
    // Entry points
    // ═══════════════════════════════════════════════════════════════

    /// Start the bookkeeping of a top-level run if none is active; returns
    /// the previous activity flag for `leave_run`.
    fn enter_run(&mut self) -> bool {
        let was_active = self.is_active;
        if !was_active {
            self.is_active = true;
            self.abort_execution_at = self
                .settings
                .hang_timeout_ms
                .map(|ms| Instant::now() + Duration::from_millis(ms));
            self.errors_ignored = 0;
        }
        was_active
    }

    fn leave_run<T>(&mut self, was_active: bool, result: AvmResult<T>) -> AvmResult<Option<T>> {
        self.is_active = was_active;
        match result {
            Ok(value) => Ok(Some(value)),
            Err(AvmError::Thrown { value }) if !was_active => {
                log::error!("Uncaught AVM1 exception: {:?}", value);
                Ok(None)
            }
            Err(err) => {
                if err.is_critical() {
                    self.prohibit_execution();
                }
                Err(err)
            }
        }
    }

    /// Run an action blob with `scope` (usually a movie clip) as target.
    ///
    /// A no-op once execution is prohibited. Uncaught script exceptions end
    /// the run and are logged; fatal errors are returned.
    pub fn execute_actions(&mut self, actions: &Rc<ActionsData>, scope: ObjectId) -> AvmResult<()> {
        if self.execution_prohibited {
            return Ok(());
        }
        let was_active = self.enter_run();
        let result = self.execute_actions_data(actions, scope);
        let result = self.leave_run(was_active, result);
        self.finish_run(was_active, &Value::Undefined);
        result.map(|_| ())
    }

    /// Call a script function from the host (event handlers, callbacks).
    pub fn execute_function(&mut self, function: ObjectId, this: Value, args: &[Value]) -> AvmResult<Value> {
        if self.execution_prohibited {
            return Ok(Value::Undefined);
        }
        let was_active = self.enter_run();
        let result = self.call_function(function, this, args).map_err(AvmError::cast_host_error);
        let result = self.leave_run(was_active, result);
        let returned = match &result {
            Ok(Some(value)) => value.cheap_clone(),
            _ => Value::Undefined,
        };
        self.finish_run(was_active, &returned);
        Ok(result?.unwrap_or_default())
    }

    /// Collect after an outermost run once enough has been allocated.
    fn finish_run(&mut self, was_active: bool, returned: &Value) {
        if !was_active && self.heap.should_collect() {
            self.collect_garbage_keeping(returned);
        }
    }

    /// Hang check against the current run's deadline.
    pub(crate) fn check_timeout(&self) -> AvmResult<()> {
        match self.abort_execution_at {
            Some(deadline) if Instant::now() >= deadline => Err(AvmError::critical(
                "long running script -- AVM1 instruction hang timeout",
            )),
            _ => Ok(()),
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Garbage collection
    // ═══════════════════════════════════════════════════════════════

    /// Keep `obj` alive across collections until a matching `remove_root`.
    pub fn add_root(&mut self, obj: ObjectId) {
        *self.host_roots.entry(obj).or_default() += 1;
    }

    pub fn remove_root(&mut self, obj: ObjectId) {
        if let Some(count) = self.host_roots.get_mut(&obj) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.host_roots.remove(&obj);
            }
        }
    }

    /// Reclaim every object unreachable from the globals, the builtins, the
    /// level roots and the host roots. Returns the number collected.
    ///
    /// A no-op while a script is running: native frames hold handles the
    /// collector cannot see.
    pub fn collect_garbage(&mut self) -> usize {
        self.collect_garbage_keeping(&Value::Undefined)
    }

    fn collect_garbage_keeping(&mut self, keep: &Value) -> usize {
        if self.is_active {
            return 0;
        }
        let mut roots: Vec<ObjectId> = self.builtins.ids().to_vec();
        roots.push(self.globals);
        roots.extend(self.levels.values().copied());
        roots.extend(self.host_roots.keys().copied());
        let mut visit = |id: ObjectId| roots.push(id);
        self.initial_scope.trace(&mut visit);
        if let Some(frame) = &self.frame {
            frame.trace(&mut visit);
        }
        keep.trace(&mut visit);

        let collected = self.heap.collect(roots);
        let heap = &self.heap;
        self.global_properties.retain(|_, properties| heap.is_live(*properties));
        log::debug!("AVM1 GC: collected {} objects, {} live", collected, self.heap.len());
        collected
    }

    /// The `{this, _global}` object top-level runs on `target` resolve
    /// through, created on first use.
    pub(crate) fn global_properties(&mut self, target: ObjectId) -> ObjectId {
        if let Some(properties) = self.global_properties.get(&target) {
            return *properties;
        }
        let constants = PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE | PropertyFlags::READ_ONLY;
        let properties = self.heap.alloc(Object::new(ObjectKind::Ordinary, None));
        self.define_value(properties, "this", Value::Object(target), constants);
        self.define_value(properties, "_global", Value::Object(self.globals), constants);
        self.global_properties.insert(target, properties);
        properties
    }

    // ═══════════════════════════════════════════════════════════════
    // Object creation
    // ═══════════════════════════════════════════════════════════════

    pub fn is_function(&self, obj: ObjectId) -> bool {
        self.heap.get(obj).is_function()
    }

    /// Plain object inheriting from `Object.prototype`.
    pub fn create_object(&mut self) -> ObjectId {
        self.heap
            .alloc(Object::new(ObjectKind::Ordinary, Some(self.builtins.object_prototype)))
    }

    /// Array-like object holding `values` at indices `0..n` with a `length`.
    pub fn create_array(&mut self, values: &[Value]) -> ObjectId {
        let array = self
            .heap
            .alloc(Object::new(ObjectKind::Array, Some(self.builtins.array_prototype)));
        self.fill_array_like(array, values);
        array
    }

    pub(crate) fn fill_array_like(&mut self, obj: ObjectId, values: &[Value]) {
        for (i, value) in values.iter().enumerate() {
            self.define_value(obj, &i.to_string(), value.clone(), PropertyFlags::empty());
        }
        self.define_value(
            obj,
            "length",
            Value::from(values.len() as f64),
            PropertyFlags::DONT_ENUM,
        );
    }

    /// Wrapper object for a primitive.
    pub(crate) fn create_boxed(&mut self, kind: ObjectKind) -> ObjectId {
        let prototype = match &kind {
            ObjectKind::Boolean(_) => self.builtins.boolean_prototype,
            ObjectKind::Number(_) => self.builtins.number_prototype,
            ObjectKind::String(_) => self.builtins.string_prototype,
            _ => self.builtins.object_prototype,
        };
        let length = match &kind {
            ObjectKind::String(s) => Some(s.as_str().encode_utf16().count()),
            _ => None,
        };
        let obj = self.heap.alloc(Object::new(kind, Some(prototype)));
        if let Some(length) = length {
            self.define_value(
                obj,
                "length",
                Value::from(length as f64),
                PropertyFlags::DONT_ENUM | PropertyFlags::DONT_DELETE | PropertyFlags::READ_ONLY,
            );
        }
        obj
    }

    /// Add a display hierarchy node. With a parent the clip becomes reachable
    /// as `parent[name]`; without one it is a detached root kept alive as a
    /// host root.
    pub fn create_movie_clip(&mut self, parent: Option<ObjectId>, name: &str) -> ObjectId {
        let clip = MovieClip {
            name: AvmString::from(name),
            parent,
            ..MovieClip::default()
        };
        let id = self.heap.alloc(Object::new(
            ObjectKind::MovieClip(clip),
            Some(self.builtins.movie_clip_prototype),
        ));
        match parent {
            Some(parent) => {
                let key = self.normalize_name(name);
                if let Some(parent_clip) = self.heap.get_mut(parent).as_movie_clip_mut() {
                    parent_clip.children.insert(key, id);
                }
            }
            None => self.add_root(id),
        }
        id
    }

    /// Detach `clip` from its parent. It is no longer reachable through the
    /// hierarchy and becomes collectable unless something else refers to it
    /// or the host roots it with `add_root`.
    pub fn remove_movie_clip(&mut self, clip: ObjectId) {
        let Some(mc) = self.heap.get(clip).as_movie_clip() else {
            return;
        };
        let (parent, key) = (mc.parent, self.normalize_name(mc.name.as_str()));
        if let Some(parent_clip) = parent.and_then(|p| self.heap.get_mut(p).as_movie_clip_mut()) {
            parent_clip.children.shift_remove(key.as_str());
        }
        if let Some(mc) = self.heap.get_mut(clip).as_movie_clip_mut() {
            mc.parent = None;
        }
    }

    /// Create a root clip and register it as `_level{level}`.
    pub fn create_root_movie_clip(&mut self, level: u32) -> ObjectId {
        let root = self.create_movie_clip(None, "");
        self.set_level(level, root);
        root
    }

    pub fn set_level(&mut self, level: u32, clip: ObjectId) {
        if let Some(mc) = self.heap.get_mut(clip).as_movie_clip_mut() {
            mc.level = Some(level);
        }
        self.levels.insert(level, clip);
    }

    pub fn resolve_level(&self, level: u32) -> Option<ObjectId> {
        self.levels.get(&level).copied()
    }

    /// Notify the host when a script touches an `on*` event property.
    pub(crate) fn sync_events(&mut self, name: &str) {
        if name.starts_with("on") {
            self.host.event_property_changed(name);
        }
    }
}

impl fmt::Debug for Avm1 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Avm1")
            .field("swf_version", &self.settings.swf_version)
            .field("live_objects", &self.heap.len())
            .field("stack_depth", &self.stack_depth)
            .field("execution_prohibited", &self.execution_prohibited)
            .finish()
    }
}
