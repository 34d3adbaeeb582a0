//! Runtime configuration

use serde::Deserialize;

/// Interval (in executed instructions) between wall-clock hang checks.
pub const CHECK_AVM1_HANG_EVERY: u64 = 1000;
/// Default time budget for one top-level script run.
pub const MAX_AVM1_HANG_TIMEOUT_MS: u64 = 1000;
/// Nested interpreted calls allowed before the run is aborted.
pub const MAX_AVM1_STACK_LIMIT: usize = 256;
/// Recoverable faults tolerated per top-level run.
pub const MAX_AVM1_ERRORS_LIMIT: u32 = 1000;
/// Execution contexts kept in the free list.
pub const MAX_CACHED_EXECUTION_CONTEXTS: usize = 20;
/// Allocations between garbage collections at the end of a top-level run.
pub const DEFAULT_GC_THRESHOLD: usize = 10_000;

/// Tunables for an AVM1 context.
///
/// Deserializable so the command line runner can read it from JSON; every
/// field has a default, so `{}` is a valid settings document.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// SWF version of the running movie. Drives case sensitivity (>= 7) and
    /// the SWF4 boolean/number encoding (< 5).
    pub swf_version: u8,
    /// Time budget per top-level run; `None` disables hang detection.
    pub hang_timeout_ms: Option<u64>,
    pub check_hang_every: u64,
    pub max_stack_depth: usize,
    pub max_errors: u32,
    /// Upper clamp for DefineFunction2 register counts.
    pub max_registers: usize,
    pub max_cached_contexts: usize,
    pub warnings_enabled: bool,
    /// Warnings reported before the rest are suppressed.
    pub max_warnings: u32,
    /// Propagate recoverable faults instead of absorbing them.
    pub errors_rethrown: bool,
    pub trace_actions: bool,
    pub wellknown_enabled: bool,
    /// Net allocations after which a finished top-level run triggers a
    /// collection; 0 leaves collection to explicit `collect_garbage` calls.
    pub gc_threshold: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            swf_version: 10,
            hang_timeout_ms: Some(MAX_AVM1_HANG_TIMEOUT_MS),
            check_hang_every: CHECK_AVM1_HANG_EVERY,
            max_stack_depth: MAX_AVM1_STACK_LIMIT,
            max_errors: MAX_AVM1_ERRORS_LIMIT,
            max_registers: 255,
            max_cached_contexts: MAX_CACHED_EXECUTION_CONTEXTS,
            warnings_enabled: true,
            max_warnings: 1000,
            errors_rethrown: false,
            trace_actions: false,
            wellknown_enabled: true,
            gc_threshold: DEFAULT_GC_THRESHOLD,
        }
    }
}

impl Settings {
    /// Defaults for the given SWF version.
    pub fn for_swf_version(swf_version: u8) -> Self {
        Self {
            swf_version,
            ..Self::default()
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.swf_version >= 7
    }

    pub fn is_swf_version5(&self) -> bool {
        self.swf_version >= 5
    }
}
