//! Error types for the AVM1 interpreter and the AVM2 baseline compiler

use crate::value::Value;
use thiserror::Error;

/// Main error type for the virtual machines
///
/// The variants split into three classes that the interpreter treats
/// differently:
/// - `Critical` stops the whole context and latches `execution_prohibited`.
/// - `Thrown` is a script-level `throw` and is the only thing `try`/`catch`
///   intercepts.
/// - everything else is a recoverable fault absorbed per instruction.
#[derive(Debug, Error)]
pub enum AvmError {
    /// Fatal condition: hang timeout, recursion limit, error budget exhausted
    #[error("AVM1CriticalError: {message}")]
    Critical { message: String },

    /// Value raised by the `Throw` action
    #[error("Uncaught {value:?}")]
    Thrown { value: Value },

    #[error("TypeError: {message}")]
    TypeError { message: String },

    /// A decoded action record whose arguments do not fit its action code
    #[error("InvalidAction: 0x{code:02X}: {message}")]
    InvalidAction { code: u8, message: String },

    /// Raised by host natives when their own recursion guard trips
    #[error("too much recursion")]
    HostRecursionLimit,

    /// Baseline compiler invariant violation
    #[error("CompileError: {message}")]
    Compile { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AvmError {
    pub fn critical(message: impl Into<String>) -> Self {
        AvmError::Critical {
            message: message.into(),
        }
    }

    pub fn thrown(value: Value) -> Self {
        AvmError::Thrown { value }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        AvmError::TypeError {
            message: message.into(),
        }
    }

    pub fn invalid_action(code: u8, message: impl Into<String>) -> Self {
        AvmError::InvalidAction {
            code,
            message: message.into(),
        }
    }

    pub fn compile(message: impl Into<String>) -> Self {
        AvmError::Compile {
            message: message.into(),
        }
    }

    /// Create an internal error for unexpected interpreter states
    pub fn internal(message: impl Into<String>) -> Self {
        AvmError::Internal(message.into())
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, AvmError::Critical { .. })
    }

    pub fn is_thrown(&self) -> bool {
        matches!(self, AvmError::Thrown { .. })
    }

    /// Host recursion guards are reported as the same fatal condition as the
    /// interpreter's own stack limit.
    pub fn cast_host_error(self) -> Self {
        match self {
            AvmError::HostRecursionLimit => {
                AvmError::critical("long running script -- AVM1 recursion limit is reached")
            }
            other => other,
        }
    }
}

pub type AvmResult<T> = Result<T, AvmError>;
