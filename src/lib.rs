//! ActionScript virtual machines for Flash content
//!
//! Two independent engines live here:
//!
//! - [`avm1`]: an interpreter for ActionScript 1/2 action streams, with the
//!   legacy dynamic scoping, path based targets, prototype objects, call
//!   frames and cooperative hang detection.
//! - [`avm2`]: a baseline compiler that turns ActionScript 3 method bytecode
//!   into structured procedure text.
//!
//! Binary SWF parsing is not part of this crate; both engines consume
//! already decoded records.
//!
//! # Example
//!
//! ```
//! use flashvm::{Avm1, ActionsData, Settings, Value};
//!
//! let mut avm = Avm1::new(Settings::default());
//! let root = avm.create_root_movie_clip(0);
//! let actions = ActionsData::from_json(r#"[
//!     {"code": 150, "args": [{"type": "string", "value": "x"},
//!                            {"type": "number", "value": 2},
//!                            {"type": "number", "value": 3}]},
//!     {"code": 71},
//!     {"code": 29}
//! ]"#).unwrap();
//! avm.execute_actions(&actions, root).unwrap();
//! assert_eq!(avm.get(root, "x").unwrap(), Value::Number(5.0));
//! ```

pub mod avm1;
pub mod avm2;
pub mod error;
pub mod platform;
pub mod settings;
pub mod value;

pub use avm1::{ActionArg, ActionRecord, ActionsData, Avm1};
pub use avm2::{BaselineCompiler, CompiledMethod};
pub use error::{AvmError, AvmResult};
pub use platform::{ActionHost, FrameRef, NoOpActionHost};
#[cfg(feature = "std")]
pub use platform::StdActionHost;
pub use settings::Settings;
pub use value::{AvmString, CheapClone, ObjectId, Value};
