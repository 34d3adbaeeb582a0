//! AVM2 baseline compiler
//!
//! Compiles decoded ActionScript 3 methods into the text of a procedure
//! body: basic blocks are emitted with virtual stack and scope registers,
//! then the relooper rebuilds structured control flow over them.
//!
//! This VM shares nothing with AVM1 beyond the error type.
//!
//! # Example
//!
//! ```
//! use flashvm::avm2::{BaselineCompiler, ConstantPool, MethodBody, MethodInfo, Op};
//!
//! let method = MethodInfo {
//!     body: Some(MethodBody::from_ops([Op::PushByte(1), Op::PushByte(2), Op::Add, Op::ReturnValue])),
//!     ..Default::default()
//! };
//! let constants = ConstantPool::default();
//! let compiled = BaselineCompiler::new(&constants).compile(&method, "scope", false).unwrap();
//! assert!(compiled.body.contains("A = rt.add(A, B);"));
//! ```

pub mod analysis;
pub mod baseline;
pub mod bytecode;
pub mod emitter;
pub mod relooper;

pub use analysis::{BasicBlock, MethodAnalysis, analyzed};
pub use baseline::{BaselineCompiler, CompiledMethod};
pub use bytecode::{
    ConstantPool, ConstantValue, ExceptionInfo, Instruction, MethodBody, MethodInfo, Multiname, Op, Parameter, Pc,
};
pub use relooper::Relooper;
