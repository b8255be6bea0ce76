//! stackvm Virtual Machine
//!
//! A stack-based bytecode interpreter. Compiled units produced by an
//! external compiler are executed frame by frame: each call gets its own
//! operand stack and local slots, and the dispatch loop runs until the
//! outermost frame returns.
//!
//! # Architecture
//!
//! - Byte-oriented instruction stream, 16-bit little-endian operands for
//!   opcodes at or above [`opcode::HAVE_ARGUMENT`]
//! - One [`vm::Frame`] per active invocation, linked to its caller
//! - All value semantics delegated to a [`stackvm_types::ValueOps`] provider
//!
//! # Modules
//!
//! - `opcode`: Instruction set definitions and decoder
//! - `vm`: Virtual machine execution engine
//! - `bytecode`: Unit assembly and the JSON unit format
//! - `bytecode_debug`: Disassembler
//! - `error`: Error types for the VM

#![allow(clippy::result_large_err)]

pub mod bytecode;
pub mod bytecode_debug;
pub mod error;
pub mod opcode;
pub mod vm;

// Re-export main types
pub use bytecode::{BuildError, CodeBuilder, UnitFile};
pub use bytecode_debug::disassemble;
pub use error::VmError;
pub use opcode::OpCode;
pub use vm::{TraceStep, MAX_CALL_DEPTH, VM};

use stackvm_types::{CodeUnit, Namespace, Value};
use std::sync::Arc;

/// Execute `code` with a fresh standard VM
pub fn execute(code: Arc<CodeUnit>, globals: Namespace) -> Result<Value, VmError> {
    VM::new().execute(code, globals)
}

#[cfg(test)]
mod tests;
