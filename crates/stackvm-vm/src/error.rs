//! Error types for the interpreter

use crate::opcode::OpCode;
use stackvm_types::OpError;
use thiserror::Error;

/// Interpreter error: malformed bytecode, a broken stack invariant, or a
/// failure passed through from the value provider.
///
/// Every variant aborts the current `execute` call; nothing is retried.
#[derive(Debug, Error)]
pub enum VmError {
    /// Byte at `pc` is not a recognized opcode
    #[error("unknown opcode {opcode} at offset {pc}")]
    UnknownOpcode { opcode: u8, pc: usize },

    /// Argument-bearing opcode without its two operand bytes
    #[error("truncated {opcode} instruction at offset {pc}")]
    TruncatedInstruction { opcode: OpCode, pc: usize },

    /// Program counter left the instruction stream
    #[error("program counter {pc} is outside the instruction stream")]
    CodeOverrun { pc: usize },

    /// Return executed with other than exactly one value on the stack
    #[error("stack not empty on return: {depth} value(s) on the operand stack, expected 1")]
    StackDiscipline { depth: usize },

    /// Pop or peek on an empty operand stack
    #[error("stack underflow in {opcode}")]
    StackUnderflow { opcode: OpCode },

    /// `COMPARE_OP` operand names no known comparator
    #[error("unsupported comparison code {0}")]
    UnsupportedComparison(u16),

    /// Local slot index beyond the frame's slots
    #[error("invalid local slot {0}")]
    InvalidLocal(u16),

    /// Local slot read before any value was stored
    #[error("local slot {0} referenced before assignment")]
    UnboundLocal(u16),

    /// Invalid constant pool index
    #[error("invalid constant index {0}")]
    InvalidConstant(u16),

    /// Invalid name table index
    #[error("invalid name index {0}")]
    InvalidName(u16),

    /// Global lookup failed
    #[error("name '{0}' is not defined")]
    NameNotFound(String),

    /// Call target is neither native nor interpreted
    #[error("'{0}' object is not callable")]
    NotCallable(&'static str),

    /// Call encodes keyword arguments, which are not bound
    #[error("keyword arguments are not supported ({0} given)")]
    KeywordArguments(u16),

    /// Interpreted callable invoked with the wrong number of arguments
    #[error("{name}() takes {expected} positional argument(s) but {got} were given")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Call chain deeper than the configured limit
    #[error("maximum call depth exceeded")]
    StackOverflow,

    /// Dispatch attempted with an empty call chain
    #[error("no active frame")]
    NoActiveFrame,

    /// Writing to the print sink failed
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    /// Failure reported by the value provider, unchanged
    #[error(transparent)]
    Operation(#[from] OpError),
}
