//! Per-instruction trace snapshots

use crate::opcode::OpCode;
use stackvm_types::Value;

/// State observed just before an instruction executes
#[derive(Debug, Clone, Copy)]
pub struct TraceStep<'a> {
    /// Name of the executing unit
    pub unit: &'a str,
    /// Call depth, 1 for the outermost frame
    pub depth: usize,
    /// Offset of the instruction
    pub pc: usize,
    pub opcode: OpCode,
    pub operand: Option<u16>,
    /// Operand stack, bottom first
    pub stack: &'a [Value],
    pub locals: &'a [Option<Value>],
}

/// Callback invoked with every [`TraceStep`]
pub type TraceHook = Box<dyn FnMut(&TraceStep<'_>) + Send>;
