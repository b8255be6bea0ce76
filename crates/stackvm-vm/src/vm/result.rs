//! Execution result types

use stackvm_types::Value;

/// Result of instruction execution
#[derive(Debug)]
pub(crate) enum ExecutionResult {
    /// Continue to next instruction
    Continue,
    /// Outermost frame returned
    Return(Value),
}
