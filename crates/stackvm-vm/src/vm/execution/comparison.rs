//! Comparison instruction execution

use crate::error::VmError;
use crate::opcode::comparator;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::ValueOps;

impl<O: ValueOps> VM<O> {
    /// Execute `COMPARE_OP`
    pub(crate) fn execute_comparison(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        let code = instruction.arg();
        // Rejected before touching the stack
        let op = comparator(code).ok_or(VmError::UnsupportedComparison(code))?;

        let (frame, ops) = self.frame_and_ops()?;
        let right = frame.pop(OpCode::CompareOp)?;
        let left = frame.pop(OpCode::CompareOp)?;
        let result = ops.compare(op, &left, &right)?;
        frame.push(result);
        Ok(ExecutionResult::Continue)
    }
}
