//! Arithmetic instruction execution

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::{BinaryOp, ValueOps};

impl<O: ValueOps> VM<O> {
    /// Execute arithmetic instructions
    pub(crate) fn execute_arithmetic(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        let op = match instruction.opcode {
            OpCode::BinaryAdd => BinaryOp::Add,
            OpCode::BinarySubtract => BinaryOp::Subtract,
            OpCode::BinaryMultiply => BinaryOp::Multiply,
            _ => unreachable!("Non-arithmetic opcode in arithmetic handler"),
        };

        let (frame, ops) = self.frame_and_ops()?;
        let right = frame.pop(instruction.opcode)?;
        let left = frame.pop(instruction.opcode)?;
        let result = ops.binary(op, &left, &right)?;
        frame.push(result);
        Ok(ExecutionResult::Continue)
    }
}
