//! Iteration instruction execution

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::ValueOps;

impl<O: ValueOps> VM<O> {
    /// Execute `GET_ITER` and `FOR_ITER`
    pub(crate) fn execute_iterators(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        let opcode = instruction.opcode;
        let (frame, ops) = self.frame_and_ops()?;

        match opcode {
            OpCode::GetIter => {
                let iterable = frame.pop(opcode)?;
                let iterator = ops.iterate(&iterable)?;
                frame.push(iterator);
            }

            OpCode::ForIter => {
                // Iterator stays below the produced item
                let next = ops.next(frame.peek(opcode)?)?;
                match next {
                    Some(item) => frame.push(item),
                    None => {
                        frame.pop(opcode)?;
                        frame.jump_by(instruction.arg());
                    }
                }
            }

            _ => unreachable!("Non-iterator opcode in iterator handler"),
        }

        Ok(ExecutionResult::Continue)
    }
}
