//! Sequence construction

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::ValueOps;

impl<O: ValueOps> VM<O> {
    /// Execute `BUILD_LIST` and `BUILD_TUPLE`
    pub(crate) fn execute_sequences(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        let opcode = instruction.opcode;
        let (frame, ops) = self.frame_and_ops()?;
        let items = frame.pop_n(instruction.arg() as usize, opcode)?;

        let value = match opcode {
            OpCode::BuildList => ops.build_list(items),
            OpCode::BuildTuple => ops.build_tuple(items),
            _ => unreachable!("Non-sequence opcode in sequence handler"),
        };
        frame.push(value);
        Ok(ExecutionResult::Continue)
    }
}
