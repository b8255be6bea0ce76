//! Constant, local, global and attribute instructions

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::ValueOps;

impl<O: ValueOps> VM<O> {
    /// Execute variable and constant instructions
    pub(crate) fn execute_variables(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        let arg = instruction.arg();

        match instruction.opcode {
            OpCode::LoadConst => {
                let frame = self.current_frame_mut()?;
                let value = frame.constant(arg)?;
                frame.push(value);
                Ok(ExecutionResult::Continue)
            }

            OpCode::LoadFast => {
                let frame = self.current_frame_mut()?;
                let value = frame.load_local(arg)?;
                frame.push(value);
                Ok(ExecutionResult::Continue)
            }

            OpCode::StoreFast => {
                let frame = self.current_frame_mut()?;
                let value = frame.pop(OpCode::StoreFast)?;
                frame.store_local(arg, value)?;
                Ok(ExecutionResult::Continue)
            }

            OpCode::LoadGlobal => {
                let frame = self.current_frame_mut()?;
                let name = frame.name(arg)?;
                let value = frame
                    .globals
                    .read()
                    .get(name)
                    .cloned()
                    .ok_or_else(|| VmError::NameNotFound(name.to_string()))?;
                frame.push(value);
                Ok(ExecutionResult::Continue)
            }

            OpCode::LoadAttr => {
                let (frame, ops) = self.frame_and_ops()?;
                let object = frame.pop(OpCode::LoadAttr)?;
                let value = ops.get_attr(&object, frame.name(arg)?)?;
                frame.push(value);
                Ok(ExecutionResult::Continue)
            }

            _ => unreachable!("Non-variable opcode in variable handler"),
        }
    }
}
