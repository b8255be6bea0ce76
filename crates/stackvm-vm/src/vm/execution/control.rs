//! Control flow instruction execution

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::ValueOps;

impl<O: ValueOps> VM<O> {
    /// Execute control flow instructions
    pub(crate) fn execute_control(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        let opcode = instruction.opcode;
        let arg = instruction.arg();
        let (frame, ops) = self.frame_and_ops()?;

        match opcode {
            OpCode::PopTop => {
                frame.pop(opcode)?;
            }

            OpCode::JumpForward => frame.jump_by(arg),

            OpCode::JumpAbsolute => frame.jump_to(arg),

            OpCode::JumpIfFalseOrPop => {
                if ops.truthy(frame.peek(opcode)?) {
                    frame.pop(opcode)?;
                } else {
                    frame.jump_to(arg);
                }
            }

            OpCode::JumpIfTrueOrPop => {
                if ops.truthy(frame.peek(opcode)?) {
                    frame.jump_to(arg);
                } else {
                    frame.pop(opcode)?;
                }
            }

            OpCode::PopJumpIfFalse => {
                let cond = frame.pop(opcode)?;
                if !ops.truthy(&cond) {
                    frame.jump_to(arg);
                }
            }

            OpCode::PopJumpIfTrue => {
                let cond = frame.pop(opcode)?;
                if ops.truthy(&cond) {
                    frame.jump_to(arg);
                }
            }

            // Loop blocks carry no runtime state
            OpCode::SetupLoop | OpCode::PopBlock => {}

            _ => unreachable!("Non-control opcode in control handler"),
        }

        Ok(ExecutionResult::Continue)
    }
}
