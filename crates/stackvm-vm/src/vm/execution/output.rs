//! Print instructions

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::ValueOps;

impl<O: ValueOps> VM<O> {
    /// Execute `PRINT_ITEM` and `PRINT_NEWLINE`
    pub(crate) fn execute_output(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        match instruction.opcode {
            OpCode::PrintItem => {
                let (frame, ops) = self.frame_and_ops()?;
                let value = frame.pop(OpCode::PrintItem)?;
                let text = ops.display(&value);

                if self.softspace {
                    self.output.write_all(b" ")?;
                }
                self.output.write_all(text.as_bytes())?;
                // A trailing newline ends the line, so the next item needs no separator
                self.softspace = !text.ends_with('\n');
            }

            OpCode::PrintNewline => {
                self.output.write_all(b"\n")?;
                self.softspace = false;
            }

            _ => unreachable!("Non-output opcode in output handler"),
        }

        Ok(ExecutionResult::Continue)
    }
}
