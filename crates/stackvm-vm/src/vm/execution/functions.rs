//! Call linkage: function calls and returns

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use crate::vm::frame::Frame;
use crate::vm::result::ExecutionResult;
use crate::vm::VM;
use stackvm_types::{Callable, Function, Value, ValueOps};
use tracing::debug;

impl<O: ValueOps> VM<O> {
    /// Execute `CALL_FUNCTION` and `RETURN_VALUE`
    pub(crate) fn execute_functions(
        &mut self,
        instruction: Instruction,
    ) -> Result<ExecutionResult, VmError> {
        match instruction.opcode {
            OpCode::CallFunction => self.call(instruction.arg()),
            OpCode::ReturnValue => self.do_return(),
            _ => unreachable!("Non-function opcode in function handler"),
        }
    }

    /// Operand is `keyword * 256 + positional`
    fn call(&mut self, arg: u16) -> Result<ExecutionResult, VmError> {
        let positional = (arg & 0xff) as usize;
        let keyword = arg >> 8;
        if keyword > 0 {
            return Err(VmError::KeywordArguments(keyword));
        }

        let (frame, ops) = self.frame_and_ops()?;
        let args = frame.pop_n(positional, OpCode::CallFunction)?;
        let callee = frame.pop(OpCode::CallFunction)?;

        match callee {
            Value::Callable(Callable::Native(native)) => {
                let result = ops.call_native(&native, args)?;
                frame.push(result);
                Ok(ExecutionResult::Continue)
            }
            Value::Callable(Callable::Interpreted(function)) => {
                self.enter_function(&function, args)?;
                Ok(ExecutionResult::Continue)
            }
            other => Err(VmError::NotCallable(other.type_name())),
        }
    }

    /// Push a frame for `function`; the caller's pc already points past the call
    fn enter_function(&mut self, function: &Function, args: Vec<Value>) -> Result<(), VmError> {
        let code = &function.code;
        if args.len() != code.arg_count {
            return Err(VmError::ArityMismatch {
                name: function.name.clone(),
                expected: code.arg_count,
                got: args.len(),
            });
        }

        if self.frames.len() >= self.max_depth {
            return Err(VmError::StackOverflow);
        }

        let caller = self.frames.len().checked_sub(1).ok_or(VmError::NoActiveFrame)?;
        let mut frame = Frame::new(code.clone(), function.globals.clone(), Some(caller));
        for (slot, value) in frame.locals.iter_mut().zip(args) {
            *slot = Some(value);
        }

        debug!(function = %function.name, depth = self.frames.len() + 1, "enter");
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the active frame, handing its single stack value to the caller
    fn do_return(&mut self) -> Result<ExecutionResult, VmError> {
        let depth = self.current_frame()?.stack.len();
        if depth != 1 {
            return Err(VmError::StackDiscipline { depth });
        }

        let mut frame = self.frames.pop().ok_or(VmError::NoActiveFrame)?;
        let value = frame.pop(OpCode::ReturnValue)?;

        match frame.caller {
            Some(caller) => {
                debug!(unit = %frame.code.name, depth = self.frames.len(), "return");
                self.frames
                    .get_mut(caller)
                    .ok_or(VmError::NoActiveFrame)?
                    .push(value);
                Ok(ExecutionResult::Continue)
            }
            None => Ok(ExecutionResult::Return(value)),
        }
    }
}
