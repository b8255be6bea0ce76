//! Call frame implementation

use crate::error::VmError;
use crate::opcode::instruction::{self, Instruction};
use crate::opcode::OpCode;
use stackvm_types::{CodeUnit, Namespace, Value};
use std::sync::Arc;

/// Activation record for one invocation
///
/// A pure state container: every value-level operation goes through the
/// provider, never through the frame.
#[derive(Debug)]
pub struct Frame {
    /// Unit being executed
    pub code: Arc<CodeUnit>,

    /// Local slots; `None` until first stored
    pub locals: Vec<Option<Value>>,

    /// Operand stack
    pub stack: Vec<Value>,

    /// Offset of the next instruction to fetch
    pub pc: usize,

    /// Namespace for `LOAD_GLOBAL`
    pub globals: Namespace,

    /// Index of the calling frame in the call stack; `None` for the outermost frame
    pub caller: Option<usize>,
}

impl Frame {
    /// Create a new frame with all local slots unset
    pub fn new(code: Arc<CodeUnit>, globals: Namespace, caller: Option<usize>) -> Self {
        // Arguments always get a slot, even if the unit undercounts its locals
        let locals = vec![None; code.local_count.max(code.arg_count)];
        Self {
            code,
            locals,
            stack: Vec::new(),
            pc: 0,
            globals,
            caller,
        }
    }

    /// Decode the instruction at the pc and advance past it
    pub fn fetch(&mut self) -> Result<Instruction, VmError> {
        let instruction = instruction::decode(&self.code.instructions, self.pc)?;
        self.pc += instruction.width();
        Ok(instruction)
    }

    /// Jump relative to the (already advanced) pc
    #[inline]
    pub fn jump_by(&mut self, offset: u16) {
        self.pc += offset as usize;
    }

    /// Jump to absolute position
    #[inline]
    pub fn jump_to(&mut self, pos: u16) {
        self.pc = pos as usize;
    }

    #[inline]
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self, opcode: OpCode) -> Result<Value, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { opcode })
    }

    /// Pop the top `count` values, preserving their push order
    pub fn pop_n(&mut self, count: usize, opcode: OpCode) -> Result<Vec<Value>, VmError> {
        let len = self.stack.len();
        if count > len {
            return Err(VmError::StackUnderflow { opcode });
        }
        Ok(self.stack.split_off(len - count))
    }

    /// Top of stack without popping
    pub fn peek(&self, opcode: OpCode) -> Result<&Value, VmError> {
        self.stack.last().ok_or(VmError::StackUnderflow { opcode })
    }

    pub fn load_local(&self, slot: u16) -> Result<Value, VmError> {
        match self.locals.get(slot as usize) {
            Some(Some(value)) => Ok(value.clone()),
            Some(None) => Err(VmError::UnboundLocal(slot)),
            None => Err(VmError::InvalidLocal(slot)),
        }
    }

    pub fn store_local(&mut self, slot: u16, value: Value) -> Result<(), VmError> {
        let local = self
            .locals
            .get_mut(slot as usize)
            .ok_or(VmError::InvalidLocal(slot))?;
        *local = Some(value);
        Ok(())
    }

    pub fn constant(&self, idx: u16) -> Result<Value, VmError> {
        self.code
            .constant(idx as usize)
            .cloned()
            .ok_or(VmError::InvalidConstant(idx))
    }

    pub fn name(&self, idx: u16) -> Result<&str, VmError> {
        self.code
            .name_at(idx as usize)
            .ok_or(VmError::InvalidName(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackvm_types::namespace;

    fn frame(local_count: usize) -> Frame {
        let mut code = CodeUnit::new("test");
        code.local_count = local_count;
        code.instructions = vec![100, 0, 0, 83];
        code.constants.push(Value::Int(42));
        Frame::new(Arc::new(code), namespace(), None)
    }

    #[test]
    fn test_locals() {
        let mut frame = frame(2);

        assert!(matches!(frame.load_local(0), Err(VmError::UnboundLocal(0))));
        frame.store_local(1, Value::Int(3)).unwrap();
        assert_eq!(frame.load_local(1).unwrap(), Value::Int(3));
        assert!(matches!(
            frame.store_local(2, Value::None),
            Err(VmError::InvalidLocal(2))
        ));
    }

    #[test]
    fn test_stack_order() {
        let mut frame = frame(0);
        for n in 1..=3 {
            frame.push(Value::Int(n));
        }

        assert_eq!(frame.peek(OpCode::PopTop).unwrap(), &Value::Int(3));
        assert_eq!(
            frame.pop_n(2, OpCode::BuildList).unwrap(),
            vec![Value::Int(2), Value::Int(3)]
        );
        assert!(matches!(
            frame.pop_n(2, OpCode::BuildList),
            Err(VmError::StackUnderflow {
                opcode: OpCode::BuildList
            })
        ));
        assert_eq!(frame.pop(OpCode::PopTop).unwrap(), Value::Int(1));
        assert!(frame.pop(OpCode::PopTop).is_err());
    }

    #[test]
    fn test_fetch_advances_pc() {
        let mut frame = frame(0);

        let first = frame.fetch().unwrap();
        assert_eq!(first.opcode, OpCode::LoadConst);
        assert_eq!(frame.pc, 3);
        assert_eq!(frame.constant(first.arg()).unwrap(), Value::Int(42));

        assert_eq!(frame.fetch().unwrap().opcode, OpCode::ReturnValue);
        assert!(matches!(frame.fetch(), Err(VmError::CodeOverrun { pc: 4 })));
    }
}
