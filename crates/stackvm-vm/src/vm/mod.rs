//! Virtual Machine implementation

use crate::error::VmError;
use crate::opcode::instruction::Instruction;
use crate::opcode::OpCode;
use stackvm_types::{CodeUnit, Namespace, StandardOps, Value, ValueOps};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{instrument, trace};

// Module structure
mod execution;
mod frame;
mod result;
mod trace;

// Re-export public types
pub use frame::Frame;
pub use trace::{TraceHook, TraceStep};

use result::ExecutionResult;

/// Maximum call stack depth
pub const MAX_CALL_DEPTH: usize = 10000;

/// Virtual Machine
///
/// Runs compiled units to completion. Value semantics come from the
/// [`ValueOps`] provider `O`; the VM itself only moves values between the
/// operand stack, local slots and the call chain.
pub struct VM<O: ValueOps = StandardOps> {
    /// Call stack, outermost frame first
    pub(crate) frames: Vec<Frame>,

    /// Value & operation provider
    pub(crate) ops: O,

    /// Sink for `PRINT_ITEM` / `PRINT_NEWLINE`
    pub(crate) output: Box<dyn Write + Send>,

    /// A printed item is pending on the current output line
    pub(crate) softspace: bool,

    pub(crate) max_depth: usize,

    trace_hook: Option<TraceHook>,
}

impl VM<StandardOps> {
    /// Create a new VM with the standard provider printing to stdout
    pub fn new() -> Self {
        Self::with_ops(StandardOps)
    }
}

impl Default for VM<StandardOps> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ValueOps> VM<O> {
    /// Create a VM around a custom provider
    pub fn with_ops(ops: O) -> Self {
        Self {
            frames: Vec::with_capacity(64),
            ops,
            output: Box::new(io::stdout()),
            softspace: false,
            max_depth: MAX_CALL_DEPTH,
            trace_hook: None,
        }
    }

    /// Redirect printed output
    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.output = Box::new(output);
        self
    }

    /// Limit the call chain length (defaults to [`MAX_CALL_DEPTH`])
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    /// Observe every instruction before it executes
    pub fn set_trace_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&TraceStep<'_>) + Send + 'static,
    {
        self.trace_hook = Some(Box::new(hook));
    }

    pub fn clear_trace_hook(&mut self) {
        self.trace_hook = None;
    }

    /// Provider in use
    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// Run `code` as the outermost frame and return its result
    ///
    /// The unit is not modified, so the same unit may be executed any number
    /// of times, with the same or different globals.
    #[instrument(skip_all, fields(unit = %code.name))]
    pub fn execute(&mut self, code: Arc<CodeUnit>, globals: Namespace) -> Result<Value, VmError> {
        self.frames.clear();
        self.frames.push(Frame::new(code, globals, None));

        let result = self.run();
        self.frames.clear();
        if result.is_ok() {
            self.output.flush()?;
        }
        result
    }

    /// Main execution loop
    fn run(&mut self) -> Result<Value, VmError> {
        loop {
            let depth = self.frames.len();
            let frame = self.frames.last_mut().ok_or(VmError::NoActiveFrame)?;

            let pc = frame.pc;
            let instruction = frame.fetch()?;

            trace!(
                pc,
                opcode = %instruction.opcode,
                arg = ?instruction.arg,
                stack = frame.stack.len(),
                depth,
                "dispatch"
            );

            if let Some(hook) = self.trace_hook.as_mut() {
                hook(&TraceStep {
                    unit: &frame.code.name,
                    depth,
                    pc,
                    opcode: instruction.opcode,
                    operand: instruction.arg,
                    stack: &frame.stack,
                    locals: &frame.locals,
                });
            }

            match self.execute_instruction(instruction)? {
                ExecutionResult::Continue => continue,
                ExecutionResult::Return(value) => return Ok(value),
            }
        }
    }

    /// Execute a single instruction
    fn execute_instruction(&mut self, instruction: Instruction) -> Result<ExecutionResult, VmError> {
        match instruction.opcode {
            // Constants, locals, globals and attributes
            OpCode::LoadConst
            | OpCode::LoadFast
            | OpCode::StoreFast
            | OpCode::LoadGlobal
            | OpCode::LoadAttr => self.execute_variables(instruction),

            // Arithmetic
            OpCode::BinaryAdd | OpCode::BinarySubtract | OpCode::BinaryMultiply => {
                self.execute_arithmetic(instruction)
            }

            // Comparison
            OpCode::CompareOp => self.execute_comparison(instruction),

            // Control flow
            OpCode::PopTop
            | OpCode::JumpForward
            | OpCode::JumpAbsolute
            | OpCode::JumpIfFalseOrPop
            | OpCode::JumpIfTrueOrPop
            | OpCode::PopJumpIfFalse
            | OpCode::PopJumpIfTrue
            | OpCode::SetupLoop
            | OpCode::PopBlock => self.execute_control(instruction),

            // Iteration
            OpCode::GetIter | OpCode::ForIter => self.execute_iterators(instruction),

            // Sequences
            OpCode::BuildList | OpCode::BuildTuple => self.execute_sequences(instruction),

            // Calls and returns
            OpCode::CallFunction | OpCode::ReturnValue => self.execute_functions(instruction),

            // Output
            OpCode::PrintItem | OpCode::PrintNewline => self.execute_output(instruction),
        }
    }

    // ===== Helper methods =====

    /// Get current call frame
    pub(crate) fn current_frame(&self) -> Result<&Frame, VmError> {
        self.frames.last().ok_or(VmError::NoActiveFrame)
    }

    /// Get current call frame (mutable)
    pub(crate) fn current_frame_mut(&mut self) -> Result<&mut Frame, VmError> {
        self.frames.last_mut().ok_or(VmError::NoActiveFrame)
    }

    /// Current frame together with the provider, borrowed disjointly
    pub(crate) fn frame_and_ops(&mut self) -> Result<(&mut Frame, &O), VmError> {
        let frame = self.frames.last_mut().ok_or(VmError::NoActiveFrame)?;
        Ok((frame, &self.ops))
    }
}
