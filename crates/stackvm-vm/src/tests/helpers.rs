//! Helper functions and common imports for integration tests.

use crate::bytecode::CodeBuilder;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::VM;
use stackvm_types::builtins;
use stackvm_types::sync::{shared, Shared};
use stackvm_types::{namespace, CodeUnit, Namespace, Value};
use std::io::{self, Write};
use std::sync::Arc;

/// Print sink that can be inspected after the VM is done with it
#[derive(Clone)]
pub struct OutputBuffer(Shared<Vec<u8>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self(shared(Vec::new()))
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.read()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Globals pre-populated with the standard natives
pub fn globals() -> Namespace {
    let globals = namespace();
    builtins::install(&globals);
    globals
}

/// Execute with standard globals, discarding printed output
pub fn run(code: Arc<CodeUnit>) -> Result<Value, VmError> {
    run_with(code, globals())
}

pub fn run_with(code: Arc<CodeUnit>, globals: Namespace) -> Result<Value, VmError> {
    VM::new().with_output(io::sink()).execute(code, globals)
}

/// Execute with standard globals, returning the result and everything printed
pub fn run_capturing(code: Arc<CodeUnit>) -> (Result<Value, VmError>, String) {
    let output = OutputBuffer::new();
    let result = VM::new()
        .with_output(output.clone())
        .execute(code, globals());
    (result, output.contents())
}

/// Bind an interpreted function into `globals`
pub fn define(globals: &Namespace, code: Arc<CodeUnit>) {
    let name = code.name.clone();
    let function = Value::function(code, globals.clone());
    globals.write().insert(name, function);
}

/// `ret = 0; for i in range(n): print i; ret = ret + i; return ret`
pub fn sum_range(n: i64) -> Arc<CodeUnit> {
    let mut b = CodeBuilder::new("sum_range").locals(2);
    b.load_const(Value::Int(0));
    b.store_fast(0);
    let setup = b.emit(OpCode::SetupLoop);
    b.load_global("range");
    b.load_const(Value::Int(n));
    b.call(1);
    b.emit(OpCode::GetIter);
    let loop_start = b.position();
    let for_iter = b.emit(OpCode::ForIter);
    b.store_fast(1);
    b.load_fast(1);
    b.emit(OpCode::PrintItem);
    b.emit(OpCode::PrintNewline);
    b.load_fast(0);
    b.load_fast(1);
    b.emit(OpCode::BinaryAdd);
    b.store_fast(0);
    b.emit_arg(OpCode::JumpAbsolute, loop_start as u16);
    b.patch_here(for_iter);
    b.emit(OpCode::PopBlock);
    b.patch_here(setup);
    b.load_fast(0);
    b.emit(OpCode::ReturnValue);
    b.build().unwrap()
}

/// `def square(n): return n * n`
pub fn square() -> Arc<CodeUnit> {
    let mut b = CodeBuilder::new("square").args(1);
    b.load_fast(0);
    b.load_fast(0);
    b.emit(OpCode::BinaryMultiply);
    b.emit(OpCode::ReturnValue);
    b.build().unwrap()
}

/// A unit returning the single constant `value`
pub fn returning(value: impl Into<Value>) -> Arc<CodeUnit> {
    let mut b = CodeBuilder::new("const");
    b.load_const(value);
    b.emit(OpCode::ReturnValue);
    b.build().unwrap()
}
