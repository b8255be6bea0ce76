//! Integration tests for the VM

mod helpers;

mod functions;

use crate::bytecode::{CodeBuilder, UnitFile};
use crate::opcode::OpCode;
use crate::vm::VM;
use helpers::{globals, returning, sum_range};
use stackvm_types::sync::shared;
use stackvm_types::{namespace, Value};
use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Sink that only counts flushes
#[derive(Clone, Default)]
struct FlushCounter(Arc<AtomicUsize>);

impl Write for FlushCounter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_free_execute() {
    let result = crate::execute(returning(Value::Int(42)), namespace()).unwrap();
    assert_eq!(result, Value::Int(42));
}

#[test]
fn test_vm_is_reusable() {
    let mut vm = VM::new().with_output(io::sink());

    assert_eq!(
        vm.execute(sum_range(5), globals()).unwrap(),
        Value::Int(10)
    );
    // A failed run leaves nothing behind for the next one
    let mut b = CodeBuilder::new("broken");
    b.emit_raw(&[0]);
    assert!(vm.execute(b.build().unwrap(), globals()).is_err());
    assert_eq!(
        vm.execute(sum_range(4), globals()).unwrap(),
        Value::Int(6)
    );
}

#[test]
fn test_output_flushed_only_after_success() {
    let counter = FlushCounter::default();
    let mut vm = VM::new().with_output(counter.clone());

    vm.execute(sum_range(3), globals()).unwrap();
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);

    let mut b = CodeBuilder::new("broken");
    b.load_const(Value::Int(1));
    b.emit(OpCode::PrintItem);
    b.emit_raw(&[0]);
    assert!(vm.execute(b.build().unwrap(), globals()).is_err());
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[test]
fn test_independent_executions_on_threads() {
    let unit = sum_range(100);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let unit = unit.clone();
            thread::spawn(move || {
                VM::new()
                    .with_output(io::sink())
                    .execute(unit, globals())
                    .map_err(|err| err.to_string())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Ok(Value::Int(4950)));
    }
}

#[test]
fn test_trace_hook_sees_state_before_each_step() {
    let mut b = CodeBuilder::new("traced").locals(1);
    b.load_const(Value::Int(5));
    b.store_fast(0);
    b.load_fast(0);
    b.emit(OpCode::ReturnValue);

    let seen = shared(Vec::new());
    let sink = seen.clone();
    let mut vm = VM::new();
    vm.set_trace_hook(move |step| {
        sink.write().push((
            step.pc,
            step.opcode,
            step.operand,
            step.stack.len(),
            step.locals[0].is_some(),
        ));
    });
    vm.execute(b.build().unwrap(), namespace()).unwrap();

    assert_eq!(
        *seen.read(),
        vec![
            (0, OpCode::LoadConst, Some(0), 0, false),
            (3, OpCode::StoreFast, Some(0), 1, false),
            (6, OpCode::LoadFast, Some(0), 0, true),
            (9, OpCode::ReturnValue, None, 1, true),
        ]
    );
}

#[test]
fn test_unit_file_round_trip_execution() {
    let json = r#"{
        "name": "main",
        "code": [116, 0, 0, 100, 0, 0, 131, 1, 0, 116, 0, 0, 100, 1, 0,
                 131, 1, 0, 23, 83],
        "constants": [4, 3],
        "names": ["square"],
        "functions": {
            "square": {
                "name": "square",
                "arg_count": 1,
                "local_count": 1,
                "code": [124, 0, 0, 124, 0, 0, 20, 83]
            }
        }
    }"#;

    let globals = namespace();
    let unit = UnitFile::from_json(json).unwrap().load(&globals);
    let result = VM::new().execute(unit, globals).unwrap();
    assert_eq!(result, Value::Int(25));
}
