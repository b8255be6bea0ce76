use super::helpers::{define, globals, run_with, square};
use crate::bytecode::CodeBuilder;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::VM;
use stackvm_types::sync::shared;
use stackvm_types::{namespace, CodeUnit, CompareOp, OpError, Value};
use std::io;
use std::sync::Arc;

/// `def fact(n): return 1 if n < 2 else n * fact(n - 1)`
fn factorial() -> Arc<CodeUnit> {
    let mut b = CodeBuilder::new("fact").args(1);
    b.load_fast(0);
    b.load_const(Value::Int(2));
    b.compare(CompareOp::Lt);
    let recurse = b.emit(OpCode::PopJumpIfFalse);
    b.load_const(Value::Int(1));
    b.emit(OpCode::ReturnValue);
    b.patch_here(recurse);
    b.load_fast(0);
    b.load_global("fact");
    b.load_fast(0);
    b.load_const(Value::Int(1));
    b.emit(OpCode::BinarySubtract);
    b.call(1);
    b.emit(OpCode::BinaryMultiply);
    b.emit(OpCode::ReturnValue);
    b.build().unwrap()
}

/// `return <name>(<args>...)`
fn call_global(name: &str, args: &[Value]) -> Arc<CodeUnit> {
    let mut b = CodeBuilder::new("main");
    b.load_global(name);
    for arg in args {
        b.load_const(arg.clone());
    }
    b.call(args.len() as u8);
    b.emit(OpCode::ReturnValue);
    b.build().unwrap()
}

#[test]
fn test_nested_calls() {
    // return square(4) + square(3)
    let globals = globals();
    define(&globals, square());

    let mut b = CodeBuilder::new("main");
    b.load_global("square");
    b.load_const(Value::Int(4));
    b.call(1);
    b.load_global("square");
    b.load_const(Value::Int(3));
    b.call(1);
    b.emit(OpCode::BinaryAdd);
    b.emit(OpCode::ReturnValue);

    assert_eq!(run_with(b.build().unwrap(), globals).unwrap(), Value::Int(25));
}

#[test]
fn test_call_chain_unwinds_to_outermost_frame() {
    let globals = globals();
    define(&globals, square());

    let mut b = CodeBuilder::new("main");
    b.load_global("square");
    b.load_const(Value::Int(4));
    b.call(1);
    b.load_global("square");
    b.load_const(Value::Int(3));
    b.call(1);
    b.emit(OpCode::BinaryAdd);
    b.emit(OpCode::ReturnValue);

    let steps = shared(Vec::new());
    let mut vm = VM::new().with_output(io::sink());
    let recorded = steps.clone();
    vm.set_trace_hook(move |step| {
        recorded
            .write()
            .push((step.unit.to_string(), step.depth, step.opcode));
    });
    vm.execute(b.build().unwrap(), globals).unwrap();

    let steps = steps.read();
    let depths: Vec<usize> = steps.iter().map(|(_, depth, _)| *depth).collect();
    assert_eq!(depths, vec![1, 1, 1, 2, 2, 2, 2, 1, 1, 1, 2, 2, 2, 2, 1, 1]);
    assert!(steps
        .iter()
        .filter(|(_, depth, _)| *depth == 2)
        .all(|(unit, _, _)| unit == "square"));
    assert_eq!(steps.last().map(|(_, _, op)| *op), Some(OpCode::ReturnValue));
}

#[test]
fn test_recursion() {
    let globals = globals();
    define(&globals, factorial());

    let result = run_with(call_global("fact", &[Value::Int(10)]), globals).unwrap();
    assert_eq!(result, Value::Int(3_628_800));
}

#[test]
fn test_function_resolves_its_own_globals() {
    // Function defined against `defining`, called from a unit run with `calling`
    let defining = namespace();
    defining.write().insert("k".to_string(), Value::Int(7));
    let mut b = CodeBuilder::new("get_k");
    b.load_global("k");
    b.emit(OpCode::ReturnValue);
    let get_k = Value::function(b.build().unwrap(), defining);

    let calling = namespace();
    calling.write().insert("get_k".to_string(), get_k);
    calling.write().insert("k".to_string(), Value::Int(-1));

    let result = run_with(call_global("get_k", &[]), calling).unwrap();
    assert_eq!(result, Value::Int(7));
}

#[test]
fn test_native_call() {
    let result = run_with(
        call_global("len", &[Value::from("hello")]),
        globals(),
    )
    .unwrap();
    assert_eq!(result, Value::Int(5));

    let globals = namespace();
    globals.write().insert(
        "pair".to_string(),
        Value::native("pair", |args| Ok(Value::tuple(args.to_vec()))),
    );
    let result = run_with(
        call_global("pair", &[Value::Int(1), Value::Int(2)]),
        globals,
    )
    .unwrap();
    assert_eq!(result.repr(), "(1, 2)");
}

#[test]
fn test_native_error_passes_through() {
    let result = run_with(call_global("len", &[Value::Int(3)]), globals());
    assert!(matches!(
        result,
        Err(VmError::Operation(OpError::TypeError { .. }))
    ));
}

#[test]
fn test_arity_mismatch() {
    let globals = globals();
    define(&globals, square());

    let result = run_with(call_global("square", &[Value::Int(1), Value::Int(2)]), globals);
    match result {
        Err(VmError::ArityMismatch {
            name,
            expected,
            got,
        }) => {
            assert_eq!(name, "square");
            assert_eq!(expected, 1);
            assert_eq!(got, 2);
        }
        other => panic!("expected arity mismatch, got {:?}", other),
    }
}

#[test]
fn test_keyword_arguments_rejected() {
    let globals = globals();
    define(&globals, square());

    let mut b = CodeBuilder::new("main");
    b.load_global("square");
    b.load_const("n");
    b.load_const(Value::Int(3));
    b.emit_arg(OpCode::CallFunction, 256);
    b.emit(OpCode::ReturnValue);

    let result = run_with(b.build().unwrap(), globals);
    assert!(matches!(result, Err(VmError::KeywordArguments(1))));
}

#[test]
fn test_not_callable() {
    let mut b = CodeBuilder::new("main");
    b.load_const(Value::Int(3));
    b.call(0);
    b.emit(OpCode::ReturnValue);

    let result = run_with(b.build().unwrap(), globals());
    assert!(matches!(result, Err(VmError::NotCallable("int"))));
}

#[test]
fn test_unbounded_recursion_overflows() {
    // def spin(): return spin()
    let globals = namespace();
    let mut b = CodeBuilder::new("spin");
    b.load_global("spin");
    b.call(0);
    b.emit(OpCode::ReturnValue);
    define(&globals, b.build().unwrap());

    let result = VM::new()
        .with_output(io::sink())
        .with_max_depth(64)
        .execute(call_global("spin", &[]), globals);
    assert!(matches!(result, Err(VmError::StackOverflow)));
}
