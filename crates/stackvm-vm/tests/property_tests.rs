//! Property-based tests using proptest
//!
//! Invariants that should hold for all inputs:
//! 1. Arithmetic over locals gives the same value as native evaluation
//! 2. Accumulating loops give the same total as native iteration
//! 3. The disassembler accepts any byte stream

use proptest::prelude::*;
use stackvm_types::{builtins, namespace, CodeUnit, OpError, Value};
use stackvm_vm::{disassemble, CodeBuilder, OpCode, VmError, VM};
use std::io;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Expr {
    Lit(i64),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Native evaluation; `None` on overflow
    fn eval(&self) -> Option<i64> {
        match self {
            Expr::Lit(n) => Some(*n),
            Expr::Add(a, b) => a.eval()?.checked_add(b.eval()?),
            Expr::Sub(a, b) => a.eval()?.checked_sub(b.eval()?),
            Expr::Mul(a, b) => a.eval()?.checked_mul(b.eval()?),
        }
    }

    fn emit(&self, b: &mut CodeBuilder) {
        let (left, right, op) = match self {
            Expr::Lit(n) => {
                b.load_const(Value::Int(*n));
                return;
            }
            Expr::Add(l, r) => (l, r, OpCode::BinaryAdd),
            Expr::Sub(l, r) => (l, r, OpCode::BinarySubtract),
            Expr::Mul(l, r) => (l, r, OpCode::BinaryMultiply),
        };
        left.emit(b);
        right.emit(b);
        b.emit(op);
    }
}

fn expr() -> impl Strategy<Value = Expr> {
    let leaf = (-1000i64..1000).prop_map(Expr::Lit);
    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::Add(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::Sub(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Expr::Mul(Box::new(a), Box::new(b))),
        ]
    })
}

fn run(code: Arc<CodeUnit>) -> Result<Value, VmError> {
    let globals = namespace();
    builtins::install(&globals);
    VM::new().with_output(io::sink()).execute(code, globals)
}

/// `total = 0; for i in range(n): total = total + i; return total`
fn sum_range(n: i64) -> Arc<CodeUnit> {
    let mut b = CodeBuilder::new("sum").locals(2);
    b.load_const(Value::Int(0));
    b.store_fast(0);
    let setup = b.emit(OpCode::SetupLoop);
    b.load_global("range");
    b.load_const(Value::Int(n));
    b.call(1);
    b.emit(OpCode::GetIter);
    let top = b.position();
    let for_iter = b.emit(OpCode::ForIter);
    b.store_fast(1);
    b.load_fast(0);
    b.load_fast(1);
    b.emit(OpCode::BinaryAdd);
    b.store_fast(0);
    b.emit_arg(OpCode::JumpAbsolute, top as u16);
    b.patch_here(for_iter);
    b.emit(OpCode::PopBlock);
    b.patch_here(setup);
    b.load_fast(0);
    b.emit(OpCode::ReturnValue);
    b.build().unwrap()
}

proptest! {
    #[test]
    fn expression_matches_native(tree in expr()) {
        let mut b = CodeBuilder::new("expr");
        tree.emit(&mut b);
        b.emit(OpCode::ReturnValue);

        let result = run(b.build().unwrap());
        match tree.eval() {
            Some(expected) => prop_assert_eq!(result.unwrap(), Value::Int(expected)),
            None => prop_assert!(matches!(
                result,
                Err(VmError::Operation(OpError::Overflow(_)))
            )),
        }
    }

    #[test]
    fn locals_match_native(x in -10_000i64..10_000, y in -10_000i64..10_000) {
        // a = x; b = a + y; return (a + 1) * (b - 2)
        let mut b = CodeBuilder::new("locals").locals(2);
        b.load_const(Value::Int(x));
        b.store_fast(0);
        b.load_fast(0);
        b.load_const(Value::Int(y));
        b.emit(OpCode::BinaryAdd);
        b.store_fast(1);
        b.load_fast(0);
        b.load_const(Value::Int(1));
        b.emit(OpCode::BinaryAdd);
        b.load_fast(1);
        b.load_const(Value::Int(2));
        b.emit(OpCode::BinarySubtract);
        b.emit(OpCode::BinaryMultiply);
        b.emit(OpCode::ReturnValue);

        let expected = (x + 1) * (x + y - 2);
        prop_assert_eq!(run(b.build().unwrap()).unwrap(), Value::Int(expected));
    }

    #[test]
    fn loop_sum_matches_native(n in 0i64..500) {
        let expected: i64 = (0..n).sum();
        prop_assert_eq!(run(sum_range(n)).unwrap(), Value::Int(expected));
    }

    #[test]
    fn disassembler_accepts_any_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let mut unit = CodeUnit::new("noise");
        unit.instructions = bytes;
        let listing = disassemble(&unit);
        prop_assert!(listing.starts_with("== noise =="));
    }
}
