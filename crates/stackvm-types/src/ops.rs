//! Value operation provider
//!
//! The interpreter never inspects a value's variant to compute a result; it
//! asks a [`ValueOps`] implementation. [`StandardOps`] is the default
//! provider with the usual dynamic-language semantics. Embedders can supply
//! their own to add behaviour without touching the dispatch loop.

use crate::error::OpError;
use crate::methods;
use crate::sync::Arc;
use crate::value::{NativeFunction, Number, Value, ValueIter, MAX_NESTING};
use std::cmp::Ordering;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
        }
    }
}

/// Comparators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
    In,
    NotIn,
    Is,
    IsNot,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::In => "in",
            CompareOp::NotIn => "not in",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        }
    }
}

/// Value semantics consumed by the interpreter
pub trait ValueOps {
    /// `left <op> right`
    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, OpError>;

    /// Apply a comparator; the result is usually a `Bool`
    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> Result<Value, OpError>;

    /// Truthiness used by conditional jumps
    fn truthy(&self, value: &Value) -> bool;

    /// Named attribute of `object`
    fn get_attr(&self, object: &Value, name: &str) -> Result<Value, OpError>;

    /// Iterator over `value`
    fn iterate(&self, value: &Value) -> Result<Value, OpError>;

    /// Advance an iterator produced by [`ValueOps::iterate`]; `None` when exhausted
    fn next(&self, iterator: &Value) -> Result<Option<Value>, OpError>;

    /// Invoke a native operation
    fn call_native(&self, function: &NativeFunction, args: Vec<Value>) -> Result<Value, OpError> {
        function.invoke(args)
    }

    /// Text written for a printed value
    fn display(&self, value: &Value) -> String {
        value.to_string()
    }

    /// New mutable sequence from items in left-to-right order
    fn build_list(&self, items: Vec<Value>) -> Value {
        Value::list(items)
    }

    /// New fixed-size sequence from items in left-to-right order
    fn build_tuple(&self, items: Vec<Value>) -> Value {
        Value::tuple(items)
    }
}

/// Default value semantics
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardOps;

impl ValueOps for StandardOps {
    fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, OpError> {
        match op {
            BinaryOp::Add => add_values(left, right),
            BinaryOp::Subtract => sub_values(left, right),
            BinaryOp::Multiply => mul_values(left, right),
        }
    }

    fn compare(&self, op: CompareOp, left: &Value, right: &Value) -> Result<Value, OpError> {
        let result = match op {
            CompareOp::Eq => left.try_eq(right)?,
            CompareOp::Ne => !left.try_eq(right)?,
            CompareOp::Is => left.is_identical(right),
            CompareOp::IsNot => !left.is_identical(right),
            CompareOp::In => contains(right, left)?,
            CompareOp::NotIn => !contains(right, left)?,
            CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge => {
                match order_values(op.symbol(), left, right)? {
                    // NaN is unordered: every ordering comparison is false
                    None => false,
                    Some(ordering) => match op {
                        CompareOp::Lt => ordering == Ordering::Less,
                        CompareOp::Le => ordering != Ordering::Greater,
                        CompareOp::Gt => ordering == Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    },
                }
            }
        };
        Ok(Value::Bool(result))
    }

    fn truthy(&self, value: &Value) -> bool {
        is_truthy(value)
    }

    fn get_attr(&self, object: &Value, name: &str) -> Result<Value, OpError> {
        methods::lookup(object, name).ok_or_else(|| OpError::Attribute {
            type_name: object.type_name(),
            attr: name.to_string(),
        })
    }

    fn iterate(&self, value: &Value) -> Result<Value, OpError> {
        let iter = match value {
            Value::List(items) => ValueIter::List {
                items: items.clone(),
                index: 0,
            },
            Value::Tuple(items) => ValueIter::Tuple {
                items: items.clone(),
                index: 0,
            },
            Value::Str(s) => ValueIter::Chars {
                chars: s.chars().collect(),
                index: 0,
            },
            // Iterators are their own iterators
            Value::Iterator(_) => return Ok(value.clone()),
            other => return Err(OpError::NotIterable(other.type_name())),
        };
        Ok(Value::Iterator(crate::sync::shared(iter)))
    }

    fn next(&self, iterator: &Value) -> Result<Option<Value>, OpError> {
        match iterator {
            Value::Iterator(iter) => Ok(iter.write().next()),
            other => Err(OpError::type_error("next", "iterator", other.type_name())),
        }
    }
}

/// Truthiness under the standard semantics
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(n) => *n != 0,
        Value::Float(x) => *x != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.read().is_empty(),
        Value::Tuple(items) => !items.is_empty(),
        Value::Callable(_) | Value::Iterator(_) => true,
    }
}

/// Materialize every item an iterable yields
pub fn collect_items(value: &Value) -> Result<Vec<Value>, OpError> {
    match value {
        Value::List(items) => Ok(items.read().clone()),
        Value::Tuple(items) => Ok(items.to_vec()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::from(c.to_string())).collect()),
        Value::Iterator(iter) => Ok(iter.write().by_ref().collect()),
        other => Err(OpError::NotIterable(other.type_name())),
    }
}

fn unsupported(operation: &'static str, left: &Value, right: &Value) -> OpError {
    OpError::UnsupportedOperands {
        operation,
        left: left.type_name(),
        right: right.type_name(),
    }
}

fn numeric(op: BinaryOp, a: Number, b: Number) -> Result<Value, OpError> {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            let result = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Subtract => x.checked_sub(y),
                BinaryOp::Multiply => x.checked_mul(y),
            };
            result.map(Value::Int).ok_or(OpError::Overflow(op.symbol()))
        }
        (a, b) => {
            let (x, y) = (a.as_f64(), b.as_f64());
            Ok(Value::Float(match op {
                BinaryOp::Add => x + y,
                BinaryOp::Subtract => x - y,
                BinaryOp::Multiply => x * y,
            }))
        }
    }
}

fn add_values(left: &Value, right: &Value) -> Result<Value, OpError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return numeric(BinaryOp::Add, a, b);
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Value::from(format!("{}{}", a, b))),
        (Value::List(a), Value::List(b)) => {
            let mut items = a.read().clone();
            items.extend(b.read().iter().cloned());
            Ok(Value::list(items))
        }
        (Value::Tuple(a), Value::Tuple(b)) => {
            Ok(Value::Tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => Err(unsupported("+", left, right)),
    }
}

fn sub_values(left: &Value, right: &Value) -> Result<Value, OpError> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => numeric(BinaryOp::Subtract, a, b),
        _ => Err(unsupported("-", left, right)),
    }
}

fn mul_values(left: &Value, right: &Value) -> Result<Value, OpError> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return numeric(BinaryOp::Multiply, a, b);
    }
    let (sequence, count) = match (left.as_int(), right.as_int()) {
        (None, Some(n)) => (left, n),
        (Some(n), None) => (right, n),
        _ => return Err(unsupported("*", left, right)),
    };
    let count = usize::try_from(count).unwrap_or(0);
    match sequence {
        Value::Str(s) => {
            repeated_len(s.len(), count, "str")?;
            Ok(Value::from(s.repeat(count)))
        }
        Value::List(items) => {
            let items = items.read().clone();
            Ok(Value::list(repeat_items(&items, count, "list")?))
        }
        Value::Tuple(items) => Ok(Value::tuple(repeat_items(items, count, "tuple")?)),
        _ => Err(unsupported("*", left, right)),
    }
}

/// Largest element (or byte) count a repetition may produce
pub const MAX_REPEAT_LEN: usize = 1 << 28;

fn repeated_len(len: usize, count: usize, kind: &'static str) -> Result<usize, OpError> {
    match len.checked_mul(count) {
        Some(total) if total <= MAX_REPEAT_LEN => Ok(total),
        _ => Err(OpError::TooLarge(kind)),
    }
}

fn repeat_items(items: &[Value], count: usize, kind: &'static str) -> Result<Vec<Value>, OpError> {
    let total = repeated_len(items.len(), count, kind)?;
    if total == 0 {
        return Ok(Vec::new());
    }
    let mut out = Vec::with_capacity(total);
    for _ in 0..count {
        out.extend(items.iter().cloned());
    }
    Ok(out)
}

/// Ordering between two values; `Ok(None)` when unordered (NaN)
pub fn order_values(
    operation: &'static str,
    left: &Value,
    right: &Value,
) -> Result<Option<Ordering>, OpError> {
    order_at(operation, left, right, 0)
}

fn order_at(
    operation: &'static str,
    left: &Value,
    right: &Value,
    depth: usize,
) -> Result<Option<Ordering>, OpError> {
    if depth > MAX_NESTING {
        return Err(OpError::Nesting("comparison"));
    }
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Ok(a.partial_cmp(b));
    }
    match (left, right) {
        (Value::Str(a), Value::Str(b)) => Ok(Some(a.cmp(b))),
        (Value::List(a), Value::List(b)) => {
            if Arc::ptr_eq(a, b) {
                return Ok(Some(Ordering::Equal));
            }
            let (a, b) = (a.read().clone(), b.read().clone());
            order_sequences(operation, &a, &b, depth)
        }
        (Value::Tuple(a), Value::Tuple(b)) => order_sequences(operation, a, b, depth),
        _ => Err(unsupported(operation, left, right)),
    }
}

fn order_sequences(
    operation: &'static str,
    left: &[Value],
    right: &[Value],
    depth: usize,
) -> Result<Option<Ordering>, OpError> {
    for (a, b) in left.iter().zip(right.iter()) {
        if !a.try_eq(b)? {
            return order_at(operation, a, b, depth + 1);
        }
    }
    Ok(Some(left.len().cmp(&right.len())))
}

fn contains(container: &Value, item: &Value) -> Result<bool, OpError> {
    match container {
        Value::Str(haystack) => match item {
            Value::Str(needle) => Ok(haystack.contains(&**needle)),
            other => Err(OpError::type_error("in", "str", other.type_name())),
        },
        Value::List(items) => any_equal(&items.read().clone(), item),
        Value::Tuple(items) => any_equal(items, item),
        other => Err(OpError::NotIterable(other.type_name())),
    }
}

fn any_equal(items: &[Value], item: &Value) -> Result<bool, OpError> {
    for value in items {
        if value.try_eq(item)? {
            return Ok(true);
        }
    }
    Ok(false)
}
