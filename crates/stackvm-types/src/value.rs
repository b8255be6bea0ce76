//! Runtime value representation
//!
//! Every operand the interpreter touches is a [`Value`]. Containers that
//! can be mutated in place (lists, iterators) use shared ownership so that
//! aliasing behaves the way programs expect: `b = a; b.append(1)` is
//! visible through `a`.

use crate::code::CodeUnit;
use crate::error::OpError;
use crate::sync::{shared, Arc, Shared};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Global namespace shared between a code unit and the functions it defines
pub type Namespace = Shared<HashMap<String, Value>>;

/// Create an empty namespace
pub fn namespace() -> Namespace {
    shared(HashMap::new())
}

/// Signature of a native operation
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, OpError> + Send + Sync;

/// Operation implemented by the host rather than by bytecode
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    /// Bound receiver, passed as the first argument on invocation
    receiver: Option<Box<Value>>,
    func: Arc<NativeFn>,
}

impl NativeFunction {
    /// Wrap a host closure as a native operation
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, OpError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            receiver: None,
            func: Arc::new(func),
        }
    }

    /// Bind a receiver, turning the native into a method of `receiver`
    pub fn bind(&self, receiver: Value) -> Self {
        Self {
            name: self.name.clone(),
            receiver: Some(Box::new(receiver)),
            func: self.func.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn receiver(&self) -> Option<&Value> {
        self.receiver.as_deref()
    }

    /// Call the host closure with the positional arguments
    pub fn invoke(&self, args: Vec<Value>) -> Result<Value, OpError> {
        match &self.receiver {
            Some(receiver) => {
                let mut full = Vec::with_capacity(args.len() + 1);
                full.push((**receiver).clone());
                full.extend(args);
                (self.func)(&full)
            }
            None => (self.func)(&args),
        }
    }

    fn same_as(&self, other: &NativeFunction) -> bool {
        let same_func =
            Arc::as_ptr(&self.func) as *const () == Arc::as_ptr(&other.func) as *const ();
        same_func
            && match (&self.receiver, &other.receiver) {
                (None, None) => true,
                (Some(a), Some(b)) => a.is_identical(b),
                _ => false,
            }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("bound", &self.receiver.is_some())
            .finish()
    }
}

/// Function whose body is bytecode, executed in its own frame
pub struct Function {
    pub name: String,
    pub code: Arc<CodeUnit>,
    /// Namespace the function was defined in; `LOAD_GLOBAL` resolves here
    pub globals: Namespace,
}

impl fmt::Debug for Function {
    // Globals usually contain the function itself, so they are not printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("code", &self.code.name)
            .finish()
    }
}

/// Anything a call instruction can invoke
#[derive(Debug, Clone)]
pub enum Callable {
    /// Host operation, runs to completion inside the calling frame
    Native(NativeFunction),
    /// Bytecode function, gets a fresh frame
    Interpreted(Arc<Function>),
}

impl Callable {
    pub fn name(&self) -> &str {
        match self {
            Callable::Native(native) => native.name(),
            Callable::Interpreted(function) => &function.name,
        }
    }

    fn same_as(&self, other: &Callable) -> bool {
        match (self, other) {
            (Callable::Native(a), Callable::Native(b)) => a.same_as(b),
            (Callable::Interpreted(a), Callable::Interpreted(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Cursor over a sequence, produced by `GET_ITER`
#[derive(Debug)]
pub enum ValueIter {
    /// Live view over a list: appends during iteration are observed
    List {
        items: Shared<Vec<Value>>,
        index: usize,
    },
    Tuple {
        items: Arc<[Value]>,
        index: usize,
    },
    /// Characters of a string (collected up front for safe indexing)
    Chars { chars: Vec<char>, index: usize },
}

impl Iterator for ValueIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        match self {
            ValueIter::List { items, index } => {
                let value = items.read().get(*index).cloned()?;
                *index += 1;
                Some(value)
            }
            ValueIter::Tuple { items, index } => {
                let value = items.get(*index).cloned()?;
                *index += 1;
                Some(value)
            }
            ValueIter::Chars { chars, index } => {
                let ch = chars.get(*index).copied()?;
                *index += 1;
                Some(Value::from(ch.to_string()))
            }
        }
    }
}

/// Dynamically typed runtime value
#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Mutable sequence with shared ownership
    List(Shared<Vec<Value>>),
    /// Immutable fixed-size sequence
    Tuple(Arc<[Value]>),
    Callable(Callable),
    Iterator(Shared<ValueIter>),
}

impl Value {
    /// Build a new list value
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(shared(items))
    }

    /// Build a new tuple value
    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(items.into())
    }

    /// Wrap a host closure as a callable value
    pub fn native<F>(name: &str, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, OpError> + Send + Sync + 'static,
    {
        Value::Callable(Callable::Native(NativeFunction::new(name, func)))
    }

    /// Wrap a code unit as an interpreted function resolving globals in `globals`
    pub fn function(code: Arc<CodeUnit>, globals: Namespace) -> Self {
        Value::Callable(Callable::Interpreted(Arc::new(Function {
            name: code.name.clone(),
            code,
            globals,
        })))
    }

    /// Name of the value's type, as shown in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Callable(Callable::Native(_)) => "builtin_function_or_method",
            Value::Callable(Callable::Interpreted(_)) => "function",
            Value::Iterator(_) => "iterator",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            Value::Bool(b) => Some(Number::Int(*b as i64)),
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => None,
        }
    }

    /// Identity test used by the `is` comparator
    pub fn is_identical(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => Arc::ptr_eq(a, b),
            (Value::Tuple(a), Value::Tuple(b)) => {
                Arc::ptr_eq(a, b) || (a.is_empty() && b.is_empty())
            }
            (Value::Callable(a), Value::Callable(b)) => a.same_as(b),
            (Value::Iterator(a), Value::Iterator(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Source-like representation (strings quoted)
    ///
    /// A list met again while it is being formatted prints as `[...]`.
    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.write_repr(&mut out, &mut Vec::new());
        out
    }

    /// `active` holds the lists currently being formatted
    fn write_repr(&self, out: &mut String, active: &mut Vec<*const ()>) {
        match self {
            Value::None => out.push_str("None"),
            Value::Bool(true) => out.push_str("True"),
            Value::Bool(false) => out.push_str("False"),
            Value::Int(n) => out.push_str(&n.to_string()),
            Value::Float(x) => out.push_str(&format_float(*x)),
            Value::Str(s) => out.push_str(&quote(s)),
            Value::List(items) => {
                let id = Arc::as_ptr(items) as *const ();
                if active.contains(&id) || active.len() >= MAX_NESTING {
                    out.push_str("[...]");
                    return;
                }
                active.push(id);
                out.push('[');
                write_items(&items.read(), out, active);
                out.push(']');
                active.pop();
            }
            Value::Tuple(items) => {
                out.push('(');
                write_items(items, out, active);
                if items.len() == 1 {
                    out.push(',');
                }
                out.push(')');
            }
            Value::Callable(Callable::Native(native)) => match native.receiver() {
                Some(receiver) => out.push_str(&format!(
                    "<built-in method {} of {} object>",
                    native.name(),
                    receiver.type_name()
                )),
                None => out.push_str(&format!("<built-in function {}>", native.name())),
            },
            Value::Callable(Callable::Interpreted(function)) => {
                out.push_str(&format!("<function {}>", function.name))
            }
            Value::Iterator(_) => out.push_str("<iterator>"),
        }
    }

    /// Structural equality, failing instead of recursing past [`MAX_NESTING`]
    pub fn try_eq(&self, other: &Value) -> Result<bool, OpError> {
        self.eq_at(other, 0)
    }

    fn eq_at(&self, other: &Value, depth: usize) -> Result<bool, OpError> {
        if depth > MAX_NESTING {
            return Err(OpError::Nesting("comparison"));
        }
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                if Arc::ptr_eq(a, b) {
                    return Ok(true);
                }
                let (a, b) = (a.read().clone(), b.read().clone());
                eq_items(&a, &b, depth)
            }
            (Value::Tuple(a), Value::Tuple(b)) => eq_items(a, b, depth),
            (Value::None, Value::None) => Ok(true),
            (Value::Str(a), Value::Str(b)) => Ok(a == b),
            (Value::Callable(a), Value::Callable(b)) => Ok(a.same_as(b)),
            (Value::Iterator(a), Value::Iterator(b)) => Ok(Arc::ptr_eq(a, b)),
            _ => Ok(match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.partial_cmp(b) == Some(Ordering::Equal),
                _ => false,
            }),
        }
    }
}

/// Deepest container nesting that repr and comparisons will descend into
pub const MAX_NESTING: usize = 1000;

fn write_items(items: &[Value], out: &mut String, active: &mut Vec<*const ()>) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        item.write_repr(out, active);
    }
}

fn eq_items(a: &[Value], b: &[Value], depth: usize) -> Result<bool, OpError> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !x.eq_at(y, depth + 1)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        let sign = if x > 0.0 { "" } else { "-" };
        format!("{}inf", sign)
    } else if x != 0.0 && !(1e-4..1e16).contains(&x.abs()) {
        exponent_form(x)
    } else if x.fract() == 0.0 {
        format!("{:.1}", x)
    } else {
        x.to_string()
    }
}

/// `1e+16`, `1.5e-07`: signed exponent of at least two digits
fn exponent_form(x: f64) -> String {
    let shortest = format!("{:e}", x);
    let (mantissa, exponent) = shortest.split_once('e').unwrap_or((shortest.as_str(), "0"));
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{}e{}{:0>2}", mantissa, sign, digits)
}

fn quote(s: &str) -> String {
    let delimiter = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delimiter);
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c == delimiter => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(delimiter);
    out
}

/// Numeric view of a value, with bools promoted to integers
#[derive(Debug, Clone, Copy)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }

    pub(crate) fn partial_cmp(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

/// Too-deep nesting compares unequal; use [`Value::try_eq`] to observe it
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.try_eq(other).unwrap_or(false)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            other => f.write_str(&other.repr()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::list(items)
    }
}
