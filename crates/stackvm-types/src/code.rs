//! Compiled unit: the immutable artifact the interpreter executes

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Instruction stream plus the tables its operands index into.
///
/// Produced by an external compiler and never mutated by the interpreter,
/// so one unit can back any number of frames (and, wrapped in an `Arc`,
/// any number of threads).
#[derive(Debug, Clone, PartialEq)]
pub struct CodeUnit {
    /// Name used in diagnostics
    pub name: String,

    /// Number of positional parameters
    pub arg_count: usize,

    /// Number of local-variable slots (parameters included)
    pub local_count: usize,

    /// Linear instruction stream
    pub instructions: Vec<u8>,

    /// Constant pool
    pub constants: Vec<Value>,

    /// Identifiers for global and attribute lookups
    pub names: Vec<String>,
}

impl CodeUnit {
    /// Create an empty unit
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_count: 0,
            local_count: 0,
            instructions: Vec::new(),
            constants: Vec::new(),
            names: Vec::new(),
        }
    }

    /// Byte at `pos`
    #[inline]
    pub fn byte(&self, pos: usize) -> Option<u8> {
        self.instructions.get(pos).copied()
    }

    /// Get constant by index
    pub fn constant(&self, idx: usize) -> Option<&Value> {
        self.constants.get(idx)
    }

    /// Get identifier by index
    pub fn name_at(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }
}

/// Serialized form of a constant-pool entry
///
/// JSON mapping: `null`, booleans, integers, floats, strings, and arrays
/// (tuples of constants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<Constant>),
}

impl From<Constant> for Value {
    fn from(constant: Constant) -> Self {
        match constant {
            Constant::None => Value::None,
            Constant::Bool(b) => Value::Bool(b),
            Constant::Int(n) => Value::Int(n),
            Constant::Float(x) => Value::Float(x),
            Constant::Str(s) => Value::from(s),
            Constant::Tuple(items) => Value::tuple(items.into_iter().map(Value::from).collect()),
        }
    }
}
