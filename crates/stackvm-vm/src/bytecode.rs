//! Building and loading compiled units

use crate::opcode::instruction::encode_arg;
use crate::opcode::{comparator_code, OpCode};
use serde::{Deserialize, Serialize};
use stackvm_types::{CodeUnit, CompareOp, Constant, Namespace, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Limits exceeded while assembling a unit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("too many constants (limit {})", u16::MAX as usize + 1)]
    TooManyConstants,

    #[error("too many names (limit {})", u16::MAX as usize + 1)]
    TooManyNames,

    #[error("jump at offset {at} cannot reach {target}")]
    JumpOutOfRange { at: usize, target: usize },

    #[error("byte {opcode} at offset {at} is not a jump")]
    NotAJump { opcode: u8, at: usize },
}

/// Incremental assembler for [`CodeUnit`]s
///
/// Forward jumps are emitted with a placeholder operand and fixed up with
/// [`CodeBuilder::patch_here`] once the target is known.
#[derive(Debug)]
pub struct CodeBuilder {
    unit: CodeUnit,
    error: Option<BuildError>,
}

impl CodeBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            unit: CodeUnit::new(name),
            error: None,
        }
    }

    /// Declare `count` positional parameters (they occupy the first slots)
    pub fn args(mut self, count: usize) -> Self {
        self.unit.arg_count = count;
        self.unit.local_count = self.unit.local_count.max(count);
        self
    }

    /// Declare the number of local slots
    pub fn locals(mut self, count: usize) -> Self {
        self.unit.local_count = count.max(self.unit.arg_count);
        self
    }

    /// Offset the next instruction will be written at
    pub fn position(&self) -> usize {
        self.unit.instructions.len()
    }

    /// Add a constant and return its index
    pub fn add_constant(&mut self, value: impl Into<Value>) -> u16 {
        self.unit.constants.push(value.into());
        let idx = self.unit.constants.len() - 1;
        self.index(idx, BuildError::TooManyConstants)
    }

    /// Add an identifier and return its index
    pub fn add_name(&mut self, name: &str) -> u16 {
        // Check if name already exists (interning)
        let idx = match self.unit.names.iter().position(|existing| existing == name) {
            Some(idx) => idx,
            None => {
                self.unit.names.push(name.to_string());
                self.unit.names.len() - 1
            }
        };
        self.index(idx, BuildError::TooManyNames)
    }

    /// Emit an instruction; argument-bearing opcodes get a zero operand
    pub fn emit(&mut self, opcode: OpCode) -> usize {
        if opcode.has_argument() {
            return self.emit_arg(opcode, 0);
        }
        let pos = self.position();
        self.unit.instructions.push(opcode.as_u8());
        pos
    }

    /// Emit an argument-bearing instruction
    pub fn emit_arg(&mut self, opcode: OpCode, arg: u16) -> usize {
        let pos = self.position();
        if opcode.has_argument() {
            self.unit.instructions.extend_from_slice(&encode_arg(opcode, arg));
        } else {
            self.unit.instructions.push(opcode.as_u8());
        }
        pos
    }

    /// Append bytes verbatim, valid or not
    pub fn emit_raw(&mut self, bytes: &[u8]) -> usize {
        let pos = self.position();
        self.unit.instructions.extend_from_slice(bytes);
        pos
    }

    /// Point the jump emitted at `pos` to `target`
    pub fn patch_jump(&mut self, pos: usize, target: usize) {
        let byte = self.unit.byte(pos).unwrap_or(0);
        let opcode = match OpCode::from_u8(byte) {
            Some(opcode) => opcode,
            None => return self.fail(BuildError::NotAJump { opcode: byte, at: pos }),
        };

        let operand = if opcode.is_absolute_jump() {
            Some(target)
        } else if opcode.is_relative_jump() {
            target.checked_sub(pos + opcode.width())
        } else {
            return self.fail(BuildError::NotAJump {
                opcode: byte,
                at: pos,
            });
        };

        match operand.and_then(|operand| u16::try_from(operand).ok()) {
            Some(arg) if pos + 2 < self.unit.instructions.len() => {
                let [lo, hi] = arg.to_le_bytes();
                self.unit.instructions[pos + 1] = lo;
                self.unit.instructions[pos + 2] = hi;
            }
            _ => self.fail(BuildError::JumpOutOfRange { at: pos, target }),
        }
    }

    /// Point the jump emitted at `pos` to the current position
    pub fn patch_here(&mut self, pos: usize) {
        let target = self.position();
        self.patch_jump(pos, target);
    }

    // ===== Shorthands =====

    pub fn load_const(&mut self, value: impl Into<Value>) -> usize {
        let idx = self.add_constant(value);
        self.emit_arg(OpCode::LoadConst, idx)
    }

    pub fn load_global(&mut self, name: &str) -> usize {
        let idx = self.add_name(name);
        self.emit_arg(OpCode::LoadGlobal, idx)
    }

    pub fn load_attr(&mut self, name: &str) -> usize {
        let idx = self.add_name(name);
        self.emit_arg(OpCode::LoadAttr, idx)
    }

    pub fn load_fast(&mut self, slot: u16) -> usize {
        self.emit_arg(OpCode::LoadFast, slot)
    }

    pub fn store_fast(&mut self, slot: u16) -> usize {
        self.emit_arg(OpCode::StoreFast, slot)
    }

    pub fn compare(&mut self, op: CompareOp) -> usize {
        self.emit_arg(OpCode::CompareOp, comparator_code(op))
    }

    /// Call with `count` positional arguments
    pub fn call(&mut self, count: u8) -> usize {
        self.emit_arg(OpCode::CallFunction, count as u16)
    }

    /// Finish the unit
    pub fn build(self) -> Result<Arc<CodeUnit>, BuildError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Arc::new(self.unit)),
        }
    }

    fn index(&mut self, idx: usize, overflow: BuildError) -> u16 {
        match u16::try_from(idx) {
            Ok(idx) => idx,
            Err(_) => {
                self.fail(overflow);
                0
            }
        }
    }

    /// Keep the first error; reported by `build`
    fn fail(&mut self, err: BuildError) {
        self.error.get_or_insert(err);
    }
}

/// On-disk form of a compiled unit
///
/// ```json
/// { "name": "main", "local_count": 1, "code": [100, 0, 0, 83],
///   "constants": [42], "names": [],
///   "functions": { "square": { "name": "square", "arg_count": 1, ... } } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFile {
    pub name: String,
    #[serde(default)]
    pub arg_count: usize,
    #[serde(default)]
    pub local_count: usize,
    pub code: Vec<u8>,
    #[serde(default)]
    pub constants: Vec<Constant>,
    #[serde(default)]
    pub names: Vec<String>,
    /// Interpreted callables bound into the globals under their key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub functions: BTreeMap<String, UnitFile>,
}

impl UnitFile {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Convert to a runnable unit, binding nested functions into `globals`
    pub fn load(self, globals: &Namespace) -> Arc<CodeUnit> {
        for (name, function) in self.functions {
            let code = function.load(globals);
            let value = Value::function(code, globals.clone());
            globals.write().insert(name, value);
        }

        Arc::new(CodeUnit {
            name: self.name,
            arg_count: self.arg_count,
            local_count: self.local_count.max(self.arg_count),
            instructions: self.code,
            constants: self.constants.into_iter().map(Value::from).collect(),
            names: self.names,
        })
    }
}
