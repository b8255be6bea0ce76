//! Bytecode debugging utilities

use crate::opcode::instruction::{decode, Instruction};
use crate::opcode::{comparator, OpCode};
use stackvm_types::CodeUnit;
use std::fmt::Write;

/// Render a human-readable listing of `unit`
///
/// Undecodable bytes are listed and skipped one at a time, so a listing can
/// always be produced for a damaged stream.
pub fn disassemble(unit: &CodeUnit) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ==", unit.name);
    let _ = writeln!(
        out,
        "args: {}  locals: {}  constants: {}  names: {}",
        unit.arg_count,
        unit.local_count,
        unit.constants.len(),
        unit.names.len()
    );

    let code = &unit.instructions;
    let mut pc = 0;
    while pc < code.len() {
        match decode(code, pc) {
            Ok(instruction) => {
                let _ = writeln!(out, "{:04}  {}", pc, describe(unit, pc, instruction));
                pc += instruction.width();
            }
            Err(_) => {
                let _ = match OpCode::from_u8(code[pc]) {
                    Some(opcode) => writeln!(out, "{:04}  {:<22}<truncated>", pc, opcode.name()),
                    None => writeln!(out, "{:04}  UNKNOWN               opcode={}", pc, code[pc]),
                };
                pc += 1;
            }
        }
    }

    out
}

/// Disassemble a single instruction
fn describe(unit: &CodeUnit, pc: usize, instruction: Instruction) -> String {
    let opcode = instruction.opcode;
    let arg = match instruction.arg {
        Some(arg) => arg,
        None => return opcode.name().to_string(),
    };

    let annotation = match opcode {
        OpCode::LoadConst => unit
            .constant(arg as usize)
            .map(|value| value.repr())
            .unwrap_or_else(|| "<invalid constant>".to_string()),
        OpCode::LoadGlobal | OpCode::LoadAttr => unit
            .name_at(arg as usize)
            .unwrap_or("<invalid name>")
            .to_string(),
        OpCode::CompareOp => comparator(arg)
            .map(|op| op.symbol().to_string())
            .unwrap_or_else(|| "<unsupported>".to_string()),
        OpCode::CallFunction => format!("{} positional, {} keyword", arg & 0xff, arg >> 8),
        _ if opcode.is_relative_jump() => format!("to {}", pc + instruction.width() + arg as usize),
        _ if opcode.is_absolute_jump() => format!("to {}", arg),
        _ => String::new(),
    };

    if annotation.is_empty() {
        format!("{:<22}{}", opcode.name(), arg)
    } else {
        format!("{:<22}{} ({})", opcode.name(), arg, annotation)
    }
}
