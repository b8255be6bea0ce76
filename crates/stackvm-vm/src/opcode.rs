//! OpCode definitions for the stackvm interpreter
//!
//! Instructions are a linear byte stream:
//!
//! Opcodes below [`HAVE_ARGUMENT`]: [8-bit opcode]
//! Opcodes at or above it:          [8-bit opcode][16-bit operand, little-endian]
//!
//! The numbering matches the stack-machine bytecode emitted by the external
//! compiler, so streams are consumed bit-exact.

use stackvm_types::CompareOp;
use std::fmt;

/// First opcode that carries a 16-bit operand
pub const HAVE_ARGUMENT: u8 = 90;

/// Interpreter instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // ===== Stack =====
    /// Discard top of stack
    PopTop = 1,

    // ===== Arithmetic =====
    /// TOS = TOS1 * TOS
    BinaryMultiply = 20,
    /// TOS = TOS1 + TOS
    BinaryAdd = 23,
    /// TOS = TOS1 - TOS
    BinarySubtract = 24,

    // ===== Iteration =====
    /// TOS = iter(TOS)
    GetIter = 68,

    // ===== Output =====
    /// Write TOS to the output sink
    PrintItem = 71,
    /// Terminate the current output line
    PrintNewline = 72,

    // ===== Functions =====
    /// Return TOS to the caller
    ReturnValue = 83,

    // ===== Blocks =====
    /// Placeholder closing a loop block
    PopBlock = 87,

    // ===== Argument-bearing =====
    /// Advance iterator at TOS, or pop it and jump forward by the operand
    ForIter = 93,
    /// Push constants[arg]
    LoadConst = 100,
    /// Replace the top arg values with a tuple
    BuildTuple = 102,
    /// Replace the top arg values with a list
    BuildList = 103,
    /// TOS = getattr(TOS, names[arg])
    LoadAttr = 106,
    /// TOS = TOS1 <cmp[arg]> TOS
    CompareOp = 107,
    /// pc += arg (relative to the next instruction)
    JumpForward = 110,
    /// If TOS is falsy jump to arg keeping it, else pop
    JumpIfFalseOrPop = 111,
    /// If TOS is truthy jump to arg keeping it, else pop
    JumpIfTrueOrPop = 112,
    /// pc = arg
    JumpAbsolute = 113,
    /// Pop TOS; jump to arg if falsy
    PopJumpIfFalse = 114,
    /// Pop TOS; jump to arg if truthy
    PopJumpIfTrue = 115,
    /// Push globals[names[arg]]
    LoadGlobal = 116,
    /// Placeholder opening a loop block
    SetupLoop = 120,
    /// Push locals[arg]
    LoadFast = 124,
    /// locals[arg] = TOS
    StoreFast = 125,
    /// Call with arg % 256 positional and arg / 256 keyword arguments
    CallFunction = 131,
}

impl OpCode {
    /// Get opcode from byte value
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(OpCode::PopTop),
            20 => Some(OpCode::BinaryMultiply),
            23 => Some(OpCode::BinaryAdd),
            24 => Some(OpCode::BinarySubtract),
            68 => Some(OpCode::GetIter),
            71 => Some(OpCode::PrintItem),
            72 => Some(OpCode::PrintNewline),
            83 => Some(OpCode::ReturnValue),
            87 => Some(OpCode::PopBlock),
            93 => Some(OpCode::ForIter),
            100 => Some(OpCode::LoadConst),
            102 => Some(OpCode::BuildTuple),
            103 => Some(OpCode::BuildList),
            106 => Some(OpCode::LoadAttr),
            107 => Some(OpCode::CompareOp),
            110 => Some(OpCode::JumpForward),
            111 => Some(OpCode::JumpIfFalseOrPop),
            112 => Some(OpCode::JumpIfTrueOrPop),
            113 => Some(OpCode::JumpAbsolute),
            114 => Some(OpCode::PopJumpIfFalse),
            115 => Some(OpCode::PopJumpIfTrue),
            116 => Some(OpCode::LoadGlobal),
            120 => Some(OpCode::SetupLoop),
            124 => Some(OpCode::LoadFast),
            125 => Some(OpCode::StoreFast),
            131 => Some(OpCode::CallFunction),
            _ => None,
        }
    }

    /// Convert opcode to byte value
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether a 16-bit operand follows the opcode byte
    #[inline]
    pub fn has_argument(self) -> bool {
        self.as_u8() >= HAVE_ARGUMENT
    }

    /// Encoded size in bytes
    #[inline]
    pub fn width(self) -> usize {
        if self.has_argument() {
            3
        } else {
            1
        }
    }

    /// Whether the operand is a jump offset relative to the next instruction
    pub fn is_relative_jump(self) -> bool {
        matches!(
            self,
            OpCode::ForIter | OpCode::JumpForward | OpCode::SetupLoop
        )
    }

    /// Whether the operand is an absolute jump target
    pub fn is_absolute_jump(self) -> bool {
        matches!(
            self,
            OpCode::JumpAbsolute
                | OpCode::JumpIfFalseOrPop
                | OpCode::JumpIfTrueOrPop
                | OpCode::PopJumpIfFalse
                | OpCode::PopJumpIfTrue
        )
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            OpCode::PopTop => "POP_TOP",
            OpCode::BinaryMultiply => "BINARY_MULTIPLY",
            OpCode::BinaryAdd => "BINARY_ADD",
            OpCode::BinarySubtract => "BINARY_SUBTRACT",
            OpCode::GetIter => "GET_ITER",
            OpCode::PrintItem => "PRINT_ITEM",
            OpCode::PrintNewline => "PRINT_NEWLINE",
            OpCode::ReturnValue => "RETURN_VALUE",
            OpCode::PopBlock => "POP_BLOCK",
            OpCode::ForIter => "FOR_ITER",
            OpCode::LoadConst => "LOAD_CONST",
            OpCode::BuildTuple => "BUILD_TUPLE",
            OpCode::BuildList => "BUILD_LIST",
            OpCode::LoadAttr => "LOAD_ATTR",
            OpCode::CompareOp => "COMPARE_OP",
            OpCode::JumpForward => "JUMP_FORWARD",
            OpCode::JumpIfFalseOrPop => "JUMP_IF_FALSE_OR_POP",
            OpCode::JumpIfTrueOrPop => "JUMP_IF_TRUE_OR_POP",
            OpCode::JumpAbsolute => "JUMP_ABSOLUTE",
            OpCode::PopJumpIfFalse => "POP_JUMP_IF_FALSE",
            OpCode::PopJumpIfTrue => "POP_JUMP_IF_TRUE",
            OpCode::LoadGlobal => "LOAD_GLOBAL",
            OpCode::SetupLoop => "SETUP_LOOP",
            OpCode::LoadFast => "LOAD_FAST",
            OpCode::StoreFast => "STORE_FAST",
            OpCode::CallFunction => "CALL_FUNCTION",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Comparator selected by a `COMPARE_OP` operand
pub fn comparator(code: u16) -> Option<CompareOp> {
    match code {
        0 => Some(CompareOp::Lt),
        1 => Some(CompareOp::Le),
        2 => Some(CompareOp::Eq),
        3 => Some(CompareOp::Ne),
        4 => Some(CompareOp::Gt),
        5 => Some(CompareOp::Ge),
        6 => Some(CompareOp::In),
        7 => Some(CompareOp::NotIn),
        8 => Some(CompareOp::Is),
        9 => Some(CompareOp::IsNot),
        _ => None,
    }
}

/// Operand code for a comparator (inverse of [`comparator`])
pub fn comparator_code(op: CompareOp) -> u16 {
    match op {
        CompareOp::Lt => 0,
        CompareOp::Le => 1,
        CompareOp::Eq => 2,
        CompareOp::Ne => 3,
        CompareOp::Gt => 4,
        CompareOp::Ge => 5,
        CompareOp::In => 6,
        CompareOp::NotIn => 7,
        CompareOp::Is => 8,
        CompareOp::IsNot => 9,
    }
}

/// Instruction encoding/decoding utilities
pub mod instruction {
    use super::OpCode;
    use crate::error::VmError;

    /// One decoded instruction
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Instruction {
        pub opcode: OpCode,
        /// Present exactly when the opcode is argument-bearing
        pub arg: Option<u16>,
    }

    impl Instruction {
        /// Operand, or 0 for opcodes without one
        #[inline]
        pub fn arg(self) -> u16 {
            self.arg.unwrap_or(0)
        }

        /// Encoded size in bytes
        #[inline]
        pub fn width(self) -> usize {
            self.opcode.width()
        }
    }

    /// Decode the instruction starting at `pc`
    pub fn decode(code: &[u8], pc: usize) -> Result<Instruction, VmError> {
        let byte = *code.get(pc).ok_or(VmError::CodeOverrun { pc })?;
        let opcode = OpCode::from_u8(byte).ok_or(VmError::UnknownOpcode { opcode: byte, pc })?;

        if !opcode.has_argument() {
            return Ok(Instruction { opcode, arg: None });
        }

        match (code.get(pc + 1), code.get(pc + 2)) {
            (Some(&lo), Some(&hi)) => Ok(Instruction {
                opcode,
                arg: Some(decode_arg(lo, hi)),
            }),
            _ => Err(VmError::TruncatedInstruction { opcode, pc }),
        }
    }

    /// Combine operand bytes (little-endian)
    #[inline]
    pub fn decode_arg(lo: u8, hi: u8) -> u16 {
        u16::from_le_bytes([lo, hi])
    }

    /// Encode an argument-bearing instruction
    #[inline]
    pub fn encode_arg(opcode: OpCode, arg: u16) -> [u8; 3] {
        let [lo, hi] = arg.to_le_bytes();
        [opcode.as_u8(), lo, hi]
    }
}
