//! Decoded CIL instructions.
//!
//! An [`Instruction`] is the unit the handler chain works on. Instructions are stored per
//! method in a plain `Vec` and addressed by position; the byte offset is kept so that branch
//! operands (which are relative to the next instruction) remain meaningful.

use std::fmt;

use crate::{assembly::opcodes, metadata::token::Token, Result};

/// Encoding of the operand that follows an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandType {
    /// No operand
    None,
    /// Signed 8-bit immediate (`ldc.i4.s`)
    Int8,
    /// Unsigned 8-bit immediate (short argument/local indices, `unaligned.`)
    UInt8,
    /// Unsigned 16-bit immediate (long argument/local indices)
    UInt16,
    /// Signed 32-bit immediate
    Int32,
    /// Signed 64-bit immediate
    Int64,
    /// 32-bit float immediate
    Float32,
    /// 64-bit float immediate
    Float64,
    /// Metadata token (field, method, type, signature or string)
    Token,
    /// Jump table: `u32` count followed by `i32` offsets
    Switch,
    /// Signed 8-bit branch offset
    ShortBranchTarget,
    /// Signed 32-bit branch offset
    BranchTarget,
}

impl OperandType {
    /// Encoded size of an operand of this type in bytes. Switch tables report their fixed
    /// count prefix only.
    #[must_use]
    pub fn size(self) -> u32 {
        match self {
            OperandType::None => 0,
            OperandType::Int8 | OperandType::UInt8 | OperandType::ShortBranchTarget => 1,
            OperandType::UInt16 => 2,
            OperandType::Int32
            | OperandType::Float32
            | OperandType::Token
            | OperandType::BranchTarget
            | OperandType::Switch => 4,
            OperandType::Int64 | OperandType::Float64 => 8,
        }
    }
}

/// Control flow behaviour of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowType {
    /// Falls through to the next instruction
    Sequential,
    /// Branch taken on a condition
    ConditionalBranch,
    /// Unconditional branch
    UnconditionalBranch,
    /// Method call, execution continues after return
    Call,
    /// Method return
    Return,
    /// Multi-way branch
    Switch,
    /// Throws an exception
    Throw,
    /// Ends a finally or filter block
    EndFinally,
    /// Leaves a protected region
    Leave,
}

/// Immediate operand values.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum Immediate {
    Int8(i8),
    UInt8(u8),
    UInt16(u16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
}

/// A decoded operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// Immediate value
    Immediate(Immediate),
    /// Branch offset relative to the start of the next instruction
    Target(i32),
    /// Metadata token
    Token(Token),
    /// Switch table offsets relative to the start of the next instruction
    Switch(Vec<i32>),
}

/// A single CIL instruction of a method body.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset within the method body
    pub offset: u32,
    /// Encoded size in bytes, including prefix and operand
    pub size: u32,
    /// `0` for single-byte opcodes, [`opcodes::FE_PREFIX`] for two-byte opcodes
    pub prefix: u8,
    /// The opcode byte (second byte for two-byte opcodes)
    pub opcode: u8,
    /// Assembly mnemonic
    pub mnemonic: &'static str,
    /// Operand encoding
    pub operand_type: OperandType,
    /// Control flow behaviour
    pub flow_type: FlowType,
    /// The operand
    pub operand: Operand,
}

impl Instruction {
    /// Build an instruction from an opcode and operand, as rewriters and the adapter
    /// builder do. The offset is `0` until the instruction is placed into a body.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for reserved opcodes or an operand that does not
    /// fit the opcode's operand type.
    pub fn new(prefix: u8, opcode: u8, operand: Operand) -> Result<Self> {
        let Some(info) = opcodes::lookup(prefix, opcode) else {
            return Err(malformed_error!(
                "Invalid opcode: {:02X} {:02X}",
                prefix,
                opcode
            ));
        };

        let fits = matches!(
            (info.operand_type, &operand),
            (OperandType::None, Operand::None)
                | (OperandType::Int8, Operand::Immediate(Immediate::Int8(_)))
                | (OperandType::UInt8, Operand::Immediate(Immediate::UInt8(_)))
                | (OperandType::UInt16, Operand::Immediate(Immediate::UInt16(_)))
                | (OperandType::Int32, Operand::Immediate(Immediate::Int32(_)))
                | (OperandType::Int64, Operand::Immediate(Immediate::Int64(_)))
                | (OperandType::Float32, Operand::Immediate(Immediate::Float32(_)))
                | (OperandType::Float64, Operand::Immediate(Immediate::Float64(_)))
                | (OperandType::Token, Operand::Token(_))
                | (OperandType::Switch, Operand::Switch(_))
                | (OperandType::ShortBranchTarget, Operand::Target(_))
                | (OperandType::BranchTarget, Operand::Target(_))
        );
        if !fits {
            return Err(malformed_error!(
                "Operand {:?} does not fit '{}'",
                operand,
                info.mnemonic
            ));
        }

        if let (OperandType::ShortBranchTarget, Operand::Target(target)) =
            (info.operand_type, &operand)
        {
            if i8::try_from(*target).is_err() {
                return Err(malformed_error!(
                    "Branch offset {} out of range for '{}'",
                    target,
                    info.mnemonic
                ));
            }
        }

        let opcode_size = if prefix == 0 { 1 } else { 2 };
        let table_size = match &operand {
            Operand::Switch(targets) => targets.len() as u32 * 4,
            _ => 0,
        };

        Ok(Instruction {
            offset: 0,
            size: opcode_size + info.operand_type.size() + table_size,
            prefix,
            opcode,
            mnemonic: info.mnemonic,
            operand_type: info.operand_type,
            flow_type: info.flow_type,
            operand,
        })
    }

    /// A single-byte opcode carrying a token.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn with_token(opcode: u8, token: Token) -> Result<Self> {
        Instruction::new(0, opcode, Operand::Token(token))
    }

    /// A single-byte opcode without operand.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn simple(opcode: u8) -> Result<Self> {
        Instruction::new(0, opcode, Operand::None)
    }

    /// Whether this is `opcode` (single-byte) regardless of operand.
    #[must_use]
    pub fn is(&self, opcode: u8) -> bool {
        self.prefix == 0 && self.opcode == opcode
    }

    /// The token operand, if any.
    #[must_use]
    pub fn token(&self) -> Option<Token> {
        match self.operand {
            Operand::Token(token) => Some(token),
            _ => None,
        }
    }

    /// Combined opcode value, e.g. `0x28` for `call` and `0xFE01` for `ceq`.
    #[must_use]
    pub fn opcode_value(&self) -> u16 {
        (u16::from(self.prefix) << 8) | u16::from(self.opcode)
    }

    /// Offset of the instruction that follows.
    #[must_use]
    pub fn next_offset(&self) -> u32 {
        self.offset + self.size
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IL_{:04x}: {}", self.offset, self.mnemonic)?;
        match &self.operand {
            Operand::None => Ok(()),
            Operand::Immediate(Immediate::Int8(value)) => write!(f, " {value}"),
            Operand::Immediate(Immediate::UInt8(value)) => write!(f, " {value}"),
            Operand::Immediate(Immediate::UInt16(value)) => write!(f, " {value}"),
            Operand::Immediate(Immediate::Int32(value)) => write!(f, " {value}"),
            Operand::Immediate(Immediate::Int64(value)) => write!(f, " {value}"),
            Operand::Immediate(Immediate::Float32(value)) => write!(f, " {value}"),
            Operand::Immediate(Immediate::Float64(value)) => write!(f, " {value}"),
            Operand::Token(token) => write!(f, " {token}"),
            Operand::Target(target) => {
                let absolute = i64::from(self.next_offset()) + i64::from(*target);
                write!(f, " IL_{absolute:04x}")
            }
            Operand::Switch(targets) => write!(f, " ({} targets)", targets.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::opcodes::*;

    #[test]
    fn same_size_pairs() {
        let token = Token::new(0x0A00_0001);
        let ldfld = Instruction::with_token(LDFLD, token).unwrap();
        let callvirt = Instruction::with_token(CALLVIRT, token).unwrap();
        let ldsfld = Instruction::with_token(LDSFLD, token).unwrap();
        let call = Instruction::with_token(CALL, token).unwrap();

        assert_eq!(ldfld.size, 5);
        assert_eq!(ldfld.size, callvirt.size);
        assert_eq!(ldsfld.size, call.size);
        assert_eq!(call.flow_type, FlowType::Call);
    }

    #[test]
    fn operand_mismatch() {
        assert!(Instruction::new(0, CALL, Operand::None).is_err());
        assert!(Instruction::new(0, NOP, Operand::Token(Token::new(1))).is_err());
        assert!(Instruction::new(0, BR_S, Operand::Target(300)).is_err());
        assert!(Instruction::new(0, 0x24, Operand::None).is_err());
    }

    #[test]
    fn two_byte_opcodes() {
        let ldarg = Instruction::new(
            FE_PREFIX,
            FE_LDARG,
            Operand::Immediate(Immediate::UInt16(300)),
        )
        .unwrap();
        assert_eq!(ldarg.size, 4);
        assert_eq!(ldarg.opcode_value(), 0xFE09);
        assert!(!ldarg.is(FE_LDARG));
    }

    #[test]
    fn switch_size() {
        let switch = Instruction::new(0, SWITCH, Operand::Switch(vec![1, 2, 3])).unwrap();
        assert_eq!(switch.size, 1 + 4 + 12);
    }

    #[test]
    fn display() {
        let mut br = Instruction::new(0, BR_S, Operand::Target(4)).unwrap();
        br.offset = 0x10;
        assert_eq!(br.to_string(), "IL_0010: br.s IL_0016");
    }
}
