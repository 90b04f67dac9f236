//! CIL encoding.
//!
//! The reverse of [`crate::assembly::decode_body`]: [`encode_instruction`] writes a single
//! instruction, [`encode_body`] a complete method body. [`InstructionEncoder`] assembles
//! new bodies instruction by instruction and picks the shortest encoding where CIL offers
//! several, as the adapter builder needs for its forwarding stubs.
//!
//! ```rust
//! use modcompat::assembly::{encode_body, InstructionEncoder};
//!
//! let mut encoder = InstructionEncoder::new();
//! encoder.emit_ldarg(0)?;
//! encoder.emit_ldc_i4(42)?;
//! encoder.emit_ret()?;
//!
//! let body = encoder.finish();
//! assert_eq!(encode_body(&body)?, vec![0x02, 0x1F, 0x2A, 0x2A]);
//! # Ok::<(), modcompat::Error>(())
//! ```

use crate::{
    assembly::{opcodes, Immediate, Instruction, Operand},
    file::io::write_le,
    metadata::token::Token,
    Result,
};

/// Append the encoding of `instruction` to `buffer`.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if the operand does not match the opcode.
pub fn encode_instruction(instruction: &Instruction, buffer: &mut Vec<u8>) -> Result<()> {
    if instruction.prefix != 0 {
        buffer.push(instruction.prefix);
    }
    buffer.push(instruction.opcode);

    match (&instruction.operand, instruction.operand_type) {
        (Operand::None, _) => {}
        (Operand::Immediate(immediate), _) => match *immediate {
            Immediate::Int8(value) => write_le(buffer, value),
            Immediate::UInt8(value) => write_le(buffer, value),
            Immediate::UInt16(value) => write_le(buffer, value),
            Immediate::Int32(value) => write_le(buffer, value),
            Immediate::Int64(value) => write_le(buffer, value),
            Immediate::Float32(value) => write_le(buffer, value),
            Immediate::Float64(value) => write_le(buffer, value),
        },
        (Operand::Token(token), _) => write_le(buffer, token.value()),
        (Operand::Target(target), crate::assembly::OperandType::ShortBranchTarget) => {
            let short = i8::try_from(*target).map_err(|_| {
                malformed_error!(
                    "Branch offset {} out of range for '{}'",
                    target,
                    instruction.mnemonic
                )
            })?;
            write_le(buffer, short);
        }
        (Operand::Target(target), _) => write_le(buffer, *target),
        (Operand::Switch(targets), _) => {
            write_le(buffer, targets.len() as u32);
            for target in targets {
                write_le(buffer, *target);
            }
        }
    }

    Ok(())
}

/// Encode a complete method body.
///
/// # Errors
/// See [`encode_instruction`].
pub fn encode_body(instructions: &[Instruction]) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(instructions.iter().map(|i| i.size as usize).sum());
    for instruction in instructions {
        encode_instruction(instruction, &mut buffer)?;
    }
    Ok(buffer)
}

/// Builds instruction sequences with offsets assigned as they are emitted.
#[derive(Debug, Default)]
pub struct InstructionEncoder {
    instructions: Vec<Instruction>,
    position: u32,
}

impl InstructionEncoder {
    /// An empty encoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary instruction.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit(&mut self, prefix: u8, opcode: u8, operand: Operand) -> Result<()> {
        let mut instruction = Instruction::new(prefix, opcode, operand)?;
        instruction.offset = self.position;
        self.position += instruction.size;
        self.instructions.push(instruction);
        Ok(())
    }

    /// Emit the shortest `ldarg` form for `index`.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ldarg(&mut self, index: u16) -> Result<()> {
        match index {
            0 => self.emit(0, opcodes::LDARG_0, Operand::None),
            1 => self.emit(0, opcodes::LDARG_1, Operand::None),
            2 => self.emit(0, opcodes::LDARG_2, Operand::None),
            3 => self.emit(0, opcodes::LDARG_3, Operand::None),
            #[allow(clippy::cast_possible_truncation)]
            x if x <= 255 => self.emit(
                0,
                opcodes::LDARG_S,
                Operand::Immediate(Immediate::UInt8(x as u8)),
            ),
            x => self.emit(
                opcodes::FE_PREFIX,
                opcodes::FE_LDARG,
                Operand::Immediate(Immediate::UInt16(x)),
            ),
        }
    }

    /// Emit the shortest `ldc.i4` form for `value`.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ldc_i4(&mut self, value: i32) -> Result<()> {
        match value {
            -1 => self.emit(0, opcodes::LDC_I4_M1, Operand::None),
            #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
            0..=8 => self.emit(0, opcodes::LDC_I4_0 + value as u8, Operand::None),
            #[allow(clippy::cast_possible_truncation)]
            x if i8::try_from(x).is_ok() => self.emit(
                0,
                opcodes::LDC_I4_S,
                Operand::Immediate(Immediate::Int8(x as i8)),
            ),
            x => self.emit(0, opcodes::LDC_I4, Operand::Immediate(Immediate::Int32(x))),
        }
    }

    /// Emit `ldc.i8`.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ldc_i8(&mut self, value: i64) -> Result<()> {
        self.emit(0, opcodes::LDC_I8, Operand::Immediate(Immediate::Int64(value)))
    }

    /// Emit `ldc.r4`.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ldc_r4(&mut self, value: f32) -> Result<()> {
        self.emit(
            0,
            opcodes::LDC_R4,
            Operand::Immediate(Immediate::Float32(value)),
        )
    }

    /// Emit `ldc.r8`.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ldc_r8(&mut self, value: f64) -> Result<()> {
        self.emit(
            0,
            opcodes::LDC_R8,
            Operand::Immediate(Immediate::Float64(value)),
        )
    }

    /// Emit `ldnull`.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ldnull(&mut self) -> Result<()> {
        self.emit(0, opcodes::LDNULL, Operand::None)
    }

    /// Emit `ldstr` for a user string token.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ldstr(&mut self, token: Token) -> Result<()> {
        self.emit(0, opcodes::LDSTR, Operand::Token(token))
    }

    /// Emit a single-byte opcode with a token operand.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_token(&mut self, opcode: u8, token: Token) -> Result<()> {
        self.emit(0, opcode, Operand::Token(token))
    }

    /// Emit `call`, or `callvirt` when `virtual_call` is set.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_call(&mut self, method: Token, virtual_call: bool) -> Result<()> {
        let opcode = if virtual_call {
            opcodes::CALLVIRT
        } else {
            opcodes::CALL
        };
        self.emit(0, opcode, Operand::Token(method))
    }

    /// Emit `ret`.
    ///
    /// # Errors
    /// See [`Instruction::new`].
    pub fn emit_ret(&mut self) -> Result<()> {
        self.emit(0, opcodes::RET, Operand::None)
    }

    /// Current byte position, i.e. the offset of the next instruction.
    #[must_use]
    pub fn current_position(&self) -> u32 {
        self.position
    }

    /// Consume the encoder, returning the emitted instructions.
    #[must_use]
    pub fn finish(self) -> Vec<Instruction> {
        self.instructions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::decode_body;

    #[test]
    fn encode_decode_body() {
        let code = vec![
            0x02, // ldarg.0
            0x7B, 0x01, 0x00, 0x00, 0x04, // ldfld 0x04000001
            0x2C, 0x02, // brfalse.s +2
            0xFE, 0x01, // ceq
            0x45, 0x01, 0x00, 0x00, 0x00, 0xFC, 0xFF, 0xFF, 0xFF, // switch (-4)
            0x23, 0, 0, 0, 0, 0, 0, 0xF0, 0x3F, // ldc.r8 1.0
            0x2A, // ret
        ];
        let body = decode_body(&code).unwrap();
        assert_eq!(encode_body(&body).unwrap(), code);
    }

    #[test]
    fn ldarg_forms() {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_ldarg(2).unwrap();
        encoder.emit_ldarg(10).unwrap();
        encoder.emit_ldarg(1000).unwrap();
        assert_eq!(encoder.current_position(), 1 + 2 + 4);

        let body = encoder.finish();
        assert_eq!(body[0].mnemonic, "ldarg.2");
        assert_eq!(body[1].mnemonic, "ldarg.s");
        assert_eq!(body[2].mnemonic, "ldarg");
        assert_eq!(body[2].offset, 3);
    }

    #[test]
    fn ldc_i4_forms() {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_ldc_i4(-1).unwrap();
        encoder.emit_ldc_i4(8).unwrap();
        encoder.emit_ldc_i4(-100).unwrap();
        encoder.emit_ldc_i4(100_000).unwrap();

        let mnemonics: Vec<_> = encoder.finish().iter().map(|i| i.mnemonic).collect();
        assert_eq!(mnemonics, vec!["ldc.i4.m1", "ldc.i4.8", "ldc.i4.s", "ldc.i4"]);
    }

    #[test]
    fn call_forms() {
        let mut encoder = InstructionEncoder::new();
        encoder.emit_call(Token::new(0x0A00_0001), true).unwrap();
        encoder.emit_call(Token::new(0x0A00_0001), false).unwrap();
        let body = encoder.finish();
        assert_eq!(body[0].mnemonic, "callvirt");
        assert_eq!(body[1].mnemonic, "call");
        assert_eq!(
            encode_body(&body).unwrap(),
            vec![0x6F, 1, 0, 0, 0x0A, 0x28, 1, 0, 0, 0x0A]
        );
    }
}
