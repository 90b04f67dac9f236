//! Linear CIL decoding.
//!
//! Method bodies of this module format contain no exception tables or embedded data, so a
//! body is decoded front to back into a `Vec<Instruction>`. Any undecodable byte sequence
//! fails the whole body.

use crate::{
    assembly::{opcodes, Immediate, Instruction, Operand, OperandType},
    file::parser::Parser,
    metadata::token::Token,
    Result,
};

/// Decode a single instruction at the parser's current position.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for reserved or unknown opcodes and
/// [`crate::Error::OutOfBounds`] for truncated operands.
pub fn decode_instruction(parser: &mut Parser) -> Result<Instruction> {
    let offset = parser.pos();
    let first_byte = parser.read_le::<u8>()?;

    let (prefix, opcode) = match first_byte {
        opcodes::FE_PREFIX => (opcodes::FE_PREFIX, parser.read_le::<u8>()?),
        _ => (0, first_byte),
    };

    let Some(info) = opcodes::lookup(prefix, opcode) else {
        return Err(malformed_error!(
            "Invalid opcode: {:02X} {:02X} at offset {}",
            prefix,
            opcode,
            offset
        ));
    };

    let operand = match info.operand_type {
        OperandType::None => Operand::None,
        OperandType::Int8 => Operand::Immediate(Immediate::Int8(parser.read_le::<i8>()?)),
        OperandType::UInt8 => Operand::Immediate(Immediate::UInt8(parser.read_le::<u8>()?)),
        OperandType::UInt16 => Operand::Immediate(Immediate::UInt16(parser.read_le::<u16>()?)),
        OperandType::Int32 => Operand::Immediate(Immediate::Int32(parser.read_le::<i32>()?)),
        OperandType::Int64 => Operand::Immediate(Immediate::Int64(parser.read_le::<i64>()?)),
        OperandType::Float32 => Operand::Immediate(Immediate::Float32(parser.read_le::<f32>()?)),
        OperandType::Float64 => Operand::Immediate(Immediate::Float64(parser.read_le::<f64>()?)),
        OperandType::Token => Operand::Token(Token::new(parser.read_le::<u32>()?)),
        OperandType::ShortBranchTarget => Operand::Target(i32::from(parser.read_le::<i8>()?)),
        OperandType::BranchTarget => Operand::Target(parser.read_le::<i32>()?),
        OperandType::Switch => {
            let case_count = parser.read_le::<u32>()? as usize;
            if case_count * 4 > parser.remaining() {
                return Err(out_of_bounds_error!());
            }

            let mut targets = Vec::with_capacity(case_count);
            for _ in 0..case_count {
                targets.push(parser.read_le::<i32>()?);
            }

            Operand::Switch(targets)
        }
    };

    Ok(Instruction {
        offset: offset as u32,
        size: (parser.pos() - offset) as u32,
        prefix,
        opcode,
        mnemonic: info.mnemonic,
        operand_type: info.operand_type,
        flow_type: info.flow_type,
        operand,
    })
}

/// Decode a complete method body.
///
/// # Errors
/// Fails on the first undecodable instruction, see [`decode_instruction`].
pub fn decode_body(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut parser = Parser::new(code);
    let mut instructions = Vec::new();

    while parser.has_more_data() {
        instructions.push(decode_instruction(&mut parser)?);
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::FlowType;

    #[test]
    fn decode_instruction_basic() {
        // ldloc.s 10
        let mut parser = Parser::new(&[0x11, 0x10]);
        let result = decode_instruction(&mut parser).unwrap();

        assert_eq!(result.offset, 0);
        assert_eq!(result.size, 2);
        assert_eq!(result.opcode, 0x11);
        assert_eq!(result.prefix, 0);
        assert_eq!(result.mnemonic, "ldloc.s");
        assert_eq!(result.flow_type, FlowType::Sequential);
        assert_eq!(result.operand, Operand::Immediate(Immediate::UInt8(0x10)));
    }

    #[test]
    fn decode_instruction_two_byte() {
        // ceq
        let mut parser = Parser::new(&[0xFE, 0x01]);
        let result = decode_instruction(&mut parser).unwrap();

        assert_eq!(result.opcode, 0x01);
        assert_eq!(result.prefix, 0xFE);
        assert_eq!(result.mnemonic, "ceq");
        assert_eq!(result.size, 2);
    }

    #[test]
    fn decode_instruction_token() {
        // call 0x0A000002
        let mut parser = Parser::new(&[0x28, 0x02, 0x00, 0x00, 0x0A]);
        let result = decode_instruction(&mut parser).unwrap();

        assert_eq!(result.mnemonic, "call");
        assert_eq!(result.token(), Some(Token::new(0x0A00_0002)));
        assert_eq!(result.flow_type, FlowType::Call);
    }

    #[test]
    fn decode_instruction_branch() {
        // br.s -2
        let mut parser = Parser::new(&[0x2B, 0xFE]);
        let result = decode_instruction(&mut parser).unwrap();

        assert_eq!(result.flow_type, FlowType::UnconditionalBranch);
        assert_eq!(result.operand, Operand::Target(-2));
    }

    #[test]
    fn decode_instruction_switch() {
        let mut parser = Parser::new(&[
            0x45, 0x02, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00,
        ]);
        let result = decode_instruction(&mut parser).unwrap();

        assert_eq!(result.size, 13);
        assert_eq!(result.operand, Operand::Switch(vec![10, 20]));
    }

    #[test]
    fn decode_switch_count_too_large() {
        let mut parser = Parser::new(&[0x45, 0xFF, 0xFF, 0xFF, 0x7F]);
        assert!(decode_instruction(&mut parser).is_err());
    }

    #[test]
    fn decode_reserved() {
        assert!(decode_body(&[0x24]).is_err());
        assert!(decode_body(&[0xFE, 0x08]).is_err());
        assert!(decode_body(&[0xFE]).is_err());
    }

    #[test]
    fn decode_body_offsets() {
        // ldarg.0; ldfld 0x04000001; ret
        let body = decode_body(&[0x02, 0x7B, 0x01, 0x00, 0x00, 0x04, 0x2A]).unwrap();
        assert_eq!(body.len(), 3);
        assert_eq!(body[1].offset, 1);
        assert_eq!(body[2].offset, 6);
        assert_eq!(body[2].mnemonic, "ret");
    }

    #[test]
    fn decode_empty_body() {
        assert!(decode_body(&[]).unwrap().is_empty());
    }
}
