//! CIL opcode byte values and the decoding tables (ECMA-335 III).
//!
//! Single-byte opcodes are named after their mnemonic (e.g. [`CALL`] = `0x28`). Two-byte
//! opcodes share the [`FE_PREFIX`] first byte and have their second byte stored with an
//! `FE_` prefix (e.g. [`FE_CEQ`] = `0x01` for `ceq`, encoded `0xFE 0x01`).
#![allow(missing_docs)]

use crate::assembly::{FlowType, OperandType};

/// Shared first byte of all two-byte opcodes.
pub const FE_PREFIX: u8 = 0xFE;

// Single-byte opcodes (0x00 - 0xE0)

pub const NOP: u8 = 0x00;
pub const BREAK: u8 = 0x01;
pub const LDARG_0: u8 = 0x02;
pub const LDARG_1: u8 = 0x03;
pub const LDARG_2: u8 = 0x04;
pub const LDARG_3: u8 = 0x05;
pub const LDLOC_0: u8 = 0x06;
pub const LDLOC_1: u8 = 0x07;
pub const LDLOC_2: u8 = 0x08;
pub const LDLOC_3: u8 = 0x09;
pub const STLOC_0: u8 = 0x0A;
pub const STLOC_1: u8 = 0x0B;
pub const STLOC_2: u8 = 0x0C;
pub const STLOC_3: u8 = 0x0D;
pub const LDARG_S: u8 = 0x0E;
pub const LDARGA_S: u8 = 0x0F;
pub const STARG_S: u8 = 0x10;
pub const LDLOC_S: u8 = 0x11;
pub const LDLOCA_S: u8 = 0x12;
pub const STLOC_S: u8 = 0x13;
pub const LDNULL: u8 = 0x14;
pub const LDC_I4_M1: u8 = 0x15;
pub const LDC_I4_0: u8 = 0x16;
pub const LDC_I4_1: u8 = 0x17;
pub const LDC_I4_2: u8 = 0x18;
pub const LDC_I4_3: u8 = 0x19;
pub const LDC_I4_4: u8 = 0x1A;
pub const LDC_I4_5: u8 = 0x1B;
pub const LDC_I4_6: u8 = 0x1C;
pub const LDC_I4_7: u8 = 0x1D;
pub const LDC_I4_8: u8 = 0x1E;
pub const LDC_I4_S: u8 = 0x1F;
pub const LDC_I4: u8 = 0x20;
pub const LDC_I8: u8 = 0x21;
pub const LDC_R4: u8 = 0x22;
pub const LDC_R8: u8 = 0x23;
pub const DUP: u8 = 0x25;
pub const POP: u8 = 0x26;
pub const JMP: u8 = 0x27;
pub const CALL: u8 = 0x28;
pub const CALLI: u8 = 0x29;
pub const RET: u8 = 0x2A;
pub const BR_S: u8 = 0x2B;
pub const BRFALSE_S: u8 = 0x2C;
pub const BRTRUE_S: u8 = 0x2D;
pub const BEQ_S: u8 = 0x2E;
pub const BGE_S: u8 = 0x2F;
pub const BGT_S: u8 = 0x30;
pub const BLE_S: u8 = 0x31;
pub const BLT_S: u8 = 0x32;
pub const BNE_UN_S: u8 = 0x33;
pub const BGE_UN_S: u8 = 0x34;
pub const BGT_UN_S: u8 = 0x35;
pub const BLE_UN_S: u8 = 0x36;
pub const BLT_UN_S: u8 = 0x37;
pub const BR: u8 = 0x38;
pub const BRFALSE: u8 = 0x39;
pub const BRTRUE: u8 = 0x3A;
pub const BEQ: u8 = 0x3B;
pub const BGE: u8 = 0x3C;
pub const BGT: u8 = 0x3D;
pub const BLE: u8 = 0x3E;
pub const BLT: u8 = 0x3F;
pub const BNE_UN: u8 = 0x40;
pub const BGE_UN: u8 = 0x41;
pub const BGT_UN: u8 = 0x42;
pub const BLE_UN: u8 = 0x43;
pub const BLT_UN: u8 = 0x44;
pub const SWITCH: u8 = 0x45;
pub const LDIND_I1: u8 = 0x46;
pub const LDIND_U1: u8 = 0x47;
pub const LDIND_I2: u8 = 0x48;
pub const LDIND_U2: u8 = 0x49;
pub const LDIND_I4: u8 = 0x4A;
pub const LDIND_U4: u8 = 0x4B;
pub const LDIND_I8: u8 = 0x4C;
pub const LDIND_I: u8 = 0x4D;
pub const LDIND_R4: u8 = 0x4E;
pub const LDIND_R8: u8 = 0x4F;
pub const LDIND_REF: u8 = 0x50;
pub const STIND_REF: u8 = 0x51;
pub const STIND_I1: u8 = 0x52;
pub const STIND_I2: u8 = 0x53;
pub const STIND_I4: u8 = 0x54;
pub const STIND_I8: u8 = 0x55;
pub const STIND_R4: u8 = 0x56;
pub const STIND_R8: u8 = 0x57;
pub const ADD: u8 = 0x58;
pub const SUB: u8 = 0x59;
pub const MUL: u8 = 0x5A;
pub const DIV: u8 = 0x5B;
pub const DIV_UN: u8 = 0x5C;
pub const REM: u8 = 0x5D;
pub const REM_UN: u8 = 0x5E;
pub const AND: u8 = 0x5F;
pub const OR: u8 = 0x60;
pub const XOR: u8 = 0x61;
pub const SHL: u8 = 0x62;
pub const SHR: u8 = 0x63;
pub const SHR_UN: u8 = 0x64;
pub const NEG: u8 = 0x65;
pub const NOT: u8 = 0x66;
pub const CONV_I1: u8 = 0x67;
pub const CONV_I2: u8 = 0x68;
pub const CONV_I4: u8 = 0x69;
pub const CONV_I8: u8 = 0x6A;
pub const CONV_R4: u8 = 0x6B;
pub const CONV_R8: u8 = 0x6C;
pub const CONV_U4: u8 = 0x6D;
pub const CONV_U8: u8 = 0x6E;
pub const CALLVIRT: u8 = 0x6F;
pub const CPOBJ: u8 = 0x70;
pub const LDOBJ: u8 = 0x71;
pub const LDSTR: u8 = 0x72;
pub const NEWOBJ: u8 = 0x73;
pub const CASTCLASS: u8 = 0x74;
pub const ISINST: u8 = 0x75;
pub const CONV_R_UN: u8 = 0x76;
pub const UNBOX: u8 = 0x79;
pub const THROW: u8 = 0x7A;
pub const LDFLD: u8 = 0x7B;
pub const LDFLDA: u8 = 0x7C;
pub const STFLD: u8 = 0x7D;
pub const LDSFLD: u8 = 0x7E;
pub const LDSFLDA: u8 = 0x7F;
pub const STSFLD: u8 = 0x80;
pub const STOBJ: u8 = 0x81;
pub const CONV_OVF_I1_UN: u8 = 0x82;
pub const CONV_OVF_I2_UN: u8 = 0x83;
pub const CONV_OVF_I4_UN: u8 = 0x84;
pub const CONV_OVF_I8_UN: u8 = 0x85;
pub const CONV_OVF_U1_UN: u8 = 0x86;
pub const CONV_OVF_U2_UN: u8 = 0x87;
pub const CONV_OVF_U4_UN: u8 = 0x88;
pub const CONV_OVF_U8_UN: u8 = 0x89;
pub const CONV_OVF_I_UN: u8 = 0x8A;
pub const CONV_OVF_U_UN: u8 = 0x8B;
pub const BOX: u8 = 0x8C;
pub const NEWARR: u8 = 0x8D;
pub const LDLEN: u8 = 0x8E;
pub const LDELEMA: u8 = 0x8F;
pub const LDELEM_I1: u8 = 0x90;
pub const LDELEM_U1: u8 = 0x91;
pub const LDELEM_I2: u8 = 0x92;
pub const LDELEM_U2: u8 = 0x93;
pub const LDELEM_I4: u8 = 0x94;
pub const LDELEM_U4: u8 = 0x95;
pub const LDELEM_I8: u8 = 0x96;
pub const LDELEM_I: u8 = 0x97;
pub const LDELEM_R4: u8 = 0x98;
pub const LDELEM_R8: u8 = 0x99;
pub const LDELEM_REF: u8 = 0x9A;
pub const STELEM_I: u8 = 0x9B;
pub const STELEM_I1: u8 = 0x9C;
pub const STELEM_I2: u8 = 0x9D;
pub const STELEM_I4: u8 = 0x9E;
pub const STELEM_I8: u8 = 0x9F;
pub const STELEM_R4: u8 = 0xA0;
pub const STELEM_R8: u8 = 0xA1;
pub const STELEM_REF: u8 = 0xA2;
pub const LDELEM: u8 = 0xA3;
pub const STELEM: u8 = 0xA4;
pub const UNBOX_ANY: u8 = 0xA5;
pub const CONV_OVF_I1: u8 = 0xB3;
pub const CONV_OVF_U1: u8 = 0xB4;
pub const CONV_OVF_I2: u8 = 0xB5;
pub const CONV_OVF_U2: u8 = 0xB6;
pub const CONV_OVF_I4: u8 = 0xB7;
pub const CONV_OVF_U4: u8 = 0xB8;
pub const CONV_OVF_I8: u8 = 0xB9;
pub const CONV_OVF_U8: u8 = 0xBA;
pub const REFANYVAL: u8 = 0xC2;
pub const CKFINITE: u8 = 0xC3;
pub const MKREFANY: u8 = 0xC6;
pub const LDTOKEN: u8 = 0xD0;
pub const CONV_U2: u8 = 0xD1;
pub const CONV_U1: u8 = 0xD2;
pub const CONV_I: u8 = 0xD3;
pub const CONV_OVF_I: u8 = 0xD4;
pub const CONV_OVF_U: u8 = 0xD5;
pub const ADD_OVF: u8 = 0xD6;
pub const ADD_OVF_UN: u8 = 0xD7;
pub const MUL_OVF: u8 = 0xD8;
pub const MUL_OVF_UN: u8 = 0xD9;
pub const SUB_OVF: u8 = 0xDA;
pub const SUB_OVF_UN: u8 = 0xDB;
pub const ENDFINALLY: u8 = 0xDC;
pub const LEAVE: u8 = 0xDD;
pub const LEAVE_S: u8 = 0xDE;
pub const STIND_I: u8 = 0xDF;
pub const CONV_U: u8 = 0xE0;

// Two-byte opcodes (0xFE 0x00 - 0xFE 0x1E)

pub const FE_ARGLIST: u8 = 0x00;
pub const FE_CEQ: u8 = 0x01;
pub const FE_CGT: u8 = 0x02;
pub const FE_CGT_UN: u8 = 0x03;
pub const FE_CLT: u8 = 0x04;
pub const FE_CLT_UN: u8 = 0x05;
pub const FE_LDFTN: u8 = 0x06;
pub const FE_LDVIRTFTN: u8 = 0x07;
pub const FE_LDARG: u8 = 0x09;
pub const FE_LDARGA: u8 = 0x0A;
pub const FE_STARG: u8 = 0x0B;
pub const FE_LDLOC: u8 = 0x0C;
pub const FE_LDLOCA: u8 = 0x0D;
pub const FE_STLOC: u8 = 0x0E;
pub const FE_LOCALLOC: u8 = 0x0F;
pub const FE_ENDFILTER: u8 = 0x11;
pub const FE_UNALIGNED: u8 = 0x12;
pub const FE_VOLATILE: u8 = 0x13;
pub const FE_TAIL: u8 = 0x14;
pub const FE_INITOBJ: u8 = 0x15;
pub const FE_CONSTRAINED: u8 = 0x16;
pub const FE_CPBLK: u8 = 0x17;
pub const FE_INITBLK: u8 = 0x18;
pub const FE_NO: u8 = 0x19;
pub const FE_RETHROW: u8 = 0x1A;
pub const FE_SIZEOF: u8 = 0x1C;
pub const FE_REFANYTYPE: u8 = 0x1D;
pub const FE_READONLY: u8 = 0x1E;

/// Static description of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Assembly mnemonic, empty for reserved encodings
    pub mnemonic: &'static str,
    /// Operand encoding following the opcode
    pub operand_type: OperandType,
    /// Control flow behaviour
    pub flow_type: FlowType,
}

const fn op(mnemonic: &'static str, operand_type: OperandType, flow_type: FlowType) -> OpcodeInfo {
    OpcodeInfo {
        mnemonic,
        operand_type,
        flow_type,
    }
}

const RESERVED: OpcodeInfo = op("", OperandType::None, FlowType::Sequential);

/// Single-byte opcodes, indexed by opcode.
pub static INSTRUCTIONS: [OpcodeInfo; 225] = [
    op("nop", OperandType::None, FlowType::Sequential),
    op("break", OperandType::None, FlowType::Sequential),
    op("ldarg.0", OperandType::None, FlowType::Sequential),
    op("ldarg.1", OperandType::None, FlowType::Sequential),
    op("ldarg.2", OperandType::None, FlowType::Sequential),
    op("ldarg.3", OperandType::None, FlowType::Sequential),
    op("ldloc.0", OperandType::None, FlowType::Sequential),
    op("ldloc.1", OperandType::None, FlowType::Sequential),
    op("ldloc.2", OperandType::None, FlowType::Sequential),
    op("ldloc.3", OperandType::None, FlowType::Sequential),
    op("stloc.0", OperandType::None, FlowType::Sequential),
    op("stloc.1", OperandType::None, FlowType::Sequential),
    op("stloc.2", OperandType::None, FlowType::Sequential),
    op("stloc.3", OperandType::None, FlowType::Sequential),
    op("ldarg.s", OperandType::UInt8, FlowType::Sequential),
    op("ldarga.s", OperandType::UInt8, FlowType::Sequential),
    op("starg.s", OperandType::UInt8, FlowType::Sequential),
    op("ldloc.s", OperandType::UInt8, FlowType::Sequential),
    op("ldloca.s", OperandType::UInt8, FlowType::Sequential),
    op("stloc.s", OperandType::UInt8, FlowType::Sequential),
    op("ldnull", OperandType::None, FlowType::Sequential),
    op("ldc.i4.m1", OperandType::None, FlowType::Sequential),
    op("ldc.i4.0", OperandType::None, FlowType::Sequential),
    op("ldc.i4.1", OperandType::None, FlowType::Sequential),
    op("ldc.i4.2", OperandType::None, FlowType::Sequential),
    op("ldc.i4.3", OperandType::None, FlowType::Sequential),
    op("ldc.i4.4", OperandType::None, FlowType::Sequential),
    op("ldc.i4.5", OperandType::None, FlowType::Sequential),
    op("ldc.i4.6", OperandType::None, FlowType::Sequential),
    op("ldc.i4.7", OperandType::None, FlowType::Sequential),
    op("ldc.i4.8", OperandType::None, FlowType::Sequential),
    op("ldc.i4.s", OperandType::Int8, FlowType::Sequential),
    op("ldc.i4", OperandType::Int32, FlowType::Sequential),
    op("ldc.i8", OperandType::Int64, FlowType::Sequential),
    op("ldc.r4", OperandType::Float32, FlowType::Sequential),
    op("ldc.r8", OperandType::Float64, FlowType::Sequential),
    RESERVED, // 0x24
    op("dup", OperandType::None, FlowType::Sequential),
    op("pop", OperandType::None, FlowType::Sequential),
    op("jmp", OperandType::Token, FlowType::Call),
    op("call", OperandType::Token, FlowType::Call),
    op("calli", OperandType::Token, FlowType::Call),
    op("ret", OperandType::None, FlowType::Return),
    op("br.s", OperandType::ShortBranchTarget, FlowType::UnconditionalBranch),
    op("brfalse.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("brtrue.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("beq.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("bge.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("bgt.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("ble.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("blt.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("bne.un.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("bge.un.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("bgt.un.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("ble.un.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("blt.un.s", OperandType::ShortBranchTarget, FlowType::ConditionalBranch),
    op("br", OperandType::BranchTarget, FlowType::UnconditionalBranch),
    op("brfalse", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("brtrue", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("beq", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("bge", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("bgt", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("ble", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("blt", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("bne.un", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("bge.un", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("bgt.un", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("ble.un", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("blt.un", OperandType::BranchTarget, FlowType::ConditionalBranch),
    op("switch", OperandType::Switch, FlowType::Switch),
    op("ldind.i1", OperandType::None, FlowType::Sequential),
    op("ldind.u1", OperandType::None, FlowType::Sequential),
    op("ldind.i2", OperandType::None, FlowType::Sequential),
    op("ldind.u2", OperandType::None, FlowType::Sequential),
    op("ldind.i4", OperandType::None, FlowType::Sequential),
    op("ldind.u4", OperandType::None, FlowType::Sequential),
    op("ldind.i8", OperandType::None, FlowType::Sequential),
    op("ldind.i", OperandType::None, FlowType::Sequential),
    op("ldind.r4", OperandType::None, FlowType::Sequential),
    op("ldind.r8", OperandType::None, FlowType::Sequential),
    op("ldind.ref", OperandType::None, FlowType::Sequential),
    op("stind.ref", OperandType::None, FlowType::Sequential),
    op("stind.i1", OperandType::None, FlowType::Sequential),
    op("stind.i2", OperandType::None, FlowType::Sequential),
    op("stind.i4", OperandType::None, FlowType::Sequential),
    op("stind.i8", OperandType::None, FlowType::Sequential),
    op("stind.r4", OperandType::None, FlowType::Sequential),
    op("stind.r8", OperandType::None, FlowType::Sequential),
    op("add", OperandType::None, FlowType::Sequential),
    op("sub", OperandType::None, FlowType::Sequential),
    op("mul", OperandType::None, FlowType::Sequential),
    op("div", OperandType::None, FlowType::Sequential),
    op("div.un", OperandType::None, FlowType::Sequential),
    op("rem", OperandType::None, FlowType::Sequential),
    op("rem.un", OperandType::None, FlowType::Sequential),
    op("and", OperandType::None, FlowType::Sequential),
    op("or", OperandType::None, FlowType::Sequential),
    op("xor", OperandType::None, FlowType::Sequential),
    op("shl", OperandType::None, FlowType::Sequential),
    op("shr", OperandType::None, FlowType::Sequential),
    op("shr.un", OperandType::None, FlowType::Sequential),
    op("neg", OperandType::None, FlowType::Sequential),
    op("not", OperandType::None, FlowType::Sequential),
    op("conv.i1", OperandType::None, FlowType::Sequential),
    op("conv.i2", OperandType::None, FlowType::Sequential),
    op("conv.i4", OperandType::None, FlowType::Sequential),
    op("conv.i8", OperandType::None, FlowType::Sequential),
    op("conv.r4", OperandType::None, FlowType::Sequential),
    op("conv.r8", OperandType::None, FlowType::Sequential),
    op("conv.u4", OperandType::None, FlowType::Sequential),
    op("conv.u8", OperandType::None, FlowType::Sequential),
    op("callvirt", OperandType::Token, FlowType::Call),
    op("cpobj", OperandType::Token, FlowType::Sequential),
    op("ldobj", OperandType::Token, FlowType::Sequential),
    op("ldstr", OperandType::Token, FlowType::Sequential),
    op("newobj", OperandType::Token, FlowType::Call),
    op("castclass", OperandType::Token, FlowType::Sequential),
    op("isinst", OperandType::Token, FlowType::Sequential),
    op("conv.r.un", OperandType::None, FlowType::Sequential),
    RESERVED, // 0x77
    RESERVED, // 0x78
    op("unbox", OperandType::Token, FlowType::Sequential),
    op("throw", OperandType::None, FlowType::Throw),
    op("ldfld", OperandType::Token, FlowType::Sequential),
    op("ldflda", OperandType::Token, FlowType::Sequential),
    op("stfld", OperandType::Token, FlowType::Sequential),
    op("ldsfld", OperandType::Token, FlowType::Sequential),
    op("ldsflda", OperandType::Token, FlowType::Sequential),
    op("stsfld", OperandType::Token, FlowType::Sequential),
    op("stobj", OperandType::Token, FlowType::Sequential),
    op("conv.ovf.i1.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i2.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i4.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i8.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u1.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u2.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u4.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u8.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i.un", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u.un", OperandType::None, FlowType::Sequential),
    op("box", OperandType::Token, FlowType::Sequential),
    op("newarr", OperandType::Token, FlowType::Sequential),
    op("ldlen", OperandType::None, FlowType::Sequential),
    op("ldelema", OperandType::Token, FlowType::Sequential),
    op("ldelem.i1", OperandType::None, FlowType::Sequential),
    op("ldelem.u1", OperandType::None, FlowType::Sequential),
    op("ldelem.i2", OperandType::None, FlowType::Sequential),
    op("ldelem.u2", OperandType::None, FlowType::Sequential),
    op("ldelem.i4", OperandType::None, FlowType::Sequential),
    op("ldelem.u4", OperandType::None, FlowType::Sequential),
    op("ldelem.i8", OperandType::None, FlowType::Sequential),
    op("ldelem.i", OperandType::None, FlowType::Sequential),
    op("ldelem.r4", OperandType::None, FlowType::Sequential),
    op("ldelem.r8", OperandType::None, FlowType::Sequential),
    op("ldelem.ref", OperandType::None, FlowType::Sequential),
    op("stelem.i", OperandType::None, FlowType::Sequential),
    op("stelem.i1", OperandType::None, FlowType::Sequential),
    op("stelem.i2", OperandType::None, FlowType::Sequential),
    op("stelem.i4", OperandType::None, FlowType::Sequential),
    op("stelem.i8", OperandType::None, FlowType::Sequential),
    op("stelem.r4", OperandType::None, FlowType::Sequential),
    op("stelem.r8", OperandType::None, FlowType::Sequential),
    op("stelem.ref", OperandType::None, FlowType::Sequential),
    op("ldelem", OperandType::Token, FlowType::Sequential),
    op("stelem", OperandType::Token, FlowType::Sequential),
    op("unbox.any", OperandType::Token, FlowType::Sequential),
    RESERVED, // 0xA6
    RESERVED, // 0xA7
    RESERVED, // 0xA8
    RESERVED, // 0xA9
    RESERVED, // 0xAA
    RESERVED, // 0xAB
    RESERVED, // 0xAC
    RESERVED, // 0xAD
    RESERVED, // 0xAE
    RESERVED, // 0xAF
    RESERVED, // 0xB0
    RESERVED, // 0xB1
    RESERVED, // 0xB2
    op("conv.ovf.i1", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u1", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i2", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u2", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i4", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u4", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i8", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u8", OperandType::None, FlowType::Sequential),
    RESERVED, // 0xBB
    RESERVED, // 0xBC
    RESERVED, // 0xBD
    RESERVED, // 0xBE
    RESERVED, // 0xBF
    RESERVED, // 0xC0
    RESERVED, // 0xC1
    op("refanyval", OperandType::Token, FlowType::Sequential),
    op("ckfinite", OperandType::None, FlowType::Sequential),
    RESERVED, // 0xC4
    RESERVED, // 0xC5
    op("mkrefany", OperandType::Token, FlowType::Sequential),
    RESERVED, // 0xC7
    RESERVED, // 0xC8
    RESERVED, // 0xC9
    RESERVED, // 0xCA
    RESERVED, // 0xCB
    RESERVED, // 0xCC
    RESERVED, // 0xCD
    RESERVED, // 0xCE
    RESERVED, // 0xCF
    op("ldtoken", OperandType::Token, FlowType::Sequential),
    op("conv.u2", OperandType::None, FlowType::Sequential),
    op("conv.u1", OperandType::None, FlowType::Sequential),
    op("conv.i", OperandType::None, FlowType::Sequential),
    op("conv.ovf.i", OperandType::None, FlowType::Sequential),
    op("conv.ovf.u", OperandType::None, FlowType::Sequential),
    op("add.ovf", OperandType::None, FlowType::Sequential),
    op("add.ovf.un", OperandType::None, FlowType::Sequential),
    op("mul.ovf", OperandType::None, FlowType::Sequential),
    op("mul.ovf.un", OperandType::None, FlowType::Sequential),
    op("sub.ovf", OperandType::None, FlowType::Sequential),
    op("sub.ovf.un", OperandType::None, FlowType::Sequential),
    op("endfinally", OperandType::None, FlowType::EndFinally),
    op("leave", OperandType::BranchTarget, FlowType::Leave),
    op("leave.s", OperandType::ShortBranchTarget, FlowType::Leave),
    op("stind.i", OperandType::None, FlowType::Sequential),
    op("conv.u", OperandType::None, FlowType::Sequential),
];

/// Two-byte opcodes, indexed by the byte following [`FE_PREFIX`].
pub static INSTRUCTIONS_FE: [OpcodeInfo; 31] = [
    op("arglist", OperandType::None, FlowType::Sequential),
    op("ceq", OperandType::None, FlowType::Sequential),
    op("cgt", OperandType::None, FlowType::Sequential),
    op("cgt.un", OperandType::None, FlowType::Sequential),
    op("clt", OperandType::None, FlowType::Sequential),
    op("clt.un", OperandType::None, FlowType::Sequential),
    op("ldftn", OperandType::Token, FlowType::Sequential),
    op("ldvirtftn", OperandType::Token, FlowType::Sequential),
    RESERVED, // 0xFE 0x08
    op("ldarg", OperandType::UInt16, FlowType::Sequential),
    op("ldarga", OperandType::UInt16, FlowType::Sequential),
    op("starg", OperandType::UInt16, FlowType::Sequential),
    op("ldloc", OperandType::UInt16, FlowType::Sequential),
    op("ldloca", OperandType::UInt16, FlowType::Sequential),
    op("stloc", OperandType::UInt16, FlowType::Sequential),
    op("localloc", OperandType::None, FlowType::Sequential),
    RESERVED, // 0xFE 0x10
    op("endfilter", OperandType::None, FlowType::EndFinally),
    op("unaligned.", OperandType::UInt8, FlowType::Sequential),
    op("volatile.", OperandType::None, FlowType::Sequential),
    op("tail.", OperandType::None, FlowType::Sequential),
    op("initobj", OperandType::Token, FlowType::Sequential),
    op("constrained.", OperandType::Token, FlowType::Sequential),
    op("cpblk", OperandType::None, FlowType::Sequential),
    op("initblk", OperandType::None, FlowType::Sequential),
    op("no.", OperandType::UInt8, FlowType::Sequential),
    op("rethrow", OperandType::None, FlowType::Throw),
    RESERVED, // 0xFE 0x1B
    op("sizeof", OperandType::Token, FlowType::Sequential),
    op("refanytype", OperandType::None, FlowType::Sequential),
    op("readonly.", OperandType::None, FlowType::Sequential),
];

/// Look up an opcode, `prefix` being `0` or [`FE_PREFIX`].
///
/// Returns `None` for unknown and reserved encodings.
#[must_use]
pub fn lookup(prefix: u8, opcode: u8) -> Option<&'static OpcodeInfo> {
    let info = match prefix {
        0 => INSTRUCTIONS.get(opcode as usize)?,
        FE_PREFIX => INSTRUCTIONS_FE.get(opcode as usize)?,
        _ => return None,
    };

    if info.mnemonic.is_empty() {
        None
    } else {
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_positions() {
        assert_eq!(INSTRUCTIONS[CALL as usize].mnemonic, "call");
        assert_eq!(INSTRUCTIONS[CALLVIRT as usize].mnemonic, "callvirt");
        assert_eq!(INSTRUCTIONS[LDFLD as usize].mnemonic, "ldfld");
        assert_eq!(INSTRUCTIONS[STSFLD as usize].mnemonic, "stsfld");
        assert_eq!(INSTRUCTIONS[CONV_U as usize].mnemonic, "conv.u");
        assert_eq!(INSTRUCTIONS_FE[FE_CEQ as usize].mnemonic, "ceq");
        assert_eq!(INSTRUCTIONS_FE[FE_READONLY as usize].mnemonic, "readonly.");
    }

    #[test]
    fn reserved_encodings() {
        assert!(lookup(0, 0x24).is_none());
        assert!(lookup(0, 0xA6).is_none());
        assert!(lookup(0, 0xE1).is_none());
        assert!(lookup(FE_PREFIX, 0x08).is_none());
        assert!(lookup(0x01, NOP).is_none());
        assert!(lookup(FE_PREFIX, FE_LDARG).is_some());
    }

    #[test]
    fn operand_types() {
        assert_eq!(lookup(0, BR_S).unwrap().operand_type, OperandType::ShortBranchTarget);
        assert_eq!(lookup(0, SWITCH).unwrap().flow_type, FlowType::Switch);
        assert_eq!(lookup(0, NEWOBJ).unwrap().operand_type, OperandType::Token);
        assert_eq!(lookup(FE_PREFIX, FE_LDLOC).unwrap().operand_type, OperandType::UInt16);
    }
}
