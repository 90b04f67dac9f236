//! CIL instruction decoding and encoding.
//!
//! Method bodies are decoded at load time into `Vec<`[`Instruction`]`>` and written back
//! with [`encode_body`] when a patched module is serialised. The opcode tables in
//! [`opcodes`] are shared by both directions.

mod decoder;
mod encoder;
mod instruction;
pub mod opcodes;

pub use decoder::{decode_body, decode_instruction};
pub use encoder::{encode_body, encode_instruction, InstructionEncoder};
pub use instruction::{FlowType, Immediate, Instruction, Operand, OperandType};
