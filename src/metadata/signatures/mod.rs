//! Type, method and member signatures.
//!
//! Signatures describe the shape of fields, methods and type specifications using the
//! ECMA-335 element type encoding. [`SignatureParser`] decodes them from a module image,
//! the functions in [`encoders`] write them back.
//!
//! # Examples
//!
//! ```rust
//! use modcompat::metadata::signatures::{SignatureParser, TypeSignature};
//! use modcompat::Parser;
//!
//! // SZARRAY STRING
//! let data = [0x1d, 0x0e];
//! let mut parser = Parser::new(&data);
//! let sig = SignatureParser::new(&mut parser).parse_type()?;
//! assert_eq!(sig, TypeSignature::SzArray(Box::new(TypeSignature::String)));
//! # Ok::<(), modcompat::Error>(())
//! ```

pub mod encoders;
mod parser;
mod types;

pub use encoders::{
    encode_member_signature, encode_method_signature, encode_type,
    encode_type_def_or_ref_coded_index,
};
pub use parser::SignatureParser;
pub use types::*;
