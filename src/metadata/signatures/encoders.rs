//! Signature encoders, the inverse of [`crate::metadata::signatures::SignatureParser`].
//!
//! Every encoder appends to a caller supplied buffer, so the module writer can stream
//! signatures straight into the output image. Named types are written as
//! `TypeDefOrRefOrSpec` coded indices (ECMA-335 II.23.2.8).

use crate::{
    file::io::write_compressed_uint,
    metadata::{
        signatures::{
            MemberSignature, SignatureMethod, TypeSignature, CALLING_CONVENTION, ELEMENT_TYPE,
            FIELD_SIGNATURE,
        },
        token::Token,
    },
    Error, Result,
};

/// Encodes a token as a `TypeDefOrRef` coded index.
///
/// - TypeDef: `(rid << 2) | 0`
/// - TypeRef: `(rid << 2) | 1`
/// - TypeSpec: `(rid << 2) | 2`
///
/// # Errors
/// Returns [`crate::Error::InvalidToken`] if the token does not point into one of the three
/// type tables.
pub fn encode_type_def_or_ref_coded_index(token: Token) -> Result<u32> {
    let rid = token.row();

    match token.table() {
        0x02 => Ok(rid << 2),
        0x01 => Ok((rid << 2) | 1),
        0x1B => Ok((rid << 2) | 2),
        _ => Err(Error::InvalidToken(token)),
    }
}

/// Encodes a type signature.
///
/// # Errors
/// Returns [`crate::Error::NotSupported`] for [`TypeSignature::Unknown`] and
/// [`crate::Error::InvalidToken`] for a named type whose token is not a type token.
pub fn encode_type(signature: &TypeSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        TypeSignature::Unknown => return Err(Error::NotSupported),
        TypeSignature::Void => buffer.push(ELEMENT_TYPE::VOID),
        TypeSignature::Boolean => buffer.push(ELEMENT_TYPE::BOOLEAN),
        TypeSignature::Char => buffer.push(ELEMENT_TYPE::CHAR),
        TypeSignature::I1 => buffer.push(ELEMENT_TYPE::I1),
        TypeSignature::U1 => buffer.push(ELEMENT_TYPE::U1),
        TypeSignature::I2 => buffer.push(ELEMENT_TYPE::I2),
        TypeSignature::U2 => buffer.push(ELEMENT_TYPE::U2),
        TypeSignature::I4 => buffer.push(ELEMENT_TYPE::I4),
        TypeSignature::U4 => buffer.push(ELEMENT_TYPE::U4),
        TypeSignature::I8 => buffer.push(ELEMENT_TYPE::I8),
        TypeSignature::U8 => buffer.push(ELEMENT_TYPE::U8),
        TypeSignature::R4 => buffer.push(ELEMENT_TYPE::R4),
        TypeSignature::R8 => buffer.push(ELEMENT_TYPE::R8),
        TypeSignature::String => buffer.push(ELEMENT_TYPE::STRING),
        TypeSignature::Ptr(base) => {
            buffer.push(ELEMENT_TYPE::PTR);
            encode_type(base, buffer)?;
        }
        TypeSignature::ByRef(base) => {
            buffer.push(ELEMENT_TYPE::BYREF);
            encode_type(base, buffer)?;
        }
        TypeSignature::ValueType(token) => {
            buffer.push(ELEMENT_TYPE::VALUETYPE);
            write_compressed_uint(encode_type_def_or_ref_coded_index(*token)?, buffer);
        }
        TypeSignature::Class(token) => {
            buffer.push(ELEMENT_TYPE::CLASS);
            write_compressed_uint(encode_type_def_or_ref_coded_index(*token)?, buffer);
        }
        TypeSignature::GenericParamType(index) => {
            buffer.push(ELEMENT_TYPE::VAR);
            write_compressed_uint(*index, buffer);
        }
        TypeSignature::GenericParamMethod(index) => {
            buffer.push(ELEMENT_TYPE::MVAR);
            write_compressed_uint(*index, buffer);
        }
        TypeSignature::Array(array) => {
            buffer.push(ELEMENT_TYPE::ARRAY);
            encode_type(&array.base, buffer)?;
            write_compressed_uint(array.rank, buffer);
            write_compressed_uint(array.sizes.len() as u32, buffer);
            for size in &array.sizes {
                write_compressed_uint(*size, buffer);
            }
            write_compressed_uint(array.lower_bounds.len() as u32, buffer);
            for bound in &array.lower_bounds {
                write_compressed_uint(*bound, buffer);
            }
        }
        TypeSignature::GenericInst(base, args) => {
            buffer.push(ELEMENT_TYPE::GENERICINST);
            encode_type(base, buffer)?;
            write_compressed_uint(args.len() as u32, buffer);
            for arg in args {
                encode_type(arg, buffer)?;
            }
        }
        TypeSignature::TypedByRef => buffer.push(ELEMENT_TYPE::TYPEDBYREF),
        TypeSignature::I => buffer.push(ELEMENT_TYPE::I),
        TypeSignature::U => buffer.push(ELEMENT_TYPE::U),
        TypeSignature::FnPtr(method) => {
            buffer.push(ELEMENT_TYPE::FNPTR);
            encode_method_signature(method, buffer)?;
        }
        TypeSignature::Object => buffer.push(ELEMENT_TYPE::OBJECT),
        TypeSignature::SzArray(base) => {
            buffer.push(ELEMENT_TYPE::SZARRAY);
            encode_type(base, buffer)?;
        }
        TypeSignature::Modified(modifier) => {
            buffer.push(if modifier.required {
                ELEMENT_TYPE::CMOD_REQD
            } else {
                ELEMENT_TYPE::CMOD_OPT
            });
            write_compressed_uint(
                encode_type_def_or_ref_coded_index(modifier.modifier)?,
                buffer,
            );
            encode_type(&modifier.base, buffer)?;
        }
        TypeSignature::Pinned(base) => {
            buffer.push(ELEMENT_TYPE::PINNED);
            encode_type(base, buffer)?;
        }
    }

    Ok(())
}

/// Encodes a method signature: calling convention, optional generic count, parameter
/// count, return type and parameter types.
///
/// # Errors
/// Propagates failures from [`encode_type`].
pub fn encode_method_signature(signature: &SignatureMethod, buffer: &mut Vec<u8>) -> Result<()> {
    let mut calling_convention = if signature.vararg {
        CALLING_CONVENTION::VARARG
    } else {
        CALLING_CONVENTION::DEFAULT
    };

    if signature.has_this {
        calling_convention |= CALLING_CONVENTION::HASTHIS;
    }
    if signature.explicit_this {
        calling_convention |= CALLING_CONVENTION::EXPLICITTHIS;
    }
    if signature.generic_param_count > 0 {
        calling_convention |= CALLING_CONVENTION::GENERIC;
    }

    buffer.push(calling_convention);
    if signature.generic_param_count > 0 {
        write_compressed_uint(signature.generic_param_count, buffer);
    }

    write_compressed_uint(signature.params.len() as u32, buffer);
    encode_type(&signature.return_type, buffer)?;
    for param in &signature.params {
        encode_type(param, buffer)?;
    }

    Ok(())
}

/// Encodes the signature of a member reference; fields get the `0x06` header.
///
/// # Errors
/// Propagates failures from [`encode_type`].
pub fn encode_member_signature(signature: &MemberSignature, buffer: &mut Vec<u8>) -> Result<()> {
    match signature {
        MemberSignature::Field(field) => {
            buffer.push(FIELD_SIGNATURE);
            encode_type(field, buffer)
        }
        MemberSignature::Method(method) => encode_method_signature(method, buffer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::parser::Parser, metadata::signatures::SignatureParser};

    #[test]
    fn test_encode_type_def_or_ref_coded_index() {
        assert_eq!(
            encode_type_def_or_ref_coded_index(Token::new(0x0200_0003)).unwrap(),
            12
        );
        assert_eq!(
            encode_type_def_or_ref_coded_index(Token::new(0x0100_0003)).unwrap(),
            13
        );
        assert_eq!(
            encode_type_def_or_ref_coded_index(Token::new(0x1B00_0003)).unwrap(),
            14
        );
        assert!(matches!(
            encode_type_def_or_ref_coded_index(Token::new(0x0600_0001)),
            Err(Error::InvalidToken(_))
        ));
    }

    #[test]
    fn test_encode_generic_instance() {
        let sig = TypeSignature::GenericInst(
            Box::new(TypeSignature::Class(Token::new(0x0100_0001))),
            vec![TypeSignature::String],
        );
        let mut buffer = Vec::new();
        encode_type(&sig, &mut buffer).unwrap();
        assert_eq!(buffer, vec![0x15, 0x12, 0x05, 0x01, 0x0e]);
    }

    #[test]
    fn test_encode_unknown_fails() {
        let mut buffer = Vec::new();
        assert!(encode_type(&TypeSignature::Unknown, &mut buffer).is_err());
    }

    #[test]
    fn test_encode_method_signature() {
        let sig = SignatureMethod::new_instance(
            TypeSignature::Void,
            vec![TypeSignature::I4, TypeSignature::SzArray(Box::new(TypeSignature::U1))],
        )
        .with_generic_params(2);
        let mut buffer = Vec::new();
        encode_method_signature(&sig, &mut buffer).unwrap();
        assert_eq!(buffer, vec![0x30, 0x02, 0x02, 0x01, 0x08, 0x1d, 0x05]);

        let mut parser = Parser::new(&buffer);
        let parsed = SignatureParser::new(&mut parser)
            .parse_method_signature()
            .unwrap();
        assert_eq!(parsed, sig);
        assert!(!parser.has_more_data());
    }

    #[test]
    fn test_encode_field_signature() {
        let mut buffer = Vec::new();
        encode_member_signature(&MemberSignature::Field(TypeSignature::Boolean), &mut buffer)
            .unwrap();
        assert_eq!(buffer, vec![0x06, 0x02]);
    }
}
