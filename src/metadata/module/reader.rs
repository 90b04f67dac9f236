//! Module image parsing.

use uguid::Guid;
use widestring::U16Str;

use crate::{
    assembly::decode_body,
    file::parser::Parser,
    metadata::{
        identity::AssemblyIdentity,
        module::{
            Constant, FieldAttributes, FieldDef, MemberRef, MethodAttributes, MethodDef,
            MethodSpec, Module, ParamDef, PropertyDef, ResolutionScope, TypeAttributes, TypeDef,
            TypeRef, MODULE_MAGIC, MODULE_VERSION,
        },
        signatures::SignatureParser,
        token::{TableId, Token},
    },
    Error, Result,
};

/// Tags of [`Constant`] values in parameter tables.
#[allow(non_snake_case)]
pub(crate) mod CONSTANT_TAG {
    pub const NONE: u8 = 0;
    pub const BOOL: u8 = 1;
    pub const INT: u8 = 2;
    pub const FLOAT: u8 = 3;
    pub const STRING: u8 = 4;
    pub const NULL: u8 = 5;
}

/// Upper bound for pre-allocation from untrusted counts.
const MAX_PREALLOC: usize = 1024;

pub(crate) fn read_module(data: &[u8]) -> Result<Module> {
    let mut parser = Parser::new(data);

    if parser.remaining() < 6 || parser.read_le::<u32>()? != MODULE_MAGIC {
        return Err(Error::NotSupported);
    }
    let version = parser.read_le::<u16>()?;
    if version != MODULE_VERSION {
        return Err(malformed_error!("Unsupported module format version {}", version));
    }

    let mut mvid = [0u8; 16];
    mvid.copy_from_slice(parser.read_bytes(16)?);

    let name = parser.read_prefixed_string_utf8()?;
    let identity = AssemblyIdentity::parse(&parser.read_prefixed_string_utf8()?)?;

    let assembly_refs = read_table(&mut parser, |parser| {
        AssemblyIdentity::parse(&parser.read_prefixed_string_utf8()?)
    })?;

    let type_refs = read_table(&mut parser, |parser| {
        let scope = match parser.read_compressed_uint()? {
            0 => ResolutionScope::CurrentModule,
            row => {
                if row as usize > assembly_refs.len() {
                    return Err(malformed_error!("TypeRef scope {} out of range", row));
                }
                ResolutionScope::AssemblyRef(Token::from_parts(TableId::AssemblyRef, row))
            }
        };

        Ok(TypeRef {
            scope,
            namespace: parser.read_prefixed_string_utf8()?,
            name: parser.read_prefixed_string_utf8()?,
        })
    })?;

    let type_specs = read_table(&mut parser, |parser| {
        SignatureParser::new(parser).parse_type()
    })?;

    let member_refs = read_table(&mut parser, |parser| {
        let parent = SignatureParser::new(parser).parse_type()?;
        let name = parser.read_prefixed_string_utf8()?;
        let signature = SignatureParser::new(parser).parse_member_signature()?;
        Ok(MemberRef {
            parent,
            name,
            signature,
        })
    })?;

    let method_specs = read_table(&mut parser, |parser| {
        let method = Token::new(parser.read_le::<u32>()?);
        if !method.is_table(TableId::MemberRef) && !method.is_table(TableId::MethodDef) {
            return Err(malformed_error!("MethodSpec parent {} is not a method", method));
        }

        let instantiation = read_table(parser, |parser| SignatureParser::new(parser).parse_type())?;
        Ok(MethodSpec {
            method,
            instantiation,
        })
    })?;

    let standalone_sigs = read_table(&mut parser, |parser| {
        SignatureParser::new(parser).parse_method_signature()
    })?;

    let user_strings = read_table(&mut parser, |parser| {
        let length = parser.read_le::<u16>()? as usize;
        let mut units = Vec::with_capacity(length);
        for _ in 0..length {
            units.push(parser.read_le::<u16>()?);
        }

        U16Str::from_slice(&units)
            .to_string()
            .map_err(|e| malformed_error!("Invalid UTF-16 user string: {}", e))
    })?;

    let types = read_table(&mut parser, read_type_def)?;

    if parser.has_more_data() {
        return Err(malformed_error!(
            "{} trailing bytes after module tables",
            parser.remaining()
        ));
    }

    let mut module = Module {
        mvid: Guid::from_bytes(mvid),
        name,
        identity,
        assembly_refs,
        type_refs,
        type_specs,
        member_refs,
        method_specs,
        standalone_sigs,
        user_strings,
        types,
        method_rows: Vec::new(),
        field_rows: Vec::new(),
    };
    module.reindex();
    Ok(module)
}

fn read_table<'a, T>(
    parser: &mut Parser<'a>,
    mut read_row: impl FnMut(&mut Parser<'a>) -> Result<T>,
) -> Result<Vec<T>> {
    let count = parser.read_compressed_uint()? as usize;
    let mut rows = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        rows.push(read_row(parser)?);
    }
    Ok(rows)
}

fn read_type_def(parser: &mut Parser) -> Result<TypeDef> {
    let namespace = parser.read_prefixed_string_utf8()?;
    let name = parser.read_prefixed_string_utf8()?;
    let flags = TypeAttributes::from_bits_retain(parser.read_le::<u32>()?);
    let base = match parser.read_le::<u8>()? {
        0 => None,
        _ => Some(SignatureParser::new(parser).parse_type()?),
    };
    let generic_params = parser.read_compressed_uint()?;

    let fields = read_table(parser, |parser| {
        Ok(FieldDef {
            name: parser.read_prefixed_string_utf8()?,
            flags: FieldAttributes::from_bits_retain(parser.read_le::<u16>()?),
            signature: SignatureParser::new(parser).parse_type()?,
        })
    })?;

    let methods = read_table(parser, read_method_def)?;

    let properties = read_table(parser, |parser| {
        let name = parser.read_prefixed_string_utf8()?;
        let signature = SignatureParser::new(parser).parse_type()?;
        let mut accessor = || -> Result<Option<usize>> {
            match parser.read_compressed_uint()? as usize {
                0 => Ok(None),
                row if row <= methods.len() => Ok(Some(row - 1)),
                row => Err(malformed_error!(
                    "Accessor row {} of property '{}' out of range",
                    row,
                    name
                )),
            }
        };
        let getter = accessor()?;
        let setter = accessor()?;

        Ok(PropertyDef {
            name,
            signature,
            getter,
            setter,
        })
    })?;

    Ok(TypeDef {
        namespace,
        name,
        flags,
        base,
        generic_params,
        fields,
        methods,
        properties,
    })
}

fn read_method_def(parser: &mut Parser) -> Result<MethodDef> {
    let name = parser.read_prefixed_string_utf8()?;
    let flags = MethodAttributes::from_bits_retain(parser.read_le::<u16>()?);
    let signature = SignatureParser::new(parser).parse_method_signature()?;

    let params = read_table(parser, |parser| {
        Ok(ParamDef {
            name: parser.read_prefixed_string_utf8()?,
            default: read_constant(parser)?,
        })
    })?;
    if params.len() != signature.params.len() {
        return Err(malformed_error!(
            "Method '{}' declares {} parameters but its signature has {}",
            name,
            params.len(),
            signature.params.len()
        ));
    }

    let locals = read_table(parser, |parser| SignatureParser::new(parser).parse_type())?;

    let code_length = parser.read_compressed_uint()? as usize;
    let body = decode_body(parser.read_bytes(code_length)?)?;

    Ok(MethodDef {
        name,
        flags,
        signature,
        params,
        locals,
        body,
    })
}

fn read_constant(parser: &mut Parser) -> Result<Option<Constant>> {
    let constant = match parser.read_le::<u8>()? {
        CONSTANT_TAG::NONE => return Ok(None),
        CONSTANT_TAG::BOOL => Constant::Bool(parser.read_le::<u8>()? != 0),
        CONSTANT_TAG::INT => Constant::Int(parser.read_le::<i64>()?),
        CONSTANT_TAG::FLOAT => Constant::Float(parser.read_le::<f64>()?),
        CONSTANT_TAG::STRING => Constant::String(parser.read_prefixed_string_utf8()?),
        CONSTANT_TAG::NULL => Constant::Null,
        tag => return Err(malformed_error!("Invalid constant tag {}", tag)),
    };
    Ok(Some(constant))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"MODL");
        data.extend_from_slice(&[0x01, 0x00]);
        data.extend_from_slice(&[0u8; 16]);
        data.push(8);
        data.extend_from_slice(b"Tiny.dll");
        data
    }

    #[test]
    fn wrong_magic() {
        assert!(matches!(
            read_module(b"MZ\x90\x00\x03\x00\x00\x00"),
            Err(Error::NotSupported)
        ));
        assert!(matches!(read_module(b"MOD"), Err(Error::NotSupported)));
    }

    #[test]
    fn wrong_version() {
        let mut data = header();
        data[4] = 2;
        assert!(matches!(read_module(&data), Err(Error::Malformed { .. })));
    }

    #[test]
    fn truncated() {
        let data = header();
        assert!(read_module(&data[..data.len() - 3]).is_err());
    }

    #[test]
    fn minimal() {
        let mut data = Vec::new();
        data.extend_from_slice(b"MODL");
        data.extend_from_slice(&[0x01, 0x00]);
        data.extend_from_slice(&[0u8; 16]);
        data.push(8);
        data.extend_from_slice(b"Tiny.dll");
        data.push(4);
        data.extend_from_slice(b"Tiny");
        // eight empty tables
        data.extend_from_slice(&[0u8; 8]);

        let module = read_module(&data).unwrap();
        assert_eq!(module.name(), "Tiny.dll");
        assert_eq!(module.identity().name, "Tiny");
        assert!(module.types().is_empty());

        data.push(0);
        assert!(read_module(&data).is_err());
    }
}
