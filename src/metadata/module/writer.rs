//! Module image serialisation, the inverse of the reader.

use widestring::U16String;

use crate::{
    assembly::encode_body,
    file::io::{write_compressed_uint, write_le, write_prefixed_string_utf8},
    metadata::{
        module::{
            reader::CONSTANT_TAG, Constant, MethodDef, Module, ResolutionScope, TypeDef,
            MODULE_MAGIC, MODULE_VERSION,
        },
        signatures::{encode_member_signature, encode_method_signature, encode_type},
    },
    Result,
};

pub(crate) fn write_module(module: &Module) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(4096);

    write_le(&mut buffer, MODULE_MAGIC);
    write_le(&mut buffer, MODULE_VERSION);
    buffer.extend_from_slice(&module.mvid.to_bytes());
    write_prefixed_string_utf8(&module.name, &mut buffer);
    write_prefixed_string_utf8(&module.identity.display_name(), &mut buffer);

    write_count(module.assembly_refs.len(), &mut buffer)?;
    for identity in &module.assembly_refs {
        write_prefixed_string_utf8(&identity.display_name(), &mut buffer);
    }

    write_count(module.type_refs.len(), &mut buffer)?;
    for type_ref in &module.type_refs {
        let scope = match type_ref.scope {
            ResolutionScope::CurrentModule => 0,
            ResolutionScope::AssemblyRef(token) => token.row(),
        };
        write_compressed_uint(scope, &mut buffer);
        write_prefixed_string_utf8(&type_ref.namespace, &mut buffer);
        write_prefixed_string_utf8(&type_ref.name, &mut buffer);
    }

    write_count(module.type_specs.len(), &mut buffer)?;
    for spec in &module.type_specs {
        encode_type(spec, &mut buffer)?;
    }

    write_count(module.member_refs.len(), &mut buffer)?;
    for member in &module.member_refs {
        encode_type(&member.parent, &mut buffer)?;
        write_prefixed_string_utf8(&member.name, &mut buffer);
        encode_member_signature(&member.signature, &mut buffer)?;
    }

    write_count(module.method_specs.len(), &mut buffer)?;
    for spec in &module.method_specs {
        write_le(&mut buffer, spec.method.value());
        write_count(spec.instantiation.len(), &mut buffer)?;
        for arg in &spec.instantiation {
            encode_type(arg, &mut buffer)?;
        }
    }

    write_count(module.standalone_sigs.len(), &mut buffer)?;
    for signature in &module.standalone_sigs {
        encode_method_signature(signature, &mut buffer)?;
    }

    write_count(module.user_strings.len(), &mut buffer)?;
    for value in &module.user_strings {
        let units = U16String::from_str(value).into_vec();
        let length = u16::try_from(units.len()).map_err(|_| {
            malformed_error!("User string of {} code units is too long", units.len())
        })?;
        write_le(&mut buffer, length);
        for unit in units {
            write_le(&mut buffer, unit);
        }
    }

    write_count(module.types.len(), &mut buffer)?;
    for type_def in &module.types {
        write_type_def(type_def, &mut buffer)?;
    }

    Ok(buffer)
}

fn write_count(count: usize, buffer: &mut Vec<u8>) -> Result<()> {
    // compressed integers hold at most 29 bits
    if count > 0x1FFF_FFFF {
        return Err(malformed_error!("Table with {} rows cannot be encoded", count));
    }
    write_compressed_uint(count as u32, buffer);
    Ok(())
}

fn write_type_def(type_def: &TypeDef, buffer: &mut Vec<u8>) -> Result<()> {
    write_prefixed_string_utf8(&type_def.namespace, buffer);
    write_prefixed_string_utf8(&type_def.name, buffer);
    write_le(buffer, type_def.flags.bits());
    match &type_def.base {
        Some(base) => {
            buffer.push(1);
            encode_type(base, buffer)?;
        }
        None => buffer.push(0),
    }
    write_compressed_uint(type_def.generic_params, buffer);

    write_count(type_def.fields.len(), buffer)?;
    for field in &type_def.fields {
        write_prefixed_string_utf8(&field.name, buffer);
        write_le(buffer, field.flags.bits());
        encode_type(&field.signature, buffer)?;
    }

    write_count(type_def.methods.len(), buffer)?;
    for method in &type_def.methods {
        write_method_def(method, buffer)?;
    }

    write_count(type_def.properties.len(), buffer)?;
    for property in &type_def.properties {
        write_prefixed_string_utf8(&property.name, buffer);
        encode_type(&property.signature, buffer)?;
        write_compressed_uint(property.getter.map_or(0, |index| index as u32 + 1), buffer);
        write_compressed_uint(property.setter.map_or(0, |index| index as u32 + 1), buffer);
    }

    Ok(())
}

fn write_method_def(method: &MethodDef, buffer: &mut Vec<u8>) -> Result<()> {
    write_prefixed_string_utf8(&method.name, buffer);
    write_le(buffer, method.flags.bits());
    encode_method_signature(&method.signature, buffer)?;

    write_count(method.params.len(), buffer)?;
    for param in &method.params {
        write_prefixed_string_utf8(&param.name, buffer);
        match &param.default {
            None => buffer.push(CONSTANT_TAG::NONE),
            Some(Constant::Bool(value)) => {
                buffer.push(CONSTANT_TAG::BOOL);
                buffer.push(u8::from(*value));
            }
            Some(Constant::Int(value)) => {
                buffer.push(CONSTANT_TAG::INT);
                write_le(buffer, *value);
            }
            Some(Constant::Float(value)) => {
                buffer.push(CONSTANT_TAG::FLOAT);
                write_le(buffer, *value);
            }
            Some(Constant::String(value)) => {
                buffer.push(CONSTANT_TAG::STRING);
                write_prefixed_string_utf8(value, buffer);
            }
            Some(Constant::Null) => buffer.push(CONSTANT_TAG::NULL),
        }
    }

    write_count(method.locals.len(), buffer)?;
    for local in &method.locals {
        encode_type(local, buffer)?;
    }

    let code = encode_body(&method.body)?;
    write_count(code.len(), buffer)?;
    buffer.extend_from_slice(&code);

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        assembly::opcodes,
        metadata::{
            identity::{AssemblyIdentity, AssemblyVersion},
            module::{
                Constant, FieldAttributes, MethodBuilder, Module, ModuleBuilder, TypeBuilder,
            },
            signatures::{MemberSignature, SignatureMethod, TypeSignature},
        },
    };

    #[test]
    fn roundtrip_preserves_everything() {
        let mut builder = ModuleBuilder::new(AssemblyIdentity::parse(
            "RoundTrip, Version=2.1.0.0, Culture=neutral, PublicKeyToken=b77a5c561934e089",
        )
        .unwrap())
        .mvid(uguid::guid!("01234567-89ab-cdef-0123-456789abcdef"));
        let host = builder.assembly_ref(AssemblyIdentity::new(
            "Host",
            AssemblyVersion::new(1, 6, 0, 0),
        ));
        let widget = builder.type_ref(host, "Host", "Widget");
        let name = builder.member_ref(
            TypeSignature::Class(widget),
            "Name",
            MemberSignature::Field(TypeSignature::String),
        );
        let greeting = builder.user_string("héllo wörld");

        let mut entry = TypeBuilder::new("RoundTrip", "Entry");
        entry
            .field("count", FieldAttributes::PRIVATE, TypeSignature::I4)
            .method(
                MethodBuilder::new(
                    "Run",
                    SignatureMethod::new_instance(
                        TypeSignature::Void,
                        vec![TypeSignature::Class(widget), TypeSignature::R4],
                    ),
                )
                .optional(1, Constant::Float(0.5))
                .locals(vec![TypeSignature::String])
                .body(|encoder| {
                    encoder.emit_ldarg(1)?;
                    encoder.emit(0, opcodes::LDFLD, crate::assembly::Operand::Token(name))?;
                    encoder.emit(0, opcodes::POP, crate::assembly::Operand::None)?;
                    encoder.emit_ldstr(greeting)?;
                    encoder.emit(0, opcodes::POP, crate::assembly::Operand::None)?;
                    encoder.emit_ret()
                }),
            )
            .method(MethodBuilder::new(
                "get_Count",
                SignatureMethod::new_instance(TypeSignature::I4, vec![]),
            ))
            .property("Count", TypeSignature::I4, Some("get_Count"), None);
        builder.add_type(entry).unwrap();
        let module = builder.build();

        let bytes = module.to_bytes().unwrap();
        let loaded = Module::from_mem(bytes.clone()).unwrap();
        assert_eq!(loaded, module);
        assert_eq!(loaded.to_bytes().unwrap(), bytes);
        assert_eq!(loaded.user_string(greeting), Some("héllo wörld"));
        assert!(loaded.identity().is_strong_named());
    }
}
