//! Host assemblies and mod modules shared by the integration tests.
//!
//! The host is a game assembly `Host` 2.0.0.0, the graphics framework as MonoGame ships
//! it on Linux, and the corlib types mods use. Mods are described with [`SampleMod`] and
//! go through serialisation before they are scanned, like mods read from disk.

#![allow(dead_code)]

use std::sync::Arc;

use modcompat::prelude::*;
use modcompat::metadata::module::{split_name, Constant, FieldAttributes, MethodAttributes};

pub fn host_version() -> AssemblyVersion {
    AssemblyVersion::new(2, 0, 0, 0)
}

fn corlib() -> AssemblyIdentity {
    AssemblyIdentity::new("mscorlib", AssemblyVersion::new(4, 0, 0, 0))
}

pub fn host_identity() -> AssemblyIdentity {
    AssemblyIdentity::new("Host", host_version())
}

fn corlib_module() -> Result<Module> {
    let mut builder = ModuleBuilder::new(corlib());
    builder.add_type(TypeBuilder::new("System", "Object"))?;
    builder.add_type(TypeBuilder::new("System", "String"))?;

    let mut console = TypeBuilder::new("System", "Console");
    console.method(MethodBuilder::new(
        "WriteLine",
        SignatureMethod::new_static(TypeSignature::Void, vec![TypeSignature::String]),
    ));
    builder.add_type(console)?;
    Ok(builder.build())
}

fn monogame_module() -> Result<Module> {
    let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
        "MonoGame.Framework",
        AssemblyVersion::new(3, 8, 0, 0),
    ));
    let mut vector = TypeBuilder::new("Microsoft.Xna.Framework", "Vector2");
    vector
        .field("X", FieldAttributes::PUBLIC, TypeSignature::R4)
        .field("Y", FieldAttributes::PUBLIC, TypeSignature::R4)
        .method(MethodBuilder::new(
            "Length",
            SignatureMethod::new_instance(TypeSignature::R4, vec![]),
        ));
    builder.add_type(vector)?;
    Ok(builder.build())
}

fn host_module() -> Result<Module> {
    let mut builder = ModuleBuilder::new(host_identity());

    let widget = TypeSignature::Class(builder.next_type_token());
    let mut widget_type = TypeBuilder::new("Host", "Widget");
    widget_type
        .field("Name", FieldAttributes::PUBLIC, TypeSignature::I4)
        .field("Id", FieldAttributes::PUBLIC, TypeSignature::I4)
        .method(MethodBuilder::new(
            ".ctor",
            SignatureMethod::new_instance(TypeSignature::Void, vec![]),
        ))
        .method(MethodBuilder::new(
            "get_Label",
            SignatureMethod::new_instance(TypeSignature::String, vec![]),
        ))
        .method(MethodBuilder::new(
            "set_Label",
            SignatureMethod::new_instance(TypeSignature::Void, vec![TypeSignature::String]),
        ))
        .property("Label", TypeSignature::String, Some("get_Label"), Some("set_Label"));
    builder.add_type(widget_type)?;

    let mut helper = TypeBuilder::new("Modern", "Helper");
    helper.method(MethodBuilder::new(
        "DoThing",
        SignatureMethod::new_static(TypeSignature::Void, vec![]),
    ));
    builder.add_type(helper)?;

    let mut renderer = TypeBuilder::new("Host", "Renderer");
    renderer.method(
        MethodBuilder::new(
            "Draw",
            SignatureMethod::new_instance(TypeSignature::Void, vec![
                widget,
                TypeSignature::R4,
                TypeSignature::I4,
            ]),
        )
        .flags(
            MethodAttributes::PUBLIC | MethodAttributes::HIDE_BY_SIG | MethodAttributes::VIRTUAL,
        )
        .param_name(2, "layer")
        .optional(2, Constant::Int(0)),
    );
    builder.add_type(renderer)?;

    Ok(builder.build())
}

/// The installed host modules: `Host`, MonoGame and corlib.
pub fn host_modules() -> Result<Vec<Module>> {
    Ok(vec![host_module()?, monogame_module()?, corlib_module()?])
}

/// The installed host modules; `Host` and MonoGame are validated.
pub fn hosts() -> Result<HostAssemblies> {
    Ok(HostAssemblies::new(host_modules()?).with_validated(["Host", "MonoGame.Framework"]))
}

/// A scanner for a Linux host running `handlers`.
pub fn scanner(
    hosts: HostAssemblies,
    handlers: Vec<Box<dyn InstructionHandler>>,
) -> ModuleScanner {
    ModuleScanner::new(
        Arc::new(hosts),
        Arc::new(PlatformAssemblyMap::builtin(Platform::Linux)),
        handlers,
        ScannerConfig::default(),
    )
}

/// A mod compiled against `Host`, XNA and corlib.
pub struct SampleMod {
    pub builder: ModuleBuilder,
    host: Token,
    xna: Token,
    corlib: Token,
    methods: Vec<MethodBuilder>,
}

impl SampleMod {
    pub fn new() -> Self {
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "SampleMod",
            AssemblyVersion::new(1, 0, 0, 0),
        ));
        let host = builder.assembly_ref(host_identity());
        let xna = builder.assembly_ref(AssemblyIdentity::new(
            "Microsoft.Xna.Framework",
            AssemblyVersion::new(4, 0, 0, 0),
        ));
        let corlib = builder.assembly_ref(corlib());
        SampleMod {
            builder,
            host,
            xna,
            corlib,
            methods: Vec::new(),
        }
    }

    pub fn type_ref(&mut self, full_name: &str) -> Token {
        let scope = if full_name.starts_with("System.") {
            self.corlib
        } else if full_name.starts_with("Microsoft.Xna.") {
            self.xna
        } else {
            self.host
        };
        let (namespace, name) = split_name(full_name);
        self.builder.type_ref(scope, namespace, name)
    }

    pub fn field(&mut self, type_name: &str, name: &str, signature: TypeSignature) -> Token {
        let parent = TypeSignature::Class(self.type_ref(type_name));
        self.builder
            .member_ref(parent, name, MemberSignature::Field(signature))
    }

    pub fn method_ref(&mut self, type_name: &str, name: &str, signature: SignatureMethod) -> Token {
        let parent = TypeSignature::Class(self.type_ref(type_name));
        self.builder
            .member_ref(parent, name, MemberSignature::Method(signature))
    }

    /// Add a static method `SampleMod.Entry.<name>` to the mod.
    pub fn with_method<F>(&mut self, name: &str, body: F) -> &mut Self
    where
        F: FnOnce(&mut InstructionEncoder) -> Result<()>,
    {
        self.methods.push(
            MethodBuilder::new(name, SignatureMethod::new_static(TypeSignature::Void, vec![]))
                .body(body),
        );
        self
    }

    /// The module, or an empty one if no method was added.
    pub fn build(mut self) -> Result<Module> {
        if !self.methods.is_empty() {
            let mut entry = TypeBuilder::new("SampleMod", "Entry");
            for method in self.methods {
                entry.method(method);
            }
            self.builder.add_type(entry)?;
        }
        Ok(self.builder.build())
    }

    /// The serialised module.
    pub fn bytes(self) -> Result<Vec<u8>> {
        self.build()?.to_bytes()
    }
}
