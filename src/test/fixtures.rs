//! Host assemblies and mod modules for unit tests.
//!
//! The host is a small game assembly `Host` 1.6.0.0 plus the corlib types mods commonly
//! use. `Host.Widget` has the instance properties `Label` and `Count` and the static
//! property `Theme`. Mods are assembled with [`ModFixture`]: references are added first, then
//! [`ModFixture::finish`] emits the single method `SampleMod.Entry.Run` whose body uses
//! them.

use std::sync::Arc;

use crate::{
    assembly::InstructionEncoder,
    compat::{
        config::ScannerConfig,
        handler::InstructionHandler,
        platform::{Platform, PlatformAssemblyMap},
        scanner::{ModuleScanner, ScanReport},
    },
    host::HostAssemblies,
    metadata::{
        identity::{AssemblyIdentity, AssemblyVersion},
        module::{
            split_name, Constant, FieldAttributes, MethodAttributes, MethodBuilder, Module,
            ModuleBuilder, TypeAttributes, TypeBuilder,
        },
        signatures::{MemberSignature, SignatureMethod, TypeSignature},
        token::{TableId, Token},
    },
    Result,
};

pub fn host_version() -> AssemblyVersion {
    AssemblyVersion::new(1, 6, 0, 0)
}

pub fn corlib_version() -> AssemblyVersion {
    AssemblyVersion::new(4, 0, 0, 0)
}

fn instance_sig(ret: TypeSignature, params: Vec<TypeSignature>) -> SignatureMethod {
    SignatureMethod::new_instance(ret, params)
}

fn static_sig(ret: TypeSignature, params: Vec<TypeSignature>) -> SignatureMethod {
    SignatureMethod::new_static(ret, params)
}

fn corlib_module() -> Module {
    let mut builder = ModuleBuilder::new(AssemblyIdentity::new("mscorlib", corlib_version()));
    builder.add_type(TypeBuilder::new("System", "Object")).unwrap();
    builder.add_type(TypeBuilder::new("System", "String")).unwrap();

    let mut console = TypeBuilder::new("System", "Console");
    console
        .method(MethodBuilder::new(
            "WriteLine",
            static_sig(TypeSignature::Void, vec![TypeSignature::String]),
        ))
        .method(MethodBuilder::new("Clear", static_sig(TypeSignature::Void, vec![])))
        .method(MethodBuilder::new("Beep", static_sig(TypeSignature::Void, vec![])));
    builder.add_type(console).unwrap();

    let mut file = TypeBuilder::new("System.IO", "File");
    file.method(MethodBuilder::new(
        "ReadAllText",
        static_sig(TypeSignature::String, vec![TypeSignature::String]),
    ));
    builder.add_type(file).unwrap();

    let mut list = TypeBuilder::new("System.Collections.Generic", "List`1");
    list.generic_params(1).method(MethodBuilder::new(
        "Add",
        instance_sig(TypeSignature::Void, vec![TypeSignature::GenericParamType(0)]),
    ));
    builder.add_type(list).unwrap();

    builder.build()
}

fn host_module() -> Module {
    let mut builder = ModuleBuilder::new(AssemblyIdentity::new("Host", host_version()));
    let corlib = builder.assembly_ref(AssemblyIdentity::new("mscorlib", corlib_version()));
    let list = builder.type_ref(corlib, "System.Collections.Generic", "List`1");

    let widget_token = builder.next_type_token();
    let widget = TypeSignature::Class(widget_token);
    let mut widget_type = TypeBuilder::new("Host", "Widget");
    widget_type
        .field("Name", FieldAttributes::PUBLIC, TypeSignature::I4)
        .field("Id", FieldAttributes::PUBLIC, TypeSignature::I4)
        .field(
            "Instance",
            FieldAttributes::PUBLIC | FieldAttributes::STATIC,
            TypeSignature::I4,
        )
        .method(MethodBuilder::new(".ctor", instance_sig(TypeSignature::Void, vec![])))
        .method(MethodBuilder::new(
            ".ctor",
            instance_sig(TypeSignature::Void, vec![TypeSignature::String]),
        ))
        .method(MethodBuilder::new(
            "Draw",
            instance_sig(TypeSignature::Void, vec![TypeSignature::R4]),
        ))
        .method(MethodBuilder::new(
            "Draw",
            instance_sig(TypeSignature::Void, vec![TypeSignature::String]),
        ))
        .method(MethodBuilder::new("GetSize", instance_sig(TypeSignature::I4, vec![])))
        .method(MethodBuilder::new("get_Label", instance_sig(TypeSignature::String, vec![])))
        .method(MethodBuilder::new(
            "set_Label",
            instance_sig(TypeSignature::Void, vec![TypeSignature::String]),
        ))
        .method(MethodBuilder::new("get_Count", instance_sig(TypeSignature::I4, vec![])))
        .method(MethodBuilder::new("Create", static_sig(TypeSignature::Void, vec![])))
        .method(MethodBuilder::new("get_Theme", static_sig(TypeSignature::String, vec![])))
        .method(MethodBuilder::new(
            "set_Theme",
            static_sig(TypeSignature::Void, vec![TypeSignature::String]),
        ))
        .property("Label", TypeSignature::String, Some("get_Label"), Some("set_Label"))
        .property("Count", TypeSignature::I4, Some("get_Count"), None)
        .property("Theme", TypeSignature::String, Some("get_Theme"), Some("set_Theme"));
    builder.add_type(widget_type).unwrap();

    let mut helper = TypeBuilder::new("Modern", "Helper");
    helper
        .field(
            "Current",
            FieldAttributes::PUBLIC | FieldAttributes::STATIC,
            widget.clone(),
        )
        .method(MethodBuilder::new("DoThing", static_sig(TypeSignature::Void, vec![])))
        .method(MethodBuilder::new(
            "Compute",
            static_sig(TypeSignature::I4, vec![TypeSignature::I4]),
        ))
        .method(MethodBuilder::new(
            "Make",
            static_sig(TypeSignature::GenericParamMethod(0), vec![]).with_generic_params(1),
        ));
    builder.add_type(helper).unwrap();

    let color_token = builder.next_type_token();
    let mut color = TypeBuilder::new("Host", "Color");
    color.flags(TypeAttributes::PUBLIC | TypeAttributes::SEALED);
    builder.add_type(color).unwrap();

    let renderer_token = builder.next_type_token();
    let mut renderer = TypeBuilder::new("Host", "Renderer");
    renderer
        .method(
            MethodBuilder::new(
                "Draw",
                instance_sig(TypeSignature::Void, vec![
                    widget.clone(),
                    TypeSignature::R4,
                    TypeSignature::I4,
                ]),
            )
            .flags(
                MethodAttributes::PUBLIC
                    | MethodAttributes::HIDE_BY_SIG
                    | MethodAttributes::VIRTUAL,
            )
            .param_name(2, "layer")
            .optional(2, Constant::Int(0)),
        )
        .method(
            MethodBuilder::new("Log", static_sig(TypeSignature::Void, vec![TypeSignature::String]))
                .param_name(0, "category")
                .optional(0, Constant::String("renderer".to_string())),
        )
        .method(
            MethodBuilder::new(
                "Tint",
                instance_sig(TypeSignature::Void, vec![TypeSignature::ValueType(color_token)]),
            )
            .optional(0, Constant::Null),
        );
    builder.add_type(renderer).unwrap();

    let list_of = |arg: TypeSignature| {
        TypeSignature::GenericInst(Box::new(TypeSignature::Class(list)), vec![arg])
    };
    let mut adapter = TypeBuilder::new("Host", "RendererAdapter");
    adapter
        .base(TypeSignature::Class(renderer_token))
        .method(MethodBuilder::new(
            "Draw",
            instance_sig(TypeSignature::Void, vec![widget.clone(), TypeSignature::R4]),
        ))
        .method(MethodBuilder::new(
            "Draw",
            instance_sig(TypeSignature::Void, vec![
                widget,
                TypeSignature::R4,
                TypeSignature::I4,
            ]),
        ))
        .method(MethodBuilder::new(
            "Queue",
            instance_sig(TypeSignature::Void, vec![
                list_of(TypeSignature::GenericParamType(0)),
                TypeSignature::GenericParamType(0),
            ]),
        ))
        .method(MethodBuilder::new(
            "Queue",
            instance_sig(TypeSignature::Void, vec![
                list_of(TypeSignature::GenericParamType(0)),
                TypeSignature::String,
            ]),
        ));
    builder.add_type(adapter).unwrap();

    builder.build()
}

/// The host game assembly and corlib; only `Host` is validated.
pub fn host_assemblies() -> HostAssemblies {
    HostAssemblies::new(vec![host_module(), corlib_module()]).with_validated(["Host"])
}

/// A mod module under construction, referencing `Host` and `mscorlib`.
pub struct ModFixture {
    pub builder: ModuleBuilder,
    host: Token,
    corlib: Token,
}

impl ModFixture {
    pub fn new() -> Self {
        ModFixture::with_versions(host_version(), corlib_version())
    }

    /// A mod compiled against the given `Host` and `mscorlib` versions.
    pub fn with_versions(host: AssemblyVersion, corlib: AssemblyVersion) -> Self {
        let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
            "SampleMod",
            AssemblyVersion::new(1, 0, 0, 0),
        ));
        let host = builder.assembly_ref(AssemblyIdentity::new("Host", host));
        let corlib = builder.assembly_ref(AssemblyIdentity::new("mscorlib", corlib));
        ModFixture {
            builder,
            host,
            corlib,
        }
    }

    /// Token of `SampleMod.Entry.Run`.
    pub fn entry_token() -> Token {
        Token::from_parts(TableId::MethodDef, 1)
    }

    /// Reference a type; `System.` types live in `mscorlib`, everything else in `Host`.
    pub fn type_ref(&mut self, full_name: &str) -> Token {
        let scope = if full_name.starts_with("System.") {
            self.corlib
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

    pub fn method(
        &mut self,
        type_name: &str,
        name: &str,
        ret: TypeSignature,
        params: Vec<TypeSignature>,
    ) -> Token {
        let parent = TypeSignature::Class(self.type_ref(type_name));
        self.method_on(parent, name, ret, params)
    }

    pub fn static_method(
        &mut self,
        type_name: &str,
        name: &str,
        ret: TypeSignature,
        params: Vec<TypeSignature>,
    ) -> Token {
        let parent = TypeSignature::Class(self.type_ref(type_name));
        self.builder.member_ref(
            parent,
            name,
            MemberSignature::Method(static_sig(ret, params)),
        )
    }

    /// An instance method reference on an arbitrary parent signature.
    pub fn method_on(
        &mut self,
        parent: TypeSignature,
        name: &str,
        ret: TypeSignature,
        params: Vec<TypeSignature>,
    ) -> Token {
        self.builder
            .member_ref(parent, name, MemberSignature::Method(instance_sig(ret, params)))
    }

    pub fn finish<F>(self, body: F) -> Module
    where
        F: FnOnce(&mut InstructionEncoder) -> Result<()>,
    {
        self.finish_with_locals(Vec::new(), body)
    }

    pub fn finish_with_locals<F>(mut self, locals: Vec<TypeSignature>, body: F) -> Module
    where
        F: FnOnce(&mut InstructionEncoder) -> Result<()>,
    {
        let mut entry = TypeBuilder::new("SampleMod", "Entry");
        entry.method(
            MethodBuilder::new("Run", static_sig(TypeSignature::Void, vec![]))
                .locals(locals)
                .body(body),
        );
        self.builder.add_type(entry).unwrap();
        self.builder.build()
    }
}

/// Scan with the fixture host on Linux, for a mod built on the same platform.
pub fn scan_with(handlers: Vec<Box<dyn InstructionHandler>>, module: &mut Module) -> ScanReport {
    scan_with_platform(
        handlers,
        module,
        &PlatformAssemblyMap::empty(Platform::Linux),
        false,
    )
}

pub fn scan_with_platform(
    handlers: Vec<Box<dyn InstructionHandler>>,
    module: &mut Module,
    platform: &PlatformAssemblyMap,
    platform_changed: bool,
) -> ScanReport {
    let scanner = ModuleScanner::new(
        Arc::new(host_assemblies()),
        Arc::new(platform.clone()),
        handlers,
        ScannerConfig::default(),
    );
    scanner.scan(module, platform_changed).unwrap()
}
