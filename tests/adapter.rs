//! Adapter synthesis and calls redirected through it.

mod common;

use common::{host_identity, host_modules, hosts, scanner, SampleMod};
use modcompat::compat::ShimRule;
use modcompat::prelude::*;

/// `Host.Adapters` with `Host.RendererAdapter`, which still offers the two-parameter
/// `Draw` the host replaced with one taking an optional layer.
fn adapter_module(hosts: &HostAssemblies) -> Result<Module> {
    let renderer = hosts
        .resolve_type(&["Host"], "Host.Renderer")
        .expect("renderer in host");

    let mut builder = ModuleBuilder::new(AssemblyIdentity::new(
        "Host.Adapters",
        AssemblyVersion::new(1, 0, 0, 0),
    ));
    let widget = TypeSignature::Class(builder.import_type_named(&host_identity(), "Host.Widget"));
    AdapterBuilder::new("Host", "RendererAdapter", renderer)
        .overload(
            "Draw",
            SignatureMethod::new_instance(TypeSignature::Void, vec![widget, TypeSignature::R4]),
        )
        .build(&mut builder)?;
    Ok(builder.build())
}

fn hosts_with_adapter() -> Result<HostAssemblies> {
    let adapter = adapter_module(&hosts()?)?;
    let mut modules = host_modules()?;
    modules.push(adapter);
    Ok(HostAssemblies::new(modules).with_validated([
        "Host",
        "MonoGame.Framework",
        "Host.Adapters",
    ]))
}

fn two_parameter_draw() -> SampleMod {
    let mut sample = SampleMod::new();
    let widget = TypeSignature::Class(sample.type_ref("Host.Widget"));
    let draw = sample.method_ref(
        "Host.Renderer",
        "Draw",
        SignatureMethod::new_instance(TypeSignature::Void, vec![widget, TypeSignature::R4]),
    );
    sample.with_method("Run", |asm| {
        asm.emit_ldarg(0)?;
        asm.emit_ldnull()?;
        asm.emit_ldc_r4(1.0)?;
        asm.emit_token(opcodes::CALLVIRT, draw)?;
        asm.emit_ret()
    });
    sample
}

fn shim_catalogue() -> RuleCatalogue {
    RuleCatalogue {
        shims: vec![ShimRule {
            target_type: "Host.Renderer".to_string(),
            adapter_type: "Host.RendererAdapter".to_string(),
            adapter_assembly: "Host.Adapters".to_string(),
            methods: vec!["Draw".to_string()],
        }],
        ..RuleCatalogue::default()
    }
}

#[test]
fn adapter_forwards_with_defaults() -> Result<()> {
    let adapter = adapter_module(&hosts()?)?;
    let adapter_type = adapter
        .find_type("Host.RendererAdapter")
        .expect("adapter type");
    assert_eq!(adapter.type_name(adapter_type.base.as_ref().expect("base")), "Host.Renderer");

    let draw = adapter_type
        .methods
        .iter()
        .find(|method| method.name == "Draw")
        .expect("Draw overload");
    assert_eq!(draw.signature.params.len(), 2);
    // this, widget, scale, the default layer, the forwarded call
    assert!(draw.body.iter().any(|instruction| instruction.is(opcodes::LDC_I4_0)));
    assert!(draw.body.iter().any(|instruction| instruction.is(opcodes::CALLVIRT)));
    assert!(draw.body.last().is_some_and(|instruction| instruction.is(opcodes::RET)));
    Ok(())
}

#[test]
fn shimmed_calls_are_patched() -> Result<()> {
    let scanner = scanner(hosts_with_adapter()?, shim_catalogue().build_handlers());
    let request = ScanRequest::new("Draws.dll", two_parameter_draw().bytes()?);
    let report = scanner.scan_bytes(request)?;
    let Verdict::Patched { module_bytes } = report.verdict else {
        panic!("expected a patched module, got {}", report.verdict);
    };

    let rescanned = scanner.scan_bytes(ScanRequest::new("Draws.dll", module_bytes))?;
    assert_eq!(rescanned.verdict, Verdict::Ok);
    Ok(())
}

#[test]
fn unshimmed_calls_are_rejected() -> Result<()> {
    let scanner = scanner(hosts_with_adapter()?, RuleCatalogue::default().build_handlers());
    let request = ScanRequest::new("Draws.dll", two_parameter_draw().bytes()?);
    let report = scanner.scan_bytes(request)?;
    assert_eq!(report.verdict, Verdict::Reject {
        diagnostics: vec!["reference to Host.Renderer.Draw (no such method)".to_string()],
    });
    Ok(())
}
