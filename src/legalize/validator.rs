// This module implements the read-only half of legalization: it compares what a
// module actually uses against the limits and feature flags of a CapabilityProfile.
// Every check runs, none stops the others, and each finding is appended to the
// shared diagnostic list with the "legalize" stage tag. Checks cover the instruction
// and temporary-register budgets, gradient ops, SV semantics, texture instruction
// count and vertex texture fetch, typed UAVs and multiple render targets, and
// conditional branches on bands without dynamic branching.

//! Legalization validator.

use super::capability::CapabilityProfile;
use super::LEGALIZE_STAGE;
use crate::ir::{is_vertex_stage, IrDiagnostic, IrInstruction, IrModule};

const GRADIENT_OPS: [&str; 4] = ["ddx", "ddy", "dsx", "dsy"];

/// Check `module` against `profile`, appending findings to `diagnostics`.
pub fn validate(module: &IrModule, profile: &CapabilityProfile, diagnostics: &mut Vec<IrDiagnostic>) {
    let stage = module.entry_stage();
    let before = diagnostics.len();

    check_budgets(module, profile, diagnostics);
    check_gradient_ops(module, profile, stage, diagnostics);
    check_sv_semantics(module, profile, diagnostics);
    check_texture_sampling(module, profile, stage, diagnostics);
    check_uavs_and_mrt(module, profile, diagnostics);
    check_dynamic_branching(module, profile, stage, diagnostics);

    log::debug!(
        "validated module against {} (stage {}): {} finding(s)",
        profile.band,
        stage,
        diagnostics.len() - before
    );
}

fn error(message: String) -> IrDiagnostic {
    IrDiagnostic::error(message, LEGALIZE_STAGE)
}

fn check_budgets(module: &IrModule, profile: &CapabilityProfile, diagnostics: &mut Vec<IrDiagnostic>) {
    let instruction_count = module.instruction_count();
    if let Some(max) = profile.instruction_slots {
        if instruction_count > max as usize {
            diagnostics.push(error(format!(
                "Instruction count {instruction_count} exceeds profile limit {max} for {}.",
                profile.band
            )));
        }
    }

    let temp_count = module.temp_count();
    if let Some(max) = profile.temp_registers {
        if temp_count > max as usize {
            diagnostics.push(error(format!(
                "Temporary register count {temp_count} exceeds profile limit {max} for {}.",
                profile.band
            )));
        }
    }
}

fn is_gradient(instr: &IrInstruction) -> bool {
    GRADIENT_OPS.iter().any(|op| instr.op.eq_ignore_ascii_case(op))
}

fn check_gradient_ops(module: &IrModule, profile: &CapabilityProfile, stage: &str, diagnostics: &mut Vec<IrDiagnostic>) {
    if profile.gradient_ops {
        return;
    }
    if module.instructions().any(is_gradient) {
        diagnostics.push(error(format!(
            "Gradient operations are not supported in profile {} (stage: {stage}).",
            profile.band
        )));
    }
}

fn check_sv_semantics(module: &IrModule, profile: &CapabilityProfile, diagnostics: &mut Vec<IrDiagnostic>) {
    if profile.sv_semantics {
        return;
    }
    if module.values.iter().any(|v| v.has_sv_semantic()) {
        diagnostics.push(error(format!("SV semantics are not allowed in profile {}.", profile.band)));
    }
}

/// Texture fetches are any op mentioning `tex` or `sample`.
pub(crate) fn is_texture_op(instr: &IrInstruction) -> bool {
    let op = instr.op.to_ascii_lowercase();
    op.contains("tex") || op.contains("sample")
}

fn check_texture_sampling(module: &IrModule, profile: &CapabilityProfile, stage: &str, diagnostics: &mut Vec<IrDiagnostic>) {
    let texture_ops = module.instructions().filter(|i| is_texture_op(i)).count();

    if let Some(limit) = profile.texture_instruction_limit {
        if texture_ops > limit as usize {
            diagnostics.push(error(format!(
                "Texture instruction count {texture_ops} exceeds profile limit {limit} for {}.",
                profile.band
            )));
        }
    }

    if !profile.vertex_texture_fetch && is_vertex_stage(stage) && texture_ops > 0 {
        diagnostics.push(error(format!(
            "Vertex texture fetch is not supported in profile {}.",
            profile.band
        )));
    }
}

fn check_uavs_and_mrt(module: &IrModule, profile: &CapabilityProfile, diagnostics: &mut Vec<IrDiagnostic>) {
    if !profile.typed_uavs {
        let has_uav = module.resources.iter().any(|r| {
            r.writable || r.kind.eq_ignore_ascii_case("uav") || r.ty.to_ascii_lowercase().contains("uav")
        });
        if has_uav {
            diagnostics.push(error(format!("Typed UAVs are not supported in profile {}.", profile.band)));
        }
    }

    if profile.mrt_limit == Some(0) {
        let has_mrt = module.resources.iter().any(|r| {
            let kind: String = r
                .kind
                .chars()
                .filter(|c| !matches!(c, ' ' | '_' | '-'))
                .collect();
            kind.to_ascii_lowercase().contains("rendertarget")
                || r.name.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("color"))
        });
        if has_mrt {
            diagnostics.push(error(format!(
                "Multiple render targets are not supported in profile {}.",
                profile.band
            )));
        }
    }
}

/// A branch that selects its successor from a runtime condition.
pub(crate) fn is_conditional_branch(instr: &IrInstruction) -> bool {
    instr.op.eq_ignore_ascii_case("branchcond")
        || (instr.op.to_ascii_lowercase().contains("branch") && !instr.operands.is_empty())
}

fn check_dynamic_branching(module: &IrModule, profile: &CapabilityProfile, stage: &str, diagnostics: &mut Vec<IrDiagnostic>) {
    if profile.dynamic_branching {
        return;
    }
    let branches = module.instructions().filter(|i| is_conditional_branch(i)).count();
    if branches > 0 {
        diagnostics.push(error(format!(
            "Dynamic branching is not supported in profile {} (stage: {stage}); \
             {branches} conditional branch(es) flattened to select form.",
            profile.band
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::test::{branch_module, legal_module, simple_module, straight_line_module};
    use crate::ir::{IrResource, IrValue, ModuleBuilder};
    use crate::legalize::capability::resolve_profile;

    fn run(module: &IrModule, band: &str) -> Vec<IrDiagnostic> {
        let mut diags = Vec::new();
        validate(module, resolve_profile(band).unwrap(), &mut diags);
        diags
    }

    fn has(diags: &[IrDiagnostic], needle: &str) -> bool {
        diags.iter().any(|d| d.is_error() && d.message.contains(needle))
    }

    #[test]
    fn test_legal_module_has_no_findings() {
        for band in ["sm2", "sm3", "sm4", "sm5"] {
            assert!(run(&legal_module("x"), band).is_empty(), "band {band}");
        }
    }

    #[test]
    fn test_appends_without_replacing() {
        let mut diags = vec![IrDiagnostic::info("upstream", "optimize")];
        let module = simple_module("ps_2_0", "ps", vec![IrInstruction::new("ddx")], vec![]);
        validate(&module, resolve_profile("sm2").unwrap(), &mut diags);
        assert_eq!(diags[0].message, "upstream");
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_instruction_budget() {
        // 64 assigns + return = 65 instructions, 64 temps
        let diags = run(&straight_line_module("ps_2_0", "ps", 64), "sm2");
        assert!(has(&diags, "Instruction count 65 exceeds profile limit 64 for sm2."));
        assert!(has(&diags, "Temporary register count 64 exceeds profile limit 12 for sm2."));
        assert!(run(&straight_line_module("ps_4_0", "ps", 64), "sm4").is_empty());
    }

    #[test]
    fn test_budget_exactly_at_limit() {
        // 12 temps sits exactly on the sm2 limit
        let diags = run(&straight_line_module("ps_2_0", "ps", 12), "sm2");
        assert!(!has(&diags, "Temporary register count"));
        let diags = run(&straight_line_module("ps_2_0", "ps", 13), "sm2");
        assert!(has(&diags, "Temporary register count 13"));
    }

    #[test]
    fn test_gradient_ops_by_band() {
        for op in ["ddx", "DDY", "dsx", "Dsy"] {
            let module = simple_module("ps_2_0", "ps", vec![IrInstruction::new(op)], vec![]);
            let diags = run(&module, "sm2");
            assert!(has(&diags, "Gradient operations are not supported in profile sm2 (stage: ps)."), "{op}");
            assert!(run(&module, "sm3").is_empty());
        }
        // substring is not enough
        let module = simple_module("ps_2_0", "ps", vec![IrInstruction::new("ddx_fine")], vec![]);
        assert!(!has(&run(&module, "sm2"), "Gradient"));
    }

    #[test]
    fn test_sv_semantics() {
        let module = ModuleBuilder::new("vs_3_0")
            .value(IrValue::new(1, "float4", "Output").semantic("sv_Position"))
            .build();
        assert!(has(&run(&module, "sm3"), "SV semantics are not allowed in profile sm3."));
        assert!(run(&module, "sm4").is_empty());
    }

    #[test]
    fn test_texture_limit_and_vertex_fetch() {
        let body: Vec<_> = (0..33).map(|_| IrInstruction::new("Sample")).collect();
        let module = simple_module("ps_2_0", "ps", body, vec![]);
        assert!(has(&run(&module, "sm2"), "Texture instruction count 33 exceeds profile limit 32 for sm2."));

        // 32 sits exactly on the sm2 limit
        let body: Vec<_> = (0..32).map(|_| IrInstruction::new("Sample")).collect();
        let module = simple_module("ps_2_0", "ps", body, vec![]);
        assert!(!has(&run(&module, "sm2"), "Texture instruction count"));

        let module = simple_module("vs_2_0", "vertex", vec![IrInstruction::new("tex2Dlod")], vec![]);
        assert!(has(&run(&module, "sm2"), "Vertex texture fetch is not supported in profile sm2."));
        assert!(run(&module, "sm3").is_empty());

        let module = simple_module("ps_2_0", "ps", vec![IrInstruction::new("tex2D")], vec![]);
        assert!(run(&module, "sm2").is_empty());
    }

    #[test]
    fn test_uavs_and_mrt() {
        let module = ModuleBuilder::new("ps_3_0")
            .resource(IrResource::new("out", "buffer", "RWBuffer<float>").writable())
            .build();
        assert!(has(&run(&module, "sm3"), "Typed UAVs are not supported in profile sm3."));
        assert!(run(&module, "sm4").is_empty());

        let module = ModuleBuilder::new("ps_3_0").resource(IrResource::new("u0", "UAV", "float")).build();
        assert!(has(&run(&module, "sm2"), "Typed UAVs"));

        let module = ModuleBuilder::new("ps_2_0")
            .resource(IrResource::new("COLOR1", "output", "float4"))
            .build();
        assert!(has(&run(&module, "sm2"), "Multiple render targets are not supported in profile sm2."));
        assert!(run(&module, "sm3").is_empty());

        let module = ModuleBuilder::new("ps_2_0")
            .resource(IrResource::new("rt", "Render Target", "float4"))
            .build();
        assert!(has(&run(&module, "sm2"), "Multiple render targets"));
    }

    #[test]
    fn test_dynamic_branching() {
        let diags = run(&branch_module("ps_2_0"), "sm2");
        assert!(has(&diags, "Dynamic branching is not supported in profile sm2 (stage: ps)"));
        assert!(run(&branch_module("ps_3_0"), "sm3").is_empty());

        // unconditional jumps are static control flow
        let module = simple_module("ps_2_0", "ps", vec![IrInstruction::new("Branch").terminator()], vec![]);
        assert!(!has(&run(&module, "sm2"), "Dynamic branching"));
    }

    #[test]
    fn test_all_checks_run() {
        let module = ModuleBuilder::new("vs_2_0")
            .entry("main", "vs")
            .value(IrValue::new(1, "float4", "Output").semantic("SV_Position"))
            .resource(IrResource::new("COLOR0", "uav", "RWTexture2D").writable())
            .function(crate::ir::IrFunction::new(
                "main",
                "void",
                vec![crate::ir::IrBlock::new(
                    "entry",
                    vec![IrInstruction::new("ddy"), IrInstruction::new("SampleLevel"), IrInstruction::new("Return").terminator()],
                )],
            ))
            .build();
        let diags = run(&module, "sm2");
        assert_eq!(diags.len(), 5, "{diags:?}");
        assert!(diags.iter().all(|d| d.stage == LEGALIZE_STAGE));
    }
}
