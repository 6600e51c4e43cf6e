// This module implements the transforming half of legalization. Every instruction
// is classified into exactly one RewriteRule, checked in a fixed priority order:
// branch-like ops are flattened to select form on bands without dynamic branching,
// loop-like ops are marked for unrolling on bands without loops, `normalize` is
// tagged for decomposition into dot + rsq + mul, and ops marked unsupported or
// unknown are replaced by a Nop and make the module invalid. Everything else passes
// through, including instructions that already carry one of the rewrite tags, so a
// second pass over legalized output changes nothing and reports nothing. The module is rebuilt function by function and block by block; the input
// is only borrowed and instruction positions never move.

//! Legalization rewriter.

use super::capability::CapabilityProfile;
use super::LEGALIZE_STAGE;
use crate::core::session::LegalizeStats;
use crate::ir::{IrBlock, IrDiagnostic, IrFunction, IrInstruction, IrModule};

/// Provenance tags written to rewritten instructions.
pub const TAG_FLATTENED: &str = "flattened";
pub const TAG_UNROLLED: &str = "unrolled";
pub const TAG_NORMALIZE: &str = "normalize.rewritten";
pub const TAG_REMOVED: &str = "removed";

/// The rewrite applied to a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    /// Conditional control flow lowered to data-select form.
    BranchLike,
    /// Loop marked for downstream unrolling.
    LoopLike,
    /// `normalize` intrinsic tagged for decomposition.
    Normalize,
    /// Op the target cannot express; deleted.
    UnsupportedMarker,
    Passthrough,
}

impl RewriteRule {
    /// Rule for `instr`; instructions already tagged by a rewrite pass through.
    pub fn for_instruction(instr: &IrInstruction, profile: &CapabilityProfile) -> RewriteRule {
        match instr.tag.as_deref() {
            Some(TAG_FLATTENED | TAG_UNROLLED | TAG_NORMALIZE | TAG_REMOVED) => RewriteRule::Passthrough,
            _ => RewriteRule::classify(&instr.op, profile),
        }
    }

    /// Pick the first rule matching `op` under `profile`.
    pub fn classify(op: &str, profile: &CapabilityProfile) -> RewriteRule {
        let lower = op.to_ascii_lowercase();

        if !profile.dynamic_branching && (lower.contains("branch") || op.eq_ignore_ascii_case("branchcond")) {
            RewriteRule::BranchLike
        } else if !profile.loops && lower.contains("loop") {
            RewriteRule::LoopLike
        } else if lower == "normalize" {
            RewriteRule::Normalize
        } else if lower.contains("unsupported") || lower.contains("unknown") {
            RewriteRule::UnsupportedMarker
        } else {
            RewriteRule::Passthrough
        }
    }

    /// Apply the rule, recording diagnostics and statistics.
    fn apply(
        self,
        instr: &IrInstruction,
        profile: &CapabilityProfile,
        diagnostics: &mut Vec<IrDiagnostic>,
        stats: &mut LegalizeStats,
    ) -> IrInstruction {
        match self {
            RewriteRule::BranchLike => {
                stats.branches_flattened += 1;
                diagnostics.push(IrDiagnostic::info(
                    format!("Flattened branch-like op '{}' for profile {}.", instr.op, profile.band),
                    LEGALIZE_STAGE,
                ));
                // No result means nothing to select; keep the slot as a Nop.
                let op = if instr.result.is_some() { "Select" } else { "Nop" };
                IrInstruction {
                    op: op.to_string(),
                    terminator: false,
                    tag: Some(TAG_FLATTENED.to_string()),
                    ..instr.clone()
                }
            }
            RewriteRule::LoopLike => {
                stats.loops_unrolled += 1;
                diagnostics.push(IrDiagnostic::info(
                    format!("Unrolled loop-like op '{}' for profile {}.", instr.op, profile.band),
                    LEGALIZE_STAGE,
                ));
                IrInstruction {
                    op: "LoopUnrolled".to_string(),
                    terminator: false,
                    tag: Some(TAG_UNROLLED.to_string()),
                    ..instr.clone()
                }
            }
            RewriteRule::Normalize => {
                stats.intrinsics_rewritten += 1;
                diagnostics.push(IrDiagnostic::info(
                    "Rewriting 'normalize' using backend-neutral ops (dot + rsq + mul).",
                    LEGALIZE_STAGE,
                ));
                IrInstruction {
                    tag: Some(TAG_NORMALIZE.to_string()),
                    ..instr.clone()
                }
            }
            RewriteRule::UnsupportedMarker => {
                stats.ops_removed += 1;
                diagnostics.push(IrDiagnostic::error(
                    format!("Removed unsupported op '{}'.", instr.op),
                    LEGALIZE_STAGE,
                ));
                IrInstruction {
                    op: "Nop".to_string(),
                    operands: Vec::new(),
                    result: None,
                    ty: instr.ty.clone(),
                    terminator: false,
                    tag: Some(TAG_REMOVED.to_string()),
                }
            }
            RewriteRule::Passthrough => instr.clone(),
        }
    }
}

/// Result of a rewrite pass.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub module: IrModule,
    /// Set when at least one unsupported op was removed.
    pub invalid: bool,
    pub stats: LegalizeStats,
}

/// Rewrite every instruction of `module` for `profile`.
///
/// `stage` is the entry-point stage the module is legalized for; it is only
/// used for logging.
pub fn rewrite(
    module: &IrModule,
    profile: &CapabilityProfile,
    stage: &str,
    diagnostics: &mut Vec<IrDiagnostic>,
) -> RewriteOutcome {
    let mut stats = LegalizeStats::default();

    let mut functions = Vec::with_capacity(module.functions.len());
    for function in &module.functions {
        stats.functions_visited += 1;

        let mut blocks = Vec::with_capacity(function.blocks.len());
        for block in &function.blocks {
            stats.blocks_visited += 1;

            let mut instructions = Vec::with_capacity(block.instructions.len());
            for instr in &block.instructions {
                stats.instructions_visited += 1;
                let rule = RewriteRule::for_instruction(instr, profile);
                if rule != RewriteRule::Passthrough {
                    log::trace!("{}/{}: {:?} on '{}'", function.name, block.id, rule, instr.op);
                }
                instructions.push(rule.apply(instr, profile, diagnostics, &mut stats));
            }

            blocks.push(IrBlock { id: block.id.clone(), instructions });
        }

        functions.push(IrFunction {
            name: function.name.clone(),
            return_type: function.return_type.clone(),
            parameters: function.parameters.clone(),
            blocks,
        });
    }

    let invalid = stats.ops_removed > 0;
    log::debug!(
        "rewrote module for {} (stage {}): {} of {} instruction(s) changed",
        profile.band,
        stage,
        stats.rewrites(),
        stats.instructions_visited
    );

    RewriteOutcome {
        module: module.with_functions(functions),
        invalid,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_utils::test::{
        branch_module, legal_module, loop_module, normalize_module, unsupported_module,
    };
    use crate::ir::Severity;
    use crate::legalize::capability::resolve_profile;

    fn sm(band: &str) -> &'static CapabilityProfile {
        resolve_profile(band).unwrap()
    }

    #[test]
    fn test_classify_priority() {
        let sm2 = sm("sm2");
        assert_eq!(RewriteRule::classify("BranchCond", sm2), RewriteRule::BranchLike);
        assert_eq!(RewriteRule::classify("branch", sm2), RewriteRule::BranchLike);
        assert_eq!(RewriteRule::classify("Loop", sm2), RewriteRule::LoopLike);
        assert_eq!(RewriteRule::classify("NORMALIZE", sm2), RewriteRule::Normalize);
        assert_eq!(RewriteRule::classify("normalize3", sm2), RewriteRule::Passthrough);
        assert_eq!(RewriteRule::classify("UnknownIntrinsic", sm2), RewriteRule::UnsupportedMarker);
        assert_eq!(RewriteRule::classify("Add", sm2), RewriteRule::Passthrough);
        // branch wins over unsupported when both keywords appear
        assert_eq!(RewriteRule::classify("UnsupportedBranch", sm2), RewriteRule::BranchLike);

        let sm3 = sm("sm3");
        assert_eq!(RewriteRule::classify("BranchCond", sm3), RewriteRule::Passthrough);
        assert_eq!(RewriteRule::classify("Loop", sm3), RewriteRule::Passthrough);
        assert_eq!(RewriteRule::classify("normalize", sm3), RewriteRule::Normalize);
        assert_eq!(RewriteRule::classify("UnsupportedBranch", sm3), RewriteRule::UnsupportedMarker);
    }

    #[test]
    fn test_branch_flattening() {
        let input = branch_module("ps_2_0");
        let mut diags = Vec::new();
        let out = rewrite(&input, sm("sm2"), "ps", &mut diags);

        let first = &out.module.functions[0].blocks[0].instructions[0];
        assert_eq!(first.op, "Nop");
        assert!(!first.terminator);
        assert_eq!(first.tag.as_deref(), Some(TAG_FLATTENED));
        assert_eq!(first.operands, vec![1]);
        assert!(!out.invalid);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Info);
        assert_eq!(diags[0].message, "Flattened branch-like op 'BranchCond' for profile sm2.");

        // input untouched
        assert_eq!(input.functions[0].blocks[0].instructions[0].op, "BranchCond");
        assert!(input.functions[0].blocks[0].instructions[0].terminator);
    }

    #[test]
    fn test_branch_with_result_becomes_select() {
        let module = crate::core::test_utils::test::simple_module(
            "ps_2_0",
            "ps",
            vec![IrInstruction::new("branch_select").operands(&[1]).result(2)],
            vec![],
        );
        let out = rewrite(&module, sm("sm2"), "ps", &mut Vec::new());
        let instr = &out.module.functions[0].blocks[0].instructions[0];
        assert_eq!(instr.op, "Select");
        assert_eq!(instr.result, Some(2));
    }

    #[test]
    fn test_loop_marker() {
        let out = rewrite(&loop_module("ps_2_0"), sm("sm2"), "ps", &mut Vec::new());
        let instr = &out.module.functions[0].blocks[0].instructions[0];
        assert_eq!(instr.op, "LoopUnrolled");
        assert_eq!(instr.tag.as_deref(), Some(TAG_UNROLLED));
        assert_eq!(out.stats.loops_unrolled, 1);
    }

    #[test]
    fn test_normalize_tagged_any_band() {
        for band in ["sm2", "sm3", "sm4", "sm5"] {
            let mut diags = Vec::new();
            let out = rewrite(&normalize_module("x"), sm(band), "ps", &mut diags);
            let instr = &out.module.functions[0].blocks[0].instructions[0];
            assert_eq!(instr.op, "normalize");
            assert_eq!(instr.tag.as_deref(), Some(TAG_NORMALIZE));
            assert!(diags[0].message.contains("dot + rsq + mul"));
            assert!(!out.invalid);
        }
    }

    #[test]
    fn test_unsupported_removed() {
        let mut diags = Vec::new();
        let out = rewrite(&unsupported_module("ps_3_0"), sm("sm3"), "ps", &mut diags);
        let instr = &out.module.functions[0].blocks[0].instructions[0];
        assert_eq!(instr.op, "Nop");
        assert!(instr.operands.is_empty());
        assert!(instr.result.is_none());
        assert_eq!(instr.tag.as_deref(), Some(TAG_REMOVED));
        assert!(out.invalid);
        assert!(diags.iter().any(|d| d.is_error() && d.message == "Removed unsupported op 'UnsupportedOp'."));
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let body = vec![
            IrInstruction::new("Loop"),
            IrInstruction::new("normalize").operands(&[1]).result(2),
            IrInstruction::new("branch_select").operands(&[1]).result(3),
            IrInstruction::new("UnsupportedOp"),
            IrInstruction::new("Return").terminator(),
        ];
        let module = crate::core::test_utils::test::simple_module("ps_2_0", "ps", body, vec![]);
        let first = rewrite(&module, sm("sm2"), "ps", &mut Vec::new());
        assert_eq!(first.stats.rewrites(), 4);

        let mut diags = Vec::new();
        let second = rewrite(&first.module, sm("sm2"), "ps", &mut diags);
        assert_eq!(second.module, first.module);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(second.stats.rewrites(), 0);
        assert!(!second.invalid);
    }

    #[test]
    fn test_upstream_tags_do_not_block_rules() {
        let instr = IrInstruction::new("Loop").tag("loop");
        assert_eq!(RewriteRule::for_instruction(&instr, sm("sm2")), RewriteRule::LoopLike);
        let instr = IrInstruction::new("LoopUnrolled").tag(TAG_UNROLLED);
        assert_eq!(RewriteRule::for_instruction(&instr, sm("sm2")), RewriteRule::Passthrough);
    }

    #[test]
    fn test_passthrough_preserves_structure() {
        let input = legal_module("ps_2_0");
        let mut diags = Vec::new();
        let out = rewrite(&input, sm("sm2"), "ps", &mut diags);
        assert_eq!(out.module, input);
        assert!(diags.is_empty());
        assert_eq!(out.stats.instructions_visited, 2);
        assert_eq!(out.stats.rewrites(), 0);
        assert!(std::sync::Arc::ptr_eq(&out.module.values, &input.values));
    }
}
