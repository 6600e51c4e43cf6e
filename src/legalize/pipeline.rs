// This module implements LegalizationPipeline, the single entry point of the
// legalizer. One call applies the optional profile override, seeds the diagnostic
// list with whatever the module already carries, resolves the capability profile,
// runs the validator and rewriter, asks the invariant checker about the rewritten
// module, attaches the accumulated diagnostics and derives the invalid flag. The
// pipeline holds no per-call state: the request is borrowed, a fresh module is
// returned, and the same pipeline value may serve many threads at once.

//! Legalization pipeline.

use super::capability::{normalize_profile, resolve_profile};
use super::rewriter::rewrite;
use super::validator::validate;
use super::LEGALIZE_STAGE;
use crate::core::error::Result;
use crate::core::session::LegalizeStats;
use crate::ir::{json, InvariantChecker, IrDiagnostic, IrModule, ModuleInvariants};

/// A module plus an optional profile that replaces the module's own.
#[derive(Debug, Clone)]
pub struct LegalizeRequest {
    module: IrModule,
    profile_override: Option<String>,
}

impl LegalizeRequest {
    pub fn new(module: IrModule) -> Self {
        Self { module, profile_override: None }
    }

    /// Blank overrides are treated as absent.
    pub fn with_profile_override(module: IrModule, profile_override: Option<&str>) -> Self {
        let profile_override = profile_override
            .filter(|p| !p.trim().is_empty())
            .map(str::to_string);
        Self { module, profile_override }
    }

    pub fn module(&self) -> &IrModule {
        &self.module
    }

    pub fn profile_override(&self) -> Option<&str> {
        self.profile_override.as_deref()
    }
}

/// Outcome of one legalization call.
#[derive(Debug, Clone)]
pub struct LegalizeResult {
    /// Profile-legal IR; may still carry error diagnostics.
    pub module: IrModule,
    /// Every diagnostic, input diagnostics first.
    pub diagnostics: Vec<IrDiagnostic>,
    /// True iff `diagnostics` holds at least one error.
    pub invalid: bool,
    pub stats: LegalizeStats,
}

impl LegalizeResult {
    pub fn errors(&self) -> impl Iterator<Item = &IrDiagnostic> + '_ {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// Sequences validation, rewriting and invariant re-checking.
#[derive(Debug, Default, Clone)]
pub struct LegalizationPipeline<C: InvariantChecker = ModuleInvariants> {
    checker: C,
}

impl LegalizationPipeline<ModuleInvariants> {
    pub fn new() -> Self {
        Self { checker: ModuleInvariants::new() }
    }
}

impl<C: InvariantChecker> LegalizationPipeline<C> {
    /// Pipeline that consults `checker` after rewriting.
    pub fn with_checker(checker: C) -> Self {
        Self { checker }
    }

    /// Parse IR JSON into a module.
    pub fn parse_module(&self, text: &str) -> Result<IrModule> {
        json::parse_module(text)
    }

    /// Legalize the request's module against its (possibly overridden) profile.
    pub fn legalize(&self, request: &LegalizeRequest) -> LegalizeResult {
        let overridden;
        let mut module: &IrModule = match request.profile_override() {
            Some(profile) => {
                log::debug!("profile override: {profile}");
                overridden = request.module().with_profile(profile);
                &overridden
            }
            None => request.module(),
        };

        let mut diagnostics = module.diagnostics.clone();
        let mut stats = LegalizeStats::default();
        let rewritten;

        let raw_profile = module.profile.as_deref().unwrap_or("");
        match normalize_profile(raw_profile).and_then(resolve_profile) {
            None => {
                let shown = module.profile.as_deref().unwrap_or("<none>");
                log::debug!("no capability profile for '{shown}'");
                diagnostics.push(IrDiagnostic::error(
                    format!("Unknown or missing profile '{shown}' for legalization."),
                    LEGALIZE_STAGE,
                ));
            }
            Some(profile) => {
                let stage = module.entry_stage().to_string();
                log::info!("legalizing for {} (profile '{}', stage {})", profile.band, raw_profile, stage);

                validate(module, profile, &mut diagnostics);

                let outcome = rewrite(module, profile, &stage, &mut diagnostics);
                stats = outcome.stats;
                if outcome.invalid {
                    diagnostics.push(IrDiagnostic::error(
                        "Unsupported operations removed during legalization.",
                        LEGALIZE_STAGE,
                    ));
                }
                rewritten = outcome.module;
                module = &rewritten;

                let invariant_diagnostics = self.checker.check(module);
                if !invariant_diagnostics.is_empty() {
                    log::debug!("invariant checker reported {} problem(s)", invariant_diagnostics.len());
                }
                diagnostics.extend(invariant_diagnostics);
            }
        }

        let module = IrModule {
            diagnostics: diagnostics.clone(),
            ..module.clone()
        };
        let invalid = diagnostics.iter().any(IrDiagnostic::is_error);
        stats.record_diagnostics(&diagnostics);
        log::debug!("legalization finished: invalid={invalid}, {} diagnostic(s)", diagnostics.len());

        LegalizeResult { module, diagnostics, invalid, stats }
    }
}
