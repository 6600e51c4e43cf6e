// This module tracks per-call legalization statistics. LegalizeStats records how
// many functions, blocks and instructions a pipeline call walked and how often each
// rewrite rule fired, plus the diagnostic totals by severity. A fresh value is built
// for every call and returned with the result, so nothing is shared between calls.
// The Display impl renders a short report used by the CLI's --stats flag.

//! Per-call legalization statistics.

use std::fmt;

use crate::ir::{IrDiagnostic, Severity};

/// Statistics gathered during one legalization call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LegalizeStats {
    /// Functions rebuilt by the rewriter.
    pub functions_visited: usize,

    /// Blocks rebuilt by the rewriter.
    pub blocks_visited: usize,

    /// Instructions examined by the rewriter.
    pub instructions_visited: usize,

    /// Branch-like ops lowered to select form.
    pub branches_flattened: usize,

    /// Loop-like ops marked for unrolling.
    pub loops_unrolled: usize,

    /// `normalize` intrinsics tagged for decomposition.
    pub intrinsics_rewritten: usize,

    /// Unsupported ops replaced by `Nop`.
    pub ops_removed: usize,

    /// Diagnostic totals over the final list.
    pub infos: usize,
    pub warnings: usize,
    pub errors: usize,
    /// Upstream severities outside info/warning/error.
    pub others: usize,
}

impl LegalizeStats {
    /// Total number of instructions changed by a rewrite rule.
    pub fn rewrites(&self) -> usize {
        self.branches_flattened + self.loops_unrolled + self.intrinsics_rewritten + self.ops_removed
    }

    /// Recount severities from the final diagnostic list.
    pub fn record_diagnostics(&mut self, diagnostics: &[IrDiagnostic]) {
        self.infos = 0;
        self.warnings = 0;
        self.errors = 0;
        self.others = 0;
        for diag in diagnostics {
            match diag.severity {
                Severity::Info => self.infos += 1,
                Severity::Warning => self.warnings += 1,
                Severity::Error => self.errors += 1,
                Severity::Other(_) => self.others += 1,
            }
        }
    }
}

impl fmt::Display for LegalizeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Legalization Statistics:")?;
        writeln!(f, "  Functions visited: {}", self.functions_visited)?;
        writeln!(f, "  Blocks visited: {}", self.blocks_visited)?;
        writeln!(f, "  Instructions visited: {}", self.instructions_visited)?;
        writeln!(f, "  Branches flattened: {}", self.branches_flattened)?;
        writeln!(f, "  Loops unrolled: {}", self.loops_unrolled)?;
        writeln!(f, "  Intrinsics rewritten: {}", self.intrinsics_rewritten)?;
        writeln!(f, "  Ops removed: {}", self.ops_removed)?;
        write!(
            f,
            "  Diagnostics: {} error(s), {} warning(s), {} info, {} other",
            self.errors, self.warnings, self.infos, self.others
        )
    }
}
