//! Programmatic construction of [`IrModule`]s.
//!
//! ```
//! use fxlegalize::ir::{IrBlock, IrFunction, IrInstruction, IrValue, ModuleBuilder};
//!
//! let module = ModuleBuilder::new("ps_3_0")
//!     .entry("main", "ps")
//!     .value(IrValue::temp(1, "float"))
//!     .function(IrFunction::new(
//!         "main",
//!         "float",
//!         vec![IrBlock::new(
//!             "entry",
//!             vec![IrInstruction::new("Return").operands(&[1]).terminator()],
//!         )],
//!     ))
//!     .build();
//! assert_eq!(module.instruction_count(), 1);
//! ```

use std::sync::Arc;

use super::{IrDiagnostic, IrEntryPoint, IrFunction, IrModule, IrResource, IrValue};

/// Chained builder for a module; `build` freezes the value and resource tables.
#[derive(Debug, Default)]
pub struct ModuleBuilder {
    profile: Option<String>,
    entry_point: Option<IrEntryPoint>,
    functions: Vec<IrFunction>,
    values: Vec<IrValue>,
    resources: Vec<IrResource>,
    diagnostics: Vec<IrDiagnostic>,
}

impl ModuleBuilder {
    pub fn new(profile: impl Into<String>) -> Self {
        Self { profile: Some(profile.into()), ..Default::default() }
    }

    /// Builder for a module that carries no profile string at all.
    pub fn without_profile() -> Self {
        Self::default()
    }

    pub fn entry(mut self, function: impl Into<String>, stage: impl Into<String>) -> Self {
        self.entry_point = Some(IrEntryPoint::new(function, stage));
        self
    }

    pub fn function(mut self, function: IrFunction) -> Self {
        self.functions.push(function);
        self
    }

    pub fn value(mut self, value: IrValue) -> Self {
        self.values.push(value);
        self
    }

    pub fn values(mut self, values: impl IntoIterator<Item = IrValue>) -> Self {
        self.values.extend(values);
        self
    }

    pub fn resource(mut self, resource: IrResource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn diagnostic(mut self, diagnostic: IrDiagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn build(self) -> IrModule {
        IrModule {
            format_version: None,
            profile: self.profile,
            entry_point: self.entry_point,
            functions: self.functions,
            values: Arc::from(self.values),
            resources: Arc::from(self.resources),
            diagnostics: self.diagnostics,
        }
    }
}
