//! Shader IR consumed and produced by the legalizer.
//!
//! This is the contract shared with the upstream lowering/optimizer stages:
//! a module holds functions made of blocks of instructions, a table of
//! SSA-like value definitions, the bound resources and an append-only
//! diagnostic list.
//!
//! Modules are treated as persistent values. Passes borrow the input and
//! build a new module; `values` and `resources` are reference counted so a
//! derived module shares them with its source instead of copying.
//!
//! # Wire format
//!
//! ```text
//! {
//!   "profile": "ps_2_0",
//!   "entryPoint": { "function": "main", "stage": "ps" },
//!   "functions": [{ "name": "main", "returnType": "float", "parameters": [],
//!                   "blocks": [{ "id": "entry", "instructions": [
//!                       { "op": "Return", "operands": [1], "terminator": true } ] }] }],
//!   "values": [{ "id": 1, "type": "float", "kind": "Temp" }],
//!   "resources": [],
//!   "diagnostics": []
//! }
//! ```
//!
//! See [`json`] for the reader, which accepts field names in any casing.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod builder;
pub mod invariants;
pub mod json;

pub use builder::ModuleBuilder;
pub use invariants::{InvariantChecker, ModuleInvariants};

/// Identifier of an [`IrValue`], unique within a module.
pub type ValueId = u32;

/// The unit of compilation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IrModule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<IrEntryPoint>,
    pub functions: Vec<IrFunction>,
    pub values: Arc<[IrValue]>,
    pub resources: Arc<[IrResource]>,
    pub diagnostics: Vec<IrDiagnostic>,
}

impl Default for IrModule {
    fn default() -> Self {
        Self {
            format_version: None,
            profile: None,
            entry_point: None,
            functions: Vec::new(),
            values: Arc::from(Vec::new()),
            resources: Arc::from(Vec::new()),
            diagnostics: Vec::new(),
        }
    }
}

impl IrModule {
    /// Pipeline stage of the entry point, `"unknown"` when absent.
    pub fn entry_stage(&self) -> &str {
        self.entry_point
            .as_ref()
            .map(|ep| ep.stage.as_str())
            .unwrap_or("unknown")
    }

    /// Every instruction of every block of every function, in program order.
    pub fn instructions(&self) -> impl Iterator<Item = &IrInstruction> + '_ {
        self.functions
            .iter()
            .flat_map(|f| f.blocks.iter())
            .flat_map(|b| b.instructions.iter())
    }

    pub fn instruction_count(&self) -> usize {
        self.instructions().count()
    }

    /// Number of values whose storage class is `Temp`.
    pub fn temp_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_temp()).count()
    }

    pub fn function(&self, name: &str) -> Option<&IrFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// New module with `profile` replaced; everything else is shared or cloned.
    pub fn with_profile(&self, profile: impl Into<String>) -> IrModule {
        IrModule {
            profile: Some(profile.into()),
            ..self.clone()
        }
    }

    /// New module with `functions` replaced.
    pub fn with_functions(&self, functions: Vec<IrFunction>) -> IrModule {
        IrModule {
            format_version: self.format_version,
            profile: self.profile.clone(),
            entry_point: self.entry_point.clone(),
            functions,
            values: Arc::clone(&self.values),
            resources: Arc::clone(&self.resources),
            diagnostics: self.diagnostics.clone(),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(IrDiagnostic::is_error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IrEntryPoint {
    pub function: String,
    pub stage: String,
}

impl IrEntryPoint {
    pub fn new(function: impl Into<String>, stage: impl Into<String>) -> Self {
        Self { function: function.into(), stage: stage.into() }
    }

    /// Vertex stages are spelled `vs*` or `vertex`.
    pub fn is_vertex(&self) -> bool {
        is_vertex_stage(&self.stage)
    }
}

pub(crate) fn is_vertex_stage(stage: &str) -> bool {
    let stage = stage.to_ascii_lowercase();
    stage.starts_with("vs") || stage == "vertex"
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IrFunction {
    pub name: String,
    pub return_type: String,
    pub parameters: Vec<ValueId>,
    pub blocks: Vec<IrBlock>,
}

impl IrFunction {
    pub fn new(name: impl Into<String>, return_type: impl Into<String>, blocks: Vec<IrBlock>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            parameters: Vec::new(),
            blocks,
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<ValueId>) -> Self {
        self.parameters = parameters;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IrBlock {
    pub id: String,
    pub instructions: Vec<IrInstruction>,
}

impl IrBlock {
    pub fn new(id: impl Into<String>, instructions: Vec<IrInstruction>) -> Self {
        Self { id: id.into(), instructions }
    }
}

/// A single IR operation.
///
/// `tag` is free-form; the rewriter stores rewrite provenance there
/// (`flattened`, `unrolled`, `normalize.rewritten`, `removed`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IrInstruction {
    pub op: String,
    pub operands: Vec<ValueId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ValueId>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    pub terminator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl IrInstruction {
    pub fn new(op: impl Into<String>) -> Self {
        Self { op: op.into(), ..Default::default() }
    }

    pub fn operands(mut self, operands: &[ValueId]) -> Self {
        self.operands = operands.to_vec();
        self
    }

    pub fn result(mut self, result: ValueId) -> Self {
        self.result = Some(result);
        self
    }

    pub fn ty(mut self, ty: impl Into<String>) -> Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn terminator(mut self) -> Self {
        self.terminator = true;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IrValue {
    pub id: ValueId,
    #[serde(rename = "type")]
    pub ty: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<String>,
}

impl IrValue {
    pub fn new(id: ValueId, ty: impl Into<String>, kind: impl Into<String>) -> Self {
        Self { id, ty: ty.into(), kind: kind.into(), semantic: None }
    }

    pub fn temp(id: ValueId, ty: impl Into<String>) -> Self {
        Self::new(id, ty, "Temp")
    }

    pub fn semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }

    pub fn is_temp(&self) -> bool {
        self.kind.eq_ignore_ascii_case("temp")
    }

    /// System-value semantics start with `SV_`.
    pub fn has_sv_semantic(&self) -> bool {
        self.semantic
            .as_deref()
            .and_then(|s| s.as_bytes().get(..3))
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(b"sv_"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IrResource {
    pub name: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub ty: String,
    pub writable: bool,
}

impl IrResource {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, ty: impl Into<String>) -> Self {
        Self { name: name.into(), kind: kind.into(), ty: ty.into(), writable: false }
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    #[default]
    Info,
    /// Reserved; no built-in rule emits warnings.
    Warning,
    Error,
    /// Upstream spelling outside the three above, kept verbatim. Never an error.
    Other(String),
}

impl Severity {
    pub fn as_str(&self) -> &str {
        match self {
            Severity::Info => "Info",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Other(raw) => raw,
        }
    }

    /// Case-insensitive parse of the known spellings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Severity::Info),
            "warning" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Severity::parse(&raw).unwrap_or(Severity::Other(raw)))
    }
}

/// A severity-tagged, stage-tagged finding.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IrDiagnostic {
    pub severity: Severity,
    pub message: String,
    pub stage: String,
}

impl IrDiagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, stage: impl Into<String>) -> Self {
        Self { severity, message: message.into(), stage: stage.into() }
    }

    pub fn info(message: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::new(Severity::Info, message, stage)
    }

    pub fn warning(message: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message, stage)
    }

    pub fn error(message: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::new(Severity::Error, message, stage)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for IrDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.stage, self.severity, self.message)
    }
}
