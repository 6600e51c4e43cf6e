//! fxlegalize - shader profile legalization.
//!
//! Given optimized, target-independent shader IR, fxlegalize decides whether
//! the program fits the capability envelope of a shader-model band (sm2..sm5),
//! rewrites constructs that have a profile-legal lowering, and reports every
//! violation as a structured diagnostic instead of failing.
//!
//! # Primary Usage
//!
//! ```
//! use fxlegalize::{LegalizationPipeline, LegalizeRequest};
//!
//! let pipeline = LegalizationPipeline::new();
//! let module = pipeline.parse_module(r#"{
//!     "profile": "ps_2_0",
//!     "entryPoint": { "function": "main", "stage": "ps" },
//!     "functions": [{ "name": "main", "returnType": "float", "parameters": [],
//!         "blocks": [{ "id": "entry", "instructions": [
//!             { "op": "ddx", "operands": [1], "result": 2, "type": "float" },
//!             { "op": "Return", "operands": [2], "terminator": true } ] }] }],
//!     "values": [{ "id": 1, "type": "float", "kind": "Temp" },
//!                { "id": 2, "type": "float", "kind": "Temp" }]
//! }"#)?;
//!
//! let result = pipeline.legalize(&LegalizeRequest::new(module));
//! assert!(result.invalid);
//! assert!(result.errors().any(|d| d.message.contains("Gradient operations")));
//! # Ok::<(), fxlegalize::LegalizeError>(())
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - IR model, JSON codec, builder and invariant checker
//! - [`legalize`] - capability table, validator, rewriter, pipeline
//! - [`core`] - errors and per-call statistics

pub mod core;
pub mod ir;
pub mod legalize;

pub use self::core::{LegalizeError, LegalizeStats, Result};
pub use ir::{
    InvariantChecker, IrBlock, IrDiagnostic, IrEntryPoint, IrFunction, IrInstruction, IrModule, IrResource,
    IrValue, ModuleBuilder, ModuleInvariants, Severity, ValueId,
};
pub use legalize::{
    normalize_profile, resolve_profile, CapabilityProfile, LegalizationPipeline, LegalizeRequest, LegalizeResult,
};
