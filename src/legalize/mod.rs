//! Capability-driven legalization.
//!
//! - [`capability`] - static shader-model capability table
//! - [`validator`] - read-only checks against a profile
//! - [`rewriter`] - per-instruction rewrite rules
//! - [`pipeline`] - the single entry point tying them together

pub mod capability;
pub mod pipeline;
pub mod rewriter;
pub mod validator;

pub use capability::{normalize_profile, profiles, resolve_profile, CapabilityProfile, SamplerTypes};
pub use pipeline::{LegalizationPipeline, LegalizeRequest, LegalizeResult};
pub use rewriter::{rewrite, RewriteOutcome, RewriteRule};
pub use validator::validate;

/// Stage tag carried by validator and rewriter diagnostics.
pub const LEGALIZE_STAGE: &str = "legalize";
