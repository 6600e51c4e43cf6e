// This module is the hub for fxlegalize's shared infrastructure: the error type
// for contract violations (empty or malformed input, missing files), the per-call
// statistics record, and test-only module factories used by the unit tests of
// the ir and legalize modules.

//! Core infrastructure shared by the IR and legalization modules.
//!
//! ## Errors (`error`)
//! - `LegalizeError` for contract violations; findings are diagnostics instead
//!
//! ## Statistics (`session`)
//! - `LegalizeStats` rewrite and diagnostic counters for one call

pub mod error;
pub mod session;
pub mod test_utils;

pub use error::{LegalizeError, Result};
pub use session::LegalizeStats;
