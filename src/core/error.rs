// This module defines the error types for fxlegalize using the thiserror crate.
// LegalizeError covers contract violations only: empty input, a missing input
// file, I/O failures and malformed IR JSON. Capability violations and invariant
// failures are never errors here; they are reported as diagnostics on the module.
// The module also provides Result<T> as a convenience alias.

//! Error types for the legalizer.
//!
//! Using thiserror for idiomatic error handling.

use std::path::PathBuf;
use thiserror::Error;

/// Contract violations that abort an operation before legalization runs.
#[derive(Error, Debug)]
pub enum LegalizeError {
    #[error("Input IR JSON is empty")]
    EmptyInput,

    #[error("Input file not found: {}", path.display())]
    InputNotFound {
        path: PathBuf,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse IR JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for legalizer operations.
pub type Result<T> = std::result::Result<T, LegalizeError>;
