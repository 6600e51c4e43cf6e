//! Test utilities for building small shader modules.
//!
//! Each factory returns a single-function module with entry point `main`,
//! mirroring the shapes the upstream lowering stage produces.
