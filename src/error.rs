//! Typed error hierarchy for the deobfuscation core (§7 of the design).
//!
//! Only the two fatal kinds — an unknown target id and a source buffer that
//! never became a tree — are represented here as a single enum meant to
//! bubble with `?`. `EvalError` and `PatternMismatch` are recoverable
//! per-call-site outcomes and are returned as `Option`/`Result` from the
//! probe or the evaluator that produced them, never as this type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeobfuscateError {
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    #[error("failed to parse source into a syntax tree: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, DeobfuscateError>;

/// A sandbox fragment could not be evaluated. Local to the call site that
/// requested it; never propagated past the transform that asked.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("evaluation threw: {0}")]
    Threw(String),

    #[error("evaluation did not produce a value")]
    NoValue,

    #[error("evaluated value could not be converted: {0}")]
    Conversion(String),
}

/// A probe expected one shape and found another. Never fatal; the
/// candidate under inspection is simply skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatternMismatch;

impl std::fmt::Display for PatternMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("pattern mismatch")
    }
}

/// A target's `detect` failed. Local to the registry: the target is
/// omitted from the detection list, never raised to the caller.
#[derive(Debug, Error)]
#[error("detection failed for target {target}: {message}")]
pub struct DetectionError {
    pub target: String,
    pub message: String,
}
