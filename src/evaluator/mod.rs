//! Bounded evaluator (§4.3): executes untrusted JavaScript fragments drawn
//! from the input program (a string-array IIFE, a decoder call) inside a
//! sandbox and returns the resulting value, or an [`EvalError`] that the
//! caller treats as "leave this node alone".
//!
//! Two backings implement [`Evaluator`]: [`boa_sandbox::BoaSandbox`], a
//! fully embedded engine seeded with the globals §4.3 describes, and
//! [`NullEvaluator`], modeling a host that has opted out of executing
//! arbitrary code entirely (the "reduced-capability shim" of §4.3(b) —
//! rather than a second, weaker interpreter, a host that genuinely cannot
//! or will not embed a JS engine gets an evaluator that always declines,
//! which every caller already has to handle as a normal `EvalError`
//! outcome). Both share one contract so transforms are agnostic to which
//! is wired in.

pub mod boa_sandbox;

use crate::error::EvalError;

/// A value that came back from the sandbox, reduced to the shapes the
/// transforms in this crate actually consume. Anything else (functions,
/// unrecognized objects) is reported as [`EvalError::Conversion`] rather
/// than silently coerced, since a caller asking "is this an array of
/// strings" needs to distinguish "no" from "couldn't tell".
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
    Array(Vec<EvalValue>),
}

impl EvalValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EvalValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array_of_strings(&self) -> Option<Vec<String>> {
        match self {
            EvalValue::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }
}

/// The sandbox contract (§6): a function from source text to an evaluated
/// value. Implementations must isolate from host state, provide the
/// globals listed in §4.3, and surface failures as `Err` rather than a
/// panic or an unwind.
pub trait Evaluator {
    /// Evaluates `fragment` as a JavaScript program and returns its
    /// completion value. Re-entrant: called once per decoder invocation
    /// within a single deobfuscation run, potentially thousands of times,
    /// so implementations should amortize setup (a fresh sandbox per run,
    /// not per call — §5).
    fn eval(&mut self, fragment: &str) -> Result<EvalValue, EvalError>;
}

/// Models a host that declined to embed a JavaScript engine. Every call
/// fails with [`EvalError::Threw`]; every transform that depends on the
/// evaluator already treats that as "leave this node unchanged", so a
/// pipeline run against this evaluator degrades to structural transforms
/// only (rotator, proxy inliner, member simplifier, module loader,
/// dead-code — none of which need to execute anything) while string
/// inlining becomes a no-op, matching "no evaluator provided" in §4.5.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvaluator;

impl Evaluator for NullEvaluator {
    fn eval(&mut self, _fragment: &str) -> Result<EvalValue, EvalError> {
        Err(EvalError::Threw(
            "no embedded evaluator is configured for this run".to_string(),
        ))
    }
}
