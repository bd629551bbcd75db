//! `RunOptions` (§3, §10): the single configuration surface accepted by
//! the deobfuscation entry point. Plain, serializable-shaped data so a
//! host's own config layer can produce one — no file-based layer of its
//! own, matching §10's "Configuration" note.

use std::fmt;
use std::sync::Arc;

use crate::target::LogLevel;

/// §6 `target` option: `true` (auto, falling back to the registered
/// default), `false` (skip entirely), `"auto"` (detect, no fallback), or a
/// specific target id.
#[derive(Debug, Clone, Default)]
pub enum TargetSelection {
    #[default]
    AutoWithDefault,
    Skip,
    Auto,
    Id(String),
}

/// Which [`crate::evaluator::Evaluator`] backing the entry constructs.
/// `Null` is not "no evaluator was requested" so much as "the evaluator
/// that always declines" (`NullEvaluator`'s own doc comment) — selecting
/// it is how a host opts a run out of executing any sandboxed code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvaluatorKind {
    #[default]
    Boa,
    Null,
}

#[derive(Clone)]
pub struct RunOptions {
    pub target: TargetSelection,
    pub threshold: f64,
    pub evaluator: EvaluatorKind,
    pub on_log: Option<Arc<dyn Fn(LogLevel, &str) + Send + Sync>>,
    pub debug_logging: bool,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            target: TargetSelection::AutoWithDefault,
            threshold: 0.3,
            evaluator: EvaluatorKind::Boa,
            on_log: None,
            debug_logging: false,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("target", &self.target)
            .field("threshold", &self.threshold)
            .field("evaluator", &self.evaluator)
            .field("on_log", &self.on_log.as_ref().map(|_| "<callback>"))
            .field("debug_logging", &self.debug_logging)
            .finish()
    }
}
