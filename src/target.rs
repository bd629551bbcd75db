//! Public contract types (§6, §3 `DeobfuscatorContext`): the shape every
//! target pipeline is written against, independent of which target the
//! registry ultimately picks.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;

use crate::evaluator::Evaluator;
use crate::transform::TransformState;

/// §6 "Target contract" `meta` field.
#[derive(Debug, Clone, Copy)]
pub struct TargetMeta {
    pub id: &'static str,
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub tags: &'static [&'static str],
}

/// What a target's `detect` returns for one candidate tree (§4.4).
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub confidence: f64,
    pub details: String,
}

/// The per-level log sink a target writes through (§6 "log contract").
/// `info` is one line per transform; `debug` is per-node tracing, only
/// meaningful when the caller asked for it via `RunOptions::debug_logging`.
/// Both always go through the ambient `tracing` facade; `on_log`, when
/// present, additionally forwards the same text to the host's own channel
/// — the two are not mutually exclusive (§6).
pub struct DeobfuscatorContext<'a, 'ctx> {
    pub program: &'ctx mut Program<'a>,
    pub allocator: &'a Allocator,
    pub source: &'ctx str,
    pub state: &'ctx mut TransformState,
    pub evaluator: Option<&'ctx mut dyn Evaluator>,
    pub debug_logging: bool,
    pub on_log: Option<&'ctx dyn Fn(LogLevel, &str)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
}

impl<'a, 'ctx> DeobfuscatorContext<'a, 'ctx> {
    pub fn info(&self, message: &str) {
        tracing::info!(target: "js_deobfuscate::target", "{message}");
        if let Some(cb) = self.on_log {
            cb(LogLevel::Info, message);
        }
    }

    pub fn debug(&self, message: &str) {
        if self.debug_logging {
            tracing::debug!(target: "js_deobfuscate::target", "{message}");
            if let Some(cb) = self.on_log {
                cb(LogLevel::Debug, message);
            }
        }
    }
}

/// A named family of obfuscation and the pipeline that undoes it (§6).
pub trait Target {
    fn meta(&self) -> TargetMeta;

    /// Scores how confident this target is that `program` is its family.
    /// `None` means "no opinion" (distinct from a confidence of `0.0`,
    /// which the registry also treats as absent per §4.4).
    fn detect(&self, program: &Program<'_>, source: &str) -> Option<DetectionResult> {
        let _ = (program, source);
        None
    }

    /// Runs the pipeline against `ctx`, mutating `ctx.program` in place and
    /// crediting every change to `ctx.state`.
    fn run(&self, ctx: &mut DeobfuscatorContext<'_, '_>);

    /// Extra transforms the entry point auto-applies, in order, right
    /// after `run` returns — §6's optional `postTransforms` list. Default
    /// empty: every target currently in this crate does all of its work
    /// inside `run` itself and has nothing to contribute here.
    fn post_transforms(&self) -> &[fn(&mut DeobfuscatorContext<'_, '_>)] {
        &[]
    }
}
