//! The deobfuscation entry (§6 `runDeobfuscation`): resolves a target via
//! the registry, builds the evaluator and context the options describe,
//! and runs the target's pipeline to completion.

use oxc_allocator::Allocator;

use crate::error::{DeobfuscateError, Result};
use crate::evaluator::{boa_sandbox::BoaSandbox, Evaluator, NullEvaluator};
use crate::registry::TargetRegistry;
use crate::run_options::{EvaluatorKind, RunOptions, TargetSelection};
use crate::target::DeobfuscatorContext;
use crate::transform::TransformState;

/// Parses `source`, resolves a target per §4.4's resolution order, and
/// runs it. Returns the accumulated `TransformState` — `changes == 0` when
/// no target matched, matching "the target is a no-op" (§4.5).
pub fn run_deobfuscation(
    source: &str,
    options: &RunOptions,
    registry: &TargetRegistry,
) -> Result<TransformState> {
    let allocator = Allocator::default();
    let mut program = crate::ast::parse(&allocator, source)?;
    let mut state = TransformState::new();

    let target_id = resolve_target(&mut program, source, options, registry)?;
    let Some(target_id) = target_id else {
        return Ok(state);
    };
    let target = registry
        .get(target_id)
        .expect("resolve_target only returns registered ids");

    let mut boa_holder = match options.evaluator {
        EvaluatorKind::Boa => Some(
            BoaSandbox::new()
                .map_err(|e| DeobfuscateError::Parse(format!("sandbox bootstrap: {e}")))?,
        ),
        EvaluatorKind::Null => None,
    };
    let mut null_holder = NullEvaluator;
    let evaluator: &mut dyn Evaluator = match &mut boa_holder {
        Some(boa) => boa,
        None => &mut null_holder,
    };

    let mut ctx = DeobfuscatorContext {
        program: &mut program,
        allocator: &allocator,
        source,
        state: &mut state,
        evaluator: Some(evaluator),
        debug_logging: options.debug_logging,
        on_log: options.on_log.as_deref(),
    };
    target.run(&mut ctx);
    for post_transform in target.post_transforms() {
        post_transform(&mut ctx);
    }

    Ok(state)
}

fn resolve_target<'a>(
    program: &mut oxc_ast::ast::Program<'a>,
    source: &str,
    options: &RunOptions,
    registry: &'a TargetRegistry,
) -> Result<Option<&'static str>> {
    match &options.target {
        TargetSelection::Skip => Ok(None),
        TargetSelection::Id(id) => {
            if registry.has(id) {
                Ok(registry.get(id).map(|t| t.meta().id))
            } else {
                Err(DeobfuscateError::UnknownTarget(id.clone()))
            }
        }
        TargetSelection::Auto | TargetSelection::AutoWithDefault => {
            let detected = registry.detect(program, source);
            if let Some((id, result)) = detected.first() {
                if result.confidence >= options.threshold {
                    return Ok(Some(id));
                }
            }
            if matches!(options.target, TargetSelection::AutoWithDefault) {
                Ok(registry.default_target().map(|t| t.meta().id))
            } else {
                Ok(None)
            }
        }
    }
}
