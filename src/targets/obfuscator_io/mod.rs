//! §4.5: the javascript-obfuscator ("obfuscator.io") target pipeline.
//! Each numbered step below matches the spec section of the same name;
//! every step is its own submodule so the pipeline itself reads as a flat
//! list of calls, the same shape the teacher's `AstDeobfuscator::deobfuscate`
//! uses for its own pass list (§4.2's `TransformRunner` doc comment).

pub mod control_flow_switch;
pub mod find_decoders;
pub mod find_string_array;
pub mod inline_decoded_strings;
pub mod inline_decoder_wrappers;
pub mod inline_object_props;
pub mod merge_strings;

use std::collections::HashSet;

use oxc_ast::ast::*;
use oxc_span::{GetSpan, Span};
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

use crate::model::DecoderDescriptor;
use crate::target::{DeobfuscatorContext, DetectionResult, Target, TargetMeta};
use crate::transform::apply_transforms_no_scope;

type Ctx<'a> = TraverseCtx<'a, ()>;

pub struct ObfuscatorIoTarget;

impl Target for ObfuscatorIoTarget {
    fn meta(&self) -> TargetMeta {
        TargetMeta {
            id: "obfuscator-io",
            name: "obfuscator.io",
            description: Some(
                "Undoes javascript-obfuscator's string-array/rotator/decoder/dispatcher runtime template.",
            ),
            tags: &["string-array", "decoder", "dispatcher", "obfuscator-io"],
        }
    }

    fn detect(&self, program: &Program<'_>, _source: &str) -> Option<DetectionResult> {
        if scan_for_string_array(&program.body) {
            Some(DetectionResult {
                confidence: 0.5,
                details: "found a single-declarator array of string literals".to_string(),
            })
        } else {
            Some(DetectionResult {
                confidence: 0.0,
                details: "no string-array declaration found".to_string(),
            })
        }
    }

    fn run(&self, ctx: &mut DeobfuscatorContext<'_, '_>) {
        let program = &mut *ctx.program;
        let allocator = ctx.allocator;

        // Step 1: locate the canonical string array.
        let Some(array) = find_string_array::find(program, allocator) else {
            ctx.info("no string array found, nothing to do");
            return;
        };
        ctx.info(&format!("found string array '{}' ({} entries)", array.name, array.strings.len()));

        // Step 2: locate (but do not apply) the rotator IIFE; obfuscator.io
        // lets the sandbox execute the obfuscator's own rotation arithmetic
        // rather than replaying it here (§4.3).
        let rotator = rotator_detect(program, &array.name);
        if let Some((_, span, count)) = rotator {
            ctx.debug(&format!("found rotator IIFE, rotation count {count}"));
            let _ = span;
        }

        // Step 3: locate decoder functions keyed off the array.
        let decoders: Vec<DecoderDescriptor> = find_decoders::find(program, allocator, &array.name);
        ctx.info(&format!("found {} decoder(s)", decoders.len()));

        // Step 4: inline constant object dispatchers.
        let dispatcher_changes = inline_object_props::run(program, allocator);
        ctx.state.record(dispatcher_changes);
        ctx.debug(&format!("inlined {dispatcher_changes} dispatcher call(s)"));

        // Step 5: collapse thin wrapper functions around the decoders so
        // every remaining call site reaches a decoder directly.
        let decoder_names: HashSet<&str> = decoders.iter().map(|d| d.name.as_str()).collect();
        let wrapper_changes = inline_decoder_wrappers::run(program, allocator, &decoder_names);
        ctx.state.record(wrapper_changes);
        ctx.debug(&format!("inlined {wrapper_changes} decoder wrapper call(s)"));

        // Step 6: the VM decoder — evaluate each decoder call in a sandbox
        // bootstrapped from the obfuscator's own source, substituting the
        // literal it returns.
        if let Some(evaluator) = ctx.evaluator.as_deref_mut() {
            let decode_changes = inline_decoded_strings::inline(
                program,
                allocator,
                ctx.source,
                &array,
                rotator.map(|(_, span, _)| span),
                &decoders,
                evaluator,
            );
            ctx.state.record(decode_changes);
            ctx.info(&format!("inlined {decode_changes} decoder call(s)"));
        } else {
            ctx.info("no evaluator available, decoder calls left untouched");
        }

        // Step 7: remove the array declaration, rotator IIFE, and decoder
        // declarations now that their calls have been inlined. The credited
        // count deliberately does not track literal statements removed —
        // `2 + decoders.len()` is the fixed accounting this pipeline has
        // always used for this step (§9 open question b).
        let mut dead_spans: HashSet<(u32, u32)> = HashSet::new();
        dead_spans.insert((array.span.start, array.span.end));
        if let Some((_, span, _)) = rotator {
            dead_spans.insert((span.start, span.end));
        }
        for decoder in &decoders {
            dead_spans.insert((decoder.span.start, decoder.span.end));
        }
        remove_spans(program, allocator, &dead_spans);
        ctx.state.record(2 + decoders.len());

        // Step 8: cleanup quartet — mergeStrings, deadCode, controlFlowObject,
        // controlFlowSwitch. The three structural rewrites (merge, object
        // dispatcher, switch unflatten) are self-contained literal rewrites
        // that don't depend on each other's scope bookkeeping, so they run
        // together through a single `noScope` pass (§4.2) instead of each
        // rebuilding semantic analysis from scratch. `deadCode` stays its
        // own step: its fixpoint needs freshly rebuilt reference counts
        // after every removal, which a shared no-scope ctx can't give it.
        let mut merger = merge_strings::Merger::default();
        let mut object_pass = inline_object_props::Pass::default();
        let mut switch_pass = control_flow_switch::Unflattener::default();
        apply_transforms_no_scope(
            program,
            &mut [&mut merger, &mut object_pass, &mut switch_pass],
            (),
            allocator,
        );
        let merge_changes = merger.changes;
        let control_flow_object_changes = object_pass.changes;
        let control_flow_switch_changes = switch_pass.changes;
        ctx.state.record(merge_changes + control_flow_object_changes + control_flow_switch_changes);

        let dead_code_changes = crate::dead_code::remove_dead_bindings(program, allocator);
        ctx.state.record(dead_code_changes);

        ctx.info(&format!(
            "cleanup: {merge_changes} merge, {dead_code_changes} dead-code, \
             {control_flow_object_changes} control-flow-object, {control_flow_switch_changes} control-flow-switch"
        ));
    }
}

fn rotator_detect(program: &Program<'_>, array_name: &str) -> Option<(usize, Span, usize)> {
    crate::targets::rotator::detect(program, array_name)
}

struct Remover<'s> {
    dead_spans: &'s HashSet<(u32, u32)>,
    removed: usize,
}

impl<'a, 's> Traverse<'a, ()> for Remover<'s> {
    fn exit_statement(&mut self, stmt: &mut Statement<'a>, ctx: &mut Ctx<'a>) {
        let span = stmt.span();
        if self.dead_spans.contains(&(span.start, span.end)) {
            *stmt = crate::ast::construct::empty_statement(ctx);
            self.removed += 1;
        }
    }
}

fn remove_spans<'a>(program: &mut Program<'a>, allocator: &'a oxc_allocator::Allocator, dead_spans: &HashSet<(u32, u32)>) {
    if dead_spans.is_empty() {
        return;
    }
    let mut remover = Remover {
        dead_spans,
        removed: 0,
    };
    let mut traverse_ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut remover, program, &mut traverse_ctx);
}

/// Read-only structural scan mirroring `find_string_array`'s shape test,
/// used by `detect` where the trait signature only hands back `&Program`
/// (no traversal context to mutate through). Recurses into blocks,
/// function bodies, and IIFE callees the same way `rotator::mentions_member_call`
/// does, since the array is often nested inside the decoder's own IIFE
/// (§8 scenario 1) rather than declared at module scope.
fn scan_for_string_array(stmts: &oxc_allocator::Vec<'_, Statement<'_>>) -> bool {
    stmts.iter().any(statement_has_string_array)
}

fn statement_has_string_array(stmt: &Statement<'_>) -> bool {
    match stmt {
        Statement::VariableDeclaration(decl) => {
            if declaration_is_string_array(decl) {
                return true;
            }
            decl.declarations
                .iter()
                .filter_map(|d| d.init.as_ref())
                .any(expression_has_string_array)
        }
        Statement::ExpressionStatement(expr_stmt) => expression_has_string_array(&expr_stmt.expression),
        Statement::BlockStatement(block) => scan_for_string_array(&block.body),
        Statement::ReturnStatement(ret) => ret.argument.as_ref().is_some_and(expression_has_string_array),
        Statement::FunctionDeclaration(func) => func
            .body
            .as_ref()
            .is_some_and(|body| scan_for_string_array(&body.statements)),
        _ => false,
    }
}

fn declaration_is_string_array(decl: &VariableDeclaration<'_>) -> bool {
    if decl.declarations.len() != 1 {
        return false;
    }
    let Some(Expression::ArrayExpression(array)) = &decl.declarations[0].init else {
        return false;
    };
    !array.elements.is_empty()
        && array
            .elements
            .iter()
            .all(|e| matches!(e.as_expression(), Some(Expression::StringLiteral(_))))
}

fn expression_has_string_array(expr: &Expression<'_>) -> bool {
    match crate::ast::predicate::unwrap_parens(expr) {
        Expression::FunctionExpression(func) => func
            .body
            .as_ref()
            .is_some_and(|body| scan_for_string_array(&body.statements)),
        Expression::CallExpression(call) => {
            expression_has_string_array(&call.callee)
                || call
                    .arguments
                    .iter()
                    .filter_map(|a| a.as_expression())
                    .any(expression_has_string_array)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::boa_sandbox::BoaSandbox;
    use crate::transform::TransformState;
    use oxc_allocator::Allocator;

    #[test]
    fn detects_string_array_nested_in_iife() {
        let allocator = Allocator::default();
        let source = r#"var f = (function(){var A=["hello","world"];return function(i){return A[i];};})();"#;
        let program = crate::ast::parse(&allocator, source).expect("parses");
        let target = ObfuscatorIoTarget;
        let detection = target.detect(&program, source).expect("some opinion");
        assert!(detection.confidence > 0.0);
    }

    #[test]
    fn full_pipeline_inlines_decoder_calls() {
        let allocator = Allocator::default();
        let source = r#"var f = (function(){var A=["hello","world"];return function(i){return A[i];};})(); console.log(f(0)+" "+f(1));"#;
        let mut program = crate::ast::parse(&allocator, source).expect("parses");
        let mut state = TransformState::new();
        let mut sandbox = BoaSandbox::new().expect("sandbox");
        let mut ctx = DeobfuscatorContext {
            program: &mut program,
            allocator: &allocator,
            source,
            state: &mut state,
            evaluator: Some(&mut sandbox),
            debug_logging: false,
            on_log: None,
        };
        ObfuscatorIoTarget.run(&mut ctx);
        let code = crate::ast::codegen(&program);
        assert!(code.contains("\"hello\""));
        assert!(code.contains("\"world\""));
        assert!(state.changes > 0);
    }
}
