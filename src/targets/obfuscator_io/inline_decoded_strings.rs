//! §4.5 step 6: the VM decoder. Rather than reimplement whatever codec the
//! decoder functions use, this feeds the evaluator the obfuscator's own
//! array/rotator/decoder source (sliced verbatim from the original buffer,
//! §4.1) as a one-time setup, then re-evaluates each decoder call site
//! directly in that same sandbox and substitutes the literal it returns.
//! A call that fails to evaluate — wrong arity, the decoder referenced
//! something the sandbox doesn't provide, a thrown exception — is left
//! untouched (§4.5 "Failure semantics").

use std::collections::HashSet;

use oxc_ast::ast::*;
use oxc_span::{GetSpan, Span};
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

use crate::ast::construct;
use crate::evaluator::Evaluator;
use crate::model::{DecoderDescriptor, StringArrayDescriptor};

type Ctx<'a> = TraverseCtx<'a, ()>;

/// Evaluates the setup fragment once. Returns `false` (leaving every call
/// site untouched) if the obfuscator's own declarations don't even
/// bootstrap cleanly.
fn bootstrap(
    evaluator: &mut dyn Evaluator,
    source: &str,
    array: &StringArrayDescriptor,
    rotator_span: Option<Span>,
    decoders: &[DecoderDescriptor],
) -> bool {
    let mut seen = HashSet::new();
    let mut setup = String::new();
    let mut push = |span: Span| {
        let key = (span.start, span.end);
        if seen.insert(key) {
            setup.push_str(crate::ast::slice(source, span));
            setup.push_str(";\n");
        }
    };
    push(array.span);
    if let Some(span) = rotator_span {
        push(span);
    }
    for decoder in decoders {
        push(decoder.span);
    }
    evaluator.eval(&setup).is_ok()
}

struct Inliner<'n, 'e> {
    decoder_names: &'n HashSet<&'n str>,
    source: &'n str,
    evaluator: &'e mut dyn Evaluator,
    changes: usize,
}

impl<'a, 'n, 'e> Traverse<'a, ()> for Inliner<'n, 'e> {
    fn exit_expression(&mut self, expr: &mut Expression<'a>, ctx: &mut Ctx<'a>) {
        let Expression::CallExpression(call) = expr else {
            return;
        };
        let Expression::Identifier(callee) = &call.callee else {
            return;
        };
        if !self.decoder_names.contains(callee.name.as_str()) {
            return;
        }

        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            let Some(arg_expr) = arg.as_expression() else {
                return;
            };
            args.push(crate::ast::slice(self.source, arg_expr.span()).to_string());
        }

        let fragment = format!("{}({})", callee.name.as_str(), args.join(", "));
        let Ok(value) = self.evaluator.eval(&fragment) else {
            return;
        };
        let Some(literal) = value.as_str() else {
            return;
        };

        *expr = construct::string_literal(ctx, literal);
        self.changes += 1;
    }
}

/// Runs the bootstrap once, then replaces every call site. Returns the
/// number of calls inlined; `0` whenever bootstrap fails or no call site
/// matches.
pub fn inline<'a>(
    program: &mut Program<'a>,
    allocator: &'a oxc_allocator::Allocator,
    source: &str,
    array: &StringArrayDescriptor,
    rotator_span: Option<Span>,
    decoders: &[DecoderDescriptor],
    evaluator: &mut dyn Evaluator,
) -> usize {
    if decoders.is_empty() || !bootstrap(evaluator, source, array, rotator_span, decoders) {
        return 0;
    }

    let decoder_names: HashSet<&str> = decoders.iter().map(|d| d.name.as_str()).collect();
    let mut inliner = Inliner {
        decoder_names: &decoder_names,
        source,
        evaluator,
        changes: 0,
    };
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut inliner, program, &mut ctx);
    inliner.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::boa_sandbox::BoaSandbox;
    use crate::model::DecoderVariant;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn inlines_happy_path_decoder_calls() {
        let allocator = Allocator::default();
        let source = r#"var f = (function(){var A=["hello","world"];return function(i){return A[i];};})(); console.log(f(0)+" "+f(1));"#;
        let mut program = Parser::new(&allocator, source, SourceType::mjs())
            .parse()
            .program;

        let array = crate::targets::obfuscator_io::find_string_array::find(&mut program, &allocator)
            .expect("array found");
        let decoders =
            crate::targets::obfuscator_io::find_decoders::find(&mut program, &allocator, &array.name);
        assert_eq!(decoders.len(), 1);

        let mut sandbox = BoaSandbox::new().expect("sandbox");
        let changes = inline(&mut program, &allocator, source, &array, None, &decoders, &mut sandbox);
        assert_eq!(changes, 2);

        let code = crate::ast::codegen(&program);
        assert!(code.contains("\"hello\""));
        assert!(code.contains("\"world\""));
        let _ = DecoderVariant::Plain;
    }
}
