//! §4.6.1: the Abba string-array extractor. Visits every variable
//! declarator whose initializer is an IIFE taking at least one
//! string-literal argument, re-evaluates the IIFE's own source in the
//! sandbox with the declared variable's name pre-bound to `undefined`
//! (obfuscators occasionally reference their own target variable inside
//! the factory), and, when the result is an array, rewrites the
//! initializer to a literal array of strings. Anything else — a
//! non-array result, a thrown exception, an evaluator that isn't wired
//! in — leaves the declarator exactly as it was (§4.5's "leave this node
//! alone" failure semantics, unchanged here).
//!
//! The evaluator's own contract (§evaluator/mod.rs) asks implementations
//! to amortize sandbox setup across a whole run rather than per call;
//! this pass honors that by reusing the one evaluator handed in and
//! scoping each IIFE's variable bindings with a `var NAME = undefined;`
//! preamble instead of spinning up a fresh sandbox per declarator.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_span::{GetSpan, SPAN};
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

use crate::ast::predicate::{is_iife, unwrap_parens};
use crate::evaluator::Evaluator;

type Ctx<'a> = TraverseCtx<'a, ()>;

fn iife_has_string_arg(expr: &Expression<'_>) -> bool {
    let Expression::CallExpression(call) = expr else {
        return false;
    };
    call.arguments
        .iter()
        .filter_map(|a| a.as_expression())
        .any(|e| matches!(e, Expression::StringLiteral(_)))
}

fn array_expression_of<'a>(ctx: &mut Ctx<'a>, strings: &[String]) -> Expression<'a> {
    let mut elements = ctx.ast.vec();
    for s in strings {
        elements.push(ArrayExpressionElement::from(crate::ast::construct::string_literal(ctx, s)));
    }
    Expression::ArrayExpression(ctx.ast.alloc(ArrayExpression {
        span: SPAN,
        elements,
    }))
}

struct Extractor<'n, 'e> {
    source: &'n str,
    evaluator: &'e mut dyn Evaluator,
    changes: usize,
}

impl<'a, 'n, 'e> Traverse<'a, ()> for Extractor<'n, 'e> {
    fn exit_variable_declarator(&mut self, declarator: &mut VariableDeclarator<'a>, ctx: &mut Ctx<'a>) {
        let BindingPattern::BindingIdentifier(name) = &declarator.id else {
            return;
        };
        let Some(init) = &declarator.init else {
            return;
        };
        // Crockford-style IIFEs wrap the whole call in parens
        // (`(function(){}())`), not just the function
        // (`(function(){})()`) — unwrap before checking either shape.
        let unwrapped = unwrap_parens(init);
        if !is_iife(unwrapped) || !iife_has_string_arg(unwrapped) {
            return;
        }

        let iife_source = crate::ast::slice(self.source, init.span());
        let fragment = format!("var {} = undefined;\n({})", name.name.as_str(), iife_source);
        let Ok(value) = self.evaluator.eval(&fragment) else {
            return;
        };
        let Some(strings) = value.as_array_of_strings() else {
            return;
        };

        declarator.init = Some(array_expression_of(ctx, &strings));
        self.changes += 1;
    }
}

pub fn run<'a>(program: &mut Program<'a>, allocator: &'a Allocator, source: &str, evaluator: &mut dyn Evaluator) -> usize {
    let mut extractor = Extractor {
        source,
        evaluator,
        changes: 0,
    };
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut extractor, program, &mut ctx);
    extractor.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::boa_sandbox::BoaSandbox;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn rewrites_iife_to_string_array() {
        let allocator = Allocator::default();
        let source = r#"var strs = (function(seed){ return ["alpha","beta","gamma"]; })("x");"#;
        let mut program = Parser::new(&allocator, source, SourceType::mjs()).parse().program;
        let mut sandbox = BoaSandbox::new().expect("sandbox");
        let changes = run(&mut program, &allocator, source, &mut sandbox);
        assert_eq!(changes, 1);
        let code = crate::ast::codegen(&program);
        assert!(code.contains("\"alpha\""));
        assert!(code.contains("\"beta\""));
        assert!(code.contains("\"gamma\""));
        assert!(!code.contains("function"));
    }

    #[test]
    fn leaves_non_array_result_untouched() {
        let allocator = Allocator::default();
        let source = r#"var strs = (function(seed){ return "not an array"; })("x");"#;
        let mut program = Parser::new(&allocator, source, SourceType::mjs()).parse().program;
        let mut sandbox = BoaSandbox::new().expect("sandbox");
        let changes = run(&mut program, &allocator, source, &mut sandbox);
        assert_eq!(changes, 0);
        assert!(crate::ast::codegen(&program).contains("function"));
    }

    #[test]
    fn rewrites_crockford_style_iife_to_string_array() {
        let allocator = Allocator::default();
        let source = r#"var _0x1 = (function(a, b) { return ["alpha", "beta"]; }(this, 0x42));"#;
        let mut program = Parser::new(&allocator, source, SourceType::mjs()).parse().program;
        let mut sandbox = BoaSandbox::new().expect("sandbox");
        let changes = run(&mut program, &allocator, source, &mut sandbox);
        assert_eq!(changes, 1);
        let code = crate::ast::codegen(&program);
        assert!(code.contains("\"alpha\""));
        assert!(code.contains("\"beta\""));
        assert!(!code.contains("function"));
    }

    #[test]
    fn leaves_non_iife_declarators_untouched() {
        let allocator = Allocator::default();
        let source = "var strs = [\"alpha\", \"beta\"];";
        let mut program = Parser::new(&allocator, source, SourceType::mjs()).parse().program;
        let mut sandbox = BoaSandbox::new().expect("sandbox");
        let changes = run(&mut program, &allocator, source, &mut sandbox);
        assert_eq!(changes, 0);
    }
}
