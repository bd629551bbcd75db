//! §4.5 step 4 (and the `controlFlowObject` member of the cleanup quartet,
//! §4.5 step 8): collapses a constant-object dispatcher — a single
//! declarator whose initializer is an object literal mapping string/ident
//! keys to single-statement functions each returning a literal — into the
//! literal value at every call site `dispatcher["key"]()`. Generalizes the
//! teacher's `dispatcher_inline` (no behavioral change needed; the pattern
//! is already target-agnostic) into this crate's plain `()` traversal
//! state instead of the teacher's `DeobfuscateState`.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_span::SPAN;
use oxc_syntax::number::NumberBase;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};
use rustc_hash::FxHashMap;

type Ctx<'a> = TraverseCtx<'a, ()>;

#[derive(Debug, Clone)]
enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Identifier(String),
}

fn literal_of(expr: &Expression<'_>) -> Option<Literal> {
    match expr {
        Expression::NumericLiteral(lit) => Some(Literal::Number(lit.value)),
        Expression::StringLiteral(lit) => Some(Literal::String(lit.value.to_string())),
        Expression::BooleanLiteral(lit) => Some(Literal::Bool(lit.value)),
        Expression::NullLiteral(_) => Some(Literal::Null),
        Expression::Identifier(ident) => Some(Literal::Identifier(ident.name.to_string())),
        _ => None,
    }
}

fn single_return_literal(body: &FunctionBody<'_>) -> Option<Literal> {
    if body.statements.len() != 1 {
        return None;
    }
    match &body.statements[0] {
        Statement::ReturnStatement(ret) => ret.argument.as_ref().and_then(literal_of),
        _ => None,
    }
}

fn single_expression_literal(arrow: &ArrowFunctionExpression<'_>) -> Option<Literal> {
    if arrow.body.statements.len() != 1 {
        return None;
    }
    match &arrow.body.statements[0] {
        Statement::ExpressionStatement(expr) => literal_of(&expr.expression),
        Statement::ReturnStatement(ret) => ret.argument.as_ref().and_then(literal_of),
        _ => None,
    }
}

fn detect_dispatcher(decl: &VariableDeclaration<'_>) -> Option<(String, FxHashMap<String, Literal>)> {
    if decl.declarations.len() != 1 {
        return None;
    }
    let declarator = &decl.declarations[0];
    let BindingPattern::BindingIdentifier(name) = &declarator.id else {
        return None;
    };
    let Some(Expression::ObjectExpression(obj)) = &declarator.init else {
        return None;
    };

    let mut entries = FxHashMap::default();
    for prop in &obj.properties {
        let ObjectPropertyKind::ObjectProperty(p) = prop else {
            continue;
        };
        let key = match &p.key {
            PropertyKey::StringLiteral(s) => s.value.to_string(),
            PropertyKey::Identifier(id) => id.name.to_string(),
            _ => continue,
        };
        let value = match &p.value {
            Expression::FunctionExpression(f) => f.body.as_ref().and_then(|b| single_return_literal(b)),
            Expression::ArrowFunctionExpression(a) => single_expression_literal(a),
            _ => None,
        };
        if let Some(value) = value {
            entries.insert(key, value);
        }
    }
    if entries.is_empty() {
        return None;
    }
    Some((name.name.as_str().to_string(), entries))
}

fn literal_expression<'a>(literal: &Literal, ctx: &mut Ctx<'a>) -> Expression<'a> {
    match literal {
        Literal::Number(n) => Expression::NumericLiteral(ctx.ast.alloc(NumericLiteral {
            span: SPAN,
            value: *n,
            raw: None,
            base: NumberBase::Decimal,
        })),
        Literal::String(s) => crate::ast::construct::string_literal(ctx, s),
        Literal::Bool(b) => Expression::BooleanLiteral(ctx.ast.alloc(BooleanLiteral { span: SPAN, value: *b })),
        Literal::Null => Expression::NullLiteral(ctx.ast.alloc(NullLiteral { span: SPAN })),
        Literal::Identifier(name) => crate::ast::construct::identifier_reference(ctx, name),
    }
}

/// `pub(crate)` so the step-8 cleanup quartet in `obfuscator_io::mod` can
/// compose this visitor with its siblings through `transform::apply_transforms_no_scope`
/// instead of going through [`run`]'s own standalone `crawl`.
#[derive(Default)]
pub(crate) struct Pass {
    dispatchers: FxHashMap<String, FxHashMap<String, Literal>>,
    pub(crate) changes: usize,
}

impl<'a> Traverse<'a, ()> for Pass {
    fn enter_statement(&mut self, stmt: &mut Statement<'a>, _ctx: &mut Ctx<'a>) {
        if let Statement::VariableDeclaration(decl) = stmt {
            if let Some((name, entries)) = detect_dispatcher(decl) {
                self.dispatchers.insert(name, entries);
            }
        }
    }

    fn exit_expression(&mut self, expr: &mut Expression<'a>, ctx: &mut Ctx<'a>) {
        let Expression::CallExpression(call) = expr else {
            return;
        };
        if !call.arguments.is_empty() {
            return;
        }
        let Expression::ComputedMemberExpression(member) = &call.callee else {
            return;
        };
        let Expression::Identifier(object) = &member.object else {
            return;
        };
        let Some(dispatcher) = self.dispatchers.get(object.name.as_str()) else {
            return;
        };
        let Expression::StringLiteral(key) = &member.expression else {
            return;
        };
        let Some(literal) = dispatcher.get(key.value.as_str()) else {
            return;
        };
        *expr = literal_expression(literal, ctx);
        self.changes += 1;
    }
}

pub fn run<'a>(program: &mut Program<'a>, allocator: &'a Allocator) -> usize {
    let mut pass = Pass {
        dispatchers: FxHashMap::default(),
        changes: 0,
    };
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut pass, program, &mut ctx);
    pass.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn run_code(code: &str) -> (String, usize) {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        (crate::ast::codegen(&program), changes)
    }

    #[test]
    fn inlines_constant_dispatcher_call() {
        let (code, changes) = run_code(r#"var d = { "a": function() { return 42; } }; var x = d["a"]();"#);
        assert_eq!(changes, 1);
        assert!(code.contains("42"));
        assert!(!code.contains("d[\"a\"]()"));
    }

    #[test]
    fn leaves_non_constant_dispatcher_untouched() {
        let (code, changes) = run_code(r#"var d = { "a": function(x) { return x + 1; } }; var y = d["a"](5);"#);
        assert_eq!(changes, 0);
        assert!(code.contains("d[\"a\"]"));
    }
}
