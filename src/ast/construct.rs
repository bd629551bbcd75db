//! Typed node construction helpers shared across transforms (§4.1).
//!
//! Mirrors the inline construction each transform already did ad hoc
//! (`Expression::StringLiteral(ctx.ast.alloc(StringLiteral { .. }))`) but
//! gathered in one place so every call site produces the same canonical
//! shape — `raw: None` so codegen always regenerates the cleanest
//! representation, `span: SPAN` since constructed nodes have no source
//! position of their own.

use oxc_allocator::CloneIn;
use oxc_ast::ast::*;
use oxc_span::SPAN;
use oxc_syntax::number::NumberBase;
use oxc_traverse::TraverseCtx;

pub fn string_literal<'a, S>(ctx: &mut TraverseCtx<'a, S>, value: &str) -> Expression<'a> {
    Expression::StringLiteral(ctx.ast.alloc(StringLiteral {
        span: SPAN,
        value: ctx.ast.atom(value),
        raw: None,
        lone_surrogates: false,
    }))
}

pub fn numeric_literal<'a, S>(ctx: &mut TraverseCtx<'a, S>, value: f64) -> Expression<'a> {
    let raw = if value.fract() == 0.0 {
        Some(ctx.ast.atom(&(value as i64).to_string()))
    } else {
        Some(ctx.ast.atom(&value.to_string()))
    };
    Expression::NumericLiteral(ctx.ast.alloc(NumericLiteral {
        span: SPAN,
        value,
        raw,
        base: NumberBase::Decimal,
    }))
}

pub fn identifier_reference<'a, S>(ctx: &mut TraverseCtx<'a, S>, name: &str) -> Expression<'a> {
    Expression::Identifier(ctx.ast.alloc(IdentifierReference {
        span: SPAN,
        name: ctx.ast.atom(name).into(),
        reference_id: Default::default(),
    }))
}

pub fn static_member<'a, S>(
    ctx: &mut TraverseCtx<'a, S>,
    object: Expression<'a>,
    property: &str,
) -> Expression<'a> {
    Expression::StaticMemberExpression(ctx.ast.alloc(StaticMemberExpression {
        span: SPAN,
        object,
        property: IdentifierName {
            span: SPAN,
            name: ctx.ast.atom(property).into(),
        },
        optional: false,
    }))
}

pub fn computed_member<'a, S>(
    ctx: &mut TraverseCtx<'a, S>,
    object: Expression<'a>,
    key: &str,
) -> Expression<'a> {
    let expression = string_literal(ctx, key);
    Expression::ComputedMemberExpression(ctx.ast.alloc(ComputedMemberExpression {
        span: SPAN,
        object,
        expression,
        optional: false,
    }))
}

pub fn empty_statement<'a, S>(ctx: &mut TraverseCtx<'a, S>) -> Statement<'a> {
    Statement::EmptyStatement(ctx.ast.alloc(EmptyStatement { span: SPAN }))
}

pub fn clone_expression<'a, S>(expr: &Expression<'a>, ctx: &mut TraverseCtx<'a, S>) -> Expression<'a> {
    expr.clone_in(ctx.ast.allocator)
}

pub fn clone_statement<'a, S>(stmt: &Statement<'a>, ctx: &mut TraverseCtx<'a, S>) -> Statement<'a> {
    stmt.clone_in(ctx.ast.allocator)
}
