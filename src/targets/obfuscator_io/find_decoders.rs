//! §4.5 step 3: locates decoder functions associated with a string array —
//! a one-parameter function whose body resolves to `array[index]`, with an
//! optional leading `index = index ± N;` offset reassignment. Handles both
//! a named top-level `function` declaration and the "IIFE returns an
//! anonymous decoder, bound by a `var`" shape of §8 scenario 1.
//!
//! Variant tagging (`DecoderVariant`) is metadata only here: decoding
//! itself is never replicated in Rust (§4.3's "the codec is the
//! obfuscator's, not ours" extends to keyed/base64 variants too — the
//! sandbox executes whatever the decoder's own body does), so every match
//! is currently tagged `Plain`. A future detector that distinguishes
//! keyed/base64-keyed bodies would only change this tag, not the
//! evaluation path.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

use crate::ast::predicate::unwrap_parens;
use crate::model::{DecoderDescriptor, DecoderVariant};

type Ctx<'a> = TraverseCtx<'a, ()>;

struct Finder<'n> {
    array_name: &'n str,
    found: Vec<DecoderDescriptor>,
}

impl<'a, 'n> Traverse<'a, ()> for Finder<'n> {
    fn enter_statement(&mut self, stmt: &mut Statement<'a>, _ctx: &mut Ctx<'a>) {
        match stmt {
            Statement::FunctionDeclaration(func) => {
                if let Some(id) = &func.id {
                    if decoder_shape_matches(func, self.array_name) {
                        self.found.push(DecoderDescriptor {
                            name: id.name.as_str().to_string(),
                            span: func.span,
                            array_name: self.array_name.to_string(),
                            variant: DecoderVariant::Plain,
                        });
                    }
                }
            }
            Statement::VariableDeclaration(decl) if decl.declarations.len() == 1 => {
                let declarator = &decl.declarations[0];
                let BindingPattern::BindingIdentifier(name) = &declarator.id else {
                    return;
                };
                let Some(init) = &declarator.init else {
                    return;
                };
                if let Some(func) = extract_zero_arg_iife_returned_function(init) {
                    if decoder_shape_matches(func, self.array_name) {
                        self.found.push(DecoderDescriptor {
                            name: name.name.as_str().to_string(),
                            span: decl.span,
                            array_name: self.array_name.to_string(),
                            variant: DecoderVariant::Plain,
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

fn extract_zero_arg_iife_returned_function<'a, 'b>(
    expr: &'b Expression<'a>,
) -> Option<&'b Function<'a>> {
    let Expression::CallExpression(call) = unwrap_parens(expr) else {
        return None;
    };
    if !call.arguments.is_empty() {
        return None;
    }
    let Expression::FunctionExpression(outer) = unwrap_parens(&call.callee) else {
        return None;
    };
    let body = outer.body.as_ref()?;
    for stmt in &body.statements {
        if let Statement::ReturnStatement(ret) = stmt {
            if let Some(Expression::FunctionExpression(inner)) = &ret.argument {
                return Some(inner);
            }
        }
    }
    None
}

fn decoder_shape_matches(func: &Function<'_>, array_name: &str) -> bool {
    if func.params.items.len() != 1 {
        return false;
    }
    let BindingPattern::BindingIdentifier(param) = &func.params.items[0].pattern else {
        return false;
    };
    let param_name = param.name.as_str();
    let Some(body) = &func.body else {
        return false;
    };
    match body.statements.len() {
        1 => matches_return_access(&body.statements[0], param_name, array_name),
        2 => {
            is_offset_reassignment(&body.statements[0], param_name)
                && matches_return_access(&body.statements[1], param_name, array_name)
        }
        _ => false,
    }
}

fn matches_return_access(stmt: &Statement<'_>, param_name: &str, array_name: &str) -> bool {
    let Statement::ReturnStatement(ret) = stmt else {
        return false;
    };
    let Some(Expression::ComputedMemberExpression(member)) = &ret.argument else {
        return false;
    };
    let Expression::Identifier(object) = &member.object else {
        return false;
    };
    if object.name.as_str() != array_name {
        return false;
    }
    match &member.expression {
        Expression::Identifier(id) => id.name.as_str() == param_name,
        Expression::BinaryExpression(bin) => {
            matches!(&bin.left, Expression::Identifier(id) if id.name.as_str() == param_name)
                && matches!(&bin.right, Expression::NumericLiteral(_))
        }
        _ => false,
    }
}

fn is_offset_reassignment(stmt: &Statement<'_>, param_name: &str) -> bool {
    let Statement::ExpressionStatement(expr_stmt) = stmt else {
        return false;
    };
    let Expression::AssignmentExpression(assign) = &expr_stmt.expression else {
        return false;
    };
    let AssignmentTarget::AssignmentTargetIdentifier(id) = &assign.left else {
        return false;
    };
    if id.name.as_str() != param_name {
        return false;
    }
    matches!(
        &assign.right,
        Expression::BinaryExpression(bin)
            if matches!(&bin.left, Expression::Identifier(i) if i.name.as_str() == param_name)
                && matches!(&bin.right, Expression::NumericLiteral(_))
    )
}

pub fn find<'a>(
    program: &mut Program<'a>,
    allocator: &'a Allocator,
    array_name: &str,
) -> Vec<DecoderDescriptor> {
    let mut finder = Finder {
        array_name,
        found: Vec::new(),
    };
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut finder, program, &mut ctx);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn finds_decoder_returned_from_iife() {
        let allocator = Allocator::default();
        let code = r#"var f = (function(){var A=["hello","world"];return function(i){return A[i];};})();"#;
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let found = find(&mut program, &allocator, "A");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "f");
    }

    #[test]
    fn finds_decoder_with_offset() {
        let allocator = Allocator::default();
        let code = "function dec(a) { a = a - 0x10; return arr[a]; }";
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let found = find(&mut program, &allocator, "arr");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "dec");
    }
}
