//! String-array rotation, shared by both pipelines (§4.6.2; referenced by
//! §4.5 step 2 as "the IIFE that pre-rotates the array"). Generalized from
//! the teacher's `_0x`-prefixed detector into a name-driven match: the
//! caller already knows which array it is looking for (from
//! `find_string_array`), so this only needs to confirm the IIFE shape and
//! extract the count, not guess the array's identity from its name.

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_span::SPAN;

use crate::ast::predicate::unwrap_parens;
use crate::model::RotatorDescriptor;

/// Scans `program`'s top-level statements for an IIFE matching §4.6.2's
/// shape against `array_name`, rotates that array's element list in place,
/// and removes the IIFE statement. Returns `None` (leaving the tree
/// untouched) if no such IIFE is found — absence is non-fatal (§4.5 step 2).
/// Detection only: finds the rotator IIFE and its count without mutating
/// anything. Used by the obfuscator.io pipeline, which leaves rotation to
/// the sandbox executing the obfuscator's own IIFE verbatim rather than
/// replaying the arithmetic in Rust (§4.3's "the codec is the obfuscator's,
/// not ours" applies just as much to a rotation as to a decoder).
pub fn detect(program: &Program<'_>, array_name: &str) -> Option<(usize, Span, usize)> {
    for (index, stmt) in program.body.iter().enumerate() {
        let Statement::ExpressionStatement(expr_stmt) = stmt else {
            continue;
        };
        if let Some(count) = match_rotator_call(&expr_stmt.expression, array_name) {
            return Some((index, expr_stmt.span, count));
        }
    }
    None
}

/// Detects, structurally rotates the array's element list, and removes the
/// IIFE statement — the Abba pipeline's own "unsafe" structural rewrite
/// (§4.6.2), as opposed to the obfuscator.io pipeline's evaluator-driven
/// approach which only needs [`detect`].
pub fn find_and_apply<'a>(
    program: &mut Program<'a>,
    allocator: &'a Allocator,
    array_name: &str,
) -> Option<RotatorDescriptor> {
    let (index, span, rotation_count) = detect(program, array_name)?;

    for stmt in program.body.iter_mut() {
        if let Statement::VariableDeclaration(decl) = stmt {
            for declarator in decl.declarations.iter_mut() {
                if !declares(&declarator.id, array_name) {
                    continue;
                }
                if let Some(Expression::ArrayExpression(array)) = &mut declarator.init {
                    rotate_in_place(array, rotation_count);
                }
            }
        }
    }

    program.body[index] = Statement::EmptyStatement(allocator.alloc(EmptyStatement { span: SPAN }));

    Some(RotatorDescriptor {
        span,
        rotation_count,
    })
}

fn declares(pattern: &BindingPattern<'_>, name: &str) -> bool {
    matches!(pattern, BindingPattern::BindingIdentifier(id) if id.name.as_str() == name)
}

/// `array.elements.remove(0); array.elements.push(removed)`, repeated
/// `rotation mod length` times (rotate-left), matching §4.6.2 and §8's
/// rotation-correctness invariant.
fn rotate_in_place(array: &mut ArrayExpression<'_>, rotation_count: usize) {
    let len = array.elements.len();
    if len == 0 {
        return;
    }
    for _ in 0..(rotation_count % len) {
        let first = array.elements.remove(0);
        array.elements.push(first);
    }
}

/// `(function(e,f){ ... }(arrayIdent, countLiteral))`: exactly two
/// parameters, body mentions both `push` and `shift`, first argument an
/// identifier equal to `array_name`, second a numeric literal. If any call
/// inside the body passes a prefix `++` of the second parameter as its
/// first argument, the detected count is bumped by one (§4.6.2).
fn match_rotator_call(expr: &Expression<'_>, array_name: &str) -> Option<usize> {
    let Expression::CallExpression(call) = unwrap_parens(expr) else {
        return None;
    };
    let callee = unwrap_parens(&call.callee);
    let func = match callee {
        Expression::FunctionExpression(f) => f,
        _ => return None,
    };
    if func.params.items.len() != 2 {
        return None;
    }
    let count_param_name = match &func.params.items[1].pattern {
        BindingPattern::BindingIdentifier(id) => id.name.as_str(),
        _ => return None,
    };

    let body = func.body.as_ref()?;
    if !(mentions_member_call(body, "push") && mentions_member_call(body, "shift")) {
        return None;
    }

    if call.arguments.len() != 2 {
        return None;
    }
    let first_arg_name = match call.arguments[0].as_expression()? {
        Expression::Identifier(id) => id.name.as_str(),
        _ => return None,
    };
    if first_arg_name != array_name {
        return None;
    }
    let base_count = match call.arguments[1].as_expression()? {
        Expression::NumericLiteral(lit) => lit.value as usize,
        _ => return None,
    };

    let bump = if contains_prefix_increment_call(body, count_param_name) {
        1
    } else {
        0
    };

    Some(base_count + bump)
}

fn mentions_member_call(body: &FunctionBody<'_>, name: &str) -> bool {
    struct Finder<'n> {
        name: &'n str,
        found: bool,
    }
    fn walk_stmt(stmt: &Statement<'_>, finder: &mut Finder<'_>) {
        match stmt {
            Statement::BlockStatement(b) => b.body.iter().for_each(|s| walk_stmt(s, finder)),
            Statement::ExpressionStatement(e) => walk_expr(&e.expression, finder),
            Statement::VariableDeclaration(decl) => {
                for d in &decl.declarations {
                    if let Some(init) = &d.init {
                        walk_expr(init, finder);
                    }
                }
            }
            Statement::WhileStatement(w) => {
                walk_expr(&w.test, finder);
                walk_stmt(&w.body, finder);
            }
            Statement::ReturnStatement(r) => {
                if let Some(arg) = &r.argument {
                    walk_expr(arg, finder);
                }
            }
            _ => {}
        }
    }
    fn walk_expr(expr: &Expression<'_>, finder: &mut Finder<'_>) {
        if finder.found {
            return;
        }
        if let Expression::CallExpression(call) = expr {
            let is_match = match &call.callee {
                Expression::StaticMemberExpression(m) => m.property.name.as_str() == finder.name,
                Expression::ComputedMemberExpression(m) => {
                    matches!(&m.expression, Expression::StringLiteral(s) if s.value.as_str() == finder.name)
                }
                _ => false,
            };
            if is_match {
                finder.found = true;
                return;
            }
            for arg in &call.arguments {
                if let Some(e) = arg.as_expression() {
                    walk_expr(e, finder);
                }
            }
            walk_expr(&call.callee, finder);
        }
    }
    let mut finder = Finder { name, found: false };
    body.statements.iter().for_each(|s| walk_stmt(s, &mut finder));
    finder.found
}

fn contains_prefix_increment_call(body: &FunctionBody<'_>, param_name: &str) -> bool {
    struct Finder<'n> {
        name: &'n str,
        found: bool,
    }
    fn walk_stmt(stmt: &Statement<'_>, finder: &mut Finder<'_>) {
        match stmt {
            Statement::BlockStatement(b) => b.body.iter().for_each(|s| walk_stmt(s, finder)),
            Statement::ExpressionStatement(e) => walk_expr(&e.expression, finder),
            Statement::VariableDeclaration(decl) => {
                for d in &decl.declarations {
                    if let Some(init) = &d.init {
                        walk_expr(init, finder);
                    }
                }
            }
            _ => {}
        }
    }
    fn walk_expr(expr: &Expression<'_>, finder: &mut Finder<'_>) {
        if finder.found {
            return;
        }
        if let Expression::CallExpression(call) = expr {
            if let Some(first) = call.arguments.first().and_then(|a| a.as_expression()) {
                if let Expression::UpdateExpression(update) = first {
                    if update.prefix && matches!(update.operator, UpdateOperator::Increment) {
                        if let SimpleAssignmentTarget::AssignmentTargetIdentifier(id) =
                            &update.argument
                        {
                            if id.name.as_str() == finder.name {
                                finder.found = true;
                                return;
                            }
                        }
                    }
                }
            }
            for arg in &call.arguments {
                if let Some(e) = arg.as_expression() {
                    walk_expr(e, finder);
                }
            }
        }
    }
    let mut finder = Finder {
        name: param_name,
        found: false,
    };
    body.statements.iter().for_each(|s| walk_stmt(s, &mut finder));
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn run(code: &str, array_name: &str) -> (String, Option<usize>) {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::mjs()).parse();
        let mut program = ret.program;
        let descriptor = find_and_apply(&mut program, &allocator, array_name);
        (crate::ast::codegen(&program), descriptor.map(|d| d.rotation_count))
    }

    #[test]
    fn rotates_with_prefix_increment_bump() {
        let (code, count) = run(
            r#"var a=["one","two","three","four"]; (function(e,f){var g=function(h){while(--h){e["push"](e["shift"]());}};g(++f);}(a,2));"#,
            "a",
        );
        assert_eq!(count, Some(3));
        assert!(code.contains(r#""four""#));
        assert!(!code.contains("function(e"));
    }

    #[test]
    fn absent_rotator_is_non_fatal() {
        let (_, count) = run("var a=[\"x\",\"y\"];", "a");
        assert_eq!(count, None);
    }

    #[test]
    fn empty_array_is_unchanged_by_rotation() {
        let (code, count) = run(
            r#"var a=[]; (function(e,f){while(f--){e["push"](e["shift"]());}}(a,5));"#,
            "a",
        );
        assert_eq!(count, Some(5));
        assert!(code.contains("var a = []"));
    }
}
