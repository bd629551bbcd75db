//! §4.6.6: resolves Abba's module-loader indirection. A bundle registers
//! each module factory through a small loader function rather than
//! assigning it into the registry object directly — `loader("a.b",
//! function(module){ ... })` — so this pass finds the loader, rewrites
//! every call site into the direct registry assignment the loader would
//! have performed at runtime, and removes the loader once nothing calls
//! it anymore.
//!
//! Three phases, matching the spec's own phase split: find the loader,
//! rewrite call sites, remove the declaration on exit. The shape test for
//! phase 1 (a function whose body mentions a name and binds a local alias
//! to something outside its own parameters) is the same kind of
//! body-scan `rotator::mentions_member_call` already does for `push`/
//! `shift`.

use oxc_ast::ast::*;
use oxc_span::SPAN;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

type Ctx<'a> = TraverseCtx<'a, ()>;

fn mentions_split(body: &FunctionBody<'_>) -> bool {
    fn walk_stmt(stmt: &Statement<'_>) -> bool {
        match stmt {
            Statement::BlockStatement(b) => b.body.iter().any(walk_stmt),
            Statement::ExpressionStatement(e) => walk_expr(&e.expression),
            Statement::VariableDeclaration(decl) => decl
                .declarations
                .iter()
                .filter_map(|d| d.init.as_ref())
                .any(walk_expr),
            Statement::ReturnStatement(r) => r.argument.as_ref().is_some_and(walk_expr),
            Statement::IfStatement(i) => {
                walk_stmt(&i.consequent) || i.alternate.as_ref().is_some_and(|s| walk_stmt(s))
            }
            _ => false,
        }
    }
    fn walk_expr(expr: &Expression<'_>) -> bool {
        match expr {
            Expression::CallExpression(call) => {
                let is_split = matches!(&call.callee,
                    Expression::StaticMemberExpression(m) if m.property.name.as_str() == "split");
                is_split
                    || walk_expr(&call.callee)
                    || call.arguments.iter().filter_map(|a| a.as_expression()).any(walk_expr)
            }
            Expression::AssignmentExpression(assign) => walk_expr(&assign.right),
            Expression::LogicalExpression(logical) => walk_expr(&logical.left) || walk_expr(&logical.right),
            _ => false,
        }
    }
    body.statements.iter().any(walk_stmt)
}

/// A local variable bound to some identifier that is neither of the
/// loader's own two parameters — the registry the loader closes over.
fn find_registry_alias(body: &FunctionBody<'_>, params: &[String]) -> Option<String> {
    for stmt in &body.statements {
        let Statement::VariableDeclaration(decl) = stmt else {
            continue;
        };
        for declarator in &decl.declarations {
            let Some(Expression::Identifier(id)) = &declarator.init else {
                continue;
            };
            if !params.iter().any(|p| p == id.name.as_str()) {
                return Some(id.name.as_str().to_string());
            }
        }
    }
    None
}

fn try_extract_loader(func: &Function<'_>) -> Option<(String, String)> {
    let name = func.id.as_ref()?.name.as_str().to_string();
    if func.params.items.len() != 2 {
        return None;
    }
    let params: Vec<String> = func
        .params
        .items
        .iter()
        .filter_map(|p| match &p.pattern {
            BindingPattern::BindingIdentifier(id) => Some(id.name.as_str().to_string()),
            _ => None,
        })
        .collect();
    if params.len() != 2 {
        return None;
    }
    let body = func.body.as_ref()?;
    if !mentions_split(body) {
        return None;
    }
    let registry = find_registry_alias(body, &params)?;
    Some((name, registry))
}

/// Builds `registry["a"]["b"]…` — bracket notation, per §4.6.6, so a path
/// segment that isn't a valid identifier (leading digit, hyphen, reserved
/// word) still produces valid JavaScript.
fn path_member_chain<'a>(ctx: &mut Ctx<'a>, registry: &str, path: &str) -> Expression<'a> {
    let mut expr = crate::ast::construct::identifier_reference(ctx, registry);
    for segment in path.split('.') {
        expr = crate::ast::construct::computed_member(ctx, expr, segment);
    }
    expr
}

struct Collector {
    loaders: Vec<(String, String)>,
}

impl<'a> Traverse<'a, ()> for Collector {
    fn enter_function(&mut self, func: &mut Function<'a>, _ctx: &mut Ctx<'a>) {
        if let Some(loader) = try_extract_loader(func) {
            self.loaders.push(loader);
        }
    }
}

struct Rewriter {
    loaders: std::collections::HashMap<String, String>,
    changes: usize,
}

impl<'a> Traverse<'a, ()> for Rewriter {
    fn exit_expression(&mut self, expr: &mut Expression<'a>, ctx: &mut Ctx<'a>) {
        let Expression::CallExpression(call) = expr else {
            return;
        };
        let Expression::Identifier(callee) = &call.callee else {
            return;
        };
        let Some(registry) = self.loaders.get(callee.name.as_str()) else {
            return;
        };
        if call.arguments.len() != 2 {
            return;
        }
        let Some(Expression::StringLiteral(path)) = call.arguments[0].as_expression() else {
            return;
        };
        let factory_is_fn = matches!(
            call.arguments[1].as_expression(),
            Some(Expression::FunctionExpression(_)) | Some(Expression::ArrowFunctionExpression(_))
        );
        if !factory_is_fn {
            return;
        }
        let Some(factory) = call.arguments[1].as_expression() else {
            return;
        };

        let registry = registry.clone();
        let path = path.value.as_str().to_string();
        let target_left = path_member_chain(ctx, &registry, &path);
        let target_right = path_member_chain(ctx, &registry, &path);
        let factory_clone = crate::ast::construct::clone_expression(factory, ctx);

        let call_expr = Expression::CallExpression(ctx.ast.alloc(CallExpression {
            span: SPAN,
            callee: Expression::ParenthesizedExpression(ctx.ast.alloc(ParenthesizedExpression {
                span: SPAN,
                expression: factory_clone,
            })),
            arguments: {
                let mut args = ctx.ast.vec();
                args.push(Argument::from(target_right));
                args
            },
            optional: false,
            type_arguments: None,
            pure: false,
        }));

        let Some(target) = member_expression_of(target_left) else {
            return;
        };

        *expr = Expression::AssignmentExpression(ctx.ast.alloc(AssignmentExpression {
            span: SPAN,
            operator: AssignmentOperator::Assign,
            left: target,
            right: call_expr,
        }));
        self.changes += 1;
    }

    fn exit_program(&mut self, program: &mut Program<'a>, ctx: &mut Ctx<'a>) {
        if self.loaders.is_empty() {
            return;
        }
        for stmt in program.body.iter_mut() {
            if let Statement::FunctionDeclaration(func) = stmt {
                if let Some(id) = &func.id {
                    if self.loaders.contains_key(id.name.as_str()) {
                        *stmt = crate::ast::construct::empty_statement(ctx);
                    }
                }
            }
        }
    }
}

fn member_expression_of(expr: Expression<'_>) -> Option<AssignmentTarget<'_>> {
    match expr {
        Expression::StaticMemberExpression(m) => {
            Some(AssignmentTarget::StaticMemberExpression(m))
        }
        Expression::ComputedMemberExpression(m) => {
            Some(AssignmentTarget::ComputedMemberExpression(m))
        }
        Expression::Identifier(id) => Some(AssignmentTarget::AssignmentTargetIdentifier(id)),
        _ => None,
    }
}

pub fn run<'a>(program: &mut Program<'a>, allocator: &'a oxc_allocator::Allocator) -> usize {
    let mut collector = Collector { loaders: Vec::new() };
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut collector, program, &mut ctx);

    if collector.loaders.is_empty() {
        return 0;
    }

    let mut rewriter = Rewriter {
        loaders: collector.loaders.into_iter().collect(),
        changes: 0,
    };
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut rewriter, program, &mut ctx);
    rewriter.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn rewrites_loader_call_to_registry_assignment() {
        let allocator = Allocator::default();
        let code = r#"
var reg = {};
function load(path, factory) { var r = reg; var parts = path.split("."); }
load("a.b", function(module) { return module; });
"#;
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 1);
        let out = crate::ast::codegen(&program);
        assert!(out.contains(r#"reg["a"]["b"] = "#));
        assert!(!out.contains("function load"));
    }

    #[test]
    fn leaves_unrelated_calls_untouched() {
        let allocator = Allocator::default();
        let code = "console.log(\"a.b\", function(x) { return x; });";
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 0);
    }
}
