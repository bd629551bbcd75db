//! §4.6: the Abba target pipeline. Seven transforms run in a fixed order,
//! each folding its own change count into `ctx.state` and logging a
//! one-line summary — the same per-step `ctx.state.record` / `ctx.info`
//! shape `obfuscator_io::ObfuscatorIoTarget::run` uses, just against a
//! different runtime template (module-loader registry and offset-based
//! proxies rather than a single VM decoder).

pub mod member_simplifier;
pub mod module_loader;
pub mod proxy_inliner;
pub mod string_array_extractor;
pub mod string_normalizer;

use oxc_ast::ast::*;

use crate::ast::predicate::is_iife;
use crate::target::{DeobfuscatorContext, DetectionResult, Target, TargetMeta};

pub struct AbbaTarget;

impl Target for AbbaTarget {
    fn meta(&self) -> TargetMeta {
        TargetMeta {
            id: "abba",
            name: "Abba",
            description: Some(
                "Undoes an Abba-style bundle's IIFE string array, offset proxy, and module-loader registry.",
            ),
            tags: &["string-array", "proxy", "module-loader", "abba"],
        }
    }

    fn detect(&self, program: &Program<'_>, _source: &str) -> Option<DetectionResult> {
        let mut score = 0.0_f64;
        let mut signals = Vec::new();

        if scan_for_iife_string_array(&program.body) {
            score += 0.4;
            signals.push("IIFE-wrapped string array");
        }
        if scan_for_loader_shape(&program.body) {
            score += 0.3;
            signals.push("module-loader function");
        }
        if scan_for_proxy_shape(&program.body) {
            score += 0.3;
            signals.push("offset-based array proxy");
        }

        let confidence = score.min(1.0);
        let details = if signals.is_empty() {
            "no Abba-shaped string array, loader, or proxy found".to_string()
        } else {
            format!("found {}", signals.join(", "))
        };
        Some(DetectionResult { confidence, details })
    }

    fn run(&self, ctx: &mut DeobfuscatorContext<'_, '_>) {
        let program = &mut *ctx.program;
        let allocator = ctx.allocator;
        let source = ctx.source;

        // Step 1: string-array extractor — needs the evaluator; a no-op
        // without one, matching the obfuscator.io target's own failure
        // semantics for its VM decoder step.
        let extractor_changes = if let Some(evaluator) = ctx.evaluator.as_deref_mut() {
            let n = string_array_extractor::run(program, allocator, source, evaluator);
            ctx.state.record(n);
            n
        } else {
            ctx.info("no evaluator available, string-array IIFEs left untouched");
            0
        };
        ctx.info(&format!("string-array extractor: {extractor_changes} declarator(s) rewritten"));

        // Step 2: rotator — absence is non-fatal, same as obfuscator.io's
        // step 2. Every declarator that came out of step 1 is a plain
        // array now, so the name-based resolution this shares with
        // obfuscator.io already has something to find.
        let array_names = collect_array_names(program);
        let mut rotator_changes = 0usize;
        for name in &array_names {
            if crate::targets::rotator::find_and_apply(program, allocator, name).is_some() {
                rotator_changes += 1;
            }
        }
        ctx.state.record(rotator_changes);
        ctx.debug(&format!("rotator: {rotator_changes} array(s) rotated"));

        // Step 3: proxy inliner.
        let proxy_changes = proxy_inliner::run(program, allocator);
        ctx.state.record(proxy_changes);
        ctx.info(&format!("proxy inliner: {proxy_changes} call(s) inlined"));

        // Step 4: string normalizer.
        let normalizer_changes = string_normalizer::run(program, allocator);
        ctx.state.record(normalizer_changes);
        ctx.debug(&format!("string normalizer: {normalizer_changes} literal(s) cleaned"));

        // Step 5: member-expression simplifier.
        let member_changes = member_simplifier::run(program, allocator);
        ctx.state.record(member_changes);
        ctx.debug(&format!("member simplifier: {member_changes} access(es) converted"));

        // Step 6: module-loader resolver.
        let loader_changes = module_loader::run(program, allocator);
        ctx.state.record(loader_changes);
        ctx.info(&format!("module loader: {loader_changes} call(s) resolved"));

        // Step 7: scope-aware dead-code removal, shared with obfuscator.io (§4.7).
        let dead_code_changes = crate::dead_code::remove_dead_bindings(program, allocator);
        ctx.state.record(dead_code_changes);
        ctx.info(&format!("dead code: {dead_code_changes} binding(s) removed"));
    }
}

/// Every top-level `var NAME = [...]` declarator's name, used to seed the
/// rotator's name-based resolution once the extractor has turned any
/// IIFE-wrapped arrays into plain array literals.
fn collect_array_names(program: &Program<'_>) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in &program.body {
        let Statement::VariableDeclaration(decl) = stmt else {
            continue;
        };
        for declarator in &decl.declarations {
            let BindingPattern::BindingIdentifier(id) = &declarator.id else {
                continue;
            };
            if matches!(&declarator.init, Some(Expression::ArrayExpression(_))) {
                names.push(id.name.as_str().to_string());
            }
        }
    }
    names
}

fn scan_for_iife_string_array(stmts: &oxc_allocator::Vec<'_, Statement<'_>>) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Statement::VariableDeclaration(decl) => decl.declarations.iter().any(|d| {
            d.init.as_ref().is_some_and(|init| {
                is_iife(init)
                    && matches!(init, Expression::CallExpression(call)
                        if call.arguments.iter().filter_map(|a| a.as_expression())
                            .any(|e| matches!(e, Expression::StringLiteral(_))))
            })
        }),
        Statement::BlockStatement(block) => scan_for_iife_string_array(&block.body),
        _ => false,
    })
}

fn scan_for_loader_shape(stmts: &oxc_allocator::Vec<'_, Statement<'_>>) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Statement::FunctionDeclaration(func) => {
            func.params.items.len() == 2 && func.body.as_ref().is_some_and(body_mentions_split)
        }
        Statement::BlockStatement(block) => scan_for_loader_shape(&block.body),
        _ => false,
    })
}

fn body_mentions_split(body: &FunctionBody<'_>) -> bool {
    fn walk_expr(expr: &Expression<'_>) -> bool {
        match expr {
            Expression::CallExpression(call) => {
                matches!(&call.callee, Expression::StaticMemberExpression(m) if m.property.name.as_str() == "split")
                    || walk_expr(&call.callee)
                    || call.arguments.iter().filter_map(|a| a.as_expression()).any(walk_expr)
            }
            _ => false,
        }
    }
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
            _ => false,
        }
    }
    body.statements.iter().any(walk_stmt)
}

fn scan_for_proxy_shape(stmts: &oxc_allocator::Vec<'_, Statement<'_>>) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Statement::FunctionDeclaration(func) => {
            let param_count = func.params.items.len();
            (param_count == 1 || param_count == 2)
                && func.body.as_ref().is_some_and(body_has_member_and_offset)
        }
        Statement::BlockStatement(block) => scan_for_proxy_shape(&block.body),
        _ => false,
    })
}

fn body_has_member_and_offset(body: &FunctionBody<'_>) -> bool {
    let mut has_member = false;
    let mut has_offset = false;
    for stmt in &body.statements {
        walk_stmt_for_proxy_signals(stmt, &mut has_member, &mut has_offset);
    }
    has_member && has_offset
}

fn walk_stmt_for_proxy_signals(stmt: &Statement<'_>, has_member: &mut bool, has_offset: &mut bool) {
    match stmt {
        Statement::BlockStatement(b) => b
            .body
            .iter()
            .for_each(|s| walk_stmt_for_proxy_signals(s, has_member, has_offset)),
        Statement::ReturnStatement(r) => {
            if let Some(arg) = &r.argument {
                walk_expr_for_proxy_signals(arg, has_member, has_offset);
            }
        }
        Statement::ExpressionStatement(e) => walk_expr_for_proxy_signals(&e.expression, has_member, has_offset),
        _ => {}
    }
}

fn walk_expr_for_proxy_signals(expr: &Expression<'_>, has_member: &mut bool, has_offset: &mut bool) {
    match expr {
        Expression::ComputedMemberExpression(_) => *has_member = true,
        Expression::AssignmentExpression(assign) => {
            if let Expression::BinaryExpression(bin) = &assign.right {
                if matches!(bin.operator, BinaryOperator::Subtraction | BinaryOperator::Addition)
                    && matches!(&bin.right, Expression::NumericLiteral(_))
                {
                    *has_offset = true;
                }
            }
            walk_expr_for_proxy_signals(&assign.right, has_member, has_offset);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::boa_sandbox::BoaSandbox;
    use crate::transform::TransformState;
    use oxc_allocator::Allocator;

    #[test]
    fn detects_iife_string_array_and_proxy_shapes() {
        let allocator = Allocator::default();
        let source = r#"
var arr = (function(seed){ return ["a","b","c"]; })("x");
function p(a) { a = a - 1; return arr[a]; }
var y = p(2);
"#;
        let program = crate::ast::parse(&allocator, source).expect("parses");
        let detection = AbbaTarget.detect(&program, source).expect("some opinion");
        assert!(detection.confidence >= 0.7);
    }

    #[test]
    fn full_pipeline_resolves_proxy_and_loader() {
        let allocator = Allocator::default();
        let source = r#"
var arr = (function(seed){ return ["hello","world"]; })("x");
function p(a) { a = a - 1; return arr[a]; }
var reg = {};
function load(path, factory) { var r = reg; var parts = path.split("."); }
load("m.a", function(module) { return p(2); });
console.log(p(1));
"#;
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
        AbbaTarget.run(&mut ctx);
        let code = crate::ast::codegen(&program);
        assert!(code.contains("\"hello\""));
        assert!(code.contains("\"world\""));
        assert!(code.contains(r#"reg["m"]["a"] = "#));
        assert!(state.changes > 0);
    }
}
