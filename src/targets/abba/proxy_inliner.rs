//! §4.6.3: the Abba proxy inliner. An Abba bundle frequently wraps its
//! string array behind a small proxy function — `function p(a){ a = a -
//! OFFSET; return ARR[a]; }` — rather than exposing `ARR` directly.
//! Detection mirrors the teacher's `decoder_inline` offset-extraction
//! shape (`extract_simple_array_access` / `extract_offset_assignment` /
//! `extract_offset_from_binary`), generalized from that module's
//! XOR/RC4/Base64 decode step to a plain index lookup, since an Abba
//! proxy never transforms the string — it only re-bases the index.
//!
//! Two-phase collect/inline/remove, the same shape the teacher uses for
//! `call_proxy` and `operator_proxy`: phase one resolves every proxy
//! function to its backing array and offset, phase two rewrites call
//! sites with a literal argument, and a final `exit_program` drops the
//! now-dead proxy declarations.

use oxc_ast::ast::*;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};
use rustc_hash::FxHashMap;

type Ctx<'a> = TraverseCtx<'a, ()>;

#[derive(Debug, Clone)]
struct Proxy {
    array_name: String,
    offset: i64,
    strings: Vec<String>,
}

fn param_names(func: &Function<'_>) -> Option<Vec<String>> {
    let names: Vec<String> = func
        .params
        .items
        .iter()
        .filter_map(|p| match &p.pattern {
            BindingPattern::BindingIdentifier(id) => Some(id.name.as_str().to_string()),
            _ => None,
        })
        .collect();
    let count = func.params.items.len();
    (count == 1 || count == 2).then_some(names).filter(|n| n.len() == count)
}

/// A computed member read `ARR[idx]` whose object is a free identifier
/// (not one of the proxy's own parameters) — the array the proxy indexes
/// into.
fn find_array_name(body: &FunctionBody<'_>, params: &[String]) -> Option<String> {
    fn walk_stmt(stmt: &Statement<'_>, params: &[String]) -> Option<String> {
        match stmt {
            Statement::BlockStatement(b) => b.body.iter().find_map(|s| walk_stmt(s, params)),
            Statement::ReturnStatement(r) => r.argument.as_ref().and_then(|e| walk_expr(e, params)),
            Statement::ExpressionStatement(e) => walk_expr(&e.expression, params),
            Statement::VariableDeclaration(decl) => decl
                .declarations
                .iter()
                .filter_map(|d| d.init.as_ref())
                .find_map(|e| walk_expr(e, params)),
            _ => None,
        }
    }
    fn walk_expr(expr: &Expression<'_>, params: &[String]) -> Option<String> {
        match expr {
            Expression::ComputedMemberExpression(member) => {
                if let Expression::Identifier(id) = &member.object {
                    if !params.iter().any(|p| p == id.name.as_str()) {
                        return Some(id.name.as_str().to_string());
                    }
                }
                None
            }
            Expression::AssignmentExpression(assign) => walk_expr(&assign.right, params),
            _ => None,
        }
    }
    body.statements.iter().find_map(|s| walk_stmt(s, params))
}

/// `param = param - N` (or `+`, folded to a negative offset) anywhere in
/// the body — the index re-basing the spec calls "the offset".
fn find_offset(body: &FunctionBody<'_>, params: &[String]) -> i64 {
    fn walk_stmt(stmt: &Statement<'_>, params: &[String]) -> Option<i64> {
        match stmt {
            Statement::BlockStatement(b) => b.body.iter().find_map(|s| walk_stmt(s, params)),
            Statement::ExpressionStatement(e) => walk_expr(&e.expression, params),
            _ => None,
        }
    }
    fn walk_expr(expr: &Expression<'_>, params: &[String]) -> Option<i64> {
        let Expression::AssignmentExpression(assign) = expr else {
            return None;
        };
        let AssignmentTarget::AssignmentTargetIdentifier(target) = &assign.left else {
            return None;
        };
        if !params.iter().any(|p| p == target.name.as_str()) {
            return None;
        }
        let Expression::BinaryExpression(bin) = &assign.right else {
            return None;
        };
        let is_param_left = matches!(&bin.left, Expression::Identifier(id) if params.iter().any(|p| p == id.name.as_str()));
        if !is_param_left {
            return None;
        }
        let Expression::NumericLiteral(lit) = &bin.right else {
            return None;
        };
        match bin.operator {
            BinaryOperator::Subtraction => Some(lit.value as i64),
            BinaryOperator::Addition => Some(-(lit.value as i64)),
            _ => None,
        }
    }
    body.statements
        .iter()
        .find_map(|s| walk_stmt(s, params))
        .unwrap_or(0)
}

fn resolve_array_strings(program: &Program<'_>, array_name: &str) -> Option<Vec<String>> {
    for stmt in &program.body {
        let Statement::VariableDeclaration(decl) = stmt else {
            continue;
        };
        for declarator in &decl.declarations {
            let BindingPattern::BindingIdentifier(id) = &declarator.id else {
                continue;
            };
            if id.name.as_str() != array_name {
                continue;
            }
            let Some(Expression::ArrayExpression(array)) = &declarator.init else {
                continue;
            };
            return array
                .elements
                .iter()
                .map(|e| match e.as_expression() {
                    Some(Expression::StringLiteral(lit)) => Some(lit.value.as_str().to_string()),
                    _ => None,
                })
                .collect();
        }
    }
    None
}

fn try_extract_proxy(func: &Function<'_>, program: &Program<'_>) -> Option<Proxy> {
    let params = param_names(func)?;
    let body = func.body.as_ref()?;
    let array_name = find_array_name(body, &params)?;
    let offset = find_offset(body, &params);
    let strings = resolve_array_strings(program, &array_name)?;
    Some(Proxy {
        array_name,
        offset,
        strings,
    })
}

/// Decimal or `0x`-hexadecimal string, or a bare numeric literal, per the
/// spec's "decimal or hexadecimal strings are parsed, numeric literals
/// taken as-is".
fn literal_index(expr: &Expression<'_>) -> Option<i64> {
    match expr {
        Expression::NumericLiteral(lit) => Some(lit.value as i64),
        Expression::StringLiteral(lit) => {
            let s = lit.value.as_str();
            if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
                i64::from_str_radix(hex, 16).ok()
            } else {
                s.parse::<i64>().ok()
            }
        }
        _ => None,
    }
}

/// Plain recursive scan rather than an `oxc_traverse` pass: collection
/// only reads the tree to resolve a proxy's backing array by name, and
/// doing that under a mutable traversal would mean holding two live
/// borrows of `program` at once. The same "read-only scan beside the
/// mutating passes" split `obfuscator_io::scan_for_string_array` uses.
fn collect_proxies(program: &Program<'_>) -> FxHashMap<String, Proxy> {
    let mut proxies = FxHashMap::default();
    for stmt in &program.body {
        match stmt {
            Statement::FunctionDeclaration(func) => {
                if let Some(name) = func.id.as_ref() {
                    if let Some(proxy) = try_extract_proxy(func, program) {
                        proxies.insert(name.name.as_str().to_string(), proxy);
                    }
                }
            }
            Statement::VariableDeclaration(decl) => {
                for declarator in &decl.declarations {
                    let BindingPattern::BindingIdentifier(name) = &declarator.id else {
                        continue;
                    };
                    let Some(Expression::FunctionExpression(func)) = &declarator.init else {
                        continue;
                    };
                    if let Some(proxy) = try_extract_proxy(func, program) {
                        proxies.insert(name.name.as_str().to_string(), proxy);
                    }
                }
            }
            _ => {}
        }
    }
    proxies
}

struct Inliner {
    proxies: FxHashMap<String, Proxy>,
    changes: usize,
}

impl<'a> Traverse<'a, ()> for Inliner {
    fn exit_expression(&mut self, expr: &mut Expression<'a>, ctx: &mut Ctx<'a>) {
        let Expression::CallExpression(call) = expr else {
            return;
        };
        let Expression::Identifier(callee) = &call.callee else {
            return;
        };
        let Some(proxy) = self.proxies.get(callee.name.as_str()) else {
            return;
        };
        let Some(first) = call.arguments.first().and_then(|a| a.as_expression()) else {
            return;
        };
        let Some(value) = literal_index(first) else {
            return;
        };
        let index = value - proxy.offset;
        if index < 0 {
            return;
        }
        let Some(literal) = proxy.strings.get(index as usize) else {
            return;
        };
        *expr = crate::ast::construct::string_literal(ctx, literal);
        self.changes += 1;
    }

    fn exit_program(&mut self, program: &mut Program<'a>, ctx: &mut Ctx<'a>) {
        if self.proxies.is_empty() {
            return;
        }
        for stmt in program.body.iter_mut() {
            let is_dead = match stmt {
                Statement::FunctionDeclaration(func) => func
                    .id
                    .as_ref()
                    .is_some_and(|id| self.proxies.contains_key(id.name.as_str())),
                Statement::VariableDeclaration(decl) => {
                    decl.declarations.len() == 1
                        && matches!(
                            (&decl.declarations[0].id, &decl.declarations[0].init),
                            (BindingPattern::BindingIdentifier(id), Some(Expression::FunctionExpression(_)))
                                if self.proxies.contains_key(id.name.as_str())
                        )
                }
                _ => false,
            };
            if is_dead {
                *stmt = crate::ast::construct::empty_statement(ctx);
            }
        }
    }
}

pub fn run<'a>(program: &mut Program<'a>, allocator: &'a oxc_allocator::Allocator) -> usize {
    let proxies = collect_proxies(program);
    if proxies.is_empty() {
        return 0;
    }

    let mut inliner = Inliner { proxies, changes: 0 };
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut inliner, program, &mut ctx);
    inliner.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn inlines_literal_proxy_calls_with_offset() {
        let allocator = Allocator::default();
        let code = r#"
var arr = ["zero", "one", "two", "three"];
function p(a) { a = a - 10; return arr[a]; }
var x = p(11);
var y = p(12);
"#;
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 2);
        let out = crate::ast::codegen(&program);
        assert!(out.contains("\"one\""));
        assert!(out.contains("\"two\""));
        assert!(!out.contains("function p"));
    }

    #[test]
    fn leaves_out_of_range_calls_intact() {
        let allocator = Allocator::default();
        let code = r#"
var arr = ["zero", "one"];
function p(a) { return arr[a]; }
var x = p(99);
"#;
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 0);
        assert!(crate::ast::codegen(&program).contains("p(99)"));
    }

    #[test]
    fn parses_hexadecimal_literal_argument() {
        let allocator = Allocator::default();
        let code = r#"
var arr = ["zero", "one", "two"];
function p(a) { return arr[a]; }
var x = p("0x2");
"#;
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 1);
        assert!(crate::ast::codegen(&program).contains("\"two\""));
    }
}
