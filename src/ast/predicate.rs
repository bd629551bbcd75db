//! Node-kind predicates shared across probes (§4.1 "test node kind").

use oxc_ast::ast::*;

/// A reserved word may never be used as the right side of `obj.word` even
/// though `obj["word"]` is legal — used by the member-expression
/// simplifier (§4.6.5) to decide whether a bracket access is convertible.
pub fn is_reserved_word(name: &str) -> bool {
    matches!(
        name,
        "break"
            | "case"
            | "catch"
            | "class"
            | "const"
            | "continue"
            | "debugger"
            | "default"
            | "delete"
            | "do"
            | "else"
            | "enum"
            | "export"
            | "extends"
            | "false"
            | "finally"
            | "for"
            | "function"
            | "if"
            | "import"
            | "in"
            | "instanceof"
            | "new"
            | "null"
            | "return"
            | "super"
            | "switch"
            | "this"
            | "throw"
            | "true"
            | "try"
            | "typeof"
            | "var"
            | "void"
            | "while"
            | "with"
            | "yield"
            | "let"
            | "static"
            | "await"
            | "implements"
            | "interface"
            | "package"
            | "private"
            | "protected"
            | "public"
    )
}

/// `/^[A-Za-z_$][A-Za-z0-9_$]*$/` with a length ceiling, not a reserved
/// word.
pub fn is_valid_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > 100 || is_reserved_word(s) {
        return false;
    }
    let mut chars = s.chars();
    let first = chars.next().unwrap();
    if !(first.is_ascii_alphabetic() || first == '_' || first == '$') {
        return false;
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// True for `(function(){ ... })()`-shaped and `(() => { ... })()`-shaped
/// call expressions with no special-casing of argument count — callers
/// that additionally require zero or N arguments check that themselves.
pub fn is_iife(expr: &Expression<'_>) -> bool {
    let Expression::CallExpression(call) = expr else {
        return false;
    };
    matches!(
        unwrap_parens(&call.callee),
        Expression::FunctionExpression(_) | Expression::ArrowFunctionExpression(_)
    )
}

pub fn unwrap_parens<'a, 'b>(expr: &'b Expression<'a>) -> &'b Expression<'a> {
    let mut cur = expr;
    while let Expression::ParenthesizedExpression(paren) = cur {
        cur = &paren.expression;
    }
    cur
}

pub fn string_literal_value<'a>(expr: &Expression<'a>) -> Option<&'a str> {
    match unwrap_parens(expr) {
        Expression::StringLiteral(lit) => Some(lit.value.as_str()),
        _ => None,
    }
}
