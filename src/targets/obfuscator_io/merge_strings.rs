//! §4.5 step 8 cleanup quartet, `mergeStrings` member: folds adjacent
//! string-literal concatenation (`"a" + "b"` → `"ab"`) left over once the
//! decoder and dispatcher steps have replaced calls with literals.
//! Grounded on the teacher's `constant_folding`, which folds the numeric
//! and boolean cases of the same `BinaryExpression::Addition` node but
//! never the string case — this module covers exactly that gap.

use oxc_ast::ast::*;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

type Ctx<'a> = TraverseCtx<'a, ()>;

fn as_string_literal<'a>(expr: &Expression<'a>) -> Option<&'a str> {
    match expr {
        Expression::StringLiteral(lit) => Some(lit.value.as_str()),
        _ => None,
    }
}

/// `pub(crate)` so the step-8 cleanup quartet in `obfuscator_io::mod` can
/// compose this visitor with its siblings through `transform::apply_transforms_no_scope`
/// instead of going through [`run`]'s own standalone `crawl`.
#[derive(Default)]
pub(crate) struct Merger {
    pub(crate) changes: usize,
}

impl<'a> Traverse<'a, ()> for Merger {
    fn exit_expression(&mut self, expr: &mut Expression<'a>, ctx: &mut Ctx<'a>) {
        let Expression::BinaryExpression(binary) = expr else {
            return;
        };
        if binary.operator != BinaryOperator::Addition {
            return;
        }
        let Some(left) = as_string_literal(&binary.left) else {
            return;
        };
        let Some(right) = as_string_literal(&binary.right) else {
            return;
        };
        let merged = format!("{left}{right}");
        *expr = crate::ast::construct::string_literal(ctx, &merged);
        self.changes += 1;
    }
}

pub fn run<'a>(program: &mut Program<'a>, allocator: &'a oxc_allocator::Allocator) -> usize {
    let mut merger = Merger::default();
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut merger, program, &mut ctx);
    merger.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn merges_adjacent_string_literals() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, r#"var x = "foo" + "bar";"#, SourceType::mjs())
            .parse()
            .program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 1);
        assert!(crate::ast::codegen(&program).contains("foobar"));
    }

    #[test]
    fn merges_chained_concatenation() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, r#"var x = "a" + "b" + "c";"#, SourceType::mjs())
            .parse()
            .program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 2);
        assert!(crate::ast::codegen(&program).contains("abc"));
    }

    #[test]
    fn leaves_numeric_addition_untouched() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, "var x = 1 + 2;", SourceType::mjs())
            .parse()
            .program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 0);
    }
}
