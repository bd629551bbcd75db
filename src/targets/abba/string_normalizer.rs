//! §4.6.4: strips the formatter hint (`raw`) carried on every string and
//! numeric literal so codegen regenerates each one in its cleanest form —
//! hex escapes become plain characters, `0x1a` becomes `26`. Every
//! construction helper in `crate::ast::construct` already builds nodes
//! with `raw: None` for exactly this reason; this pass applies the same
//! treatment to literals that survived parsing instead of construction.

use oxc_ast::ast::*;
use oxc_syntax::number::NumberBase;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

type Ctx<'a> = TraverseCtx<'a, ()>;

#[derive(Default)]
struct Normalizer {
    changes: usize,
}

impl<'a> Traverse<'a, ()> for Normalizer {
    fn exit_expression(&mut self, expr: &mut Expression<'a>, _ctx: &mut Ctx<'a>) {
        match expr {
            Expression::StringLiteral(lit) if lit.raw.is_some() => {
                lit.raw = None;
                self.changes += 1;
            }
            Expression::NumericLiteral(lit) if lit.raw.is_some() || lit.base != NumberBase::Decimal => {
                lit.raw = None;
                lit.base = NumberBase::Decimal;
                self.changes += 1;
            }
            _ => {}
        }
    }
}

pub fn run<'a>(program: &mut Program<'a>, allocator: &'a oxc_allocator::Allocator) -> usize {
    let mut normalizer = Normalizer::default();
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut normalizer, program, &mut ctx);
    normalizer.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn rewrites_hex_numeric_literal_in_decimal() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, "var x = 0x1a;", SourceType::mjs())
            .parse()
            .program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 1);
        assert!(crate::ast::codegen(&program).contains("26"));
    }

    #[test]
    fn strips_raw_hint_on_string_literal() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, r#"var x = "\x61\x62";"#, SourceType::mjs())
            .parse()
            .program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 1);
        assert!(crate::ast::codegen(&program).contains("\"ab\""));
    }

    #[test]
    fn decimal_literal_regenerates_identically() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, "var x = 26;", SourceType::mjs())
            .parse()
            .program;
        run(&mut program, &allocator);
        assert!(crate::ast::codegen(&program).contains("26"));
    }
}
