//! §4.5 step 1: locates the canonical string-array declaration — a single
//! declarator whose initializer is an array of nothing but string
//! literals, anywhere in the tree (the obfuscator.io runtime template
//! nests it inside the decoder's own IIFE as often as it declares it at
//! module scope, §8 scenario 1).

use oxc_allocator::Allocator;
use oxc_ast::ast::*;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};

use crate::model::StringArrayDescriptor;

type Ctx<'a> = TraverseCtx<'a, ()>;

#[derive(Default)]
struct Finder {
    found: Option<StringArrayDescriptor>,
}

impl<'a> Traverse<'a, ()> for Finder {
    fn enter_variable_declaration(&mut self, decl: &mut VariableDeclaration<'a>, _ctx: &mut Ctx<'a>) {
        if self.found.is_some() || decl.declarations.len() != 1 {
            return;
        }
        let declarator = &decl.declarations[0];
        let BindingPattern::BindingIdentifier(name) = &declarator.id else {
            return;
        };
        let Some(Expression::ArrayExpression(array)) = &declarator.init else {
            return;
        };
        if array.elements.is_empty() {
            return;
        }
        let mut strings = Vec::with_capacity(array.elements.len());
        for element in &array.elements {
            let Some(Expression::StringLiteral(lit)) = element.as_expression() else {
                return;
            };
            strings.push(lit.value.as_str().to_string());
        }
        self.found = Some(StringArrayDescriptor {
            name: name.name.as_str().to_string(),
            span: decl.span,
            strings,
        });
    }
}

pub fn find<'a>(program: &mut Program<'a>, allocator: &'a Allocator) -> Option<StringArrayDescriptor> {
    let mut finder = Finder::default();
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
    fn finds_array_nested_in_iife() {
        let allocator = Allocator::default();
        let code = r#"var f = (function(){var A=["hello","world"];return function(i){return A[i];};})();"#;
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let descriptor = find(&mut program, &allocator).expect("array found");
        assert_eq!(descriptor.name, "A");
        assert_eq!(descriptor.strings, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn no_op_without_array() {
        let allocator = Allocator::default();
        let mut program = Parser::new(&allocator, "console.log(1);", SourceType::mjs())
            .parse()
            .program;
        assert!(find(&mut program, &allocator).is_none());
    }
}
