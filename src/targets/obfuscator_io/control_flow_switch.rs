//! §4.5 step 8 cleanup quartet, `controlFlowSwitch` member: restores
//! flattened control flow of the classic `"2|0|1".split("|")` shape —
//! an order array consumed by `while(true){ switch(seq[i++]){ ...
//! continue/break } break; }` (or the `for(;;)` variant) — back into
//! straight-line statements in source order. Grounded on the teacher's
//! `control_flow_unflatten`, trimmed to this crate's `()` traversal state
//! and reusing `crate::ast::construct::clone_statement` instead of a
//! hand-rolled per-variant clone.

use oxc_ast::ast::*;
use oxc_traverse::{traverse_mut_with_ctx, Traverse, TraverseCtx};
use rustc_hash::FxHashMap;

type Ctx<'a> = TraverseCtx<'a, ()>;

/// `pub(crate)` so the step-8 cleanup quartet in `obfuscator_io::mod` can
/// compose this visitor with its siblings through `transform::apply_transforms_no_scope`
/// instead of going through [`run`]'s own standalone `crawl`.
#[derive(Default)]
pub(crate) struct Unflattener {
    sequences: FxHashMap<String, Vec<String>>,
    pub(crate) changes: usize,
}

impl Unflattener {
    fn extract_split_sequence(expr: &Expression<'_>) -> Option<Vec<String>> {
        let Expression::CallExpression(call) = expr else {
            return None;
        };
        let Expression::StaticMemberExpression(member) = &call.callee else {
            return None;
        };
        if member.property.name.as_str() != "split" {
            return None;
        }
        let Expression::StringLiteral(lit) = &member.object else {
            return None;
        };
        if call.arguments.len() != 1 {
            return None;
        }
        let Some(Expression::StringLiteral(sep)) = call.arguments[0].as_expression() else {
            return None;
        };
        if sep.value.as_str() != "|" {
            return None;
        }
        Some(lit.value.as_str().split('|').map(String::from).collect())
    }

    fn body_contains_switch(stmt: &Statement<'_>) -> bool {
        match stmt {
            Statement::BlockStatement(block) => block
                .body
                .iter()
                .any(|s| matches!(s, Statement::SwitchStatement(_))),
            Statement::SwitchStatement(_) => true,
            _ => false,
        }
    }

    fn switch_in<'a, 'b>(stmt: &'b Statement<'a>) -> Option<&'b SwitchStatement<'a>> {
        let Statement::BlockStatement(block) = stmt else {
            return None;
        };
        block.body.iter().find_map(|s| match s {
            Statement::SwitchStatement(switch) => Some(&**switch),
            _ => None,
        })
    }

    fn sequence_var(&self, discriminant: &Expression<'_>) -> Option<String> {
        let name = match discriminant {
            Expression::ComputedMemberExpression(member) => match &member.object {
                Expression::Identifier(id) => id.name.as_str(),
                _ => return None,
            },
            Expression::UpdateExpression(update) => match &update.argument {
                SimpleAssignmentTarget::ComputedMemberExpression(member) => match &member.object {
                    Expression::Identifier(id) => id.name.as_str(),
                    _ => return None,
                },
                _ => return None,
            },
            _ => return None,
        };
        self.sequences.contains_key(name).then(|| name.to_string())
    }

    fn case_map<'a, 'b>(switch: &'b SwitchStatement<'a>) -> FxHashMap<String, &'b SwitchCase<'a>> {
        let mut map = FxHashMap::default();
        for case in &switch.cases {
            if let Some(test) = &case.test {
                let key = match test {
                    Expression::StringLiteral(lit) => lit.value.as_str().to_string(),
                    Expression::NumericLiteral(lit) => lit
                        .raw
                        .map_or_else(|| lit.value.to_string(), |r| r.to_string()),
                    _ => continue,
                };
                map.insert(key, case);
            }
        }
        map
    }

    fn unroll<'a>(
        &self,
        switch: &SwitchStatement<'a>,
        sequence: &[String],
        ctx: &mut Ctx<'a>,
    ) -> Option<oxc_allocator::Vec<'a, Statement<'a>>> {
        let cases = Self::case_map(switch);
        let mut result = ctx.ast.vec();
        for step in sequence {
            let Some(case) = cases.get(step) else {
                continue;
            };
            for stmt in &case.consequent {
                if matches!(stmt, Statement::ContinueStatement(_) | Statement::BreakStatement(_)) {
                    continue;
                }
                result.push(crate::ast::construct::clone_statement(stmt, ctx));
            }
        }
        (!result.is_empty()).then_some(result)
    }
}

impl<'a> Traverse<'a, ()> for Unflattener {
    fn enter_statement(&mut self, stmt: &mut Statement<'a>, _ctx: &mut Ctx<'a>) {
        let Statement::VariableDeclaration(decl) = stmt else {
            return;
        };
        for declarator in &decl.declarations {
            let BindingPattern::BindingIdentifier(name) = &declarator.id else {
                continue;
            };
            if let Some(init) = &declarator.init {
                if let Some(sequence) = Self::extract_split_sequence(init) {
                    self.sequences.insert(name.name.as_str().to_string(), sequence);
                }
            }
        }
    }

    fn exit_program(&mut self, program: &mut Program<'a>, ctx: &mut Ctx<'a>) {
        if self.sequences.is_empty() {
            return;
        }

        let mut new_body = ctx.ast.vec();
        let mut skip_index_decl = false;

        for stmt in program.body.iter() {
            if skip_index_decl {
                skip_index_decl = false;
                if matches!(stmt, Statement::VariableDeclaration(_)) {
                    continue;
                }
            }

            let declares_sequence = matches!(stmt, Statement::VariableDeclaration(decl)
                if decl.declarations.iter().any(|d| matches!(&d.id, BindingPattern::BindingIdentifier(ident)
                    if self.sequences.contains_key(ident.name.as_str()))));
            if declares_sequence {
                skip_index_decl = true;
                continue;
            }

            let unrolled = match stmt {
                Statement::WhileStatement(while_stmt)
                    if matches!(&while_stmt.test, Expression::BooleanLiteral(b) if b.value)
                        && Self::body_contains_switch(&while_stmt.body) =>
                {
                    Self::switch_in(&while_stmt.body).and_then(|switch| {
                        let seq_name = self.sequence_var(&switch.discriminant)?;
                        let sequence = self.sequences.get(&seq_name)?.clone();
                        self.unroll(switch, &sequence, ctx)
                    })
                }
                Statement::ForStatement(for_stmt)
                    if for_stmt.init.is_none()
                        && for_stmt.test.is_none()
                        && for_stmt.update.is_none()
                        && Self::body_contains_switch(&for_stmt.body) =>
                {
                    Self::switch_in(&for_stmt.body).and_then(|switch| {
                        let seq_name = self.sequence_var(&switch.discriminant)?;
                        let sequence = self.sequences.get(&seq_name)?.clone();
                        self.unroll(switch, &sequence, ctx)
                    })
                }
                _ => None,
            };

            match unrolled {
                Some(stmts) => {
                    self.changes += 1;
                    new_body.extend(stmts);
                }
                None => new_body.push(crate::ast::construct::clone_statement(stmt, ctx)),
            }
        }

        program.body = new_body;
    }
}

pub fn run<'a>(program: &mut Program<'a>, allocator: &'a oxc_allocator::Allocator) -> usize {
    let mut pass = Unflattener::default();
    let mut ctx = crate::ast::crawl(program, (), allocator);
    traverse_mut_with_ctx(&mut pass, program, &mut ctx);
    pass.changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    #[test]
    fn unflattens_while_true_switch() {
        let allocator = Allocator::default();
        let code = r#"
var _flow = "2|0|1".split("|");
var _i = 0;
while (true) {
    switch (_flow[_i++]) {
        case "0": console.log("second"); continue;
        case "1": console.log("third"); break;
        case "2": console.log("first"); continue;
    }
    break;
}
"#;
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 1);
        let out = crate::ast::codegen(&program);
        let first = out.find("first").unwrap();
        let second = out.find("second").unwrap();
        let third = out.find("third").unwrap();
        assert!(first < second && second < third);
        assert!(!out.contains("switch"));
    }

    #[test]
    fn leaves_regular_while_untouched() {
        let allocator = Allocator::default();
        let code = "var x = 0; while (x < 10) { x++; }";
        let mut program = Parser::new(&allocator, code, SourceType::mjs()).parse().program;
        let changes = run(&mut program, &allocator);
        assert_eq!(changes, 0);
        assert!(crate::ast::codegen(&program).contains("while"));
    }
}
