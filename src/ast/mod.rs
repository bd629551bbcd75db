//! AST façade (§4.1): the interface every transform uses to inspect and
//! mutate a parsed JavaScript program, without reaching directly into
//! `oxc_*` internals at every call site.
//!
//! The façade is deliberately thin — `oxc_traverse::Traverse` already gives
//! depth-first, left-to-right visiting with `replace`/`remove`-on-path
//! semantics, and `oxc_semantic` already gives a scope stack with
//! bindings and reference lists. What the façade adds is (a) a single
//! entry point that owns the allocator/parse/semantic-build ceremony so
//! transforms don't repeat it, (b) node-construction helpers shared across
//! transforms, and (c) span slicing, used to recover a node's verbatim
//! source text for the bounded evaluator (§4.3) instead of re-serializing
//! it and risking a quoting/escape mismatch with what the obfuscator
//! actually emitted.

pub mod construct;
pub mod predicate;

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::{SourceType, Span};
use oxc_traverse::ReusableTraverseCtx;

use crate::error::{DeobfuscateError, Result};

/// Parses `source` and hands back the allocator-owned program plus the
/// original buffer (kept alongside for span slicing). The allocator must
/// outlive every `Program` borrowed from it, so callers build it first and
/// pass it in rather than have this function return an owned tree.
pub fn parse<'a>(allocator: &'a Allocator, source: &str) -> Result<Program<'a>> {
    let source_type = SourceType::mjs();
    let ret = Parser::new(allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return Err(DeobfuscateError::Parse(format!("{:?}", ret.errors[0])));
    }
    Ok(ret.program)
}

/// Rebuilds scope information for `program` ("crawl", §4.1) and returns a
/// fresh traversal context seeded with `state`. Call this between passes
/// whenever the next pass depends on accurate reference lists following a
/// bulk structural edit.
pub fn crawl<'a, S>(
    program: &Program<'a>,
    state: S,
    allocator: &'a Allocator,
) -> ReusableTraverseCtx<'a, S> {
    let scoping = SemanticBuilder::new().build(program).semantic.into_scoping();
    ReusableTraverseCtx::new(state, scoping, allocator)
}

/// Recovers the verbatim source text covered by `span` from the original
/// buffer. Used to hand the bounded evaluator an exact fragment (an IIFE,
/// a decoder function, a call site) rather than a re-serialized one.
pub fn slice<'s>(source: &'s str, span: Span) -> &'s str {
    &source[span.start as usize..span.end as usize]
}

/// Generates source code for `program` (§4.1 "generate source from a
/// node"). Thin wrapper kept so call sites don't need to import
/// `oxc_codegen` directly.
pub fn codegen(program: &Program<'_>) -> String {
    oxc_codegen::Codegen::new().build(program).code
}
