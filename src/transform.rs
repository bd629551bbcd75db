//! Transform runner (§4.2): the shared machinery for composing several
//! `oxc_traverse::Traverse` visitors into one pass. Used by the
//! obfuscator.io pipeline's step-8 cleanup quartet, the one place in
//! either pipeline where the spec calls for a `noScope` composition
//! rather than each transform rebuilding scope on its own.

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_traverse::{traverse_mut_with_ctx, Traverse};

/// Mutable counter incremented by every mutation a transform makes (§3).
/// The sole observable summary handed back to the caller of the
/// deobfuscation entry.
#[derive(Debug, Default, Clone, Copy)]
pub struct TransformState {
    pub changes: usize,
}

impl TransformState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, n: usize) {
        self.changes += n;
    }
}

/// Composes several visitors into a single traversal pass by building
/// scope once and running each visitor back to back against it —
/// `applyTransforms(tree, [t1…tn], {noScope: true})` (§4.2). Unlike a
/// plain loop of independent `crawl`-then-traverse calls, scope is never
/// rebuilt between visitors here, so this is only correct for visitors
/// whose mutations don't depend on another member's rewrites being
/// reflected in up-to-date binding/reference counts (the obfuscator.io
/// cleanup quartet's `mergeStrings`/`controlFlowObject`/`controlFlowSwitch`
/// members, each a self-contained literal rewrite — not `deadCode`, which
/// needs accurate reference counts and keeps its own internal fixpoint of
/// scope rebuilds instead, per DESIGN.md).
pub fn apply_transforms_no_scope<'a, S>(
    program: &mut Program<'a>,
    visitors: &mut [&mut dyn Traverse<'a, S>],
    state: S,
    allocator: &'a Allocator,
) {
    let mut ctx = crate::ast::crawl(program, state, allocator);
    for visitor in visitors {
        traverse_mut_with_ctx(*visitor, program, &mut ctx);
    }
}
