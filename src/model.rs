//! Shared descriptor types (§3): the data each pipeline's probes produce
//! and its later stages consume. All of them hold owned data rather than
//! borrowed tree views — the same choice the teacher's own
//! `ast_deobfuscate::state` module made, because every later stage in
//! either pipeline rebuilds the tree (inlining, removal) and a borrowed
//! node reference would be invalidated by the very mutation the descriptor
//! exists to drive.

use oxc_span::Span;

/// A decoder's calling convention, discovered by `find_decoders` /
/// the Abba proxy inliner and consumed by the evaluator construction step.
/// The evaluator dispatches the shape of the canonicalized call fragment on
/// this tag alone (§9 "polymorphism over decoders"); it never needs to
/// re-inspect the original function body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecoderVariant {
    Plain,
    Keyed { key: String },
    Base64Keyed { key: String },
}

/// §3 StringArray descriptor.
#[derive(Debug, Clone)]
pub struct StringArrayDescriptor {
    pub name: String,
    pub span: Span,
    pub strings: Vec<String>,
}

/// §3 Rotator descriptor.
#[derive(Debug, Clone)]
pub struct RotatorDescriptor {
    pub span: Span,
    pub rotation_count: usize,
}

/// §3 Decoder descriptor.
#[derive(Debug, Clone)]
pub struct DecoderDescriptor {
    pub name: String,
    pub span: Span,
    pub array_name: String,
    pub variant: DecoderVariant,
}

/// §3 ProxyDescriptor (Abba).
#[derive(Debug, Clone)]
pub struct ProxyDescriptor {
    pub name: String,
    pub array_name: String,
    pub offset: i64,
    pub strings: Vec<String>,
}

/// §3 LoaderDescriptor (Abba).
#[derive(Debug, Clone)]
pub struct LoaderDescriptor {
    pub name: String,
    pub registry_name: String,
    pub span: Span,
}
