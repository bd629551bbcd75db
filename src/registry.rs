//! Target registry (§4.4): holds the set of named targets and resolves
//! which one a run should use, either by explicit id or by detection score.

use oxc_ast::ast::Program;
use rustc_hash::FxHashMap;

use crate::error::{DeobfuscateError, Result};
use crate::target::{DetectionResult, Target, TargetMeta};

pub struct TargetRegistry {
    targets: FxHashMap<&'static str, Box<dyn Target>>,
    order: Vec<&'static str>,
    default: Option<&'static str>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self {
            targets: FxHashMap::default(),
            order: Vec::new(),
            default: None,
        }
    }

    /// Registers `target`, logging (rather than failing) if it overwrites
    /// an id already present.
    pub fn register(&mut self, target: Box<dyn Target>) {
        let id = target.meta().id;
        if self.targets.contains_key(id) {
            tracing::info!(target: "js_deobfuscate::registry", "overwriting target {id}");
        } else {
            self.order.push(id);
        }
        self.targets.insert(id, target);
    }

    pub fn unregister(&mut self, id: &str) {
        self.targets.remove(id);
        self.order.retain(|&existing| existing != id);
        if self.default == Some(id) {
            self.default = None;
        }
    }

    pub fn get(&self, id: &str) -> Option<&dyn Target> {
        self.targets.get(id).map(|t| t.as_ref())
    }

    pub fn get_all(&self) -> Vec<&dyn Target> {
        self.order
            .iter()
            .filter_map(|id| self.get(id))
            .collect()
    }

    pub fn list(&self) -> Vec<TargetMeta> {
        self.get_all().iter().map(|t| t.meta()).collect()
    }

    pub fn has(&self, id: &str) -> bool {
        self.targets.contains_key(id)
    }

    pub fn set_default(&mut self, id: &str) -> Result<()> {
        if !self.has(id) {
            return Err(DeobfuscateError::UnknownTarget(id.to_string()));
        }
        self.default = Some(self.targets.get_key_value(id).unwrap().0);
        Ok(())
    }

    pub fn default_target(&self) -> Option<&dyn Target> {
        self.default.and_then(|id| self.get(id))
    }

    /// Runs every target's `detect`, swallowing per-target failures (§4.4),
    /// omits targets with zero or absent confidence, and sorts the rest by
    /// descending confidence.
    pub fn detect(&self, program: &Program<'_>, source: &str) -> Vec<(&'static str, DetectionResult)> {
        let mut results: Vec<(&'static str, DetectionResult)> = self
            .order
            .iter()
            .filter_map(|&id| {
                let target = self.targets.get(id)?;
                match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    target.detect(program, source)
                })) {
                    Ok(Some(result)) if result.confidence > 0.0 => Some((id, result)),
                    Ok(_) => None,
                    Err(_) => {
                        tracing::info!(
                            target: "js_deobfuscate::registry",
                            "detection failed for target {id}"
                        );
                        None
                    }
                }
            })
            .collect();
        results.sort_by(|a, b| b.1.confidence.total_cmp(&a.1.confidence));
        results
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DeobfuscatorContext;

    struct AlwaysConfident(f64, &'static str);

    impl Target for AlwaysConfident {
        fn meta(&self) -> TargetMeta {
            TargetMeta {
                id: self.1,
                name: self.1,
                description: None,
                tags: &[],
            }
        }

        fn detect(&self, _program: &Program<'_>, _source: &str) -> Option<DetectionResult> {
            Some(DetectionResult {
                confidence: self.0,
                details: String::new(),
            })
        }

        fn run(&self, _ctx: &mut DeobfuscatorContext<'_, '_>) {}
    }

    fn empty_program(allocator: &oxc_allocator::Allocator) -> Program<'_> {
        oxc_parser::Parser::new(allocator, "", oxc_span::SourceType::mjs())
            .parse()
            .program
    }

    #[test]
    fn unknown_default_fails() {
        let mut registry = TargetRegistry::new();
        assert!(registry.set_default("nope").is_err());
    }

    #[test]
    fn detect_sorts_and_omits_zero_confidence() {
        let mut registry = TargetRegistry::new();
        registry.register(Box::new(AlwaysConfident(0.5, "a")));
        registry.register(Box::new(AlwaysConfident(0.0, "b")));
        registry.register(Box::new(AlwaysConfident(0.9, "c")));

        let allocator = oxc_allocator::Allocator::default();
        let program = empty_program(&allocator);
        let results = registry.detect(&program, "");
        assert_eq!(results.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec!["c", "a"]);
    }
}
