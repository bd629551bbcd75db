//! # js-deobfuscate
//!
//! An AST-driven JavaScript deobfuscator (§1, §2): parse with `oxc`,
//! detect which obfuscation family a bundle was produced by, and run
//! that family's pipeline of structural rewrites plus a bounded,
//! sandboxed evaluator for the handful of steps that can't be undone
//! without running the obfuscator's own code.
//!
//! ## Example
//!
//! ```rust
//! use js_deobfuscate::registry::TargetRegistry;
//! use js_deobfuscate::run_options::RunOptions;
//! use js_deobfuscate::targets::{abba::AbbaTarget, obfuscator_io::ObfuscatorIoTarget};
//!
//! let mut registry = TargetRegistry::new();
//! registry.register(Box::new(ObfuscatorIoTarget));
//! registry.register(Box::new(AbbaTarget));
//!
//! let source = "var x = 1;";
//! let state = js_deobfuscate::run_deobfuscation(source, &RunOptions::new(), &registry)
//!     .expect("deobfuscation failed");
//! let _ = state.changes;
//! ```

pub mod ast;
pub mod dead_code;
pub mod entry;
pub mod error;
pub mod evaluator;
pub mod model;
pub mod registry;
pub mod run_options;
pub mod target;
pub mod targets;
pub mod transform;

pub use entry::run_deobfuscation;
pub use error::{DeobfuscateError, Result};
pub use registry::TargetRegistry;
pub use run_options::RunOptions;
pub use target::{DeobfuscatorContext, Target, TargetMeta};
pub use transform::TransformState;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::targets::obfuscator_io::ObfuscatorIoTarget;

    #[test]
    fn no_target_registered_is_a_no_op() {
        let registry = TargetRegistry::new();
        let state = run_deobfuscation("var x = 1;", &RunOptions::new(), &registry).expect("runs");
        assert_eq!(state.changes, 0);
    }

    #[test]
    fn auto_detection_picks_up_obfuscator_io_shape() {
        let mut registry = TargetRegistry::new();
        registry.register(Box::new(ObfuscatorIoTarget));
        let source = r#"var f = (function(){var A=["hello","world"];return function(i){return A[i];};})(); console.log(f(0));"#;
        let state = run_deobfuscation(source, &RunOptions::new(), &registry).expect("runs");
        assert!(state.changes > 0);
    }
}
