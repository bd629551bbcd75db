//! Property tests for the two invariants §8's "Universal invariants"
//! section calls out by name: rotation correctness and bounded strings.

use js_deobfuscate::evaluator::boa_sandbox::BoaSandbox;
use js_deobfuscate::evaluator::Evaluator;
use js_deobfuscate::target::DeobfuscatorContext;
use js_deobfuscate::targets::obfuscator_io::ObfuscatorIoTarget;
use js_deobfuscate::transform::TransformState;
use js_deobfuscate::Target;
use oxc_allocator::Allocator;
use proptest::prelude::*;

fn rotate_left(elements: &[String], rotation: usize) -> Vec<String> {
    if elements.is_empty() {
        return elements.to_vec();
    }
    let n = rotation % elements.len();
    let mut rotated = elements[n..].to_vec();
    rotated.extend_from_slice(&elements[..n]);
    rotated
}

fn js_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

proptest! {
    // For any array of length L and rotation count R, rotating left by R
    // produces [elements[R % L..], elements[..R % L]] — matches
    // `rotator::rotate_in_place`'s remove-first/push-last loop exactly.
    #[test]
    fn rotation_matches_remove_first_push_last(
        elements in prop::collection::vec("[a-z]{1,6}", 0..8),
        rotation in 0usize..20,
    ) {
        let allocator = Allocator::default();
        let array_literal = elements
            .iter()
            .map(|e| js_string_literal(e))
            .collect::<Vec<_>>()
            .join(", ");
        let source = format!(
            "var a = [{array_literal}]; (function(e, f) {{ while (f--) {{ e[\"push\"](e[\"shift\"]()); }} }}(a, {rotation}));"
        );
        let mut program = js_deobfuscate::ast::parse(&allocator, &source).expect("parses");
        let result = js_deobfuscate::targets::rotator::find_and_apply(&mut program, &allocator, "a");

        if elements.is_empty() {
            prop_assert!(result.is_some());
        } else {
            let descriptor = result.expect("rotator shape always matches for a non-empty array");
            prop_assert_eq!(descriptor.rotation_count, rotation);
            let code = js_deobfuscate::ast::codegen(&program);
            let expected = rotate_left(&elements, rotation);
            let expected_literal = expected
                .iter()
                .map(|e| js_string_literal(e))
                .collect::<Vec<_>>()
                .join(", ");
            prop_assert!(code.contains(&format!("[{expected_literal}]")));
        }
    }

    // Every string the obfuscator.io pipeline inlines from its decoder
    // must equal byte-for-byte what the sandboxed evaluator actually
    // returned for that call — the pipeline never guesses or truncates.
    #[test]
    fn decoder_output_is_inlined_byte_for_byte(repeat_count in 1usize..12) {
        let payload = "X".repeat(repeat_count);
        let allocator = Allocator::default();
        let source = format!(
            "var f = (function(){{var A=[{payload:?}];return function(i){{return A[i];}};}})(); console.log(f(0));"
        );
        let mut program = js_deobfuscate::ast::parse(&allocator, &source).expect("parses");
        let mut state = TransformState::new();
        let mut sandbox = BoaSandbox::new().expect("sandbox");
        let mut ctx = DeobfuscatorContext {
            program: &mut program,
            allocator: &allocator,
            source: &source,
            state: &mut state,
            evaluator: Some(&mut sandbox as &mut dyn Evaluator),
            debug_logging: false,
            on_log: None,
        };
        ObfuscatorIoTarget.run(&mut ctx);
        let code = js_deobfuscate::ast::codegen(&program);
        prop_assert!(code.contains(&js_string_literal(&payload)));
    }
}
