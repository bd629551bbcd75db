use js_deobfuscate::target::DeobfuscatorContext;
use js_deobfuscate::targets::{abba::AbbaTarget, obfuscator_io::ObfuscatorIoTarget};
use js_deobfuscate::transform::TransformState;
use js_deobfuscate::Target;
use oxc_allocator::Allocator;

fn main() {
    let obfuscated_code = r#"
var _0x5a3b = ["Hello", "World", "Test", "Message"];
(function (_0x4d8f, _0x3c2a) {
    var _0x1b9e = function (_0x2f7d) {
        while (--_0x2f7d) {
            _0x4d8f.push(_0x4d8f.shift());
        }
    };
    _0x1b9e(2);
})(_0x5a3b, 0x192);
function _0xdec(_0x4c3d) {
    return _0x5a3b[_0x4c3d];
}
console.log(_0xdec(0));
console.log(_0xdec(1));
console.log(_0xdec(2));
    "#;

    println!("=== Original Obfuscated Code ===");
    println!("{obfuscated_code}");
    println!();

    let allocator = Allocator::default();
    let mut program = js_deobfuscate::ast::parse(&allocator, obfuscated_code)
        .expect("sample code should parse");

    let targets: [&dyn Target; 2] = [&ObfuscatorIoTarget, &AbbaTarget];
    let chosen = targets
        .iter()
        .filter_map(|t| t.detect(&program, obfuscated_code).map(|d| (*t, d)))
        .max_by(|(_, a), (_, b)| a.confidence.total_cmp(&b.confidence));

    let Some((target, detection)) = chosen else {
        println!("no target recognized this bundle's shape");
        return;
    };
    println!(
        "=== Detected {} (confidence {:.2}: {}) ===",
        target.meta().name,
        detection.confidence,
        detection.details
    );

    let mut state = TransformState::new();
    let mut ctx = DeobfuscatorContext {
        program: &mut program,
        allocator: &allocator,
        source: obfuscated_code,
        state: &mut state,
        evaluator: None,
        debug_logging: false,
        on_log: None,
    };
    target.run(&mut ctx);

    println!("=== Deobfuscated Code ({} change(s)) ===", state.changes);
    println!("{}", js_deobfuscate::ast::codegen(&program));
}
