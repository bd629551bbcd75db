//! The default bounded-evaluator backing (§4.3(a)): a fully embedded
//! JavaScript engine (`boa_engine`) seeded once per sandbox with:
//!
//! - the standard library boa already implements natively (`Array`,
//!   `Object`, `String`, `Math`, `JSON`, typed arrays, `Promise`,
//!   `Symbol`, `Proxy`, `Reflect`, `parseInt`/`parseFloat`, …),
//! - plausible browser stand-ins (`window`, `document`, `navigator`,
//!   `location`, `self`, `console`, synchronous timers, `atob`/`btoa`),
//!   and
//! - a recursive permissive proxy reachable for every *other* free
//!   identifier, via a sloppy-mode `with` block whose scope object is a
//!   `Proxy` with a `has` trap that only claims names we have not already
//!   provided.
//!
//! All three are JavaScript, evaluated once as a prelude when the sandbox
//! is constructed, rather than built from boa's native-function API —
//! this keeps the Rust side to "construct a context, eval a string,
//! inspect the result", and keeps the sandbox's actual permissiveness
//! policy in one readable script instead of scattered across host
//! function registrations.

use boa_engine::{js_string, Context, JsValue, Source};
use serde_json::Value as JsonValue;

use super::{EvalValue, Evaluator};
use crate::error::EvalError;

/// Global names the sandbox already provides (directly or via the
/// standard library) — the permissive `with` scope's `has` trap returns
/// `false` for these so lookups fall through to the real binding instead
/// of being shadowed by a permissive stand-in.
const KNOWN_GLOBALS: &str = r#"[
    "undefined","NaN","Infinity","globalThis","this",
    "Object","Function","Array","String","Number","Boolean","Symbol",
    "Math","JSON","Date","RegExp","Error","TypeError","RangeError","SyntaxError",
    "ReferenceError","EvalError","URIError","Map","Set","WeakMap","WeakSet",
    "Promise","Proxy","Reflect","ArrayBuffer","DataView",
    "Int8Array","Uint8Array","Uint8ClampedArray","Int16Array","Uint16Array",
    "Int32Array","Uint32Array","Float32Array","Float64Array",
    "BigInt","BigInt64Array","BigUint64Array",
    "parseInt","parseFloat","isNaN","isFinite",
    "encodeURIComponent","decodeURIComponent","encodeURI","decodeURI","eval",
    "window","document","navigator","location","self","console",
    "setTimeout","setInterval","clearTimeout","clearInterval","atob","btoa",
    "__permissive","__lastResult"
]"#;

/// A minimal, widely used `atob`/`btoa` polyfill (binary-string base64,
/// not UTF-8 aware — matching what browsers actually implement) so
/// decoder fragments that call `atob` work without a native Rust
/// function registration.
const BASE64_POLYFILL: &str = r#"
(function (global) {
    var CHARS = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/=";
    global.btoa = function (input) {
        var str = String(input);
        var output = "";
        for (var block = 0, charCode, i = 0, map = CHARS;
             str.charAt(i | 0) || (map = "=", i % 1);
             output += map.charAt(63 & (block >> (8 - (i % 1) * 8)))) {
            charCode = str.charCodeAt((i += 3 / 4));
            if (charCode > 0xff) {
                throw new Error("btoa: invalid character");
            }
            block = (block << 8) | charCode;
        }
        return output;
    };
    global.atob = function (input) {
        var str = String(input).replace(/=+$/, "");
        var output = "";
        if (str.length % 4 === 1) {
            throw new Error("atob: invalid base64 string");
        }
        for (var bc = 0, bs = 0, buffer, i = 0;
             (buffer = str.charAt(i++));
             ~buffer && ((bs = bc % 4 ? bs * 64 + buffer : buffer), bc++ % 4)
                 ? (output += String.fromCharCode(255 & (bs >> ((-2 * bc) & 6))))
                 : 0) {
            buffer = CHARS.indexOf(buffer);
        }
        return output;
    };
})(globalThis);
"#;

fn permissive_prelude() -> String {
    format!(
        r#"
(function () {{
    var KNOWN = new Set({KNOWN_GLOBALS});
    function mkPermissive() {{
        return new Proxy(function () {{}}, {{
            get: function (_t, prop) {{
                if (prop === "toString") return function () {{ return ""; }};
                if (prop === "valueOf") return function () {{ return 0; }};
                if (prop === "length") return 0;
                if (prop === Symbol.toPrimitive || typeof prop === "symbol") return undefined;
                return mkPermissive();
            }},
            set: function () {{ return true; }},
            has: function (_t, prop) {{
                return typeof prop !== "string" || !KNOWN.has(prop);
            }},
            apply: function () {{ return mkPermissive(); }},
            construct: function () {{ return mkPermissive(); }},
        }});
    }}
    globalThis.__permissive = mkPermissive;
    globalThis.window = mkPermissive();
    globalThis.document = mkPermissive();
    globalThis.navigator = mkPermissive();
    globalThis.location = mkPermissive();
    globalThis.self = globalThis;
    globalThis.console = {{
        log: function () {{}}, warn: function () {{}}, error: function () {{}},
        info: function () {{}}, debug: function () {{}}, trace: function () {{}},
    }};
    globalThis.setTimeout = function (cb) {{
        if (typeof cb === "function") {{ try {{ cb(); }} catch (e) {{}} }}
        return 0;
    }};
    globalThis.setInterval = globalThis.setTimeout;
    globalThis.clearTimeout = function () {{}};
    globalThis.clearInterval = function () {{}};
}})();
"#
    )
}

/// Wraps a fragment so free identifiers not already known to the sandbox
/// resolve through the permissive proxy instead of throwing
/// `ReferenceError`. Must run in sloppy mode (`with` is a syntax error
/// under `"use strict"` and disallowed entirely in modules), which is
/// exactly the mode `Source::from_bytes` scripts default to.
fn wrap_with_permissive_scope(fragment: &str) -> String {
    format!("with (globalThis.__permissive()) {{\n{fragment}\n}}")
}

/// An embedded-engine-backed [`Evaluator`]. One instance is constructed
/// per deobfuscation run (§5) and its `eval` is called re-entrantly, once
/// per decoder invocation site.
pub struct BoaSandbox {
    context: Context,
}

impl BoaSandbox {
    pub fn new() -> Result<Self, EvalError> {
        let mut context = Context::default();
        context
            .eval(Source::from_bytes(BASE64_POLYFILL))
            .map_err(|e| EvalError::Threw(format!("sandbox bootstrap (base64): {e}")))?;
        context
            .eval(Source::from_bytes(&permissive_prelude()))
            .map_err(|e| EvalError::Threw(format!("sandbox bootstrap (permissive): {e}")))?;
        Ok(Self { context })
    }

    fn to_eval_value(&mut self, value: &JsValue) -> Result<EvalValue, EvalError> {
        match value {
            JsValue::Null => Ok(EvalValue::Null),
            JsValue::Undefined => Ok(EvalValue::Undefined),
            JsValue::Boolean(b) => Ok(EvalValue::Bool(*b)),
            JsValue::Integer(i) => Ok(EvalValue::Number(f64::from(*i))),
            JsValue::Rational(f) => Ok(EvalValue::Number(*f)),
            JsValue::String(s) => Ok(EvalValue::String(s.to_std_string_escaped())),
            JsValue::Object(obj) => {
                self.context
                    .global_object()
                    .set(js_string!("__lastResult"), JsValue::from(obj.clone()), false, &mut self.context)
                    .map_err(|e| EvalError::Conversion(e.to_string()))?;
                let json = self
                    .context
                    .eval(Source::from_bytes(
                        "JSON.stringify(globalThis.__lastResult)",
                    ))
                    .map_err(|e| EvalError::Conversion(e.to_string()))?;
                let JsValue::String(json_str) = json else {
                    return Err(EvalError::Conversion(
                        "object result is not JSON-serializable (function, symbol, or cyclic)"
                            .to_string(),
                    ));
                };
                let parsed: JsonValue = serde_json::from_str(&json_str.to_std_string_escaped())
                    .map_err(|e| EvalError::Conversion(e.to_string()))?;
                json_value_to_eval_value(&parsed)
            }
            JsValue::BigInt(_) | JsValue::Symbol(_) => Err(EvalError::Conversion(
                "bigint/symbol results are not representable".to_string(),
            )),
        }
    }
}

fn json_value_to_eval_value(value: &JsonValue) -> Result<EvalValue, EvalError> {
    match value {
        JsonValue::Null => Ok(EvalValue::Null),
        JsonValue::Bool(b) => Ok(EvalValue::Bool(*b)),
        JsonValue::Number(n) => Ok(EvalValue::Number(n.as_f64().unwrap_or(f64::NAN))),
        JsonValue::String(s) => Ok(EvalValue::String(s.clone())),
        JsonValue::Array(items) => {
            let values = items
                .iter()
                .map(json_value_to_eval_value)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(EvalValue::Array(values))
        }
        JsonValue::Object(_) => Err(EvalError::Conversion(
            "plain-object results are not representable; expected an array or primitive"
                .to_string(),
        )),
    }
}

impl Evaluator for BoaSandbox {
    fn eval(&mut self, fragment: &str) -> Result<EvalValue, EvalError> {
        let wrapped = wrap_with_permissive_scope(fragment);
        let value = self
            .context
            .eval(Source::from_bytes(&wrapped))
            .map_err(|e| EvalError::Threw(e.to_string()))?;
        self.to_eval_value(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_plain_arithmetic() {
        let mut sandbox = BoaSandbox::new().expect("sandbox bootstrap");
        let value = sandbox.eval("1 + 2").expect("eval");
        assert_eq!(value, EvalValue::Number(3.0));
    }

    #[test]
    fn evaluates_string_array_iife() {
        let mut sandbox = BoaSandbox::new().expect("sandbox bootstrap");
        let value = sandbox
            .eval(r#"(function(a,b){return ["alpha","beta"];}(this,0x42))"#)
            .expect("eval");
        assert_eq!(
            value.as_array_of_strings(),
            Some(vec!["alpha".to_string(), "beta".to_string()])
        );
    }

    #[test]
    fn unknown_globals_are_permissive_not_throwing() {
        let mut sandbox = BoaSandbox::new().expect("sandbox bootstrap");
        let value = sandbox
            .eval("typeof someHostGlobalThatDoesNotExist")
            .expect("eval should not throw ReferenceError");
        assert_eq!(value, EvalValue::String("function".to_string()));
    }

    #[test]
    fn atob_decodes_base64() {
        let mut sandbox = BoaSandbox::new().expect("sandbox bootstrap");
        let value = sandbox.eval(r#"atob("aGVsbG8=")"#).expect("eval");
        assert_eq!(value, EvalValue::String("hello".to_string()));
    }

    #[test]
    fn sandbox_is_reentrant() {
        let mut sandbox = BoaSandbox::new().expect("sandbox bootstrap");
        for i in 0..5 {
            let value = sandbox.eval(&format!("{i} * 2")).expect("eval");
            assert_eq!(value, EvalValue::Number(f64::from(i * 2)));
        }
    }
}
