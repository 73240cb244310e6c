//! Single-procedure evaluation with result folding.
//!
//! Wraps the language runtime with the engine's partial-failure policy:
//! every failure mode collapses to one generic outward message, while the
//! structured error is logged at debug level for internal diagnostics.

use qacalc_core::{Context, TestResult};
use qacalc_lang::{run_script, EvalConfig};

/// The single outward error message for any evaluation failure. Composite
/// procedures are semi-trusted user content; detailed failure reasons are
/// deliberately not exposed to the caller.
pub const INVALID_TEST: &str = "Invalid Test";

/// Prepares raw procedure source for evaluation by normalizing line
/// endings. True-division semantics need no directive here: the language
/// has no truncating division for bare `/` to fall back to.
pub fn preprocess(source: &str) -> String {
    source.replace("\r\n", "\n").replace('\r', "\n")
}

/// Evaluates one procedure against the shared context.
///
/// On success the result is folded into the context under the procedure's
/// slug, making it visible to downstream procedures. The transient `result`
/// binding is removed afterwards regardless of outcome, so one procedure's
/// output convention cannot leak into the next evaluation.
pub fn evaluate(slug: &str, source: &str, ctx: &mut Context, config: &EvalConfig) -> TestResult {
    let processed = preprocess(source);
    let outcome = match run_script(&processed, ctx, config) {
        Ok(value) => {
            ctx.bind(slug.to_string(), value.clone());
            TestResult::ok(value)
        }
        Err(error) => {
            tracing::debug!(slug, %error, "procedure evaluation failed");
            TestResult::failed(INVALID_TEST)
        }
    };
    ctx.unbind("result");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use qacalc_core::Value;

    fn ctx() -> Context {
        Context::new()
    }

    #[test]
    fn success_folds_result_into_context() {
        let mut ctx = ctx();
        let result = evaluate("x", "result = 5", &mut ctx, &EvalConfig::default());
        assert_eq!(result, TestResult::ok(Value::Number(5.0)));
        assert_eq!(ctx.get("x"), Some(&Value::Number(5.0)));
        // The output-convention binding must not persist.
        assert!(ctx.get("result").is_none());
    }

    #[test]
    fn failure_collapses_to_generic_message() {
        let mut ctx = ctx();
        for source in [
            "result = 1 / 0",        // runtime trap
            "result = ((",           // parse error
            "x = 1",                 // missing result
            "result = undefined_qa", // unknown name
        ] {
            let result = evaluate("t", source, &mut ctx, &EvalConfig::default());
            assert_eq!(result, TestResult::failed(INVALID_TEST), "source: {}", source);
            assert!(ctx.get("t").is_none());
        }
    }

    #[test]
    fn failure_cleans_up_transient_result() {
        let mut ctx = ctx();
        // The script binds `result` and then traps; the binding must still
        // be removed so the next procedure starts clean.
        let result = evaluate("t", "result = 1\nboom = 1 / 0", &mut ctx, &EvalConfig::default());
        assert_eq!(result, TestResult::failed(INVALID_TEST));
        assert!(ctx.get("result").is_none());
    }

    #[test]
    fn windows_line_endings_are_normalized() {
        let mut ctx = ctx();
        let result = evaluate(
            "t",
            "a = 2\r\nb = 3\rresult = a * b",
            &mut ctx,
            &EvalConfig::default(),
        );
        assert_eq!(result, TestResult::ok(Value::Number(6.0)));
    }
}
