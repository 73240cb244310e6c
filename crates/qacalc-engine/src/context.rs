//! Execution context construction for a calculation run.
//!
//! Seeds the binding table every procedure evaluates against: the three
//! fixed library handles, the upload map under the fixed name `uploads`,
//! and the coerced external QA values. Names that collide with a known
//! procedure slug are skipped here; those bindings appear lazily as the
//! corresponding procedures succeed.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use qacalc_core::{Context, Library, Value};

/// The fixed name the upload map is bound under.
pub const UPLOADS_NAME: &str = "uploads";

/// Builds the initial execution context for one run. Never fails:
/// unparsable values degrade gracefully to their string form.
pub fn build_context(
    qavalues: Option<&IndexMap<String, serde_json::Value>>,
    upload_data: Option<&IndexMap<String, serde_json::Value>>,
    known_slugs: &BTreeSet<String>,
) -> Context {
    let mut ctx = Context::new();
    ctx.bind("math", Value::Library(Library::Math));
    ctx.bind("numpy", Value::Library(Library::Numpy));
    ctx.bind("scipy", Value::Library(Library::Scipy));

    let uploads: IndexMap<String, Value> = upload_data
        .map(|data| {
            data.iter()
                .map(|(name, payload)| (name.clone(), Value::from_json(payload)))
                .collect()
        })
        .unwrap_or_default();
    ctx.bind(UPLOADS_NAME, Value::Map(uploads));

    if let Some(values) = qavalues {
        for (name, raw) in values {
            if known_slugs.contains(name) {
                continue;
            }
            ctx.bind(name.clone(), coerce(raw));
        }
    }

    ctx
}

/// Coerces a raw request value: numbers stay numeric, numeric-looking
/// strings parse to floats, everything else converts structurally.
fn coerce(raw: &serde_json::Value) -> Value {
    if let serde_json::Value::String(s) = raw {
        if let Ok(parsed) = s.trim().parse::<f64>() {
            return Value::Number(parsed);
        }
    }
    Value::from_json(raw)
}
