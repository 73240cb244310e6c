//! Runtime value representation for composite procedure evaluation.
//!
//! [`Value`] is the dynamic type that flows through a calculation run: QA
//! input values, intermediate bindings, and computed test results are all
//! `Value`s. Library and builtin handles are values too, so that the fixed
//! `math`/`numpy`/`scipy` names resolve through the same binding table as
//! everything else.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A runtime value produced or consumed during procedure evaluation.
///
/// All arithmetic is carried out on `Number` (f64); there is no integer
/// variant, which is what gives bare `/` true-division semantics. `Map`
/// holds upload payloads (`uploads["name"]`). `Library` and `Builtin` are
/// the fixed handles exposed to every procedure.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Library(Library),
    Builtin(Builtin),
}

impl Value {
    /// Converts a JSON payload (request value or upload data) into a
    /// runtime value. Total: every JSON shape has a value counterpart.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => Value::Map(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Returns the numeric content if this value is a `Number`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns a human-readable description of the value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::Str(_) => "Str",
            Value::List(_) => "List",
            Value::Map(_) => "Map",
            Value::Library(_) => "Library",
            Value::Builtin(_) => "Builtin",
        }
    }
}

// Reports serialize values structurally; library and builtin handles (which
// only appear in a report if a procedure returns one outright) serialize as
// their printable name.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Library(lib) => serializer.serialize_str(lib.name()),
            Value::Builtin(b) => serializer.serialize_str(b.name()),
        }
    }
}

/// The fixed library handles available to every procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Library {
    /// Scalar math functions and constants (`math.sqrt`, `math.pi`, ...).
    Math,
    /// Array-flavoured helpers over lists (`numpy.mean`, `numpy.array`, ...).
    Numpy,
    /// Statistics functions (`scipy.sem`, `scipy.norm_cdf`, ...).
    Scipy,
}

impl Library {
    pub fn name(&self) -> &'static str {
        match self {
            Library::Math => "math",
            Library::Numpy => "numpy",
            Library::Scipy => "scipy",
        }
    }
}

/// A builtin function reachable through one of the library handles.
///
/// The enum is pure data; argument checking and dispatch live in the
/// language crate's library module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    // math
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Exp,
    Log,
    Log10,
    Log2,
    Pow,
    Fabs,
    Floor,
    Ceil,
    Hypot,
    Degrees,
    Radians,
    // numpy
    Array,
    Mean,
    Average,
    Sum,
    Std,
    Var,
    Median,
    Min,
    Max,
    Abs,
    Arange,
    Linspace,
    // scipy
    Sem,
    Variation,
    Gmean,
    Hmean,
    Zscore,
    NormCdf,
    NormPdf,
}

impl Builtin {
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Sqrt => "sqrt",
            Builtin::Sin => "sin",
            Builtin::Cos => "cos",
            Builtin::Tan => "tan",
            Builtin::Asin => "asin",
            Builtin::Acos => "acos",
            Builtin::Atan => "atan",
            Builtin::Atan2 => "atan2",
            Builtin::Exp => "exp",
            Builtin::Log => "log",
            Builtin::Log10 => "log10",
            Builtin::Log2 => "log2",
            Builtin::Pow => "pow",
            Builtin::Fabs => "fabs",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Hypot => "hypot",
            Builtin::Degrees => "degrees",
            Builtin::Radians => "radians",
            Builtin::Array => "array",
            Builtin::Mean => "mean",
            Builtin::Average => "average",
            Builtin::Sum => "sum",
            Builtin::Std => "std",
            Builtin::Var => "var",
            Builtin::Median => "median",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Abs => "abs",
            Builtin::Arange => "arange",
            Builtin::Linspace => "linspace",
            Builtin::Sem => "sem",
            Builtin::Variation => "variation",
            Builtin::Gmean => "gmean",
            Builtin::Hmean => "hmean",
            Builtin::Zscore => "zscore",
            Builtin::NormCdf => "norm_cdf",
            Builtin::NormPdf => "norm_pdf",
        }
    }
}
