pub mod context;
pub mod report;
pub mod request;
pub mod value;

// Re-export commonly used types
pub use context::Context;
pub use report::{CalcReport, TestResult};
pub use request::CalcRequest;
pub use value::{Builtin, Library, Value};
