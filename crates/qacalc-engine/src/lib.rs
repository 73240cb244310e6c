//! Composite calculation engine for QA test procedures.
//!
//! Takes a batch of named procedures plus externally supplied test values,
//! figures out the evaluation order from cross-procedure references, and
//! evaluates each procedure in a shared context so later procedures can use
//! results of earlier ones.
//!
//! # Architecture
//!
//! - [`deps`] -- dependency extraction (lenient identifier scan intersected
//!   with the known slug set) and topological ordering with cycle isolation.
//! - [`context`] -- shared-context construction: numeric coercion of raw
//!   values, library handles, uploads map.
//! - [`evaluator`] -- single-procedure evaluation with the `result` binding
//!   convention; every failure collapses to one fixed message.
//! - [`engine`] -- the run orchestrator tying the above together.
//! - [`store`] -- the [`ProcedureStore`] lookup seam plus an in-memory
//!   implementation.

pub mod context;
pub mod deps;
pub mod engine;
pub mod evaluator;
pub mod store;

pub use context::{build_context, UPLOADS_NAME};
pub use deps::{build_order, extract_dependencies, CalcOrder, DependencyMap};
pub use engine::{CalcEngine, CYCLIC_DEPENDENCY, INVALID_QA_VALUES, NO_COMPOSITE_IDS};
pub use evaluator::{evaluate, INVALID_TEST};
pub use store::{MemoryStore, ProcedureStore, StoreError};
