//! Calculation orchestrator: one run per invocation.
//!
//! Strictly sequential state machine:
//!
//! 1. **Collect** -- resolve composite ids and validate inputs; missing
//!    procedures or missing values terminate the run before any evaluation.
//! 2. **Resolve** -- extract per-slug dependencies.
//! 3. **Order** -- topological sort with cycle isolation.
//! 4. **Seed failures** -- fixed cyclic-dependency entries for cycle members.
//! 5. **Evaluate in order** -- fold each success into the shared context.
//! 6. **Emit** -- the completed report. Partial results from earlier slugs
//!    are retained even when later slugs fail; no retries, no rollback.

use std::collections::BTreeSet;

use qacalc_core::{CalcReport, CalcRequest, TestResult};
use qacalc_lang::EvalConfig;

use crate::context::build_context;
use crate::deps::{build_order, extract_dependencies, CalcOrder, DependencyMap};
use crate::evaluator::evaluate;
use crate::store::ProcedureStore;

/// Whole-run rejection: no requested composite id resolved to a procedure.
pub const NO_COMPOSITE_IDS: &str = "No Valid Composite ID's";
/// Whole-run rejection: neither QA values nor upload data were supplied.
pub const INVALID_QA_VALUES: &str = "Invalid QA Values";
/// Per-slug fixed message for cycle members; such slugs are never evaluated.
pub const CYCLIC_DEPENDENCY: &str = "Cyclic dependency";

/// The composite calculation engine.
///
/// Holds only run-independent configuration; all per-run state (context,
/// dependency graph, report) is created inside [`CalcEngine::run`] and
/// dropped when it returns, so an engine can be reused across runs.
#[derive(Debug, Clone, Default)]
pub struct CalcEngine {
    config: EvalConfig,
}

impl CalcEngine {
    pub fn new() -> Self {
        CalcEngine::default()
    }

    pub fn with_config(config: EvalConfig) -> Self {
        CalcEngine { config }
    }

    /// Runs one calculation: resolves procedures, orders them, evaluates
    /// each in order, and reports per-slug outcomes.
    ///
    /// Never panics and never propagates an error: the two input
    /// validation failures surface as a rejected report, and per-slug
    /// failures are recorded in the report without aborting the run.
    pub fn run(&self, request: &CalcRequest, store: &dyn ProcedureStore) -> CalcReport {
        // 1. Collect.
        let procedures = store.lookup(&request.composite_ids);
        if procedures.is_empty() {
            tracing::debug!("run rejected: no valid composite ids");
            return CalcReport::rejected(NO_COMPOSITE_IDS);
        }
        if request.qavalues.is_none() && request.upload_data.is_none() {
            tracing::debug!("run rejected: no qa values or upload data supplied");
            return CalcReport::rejected(INVALID_QA_VALUES);
        }

        let known_slugs: BTreeSet<String> = procedures.keys().cloned().collect();
        let mut ctx = build_context(
            request.qavalues.as_ref(),
            request.upload_data.as_ref(),
            &known_slugs,
        );

        // 2. Resolve.
        let dep_map: DependencyMap = procedures
            .iter()
            .map(|(slug, source)| {
                (
                    slug.clone(),
                    extract_dependencies(slug, source, &known_slugs),
                )
            })
            .collect();

        // 3. Order.
        let CalcOrder { order, cyclic } = build_order(&dep_map);

        // 4. Seed failures for cycle members.
        let mut report = CalcReport::empty();
        for slug in &cyclic {
            report
                .results
                .insert(slug.clone(), TestResult::failed(CYCLIC_DEPENDENCY));
        }

        // 5. Evaluate in order. The order may contain implicit leaves that
        // are not procedures (externally-supplied names); only known slugs
        // get evaluated and reported.
        for slug in &order {
            if let Some(source) = procedures.get(slug) {
                let result = evaluate(slug, source, &mut ctx, &self.config);
                report.results.insert(slug.clone(), result);
            }
        }

        // 6. Emit.
        report
    }
}
