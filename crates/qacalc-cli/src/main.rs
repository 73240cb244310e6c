//! QA calculation CLI.
//!
//! Provides the `qacalc` binary with subcommands for working with composite
//! test procedures stored as JSON files. `calc` runs a full calculation and
//! prints the report; `order` prints the resolved evaluation order without
//! evaluating anything.
//!
//! Uses the same `CalcEngine::run()` pipeline the library exposes, so a
//! calculation behaves identically from the CLI and from embedding code.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use qacalc_core::CalcRequest;
use qacalc_engine::{build_order, extract_dependencies, CalcEngine, MemoryStore, ProcedureStore};
use qacalc_lang::EvalConfig;

/// QA composite calculation engine and tools.
#[derive(Parser)]
#[command(name = "qacalc", about = "QA composite calculation engine and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Run a calculation and print the report as JSON.
    Calc {
        /// Path to the procedure file, a JSON object of slug -> source.
        #[arg(short, long)]
        tests: PathBuf,

        /// Path to the request file (composite_ids, qavalues, upload_data).
        #[arg(short, long)]
        request: PathBuf,

        /// Evaluation step budget per procedure.
        #[arg(long)]
        max_steps: Option<usize>,
    },

    /// Print the resolved evaluation order and any cyclic slugs.
    Order {
        /// Path to the procedure file, a JSON object of slug -> source.
        #[arg(short, long)]
        tests: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Calc {
            tests,
            request,
            max_steps,
        } => run_calc(&tests, &request, max_steps),
        Commands::Order { tests } => run_order(&tests),
    };
    process::exit(exit_code);
}

/// Execute the calc subcommand.
///
/// Returns exit code: 0 = calculation ran, 2 = request rejected,
/// 3 = I/O or parse error on the input files.
fn run_calc(tests: &PathBuf, request: &PathBuf, max_steps: Option<usize>) -> i32 {
    let store = match MemoryStore::from_json_file(tests) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to load procedures '{}': {}", tests.display(), e);
            return 3;
        }
    };

    let request: CalcRequest = match read_json(request) {
        Ok(r) => r,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 3;
        }
    };

    let config = match max_steps {
        Some(max_steps) => EvalConfig { max_steps },
        None => EvalConfig::default(),
    };
    let report = CalcEngine::with_config(config).run(&request, &store);

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: failed to serialize report: {}", e);
            return 3;
        }
    }
    if report.success {
        0
    } else {
        2
    }
}

/// Execute the order subcommand.
///
/// Returns exit code: 0 = order printed, 3 = I/O or parse error.
fn run_order(tests: &PathBuf) -> i32 {
    let store = match MemoryStore::from_json_file(tests) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: failed to load procedures '{}': {}", tests.display(), e);
            return 3;
        }
    };

    let slugs = store.slugs();
    let procedures = store.lookup(&slugs);
    let known: BTreeSet<String> = procedures.keys().cloned().collect();
    let dep_map = procedures
        .iter()
        .map(|(slug, source)| (slug.clone(), extract_dependencies(slug, source, &known)))
        .collect();
    let order = build_order(&dep_map);

    let json = serde_json::json!({
        "order": order.order,
        "cyclic": order.cyclic,
    });
    match serde_json::to_string_pretty(&json) {
        Ok(text) => {
            println!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: failed to serialize order: {}", e);
            3
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf) -> Result<T, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    serde_json::from_str(&text).map_err(|e| format!("failed to parse '{}': {}", path.display(), e))
}
