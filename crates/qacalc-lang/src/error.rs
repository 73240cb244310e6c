//! Error types for the procedure language.
//!
//! Uses `thiserror` for structured, matchable variants. The engine collapses
//! all of these to one generic outward message; the fine-grained variants
//! exist for internal diagnostics and tests.

use thiserror::Error;

/// Errors produced while lexing a procedure with the strict lexer.
///
/// The lenient identifier scan used for dependency extraction never
/// produces these; it skips anything it cannot lex.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal starting at byte {pos}")]
    UnterminatedString { pos: usize },

    #[error("malformed number literal at byte {pos}")]
    MalformedNumber { pos: usize },
}

/// Errors produced by the recursive-descent parser.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error("unexpected token {found} at byte {pos}")]
    UnexpectedToken { found: String, pos: usize },

    #[error("unexpected end of input")]
    UnexpectedEnd,
}

/// Runtime errors trapped during procedure evaluation.
///
/// Every variant halts the current procedure; none of them escapes the
/// calculation run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unknown name '{name}'")]
    UnknownName { name: String },

    #[error("unsupported operand types for {op}: {lhs} and {rhs}")]
    BadOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("unsupported operand type for {op}: {operand}")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivideByZero,

    #[error("library '{library}' has no member '{name}'")]
    UnknownMember { library: &'static str, name: String },

    #[error("value of type {type_name} is not callable")]
    NotCallable { type_name: &'static str },

    #[error("{function}() expected {expected} argument(s), got {got}")]
    ArityMismatch {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{function}() expected a numeric argument, got {got}")]
    BadArgument {
        function: &'static str,
        got: &'static str,
    },

    #[error("{function}() arg is an empty sequence")]
    EmptySequence { function: &'static str },

    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("key '{key}' not found")]
    KeyNotFound { key: String },

    #[error("operands could not be broadcast together: lengths {left} and {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("evaluation budget of {limit} steps exhausted")]
    BudgetExhausted { limit: usize },

    #[error("procedure did not bind a 'result' value")]
    NoResult,

    #[error("internal error: {message}")]
    Internal { message: String },
}
