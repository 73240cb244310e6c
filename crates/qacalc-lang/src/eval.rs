//! Tree-walking evaluator for procedure scripts.
//!
//! Executes a parsed script against a mutable [`Context`], enforcing a fuel
//! budget so a runaway procedure cannot hang the host. Every trap condition
//! (bad operands, division by zero, unknown names, budget exhaustion)
//! surfaces as a structured [`EvalError`]; nothing panics and nothing
//! outside the context's bindings is reachable from a script.

use qacalc_core::{Context, Value};
use smallvec::SmallVec;

use crate::ast::{BinOp, CmpOp, Expr, LogicOp, Stmt, UnaryOp};
use crate::error::EvalError;
use crate::library;
use crate::parser::parse;

/// Evaluation limits for one procedure run.
#[derive(Debug, Clone, Copy)]
pub struct EvalConfig {
    /// Maximum number of AST node evaluations before the run is trapped.
    pub max_steps: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig { max_steps: 100_000 }
    }
}

/// Parses and executes `source` against `ctx`, returning the value bound to
/// `result`.
///
/// The script convention is Python-like: statements run top to bottom, and
/// the script must leave a binding literally named `result`. The `result`
/// binding is left in the context; the caller is responsible for cleaning
/// it up between procedures.
pub fn run_script(
    source: &str,
    ctx: &mut Context,
    config: &EvalConfig,
) -> Result<Value, EvalError> {
    let stmts = parse(source)?;
    let mut ev = Evaluator {
        ctx,
        budget: Budget::new(config.max_steps),
    };
    for stmt in &stmts {
        ev.exec(stmt)?;
    }
    ctx.get("result").cloned().ok_or(EvalError::NoResult)
}

/// Remaining fuel for one script run.
///
/// Shared between the AST walk (one step per node) and the builtin
/// library, where sequence-generating functions charge one step per
/// produced element so a single call cannot do unbounded work.
pub(crate) struct Budget {
    steps_left: usize,
    limit: usize,
}

impl Budget {
    pub(crate) fn new(max_steps: usize) -> Self {
        Budget {
            steps_left: max_steps,
            limit: max_steps,
        }
    }

    pub(crate) fn charge(&mut self, steps: usize) -> Result<(), EvalError> {
        if steps > self.steps_left {
            self.steps_left = 0;
            return Err(EvalError::BudgetExhausted { limit: self.limit });
        }
        self.steps_left -= steps;
        Ok(())
    }
}

struct Evaluator<'c> {
    ctx: &'c mut Context,
    budget: Budget,
}

impl Evaluator<'_> {
    fn exec(&mut self, stmt: &Stmt) -> Result<(), EvalError> {
        match stmt {
            Stmt::Assign { name, expr } => {
                let value = self.eval(expr)?;
                self.ctx.bind(name.clone(), value);
            }
            Stmt::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        self.tick()?;
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::None => Ok(Value::None),

            Expr::Ident(name) => self
                .ctx
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::UnknownName { name: name.clone() }),

            Expr::List(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                Ok(Value::List(values))
            }

            Expr::Attr { base, name } => {
                let base = self.eval(base)?;
                match base {
                    Value::Library(lib) => library::member(lib, name),
                    other => Err(EvalError::BadOperand {
                        op: "attribute access",
                        operand: other.type_name(),
                    }),
                }
            }

            Expr::Index { base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                index_value(&base, &index)
            }

            Expr::Call { callee, args } => {
                let callee = self.eval(callee)?;
                let mut values: SmallVec<[Value; 4]> = SmallVec::with_capacity(args.len());
                for arg in args.iter() {
                    values.push(self.eval(arg)?);
                }
                match callee {
                    Value::Builtin(builtin) => library::call(builtin, &values, &mut self.budget),
                    other => Err(EvalError::NotCallable {
                        type_name: other.type_name(),
                    }),
                }
            }

            Expr::Unary { op, expr } => {
                let value = self.eval(expr)?;
                match op {
                    UnaryOp::Neg => negate(&value),
                    UnaryOp::Not => Ok(Value::Bool(!truthy(&value))),
                }
            }

            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                arith(*op, &lhs, &rhs)
            }

            Expr::Compare { op, lhs, rhs } => {
                let lhs = self.eval(lhs)?;
                let rhs = self.eval(rhs)?;
                compare(*op, &lhs, &rhs)
            }

            Expr::Logic { op, lhs, rhs } => {
                // Short-circuit: yield the deciding operand, Python-style.
                let lhs = self.eval(lhs)?;
                match op {
                    LogicOp::And if !truthy(&lhs) => Ok(lhs),
                    LogicOp::Or if truthy(&lhs) => Ok(lhs),
                    _ => self.eval(rhs),
                }
            }

            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                let cond = self.eval(cond)?;
                if truthy(&cond) {
                    self.eval(then)
                } else {
                    self.eval(otherwise)
                }
            }
        }
    }

    fn tick(&mut self) -> Result<(), EvalError> {
        self.budget.charge(1)
    }
}

/// Truthiness, Python-style: zero, empty containers, empty strings, `None`
/// and `False` are falsy; everything else (including library handles) is
/// truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Number(n) => *n != 0.0,
        Value::Str(s) => !s.is_empty(),
        Value::List(items) => !items.is_empty(),
        Value::Map(fields) => !fields.is_empty(),
        Value::Library(_) | Value::Builtin(_) => true,
    }
}

fn negate(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Number(n) => Ok(Value::Number(-n)),
        Value::Bool(b) => Ok(Value::Number(if *b { -1.0 } else { 0.0 })),
        Value::List(items) => {
            let negated: Result<Vec<Value>, EvalError> = items.iter().map(negate).collect();
            Ok(Value::List(negated?))
        }
        other => Err(EvalError::BadOperand {
            op: "unary -",
            operand: other.type_name(),
        }),
    }
}

/// Binary arithmetic with one level of numpy-style broadcasting: scalars
/// combine with scalars, lists combine elementwise with scalars or with
/// equal-length lists. `+` additionally concatenates strings.
pub fn arith(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => scalar_arith(op, *a, *b),
        (Value::Str(a), Value::Str(b)) if op == BinOp::Add => {
            Ok(Value::Str(format!("{}{}", a, b)))
        }
        (Value::List(xs), Value::List(ys)) => {
            if xs.len() != ys.len() {
                return Err(EvalError::LengthMismatch {
                    left: xs.len(),
                    right: ys.len(),
                });
            }
            let items: Result<Vec<Value>, EvalError> = xs
                .iter()
                .zip(ys.iter())
                .map(|(x, y)| arith(op, x, y))
                .collect();
            Ok(Value::List(items?))
        }
        (Value::List(xs), Value::Number(_)) => {
            let items: Result<Vec<Value>, EvalError> =
                xs.iter().map(|x| arith(op, x, rhs)).collect();
            Ok(Value::List(items?))
        }
        (Value::Number(_), Value::List(ys)) => {
            let items: Result<Vec<Value>, EvalError> =
                ys.iter().map(|y| arith(op, lhs, y)).collect();
            Ok(Value::List(items?))
        }
        _ => Err(EvalError::BadOperands {
            op: op.symbol(),
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

fn scalar_arith(op: BinOp, a: f64, b: f64) -> Result<Value, EvalError> {
    let value = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        // `/` is always true division; `//` floors; `%` follows the sign of
        // the divisor (Python semantics). All three trap on a zero divisor
        // instead of producing inf/NaN.
        BinOp::Div => {
            if b == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            a / b
        }
        BinOp::FloorDiv => {
            if b == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            (a / b).floor()
        }
        BinOp::Mod => {
            if b == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            a - b * (a / b).floor()
        }
        BinOp::Pow => {
            // 0 to a negative power is a division by zero in disguise.
            if a == 0.0 && b < 0.0 {
                return Err(EvalError::DivideByZero);
            }
            libm::pow(a, b)
        }
    };
    Ok(Value::Number(value))
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let outcome = match op {
        CmpOp::Eq => lhs == rhs,
        CmpOp::Ne => lhs != rhs,
        _ => {
            let ordering_holds = match (lhs, rhs) {
                (Value::Number(a), Value::Number(b)) => ordered(op, a.partial_cmp(b)),
                (Value::Str(a), Value::Str(b)) => ordered(op, Some(a.cmp(b))),
                _ => {
                    return Err(EvalError::BadOperands {
                        op: op.symbol(),
                        lhs: lhs.type_name(),
                        rhs: rhs.type_name(),
                    })
                }
            };
            ordering_holds
        }
    };
    Ok(Value::Bool(outcome))
}

fn ordered(op: CmpOp, ordering: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    match ordering {
        // NaN comparisons are false, as in IEEE 754 / Python.
        None => false,
        Some(ord) => match op {
            CmpOp::Lt => ord == Less,
            CmpOp::Le => ord != Greater,
            CmpOp::Gt => ord == Greater,
            CmpOp::Ge => ord != Less,
            CmpOp::Eq | CmpOp::Ne => unreachable!("handled structurally"),
        },
    }
}

fn index_value(base: &Value, index: &Value) -> Result<Value, EvalError> {
    match (base, index) {
        (Value::List(items), Value::Number(n)) => {
            if n.fract() != 0.0 {
                return Err(EvalError::BadOperands {
                    op: "indexing",
                    lhs: base.type_name(),
                    rhs: "non-integer Number",
                });
            }
            let raw = *n as i64;
            // Negative indices count from the end, Python-style.
            let resolved = if raw < 0 {
                raw + items.len() as i64
            } else {
                raw
            };
            if resolved < 0 || resolved as usize >= items.len() {
                return Err(EvalError::IndexOutOfBounds {
                    index: raw,
                    len: items.len(),
                });
            }
            Ok(items[resolved as usize].clone())
        }
        (Value::Map(fields), Value::Str(key)) => fields
            .get(key)
            .cloned()
            .ok_or_else(|| EvalError::KeyNotFound { key: key.clone() }),
        _ => Err(EvalError::BadOperands {
            op: "indexing",
            lhs: base.type_name(),
            rhs: index.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qacalc_core::Library;

    fn run(source: &str, ctx: &mut Context) -> Result<Value, EvalError> {
        run_script(source, ctx, &EvalConfig::default())
    }

    fn eval_expr(source: &str) -> Result<Value, EvalError> {
        let mut ctx = Context::new();
        run(&format!("result = {}", source), &mut ctx)
    }

    fn num(source: &str) -> f64 {
        match eval_expr(source) {
            Ok(Value::Number(n)) => n,
            other => panic!("Expected Number from '{}', got {:?}", source, other),
        }
    }

    #[test]
    fn bare_slash_is_true_division() {
        assert_eq!(num("1 / 2"), 0.5);
        assert_eq!(num("7 / 2"), 3.5);
    }

    #[test]
    fn floor_division_and_modulo() {
        assert_eq!(num("7 // 2"), 3.0);
        assert_eq!(num("-7 // 2"), -4.0);
        assert_eq!(num("7 % 3"), 1.0);
        // Python modulo: sign follows the divisor.
        assert_eq!(num("-7 % 3"), 2.0);
    }

    #[test]
    fn division_by_zero_traps() {
        assert_eq!(eval_expr("1 / 0"), Err(EvalError::DivideByZero));
        assert_eq!(eval_expr("1 // 0"), Err(EvalError::DivideByZero));
        assert_eq!(eval_expr("1 % 0"), Err(EvalError::DivideByZero));
    }

    #[test]
    fn power_and_precedence() {
        assert_eq!(num("2 ** 3"), 8.0);
        assert_eq!(num("2 ** 3 ** 2"), 512.0);
        assert_eq!(num("2 + 3 * 4"), 14.0);
        assert_eq!(num("-(2 + 1)"), -3.0);
    }

    #[test]
    fn zero_to_a_negative_power_traps() {
        assert_eq!(eval_expr("0 ** -1"), Err(EvalError::DivideByZero));
        assert_eq!(eval_expr("0.0 ** -0.5"), Err(EvalError::DivideByZero));
        assert_eq!(num("0 ** 0"), 1.0);
        assert_eq!(num("0 ** 2"), 0.0);
    }

    #[test]
    fn list_broadcasting() {
        assert_eq!(
            eval_expr("[1, 2, 3] * 2").unwrap(),
            Value::List(vec![
                Value::Number(2.0),
                Value::Number(4.0),
                Value::Number(6.0)
            ])
        );
        assert_eq!(
            eval_expr("[1, 2] + [10, 20]").unwrap(),
            Value::List(vec![Value::Number(11.0), Value::Number(22.0)])
        );
        assert_eq!(
            eval_expr("[1, 2] + [1, 2, 3]"),
            Err(EvalError::LengthMismatch { left: 2, right: 3 })
        );
    }

    #[test]
    fn string_concat_but_no_string_arithmetic() {
        assert_eq!(
            eval_expr("'ok: ' + 'pass'").unwrap(),
            Value::Str("ok: pass".into())
        );
        assert!(matches!(
            eval_expr("'a' * 'b'"),
            Err(EvalError::BadOperands { .. })
        ));
    }

    #[test]
    fn comparisons_and_logic() {
        assert_eq!(eval_expr("1 < 2").unwrap(), Value::Bool(true));
        assert_eq!(eval_expr("'a' >= 'b'").unwrap(), Value::Bool(false));
        assert_eq!(eval_expr("1 == 1 and 2 != 3").unwrap(), Value::Bool(true));
        // `and`/`or` yield the deciding operand.
        assert_eq!(eval_expr("0 or 5").unwrap(), Value::Number(5.0));
        assert_eq!(eval_expr("0 and 5").unwrap(), Value::Number(0.0));
        assert_eq!(eval_expr("not 0").unwrap(), Value::Bool(true));
    }

    #[test]
    fn ternary_expression() {
        assert_eq!(num("10 if 1 > 0 else 20"), 10.0);
        assert_eq!(num("10 if 1 < 0 else 20"), 20.0);
    }

    #[test]
    fn indexing_lists_and_maps() {
        assert_eq!(num("[10, 20, 30][1]"), 20.0);
        assert_eq!(num("[10, 20, 30][-1]"), 30.0);
        assert_eq!(
            eval_expr("[1, 2][5]"),
            Err(EvalError::IndexOutOfBounds { index: 5, len: 2 })
        );

        let mut ctx = Context::new();
        let mut uploads = indexmap::IndexMap::new();
        uploads.insert("scan".to_string(), Value::Number(9.0));
        ctx.bind("uploads", Value::Map(uploads));
        assert_eq!(
            run("result = uploads['scan']", &mut ctx).unwrap(),
            Value::Number(9.0)
        );
        assert_eq!(
            run("result = uploads['missing']", &mut ctx),
            Err(EvalError::KeyNotFound {
                key: "missing".into()
            })
        );
    }

    #[test]
    fn multi_statement_scripts_bind_intermediates() {
        let mut ctx = Context::new();
        ctx.bind("raw", Value::Number(8.0));
        let value = run("half = raw / 2\nresult = half + 1", &mut ctx).unwrap();
        assert_eq!(value, Value::Number(5.0));
        assert_eq!(ctx.get("half"), Some(&Value::Number(4.0)));
    }

    #[test]
    fn missing_result_binding_is_an_error() {
        let mut ctx = Context::new();
        assert_eq!(run("x = 1 + 1", &mut ctx), Err(EvalError::NoResult));
    }

    #[test]
    fn unknown_name_is_an_error() {
        assert_eq!(
            eval_expr("nonexistent + 1"),
            Err(EvalError::UnknownName {
                name: "nonexistent".into()
            })
        );
    }

    #[test]
    fn library_members_resolve_through_context() {
        let mut ctx = Context::new();
        ctx.bind("math", Value::Library(Library::Math));
        let value = run("result = math.sqrt(9)", &mut ctx).unwrap();
        assert_eq!(value, Value::Number(3.0));
    }

    #[test]
    fn calling_a_non_callable_traps() {
        assert!(matches!(
            eval_expr("3(4)"),
            Err(EvalError::NotCallable { type_name: "Number" })
        ));
    }

    #[test]
    fn budget_exhaustion_traps() {
        let mut ctx = Context::new();
        let config = EvalConfig { max_steps: 10 };
        let outcome = run_script(
            "result = 1 + 1 + 1 + 1 + 1 + 1 + 1 + 1 + 1 + 1 + 1 + 1",
            &mut ctx,
            &config,
        );
        assert_eq!(outcome, Err(EvalError::BudgetExhausted { limit: 10 }));
    }

    #[test]
    fn budget_bounds_builtin_sequence_generation() {
        let mut ctx = Context::new();
        ctx.bind("numpy", Value::Library(Library::Numpy));
        let config = EvalConfig { max_steps: 10 };
        let outcome = run_script("result = numpy.arange(0, 1000000)", &mut ctx, &config);
        assert_eq!(outcome, Err(EvalError::BudgetExhausted { limit: 10 }));

        let outcome = run_script(
            "result = numpy.linspace(0, 1, 1000000)",
            &mut ctx,
            &config,
        );
        assert_eq!(outcome, Err(EvalError::BudgetExhausted { limit: 10 }));
    }
}
