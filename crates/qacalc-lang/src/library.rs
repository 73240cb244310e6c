//! Builtin library dispatch: `math`, `numpy` and `scipy` handles.
//!
//! Member lookup maps a name to a constant or a [`Builtin`] function value;
//! [`call`] checks arity/types and computes the result. Scalar
//! transcendentals are backed by `libm` for cross-platform determinism;
//! the statistics functions lean on `statrs` where it has the primitive
//! (geometric/harmonic means, the normal distribution).

use qacalc_core::{Builtin, Library, Value};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};
use statrs::statistics::Statistics;

use crate::error::EvalError;
use crate::eval::Budget;

/// Resolves `library.name` to a member value.
pub fn member(library: Library, name: &str) -> Result<Value, EvalError> {
    let member = match library {
        Library::Math => match name {
            "pi" => return Ok(Value::Number(std::f64::consts::PI)),
            "e" => return Ok(Value::Number(std::f64::consts::E)),
            "sqrt" => Builtin::Sqrt,
            "sin" => Builtin::Sin,
            "cos" => Builtin::Cos,
            "tan" => Builtin::Tan,
            "asin" => Builtin::Asin,
            "acos" => Builtin::Acos,
            "atan" => Builtin::Atan,
            "atan2" => Builtin::Atan2,
            "exp" => Builtin::Exp,
            "log" => Builtin::Log,
            "log10" => Builtin::Log10,
            "log2" => Builtin::Log2,
            "pow" => Builtin::Pow,
            "fabs" => Builtin::Fabs,
            "floor" => Builtin::Floor,
            "ceil" => Builtin::Ceil,
            "hypot" => Builtin::Hypot,
            "degrees" => Builtin::Degrees,
            "radians" => Builtin::Radians,
            _ => return unknown(library, name),
        },
        Library::Numpy => match name {
            "pi" => return Ok(Value::Number(std::f64::consts::PI)),
            "e" => return Ok(Value::Number(std::f64::consts::E)),
            "array" => Builtin::Array,
            "mean" => Builtin::Mean,
            "average" => Builtin::Average,
            "sum" => Builtin::Sum,
            "std" => Builtin::Std,
            "var" => Builtin::Var,
            "median" => Builtin::Median,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "abs" => Builtin::Abs,
            "arange" => Builtin::Arange,
            "linspace" => Builtin::Linspace,
            _ => return unknown(library, name),
        },
        Library::Scipy => match name {
            "sem" => Builtin::Sem,
            "variation" => Builtin::Variation,
            "gmean" => Builtin::Gmean,
            "hmean" => Builtin::Hmean,
            "zscore" => Builtin::Zscore,
            "norm_cdf" => Builtin::NormCdf,
            "norm_pdf" => Builtin::NormPdf,
            _ => return unknown(library, name),
        },
    };
    Ok(Value::Builtin(member))
}

fn unknown(library: Library, name: &str) -> Result<Value, EvalError> {
    Err(EvalError::UnknownMember {
        library: library.name(),
        name: name.to_string(),
    })
}

/// Calls a builtin with already-evaluated arguments.
///
/// Sequence-generating builtins (`arange`, `linspace`) charge the run's
/// budget one step per produced element, so their work is bounded the same
/// way the AST walk is.
pub(crate) fn call(
    builtin: Builtin,
    args: &[Value],
    budget: &mut Budget,
) -> Result<Value, EvalError> {
    match builtin {
        // math: scalar functions
        Builtin::Sqrt => scalar1(builtin, args, libm::sqrt),
        Builtin::Sin => scalar1(builtin, args, libm::sin),
        Builtin::Cos => scalar1(builtin, args, libm::cos),
        Builtin::Tan => scalar1(builtin, args, libm::tan),
        Builtin::Asin => scalar1(builtin, args, libm::asin),
        Builtin::Acos => scalar1(builtin, args, libm::acos),
        Builtin::Atan => scalar1(builtin, args, libm::atan),
        Builtin::Atan2 => scalar2(builtin, args, libm::atan2),
        Builtin::Exp => scalar1(builtin, args, libm::exp),
        Builtin::Log => match args.len() {
            1 => scalar1(builtin, args, libm::log),
            // log(x, base)
            2 => scalar2(builtin, args, |x, base| libm::log(x) / libm::log(base)),
            got => arity(builtin, "1 or 2", got),
        },
        Builtin::Log10 => scalar1(builtin, args, libm::log10),
        Builtin::Log2 => scalar1(builtin, args, libm::log2),
        Builtin::Pow => scalar2(builtin, args, libm::pow),
        Builtin::Fabs => scalar1(builtin, args, libm::fabs),
        Builtin::Floor => scalar1(builtin, args, libm::floor),
        Builtin::Ceil => scalar1(builtin, args, libm::ceil),
        Builtin::Hypot => scalar2(builtin, args, libm::hypot),
        Builtin::Degrees => scalar1(builtin, args, f64::to_degrees),
        Builtin::Radians => scalar1(builtin, args, f64::to_radians),

        // numpy: sequence functions
        Builtin::Array => {
            let xs = sequence(builtin, args)?;
            Ok(list(xs))
        }
        Builtin::Mean | Builtin::Average => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            Ok(Value::Number(mean(&xs)))
        }
        Builtin::Sum => {
            let xs = sequence(builtin, args)?;
            Ok(Value::Number(xs.iter().sum()))
        }
        Builtin::Std => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            Ok(Value::Number(population_std(&xs)))
        }
        Builtin::Var => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            let std = population_std(&xs);
            Ok(Value::Number(std * std))
        }
        Builtin::Median => {
            let mut xs = nonempty(builtin, sequence(builtin, args)?)?;
            xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            let mid = xs.len() / 2;
            let median = if xs.len() % 2 == 0 {
                (xs[mid - 1] + xs[mid]) / 2.0
            } else {
                xs[mid]
            };
            Ok(Value::Number(median))
        }
        Builtin::Min => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            Ok(Value::Number(xs.iter().copied().fold(f64::INFINITY, f64::min)))
        }
        Builtin::Max => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            Ok(Value::Number(
                xs.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            ))
        }
        Builtin::Abs => match args {
            [Value::Number(n)] => Ok(Value::Number(n.abs())),
            _ => {
                let xs = sequence(builtin, args)?;
                Ok(list(xs.into_iter().map(f64::abs).collect()))
            }
        },
        Builtin::Arange => {
            let (start, stop, step) = match args.len() {
                1 => (0.0, number(builtin, &args[0])?, 1.0),
                2 => (number(builtin, &args[0])?, number(builtin, &args[1])?, 1.0),
                3 => (
                    number(builtin, &args[0])?,
                    number(builtin, &args[1])?,
                    number(builtin, &args[2])?,
                ),
                got => return arity(builtin, "1 to 3", got),
            };
            if step == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            let mut xs = Vec::new();
            let mut x = start;
            while (step > 0.0 && x < stop) || (step < 0.0 && x > stop) {
                budget.charge(1)?;
                xs.push(x);
                x += step;
            }
            Ok(list(xs))
        }
        Builtin::Linspace => {
            let (start, stop) = match args {
                [a, b] | [a, b, _] => (number(builtin, a)?, number(builtin, b)?),
                _ => return arity(builtin, "2 or 3", args.len()),
            };
            let count = match args.get(2) {
                Some(v) => number(builtin, v)? as usize,
                None => 50,
            };
            budget.charge(count)?;
            let xs = match count {
                0 => Vec::new(),
                1 => vec![start],
                n => {
                    let step = (stop - start) / (n - 1) as f64;
                    (0..n).map(|i| start + step * i as f64).collect()
                }
            };
            Ok(list(xs))
        }

        // scipy: statistics
        Builtin::Sem => {
            let xs = sequence(builtin, args)?;
            if xs.len() < 2 {
                return Err(EvalError::EmptySequence {
                    function: builtin.name(),
                });
            }
            let n = xs.len() as f64;
            let std = sample_std(&xs);
            Ok(Value::Number(std / libm::sqrt(n)))
        }
        Builtin::Variation => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            let m = mean(&xs);
            if m == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            Ok(Value::Number(population_std(&xs) / m))
        }
        Builtin::Gmean => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            Ok(Value::Number(xs.iter().geometric_mean()))
        }
        Builtin::Hmean => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            Ok(Value::Number(xs.iter().harmonic_mean()))
        }
        Builtin::Zscore => {
            let xs = nonempty(builtin, sequence(builtin, args)?)?;
            let m = mean(&xs);
            let std = population_std(&xs);
            if std == 0.0 {
                return Err(EvalError::DivideByZero);
            }
            Ok(list(xs.iter().map(|x| (x - m) / std).collect()))
        }
        Builtin::NormCdf => {
            let x = one_number(builtin, args)?;
            Ok(Value::Number(standard_normal()?.cdf(x)))
        }
        Builtin::NormPdf => {
            let x = one_number(builtin, args)?;
            Ok(Value::Number(standard_normal()?.pdf(x)))
        }
    }
}

// -----------------------------------------------------------------------
// Argument helpers
// -----------------------------------------------------------------------

fn arity(builtin: Builtin, expected: &'static str, got: usize) -> Result<Value, EvalError> {
    Err(EvalError::ArityMismatch {
        function: builtin.name(),
        expected,
        got,
    })
}

fn number(builtin: Builtin, value: &Value) -> Result<f64, EvalError> {
    value.as_number().ok_or(EvalError::BadArgument {
        function: builtin.name(),
        got: value.type_name(),
    })
}

fn one_number(builtin: Builtin, args: &[Value]) -> Result<f64, EvalError> {
    match args {
        [v] => number(builtin, v),
        _ => Err(EvalError::ArityMismatch {
            function: builtin.name(),
            expected: "1",
            got: args.len(),
        }),
    }
}

fn scalar1(builtin: Builtin, args: &[Value], f: impl Fn(f64) -> f64) -> Result<Value, EvalError> {
    Ok(Value::Number(f(one_number(builtin, args)?)))
}

fn scalar2(
    builtin: Builtin,
    args: &[Value],
    f: impl Fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match args {
        [a, b] => Ok(Value::Number(f(number(builtin, a)?, number(builtin, b)?))),
        _ => arity(builtin, "2", args.len()),
    }
}

/// Accepts either one list argument or a spread of scalar arguments, and
/// flattens to a vector of f64.
fn sequence(builtin: Builtin, args: &[Value]) -> Result<Vec<f64>, EvalError> {
    match args {
        [Value::List(items)] => items.iter().map(|v| number(builtin, v)).collect(),
        _ => args.iter().map(|v| number(builtin, v)).collect(),
    }
}

fn nonempty(builtin: Builtin, xs: Vec<f64>) -> Result<Vec<f64>, EvalError> {
    if xs.is_empty() {
        return Err(EvalError::EmptySequence {
            function: builtin.name(),
        });
    }
    Ok(xs)
}

fn list(xs: Vec<f64>) -> Value {
    Value::List(xs.into_iter().map(Value::Number).collect())
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Population standard deviation (ddof = 0), numpy's default.
fn population_std(xs: &[f64]) -> f64 {
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / xs.len() as f64;
    libm::sqrt(var)
}

/// Sample standard deviation (ddof = 1), scipy.sem's default.
fn sample_std(xs: &[f64]) -> f64 {
    let m = mean(xs);
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (xs.len() as f64 - 1.0);
    libm::sqrt(var)
}

fn standard_normal() -> Result<Normal, EvalError> {
    Normal::new(0.0, 1.0).map_err(|e| EvalError::Internal {
        message: format!("standard normal construction failed: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, args: &[Value]) -> Result<Value, EvalError> {
        super::call(builtin, args, &mut Budget::new(100_000))
    }

    fn close(actual: Value, expected: f64) {
        match actual {
            Value::Number(n) => assert!(
                (n - expected).abs() < 1e-9,
                "expected {}, got {}",
                expected,
                n
            ),
            other => panic!("Expected Number, got {:?}", other),
        }
    }

    #[test]
    fn math_members_resolve() {
        assert_eq!(
            member(Library::Math, "sqrt").unwrap(),
            Value::Builtin(Builtin::Sqrt)
        );
        close(member(Library::Math, "pi").unwrap(), std::f64::consts::PI);
        assert!(matches!(
            member(Library::Math, "nope"),
            Err(EvalError::UnknownMember { library: "math", .. })
        ));
    }

    #[test]
    fn scalar_functions() {
        close(call(Builtin::Sqrt, &[Value::Number(16.0)]).unwrap(), 4.0);
        close(
            call(Builtin::Atan2, &[Value::Number(1.0), Value::Number(1.0)]).unwrap(),
            std::f64::consts::FRAC_PI_4,
        );
        close(
            call(Builtin::Log, &[Value::Number(8.0), Value::Number(2.0)]).unwrap(),
            3.0,
        );
        close(call(Builtin::Degrees, &[Value::Number(std::f64::consts::PI)]).unwrap(), 180.0);
    }

    #[test]
    fn scalar_arity_is_checked() {
        assert!(matches!(
            call(Builtin::Sqrt, &[]),
            Err(EvalError::ArityMismatch { .. })
        ));
        assert!(matches!(
            call(Builtin::Sqrt, &[Value::Str("x".into())]),
            Err(EvalError::BadArgument { .. })
        ));
    }

    #[test]
    fn sequence_statistics() {
        let data = Value::List(vec![
            Value::Number(2.0),
            Value::Number(4.0),
            Value::Number(4.0),
            Value::Number(4.0),
            Value::Number(5.0),
            Value::Number(5.0),
            Value::Number(7.0),
            Value::Number(9.0),
        ]);
        close(call(Builtin::Mean, std::slice::from_ref(&data)).unwrap(), 5.0);
        // Population std of the classic example data set is exactly 2.
        close(call(Builtin::Std, std::slice::from_ref(&data)).unwrap(), 2.0);
        close(call(Builtin::Var, std::slice::from_ref(&data)).unwrap(), 4.0);
        close(call(Builtin::Sum, std::slice::from_ref(&data)).unwrap(), 40.0);
        close(call(Builtin::Min, std::slice::from_ref(&data)).unwrap(), 2.0);
        close(call(Builtin::Max, std::slice::from_ref(&data)).unwrap(), 9.0);
    }

    #[test]
    fn median_even_and_odd() {
        let odd = Value::List(vec![
            Value::Number(3.0),
            Value::Number(1.0),
            Value::Number(2.0),
        ]);
        close(call(Builtin::Median, &[odd]).unwrap(), 2.0);
        let even = Value::List(vec![
            Value::Number(4.0),
            Value::Number(1.0),
            Value::Number(3.0),
            Value::Number(2.0),
        ]);
        close(call(Builtin::Median, &[even]).unwrap(), 2.5);
    }

    #[test]
    fn sequence_accepts_spread_scalars() {
        close(
            call(
                Builtin::Mean,
                &[Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)],
            )
            .unwrap(),
            2.0,
        );
    }

    #[test]
    fn empty_sequence_traps() {
        assert!(matches!(
            call(Builtin::Mean, &[Value::List(vec![])]),
            Err(EvalError::EmptySequence { function: "mean" })
        ));
    }

    #[test]
    fn arange_and_linspace() {
        assert_eq!(
            call(Builtin::Arange, &[Value::Number(3.0)]).unwrap(),
            Value::List(vec![
                Value::Number(0.0),
                Value::Number(1.0),
                Value::Number(2.0)
            ])
        );
        assert_eq!(
            call(
                Builtin::Linspace,
                &[Value::Number(0.0), Value::Number(1.0), Value::Number(3.0)]
            )
            .unwrap(),
            Value::List(vec![
                Value::Number(0.0),
                Value::Number(0.5),
                Value::Number(1.0)
            ])
        );
    }

    #[test]
    fn generator_builtins_draw_from_the_budget() {
        let mut budget = Budget::new(10);
        assert_eq!(
            super::call(Builtin::Arange, &[Value::Number(1_000_000.0)], &mut budget),
            Err(EvalError::BudgetExhausted { limit: 10 })
        );
        let mut budget = Budget::new(10);
        assert_eq!(
            super::call(
                Builtin::Linspace,
                &[Value::Number(0.0), Value::Number(1.0), Value::Number(1e12)],
                &mut budget
            ),
            Err(EvalError::BudgetExhausted { limit: 10 })
        );
    }

    #[test]
    fn scipy_means() {
        let data = Value::List(vec![
            Value::Number(1.0),
            Value::Number(4.0),
            Value::Number(16.0),
        ]);
        close(call(Builtin::Gmean, std::slice::from_ref(&data)).unwrap(), 4.0);
        let data = Value::List(vec![Value::Number(1.0), Value::Number(1.0)]);
        close(call(Builtin::Hmean, &[data]).unwrap(), 1.0);
    }

    #[test]
    fn scipy_sem_matches_sample_formula() {
        let data = Value::List(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0),
            Value::Number(4.0),
        ]);
        // sample std = sqrt(5/3), sem = sqrt(5/3)/2
        close(
            call(Builtin::Sem, &[data]).unwrap(),
            (5.0f64 / 3.0).sqrt() / 2.0,
        );
    }

    #[test]
    fn normal_distribution() {
        close(call(Builtin::NormCdf, &[Value::Number(0.0)]).unwrap(), 0.5);
        close(
            call(Builtin::NormPdf, &[Value::Number(0.0)]).unwrap(),
            1.0 / (2.0 * std::f64::consts::PI).sqrt(),
        );
    }

    #[test]
    fn zscore_standardizes() {
        let data = Value::List(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(3.0),
        ]);
        match call(Builtin::Zscore, &[data]).unwrap() {
            Value::List(items) => {
                close(items[1].clone(), 0.0);
                assert_eq!(items.len(), 3);
            }
            other => panic!("Expected List, got {:?}", other),
        }
    }
}
