//! Expression Evaluator
//!
//! Interprets a parsed expression against a resolver that supplies values
//! for referenced datums. Evaluation is pure and always terminates: the
//! grammar has no loops and the tree is finite.
//!
//! # Failure semantics
//!
//! Failures are never papered over with defaults:
//!
//! - an unresolvable name fails the whole evaluation,
//! - an invalid upstream datum fails the whole evaluation,
//! - division by zero is an explicit error rather than ±∞,
//! - any non-finite result (NaN/∞, e.g. `sqrt(-1)`) is an explicit error.
//!
//! Downstream consumers therefore see a crisp invalid state instead of a
//! silently propagating NaN.

use thiserror::Error;

use super::ast::{BinaryOp, Builtin, Expr, UnaryOp, Value};

/// An error produced while evaluating an expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The expression references a name that does not resolve to any
    /// datum (never defined, or since removed).
    #[error("reference `{0}` does not resolve to a datum")]
    UnresolvedReference(String),

    /// The expression references a datum that is currently invalid.
    #[error("reference `{0}` resolves to an invalid datum")]
    UpstreamInvalid(String),

    /// Division or remainder with a zero right-hand side.
    #[error("division by zero")]
    DivisionByZero,

    /// The computation produced a non-finite value (NaN or infinity).
    #[error("result is not a finite number")]
    NotFinite,
}

/// Evaluate an expression.
///
/// `resolve` is called once per reference occurrence and maps a reference
/// name to its current value; it fails with `UnresolvedReference` or
/// `UpstreamInvalid` as appropriate. The result of every arithmetic step
/// must be finite.
pub fn evaluate<R>(expr: &Expr, resolve: &mut R) -> Result<Value, EvalError>
where
    R: FnMut(&str) -> Result<Value, EvalError>,
{
    let value = match expr {
        Expr::Number(value) => *value,
        Expr::Ref(name) => resolve(name)?,
        Expr::Unary { op, operand } => {
            let operand = evaluate(operand, resolve)?;
            match op {
                UnaryOp::Neg => -operand,
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, resolve)?;
            let rhs = evaluate(rhs, resolve)?;
            match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => {
                    if rhs == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    lhs / rhs
                }
                BinaryOp::Mod => {
                    if rhs == 0.0 {
                        return Err(EvalError::DivisionByZero);
                    }
                    lhs % rhs
                }
                BinaryOp::Pow => lhs.powf(rhs),
            }
        }
        Expr::Call { func, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(evaluate(arg, resolve)?);
            }
            apply_builtin(*func, &values)
        }
    };

    if !value.is_finite() {
        return Err(EvalError::NotFinite);
    }
    Ok(value)
}

/// Apply a built-in function. Arity was validated at parse time.
fn apply_builtin(func: Builtin, args: &[Value]) -> Value {
    match func {
        Builtin::Min => args[0].min(args[1]),
        Builtin::Max => args[0].max(args[1]),
        Builtin::Pow => args[0].powf(args[1]),
        Builtin::Atan2 => args[0].atan2(args[1]),
        Builtin::Sin => args[0].sin(),
        Builtin::Cos => args[0].cos(),
        Builtin::Tan => args[0].tan(),
        Builtin::Asin => args[0].asin(),
        Builtin::Acos => args[0].acos(),
        Builtin::Atan => args[0].atan(),
        Builtin::Sqrt => args[0].sqrt(),
        Builtin::Abs => args[0].abs(),
        Builtin::Floor => args[0].floor(),
        Builtin::Ceil => args[0].ceil(),
        Builtin::Round => args[0].round(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::parse;

    /// Resolver for expressions that reference nothing.
    fn no_refs(name: &str) -> Result<Value, EvalError> {
        Err(EvalError::UnresolvedReference(name.to_string()))
    }

    fn eval_const(text: &str) -> Result<Value, EvalError> {
        evaluate(&parse(text).unwrap(), &mut no_refs)
    }

    #[test]
    fn evaluates_arithmetic() {
        assert_eq!(eval_const("1 + 2 * 3").unwrap(), 7.0);
        assert_eq!(eval_const("(1 + 2) * 3").unwrap(), 9.0);
        assert_eq!(eval_const("10 - 3 - 2").unwrap(), 5.0);
        assert_eq!(eval_const("7 % 4").unwrap(), 3.0);
        assert_eq!(eval_const("2 ^ 10").unwrap(), 1024.0);
        assert_eq!(eval_const("-2 ^ 2").unwrap(), -4.0);
    }

    #[test]
    fn evaluates_builtins() {
        assert_eq!(eval_const("min(3, 5)").unwrap(), 3.0);
        assert_eq!(eval_const("max(3, 5)").unwrap(), 5.0);
        assert_eq!(eval_const("sqrt(16)").unwrap(), 4.0);
        assert_eq!(eval_const("abs(-2.5)").unwrap(), 2.5);
        assert_eq!(eval_const("floor(1.9)").unwrap(), 1.0);
        assert_eq!(eval_const("ceil(1.1)").unwrap(), 2.0);
        assert_eq!(eval_const("round(1.5)").unwrap(), 2.0);
        assert_eq!(eval_const("cos(0)").unwrap(), 1.0);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(eval_const("1 / 0"), Err(EvalError::DivisionByZero));
        assert_eq!(eval_const("1 % 0"), Err(EvalError::DivisionByZero));
        // Non-zero divisors are fine.
        assert_eq!(eval_const("1 / 4").unwrap(), 0.25);
    }

    #[test]
    fn non_finite_results_are_errors() {
        assert_eq!(eval_const("sqrt(-1)"), Err(EvalError::NotFinite));
        assert_eq!(eval_const("asin(2)"), Err(EvalError::NotFinite));
        assert_eq!(eval_const("10 ^ 1000"), Err(EvalError::NotFinite));
    }

    #[test]
    fn resolver_supplies_reference_values() {
        let expr = parse("a * 3 + other.b").unwrap();
        let mut resolve = |name: &str| match name {
            "a" => Ok(2.0),
            "other.b" => Ok(10.0),
            other => Err(EvalError::UnresolvedReference(other.to_string())),
        };
        assert_eq!(evaluate(&expr, &mut resolve).unwrap(), 16.0);
    }

    #[test]
    fn resolver_failure_fails_the_whole_evaluation() {
        let expr = parse("1 + missing").unwrap();
        assert_eq!(
            evaluate(&expr, &mut no_refs),
            Err(EvalError::UnresolvedReference("missing".to_string()))
        );
    }

    #[test]
    fn upstream_invalidity_passes_through() {
        let expr = parse("x * 2").unwrap();
        let mut resolve = |name: &str| Err(EvalError::UpstreamInvalid(name.to_string()));
        assert_eq!(
            evaluate(&expr, &mut resolve),
            Err(EvalError::UpstreamInvalid("x".to_string()))
        );
    }

    #[test]
    fn evaluation_is_deterministic() {
        let expr = parse("sin(1) + cos(2) * sqrt(3)").unwrap();
        let first = evaluate(&expr, &mut no_refs).unwrap();
        let second = evaluate(&expr, &mut no_refs).unwrap();
        assert_eq!(first, second);
    }
}
