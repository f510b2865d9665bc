//! Scientific vocabularies: trigonometry, logarithms, roots, factorial,
//! degrees — in the double and decimal kinds.

use rust_decimal::{Decimal, MathematicalOps};

use crate::context::MathContext;
use crate::error::MathError;
use crate::precedence::Precedence;

/// Factorial over doubles; only non-negative integers are in its domain
fn factorial(x: f64) -> Result<f64, MathError> {
    if x.fract() != 0.0 {
        return Err(MathError::domain(format!(
            "Not integer number {x} isn't supported by the factorial function."
        )));
    }
    if x < 0.0 {
        return Err(MathError::domain(format!(
            "Negative number {x} isn't supported by the factorial function."
        )));
    }
    let mut acc = 1.0;
    let mut k = 2.0;
    while k <= x {
        acc *= k;
        k += 1.0;
    }
    Ok(acc)
}

fn fold(args: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    args.iter().copied().reduce(pick).unwrap_or(f64::NAN)
}

/// The scientific vocabulary over doubles.
///
/// Bracketless unary functions take one tightly-bound operand, so both
/// `sin(x)` and `sin30°` notations evaluate. `^` is right-associative
/// exponentiation, `!` is a domain-checked factorial, `°` converts degrees
/// to radians.
pub fn scientific() -> Result<MathContext, MathError> {
    MathContext::builder()
        // constants
        .constant("pi", std::f64::consts::PI)
        .constant("π", std::f64::consts::PI)
        .constant("tau", std::f64::consts::TAU)
        .constant("τ", std::f64::consts::TAU)
        .constant("e", std::f64::consts::E)
        .constant("∞", f64::INFINITY)
        // trigonometric
        .unary("sin", f64::sin)
        .unary("cos", f64::cos)
        .unary("tan", f64::tan)
        .unary("cot", |x: f64| x.cos() / x.sin())
        .unary("sec", |x: f64| 1.0 / x.cos())
        .unary("csc", |x: f64| 1.0 / x.sin())
        .unary("arcsin", f64::asin)
        .unary("arccos", f64::acos)
        .unary("arctan", f64::atan)
        .unary("arccot", |x: f64| (1.0 / x).atan())
        .unary("arcsec", |x: f64| (1.0 / x).acos())
        .unary("arccsc", |x: f64| (1.0 / x).asin())
        // hyperbolic
        .unary("sinh", f64::sinh)
        .unary("cosh", f64::cosh)
        .unary("tanh", f64::tanh)
        .unary("coth", |x: f64| x.cosh() / x.sinh())
        .unary("arsinh", f64::asinh)
        .unary("arcosh", f64::acosh)
        .unary("artanh", f64::atanh)
        // exponential, logarithmic, roots
        .unary("exp", f64::exp)
        .unary("ln", f64::ln)
        .unary("log", f64::log10)
        .unary("lg", f64::log2)
        .unary("sqrt", f64::sqrt)
        .unary("√", f64::sqrt)
        .unary("cbrt", f64::cbrt)
        // absolute value and rounding, in word and bracket notations
        .unary("abs", f64::abs)
        .bracket_unary("|", f64::abs, None, '|')
        .bracket_unary("⌊", f64::floor, None, '⌋')
        .bracket_unary("⌈", f64::ceil, None, '⌉')
        .unary("floor", f64::floor)
        .unary("ceil", f64::ceil)
        .unary("round", f64::round)
        // n-ary
        .function("min", |args| fold(args, f64::min))
        .function("max", |args| fold(args, f64::max))
        // operators
        .operand_infix("^", f64::powf, Precedence::Exponentiation)
        .operator("mod", |a: f64, b: f64| a % b, Precedence::Basic)
        .try_postfix("!", factorial)
        .postfix("°", f64::to_radians)
        .build()
}

fn decimal_err(message: &str) -> MathError {
    MathError::domain(message.to_string())
}

/// The scientific vocabulary over decimals.
///
/// Bounded-range operations go through the checked decimal API, so overflow
/// and domain violations surface as evaluation errors rather than panics.
pub fn decimal_scientific() -> Result<MathContext, MathError> {
    MathContext::builder()
        .constant("pi", Decimal::PI)
        .constant("π", Decimal::PI)
        .constant("e", Decimal::E)
        .try_unary("sqrt", |x: Decimal| {
            x.sqrt()
                .ok_or_else(|| decimal_err("Square root of a negative decimal number"))
        })
        .try_unary("ln", |x: Decimal| {
            x.checked_ln()
                .ok_or_else(|| decimal_err("Logarithm of a non-positive decimal number"))
        })
        .try_unary("log", |x: Decimal| {
            x.checked_log10()
                .ok_or_else(|| decimal_err("Logarithm of a non-positive decimal number"))
        })
        .try_unary("exp", |x: Decimal| {
            x.checked_exp()
                .ok_or_else(|| MathError::arithmetic("Decimal value was out of range"))
        })
        .unary("abs", |x: Decimal| x.abs())
        .bracket_unary("|", |x: Decimal| x.abs(), None, '|')
        .unary("floor", |x: Decimal| x.floor())
        .unary("ceil", |x: Decimal| x.ceil())
        .unary("round", |x: Decimal| x.round())
        .function("min", |args: &[Decimal]| {
            args.iter().copied().reduce(Decimal::min).unwrap_or_default()
        })
        .function("max", |args: &[Decimal]| {
            args.iter().copied().reduce(Decimal::max).unwrap_or_default()
        })
        .try_operand_infix(
            "^",
            |a: Decimal, b: Decimal| {
                a.checked_powd(b)
                    .ok_or_else(|| MathError::arithmetic("Decimal value was out of range"))
            },
            Precedence::Exponentiation,
        )
        .try_operator(
            "mod",
            |a: Decimal, b: Decimal| {
                a.checked_rem(b)
                    .ok_or_else(|| MathError::arithmetic("Attempted to divide by zero"))
            },
            Precedence::Basic,
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factorial_domain() {
        assert_eq!(factorial(0.0).unwrap(), 1.0);
        assert_eq!(factorial(5.0).unwrap(), 120.0);

        let err = factorial(0.2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error of evaluating the expression. Not integer number 0.2 isn't supported by the factorial function."
        );
        assert!(factorial(-3.0).is_err());
    }

    #[test]
    fn contexts_build() {
        assert!(scientific().is_ok());
        assert!(decimal_scientific().is_ok());
    }
}
