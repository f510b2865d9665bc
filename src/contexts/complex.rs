//! Scientific vocabulary over the complex kind.
//!
//! The imaginary unit itself is part of the complex literal grammar (`i`,
//! `3i`), not a binding; this vocabulary adds the functions and operators
//! that make sense on ℂ.

use num_complex::Complex64;

use crate::context::MathContext;
use crate::error::MathError;
use crate::precedence::Precedence;

fn re(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// The scientific vocabulary over complex numbers.
pub fn complex_scientific() -> Result<MathContext, MathError> {
    MathContext::builder()
        .constant("pi", re(std::f64::consts::PI))
        .constant("π", re(std::f64::consts::PI))
        .constant("e", re(std::f64::consts::E))
        .unary("sin", Complex64::sin)
        .unary("cos", Complex64::cos)
        .unary("tan", Complex64::tan)
        .unary("sinh", Complex64::sinh)
        .unary("cosh", Complex64::cosh)
        .unary("tanh", Complex64::tanh)
        .unary("exp", Complex64::exp)
        .unary("ln", Complex64::ln)
        .unary("sqrt", Complex64::sqrt)
        .unary("√", Complex64::sqrt)
        // projections produce real-valued complex numbers
        .unary("abs", |z: Complex64| re(z.norm()))
        .bracket_unary("|", |z: Complex64| re(z.norm()), None, '|')
        .unary("norm", |z: Complex64| re(z.norm()))
        .unary("arg", |z: Complex64| re(z.arg()))
        .unary("re", |z: Complex64| re(z.re))
        .unary("im", |z: Complex64| re(z.im))
        .unary("conj", |z: Complex64| z.conj())
        .operand_infix("^", Complex64::powc, Precedence::Exponentiation)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Evaluator;

    #[test]
    fn imaginary_arithmetic() {
        let ctx = complex_scientific().unwrap();
        let eval = Evaluator::new().context(&ctx);

        let v = eval.evaluate_complex("i * i").unwrap();
        assert_eq!(v, Complex64::new(-1.0, 0.0));

        let v = eval.evaluate_complex("(2 + 3i)(2 - 3i)").unwrap();
        assert_eq!(v, Complex64::new(13.0, 0.0));
    }

    #[test]
    fn euler_identity_is_close() {
        let ctx = complex_scientific().unwrap();
        let v = Evaluator::new()
            .context(&ctx)
            .evaluate_complex("exp(pi i) + 1")
            .unwrap();
        assert!(v.norm() < 1e-12);
    }
}
