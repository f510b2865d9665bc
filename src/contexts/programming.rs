//! Programming vocabulary: comparisons, word logic, bitwise operators,
//! `**` power and `//` floor division, postfix increment/decrement.
//!
//! There is no boolean kind; comparisons and connectives produce `1` or `0`
//! as doubles, and connectives read any nonzero operand as true.

use crate::context::{ContextBuilder, MathContext};
use crate::error::MathError;
use crate::precedence::Precedence;

fn truthy(x: f64) -> bool {
    x != 0.0
}

fn as_double(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn bits(f: fn(i64, i64) -> i64) -> impl Fn(f64, f64) -> f64 {
    move |a, b| f(a as i64, b as i64) as f64
}

/// Bind a word operator under both lowercase and uppercase spellings
fn word(
    builder: ContextBuilder,
    lower: &str,
    upper: &str,
    f: impl Fn(f64, f64) -> f64 + Clone + Send + Sync + 'static,
    precedence: Precedence,
) -> ContextBuilder {
    builder
        .operator(lower, f.clone(), precedence)
        .operator(upper, f, precedence)
}

/// The programming vocabulary over doubles.
pub fn programming() -> Result<MathContext, MathError> {
    let builder = MathContext::builder()
        .constant("true", 1.0)
        .constant("false", 0.0)
        // power and floor division are context symbols, not core grammar
        .operand_infix("**", f64::powf, Precedence::Exponentiation)
        .operator("//", |a: f64, b: f64| (a / b).floor(), Precedence::Basic)
        .operator("%", |a: f64, b: f64| a % b, Precedence::Basic)
        // comparisons
        .operator("=", |a, b| as_double(a == b), Precedence::Comparison)
        .operator("<>", |a, b| as_double(a != b), Precedence::Comparison)
        .operator("!=", |a, b| as_double(a != b), Precedence::Comparison)
        .operator("<", |a, b| as_double(a < b), Precedence::Comparison)
        .operator(">", |a, b| as_double(a > b), Precedence::Comparison)
        .operator("<=", |a, b| as_double(a <= b), Precedence::Comparison)
        .operator(">=", |a, b| as_double(a >= b), Precedence::Comparison)
        // bitwise over truncated integers
        .operator("&", bits(|a, b| a & b), Precedence::BitwiseAnd)
        .operator("|", bits(|a, b| a | b), Precedence::BitwiseOr)
        .operator("<<", bits(|a, b| a << b), Precedence::Basic)
        .operator(">>", bits(|a, b| a >> b), Precedence::Basic)
        // postfix increment/decrement
        .postfix("++", |x: f64| x + 1.0)
        .postfix("--", |x: f64| x - 1.0)
        .prefix("not", |x: f64| as_double(!truthy(x)))
        .prefix("NOT", |x: f64| as_double(!truthy(x)))
        .function("min", |args: &[f64]| {
            args.iter().copied().reduce(f64::min).unwrap_or(f64::NAN)
        })
        .function("max", |args: &[f64]| {
            args.iter().copied().reduce(f64::max).unwrap_or(f64::NAN)
        });

    // word connectives
    let builder = word(
        builder,
        "and",
        "AND",
        |a, b| as_double(truthy(a) && truthy(b)),
        Precedence::ConditionalAnd,
    );
    let builder = word(
        builder,
        "or",
        "OR",
        |a, b| as_double(truthy(a) || truthy(b)),
        Precedence::ConditionalOr,
    );
    let builder = word(
        builder,
        "xor",
        "XOR",
        |a, b| as_double(truthy(a) != truthy(b)),
        Precedence::BitwiseXor,
    );
    let builder = builder
        .operator(
            "=>",
            |a, b| as_double(!truthy(a) || truthy(b)),
            Precedence::Implication,
        )
        .operator(
            "<=>",
            |a, b| as_double(truthy(a) == truthy(b)),
            Precedence::Equivalence,
        );

    builder.build()
}
