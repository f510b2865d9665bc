use crate::{contexts, evaluate, Evaluator, MathContext};

fn sci() -> MathContext {
    contexts::scientific().unwrap()
}

fn eval_sci(text: &str) -> f64 {
    Evaluator::new().context(&sci()).evaluate(text).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn plain_arithmetic_needs_no_context() {
    assert_eq!(evaluate("2 + (5 - 1)").unwrap(), 6.0);
    assert_eq!(evaluate("2 - 5 * 10 / 2 - 1").unwrap(), -24.0);
    assert_eq!(evaluate("6 / 3 * 2").unwrap(), 4.0);
    assert_eq!(evaluate("1 + 2 * 3").unwrap(), 7.0);
}

#[test]
fn unary_signs() {
    assert_eq!(evaluate("-4").unwrap(), -4.0);
    assert_eq!(evaluate("+5").unwrap(), 5.0);
    assert_eq!(evaluate("- -4").unwrap(), 4.0);
    assert_eq!(evaluate("2 - -4").unwrap(), 6.0);
    assert_eq!(evaluate("5 * -3").unwrap(), -15.0);
}

#[test]
fn exponentiation_is_right_associative() {
    assert_eq!(eval_sci("2^3^2"), 512.0);
    assert_eq!(eval_sci("3^4^2"), 43046721.0);
    assert_eq!(eval_sci("2^-2"), 0.25);
}

#[test]
fn unary_minus_binds_looser_than_exponent() {
    assert_eq!(eval_sci("-2^2"), -4.0);
}

#[test]
fn postfix_factorial_chains_with_exponent() {
    assert_eq!(eval_sci("2!^(3)!^2!"), 68719476736.0);
    assert_eq!(eval_sci("5!"), 120.0);
    assert_eq!(eval_sci("0!"), 1.0);
}

#[test]
fn implicit_multiplication() {
    assert_eq!(evaluate("2(5 - 1)").unwrap(), 8.0);
    assert_eq!(evaluate("(3 + 1)(5 - 1)").unwrap(), 16.0);
    assert_eq!(evaluate("(3)(4)").unwrap(), 12.0);

    let pi = std::f64::consts::PI;
    assert_close(eval_sci("ππ"), pi * pi);
    assert_close(eval_sci("2pi"), 2.0 * pi);
}

#[test]
fn implicit_multiplication_with_functions() {
    assert_eq!(eval_sci("3abs-5"), 15.0);
    assert_close(eval_sci("2sin(pi/6)"), 1.0);
}

#[test]
fn exponent_applies_to_the_primary_not_the_product() {
    // a(b+c)^2 is a * ((b+c)^2)
    assert_eq!(eval_sci("2(3)^2"), 18.0);
    assert_eq!(eval_sci("3(1+1)^2"), 12.0);
}

#[test]
fn bracketless_function_argument_is_one_operand() {
    assert_close(eval_sci("sin(30°)"), 0.5);
    assert_close(eval_sci("sin30°"), 0.5);
    assert_close(eval_sci("sin30° + 1"), 1.5);
    // the operand of sin keeps directly juxtaposed tight tokens
    assert_close(eval_sci("sin 2pi"), 0.0);
}

#[test]
fn bracket_delimited_functions() {
    assert_eq!(eval_sci("|1 - 9|"), 8.0);
    assert_eq!(eval_sci("2|1 - 3|"), 4.0);
    assert_eq!(eval_sci("⌊2.6⌋"), 2.0);
    assert_eq!(eval_sci("⌈2.1⌉"), 3.0);
}

#[test]
fn word_operators_chain_left_to_right() {
    assert_eq!(eval_sci("10 mod 4 mod 3"), 2.0);
    assert_eq!(eval_sci("1 + 7 mod 3"), 2.0);
}

#[test]
fn variadic_functions() {
    assert_eq!(eval_sci("max(2, 3) * min(4, 5)"), 12.0);
    assert_eq!(eval_sci("max(1, 2, 3, 4)"), 4.0);
    assert_eq!(eval_sci("max (2, 3)"), 3.0);
}

#[test]
fn roots_and_logs() {
    assert_eq!(eval_sci("√16"), 4.0);
    assert_eq!(eval_sci("√16 + 1"), 5.0);
    assert_close(eval_sci("sqrt(2)sqrt(2)"), 2.0);
    assert_close(eval_sci("log(1000)"), 3.0);
    assert_close(eval_sci("ln(e)"), 1.0);
}

#[test]
fn euler_constant_vs_exponent_notation() {
    // `1e2` is a literal; `2e` is the number 2 times Euler's constant
    assert_eq!(eval_sci("1e2"), 100.0);
    assert_close(eval_sci("2e"), 2.0 * std::f64::consts::E);
}

#[test]
fn getter_entities_allow_empty_call_parens() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let counter = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&counter);
    let ctx = MathContext::builder()
        .getter("tick", move || c.fetch_add(1, Ordering::Relaxed) as f64)
        .build()
        .unwrap();

    let eval = Evaluator::new().context(&ctx);
    assert_eq!(eval.evaluate("tick()").unwrap(), 0.0);
    assert_eq!(eval.evaluate("tick").unwrap(), 1.0);
    assert_eq!(eval.evaluate("tick() + tick()").unwrap(), 5.0);
}
