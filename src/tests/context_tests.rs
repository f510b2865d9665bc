use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::{contexts, MathContext, MathError, Evaluator, Parameters, ParameterSource, Precedence};

#[test]
fn parameters_resolve_as_variables() {
    let mut params = Parameters::new();
    params.bind_variable("x", 3.0).unwrap();
    params.bind_variable("y", 4.0).unwrap();

    let eval = Evaluator::new();
    let eval = eval.parameters(&params);
    assert_eq!(eval.evaluate("x * y + 1").unwrap(), 13.0);
    assert_eq!(eval.evaluate("xy").unwrap(), 12.0);
}

#[test]
fn context_shadows_same_named_parameter() {
    let ctx = MathContext::builder().constant("x", 10.0).build().unwrap();
    let mut params = Parameters::new();
    params.bind_variable("x", 2.0).unwrap();

    let v = Evaluator::new()
        .context(&ctx)
        .parameters(&params)
        .evaluate("x + 1")
        .unwrap();
    assert_eq!(v, 11.0);
}

#[test]
fn parameter_functions() {
    let mut params = Parameters::new();
    params.bind_unary("double", |x: f64| x * 2.0).unwrap();
    params
        .bind_function("sum", |args: &[f64]| args.iter().sum())
        .unwrap();

    let eval = Evaluator::new();
    let eval = eval.parameters(&params);
    assert_eq!(eval.evaluate("double(4)").unwrap(), 8.0);
    assert_eq!(eval.evaluate("sum(1, 2, 3)").unwrap(), 6.0);
}

#[test]
fn parameter_source_adapter() {
    struct Projectile {
        v0: f64,
        angle: f64,
    }

    impl ParameterSource for Projectile {
        fn bind_into(&self, params: &mut Parameters) -> Result<(), MathError> {
            params.bind_variable("v0", self.v0)?;
            params.bind_variable("angle", self.angle)
        }
    }

    let params = Parameters::from_source(&Projectile {
        v0: 20.0,
        angle: 0.5,
    })
    .unwrap();
    let ctx = contexts::scientific().unwrap();
    let v = Evaluator::new()
        .context(&ctx)
        .parameters(&params)
        .evaluate("v0 sin(angle)")
        .unwrap();
    assert!((v - 20.0 * 0.5f64.sin()).abs() < 1e-12);
}

#[test]
fn custom_operators_at_table_precedence() {
    let ctx = MathContext::builder()
        .operator("plusfirst", |a: f64, b: f64| a + b, Precedence::LowestBasic)
        .operand_infix("pow", f64::powf, Precedence::Exponentiation)
        .prefix("neg", |x: f64| -x)
        .postfix("pct", |x: f64| x / 100.0)
        .build()
        .unwrap();
    let eval = Evaluator::new().context(&ctx);

    assert_eq!(eval.evaluate("2 pow 3 pow 2").unwrap(), 512.0);
    assert_eq!(eval.evaluate("neg 5 + 1").unwrap(), -4.0);
    assert_eq!(eval.evaluate("50pct").unwrap(), 0.5);
    assert_eq!(eval.evaluate("2 plusfirst 3 * 4").unwrap(), 14.0);
}

#[test]
fn decimal_kind_is_exact() {
    let eval = Evaluator::new();
    assert_eq!(
        eval.evaluate_decimal("0.1 + 0.2").unwrap(),
        Decimal::new(3, 1)
    );
    assert_eq!(
        eval.evaluate_decimal("1 / 4").unwrap(),
        Decimal::new(25, 2)
    );
}

#[test]
fn cross_kind_decimal_entity_in_double_evaluation() {
    let ctx = MathContext::builder()
        .constant("half", Decimal::new(5, 1))
        .build()
        .unwrap();
    let v = Evaluator::new().context(&ctx).evaluate("half * 4").unwrap();
    assert_eq!(v, 2.0);
}

#[test]
fn cross_kind_double_entity_in_decimal_evaluation() {
    let ctx = MathContext::builder().constant("two", 2.0f64).build().unwrap();
    let v = Evaluator::new()
        .context(&ctx)
        .evaluate_decimal("two + 0.5")
        .unwrap();
    assert_eq!(v, Decimal::new(25, 1));
}

#[test]
fn cross_kind_conversion_failure_is_an_error() {
    // A truly imaginary constant has no double projection
    let ctx = MathContext::builder()
        .constant("z", Complex64::new(0.0, 1.0))
        .build()
        .unwrap();
    let err = Evaluator::new().context(&ctx).evaluate("z + 1").unwrap_err();
    assert!(matches!(err, MathError::Arithmetic { .. }));
}

#[test]
fn complex_evaluation_scenarios() {
    let ctx = contexts::complex_scientific().unwrap();
    let eval = Evaluator::new().context(&ctx);

    assert_eq!(
        eval.evaluate_complex("i * i").unwrap(),
        Complex64::new(-1.0, 0.0)
    );
    assert_eq!(
        eval.evaluate_complex("2 + 3i").unwrap(),
        Complex64::new(2.0, 3.0)
    );
    assert_eq!(
        eval.evaluate_complex("abs(3 + 4i)").unwrap(),
        Complex64::new(5.0, 0.0)
    );
}

#[test]
fn boolean_coercion_law() {
    let ctx = contexts::programming().unwrap();
    let eval = Evaluator::new().context(&ctx);
    for text in ["1 < 2", "2 < 1", "3 - 3", "0.1", "true and false"] {
        assert_eq!(
            eval.evaluate_boolean(text).unwrap(),
            eval.evaluate(text).unwrap() != 0.0,
            "coercion law broke for {text:?}"
        );
    }
}

#[test]
fn observer_sees_steps_and_final_result() {
    use std::sync::{Arc, Mutex};

    let steps: Arc<Mutex<Vec<crate::EvalStep>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&steps);
    let v = Evaluator::new()
        .observer(move |step| sink.lock().unwrap().push(step))
        .evaluate("2 + (5 - 1)")
        .unwrap();
    assert_eq!(v, 6.0);

    let steps = steps.lock().unwrap();
    assert!(steps.len() >= 2, "expected nested sub-expression steps");
    let last = steps.last().unwrap();
    assert!(last.is_final);
    assert_eq!(last.value, 6.0);
    assert!(steps.iter().all(|s| s.end <= "2 + (5 - 1)".len()));
    // step numbers are monotonic
    assert!(steps.windows(2).all(|w| w[0].step < w[1].step));
}

#[test]
fn frozen_context_is_shared_across_threads() {
    let ctx = contexts::scientific().unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let v = Evaluator::new().context(&ctx).evaluate("2sin(pi/6)").unwrap();
                assert!((v - 1.0).abs() < 1e-12);
            });
        }
    });
}
