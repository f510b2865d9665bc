//! Property-based and fuzz testing
//!
//! Uses quickcheck for:
//! - Scanner robustness (random expression strings never panic)
//! - The compile/evaluate equivalence law
//! - The boolean coercion law

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};

use crate::{contexts, Evaluator, Parameters};

/// Generate random well-formed expression strings over `x` and `y`
fn gen_expr(g: &mut Gen, depth: usize) -> String {
    if depth == 0 {
        match u8::arbitrary(g) % 5 {
            0 => "x".to_string(),
            1 => "y".to_string(),
            n => format!("{}", u8::arbitrary(g) % 9 + (n - 2) as u8),
        }
    } else {
        match u8::arbitrary(g) % 8 {
            0..=3 => {
                let ops = ["+", "-", "*", "/"];
                let op = ops[usize::arbitrary(g) % ops.len()];
                format!(
                    "({} {} {})",
                    gen_expr(g, depth - 1),
                    op,
                    gen_expr(g, depth - 1)
                )
            }
            4 => {
                let fns = ["sin", "cos", "abs", "sqrt", "exp"];
                let f = fns[usize::arbitrary(g) % fns.len()];
                format!("{}({})", f, gen_expr(g, depth - 1))
            }
            5 => format!("-({})", gen_expr(g, depth - 1)),
            6 => format!("({})^2", gen_expr(g, depth - 1)),
            _ => format!("({})({})", gen_expr(g, depth - 1), gen_expr(g, depth - 1)),
        }
    }
}

#[test]
fn random_expressions_never_panic() {
    fn prop(seed: u64) -> bool {
        let mut g = Gen::new((seed % 5) as usize + 1);
        let text = gen_expr(&mut g, (seed % 4) as usize);

        let ctx = contexts::scientific().unwrap();
        let mut params = Parameters::new();
        params.bind_variable("x", 1.5).unwrap();
        params.bind_variable("y", -0.25).unwrap();

        // Any Result is acceptable; reaching it is the property
        let _ = Evaluator::new()
            .context(&ctx)
            .parameters(&params)
            .evaluate(&text);
        true
    }
    QuickCheck::new().tests(300).quickcheck(prop as fn(u64) -> bool);
}

#[test]
fn compile_agrees_with_immediate_evaluation() {
    fn prop(seed: u64, a: f64, b: f64) -> TestResult {
        if !a.is_finite() || !b.is_finite() {
            return TestResult::discard();
        }
        let mut g = Gen::new((seed % 5) as usize + 1);
        let text = gen_expr(&mut g, (seed % 4) as usize);

        let ctx = contexts::scientific().unwrap();
        let mut params = Parameters::new();
        params.bind_variable("x", a).unwrap();
        params.bind_variable("y", b).unwrap();

        let immediate = Evaluator::new()
            .context(&ctx)
            .parameters(&params)
            .evaluate(&text);
        let compiled = Evaluator::new()
            .context(&ctx)
            .compile(&text, &["x", "y"])
            .and_then(|f| f.evaluate(&[a, b]));

        match (immediate, compiled) {
            (Ok(u), Ok(v)) => {
                TestResult::from_bool(u == v || (u.is_nan() && v.is_nan()))
            }
            (Err(_), Err(_)) => TestResult::passed(),
            (u, v) => {
                eprintln!("diverged on {text:?}: {u:?} vs {v:?}");
                TestResult::failed()
            }
        }
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop as fn(u64, f64, f64) -> TestResult);
}

#[test]
fn boolean_coercion_law_holds() {
    fn prop(seed: u64) -> TestResult {
        let mut g = Gen::new((seed % 5) as usize + 1);
        let text = gen_expr(&mut g, (seed % 3) as usize);

        let ctx = contexts::scientific().unwrap();
        let mut params = Parameters::new();
        params.bind_variable("x", 2.0).unwrap();
        params.bind_variable("y", 0.0).unwrap();

        let eval = Evaluator::new();
        let eval = eval.context(&ctx).parameters(&params);
        match (eval.evaluate_boolean(&text), eval.evaluate(&text)) {
            (Ok(b), Ok(v)) => TestResult::from_bool(b == (v != 0.0)),
            (Err(_), Err(_)) => TestResult::passed(),
            _ => TestResult::failed(),
        }
    }
    QuickCheck::new().tests(300).quickcheck(prop as fn(u64) -> TestResult);
}

#[test]
fn literal_display_round_trip() {
    fn prop(v: f64) -> TestResult {
        if !v.is_finite() {
            return TestResult::discard();
        }
        let text = format!("{v}");
        let parsed = crate::evaluate(&text);
        TestResult::from_bool(parsed == Ok(v))
    }
    QuickCheck::new().tests(500).quickcheck(prop as fn(f64) -> TestResult);
}
