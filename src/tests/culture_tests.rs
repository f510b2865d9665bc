use crate::{contexts, Evaluator, NumberFormat};

#[test]
fn grouped_literals_are_idempotent_across_cultures() {
    let us = Evaluator::new()
        .format(NumberFormat::en_us())
        .evaluate("22,888.32")
        .unwrap();
    let fr = Evaluator::new()
        .format(NumberFormat::fr())
        .evaluate("22 888,32")
        .unwrap();
    let de = Evaluator::new()
        .format(NumberFormat::de())
        .evaluate("22.888,32")
        .unwrap();
    let ch = Evaluator::new()
        .format(NumberFormat::de_ch())
        .evaluate("22'888.32")
        .unwrap();

    assert_eq!(us, 22888.32);
    assert_eq!(us, fr);
    assert_eq!(us, de);
    assert_eq!(us, ch);
}

#[test]
fn currency_symbols_are_skipped_around_literals() {
    let v = Evaluator::new()
        .format(NumberFormat::en_us())
        .evaluate("$100 + $2.50")
        .unwrap();
    assert_eq!(v, 102.5);

    let v = Evaluator::new()
        .format(NumberFormat::fr())
        .evaluate("100€ - 40€")
        .unwrap();
    assert_eq!(v, 60.0);
}

#[test]
fn exponent_notation() {
    assert_eq!(crate::evaluate("1.2e3").unwrap(), 1200.0);
    assert_eq!(crate::evaluate("1e-2").unwrap(), 0.01);
    assert_eq!(crate::evaluate("2E2 + 1").unwrap(), 201.0);
}

#[test]
fn function_separator_survives_comma_grouping_culture() {
    let ctx = contexts::scientific().unwrap();
    let v = Evaluator::new()
        .context(&ctx)
        .format(NumberFormat::en_us())
        .evaluate("max(1,250, 3)")
        .unwrap();
    // the comma is the argument separator, never digit grouping here
    assert_eq!(v, 250.0);
}

#[test]
fn comma_decimal_point_inside_arguments() {
    let ctx = contexts::scientific().unwrap();
    let v = Evaluator::new()
        .context(&ctx)
        .format(NumberFormat::fr())
        .evaluate("max(1,5, 2)")
        .unwrap();
    assert_eq!(v, 2.0);

    let v = Evaluator::new()
        .context(&ctx)
        .format(NumberFormat::fr())
        .evaluate("min(2,5, 7)")
        .unwrap();
    assert_eq!(v, 2.5);
}
