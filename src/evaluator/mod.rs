//! Entry points: immediate evaluation and compilation to reusable closures.
//!
//! The [`Evaluator`] builder carries everything one evaluation needs — the
//! ambient context, call-scoped parameters, the number format, the depth
//! guard, and an optional step observer — and exposes kind-specialized
//! terminal operations with identical control flow.
//!
//! # Example
//! ```ignore
//! use mathspan::{contexts, Evaluator, Parameters};
//!
//! let ctx = contexts::scientific()?;
//! let mut params = Parameters::new();
//! params.bind_variable("x", 0.5)?;
//!
//! let value = Evaluator::new()
//!     .context(&ctx)
//!     .parameters(&params)
//!     .evaluate("sin(x)^2 + cos(x)^2")?;
//! assert!((value - 1.0).abs() < 1e-12);
//! ```

mod compiler;
mod scanner;

pub use compiler::CompiledExpression;

use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::context::MathContext;
use crate::error::MathError;
use crate::format::NumberFormat;
use crate::number::Numeric;
use crate::parameters::Parameters;

use compiler::Compiler;
use scanner::Scanner;

/// Default bound on recursive scan depth (parenthesis and call nesting).
/// Pathologically nested input fails with
/// [`MathError::MaxDepthExceeded`] instead of exhausting the native stack.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// One resolved sub-expression, reported to the observer hook.
///
/// Tracing only: observers see values after each scan frame completes, with
/// `is_final` set once for the whole expression. Complex and decimal values
/// are projected onto a double for reporting (NaN when no projection
/// exists).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalStep {
    /// Byte offset where the sub-expression began
    pub start: usize,
    /// Byte offset one past its end
    pub end: usize,
    /// Monotonic step counter within one evaluation
    pub step: u32,
    /// The resolved value, projected onto a double
    pub value: f64,
    /// Whether this is the final result of the whole expression
    pub is_final: bool,
}

pub(crate) type ObserverFn = dyn Fn(EvalStep) + Send + Sync;

/// Builder for evaluation and compilation calls.
pub struct Evaluator<'a> {
    context: Option<&'a MathContext>,
    parameters: Option<&'a Parameters>,
    format: NumberFormat,
    max_depth: usize,
    observer: Option<Box<ObserverFn>>,
}

impl Default for Evaluator<'_> {
    fn default() -> Self {
        Evaluator {
            context: None,
            parameters: None,
            format: NumberFormat::invariant(),
            max_depth: DEFAULT_MAX_DEPTH,
            observer: None,
        }
    }
}

impl<'a> Evaluator<'a> {
    pub fn new() -> Self {
        Evaluator::default()
    }

    /// Use an ambient context; its bindings shadow same-named parameters
    pub fn context(mut self, context: &'a MathContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Use call-scoped parameters
    pub fn parameters(mut self, parameters: &'a Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Use a culture-specific number format (default: invariant)
    pub fn format(mut self, format: NumberFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the recursion-depth guard
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Observe each resolved sub-expression (tracing/debugging)
    pub fn observer(mut self, observer: impl Fn(EvalStep) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn scanner<'s>(&'s self, text: &'s str) -> Scanner<'s> {
        Scanner::new(
            text,
            self.context,
            self.parameters,
            &self.format,
            self.max_depth,
            self.observer.as_deref(),
        )
    }

    // ==================== immediate evaluation ====================

    /// Evaluate in the double kind
    pub fn evaluate(&self, text: &str) -> Result<f64, MathError> {
        self.scanner(text).evaluate::<f64>()
    }

    /// Evaluate in the decimal kind
    pub fn evaluate_decimal(&self, text: &str) -> Result<Decimal, MathError> {
        self.scanner(text).evaluate::<Decimal>()
    }

    /// Evaluate in the complex kind
    pub fn evaluate_complex(&self, text: &str) -> Result<Complex64, MathError> {
        self.scanner(text).evaluate::<Complex64>()
    }

    /// Evaluate as a boolean: the double result compared against zero
    pub fn evaluate_boolean(&self, text: &str) -> Result<bool, MathError> {
        Ok(self.evaluate(text)? != 0.0)
    }

    /// Evaluate in any supported numeric kind
    pub fn evaluate_as<T: Numeric>(&self, text: &str) -> Result<T, MathError> {
        self.scanner(text).evaluate::<T>()
    }

    // ==================== compilation ====================

    /// Compile to a reusable double closure over the named parameters.
    /// Parse once, invoke many times:
    ///
    /// ```ignore
    /// let compiled = Evaluator::new().compile("x^2 + y", &["x", "y"])?;
    /// let value = compiled.evaluate(&[3.0, 1.0])?; // 10.0
    /// ```
    pub fn compile(
        &self,
        text: &str,
        param_names: &[&str],
    ) -> Result<CompiledExpression<f64>, MathError> {
        self.compile_as::<f64>(text, param_names)
    }

    /// Compile for boolean use: invoke the result through
    /// [`CompiledExpression::evaluate_boolean`] (nonzero is true)
    pub fn compile_boolean(
        &self,
        text: &str,
        param_names: &[&str],
    ) -> Result<CompiledExpression<f64>, MathError> {
        self.compile_as::<f64>(text, param_names)
    }

    /// Compile to a reusable decimal closure
    pub fn compile_decimal(
        &self,
        text: &str,
        param_names: &[&str],
    ) -> Result<CompiledExpression<Decimal>, MathError> {
        self.compile_as::<Decimal>(text, param_names)
    }

    /// Compile to a reusable complex closure
    pub fn compile_complex(
        &self,
        text: &str,
        param_names: &[&str],
    ) -> Result<CompiledExpression<Complex64>, MathError> {
        self.compile_as::<Complex64>(text, param_names)
    }

    /// Compile in any supported numeric kind
    pub fn compile_as<T: Numeric>(
        &self,
        text: &str,
        param_names: &[&str],
    ) -> Result<CompiledExpression<T>, MathError> {
        Compiler::new(
            text,
            self.context,
            self.parameters,
            &self.format,
            self.max_depth,
        )
        .compile::<T>(param_names)
    }
}

/// Evaluate with no context: literals and the built-in `+ - * /` grammar
///
/// # Example
/// ```ignore
/// assert_eq!(mathspan::evaluate("2 + (5 - 1)")?, 6.0);
/// ```
pub fn evaluate(text: &str) -> Result<f64, MathError> {
    Evaluator::new().evaluate(text)
}

/// Evaluate against a context
pub fn evaluate_with(text: &str, context: &MathContext) -> Result<f64, MathError> {
    Evaluator::new().context(context).evaluate(text)
}
