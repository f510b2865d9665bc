//! Runtime mathematical-expression evaluation
//!
//! A fast, focused Rust library for evaluating expression strings — or
//! compiling them once into reusable closures.
//!
//! # Features
//! - Precedence-climbing scanner over the raw character span: no token
//!   stream, no AST, one left-to-right pass
//! - Pluggable vocabularies via a character-trie symbol table (constants,
//!   variables, functions, operators — including multi-character and
//!   Unicode spellings)
//! - Double, decimal, and complex numeric kinds from one generic kernel,
//!   with cross-kind fallback dispatch
//! - Implicit multiplication (`2(5 - 1)`, `ππ`, `3abs-5`) and
//!   right-associative exponentiation (`2^3^2 = 512`)
//! - Culture-aware literals (`22,888.32` under en-US, `22 888,32` under fr)
//! - Compile mode: parse once, invoke many times over positional arguments
//!
//! # Usage Examples
//!
//! ## Immediate evaluation
//! ```ignore
//! use mathspan::{contexts, Evaluator};
//!
//! assert_eq!(mathspan::evaluate("2 + (5 - 1)")?, 6.0);
//!
//! let sci = contexts::scientific()?;
//! let v = Evaluator::new().context(&sci).evaluate("2sin(pi/6)")?;
//! assert!((v - 1.0).abs() < 1e-12);
//! ```
//!
//! ## Compile once, invoke many times
//! ```ignore
//! use mathspan::Evaluator;
//!
//! let f = Evaluator::new().compile("x^2 + y", &["x", "y"])?;
//! assert_eq!(f.evaluate(&[3.0, 1.0])?, 10.0);
//! ```

mod context;
pub mod contexts;
mod entity;
mod error;
mod evaluator;
mod format;
mod number;
mod parameters;
mod precedence;
mod trie;

#[cfg(test)]
mod tests;

// Re-export key types for easier usage
pub use context::{ContextBuilder, MathContext};
pub use entity::{BinaryFn, Entity, GetterFn, UnaryFn, VariadicFn};
pub use error::{MathError, Span};
pub use evaluator::{
    evaluate, evaluate_with, CompiledExpression, EvalStep, Evaluator, DEFAULT_MAX_DEPTH,
};
pub use format::NumberFormat;
pub use number::{NumberKind, Numeric};
pub use parameters::{ParameterSource, Parameters};
pub use precedence::Precedence;
