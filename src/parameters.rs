//! Call-scoped parameter tables.
//!
//! Where a [`MathContext`](crate::MathContext) is the long-lived vocabulary,
//! `Parameters` carries the values and callables for one evaluation. The
//! context is consulted first during lookup, so a context binding shadows a
//! same-named parameter; this direction is part of the contract.
//!
//! Binding is explicit (no runtime reflection): either call the `bind_*`
//! methods directly, or implement [`ParameterSource`] on a type whose fields
//! should be exposed.

use std::sync::Arc;

use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::context::validate_key;
use crate::entity::{unary_fn, Entity, EntityKind};
use crate::error::MathError;
use crate::number::Numeric;
use crate::trie::Trie;

/// Per-call symbol table, consulted with lower priority than the ambient
/// context.
///
/// # Example
/// ```ignore
/// use mathspan::{Evaluator, Parameters};
///
/// let mut params = Parameters::new();
/// params.bind_variable("x", 0.5)?;
/// params.bind_unary("f", |v: f64| v * v)?;
///
/// let value = Evaluator::new().parameters(&params).evaluate("f(x) + x")?;
/// ```
#[derive(Default)]
pub struct Parameters {
    trie: Trie<Arc<Entity>>,
}

impl Parameters {
    pub fn new() -> Self {
        Parameters::default()
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    fn bind<T: Numeric>(&mut self, key: &str, kind: EntityKind<T>) -> Result<(), MathError> {
        validate_key(key)?;
        self.trie
            .insert(key, Arc::new(Entity::new(key, T::wrap(kind))));
        Ok(())
    }

    /// Bind a double variable
    pub fn bind_variable(&mut self, key: &str, value: f64) -> Result<(), MathError> {
        self.bind(key, EntityKind::Variable { value })
    }

    /// Bind a decimal variable
    pub fn bind_decimal(&mut self, key: &str, value: Decimal) -> Result<(), MathError> {
        self.bind(key, EntityKind::Variable { value })
    }

    /// Bind a complex variable
    pub fn bind_complex(&mut self, key: &str, value: Complex64) -> Result<(), MathError> {
        self.bind(key, EntityKind::Variable { value })
    }

    /// Bind a variable of any supported kind
    pub fn bind_value<T: Numeric>(&mut self, key: &str, value: T) -> Result<(), MathError> {
        self.bind(key, EntityKind::Variable { value })
    }

    /// Bind a zero-argument getter, re-read on every use
    pub fn bind_getter<T: Numeric>(
        &mut self,
        key: &str,
        get: impl Fn() -> T + Send + Sync + 'static,
    ) -> Result<(), MathError> {
        self.bind(key, EntityKind::Getter { get: Arc::new(get) })
    }

    /// Bind a single-argument function; the argument is one tightly-bound
    /// operand, so both `f x` and `f(x)` notations evaluate
    pub fn bind_unary<T: Numeric>(
        &mut self,
        key: &str,
        f: impl Fn(T) -> T + Send + Sync + 'static,
    ) -> Result<(), MathError> {
        self.bind(
            key,
            EntityKind::Unary {
                apply: unary_fn(f),
                open: None,
                close: None,
            },
        )
    }

    /// Bind an N-ary function with `(`, `,`, `)` brackets
    pub fn bind_function<T: Numeric>(
        &mut self,
        key: &str,
        f: impl Fn(&[T]) -> T + Send + Sync + 'static,
    ) -> Result<(), MathError> {
        self.bind(
            key,
            EntityKind::Variadic {
                apply: Arc::new(move |args: &[T]| Ok(f(args))),
                open: '(',
                separator: ',',
                close: ')',
            },
        )
    }

    /// Bind a fallible N-ary function
    pub fn bind_try_function<T: Numeric>(
        &mut self,
        key: &str,
        f: impl Fn(&[T]) -> Result<T, MathError> + Send + Sync + 'static,
    ) -> Result<(), MathError> {
        self.bind(
            key,
            EntityKind::Variadic {
                apply: Arc::new(f),
                open: '(',
                separator: ',',
                close: ')',
            },
        )
    }

    pub(crate) fn find(&self, suffix: &str) -> Option<(&Arc<Entity>, usize)> {
        self.trie.find(suffix)
    }
}

/// Types that can expose their fields as parameters.
///
/// The explicit-binding replacement for runtime property reflection: a type
/// names what it exposes, configuration errors surface when `bind_into`
/// runs, not mid-evaluation.
///
/// # Example
/// ```ignore
/// struct Ballistics { v0: f64, angle: f64 }
///
/// impl ParameterSource for Ballistics {
///     fn bind_into(&self, params: &mut Parameters) -> Result<(), MathError> {
///         params.bind_variable("v0", self.v0)?;
///         params.bind_variable("angle", self.angle)
///     }
/// }
/// ```
pub trait ParameterSource {
    fn bind_into(&self, params: &mut Parameters) -> Result<(), MathError>;
}

impl Parameters {
    /// Build a table from any [`ParameterSource`]
    pub fn from_source(source: &impl ParameterSource) -> Result<Self, MathError> {
        let mut params = Parameters::new();
        source.bind_into(&mut params)?;
        Ok(params)
    }

    /// Build a table from `(name, value)` pairs
    pub fn from_pairs<'k>(
        pairs: impl IntoIterator<Item = (&'k str, f64)>,
    ) -> Result<Self, MathError> {
        let mut params = Parameters::new();
        for (key, value) in pairs {
            params.bind_variable(key, value)?;
        }
        Ok(params)
    }
}
