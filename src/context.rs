//! The ambient symbol table: a frozen vocabulary of constants, functions,
//! and operators shared across many evaluations.
//!
//! A context is built once through [`ContextBuilder`], validated at
//! `build()`, and never mutated afterwards. That freeze is what makes
//! concurrent read-only evaluation safe: there is no internal locking, the
//! structure simply never changes once it exists.
//!
//! # Example
//! ```ignore
//! use mathspan::{MathContext, Precedence};
//!
//! let ctx = MathContext::builder()
//!     .constant("g", 9.80665)
//!     .unary("sin", f64::sin)
//!     .operator("mod", |a: f64, b: f64| a % b, Precedence::Basic)
//!     .build()?;
//! ```

use std::sync::Arc;

use crate::entity::{binary_fn, unary_fn, Entity, EntityKind};
use crate::error::MathError;
use crate::number::Numeric;
use crate::precedence::Precedence;
use crate::trie::Trie;

/// Frozen, ambient symbol table consulted with higher priority than
/// call-scoped [`Parameters`](crate::Parameters): on a key collision the
/// context binding shadows the parameter.
pub struct MathContext {
    trie: Trie<Arc<Entity>>,
}

impl std::fmt::Debug for MathContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MathContext")
            .field("len", &self.trie.len())
            .finish()
    }
}

impl MathContext {
    /// Start building a context
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// An empty context; only the built-in literal and `+ - * /` grammar
    /// will be recognized
    pub fn empty() -> Self {
        MathContext { trie: Trie::new() }
    }

    /// Number of bound entities
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    pub(crate) fn find(&self, suffix: &str) -> Option<(&Arc<Entity>, usize)> {
        self.trie.find(suffix)
    }
}

/// Reject keys that could never be reached by the scanner: the literal
/// grammar claims digits and decimal points first.
pub(crate) fn validate_key(key: &str) -> Result<(), MathError> {
    let invalid = match key.chars().next() {
        None => true,
        Some(c) => c.is_ascii_digit() || c == '.' || c == ',' || c.is_whitespace(),
    };
    if invalid {
        return Err(MathError::InvalidKey { key: key.into() });
    }
    Ok(())
}

/// Builder for [`MathContext`].
///
/// Methods are self-consuming and infallible; key validation errors are
/// reported once by [`build`](ContextBuilder::build). All binding methods
/// are generic over the numeric kind, so the same surface covers double,
/// decimal, and complex vocabularies.
#[derive(Default)]
pub struct ContextBuilder {
    trie: Trie<Arc<Entity>>,
    invalid: Option<MathError>,
}

impl ContextBuilder {
    fn bind<T: Numeric>(mut self, key: &str, kind: EntityKind<T>) -> Self {
        if let Err(err) = validate_key(key) {
            self.invalid.get_or_insert(err);
            return self;
        }
        self.trie
            .insert(key, Arc::new(Entity::new(key, T::wrap(kind))));
        self
    }

    /// Bind a constant (`π`, `e`, `true`)
    pub fn constant<T: Numeric>(self, key: &str, value: T) -> Self {
        self.bind(key, EntityKind::Constant { value })
    }

    /// Bind a variable: shaped like a constant, but semantically external
    /// state fixed for the lifetime of this context
    pub fn variable<T: Numeric>(self, key: &str, value: T) -> Self {
        self.bind(key, EntityKind::Variable { value })
    }

    /// Bind a zero-argument live getter; an empty `()` pair after the key
    /// is accepted and skipped
    pub fn getter<T: Numeric>(
        self,
        key: &str,
        get: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        self.bind(key, EntityKind::Getter { get: Arc::new(get) })
    }

    /// Bind a bracketless unary function: its argument is a single
    /// tightly-bound operand, so `sin30°` and `sin(30)` both work
    pub fn unary<T: Numeric>(self, key: &str, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.bind(
            key,
            EntityKind::Unary {
                apply: unary_fn(f),
                open: None,
                close: None,
            },
        )
    }

    /// Bind a fallible bracketless unary function; errors it returns are
    /// reported as evaluation failures at the call site
    pub fn try_unary<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T) -> Result<T, MathError> + Send + Sync + 'static,
    ) -> Self {
        self.bind(
            key,
            EntityKind::Unary {
                apply: Arc::new(f),
                open: None,
                close: None,
            },
        )
    }

    /// Bind a bracket-delimited unary function such as `|x|` or `⌊x⌋`: the
    /// argument is scanned at lowest precedence up to `close`
    pub fn bracket_unary<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T) -> T + Send + Sync + 'static,
        open: Option<char>,
        close: char,
    ) -> Self {
        self.bind(
            key,
            EntityKind::Unary {
                apply: unary_fn(f),
                open,
                close: Some(close),
            },
        )
    }

    /// Bind an N-ary function with the conventional `(`, `,`, `)` brackets
    pub fn function<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(&[T]) -> T + Send + Sync + 'static,
    ) -> Self {
        self.function_with(key, move |args| Ok(f(args)), '(', ',', ')')
    }

    /// Bind a fallible N-ary function with the conventional brackets
    pub fn try_function<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(&[T]) -> Result<T, MathError> + Send + Sync + 'static,
    ) -> Self {
        self.function_with(key, f, '(', ',', ')')
    }

    /// Bind an N-ary function with explicit open/separator/close symbols
    pub fn function_with<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(&[T]) -> Result<T, MathError> + Send + Sync + 'static,
        open: char,
        separator: char,
        close: char,
    ) -> Self {
        self.bind(
            key,
            EntityKind::Variadic {
                apply: Arc::new(f),
                open,
                separator,
                close,
            },
        )
    }

    /// Bind a standard infix operator; its right-hand side is scanned at
    /// `precedence`, which gives left-to-right chaining among equals
    pub fn operator<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T, T) -> T + Send + Sync + 'static,
        precedence: Precedence,
    ) -> Self {
        self.bind(
            key,
            EntityKind::Infix {
                apply: binary_fn(f),
                precedence,
            },
        )
    }

    /// Bind a fallible infix operator
    pub fn try_operator<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T, T) -> Result<T, MathError> + Send + Sync + 'static,
        precedence: Precedence,
    ) -> Self {
        self.bind(
            key,
            EntityKind::Infix {
                apply: Arc::new(f),
                precedence,
            },
        )
    }

    /// Bind an infix operator whose right-hand side is one tightly-bound
    /// operand (`^`, `**`): right-associative, binds over juxtaposition
    pub fn operand_infix<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T, T) -> T + Send + Sync + 'static,
        precedence: Precedence,
    ) -> Self {
        self.bind(
            key,
            EntityKind::OperandInfix {
                apply: binary_fn(f),
                precedence,
            },
        )
    }

    /// Bind a fallible operand-infix operator
    pub fn try_operand_infix<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T, T) -> Result<T, MathError> + Send + Sync + 'static,
        precedence: Precedence,
    ) -> Self {
        self.bind(
            key,
            EntityKind::OperandInfix {
                apply: Arc::new(f),
                precedence,
            },
        )
    }

    /// Bind a prefix operand operator (`¬x`-style): consumes one following
    /// operand
    pub fn prefix<T: Numeric>(self, key: &str, f: impl Fn(T) -> T + Send + Sync + 'static) -> Self {
        self.bind(
            key,
            EntityKind::Prefix {
                apply: unary_fn(f),
            },
        )
    }

    /// Bind a postfix operand operator (`x!`, `x°`, `x++`): consumes the
    /// value already produced on its left
    pub fn postfix<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T) -> T + Send + Sync + 'static,
    ) -> Self {
        self.bind(
            key,
            EntityKind::Postfix {
                apply: unary_fn(f),
            },
        )
    }

    /// Bind a fallible postfix operand operator (factorial-style argument
    /// validation)
    pub fn try_postfix<T: Numeric>(
        self,
        key: &str,
        f: impl Fn(T) -> Result<T, MathError> + Send + Sync + 'static,
    ) -> Self {
        self.bind(key, EntityKind::Postfix { apply: Arc::new(f) })
    }

    /// Freeze the context. Fails with the first invalid binding key.
    pub fn build(self) -> Result<MathContext, MathError> {
        match self.invalid {
            Some(err) => Err(err),
            None => Ok(MathContext { trie: self.trie }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_resolve_longest_match() {
        let ctx = MathContext::builder()
            .unary("sin", f64::sin)
            .unary("sinh", f64::sinh)
            .build()
            .unwrap();
        let (entity, len) = ctx.find("sinh(1)").unwrap();
        assert_eq!(entity.key(), "sinh");
        assert_eq!(len, 4);
    }

    #[test]
    fn rebinding_a_key_overwrites() {
        let ctx = MathContext::builder()
            .constant("x", 1.0)
            .constant("x", 2.0)
            .build()
            .unwrap();
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn invalid_keys_surface_at_build() {
        let err = MathContext::builder()
            .constant("2x", 1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, MathError::InvalidKey { .. }));

        let err = MathContext::builder().constant("", 1.0).build().unwrap_err();
        assert!(matches!(err, MathError::InvalidKey { .. }));
    }

    #[test]
    fn mixed_kind_bindings_coexist() {
        use rust_decimal::Decimal;
        let ctx = MathContext::builder()
            .constant("pi", std::f64::consts::PI)
            .constant("half", Decimal::new(5, 1))
            .build()
            .unwrap();
        assert_eq!(ctx.len(), 2);
    }
}
