//! The entity model: every named symbol a context or parameter table can
//! bind — constants, variables, getters, functions, and operators.
//!
//! Entities are immutable once registered and carry a fixed [`Precedence`].
//! Function payloads are shared closures so one context can be consulted from
//! many threads after it is frozen.

use std::sync::Arc;

use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::error::MathError;
use crate::precedence::Precedence;

/// Zero-argument live value
pub type GetterFn<T> = Arc<dyn Fn() -> T + Send + Sync>;
/// Single-argument function; fallible so implementations can raise domain
/// errors for invalid arguments
pub type UnaryFn<T> = Arc<dyn Fn(T) -> Result<T, MathError> + Send + Sync>;
/// Two-argument function (infix operators)
pub type BinaryFn<T> = Arc<dyn Fn(T, T) -> Result<T, MathError> + Send + Sync>;
/// N-ary function over a separator-delimited argument list
pub type VariadicFn<T> = Arc<dyn Fn(&[T]) -> Result<T, MathError> + Send + Sync>;

/// Behavior of an entity within one numeric kind
#[derive(Clone)]
pub enum EntityKind<T> {
    /// Literal substitution
    Constant { value: T },
    /// Same shape as a constant, semantically bound to per-call state
    Variable { value: T },
    /// Zero-argument call, re-evaluated on every use; an empty `()` pair
    /// after the key is skipped
    Getter { get: GetterFn<T> },
    /// Single-argument function. With a `close` symbol the argument is
    /// scanned up to that symbol at lowest precedence (`|x|`, `sin(...)`);
    /// without one the argument is a single tightly-bound operand (`sin30°`)
    Unary {
        apply: UnaryFn<T>,
        open: Option<char>,
        close: Option<char>,
    },
    /// N-ary bracketed function with separator-delimited arguments
    Variadic {
        apply: VariadicFn<T>,
        open: char,
        separator: char,
        close: char,
    },
    /// Prefix operand operator: consumes the following operand
    Prefix { apply: UnaryFn<T> },
    /// Postfix operand operator: consumes the already-produced left value
    /// (`x!`, `x++`)
    Postfix { apply: UnaryFn<T> },
    /// Infix whose right-hand side is a single operand-mode scan; binds
    /// tighter than juxtaposition and associates to the right (`^`, `**`)
    OperandInfix {
        apply: BinaryFn<T>,
        precedence: Precedence,
    },
    /// Standard infix; the right-hand side is scanned at the operator's own
    /// precedence, which yields left-to-right chaining at equal precedence
    Infix {
        apply: BinaryFn<T>,
        precedence: Precedence,
    },
}

impl<T> EntityKind<T> {
    pub fn precedence(&self) -> Precedence {
        match self {
            EntityKind::Constant { .. }
            | EntityKind::Variable { .. }
            | EntityKind::Getter { .. } => Precedence::Variable,
            EntityKind::Unary { .. } | EntityKind::Variadic { .. } => Precedence::Function,
            // Operand operators apply to an adjacent primary, so they bind
            // tightest of all
            EntityKind::Prefix { .. } | EntityKind::Postfix { .. } => Precedence::Convertation,
            EntityKind::OperandInfix { precedence, .. } | EntityKind::Infix { precedence, .. } => {
                *precedence
            }
        }
    }
}

/// Kind-tagged entity behavior
#[derive(Clone)]
pub enum EntityPayload {
    Double(EntityKind<f64>),
    Decimal(EntityKind<Decimal>),
    Complex(EntityKind<Complex64>),
}

impl EntityPayload {
    pub fn precedence(&self) -> Precedence {
        match self {
            EntityPayload::Double(k) => k.precedence(),
            EntityPayload::Decimal(k) => k.precedence(),
            EntityPayload::Complex(k) => k.precedence(),
        }
    }
}

/// A registered, named symbol with a fixed precedence.
///
/// The key is unique within one symbol table; registering the same key again
/// overwrites the previous entity (intentional, not an error).
#[derive(Clone)]
pub struct Entity {
    key: Box<str>,
    payload: EntityPayload,
}

impl Entity {
    pub(crate) fn new(key: impl Into<Box<str>>, payload: EntityPayload) -> Self {
        Entity {
            key: key.into(),
            payload,
        }
    }

    /// The spelling this entity is looked up by
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn precedence(&self) -> Precedence {
        self.payload.precedence()
    }

    pub(crate) fn payload(&self) -> &EntityPayload {
        &self.payload
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.payload {
            EntityPayload::Double(k) => kind_name(k),
            EntityPayload::Decimal(k) => kind_name(k),
            EntityPayload::Complex(k) => kind_name(k),
        };
        f.debug_struct("Entity")
            .field("key", &self.key)
            .field("kind", &kind)
            .field("precedence", &self.precedence())
            .finish()
    }
}

fn kind_name<T>(kind: &EntityKind<T>) -> &'static str {
    match kind {
        EntityKind::Constant { .. } => "Constant",
        EntityKind::Variable { .. } => "Variable",
        EntityKind::Getter { .. } => "Getter",
        EntityKind::Unary { .. } => "Unary",
        EntityKind::Variadic { .. } => "Variadic",
        EntityKind::Prefix { .. } => "Prefix",
        EntityKind::Postfix { .. } => "Postfix",
        EntityKind::OperandInfix { .. } => "OperandInfix",
        EntityKind::Infix { .. } => "Infix",
    }
}

/// Wrap an infallible unary function into the shared fallible alias
pub(crate) fn unary_fn<T: 'static>(f: impl Fn(T) -> T + Send + Sync + 'static) -> UnaryFn<T> {
    Arc::new(move |x| Ok(f(x)))
}

/// Wrap an infallible binary function into the shared fallible alias
pub(crate) fn binary_fn<T: 'static>(
    f: impl Fn(T, T) -> T + Send + Sync + 'static,
) -> BinaryFn<T> {
    Arc::new(move |a, b| Ok(f(a, b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_sit_at_variable_precedence() {
        let kind = EntityKind::Constant {
            value: std::f64::consts::PI,
        };
        assert_eq!(kind.precedence(), Precedence::Variable);
    }

    #[test]
    fn operand_operators_bind_tightest() {
        let kind: EntityKind<f64> = EntityKind::Postfix {
            apply: unary_fn(|x: f64| x + 1.0),
        };
        assert!(kind.precedence() > Precedence::Exponentiation);
    }
}
