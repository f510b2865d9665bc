//! Compile mode: the same precedence-climbing walk as the scanner, but
//! every produce-a-value step builds a closure node instead of a value.
//!
//! The finished tree is one boxed closure over a positional argument slice,
//! wrapped in [`CompiledExpression`]: parse once, invoke many times with no
//! re-parsing. Declared parameter names compile to slot reads; context and
//! parameter bindings are resolved — and constants folded — at compile
//! time, so an identifier that resolves to nothing is a compile-time
//! [`MathError::UnboundVariable`], never a runtime surprise.

use std::sync::Arc;

use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::context::{validate_key, MathContext};
use crate::entity::{Entity, EntityKind, EntityPayload};
use crate::error::{MathError, Span};
use crate::format::NumberFormat;
use crate::number::{convert, Numeric};
use crate::parameters::Parameters;
use crate::precedence::Precedence;
use crate::trie::Trie;

use super::scanner::Stop;

/// One node of the compiled closure tree
type Node<T> = Arc<dyn Fn(&[T]) -> Result<T, MathError> + Send + Sync>;

/// A parsed expression compiled into a reusable closure.
///
/// Thread-safe and cheap to clone (the tree is shared). Arguments are
/// positional, in the order the parameter names were declared at compile
/// time.
///
/// # Example
/// ```ignore
/// let compiled = Evaluator::new().compile("x^2 + y", &["x", "y"])?;
/// assert_eq!(compiled.evaluate(&[3.0, 1.0])?, 10.0);
/// assert_eq!(compiled.evaluate(&[0.5, 2.0])?, 2.25);
/// ```
pub struct CompiledExpression<T: Numeric> {
    node: Node<T>,
    param_names: Box<[Box<str>]>,
}

impl<T: Numeric> std::fmt::Debug for CompiledExpression<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("param_names", &self.param_names)
            .finish()
    }
}

impl<T: Numeric> Clone for CompiledExpression<T> {
    fn clone(&self) -> Self {
        CompiledExpression {
            node: Arc::clone(&self.node),
            param_names: self.param_names.clone(),
        }
    }
}

impl<T: Numeric> CompiledExpression<T> {
    /// Invoke the closure with arguments in declaration order
    pub fn evaluate(&self, args: &[T]) -> Result<T, MathError> {
        if args.len() != self.param_names.len() {
            return Err(MathError::arithmetic(format!(
                "Expected {} argument(s), got {}",
                self.param_names.len(),
                args.len()
            )));
        }
        (self.node)(args)
    }

    /// Declared parameter names, in argument order
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.param_names.iter().map(|s| s.as_ref())
    }
}

impl CompiledExpression<f64> {
    /// Invoke and coerce to a boolean: nonzero is true
    pub fn evaluate_boolean(&self, args: &[f64]) -> Result<bool, MathError> {
        Ok(self.evaluate(args)? != 0.0)
    }
}

// ==================== node constructors ====================

fn constant_node<T: Numeric>(value: T) -> Node<T> {
    Arc::new(move |_| Ok(value))
}

fn slot_node<T: Numeric>(index: usize) -> Node<T> {
    Arc::new(move |args| Ok(args[index]))
}

fn arith_node<T: Numeric>(
    lhs: Node<T>,
    rhs: Node<T>,
    op: fn(T, T) -> Result<T, MathError>,
    span: Span,
) -> Node<T> {
    Arc::new(move |args| op(lhs(args)?, rhs(args)?).map_err(|e| e.at(span)))
}

fn neg_node<T: Numeric>(body: Node<T>, span: Span) -> Node<T> {
    Arc::new(move |args| body(args)?.checked_neg().map_err(|e| e.at(span)))
}

fn mul_node<T: Numeric>(lhs: Node<T>, rhs: Node<T>, span: Span) -> Node<T> {
    arith_node(lhs, rhs, T::checked_mul, span)
}

/// What an identifier at the cursor resolved to
enum Resolved {
    Entity(Arc<Entity>, usize),
    Slot(usize, usize),
}

/// One compilation pass over one input string.
pub(crate) struct Compiler<'a> {
    text: &'a str,
    context: Option<&'a MathContext>,
    parameters: Option<&'a Parameters>,
    format: &'a NumberFormat,
    max_depth: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(
        text: &'a str,
        context: Option<&'a MathContext>,
        parameters: Option<&'a Parameters>,
        format: &'a NumberFormat,
        max_depth: usize,
    ) -> Self {
        Compiler {
            text,
            context,
            parameters,
            format,
            max_depth,
        }
    }

    pub fn compile<T: Numeric>(
        &self,
        param_names: &[&str],
    ) -> Result<CompiledExpression<T>, MathError> {
        if self.text.trim().is_empty() {
            return Err(MathError::EmptyExpression);
        }
        let mut slots: Trie<usize> = Trie::new();
        for (index, name) in param_names.iter().enumerate() {
            validate_key(name)?;
            slots.insert(name, index);
        }
        let mut pos = 0;
        let node = self
            .scan::<T>(&mut pos, Stop::default(), Precedence::Unknown, false, 0, &slots)?
            .ok_or(MathError::NotEvaluated {
                span: Some(Span::new(0, self.text.len())),
            })?;
        if pos < self.text.len() {
            return Err(self.unresolved(pos));
        }
        Ok(CompiledExpression {
            node,
            param_names: param_names.iter().map(|n| Box::from(*n)).collect(),
        })
    }

    // ==================== the scan loop (node-building twin) ====================

    #[allow(clippy::too_many_arguments)]
    fn scan<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        min_prec: Precedence,
        operand: bool,
        depth: usize,
        slots: &Trie<usize>,
    ) -> Result<Option<Node<T>>, MathError> {
        if depth > self.max_depth {
            return Err(MathError::MaxDepthExceeded);
        }
        let (blocked_buf, blocked_len) = stop.blocked();
        let blocked = &blocked_buf[..blocked_len];
        let mut min_prec = min_prec;
        let mut operand = operand;
        let mut value: Option<Node<T>> = None;

        while let Some(c) = self.char_at(*pos) {
            if stop.close == Some(c) {
                break;
            }
            if stop.separator == Some(c) && self.is_separator_here(c, value.is_some(), *pos) {
                break;
            }

            let lit_start = *pos;
            if let Some(number) = T::scan_literal(self.text, pos, self.format, blocked)? {
                let node = self.apply_exponent(pos, stop, constant_node(number), depth, slots)?;
                if operand {
                    value = Some(node);
                    operand = false;
                    min_prec = min_prec.max(Precedence::Function);
                    continue;
                }
                value = Some(self.combine(value, node, lit_start)?);
                continue;
            }

            if c == '(' {
                if min_prec >= Precedence::Function {
                    break;
                }
                let open_pos = *pos;
                *pos += 1;
                let inner = self
                    .scan::<T>(
                        pos,
                        Stop::closing(')'),
                        Precedence::Unknown,
                        false,
                        depth + 1,
                        slots,
                    )?
                    .ok_or(MathError::InvalidOperand {
                        span: Some(Span::at(open_pos + 1)),
                    })?;
                self.expect_close(pos, ')', open_pos)?;
                let inner = self.apply_exponent(pos, stop, inner, depth, slots)?;
                if operand {
                    return Ok(Some(inner));
                }
                value = Some(self.combine(value, inner, open_pos)?);
            } else if (c == '+' || c == '-') && self.char_at(*pos + 1) != Some(c) {
                if value.is_none() {
                    let sign_pos = *pos;
                    *pos += 1;
                    if c == '-' {
                        let body = self.scan_operand::<T>(pos, stop, depth, slots)?;
                        let negated = neg_node(body, Span::at(sign_pos));
                        if operand {
                            return Ok(Some(negated));
                        }
                        value = Some(negated);
                    }
                } else {
                    if min_prec >= Precedence::LowestBasic {
                        break;
                    }
                    let op_pos = *pos;
                    *pos += 1;
                    let rhs = self.scan_required::<T>(
                        pos,
                        stop,
                        Precedence::LowestBasic,
                        depth,
                        op_pos + 1,
                        slots,
                    )?;
                    let lhs = value.take().ok_or(MathError::InvalidOperand {
                        span: Some(Span::at(op_pos)),
                    })?;
                    let op: fn(T, T) -> Result<T, MathError> =
                        if c == '+' { T::checked_add } else { T::checked_sub };
                    value = Some(arith_node(lhs, rhs, op, Span::at(op_pos)));
                }
            } else if (c == '*' || c == '/') && self.char_at(*pos + 1) != Some(c) {
                if min_prec >= Precedence::Basic {
                    break;
                }
                let op_pos = *pos;
                let lhs = value.take().ok_or(MathError::InvalidOperand {
                    span: Some(Span::at(op_pos)),
                })?;
                *pos += 1;
                let rhs = self.scan_required::<T>(
                    pos,
                    stop,
                    Precedence::Basic,
                    depth,
                    op_pos + 1,
                    slots,
                )?;
                let op: fn(T, T) -> Result<T, MathError> =
                    if c == '*' { T::checked_mul } else { T::checked_div };
                value = Some(arith_node(lhs, rhs, op, Span::at(op_pos)));
            } else if c.is_whitespace() {
                *pos += c.len_utf8();
            } else if let Some(resolved) = self.resolve(*pos, slots) {
                let precedence = match &resolved {
                    Resolved::Entity(entity, _) => entity.precedence(),
                    Resolved::Slot(..) => Precedence::Variable,
                };
                if precedence <= min_prec {
                    break;
                }
                value = Some(self.dispatch(pos, stop, depth, value, resolved, slots)?);
                if operand {
                    return Ok(value);
                }
            } else if let Some(len) = self.format.currency_len(&self.text[*pos..]) {
                *pos += len;
            } else {
                return Err(self.unresolved(*pos));
            }
        }

        Ok(value)
    }

    // ==================== entity dispatch ====================

    fn dispatch<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        value: Option<Node<T>>,
        resolved: Resolved,
        slots: &Trie<usize>,
    ) -> Result<Node<T>, MathError> {
        match resolved {
            Resolved::Slot(index, key_len) => {
                *pos += key_len;
                let node = self.apply_exponent(pos, stop, slot_node(index), depth, slots)?;
                self.combine(value, node, *pos)
            }
            Resolved::Entity(entity, key_len) => {
                if T::native(entity.payload()).is_some() {
                    return self.apply_native::<T>(pos, stop, depth, value, &entity, key_len, slots);
                }
                self.apply_foreign::<T>(pos, stop, depth, value, &entity, key_len, slots)
            }
        }
    }

    fn apply_native<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        value: Option<Node<T>>,
        entity: &Entity,
        key_len: usize,
        slots: &Trie<usize>,
    ) -> Result<Node<T>, MathError> {
        let key_start = *pos;
        *pos += key_len;
        let key_span = Span::new(key_start, *pos);
        let kind = T::native(entity.payload())
            .unwrap_or_else(|| unreachable!("dispatch checked the payload kind"));

        match kind {
            EntityKind::Constant { value: v } | EntityKind::Variable { value: v } => {
                let node = self.apply_exponent(pos, stop, constant_node(*v), depth, slots)?;
                self.combine(value, node, key_start)
            }
            EntityKind::Getter { get } => {
                self.skip_empty_parens(pos);
                let get = Arc::clone(get);
                let node: Node<T> = Arc::new(move |_| Ok(get()));
                let node = self.apply_exponent(pos, stop, node, depth, slots)?;
                self.combine(value, node, key_start)
            }
            EntityKind::Unary { apply, open, close } => {
                let arg = match close {
                    Some(close_ch) => {
                        let opener = match open {
                            Some(open_ch) => self.expect_open(pos, *open_ch)?,
                            None => key_start,
                        };
                        let arg = self.scan_required::<T>(
                            pos,
                            Stop::closing(*close_ch),
                            Precedence::Unknown,
                            depth,
                            *pos,
                            slots,
                        )?;
                        self.expect_close(pos, *close_ch, opener)?;
                        arg
                    }
                    None => self.scan_operand::<T>(pos, stop, depth, slots)?,
                };
                let apply = Arc::clone(apply);
                let node: Node<T> =
                    Arc::new(move |args| apply(arg(args)?).map_err(|e| e.at(key_span)));
                let node = self.apply_exponent(pos, stop, node, depth, slots)?;
                self.combine(value, node, key_start)
            }
            EntityKind::Variadic {
                apply,
                open,
                separator,
                close,
            } => {
                let open_pos = self.expect_open(pos, *open)?;
                let mut arg_nodes: Vec<Node<T>> = Vec::new();
                loop {
                    let arg = self.scan_required::<T>(
                        pos,
                        Stop::arguments(*separator, *close),
                        Precedence::Unknown,
                        depth,
                        *pos,
                        slots,
                    )?;
                    arg_nodes.push(arg);
                    match self.char_at(*pos) {
                        Some(ch) if ch == *separator => *pos += ch.len_utf8(),
                        Some(ch) if ch == *close => {
                            *pos += ch.len_utf8();
                            break;
                        }
                        _ => {
                            return Err(MathError::UnclosedBracket {
                                expected: *close,
                                span: Some(Span::at(open_pos)),
                            });
                        }
                    }
                }
                let apply = Arc::clone(apply);
                let node: Node<T> = Arc::new(move |args| {
                    let mut evaluated = Vec::with_capacity(arg_nodes.len());
                    for arg in &arg_nodes {
                        evaluated.push(arg(args)?);
                    }
                    apply(&evaluated).map_err(|e| e.at(key_span))
                });
                let node = self.apply_exponent(pos, stop, node, depth, slots)?;
                self.combine(value, node, key_start)
            }
            EntityKind::Prefix { apply } => {
                let body = self.scan_operand::<T>(pos, stop, depth, slots)?;
                let apply = Arc::clone(apply);
                let node: Node<T> =
                    Arc::new(move |args| apply(body(args)?).map_err(|e| e.at(key_span)));
                let node = self.apply_exponent(pos, stop, node, depth, slots)?;
                self.combine(value, node, key_start)
            }
            EntityKind::Postfix { apply } => {
                let lhs = value.ok_or(MathError::InvalidOperand {
                    span: Some(Span::at(key_start)),
                })?;
                let apply = Arc::clone(apply);
                let node: Node<T> =
                    Arc::new(move |args| apply(lhs(args)?).map_err(|e| e.at(key_span)));
                self.apply_exponent(pos, stop, node, depth, slots)
            }
            EntityKind::OperandInfix { apply, .. } => {
                let lhs = value.ok_or(MathError::InvalidOperand {
                    span: Some(Span::at(key_start)),
                })?;
                let rhs = self.scan_operand::<T>(pos, stop, depth, slots)?;
                let apply = Arc::clone(apply);
                Ok(Arc::new(move |args| {
                    apply(lhs(args)?, rhs(args)?).map_err(|e| e.at(key_span))
                }))
            }
            EntityKind::Infix { apply, precedence } => {
                let lhs = value.ok_or(MathError::InvalidOperand {
                    span: Some(Span::at(key_start)),
                })?;
                let rhs = self.scan_required::<T>(pos, stop, *precedence, depth, *pos, slots)?;
                let apply = Arc::clone(apply);
                Ok(Arc::new(move |args| {
                    apply(lhs(args)?, rhs(args)?).map_err(|e| e.at(key_span))
                }))
            }
        }
    }

    /// Entities of a different numeric kind: values fold through the double
    /// pivot at compile time, behavior does not cross kinds in a compiled
    /// tree
    fn apply_foreign<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        value: Option<Node<T>>,
        entity: &Entity,
        key_len: usize,
        slots: &Trie<usize>,
    ) -> Result<Node<T>, MathError> {
        let key_start = *pos;
        let key_span = Span::new(key_start, key_start + key_len);

        let folded: Node<T> = match entity.payload() {
            EntityPayload::Double(kind) => self.fold_foreign::<T, f64>(kind, entity, key_span)?,
            EntityPayload::Decimal(kind) => {
                self.fold_foreign::<T, Decimal>(kind, entity, key_span)?
            }
            EntityPayload::Complex(kind) => {
                self.fold_foreign::<T, Complex64>(kind, entity, key_span)?
            }
        };

        *pos += key_len;
        if matches!(
            entity.payload(),
            EntityPayload::Double(EntityKind::Getter { .. })
                | EntityPayload::Decimal(EntityKind::Getter { .. })
                | EntityPayload::Complex(EntityKind::Getter { .. })
        ) {
            self.skip_empty_parens(pos);
        }
        let node = self.apply_exponent(pos, stop, folded, depth, slots)?;
        self.combine(value, node, key_start)
    }

    fn fold_foreign<T: Numeric, K: Numeric>(
        &self,
        kind: &EntityKind<K>,
        entity: &Entity,
        key_span: Span,
    ) -> Result<Node<T>, MathError> {
        match kind {
            EntityKind::Constant { value } | EntityKind::Variable { value } => {
                let folded = convert::<K, T>(*value).map_err(|e| e.at(key_span))?;
                Ok(constant_node(folded))
            }
            EntityKind::Getter { get } => {
                let get = Arc::clone(get);
                Ok(Arc::new(move |_| {
                    convert::<K, T>(get()).map_err(|e| e.at(key_span))
                }))
            }
            _ => Err(MathError::UnsupportedCompilation {
                key: entity.key().to_string(),
                span: Some(key_span),
            }),
        }
    }

    // ==================== the exponentiation peek ====================

    fn apply_exponent<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        mut node: Node<T>,
        depth: usize,
        slots: &Trie<usize>,
    ) -> Result<Node<T>, MathError> {
        loop {
            let mut probe = *pos;
            self.skip_whitespace(&mut probe);
            match self.char_at(probe) {
                None => return Ok(node),
                Some(c) if stop.close == Some(c) || stop.separator == Some(c) => {
                    return Ok(node);
                }
                Some(_) => {}
            }
            let Some((entity, key_len)) = self.lookup(probe) else {
                return Ok(node);
            };
            if entity.precedence() < Precedence::Exponentiation {
                return Ok(node);
            }
            let Some(kind) = T::native(entity.payload()) else {
                // Foreign operand operators are left for the main loop,
                // which reports them as uncompilable
                return Ok(node);
            };
            let key_span = Span::new(probe, probe + key_len);
            match kind {
                EntityKind::Postfix { apply } => {
                    *pos = probe + key_len;
                    let apply = Arc::clone(apply);
                    let base = node;
                    node = Arc::new(move |args| apply(base(args)?).map_err(|e| e.at(key_span)));
                }
                EntityKind::OperandInfix { apply, .. } => {
                    *pos = probe + key_len;
                    let rhs = self.scan_operand::<T>(pos, stop, depth, slots)?;
                    let apply = Arc::clone(apply);
                    let base = node;
                    node = Arc::new(move |args| {
                        apply(base(args)?, rhs(args)?).map_err(|e| e.at(key_span))
                    });
                }
                _ => return Ok(node),
            }
        }
    }

    // ==================== helpers ====================

    fn scan_operand<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        slots: &Trie<usize>,
    ) -> Result<Node<T>, MathError> {
        let expected_at = *pos;
        self.scan::<T>(pos, stop, Precedence::Basic, true, depth + 1, slots)?
            .ok_or(MathError::InvalidOperand {
                span: Some(Span::at(expected_at)),
            })
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_required<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        min_prec: Precedence,
        depth: usize,
        expected_at: usize,
        slots: &Trie<usize>,
    ) -> Result<Node<T>, MathError> {
        self.scan::<T>(pos, stop, min_prec, false, depth + 1, slots)?
            .ok_or(MathError::InvalidOperand {
                span: Some(Span::at(expected_at)),
            })
    }

    fn combine<T: Numeric>(
        &self,
        value: Option<Node<T>>,
        node: Node<T>,
        at: usize,
    ) -> Result<Node<T>, MathError> {
        Ok(match value {
            None => node,
            Some(lhs) => mul_node(lhs, node, Span::at(at)),
        })
    }

    fn lookup(&self, pos: usize) -> Option<(&Arc<Entity>, usize)> {
        let suffix = &self.text[pos..];
        self.context
            .and_then(|ctx| ctx.find(suffix))
            .or_else(|| self.parameters.and_then(|p| p.find(suffix)))
    }

    /// Context bindings first, then declared parameter slots, then the
    /// call-scoped parameter table
    fn resolve(&self, pos: usize, slots: &Trie<usize>) -> Option<Resolved> {
        let suffix = &self.text[pos..];
        if let Some((entity, len)) = self.context.and_then(|ctx| ctx.find(suffix)) {
            return Some(Resolved::Entity(Arc::clone(entity), len));
        }
        if let Some((&index, len)) = slots.find(suffix) {
            return Some(Resolved::Slot(index, len));
        }
        self.parameters
            .and_then(|p| p.find(suffix))
            .map(|(entity, len)| Resolved::Entity(Arc::clone(entity), len))
    }

    /// An unresolvable identifier is an unbound variable; anything else is
    /// an unknown token
    fn unresolved(&self, pos: usize) -> MathError {
        let first = self.text[pos..].chars().next();
        if first.is_some_and(|c| c.is_alphabetic() || c == '_') {
            let name: String = self.text[pos..]
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            let span = Span::new(pos, pos + name.len());
            return MathError::UnboundVariable { name, span: Some(span) };
        }
        let token: String = self.text[pos..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .take(16)
            .collect();
        MathError::unknown_token(token, Span::at(pos))
    }

    fn is_separator_here(&self, c: char, has_value: bool, pos: usize) -> bool {
        if c != self.format.decimal_point() || has_value {
            return true;
        }
        !self.text[pos + c.len_utf8()..]
            .chars()
            .next()
            .is_some_and(|n| n.is_ascii_digit())
    }

    fn char_at(&self, pos: usize) -> Option<char> {
        self.text.get(pos..).and_then(|rest| rest.chars().next())
    }

    fn skip_whitespace(&self, pos: &mut usize) {
        while let Some(c) = self.char_at(*pos) {
            if !c.is_whitespace() {
                break;
            }
            *pos += c.len_utf8();
        }
    }

    fn skip_empty_parens(&self, pos: &mut usize) {
        let mut probe = *pos;
        self.skip_whitespace(&mut probe);
        if self.char_at(probe) != Some('(') {
            return;
        }
        probe += 1;
        self.skip_whitespace(&mut probe);
        if self.char_at(probe) == Some(')') {
            *pos = probe + 1;
        }
    }

    fn expect_open(&self, pos: &mut usize, open: char) -> Result<usize, MathError> {
        self.skip_whitespace(pos);
        if self.char_at(*pos) == Some(open) {
            let at = *pos;
            *pos += open.len_utf8();
            Ok(at)
        } else {
            Err(MathError::InvalidOperand {
                span: Some(Span::at(*pos)),
            })
        }
    }

    fn expect_close(&self, pos: &mut usize, close: char, open_pos: usize) -> Result<(), MathError> {
        if self.char_at(*pos) == Some(close) {
            *pos += close.len_utf8();
            Ok(())
        } else {
            Err(MathError::UnclosedBracket {
                expected: close,
                span: Some(Span::at(open_pos)),
            })
        }
    }
}
