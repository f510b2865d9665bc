//! The evaluation core: a precedence-climbing scanner over a borrowed
//! character span.
//!
//! No token stream and no AST — the scanner walks the input left to right
//! exactly once, resolving literals, brackets, the hardcoded `+ - * /`
//! grammar, and context entities as it meets them, and accumulates a value
//! directly. A minimum precedence threads through the recursive calls: a
//! frame keeps consuming while what it meets binds tighter, and yields to
//! its caller otherwise.
//!
//! The kernel is generic over [`Numeric`], so the double, decimal, and
//! complex evaluators are instantiations of the same function family rather
//! than hand-kept copies. Entities registered for a different kind than the
//! active one are dispatched through the double pivot (the accumulator is
//! converted, the entity runs in its own kind — including scanning its
//! right-hand operands there — and the result converts back).

use std::cell::Cell;
use std::sync::Arc;

use num_complex::Complex64;
use rust_decimal::Decimal;

use crate::context::MathContext;
use crate::entity::{Entity, EntityKind, EntityPayload};
use crate::error::{MathError, Span};
use crate::format::NumberFormat;
use crate::number::{convert, Numeric};
use crate::parameters::Parameters;
use crate::precedence::Precedence;

use super::{EvalStep, ObserverFn};

/// Symbols the current frame must stop at and leave for its caller
#[derive(Clone, Copy, Default)]
pub(crate) struct Stop {
    pub separator: Option<char>,
    pub close: Option<char>,
}

impl Stop {
    pub(crate) fn closing(close: char) -> Self {
        Stop {
            separator: None,
            close: Some(close),
        }
    }

    pub(crate) fn arguments(separator: char, close: char) -> Self {
        Stop {
            separator: Some(separator),
            close: Some(close),
        }
    }

    /// The active stop characters, for blocking group-separator treatment
    /// inside literals
    pub(crate) fn blocked(&self) -> ([char; 2], usize) {
        let mut buf = ['\0'; 2];
        let mut n = 0;
        if let Some(s) = self.separator {
            buf[n] = s;
            n += 1;
        }
        if let Some(c) = self.close {
            buf[n] = c;
            n += 1;
        }
        (buf, n)
    }
}

/// One evaluation pass over one input string.
///
/// All mutable state (current position, accumulators) lives on the call
/// stack of `scan`; the scanner itself only borrows the frozen tables, so
/// one context can serve many concurrent evaluations.
pub(crate) struct Scanner<'a> {
    text: &'a str,
    context: Option<&'a MathContext>,
    parameters: Option<&'a Parameters>,
    format: &'a NumberFormat,
    max_depth: usize,
    observer: Option<&'a ObserverFn>,
    step: Cell<u32>,
}

impl<'a> Scanner<'a> {
    pub fn new(
        text: &'a str,
        context: Option<&'a MathContext>,
        parameters: Option<&'a Parameters>,
        format: &'a NumberFormat,
        max_depth: usize,
        observer: Option<&'a ObserverFn>,
    ) -> Self {
        Scanner {
            text,
            context,
            parameters,
            format,
            max_depth,
            observer,
            step: Cell::new(0),
        }
    }

    /// Evaluate the whole input as one expression of kind `T`
    pub fn evaluate<T: Numeric>(&self) -> Result<T, MathError> {
        if self.text.trim().is_empty() {
            return Err(MathError::EmptyExpression);
        }
        let mut pos = 0;
        let value = self
            .scan::<T>(&mut pos, Stop::default(), Precedence::Unknown, false, 0)?
            .ok_or(MathError::NotEvaluated {
                span: Some(Span::new(0, self.text.len())),
            })?;
        if pos < self.text.len() {
            return Err(self.unknown_token(pos));
        }
        self.notify(0, pos, value, true);
        Ok(value)
    }

    // ==================== the scan loop ====================

    /// Scan one sub-expression. Returns `Ok(None)` when the frame stopped
    /// without ever producing a value (callers that require one turn that
    /// into a positional error).
    fn scan<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        min_prec: Precedence,
        operand: bool,
        depth: usize,
    ) -> Result<Option<T>, MathError> {
        if depth > self.max_depth {
            return Err(MathError::MaxDepthExceeded);
        }
        let start = *pos;
        let value = self.scan_inner::<T>(pos, stop, min_prec, operand, depth)?;
        if let Some(v) = value {
            self.notify(start, *pos, v, false);
        }
        Ok(value)
    }

    fn scan_inner<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        min_prec: Precedence,
        operand: bool,
        depth: usize,
    ) -> Result<Option<T>, MathError> {
        let (blocked_buf, blocked_len) = stop.blocked();
        let blocked = &blocked_buf[..blocked_len];
        let mut min_prec = min_prec;
        let mut operand = operand;
        let mut value: Option<T> = None;

        while let Some(c) = self.char_at(*pos) {
            if stop.close == Some(c) {
                break;
            }
            if stop.separator == Some(c) && self.is_separator_here(c, value.is_some(), *pos) {
                break;
            }

            if let Some(number) = T::scan_literal(self.text, pos, self.format, blocked)? {
                let number = self.apply_exponent(pos, stop, number, depth)?;
                if operand {
                    // A number operand keeps scanning at Function precedence
                    // so directly juxtaposed tighter tokens stay part of the
                    // operand (`-2π` negates the whole product)
                    value = Some(number);
                    operand = false;
                    min_prec = min_prec.max(Precedence::Function);
                    continue;
                }
                value = Some(self.combine(value, number, *pos)?);
                continue;
            }

            if c == '(' {
                if min_prec >= Precedence::Function {
                    break;
                }
                let open_pos = *pos;
                *pos += 1;
                let inner = self
                    .scan::<T>(pos, Stop::closing(')'), Precedence::Unknown, false, depth + 1)?
                    .ok_or(MathError::InvalidOperand {
                        span: Some(Span::at(open_pos + 1)),
                    })?;
                self.expect_close(pos, ')', open_pos)?;
                // The group is a primary: its own exponent binds before it
                // multiplies into whatever came before, `a(b+c)^2`
                let inner = self.apply_exponent(pos, stop, inner, depth)?;
                if operand {
                    return Ok(Some(inner));
                }
                value = Some(self.combine(value, inner, *pos)?);
            } else if (c == '+' || c == '-') && self.char_at(*pos + 1) != Some(c) {
                if value.is_none() {
                    // Leading sign with nothing consequential before it is
                    // unary; `- -4` folds through the nested operand scan
                    let sign_pos = *pos;
                    *pos += 1;
                    if c == '-' {
                        let body = self.scan_operand::<T>(pos, stop, depth)?;
                        let negated = body.checked_neg().map_err(|e| e.at(Span::at(sign_pos)))?;
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
                    )?;
                    let lhs = value.take().unwrap_or_else(T::zero);
                    let combined = if c == '+' {
                        lhs.checked_add(rhs)
                    } else {
                        lhs.checked_sub(rhs)
                    };
                    value = Some(combined.map_err(|e| e.at(Span::at(op_pos)))?);
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
                let rhs =
                    self.scan_required::<T>(pos, stop, Precedence::Basic, depth, op_pos + 1)?;
                let combined = if c == '*' {
                    lhs.checked_mul(rhs)
                } else {
                    lhs.checked_div(rhs)
                };
                value = Some(combined.map_err(|e| e.at(Span::at(op_pos)))?);
            } else if c.is_whitespace() {
                *pos += c.len_utf8();
            } else if let Some((entity, key_len)) = self.lookup(*pos) {
                // Stop on equal precedence too: that is what chains
                // same-precedence operators left to right
                if entity.precedence() <= min_prec {
                    break;
                }
                let entity = Arc::clone(entity);
                value = Some(self.dispatch(pos, stop, depth, value, &entity, key_len)?);
                if operand {
                    return Ok(value);
                }
            } else if let Some(len) = self.format.currency_len(&self.text[*pos..]) {
                // Currency markers around literals are skipped silently
                *pos += len;
            } else {
                return Err(self.unknown_token(*pos));
            }
        }

        Ok(value)
    }

    // ==================== entity dispatch ====================

    /// Apply one entity at the cursor. The accumulated value goes in (used
    /// by postfix and infix entities, multiplied by primaries) and the new
    /// accumulated value comes out.
    fn dispatch<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        value: Option<T>,
        entity: &Entity,
        key_len: usize,
    ) -> Result<T, MathError> {
        match entity.payload() {
            EntityPayload::Double(kind) => {
                self.dispatch_in::<T, f64>(pos, stop, depth, value, kind, key_len)
            }
            EntityPayload::Decimal(kind) => {
                self.dispatch_in::<T, Decimal>(pos, stop, depth, value, kind, key_len)
            }
            EntityPayload::Complex(kind) => {
                self.dispatch_in::<T, Complex64>(pos, stop, depth, value, kind, key_len)
            }
        }
    }

    /// Dispatch in the entity's own kind `K`, bridging the accumulator in
    /// and the result back out. For a native entity (`T == K`) the
    /// conversions are the identity.
    fn dispatch_in<T: Numeric, K: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        value: Option<T>,
        kind: &EntityKind<K>,
        key_len: usize,
    ) -> Result<T, MathError> {
        let key_span = Span::new(*pos, *pos + key_len);
        let seed = match value {
            None => None,
            Some(v) => Some(convert::<T, K>(v).map_err(|e| e.at(key_span))?),
        };
        let out = self.apply_entity::<K>(pos, stop, depth, seed, kind, key_len)?;
        convert::<K, T>(out).map_err(|e| e.at(key_span))
    }

    fn apply_entity<K: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        value: Option<K>,
        kind: &EntityKind<K>,
        key_len: usize,
    ) -> Result<K, MathError> {
        let key_start = *pos;
        *pos += key_len;
        let key_span = Span::new(key_start, *pos);

        match kind {
            EntityKind::Constant { value: v } | EntityKind::Variable { value: v } => {
                let primary = self.apply_exponent(pos, stop, *v, depth)?;
                self.combine(value, primary, *pos)
            }
            EntityKind::Getter { get } => {
                self.skip_empty_parens(pos);
                let primary = self.apply_exponent(pos, stop, get(), depth)?;
                self.combine(value, primary, *pos)
            }
            EntityKind::Unary { apply, open, close } => {
                let arg = match close {
                    Some(close_ch) => {
                        let opener = match open {
                            Some(open_ch) => self.expect_open(pos, *open_ch)?,
                            None => key_start,
                        };
                        let arg = self.scan_required::<K>(
                            pos,
                            Stop::closing(*close_ch),
                            Precedence::Unknown,
                            depth,
                            *pos,
                        )?;
                        self.expect_close(pos, *close_ch, opener)?;
                        arg
                    }
                    None => self.scan_operand::<K>(pos, stop, depth)?,
                };
                let primary = apply(arg).map_err(|e| e.at(key_span))?;
                let primary = self.apply_exponent(pos, stop, primary, depth)?;
                self.combine(value, primary, *pos)
            }
            EntityKind::Variadic {
                apply,
                open,
                separator,
                close,
            } => {
                let open_pos = self.expect_open(pos, *open)?;
                let mut args = Vec::new();
                loop {
                    let arg = self.scan_required::<K>(
                        pos,
                        Stop::arguments(*separator, *close),
                        Precedence::Unknown,
                        depth,
                        *pos,
                    )?;
                    args.push(arg);
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
                let primary = apply(&args).map_err(|e| e.at(key_span))?;
                let primary = self.apply_exponent(pos, stop, primary, depth)?;
                self.combine(value, primary, *pos)
            }
            EntityKind::Prefix { apply } => {
                let body = self.scan_operand::<K>(pos, stop, depth)?;
                let primary = apply(body).map_err(|e| e.at(key_span))?;
                let primary = self.apply_exponent(pos, stop, primary, depth)?;
                self.combine(value, primary, *pos)
            }
            EntityKind::Postfix { apply } => {
                let lhs = value.ok_or(MathError::InvalidOperand {
                    span: Some(Span::at(key_start)),
                })?;
                let out = apply(lhs).map_err(|e| e.at(key_span))?;
                self.apply_exponent(pos, stop, out, depth)
            }
            EntityKind::OperandInfix { apply, .. } => {
                let lhs = value.ok_or(MathError::InvalidOperand {
                    span: Some(Span::at(key_start)),
                })?;
                let rhs = self.scan_operand::<K>(pos, stop, depth)?;
                apply(lhs, rhs).map_err(|e| e.at(key_span))
            }
            EntityKind::Infix { apply, precedence } => {
                let lhs = value.ok_or(MathError::InvalidOperand {
                    span: Some(Span::at(key_start)),
                })?;
                let rhs = self.scan_required::<K>(pos, stop, *precedence, depth, *pos)?;
                apply(lhs, rhs).map_err(|e| e.at(key_span))
            }
        }
    }

    // ==================== the exponentiation peek ====================

    /// After producing a primary, consume any directly-following operand
    /// operators and exponentiation entities before the primary takes part
    /// in implicit multiplication. The right side of an exponentiation is
    /// itself an operand scan with its own peek, which is what makes
    /// `2^3^2` associate to the right.
    fn apply_exponent<T: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        mut value: T,
        depth: usize,
    ) -> Result<T, MathError> {
        loop {
            let mut probe = *pos;
            self.skip_whitespace(&mut probe);
            match self.char_at(probe) {
                None => return Ok(value),
                Some(c) if stop.close == Some(c) || stop.separator == Some(c) => {
                    return Ok(value);
                }
                Some(_) => {}
            }
            let Some((entity, key_len)) = self.lookup(probe) else {
                return Ok(value);
            };
            if entity.precedence() < Precedence::Exponentiation {
                return Ok(value);
            }
            let entity = Arc::clone(entity);
            let stepped = match entity.payload() {
                EntityPayload::Double(kind) => {
                    self.exponent_step::<T, f64>(pos, stop, depth, value, kind, probe, key_len)?
                }
                EntityPayload::Decimal(kind) => {
                    self.exponent_step::<T, Decimal>(pos, stop, depth, value, kind, probe, key_len)?
                }
                EntityPayload::Complex(kind) => {
                    self.exponent_step::<T, Complex64>(pos, stop, depth, value, kind, probe, key_len)?
                }
            };
            match stepped {
                Some(next) => value = next,
                None => return Ok(value),
            }
        }
    }

    /// One peek step in the entity's own kind. Returns `None` without
    /// consuming anything when the entity is not an operand operator or
    /// exponentiation, leaving it for the main loop.
    #[allow(clippy::too_many_arguments)]
    fn exponent_step<T: Numeric, K: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
        value: T,
        kind: &EntityKind<K>,
        key_start: usize,
        key_len: usize,
    ) -> Result<Option<T>, MathError> {
        let key_span = Span::new(key_start, key_start + key_len);
        match kind {
            EntityKind::Postfix { apply } => {
                *pos = key_start + key_len;
                let base = convert::<T, K>(value).map_err(|e| e.at(key_span))?;
                let out = apply(base).map_err(|e| e.at(key_span))?;
                convert::<K, T>(out).map_err(|e| e.at(key_span)).map(Some)
            }
            EntityKind::OperandInfix { apply, .. } => {
                *pos = key_start + key_len;
                let base = convert::<T, K>(value).map_err(|e| e.at(key_span))?;
                let rhs = self.scan_operand::<K>(pos, stop, depth)?;
                let out = apply(base, rhs).map_err(|e| e.at(key_span))?;
                convert::<K, T>(out).map_err(|e| e.at(key_span)).map(Some)
            }
            _ => Ok(None),
        }
    }

    // ==================== scan helpers ====================

    /// Scan a tightly-bound operand: exactly one primary (with its own
    /// exponent chain), for prefix operators, exponentiation right sides,
    /// and bracketless unary-function arguments
    fn scan_operand<K: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        depth: usize,
    ) -> Result<K, MathError> {
        let expected_at = *pos;
        self.scan::<K>(pos, stop, Precedence::Basic, true, depth + 1)?
            .ok_or(MathError::InvalidOperand {
                span: Some(Span::at(expected_at)),
            })
    }

    /// Scan a sub-expression that must produce a value (operator right
    /// sides, bracketed interiors, function arguments)
    fn scan_required<K: Numeric>(
        &self,
        pos: &mut usize,
        stop: Stop,
        min_prec: Precedence,
        depth: usize,
        expected_at: usize,
    ) -> Result<K, MathError> {
        self.scan::<K>(pos, stop, min_prec, false, depth + 1)?
            .ok_or(MathError::InvalidOperand {
                span: Some(Span::at(expected_at)),
            })
    }

    /// Implicit multiplication: a fresh primary multiplies into the value
    /// already accumulated, if any
    fn combine<K: Numeric>(
        &self,
        value: Option<K>,
        primary: K,
        at: usize,
    ) -> Result<K, MathError> {
        match value {
            None => Ok(primary),
            Some(v) => v.checked_mul(primary).map_err(|e| e.at(Span::at(at))),
        }
    }

    fn lookup(&self, pos: usize) -> Option<(&Arc<Entity>, usize)> {
        let suffix = &self.text[pos..];
        // The ambient context is consulted first: its bindings shadow
        // same-named parameters
        self.context
            .and_then(|ctx| ctx.find(suffix))
            .or_else(|| self.parameters.and_then(|p| p.find(suffix)))
    }

    fn unknown_token(&self, pos: usize) -> MathError {
        let token: String = self.text[pos..]
            .chars()
            .take_while(|c| !c.is_whitespace())
            .take(16)
            .collect();
        MathError::unknown_token(token, Span::at(pos))
    }

    /// A separator char stops the frame unless it is really this culture's
    /// decimal point starting a fraction (`pow(,5)` under fr)
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

    /// Skip an optional empty `()` pair after a getter key
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

    /// Require `open` (after optional whitespace), returning its position
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

    /// Require `close`, reporting the unclosed bracket at the opener
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

    fn notify<T: Numeric>(&self, start: usize, end: usize, value: T, is_final: bool) {
        if let Some(observer) = self.observer {
            let step = self.step.get();
            self.step.set(step + 1);
            observer(EvalStep {
                start,
                end,
                step,
                value: value.to_double().unwrap_or(f64::NAN),
                is_final,
            });
        }
    }
}
