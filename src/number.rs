//! Numeric kinds the scanner is generic over.
//!
//! One generic kernel replaces per-kind copies of the evaluation core: the
//! scanner is written once against [`Numeric`] and instantiated per concrete
//! type. The trait carries exactly what the kernel needs — checked
//! arithmetic for the hardcoded `+ - * /` paths, culture-aware literal
//! scanning, and the double-pivot conversions used when an entity of one
//! kind is met while evaluating in another.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use num_complex::Complex64;
use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::entity::{EntityKind, EntityPayload};
use crate::error::{MathError, Span};
use crate::format::NumberFormat;

/// Tag for the supported numeric kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    Double,
    Decimal,
    Complex,
}

/// A numeric kind the evaluation kernel can be instantiated with.
///
/// Arithmetic is checked: the decimal kind surfaces overflow and division by
/// zero as [`MathError::Arithmetic`], while the floating kinds follow
/// IEEE 754 and never fail.
pub trait Numeric:
    Copy + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    const KIND: NumberKind;

    fn zero() -> Self;
    fn is_zero(self) -> bool;

    fn checked_add(self, rhs: Self) -> Result<Self, MathError>;
    fn checked_sub(self, rhs: Self) -> Result<Self, MathError>;
    fn checked_mul(self, rhs: Self) -> Result<Self, MathError>;
    fn checked_div(self, rhs: Self) -> Result<Self, MathError>;
    fn checked_neg(self) -> Result<Self, MathError>;

    /// Lossy-free projection onto a double, the pivot for cross-kind
    /// dispatch. Fails when the value has no double representation (complex
    /// with a nonzero imaginary part).
    fn to_double(self) -> Result<f64, MathError>;

    /// Lift a double into this kind. Fails when the value is out of this
    /// kind's range (non-finite doubles in the decimal kind).
    fn from_double(value: f64) -> Result<Self, MathError>;

    /// Scan a literal of this kind starting at `pos`, honoring the format's
    /// decimal point, group separators, and exponent notation. Returns
    /// `None` without advancing when no literal starts here.
    ///
    /// `blocked` carries the active argument-separator and close symbols:
    /// those are never skipped as digit grouping, so `max(1,2)` keeps its
    /// two arguments under a format that groups with commas.
    fn scan_literal(
        text: &str,
        pos: &mut usize,
        format: &NumberFormat,
        blocked: &[char],
    ) -> Result<Option<Self>, MathError>;

    /// This kind's view of an entity payload, if the entity was registered
    /// for this kind
    fn native(payload: &EntityPayload) -> Option<&EntityKind<Self>>;

    /// Tag an entity behavior with this kind
    fn wrap(kind: EntityKind<Self>) -> EntityPayload;
}

/// Convert between numeric kinds through the double pivot.
///
/// Same-kind conversion is the identity (no precision round-trip); anything
/// else goes value → double → target, which is exactly the documented
/// double↔decimal conversion semantics.
pub(crate) fn convert<A: Numeric, B: Numeric>(value: A) -> Result<B, MathError> {
    let any: &dyn Any = &value;
    if let Some(same) = any.downcast_ref::<B>() {
        return Ok(*same);
    }
    B::from_double(value.to_double()?)
}

impl Numeric for f64 {
    const KIND: NumberKind = NumberKind::Double;

    fn zero() -> Self {
        0.0
    }

    fn is_zero(self) -> bool {
        self == 0.0
    }

    fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self + rhs)
    }

    fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self - rhs)
    }

    fn checked_mul(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self * rhs)
    }

    // IEEE 754: division by zero yields an infinity, not an error
    fn checked_div(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self / rhs)
    }

    fn checked_neg(self) -> Result<Self, MathError> {
        Ok(-self)
    }

    fn to_double(self) -> Result<f64, MathError> {
        Ok(self)
    }

    fn from_double(value: f64) -> Result<Self, MathError> {
        Ok(value)
    }

    fn scan_literal(
        text: &str,
        pos: &mut usize,
        format: &NumberFormat,
        blocked: &[char],
    ) -> Result<Option<Self>, MathError> {
        let Some((normalized, span)) = collect_real_literal(text, pos, format, blocked) else {
            return Ok(None);
        };
        let value = f64::from_str(&normalized)
            .map_err(|_| MathError::invalid_number(&text[span.start..span.end], span))?;
        Ok(Some(value))
    }

    fn native(payload: &EntityPayload) -> Option<&EntityKind<Self>> {
        match payload {
            EntityPayload::Double(kind) => Some(kind),
            _ => None,
        }
    }

    fn wrap(kind: EntityKind<Self>) -> EntityPayload {
        EntityPayload::Double(kind)
    }
}

impl Numeric for Decimal {
    const KIND: NumberKind = NumberKind::Decimal;

    fn zero() -> Self {
        Decimal::ZERO
    }

    fn is_zero(self) -> bool {
        Decimal::is_zero(&self)
    }

    fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        Decimal::checked_add(self, rhs)
            .ok_or_else(|| MathError::arithmetic("Decimal value was out of range"))
    }

    fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        Decimal::checked_sub(self, rhs)
            .ok_or_else(|| MathError::arithmetic("Decimal value was out of range"))
    }

    fn checked_mul(self, rhs: Self) -> Result<Self, MathError> {
        Decimal::checked_mul(self, rhs)
            .ok_or_else(|| MathError::arithmetic("Decimal value was out of range"))
    }

    fn checked_div(self, rhs: Self) -> Result<Self, MathError> {
        if Numeric::is_zero(rhs) {
            return Err(MathError::arithmetic("Attempted to divide by zero"));
        }
        Decimal::checked_div(self, rhs)
            .ok_or_else(|| MathError::arithmetic("Decimal value was out of range"))
    }

    fn checked_neg(self) -> Result<Self, MathError> {
        Ok(-self)
    }

    fn to_double(self) -> Result<f64, MathError> {
        self.to_f64().ok_or_else(|| {
            MathError::arithmetic(format!("Decimal {self} has no double representation"))
        })
    }

    fn from_double(value: f64) -> Result<Self, MathError> {
        Decimal::from_f64(value).ok_or_else(|| {
            MathError::arithmetic(format!("Value {value} has no decimal representation"))
        })
    }

    fn scan_literal(
        text: &str,
        pos: &mut usize,
        format: &NumberFormat,
        blocked: &[char],
    ) -> Result<Option<Self>, MathError> {
        let Some((normalized, span)) = collect_real_literal(text, pos, format, blocked) else {
            return Ok(None);
        };
        let parsed = if normalized.contains('e') {
            Decimal::from_scientific(&normalized)
        } else {
            Decimal::from_str(&normalized)
        };
        // Out-of-range literals are a native decimal failure, wrapped with
        // the inner message preserved
        parsed
            .map(Some)
            .map_err(|e| MathError::arithmetic(e.to_string()).at(span))
    }

    fn native(payload: &EntityPayload) -> Option<&EntityKind<Self>> {
        match payload {
            EntityPayload::Decimal(kind) => Some(kind),
            _ => None,
        }
    }

    fn wrap(kind: EntityKind<Self>) -> EntityPayload {
        EntityPayload::Decimal(kind)
    }
}

impl Numeric for Complex64 {
    const KIND: NumberKind = NumberKind::Complex;

    fn zero() -> Self {
        Complex64::new(0.0, 0.0)
    }

    fn is_zero(self) -> bool {
        self.re == 0.0 && self.im == 0.0
    }

    fn checked_add(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self + rhs)
    }

    fn checked_sub(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self - rhs)
    }

    fn checked_mul(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self * rhs)
    }

    fn checked_div(self, rhs: Self) -> Result<Self, MathError> {
        Ok(self / rhs)
    }

    fn checked_neg(self) -> Result<Self, MathError> {
        Ok(-self)
    }

    fn to_double(self) -> Result<f64, MathError> {
        if self.im == 0.0 {
            Ok(self.re)
        } else {
            Err(MathError::arithmetic(format!(
                "Complex number {self} with a nonzero imaginary part has no double representation"
            )))
        }
    }

    fn from_double(value: f64) -> Result<Self, MathError> {
        Ok(Complex64::new(value, 0.0))
    }

    // Real literal grammar plus the imaginary unit: a bare `i` (not part of
    // an identifier) and the adjacent suffix form `3i`
    fn scan_literal(
        text: &str,
        pos: &mut usize,
        format: &NumberFormat,
        blocked: &[char],
    ) -> Result<Option<Self>, MathError> {
        if imaginary_unit_at(text, *pos) {
            *pos += 1;
            return Ok(Some(Complex64::new(0.0, 1.0)));
        }
        let Some((normalized, span)) = collect_real_literal(text, pos, format, blocked) else {
            return Ok(None);
        };
        let real = f64::from_str(&normalized)
            .map_err(|_| MathError::invalid_number(&text[span.start..span.end], span))?;
        if imaginary_unit_at(text, *pos) {
            *pos += 1;
            return Ok(Some(Complex64::new(0.0, real)));
        }
        Ok(Some(Complex64::new(real, 0.0)))
    }

    fn native(payload: &EntityPayload) -> Option<&EntityKind<Self>> {
        match payload {
            EntityPayload::Complex(kind) => Some(kind),
            _ => None,
        }
    }

    fn wrap(kind: EntityKind<Self>) -> EntityPayload {
        EntityPayload::Complex(kind)
    }
}

/// True when `i` at `pos` is the imaginary unit rather than the start of an
/// identifier like `inf`
fn imaginary_unit_at(text: &str, pos: usize) -> bool {
    let mut chars = text[pos..].chars();
    if chars.next() != Some('i') {
        return false;
    }
    !chars
        .next()
        .is_some_and(|next| next.is_alphanumeric() || next == '_')
}

/// Collect one real literal starting at `pos` into the invariant form
/// (`.` decimal point, `e` exponent, separators stripped), advancing `pos`
/// past the consumed characters.
fn collect_real_literal(
    text: &str,
    pos: &mut usize,
    format: &NumberFormat,
    blocked: &[char],
) -> Option<(String, Span)> {
    let rest = &text[*pos..];
    if !format.starts_literal(rest) {
        return None;
    }

    let start = *pos;
    let mut normalized = String::new();
    let mut seen_point = false;
    let mut seen_exponent = false;
    let mut chars = rest.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let digit_follows = || {
            rest[offset + c.len_utf8()..]
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_digit())
        };
        if c.is_ascii_digit() {
            normalized.push(c);
            chars.next();
        } else if c == format.decimal_point() && !seen_point && !seen_exponent && digit_follows() {
            seen_point = true;
            if normalized.is_empty() {
                normalized.push('0');
            }
            normalized.push('.');
            chars.next();
        } else if format.is_group_separator(c)
            && !blocked.contains(&c)
            && !seen_exponent
            && normalized.ends_with(|p: char| p.is_ascii_digit())
            && digit_follows()
        {
            // Grouping characters are skipped, never kept
            chars.next();
        } else if (c == 'e' || c == 'E') && !seen_exponent && !normalized.is_empty() {
            // Only consume the marker when an exponent actually follows;
            // otherwise `2e` is the number 2 next to an identifier
            let after = &rest[offset + 1..];
            let mut lookahead = after.chars();
            let consumed_sign = match lookahead.next() {
                Some(sign @ ('+' | '-')) if lookahead.next().is_some_and(|d| d.is_ascii_digit()) => {
                    Some(sign)
                }
                Some(d) if d.is_ascii_digit() => None,
                _ => break,
            };
            seen_exponent = true;
            normalized.push('e');
            chars.next();
            if let Some(sign) = consumed_sign {
                normalized.push(sign);
                chars.next();
            }
        } else {
            break;
        }
    }

    let consumed = chars
        .peek()
        .map_or(rest.len(), |&(offset, _)| offset);
    *pos = start + consumed;
    Some((normalized, Span::new(start, *pos)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_f64(text: &str, format: &NumberFormat) -> (Option<f64>, usize) {
        let mut pos = 0;
        let value = f64::scan_literal(text, &mut pos, format, &[]).unwrap();
        (value, pos)
    }

    #[test]
    fn plain_and_fractional_literals() {
        let fmt = NumberFormat::invariant();
        assert_eq!(scan_f64("42", &fmt), (Some(42.0), 2));
        assert_eq!(scan_f64("3.25 + 1", &fmt), (Some(3.25), 4));
        assert_eq!(scan_f64(".5", &fmt), (Some(0.5), 2));
    }

    #[test]
    fn group_separators_are_skipped_between_digits() {
        assert_eq!(scan_f64("22,888.32", &NumberFormat::en_us()).0, Some(22888.32));
        assert_eq!(scan_f64("22 888,32", &NumberFormat::fr()).0, Some(22888.32));
        assert_eq!(scan_f64("1'234.5", &NumberFormat::de_ch()).0, Some(1234.5));
    }

    #[test]
    fn trailing_separator_is_not_consumed() {
        // `2,` under en-US: the comma belongs to the caller (argument lists)
        let (value, pos) = scan_f64("2, 3", &NumberFormat::en_us());
        assert_eq!(value, Some(2.0));
        assert_eq!(pos, 1);
    }

    #[test]
    fn blocked_separator_is_never_grouping() {
        // Inside `max(1,2)` under en-US the comma is the active argument
        // separator, not digit grouping
        let mut pos = 0;
        let value = f64::scan_literal("1,2)", &mut pos, &NumberFormat::en_us(), &[',', ')'])
            .unwrap();
        assert_eq!(value, Some(1.0));
        assert_eq!(pos, 1);
    }

    #[test]
    fn exponent_requires_digits() {
        let fmt = NumberFormat::invariant();
        assert_eq!(scan_f64("1e3", &fmt), (Some(1000.0), 3));
        assert_eq!(scan_f64("1e-2", &fmt), (Some(0.01), 4));
        // `2e` alone: `e` is left for entity lookup (Euler's number)
        assert_eq!(scan_f64("2e", &fmt), (Some(2.0), 1));
        assert_eq!(scan_f64("2e+x", &fmt), (Some(2.0), 1));
    }

    #[test]
    fn decimal_literal_out_of_range_is_wrapped() {
        let mut pos = 0;
        let err = Decimal::scan_literal(
            "99999999999999999999999999999999999999999999",
            &mut pos,
            &NumberFormat::invariant(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, MathError::Arithmetic { .. }));
    }

    #[test]
    fn imaginary_suffix_and_bare_unit() {
        let fmt = NumberFormat::invariant();
        let mut pos = 0;
        let v = Complex64::scan_literal("3i", &mut pos, &fmt, &[])
            .unwrap()
            .unwrap();
        assert_eq!(v, Complex64::new(0.0, 3.0));
        assert_eq!(pos, 2);

        let mut pos = 0;
        let v = Complex64::scan_literal("i * i", &mut pos, &fmt, &[])
            .unwrap()
            .unwrap();
        assert_eq!(v, Complex64::new(0.0, 1.0));
        assert_eq!(pos, 1);

        // `inf`-style identifiers are not the imaginary unit
        let mut pos = 0;
        assert_eq!(
            Complex64::scan_literal("ix", &mut pos, &fmt, &[]).unwrap(),
            None
        );
    }

    #[test]
    fn cross_kind_conversion_pivots_through_double() {
        let d: Decimal = convert(2.5f64).unwrap();
        assert_eq!(d, Decimal::new(25, 1));
        let c: Complex64 = convert(2.5f64).unwrap();
        assert_eq!(c, Complex64::new(2.5, 0.0));
        let err = convert::<Complex64, f64>(Complex64::new(0.0, 1.0)).unwrap_err();
        assert!(matches!(err, MathError::Arithmetic { .. }));
        // Same-kind conversion is the identity
        let same: Decimal = convert(Decimal::new(15, 1)).unwrap();
        assert_eq!(same, Decimal::new(15, 1));
    }
}
