//! Constant expression values and C-style arithmetic promotion.
//!
//! `ConstVariant` is the tagged union produced by the evaluator (V) for
//! every constant expression. Fallible operations (division, shifts with
//! out-of-range counts, narrowing) are methods returning `Result` rather
//! than operator overloads, since `std::ops` can't fail; `Neg` and `Not`
//! are implemented directly because they can't fail for the types that
//! support them.

use std::fmt;
use std::ops::{Neg, Not};

use crate::token::CharEncoding;

/// A fixed-point decimal value (`fixed` IDL type), stored as a scaled
/// integer to avoid binary-float rounding of decimal literals.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedDecimal {
    /// Unscaled digits.
    pub mantissa: i64,
    /// Number of digits after the decimal point.
    pub scale: u8,
}

impl FixedDecimal {
    /// Renders to an `f64` for display/diagnostics only; not used for
    /// further arithmetic to avoid losing exactness.
    pub fn to_f64(self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }
}

impl fmt::Display for FixedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

/// Errors raised while evaluating or combining constant values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VariantError {
    #[error("division by zero")]
    DivideByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("operator not defined for {lhs} and {rhs}")]
    IncompatibleTypes { lhs: &'static str, rhs: &'static str },
    #[error("value {value} does not fit in target type (range {min}..={max})")]
    OutOfRange { value: i64, min: i64, max: i64 },
    #[error("shift count {0} is negative or exceeds operand width")]
    InvalidShift(i64),
}

/// A fully evaluated constant expression value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstVariant {
    /// Any signed integral category, always widened to 64 bits internally.
    I64(i64),
    /// Any unsigned integral category, widened to 64 bits.
    U64(u64),
    /// `double`/`float`.
    F64(f64),
    /// `long double`.
    LongDouble(f64),
    /// `fixed`.
    Fixed(FixedDecimal),
    /// `boolean`.
    Bool(bool),
    /// `char`/`char16`/`char32`/`wchar`.
    Char { value: u32, encoding: CharEncoding },
    /// `string`/`u16string`/`u32string`/`wstring`.
    Str { value: String, encoding: CharEncoding },
}

impl ConstVariant {
    /// The spelling of this variant's category, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstVariant::I64(_) => "integer",
            ConstVariant::U64(_) => "unsigned integer",
            ConstVariant::F64(_) => "double",
            ConstVariant::LongDouble(_) => "long double",
            ConstVariant::Fixed(_) => "fixed",
            ConstVariant::Bool(_) => "boolean",
            ConstVariant::Char { .. } => "char",
            ConstVariant::Str { .. } => "string",
        }
    }

    /// True for the integral categories (signed, unsigned, char, bool).
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            ConstVariant::I64(_) | ConstVariant::U64(_) | ConstVariant::Bool(_) | ConstVariant::Char { .. }
        )
    }

    /// Widens any integral variant to `i64` for arithmetic; used only after
    /// `is_integral` has been checked by the caller.
    fn as_i64(&self) -> Option<i64> {
        match *self {
            ConstVariant::I64(v) => Some(v),
            ConstVariant::U64(v) => Some(v as i64),
            ConstVariant::Bool(v) => Some(v as i64),
            ConstVariant::Char { value, .. } => Some(value as i64),
            _ => None,
        }
    }

    /// Widens any numeric variant to `f64`, for mixed integer/float ops.
    fn as_f64(&self) -> Option<f64> {
        match *self {
            ConstVariant::F64(v) | ConstVariant::LongDouble(v) => Some(v),
            ConstVariant::Fixed(v) => Some(v.to_f64()),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    fn is_floating(&self) -> bool {
        matches!(self, ConstVariant::F64(_) | ConstVariant::LongDouble(_) | ConstVariant::Fixed(_))
    }

    /// Checked addition with C-style usual arithmetic conversions:
    /// float dominates int, `U64` dominates `I64` when both operands are
    /// integral (unsigned wins ties, matching C's promotion rules).
    pub fn checked_add(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.numeric_op(other, i64::checked_add, u64::checked_add, |a, b| a + b)
    }

    /// Checked subtraction.
    pub fn checked_sub(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.numeric_op(other, i64::checked_sub, u64::checked_sub, |a, b| a - b)
    }

    /// Checked multiplication.
    pub fn checked_mul(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.numeric_op(other, i64::checked_mul, u64::checked_mul, |a, b| a * b)
    }

    /// Checked division; rejects integer division by zero.
    pub fn checked_div(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        if !self.is_floating() && !other.is_floating() && other.as_i64() == Some(0) {
            return Err(VariantError::DivideByZero);
        }
        self.numeric_op(
            other,
            |a, b| if b == 0 { None } else { Some(a.wrapping_div(b)) },
            |a, b| if b == 0 { None } else { Some(a / b) },
            |a, b| a / b,
        )
    }

    /// Checked remainder; rejects modulo by zero (integral operands only).
    pub fn checked_rem(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        if other.as_i64() == Some(0) && !self.is_floating() {
            return Err(VariantError::ModuloByZero);
        }
        self.numeric_op(
            other,
            |a, b| if b == 0 { None } else { Some(a.wrapping_rem(b)) },
            |a, b| if b == 0 { None } else { Some(a % b) },
            |a, b| a % b,
        )
    }

    fn numeric_op(
        &self,
        other: &ConstVariant,
        int_op: impl Fn(i64, i64) -> Option<i64>,
        uint_op: impl Fn(u64, u64) -> Option<u64>,
        float_op: impl Fn(f64, f64) -> f64,
    ) -> Result<ConstVariant, VariantError> {
        if self.is_floating() || other.is_floating() {
            let (a, b) = (
                self.as_f64().ok_or(Self::incompat(self, other))?,
                other.as_f64().ok_or(Self::incompat(self, other))?,
            );
            return Ok(ConstVariant::F64(float_op(a, b)));
        }
        let unsigned = matches!(self, ConstVariant::U64(_)) || matches!(other, ConstVariant::U64(_));
        if unsigned {
            let a = self.as_i64().ok_or(Self::incompat(self, other))? as u64;
            let b = other.as_i64().ok_or(Self::incompat(self, other))? as u64;
            let r = uint_op(a, b).ok_or(VariantError::DivideByZero)?;
            Ok(ConstVariant::U64(r))
        } else {
            let a = self.as_i64().ok_or(Self::incompat(self, other))?;
            let b = other.as_i64().ok_or(Self::incompat(self, other))?;
            let r = int_op(a, b).ok_or(VariantError::DivideByZero)?;
            Ok(ConstVariant::I64(r))
        }
    }

    fn incompat(lhs: &ConstVariant, rhs: &ConstVariant) -> VariantError {
        VariantError::IncompatibleTypes {
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }
    }

    /// Bitwise AND/OR/XOR; integral operands only.
    pub fn checked_bitand(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.bitwise_op(other, |a, b| a & b)
    }
    pub fn checked_bitor(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.bitwise_op(other, |a, b| a | b)
    }
    pub fn checked_bitxor(&self, other: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.bitwise_op(other, |a, b| a ^ b)
    }

    fn bitwise_op(&self, other: &ConstVariant, op: impl Fn(i64, i64) -> i64) -> Result<ConstVariant, VariantError> {
        let a = self.as_i64().ok_or(Self::incompat(self, other))?;
        let b = other.as_i64().ok_or(Self::incompat(self, other))?;
        if matches!(self, ConstVariant::U64(_)) || matches!(other, ConstVariant::U64(_)) {
            Ok(ConstVariant::U64(op(a, b) as u64))
        } else {
            Ok(ConstVariant::I64(op(a, b)))
        }
    }

    /// Left shift; the shift count must be in `0..64`.
    pub fn checked_shl(&self, count: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.shift_op(count, |a, n| a.wrapping_shl(n))
    }

    /// Right shift (arithmetic for signed, logical for unsigned).
    pub fn checked_shr(&self, count: &ConstVariant) -> Result<ConstVariant, VariantError> {
        self.shift_op(count, |a, n| a.wrapping_shr(n))
    }

    fn shift_op(&self, count: &ConstVariant, op: impl Fn(i64, u32) -> i64) -> Result<ConstVariant, VariantError> {
        let n = count.as_i64().ok_or(Self::incompat(self, count))?;
        if !(0..64).contains(&n) {
            return Err(VariantError::InvalidShift(n));
        }
        match self {
            ConstVariant::U64(v) => Ok(ConstVariant::U64(op(*v as i64, n as u32) as u64)),
            _ => {
                let a = self.as_i64().ok_or(Self::incompat(self, count))?;
                Ok(ConstVariant::I64(op(a, n as u32)))
            }
        }
    }

    /// Narrows to a signed range, per the entity's declared width.
    pub fn range_check_signed(&self, min: i64, max: i64) -> Result<(), VariantError> {
        let v = self.as_i64().ok_or(Self::incompat(self, self))?;
        if v < min || v > max {
            return Err(VariantError::OutOfRange { value: v, min, max });
        }
        Ok(())
    }
}

impl Neg for ConstVariant {
    type Output = ConstVariant;
    fn neg(self) -> ConstVariant {
        match self {
            ConstVariant::I64(v) => ConstVariant::I64(-v),
            ConstVariant::U64(v) => ConstVariant::I64(-(v as i64)),
            ConstVariant::F64(v) => ConstVariant::F64(-v),
            ConstVariant::LongDouble(v) => ConstVariant::LongDouble(-v),
            ConstVariant::Fixed(v) => ConstVariant::Fixed(FixedDecimal {
                mantissa: -v.mantissa,
                scale: v.scale,
            }),
            other => other,
        }
    }
}

impl Not for ConstVariant {
    type Output = ConstVariant;
    fn not(self) -> ConstVariant {
        match self {
            ConstVariant::Bool(v) => ConstVariant::Bool(!v),
            ConstVariant::I64(v) => ConstVariant::I64(!v),
            ConstVariant::U64(v) => ConstVariant::U64(!v),
            other => other,
        }
    }
}

impl fmt::Display for ConstVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstVariant::I64(v) => write!(f, "{v}"),
            ConstVariant::U64(v) => write!(f, "{v}"),
            ConstVariant::F64(v) => write!(f, "{v}"),
            ConstVariant::LongDouble(v) => write!(f, "{v}"),
            ConstVariant::Fixed(v) => write!(f, "{v}"),
            ConstVariant::Bool(v) => write!(f, "{v}"),
            ConstVariant::Char { value, .. } => write!(f, "'{}'", char::from_u32(*value).unwrap_or('\u{fffd}')),
            ConstVariant::Str { value, .. } => write!(f, "\"{value}\""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_promotes_to_unsigned_when_either_operand_is_unsigned() {
        let a = ConstVariant::I64(3);
        let b = ConstVariant::U64(4);
        assert_eq!(a.checked_add(&b).unwrap(), ConstVariant::U64(7));
    }

    #[test]
    fn divide_by_zero_is_an_error_for_integers() {
        let a = ConstVariant::I64(10);
        let b = ConstVariant::I64(0);
        assert_eq!(a.checked_div(&b).unwrap_err(), VariantError::DivideByZero);
    }

    #[test]
    fn divide_by_zero_is_allowed_for_floats() {
        let a = ConstVariant::F64(1.0);
        let b = ConstVariant::F64(0.0);
        assert!(matches!(a.checked_div(&b).unwrap(), ConstVariant::F64(v) if v.is_infinite()));
    }

    #[test]
    fn modulo_by_zero_is_an_error() {
        let a = ConstVariant::I64(10);
        let b = ConstVariant::I64(0);
        assert_eq!(a.checked_rem(&b).unwrap_err(), VariantError::ModuloByZero);
    }

    #[test]
    fn shift_count_out_of_range_is_rejected() {
        let a = ConstVariant::I64(1);
        let n = ConstVariant::I64(64);
        assert_eq!(a.checked_shl(&n).unwrap_err(), VariantError::InvalidShift(64));
    }

    #[test]
    fn range_check_rejects_overflowing_signed_value() {
        let v = ConstVariant::I64(200);
        assert!(v.range_check_signed(-128, 127).is_err());
    }

    #[test]
    fn negation_preserves_category() {
        let v = ConstVariant::F64(2.5);
        assert_eq!(-v, ConstVariant::F64(-2.5));
    }
}
