//! Arbitrary-precision constant values and arithmetic (spec.md §4.8, §9).
//!
//! `num-bigint`/`num-rational`/`num-complex` give untyped constants the same
//! unbounded-precision semantics the source grammar's literals have. Every
//! call into the underlying arithmetic is wrapped in [`std::panic::catch_unwind`]
//! per spec.md §9's "exception-free control flow" note — division by zero
//! and similar failures panic inside these crates rather than returning a
//! `Result`, so this module is the single boundary that converts a panic
//! into `Error::ArithmeticError`.

use std::cmp::Ordering;
use std::panic::{catch_unwind, AssertUnwindSafe};

use num_bigint::BigInt;
use num_complex::Complex;
use num_rational::BigRational;
use num_traits::{ToPrimitive, Zero};

use crate::error::{Error, Result};

#[derive(Clone, Debug, PartialEq)]
pub enum Constant {
    Int(BigInt),
    Float(BigRational),
    Complex(Complex<BigRational>),
    Bool(bool),
    Str(String),
}

impl Constant {
    pub fn as_i128(&self) -> Result<i128> {
        match self {
            Constant::Int(i) => i
                .to_i128()
                .ok_or_else(|| Error::ArithmeticError("integer constant out of range".into())),
            Constant::Float(f) => f
                .to_integer()
                .to_i128()
                .ok_or_else(|| Error::ArithmeticError("float constant out of range".into())),
            other => Err(Error::TypeMismatch(format!(
                "expected a numeric constant, found {:?}",
                other
            ))),
        }
    }

    pub fn as_usize(&self) -> Result<usize> {
        let v = self.as_i128()?;
        if v < 0 {
            return Err(Error::ArithmeticError("negative value used as unsigned".into()));
        }
        Ok(v as usize)
    }

    fn to_rational(&self) -> Result<BigRational> {
        match self {
            Constant::Int(i) => Ok(BigRational::from_integer(i.clone())),
            Constant::Float(f) => Ok(f.clone()),
            other => Err(Error::TypeMismatch(format!(
                "expected a numeric constant, found {:?}",
                other
            ))),
        }
    }

    fn to_complex(&self) -> Result<Complex<BigRational>> {
        match self {
            Constant::Complex(c) => Ok(c.clone()),
            other => {
                let r = other.to_rational()?;
                Ok(Complex::new(r, BigRational::zero()))
            }
        }
    }

    fn guard<F>(f: F) -> Result<Constant>
    where
        F: FnOnce() -> Result<Constant>,
    {
        catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|_| Err(Error::ArithmeticError("arithmetic panic".into())))
    }

    pub fn add(&self, other: &Constant) -> Result<Constant> {
        Self::guard(|| self.numeric_op(other, |a, b| a + b, |a, b| a + b, |a, b| a + b))
    }

    pub fn sub(&self, other: &Constant) -> Result<Constant> {
        Self::guard(|| self.numeric_op(other, |a, b| a - b, |a, b| a - b, |a, b| a - b))
    }

    pub fn mul(&self, other: &Constant) -> Result<Constant> {
        Self::guard(|| self.numeric_op(other, |a, b| a * b, |a, b| a * b, |a, b| a * b))
    }

    pub fn div(&self, other: &Constant) -> Result<Constant> {
        Self::guard(|| {
            if let (Constant::Int(a), Constant::Int(b)) = (self, other) {
                if b.is_zero() {
                    return Err(Error::ArithmeticError("division by zero".into()));
                }
                // Integer division between integer-typed operands truncates
                // toward zero (spec.md §4.8) — `BigInt`'s `/` already does.
                return Ok(Constant::Int(a / b));
            }
            if matches!(self, Constant::Complex(_)) || matches!(other, Constant::Complex(_)) {
                let a = self.to_complex()?;
                let b = other.to_complex()?;
                if b.re.is_zero() && b.im.is_zero() {
                    return Err(Error::ArithmeticError("division by zero".into()));
                }
                let denom = &b.re * &b.re + &b.im * &b.im;
                let re = (&a.re * &b.re + &a.im * &b.im) / &denom;
                let im = (&a.im * &b.re - &a.re * &b.im) / &denom;
                return Ok(Constant::Complex(Complex::new(re, im)));
            }
            let a = self.to_rational()?;
            let b = other.to_rational()?;
            if b.is_zero() {
                return Err(Error::ArithmeticError("division by zero".into()));
            }
            Ok(Constant::Float(a / b))
        })
    }

    pub fn rem(&self, other: &Constant) -> Result<Constant> {
        Self::guard(|| match (self, other) {
            (Constant::Int(a), Constant::Int(b)) => {
                if b.is_zero() {
                    return Err(Error::ArithmeticError("division by zero".into()));
                }
                Ok(Constant::Int(a % b))
            }
            _ => Err(Error::TypeMismatch("remainder requires integer operands".into())),
        })
    }

    pub fn shl(&self, bits: &Constant) -> Result<Constant> {
        Self::guard(|| {
            let base = match self {
                Constant::Int(i) => i.clone(),
                _ => return Err(Error::TypeMismatch("shift base must be an integer".into())),
            };
            let n = bits.as_usize()?;
            Ok(Constant::Int(base << n))
        })
    }

    pub fn shr(&self, bits: &Constant) -> Result<Constant> {
        Self::guard(|| {
            let base = match self {
                Constant::Int(i) => i.clone(),
                _ => return Err(Error::TypeMismatch("shift base must be an integer".into())),
            };
            let n = bits.as_usize()?;
            Ok(Constant::Int(base >> n))
        })
    }

    pub fn neg(&self) -> Result<Constant> {
        Self::guard(|| match self {
            Constant::Int(i) => Ok(Constant::Int(-i)),
            Constant::Float(f) => Ok(Constant::Float(-f.clone())),
            Constant::Complex(c) => Ok(Constant::Complex(Complex::new(-c.re.clone(), -c.im.clone()))),
            other => Err(Error::TypeMismatch(format!("cannot negate {:?}", other))),
        })
    }

    /// Constant ordering, used for comparison operators on numeric and bool
    /// constants (spec.md §4.8). Returns `None` for kinds with no total
    /// order (strings compare by equality only per the spec's wording, but
    /// this crate extends to lexicographic order since `String` already has
    /// one).
    pub fn partial_cmp(&self, other: &Constant) -> Option<Ordering> {
        match (self, other) {
            (Constant::Bool(a), Constant::Bool(b)) => a.partial_cmp(b),
            (Constant::Str(a), Constant::Str(b)) => a.partial_cmp(b),
            (Constant::Complex(_), _) | (_, Constant::Complex(_)) => None,
            _ => {
                let a = self.to_rational().ok()?;
                let b = other.to_rational().ok()?;
                a.partial_cmp(&b)
            }
        }
    }

    fn numeric_op(
        &self,
        other: &Constant,
        int_op: fn(&BigInt, &BigInt) -> BigInt,
        float_op: fn(&BigRational, &BigRational) -> BigRational,
        complex_op: fn(&Complex<BigRational>, &Complex<BigRational>) -> Complex<BigRational>,
    ) -> Result<Constant> {
        if let (Constant::Int(a), Constant::Int(b)) = (self, other) {
            return Ok(Constant::Int(int_op(a, b)));
        }
        if matches!(self, Constant::Complex(_)) || matches!(other, Constant::Complex(_)) {
            let a = self.to_complex()?;
            let b = other.to_complex()?;
            return Ok(Constant::Complex(complex_op(&a, &b)));
        }
        let a = self.to_rational()?;
        let b = other.to_rational()?;
        Ok(Constant::Float(float_op(&a, &b)))
    }
}

impl From<i64> for Constant {
    fn from(v: i64) -> Self {
        Constant::Int(BigInt::from(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_truncates_toward_zero() {
        let a = Constant::Int(BigInt::from(-7));
        let b = Constant::Int(BigInt::from(2));
        let result = a.div(&b).unwrap();
        assert_eq!(result, Constant::Int(BigInt::from(-3)));
    }

    #[test]
    fn division_by_zero_is_an_arithmetic_error() {
        let a = Constant::Int(BigInt::from(1));
        let b = Constant::Int(BigInt::from(0));
        let err = a.div(&b).unwrap_err();
        assert!(matches!(err, Error::ArithmeticError(_)));
    }

    #[test]
    fn mixed_int_float_addition_promotes_to_float() {
        let a = Constant::Int(BigInt::from(1));
        let b = Constant::Float(BigRational::new(BigInt::from(1), BigInt::from(2)));
        let result = a.add(&b).unwrap();
        assert_eq!(
            result,
            Constant::Float(BigRational::new(BigInt::from(3), BigInt::from(2)))
        );
    }

    #[test]
    fn complex_addition() {
        let a = Constant::Complex(Complex::new(
            BigRational::from_integer(BigInt::from(1)),
            BigRational::from_integer(BigInt::from(2)),
        ));
        let b = Constant::Complex(Complex::new(
            BigRational::from_integer(BigInt::from(3)),
            BigRational::from_integer(BigInt::from(4)),
        ));
        let result = a.add(&b).unwrap();
        assert_eq!(
            result,
            Constant::Complex(Complex::new(
                BigRational::from_integer(BigInt::from(4)),
                BigRational::from_integer(BigInt::from(6)),
            ))
        );
    }

    #[test]
    fn shift_requires_integer_operands() {
        let base = Constant::Float(BigRational::from_integer(BigInt::from(1)));
        let n = Constant::Int(BigInt::from(1));
        let err = base.shl(&n).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch(_)));
    }
}
