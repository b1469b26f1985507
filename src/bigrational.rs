//! Canonical arbitrary-precision rationals, built on [`BigInt`](crate::bigint::BigInt).
//!
//! A `BigRational` is always stored canonicalized: `den > 0` and
//! `gcd(|num|, den) == 1`. Every arithmetic operation returns a canonicalized
//! result, so equality is structural equality.

use crate::bigint::BigInt;
use crate::errors::{RetargetError, Result};
use std::ops::{Add, Div, Mul, Sub};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigRational {
    num: BigInt,
    den: BigInt,
}

impl BigRational {
    /// Builds and canonicalizes `num/den`.
    pub fn new(num: BigInt, den: BigInt) -> Result<Self> {
        if den.is_zero() {
            return Err(RetargetError::DivisionByZero {
                context: "BigRational::new".into(),
            });
        }
        Ok(canonicalize(num, den))
    }

    pub fn from_i64(n: i64) -> Self {
        BigRational {
            num: BigInt::from_i64(n),
            den: BigInt::from_i64(1),
        }
    }

    pub fn from_ratio(num: i64, den: i64) -> Result<Self> {
        Self::new(BigInt::from_i64(num), BigInt::from_i64(den))
    }

    pub fn num(&self) -> &BigInt {
        &self.num
    }

    pub fn den(&self) -> &BigInt {
        &self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    /// Serializes as `Serialize(num) || Serialize(den)` of the canonical form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = self.num.serialize();
        out.extend_from_slice(&self.den.serialize());
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize)> {
        let (num, n) = BigInt::deserialize(bytes)?;
        let (den, d) = BigInt::deserialize(&bytes[n..])?;
        let q = Self::new(num, den)?;
        Ok((q, n + d))
    }
}

fn canonicalize(num: BigInt, den: BigInt) -> BigRational {
    let (mut num, mut den) = if den.is_negative() {
        (&BigInt::zero() - &num, &BigInt::zero() - &den)
    } else {
        (num, den)
    };
    if !num.is_zero() {
        let g = num.gcd(&den);
        if g != BigInt::from_i64(1) {
            let (q_num, _) = num.div_rem(&g).expect("gcd is non-zero by construction");
            let (q_den, _) = den.div_rem(&g).expect("gcd is non-zero by construction");
            num = q_num;
            den = q_den;
        }
    } else {
        den = BigInt::from_i64(1);
    }
    BigRational { num, den }
}

impl Add for &BigRational {
    type Output = BigRational;
    fn add(self, rhs: &BigRational) -> BigRational {
        let num = &(&self.num * &rhs.den) + &(&rhs.num * &self.den);
        let den = &self.den * &rhs.den;
        canonicalize(num, den)
    }
}

impl Sub for &BigRational {
    type Output = BigRational;
    fn sub(self, rhs: &BigRational) -> BigRational {
        let num = &(&self.num * &rhs.den) - &(&rhs.num * &self.den);
        let den = &self.den * &rhs.den;
        canonicalize(num, den)
    }
}

impl Mul for &BigRational {
    type Output = BigRational;
    fn mul(self, rhs: &BigRational) -> BigRational {
        canonicalize(&self.num * &rhs.num, &self.den * &rhs.den)
    }
}

impl Div for &BigRational {
    type Output = Result<BigRational>;
    fn div(self, rhs: &BigRational) -> Result<BigRational> {
        if rhs.num.is_zero() {
            return Err(RetargetError::DivisionByZero {
                context: "BigRational division".into(),
            });
        }
        Ok(canonicalize(&self.num * &rhs.den, &self.den * &rhs.num))
    }
}

impl PartialOrd for BigRational {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigRational {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // den is always positive in canonical form, so cross-multiplication
        // preserves order.
        (&self.num * &other.den).cmp(&(&other.num * &self.den))
    }
}
