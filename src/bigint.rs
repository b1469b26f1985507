//! Arbitrary-precision signed integers.
//!
//! Deliberately hand-rolled rather than pulled from an external bigint crate:
//! this type and its wire format are consensus-critical, and every node must
//! agree on the exact byte sequence a value serializes to. Magnitude is
//! stored as a little-endian `Vec<u32>` with no leading (most-significant)
//! zero limb; zero is always represented with `negative = false` and an
//! empty limb vector.

use crate::errors::{RetargetError, Result};
use std::cmp::Ordering;
use std::ops::{Add, Mul, Neg, Sub};

/// Arbitrary-precision signed integer.
#[derive(Debug, Clone, Eq)]
pub struct BigInt {
    negative: bool,
    mag: Vec<u32>,
}

impl BigInt {
    pub fn zero() -> Self {
        BigInt {
            negative: false,
            mag: Vec::new(),
        }
    }

    pub fn from_i64(n: i64) -> Self {
        if n == 0 {
            return Self::zero();
        }
        let negative = n < 0;
        // i64::MIN negation would overflow; widen to u64 first.
        let mag_u64 = if negative {
            (n as i128).unsigned_abs() as u64
        } else {
            n as u64
        };
        let mut mag = vec![mag_u64 as u32, (mag_u64 >> 32) as u32];
        normalize_mag(&mut mag);
        BigInt { negative, mag }
    }

    pub fn is_zero(&self) -> bool {
        self.mag.is_empty()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Number of bits in the magnitude (0 for zero).
    pub fn bit_length(&self) -> u32 {
        bit_length_mag(&self.mag)
    }

    pub fn to_i64(&self) -> Result<i64> {
        if self.mag.len() > 2 {
            return Err(RetargetError::OutOfRange {
                context: "BigInt magnitude exceeds 64 bits".into(),
            });
        }
        let mut mag_u64: u64 = 0;
        for (i, limb) in self.mag.iter().enumerate() {
            mag_u64 |= (*limb as u64) << (32 * i);
        }
        if self.negative {
            if mag_u64 > (i64::MAX as u64) + 1 {
                return Err(RetargetError::OutOfRange {
                    context: "negative BigInt below i64::MIN".into(),
                });
            }
            if mag_u64 == (i64::MAX as u64) + 1 {
                Ok(i64::MIN)
            } else {
                Ok(-(mag_u64 as i64))
            }
        } else {
            if mag_u64 > i64::MAX as u64 {
                return Err(RetargetError::OutOfRange {
                    context: "BigInt above i64::MAX".into(),
                });
            }
            Ok(mag_u64 as i64)
        }
    }

    /// Truncated-toward-zero division: returns `(quotient, remainder)` with
    /// `self == quotient * divisor + remainder` and `|remainder| < |divisor|`.
    pub fn div_rem(&self, divisor: &BigInt) -> Result<(BigInt, BigInt)> {
        if divisor.is_zero() {
            return Err(RetargetError::DivisionByZero {
                context: "BigInt::div_rem".into(),
            });
        }
        let (mut q_mag, mut r_mag) = divmod_mag(&self.mag, &divisor.mag);
        normalize_mag(&mut q_mag);
        normalize_mag(&mut r_mag);
        let q_negative = !q_mag.is_empty() && (self.negative != divisor.negative);
        let r_negative = !r_mag.is_empty() && self.negative;
        Ok((
            BigInt {
                negative: q_negative,
                mag: q_mag,
            },
            BigInt {
                negative: r_negative,
                mag: r_mag,
            },
        ))
    }

    /// Greatest common divisor of `|self|` and `|other|`, always non-negative.
    pub fn gcd(&self, other: &BigInt) -> BigInt {
        let mut a = BigInt {
            negative: false,
            mag: self.mag.clone(),
        };
        let mut b = BigInt {
            negative: false,
            mag: other.mag.clone(),
        };
        while !b.is_zero() {
            let (_, r) = a.div_rem(&b).expect("b checked non-zero by loop guard");
            a = b;
            b = BigInt {
                negative: false,
                mag: r.mag,
            };
        }
        a
    }

    /// Minimal little-endian byte encoding of the magnitude (sign dropped).
    fn magnitude_le_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self.mag.iter().flat_map(|limb| limb.to_le_bytes()).collect();
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        bytes
    }

    fn from_magnitude_le_bytes(bytes: &[u8]) -> Self {
        let mut mag = Vec::with_capacity(bytes.len().div_ceil(4));
        for chunk in bytes.chunks(4) {
            let mut buf = [0u8; 4];
            buf[..chunk.len()].copy_from_slice(chunk);
            mag.push(u32::from_le_bytes(buf));
        }
        normalize_mag(&mut mag);
        BigInt {
            negative: false,
            mag,
        }
    }

    /// Wire format: `VARINT(len) || magnitude (little-endian bytes)`. Sign is
    /// not part of the wire representation; round-tripping a negative value
    /// yields its absolute value.
    pub fn serialize(&self) -> Vec<u8> {
        let mag_bytes = self.magnitude_le_bytes();
        let mut out = write_varint(mag_bytes.len() as u64);
        out.extend_from_slice(&mag_bytes);
        out
    }

    /// Returns the decoded value and the number of bytes consumed.
    pub fn deserialize(bytes: &[u8]) -> Result<(Self, usize)> {
        let (len, consumed) = read_varint(bytes)?;
        let len = len as usize;
        if bytes.len() - consumed < len {
            return Err(RetargetError::TruncatedEncoding {
                expected: len,
                actual: bytes.len() - consumed,
            });
        }
        let z = Self::from_magnitude_le_bytes(&bytes[consumed..consumed + len]);
        Ok((z, consumed + len))
    }
}

impl PartialEq for BigInt {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for BigInt {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BigInt {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return if other.negative { Ordering::Greater } else { Ordering::Less },
            (false, true) => return if self.negative { Ordering::Less } else { Ordering::Greater },
            (false, false) => {}
        }
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => cmp_mag(&self.mag, &other.mag),
            (true, true) => cmp_mag(&other.mag, &self.mag),
        }
    }
}

impl Neg for &BigInt {
    type Output = BigInt;
    fn neg(self) -> BigInt {
        if self.is_zero() {
            BigInt::zero()
        } else {
            BigInt {
                negative: !self.negative,
                mag: self.mag.clone(),
            }
        }
    }
}

impl Add for &BigInt {
    type Output = BigInt;
    fn add(self, rhs: &BigInt) -> BigInt {
        if self.negative == rhs.negative {
            let mut mag = add_mag(&self.mag, &rhs.mag);
            normalize_mag(&mut mag);
            let negative = !mag.is_empty() && self.negative;
            return BigInt { negative, mag };
        }
        match cmp_mag(&self.mag, &rhs.mag) {
            Ordering::Equal => BigInt::zero(),
            Ordering::Greater => {
                let mut mag = sub_mag(&self.mag, &rhs.mag);
                normalize_mag(&mut mag);
                BigInt {
                    negative: self.negative,
                    mag,
                }
            }
            Ordering::Less => {
                let mut mag = sub_mag(&rhs.mag, &self.mag);
                normalize_mag(&mut mag);
                BigInt {
                    negative: rhs.negative,
                    mag,
                }
            }
        }
    }
}

impl Sub for &BigInt {
    type Output = BigInt;
    fn sub(self, rhs: &BigInt) -> BigInt {
        self + &(-rhs)
    }
}

impl Mul for &BigInt {
    type Output = BigInt;
    fn mul(self, rhs: &BigInt) -> BigInt {
        let mut mag = mul_mag(&self.mag, &rhs.mag);
        normalize_mag(&mut mag);
        let negative = !mag.is_empty() && (self.negative != rhs.negative);
        BigInt { negative, mag }
    }
}

// ==================== magnitude helpers (unsigned, little-endian limbs) ====================

fn normalize_mag(mag: &mut Vec<u32>) {
    while mag.last() == Some(&0) {
        mag.pop();
    }
}

fn cmp_mag(a: &[u32], b: &[u32]) -> Ordering {
    if a.len() != b.len() {
        return a.len().cmp(&b.len());
    }
    for i in (0..a.len()).rev() {
        if a[i] != b[i] {
            return a[i].cmp(&b[i]);
        }
    }
    Ordering::Equal
}

fn add_mag(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len().max(b.len()) + 1);
    let mut carry: u64 = 0;
    for i in 0..a.len().max(b.len()) {
        let av = *a.get(i).unwrap_or(&0) as u64;
        let bv = *b.get(i).unwrap_or(&0) as u64;
        let sum = av + bv + carry;
        out.push(sum as u32);
        carry = sum >> 32;
    }
    if carry != 0 {
        out.push(carry as u32);
    }
    out
}

/// Assumes `a >= b`.
fn sub_mag(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len());
    let mut borrow: i64 = 0;
    for i in 0..a.len() {
        let av = a[i] as i64;
        let bv = *b.get(i).unwrap_or(&0) as i64;
        let mut diff = av - bv - borrow;
        if diff < 0 {
            diff += 1 << 32;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out.push(diff as u32);
    }
    out
}

fn mul_mag(a: &[u32], b: &[u32]) -> Vec<u32> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0u32; a.len() + b.len()];
    for (i, &av) in a.iter().enumerate() {
        let mut carry: u64 = 0;
        for (j, &bv) in b.iter().enumerate() {
            let idx = i + j;
            let product = av as u64 * bv as u64 + out[idx] as u64 + carry;
            out[idx] = product as u32;
            carry = product >> 32;
        }
        let mut idx = i + b.len();
        while carry != 0 {
            let sum = out[idx] as u64 + carry;
            out[idx] = sum as u32;
            carry = sum >> 32;
            idx += 1;
        }
    }
    out
}

fn bit_length_mag(mag: &[u32]) -> u32 {
    match mag.last() {
        None => 0,
        Some(&top) => (mag.len() as u32 - 1) * 32 + (32 - top.leading_zeros()),
    }
}

fn get_bit_mag(mag: &[u32], bit: u32) -> bool {
    let limb = (bit / 32) as usize;
    if limb >= mag.len() {
        return false;
    }
    (mag[limb] >> (bit % 32)) & 1 != 0
}

fn set_bit_mag(mag: &mut Vec<u32>, bit: u32) {
    let limb = (bit / 32) as usize;
    if limb >= mag.len() {
        mag.resize(limb + 1, 0);
    }
    mag[limb] |= 1 << (bit % 32);
}

fn shl1_mag(mag: &mut Vec<u32>) {
    let mut carry: u32 = 0;
    for limb in mag.iter_mut() {
        let new_carry = *limb >> 31;
        *limb = (*limb << 1) | carry;
        carry = new_carry;
    }
    if carry != 0 {
        mag.push(carry);
    }
}

/// Schoolbook bitwise long division of unsigned magnitudes. `O(bits(a)^2)` —
/// simple and exactly reproducible rather than fast; this is not a hot path.
fn divmod_mag(a: &[u32], b: &[u32]) -> (Vec<u32>, Vec<u32>) {
    if cmp_mag(a, b) == Ordering::Less {
        return (Vec::new(), a.to_vec());
    }
    let bits = bit_length_mag(a);
    let mut remainder: Vec<u32> = Vec::new();
    let mut quotient = vec![0u32; a.len()];
    for i in (0..bits).rev() {
        shl1_mag(&mut remainder);
        if get_bit_mag(a, i) {
            set_bit_mag(&mut remainder, 0);
        }
        if cmp_mag(&remainder, b) != Ordering::Less {
            remainder = sub_mag(&remainder, b);
            normalize_mag(&mut remainder);
            set_bit_mag(&mut quotient, i);
        }
    }
    (quotient, remainder)
}

// ==================== VARINT (§6): 7-bit groups, continuation bit on all
// but the last emitted byte, successive higher bytes biased by +1 ====================

fn write_varint(mut n: u64) -> Vec<u8> {
    let mut tmp = Vec::new();
    loop {
        let cont: u8 = if tmp.is_empty() { 0x00 } else { 0x80 };
        tmp.push((n & 0x7f) as u8 | cont);
        if n <= 0x7f {
            break;
        }
        n = (n >> 7) - 1;
    }
    tmp.reverse();
    tmp
}

fn read_varint(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut n: u64 = 0;
    let mut i = 0;
    loop {
        if i >= bytes.len() {
            return Err(RetargetError::OverlongVarint);
        }
        let b = bytes[i];
        i += 1;
        // Top 7 bits set would be lost by the shift below - that's overlong.
        if n & 0xfe00_0000_0000_0000 != 0 {
            return Err(RetargetError::OverlongVarint);
        }
        n = (n << 7) | (b & 0x7f) as u64;
        if b & 0x80 != 0 {
            n = n.checked_add(1).ok_or(RetargetError::OverlongVarint)?;
        } else {
            return Ok((n, i));
        }
    }
}
