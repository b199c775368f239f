//! 256-bit unsigned intermediate for full-precision multiply-then-divide
//!
//! Only the operations the WAD helpers need: a widening 128x128 product and
//! floor division of the 256-bit result by a 128-bit divisor.

const LOW_64: u128 = u64::MAX as u128;

/// 256-bit unsigned integer represented as two u128 values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct U256 {
    /// Low 128 bits
    pub lo: u128,
    /// High 128 bits
    pub hi: u128,
}

impl U256 {
    pub const ZERO: Self = Self { lo: 0, hi: 0 };

    pub const fn from_u128(val: u128) -> Self {
        Self { lo: val, hi: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.lo == 0 && self.hi == 0
    }

    /// Widening multiplication, never overflows
    pub fn full_mul(a: u128, b: u128) -> Self {
        let a0 = a & LOW_64;
        let a1 = a >> 64;
        let b0 = b & LOW_64;
        let b1 = b >> 64;

        let p00 = a0 * b0;
        let p01 = a0 * b1;
        let p10 = a1 * b0;
        let p11 = a1 * b1;

        // Sum of three values below 2^64 each
        let mid = (p00 >> 64) + (p01 & LOW_64) + (p10 & LOW_64);

        let lo = (p00 & LOW_64) | (mid << 64);
        let hi = p11 + (p01 >> 64) + (p10 >> 64) + (mid >> 64);

        Self { lo, hi }
    }

    /// Floor division by `divisor`, returning quotient and remainder.
    /// `None` when the divisor is zero or the quotient does not fit in u128.
    pub fn div_rem(self, divisor: u128) -> Option<(u128, u128)> {
        if divisor == 0 || self.hi >= divisor {
            return None;
        }

        if self.hi == 0 {
            return Some((self.lo / divisor, self.lo % divisor));
        }

        // Shift-subtract over the low half; the high half is already a
        // partial remainder smaller than the divisor.
        let mut rem = self.hi;
        let mut quotient: u128 = 0;
        for bit in (0..128).rev() {
            let carry = rem >> 127;
            rem = (rem << 1) | ((self.lo >> bit) & 1);
            quotient <<= 1;
            if carry == 1 || rem >= divisor {
                rem = rem.wrapping_sub(divisor);
                quotient |= 1;
            }
        }

        Some((quotient, rem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_mul_small_values() {
        assert_eq!(U256::full_mul(6, 7), U256::from_u128(42));
        assert!(U256::full_mul(0, u128::MAX).is_zero());
    }

    #[test]
    fn test_full_mul_max_values() {
        // (2^128 - 1)^2 = 2^256 - 2^129 + 1
        let product = U256::full_mul(u128::MAX, u128::MAX);
        assert_eq!(product.lo, 1);
        assert_eq!(product.hi, u128::MAX - 1);
    }

    #[test]
    fn test_full_mul_crosses_halves() {
        let product = U256::full_mul(1 << 127, 4);
        assert_eq!(product, U256 { lo: 0, hi: 2 });
    }

    #[test]
    fn test_div_rem_recovers_factor() {
        let a = 340_282_366_920_938_463_463_374_607_431_768_211_297u128;
        let b = 1_000_000_000_000_000_000_000u128;
        let (q, r) = U256::full_mul(a, b).div_rem(b).unwrap();
        assert_eq!(q, a);
        assert_eq!(r, 0);

        let (q, r) = U256::full_mul(u128::MAX, u128::MAX).div_rem(u128::MAX).unwrap();
        assert_eq!(q, u128::MAX);
        assert_eq!(r, 0);
    }

    #[test]
    fn test_div_rem_remainder() {
        let (q, r) = U256::full_mul(u128::MAX, 3).div_rem(7).unwrap();
        assert_eq!(q, 145835300108973627198589117470757804909u128);
        assert_eq!(r, 2);

        let value = U256::full_mul(1u128 << 100, 1u128 << 40);
        let (q, r) = value.div_rem((1u128 << 100) + 1).unwrap();
        // 2^140 / (2^100 + 1) = 2^40 - 1 remainder 2^100 - 2^40 + 1
        assert_eq!(q, (1u128 << 40) - 1);
        assert_eq!(r, (1u128 << 100) - (1u128 << 40) + 1);
    }

    #[test]
    fn test_div_rem_rejects_overflow_and_zero() {
        assert!(U256::full_mul(u128::MAX, 2).div_rem(1).is_none());
        assert!(U256::from_u128(5).div_rem(0).is_none());
    }
}
