//! WAD fixed-point helpers
//!
//! Every internal value calculation runs at 18 decimals in `u128`. Token
//! amounts and oracle prices are converted with [`to_wad`] on the way in and
//! [`from_wad`] / [`from_wad_ceil`] on the way out, nowhere else.

use crate::error::VaultError;
use super::u256::U256;

/// 1.0 in WAD representation
pub const WAD: u128 = 1_000_000_000_000_000_000;

pub const WAD_DECIMALS: u8 = 18;

/// Ratios are configured in whole percent
pub const PERCENT: u128 = 100;

pub const BPS_DENOMINATOR: u128 = 10_000;

/// `a * b / denominator` with a 256-bit intermediate, rounded down
pub fn mul_div(a: u128, b: u128, denominator: u128) -> Result<u128, VaultError> {
    if denominator == 0 {
        return Err(VaultError::DivisionByZero);
    }
    U256::full_mul(a, b)
        .div_rem(denominator)
        .map(|(quotient, _)| quotient)
        .ok_or(VaultError::ArithmeticOverflow)
}

/// `a * b / denominator` with a 256-bit intermediate, rounded up
pub fn mul_div_ceil(a: u128, b: u128, denominator: u128) -> Result<u128, VaultError> {
    if denominator == 0 {
        return Err(VaultError::DivisionByZero);
    }
    let (quotient, remainder) = U256::full_mul(a, b)
        .div_rem(denominator)
        .ok_or(VaultError::ArithmeticOverflow)?;
    if remainder == 0 {
        Ok(quotient)
    } else {
        quotient.checked_add(1).ok_or(VaultError::ArithmeticOverflow)
    }
}

/// WAD multiplication, rounded down
pub fn wad_mul(a: u128, b: u128) -> Result<u128, VaultError> {
    mul_div(a, b, WAD)
}

/// WAD division, rounded down
pub fn wad_div(a: u128, b: u128) -> Result<u128, VaultError> {
    mul_div(a, WAD, b)
}

fn scale_factor(decimals: u8) -> Result<u128, VaultError> {
    if decimals > WAD_DECIMALS {
        return Err(VaultError::InvalidDecimals);
    }
    Ok(10u128.pow(u32::from(WAD_DECIMALS - decimals)))
}

/// Native amount with `decimals` places into WAD
pub fn to_wad(amount: u64, decimals: u8) -> Result<u128, VaultError> {
    (amount as u128)
        .checked_mul(scale_factor(decimals)?)
        .ok_or(VaultError::ArithmeticOverflow)
}

/// WAD into a native amount with `decimals` places, rounded down
pub fn from_wad(value: u128, decimals: u8) -> Result<u64, VaultError> {
    let native = value / scale_factor(decimals)?;
    u64::try_from(native).map_err(|_| VaultError::ArithmeticOverflow)
}

/// WAD into a native amount with `decimals` places, rounded up
pub fn from_wad_ceil(value: u128, decimals: u8) -> Result<u64, VaultError> {
    let factor = scale_factor(decimals)?;
    let mut native = value / factor;
    if value % factor != 0 {
        native += 1;
    }
    u64::try_from(native).map_err(|_| VaultError::ArithmeticOverflow)
}

/// Whole-percent ratio in WAD-scaled percent (150 -> 150e18)
pub fn percent_to_wad(percent: u64) -> u128 {
    percent as u128 * WAD
}

/// `amount * bps / 10_000`, rounded up so any nonzero rate charges at
/// least one base unit
pub fn bps_of(amount: u64, bps: u16) -> Result<u64, VaultError> {
    let fee = mul_div_ceil(amount as u128, bps as u128, BPS_DENOMINATOR)?;
    u64::try_from(fee).map_err(|_| VaultError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_wad_and_back() {
        assert_eq!(to_wad(1_000_000, 6).unwrap(), WAD);
        assert_eq!(to_wad(1, 18).unwrap(), 1);
        assert_eq!(to_wad(u64::MAX, 0).unwrap(), u64::MAX as u128 * WAD);
        assert_eq!(from_wad(WAD, 6).unwrap(), 1_000_000);
        assert_eq!(to_wad(1, 19), Err(VaultError::InvalidDecimals));
    }

    #[test]
    fn test_from_wad_rounding() {
        let value = WAD + 1;
        assert_eq!(from_wad(value, 6).unwrap(), 1_000_000);
        assert_eq!(from_wad_ceil(value, 6).unwrap(), 1_000_001);
        assert_eq!(from_wad_ceil(WAD, 6).unwrap(), 1_000_000);
        assert_eq!(from_wad(u128::MAX, 18), Err(VaultError::ArithmeticOverflow));
    }

    #[test]
    fn test_mul_div_beyond_u128_intermediate() {
        // 1e30 * 1e18 overflows u128 on its own
        let a = 1_000_000_000_000 * WAD;
        assert_eq!(mul_div(a, WAD, WAD).unwrap(), a);
        assert_eq!(wad_div(a, 2 * WAD).unwrap(), a / 2);
        assert_eq!(wad_mul(3 * WAD, WAD / 2).unwrap(), 3 * WAD / 2);
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 1, 3).unwrap(), 3);
        assert_eq!(mul_div_ceil(10, 1, 3).unwrap(), 4);
        assert_eq!(mul_div_ceil(9, 1, 3).unwrap(), 3);
        assert_eq!(mul_div(1, 1, 0), Err(VaultError::DivisionByZero));
        assert_eq!(mul_div(u128::MAX, u128::MAX, 1), Err(VaultError::ArithmeticOverflow));
    }

    #[test]
    fn test_bps_of() {
        assert_eq!(bps_of(100_000_000, 30).unwrap(), 300_000);
        assert_eq!(bps_of(99, 30).unwrap(), 1);
        assert_eq!(bps_of(334, 30).unwrap(), 2);
        assert_eq!(bps_of(1, 1).unwrap(), 1);
        assert_eq!(bps_of(0, 30).unwrap(), 0);
        assert_eq!(bps_of(12_345, 0).unwrap(), 0);
        assert_eq!(bps_of(u64::MAX, 10_000).unwrap(), u64::MAX);
    }

    #[test]
    fn test_percent_to_wad() {
        assert_eq!(percent_to_wad(150), 150 * WAD);
    }
}
