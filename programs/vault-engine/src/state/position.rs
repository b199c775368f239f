use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::error::VaultError;

/// Liquidation lifecycle of a position
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    /// No debt outstanding
    Empty,
    /// Collateral ratio at or above the liquidation threshold
    Healthy,
    /// Collateral ratio below the liquidation threshold
    Liquidatable,
}

/// One owner's collateral and synthetic debt in native token units
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// PDA bump
    pub bump: u8,

    pub vault: Pubkey,
    pub owner: Pubkey,

    /// Collateral in collateral-mint base units
    pub collateral: u64,

    /// Debt in synthetic-mint base units
    pub debt: u64,

    /// Last mutation timestamp
    pub last_update: i64,
}

impl Position {
    pub const DISCRIMINATOR: [u8; 8] = [83, 89, 78, 95, 80, 79, 83, 78]; // "SYN_POSN"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        1 + // bump
        32 + // vault
        32 + // owner
        8 + // collateral
        8 + // debt
        8; // last_update

    pub fn new(vault: Pubkey, owner: Pubkey, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            bump,
            vault,
            owner,
            collateral: 0,
            debt: 0,
            last_update: 0,
        }
    }

    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let position = Self::try_from_slice(data)
            .map_err(|_| ProgramError::InvalidAccountData)?;
        position.validate()?;
        Ok(position)
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.discriminator != Self::DISCRIMINATOR {
            return Err(ProgramError::InvalidAccountData);
        }

        if !self.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }

        // Collateral and debt are either both zero or both non-zero
        if (self.collateral == 0) != (self.debt == 0) {
            return Err(VaultError::InvalidPosition.into());
        }

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.collateral == 0 && self.debt == 0
    }

    /// Status for a ratio produced by `engine::user_collateral_ratio`
    pub fn status(&self, collateral_ratio_wad: u128, liquidation_threshold_wad: u128) -> PositionStatus {
        if self.debt == 0 {
            PositionStatus::Empty
        } else if collateral_ratio_wad < liquidation_threshold_wad {
            PositionStatus::Liquidatable
        } else {
            PositionStatus::Healthy
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_len_matches_serialization() {
        let position = Position::new(Pubkey::new_unique(), Pubkey::new_unique(), 254);
        assert_eq!(position.try_to_vec().unwrap().len(), Position::LEN);
    }

    #[test]
    fn test_dangling_debt_rejected() {
        let mut position = Position::new(Pubkey::new_unique(), Pubkey::new_unique(), 254);
        assert!(position.validate().is_ok());

        position.debt = 10;
        assert_eq!(position.validate(), Err(VaultError::InvalidPosition.into()));

        position.collateral = 15;
        assert!(position.validate().is_ok());
    }

    #[test]
    fn test_status() {
        let mut position = Position::new(Pubkey::new_unique(), Pubkey::new_unique(), 254);
        assert_eq!(position.status(u128::MAX, 120), PositionStatus::Empty);

        position.collateral = 1;
        position.debt = 1;
        assert_eq!(position.status(119, 120), PositionStatus::Liquidatable);
        assert_eq!(position.status(120, 120), PositionStatus::Healthy);
    }
}
