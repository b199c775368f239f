use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use synth_common::AccessControl;

use crate::error::VaultError;

/// Upper bound for mint and redeem fees (10%)
pub const MAX_FEE_BPS: u16 = 1_000;

/// Upper bound for the minimum collateral ratio (10_000%)
pub const MAX_COLLATERAL_RATIO: u64 = 10_000;

/// Governor-mutable vault parameters
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultParams {
    /// Fee taken from collateral on mint, in basis points
    pub mint_fee_bps: u16,

    /// Fee taken from returned collateral on redeem, in basis points
    pub redeem_fee_bps: u16,

    /// Minimum collateral ratio in whole percent (150 = 150%)
    pub min_collateral_ratio: u64,

    /// Ratio below which a position can be liquidated, whole percent
    pub liquidation_threshold: u64,

    /// Extra collateral awarded to liquidators, whole percent
    pub liquidation_bonus: u64,

    /// When false only LIQUIDATOR role holders may liquidate
    pub permissionless_liquidation: bool,
}

impl VaultParams {
    pub const LEN: usize = 2 + 2 + 8 + 8 + 8 + 1;

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.mint_fee_bps > MAX_FEE_BPS || self.redeem_fee_bps > MAX_FEE_BPS {
            return Err(VaultError::InvalidConfig);
        }

        if self.liquidation_threshold < 100
            || self.liquidation_threshold > self.min_collateral_ratio
            || self.min_collateral_ratio > MAX_COLLATERAL_RATIO
        {
            return Err(VaultError::InvalidConfig);
        }

        if self.liquidation_bonus >= 100 {
            return Err(VaultError::InvalidConfig);
        }

        Ok(())
    }
}

impl Default for VaultParams {
    fn default() -> Self {
        Self {
            mint_fee_bps: 30,
            redeem_fee_bps: 30,
            min_collateral_ratio: 150,
            liquidation_threshold: 120,
            liquidation_bonus: 10,
            permissionless_liquidation: true,
        }
    }
}

/// Running sums over every position plus protocol-owned collateral.
///
/// `total_collateral` and `total_debt` always equal the sums over positions.
/// The remaining buckets sit in the collateral vault without belonging to
/// any position.
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VaultTotals {
    pub total_collateral: u64,
    pub total_debt: u64,

    /// Governance top-ups, counted toward the global ratio
    pub reserve_collateral: u64,

    /// Mint and redeem fees retained in the vault
    pub accrued_fees: u64,

    /// Cumulative collateral shortfall reported by insolvent liquidations
    pub liquidation_shortfall: u64,
}

impl VaultTotals {
    pub const LEN: usize = 8 * 5;

    /// Collateral counted toward the global ratio
    pub fn backing_collateral(&self) -> Result<u64, VaultError> {
        self.total_collateral
            .checked_add(self.reserve_collateral)
            .ok_or(VaultError::ArithmeticOverflow)
    }

    /// Collateral the vault token account must hold
    pub fn tracked_collateral(&self) -> Result<u64, VaultError> {
        self.backing_collateral()?
            .checked_add(self.accrued_fees)
            .ok_or(VaultError::ArithmeticOverflow)
    }
}

/// Root account of one synthetic vault
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct VaultState {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// Vault PDA bump
    pub bump: u8,

    /// Vault authority PDA bump
    pub authority_bump: u8,

    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,

    /// Token account holding all collateral, owned by the vault authority
    pub collateral_vault: Pubkey,

    /// Price oracle account for the synthetic asset
    pub oracle: Pubkey,

    pub collateral_decimals: u8,
    pub synthetic_decimals: u8,

    pub params: VaultParams,
    pub totals: VaultTotals,

    /// Role table and pause flag
    pub access: AccessControl,

    /// Last state change timestamp
    pub last_update: i64,
}

impl VaultState {
    pub const DISCRIMINATOR: [u8; 8] = [83, 89, 78, 95, 86, 65, 85, 76]; // "SYN_VAUL"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        1 + // bump
        1 + // authority_bump
        32 + // collateral_mint
        32 + // synthetic_mint
        32 + // collateral_vault
        32 + // oracle
        1 + // collateral_decimals
        1 + // synthetic_decimals
        VaultParams::LEN + // params
        VaultTotals::LEN + // totals
        AccessControl::LEN + // access
        8; // last_update

    pub fn new(
        governor: Pubkey,
        bump: u8,
        authority_bump: u8,
        collateral_mint: Pubkey,
        synthetic_mint: Pubkey,
        collateral_vault: Pubkey,
        oracle: Pubkey,
        collateral_decimals: u8,
        synthetic_decimals: u8,
        params: VaultParams,
        now: i64,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            bump,
            authority_bump,
            collateral_mint,
            synthetic_mint,
            collateral_vault,
            oracle,
            collateral_decimals,
            synthetic_decimals,
            params,
            totals: VaultTotals::default(),
            access: AccessControl::new(governor),
            last_update: now,
        }
    }

    /// Deserialize, tolerating the unused tail of the account
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let mut cursor: &[u8] = data;
        let state = Self::deserialize(&mut cursor)
            .map_err(|_| ProgramError::InvalidAccountData)?;
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.discriminator != Self::DISCRIMINATOR {
            return Err(ProgramError::InvalidAccountData);
        }

        if !self.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }

        self.params.validate()?;
        Ok(())
    }
}
