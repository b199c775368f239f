use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use synth_common::Role;

use crate::{
    pda::{PositionPDA, VaultAuthorityPDA, VaultPDA},
    state::VaultParams,
};

/// Partial parameter update; `None` keeps the current value
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigUpdate {
    pub mint_fee_bps: Option<u16>,
    pub redeem_fee_bps: Option<u16>,
    pub min_collateral_ratio: Option<u64>,
    pub liquidation_threshold: Option<u64>,
    pub liquidation_bonus: Option<u64>,
    pub permissionless_liquidation: Option<bool>,
}

impl ConfigUpdate {
    pub fn apply(&self, params: &VaultParams) -> VaultParams {
        VaultParams {
            mint_fee_bps: self.mint_fee_bps.unwrap_or(params.mint_fee_bps),
            redeem_fee_bps: self.redeem_fee_bps.unwrap_or(params.redeem_fee_bps),
            min_collateral_ratio: self.min_collateral_ratio.unwrap_or(params.min_collateral_ratio),
            liquidation_threshold: self.liquidation_threshold.unwrap_or(params.liquidation_threshold),
            liquidation_bonus: self.liquidation_bonus.unwrap_or(params.liquidation_bonus),
            permissionless_liquidation: self
                .permissionless_liquidation
                .unwrap_or(params.permissionless_liquidation),
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum VaultInstruction {
    /// Create the vault for a collateral/synthetic mint pair; the signer
    /// becomes governor
    /// Accounts:
    /// 0. `[signer, writable]` Governor (payer)
    /// 1. `[writable]` Vault PDA
    /// 2. `[]` Vault authority PDA
    /// 3. `[]` Collateral mint
    /// 4. `[]` Synthetic mint (mint authority = vault authority)
    /// 5. `[]` Collateral vault token account (owner = vault authority)
    /// 6. `[]` Oracle account
    /// 7. `[]` System program
    /// 8. `[]` Rent sysvar
    InitializeVault {
        params: VaultParams,
    },

    /// Deposit collateral and mint synthetic tokens at `target_collateral_ratio`
    /// Accounts:
    /// 0. `[signer, writable]` Owner (payer for the position account)
    /// 1. `[writable]` Vault PDA
    /// 2. `[writable]` Position PDA
    /// 3. `[]` Vault authority PDA
    /// 4. `[writable]` Owner collateral token account
    /// 5. `[writable]` Collateral vault token account
    /// 6. `[writable]` Synthetic mint
    /// 7. `[writable]` Owner synthetic token account
    /// 8. `[]` Oracle account
    /// 9. `[]` Token program
    /// 10. `[]` System program
    /// 11. `[]` Rent sysvar
    MintWithCollateralRatio {
        collateral_in: u64,
        target_collateral_ratio: u64,
    },

    /// Burn synthetic tokens and withdraw the matching collateral
    /// Accounts:
    /// 0. `[signer]` Owner
    /// 1. `[writable]` Vault PDA
    /// 2. `[writable]` Position PDA
    /// 3. `[]` Vault authority PDA
    /// 4. `[writable]` Owner synthetic token account
    /// 5. `[writable]` Synthetic mint
    /// 6. `[writable]` Collateral vault token account
    /// 7. `[writable]` Owner collateral token account
    /// 8. `[]` Oracle account
    /// 9. `[]` Token program
    Redeem {
        token_amount: u64,
    },

    /// Repay part of an unhealthy position's debt for its collateral
    /// Accounts:
    /// 0. `[signer]` Liquidator
    /// 1. `[writable]` Vault PDA
    /// 2. `[writable]` Position PDA of `owner`
    /// 3. `[]` Vault authority PDA
    /// 4. `[writable]` Liquidator synthetic token account
    /// 5. `[writable]` Synthetic mint
    /// 6. `[writable]` Collateral vault token account
    /// 7. `[writable]` Liquidator collateral token account
    /// 8. `[writable]` Owner collateral token account
    /// 9. `[]` Oracle account
    /// 10. `[]` Token program
    Liquidate {
        owner: Pubkey,
        repay_amount: u64,
    },

    /// Accounts:
    /// 0. `[signer]` Pauser
    /// 1. `[writable]` Vault PDA
    Pause,

    /// Accounts:
    /// 0. `[signer]` Pauser
    /// 1. `[writable]` Vault PDA
    Unpause,

    /// Top up protocol-owned collateral backing the global ratio
    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Vault PDA
    /// 2. `[writable]` Governor collateral token account
    /// 3. `[writable]` Collateral vault token account
    /// 4. `[]` Token program
    AddCollateral {
        amount: u64,
    },

    /// Move untracked tokens out of a vault-authority token account
    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[]` Vault PDA
    /// 2. `[]` Vault authority PDA
    /// 3. `[writable]` Source token account (owner = vault authority)
    /// 4. `[writable]` Destination token account
    /// 5. `[]` Token program
    SweepTokens {
        amount: u64,
    },

    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Vault PDA
    UpdateConfig {
        update: ConfigUpdate,
    },

    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Vault PDA
    GrantRole {
        member: Pubkey,
        role: Role,
    },

    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Vault PDA
    RevokeRole {
        member: Pubkey,
        role: Role,
    },

    /// Return data: `u128` global ratio, WAD-scaled percent
    /// Accounts:
    /// 0. `[]` Vault PDA
    /// 1. `[]` Oracle account
    GetCollateralRatio,

    /// Return data: `u128` ratio, WAD-scaled percent
    /// Accounts:
    /// 0. `[]` Vault PDA
    /// 1. `[]` Position PDA of `owner`
    /// 2. `[]` Oracle account
    GetUserCollateralRatio {
        owner: Pubkey,
    },

    /// Return data: `u128` price, WAD
    /// Accounts:
    /// 0. `[]` Vault PDA
    /// 1. `[]` Position PDA of `owner`
    GetLiquidationPrice {
        owner: Pubkey,
    },

    /// Move accrued mint and redeem fees out of the collateral vault
    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Vault PDA
    /// 2. `[]` Vault authority PDA
    /// 3. `[writable]` Collateral vault token account
    /// 4. `[writable]` Destination collateral token account
    /// 5. `[]` Token program
    WithdrawFees {
        amount: u64,
    },
}

impl VaultInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&variant, rest) = input.split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match variant {
            0 => {
                let params = VaultParams::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::InitializeVault { params }
            },
            1 => {
                let payload = MintPayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::MintWithCollateralRatio {
                    collateral_in: payload.collateral_in,
                    target_collateral_ratio: payload.target_collateral_ratio,
                }
            },
            2 => Self::Redeem { token_amount: unpack_amount(rest)? },
            3 => {
                let payload = LiquidatePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::Liquidate {
                    owner: payload.owner,
                    repay_amount: payload.repay_amount,
                }
            },
            4 => Self::Pause,
            5 => Self::Unpause,
            6 => Self::AddCollateral { amount: unpack_amount(rest)? },
            7 => Self::SweepTokens { amount: unpack_amount(rest)? },
            8 => {
                let update = ConfigUpdate::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::UpdateConfig { update }
            },
            9 => {
                let payload = RolePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::GrantRole { member: payload.member, role: payload.role }
            },
            10 => {
                let payload = RolePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::RevokeRole { member: payload.member, role: payload.role }
            },
            11 => Self::GetCollateralRatio,
            12 => Self::GetUserCollateralRatio { owner: unpack_owner(rest)? },
            13 => Self::GetLiquidationPrice { owner: unpack_owner(rest)? },
            14 => Self::WithdrawFees { amount: unpack_amount(rest)? },
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct MintPayload {
    collateral_in: u64,
    target_collateral_ratio: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct LiquidatePayload {
    owner: Pubkey,
    repay_amount: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct RolePayload {
    member: Pubkey,
    role: Role,
}

fn unpack_amount(rest: &[u8]) -> Result<u64, ProgramError> {
    u64::try_from_slice(rest).map_err(|_| ProgramError::InvalidInstructionData)
}

fn unpack_owner(rest: &[u8]) -> Result<Pubkey, ProgramError> {
    Pubkey::try_from_slice(rest).map_err(|_| ProgramError::InvalidInstructionData)
}

/// Addresses fixed for one vault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultKeys {
    pub program_id: Pubkey,
    pub vault: Pubkey,
    pub vault_authority: Pubkey,
    pub collateral_mint: Pubkey,
    pub synthetic_mint: Pubkey,
    pub collateral_vault: Pubkey,
    pub oracle: Pubkey,
}

impl VaultKeys {
    pub fn new(
        program_id: &Pubkey,
        collateral_mint: &Pubkey,
        synthetic_mint: &Pubkey,
        collateral_vault: &Pubkey,
        oracle: &Pubkey,
    ) -> Self {
        let (vault, _) = VaultPDA::derive(program_id, collateral_mint, synthetic_mint);
        let (vault_authority, _) = VaultAuthorityPDA::derive(program_id, &vault);
        Self {
            program_id: *program_id,
            vault,
            vault_authority,
            collateral_mint: *collateral_mint,
            synthetic_mint: *synthetic_mint,
            collateral_vault: *collateral_vault,
            oracle: *oracle,
        }
    }

    pub fn position(&self, owner: &Pubkey) -> Pubkey {
        PositionPDA::derive(&self.program_id, &self.vault, owner).0
    }
}

fn build(program_id: &Pubkey, accounts: Vec<AccountMeta>, data: &VaultInstruction) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.try_to_vec().unwrap_or_default(),
    }
}

fn admin_accounts(keys: &VaultKeys, signer: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(*signer, true),
        AccountMeta::new(keys.vault, false),
    ]
}

pub fn initialize_vault(keys: &VaultKeys, governor: &Pubkey, params: VaultParams) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new(*governor, true),
            AccountMeta::new(keys.vault, false),
            AccountMeta::new_readonly(keys.vault_authority, false),
            AccountMeta::new_readonly(keys.collateral_mint, false),
            AccountMeta::new_readonly(keys.synthetic_mint, false),
            AccountMeta::new_readonly(keys.collateral_vault, false),
            AccountMeta::new_readonly(keys.oracle, false),
            AccountMeta::new_readonly(solana_program::system_program::id(), false),
            AccountMeta::new_readonly(solana_program::sysvar::rent::id(), false),
        ],
        &VaultInstruction::InitializeVault { params },
    )
}

pub fn mint_with_collateral_ratio(
    keys: &VaultKeys,
    owner: &Pubkey,
    owner_collateral: &Pubkey,
    owner_synthetic: &Pubkey,
    collateral_in: u64,
    target_collateral_ratio: u64,
) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new(*owner, true),
            AccountMeta::new(keys.vault, false),
            AccountMeta::new(keys.position(owner), false),
            AccountMeta::new_readonly(keys.vault_authority, false),
            AccountMeta::new(*owner_collateral, false),
            AccountMeta::new(keys.collateral_vault, false),
            AccountMeta::new(keys.synthetic_mint, false),
            AccountMeta::new(*owner_synthetic, false),
            AccountMeta::new_readonly(keys.oracle, false),
            AccountMeta::new_readonly(spl_token::id(), false),
            AccountMeta::new_readonly(solana_program::system_program::id(), false),
            AccountMeta::new_readonly(solana_program::sysvar::rent::id(), false),
        ],
        &VaultInstruction::MintWithCollateralRatio {
            collateral_in,
            target_collateral_ratio,
        },
    )
}

pub fn redeem(
    keys: &VaultKeys,
    owner: &Pubkey,
    owner_synthetic: &Pubkey,
    owner_collateral: &Pubkey,
    token_amount: u64,
) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(*owner, true),
            AccountMeta::new(keys.vault, false),
            AccountMeta::new(keys.position(owner), false),
            AccountMeta::new_readonly(keys.vault_authority, false),
            AccountMeta::new(*owner_synthetic, false),
            AccountMeta::new(keys.synthetic_mint, false),
            AccountMeta::new(keys.collateral_vault, false),
            AccountMeta::new(*owner_collateral, false),
            AccountMeta::new_readonly(keys.oracle, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        &VaultInstruction::Redeem { token_amount },
    )
}

pub fn liquidate(
    keys: &VaultKeys,
    liquidator: &Pubkey,
    liquidator_synthetic: &Pubkey,
    liquidator_collateral: &Pubkey,
    owner: &Pubkey,
    owner_collateral: &Pubkey,
    repay_amount: u64,
) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(*liquidator, true),
            AccountMeta::new(keys.vault, false),
            AccountMeta::new(keys.position(owner), false),
            AccountMeta::new_readonly(keys.vault_authority, false),
            AccountMeta::new(*liquidator_synthetic, false),
            AccountMeta::new(keys.synthetic_mint, false),
            AccountMeta::new(keys.collateral_vault, false),
            AccountMeta::new(*liquidator_collateral, false),
            AccountMeta::new(*owner_collateral, false),
            AccountMeta::new_readonly(keys.oracle, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        &VaultInstruction::Liquidate {
            owner: *owner,
            repay_amount,
        },
    )
}

pub fn pause(keys: &VaultKeys, pauser: &Pubkey) -> Instruction {
    build(&keys.program_id, admin_accounts(keys, pauser), &VaultInstruction::Pause)
}

pub fn unpause(keys: &VaultKeys, pauser: &Pubkey) -> Instruction {
    build(&keys.program_id, admin_accounts(keys, pauser), &VaultInstruction::Unpause)
}

pub fn add_collateral(
    keys: &VaultKeys,
    governor: &Pubkey,
    governor_collateral: &Pubkey,
    amount: u64,
) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(*governor, true),
            AccountMeta::new(keys.vault, false),
            AccountMeta::new(*governor_collateral, false),
            AccountMeta::new(keys.collateral_vault, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        &VaultInstruction::AddCollateral { amount },
    )
}

pub fn sweep_tokens(
    keys: &VaultKeys,
    governor: &Pubkey,
    source: &Pubkey,
    destination: &Pubkey,
    amount: u64,
) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(*governor, true),
            AccountMeta::new_readonly(keys.vault, false),
            AccountMeta::new_readonly(keys.vault_authority, false),
            AccountMeta::new(*source, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        &VaultInstruction::SweepTokens { amount },
    )
}

pub fn withdraw_fees(
    keys: &VaultKeys,
    governor: &Pubkey,
    destination: &Pubkey,
    amount: u64,
) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(*governor, true),
            AccountMeta::new(keys.vault, false),
            AccountMeta::new_readonly(keys.vault_authority, false),
            AccountMeta::new(keys.collateral_vault, false),
            AccountMeta::new(*destination, false),
            AccountMeta::new_readonly(spl_token::id(), false),
        ],
        &VaultInstruction::WithdrawFees { amount },
    )
}

pub fn update_config(keys: &VaultKeys, governor: &Pubkey, update: ConfigUpdate) -> Instruction {
    build(
        &keys.program_id,
        admin_accounts(keys, governor),
        &VaultInstruction::UpdateConfig { update },
    )
}

pub fn grant_role(keys: &VaultKeys, governor: &Pubkey, member: &Pubkey, role: Role) -> Instruction {
    build(
        &keys.program_id,
        admin_accounts(keys, governor),
        &VaultInstruction::GrantRole { member: *member, role },
    )
}

pub fn revoke_role(keys: &VaultKeys, governor: &Pubkey, member: &Pubkey, role: Role) -> Instruction {
    build(
        &keys.program_id,
        admin_accounts(keys, governor),
        &VaultInstruction::RevokeRole { member: *member, role },
    )
}

pub fn get_collateral_ratio(keys: &VaultKeys) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(keys.vault, false),
            AccountMeta::new_readonly(keys.oracle, false),
        ],
        &VaultInstruction::GetCollateralRatio,
    )
}

pub fn get_user_collateral_ratio(keys: &VaultKeys, owner: &Pubkey) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(keys.vault, false),
            AccountMeta::new_readonly(keys.position(owner), false),
            AccountMeta::new_readonly(keys.oracle, false),
        ],
        &VaultInstruction::GetUserCollateralRatio { owner: *owner },
    )
}

pub fn get_liquidation_price(keys: &VaultKeys, owner: &Pubkey) -> Instruction {
    build(
        &keys.program_id,
        vec![
            AccountMeta::new_readonly(keys.vault, false),
            AccountMeta::new_readonly(keys.position(owner), false),
        ],
        &VaultInstruction::GetLiquidationPrice { owner: *owner },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> VaultKeys {
        VaultKeys::new(
            &crate::id(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
        )
    }

    #[test]
    fn test_builder_data_unpacks() {
        let keys = keys();
        let owner = Pubkey::new_unique();

        let ix = mint_with_collateral_ratio(
            &keys, &owner, &Pubkey::new_unique(), &Pubkey::new_unique(), 100_000_000, 150,
        );
        assert_eq!(
            VaultInstruction::unpack(&ix.data).unwrap(),
            VaultInstruction::MintWithCollateralRatio {
                collateral_in: 100_000_000,
                target_collateral_ratio: 150,
            }
        );
        assert_eq!(ix.accounts[2].pubkey, keys.position(&owner));

        let ix = liquidate(
            &keys,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &owner,
            &Pubkey::new_unique(),
            42,
        );
        assert_eq!(
            VaultInstruction::unpack(&ix.data).unwrap(),
            VaultInstruction::Liquidate { owner, repay_amount: 42 }
        );

        let update = ConfigUpdate {
            liquidation_bonus: Some(5),
            ..ConfigUpdate::default()
        };
        let ix = update_config(&keys, &owner, update);
        assert_eq!(
            VaultInstruction::unpack(&ix.data).unwrap(),
            VaultInstruction::UpdateConfig { update }
        );

        let ix = get_liquidation_price(&keys, &owner);
        assert_eq!(
            VaultInstruction::unpack(&ix.data).unwrap(),
            VaultInstruction::GetLiquidationPrice { owner }
        );

        let ix = withdraw_fees(&keys, &owner, &Pubkey::new_unique(), 7);
        assert_eq!(ix.data[0], 14);
        assert_eq!(
            VaultInstruction::unpack(&ix.data).unwrap(),
            VaultInstruction::WithdrawFees { amount: 7 }
        );
        assert_eq!(ix.accounts[3].pubkey, keys.collateral_vault);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert_eq!(
            VaultInstruction::unpack(&[99]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            VaultInstruction::unpack(&[2, 1, 2]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn test_config_update_keeps_unset_fields() {
        let params = VaultParams::default();
        let update = ConfigUpdate {
            min_collateral_ratio: Some(200),
            permissionless_liquidation: Some(false),
            ..ConfigUpdate::default()
        };
        let next = update.apply(&params);
        assert_eq!(next.min_collateral_ratio, 200);
        assert!(!next.permissionless_liquidation);
        assert_eq!(next.mint_fee_bps, params.mint_fee_bps);
        assert_eq!(next.liquidation_threshold, params.liquidation_threshold);
    }
}
