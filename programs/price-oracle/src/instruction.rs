use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
};
use synth_common::Role;

use crate::state::OracleState;

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum OracleInstruction {
    /// Create the oracle PDA for `symbol`; the signer becomes governor
    /// Accounts:
    /// 0. `[signer, writable]` Governor (payer)
    /// 1. `[writable]` Oracle PDA
    /// 2. `[]` System program
    /// 3. `[]` Rent sysvar
    Initialize {
        symbol: [u8; 16],
        initial_price: u64,
        decimals: u8,
        update_delay: i64,
        max_staleness: i64,
    },

    /// Timelocked price update
    /// Accounts:
    /// 0. `[signer]` Price updater
    /// 1. `[writable]` Oracle PDA
    UpdatePrice {
        new_price: u64,
    },

    /// Price update bypassing the timelock
    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Oracle PDA
    EmergencyUpdatePrice {
        new_price: u64,
    },

    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Oracle PDA
    SetTimingParams {
        update_delay: Option<i64>,
        max_staleness: Option<i64>,
    },

    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Oracle PDA
    GrantRole {
        member: Pubkey,
        role: Role,
    },

    /// Accounts:
    /// 0. `[signer]` Governor
    /// 1. `[writable]` Oracle PDA
    RevokeRole {
        member: Pubkey,
        role: Role,
    },

    /// Stop regular price updates
    /// Accounts:
    /// 0. `[signer]` Pauser
    /// 1. `[writable]` Oracle PDA
    Pause,

    /// Accounts:
    /// 0. `[signer]` Pauser
    /// 1. `[writable]` Oracle PDA
    Unpause,

    /// Return data: `u64` price, fails with `StalePrice`
    /// Accounts:
    /// 0. `[]` Oracle PDA
    GetPrice,

    /// Return data: `PriceReading`
    /// Accounts:
    /// 0. `[]` Oracle PDA
    GetPriceWithStaleness,

    /// Return data: `bool`
    /// Accounts:
    /// 0. `[]` Oracle PDA
    CanUpdatePrice,

    /// Return data: `i64` seconds
    /// Accounts:
    /// 0. `[]` Oracle PDA
    TimeUntilUpdateAllowed,
}

impl OracleInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (&variant, rest) = input.split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match variant {
            0 => {
                let payload = InitializePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::Initialize {
                    symbol: payload.symbol,
                    initial_price: payload.initial_price,
                    decimals: payload.decimals,
                    update_delay: payload.update_delay,
                    max_staleness: payload.max_staleness,
                }
            },
            1 => {
                let payload = PricePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::UpdatePrice { new_price: payload.new_price }
            },
            2 => {
                let payload = PricePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::EmergencyUpdatePrice { new_price: payload.new_price }
            },
            3 => {
                let payload = SetTimingParamsPayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::SetTimingParams {
                    update_delay: payload.update_delay,
                    max_staleness: payload.max_staleness,
                }
            },
            4 => {
                let payload = RolePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::GrantRole { member: payload.member, role: payload.role }
            },
            5 => {
                let payload = RolePayload::try_from_slice(rest)
                    .map_err(|_| ProgramError::InvalidInstructionData)?;
                Self::RevokeRole { member: payload.member, role: payload.role }
            },
            6 => Self::Pause,
            7 => Self::Unpause,
            8 => Self::GetPrice,
            9 => Self::GetPriceWithStaleness,
            10 => Self::CanUpdatePrice,
            11 => Self::TimeUntilUpdateAllowed,
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }
}

#[derive(BorshSerialize, BorshDeserialize)]
struct InitializePayload {
    symbol: [u8; 16],
    initial_price: u64,
    decimals: u8,
    update_delay: i64,
    max_staleness: i64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct PricePayload {
    new_price: u64,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct SetTimingParamsPayload {
    update_delay: Option<i64>,
    max_staleness: Option<i64>,
}

#[derive(BorshSerialize, BorshDeserialize)]
struct RolePayload {
    member: Pubkey,
    role: Role,
}

fn build(program_id: &Pubkey, accounts: Vec<AccountMeta>, data: &OracleInstruction) -> Instruction {
    Instruction {
        program_id: *program_id,
        accounts,
        data: data.try_to_vec().unwrap_or_default(),
    }
}

/// Pads `symbol` into the fixed seed width
pub fn symbol_bytes(symbol: &str) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    let len = symbol.len().min(16);
    bytes[..len].copy_from_slice(&symbol.as_bytes()[..len]);
    bytes
}

pub fn initialize(
    program_id: &Pubkey,
    governor: &Pubkey,
    symbol: [u8; 16],
    initial_price: u64,
    decimals: u8,
    update_delay: i64,
    max_staleness: i64,
) -> Instruction {
    let (oracle, _) = OracleState::find_address(&symbol, program_id);
    build(
        program_id,
        vec![
            AccountMeta::new(*governor, true),
            AccountMeta::new(oracle, false),
            AccountMeta::new_readonly(solana_program::system_program::id(), false),
            AccountMeta::new_readonly(solana_program::sysvar::rent::id(), false),
        ],
        &OracleInstruction::Initialize {
            symbol,
            initial_price,
            decimals,
            update_delay,
            max_staleness,
        },
    )
}

fn admin_accounts(signer: &Pubkey, oracle: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(*signer, true),
        AccountMeta::new(*oracle, false),
    ]
}

pub fn update_price(program_id: &Pubkey, updater: &Pubkey, oracle: &Pubkey, new_price: u64) -> Instruction {
    build(program_id, admin_accounts(updater, oracle), &OracleInstruction::UpdatePrice { new_price })
}

pub fn emergency_update_price(
    program_id: &Pubkey,
    governor: &Pubkey,
    oracle: &Pubkey,
    new_price: u64,
) -> Instruction {
    build(
        program_id,
        admin_accounts(governor, oracle),
        &OracleInstruction::EmergencyUpdatePrice { new_price },
    )
}

pub fn set_timing_params(
    program_id: &Pubkey,
    governor: &Pubkey,
    oracle: &Pubkey,
    update_delay: Option<i64>,
    max_staleness: Option<i64>,
) -> Instruction {
    build(
        program_id,
        admin_accounts(governor, oracle),
        &OracleInstruction::SetTimingParams { update_delay, max_staleness },
    )
}

pub fn grant_role(
    program_id: &Pubkey,
    governor: &Pubkey,
    oracle: &Pubkey,
    member: &Pubkey,
    role: Role,
) -> Instruction {
    build(
        program_id,
        admin_accounts(governor, oracle),
        &OracleInstruction::GrantRole { member: *member, role },
    )
}

pub fn revoke_role(
    program_id: &Pubkey,
    governor: &Pubkey,
    oracle: &Pubkey,
    member: &Pubkey,
    role: Role,
) -> Instruction {
    build(
        program_id,
        admin_accounts(governor, oracle),
        &OracleInstruction::RevokeRole { member: *member, role },
    )
}

pub fn pause(program_id: &Pubkey, pauser: &Pubkey, oracle: &Pubkey) -> Instruction {
    build(program_id, admin_accounts(pauser, oracle), &OracleInstruction::Pause)
}

pub fn unpause(program_id: &Pubkey, pauser: &Pubkey, oracle: &Pubkey) -> Instruction {
    build(program_id, admin_accounts(pauser, oracle), &OracleInstruction::Unpause)
}

/// Builds one of the read-only query instructions
pub fn query(program_id: &Pubkey, oracle: &Pubkey, query: OracleInstruction) -> Instruction {
    build(program_id, vec![AccountMeta::new_readonly(*oracle, false)], &query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_data_unpacks() {
        let program_id = crate::id();
        let governor = Pubkey::new_unique();
        let ix = initialize(&program_id, &governor, symbol_bytes("sXAU"), 42, 8, 60, 120);
        assert_eq!(
            OracleInstruction::unpack(&ix.data).unwrap(),
            OracleInstruction::Initialize {
                symbol: symbol_bytes("sXAU"),
                initial_price: 42,
                decimals: 8,
                update_delay: 60,
                max_staleness: 120,
            }
        );

        let member = Pubkey::new_unique();
        let ix = grant_role(&program_id, &governor, &Pubkey::new_unique(), &member, Role::PriceUpdater);
        assert_eq!(
            OracleInstruction::unpack(&ix.data).unwrap(),
            OracleInstruction::GrantRole { member, role: Role::PriceUpdater }
        );

        let ix = query(&program_id, &Pubkey::new_unique(), OracleInstruction::TimeUntilUpdateAllowed);
        assert_eq!(ix.data, vec![11]);
    }

    #[test]
    fn test_unknown_variant_rejected() {
        assert_eq!(
            OracleInstruction::unpack(&[42]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert!(OracleInstruction::unpack(&[]).is_err());
    }
}
