use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    clock::Clock,
    entrypoint::ProgramResult,
    msg,
    program::set_return_data,
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    sysvar::Sysvar,
};
use synth_common::{
    events::{PauseToggled, RoleGranted, RoleRevoked},
    system::create_pda_account,
    Event, Role,
};

use crate::{
    error::OracleError,
    events::{OracleInitialized, OracleTimingUpdated, PriceChanged},
    instruction::OracleInstruction,
    state::{OracleState, ORACLE_SEED},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = OracleInstruction::unpack(instruction_data)?;

        match instruction {
            OracleInstruction::Initialize {
                symbol,
                initial_price,
                decimals,
                update_delay,
                max_staleness,
            } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(
                    program_id,
                    accounts,
                    symbol,
                    initial_price,
                    decimals,
                    update_delay,
                    max_staleness,
                )
            }
            OracleInstruction::UpdatePrice { new_price } => {
                msg!("Instruction: UpdatePrice");
                Self::process_update_price(program_id, accounts, new_price, false)
            }
            OracleInstruction::EmergencyUpdatePrice { new_price } => {
                msg!("Instruction: EmergencyUpdatePrice");
                Self::process_update_price(program_id, accounts, new_price, true)
            }
            OracleInstruction::SetTimingParams { update_delay, max_staleness } => {
                msg!("Instruction: SetTimingParams");
                Self::process_set_timing_params(program_id, accounts, update_delay, max_staleness)
            }
            OracleInstruction::GrantRole { member, role } => {
                msg!("Instruction: GrantRole");
                Self::process_role_change(program_id, accounts, member, role, true)
            }
            OracleInstruction::RevokeRole { member, role } => {
                msg!("Instruction: RevokeRole");
                Self::process_role_change(program_id, accounts, member, role, false)
            }
            OracleInstruction::Pause => {
                msg!("Instruction: Pause");
                Self::process_set_paused(program_id, accounts, true)
            }
            OracleInstruction::Unpause => {
                msg!("Instruction: Unpause");
                Self::process_set_paused(program_id, accounts, false)
            }
            OracleInstruction::GetPrice
            | OracleInstruction::GetPriceWithStaleness
            | OracleInstruction::CanUpdatePrice
            | OracleInstruction::TimeUntilUpdateAllowed => {
                Self::process_query(program_id, accounts, instruction)
            }
        }
    }

    /// Loads oracle state from an account owned by this program
    pub fn load_oracle(program_id: &Pubkey, oracle_info: &AccountInfo) -> Result<OracleState, ProgramError> {
        if oracle_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let data = oracle_info.try_borrow_data()?;
        OracleState::unpack(&data)
    }

    fn save_oracle(oracle: &OracleState, oracle_info: &AccountInfo) -> ProgramResult {
        oracle
            .serialize(&mut &mut oracle_info.try_borrow_mut_data()?[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        symbol: [u8; 16],
        initial_price: u64,
        decimals: u8,
        update_delay: i64,
        max_staleness: i64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let rent = &Rent::from_account_info(next_account_info(account_info_iter)?)?;

        if !governor_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        if initial_price == 0 {
            return Err(OracleError::AmountZero.into());
        }
        OracleState::validate_params(decimals, update_delay, max_staleness)?;

        let (oracle_pubkey, bump) = OracleState::find_address(&symbol, program_id);
        if oracle_pubkey != *oracle_info.key {
            return Err(OracleError::InvalidPDA.into());
        }

        if !oracle_info.data_is_empty() {
            return Err(OracleError::AlreadyInitialized.into());
        }

        create_pda_account(
            governor_info,
            oracle_info,
            OracleState::LEN,
            program_id,
            system_program,
            rent,
            &[ORACLE_SEED, &symbol, &[bump]],
        )?;

        let now = Clock::get()?.unix_timestamp;
        let oracle = OracleState::new(
            *governor_info.key,
            bump,
            symbol,
            initial_price,
            decimals,
            update_delay,
            max_staleness,
            now,
        );
        Self::save_oracle(&oracle, oracle_info)?;

        OracleInitialized {
            oracle: *oracle_info.key,
            symbol,
            price: initial_price,
            decimals,
            update_delay,
            max_staleness,
        }
        .emit();

        msg!(
            "Oracle initialized: price {} ({} decimals), update delay {}s, staleness window {}s",
            initial_price,
            decimals,
            update_delay,
            max_staleness
        );
        Ok(())
    }

    fn process_update_price(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        new_price: u64,
        emergency: bool,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let signer_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;

        let mut oracle = Self::load_oracle(program_id, oracle_info)?;
        let now = Clock::get()?.unix_timestamp;

        let old_price = if emergency {
            oracle.access.authorize(signer_info, Role::Governor)?;
            oracle.emergency_update_price(new_price, now)?
        } else {
            oracle.access.authorize(signer_info, Role::PriceUpdater)?;
            oracle.access.require_not_paused()?;
            oracle.update_price(new_price, now).map_err(|e| {
                if e == OracleError::TooFrequent {
                    msg!("Next update allowed in {}s", oracle.time_until_update_allowed(now));
                }
                e
            })?
        };

        Self::save_oracle(&oracle, oracle_info)?;

        PriceChanged {
            oracle: *oracle_info.key,
            old_price,
            new_price,
            timestamp: oracle.last_update_time,
            emergency,
        }
        .emit();

        msg!("Price updated: {} -> {}", old_price, new_price);
        Ok(())
    }

    fn process_set_timing_params(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        update_delay: Option<i64>,
        max_staleness: Option<i64>,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;

        let mut oracle = Self::load_oracle(program_id, oracle_info)?;
        oracle.access.authorize(governor_info, Role::Governor)?;

        if let Some(delay) = update_delay {
            oracle.update_delay = delay;
        }
        if let Some(staleness) = max_staleness {
            oracle.max_staleness = staleness;
        }
        OracleState::validate_params(oracle.decimals, oracle.update_delay, oracle.max_staleness)?;

        Self::save_oracle(&oracle, oracle_info)?;

        OracleTimingUpdated {
            oracle: *oracle_info.key,
            update_delay: oracle.update_delay,
            max_staleness: oracle.max_staleness,
        }
        .emit();

        msg!(
            "Timing updated: delay {}s, staleness window {}s",
            oracle.update_delay,
            oracle.max_staleness
        );
        Ok(())
    }

    fn process_role_change(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        member: Pubkey,
        role: Role,
        grant: bool,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;

        let mut oracle = Self::load_oracle(program_id, oracle_info)?;
        oracle.access.authorize(governor_info, Role::Governor)?;

        if grant {
            oracle.access.grant(member, role)?;
            RoleGranted { member, role, granted_by: *governor_info.key }.emit();
        } else {
            oracle.access.revoke(governor_info.key, &member, role)?;
            RoleRevoked { member, role, revoked_by: *governor_info.key }.emit();
        }

        Self::save_oracle(&oracle, oracle_info)?;
        msg!("Role {:?} {} for {}", role, if grant { "granted" } else { "revoked" }, member);
        Ok(())
    }

    fn process_set_paused(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        paused: bool,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let pauser_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;

        let mut oracle = Self::load_oracle(program_id, oracle_info)?;
        oracle.access.authorize(pauser_info, Role::Pauser)?;
        oracle.access.set_paused(paused)?;
        Self::save_oracle(&oracle, oracle_info)?;

        PauseToggled {
            paused,
            toggled_by: *pauser_info.key,
            timestamp: Clock::get()?.unix_timestamp,
        }
        .emit();

        msg!("Oracle {}", if paused { "paused" } else { "unpaused" });
        Ok(())
    }

    fn process_query(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        query: OracleInstruction,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let oracle_info = next_account_info(account_info_iter)?;

        let oracle = Self::load_oracle(program_id, oracle_info)?;
        let now = Clock::get()?.unix_timestamp;

        let data = match query {
            OracleInstruction::GetPrice => oracle.get_price(now)?.try_to_vec(),
            OracleInstruction::GetPriceWithStaleness => oracle.get_price_with_staleness(now).try_to_vec(),
            OracleInstruction::CanUpdatePrice => oracle.can_update_price(now).try_to_vec(),
            OracleInstruction::TimeUntilUpdateAllowed => oracle.time_until_update_allowed(now).try_to_vec(),
            _ => return Err(OracleError::InvalidInstruction.into()),
        }
        .map_err(|_| ProgramError::InvalidAccountData)?;

        set_return_data(&data);
        Ok(())
    }
}

/// Decodes return data published by a query instruction
pub fn decode_return<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
    T::try_from_slice(data).map_err(|_| ProgramError::InvalidAccountData)
}
