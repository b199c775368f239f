use borsh::{BorshDeserialize, BorshSerialize};
use price_oracle::{processor::Processor as OracleProcessor, state::OracleState};
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
    cpi::spl_token::{
        burn, get_mint_data, get_token_account_data, mint_to, transfer,
        validate_mint_authority, validate_token_account, validate_token_program,
    },
    engine::{Valuation, VaultEngine, NO_DEBT_RATIO},
    error::VaultError,
    events::{
        CollateralMinted, CollateralRedeemed, FeesWithdrawn, InsolventLiquidation,
        PositionLiquidated, ReserveToppedUp, TokensSwept, VaultConfigUpdated, VaultInitialized,
    },
    instruction::{ConfigUpdate, VaultInstruction},
    math::WAD_DECIMALS,
    pda::{seeds, PositionPDA, VaultAuthorityPDA, VaultPDA},
    state::{Position, VaultParams, VaultState},
};

pub struct Processor;

impl Processor {
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = VaultInstruction::unpack(instruction_data)?;

        match instruction {
            VaultInstruction::InitializeVault { params } => {
                msg!("Instruction: InitializeVault");
                Self::process_initialize_vault(program_id, accounts, params)
            }
            VaultInstruction::MintWithCollateralRatio {
                collateral_in,
                target_collateral_ratio,
            } => {
                msg!("Instruction: MintWithCollateralRatio");
                Self::process_mint(program_id, accounts, collateral_in, target_collateral_ratio)
            }
            VaultInstruction::Redeem { token_amount } => {
                msg!("Instruction: Redeem");
                Self::process_redeem(program_id, accounts, token_amount)
            }
            VaultInstruction::Liquidate { owner, repay_amount } => {
                msg!("Instruction: Liquidate");
                Self::process_liquidate(program_id, accounts, owner, repay_amount)
            }
            VaultInstruction::Pause => {
                msg!("Instruction: Pause");
                Self::process_set_paused(program_id, accounts, true)
            }
            VaultInstruction::Unpause => {
                msg!("Instruction: Unpause");
                Self::process_set_paused(program_id, accounts, false)
            }
            VaultInstruction::AddCollateral { amount } => {
                msg!("Instruction: AddCollateral");
                Self::process_add_collateral(program_id, accounts, amount)
            }
            VaultInstruction::SweepTokens { amount } => {
                msg!("Instruction: SweepTokens");
                Self::process_sweep_tokens(program_id, accounts, amount)
            }
            VaultInstruction::UpdateConfig { update } => {
                msg!("Instruction: UpdateConfig");
                Self::process_update_config(program_id, accounts, update)
            }
            VaultInstruction::GrantRole { member, role } => {
                msg!("Instruction: GrantRole");
                Self::process_role_change(program_id, accounts, member, role, true)
            }
            VaultInstruction::RevokeRole { member, role } => {
                msg!("Instruction: RevokeRole");
                Self::process_role_change(program_id, accounts, member, role, false)
            }
            VaultInstruction::GetCollateralRatio => {
                Self::process_get_collateral_ratio(program_id, accounts)
            }
            VaultInstruction::GetUserCollateralRatio { owner } => {
                Self::process_get_user_collateral_ratio(program_id, accounts, owner)
            }
            VaultInstruction::GetLiquidationPrice { owner } => {
                Self::process_get_liquidation_price(program_id, accounts, owner)
            }
            VaultInstruction::WithdrawFees { amount } => {
                msg!("Instruction: WithdrawFees");
                Self::process_withdraw_fees(program_id, accounts, amount)
            }
        }
    }

    fn load_vault(program_id: &Pubkey, vault_info: &AccountInfo) -> Result<VaultState, ProgramError> {
        if vault_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }
        let data = vault_info.try_borrow_data()?;
        VaultState::unpack(&data)
    }

    fn save_vault(vault: &VaultState, vault_info: &AccountInfo) -> ProgramResult {
        vault
            .serialize(&mut &mut vault_info.try_borrow_mut_data()?[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    /// Position of `owner`, or `None` while its account does not exist yet
    fn load_position(
        program_id: &Pubkey,
        vault_key: &Pubkey,
        owner: &Pubkey,
        position_info: &AccountInfo,
    ) -> Result<Option<Position>, ProgramError> {
        let (position_pubkey, _) = PositionPDA::derive(program_id, vault_key, owner);
        if position_pubkey != *position_info.key {
            return Err(VaultError::InvalidPDA.into());
        }

        if position_info.data_is_empty() {
            return Ok(None);
        }

        if position_info.owner != program_id {
            return Err(ProgramError::IncorrectProgramId);
        }

        let position = Position::unpack(&position_info.try_borrow_data()?)?;
        if position.vault != *vault_key || position.owner != *owner {
            return Err(VaultError::InvalidPosition.into());
        }
        Ok(Some(position))
    }

    fn save_position(position: &Position, position_info: &AccountInfo) -> ProgramResult {
        position
            .serialize(&mut &mut position_info.try_borrow_mut_data()?[..])
            .map_err(|_| ProgramError::AccountDataTooSmall)
    }

    fn check_vault_authority(
        program_id: &Pubkey,
        vault_key: &Pubkey,
        vault: &VaultState,
        authority_info: &AccountInfo,
    ) -> ProgramResult {
        let authority = Pubkey::create_program_address(
            &[seeds::VAULT_AUTHORITY, vault_key.as_ref(), &[vault.authority_bump]],
            program_id,
        )
        .map_err(|_| VaultError::InvalidPDA)?;

        if authority != *authority_info.key {
            return Err(VaultError::InvalidPDA.into());
        }
        Ok(())
    }

    fn read_oracle(vault: &VaultState, oracle_info: &AccountInfo) -> Result<OracleState, ProgramError> {
        if *oracle_info.key != vault.oracle {
            return Err(VaultError::InvalidOracleAccount.into());
        }
        OracleProcessor::load_oracle(&price_oracle::id(), oracle_info)
            .map_err(|_| VaultError::InvalidOracleAccount.into())
    }

    /// Valuation at a price that must be within the staleness window
    fn fresh_valuation(
        vault: &VaultState,
        oracle_info: &AccountInfo,
        now: i64,
    ) -> Result<Valuation, ProgramError> {
        let oracle = Self::read_oracle(vault, oracle_info)?;
        let price = oracle.get_price(now).map_err(|_| VaultError::StalePrice)?;
        Ok(Valuation::new(
            price,
            oracle.decimals,
            vault.collateral_decimals,
            vault.synthetic_decimals,
        )?)
    }

    /// Valuation if the price is fresh, `None` if it is stale
    fn tolerant_valuation(
        vault: &VaultState,
        oracle_info: &AccountInfo,
        now: i64,
    ) -> Result<Option<Valuation>, ProgramError> {
        let oracle = Self::read_oracle(vault, oracle_info)?;
        let reading = oracle.get_price_with_staleness(now);
        if reading.is_stale {
            msg!("Oracle price is stale, surplus refund skipped");
            return Ok(None);
        }
        Ok(Some(Valuation::new(
            reading.price,
            reading.decimals,
            vault.collateral_decimals,
            vault.synthetic_decimals,
        )?))
    }

    fn process_initialize_vault(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        params: VaultParams,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let collateral_mint_info = next_account_info(account_info_iter)?;
        let synthetic_mint_info = next_account_info(account_info_iter)?;
        let collateral_vault_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let rent = &Rent::from_account_info(next_account_info(account_info_iter)?)?;

        if !governor_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        params.validate()?;

        let (vault_pubkey, bump) =
            VaultPDA::derive(program_id, collateral_mint_info.key, synthetic_mint_info.key);
        if vault_pubkey != *vault_info.key {
            return Err(VaultError::InvalidPDA.into());
        }

        if !vault_info.data_is_empty() {
            return Err(VaultError::AlreadyInitialized.into());
        }

        let (authority, authority_bump) = VaultAuthorityPDA::derive(program_id, &vault_pubkey);
        if authority != *authority_info.key {
            return Err(VaultError::InvalidPDA.into());
        }

        if collateral_mint_info.key == synthetic_mint_info.key {
            return Err(VaultError::InvalidMint.into());
        }
        let collateral_mint = get_mint_data(collateral_mint_info)?;
        let synthetic_mint = get_mint_data(synthetic_mint_info)?;
        validate_mint_authority(&synthetic_mint, &authority)?;

        if collateral_mint.decimals > WAD_DECIMALS || synthetic_mint.decimals > WAD_DECIMALS {
            return Err(VaultError::InvalidDecimals.into());
        }

        validate_token_account(collateral_vault_info, collateral_mint_info.key, Some(&authority))?;

        OracleProcessor::load_oracle(&price_oracle::id(), oracle_info)
            .map_err(|_| VaultError::InvalidOracleAccount)?;

        create_pda_account(
            governor_info,
            vault_info,
            VaultState::LEN,
            program_id,
            system_program,
            rent,
            &[
                seeds::VAULT,
                collateral_mint_info.key.as_ref(),
                synthetic_mint_info.key.as_ref(),
                &[bump],
            ],
        )?;

        let vault = VaultState::new(
            *governor_info.key,
            bump,
            authority_bump,
            *collateral_mint_info.key,
            *synthetic_mint_info.key,
            *collateral_vault_info.key,
            *oracle_info.key,
            collateral_mint.decimals,
            synthetic_mint.decimals,
            params,
            Clock::get()?.unix_timestamp,
        );
        Self::save_vault(&vault, vault_info)?;

        VaultInitialized {
            vault: *vault_info.key,
            collateral_mint: vault.collateral_mint,
            synthetic_mint: vault.synthetic_mint,
            oracle: vault.oracle,
            params,
        }
        .emit();

        msg!(
            "Vault initialized: min ratio {}%, liquidation threshold {}%, bonus {}%",
            params.min_collateral_ratio,
            params.liquidation_threshold,
            params.liquidation_bonus
        );
        Ok(())
    }

    fn process_mint(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        collateral_in: u64,
        target_collateral_ratio: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let position_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let owner_collateral_info = next_account_info(account_info_iter)?;
        let collateral_vault_info = next_account_info(account_info_iter)?;
        let synthetic_mint_info = next_account_info(account_info_iter)?;
        let owner_synthetic_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;
        let rent = &Rent::from_account_info(next_account_info(account_info_iter)?)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.require_not_paused()?;

        Self::check_vault_authority(program_id, vault_info.key, &vault, authority_info)?;
        validate_token_program(token_program)?;
        if *collateral_vault_info.key != vault.collateral_vault {
            return Err(VaultError::InvalidTokenAccount.into());
        }
        if *synthetic_mint_info.key != vault.synthetic_mint {
            return Err(VaultError::InvalidMint.into());
        }
        validate_token_account(owner_collateral_info, &vault.collateral_mint, None)?;
        validate_token_account(owner_synthetic_info, &vault.synthetic_mint, None)?;

        let now = Clock::get()?.unix_timestamp;
        let valuation = Self::fresh_valuation(&vault, oracle_info, now)?;

        let existing = Self::load_position(program_id, vault_info.key, owner_info.key, position_info)?;
        let is_new = existing.is_none();
        let (_, position_bump) = PositionPDA::derive(program_id, vault_info.key, owner_info.key);
        let mut position = existing
            .unwrap_or_else(|| Position::new(*vault_info.key, *owner_info.key, position_bump));

        let outcome = VaultEngine::mint(
            &vault.params,
            &mut vault.totals,
            &mut position,
            &valuation,
            collateral_in,
            target_collateral_ratio,
        )?;

        if is_new {
            create_pda_account(
                owner_info,
                position_info,
                Position::LEN,
                program_id,
                system_program,
                rent,
                &[
                    seeds::POSITION,
                    vault_info.key.as_ref(),
                    owner_info.key.as_ref(),
                    &[position_bump],
                ],
            )?;
        }

        position.last_update = now;
        vault.last_update = now;
        Self::save_position(&position, position_info)?;
        Self::save_vault(&vault, vault_info)?;

        transfer(
            owner_collateral_info,
            collateral_vault_info,
            owner_info,
            collateral_in,
            token_program,
            &[],
        )?;

        let bump_seed = [vault.authority_bump];
        let authority_seeds: &[&[u8]] = &[seeds::VAULT_AUTHORITY, vault_info.key.as_ref(), &bump_seed];
        mint_to(
            synthetic_mint_info,
            owner_synthetic_info,
            authority_info,
            outcome.tokens_minted,
            token_program,
            &[authority_seeds],
        )?;

        CollateralMinted {
            vault: *vault_info.key,
            owner: *owner_info.key,
            collateral_in,
            fee: outcome.fee,
            tokens_minted: outcome.tokens_minted,
            target_collateral_ratio,
            global_collateral_ratio: outcome.global_collateral_ratio,
        }
        .emit();

        msg!(
            "Minted {} tokens for {} collateral (fee {}), position {}/{}",
            outcome.tokens_minted,
            collateral_in,
            outcome.fee,
            position.collateral,
            position.debt
        );
        Ok(())
    }

    fn process_redeem(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        token_amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let position_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let owner_synthetic_info = next_account_info(account_info_iter)?;
        let synthetic_mint_info = next_account_info(account_info_iter)?;
        let collateral_vault_info = next_account_info(account_info_iter)?;
        let owner_collateral_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        if !owner_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.require_not_paused()?;

        Self::check_vault_authority(program_id, vault_info.key, &vault, authority_info)?;
        validate_token_program(token_program)?;
        if *collateral_vault_info.key != vault.collateral_vault {
            return Err(VaultError::InvalidTokenAccount.into());
        }
        if *synthetic_mint_info.key != vault.synthetic_mint {
            return Err(VaultError::InvalidMint.into());
        }
        validate_token_account(owner_synthetic_info, &vault.synthetic_mint, None)?;
        validate_token_account(owner_collateral_info, &vault.collateral_mint, None)?;

        let mut position = Self::load_position(program_id, vault_info.key, owner_info.key, position_info)?
            .ok_or(VaultError::InsufficientDebt)?;

        let now = Clock::get()?.unix_timestamp;
        let valuation = Self::tolerant_valuation(&vault, oracle_info, now)?;

        let outcome = VaultEngine::redeem(
            &vault.params,
            &mut vault.totals,
            &mut position,
            valuation.as_ref(),
            token_amount,
        )?;

        position.last_update = now;
        vault.last_update = now;
        Self::save_position(&position, position_info)?;
        Self::save_vault(&vault, vault_info)?;

        burn(
            owner_synthetic_info,
            synthetic_mint_info,
            owner_info,
            token_amount,
            token_program,
            &[],
        )?;

        if outcome.collateral_to_owner > 0 {
            let bump_seed = [vault.authority_bump];
            let authority_seeds: &[&[u8]] = &[seeds::VAULT_AUTHORITY, vault_info.key.as_ref(), &bump_seed];
            transfer(
                collateral_vault_info,
                owner_collateral_info,
                authority_info,
                outcome.collateral_to_owner,
                token_program,
                &[authority_seeds],
            )?;
        }

        CollateralRedeemed {
            vault: *vault_info.key,
            owner: *owner_info.key,
            tokens_burned: token_amount,
            collateral_out: outcome.collateral_out,
            surplus: outcome.surplus,
            fee: outcome.fee,
            price_was_fresh: valuation.is_some(),
        }
        .emit();

        msg!(
            "Redeemed {} tokens for {} collateral (fee {}, surplus {}){}",
            token_amount,
            outcome.collateral_to_owner,
            outcome.fee,
            outcome.surplus,
            if outcome.position_closed { ", position closed" } else { "" }
        );
        Ok(())
    }

    fn process_liquidate(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        owner: Pubkey,
        repay_amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let liquidator_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let position_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let liquidator_synthetic_info = next_account_info(account_info_iter)?;
        let synthetic_mint_info = next_account_info(account_info_iter)?;
        let collateral_vault_info = next_account_info(account_info_iter)?;
        let liquidator_collateral_info = next_account_info(account_info_iter)?;
        let owner_collateral_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        if !liquidator_info.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.require_not_paused()?;
        if !vault.params.permissionless_liquidation {
            vault.access.authorize(liquidator_info, Role::Liquidator)?;
        }

        Self::check_vault_authority(program_id, vault_info.key, &vault, authority_info)?;
        validate_token_program(token_program)?;
        if *collateral_vault_info.key != vault.collateral_vault {
            return Err(VaultError::InvalidTokenAccount.into());
        }
        if *synthetic_mint_info.key != vault.synthetic_mint {
            return Err(VaultError::InvalidMint.into());
        }
        validate_token_account(liquidator_synthetic_info, &vault.synthetic_mint, None)?;
        validate_token_account(liquidator_collateral_info, &vault.collateral_mint, None)?;
        validate_token_account(owner_collateral_info, &vault.collateral_mint, Some(&owner))?;

        let mut position = Self::load_position(program_id, vault_info.key, &owner, position_info)?
            .ok_or(VaultError::NotLiquidatable)?;

        let now = Clock::get()?.unix_timestamp;
        let valuation = Self::fresh_valuation(&vault, oracle_info, now)?;

        let outcome = VaultEngine::liquidate(
            &vault.params,
            &mut vault.totals,
            &mut position,
            &valuation,
            repay_amount,
        )?;

        position.last_update = now;
        vault.last_update = now;
        Self::save_position(&position, position_info)?;
        Self::save_vault(&vault, vault_info)?;

        burn(
            liquidator_synthetic_info,
            synthetic_mint_info,
            liquidator_info,
            repay_amount,
            token_program,
            &[],
        )?;

        let bump_seed = [vault.authority_bump];
        let authority_seeds: &[&[u8]] = &[seeds::VAULT_AUTHORITY, vault_info.key.as_ref(), &bump_seed];
        if outcome.collateral_seized > 0 {
            transfer(
                collateral_vault_info,
                liquidator_collateral_info,
                authority_info,
                outcome.collateral_seized,
                token_program,
                &[authority_seeds],
            )?;
        }
        if outcome.dust_refund > 0 {
            transfer(
                collateral_vault_info,
                owner_collateral_info,
                authority_info,
                outcome.dust_refund,
                token_program,
                &[authority_seeds],
            )?;
        }

        PositionLiquidated {
            vault: *vault_info.key,
            owner,
            liquidator: *liquidator_info.key,
            debt_repaid: repay_amount,
            collateral_seized: outcome.collateral_seized,
            dust_refund: outcome.dust_refund,
        }
        .emit();

        if outcome.shortfall > 0 {
            InsolventLiquidation {
                vault: *vault_info.key,
                owner,
                shortfall: outcome.shortfall,
                total_shortfall: vault.totals.liquidation_shortfall,
            }
            .emit();
            msg!("Insolvent position: shortfall {}", outcome.shortfall);
        }

        msg!(
            "Liquidated {}: repaid {}, seized {}, remaining debt {}",
            owner,
            repay_amount,
            outcome.collateral_seized,
            position.debt
        );
        Ok(())
    }

    fn process_set_paused(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        paused: bool,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let pauser_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.authorize(pauser_info, Role::Pauser)?;
        vault.access.set_paused(paused)?;
        Self::save_vault(&vault, vault_info)?;

        PauseToggled {
            paused,
            toggled_by: *pauser_info.key,
            timestamp: Clock::get()?.unix_timestamp,
        }
        .emit();

        msg!("Vault {}", if paused { "paused" } else { "unpaused" });
        Ok(())
    }

    fn process_add_collateral(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let governor_collateral_info = next_account_info(account_info_iter)?;
        let collateral_vault_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.authorize(governor_info, Role::Governor)?;

        if amount == 0 {
            return Err(VaultError::AmountZero.into());
        }

        validate_token_program(token_program)?;
        if *collateral_vault_info.key != vault.collateral_vault {
            return Err(VaultError::InvalidTokenAccount.into());
        }
        validate_token_account(governor_collateral_info, &vault.collateral_mint, None)?;

        vault.totals.reserve_collateral = vault
            .totals
            .reserve_collateral
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        vault.last_update = Clock::get()?.unix_timestamp;
        Self::save_vault(&vault, vault_info)?;

        transfer(
            governor_collateral_info,
            collateral_vault_info,
            governor_info,
            amount,
            token_program,
            &[],
        )?;

        ReserveToppedUp {
            vault: *vault_info.key,
            amount,
            reserve_collateral: vault.totals.reserve_collateral,
        }
        .emit();

        msg!("Reserve topped up by {} to {}", amount, vault.totals.reserve_collateral);
        Ok(())
    }

    fn process_sweep_tokens(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let source_info = next_account_info(account_info_iter)?;
        let destination_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        let vault = Self::load_vault(program_id, vault_info)?;
        vault.access.authorize(governor_info, Role::Governor)?;

        if amount == 0 {
            return Err(VaultError::AmountZero.into());
        }

        Self::check_vault_authority(program_id, vault_info.key, &vault, authority_info)?;
        validate_token_program(token_program)?;

        let source = get_token_account_data(source_info)?;
        if source.owner != *authority_info.key {
            return Err(VaultError::InvalidTokenAccount.into());
        }

        let stray = if *source_info.key == vault.collateral_vault {
            source.amount.saturating_sub(vault.totals.tracked_collateral()?)
        } else {
            source.amount
        };
        if amount > stray {
            msg!("Requested {} but only {} is untracked", amount, stray);
            return Err(VaultError::SweepExceedsStrayBalance.into());
        }

        let bump_seed = [vault.authority_bump];
        let authority_seeds: &[&[u8]] = &[seeds::VAULT_AUTHORITY, vault_info.key.as_ref(), &bump_seed];
        transfer(
            source_info,
            destination_info,
            authority_info,
            amount,
            token_program,
            &[authority_seeds],
        )?;

        TokensSwept {
            vault: *vault_info.key,
            source: *source_info.key,
            destination: *destination_info.key,
            amount,
        }
        .emit();

        msg!("Swept {} tokens from {}", amount, source_info.key);
        Ok(())
    }

    fn process_withdraw_fees(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;
        let authority_info = next_account_info(account_info_iter)?;
        let collateral_vault_info = next_account_info(account_info_iter)?;
        let destination_info = next_account_info(account_info_iter)?;
        let token_program = next_account_info(account_info_iter)?;

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.authorize(governor_info, Role::Governor)?;

        if amount == 0 {
            return Err(VaultError::AmountZero.into());
        }

        Self::check_vault_authority(program_id, vault_info.key, &vault, authority_info)?;
        validate_token_program(token_program)?;
        if *collateral_vault_info.key != vault.collateral_vault {
            return Err(VaultError::InvalidTokenAccount.into());
        }
        validate_token_account(destination_info, &vault.collateral_mint, None)?;

        vault.totals.accrued_fees = vault
            .totals
            .accrued_fees
            .checked_sub(amount)
            .ok_or(VaultError::FeeWithdrawalExceedsAccrued)?;
        vault.last_update = Clock::get()?.unix_timestamp;
        Self::save_vault(&vault, vault_info)?;

        let bump_seed = [vault.authority_bump];
        let authority_seeds: &[&[u8]] = &[seeds::VAULT_AUTHORITY, vault_info.key.as_ref(), &bump_seed];
        transfer(
            collateral_vault_info,
            destination_info,
            authority_info,
            amount,
            token_program,
            &[authority_seeds],
        )?;

        FeesWithdrawn {
            vault: *vault_info.key,
            destination: *destination_info.key,
            amount,
            accrued_fees: vault.totals.accrued_fees,
        }
        .emit();

        msg!("Withdrew {} in fees, {} remaining", amount, vault.totals.accrued_fees);
        Ok(())
    }

    fn process_update_config(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        update: ConfigUpdate,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let governor_info = next_account_info(account_info_iter)?;
        let vault_info = next_account_info(account_info_iter)?;

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.authorize(governor_info, Role::Governor)?;

        let params = update.apply(&vault.params);
        params.validate()?;
        vault.params = params;
        vault.last_update = Clock::get()?.unix_timestamp;
        Self::save_vault(&vault, vault_info)?;

        VaultConfigUpdated {
            vault: *vault_info.key,
            params,
        }
        .emit();

        msg!(
            "Config updated: fees {}/{} bps, min ratio {}%, threshold {}%, bonus {}%",
            params.mint_fee_bps,
            params.redeem_fee_bps,
            params.min_collateral_ratio,
            params.liquidation_threshold,
            params.liquidation_bonus
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
        let vault_info = next_account_info(account_info_iter)?;

        let mut vault = Self::load_vault(program_id, vault_info)?;
        vault.access.authorize(governor_info, Role::Governor)?;

        if grant {
            vault.access.grant(member, role)?;
            RoleGranted { member, role, granted_by: *governor_info.key }.emit();
        } else {
            vault.access.revoke(governor_info.key, &member, role)?;
            RoleRevoked { member, role, revoked_by: *governor_info.key }.emit();
        }

        Self::save_vault(&vault, vault_info)?;
        msg!("Role {:?} {} for {}", role, if grant { "granted" } else { "revoked" }, member);
        Ok(())
    }

    fn publish<T: BorshSerialize>(value: &T) -> ProgramResult {
        let data = value.try_to_vec().map_err(|_| ProgramError::InvalidAccountData)?;
        set_return_data(&data);
        Ok(())
    }

    fn process_get_collateral_ratio(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let vault_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;

        let vault = Self::load_vault(program_id, vault_info)?;
        let now = Clock::get()?.unix_timestamp;
        let valuation = Self::fresh_valuation(&vault, oracle_info, now)?;

        let ratio = VaultEngine::global_collateral_ratio(&vault.totals, &valuation)?;
        Self::publish(&ratio)
    }

    fn process_get_user_collateral_ratio(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        owner: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let vault_info = next_account_info(account_info_iter)?;
        let position_info = next_account_info(account_info_iter)?;
        let oracle_info = next_account_info(account_info_iter)?;

        let vault = Self::load_vault(program_id, vault_info)?;
        let ratio = match Self::load_position(program_id, vault_info.key, &owner, position_info)? {
            Some(position) if position.debt > 0 => {
                let now = Clock::get()?.unix_timestamp;
                let valuation = Self::fresh_valuation(&vault, oracle_info, now)?;
                VaultEngine::user_collateral_ratio(&position, &valuation)?
            }
            _ => NO_DEBT_RATIO,
        };
        Self::publish(&ratio)
    }

    fn process_get_liquidation_price(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        owner: Pubkey,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let vault_info = next_account_info(account_info_iter)?;
        let position_info = next_account_info(account_info_iter)?;

        let vault = Self::load_vault(program_id, vault_info)?;
        let price = match Self::load_position(program_id, vault_info.key, &owner, position_info)? {
            Some(position) => VaultEngine::liquidation_price(
                &vault.params,
                &position,
                vault.collateral_decimals,
                vault.synthetic_decimals,
            )?,
            None => 0,
        };
        Self::publish(&price)
    }
}

/// Decodes return data published by a query instruction
pub fn decode_return<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
    T::try_from_slice(data).map_err(|_| ProgramError::InvalidAccountData)
}
