//! SPL Token program CPI helpers and account checks

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    instruction::Instruction,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    program_option::COption,
    program_pack::Pack,
    pubkey::Pubkey,
};
use spl_token::{
    instruction as token_instruction,
    state::{Account as TokenAccount, Mint},
};

use crate::error::VaultError;

/// SPL Token program ID
pub const TOKEN_PROGRAM_ID: Pubkey = spl_token::ID;

fn run(
    instruction: &Instruction,
    account_infos: &[AccountInfo],
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    if signer_seeds.is_empty() {
        invoke(instruction, account_infos)
    } else {
        invoke_signed(instruction, account_infos, signer_seeds)
    }
}

/// Transfer SPL tokens
pub fn transfer<'a>(
    source: &AccountInfo<'a>,
    destination: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    amount: u64,
    token_program: &AccountInfo<'a>,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    let instruction = token_instruction::transfer(
        token_program.key,
        source.key,
        destination.key,
        authority.key,
        &[],
        amount,
    )?;

    run(
        &instruction,
        &[source.clone(), destination.clone(), authority.clone(), token_program.clone()],
        signer_seeds,
    )
}

/// Mint SPL tokens
pub fn mint_to<'a>(
    mint: &AccountInfo<'a>,
    destination: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    amount: u64,
    token_program: &AccountInfo<'a>,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    let instruction = token_instruction::mint_to(
        token_program.key,
        mint.key,
        destination.key,
        authority.key,
        &[],
        amount,
    )?;

    run(
        &instruction,
        &[mint.clone(), destination.clone(), authority.clone(), token_program.clone()],
        signer_seeds,
    )
}

/// Burn SPL tokens
pub fn burn<'a>(
    account: &AccountInfo<'a>,
    mint: &AccountInfo<'a>,
    authority: &AccountInfo<'a>,
    amount: u64,
    token_program: &AccountInfo<'a>,
    signer_seeds: &[&[&[u8]]],
) -> ProgramResult {
    let instruction = token_instruction::burn(
        token_program.key,
        account.key,
        mint.key,
        authority.key,
        &[],
        amount,
    )?;

    run(
        &instruction,
        &[account.clone(), mint.clone(), authority.clone(), token_program.clone()],
        signer_seeds,
    )
}

pub fn validate_token_program(token_program: &AccountInfo) -> ProgramResult {
    if *token_program.key != TOKEN_PROGRAM_ID {
        return Err(ProgramError::IncorrectProgramId);
    }
    Ok(())
}

/// Get token account data
pub fn get_token_account_data(account: &AccountInfo) -> Result<TokenAccount, ProgramError> {
    if *account.owner != TOKEN_PROGRAM_ID {
        return Err(VaultError::InvalidTokenAccount.into());
    }
    TokenAccount::unpack(&account.try_borrow_data()?)
        .map_err(|_| VaultError::InvalidTokenAccount.into())
}

/// Get mint data
pub fn get_mint_data(mint: &AccountInfo) -> Result<Mint, ProgramError> {
    if *mint.owner != TOKEN_PROGRAM_ID {
        return Err(VaultError::InvalidMint.into());
    }
    Mint::unpack(&mint.try_borrow_data()?).map_err(|_| VaultError::InvalidMint.into())
}

/// Token account of `mint`, optionally held by `owner`
pub fn validate_token_account(
    account: &AccountInfo,
    mint: &Pubkey,
    owner: Option<&Pubkey>,
) -> Result<TokenAccount, ProgramError> {
    let data = get_token_account_data(account)?;
    if data.mint != *mint {
        return Err(VaultError::InvalidTokenAccount.into());
    }
    if let Some(owner) = owner {
        if data.owner != *owner {
            return Err(VaultError::InvalidTokenAccount.into());
        }
    }
    Ok(data)
}

/// Mint whose mint authority is `authority`
pub fn validate_mint_authority(mint: &Mint, authority: &Pubkey) -> ProgramResult {
    if mint.mint_authority != COption::Some(*authority) {
        return Err(VaultError::InvalidMint.into());
    }
    Ok(())
}
