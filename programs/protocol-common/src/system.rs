//! System program helpers for program-owned PDAs

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    program::{invoke, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction, system_program,
};

/// Create a PDA owned by `owner` with `space` bytes, rent-exempt.
///
/// An address that already holds lamports cannot go through
/// `create_account`, so it is topped up, allocated and assigned instead.
pub fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    pda_account: &AccountInfo<'a>,
    space: usize,
    owner: &Pubkey,
    system_program_info: &AccountInfo<'a>,
    rent: &Rent,
    signer_seeds: &[&[u8]],
) -> ProgramResult {
    if !system_program::check_id(system_program_info.key) {
        return Err(ProgramError::IncorrectProgramId);
    }

    let required_lamports = rent.minimum_balance(space);
    let current_lamports = pda_account.lamports();

    if current_lamports == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                pda_account.key,
                required_lamports,
                space as u64,
                owner,
            ),
            &[payer.clone(), pda_account.clone(), system_program_info.clone()],
            &[signer_seeds],
        );
    }

    let top_up = required_lamports.saturating_sub(current_lamports);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, pda_account.key, top_up),
            &[payer.clone(), pda_account.clone(), system_program_info.clone()],
        )?;
    }

    invoke_signed(
        &system_instruction::allocate(pda_account.key, space as u64),
        &[pda_account.clone(), system_program_info.clone()],
        &[signer_seeds],
    )?;

    invoke_signed(
        &system_instruction::assign(pda_account.key, owner),
        &[pda_account.clone(), system_program_info.clone()],
        &[signer_seeds],
    )
}
