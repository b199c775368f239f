// Collateralized synthetic asset vault
// Native Solana implementation - NO ANCHOR

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    pubkey::Pubkey,
};

pub mod cpi;
pub mod engine;
pub mod error;
pub mod events;
pub mod instruction;
pub mod math;
pub mod pda;
pub mod processor;
pub mod state;

use crate::processor::Processor;

solana_program::declare_id!("SynthVau11111111111111111111111111111111111");

#[cfg(not(feature = "no-entrypoint"))]
solana_program::entrypoint!(process);

pub fn process(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    Processor::process(program_id, accounts, instruction_data)
}
