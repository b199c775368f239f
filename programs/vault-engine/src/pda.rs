//! Program Derived Address (PDA) derivation functions

use solana_program::pubkey::Pubkey;

/// PDA seed constants
pub mod seeds {
    pub const VAULT: &[u8] = b"vault";
    pub const VAULT_AUTHORITY: &[u8] = b"vault_authority";
    pub const POSITION: &[u8] = b"position";
}

/// Vault state, one per collateral/synthetic mint pair
pub struct VaultPDA;
impl VaultPDA {
    pub fn derive(program_id: &Pubkey, collateral_mint: &Pubkey, synthetic_mint: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[seeds::VAULT, collateral_mint.as_ref(), synthetic_mint.as_ref()],
            program_id,
        )
    }
}

/// Owns the collateral vault and holds synthetic mint authority
pub struct VaultAuthorityPDA;
impl VaultAuthorityPDA {
    pub fn derive(program_id: &Pubkey, vault: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::VAULT_AUTHORITY, vault.as_ref()], program_id)
    }
}

/// One position per owner per vault
pub struct PositionPDA;
impl PositionPDA {
    pub fn derive(program_id: &Pubkey, vault: &Pubkey, owner: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[seeds::POSITION, vault.as_ref(), owner.as_ref()],
            program_id,
        )
    }
}
