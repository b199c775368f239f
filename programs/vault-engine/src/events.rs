use solana_program::pubkey::Pubkey;
use synth_common::define_event;

use crate::state::VaultParams;

define_event!(VaultInitialized {
    vault: Pubkey,
    collateral_mint: Pubkey,
    synthetic_mint: Pubkey,
    oracle: Pubkey,
    params: VaultParams,
});

define_event!(CollateralMinted {
    vault: Pubkey,
    owner: Pubkey,
    collateral_in: u64,
    fee: u64,
    tokens_minted: u64,
    target_collateral_ratio: u64,
    global_collateral_ratio: u128,
});

define_event!(CollateralRedeemed {
    vault: Pubkey,
    owner: Pubkey,
    tokens_burned: u64,
    collateral_out: u64,
    surplus: u64,
    fee: u64,
    price_was_fresh: bool,
});

define_event!(PositionLiquidated {
    vault: Pubkey,
    owner: Pubkey,
    liquidator: Pubkey,
    debt_repaid: u64,
    collateral_seized: u64,
    dust_refund: u64,
});

define_event!(InsolventLiquidation {
    vault: Pubkey,
    owner: Pubkey,
    shortfall: u64,
    total_shortfall: u64,
});

define_event!(ReserveToppedUp {
    vault: Pubkey,
    amount: u64,
    reserve_collateral: u64,
});

define_event!(TokensSwept {
    vault: Pubkey,
    source: Pubkey,
    destination: Pubkey,
    amount: u64,
});

define_event!(FeesWithdrawn {
    vault: Pubkey,
    destination: Pubkey,
    amount: u64,
    accrued_fees: u64,
});

define_event!(VaultConfigUpdated {
    vault: Pubkey,
    params: VaultParams,
});
