use solana_program::pubkey::Pubkey;
use synth_common::define_event;

define_event!(OracleInitialized {
    oracle: Pubkey,
    symbol: [u8; 16],
    price: u64,
    decimals: u8,
    update_delay: i64,
    max_staleness: i64,
});

define_event!(PriceChanged {
    oracle: Pubkey,
    old_price: u64,
    new_price: u64,
    timestamp: i64,
    emergency: bool,
});

define_event!(OracleTimingUpdated {
    oracle: Pubkey,
    update_delay: i64,
    max_staleness: i64,
});
