use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};
use synth_common::AccessControl;

use crate::error::OracleError;

/// Seed prefix for oracle PDAs
pub const ORACLE_SEED: &[u8] = b"oracle";

/// Largest supported price scale
pub const MAX_PRICE_DECIMALS: u8 = 18;

/// Price feed for one synthetic asset
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub struct OracleState {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized flag
    pub is_initialized: bool,

    /// PDA bump
    pub bump: u8,

    /// Asset symbol, zero padded
    pub symbol: [u8; 16],

    /// Latest price of one synthetic unit in collateral-asset terms,
    /// scaled by 10^decimals. Never zero once initialized.
    pub price: u64,

    /// Price scale
    pub decimals: u8,

    /// Unix timestamp of the last accepted update (non-decreasing)
    pub last_update_time: i64,

    /// Minimum seconds between regular updates
    pub update_delay: i64,

    /// Seconds after which the price is considered stale
    pub max_staleness: i64,

    /// Role table and pause flag
    pub access: AccessControl,
}

/// Result of a staleness-tolerant read
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceReading {
    pub price: u64,
    pub decimals: u8,
    pub last_update_time: i64,
    pub is_stale: bool,
}

impl OracleState {
    pub const DISCRIMINATOR: [u8; 8] = [83, 89, 78, 95, 79, 82, 67, 76]; // "SYN_ORCL"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        1 + // bump
        16 + // symbol
        8 + // price
        1 + // decimals
        8 + // last_update_time
        8 + // update_delay
        8 + // max_staleness
        AccessControl::LEN; // access

    pub fn new(
        governor: Pubkey,
        bump: u8,
        symbol: [u8; 16],
        price: u64,
        decimals: u8,
        update_delay: i64,
        max_staleness: i64,
        now: i64,
    ) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            bump,
            symbol,
            price,
            decimals,
            last_update_time: now,
            update_delay,
            max_staleness,
            access: AccessControl::new(governor),
        }
    }

    pub fn find_address(symbol: &[u8; 16], program_id: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[ORACLE_SEED, symbol], program_id)
    }

    /// Deserialize, tolerating the unused tail of the account
    pub fn unpack(data: &[u8]) -> Result<Self, ProgramError> {
        let mut cursor: &[u8] = data;
        let state = Self::deserialize(&mut cursor)
            .map_err(|_| ProgramError::InvalidAccountData)?;
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<(), ProgramError> {
        if self.discriminator != Self::DISCRIMINATOR {
            return Err(ProgramError::InvalidAccountData);
        }

        if !self.is_initialized {
            return Err(ProgramError::UninitializedAccount);
        }

        if self.price == 0 {
            return Err(OracleError::AmountZero.into());
        }

        Self::validate_params(self.decimals, self.update_delay, self.max_staleness)
    }

    pub fn validate_params(
        decimals: u8,
        update_delay: i64,
        max_staleness: i64,
    ) -> Result<(), ProgramError> {
        if decimals > MAX_PRICE_DECIMALS {
            return Err(OracleError::InvalidDecimals.into());
        }

        if update_delay < 0 || max_staleness <= 0 {
            return Err(OracleError::InvalidTimingParams.into());
        }

        Ok(())
    }

    /// Seconds since the last accepted update. Negative if the clock reads
    /// earlier than the stored timestamp.
    fn elapsed(&self, now: i64) -> i64 {
        now.saturating_sub(self.last_update_time)
    }

    pub fn is_stale(&self, now: i64) -> bool {
        self.elapsed(now) > self.max_staleness
    }

    /// Fresh price or `StalePrice`
    pub fn get_price(&self, now: i64) -> Result<u64, OracleError> {
        if self.is_stale(now) {
            return Err(OracleError::StalePrice);
        }
        Ok(self.price)
    }

    /// Price with a staleness flag instead of an error
    pub fn get_price_with_staleness(&self, now: i64) -> PriceReading {
        PriceReading {
            price: self.price,
            decimals: self.decimals,
            last_update_time: self.last_update_time,
            is_stale: self.is_stale(now),
        }
    }

    pub fn time_until_update_allowed(&self, now: i64) -> i64 {
        self.last_update_time
            .saturating_add(self.update_delay)
            .saturating_sub(now)
            .max(0)
    }

    pub fn can_update_price(&self, now: i64) -> bool {
        self.elapsed(now) >= self.update_delay
    }

    /// Timelocked update. Returns the previous price.
    pub fn update_price(&mut self, new_price: u64, now: i64) -> Result<u64, OracleError> {
        if new_price == 0 {
            return Err(OracleError::AmountZero);
        }

        if !self.can_update_price(now) {
            return Err(OracleError::TooFrequent);
        }

        let old_price = self.price;
        self.price = new_price;
        self.last_update_time = now;
        Ok(old_price)
    }

    /// Update bypassing the timelock. Returns the previous price.
    pub fn emergency_update_price(&mut self, new_price: u64, now: i64) -> Result<u64, OracleError> {
        if new_price == 0 {
            return Err(OracleError::AmountZero);
        }

        let old_price = self.price;
        self.price = new_price;
        self.last_update_time = self.last_update_time.max(now);
        Ok(old_price)
    }
}
