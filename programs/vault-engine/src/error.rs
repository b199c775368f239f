use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum VaultError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Already initialized")]
    AlreadyInitialized = 1,

    #[error("Invalid PDA")]
    InvalidPDA = 2,

    #[error("Amount must be non-zero")]
    AmountZero = 3,

    #[error("Target collateral ratio below the minimum")]
    CollateralRatioTooLow = 4,

    #[error("Mint would leave the global collateral ratio below the minimum")]
    CollateralRatioViolation = 5,

    #[error("Redeem amount exceeds position debt")]
    InsufficientDebt = 6,

    #[error("Repay amount exceeds position debt")]
    RepayExceedsDebt = 7,

    #[error("Position is not liquidatable")]
    NotLiquidatable = 8,

    #[error("Oracle price is stale")]
    StalePrice = 9,

    #[error("Position collateral cannot cover the seized amount")]
    InsufficientCollateralForLiquidation = 10,

    #[error("Mint amount rounds to zero tokens")]
    MintAmountTooSmall = 11,

    #[error("Invalid vault configuration")]
    InvalidConfig = 12,

    #[error("Unsupported token decimals")]
    InvalidDecimals = 13,

    #[error("Invalid oracle account")]
    InvalidOracleAccount = 14,

    #[error("Invalid mint")]
    InvalidMint = 15,

    #[error("Invalid token account")]
    InvalidTokenAccount = 16,

    #[error("Position does not belong to this vault or owner")]
    InvalidPosition = 17,

    #[error("Sweep amount exceeds untracked balance")]
    SweepExceedsStrayBalance = 18,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 19,

    #[error("Division by zero")]
    DivisionByZero = 20,

    #[error("Withdrawal exceeds accrued fees")]
    FeeWithdrawalExceedsAccrued = 21,
}

impl PrintProgramError for VaultError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("VaultError: {}", self);
    }
}

impl From<VaultError> for ProgramError {
    fn from(e: VaultError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for VaultError {
    fn type_of() -> &'static str {
        "VaultError"
    }
}
