use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum OracleError {
    #[error("Invalid instruction")]
    InvalidInstruction = 0,

    #[error("Already initialized")]
    AlreadyInitialized = 1,

    #[error("Invalid PDA")]
    InvalidPDA = 2,

    #[error("Price must be non-zero")]
    AmountZero = 3,

    #[error("Price update attempted before the update delay elapsed")]
    TooFrequent = 4,

    #[error("Price is stale")]
    StalePrice = 5,

    #[error("Invalid price decimals")]
    InvalidDecimals = 6,

    #[error("Invalid timing parameters")]
    InvalidTimingParams = 7,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow = 8,
}

impl PrintProgramError for OracleError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("OracleError: {}", self);
    }
}

impl From<OracleError> for ProgramError {
    fn from(e: OracleError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for OracleError {
    fn type_of() -> &'static str {
        "OracleError"
    }
}
