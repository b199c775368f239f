use num_derive::FromPrimitive;
use solana_program::{
    decode_error::DecodeError,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

/// Access control failures shared by every program in the workspace.
///
/// Codes start at 100 so they never overlap a program's own error enum.
#[derive(Error, Debug, Copy, Clone, FromPrimitive, PartialEq, Eq)]
pub enum AccessError {
    #[error("Unauthorized")]
    Unauthorized = 100,

    #[error("Operation paused")]
    Paused = 101,

    #[error("Role table full")]
    RoleTableFull = 102,

    #[error("Member not found")]
    MemberNotFound = 103,

    #[error("Governor cannot revoke its own governor role")]
    CannotRevokeOwnGovernor = 104,

    #[error("Pause state unchanged")]
    PauseStateUnchanged = 105,
}

impl PrintProgramError for AccessError {
    fn print<E>(&self) {
        use solana_program::msg;
        msg!("AccessError: {}", self);
    }
}

impl From<AccessError> for ProgramError {
    fn from(e: AccessError) -> Self {
        ProgramError::Custom(e as u32)
    }
}

impl<T> DecodeError<T> for AccessError {
    fn type_of() -> &'static str {
        "AccessError"
    }
}
