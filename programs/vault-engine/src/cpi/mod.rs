//! Cross-program invocation helpers

pub mod spl_token;
