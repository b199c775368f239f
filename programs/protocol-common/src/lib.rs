//! Shared plumbing for the synthetic vault programs
//!
//! Role-based access control with an emergency pause switch, and the
//! event logging framework used by both the oracle and the vault, plus PDA
//! account creation.

pub mod access_control;
pub mod error;
pub mod events;
pub mod system;

pub use access_control::{AccessControl, Permissions, Role, RoleMember};
pub use error::AccessError;
pub use events::{Event, EventType};
