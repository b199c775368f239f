//! Event System
//!
//! Events are Borsh-serialized and written to the program log so off-chain
//! indexers can follow price changes and ledger movements.

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{log::sol_log_data, msg, pubkey::Pubkey};

use crate::access_control::Role;

/// Event type discriminator
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    // Oracle events
    OracleInitialized = 0,
    PriceChanged = 1,
    OracleTimingUpdated = 2,

    // Vault events
    VaultInitialized = 10,
    CollateralMinted = 11,
    CollateralRedeemed = 12,
    PositionLiquidated = 13,
    InsolventLiquidation = 14,
    ReserveToppedUp = 15,
    TokensSwept = 16,
    VaultConfigUpdated = 17,
    FeesWithdrawn = 18,

    // Access control events
    RoleGranted = 20,
    RoleRevoked = 21,
    PauseToggled = 22,
}

/// Base event trait
pub trait Event: BorshSerialize {
    fn event_type() -> EventType;

    fn emit(&self) {
        msg!("SYNTH_EVENT");
        msg!("TYPE:{:?}", Self::event_type());

        if let Ok(data) = self.try_to_vec() {
            sol_log_data(&[&[Self::event_type() as u8], &data]);
        }
    }
}

/// Defines a Borsh event struct whose name matches its `EventType` variant
#[macro_export]
macro_rules! define_event {
    ($name:ident { $($field:ident: $type:ty),* $(,)? }) => {
        #[derive(::borsh::BorshSerialize, ::borsh::BorshDeserialize, Debug, Clone, PartialEq)]
        pub struct $name {
            $(pub $field: $type,)*
        }

        impl $crate::events::Event for $name {
            fn event_type() -> $crate::events::EventType {
                $crate::events::EventType::$name
            }
        }
    };
}

define_event!(RoleGranted {
    member: Pubkey,
    role: Role,
    granted_by: Pubkey,
});

define_event!(RoleRevoked {
    member: Pubkey,
    role: Role,
    revoked_by: Pubkey,
});

define_event!(PauseToggled {
    paused: bool,
    toggled_by: Pubkey,
    timestamp: i64,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_roundtrip() {
        let event = PauseToggled {
            paused: true,
            toggled_by: Pubkey::new_unique(),
            timestamp: 1_700_000_000,
        };
        let bytes = event.try_to_vec().unwrap();
        let decoded = PauseToggled::try_from_slice(&bytes).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(PauseToggled::event_type(), EventType::PauseToggled);
    }
}
