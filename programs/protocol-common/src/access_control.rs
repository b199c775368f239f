//! Access Control and Emergency Pause
//!
//! Role-based capability checks shared by the oracle and the vault. Every
//! privileged instruction goes through [`AccessControl::authorize`] instead of
//! comparing keys inline, and every user-facing state transition is gated by
//! [`AccessControl::require_not_paused`].

use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::AccessError;

/// Permission flags (bit flags for compact storage)
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permissions(pub u64);

impl Permissions {
    pub const NONE: Self = Self(0);
    pub const GOVERNOR: Self = Self(1 << 0);
    pub const PRICE_UPDATER: Self = Self(1 << 1);
    pub const PAUSER: Self = Self(1 << 2);
    pub const LIQUIDATOR: Self = Self(1 << 3);

    /// Granted to the initializer of an oracle or vault
    pub const ALL: Self = Self(
        Self::GOVERNOR.0 |
        Self::PRICE_UPDATER.0 |
        Self::PAUSER.0 |
        Self::LIQUIDATOR.0
    );

    pub fn has(&self, permission: Self) -> bool {
        permission.0 != 0 && (self.0 & permission.0) == permission.0
    }

    pub fn add(&mut self, permission: Self) {
        self.0 |= permission.0;
    }

    pub fn remove(&mut self, permission: Self) {
        self.0 &= !permission.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

/// Named roles understood by the programs
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Configuration, role management, emergency price updates, reserve top-ups
    Governor,
    /// Regular oracle price updates
    PriceUpdater,
    /// Emergency pause switch
    Pauser,
    /// Liquidations when the vault is not permissionless
    Liquidator,
}

impl Role {
    pub fn permission(self) -> Permissions {
        match self {
            Role::Governor => Permissions::GOVERNOR,
            Role::PriceUpdater => Permissions::PRICE_UPDATER,
            Role::Pauser => Permissions::PAUSER,
            Role::Liquidator => Permissions::LIQUIDATOR,
        }
    }
}

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoleMember {
    pub member: Pubkey,
    pub permissions: Permissions,
}

/// Role table and pause flag embedded in a program's root account
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct AccessControl {
    /// Emergency pause switch
    pub paused: bool,

    /// Members holding at least one role (max `MAX_MEMBERS`)
    pub members: Vec<RoleMember>,
}

impl AccessControl {
    pub const MAX_MEMBERS: usize = 8;

    pub const LEN: usize = 1 + // paused
        4 + Self::MAX_MEMBERS * (32 + 8); // members vec

    /// New table where `governor` holds every role
    pub fn new(governor: Pubkey) -> Self {
        Self {
            paused: false,
            members: vec![RoleMember {
                member: governor,
                permissions: Permissions::ALL,
            }],
        }
    }

    pub fn permissions_of(&self, member: &Pubkey) -> Permissions {
        self.members
            .iter()
            .find(|m| m.member == *member)
            .map(|m| m.permissions)
            .unwrap_or(Permissions::NONE)
    }

    pub fn has_role(&self, member: &Pubkey, role: Role) -> bool {
        self.permissions_of(member).has(role.permission())
    }

    /// Capability check: `signer` must have signed and must hold `role`.
    pub fn authorize(&self, signer: &AccountInfo, role: Role) -> ProgramResult {
        if !signer.is_signer {
            return Err(ProgramError::MissingRequiredSignature);
        }

        if !self.has_role(signer.key, role) {
            msg!("{} is missing role {:?}", signer.key, role);
            return Err(AccessError::Unauthorized.into());
        }

        Ok(())
    }

    pub fn require_not_paused(&self) -> Result<(), AccessError> {
        if self.paused {
            return Err(AccessError::Paused);
        }
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) -> Result<(), AccessError> {
        if self.paused == paused {
            return Err(AccessError::PauseStateUnchanged);
        }
        self.paused = paused;
        Ok(())
    }

    pub fn grant(&mut self, member: Pubkey, role: Role) -> Result<(), AccessError> {
        if let Some(entry) = self.members.iter_mut().find(|m| m.member == member) {
            entry.permissions.add(role.permission());
            return Ok(());
        }

        if self.members.len() >= Self::MAX_MEMBERS {
            return Err(AccessError::RoleTableFull);
        }

        self.members.push(RoleMember {
            member,
            permissions: role.permission(),
        });
        Ok(())
    }

    /// Revoke `role` from `member`. Entries left without any role are dropped.
    pub fn revoke(
        &mut self,
        caller: &Pubkey,
        member: &Pubkey,
        role: Role,
    ) -> Result<(), AccessError> {
        if role == Role::Governor && caller == member {
            return Err(AccessError::CannotRevokeOwnGovernor);
        }

        let index = self
            .members
            .iter()
            .position(|m| m.member == *member)
            .ok_or(AccessError::MemberNotFound)?;

        self.members[index].permissions.remove(role.permission());
        if self.members[index].permissions.is_empty() {
            self.members.remove(index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_governor_holds_every_role() {
        let governor = Pubkey::new_unique();
        let acl = AccessControl::new(governor);

        assert!(acl.has_role(&governor, Role::Governor));
        assert!(acl.has_role(&governor, Role::PriceUpdater));
        assert!(acl.has_role(&governor, Role::Pauser));
        assert!(acl.has_role(&governor, Role::Liquidator));
        assert!(!acl.has_role(&Pubkey::new_unique(), Role::Pauser));
    }

    #[test]
    fn test_grant_and_revoke() {
        let governor = Pubkey::new_unique();
        let keeper = Pubkey::new_unique();
        let mut acl = AccessControl::new(governor);

        acl.grant(keeper, Role::Liquidator).unwrap();
        acl.grant(keeper, Role::PriceUpdater).unwrap();
        assert_eq!(acl.members.len(), 2);
        assert!(acl.has_role(&keeper, Role::Liquidator));

        acl.revoke(&governor, &keeper, Role::Liquidator).unwrap();
        assert!(!acl.has_role(&keeper, Role::Liquidator));
        assert!(acl.has_role(&keeper, Role::PriceUpdater));

        acl.revoke(&governor, &keeper, Role::PriceUpdater).unwrap();
        assert_eq!(acl.members.len(), 1);

        assert_eq!(
            acl.revoke(&governor, &keeper, Role::PriceUpdater),
            Err(AccessError::MemberNotFound)
        );
    }

    #[test]
    fn test_governor_cannot_drop_own_governor_role() {
        let governor = Pubkey::new_unique();
        let mut acl = AccessControl::new(governor);

        assert_eq!(
            acl.revoke(&governor, &governor, Role::Governor),
            Err(AccessError::CannotRevokeOwnGovernor)
        );
        // Other roles can still be shed
        acl.revoke(&governor, &governor, Role::Liquidator).unwrap();
        assert!(acl.has_role(&governor, Role::Governor));
    }

    #[test]
    fn test_role_table_capacity() {
        let mut acl = AccessControl::new(Pubkey::new_unique());
        for _ in 1..AccessControl::MAX_MEMBERS {
            acl.grant(Pubkey::new_unique(), Role::Pauser).unwrap();
        }
        assert_eq!(
            acl.grant(Pubkey::new_unique(), Role::Pauser),
            Err(AccessError::RoleTableFull)
        );
    }

    #[test]
    fn test_pause_switch() {
        let mut acl = AccessControl::new(Pubkey::new_unique());
        assert!(acl.require_not_paused().is_ok());

        acl.set_paused(true).unwrap();
        assert_eq!(acl.require_not_paused(), Err(AccessError::Paused));
        assert_eq!(acl.set_paused(true), Err(AccessError::PauseStateUnchanged));

        acl.set_paused(false).unwrap();
        assert!(acl.require_not_paused().is_ok());
    }

    #[test]
    fn test_authorize_requires_signature_and_role() {
        let governor = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let acl = AccessControl::new(governor);

        let mut lamports = 0u64;
        let mut data = vec![];
        let signer = AccountInfo::new(
            &governor, true, false, &mut lamports, &mut data, &owner, false, 0,
        );
        assert!(acl.authorize(&signer, Role::Governor).is_ok());

        let mut lamports = 0u64;
        let mut data = vec![];
        let unsigned = AccountInfo::new(
            &governor, false, false, &mut lamports, &mut data, &owner, false, 0,
        );
        assert_eq!(
            acl.authorize(&unsigned, Role::Governor),
            Err(ProgramError::MissingRequiredSignature)
        );

        let stranger = Pubkey::new_unique();
        let mut lamports = 0u64;
        let mut data = vec![];
        let outsider = AccountInfo::new(
            &stranger, true, false, &mut lamports, &mut data, &owner, false, 0,
        );
        assert_eq!(
            acl.authorize(&outsider, Role::Pauser),
            Err(AccessError::Unauthorized.into())
        );
    }

    #[test]
    fn test_len_covers_full_table() {
        let mut acl = AccessControl::new(Pubkey::new_unique());
        for _ in 1..AccessControl::MAX_MEMBERS {
            acl.grant(Pubkey::new_unique(), Role::Liquidator).unwrap();
        }
        assert_eq!(acl.try_to_vec().unwrap().len(), AccessControl::LEN);
    }
}
