//! Caller identity as seen by the governance engine.

use std::collections::HashSet;

use super::{PartyId, UserId};

/// A resolved caller: who they are, which parties they belong to and
/// whether they may steer voting sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub party_ids: HashSet<PartyId>,
    pub can_manage_sessions: bool,
}

impl Principal {
    pub fn new(
        user_id: UserId,
        party_ids: impl IntoIterator<Item = PartyId>,
        can_manage_sessions: bool,
    ) -> Self {
        Self {
            user_id,
            party_ids: party_ids.into_iter().collect(),
            can_manage_sessions,
        }
    }

    /// Plain member of the given parties.
    pub fn member(user_id: UserId, party_ids: impl IntoIterator<Item = PartyId>) -> Self {
        Self::new(user_id, party_ids, false)
    }

    /// Session manager in the given parties.
    pub fn manager(user_id: UserId, party_ids: impl IntoIterator<Item = PartyId>) -> Self {
        Self::new(user_id, party_ids, true)
    }

    pub fn belongs_to(&self, party_id: &PartyId) -> bool {
        self.party_ids.contains(party_id)
    }

    /// Member of the party who also holds the session-management role.
    pub fn manages(&self, party_id: &PartyId) -> bool {
        self.can_manage_sessions && self.belongs_to(party_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_belongs_only_to_listed_parties() {
        let party = PartyId::new();
        let principal = Principal::member(UserId::new(), [party]);

        assert!(principal.belongs_to(&party));
        assert!(!principal.belongs_to(&PartyId::new()));
        assert!(!principal.manages(&party));
    }

    #[test]
    fn manager_needs_membership_to_manage() {
        let party = PartyId::new();
        let principal = Principal::manager(UserId::new(), [party]);

        assert!(principal.manages(&party));
        assert!(!principal.manages(&PartyId::new()));
    }
}
