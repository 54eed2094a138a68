//! In-memory organization model: companies, parties and users.
//!
//! Mirrors the tables the Postgres adapter touches so the action executor
//! can run end-to-end without a database.

use std::collections::{BTreeSet, HashMap};

use crate::domain::foundation::{
    CompanyId, DomainError, ErrorCode, PartyId, Principal, Timestamp, UserId,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRecord {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartyRecord {
    pub company_id: CompanyId,
    pub name: String,
    pub members: BTreeSet<UserId>,
    pub deleted_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub company_id: Option<CompanyId>,
    pub can_manage_sessions: bool,
}

/// A staged organization mutation, replayed against live state on commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum OrgOp {
    RenameParty(PartyId, String),
    RenameCompany(CompanyId, String),
    AddMember(PartyId, UserId),
    EvictMember(PartyId, UserId),
    DeleteParty(PartyId),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Organization {
    pub companies: HashMap<CompanyId, CompanyRecord>,
    pub parties: HashMap<PartyId, PartyRecord>,
    pub users: HashMap<UserId, UserRecord>,
}

fn party_not_found(id: &PartyId) -> DomainError {
    DomainError::new(ErrorCode::PartyNotFound, format!("Party not found: {}", id))
}

impl Organization {
    pub fn principal(&self, user_id: &UserId) -> Option<Principal> {
        let user = self.users.get(user_id)?;
        let party_ids = self
            .parties
            .iter()
            .filter(|(_, party)| party.deleted_at.is_none() && party.members.contains(user_id))
            .map(|(id, _)| *id);
        Some(Principal::new(*user_id, party_ids, user.can_manage_sessions))
    }

    /// Apply one op. Returns whether anything changed.
    pub fn apply(&mut self, op: &OrgOp) -> Result<bool, DomainError> {
        match op {
            OrgOp::RenameParty(party_id, name) => {
                let party = self
                    .parties
                    .get_mut(party_id)
                    .ok_or_else(|| party_not_found(party_id))?;
                party.name = name.clone();
                Ok(true)
            }
            OrgOp::RenameCompany(company_id, name) => {
                let company = self.companies.get_mut(company_id).ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::CompanyNotFound,
                        format!("Company not found: {}", company_id),
                    )
                })?;
                company.name = name.clone();
                Ok(true)
            }
            OrgOp::AddMember(party_id, user_id) => {
                let party = self
                    .parties
                    .get(party_id)
                    .ok_or_else(|| party_not_found(party_id))?;
                if party.members.contains(user_id) {
                    return Ok(false);
                }
                let company_id = party.company_id;
                let user = self.users.get_mut(user_id).ok_or_else(|| {
                    DomainError::new(
                        ErrorCode::UserNotFound,
                        format!("User not found: {}", user_id),
                    )
                })?;
                user.company_id = Some(company_id);
                if let Some(party) = self.parties.get_mut(party_id) {
                    party.members.insert(*user_id);
                }
                Ok(true)
            }
            OrgOp::EvictMember(party_id, user_id) => Ok(self
                .parties
                .get_mut(party_id)
                .map(|party| party.members.remove(user_id))
                .unwrap_or(false)),
            OrgOp::DeleteParty(party_id) => {
                let party = self
                    .parties
                    .get_mut(party_id)
                    .ok_or_else(|| party_not_found(party_id))?;
                if party.deleted_at.is_some() {
                    return Ok(false);
                }
                party.deleted_at = Some(Timestamp::now());
                Ok(true)
            }
        }
    }
}
