//! Organizational changes a discussion can carry out once approved.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{CompanyId, PartyId, UserId, ValidationError};

/// Upper bound for party and company names.
pub const MAX_NAME_LENGTH: usize = 255;

/// Tagged action payload, stored as JSON with a `type` discriminator.
///
/// ```json
/// {"type": "RENAME_PARTY", "party_id": "…", "new_name": "Builders"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionPayload {
    RenameParty { party_id: PartyId, new_name: String },
    RenameCompany { company_id: CompanyId, new_name: String },
    EvictUserFromParty { party_id: PartyId, user_id: UserId },
    AddUserToParty { party_id: PartyId, user_id: UserId },
    DeleteParty { party_id: PartyId },
}

/// Discriminator of an `ActionPayload`, useful for logging and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    RenameParty,
    RenameCompany,
    EvictUserFromParty,
    AddUserToParty,
    DeleteParty,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::RenameParty => "RENAME_PARTY",
            ActionType::RenameCompany => "RENAME_COMPANY",
            ActionType::EvictUserFromParty => "EVICT_USER_FROM_PARTY",
            ActionType::AddUserToParty => "ADD_USER_TO_PARTY",
            ActionType::DeleteParty => "DELETE_PARTY",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActionPayload {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionPayload::RenameParty { .. } => ActionType::RenameParty,
            ActionPayload::RenameCompany { .. } => ActionType::RenameCompany,
            ActionPayload::EvictUserFromParty { .. } => ActionType::EvictUserFromParty,
            ActionPayload::AddUserToParty { .. } => ActionType::AddUserToParty,
            ActionPayload::DeleteParty { .. } => ActionType::DeleteParty,
        }
    }

    /// Checks enqueue-time constraints (non-empty names).
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            ActionPayload::RenameParty { new_name, .. }
            | ActionPayload::RenameCompany { new_name, .. } => {
                ValidationError::check_text("new_name", new_name, MAX_NAME_LENGTH)
            }
            _ => Ok(()),
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_type_tag() {
        let party_id = PartyId::new();
        let payload = ActionPayload::RenameParty {
            party_id,
            new_name: "Builders".to_string(),
        };

        let value = payload.to_json().unwrap();

        assert_eq!(value["type"], "RENAME_PARTY");
        assert_eq!(value["party_id"], json!(party_id.to_string()));
        assert_eq!(value["new_name"], "Builders");
    }

    #[test]
    fn decodes_every_tag() {
        let party = PartyId::new().to_string();
        let user = UserId::new().to_string();
        let company = CompanyId::new().to_string();
        let cases = [
            (
                json!({"type": "RENAME_PARTY", "party_id": party, "new_name": "A"}),
                ActionType::RenameParty,
            ),
            (
                json!({"type": "RENAME_COMPANY", "company_id": company, "new_name": "B"}),
                ActionType::RenameCompany,
            ),
            (
                json!({"type": "EVICT_USER_FROM_PARTY", "party_id": party, "user_id": user}),
                ActionType::EvictUserFromParty,
            ),
            (
                json!({"type": "ADD_USER_TO_PARTY", "party_id": party, "user_id": user}),
                ActionType::AddUserToParty,
            ),
            (
                json!({"type": "DELETE_PARTY", "party_id": party}),
                ActionType::DeleteParty,
            ),
        ];

        for (value, expected) in cases {
            let payload = ActionPayload::from_json(value).unwrap();
            assert_eq!(payload.action_type(), expected);
        }
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let value = json!({"type": "DISSOLVE_COMPANY", "company_id": CompanyId::new().to_string()});
        assert!(ActionPayload::from_json(value).is_err());
    }

    #[test]
    fn missing_field_is_rejected() {
        let value = json!({"type": "ADD_USER_TO_PARTY", "party_id": PartyId::new().to_string()});
        assert!(ActionPayload::from_json(value).is_err());
    }

    #[test]
    fn blank_new_name_fails_validation() {
        let payload = ActionPayload::RenameCompany {
            company_id: CompanyId::new(),
            new_name: "  ".to_string(),
        };
        assert_eq!(
            payload.validate(),
            Err(ValidationError::empty_field("new_name"))
        );
    }

    #[test]
    fn membership_payloads_need_no_validation() {
        let payload = ActionPayload::DeleteParty {
            party_id: PartyId::new(),
        };
        assert!(payload.validate().is_ok());
    }
}
