//! Entities persisted by the store.
//!
//! Serialized shapes are pinned to the original wire format (camelCase
//! fields, Portuguese pix-key kinds) so previously persisted blobs
//! deserialize unchanged.

pub mod id;

use serde::{Deserialize, Serialize};

/// Accepted pix key kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixKeyType {
    #[serde(rename = "email")]
    Email,
    #[serde(rename = "telefone")]
    Phone,
    #[serde(rename = "cpf")]
    Cpf,
    #[serde(rename = "chave_aleatoria")]
    Random,
}

/// User as saved on the blob store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    /// PHC string, never the clear credential.
    pub password_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_key_type: Option<PixKeyType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pix_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    /// Single pending message; a new notification overwrites it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_banned: Option<bool>,
}

impl User {
    pub fn banned(&self) -> bool {
        self.is_banned.unwrap_or(false)
    }

    /// Whether the financial-profile step is done.
    pub fn pix_complete(&self) -> bool {
        self.pix_key.is_some()
    }
}

/// Partial update merged into a [`User`]; `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub pix_key_type: Option<PixKeyType>,
    pub pix_key: Option<String>,
    pub cpf: Option<String>,
}

impl UserPatch {
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(phone) = self.phone {
            user.phone = phone;
        }
        if let Some(pix_key_type) = self.pix_key_type {
            user.pix_key_type = Some(pix_key_type);
        }
        if let Some(pix_key) = self.pix_key {
            user.pix_key = Some(pix_key);
        }
        if let Some(cpf) = self.cpf {
            user.cpf = Some(cpf);
        }
    }
}

/// Cash-bonus event, created and curated by the administrator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    /// Decimal amount kept as string, e.g. `"50.00"`.
    pub value: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Input for event upsert: presence of an id selects update over insert.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub value: String,
}

/// Payout/payback cycle position of a [`ParticipationRequest`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    WaitingReceipt,
    Paid,
    Completed,
}

impl RequestStatus {
    /// Position along the cycle. Transitions may only increase it.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::WaitingReceipt => 1,
            Self::Paid => 2,
            Self::Completed => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// A user's claim to join an event.
///
/// `user_*` and `event_*` fields are snapshots captured at creation time and
/// never track later changes of their source entities, on purpose: the
/// historical record survives profile edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipationRequest {
    pub id: String,
    pub user_id: String,
    pub event_id: String,
    pub user_name: String,
    pub user_phone: String,
    pub user_pix_key: String,
    pub user_cpf: String,
    pub event_title: String,
    pub event_value: String,
    pub status: RequestStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Identity data blocked from registering or transacting.
///
/// Emails are kept lowercased and cpfs digits-only, so membership checks are
/// plain equality.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BannedData {
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phones: Vec<String>,
    #[serde(default)]
    pub cpfs: Vec<String>,
}

impl BannedData {
    pub fn contains_email(&self, email: &str) -> bool {
        let email = email.to_lowercase();
        self.emails.iter().any(|e| *e == email)
    }

    pub fn contains_phone(&self, phone: &str) -> bool {
        self.phones.iter().any(|p| p == phone)
    }

    pub fn contains_cpf(&self, cpf: &str) -> bool {
        let cpf = digits_only(cpf);
        self.cpfs.iter().any(|c| *c == cpf)
    }
}

/// Strip formatting from a cpf, keeping digits only.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_wire_format() {
        let raw = r#"{
            "id": "user_1",
            "name": "Ana",
            "email": "ana@x.com",
            "phone": "11999990000",
            "passwordHash": "$argon2id$...",
            "pixKeyType": "chave_aleatoria",
            "pixKey": "f00",
            "isBanned": true
        }"#;

        let user: User = serde_json::from_str(raw).unwrap();
        assert_eq!(user.pix_key_type, Some(PixKeyType::Random));
        assert!(user.banned());
        assert!(user.cpf.is_none());

        // absent optionals stay absent when written back.
        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("cpf"));
        assert!(!raw.contains("notification"));
        assert!(raw.contains("\"passwordHash\""));
    }

    #[test]
    fn test_status_wire_format_and_rank() {
        let status: RequestStatus =
            serde_json::from_str("\"waiting_receipt\"").unwrap();
        assert_eq!(status, RequestStatus::WaitingReceipt);

        assert!(RequestStatus::Pending.rank() < status.rank());
        assert!(status.rank() < RequestStatus::Paid.rank());
        assert!(RequestStatus::Paid.rank() < RequestStatus::Completed.rank());
        assert!(RequestStatus::Completed.is_terminal());
    }

    #[test]
    fn test_patch_leaves_unset_fields() {
        let mut user = User {
            id: "user_1".into(),
            name: "Ana".into(),
            email: "ana@x.com".into(),
            ..Default::default()
        };

        UserPatch {
            name: Some("Ana Clara".into()),
            ..Default::default()
        }
        .apply(&mut user);

        assert_eq!(user.name, "Ana Clara");
        assert_eq!(user.email, "ana@x.com");
    }

    #[test]
    fn test_banned_data_normalized_lookups() {
        let banned = BannedData {
            emails: vec!["ana@x.com".into()],
            phones: vec!["11999990000".into()],
            cpfs: vec!["12345678901".into()],
        };

        assert!(banned.contains_email("ANA@X.COM"));
        assert!(banned.contains_cpf("123.456.789-01"));
        assert!(!banned.contains_phone("999"));
    }

    #[test]
    fn test_digits_only() {
        assert_eq!(digits_only("123.456.789-01"), "12345678901");
        assert_eq!(digits_only(""), "");
    }
}
