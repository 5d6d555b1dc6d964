use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Fixed label stored with every payload.
pub const PAYLOAD_LABEL: &str = "Данные";

/// Profile of the Telegram user who sent a message.
/// Kept free of teloxide types so the registration flow can be exercised without a bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderProfile {
    pub id: i64,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

/// Opaque data column of a user row.
/// Missing profile fields are omitted from the JSON rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub id: i64,
    pub text: String,
}

/// One row of the `users` table, keyed by the Telegram user id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRecord {
    pub telegram_id: i64,
    pub data: Value,
}

impl SenderProfile {
    pub fn new(id: i64, first_name: impl Into<String>) -> Self {
        SenderProfile {
            id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
        }
    }
}

impl From<&teloxide::types::User> for SenderProfile {
    fn from(user: &teloxide::types::User) -> Self {
        SenderProfile {
            // Telegram user ids fit in 52 bits
            id: user.id.0 as i64,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
        }
    }
}

impl UserPayload {
    pub fn from_sender(sender: &SenderProfile) -> Self {
        UserPayload {
            last_name: sender.last_name.clone(),
            username: sender.username.clone(),
            id: sender.id,
            text: PAYLOAD_LABEL.to_string(),
        }
    }
}

impl UserRecord {
    pub fn new(telegram_id: i64, payload: &UserPayload) -> serde_json::Result<Self> {
        Ok(UserRecord {
            telegram_id,
            data: serde_json::to_value(payload)?,
        })
    }

    pub fn for_sender(sender: &SenderProfile) -> serde_json::Result<Self> {
        Self::new(sender.id, &UserPayload::from_sender(sender))
    }

    /// Reference shape of a `users` row as the readers return it: one JSON
    /// object keyed by column name. `Database` readers must produce exactly this.
    pub fn to_row(&self) -> Value {
        serde_json::json!({
            "telegram_id": self.telegram_id,
            "data": self.data,
        })
    }
}
