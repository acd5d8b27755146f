use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User record stored under the normalized email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub email: String,                  // normalized, also the store key
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,     // set once at signup
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_login: Option<OffsetDateTime>, // null until the first login
}

impl UserRecord {
    pub fn new(email: &str, created_at: OffsetDateTime) -> Self {
        Self {
            email: email.to_string(),
            created_at,
            last_login: None,
        }
    }
}
