use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recipient recorded when a notification has no specific addressee.
pub const SYSTEM_RECIPIENT: &str = "system";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub String);

impl NotificationId {
    pub fn generate() -> Self {
        Self(format!("NTF-{}", Uuid::new_v4().simple()))
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A one-way informational record emitted as a side effect of request
/// activity. Mutated only by marking it read; never regenerated or deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_user_id: String,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Builds an unread notification addressed to `recipient`, falling back
    /// to the system recipient when none is given.
    pub fn new(
        recipient: Option<&str>,
        title: impl Into<String>,
        body: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        let recipient = recipient
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(SYSTEM_RECIPIENT);
        Self {
            id: NotificationId::generate(),
            recipient_user_id: recipient.to_owned(),
            title: title.into(),
            body: body.into(),
            kind: kind.into(),
            is_read: false,
            created_at: Utc::now(),
        }
    }
}
