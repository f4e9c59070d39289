use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use synapse_sdk::Source;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn of a conversation. Messages are never changed after they are
/// appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    /// Evidence behind an assistant answer, in the order the backend sent it.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Display labels of the attached sources, in order.
    #[must_use]
    pub fn source_labels(&self) -> Vec<String> {
        self.sources.iter().map(Source::label).collect()
    }
}
