//! Note model and request DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Subject;

/// Visibility applied when a draft does not specify one.
pub const DEFAULT_VISIBILITY: &str = "private";

/// A note owned by one authenticated subject.
///
/// Serialized in camelCase; this exact JSON form is also the broadcast
/// payload sent to WebSocket subscribers on create and update.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    pub author: Subject,
    pub title: String,
    pub content: String,
    pub visibility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a note.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub alert_at: Option<DateTime<Utc>>,
}

/// Payload for updating a note.
///
/// Title and content are always replaced; visibility and alert time are
/// only touched when present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub visibility: Option<String>,
    #[serde(default)]
    pub alert_at: Option<DateTime<Utc>>,
}
