//! Wire types for the real-time channel (spec §6). Inbound kinds parse
//! whatever framing `src/api/ws.rs` is wired to; outbound kinds are what the
//! Hub emits to sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selection {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChangeInput {
    pub new_content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentChangeOutput {
    pub new_content: String,
    pub version: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub socket_id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub cursor: Option<i64>,
    pub selection: Option<Selection>,
    pub color: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Inbound {
    #[serde(rename_all = "camelCase")]
    JoinDocument { document_id: Uuid, user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    LeaveDocument { document_id: Uuid },
    #[serde(rename_all = "camelCase")]
    CursorUpdate {
        document_id: Uuid,
        user_id: Uuid,
        position: i64,
        #[serde(default)]
        selection: Option<Selection>,
        #[serde(default)]
        username: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TypingStart { document_id: Uuid, user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    TypingStop { document_id: Uuid, user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    DocumentChange {
        document_id: Uuid,
        user_id: Uuid,
        change: ContentChangeInput,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Outbound {
    #[serde(rename_all = "camelCase")]
    DocumentState {
        content: String,
        version: i64,
        last_edited: DateTime<Utc>,
        current_users: Vec<RosterEntry>,
    },
    #[serde(rename_all = "camelCase")]
    UserJoined {
        user_id: Uuid,
        socket_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        socket_id: Uuid,
        timestamp: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    CursorUpdate {
        user_id: Uuid,
        socket_id: Uuid,
        position: i64,
        selection: Option<Selection>,
        username: Option<String>,
        color: &'static str,
    },
    #[serde(rename_all = "camelCase")]
    TypingStart { user_id: Uuid, socket_id: Uuid },
    #[serde(rename_all = "camelCase")]
    TypingStop { user_id: Uuid, socket_id: Uuid },
    #[serde(rename_all = "camelCase")]
    DocumentUpdated {
        user_id: Uuid,
        socket_id: Uuid,
        change: ContentChangeOutput,
    },
    #[serde(rename_all = "camelCase")]
    AccessDenied { message: String },
    Error { message: String },
}
