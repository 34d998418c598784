//! Pure in-memory per-document fan-out state (spec §3 Room). Created
//! lazily on first join, destroyed by the `Hub` once its last session
//! leaves. Does not own durable state — it caches the latest body to seed
//! new joiners and to publish broadcasts without round-tripping the
//! persistence port on every cursor event.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::session::{Session, SessionId};

pub struct Room {
    pub document_id: Uuid,
    pub body: String,
    pub revision: i64,
    pub last_edited: DateTime<Utc>,
    pub sessions: HashMap<SessionId, Arc<Session>>,
}

impl Room {
    pub fn new(document_id: Uuid, body: String, revision: i64, last_edited: DateTime<Utc>) -> Self {
        Self {
            document_id,
            body,
            revision,
            last_edited,
            sessions: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
