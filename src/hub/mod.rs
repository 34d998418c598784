//! Collaboration Hub (spec §4.2): the in-memory registry of active document
//! rooms, fanning cursor/typing/presence/content events out between
//! sessions joined to the same document.

pub mod messages;
pub mod room;
pub mod session;

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

pub use messages::{ContentChangeOutput, Inbound, Outbound, RosterEntry, Selection};
pub use room::Room;
pub use session::{Session, SessionId, Transport};

use crate::authz;
use crate::db::{Database, Store};
use crate::error::Error;
use crate::principal::Principal;

/// Ten fixed hues; assignment is arbitrary and need not survive reconnects
/// (spec §4.2 Roster and color assignment).
const COLOR_PALETTE: [&str; 10] = [
    "#e57373", "#f06292", "#ba68c8", "#9575cd", "#64b5f6", "#4dd0e1", "#81c784", "#ffd54f",
    "#ff8a65", "#a1887f",
];

/// Process-wide, keyed by document id (spec §5 Shared resources). Rooms are
/// reference-counted by session membership: `leave` removes the entry once
/// empty rather than relying on `Arc` strong-count teardown.
#[derive(Clone)]
pub struct Hub {
    db: Database,
    rooms: Arc<DashMap<Uuid, Arc<Mutex<Room>>>>,
    /// Which room (if any) each live session currently belongs to. Needed
    /// because `leave`/`updateCursor`/`setTyping`/`broadcastContent` are
    /// keyed by session handle alone (spec §4.2 contract), not by document.
    locations: Arc<DashMap<SessionId, Uuid>>,
}

impl Hub {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            rooms: Arc::new(DashMap::new()),
            locations: Arc::new(DashMap::new()),
        }
    }

    fn next_color(room: &Room) -> &'static str {
        COLOR_PALETTE[room.sessions.len() % COLOR_PALETTE.len()]
    }

    fn room_handle(&self, document_id: Uuid) -> Option<Arc<Mutex<Room>>> {
        self.rooms.get(&document_id).map(|entry| entry.clone())
    }

    fn located_room(&self, session_id: SessionId) -> Result<(Uuid, Arc<Mutex<Room>>), Error> {
        let document_id = *self
            .locations
            .get(&session_id)
            .ok_or_else(|| Error::NotFound("session is not joined to any room".into()))?;
        let room = self
            .room_handle(document_id)
            .ok_or_else(|| Error::NotFound("room no longer exists".into()))?;
        Ok((document_id, room))
    }

    /// Snapshot the roster under the room lock, then drop it before
    /// emitting — emitting to a session must never happen while the roster
    /// lock is held (spec §5 Hub roster synchronization).
    async fn broadcast_to_peers(&self, room: &Arc<Mutex<Room>>, exclude: SessionId, message: Outbound) {
        let peers: Vec<Arc<Session>> = {
            let room = room.lock();
            room.sessions
                .values()
                .filter(|session| session.id != exclude)
                .cloned()
                .collect()
        };
        for peer in peers {
            peer.emit(message.clone()).await;
        }
    }

    /// `join(sessionHandle, documentID, principal)` (spec §4.2). On deny,
    /// emits `accessDenied` directly to `transport` and returns
    /// `Error::Forbidden` — the caller never transitions out of
    /// `CONNECTED`. On allow, creates/looks up the Room, seeds it from the
    /// persistence port if this is the first joiner, and emits
    /// `documentState` to the new session and `userJoined` to peers.
    pub async fn join(
        &self,
        transport: Arc<dyn Transport>,
        document_id: Uuid,
        principal: Principal,
    ) -> Result<SessionId, Error> {
        let doc = self.db.get_document(document_id).await?;
        if !authz::can_read(&self.db.conn, &doc, principal).await? {
            let _ = transport
                .send(Outbound::AccessDenied {
                    message: "you do not have access to this document".into(),
                })
                .await;
            return Err(Error::Forbidden(
                "principal is not authorized to read this document".into(),
            ));
        }

        let room = self
            .rooms
            .entry(document_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Room::new(
                    document_id,
                    doc.body.clone(),
                    doc.revision,
                    doc.last_edited_at,
                )))
            })
            .clone();

        let (session, roster, body, version, last_edited) = {
            let mut room_guard = room.lock();
            let color = Self::next_color(&room_guard);
            let session = Arc::new(Session::new(principal, transport, color));
            let roster = room_guard
                .sessions
                .values()
                .map(|s| {
                    let (display_name, cursor, selection, _typing) = s.snapshot();
                    RosterEntry {
                        socket_id: s.id,
                        user_id: s.principal.0,
                        display_name,
                        cursor,
                        selection,
                        color: s.color,
                    }
                })
                .collect::<Vec<_>>();
            room_guard.sessions.insert(session.id, session.clone());
            (
                session,
                roster,
                room_guard.body.clone(),
                room_guard.revision,
                room_guard.last_edited,
            )
        };

        self.locations.insert(session.id, document_id);

        session
            .emit(Outbound::DocumentState {
                content: body,
                version,
                last_edited,
                current_users: roster,
            })
            .await;

        self.broadcast_to_peers(
            &room,
            session.id,
            Outbound::UserJoined {
                user_id: session.principal.0,
                socket_id: session.id,
                timestamp: Utc::now(),
            },
        )
        .await;

        tracing::debug!(document_id = %document_id, session = %session.id, principal = %principal, "session joined room");
        Ok(session.id)
    }

    /// `leave(sessionHandle)`. Idempotent: leaving a session that is not
    /// (or no longer) joined to anything is a no-op, matching "destroyed on
    /// transport close or explicit leave" allowing either to win the race.
    pub async fn leave(&self, session_id: SessionId) {
        let Some((_, document_id)) = self.locations.remove(&session_id) else {
            return;
        };
        let Some(room) = self.room_handle(document_id) else {
            return;
        };

        let now_empty = {
            let mut room_guard = room.lock();
            room_guard.sessions.remove(&session_id);
            room_guard.is_empty()
        };

        self.broadcast_to_peers(
            &room,
            session_id,
            Outbound::UserLeft {
                socket_id: session_id,
                timestamp: Utc::now(),
            },
        )
        .await;

        if now_empty {
            self.rooms.remove(&document_id);
            tracing::debug!(document_id = %document_id, "room destroyed, last session left");
        }
    }

    /// `updateCursor(sessionHandle, position, selection?, displayName?)`.
    pub async fn update_cursor(
        &self,
        session_id: SessionId,
        position: i64,
        selection: Option<Selection>,
        display_name: Option<String>,
    ) -> Result<(), Error> {
        let (_, room) = self.located_room(session_id)?;
        let session = {
            let room_guard = room.lock();
            room_guard.sessions.get(&session_id).cloned()
        }
        .ok_or_else(|| Error::NotFound("session is not a member of this room".into()))?;

        session.set_cursor(position, selection.clone(), display_name.clone());

        self.broadcast_to_peers(
            &room,
            session_id,
            Outbound::CursorUpdate {
                user_id: session.principal.0,
                socket_id: session_id,
                position,
                selection,
                username: display_name,
                color: session.color,
            },
        )
        .await;
        Ok(())
    }

    /// `setTyping(sessionHandle, bool)`.
    pub async fn set_typing(&self, session_id: SessionId, typing: bool) -> Result<(), Error> {
        let (_, room) = self.located_room(session_id)?;
        let session = {
            let room_guard = room.lock();
            room_guard.sessions.get(&session_id).cloned()
        }
        .ok_or_else(|| Error::NotFound("session is not a member of this room".into()))?;

        session.set_typing(typing);

        let message = if typing {
            Outbound::TypingStart {
                user_id: session.principal.0,
                socket_id: session_id,
            }
        } else {
            Outbound::TypingStop {
                user_id: session.principal.0,
                socket_id: session_id,
            }
        };
        self.broadcast_to_peers(&room, session_id, message).await;
        Ok(())
    }

    /// `broadcastContent(sessionHandle, newBody)` (spec §4.2 Content
    /// broadcast semantics). Writes through the persistence port first,
    /// updates the Room's cache under the lock only long enough to swap the
    /// body/revision, then fans out excluding the sender.
    pub async fn broadcast_content(&self, session_id: SessionId, new_body: String) -> Result<(), Error> {
        let (document_id, room) = self.located_room(session_id)?;
        let principal = {
            let room_guard = room.lock();
            room_guard.sessions.get(&session_id).map(|s| s.principal)
        }
        .ok_or_else(|| Error::NotFound("session is not a member of this room".into()))?;

        let updated = self.db.update_document_body(document_id, &new_body).await?;

        {
            let mut room_guard = room.lock();
            room_guard.body = updated.body.clone();
            room_guard.revision = updated.revision;
            room_guard.last_edited = updated.last_edited_at;
        }

        let timestamp = Utc::now();
        self.broadcast_to_peers(
            &room,
            session_id,
            Outbound::DocumentUpdated {
                user_id: principal.0,
                socket_id: session_id,
                change: ContentChangeOutput {
                    new_content: updated.body.clone(),
                    version: updated.revision,
                    timestamp,
                },
            },
        )
        .await;

        tracing::debug!(document_id = %document_id, session = %session_id, revision = updated.revision, "content broadcast");
        Ok(())
    }
}

#[cfg(all(test, feature = "test-support"))]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use uuid::Uuid;

    use super::*;
    use crate::db::tests::TestDb;
    use crate::db::{NewDocument, Store};

    struct Recorder {
        received: SyncMutex<Vec<Outbound>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                received: SyncMutex::new(Vec::new()),
            })
        }

        fn messages(&self) -> Vec<Outbound> {
            self.received.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for Recorder {
        async fn send(&self, message: Outbound) -> Result<(), Error> {
            self.received.lock().push(message);
            Ok(())
        }
    }

    async fn seeded_doc(db: &Database, owner: Uuid, is_public: bool) -> Uuid {
        db.create_document(NewDocument {
            title: "t".into(),
            description: None,
            body: String::new(),
            tags: vec![],
            is_public,
            allow_comments: true,
            allow_suggestions: true,
            require_approval: false,
            owner_id: owner,
        })
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn scenario_7_two_concurrent_joiners_broadcast_once_without_echo() {
        let test_db = TestDb::new().await;
        let hub = Hub::new(test_db.db.clone());
        let owner = Uuid::new_v4();
        let doc_id = seeded_doc(&test_db.db, owner, true).await;

        let c1_transport = Recorder::new();
        let c2_transport = Recorder::new();

        let c1 = hub
            .join(c1_transport.clone(), doc_id, Principal(owner))
            .await
            .unwrap();
        let c2_principal = Principal(Uuid::new_v4());
        let _c2 = hub.join(c2_transport.clone(), doc_id, c2_principal).await.unwrap();

        hub.broadcast_content(c1, "abc".to_string()).await.unwrap();

        let c1_messages = c1_transport.messages();
        let c2_messages = c2_transport.messages();

        let c1_updates = c1_messages
            .iter()
            .filter(|m| matches!(m, Outbound::DocumentUpdated { .. }))
            .count();
        assert_eq!(c1_updates, 0, "sender must not receive its own echo");

        let c2_updates: Vec<&Outbound> = c2_messages
            .iter()
            .filter(|m| matches!(m, Outbound::DocumentUpdated { .. }))
            .collect();
        assert_eq!(c2_updates.len(), 1, "peer must receive exactly one broadcast");
        match c2_updates[0] {
            Outbound::DocumentUpdated { change, .. } => {
                assert_eq!(change.new_content, "abc");
                assert_eq!(change.version, 1);
            }
            _ => unreachable!(),
        }

        let persisted = test_db.db.get_document(doc_id).await.unwrap();
        assert_eq!(persisted.body, "abc");
        assert_eq!(persisted.revision, 1);
    }

    #[tokio::test]
    async fn join_denied_for_private_document_emits_access_denied() {
        let test_db = TestDb::new().await;
        let hub = Hub::new(test_db.db.clone());
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let doc_id = seeded_doc(&test_db.db, owner, false).await;

        let transport = Recorder::new();
        let err = hub
            .join(transport.clone(), doc_id, Principal(stranger))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
        assert!(matches!(
            transport.messages().first(),
            Some(Outbound::AccessDenied { .. })
        ));
    }

    #[tokio::test]
    async fn leave_destroys_room_once_last_session_departs() {
        let test_db = TestDb::new().await;
        let hub = Hub::new(test_db.db.clone());
        let owner = Uuid::new_v4();
        let doc_id = seeded_doc(&test_db.db, owner, true).await;

        let session = hub
            .join(Recorder::new(), doc_id, Principal(owner))
            .await
            .unwrap();
        assert!(hub.rooms.contains_key(&doc_id));

        hub.leave(session).await;
        assert!(!hub.rooms.contains_key(&doc_id));
    }
}
