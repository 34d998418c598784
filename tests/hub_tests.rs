//! Cross-component coverage for the Collaboration Hub: presence fan-out,
//! ordering within a room, and the "real-time write ↔ Change Engine write"
//! interleaving described in spec §4.2 and §9.

use async_trait::async_trait;
use docuhub::change_engine::{self, ChangeRequest};
use docuhub::db::tests::TestDb;
use docuhub::db::{Database, NewDocument, Store};
use docuhub::error::Error;
use docuhub::hub::{Hub, Outbound, Selection, Transport};
use docuhub::principal::Principal;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

struct Recorder {
    received: Mutex<Vec<Outbound>>,
}

impl Recorder {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            received: Mutex::new(Vec::new()),
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

async fn seeded_doc(db: &Database, owner: Uuid) -> Uuid {
    db.create_document(NewDocument {
        title: "room doc".into(),
        description: None,
        body: String::new(),
        tags: vec![],
        is_public: true,
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
async fn cursor_and_typing_events_reach_peers_but_not_the_sender() {
    let test_db = TestDb::new().await;
    let hub = Hub::new(test_db.db.clone());
    let owner = Uuid::new_v4();
    let doc_id = seeded_doc(&test_db.db, owner).await;

    let c1_transport = Recorder::new();
    let c2_transport = Recorder::new();
    let c1 = hub.join(c1_transport.clone(), doc_id, Principal(owner)).await.unwrap();
    let _c2 = hub
        .join(c2_transport.clone(), doc_id, Principal(Uuid::new_v4()))
        .await
        .unwrap();

    hub.update_cursor(c1, 4, Some(Selection { start: 4, end: 7 }), Some("ada".into()))
        .await
        .unwrap();
    hub.set_typing(c1, true).await.unwrap();

    let c1_messages = c1_transport.messages();
    assert!(
        !c1_messages
            .iter()
            .any(|m| matches!(m, Outbound::CursorUpdate { .. } | Outbound::TypingStart { .. })),
        "sender must not see its own cursor/typing events echoed back"
    );

    let c2_messages = c2_transport.messages();
    assert!(c2_messages
        .iter()
        .any(|m| matches!(m, Outbound::CursorUpdate { position: 4, .. })));
    assert!(c2_messages.iter().any(|m| matches!(m, Outbound::TypingStart { .. })));
}

#[tokio::test]
async fn real_time_broadcast_and_change_engine_write_share_monotonic_revisions() {
    let test_db = TestDb::new().await;
    let hub = Hub::new(test_db.db.clone());
    let owner = Uuid::new_v4();
    let doc_id = seeded_doc(&test_db.db, owner).await;

    let c1 = hub
        .join(Recorder::new(), doc_id, Principal(owner))
        .await
        .unwrap();

    // Real-time writer bumps revision to 1.
    hub.broadcast_content(c1, "hello".to_string()).await.unwrap();
    let after_broadcast = test_db.db.get_document(doc_id).await.unwrap();
    assert_eq!(after_broadcast.revision, 1);

    // Change Engine writer bumps it again to 2, regardless of which path
    // wrote most recently (spec §4.2 Content broadcast semantics).
    let request: ChangeRequest =
        serde_json::from_value(serde_json::json!({"textToReplace": "hello", "newText": "hi"}))
            .unwrap();
    let response = change_engine::apply(&test_db.db, doc_id, Principal(owner), request, 1000, 1_000_000)
        .await
        .unwrap();
    assert_eq!(response.changes.document_version, 2);

    let after_change = test_db.db.get_document(doc_id).await.unwrap();
    assert_eq!(after_change.body, "hi");
    assert_eq!(after_change.revision, 2);
}

#[tokio::test]
async fn leaving_session_is_idempotent_and_private_join_is_denied() {
    let test_db = TestDb::new().await;
    let hub = Hub::new(test_db.db.clone());
    let owner = Uuid::new_v4();

    let private_doc = test_db
        .db
        .create_document(NewDocument {
            title: "private".into(),
            description: None,
            body: "secret".into(),
            tags: vec![],
            is_public: false,
            allow_comments: true,
            allow_suggestions: true,
            require_approval: false,
            owner_id: owner,
        })
        .await
        .unwrap();

    let stranger_transport = Recorder::new();
    let err = hub
        .join(stranger_transport.clone(), private_doc.id, Principal(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));
    assert!(matches!(
        stranger_transport.messages().first(),
        Some(Outbound::AccessDenied { .. })
    ));

    let ghost_session = Uuid::new_v4();
    hub.leave(ghost_session).await;
    hub.leave(ghost_session).await;
}
