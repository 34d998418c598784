//! Disposable in-memory sqlite database for tests, gated behind the same
//! `sqlite`/`test-support` features the teacher uses to let `Database`
//! run against either backend.

use sea_orm::ConnectionTrait;

use crate::db::Database;

const SCHEMA: &str = r#"
CREATE TABLE documents (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    body TEXT NOT NULL,
    tags TEXT NOT NULL,
    is_public INTEGER NOT NULL,
    allow_comments INTEGER NOT NULL,
    allow_suggestions INTEGER NOT NULL,
    require_approval INTEGER NOT NULL,
    owner_id TEXT NOT NULL,
    revision INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    last_edited_at TEXT NOT NULL
);

CREATE TABLE collaborator_bindings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL,
    principal_id TEXT NOT NULL,
    permission TEXT NOT NULL,
    active INTEGER NOT NULL,
    UNIQUE(document_id, principal_id)
);

CREATE TABLE operations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    kind TEXT NOT NULL,
    position INTEGER NOT NULL,
    length INTEGER NOT NULL,
    content TEXT NOT NULL,
    principal_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE analytics_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id TEXT NOT NULL,
    principal_id TEXT NOT NULL,
    request_type TEXT NOT NULL,
    total_changes INTEGER NOT NULL,
    applied_changes INTEGER NOT NULL,
    per_op TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

pub struct TestDb {
    pub db: Database,
}

impl TestDb {
    pub async fn new() -> Self {
        let conn = sea_orm::Database::connect("sqlite::memory:")
            .await
            .expect("connect in-memory sqlite");
        conn.execute_unprepared(SCHEMA)
            .await
            .expect("create test schema");
        Self {
            db: Database::new(conn),
        }
    }
}
