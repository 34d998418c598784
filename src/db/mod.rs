pub mod queries;
pub mod tables;

#[cfg(feature = "test-support")]
pub mod tests;

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use uuid::Uuid;

pub use queries::documents::{DocumentFieldUpdate, ListFilter, NewDocument};
pub use tables::collaborator_binding::{Model as Binding, Permission};
pub use tables::document::Model as Document;
pub use tables::operation::{Model as OperationRecord, OperationKind};

use crate::error::Error;
use crate::principal::Principal;

/// The narrow persistence port (spec §6, expanded in SPEC_FULL §10.5).
/// `Database` is the only production implementor; tests use the same
/// implementation against an in-memory sqlite connection via the
/// `test-support` feature.
#[async_trait]
pub trait Store: Send + Sync {
    async fn create_document(&self, new: NewDocument) -> Result<Document, Error>;
    async fn get_document(&self, id: Uuid) -> Result<Document, Error>;
    async fn update_document_fields(
        &self,
        id: Uuid,
        update: DocumentFieldUpdate,
    ) -> Result<Document, Error>;
    async fn delete_document(&self, id: Uuid) -> Result<(), Error>;
    async fn list_documents(&self, filter: ListFilter) -> Result<Vec<Document>, Error>;

    async fn get_binding(
        &self,
        document_id: Uuid,
        principal_id: Uuid,
    ) -> Result<Option<Binding>, Error>;
    async fn upsert_binding(
        &self,
        document_id: Uuid,
        principal_id: Uuid,
        permission: Permission,
        active: bool,
    ) -> Result<Binding, Error>;
    async fn list_bindings(&self, document_id: Uuid) -> Result<Vec<Binding>, Error>;

    async fn list_operations(&self, document_id: Uuid) -> Result<Vec<OperationRecord>, Error>;
}

/// `sea-orm`-backed implementation of the persistence port. Talks to
/// Postgres in production; in tests (`test-support` feature) it can be
/// constructed over an in-memory sqlite connection instead, matching the
/// teacher's `sqlite = [...]` / `test-support = ["sqlite"]` split.
#[derive(Clone)]
pub struct Database {
    pub(crate) conn: DatabaseConnection,
}

impl Database {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn connect(database_url: &str) -> Result<Self, Error> {
        let conn = sea_orm::Database::connect(database_url)
            .await
            .map_err(Error::from)?;
        Ok(Self::new(conn))
    }

    /// Runs `f` in one database transaction, committing on success and
    /// rolling back on any error — the sole serialization boundary the
    /// Change Engine relies on (spec §4.1 persistence order, §5).
    pub async fn transaction<F, T>(&self, f: F) -> Result<T, Error>
    where
        for<'c> F: FnOnce(
                &'c DatabaseTransaction,
            )
                -> Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'c>>
            + Send,
        T: Send,
    {
        let txn = self.conn.begin().await.map_err(Error::from)?;
        match f(&txn).await {
            Ok(value) => {
                txn.commit().await.map_err(Error::from)?;
                Ok(value)
            }
            Err(err) => {
                let _ = txn.rollback().await;
                Err(err)
            }
        }
    }

    /// Creates a document and its implicit owner binding atomically.
    pub async fn create_document_with_owner(&self, new: NewDocument) -> Result<Document, Error> {
        self.transaction(|tx| {
            Box::pin(async move {
                let doc = queries::documents::create(tx, new).await?;
                queries::bindings::create_owner_binding(tx, doc.id, doc.owner_id).await?;
                Ok(doc)
            })
        })
        .await
    }

    pub async fn update_document_body(
        &self,
        id: Uuid,
        new_body: &str,
    ) -> Result<Document, Error> {
        queries::documents::update_body(&self.conn, id, new_body).await
    }

    pub async fn append_operation(
        &self,
        document_id: Uuid,
        kind: OperationKind,
        position: i64,
        length: i64,
        content: &str,
        principal: Principal,
    ) -> Result<OperationRecord, Error> {
        queries::operations::append(
            &self.conn,
            document_id,
            kind,
            position,
            length,
            content,
            principal.0,
        )
        .await
    }

    pub async fn insert_analytics(
        &self,
        document_id: Uuid,
        principal: Principal,
        request_type: &str,
        total_changes: i64,
        applied_changes: i64,
        per_op: serde_json::Value,
    ) -> Result<(), Error> {
        queries::analytics::insert(
            &self.conn,
            document_id,
            principal.0,
            request_type,
            total_changes,
            applied_changes,
            per_op,
        )
        .await
    }
}

#[async_trait]
impl Store for Database {
    async fn create_document(&self, new: NewDocument) -> Result<Document, Error> {
        self.create_document_with_owner(new).await
    }

    async fn get_document(&self, id: Uuid) -> Result<Document, Error> {
        queries::documents::get_for_read(&self.conn, id).await
    }

    async fn update_document_fields(
        &self,
        id: Uuid,
        update: DocumentFieldUpdate,
    ) -> Result<Document, Error> {
        queries::documents::update_fields(&self.conn, id, update).await
    }

    async fn delete_document(&self, id: Uuid) -> Result<(), Error> {
        queries::documents::delete(&self.conn, id).await
    }

    async fn list_documents(&self, filter: ListFilter) -> Result<Vec<Document>, Error> {
        queries::documents::list(&self.conn, filter).await
    }

    async fn get_binding(
        &self,
        document_id: Uuid,
        principal_id: Uuid,
    ) -> Result<Option<Binding>, Error> {
        queries::bindings::get(&self.conn, document_id, principal_id).await
    }

    async fn upsert_binding(
        &self,
        document_id: Uuid,
        principal_id: Uuid,
        permission: Permission,
        active: bool,
    ) -> Result<Binding, Error> {
        queries::bindings::upsert(&self.conn, document_id, principal_id, permission, active).await
    }

    async fn list_bindings(&self, document_id: Uuid) -> Result<Vec<Binding>, Error> {
        queries::bindings::list(&self.conn, document_id).await
    }

    async fn list_operations(&self, document_id: Uuid) -> Result<Vec<OperationRecord>, Error> {
        queries::operations::list_for_document(&self.conn, document_id).await
    }
}
