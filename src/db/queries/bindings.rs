use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};
use uuid::Uuid;

use crate::db::tables::collaborator_binding::{
    ActiveModel, Column, Entity as CollaboratorBinding, Model as BindingModel, Permission,
};
use crate::error::Error;

/// The caller's explicit binding on a document, if any. `None` means no
/// binding exists — authorization falls through to the public-document
/// rule (spec §4.1).
pub async fn get<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    principal_id: Uuid,
) -> Result<Option<BindingModel>, Error> {
    Ok(CollaboratorBinding::find()
        .filter(Column::DocumentId.eq(document_id))
        .filter(Column::PrincipalId.eq(principal_id))
        .one(conn)
        .await?)
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
) -> Result<Vec<BindingModel>, Error> {
    Ok(CollaboratorBinding::find()
        .filter(Column::DocumentId.eq(document_id))
        .all(conn)
        .await?)
}

/// Creates the owner's implicit binding at document-creation time (spec §3).
pub async fn create_owner_binding<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    owner_id: Uuid,
) -> Result<BindingModel, Error> {
    upsert(conn, document_id, owner_id, Permission::Owner, true).await
}

pub async fn upsert<C: ConnectionTrait>(
    conn: &C,
    document_id: Uuid,
    principal_id: Uuid,
    permission: Permission,
    active: bool,
) -> Result<BindingModel, Error> {
    if let Some(existing) = get(conn, document_id, principal_id).await? {
        let mut model: ActiveModel = existing.into();
        model.permission = Set(permission);
        model.active = Set(active);
        Ok(model.update(conn).await?)
    } else {
        let model = ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            document_id: Set(document_id),
            principal_id: Set(principal_id),
            permission: Set(permission),
            active: Set(active),
        };
        Ok(model.insert(conn).await?)
    }
}
