//! Shared authorization rules (spec §4.1), reused by the Change Engine's
//! write gate and the Hub's join-time read check so the two components
//! can't drift apart on what "access" means.

use sea_orm::ConnectionTrait;

use crate::db::{queries, Document};
use crate::error::Error;
use crate::principal::Principal;

/// Owner OR public OR an active binding of any permission.
pub async fn can_read<C: ConnectionTrait>(
    conn: &C,
    doc: &Document,
    principal: Principal,
) -> Result<bool, Error> {
    if doc.owner_id == principal.0 {
        return Ok(true);
    }
    if doc.is_public {
        return Ok(true);
    }
    let binding = queries::bindings::get(conn, doc.id, principal.0).await?;
    Ok(binding.map(|b| b.active).unwrap_or(false))
}

/// Owner, OR an active owner/editor binding, OR (public AND no explicit
/// lower-tier binding). An explicit viewer/commenter binding is a hard
/// deny even on a public document (spec §4.1, REDESIGN FLAGS).
pub async fn can_write<C: ConnectionTrait>(
    conn: &C,
    doc: &Document,
    principal: Principal,
) -> Result<bool, Error> {
    if doc.owner_id == principal.0 {
        return Ok(true);
    }
    let binding = queries::bindings::get(conn, doc.id, principal.0).await?;
    if let Some(binding) = binding {
        if binding.active {
            return Ok(binding.permission.can_write());
        }
    }
    Ok(doc.is_public)
}
