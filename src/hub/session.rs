//! One connected client (spec §3 Session). Mutable presence state
//! (cursor/selection/typing/display name) lives behind a small internal
//! lock so a `Room`'s session map can hand out shared `Arc<Session>`
//! references while still allowing in-place updates from `updateCursor` and
//! `setTyping`.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::error::Error;
use crate::hub::messages::{Outbound, Selection};
use crate::principal::Principal;

pub type SessionId = Uuid;

/// Abstracts the real-time transport so the Hub doesn't depend on axum's
/// websocket types directly; `src/api/ws.rs` provides the production
/// implementation, tests provide an in-memory recorder.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: Outbound) -> Result<(), Error>;
}

#[derive(Default)]
struct SessionState {
    display_name: Option<String>,
    cursor: Option<i64>,
    selection: Option<Selection>,
    typing: bool,
}

pub struct Session {
    pub id: SessionId,
    pub principal: Principal,
    pub color: &'static str,
    transport: Arc<dyn Transport>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(principal: Principal, transport: Arc<dyn Transport>, color: &'static str) -> Self {
        Self {
            id: Uuid::new_v4(),
            principal,
            color,
            transport,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// `(displayName, cursor, selection, typing)`, as included in roster
    /// snapshots emitted to new joiners.
    pub fn snapshot(&self) -> (Option<String>, Option<i64>, Option<Selection>, bool) {
        let state = self.state.lock();
        (
            state.display_name.clone(),
            state.cursor,
            state.selection.clone(),
            state.typing,
        )
    }

    pub fn set_cursor(&self, position: i64, selection: Option<Selection>, display_name: Option<String>) {
        let mut state = self.state.lock();
        state.cursor = Some(position);
        state.selection = selection;
        if let Some(name) = display_name {
            state.display_name = Some(name);
        }
    }

    pub fn set_typing(&self, typing: bool) {
        self.state.lock().typing = typing;
    }

    pub async fn emit(&self, message: Outbound) {
        if let Err(err) = self.transport.send(message).await {
            tracing::debug!(session = %self.id, error = %err, "failed to emit to session");
        }
    }
}
