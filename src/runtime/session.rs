//! In-memory session store
//!
//! Sessions are transient: they live for the lifetime of the process and are
//! not shared across instances.

use super::traits::SessionStore;
use crate::state_machine::SessionContext;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<i64, SessionContext>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: i64) -> SessionContext {
        self.sessions
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn set(&self, user_id: i64, session: SessionContext) {
        self.sessions.write().await.insert(user_id, session);
    }

    async fn clear(&self, user_id: i64) {
        self.sessions.write().await.remove(&user_id);
    }
}
