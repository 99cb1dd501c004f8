//! Process-local session store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{Session, SessionStore, SessionTurn};

/// Seed system turn used when no character description is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "你是一个医疗健康助手，请用简洁、专业的中文回答用户的问题。";

/// Default cap on turns kept after the seed turn.
pub const DEFAULT_MAX_TURNS: usize = 20;

/// In-memory [`SessionStore`]; history is lost on restart.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    system_prompt: String,
    max_turns: usize,
}

impl InMemorySessionStore {
    pub fn new(system_prompt: impl Into<String>, max_turns: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            system_prompt: system_prompt.into(),
            max_turns,
        }
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM_PROMPT, DEFAULT_MAX_TURNS)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn session_query(&self, query: &str, session_id: &str) -> anyhow::Result<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, self.system_prompt.clone()));
        session.push(SessionTurn::user(query));
        let dropped = session.trim(self.max_turns);
        if dropped > 0 {
            debug!(session_id = %session_id, dropped, "Trimmed oldest session turns");
        }
        Ok(session.clone())
    }

    async fn session_reply(
        &self,
        reply: &str,
        session_id: &str,
        total_tokens: u64,
    ) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session::new(session_id, self.system_prompt.clone()));
        session.push(SessionTurn::assistant(reply));
        session.trim(self.max_turns);
        debug!(
            session_id = %session_id,
            total_tokens,
            turns = session.messages.len(),
            "Appended assistant reply"
        );
        Ok(())
    }

    async fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn clear_session(&self, session_id: &str) -> anyhow::Result<()> {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        info!(session_id = %session_id, removed, "Session cleared");
        Ok(())
    }

    async fn clear_all_session(&self) -> anyhow::Result<()> {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();
        info!(count, "All sessions cleared");
        Ok(())
    }
}
