//! # Session
//!
//! Ordered per-user conversation history. A [`Session`] always starts with a fixed system
//! turn; user queries and assistant replies are appended in order.
//!
//! [`SessionStore`] is the seam used by the bot controller and the backend client;
//! [`InMemorySessionStore`] is the process-local implementation.
//!
//! ## Thread Safety
//!
//! The in-memory store uses `Arc<RwLock<>>`; every operation is atomic on its own.
//! Concurrent calls for the same session id are not coordinated beyond that.

mod inmemory;
mod types;

pub use inmemory::{InMemorySessionStore, DEFAULT_MAX_TURNS, DEFAULT_SYSTEM_PROMPT};
pub use types::{Role, Session, SessionTurn};

use async_trait::async_trait;

/// Storage of conversation sessions keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Appends the user query to the session (creating and seeding it if missing) and
    /// returns a snapshot that ends with that query.
    async fn session_query(&self, query: &str, session_id: &str) -> anyhow::Result<Session>;

    /// Appends an assistant reply to the session.
    async fn session_reply(
        &self,
        reply: &str,
        session_id: &str,
        total_tokens: u64,
    ) -> anyhow::Result<()>;

    /// Returns a snapshot of the session, if it exists.
    async fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>>;

    /// Drops one session's history.
    async fn clear_session(&self, session_id: &str) -> anyhow::Result<()>;

    /// Drops every session.
    async fn clear_all_session(&self) -> anyhow::Result<()>;
}
