//! # Chat backend client
//!
//! Client for the chat backend's `POST /api/chat` endpoint. A call sends
//! `{message, history}` built from a [`session::Session`] and returns either a buffered
//! [`ReplyResult`] ([`ChatBackendClient::reply_text`]) or a lazy stream of answer fragments
//! ([`ChatBackendClient::reply_text_stream`]).
//!
//! Calls are gated by an optional [`TokenBucket`]. Failures clear the session and are
//! turned into a user-facing message by the [`FailurePolicy`] table.

mod chunker;
mod client;
mod error;
mod payload;
mod policy;
mod rate_limit;
mod stream_state;

pub use chunker::{split_text_into_chunks, ChunkError, PARAGRAPH_SEPARATOR};
pub use client::{
    build_http_client, ChatBackendClient, DEFAULT_BACKEND_URL, PLAIN_TEXT_CHUNKS,
    PLAIN_TEXT_CONTENT_TYPE,
};
pub use error::{BackendError, BackendErrorKind};
pub use payload::{parse_answer, ChatArgs, ChatPayload, ReplyResult, DEFAULT_MODEL};
pub use policy::{
    FailureAction, FailurePolicy, PolicyEntry, DEFAULT_MAX_RETRIES, FALLBACK_MESSAGE,
};
pub use rate_limit::TokenBucket;
pub use stream_state::{StreamState, StreamTail, COMPLETION_MARKER, FLUSH_THRESHOLD_CHARS};
