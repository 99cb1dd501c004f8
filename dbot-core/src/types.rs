//! Core types: inbound context, reply kinds, and the single reply result type.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::pin::Pin;

/// Kind of an incoming message, as classified by the messaging front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextType {
    Text,
    ImageCreate,
    Voice,
    Image,
    File,
    Sharing,
    /// Any type the front end knows about but this crate does not.
    Other(String),
}

impl fmt::Display for ContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextType::Text => f.write_str("TEXT"),
            ContextType::ImageCreate => f.write_str("IMAGE_CREATE"),
            ContextType::Voice => f.write_str("VOICE"),
            ContextType::Image => f.write_str("IMAGE"),
            ContextType::File => f.write_str("FILE"),
            ContextType::Sharing => f.write_str("SHARING"),
            ContextType::Other(name) => f.write_str(name),
        }
    }
}

/// Per-call context accompanying a query: who is asking and how to answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Context {
    pub context_type: ContextType,
    pub session_id: String,
    /// Caller-supplied API key; overrides the configured one for image creation.
    pub openai_api_key: Option<String>,
    /// Model override for this call only.
    pub gpt_model: Option<String>,
    /// `Some(false)` selects the buffered reply path; anything else streams.
    pub stream: Option<bool>,
}

impl Context {
    pub fn new(context_type: ContextType, session_id: impl Into<String>) -> Self {
        Self {
            context_type,
            session_id: session_id.into(),
            openai_api_key: None,
            gpt_model: None,
            stream: None,
        }
    }

    pub fn text(session_id: impl Into<String>) -> Self {
        Self::new(ContextType::Text, session_id)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gpt_model = Some(model.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.openai_api_key = Some(api_key.into());
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    /// True unless the caller explicitly asked for a buffered reply.
    pub fn wants_stream(&self) -> bool {
        self.stream != Some(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyType {
    Text,
    Info,
    Error,
    ImageUrl,
}

/// A complete, single reply to the front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub reply_type: ReplyType,
    pub content: String,
}

impl Reply {
    pub fn new(reply_type: ReplyType, content: impl Into<String>) -> Self {
        Self {
            reply_type,
            content: content.into(),
        }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::new(ReplyType::Text, content)
    }

    pub fn info(content: impl Into<String>) -> Self {
        Self::new(ReplyType::Info, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(ReplyType::Error, content)
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::new(ReplyType::ImageUrl, url)
    }
}

/// Lazy, finite, ordered sequence of answer fragments. Dropping it stops retrieval and
/// releases the underlying HTTP response.
pub type FragmentStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Result of handling one query: either a single reply or a stream of fragments.
pub enum BotReply {
    Single(Reply),
    Fragments(FragmentStream),
}

impl BotReply {
    /// Returns the single reply, if this is not a fragment stream.
    pub fn as_single(&self) -> Option<&Reply> {
        match self {
            BotReply::Single(reply) => Some(reply),
            BotReply::Fragments(_) => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, BotReply::Fragments(_))
    }

    /// Drains the reply into plain strings, for front ends that cannot forward fragments
    /// as they arrive.
    pub async fn collect(self) -> Vec<String> {
        match self {
            BotReply::Single(reply) => vec![reply.content],
            BotReply::Fragments(stream) => stream.collect().await,
        }
    }
}

impl From<Reply> for BotReply {
    fn from(reply: Reply) -> Self {
        BotReply::Single(reply)
    }
}

impl fmt::Debug for BotReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotReply::Single(reply) => f.debug_tuple("Single").field(reply).finish(),
            BotReply::Fragments(_) => f.write_str("Fragments(..)"),
        }
    }
}
