//! # dbot-core
//!
//! Core types shared by the bot adapter crates: the inbound [`Context`], the outward reply
//! protocol ([`Reply`], [`BotReply`]), the crate-spanning [`DbotError`], and tracing
//! initialization. Transport-agnostic; used by bot-runtime, the backend client and the CLI.

pub mod error;
pub mod logger;
pub mod types;

pub use error::{DbotError, Result};
pub use logger::init_tracing;
pub use types::{BotReply, Context, ContextType, FragmentStream, Reply, ReplyType};
