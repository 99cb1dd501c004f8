//! # Bot runtime
//!
//! [`BotController`] turns an incoming `(query, context)` pair into a [`dbot_core::BotReply`]:
//! built-in commands first, then the chat backend (streaming or buffered), or the image
//! backend for image-creation requests. [`BotConfig`] is the immutable configuration it is
//! built from; `#更新配置` loads a new one through the [`ConfigLoader`].

mod commands;
mod config;
mod controller;

pub use commands::{
    match_command, Command, CLEAR_ALL_COMMAND, CLEAR_ALL_REPLY, CLEAR_MEMORY_REPLY,
    RELOAD_CONFIG_COMMAND, RELOAD_CONFIG_REPLY,
};
pub use config::{
    BotConfig, BotType, ConfigLoader, EnvConfigLoader, DEFAULT_AZURE_API_VERSION,
    DEFAULT_CLEAR_MEMORY_COMMAND,
};
pub use controller::{BotController, IMAGE_FAILURE_REPLY};
