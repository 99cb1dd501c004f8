//! CLI parser and controller construction.

use anyhow::Result;
use bot_runtime::{BotController, EnvConfigLoader};
use clap::{Parser, Subcommand};
use dbot_core::Context;
use std::sync::Arc;

/// Session id used when none is given.
pub const DEFAULT_SESSION_ID: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "dbot")]
#[command(about = "Chat bot CLI: interactive chat and one-shot questions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Also append logs to this file.
    #[arg(long, global = true)]
    pub log_file: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Interactive chat; one line per message, `exit` or EOF to quit.
    Chat {
        #[arg(short, long, default_value = DEFAULT_SESSION_ID)]
        session: String,
        /// Wait for the whole answer instead of printing fragments as they arrive.
        #[arg(long)]
        buffered: bool,
    },
    /// Ask one question and print the answer.
    Ask {
        text: String,
        #[arg(short, long, default_value = DEFAULT_SESSION_ID)]
        session: String,
        #[arg(long)]
        buffered: bool,
    },
}

/// Text context for `session`; `buffered` selects the non-streaming path.
pub fn text_context(session: &str, buffered: bool) -> Context {
    let context = Context::text(session);
    if buffered {
        context.with_stream(false)
    } else {
        context
    }
}

/// Builds the controller from environment config. Load .env before calling.
pub fn build_controller() -> Result<BotController> {
    Ok(BotController::new(Arc::new(EnvConfigLoader))?)
}
