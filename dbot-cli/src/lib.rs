//! # dbot-cli
//!
//! Terminal front end over [`bot_runtime::BotController`]: argument parsing, printing
//! replies as they arrive, and the interactive chat loop.

pub mod cli;

pub use cli::{build_controller, text_context, Cli, Commands, DEFAULT_SESSION_ID};

use anyhow::Result;
use bot_runtime::BotController;
use dbot_core::{BotReply, Context, Reply, ReplyType};
use futures::StreamExt;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Commands that end the interactive loop.
const EXIT_COMMANDS: &[&str] = &["exit", "quit"];

fn render_single(reply: &Reply) -> String {
    match reply.reply_type {
        ReplyType::Text => reply.content.clone(),
        ReplyType::Info => format!("[info] {}", reply.content),
        ReplyType::Error => format!("[error] {}", reply.content),
        ReplyType::ImageUrl => format!("[image] {}", reply.content),
    }
}

/// Writes a reply to `out`, one fragment per line, flushing after each so streamed
/// fragments show up as they arrive.
pub async fn write_reply<W: Write>(reply: BotReply, out: &mut W) -> Result<()> {
    match reply {
        BotReply::Single(reply) => {
            writeln!(out, "{}", render_single(&reply))?;
            out.flush()?;
        }
        BotReply::Fragments(mut fragments) => {
            while let Some(fragment) = fragments.next().await {
                writeln!(out, "{}", fragment)?;
                out.flush()?;
            }
        }
    }
    Ok(())
}

/// Runs the chat loop over `input` until EOF or an exit command.
pub async fn run_chat<R, W>(
    controller: &BotController,
    context: &Context,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    write!(out, "> ")?;
    out.flush()?;
    while let Some(line) = lines.next_line().await? {
        let query = line.trim();
        if EXIT_COMMANDS.contains(&query) {
            break;
        }
        if !query.is_empty() {
            let reply = controller.reply(query, context).await;
            write_reply(reply, out).await?;
        }
        write!(out, "> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}
