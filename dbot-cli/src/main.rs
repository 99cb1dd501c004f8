//! dbot CLI: interactive chat and one-shot questions. Config from env (.env is loaded).

use anyhow::Result;
use clap::Parser;
use dbot_cli::{build_controller, run_chat, text_context, write_reply, Cli, Commands};
use tokio::io::BufReader;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    dbot_core::init_tracing(cli.log_file.as_deref())?;

    let controller = build_controller()?;
    let mut stdout = std::io::stdout();

    match cli.command {
        Commands::Chat { session, buffered } => {
            info!(session = %session, buffered, "Starting interactive chat");
            let context = text_context(&session, buffered);
            run_chat(
                &controller,
                &context,
                BufReader::new(tokio::io::stdin()),
                &mut stdout,
            )
            .await
        }
        Commands::Ask {
            text,
            session,
            buffered,
        } => {
            let context = text_context(&session, buffered);
            let reply = controller.reply(&text, &context).await;
            write_reply(reply, &mut stdout).await
        }
    }
}
