//! CLI parsing and chat loop tests.
//!
//! BDD style: each test documents scenario and expected outcome.

use bot_runtime::{BotConfig, BotController, ConfigLoader};
use clap::Parser;
use dbot_cli::{run_chat, text_context, Cli, Commands, DEFAULT_SESSION_ID};
use std::sync::Arc;

/// **Test: `chat` defaults to the cli session in streaming mode.**
#[test]
fn parse_chat_defaults() {
    let cli = Cli::try_parse_from(["dbot", "chat"]).unwrap();
    assert_eq!(
        cli.command,
        Commands::Chat {
            session: DEFAULT_SESSION_ID.to_string(),
            buffered: false,
        }
    );
    assert!(cli.log_file.is_none());
}

/// **Test: `ask` takes the question plus session and buffered flags.**
#[test]
fn parse_ask_with_flags() {
    let cli = Cli::try_parse_from([
        "dbot",
        "ask",
        "头疼怎么办",
        "--session",
        "u7",
        "--buffered",
        "--log-file",
        "logs/dbot.log",
    ])
    .unwrap();
    assert_eq!(
        cli.command,
        Commands::Ask {
            text: "头疼怎么办".to_string(),
            session: "u7".to_string(),
            buffered: true,
        }
    );
    assert_eq!(cli.log_file.as_deref(), Some("logs/dbot.log"));
}

/// **Test: `ask` without a question is rejected.**
#[test]
fn parse_ask_requires_text() {
    assert!(Cli::try_parse_from(["dbot", "ask"]).is_err());
}

#[test]
fn buffered_flag_selects_non_streaming_context() {
    assert!(text_context("u1", false).wants_stream());
    assert!(!text_context("u1", true).wants_stream());
}

/// **Test: The chat loop answers each line and stops at `exit`.**
///
/// **Expected:** fragments printed line by line; the clear command answers with an info tag;
/// input after `exit` is ignored.
#[tokio::test]
async fn chat_loop_prints_fragments_until_exit() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .with_header("content-type", "text/plain; charset=utf-8")
        .with_body("多喝水")
        .expect(1)
        .create_async()
        .await;

    let config = BotConfig {
        backend_url: format!("{}/api/chat", server.url()),
        ..BotConfig::default()
    };
    let loader: Arc<dyn ConfigLoader> =
        Arc::new(move || -> dbot_core::Result<BotConfig> { Ok(config.clone()) });
    let controller = BotController::new(loader).unwrap();

    let input: &[u8] = "感冒了\n\n#清除记忆\nexit\n不会被发送\n".as_bytes();
    let mut out = Vec::new();
    run_chat(&controller, &text_context("u1", false), input, &mut out)
        .await
        .unwrap();

    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("多喝水\n问题回答完毕\n"));
    assert!(printed.contains("[info] 记忆已清除\n"));
    mock.assert_async().await;
}
