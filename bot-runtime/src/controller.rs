//! Per-message dispatch: commands, session lifecycle, chat backend and image delegation.

use chat_backend_client::{build_http_client, ChatBackendClient, TokenBucket, FALLBACK_MESSAGE};
use dbot_core::{BotReply, Context, ContextType, DbotError, Reply, Result};
use image_generation_client::{build_image_backend, ImageBackend};
use session::{InMemorySessionStore, SessionStore};
use std::sync::{Arc, RwLock};
use tracing::{error, info, instrument, warn};

use crate::commands::{match_command, Command};
use crate::config::{BotConfig, ConfigLoader};

/// Reply sent when image generation fails.
pub const IMAGE_FAILURE_REPLY: &str = "图片生成失败";

/// Everything derived from one configuration value. Rebuilt as a whole on reload.
struct Runtime {
    config: Arc<BotConfig>,
    backend: ChatBackendClient,
    image: Arc<dyn ImageBackend>,
}

fn build_runtime(
    config: BotConfig,
    sessions: Arc<dyn SessionStore>,
    image_override: Option<Arc<dyn ImageBackend>>,
) -> Result<Runtime> {
    let http = build_http_client(config.proxy.as_deref())?;

    let mut backend =
        ChatBackendClient::new(config.backend_url.clone(), config.chat_args(), sessions)
            .with_http_client(http.clone())
            .with_policy(config.failure_policy());
    if let Some(per_minute) = config.rate_limit_chatgpt.filter(|rate| *rate > 0) {
        backend = backend.with_rate_limiter(Arc::new(TokenBucket::new(per_minute)));
    }

    let image = match image_override {
        Some(image) => image,
        None => build_image_backend(&config.image_backend_config(), http)
            .map_err(|e| DbotError::Config(e.to_string()))?,
    };

    Ok(Runtime {
        config: Arc::new(config),
        backend,
        image,
    })
}

/// Entry point for incoming messages.
///
/// Holds the current configuration and the clients built from it. `#更新配置` swaps in a
/// freshly loaded runtime; calls already in flight keep the one they started with.
pub struct BotController {
    runtime: RwLock<Arc<Runtime>>,
    loader: Arc<dyn ConfigLoader>,
    sessions: Arc<dyn SessionStore>,
    image_override: Option<Arc<dyn ImageBackend>>,
}

impl BotController {
    /// Loads config and creates an in-memory session store seeded with `character_desc`.
    pub fn new(loader: Arc<dyn ConfigLoader>) -> Result<Self> {
        let config = loader.load()?;
        let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(
            config.character_desc.clone(),
            config.conversation_max_turns,
        ));
        Self::from_parts(loader, config, sessions, None)
    }

    /// Uses the given session store instead of an in-memory one.
    pub fn with_sessions(
        loader: Arc<dyn ConfigLoader>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let config = loader.load()?;
        Self::from_parts(loader, config, sessions, None)
    }

    fn from_parts(
        loader: Arc<dyn ConfigLoader>,
        config: BotConfig,
        sessions: Arc<dyn SessionStore>,
        image_override: Option<Arc<dyn ImageBackend>>,
    ) -> Result<Self> {
        let runtime = build_runtime(config, sessions.clone(), image_override.clone())?;
        Ok(Self {
            runtime: RwLock::new(Arc::new(runtime)),
            loader,
            sessions,
            image_override,
        })
    }

    /// Replaces the configured image backend, including across reloads.
    pub fn with_image_backend(mut self, image: Arc<dyn ImageBackend>) -> Self {
        let current = self.current();
        self.runtime = RwLock::new(Arc::new(Runtime {
            config: current.config.clone(),
            backend: current.backend.clone(),
            image: image.clone(),
        }));
        self.image_override = Some(image);
        self
    }

    pub fn config(&self) -> Arc<BotConfig> {
        self.current().config.clone()
    }

    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.sessions.clone()
    }

    fn current(&self) -> Arc<Runtime> {
        self.runtime
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Loads a new config and swaps the runtime. The old runtime stays on failure.
    pub fn reload_config(&self) -> Result<()> {
        let config = self.loader.load()?;
        let runtime = build_runtime(config, self.sessions.clone(), self.image_override.clone())?;
        *self
            .runtime
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Arc::new(runtime);
        info!("Configuration reloaded");
        Ok(())
    }

    /// Handles one incoming message.
    #[instrument(skip(self, query, context), fields(session_id = %context.session_id, context_type = %context.context_type))]
    pub async fn reply(&self, query: &str, context: &Context) -> BotReply {
        match &context.context_type {
            ContextType::Text => self.reply_text(query, context).await,
            ContextType::ImageCreate => self.create_image(query, context).await.into(),
            other => {
                warn!(context_type = %other, "Unsupported context type");
                Reply::error(format!("Bot不支持处理{}类型的消息", other)).into()
            }
        }
    }

    async fn reply_text(&self, query: &str, context: &Context) -> BotReply {
        let runtime = self.current();
        info!(query_len = query.chars().count(), "Text query");

        if let Some(command) = match_command(query, &runtime.config) {
            return self.run_command(command, &context.session_id).await.into();
        }

        let session = match self.sessions.session_query(query, &context.session_id).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Failed to update session");
                return Reply::error(FALLBACK_MESSAGE).into();
            }
        };
        let args = context
            .gpt_model
            .as_deref()
            .map(|model| runtime.backend.args().with_model(model));

        if context.wants_stream() {
            return BotReply::Fragments(runtime.backend.reply_text_stream(session, args));
        }

        let result = runtime.backend.reply_text(&session, args.as_ref()).await;
        if result.is_failure() {
            return Reply::error(result.content).into();
        }
        if let Err(e) = self
            .sessions
            .session_reply(&result.content, &context.session_id, result.total_tokens)
            .await
        {
            warn!(error = %e, "Failed to record reply in session");
        }
        Reply::text(result.content).into()
    }

    async fn run_command(&self, command: Command, session_id: &str) -> Reply {
        info!(command = ?command, "Command matched");
        let outcome = match &command {
            Command::ClearMemory => self
                .sessions
                .clear_session(session_id)
                .await
                .map_err(|e| DbotError::Session(e.to_string())),
            Command::ClearAll => self
                .sessions
                .clear_all_session()
                .await
                .map_err(|e| DbotError::Session(e.to_string())),
            Command::ReloadConfig => self.reload_config(),
            Command::Canned(_) => {
                if let Err(e) = self.reload_config() {
                    warn!(error = %e, "Config reload alongside canned reply failed");
                }
                return Reply::text(command.reply_text());
            }
        };

        match outcome {
            Ok(()) => Reply::info(command.reply_text()),
            Err(e) => {
                error!(error = %e, "Command failed");
                Reply::error(e.to_string())
            }
        }
    }

    async fn create_image(&self, prompt: &str, context: &Context) -> Reply {
        let runtime = self.current();
        match runtime
            .image
            .create_image(prompt, context.openai_api_key.as_deref())
            .await
        {
            Ok(url) => Reply::image_url(url),
            Err(e) => {
                error!(error = %e, "Image generation failed");
                Reply::error(IMAGE_FAILURE_REPLY)
            }
        }
    }
}
