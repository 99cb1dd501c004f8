//! Bot configuration: an immutable value loaded from env. A reload builds a new value.

use chat_backend_client::{ChatArgs, FailurePolicy, DEFAULT_BACKEND_URL, DEFAULT_MODEL};
use dbot_core::{DbotError, Result};
use image_generation_client::{ImageBackendConfig, ImageProvider, DEFAULT_IMAGE_SIZE};
use session::{DEFAULT_MAX_TURNS, DEFAULT_SYSTEM_PROMPT};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CLEAR_MEMORY_COMMAND: &str = "#清除记忆";
pub const DEFAULT_AZURE_API_VERSION: &str = "2023-06-01-preview";

/// Which provider flavour the bot runs as. Selects the image backend and Azure chat args.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotType {
    OpenAi,
    Azure,
}

impl FromStr for BotType {
    type Err = DbotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(BotType::OpenAi),
            "azure" => Ok(BotType::Azure),
            other => Err(DbotError::Config(format!("Unknown BOT_TYPE: {}", other))),
        }
    }
}

/// Full bot configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// MODEL
    pub model: String,
    /// TEMPERATURE
    pub temperature: f32,
    /// TOP_P
    pub top_p: f32,
    /// FREQUENCY_PENALTY
    pub frequency_penalty: f32,
    /// PRESENCE_PENALTY
    pub presence_penalty: f32,
    /// REQUEST_TIMEOUT (seconds)
    pub request_timeout: Option<u64>,
    /// RATE_LIMIT_CHATGPT (calls per minute); unset or 0 disables gating
    pub rate_limit_chatgpt: Option<u32>,
    /// CLEAR_MEMORY_COMMANDS, comma separated
    pub clear_memory_commands: Vec<String>,
    /// IMAGE_CREATE_SIZE
    pub image_create_size: String,
    /// AZURE_API_VERSION
    pub azure_api_version: String,
    /// AZURE_DEPLOYMENT_ID
    pub azure_deployment_id: Option<String>,
    /// BOT_TYPE
    pub bot_type: BotType,
    /// OPEN_AI_API_KEY
    pub open_ai_api_key: String,
    /// OPEN_AI_API_BASE
    pub open_ai_api_base: Option<String>,
    /// PROXY
    pub proxy: Option<String>,
    /// CHAT_BACKEND_URL
    pub backend_url: String,
    /// CHARACTER_DESC: seed system turn of every session
    pub character_desc: String,
    /// CONVERSATION_MAX_TURNS
    pub conversation_max_turns: usize,
    /// BACKEND_RETRY_ENABLED
    pub retry_enabled: bool,
    /// BACKEND_DISTINCT_ERROR_MESSAGES
    pub distinct_error_messages: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.9,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            request_timeout: None,
            rate_limit_chatgpt: None,
            clear_memory_commands: vec![DEFAULT_CLEAR_MEMORY_COMMAND.to_string()],
            image_create_size: DEFAULT_IMAGE_SIZE.to_string(),
            azure_api_version: DEFAULT_AZURE_API_VERSION.to_string(),
            azure_deployment_id: None,
            bot_type: BotType::OpenAi,
            open_ai_api_key: String::new(),
            open_ai_api_base: None,
            proxy: None,
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            character_desc: DEFAULT_SYSTEM_PROMPT.to_string(),
            conversation_max_turns: DEFAULT_MAX_TURNS,
            retry_enabled: false,
            distinct_error_messages: false,
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match env_opt(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DbotError::Config(format!("{} is not valid: {}", key, raw))),
    }
}

impl BotConfig {
    /// Load from environment variables; unset keys take their defaults.
    /// Call validate() after load to check config before use.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let clear_memory_commands = env_opt("CLEAR_MEMORY_COMMANDS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.clear_memory_commands);

        Ok(Self {
            model: env_opt("MODEL").unwrap_or(defaults.model),
            temperature: env_parse("TEMPERATURE")?.unwrap_or(defaults.temperature),
            top_p: env_parse("TOP_P")?.unwrap_or(defaults.top_p),
            frequency_penalty: env_parse("FREQUENCY_PENALTY")?
                .unwrap_or(defaults.frequency_penalty),
            presence_penalty: env_parse("PRESENCE_PENALTY")?.unwrap_or(defaults.presence_penalty),
            request_timeout: env_parse("REQUEST_TIMEOUT")?,
            rate_limit_chatgpt: env_parse("RATE_LIMIT_CHATGPT")?,
            clear_memory_commands,
            image_create_size: env_opt("IMAGE_CREATE_SIZE").unwrap_or(defaults.image_create_size),
            azure_api_version: env_opt("AZURE_API_VERSION").unwrap_or(defaults.azure_api_version),
            azure_deployment_id: env_opt("AZURE_DEPLOYMENT_ID"),
            bot_type: env_parse("BOT_TYPE")?.unwrap_or(defaults.bot_type),
            open_ai_api_key: env_opt("OPEN_AI_API_KEY").unwrap_or_default(),
            open_ai_api_base: env_opt("OPEN_AI_API_BASE"),
            proxy: env_opt("PROXY"),
            backend_url: env_opt("CHAT_BACKEND_URL").unwrap_or(defaults.backend_url),
            character_desc: env_opt("CHARACTER_DESC").unwrap_or(defaults.character_desc),
            conversation_max_turns: env_parse("CONVERSATION_MAX_TURNS")?
                .unwrap_or(defaults.conversation_max_turns),
            retry_enabled: env_parse("BACKEND_RETRY_ENABLED")?.unwrap_or(defaults.retry_enabled),
            distinct_error_messages: env_parse("BACKEND_DISTINCT_ERROR_MESSAGES")?
                .unwrap_or(defaults.distinct_error_messages),
        })
    }

    /// Validate config (URLs parse, Azure has an API base).
    pub fn validate(&self) -> Result<()> {
        if reqwest::Url::parse(&self.backend_url).is_err() {
            return Err(DbotError::Config(format!(
                "CHAT_BACKEND_URL is not a valid URL: {}",
                self.backend_url
            )));
        }
        if let Some(ref base) = self.open_ai_api_base {
            if reqwest::Url::parse(base).is_err() {
                return Err(DbotError::Config(format!(
                    "OPEN_AI_API_BASE is set but not a valid URL: {}",
                    base
                )));
            }
        }
        if self.bot_type == BotType::Azure && self.open_ai_api_base.is_none() {
            return Err(DbotError::Config(
                "BOT_TYPE=azure requires OPEN_AI_API_BASE".to_string(),
            ));
        }
        if self.conversation_max_turns == 0 {
            return Err(DbotError::Config(
                "CONVERSATION_MAX_TURNS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn is_clear_memory_command(&self, query: &str) -> bool {
        self.clear_memory_commands.iter().any(|c| c == query)
    }

    /// Chat arguments for the backend client; Azure carries its deployment id.
    pub fn chat_args(&self) -> ChatArgs {
        ChatArgs {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            presence_penalty: self.presence_penalty,
            request_timeout: self.request_timeout.map(Duration::from_secs),
            deployment_id: match self.bot_type {
                BotType::Azure => self.azure_deployment_id.clone(),
                BotType::OpenAi => None,
            },
        }
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::default()
            .with_retry(self.retry_enabled)
            .with_distinct_messages(self.distinct_error_messages)
    }

    pub fn image_backend_config(&self) -> ImageBackendConfig {
        ImageBackendConfig {
            provider: match self.bot_type {
                BotType::OpenAi => ImageProvider::OpenAi,
                BotType::Azure => ImageProvider::Azure,
            },
            api_key: self.open_ai_api_key.clone(),
            api_base: self.open_ai_api_base.clone(),
            size: self.image_create_size.clone(),
        }
    }
}

/// Source of configuration for the initial load and for `#更新配置`.
pub trait ConfigLoader: Send + Sync {
    fn load(&self) -> Result<BotConfig>;
}

/// Loads [`BotConfig`] from environment variables and validates it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigLoader;

impl ConfigLoader for EnvConfigLoader {
    fn load(&self) -> Result<BotConfig> {
        let config = BotConfig::from_env()?;
        config.validate()?;
        Ok(config)
    }
}

impl<F> ConfigLoader for F
where
    F: Fn() -> Result<BotConfig> + Send + Sync,
{
    fn load(&self) -> Result<BotConfig> {
        self()
    }
}
