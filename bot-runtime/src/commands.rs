//! Text commands handled before the backend is consulted.

use crate::config::BotConfig;

pub const CLEAR_ALL_COMMAND: &str = "#清除所有";
pub const RELOAD_CONFIG_COMMAND: &str = "#更新配置";

pub const CLEAR_MEMORY_REPLY: &str = "记忆已清除";
pub const CLEAR_ALL_REPLY: &str = "所有人记忆已清除";
pub const RELOAD_CONFIG_REPLY: &str = "配置已更新";

const NAVIGATION_QUERY: &str = "我在测试消息跳转";
const NAVIGATION_REPLY: &str =
    "<a href=\"weixin://bizmsgmenu?msgmenucontent=我膝盖不舒服&msgmenuid=1\">请点击文字</a>";
const SATISFIED_QUERY: &str = "满意";
const SATISFIED_REPLY: &str = "感谢您的评价";
const UNSATISFIED_QUERY: &str = "不满意";
const UNSATISFIED_REPLY: &str = "感谢您的评价，请发送 “#反馈 ” 开头的消息给我们提供反馈。如果您对医学回答不满意，请发送您的问题，后台的医生看到消息后会给您提供更专业的医学回答。如果您对产品功能有不满意，请发送您的意见，我们会根据您的意见进行优化。谢谢！";

/// A recognised text command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// One of the configured clear-memory aliases: clears the caller's session.
    ClearMemory,
    /// `#清除所有`: clears every session.
    ClearAll,
    /// `#更新配置`: reloads configuration.
    ReloadConfig,
    /// Fixed reply text (navigation link, satisfaction feedback).
    Canned(&'static str),
}

impl Command {
    /// Reply text sent back after the command ran.
    pub fn reply_text(&self) -> &'static str {
        match self {
            Command::ClearMemory => CLEAR_MEMORY_REPLY,
            Command::ClearAll => CLEAR_ALL_REPLY,
            Command::ReloadConfig => RELOAD_CONFIG_REPLY,
            Command::Canned(text) => text,
        }
    }
}

/// Matches a query exactly against the command table. Clear-memory aliases come from config.
pub fn match_command(query: &str, config: &BotConfig) -> Option<Command> {
    if config.is_clear_memory_command(query) {
        return Some(Command::ClearMemory);
    }
    match query {
        CLEAR_ALL_COMMAND => Some(Command::ClearAll),
        RELOAD_CONFIG_COMMAND => Some(Command::ReloadConfig),
        NAVIGATION_QUERY => Some(Command::Canned(NAVIGATION_REPLY)),
        SATISFIED_QUERY => Some(Command::Canned(SATISFIED_REPLY)),
        UNSATISFIED_QUERY => Some(Command::Canned(UNSATISFIED_REPLY)),
        _ => None,
    }
}
