//! 图片生成能力接口
//!
//! [`ImageBackend`] 是 bot 调用文生图的唯一入口；具体实现按配置选择：
//! [`OpenAiImageBackend`]（DALL-E）或 [`AzureImageBackend`]（Azure text-to-image，轮询结果）。

mod azure;
mod openai;

pub use azure::{AzureImageBackend, AZURE_IMAGE_API_VERSION, DEFAULT_MAX_POLLS};
pub use openai::{parse_image_size, OpenAiImageBackend, DEFAULT_IMAGE_MODEL};

use async_trait::async_trait;
use std::sync::Arc;

/// 默认图片尺寸
pub const DEFAULT_IMAGE_SIZE: &str = "256x256";

/// 文生图能力：根据描述返回图片 URL。
#[async_trait]
pub trait ImageBackend: Send + Sync {
    /// 生成图片。`api_key` 为调用方提供的密钥，覆盖配置中的密钥。
    async fn create_image(&self, prompt: &str, api_key: Option<&str>) -> anyhow::Result<String>;
}

/// 图片服务提供方
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageProvider {
    OpenAi,
    Azure,
}

/// 构造 [`ImageBackend`] 所需的配置
#[derive(Debug, Clone)]
pub struct ImageBackendConfig {
    pub provider: ImageProvider,
    pub api_key: String,
    pub api_base: Option<String>,
    /// 如 "256x256"
    pub size: String,
}

/// 按配置选择实现
pub fn build_image_backend(
    config: &ImageBackendConfig,
    http: reqwest::Client,
) -> anyhow::Result<Arc<dyn ImageBackend>> {
    match config.provider {
        ImageProvider::OpenAi => Ok(Arc::new(OpenAiImageBackend::new(
            config.api_key.clone(),
            config.api_base.clone(),
            &config.size,
        ))),
        ImageProvider::Azure => {
            let api_base = config
                .api_base
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Azure image backend requires an API base URL"))?;
            Ok(Arc::new(AzureImageBackend::new(
                http,
                config.api_key.clone(),
                api_base,
                config.size.clone(),
            )))
        }
    }
}

/// Masks an API key for logging: first 7 chars + "***" + last 4 chars.
/// If length <= 11, returns "***" to avoid leaking any part of the key.
pub fn mask_token(token: &str) -> String {
    let len = token.len();
    if len <= 11 || !token.is_char_boundary(7) || !token.is_char_boundary(len - 4) {
        "***".to_string()
    } else {
        format!("{}***{}", &token[..7], &token[len - 4..])
    }
}
