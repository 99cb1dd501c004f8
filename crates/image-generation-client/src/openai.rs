//! OpenAI DALL-E 图片生成

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::{CreateImageRequestArgs, Image, ImageModel, ImageSize},
    Client,
};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::{mask_token, ImageBackend};

/// 默认模型（支持 256x256）
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-2";

/// 把配置中的尺寸字符串映射为 [`ImageSize`]；未知值退回 256x256。
pub fn parse_image_size(size: &str) -> ImageSize {
    match size {
        "256x256" => ImageSize::S256x256,
        "512x512" => ImageSize::S512x512,
        "1024x1024" => ImageSize::S1024x1024,
        "1792x1024" => ImageSize::S1792x1024,
        "1024x1792" => ImageSize::S1024x1792,
        other => {
            warn!(size = %other, "Unknown image size, using 256x256");
            ImageSize::S256x256
        }
    }
}

fn image_model(name: &str) -> ImageModel {
    match name {
        "dall-e-2" => ImageModel::DallE2,
        "dall-e-3" => ImageModel::DallE3,
        other => ImageModel::Other(other.to_string()),
    }
}

/// OpenAI DALL-E 实现
#[derive(Debug, Clone)]
pub struct OpenAiImageBackend {
    api_key: String,
    api_base: Option<String>,
    model: String,
    size: ImageSize,
}

impl OpenAiImageBackend {
    pub fn new(api_key: String, api_base: Option<String>, size: &str) -> Self {
        Self {
            api_key,
            api_base,
            model: DEFAULT_IMAGE_MODEL.to_string(),
            size: parse_image_size(size),
        }
    }

    fn client(&self, api_key: &str) -> Client<OpenAIConfig> {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = &self.api_base {
            config = config.with_api_base(base);
        }
        Client::with_config(config)
    }
}

#[async_trait]
impl ImageBackend for OpenAiImageBackend {
    #[instrument(skip(self, api_key))]
    async fn create_image(&self, prompt: &str, api_key: Option<&str>) -> Result<String> {
        let api_key = api_key.unwrap_or(&self.api_key);

        info!(
            model = %self.model,
            size = ?self.size,
            prompt_preview = %prompt.chars().take(100).collect::<String>(),
            api_key = %mask_token(api_key),
            "OpenAI image generation request"
        );

        let request = CreateImageRequestArgs::default()
            .prompt(prompt)
            .model(image_model(&self.model))
            .size(self.size)
            .n(1)
            .build()?;

        let response = self.client(api_key).images().create(request).await?;

        match response.data.first().map(|image| image.as_ref()) {
            Some(Image::Url { url, .. }) => {
                info!(image_url = %url, "OpenAI image generation completed");
                Ok(url.clone())
            }
            _ => anyhow::bail!("No image URL in response"),
        }
    }
}
