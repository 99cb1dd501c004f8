//! Azure text-to-image：提交任务后按 Retry-after 轮询 Operation-Location，直到成功。

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument};

use crate::{mask_token, ImageBackend};

pub const AZURE_IMAGE_API_VERSION: &str = "2022-08-03-preview";

/// 轮询次数上限
pub const DEFAULT_MAX_POLLS: u32 = 30;

#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    result: Option<OperationResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperationResult {
    content_url: String,
}

/// Azure 实现
#[derive(Debug, Clone)]
pub struct AzureImageBackend {
    http: reqwest::Client,
    api_key: String,
    /// 以 `/` 结尾，如 `https://xxx.openai.azure.com/`
    api_base: String,
    resolution: String,
    max_polls: u32,
}

impl AzureImageBackend {
    pub fn new(http: reqwest::Client, api_key: String, api_base: String, resolution: String) -> Self {
        Self {
            http,
            api_key,
            api_base,
            resolution,
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    pub fn with_max_polls(mut self, max_polls: u32) -> Self {
        self.max_polls = max_polls;
        self
    }

    fn submit_url(&self) -> String {
        format!(
            "{}dalle/text-to-image?api-version={}",
            self.api_base, AZURE_IMAGE_API_VERSION
        )
    }
}

#[async_trait]
impl ImageBackend for AzureImageBackend {
    #[instrument(skip(self, api_key))]
    async fn create_image(&self, prompt: &str, api_key: Option<&str>) -> Result<String> {
        let api_key = api_key.unwrap_or(&self.api_key);
        info!(
            resolution = %self.resolution,
            api_key = %mask_token(api_key),
            "Azure image generation request"
        );

        let submission = self
            .http
            .post(self.submit_url())
            .header("api-key", api_key)
            .json(&json!({ "caption": prompt, "resolution": self.resolution }))
            .send()
            .await?
            .error_for_status()?;

        let operation_location = submission
            .headers()
            .get("Operation-Location")
            .and_then(|v| v.to_str().ok())
            .context("Missing Operation-Location header")?
            .to_string();
        let retry_after: u64 = submission
            .headers()
            .get("Retry-after")
            .and_then(|v| v.to_str().ok())
            .context("Missing Retry-after header")?
            .trim()
            .parse()
            .context("Invalid Retry-after header")?;

        let mut status = String::new();
        for _ in 0..self.max_polls {
            info!(status = %status, retry_after, "Waiting for image creation");
            tokio::time::sleep(Duration::from_secs(retry_after)).await;

            let operation: OperationStatus = self
                .http
                .get(&operation_location)
                .header("api-key", api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match operation.status.as_str() {
                "Succeeded" => {
                    let url = operation
                        .result
                        .context("Succeeded operation has no result")?
                        .content_url;
                    info!(image_url = %url, "Azure image generation completed");
                    return Ok(url);
                }
                "Failed" | "Canceled" => {
                    anyhow::bail!("Image operation ended with status {}", operation.status)
                }
                _ => status = operation.status,
            }
        }

        anyhow::bail!(
            "Image operation not finished after {} polls (last status: {})",
            self.max_polls,
            status
        )
    }
}
