//! Image generation (OpenAI Images API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::http::{ensure_success, env_opt, env_or, fetch_bytes, require_key};

/// Capability: generate an image for a prompt and download it.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image, returning the URL it can be downloaded from.
    async fn generate(&self, prompt: &str) -> ProviderResult<String>;

    /// Download a generated image.
    async fn fetch(&self, image_url: &str) -> ProviderResult<Vec<u8>>;
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Configuration for [`OpenAiImageClient`].
#[derive(Debug, Clone)]
pub struct OpenAiImageConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub size: String,
    pub timeout: Duration,
}

impl Default for OpenAiImageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "dall-e-3".to_string(),
            size: "1024x1024".to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiImageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: env_opt("OPENAI_API_KEY"),
            base_url: env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or("IMAGE_MODEL", "dall-e-3"),
            size: env_or("IMAGE_SIZE", "1024x1024"),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct ImagesRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    #[serde(default)]
    url: Option<String>,
}

/// OpenAI Images API client.
pub struct OpenAiImageClient {
    config: OpenAiImageConfig,
    client: Client,
}

impl OpenAiImageClient {
    pub fn new(config: OpenAiImageConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ImageGenerator for OpenAiImageClient {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        let api_key = require_key(&self.config.api_key, "OPENAI_API_KEY")?;
        let url = format!(
            "{}/v1/images/generations",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ImagesRequest {
            model: &self.config.model,
            prompt,
            n: 1,
            size: &self.config.size,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: ImagesResponse = response.json().await?;
        let image_url = body
            .data
            .into_iter()
            .next()
            .and_then(|d| d.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ProviderError::invalid_response("Image response has no URL"))?;
        debug!("Image generated at {}", image_url);
        Ok(image_url)
    }

    async fn fetch(&self, image_url: &str) -> ProviderResult<Vec<u8>> {
        fetch_bytes(&self.client, image_url, self.config.timeout).await
    }
}
