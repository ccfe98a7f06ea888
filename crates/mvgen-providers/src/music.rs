//! Music generation (Suno API).
//!
//! Music generation is asynchronous on the provider side: a request is
//! submitted, the returned job is polled until it finishes, and the finished
//! audio is downloaded. The polling loop itself lives in the pipeline; this
//! module only exposes the three calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::http::{ensure_success, env_opt, env_or, fetch_bytes, require_key};

/// A music generation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MusicRequest {
    /// Short prompt used for title generation
    pub prompt: String,
    pub style: String,
    pub tonic: String,
    pub lyrics: String,
}

/// Status of a submitted music job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MusicJobStatus {
    Queued,
    InProgress,
    Complete,
    /// Any other status the provider reports (treated as failure)
    Other(String),
}

impl MusicJobStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "queued" => MusicJobStatus::Queued,
            "in_progress" => MusicJobStatus::InProgress,
            "complete" => MusicJobStatus::Complete,
            other => MusicJobStatus::Other(other.to_string()),
        }
    }

    /// Queued and in-progress jobs are worth polling again.
    pub fn is_pending(&self) -> bool {
        matches!(self, MusicJobStatus::Queued | MusicJobStatus::InProgress)
    }
}

/// Snapshot of a music job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MusicJob {
    pub status: MusicJobStatus,
    pub audio_url: Option<String>,
}

/// Capability: asynchronous music generation.
#[async_trait]
pub trait MusicGenerator: Send + Sync {
    /// Submit a job, returning its provider-side ID.
    async fn submit(&self, request: &MusicRequest) -> ProviderResult<String>;

    /// Fetch the current state of a job.
    async fn poll(&self, job_id: &str) -> ProviderResult<MusicJob>;

    /// Download finished audio.
    async fn fetch(&self, audio_url: &str) -> ProviderResult<Vec<u8>>;
}

const DEFAULT_BASE_URL: &str = "https://api.suno.ai/v1";

/// Configuration for [`SunoClient`].
#[derive(Debug, Clone)]
pub struct SunoConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_version: String,
    /// Timeout for submit and poll requests
    pub request_timeout: Duration,
    /// Timeout for the audio download
    pub download_timeout: Duration,
}

impl Default for SunoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model_version: "v3".to_string(),
            request_timeout: Duration::from_secs(10),
            download_timeout: Duration::from_secs(15),
        }
    }
}

impl SunoConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: env_opt("SUNO_API_KEY"),
            base_url: env_or("SUNO_BASE_URL", DEFAULT_BASE_URL),
            model_version: env_or("SUNO_MODEL_VERSION", "v3"),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    #[serde(flatten)]
    request: &'a MusicRequest,
    model_version: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    generation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    status: String,
    #[serde(default)]
    audio_url: Option<String>,
}

/// Suno API client.
pub struct SunoClient {
    config: SunoConfig,
    client: Client,
}

impl SunoClient {
    pub fn new(config: SunoConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn base(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }
}

#[async_trait]
impl MusicGenerator for SunoClient {
    async fn submit(&self, request: &MusicRequest) -> ProviderResult<String> {
        let api_key = require_key(&self.config.api_key, "SUNO_API_KEY")?;
        info!(
            "Submitting music generation: style={}, tonic={}, lyrics_len={}",
            request.style,
            request.tonic,
            request.lyrics.len()
        );

        let response = self
            .client
            .post(format!("{}/generate", self.base()))
            .bearer_auth(api_key)
            .timeout(self.config.request_timeout)
            .json(&SubmitBody {
                request,
                model_version: &self.config.model_version,
            })
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: SubmitResponse = response.json().await?;
        body.generation_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::invalid_response("Missing generation_id"))
    }

    async fn poll(&self, job_id: &str) -> ProviderResult<MusicJob> {
        let api_key = require_key(&self.config.api_key, "SUNO_API_KEY")?;
        let response = self
            .client
            .get(format!("{}/generations/{}", self.base(), job_id))
            .bearer_auth(api_key)
            .timeout(self.config.request_timeout)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let body: GenerationResponse = response.json().await?;
        debug!(job_id, status = %body.status, "Polled music job");
        Ok(MusicJob {
            status: MusicJobStatus::parse(&body.status),
            audio_url: body.audio_url.filter(|u| !u.is_empty()),
        })
    }

    async fn fetch(&self, audio_url: &str) -> ProviderResult<Vec<u8>> {
        fetch_bytes(&self.client, audio_url, self.config.download_timeout).await
    }
}
