//! Application state.

use std::sync::Arc;

use mvgen_pipeline::{Pipeline, PipelineConfig, Providers};
use mvgen_providers::{
    AnthropicClient, AnthropicConfig, OpenAiImageClient, OpenAiImageConfig, SunoClient, SunoConfig,
};
use mvgen_storage::LocalArtifactStore;
use tracing::{info, warn};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Wrap an already built pipeline.
    pub fn with_pipeline(config: ApiConfig, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline: Arc::new(pipeline),
        }
    }

    /// Create application state from the environment.
    ///
    /// Provider clients are built even without API keys; their calls then
    /// fail and the pipeline takes its fallback paths.
    pub async fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let pipeline_config = PipelineConfig::from_env();
        let store = Arc::new(LocalArtifactStore::new(&pipeline_config.output_dir));
        let providers = Providers {
            text: Arc::new(AnthropicClient::new(AnthropicConfig::from_env())),
            music: Arc::new(SunoClient::new(SunoConfig::from_env())),
            image: Arc::new(OpenAiImageClient::new(OpenAiImageConfig::from_env())),
        };

        let pipeline = Pipeline::builder(pipeline_config, store, providers).build();
        pipeline.init().await?;

        if config.seed_fallbacks {
            match pipeline.seed_fallbacks().await {
                Ok(0) => {}
                Ok(n) => info!("Seeded {} fallback assets", n),
                Err(e) => warn!("Failed to seed fallback assets: {}", e),
            }
        }

        Ok(Self::with_pipeline(config, pipeline))
    }
}
