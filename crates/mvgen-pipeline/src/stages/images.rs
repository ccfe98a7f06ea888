use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use mvgen_models::{ArtifactKind, ArtifactRef, ProjectId, ProjectRecord, Stage};
use mvgen_providers::ImageGenerator;
use mvgen_storage::ArtifactName;

use super::{PipelineStage, StageContext};
use crate::error::{PipelineResult, StageError};
use crate::line_selector::select_key_lines;
use crate::logging::StageLogger;
use crate::metrics::record_provider_failure;

/// Image prompt for one key line.
pub fn image_prompt(line: &str) -> String {
    format!(
        "Create a visually striking scene for a music video based on these lyrics: \"{}\". \
         Make the image cinematic, emotionally resonant, and visually rich.",
        line
    )
}

fn key_lines(project: &ProjectRecord) -> PipelineResult<Vec<String>> {
    let lines = select_key_lines(&project.lyrics);
    if lines.is_empty() {
        return Err(StageError::missing_upstream("lyrics contain no key lines"));
    }
    Ok(lines)
}

/// Illustrates the project's key lines, one image each.
pub struct ImageStage {
    ctx: StageContext,
    provider: Arc<dyn ImageGenerator>,
}

impl ImageStage {
    pub fn new(ctx: StageContext, provider: Arc<dyn ImageGenerator>) -> Self {
        Self { ctx, provider }
    }

    async fn generate_one(
        &self,
        project: &ProjectId,
        index: usize,
        line: &str,
    ) -> PipelineResult<ArtifactRef> {
        let url = self.provider.generate(&image_prompt(line)).await?;
        let bytes = self.provider.fetch(&url).await?;
        let artifact = self
            .ctx
            .store
            .write_artifact(
                ArtifactKind::Image,
                project,
                ArtifactName::new("png").with_index(index),
                &bytes,
            )
            .await?;
        Ok(artifact)
    }

    async fn placeholder(
        &self,
        project: &ProjectId,
        index: usize,
        line: &str,
        source: Option<&Path>,
        log: &StageLogger,
    ) -> PipelineResult<ArtifactRef> {
        if let Some(source) = source {
            let ext = source
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("png");
            match self
                .ctx
                .store
                .copy_artifact(
                    ArtifactKind::Image,
                    project,
                    ArtifactName::new(ext).with_index(index),
                    source,
                )
                .await
            {
                Ok(artifact) => return Ok(artifact.as_placeholder()),
                Err(e) => log.log_warning(&format!(
                    "Could not copy placeholder {}: {}",
                    source.display(),
                    e
                )),
            }
        }

        // Text stand-in carrying the line it would have illustrated
        let artifact = self
            .ctx
            .store
            .write_artifact(
                ArtifactKind::Image,
                project,
                ArtifactName::new("txt").with_index(index),
                line.as_bytes(),
            )
            .await?;
        Ok(artifact.as_placeholder())
    }
}

#[async_trait]
impl PipelineStage for ImageStage {
    fn stage(&self) -> Stage {
        Stage::Images
    }

    /// One provider call per key line, sequentially. A failed line is
    /// skipped; the stage fails only when every line failed.
    async fn primary(
        &self,
        project: &ProjectRecord,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>> {
        let lines = key_lines(project)?;
        log.log_progress(&format!("illustrating {} key lines", lines.len()));

        let mut artifacts = Vec::with_capacity(lines.len());
        let mut last_error = None;
        for (index, line) in lines.iter().enumerate() {
            match self.generate_one(&project.id, index, line).await {
                Ok(artifact) => {
                    artifacts.push(artifact);
                    self.ctx.clock.sleep(self.ctx.config.image_request_delay).await;
                }
                Err(e) => {
                    record_provider_failure(Stage::Images);
                    log.log_warning(&format!("line {} failed: {}", index, e));
                    last_error = Some(e);
                }
            }
        }

        if artifacts.is_empty() {
            return Err(last_error
                .unwrap_or_else(|| StageError::invalid_response("no images generated")));
        }
        if artifacts.len() < lines.len() {
            log.log_warning(&format!(
                "{} of {} key lines have no image",
                lines.len() - artifacts.len(),
                lines.len()
            ));
        }
        Ok(artifacts)
    }

    /// Placeholder per key line, cycling through the pool by index.
    async fn fallback(
        &self,
        project: &ProjectRecord,
        _cause: &StageError,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>> {
        let lines = key_lines(project)?;
        let pool = match self.ctx.fallback.image_pool().await {
            Ok(pool) => pool,
            Err(e) => {
                log.log_warning(&format!("Placeholder pool unreadable: {}", e));
                Vec::new()
            }
        };
        if pool.is_empty() {
            log.log_warning("No placeholder images available, writing text stand-ins");
        }

        let mut artifacts = Vec::with_capacity(lines.len());
        for (index, line) in lines.iter().enumerate() {
            let source = (!pool.is_empty()).then(|| pool[index % pool.len()].as_path());
            artifacts.push(
                self.placeholder(&project.id, index, line, source, log)
                    .await?,
            );
        }
        Ok(artifacts)
    }
}
