use async_trait::async_trait;
use mvgen_models::{ArtifactKind, ArtifactRef, ProjectRecord, Stage};
use mvgen_storage::ArtifactName;

use super::music::substitute_audio;
use super::{PipelineStage, StageContext};
use crate::error::{PipelineResult, StageError};
use crate::logging::StageLogger;
use crate::player::{render_error_page, render_player, Slide, GENERIC_SCENES};

/// Composes the project's music and images into an HTML player.
///
/// Never calls a provider. Only artifacts qualified by the project ID are
/// used.
pub struct AssemblyStage {
    ctx: StageContext,
}

impl AssemblyStage {
    pub fn new(ctx: StageContext) -> Self {
        Self { ctx }
    }

    /// Artifacts recorded by an upstream stage, else whatever is stored
    /// for the project.
    async fn upstream(
        &self,
        project: &ProjectRecord,
        stage: Stage,
    ) -> PipelineResult<Vec<ArtifactRef>> {
        if let Some(record) = self.ctx.store.load_stage_record(&project.id, stage).await? {
            if record.status.has_artifact() && !record.artifacts.is_empty() {
                return Ok(record.artifacts);
            }
        }
        Ok(self
            .ctx
            .store
            .list_artifacts(stage.artifact_kind(), &project.id)
            .await?)
    }

    async fn music(&self, project: &ProjectRecord, log: &StageLogger) -> PipelineResult<ArtifactRef> {
        match self.upstream(project, Stage::Music).await?.into_iter().next() {
            Some(music) => Ok(music),
            None => {
                log.log_warning("No music for project, using fallback audio");
                substitute_audio(&self.ctx, &project.id, log).await
            }
        }
    }

    async fn slides(&self, images: &[ArtifactRef]) -> PipelineResult<Vec<Slide>> {
        let mut slides = Vec::with_capacity(images.len());
        for image in images {
            if image.is_text() {
                let bytes = self.ctx.store.read_artifact(image).await?;
                slides.push(Slide::text(String::from_utf8_lossy(&bytes).trim()));
            } else {
                slides.push(Slide::image(image.url()));
            }
        }
        Ok(slides)
    }

    async fn compose(
        &self,
        project: &ProjectRecord,
        slides: &[Slide],
        log: &StageLogger,
    ) -> PipelineResult<ArtifactRef> {
        let music = self.music(project, log).await?;
        let html = render_player(&music.url(), slides, self.ctx.config.slide_duration_secs)?;
        let artifact = self
            .ctx
            .store
            .write_artifact(
                ArtifactKind::Video,
                &project.id,
                ArtifactName::new("html"),
                html.as_bytes(),
            )
            .await?;
        log.log_progress(&format!("composed {} slides", slides.len()));
        Ok(artifact)
    }

    /// Static error player, else an inline error page.
    async fn error_page(
        &self,
        project: &ProjectRecord,
        cause: &StageError,
        log: &StageLogger,
    ) -> PipelineResult<ArtifactRef> {
        if let Some(source) = self.ctx.fallback.html().await {
            match self
                .ctx
                .store
                .copy_artifact(
                    ArtifactKind::Video,
                    &project.id,
                    ArtifactName::new("html").with_tag("fallback"),
                    &source,
                )
                .await
            {
                Ok(artifact) => return Ok(artifact.as_placeholder()),
                Err(e) => log.log_warning(&format!("Could not copy fallback player: {}", e)),
            }
        }

        let html = render_error_page(&project.id, &cause.to_string());
        let artifact = self
            .ctx
            .store
            .write_artifact(
                ArtifactKind::Video,
                &project.id,
                ArtifactName::new("html").with_tag("error"),
                html.as_bytes(),
            )
            .await?;
        Ok(artifact.as_placeholder())
    }
}

#[async_trait]
impl PipelineStage for AssemblyStage {
    fn stage(&self) -> Stage {
        Stage::Assembly
    }

    async fn primary(
        &self,
        project: &ProjectRecord,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>> {
        let images = self.upstream(project, Stage::Images).await?;
        if images.is_empty() {
            return Err(StageError::resource_missing("project has no image artifacts"));
        }
        let slides = self.slides(&images).await?;
        Ok(vec![self.compose(project, &slides, log).await?])
    }

    /// Generic scenes when the project has no images; the error page when
    /// composition itself failed.
    async fn fallback(
        &self,
        project: &ProjectRecord,
        cause: &StageError,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>> {
        let has_images = match self.upstream(project, Stage::Images).await {
            Ok(images) => !images.is_empty(),
            Err(_) => true,
        };

        let mut cause_text = cause.to_string();
        if !has_images {
            let slides: Vec<Slide> = GENERIC_SCENES.iter().map(|s| Slide::text(*s)).collect();
            match self.compose(project, &slides, log).await {
                Ok(artifact) => return Ok(vec![artifact]),
                Err(e) => {
                    log.log_warning(&format!("Generic scene composition failed: {}", e));
                    cause_text = e.to_string();
                }
            }
        }

        let cause = StageError::resource_missing(cause_text);
        Ok(vec![self.error_page(project, &cause, log).await?])
    }
}
