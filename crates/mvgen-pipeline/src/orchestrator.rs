//! Pipeline orchestration.
//!
//! Sequences the stages for one project, persists a [`StageRecord`] around
//! every stage run and answers status queries from those records.

use std::sync::Arc;

use mvgen_models::{
    ArtifactKind, ArtifactRef, ProjectId, ProjectRecord, Stage, StageRecord, StageResult,
    StageStatus,
};
use mvgen_providers::{ImageGenerator, MusicGenerator, TextGenerator};
use mvgen_storage::ArtifactStore;
use serde::Serialize;
use tracing::{info, warn};

use crate::clock::{Clock, TokioClock};
use crate::config::PipelineConfig;
use crate::error::{PipelineResult, StageError};
use crate::fallback::FallbackAssets;
use crate::stages::{
    run_stage, AssemblyStage, ImageStage, LyricsStage, MusicStage, PipelineStage, RandomStyle,
    StageContext, StyleChooser,
};

/// Result of the lyrics stage: the persisted project record.
fn lyrics_result(id: &ProjectId) -> StageResult {
    StageResult::succeeded(vec![ArtifactRef::new(
        ArtifactKind::Lyrics,
        format!("{}.json", id),
    )])
}

/// External providers used by the pipeline.
#[derive(Clone)]
pub struct Providers {
    pub text: Arc<dyn TextGenerator>,
    pub music: Arc<dyn MusicGenerator>,
    pub image: Arc<dyn ImageGenerator>,
}

/// Builder for [`Pipeline`].
pub struct PipelineBuilder {
    config: PipelineConfig,
    store: Arc<dyn ArtifactStore>,
    providers: Providers,
    clock: Arc<dyn Clock>,
    styles: Arc<dyn StyleChooser>,
}

impl PipelineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn style_chooser(mut self, styles: Arc<dyn StyleChooser>) -> Self {
        self.styles = styles;
        self
    }

    pub fn build(self) -> Pipeline {
        let ctx = StageContext {
            store: self.store,
            fallback: FallbackAssets::new(&self.config.fallback_dir),
            clock: self.clock,
            config: Arc::new(self.config),
        };
        Pipeline {
            lyrics: LyricsStage::new(ctx.clone(), self.providers.text),
            music: MusicStage::new(ctx.clone(), self.providers.music, self.styles),
            images: ImageStage::new(ctx.clone(), self.providers.image),
            assembly: AssemblyStage::new(ctx.clone()),
            ctx,
        }
    }
}

/// Summary of a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub project: ProjectRecord,
    pub stages: Vec<(Stage, StageResult)>,
}

impl PipelineRun {
    pub fn result(&self, stage: Stage) -> Option<&StageResult> {
        self.stages
            .iter()
            .find(|(s, _)| *s == stage)
            .map(|(_, r)| r)
    }

    /// First fatal stage, if any.
    pub fn fatal_stage(&self) -> Option<(Stage, &StageResult)> {
        self.stages
            .iter()
            .find(|(_, r)| r.is_fatal())
            .map(|(s, r)| (*s, r))
    }
}

/// A project with its persisted stage records.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectStatus {
    pub project: ProjectRecord,
    pub stages: Vec<StageRecord>,
}

impl ProjectStatus {
    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    /// Whether the stage finished with an artifact.
    pub fn has_artifact(&self, stage: Stage) -> bool {
        self.stage(stage)
            .map(|r| r.status.has_artifact())
            .unwrap_or(false)
    }
}

/// The music video pipeline.
pub struct Pipeline {
    ctx: StageContext,
    lyrics: LyricsStage,
    music: MusicStage,
    images: ImageStage,
    assembly: AssemblyStage,
}

impl Pipeline {
    pub fn builder(
        config: PipelineConfig,
        store: Arc<dyn ArtifactStore>,
        providers: Providers,
    ) -> PipelineBuilder {
        PipelineBuilder {
            config,
            store,
            providers,
            clock: Arc::new(TokioClock),
            styles: Arc::new(RandomStyle),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.ctx.config
    }

    pub fn fallback_assets(&self) -> &FallbackAssets {
        &self.ctx.fallback
    }

    /// Prepare the artifact store layout.
    pub async fn init(&self) -> PipelineResult<()> {
        self.ctx.store.init().await?;
        Ok(())
    }

    /// Write any missing default fallback assets.
    pub async fn seed_fallbacks(&self) -> PipelineResult<usize> {
        Ok(self.ctx.fallback.seed_defaults().await?.len())
    }

    /// Entry stage: create a project from a prompt.
    pub async fn generate_lyrics(&self, prompt: &str) -> PipelineResult<ProjectRecord> {
        let record = self.lyrics.generate(prompt).await?;
        let result = lyrics_result(&record.id);
        self.ctx
            .store
            .save_stage_record(&StageRecord::finished(record.id.clone(), Stage::Lyrics, &result))
            .await?;
        Ok(record)
    }

    pub async fn load_project(&self, id: &ProjectId) -> PipelineResult<ProjectRecord> {
        match self.ctx.store.load_project(id).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_not_found() => Err(StageError::ProjectNotFound(id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    fn stage_impl(&self, stage: Stage) -> Option<&dyn PipelineStage> {
        match stage {
            Stage::Lyrics => None,
            Stage::Music => Some(&self.music),
            Stage::Images => Some(&self.images),
            Stage::Assembly => Some(&self.assembly),
        }
    }

    /// Run one post-lyrics stage for an existing project.
    ///
    /// A stage already finished with an artifact is returned as stored
    /// unless `force` is set. Errors are reserved for an unknown project or
    /// a failure to persist the stage record; provider trouble always comes
    /// back as a Degraded or Fatal result.
    pub async fn run(&self, id: &ProjectId, stage: Stage, force: bool) -> PipelineResult<StageResult> {
        let project = self.load_project(id).await?;
        self.run_for(&project, stage, force).await
    }

    async fn run_for(
        &self,
        project: &ProjectRecord,
        stage: Stage,
        force: bool,
    ) -> PipelineResult<StageResult> {
        let store = &self.ctx.store;
        let existing = store.load_stage_record(&project.id, stage).await?;

        if let Some(record) = &existing {
            if !force && record.status.has_artifact() {
                if let Some(result) = record.to_result() {
                    info!(project_id = %project.id, stage = %stage, "Stage already {}, reusing", record.status);
                    return Ok(result);
                }
            }
        }

        let Some(stage_impl) = self.stage_impl(stage) else {
            // Lyrics only exist through generate_lyrics; a loaded project has them
            return Ok(existing
                .and_then(|r| r.to_result())
                .unwrap_or_else(|| lyrics_result(&project.id)));
        };

        if let Some(record) = &existing {
            if !record.status.can_transition_to(StageStatus::Running) {
                warn!(
                    project_id = %project.id,
                    stage = %stage,
                    "Stage record in state {}, restarting",
                    record.status
                );
            }
        }
        store
            .save_stage_record(&StageRecord::running(project.id.clone(), stage))
            .await?;

        let result = run_stage(stage_impl, project).await;
        store
            .save_stage_record(&StageRecord::finished(project.id.clone(), stage, &result))
            .await?;
        Ok(result)
    }

    pub async fn run_music(&self, id: &ProjectId, force: bool) -> PipelineResult<StageResult> {
        self.run(id, Stage::Music, force).await
    }

    pub async fn run_images(&self, id: &ProjectId, force: bool) -> PipelineResult<StageResult> {
        self.run(id, Stage::Images, force).await
    }

    pub async fn run_assembly(&self, id: &ProjectId, force: bool) -> PipelineResult<StageResult> {
        self.run(id, Stage::Assembly, force).await
    }

    /// Run every stage for a new project, stopping at the first Fatal stage.
    ///
    /// When a project timeout is configured the whole run is bounded by it;
    /// on expiry the in-flight stage is dropped and the run fails with
    /// [`StageError::Timeout`].
    pub async fn run_all(&self, prompt: &str) -> PipelineResult<PipelineRun> {
        match self.ctx.config.project_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run_all_unbounded(prompt))
                .await
                .map_err(|_| {
                    StageError::timeout(format!("pipeline exceeded {}s", limit.as_secs()))
                })?,
            None => self.run_all_unbounded(prompt).await,
        }
    }

    async fn run_all_unbounded(&self, prompt: &str) -> PipelineResult<PipelineRun> {
        let project = self.generate_lyrics(prompt).await?;
        let mut run = PipelineRun {
            stages: vec![(Stage::Lyrics, lyrics_result(&project.id))],
            project,
        };

        for stage in [Stage::Music, Stage::Images, Stage::Assembly] {
            let result = self.run_for(&run.project, stage, false).await?;
            let fatal = result.is_fatal();
            run.stages.push((stage, result));
            if fatal {
                warn!(project_id = %run.project.id, stage = %stage, "Pipeline stopped at fatal stage");
                break;
            }
        }

        info!(project_id = %run.project.id, "Pipeline run finished");
        Ok(run)
    }

    /// Project record plus every stage record stored for it.
    pub async fn project_status(&self, id: &ProjectId) -> PipelineResult<ProjectStatus> {
        let project = self.load_project(id).await?;
        let mut stages = Vec::new();
        for stage in Stage::ORDER {
            if let Some(record) = self.ctx.store.load_stage_record(id, stage).await? {
                stages.push(record);
            }
        }
        Ok(ProjectStatus { project, stages })
    }
}
