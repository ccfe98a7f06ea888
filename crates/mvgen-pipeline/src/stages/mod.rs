//! Pipeline stages.
//!
//! Music, images and assembly share one shape: a primary path that talks to
//! a provider (or composes upstream artifacts) and a fallback path that
//! produces a substitute. [`run_stage`] turns that pair into exactly one
//! [`StageResult`]. Lyrics is the entry point and has no fallback.

mod assembly;
mod images;
mod lyrics;
mod music;

pub use assembly::AssemblyStage;
pub use images::{image_prompt, ImageStage};
pub use lyrics::{lyrics_prompt, LyricsStage};
pub use music::{clean_lyrics, FixedStyle, MusicStage, RandomStyle, StyleChooser};

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use mvgen_models::{ArtifactRef, ProjectRecord, Stage, StageResult};
use mvgen_storage::ArtifactStore;
use tracing::Instrument;

use crate::clock::Clock;
use crate::config::PipelineConfig;
use crate::error::{PipelineResult, StageError};
use crate::fallback::FallbackAssets;
use crate::logging::StageLogger;
use crate::metrics::{record_provider_failure, record_stage_outcome};

/// Shared dependencies of every stage.
#[derive(Clone)]
pub struct StageContext {
    pub store: Arc<dyn ArtifactStore>,
    pub fallback: FallbackAssets,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<PipelineConfig>,
}

/// A stage with a primary and a fallback path.
#[async_trait]
pub trait PipelineStage: Send + Sync {
    fn stage(&self) -> Stage;

    /// Produce the stage's artifacts the preferred way.
    async fn primary(
        &self,
        project: &ProjectRecord,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>>;

    /// Produce substitute artifacts after `cause` made the primary path fail.
    async fn fallback(
        &self,
        project: &ProjectRecord,
        cause: &StageError,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>>;
}

/// Run one stage to a terminal result.
///
/// Never returns an error: every failure is folded into the result. The
/// result is Fatal only when the fallback was attempted and failed too, or
/// when the failure is one no fallback can fix.
pub async fn run_stage(stage: &dyn PipelineStage, project: &ProjectRecord) -> StageResult {
    let log = StageLogger::new(&project.id, stage.stage());
    let span = log.create_span();

    async {
        let started = Instant::now();
        log.log_start("running primary path");

        let result = match stage.primary(project, &log).await {
            Ok(artifacts) => StageResult::succeeded(artifacts),
            Err(cause) if cause.blocks_fallback() => {
                log.log_error(&cause.to_string());
                StageResult::fatal(cause.to_string())
            }
            Err(cause) => {
                record_provider_failure(stage.stage());
                log.log_degraded(&cause.to_string());
                match stage.fallback(project, &cause, &log).await {
                    Ok(artifacts) if !artifacts.is_empty() => {
                        StageResult::degraded(artifacts, cause.to_string())
                    }
                    Ok(_) => {
                        log.log_error("fallback produced no artifact");
                        StageResult::fatal(format!("{}; fallback produced no artifact", cause))
                    }
                    Err(fallback_err) => {
                        log.log_error(&fallback_err.to_string());
                        StageResult::fatal(format!("{}; fallback failed: {}", cause, fallback_err))
                    }
                }
            }
        };

        record_stage_outcome(
            stage.stage(),
            result.status(),
            started.elapsed().as_secs_f64(),
        );
        log.log_completion(&format!(
            "{} with {} artifact(s)",
            result.status(),
            result.artifacts().len()
        ));
        result
    }
    .instrument(span)
    .await
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use mvgen_storage::LocalArtifactStore;
    use tempfile::TempDir;

    use super::StageContext;
    use crate::clock::ManualClock;
    use crate::config::PipelineConfig;
    use crate::fallback::FallbackAssets;

    pub struct Harness {
        pub dir: TempDir,
        pub store: Arc<LocalArtifactStore>,
        pub clock: Arc<ManualClock>,
        pub ctx: StageContext,
    }

    /// Fresh store and fallback directory under a temp dir. Fallback assets
    /// are not seeded.
    pub async fn harness() -> Harness {
        use mvgen_storage::ArtifactStore;

        let dir = TempDir::new().unwrap();
        let config = PipelineConfig {
            output_dir: dir.path().join("outputs"),
            fallback_dir: dir.path().join("fallback"),
            ..Default::default()
        };
        let store = Arc::new(LocalArtifactStore::new(&config.output_dir));
        store.init().await.unwrap();
        let clock = Arc::new(ManualClock::new());
        let ctx = StageContext {
            store: store.clone(),
            fallback: FallbackAssets::new(&config.fallback_dir),
            clock: clock.clone(),
            config: Arc::new(config),
        };
        Harness {
            dir,
            store,
            clock,
            ctx,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use mvgen_models::ArtifactKind;

    use super::*;

    /// Stage whose paths return canned outcomes.
    struct CannedStage {
        primary: fn() -> PipelineResult<Vec<ArtifactRef>>,
        fallback: fn() -> PipelineResult<Vec<ArtifactRef>>,
        fallback_calls: AtomicUsize,
    }

    impl CannedStage {
        fn new(
            primary: fn() -> PipelineResult<Vec<ArtifactRef>>,
            fallback: fn() -> PipelineResult<Vec<ArtifactRef>>,
        ) -> Self {
            Self {
                primary,
                fallback,
                fallback_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PipelineStage for CannedStage {
        fn stage(&self) -> Stage {
            Stage::Images
        }

        async fn primary(
            &self,
            _project: &ProjectRecord,
            _log: &StageLogger,
        ) -> PipelineResult<Vec<ArtifactRef>> {
            (self.primary)()
        }

        async fn fallback(
            &self,
            _project: &ProjectRecord,
            _cause: &StageError,
            _log: &StageLogger,
        ) -> PipelineResult<Vec<ArtifactRef>> {
            self.fallback_calls.fetch_add(1, Ordering::SeqCst);
            (self.fallback)()
        }
    }

    fn provider_down() -> PipelineResult<Vec<ArtifactRef>> {
        Err(StageError::transient("connection refused"))
    }

    fn one_image() -> PipelineResult<Vec<ArtifactRef>> {
        Ok(vec![ArtifactRef::new(ArtifactKind::Image, "p_1_0.png").as_placeholder()])
    }

    fn project() -> ProjectRecord {
        ProjectRecord::new("rain", "Rain on the window")
    }

    #[tokio::test]
    async fn test_fallback_with_artifact_is_degraded() {
        let stage = CannedStage::new(provider_down, one_image);
        let result = run_stage(&stage, &project()).await;
        assert!(matches!(result, StageResult::Degraded { .. }), "{:?}", result);
        assert_eq!(result.artifacts().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_fallback_is_fatal() {
        let stage = CannedStage::new(provider_down, || Ok(Vec::new()));
        let result = run_stage(&stage, &project()).await;

        let StageResult::Fatal { reason } = &result else {
            panic!("expected fatal, got {:?}", result);
        };
        assert!(reason.contains("fallback produced no artifact"), "{}", reason);
        assert_eq!(stage.fallback_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_error_is_fatal() {
        let stage = CannedStage::new(provider_down, || {
            Err(StageError::fatal_io("read-only file system"))
        });
        let result = run_stage(&stage, &project()).await;

        let StageResult::Fatal { reason } = &result else {
            panic!("expected fatal, got {:?}", result);
        };
        assert!(reason.contains("connection refused"));
        assert!(reason.contains("fallback failed: I/O failure: read-only file system"));
    }

    #[tokio::test]
    async fn test_missing_upstream_skips_fallback() {
        let stage = CannedStage::new(
            || Err(StageError::missing_upstream("no key lines")),
            one_image,
        );
        let result = run_stage(&stage, &project()).await;

        assert!(result.is_fatal());
        assert_eq!(stage.fallback_calls.load(Ordering::SeqCst), 0);
    }
}
