use std::sync::Arc;

use async_trait::async_trait;
use mvgen_models::{ArtifactKind, ArtifactRef, MusicStyle, ProjectId, ProjectRecord, Stage, Tonic};
use mvgen_providers::{MusicGenerator, MusicJobStatus, MusicRequest};
use mvgen_storage::ArtifactName;
use rand::seq::IndexedRandom;
use rand::Rng;

use super::{PipelineStage, StageContext};
use crate::error::{PipelineResult, StageError};
use crate::fallback::AUDIO_PLACEHOLDER_TEXT;
use crate::logging::StageLogger;
use crate::poll::{poll_until, PollOutcome};

/// Characters of cleaned lyrics used as the short title prompt.
const TITLE_PROMPT_CHARS: usize = 300;

/// Picks the style of a music request.
pub trait StyleChooser: Send + Sync {
    fn choose(&self, genres: &[String]) -> MusicStyle;
}

/// Uniform random genre, coin-flip major/minor.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomStyle;

impl StyleChooser for RandomStyle {
    fn choose(&self, genres: &[String]) -> MusicStyle {
        let mut rng = rand::rng();
        let genre = genres
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| MusicStyle::default().genre);
        MusicStyle::new(genre, Tonic::from_major(rng.random_bool(0.5)))
    }
}

/// Always the same style.
#[derive(Debug, Clone)]
pub struct FixedStyle(pub MusicStyle);

impl StyleChooser for FixedStyle {
    fn choose(&self, _genres: &[String]) -> MusicStyle {
        self.0.clone()
    }
}

/// Truncate lyrics to `limit` characters, drop everything but word
/// characters, whitespace and basic punctuation, then trim.
pub fn clean_lyrics(lyrics: &str, limit: usize) -> String {
    lyrics
        .chars()
        .take(limit)
        .filter(|&c| {
            c.is_ascii_alphanumeric()
                || c == '_'
                || c.is_whitespace()
                || matches!(c, ',' | '.' | '!' | '?' | '\'' | '"' | '-')
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Copy the silent audio fallback, or write a text stand-in when it is
/// missing or cannot be copied.
pub(crate) async fn substitute_audio(
    ctx: &StageContext,
    project: &ProjectId,
    log: &StageLogger,
) -> PipelineResult<ArtifactRef> {
    if let Some(source) = ctx.fallback.audio().await {
        match ctx
            .store
            .copy_artifact(ArtifactKind::Music, project, ArtifactName::new("mp3"), &source)
            .await
        {
            Ok(artifact) => return Ok(artifact.as_placeholder()),
            Err(e) => log.log_warning(&format!("Could not copy fallback audio: {}", e)),
        }
    } else {
        log.log_warning("No fallback audio available, writing placeholder");
    }

    let artifact = ctx
        .store
        .write_artifact(
            ArtifactKind::Music,
            project,
            ArtifactName::new("txt"),
            AUDIO_PLACEHOLDER_TEXT.as_bytes(),
        )
        .await?;
    Ok(artifact.as_placeholder())
}

/// Generates the project's track.
pub struct MusicStage {
    ctx: StageContext,
    provider: Arc<dyn MusicGenerator>,
    styles: Arc<dyn StyleChooser>,
}

impl MusicStage {
    pub fn new(
        ctx: StageContext,
        provider: Arc<dyn MusicGenerator>,
        styles: Arc<dyn StyleChooser>,
    ) -> Self {
        Self {
            ctx,
            provider,
            styles,
        }
    }

    fn build_request(&self, lyrics: &str) -> MusicRequest {
        let lyrics = clean_lyrics(lyrics, self.ctx.config.lyrics_char_limit);
        let style = self.styles.choose(&self.ctx.config.music_styles);
        MusicRequest {
            prompt: lyrics.chars().take(TITLE_PROMPT_CHARS).collect(),
            style: style.genre,
            tonic: style.tonic.as_str().to_string(),
            lyrics,
        }
    }

    /// Poll the job until it reports a download URL.
    async fn wait_for_audio(&self, job_id: &str) -> PipelineResult<String> {
        let provider = self.provider.as_ref();
        let policy = &self.ctx.config.music_poll;

        let outcome = poll_until::<_, _, String, StageError>(
            policy,
            self.ctx.clock.as_ref(),
            "music job",
            |_| async move {
                let job = provider.poll(job_id).await?;
                if job.status.is_pending() {
                    return Ok(None);
                }
                match job.status {
                    MusicJobStatus::Complete => job.audio_url.map(Some).ok_or_else(|| {
                        StageError::invalid_response("music job complete without audio_url")
                    }),
                    status => Err(StageError::transient(format!(
                        "music job ended with status {:?}",
                        status
                    ))),
                }
            },
        )
        .await?;

        match outcome {
            PollOutcome::Ready(url) => Ok(url),
            PollOutcome::Exhausted { attempts } => Err(StageError::transient(format!(
                "music job still pending after {} polls",
                attempts
            ))),
        }
    }
}

#[async_trait]
impl PipelineStage for MusicStage {
    fn stage(&self) -> Stage {
        Stage::Music
    }

    async fn primary(
        &self,
        project: &ProjectRecord,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>> {
        let request = self.build_request(&project.lyrics);
        log.log_progress(&format!(
            "submitting style={} tonic={} lyrics_len={}",
            request.style,
            request.tonic,
            request.lyrics.chars().count()
        ));

        let job_id = self.provider.submit(&request).await?;
        let audio_url = self.wait_for_audio(&job_id).await?;
        let bytes = self.provider.fetch(&audio_url).await?;

        let artifact = self
            .ctx
            .store
            .write_artifact(ArtifactKind::Music, &project.id, ArtifactName::new("mp3"), &bytes)
            .await?;
        Ok(vec![artifact])
    }

    async fn fallback(
        &self,
        project: &ProjectRecord,
        _cause: &StageError,
        log: &StageLogger,
    ) -> PipelineResult<Vec<ArtifactRef>> {
        Ok(vec![substitute_audio(&self.ctx, &project.id, log).await?])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::SILENT_MP3;
    use crate::stages::run_stage;
    use crate::stages::test_support::harness;
    use mvgen_models::StageResult;
    use mvgen_providers::testing::{DownProvider, ScriptedMusic};
    use mvgen_providers::{MusicJob, ProviderError};
    use mvgen_storage::ArtifactStore;
    use std::time::Duration;

    const LYRICS: &str = "Rain on the window\nNeon in the puddles";

    fn fixed() -> Arc<dyn StyleChooser> {
        Arc::new(FixedStyle(MusicStyle::new("indie", Tonic::AMinor)))
    }

    #[test]
    fn test_clean_lyrics() {
        assert_eq!(
            clean_lyrics("  [Verse 1]\nRain — on the glass! (oh) 'yeah' \"ok\" ", 2000),
            "Verse 1\nRain  on the glass! oh 'yeah' \"ok\""
        );
        assert_eq!(clean_lyrics("abcdef", 3), "abc");
    }

    #[test]
    fn test_random_style_uses_configured_genres() {
        let genres = vec!["jazz".to_string()];
        for _ in 0..20 {
            let style = RandomStyle.choose(&genres);
            assert_eq!(style.genre, "jazz");
        }
        assert_eq!(RandomStyle.choose(&[]).genre, "pop");
    }

    #[tokio::test]
    async fn test_success_after_polling() {
        let h = harness().await;
        let provider = Arc::new(ScriptedMusic::completing_after(2, b"ID3track"));
        let stage = MusicStage::new(h.ctx.clone(), provider.clone(), fixed());
        let project = ProjectRecord::new("rain", LYRICS);

        let result = run_stage(&stage, &project).await;
        let StageResult::Succeeded { artifacts } = &result else {
            panic!("expected success, got {:?}", result);
        };
        assert_eq!(artifacts.len(), 1);
        assert!(!artifacts[0].placeholder);
        assert_eq!(h.store.read_artifact(&artifacts[0]).await.unwrap(), b"ID3track");

        assert_eq!(provider.poll_calls(), 3);
        assert_eq!(h.clock.elapsed(), Duration::from_secs(15));

        let request = &provider.requests()[0];
        assert_eq!(request.style, "indie");
        assert_eq!(request.tonic, "A minor");
        assert_eq!(request.lyrics, LYRICS);
    }

    #[tokio::test]
    async fn test_provider_down_degrades_to_silent_audio() {
        let h = harness().await;
        h.ctx.fallback.seed_defaults().await.unwrap();
        let stage = MusicStage::new(h.ctx.clone(), Arc::new(DownProvider::new()), fixed());
        let project = ProjectRecord::new("rain", LYRICS);

        let result = run_stage(&stage, &project).await;
        let StageResult::Degraded { artifacts, reason } = &result else {
            panic!("expected degraded, got {:?}", result);
        };
        assert!(reason.contains("connection refused"));
        let audio = &artifacts[0];
        assert!(audio.placeholder);
        assert_eq!(audio.extension().as_deref(), Some("mp3"));
        assert!(audio.file_name.starts_with(&project.id.file_prefix()));
        assert_eq!(h.store.read_artifact(audio).await.unwrap(), SILENT_MP3);
    }

    #[tokio::test]
    async fn test_missing_fallback_writes_text_placeholder() {
        let h = harness().await;
        let stage = MusicStage::new(h.ctx.clone(), Arc::new(DownProvider::new()), fixed());
        let project = ProjectRecord::new("rain", LYRICS);

        let result = run_stage(&stage, &project).await;
        let audio = result.primary_artifact().unwrap();
        assert!(matches!(result, StageResult::Degraded { .. }));
        assert!(audio.is_text());
        assert_eq!(
            h.store.read_artifact(audio).await.unwrap(),
            AUDIO_PLACEHOLDER_TEXT.as_bytes()
        );
    }

    #[tokio::test]
    async fn test_exhausted_polling_degrades() {
        let h = harness().await;
        let provider = Arc::new(ScriptedMusic::stuck());
        let stage = MusicStage::new(h.ctx.clone(), provider.clone(), fixed());

        let result = run_stage(&stage, &ProjectRecord::new("rain", LYRICS)).await;
        assert!(matches!(result, StageResult::Degraded { .. }));
        assert!(result.reason().unwrap().contains("still pending after 10 polls"));
        assert_eq!(provider.poll_calls(), 10);
        assert_eq!(h.clock.elapsed(), Duration::from_secs(50));
    }

    #[tokio::test]
    async fn test_failed_status_and_missing_url_degrade() {
        let h = harness().await;
        let cases = vec![
            ScriptedMusic::new(
                vec![Ok(ScriptedMusic::job(MusicJobStatus::parse("error"), None))],
                Ok(Vec::new()),
            ),
            ScriptedMusic::new(
                vec![Ok(ScriptedMusic::job(MusicJobStatus::Complete, None))],
                Ok(Vec::new()),
            ),
            ScriptedMusic::new(
                vec![Ok(MusicJob {
                    status: MusicJobStatus::Complete,
                    audio_url: Some("https://audio.example/a.mp3".into()),
                })],
                Err(ProviderError::empty_result("no bytes")),
            ),
        ];

        for provider in cases {
            let stage = MusicStage::new(h.ctx.clone(), Arc::new(provider), fixed());
            let result = run_stage(&stage, &ProjectRecord::new("rain", LYRICS)).await;
            assert!(
                matches!(result, StageResult::Degraded { .. }),
                "got {:?}",
                result
            );
        }
    }

    #[tokio::test]
    async fn test_unwritable_music_dir_is_fatal() {
        let h = harness().await;
        let music_dir = h.store.kind_dir(ArtifactKind::Music);
        tokio::fs::remove_dir_all(&music_dir).await.unwrap();
        tokio::fs::write(&music_dir, b"not a directory").await.unwrap();

        let stage = MusicStage::new(h.ctx.clone(), Arc::new(DownProvider::new()), fixed());
        let result = run_stage(&stage, &ProjectRecord::new("rain", LYRICS)).await;

        let StageResult::Fatal { reason } = &result else {
            panic!("expected fatal, got {:?}", result);
        };
        assert!(reason.contains("fallback failed"), "{}", reason);
        assert!(result.artifacts().is_empty());
    }

    #[tokio::test]
    async fn test_provider_always_failing_is_never_fatal() {
        let h = harness().await;
        for lyrics in ["", "x", LYRICS, "!!!"] {
            let stage = MusicStage::new(h.ctx.clone(), Arc::new(DownProvider::new()), fixed());
            let result = run_stage(&stage, &ProjectRecord::new("p", lyrics)).await;
            assert!(!result.is_fatal());
            assert_eq!(result.artifacts().len(), 1);
        }
    }
}
