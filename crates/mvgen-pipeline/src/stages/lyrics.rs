use std::sync::Arc;

use mvgen_models::{ProjectRecord, Stage};
use mvgen_providers::TextGenerator;

use super::StageContext;
use crate::error::{PipelineResult, StageError};
use crate::logging::StageLogger;

/// Instruction sent to the text provider for a user theme.
pub fn lyrics_prompt(theme: &str) -> String {
    format!(
        "Write original song lyrics based on this theme or idea: \"{}\".\n\n\
         The lyrics should:\n\
         - Have a catchy chorus\n\
         - Include 2-3 verses\n\
         - Follow a standard song structure\n\
         - Be emotionally resonant\n\
         - Be appropriate for a music video\n\
         - Have clear visual imagery that could be represented in a music video\n\n\
         Return ONLY the lyrics, formatted with line breaks. Don't include any explanations or notes.",
        theme
    )
}

/// Entry stage: turns a prompt into a new project.
pub struct LyricsStage {
    ctx: StageContext,
    provider: Arc<dyn TextGenerator>,
}

impl LyricsStage {
    pub fn new(ctx: StageContext, provider: Arc<dyn TextGenerator>) -> Self {
        Self { ctx, provider }
    }

    /// Generate lyrics and persist the new project.
    ///
    /// Nothing is written unless the provider returns usable lyrics.
    pub async fn generate(&self, prompt: &str) -> PipelineResult<ProjectRecord> {
        let theme = prompt.trim();
        if theme.is_empty() {
            return Err(StageError::invalid_input("prompt is required"));
        }

        let lyrics = self.provider.generate(&lyrics_prompt(theme)).await?;
        let lyrics = lyrics.trim();
        if lyrics.is_empty() {
            return Err(StageError::invalid_response("provider returned empty lyrics"));
        }

        let record = ProjectRecord::new(theme, lyrics);
        let log = StageLogger::new(&record.id, Stage::Lyrics);
        self.ctx.store.save_project(&record).await?;
        log.log_completion(&format!("{} characters of lyrics", record.lyrics.len()));
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::test_support::harness;
    use mvgen_providers::testing::{DownProvider, StaticText};
    use mvgen_providers::ProviderError;
    use mvgen_storage::ArtifactStore;

    #[tokio::test]
    async fn test_generate_persists_project() {
        let h = harness().await;
        let text = Arc::new(StaticText::ok("  Rain on the glass\nNeon in the puddles \n"));
        let stage = LyricsStage::new(h.ctx.clone(), text.clone());

        let record = stage.generate(" a rainy city night ").await.unwrap();
        assert_eq!(record.prompt, "a rainy city night");
        assert_eq!(record.lyrics, "Rain on the glass\nNeon in the puddles");
        assert_eq!(h.store.load_project(&record.id).await.unwrap(), record);

        let prompts = text.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("\"a rainy city night\""));
        assert!(prompts[0].contains("catchy chorus"));
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected_without_provider_call() {
        let h = harness().await;
        let down = Arc::new(DownProvider::new());
        let stage = LyricsStage::new(h.ctx.clone(), down.clone());

        let err = stage.generate("   ").await.unwrap_err();
        assert!(matches!(err, StageError::InvalidInput(_)));
        assert_eq!(down.calls(), 0);
    }

    #[tokio::test]
    async fn test_provider_failures_have_no_fallback() {
        let h = harness().await;

        let stage = LyricsStage::new(h.ctx.clone(), Arc::new(DownProvider::new()));
        let err = stage.generate("storm").await.unwrap_err();
        assert!(matches!(err, StageError::TransientProvider(_)));

        let stage = LyricsStage::new(
            h.ctx.clone(),
            Arc::new(StaticText::err(ProviderError::empty_result("no text"))),
        );
        assert!(matches!(
            stage.generate("storm").await.unwrap_err(),
            StageError::InvalidResponse(_)
        ));

        let stage = LyricsStage::new(h.ctx.clone(), Arc::new(StaticText::ok(" \n ")));
        assert!(matches!(
            stage.generate("storm").await.unwrap_err(),
            StageError::InvalidResponse(_)
        ));

        let lyrics_dir = h.store.root().join("lyrics");
        assert_eq!(std::fs::read_dir(lyrics_dir).unwrap().count(), 0);
    }
}
