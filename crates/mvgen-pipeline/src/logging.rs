//! Structured stage logging.
//!
//! Keeps the `project_id` and `stage` fields consistent across every event
//! a stage emits.

use mvgen_models::{ProjectId, Stage};
use tracing::{error, info, warn, Span};

/// Logger bound to one project stage.
#[derive(Debug, Clone)]
pub struct StageLogger {
    project_id: String,
    stage: Stage,
}

impl StageLogger {
    pub fn new(project_id: &ProjectId, stage: Stage) -> Self {
        Self {
            project_id: project_id.to_string(),
            stage,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            stage = %self.stage,
            "Stage started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            stage = %self.stage,
            "Stage progress: {}", message
        );
    }

    /// A primary path failed and a fallback is being used.
    pub fn log_degraded(&self, message: &str) {
        warn!(
            project_id = %self.project_id,
            stage = %self.stage,
            "Stage degraded: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            project_id = %self.project_id,
            stage = %self.stage,
            "Stage warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            project_id = %self.project_id,
            stage = %self.stage,
            "Stage error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            project_id = %self.project_id,
            stage = %self.stage,
            "Stage completed: {}", message
        );
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "stage",
            project_id = %self.project_id,
            stage = %self.stage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_logger_fields() {
        let id = ProjectId::new();
        let logger = StageLogger::new(&id, Stage::Images);
        assert_eq!(logger.project_id(), id.as_str());
        assert_eq!(logger.stage(), Stage::Images);
    }
}
