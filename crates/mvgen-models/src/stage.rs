//! Pipeline stages, their status state machine and results.
//!
//! Every stage invocation ends in exactly one [`StageResult`]. The result is
//! persisted as a [`StageRecord`] so status queries and idempotency checks
//! never have to inspect artifact files directly.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{ArtifactKind, ArtifactRef, ProjectId};

/// One step of the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lyrics,
    Music,
    Images,
    Assembly,
}

impl Stage {
    /// Stages in execution order.
    pub const ORDER: [Stage; 4] = [Stage::Lyrics, Stage::Music, Stage::Images, Stage::Assembly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Lyrics => "lyrics",
            Stage::Music => "music",
            Stage::Images => "images",
            Stage::Assembly => "assembly",
        }
    }

    /// Kind of artifact this stage produces.
    pub fn artifact_kind(&self) -> ArtifactKind {
        match self {
            Stage::Lyrics => ArtifactKind::Lyrics,
            Stage::Music => ArtifactKind::Music,
            Stage::Images => ArtifactKind::Image,
            Stage::Assembly => ArtifactKind::Video,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stage status: `Pending -> Running -> {Succeeded | Degraded | Fatal}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Degraded,
    Fatal,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Running => "running",
            StageStatus::Succeeded => "succeeded",
            StageStatus::Degraded => "degraded",
            StageStatus::Fatal => "fatal",
        }
    }

    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Succeeded | StageStatus::Degraded | StageStatus::Fatal
        )
    }

    /// Downstream stages treat Degraded exactly like Succeeded.
    pub fn has_artifact(&self) -> bool {
        matches!(self, StageStatus::Succeeded | StageStatus::Degraded)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// A terminal stage may be re-run (forced regeneration), which restarts
    /// it at Running.
    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        match (self, next) {
            (StageStatus::Pending, StageStatus::Running) => true,
            (StageStatus::Running, n) => n.is_terminal(),
            (s, StageStatus::Running) => s.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one stage invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageResult {
    /// The primary provider produced the artifacts.
    Succeeded { artifacts: Vec<ArtifactRef> },
    /// A fallback substitute was produced instead.
    Degraded {
        artifacts: Vec<ArtifactRef>,
        reason: String,
    },
    /// No artifact could be produced.
    Fatal { reason: String },
}

impl StageResult {
    pub fn succeeded(artifacts: Vec<ArtifactRef>) -> Self {
        Self::Succeeded { artifacts }
    }

    /// Build a degraded result. Callers only reach this after a fallback
    /// wrote at least one artifact.
    pub fn degraded(artifacts: Vec<ArtifactRef>, reason: impl Into<String>) -> Self {
        debug_assert!(!artifacts.is_empty(), "degraded result without artifact");
        Self::Degraded {
            artifacts,
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        Self::Fatal {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StageStatus {
        match self {
            StageResult::Succeeded { .. } => StageStatus::Succeeded,
            StageResult::Degraded { .. } => StageStatus::Degraded,
            StageResult::Fatal { .. } => StageStatus::Fatal,
        }
    }

    pub fn artifacts(&self) -> &[ArtifactRef] {
        match self {
            StageResult::Succeeded { artifacts } | StageResult::Degraded { artifacts, .. } => {
                artifacts
            }
            StageResult::Fatal { .. } => &[],
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            StageResult::Succeeded { .. } => None,
            StageResult::Degraded { reason, .. } | StageResult::Fatal { reason } => Some(reason),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, StageResult::Fatal { .. })
    }

    /// First artifact, for single-artifact stages.
    pub fn primary_artifact(&self) -> Option<&ArtifactRef> {
        self.artifacts().first()
    }
}

/// Persisted per-stage state for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageRecord {
    pub project_id: ProjectId,
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(default)]
    pub artifacts: Vec<ArtifactRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl StageRecord {
    /// Record for a stage that has just started.
    pub fn running(project_id: ProjectId, stage: Stage) -> Self {
        Self {
            project_id,
            stage,
            status: StageStatus::Running,
            artifacts: Vec::new(),
            reason: None,
            updated_at: Utc::now(),
        }
    }

    /// Record for a finished stage.
    pub fn finished(project_id: ProjectId, stage: Stage, result: &StageResult) -> Self {
        Self {
            project_id,
            stage,
            status: result.status(),
            artifacts: result.artifacts().to_vec(),
            reason: result.reason().map(str::to_string),
            updated_at: Utc::now(),
        }
    }

    /// Rebuild the stage result from a terminal record.
    pub fn to_result(&self) -> Option<StageResult> {
        let reason = self.reason.clone().unwrap_or_default();
        match self.status {
            StageStatus::Succeeded => Some(StageResult::Succeeded {
                artifacts: self.artifacts.clone(),
            }),
            StageStatus::Degraded => Some(StageResult::Degraded {
                artifacts: self.artifacts.clone(),
                reason,
            }),
            StageStatus::Fatal => Some(StageResult::Fatal { reason }),
            StageStatus::Pending | StageStatus::Running => None,
        }
    }
}
