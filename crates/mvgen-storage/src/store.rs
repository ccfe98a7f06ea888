//! Artifact repository trait.

use std::path::Path;

use async_trait::async_trait;
use mvgen_models::{ArtifactKind, ArtifactRef, ProjectId, ProjectRecord, Stage, StageRecord};

use crate::error::StorageResult;
use crate::naming::ArtifactName;

/// Durable storage for project records, stage records and artifacts.
///
/// The pipeline only talks to storage through this trait; it never checks
/// for files itself. Writes are additive: a stage adds its own artifacts and
/// its own stage record and never rewrites another stage's data.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Create the directory layout. Idempotent.
    async fn init(&self) -> StorageResult<()>;

    /// Persist the lyrics-stage project record.
    async fn save_project(&self, record: &ProjectRecord) -> StorageResult<ArtifactRef>;

    /// Load a project record; `NotFound` if the project does not exist.
    async fn load_project(&self, id: &ProjectId) -> StorageResult<ProjectRecord>;

    /// Write bytes as a new artifact of `kind` owned by `project`.
    async fn write_artifact(
        &self,
        kind: ArtifactKind,
        project: &ProjectId,
        name: ArtifactName,
        bytes: &[u8],
    ) -> StorageResult<ArtifactRef>;

    /// Copy an external file (e.g. a fallback asset) in as a new artifact.
    async fn copy_artifact(
        &self,
        kind: ArtifactKind,
        project: &ProjectId,
        name: ArtifactName,
        source: &Path,
    ) -> StorageResult<ArtifactRef>;

    /// All artifacts of `kind` owned by `project`, ordered by trailing index
    /// then name.
    async fn list_artifacts(
        &self,
        kind: ArtifactKind,
        project: &ProjectId,
    ) -> StorageResult<Vec<ArtifactRef>>;

    /// Read an artifact's content.
    async fn read_artifact(&self, artifact: &ArtifactRef) -> StorageResult<Vec<u8>>;

    /// Persist the record for one stage of one project.
    async fn save_stage_record(&self, record: &StageRecord) -> StorageResult<()>;

    /// Load the record for one stage, `None` if the stage never ran.
    async fn load_stage_record(
        &self,
        project: &ProjectId,
        stage: Stage,
    ) -> StorageResult<Option<StageRecord>>;
}
