//! Local filesystem artifact store.
//!
//! Layout under the output root:
//!
//! ```text
//! lyrics/<id>.json            project record
//! music/<id>_<uuid>.mp3       audio (or .txt stand-in)
//! images/<id>_<uuid>_<n>.png  one per key line (or .txt stand-in)
//! videos/<id>_<uuid>.html     assembled player
//! stages/<id>_<stage>.json    stage record
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mvgen_models::{ArtifactKind, ArtifactRef, ProjectId, ProjectRecord, Stage, StageRecord};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::naming::{trailing_index, validate_file_name, ArtifactName};
use crate::store::ArtifactStore;

const STAGES_DIR: &str = "stages";

/// Artifact store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding artifacts of `kind`.
    pub fn kind_dir(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    /// Absolute path of an artifact.
    pub fn path_of(&self, artifact: &ArtifactRef) -> StorageResult<PathBuf> {
        validate_file_name(&artifact.file_name)?;
        Ok(self.kind_dir(artifact.kind).join(&artifact.file_name))
    }

    fn project_path(&self, id: &ProjectId) -> PathBuf {
        self.kind_dir(ArtifactKind::Lyrics).join(format!("{}.json", id))
    }

    fn stage_path(&self, id: &ProjectId, stage: Stage) -> PathBuf {
        self.root
            .join(STAGES_DIR)
            .join(format!("{}_{}.json", id, stage.as_str()))
    }
}

/// Write via a temp file in the same directory, then rename into place.
async fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn init(&self) -> StorageResult<()> {
        for kind in ArtifactKind::ALL {
            fs::create_dir_all(self.kind_dir(kind)).await?;
        }
        fs::create_dir_all(self.root.join(STAGES_DIR)).await?;
        info!("Artifact store ready at {}", self.root.display());
        Ok(())
    }

    async fn save_project(&self, record: &ProjectRecord) -> StorageResult<ArtifactRef> {
        let path = self.project_path(&record.id);
        let json = serde_json::to_vec(record)?;
        write_atomic(&path, &json).await?;
        debug!(project_id = %record.id, "Saved project record");
        Ok(ArtifactRef::new(
            ArtifactKind::Lyrics,
            format!("{}.json", record.id),
        ))
    }

    async fn load_project(&self, id: &ProjectId) -> StorageResult<ProjectRecord> {
        let path = self.project_path(id);
        let bytes = match fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write_artifact(
        &self,
        kind: ArtifactKind,
        project: &ProjectId,
        name: ArtifactName,
        bytes: &[u8],
    ) -> StorageResult<ArtifactRef> {
        let artifact = ArtifactRef::new(kind, name.render(project)?);
        let path = self.path_of(&artifact)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;
        debug!(
            project_id = %project,
            "Wrote {} bytes to {}",
            bytes.len(),
            path.display()
        );
        Ok(artifact)
    }

    async fn copy_artifact(
        &self,
        kind: ArtifactKind,
        project: &ProjectId,
        name: ArtifactName,
        source: &Path,
    ) -> StorageResult<ArtifactRef> {
        let artifact = ArtifactRef::new(kind, name.render(project)?);
        let path = self.path_of(&artifact)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(source, &path).await?;
        debug!(
            project_id = %project,
            "Copied {} to {}",
            source.display(),
            path.display()
        );
        Ok(artifact)
    }

    async fn list_artifacts(
        &self,
        kind: ArtifactKind,
        project: &ProjectId,
    ) -> StorageResult<Vec<ArtifactRef>> {
        let dir = self.kind_dir(kind);
        let prefix = project.file_prefix();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && !name.ends_with(".tmp") {
                names.push(name);
            }
        }
        names.sort_by(|a, b| {
            trailing_index(a)
                .cmp(&trailing_index(b))
                .then_with(|| a.cmp(b))
        });

        Ok(names
            .into_iter()
            .map(|name| ArtifactRef::new(kind, name))
            .collect())
    }

    async fn read_artifact(&self, artifact: &ArtifactRef) -> StorageResult<Vec<u8>> {
        let path = self.path_of(artifact)?;
        match fs::read(&path).await {
            Ok(b) => Ok(b),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(artifact.url()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save_stage_record(&self, record: &StageRecord) -> StorageResult<()> {
        let path = self.stage_path(&record.project_id, record.stage);
        let json = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &json).await
    }

    async fn load_stage_record(
        &self,
        project: &ProjectId,
        stage: Stage,
    ) -> StorageResult<Option<StageRecord>> {
        let path = self.stage_path(project, stage);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
