//! HTTP request and response bodies.
//!
//! Field names are camelCase on the wire.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{ProjectId, ProjectRecord, Stage, StageRecord, StageResult, StageStatus};

/// Maximum accepted prompt length in characters.
pub const MAX_PROMPT_LEN: u64 = 2000;

/// Body of `POST /api/generate-lyrics` and `POST /api/generate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateLyricsRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 2000, message = "prompt must be 1-2000 characters"))]
    pub prompt: String,
}

/// Body of the per-stage endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    #[validate(required(message = "lyricsId is required"))]
    pub lyrics_id: Option<String>,
    /// Regenerate even when the stage already has an artifact.
    #[serde(default)]
    pub force: bool,
}

impl StageRequest {
    pub fn new(id: &ProjectId) -> Self {
        Self {
            lyrics_id: Some(id.to_string()),
            force: false,
        }
    }

    /// Parsed project ID; `None` when the field is absent or blank.
    pub fn project_id(&self) -> Option<Result<ProjectId, String>> {
        let raw = self.lyrics_id.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(ProjectId::parse(raw).map_err(|e| e.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LyricsResponse {
    pub id: ProjectId,
    pub lyrics: String,
    pub status: StageStatus,
}

impl From<&ProjectRecord> for LyricsResponse {
    fn from(record: &ProjectRecord) -> Self {
        Self {
            id: record.id.clone(),
            lyrics: record.lyrics.clone(),
            status: StageStatus::Succeeded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MusicResponse {
    pub id: ProjectId,
    pub status: StageStatus,
    pub music_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl MusicResponse {
    pub fn new(id: ProjectId, result: &StageResult) -> Self {
        Self {
            id,
            status: result.status(),
            music_url: result.primary_artifact().map(|a| a.url()),
            reason: result.reason().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImagesResponse {
    pub id: ProjectId,
    pub status: StageStatus,
    pub image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ImagesResponse {
    pub fn new(id: ProjectId, result: &StageResult) -> Self {
        Self {
            id,
            status: result.status(),
            image_urls: result.artifacts().iter().map(|a| a.url()).collect(),
            reason: result.reason().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoResponse {
    pub id: ProjectId,
    pub status: StageStatus,
    pub video_url: Option<String>,
    pub is_html_player: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl VideoResponse {
    pub fn new(id: ProjectId, result: &StageResult) -> Self {
        let video = result.primary_artifact();
        Self {
            id,
            status: result.status(),
            video_url: video.map(|a| a.url()),
            is_html_player: video.map(|a| a.is_html()).unwrap_or(false),
            reason: result.reason().map(str::to_string),
        }
    }
}

/// One stage as reported by the full-run and project endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageSummary {
    pub stage: Stage,
    pub status: StageStatus,
    pub urls: Vec<String>,
    pub placeholder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StageSummary {
    pub fn from_result(stage: Stage, result: &StageResult) -> Self {
        Self {
            stage,
            status: result.status(),
            urls: result.artifacts().iter().map(|a| a.url()).collect(),
            placeholder: result.artifacts().iter().any(|a| a.placeholder),
            reason: result.reason().map(str::to_string),
        }
    }

    pub fn from_record(record: &StageRecord) -> Self {
        Self {
            stage: record.stage,
            status: record.status,
            urls: record.artifacts.iter().map(|a| a.url()).collect(),
            placeholder: record.artifacts.iter().any(|a| a.placeholder),
            reason: record.reason.clone(),
        }
    }
}

/// Response of `POST /api/generate`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub id: ProjectId,
    pub lyrics: String,
    pub stages: Vec<StageSummary>,
}

/// Response of `GET /api/project/:id`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: ProjectId,
    pub prompt: String,
    pub lyrics: String,
    pub has_music_generated: bool,
    pub has_images_generated: bool,
    pub has_video_assembled: bool,
    pub music_url: Option<String>,
    pub image_urls: Vec<String>,
    pub video_url: Option<String>,
    pub stages: Vec<StageSummary>,
}

impl ProjectResponse {
    pub fn new(project: &ProjectRecord, records: &[StageRecord]) -> Self {
        let finished = |stage: Stage| {
            records
                .iter()
                .find(|r| r.stage == stage && r.status.has_artifact())
        };
        let urls = |stage: Stage| -> Vec<String> {
            finished(stage)
                .map(|r| r.artifacts.iter().map(|a| a.url()).collect())
                .unwrap_or_default()
        };

        Self {
            id: project.id.clone(),
            prompt: project.prompt.clone(),
            lyrics: project.lyrics.clone(),
            has_music_generated: finished(Stage::Music).is_some(),
            has_images_generated: finished(Stage::Images).is_some(),
            has_video_assembled: finished(Stage::Assembly).is_some(),
            music_url: urls(Stage::Music).into_iter().next(),
            image_urls: urls(Stage::Images),
            video_url: urls(Stage::Assembly).into_iter().next(),
            stages: records.iter().map(StageSummary::from_record).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ArtifactKind, ArtifactRef};

    #[test]
    fn test_stage_request_wire_format() {
        let req: StageRequest =
            serde_json::from_str(r#"{"lyricsId": "3f1c", "force": true}"#).unwrap();
        assert_eq!(req.lyrics_id.as_deref(), Some("3f1c"));
        assert!(req.force);

        let req: StageRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_err());
        assert!(req.project_id().is_none());

        let req = StageRequest {
            lyrics_id: Some("   ".into()),
            force: false,
        };
        assert!(req.project_id().is_none());
    }

    #[test]
    fn test_prompt_validation() {
        let req: GenerateLyricsRequest = serde_json::from_str("{}").unwrap();
        assert!(req.validate().is_err());
        let req = GenerateLyricsRequest {
            prompt: "x".repeat(MAX_PROMPT_LEN as usize + 1),
        };
        assert!(req.validate().is_err());
        let req = GenerateLyricsRequest {
            prompt: "a rainy city night".into(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_video_response_flags_html_player() {
        let id = ProjectId::new();
        let result = StageResult::degraded(
            vec![ArtifactRef::new(ArtifactKind::Video, format!("{}_x.html", id)).as_placeholder()],
            "composition failed",
        );
        let json = serde_json::to_value(VideoResponse::new(id.clone(), &result)).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["isHtmlPlayer"], true);
        assert_eq!(json["videoUrl"], format!("/outputs/videos/{}_x.html", id));
        assert_eq!(json["reason"], "composition failed");
    }

    #[test]
    fn test_project_response_ignores_unfinished_stages() {
        let project = ProjectRecord::new("rain", "line one");
        let music = ArtifactRef::new(ArtifactKind::Music, format!("{}_a.mp3", project.id));
        let records = vec![
            StageRecord::finished(
                project.id.clone(),
                Stage::Music,
                &StageResult::succeeded(vec![music.clone()]),
            ),
            StageRecord::running(project.id.clone(), Stage::Images),
        ];

        let resp = ProjectResponse::new(&project, &records);
        assert!(resp.has_music_generated);
        assert!(!resp.has_images_generated);
        assert!(!resp.has_video_assembled);
        assert_eq!(resp.music_url, Some(music.url()));
        assert!(resp.image_urls.is_empty());
        assert_eq!(resp.stages.len(), 2);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["hasMusicGenerated"], true);
        assert_eq!(json["stages"][1]["status"], "running");
    }
}
