//! Shared data models for the music video generator.
//!
//! This crate provides Serde-serializable types for:
//! - Projects and their identifiers
//! - Pipeline stages, stage status and stage results
//! - Artifact references and their on-disk naming
//! - Music style selection
//! - HTTP request and response bodies

pub mod api;
pub mod artifact;
pub mod project;
pub mod stage;
pub mod style;

// Re-export common types
pub use api::{
    GenerateLyricsRequest, GenerateResponse, ImagesResponse, LyricsResponse, MusicResponse,
    ProjectResponse, StageRequest, StageSummary, VideoResponse,
};
pub use artifact::{ArtifactKind, ArtifactRef};
pub use project::{InvalidProjectId, ProjectId, ProjectRecord};
pub use stage::{Stage, StageRecord, StageResult, StageStatus};
pub use style::{MusicStyle, Tonic};
