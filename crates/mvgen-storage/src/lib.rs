//! Artifact storage for generated projects.
//!
//! This crate provides:
//! - The [`ArtifactStore`] repository trait used by the pipeline
//! - A local filesystem implementation with one directory per artifact kind
//! - Collision-free, project-qualified artifact naming
//! - Per-stage records used for status queries and idempotency checks

pub mod error;
pub mod local;
pub mod naming;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use local::LocalArtifactStore;
pub use naming::ArtifactName;
pub use store::ArtifactStore;
