//! Pipeline error types.

use mvgen_providers::ProviderError;
use mvgen_storage::StorageError;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, StageError>;

/// Why a stage could not use its preferred path.
///
/// Only the fatal variants ever leave a stage; the rest select a fallback.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Provider unavailable: {0}")]
    TransientProvider(String),

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Resource missing: {0}")]
    ResourceMissing(String),

    #[error("I/O failure: {0}")]
    FatalIo(String),

    #[error("Missing upstream artifact: {0}")]
    MissingUpstream(String),

    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StageError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientProvider(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn resource_missing(msg: impl Into<String>) -> Self {
        Self::ResourceMissing(msg.into())
    }

    pub fn fatal_io(msg: impl Into<String>) -> Self {
        Self::FatalIo(msg.into())
    }

    pub fn missing_upstream(msg: impl Into<String>) -> Self {
        Self::MissingUpstream(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Errors no fallback can fix: the stage's inputs are missing or the
    /// run was cancelled. Everything else, including a failed write on the
    /// primary path, still gets a fallback attempt.
    pub fn blocks_fallback(&self) -> bool {
        matches!(
            self,
            StageError::MissingUpstream(_)
                | StageError::ProjectNotFound(_)
                | StageError::Timeout(_)
                | StageError::InvalidInput(_)
        )
    }
}

impl From<ProviderError> for StageError {
    fn from(err: ProviderError) -> Self {
        if err.is_transient() {
            StageError::TransientProvider(err.to_string())
        } else {
            StageError::InvalidResponse(err.to_string())
        }
    }
}

impl From<StorageError> for StageError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => StageError::ResourceMissing(what),
            other => StageError::FatalIo(other.to_string()),
        }
    }
}

impl From<std::io::Error> for StageError {
    fn from(err: std::io::Error) -> Self {
        StageError::FatalIo(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_errors_are_not_fatal() {
        let cases = [
            ProviderError::Network("reset".into()),
            ProviderError::RateLimited("slow down".into()),
            ProviderError::Api(500, "boom".into()),
            ProviderError::not_configured("SUNO_API_KEY"),
        ];
        for err in cases {
            let stage_err = StageError::from(err);
            assert!(matches!(stage_err, StageError::TransientProvider(_)));
            assert!(!stage_err.blocks_fallback());
        }

        let malformed = StageError::from(ProviderError::empty_result("no url"));
        assert!(matches!(malformed, StageError::InvalidResponse(_)));

        let rejected = StageError::from(ProviderError::from_http_status(400, "bad prompt"));
        assert!(matches!(rejected, StageError::InvalidResponse(_)));
        assert!(!rejected.blocks_fallback());
    }

    #[test]
    fn test_storage_errors_classification() {
        let missing = StageError::from(StorageError::not_found("fallback.mp3"));
        assert!(matches!(missing, StageError::ResourceMissing(_)));
        assert!(!missing.blocks_fallback());

        let io = StageError::from(StorageError::Io(std::io::Error::other("disk full")));
        assert!(matches!(io, StageError::FatalIo(_)));
        assert!(!io.blocks_fallback());
        assert!(StageError::missing_upstream("no key lines").blocks_fallback());
    }
}
