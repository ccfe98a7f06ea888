//! Artifact filename construction.
//!
//! Every artifact file is named `<project-id>[_<tag>]_<uuid>[_<index>].<ext>`.
//! The project prefix makes artifacts addressable per project; the random
//! UUID keeps names unique across the whole namespace, so concurrent
//! pipelines never write the same path.

use mvgen_models::ProjectId;
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

/// Description of a new artifact filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    extension: String,
    tag: Option<String>,
    index: Option<usize>,
}

impl ArtifactName {
    /// Name with the given extension (without the leading dot).
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_ascii_lowercase(),
            tag: None,
            index: None,
        }
    }

    /// Add a short tag such as `fallback` or `error`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Add a positional index (used for ordered image sets).
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Render a fresh, unique filename for `project`.
    pub fn render(&self, project: &ProjectId) -> StorageResult<String> {
        validate_segment(&self.extension)?;
        let mut name = project.to_string();
        if let Some(tag) = &self.tag {
            validate_segment(tag)?;
            name.push('_');
            name.push_str(tag);
        }
        name.push('_');
        name.push_str(&Uuid::new_v4().to_string());
        if let Some(index) = self.index {
            name.push('_');
            name.push_str(&index.to_string());
        }
        name.push('.');
        name.push_str(&self.extension);
        Ok(name)
    }
}

fn validate_segment(segment: &str) -> StorageResult<()> {
    if segment.is_empty()
        || !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(StorageError::invalid_key(segment));
    }
    Ok(())
}

/// Reject filenames that could escape their directory.
pub fn validate_file_name(file_name: &str) -> StorageResult<()> {
    if file_name.is_empty()
        || file_name.starts_with('.')
        || file_name.contains('/')
        || file_name.contains('\\')
        || file_name.contains("..")
    {
        return Err(StorageError::invalid_key(file_name));
    }
    Ok(())
}

/// Trailing positional index of a filename (`..._3.png` -> `Some(3)`).
pub fn trailing_index(file_name: &str) -> Option<usize> {
    let stem = file_name.rsplit_once('.').map_or(file_name, |(s, _)| s);
    stem.rsplit_once('_').and_then(|(_, idx)| idx.parse().ok())
}
