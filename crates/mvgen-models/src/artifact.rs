//! Artifact references.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of artifact a stage produces. Each kind lives in its own directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Lyrics,
    Music,
    Image,
    Video,
}

impl ArtifactKind {
    /// All artifact kinds, in pipeline order.
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Lyrics,
        ArtifactKind::Music,
        ArtifactKind::Image,
        ArtifactKind::Video,
    ];

    /// Directory name under the output root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ArtifactKind::Lyrics => "lyrics",
            ArtifactKind::Music => "music",
            ArtifactKind::Image => "images",
            ArtifactKind::Video => "videos",
        }
    }
}

/// Reference to one persisted artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactRef {
    pub kind: ArtifactKind,
    /// Filename within the kind's directory
    pub file_name: String,
    /// True when the artifact is a fallback substitute or synthesized stand-in
    #[serde(default)]
    pub placeholder: bool,
}

impl ArtifactRef {
    pub fn new(kind: ArtifactKind, file_name: impl Into<String>) -> Self {
        Self {
            kind,
            file_name: file_name.into(),
            placeholder: false,
        }
    }

    /// Mark this reference as a fallback substitute.
    pub fn as_placeholder(mut self) -> Self {
        self.placeholder = true;
        self
    }

    /// Public URL path under which the artifact is served.
    pub fn url(&self) -> String {
        format!("/outputs/{}/{}", self.kind.dir_name(), self.file_name)
    }

    /// Lowercased file extension, if any.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Text stand-ins are rendered as text slides rather than media.
    pub fn is_text(&self) -> bool {
        self.extension().as_deref() == Some("txt")
    }

    pub fn is_html(&self) -> bool {
        self.extension().as_deref() == Some("html")
    }
}
