//! Music style sent along with a generation request.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Key the track is generated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Tonic {
    #[serde(rename = "C major")]
    CMajor,
    #[serde(rename = "A minor")]
    AMinor,
}

impl Tonic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tonic::CMajor => "C major",
            Tonic::AMinor => "A minor",
        }
    }

    pub fn from_major(is_major: bool) -> Self {
        if is_major {
            Tonic::CMajor
        } else {
            Tonic::AMinor
        }
    }
}

/// Genre and key for one music generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MusicStyle {
    pub genre: String,
    pub tonic: Tonic,
}

impl MusicStyle {
    pub fn new(genre: impl Into<String>, tonic: Tonic) -> Self {
        Self {
            genre: genre.into(),
            tonic,
        }
    }
}

impl Default for MusicStyle {
    fn default() -> Self {
        Self::new("pop", Tonic::CMajor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tonic_serializes_as_key_name() {
        let json = serde_json::to_string(&Tonic::AMinor).unwrap();
        assert_eq!(json, "\"A minor\"");
        assert_eq!(Tonic::from_major(true), Tonic::CMajor);
    }
}
