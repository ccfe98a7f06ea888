//! Pipeline configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::poll::PollPolicy;

/// Default genres for music style selection.
pub const DEFAULT_MUSIC_STYLES: [&str; 6] = ["pop", "rock", "indie", "electronic", "folk", "hip-hop"];

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root of the artifact store
    pub output_dir: PathBuf,
    /// Directory holding static fallback assets
    pub fallback_dir: PathBuf,
    /// Polling schedule for music jobs
    pub music_poll: PollPolicy,
    /// Wait after each successful image request
    pub image_request_delay: Duration,
    /// Lyrics are truncated to this many characters before music submission
    pub lyrics_char_limit: usize,
    /// Genres to pick from when submitting music
    pub music_styles: Vec<String>,
    /// Upper bound for a full pipeline run (None = unbounded)
    pub project_timeout: Option<Duration>,
    /// Seconds per slide in the assembled player
    pub slide_duration_secs: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("public/outputs"),
            fallback_dir: PathBuf::from("public/fallback"),
            music_poll: PollPolicy::default(),
            image_request_delay: Duration::from_millis(2000),
            lyrics_char_limit: 2000,
            music_styles: DEFAULT_MUSIC_STYLES.iter().map(|s| s.to_string()).collect(),
            project_timeout: None,
            slide_duration_secs: 5,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            fallback_dir: std::env::var("FALLBACK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.fallback_dir),
            music_poll: PollPolicy::new(
                Duration::from_secs(
                    std::env::var("MUSIC_POLL_INTERVAL_SECS")
                        .ok()
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(5),
                ),
                std::env::var("MUSIC_POLL_MAX_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            )
            .with_backoff(
                std::env::var("MUSIC_POLL_BACKOFF")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1.0),
            ),
            image_request_delay: Duration::from_millis(
                std::env::var("IMAGE_REQUEST_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2000),
            ),
            lyrics_char_limit: std::env::var("LYRICS_CHAR_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
            music_styles: std::env::var("MUSIC_STYLES")
                .ok()
                .map(|s| parse_list(&s))
                .filter(|list| !list.is_empty())
                .unwrap_or(defaults.music_styles),
            project_timeout: std::env::var("PROJECT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            slide_duration_secs: std::env::var("SLIDE_DURATION_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(5),
        }
    }

    /// Directory of placeholder images.
    pub fn fallback_images_dir(&self) -> PathBuf {
        self.fallback_dir.join("images")
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.music_poll.interval, Duration::from_secs(5));
        assert_eq!(config.music_poll.max_attempts, 10);
        assert_eq!(config.image_request_delay, Duration::from_secs(2));
        assert_eq!(config.music_styles.len(), 6);
        assert!(config.project_timeout.is_none());
        assert_eq!(config.fallback_images_dir(), PathBuf::from("public/fallback/images"));
    }

    #[test]
    fn test_parse_list_skips_blanks() {
        assert_eq!(parse_list(" jazz, ,blues ,"), vec!["jazz", "blues"]);
        assert!(parse_list(" , ").is_empty());
    }
}
