//! Music video generation pipeline.
//!
//! This crate provides:
//! - Key line selection from generated lyrics
//! - Lyrics, music, image and assembly stages with per-stage fallbacks
//! - Music job polling with an injectable clock
//! - Orchestration with persisted stage records

pub mod clock;
pub mod config;
pub mod error;
pub mod fallback;
pub mod line_selector;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod player;
pub mod poll;
pub mod stages;

#[cfg(any(test, feature = "test-support"))]
pub use clock::ManualClock;
pub use clock::{Clock, TokioClock};
pub use config::PipelineConfig;
pub use error::{PipelineResult, StageError};
pub use fallback::FallbackAssets;
pub use line_selector::{select_key_lines, MAX_KEY_LINES};
pub use logging::StageLogger;
pub use orchestrator::{Pipeline, PipelineBuilder, PipelineRun, ProjectStatus, Providers};
pub use poll::{PollOutcome, PollPolicy};
pub use stages::{FixedStyle, RandomStyle, StyleChooser};
