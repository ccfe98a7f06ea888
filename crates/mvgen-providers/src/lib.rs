//! Generative AI provider clients.
//!
//! This crate provides:
//! - Capability traits for text, music and image generation
//! - HTTP adapters for each provider, configured explicitly at construction
//! - A shared error type distinguishing transient from malformed failures
//! - Scriptable test doubles behind the `test-support` feature

pub mod error;
mod http;
pub mod image;
pub mod music;
pub mod text;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{ProviderError, ProviderResult};
pub use image::{ImageGenerator, OpenAiImageClient, OpenAiImageConfig};
pub use music::{MusicGenerator, MusicJob, MusicJobStatus, MusicRequest, SunoClient, SunoConfig};
pub use text::{AnthropicClient, AnthropicConfig, TextGenerator};
