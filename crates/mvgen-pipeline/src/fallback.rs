//! Static fallback assets.
//!
//! The fallback directory holds substitutes used when a provider fails:
//!
//! ```text
//! fallback/fallback.mp3     silent audio
//! fallback/fallback.html    static player that loads lyrics from the project API
//! fallback/images/*.png     placeholder image pool
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{PipelineResult, StageError};

/// Minimal silent MP3: an empty ID3v2.3 header followed by one frame header.
pub const SILENT_MP3: [u8; 30] = [
    0x49, 0x44, 0x33, 0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0xFF, 0xFB, 0x90, 0x44, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, //
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Content of the text stand-in written when no audio fallback exists.
pub const AUDIO_PLACEHOLDER_TEXT: &str = "Placeholder for audio file";

/// Colours of the seeded placeholder images.
pub const PLACEHOLDER_COLORS: [(&str, [u8; 3]); 6] = [
    ("red", [255, 0, 0]),
    ("green", [0, 255, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("purple", [128, 0, 128]),
    ("cyan", [0, 255, 255]),
];

const PLACEHOLDER_SIZE: u32 = 100;
const AUDIO_FILE: &str = "fallback.mp3";
const HTML_FILE: &str = "fallback.html";
const README_FILE: &str = "README.md";
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

const README: &str = "# Fallback Resources

This directory contains fallback resources for the music video generator.

- `fallback.mp3`: silent audio used when music generation fails
- `fallback.html`: static player used when video assembly fails
- `images/`: placeholder images used when image generation fails

Files here are used automatically when a provider call fails. Replace them
with your own assets; existing files are never overwritten.
";

const FALLBACK_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Music Video Fallback Player</title>
  <style>
    body { font-family: Arial, sans-serif; background-color: #1a1a1a; color: white; margin: 0; display: flex; align-items: center; justify-content: center; min-height: 100vh; }
    .container { width: 800px; max-width: 95vw; background-color: #2c2c2c; border-radius: 10px; padding: 20px; }
    h1 { color: #3498db; text-align: center; }
    .info-box { background-color: #3a3a3a; border-radius: 5px; padding: 15px; margin: 20px 0; }
    .lyrics { white-space: pre-line; background-color: #333; padding: 20px; border-radius: 5px; max-height: 300px; overflow-y: auto; }
  </style>
</head>
<body>
  <div class="container">
    <h1>Music Video</h1>
    <div class="info-box">
      <p>The video could not be assembled, so the lyrics are shown instead.</p>
    </div>
    <h2>Lyrics</h2>
    <div class="lyrics" id="lyrics">Loading lyrics...</div>
  </div>
  <script>
    const file = window.location.pathname.split('/').pop() || '';
    const projectId = file.split('_')[0];
    fetch('/api/project/' + encodeURIComponent(projectId))
      .then(response => response.json())
      .then(data => {
        document.getElementById('lyrics').innerText = data.lyrics || 'No lyrics available';
      })
      .catch(() => {
        document.getElementById('lyrics').innerText = 'Error loading lyrics. Please try again.';
      });
  </script>
</body>
</html>
"#;

/// Access to the fallback directory.
#[derive(Debug, Clone)]
pub struct FallbackAssets {
    dir: PathBuf,
}

impl FallbackAssets {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn images_dir(&self) -> PathBuf {
        self.dir.join("images")
    }

    /// Silent audio file, if present.
    pub async fn audio(&self) -> Option<PathBuf> {
        existing_file(self.dir.join(AUDIO_FILE)).await
    }

    /// Static error player, if present.
    pub async fn html(&self) -> Option<PathBuf> {
        existing_file(self.dir.join(HTML_FILE)).await
    }

    /// Placeholder images sorted by file name. Missing directory gives an
    /// empty pool.
    pub async fn image_pool(&self) -> PipelineResult<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(self.images_dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut pool = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_pool_image(&path) && entry.file_type().await?.is_file() {
                pool.push(path);
            }
        }
        pool.sort();
        Ok(pool)
    }

    /// Create the fallback tree and any missing default assets.
    ///
    /// Returns the files that were created. Existing files are left alone.
    pub async fn seed_defaults(&self) -> PipelineResult<Vec<PathBuf>> {
        fs::create_dir_all(self.images_dir()).await?;

        let mut created = Vec::new();
        let mut seed = |path: PathBuf, written: bool| {
            if written {
                debug!("Seeded fallback asset {}", path.display());
                created.push(path);
            }
        };

        let path = self.dir.join(AUDIO_FILE);
        seed(path.clone(), write_new(&path, &SILENT_MP3).await?);

        let path = self.dir.join(HTML_FILE);
        seed(path.clone(), write_new(&path, FALLBACK_HTML.as_bytes()).await?);

        let path = self.dir.join(README_FILE);
        seed(path.clone(), write_new(&path, README.as_bytes()).await?);

        for (name, rgb) in PLACEHOLDER_COLORS {
            let path = self.images_dir().join(format!("sample_{}.png", name));
            if existing_file(path.clone()).await.is_some() {
                continue;
            }
            let png = solid_png(rgb)?;
            seed(path.clone(), write_new(&path, &png).await?);
        }

        if !created.is_empty() {
            info!(
                "Seeded {} fallback assets in {}",
                created.len(),
                self.dir.display()
            );
        }
        Ok(created)
    }
}

fn is_pool_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn existing_file(path: PathBuf) -> Option<PathBuf> {
    match fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Some(path),
        _ => None,
    }
}

/// Write `bytes` to `path` unless it already exists.
async fn write_new(path: &Path, bytes: &[u8]) -> PipelineResult<bool> {
    let mut file = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(true)
}

/// Encode a solid-colour square as PNG.
pub fn solid_png(rgb: [u8; 3]) -> PipelineResult<Vec<u8>> {
    let img = RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, Rgb(rgb));
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), img.width(), img.height(), ColorType::Rgb8)
        .map_err(|e| StageError::fatal_io(format!("PNG encoding failed: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_dir_has_no_assets() {
        let dir = TempDir::new().unwrap();
        let assets = FallbackAssets::new(dir.path().join("fallback"));
        assert!(assets.audio().await.is_none());
        assert!(assets.html().await.is_none());
        assert!(assets.image_pool().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_creates_defaults() {
        let dir = TempDir::new().unwrap();
        let assets = FallbackAssets::new(dir.path().join("fallback"));

        let created = assets.seed_defaults().await.unwrap();
        assert_eq!(created.len(), 9);

        let audio = assets.audio().await.unwrap();
        assert_eq!(tokio::fs::read(audio).await.unwrap(), SILENT_MP3);
        assert!(assets.html().await.is_some());

        let pool = assets.image_pool().await.unwrap();
        assert_eq!(pool.len(), 6);
        let first = tokio::fs::read(&pool[0]).await.unwrap();
        let decoded = image::load_from_memory(&first).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (100, 100));
    }

    #[tokio::test]
    async fn test_seed_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let assets = FallbackAssets::new(dir.path().join("fallback"));
        tokio::fs::create_dir_all(assets.dir()).await.unwrap();
        tokio::fs::write(assets.dir().join("fallback.mp3"), b"custom")
            .await
            .unwrap();

        let created = assets.seed_defaults().await.unwrap();
        assert_eq!(created.len(), 8);
        let audio = assets.audio().await.unwrap();
        assert_eq!(tokio::fs::read(audio).await.unwrap(), b"custom");

        // Second run is a no-op
        assert!(assets.seed_defaults().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pool_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let assets = FallbackAssets::new(dir.path());
        let images = assets.images_dir();
        tokio::fs::create_dir_all(&images).await.unwrap();
        for name in ["b.JPG", "a.png", "notes.txt", "c.jpeg"] {
            tokio::fs::write(images.join(name), b"x").await.unwrap();
        }

        let names: Vec<_> = assets
            .image_pool()
            .await
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG", "c.jpeg"]);
    }
}
