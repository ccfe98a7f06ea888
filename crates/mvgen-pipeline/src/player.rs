//! HTML slideshow player composition.

use mvgen_models::ProjectId;

use crate::error::{PipelineResult, StageError};

/// Scenes shown when a project has no image artifacts at all.
pub const GENERIC_SCENES: [&str; 6] = [
    "A vibrant cityscape at night with neon lights",
    "A serene beach at sunset with gentle waves",
    "A majestic mountain range with snow-capped peaks",
    "A cozy cafe interior with warm lighting",
    "A peaceful forest with sunlight filtering through the trees",
    "A dramatic stormy sky over a vast landscape",
];

/// One slide of the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slide {
    /// Image served from the given URL
    Image { src: String },
    /// Text shown in place of an image
    Text { content: String },
}

impl Slide {
    pub fn image(src: impl Into<String>) -> Self {
        Slide::Image { src: src.into() }
    }

    pub fn text(content: impl Into<String>) -> Self {
        Slide::Text {
            content: content.into(),
        }
    }

    fn render(&self, index: usize) -> String {
        let class = if index == 0 { "slide active" } else { "slide" };
        let body = match self {
            Slide::Image { src } => format!(
                r#"<img src="{}" alt="Scene {}">"#,
                escape_html(src),
                index + 1
            ),
            Slide::Text { content } => {
                format!(r#"<div class="text-content">{}</div>"#, escape_html(content))
            }
        };
        format!(
            "      <div class=\"{}\" id=\"slide-{}\">{}</div>\n",
            class, index, body
        )
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Compose a self-contained player.
///
/// The audio drives the current slide (`floor(t / duration * slides)`);
/// without playable audio the slides advance every `slide_duration_secs`.
pub fn render_player(
    music_url: &str,
    slides: &[Slide],
    slide_duration_secs: u32,
) -> PipelineResult<String> {
    if slides.is_empty() {
        return Err(StageError::resource_missing("no slides to compose"));
    }
    let slide_html: String = slides
        .iter()
        .enumerate()
        .map(|(i, slide)| slide.render(i))
        .collect();

    // Slides go in last so their text is never substituted
    Ok(PLAYER_TEMPLATE
        .replace("__SLIDE_DURATION__", &slide_duration_secs.max(1).to_string())
        .replace("__TOTAL_SLIDES__", &slides.len().to_string())
        .replace("__AUDIO_SRC__", &escape_html(music_url))
        .replace("__SLIDES__", &slide_html))
}

/// Minimal page shown when assembly fails and no static fallback exists.
///
/// The page loads the project's lyrics from the API so the visitor still
/// gets something.
pub fn render_error_page(project_id: &ProjectId, message: &str) -> String {
    ERROR_TEMPLATE
        .replace("__PROJECT_ID__", project_id.as_str())
        .replace("__MESSAGE__", &escape_html(message))
}

const PLAYER_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Music Video</title>
  <style>
    body { font-family: Arial, sans-serif; background-color: #000; color: white; margin: 0; display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; }
    .player-container { width: 800px; max-width: 95vw; position: relative; overflow: hidden; border-radius: 8px; }
    .slide-container { width: 100%; height: 450px; position: relative; background-color: #111; overflow: hidden; }
    .slide { position: absolute; top: 0; left: 0; width: 100%; height: 100%; opacity: 0; transition: opacity 1s ease-in-out; display: flex; align-items: center; justify-content: center; }
    .slide.active { opacity: 1; }
    .slide img { max-width: 100%; max-height: 100%; object-fit: contain; }
    .slide .text-content { font-size: 24px; padding: 20px; text-align: center; background-color: rgba(0, 0, 0, 0.7); border-radius: 10px; max-width: 80%; }
    .controls { width: 100%; background-color: #222; padding: 15px; box-sizing: border-box; display: flex; align-items: center; }
    .play-pause { background-color: #3498db; color: white; border: none; width: 40px; height: 40px; border-radius: 50%; cursor: pointer; margin-right: 15px; }
    .progress-container { flex-grow: 1; height: 10px; background-color: #444; border-radius: 5px; cursor: pointer; }
    .progress-bar { height: 100%; background-color: #3498db; border-radius: 5px; width: 0%; }
    .time { margin-left: 15px; font-size: 14px; color: #ccc; }
  </style>
</head>
<body>
  <h1>Music Video</h1>
  <div class="player-container">
    <div class="slide-container" id="slideContainer">
__SLIDES__    </div>
    <div class="controls">
      <button class="play-pause" id="playPauseBtn">&#9654;</button>
      <div class="progress-container" id="progressContainer">
        <div class="progress-bar" id="progressBar"></div>
      </div>
      <div class="time" id="timeDisplay">0:00 / 0:00</div>
    </div>
  </div>
  <audio id="audioPlayer" style="display: none;" src="__AUDIO_SRC__"></audio>
  <script>
    document.addEventListener('DOMContentLoaded', function () {
      const audio = document.getElementById('audioPlayer');
      const playPauseBtn = document.getElementById('playPauseBtn');
      const progressBar = document.getElementById('progressBar');
      const progressContainer = document.getElementById('progressContainer');
      const timeDisplay = document.getElementById('timeDisplay');
      const slides = document.querySelectorAll('.slide');
      const slideDuration = __SLIDE_DURATION__;
      const totalSlides = __TOTAL_SLIDES__;
      let currentSlide = 0;
      let autoAdvance = null;

      function showSlide(index) {
        if (index === currentSlide) return;
        slides[currentSlide].classList.remove('active');
        slides[index].classList.add('active');
        currentSlide = index;
      }

      function nextSlide() {
        showSlide((currentSlide + 1) % totalSlides);
      }

      function startAutoAdvance() {
        if (autoAdvance === null) {
          autoAdvance = setInterval(nextSlide, slideDuration * 1000);
        }
      }

      function fmt(seconds) {
        const s = Math.floor(seconds) || 0;
        return Math.floor(s / 60) + ':' + String(s % 60).padStart(2, '0');
      }

      if (!audio.getAttribute('src').endsWith('.mp3')) {
        startAutoAdvance();
      }

      playPauseBtn.addEventListener('click', function () {
        if (audio.paused) {
          audio.play().catch(startAutoAdvance);
          playPauseBtn.innerHTML = '&#10074;&#10074;';
        } else {
          audio.pause();
          playPauseBtn.innerHTML = '&#9654;';
        }
      });

      audio.addEventListener('timeupdate', function () {
        if (isNaN(audio.duration) || audio.duration === 0) return;
        progressBar.style.width = (audio.currentTime / audio.duration) * 100 + '%';
        timeDisplay.textContent = fmt(audio.currentTime) + ' / ' + fmt(audio.duration);
        showSlide(Math.min(Math.floor((audio.currentTime / audio.duration) * totalSlides), totalSlides - 1));
      });

      progressContainer.addEventListener('click', function (e) {
        if (isNaN(audio.duration)) return;
        audio.currentTime = (e.offsetX / progressContainer.offsetWidth) * audio.duration;
      });

      audio.addEventListener('error', startAutoAdvance);
    });
  </script>
</body>
</html>
"#;

const ERROR_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Music Video</title>
  <style>
    body { font-family: Arial, sans-serif; background-color: #1a1a1a; color: white; text-align: center; padding: 50px; }
    h1 { color: #e74c3c; }
    .container { max-width: 800px; margin: 0 auto; background-color: #2c2c2c; padding: 20px; border-radius: 10px; }
    #lyrics { white-space: pre-line; text-align: left; background-color: #333; padding: 20px; border-radius: 5px; margin-top: 20px; }
  </style>
</head>
<body>
  <div class="container">
    <h1>Music Video Error</h1>
    <p>Sorry, we couldn't assemble your music video, but we can still display the lyrics!</p>
    <p>Error: __MESSAGE__</p>
    <div id="lyrics">Loading lyrics...</div>
  </div>
  <script>
    fetch('/api/project/__PROJECT_ID__')
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"rock" & 'roll'</b>"#),
            "&lt;b&gt;&quot;rock&quot; &amp; &#39;roll&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_player_contains_slides_and_audio() {
        let slides = vec![
            Slide::image("/outputs/images/p_1_0.png"),
            Slide::text("Rain <on> the glass"),
        ];
        let html = render_player("/outputs/music/p_1.mp3", &slides, 5).unwrap();

        assert!(html.contains(r#"src="/outputs/music/p_1.mp3""#));
        assert!(html.contains(r#"<img src="/outputs/images/p_1_0.png" alt="Scene 1">"#));
        assert!(html.contains("Rain &lt;on&gt; the glass"));
        assert!(html.contains("const totalSlides = 2;"));
        assert!(html.contains("const slideDuration = 5;"));
        assert_eq!(html.matches("class=\"slide active\"").count(), 1);
        assert!(!html.contains("__"));
    }

    #[test]
    fn test_slide_text_is_kept_verbatim() {
        let slides = vec![
            Slide::text("sing __AUDIO_SRC__ and __TOTAL_SLIDES__"),
            Slide::text("__SLIDE_DURATION__ __SLIDES__"),
        ];
        let html = render_player("/outputs/music/a.mp3", &slides, 5).unwrap();

        assert!(html.contains(
            r#"<div class="text-content">sing __AUDIO_SRC__ and __TOTAL_SLIDES__</div>"#
        ));
        assert!(html.contains(r#"<div class="text-content">__SLIDE_DURATION__ __SLIDES__</div>"#));
        assert!(html.contains(r#"src="/outputs/music/a.mp3""#));
        assert!(html.contains("const totalSlides = 2;"));
    }

    #[test]
    fn test_player_without_slides_fails() {
        assert!(render_player("/outputs/music/x.mp3", &[], 5).is_err());
    }

    #[test]
    fn test_error_page_references_project() {
        let id = ProjectId::new();
        let html = render_error_page(&id, "disk <full>");
        assert!(html.contains(&format!("/api/project/{}", id)));
        assert!(html.contains("disk &lt;full&gt;"));

        let html = render_error_page(&id, "lost __PROJECT_ID__");
        assert!(html.contains("Error: lost __PROJECT_ID__"));
    }
}
