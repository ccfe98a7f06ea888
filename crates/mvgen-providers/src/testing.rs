//! In-memory provider doubles for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{ProviderError, ProviderResult};
use crate::image::ImageGenerator;
use crate::music::{MusicGenerator, MusicJob, MusicJobStatus, MusicRequest};
use crate::text::TextGenerator;

/// A provider that is down: every call fails with a network error.
#[derive(Debug, Default)]
pub struct DownProvider {
    calls: AtomicUsize,
}

impl DownProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> ProviderResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ProviderError::Network("connection refused".to_string()))
    }
}

#[async_trait]
impl TextGenerator for DownProvider {
    async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
        self.fail()
    }
}

#[async_trait]
impl MusicGenerator for DownProvider {
    async fn submit(&self, _request: &MusicRequest) -> ProviderResult<String> {
        self.fail()
    }

    async fn poll(&self, _job_id: &str) -> ProviderResult<MusicJob> {
        self.fail()
    }

    async fn fetch(&self, _audio_url: &str) -> ProviderResult<Vec<u8>> {
        self.fail()
    }
}

#[async_trait]
impl ImageGenerator for DownProvider {
    async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
        self.fail()
    }

    async fn fetch(&self, _image_url: &str) -> ProviderResult<Vec<u8>> {
        self.fail()
    }
}

/// Text generator that always returns the same result.
#[derive(Debug)]
pub struct StaticText {
    result: ProviderResult<String>,
    prompts: Mutex<Vec<String>>,
}

impl StaticText {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            result: Ok(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn err(error: ProviderError) -> Self {
        Self {
            result: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for StaticText {
    async fn generate(&self, prompt: &str) -> ProviderResult<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.result.clone()
    }
}

/// Music generator that replays a script of poll results.
///
/// Once the script runs out the last poll result repeats.
#[derive(Debug)]
pub struct ScriptedMusic {
    submit: ProviderResult<String>,
    polls: Mutex<VecDeque<ProviderResult<MusicJob>>>,
    last_poll: Mutex<Option<ProviderResult<MusicJob>>>,
    audio: ProviderResult<Vec<u8>>,
    poll_calls: AtomicUsize,
    requests: Mutex<Vec<MusicRequest>>,
}

impl ScriptedMusic {
    pub fn new(polls: Vec<ProviderResult<MusicJob>>, audio: ProviderResult<Vec<u8>>) -> Self {
        Self {
            submit: Ok("job-1".to_string()),
            polls: Mutex::new(polls.into()),
            last_poll: Mutex::new(None),
            audio,
            poll_calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Completes after `pending` in-progress polls.
    pub fn completing_after(pending: usize, audio: &[u8]) -> Self {
        let mut polls: Vec<ProviderResult<MusicJob>> = (0..pending)
            .map(|_| Ok(Self::job(MusicJobStatus::InProgress, None)))
            .collect();
        polls.push(Ok(Self::job(
            MusicJobStatus::Complete,
            Some("https://audio.example/track.mp3"),
        )));
        Self::new(polls, Ok(audio.to_vec()))
    }

    /// Never leaves the queue.
    pub fn stuck() -> Self {
        Self::new(
            vec![Ok(Self::job(MusicJobStatus::Queued, None))],
            Ok(Vec::new()),
        )
    }

    pub fn job(status: MusicJobStatus, audio_url: Option<&str>) -> MusicJob {
        MusicJob {
            status,
            audio_url: audio_url.map(str::to_string),
        }
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    /// Requests submitted so far.
    pub fn requests(&self) -> Vec<MusicRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl MusicGenerator for ScriptedMusic {
    async fn submit(&self, request: &MusicRequest) -> ProviderResult<String> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        self.submit.clone()
    }

    async fn poll(&self, _job_id: &str) -> ProviderResult<MusicJob> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.polls.lock().ok().and_then(|mut q| q.pop_front());
        let mut last = self
            .last_poll
            .lock()
            .map_err(|_| ProviderError::Network("poisoned".to_string()))?;
        match next {
            Some(result) => {
                *last = Some(result.clone());
                result
            }
            None => last
                .clone()
                .unwrap_or_else(|| Err(ProviderError::empty_result("no scripted poll"))),
        }
    }

    async fn fetch(&self, _audio_url: &str) -> ProviderResult<Vec<u8>> {
        self.audio.clone()
    }
}

/// Image generator whose `generate` results follow a per-call script.
///
/// Calls beyond the script repeat the final entry.
#[derive(Debug)]
pub struct ScriptedImages {
    script: Vec<ProviderResult<String>>,
    image: Vec<u8>,
    calls: AtomicUsize,
}

impl ScriptedImages {
    pub fn new(script: Vec<ProviderResult<String>>, image: &[u8]) -> Self {
        Self {
            script,
            image: image.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every call succeeds.
    pub fn always_ok(image: &[u8]) -> Self {
        Self::new(vec![Ok("https://img.example/x.png".to_string())], image)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for ScriptedImages {
    async fn generate(&self, _prompt: &str) -> ProviderResult<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .get(call)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::empty_result("no scripted image")))
    }

    async fn fetch(&self, _image_url: &str) -> ProviderResult<Vec<u8>> {
        Ok(self.image.clone())
    }
}
