//! Playback requests to the external speech service.
//!
//! The session only ever calls [`Speaker::speak`], which returns immediately.
//! Whether audio is actually produced is not the session's concern: a failed
//! request is logged here and dropped.

use std::env;
use std::sync::{Arc, Mutex};

use reqwest::Client;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::error::SpeechError;

/// Phrase played after a correct answer.
pub const CORRECT_PHRASE: &str = "correct";
/// Phrase played after a wrong answer.
pub const INCORRECT_PHRASE: &str = "incorrect";

/// Fire-and-forget text-to-speech.
pub trait Speaker: Send + Sync {
    /// Request playback of `text`. Must not block and must not fail the caller.
    fn speak(&self, text: &str);
}

/// Speaker used when no speech service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpeaker;

impl Speaker for NoopSpeaker {
    fn speak(&self, _text: &str) {}
}

/// Keeps every requested phrase; handy for tests and transcripts.
#[derive(Debug, Clone, Default)]
pub struct RecordingSpeaker {
    spoken: Arc<Mutex<Vec<String>>>,
}

impl RecordingSpeaker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything requested so far, oldest first.
    #[must_use]
    pub fn spoken(&self) -> Vec<String> {
        self.spoken
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl Speaker for RecordingSpeaker {
    fn speak(&self, text: &str) {
        if let Ok(mut guard) = self.spoken.lock() {
            guard.push(text.to_string());
        }
    }
}

#[derive(Clone, Debug)]
pub struct SpeechConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub voice: String,
}

impl SpeechConfig {
    /// Read `LINGO_SPEECH_API_KEY` and friends; `None` when no key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("LINGO_SPEECH_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("LINGO_SPEECH_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("LINGO_SPEECH_MODEL").unwrap_or_else(|_| "tts-1".into());
        let voice = env::var("LINGO_SPEECH_VOICE").unwrap_or_else(|_| "alloy".into());
        Some(Self {
            base_url,
            api_key,
            model,
            voice,
        })
    }
}

/// Speaker backed by an HTTP text-to-speech endpoint.
///
/// Each request is spawned on the current tokio runtime. Outside a runtime the
/// request is skipped.
#[derive(Clone)]
pub struct HttpSpeaker {
    client: Client,
    config: SpeechConfig,
}

impl HttpSpeaker {
    #[must_use]
    pub fn new(config: SpeechConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn request(client: Client, config: SpeechConfig, text: String) -> Result<(), SpeechError> {
        let url = format!("{}/audio/speech", config.base_url.trim_end_matches('/'));
        let payload = SpeechRequest {
            model: config.model,
            voice: config.voice,
            input: text,
        };
        let response = client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SpeechError::HttpStatus(response.status()));
        }
        // Audio bytes go to the platform player, which lives outside this crate.
        let _audio = response.bytes().await?;
        Ok(())
    }
}

impl Speaker for HttpSpeaker {
    fn speak(&self, text: &str) {
        let Ok(handle) = Handle::try_current() else {
            debug!(target: "speech", "No async runtime; skipping playback");
            return;
        };
        let client = self.client.clone();
        let config = self.config.clone();
        let text = text.to_string();
        handle.spawn(async move {
            if let Err(err) = Self::request(client, config, text).await {
                warn!(target: "speech", error = %err, "Speech request failed");
            }
        });
    }
}

/// Speaker chosen from the environment: HTTP when configured, silent otherwise.
#[must_use]
pub fn speaker_from_env() -> Arc<dyn Speaker> {
    match SpeechConfig::from_env() {
        Some(config) => Arc::new(HttpSpeaker::new(config)),
        None => Arc::new(NoopSpeaker),
    }
}

#[derive(Debug, Serialize)]
struct SpeechRequest {
    model: String,
    voice: String,
    input: String,
}
