//! Text-to-speech via the `OpenAI` speech API

use super::catalog::Voice;
use super::output::Prosody;
use crate::{Error, Result};

const SPEECH_URL: &str = "https://api.openai.com/v1/audio/speech";

/// Voices offered by the speech API
pub const OPENAI_VOICES: &[&str] = &["alloy", "echo", "fable", "onyx", "nova", "shimmer"];

/// Voice used when an utterance names none
pub const DEFAULT_OPENAI_VOICE: &str = "nova";

/// Language reported for API voices
const OPENAI_VOICE_LANG: &str = "en-US";

/// Synthesizes speech as MP3
pub struct SpeechClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl SpeechClient {
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        })
    }

    /// The voices this client can speak with
    #[must_use]
    pub fn voices() -> Vec<Voice> {
        OPENAI_VOICES
            .iter()
            .map(|name| Voice::new(*name, OPENAI_VOICE_LANG))
            .collect()
    }

    /// Synthesize text, returning MP3 bytes
    ///
    /// Rate maps onto the API's speed; pitch has no API equivalent and
    /// volume is applied at playback.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str, voice: &str, prosody: Prosody) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: api_speed(prosody.rate),
        };

        let response = self
            .client
            .post(SPEECH_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        tracing::debug!(bytes = audio.len(), voice, "speech synthesized");
        Ok(audio.to_vec())
    }
}

/// The API accepts 0.25 to 4.0
fn api_speed(rate: f32) -> f32 {
    rate.clamp(0.25, 4.0)
}
