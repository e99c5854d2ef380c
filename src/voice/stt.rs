//! Speech-to-text via the `OpenAI` transcription API

use crate::{Error, Result};

const TRANSCRIPTION_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Response from `OpenAI` Whisper transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Transcribes recorded utterances
pub struct Transcriber {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl Transcriber {
    /// Create a Whisper transcriber
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config(
                "OpenAI API key required for speech recognition".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
        })
    }

    /// Transcribe WAV audio
    ///
    /// `language` is a BCP 47 tag; only its primary subtag is sent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] when the service is unreachable and
    /// [`Error::Stt`] when it rejects the request
    pub async fn transcribe(&self, audio: &[u8], language: &str) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let mut form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        if let Some(primary) = primary_language(language) {
            form = form.text("language", primary.to_string());
        }

        let response = self
            .client
            .post(TRANSCRIPTION_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Stt(format!("transcription error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        let transcript = result.text.trim().to_string();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

/// "en-US" -> "en"
fn primary_language(tag: &str) -> Option<&str> {
    tag.split(['-', '_'])
        .next()
        .filter(|p| p.len() == 2 || p.len() == 3)
}
