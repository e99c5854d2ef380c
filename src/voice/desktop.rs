//! Desktop speech backend
//!
//! Recognition records from the default microphone on a dedicated thread
//! (cpal streams cannot cross threads), endpoints the utterance locally and
//! transcribes it over HTTP. Synthesis fetches MP3 from the speech API and
//! plays it on a blocking task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use super::capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
use super::catalog::Voice;
use super::detector::{EndpointState, UtteranceDetector};
use super::input::{RecognitionConfig, RecognitionError, RecognitionEvent, RecognitionEvents, Recognizer};
use super::output::{Synthesizer, Utterance};
use super::playback::{AudioPlayback, decode_mp3};
use super::stt::Transcriber;
use super::tts::{DEFAULT_OPENAI_VOICE, SpeechClient};
use crate::Error;

/// How often the capture buffer is drained
const CAPTURE_POLL: Duration = Duration::from_millis(100);

struct ActiveSession {
    cancel: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
}

/// Microphone + transcription API recognizer
pub struct DesktopRecognizer {
    transcriber: Arc<Transcriber>,
    runtime: Handle,
    session: Mutex<Option<ActiveSession>>,
}

impl DesktopRecognizer {
    /// Build a recognizer if a microphone and a runtime are present
    #[must_use]
    pub fn probe(transcriber: Transcriber) -> Option<Self> {
        if !AudioCapture::is_available() {
            tracing::info!("no microphone found, speech recognition disabled");
            return None;
        }
        let runtime = Handle::try_current().ok()?;

        Some(Self {
            transcriber: Arc::new(transcriber),
            runtime,
            session: Mutex::new(None),
        })
    }
}

impl Recognizer for DesktopRecognizer {
    fn start(
        &self,
        config: &RecognitionConfig,
        events: RecognitionEvents,
    ) -> Result<(), RecognitionError> {
        let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        if session
            .as_ref()
            .is_some_and(|s| !s.done.load(Ordering::SeqCst))
        {
            return Err(RecognitionError::InvalidState);
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let done = Arc::new(AtomicBool::new(false));

        let worker = {
            let cancel = Arc::clone(&cancel);
            let done = Arc::clone(&done);
            let transcriber = Arc::clone(&self.transcriber);
            let runtime = self.runtime.clone();
            let language = config.language.clone();
            move || {
                match record_and_transcribe(&transcriber, &runtime, &language, &cancel) {
                    Ok(transcript) => events(RecognitionEvent::Transcript(transcript)),
                    Err(error) => events(RecognitionEvent::Error(error)),
                }
                events(RecognitionEvent::End);
                done.store(true, Ordering::SeqCst);
            }
        };

        std::thread::Builder::new()
            .name("onit-recognizer".to_string())
            .spawn(worker)
            .map_err(|e| RecognitionError::Other(e.to_string()))?;

        *session = Some(ActiveSession { cancel, done });
        Ok(())
    }

    fn abort(&self) {
        if let Some(session) = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            session.cancel.store(true, Ordering::SeqCst);
            tracing::debug!("recognition aborted");
        }
    }
}

fn record_and_transcribe(
    transcriber: &Transcriber,
    runtime: &Handle,
    language: &str,
    cancel: &AtomicBool,
) -> Result<String, RecognitionError> {
    let mut capture = AudioCapture::open().map_err(|e| {
        tracing::warn!(error = %e, "microphone unavailable");
        RecognitionError::AudioCapture
    })?;
    capture.start().map_err(|e| {
        tracing::warn!(error = %e, "microphone refused to start");
        RecognitionError::NotAllowed
    })?;

    let mut detector = UtteranceDetector::new();
    loop {
        std::thread::sleep(CAPTURE_POLL);

        if cancel.load(Ordering::SeqCst) {
            return Err(RecognitionError::Aborted);
        }
        if capture.has_failed() {
            return Err(RecognitionError::AudioCapture);
        }

        match detector.process(&capture.drain()) {
            EndpointState::Complete => break,
            EndpointState::TimedOut => return Err(RecognitionError::NoSpeech),
            EndpointState::Waiting | EndpointState::Speaking => {}
        }
    }
    capture.stop();

    let wav = samples_to_wav(&detector.take_utterance(), SAMPLE_RATE)
        .map_err(|e| RecognitionError::Other(e.to_string()))?;

    let transcript = runtime
        .block_on(transcriber.transcribe(&wav, language))
        .map_err(|e| match e {
            Error::Http(_) => RecognitionError::Network,
            other => RecognitionError::Other(other.to_string()),
        })?;

    if cancel.load(Ordering::SeqCst) {
        return Err(RecognitionError::Aborted);
    }
    if transcript.is_empty() {
        return Err(RecognitionError::NoSpeech);
    }
    Ok(transcript)
}

/// Speech API + speaker synthesizer
pub struct DesktopSynthesizer {
    client: Arc<SpeechClient>,
    runtime: Handle,
    current: Mutex<Option<Arc<AtomicBool>>>,
}

impl DesktopSynthesizer {
    /// Build a synthesizer if a speaker and a runtime are present
    #[must_use]
    pub fn probe(client: SpeechClient) -> Option<Self> {
        if !AudioPlayback::is_available() {
            tracing::info!("no output device found, speech synthesis disabled");
            return None;
        }
        let runtime = Handle::try_current().ok()?;

        Some(Self {
            client: Arc::new(client),
            runtime,
            current: Mutex::new(None),
        })
    }

    fn replace_current(&self, next: Option<Arc<AtomicBool>>) {
        let previous = std::mem::replace(
            &mut *self.current.lock().unwrap_or_else(PoisonError::into_inner),
            next,
        );
        if let Some(stop) = previous {
            stop.store(true, Ordering::SeqCst);
        }
    }
}

impl Synthesizer for DesktopSynthesizer {
    fn voices(&self) -> Vec<Voice> {
        SpeechClient::voices()
    }

    fn speak(&self, utterance: Utterance) {
        let stop = Arc::new(AtomicBool::new(false));
        self.replace_current(Some(Arc::clone(&stop)));

        let client = Arc::clone(&self.client);
        self.runtime.spawn(async move {
            let voice = utterance
                .voice
                .as_ref()
                .map_or(DEFAULT_OPENAI_VOICE, |v| v.name.as_str());

            let mp3 = match client.synthesize(&utterance.text, voice, utterance.prosody).await {
                Ok(mp3) => mp3,
                Err(e) => {
                    tracing::warn!(error = %e, "speech synthesis failed");
                    return;
                }
            };
            if stop.load(Ordering::SeqCst) {
                return;
            }

            let volume = utterance.prosody.volume;
            let played = tokio::task::spawn_blocking(move || -> crate::Result<bool> {
                let audio = decode_mp3(&mp3)?;
                AudioPlayback::open(audio.sample_rate)?.play(audio, volume, &stop)
            })
            .await;

            match played {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "speech playback failed"),
                Err(e) => tracing::warn!(error = %e, "speech playback task panicked"),
            }
        });
    }

    fn cancel(&self) {
        self.replace_current(None);
    }
}
