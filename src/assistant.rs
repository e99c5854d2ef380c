//! The assistant: typed or spoken input in, commands and speech out

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Local, Timelike};
use tokio::sync::mpsc;

use crate::commands::{CommandDispatcher, DispatchOutcome};
use crate::config::{Config, Preferences};
use crate::history::{ChatEntry, ChatHistory, ChatRole};
use crate::voice::{RecognitionError, SpeakSubscription, SpeechInput, SpeechOutput};

/// Result of one listening session, delivered to the control loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Transcript(String),
    Failed(RecognitionError),
}

pub struct Assistant {
    assistant_name: String,
    preferences: Preferences,
    dispatcher: CommandDispatcher,
    speech: Arc<SpeechOutput>,
    input: SpeechInput,
    history: Arc<Mutex<ChatHistory>>,
    transcript: SpeakSubscription,
}

impl Assistant {
    /// Wire up an assistant; everything it says is logged to the history
    #[must_use]
    pub fn new(
        config: &Config,
        dispatcher: CommandDispatcher,
        speech: Arc<SpeechOutput>,
        input: SpeechInput,
    ) -> Self {
        let history = Arc::new(Mutex::new(ChatHistory::default()));

        let transcript = {
            let history = Arc::clone(&history);
            speech.on_speak(move |text| {
                history
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(ChatRole::Assistant, text);
            })
        };

        Self {
            assistant_name: config.assistant_name.clone(),
            preferences: config.preferences.clone(),
            dispatcher,
            speech,
            input,
            history,
            transcript,
        }
    }

    /// Announce startup with a wish for the current time of day
    pub fn greet(&self) {
        self.greet_at(Local::now().hour());
    }

    /// Announce startup as if it were `hour` o'clock
    pub fn greet_at(&self, hour: u32) {
        let greeting = format!(
            "Initializing {}.. {} {}...",
            self.assistant_name.to_uppercase(),
            wish_for_hour(hour),
            self.preferences.display_name()
        );
        self.speech.say(&greeting);
    }

    /// Record and dispatch typed or transcribed text; blank input is ignored
    pub fn handle_text(&self, text: &str) -> Option<DispatchOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.lock_history().push(ChatRole::User, text);
        Some(self.dispatcher.dispatch(text))
    }

    /// Start one recognition session, delivering its outcome on `tx`
    pub fn listen(&self, tx: mpsc::UnboundedSender<Heard>) {
        let on_error = tx.clone();
        self.input.start_listening(
            move |transcript| {
                let _ = tx.send(Heard::Transcript(transcript));
            },
            move |error| {
                let _ = on_error.send(Heard::Failed(error));
            },
        );
    }

    /// Act on a listening outcome
    ///
    /// Transcripts are dispatched; failures other than an abort are spoken.
    pub fn handle_heard(&self, heard: Heard) -> Option<DispatchOutcome> {
        match heard {
            Heard::Transcript(text) => self.handle_text(&text),
            Heard::Failed(error) => {
                tracing::info!(error = %error, code = error.code(), "recognition failed");
                if let Some(message) = spoken_error(&error) {
                    self.speech.say(message);
                }
                None
            }
        }
    }

    #[must_use]
    pub fn history(&self) -> Vec<ChatEntry> {
        self.lock_history().entries().cloned().collect()
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub const fn dispatcher_mut(&mut self) -> &mut CommandDispatcher {
        &mut self.dispatcher
    }

    #[must_use]
    pub const fn speech(&self) -> &Arc<SpeechOutput> {
        &self.speech
    }

    #[must_use]
    pub const fn input(&self) -> &SpeechInput {
        &self.input
    }

    /// Silence speech and release the camera
    pub fn shutdown(&self) {
        self.speech.cancel();
        self.dispatcher.camera().stop();
    }

    fn lock_history(&self) -> std::sync::MutexGuard<'_, ChatHistory> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Assistant {
    fn drop(&mut self) {
        self.transcript.unsubscribe();
    }
}

const fn wish_for_hour(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good Morning",
        12..=16 => "Good Afternoon",
        _ => "Good Evening",
    }
}

/// What to tell the user when listening fails
const fn spoken_error(error: &RecognitionError) -> Option<&'static str> {
    match error {
        RecognitionError::Aborted => None,
        RecognitionError::Unsupported => Some("Sorry, speech recognition is not available here."),
        RecognitionError::NotAllowed => Some("I need microphone permission to hear you."),
        RecognitionError::NoSpeech => Some("I didn't hear anything."),
        RecognitionError::Network => Some("I can't reach the speech service right now."),
        RecognitionError::AudioCapture => Some("I couldn't access the microphone."),
        RecognitionError::InvalidState | RecognitionError::Other(_) => {
            Some("Sorry, I couldn't understand that.")
        }
    }
}
