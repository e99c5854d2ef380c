//! Spoken output: one utterance slot, voice selection, speak observers

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use super::catalog::{Voice, VoiceCatalog};

/// Prosody applied to every utterance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prosody {
    /// Speaking rate (0.1 to 10.0, 1.0 = normal)
    pub rate: f32,

    /// Volume (0.0 to 1.0)
    pub volume: f32,

    /// Pitch (0.0 to 2.0, 1.0 = normal)
    pub pitch: f32,
}

impl Prosody {
    /// Build prosody, clamping each value into its supported range
    #[must_use]
    pub fn new(rate: f32, volume: f32, pitch: f32) -> Self {
        Self {
            rate: rate.clamp(0.1, 10.0),
            volume: volume.clamp(0.0, 1.0),
            pitch: pitch.clamp(0.0, 2.0),
        }
    }
}

impl Default for Prosody {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.1)
    }
}

/// A single unit of speech handed to the synthesis platform
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,

    /// `None` = platform default voice
    pub voice: Option<Voice>,

    pub prosody: Prosody,
}

/// Platform speech synthesis capability
pub trait Synthesizer: Send + Sync {
    /// Voices currently available (may be empty before the platform loads them)
    fn voices(&self) -> Vec<Voice>;

    /// Queue an utterance for playback
    fn speak(&self, utterance: Utterance);

    /// Drop everything queued or playing
    fn cancel(&self);
}

type SpeakObserver = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    entries: Vec<(u64, SpeakObserver)>,
}

/// Handle returned by [`SpeechOutput::on_speak`]
///
/// Dropping the handle leaves the observer registered.
pub struct SpeakSubscription {
    id: u64,
    observers: Weak<Mutex<Observers>>,
}

impl SpeakSubscription {
    /// Stop delivering spoken text to this observer
    pub fn unsubscribe(&self) {
        if let Some(observers) = self.observers.upgrade() {
            observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .retain(|(id, _)| *id != self.id);
            tracing::trace!(id = self.id, "speak observer removed");
        }
    }
}

/// Speaks text through the platform synthesizer
///
/// At most one utterance is in flight: every [`speak`](Self::speak) cancels
/// the previous one. Observers see every text, even when no synthesizer
/// exists.
pub struct SpeechOutput {
    synthesizer: Option<Arc<dyn Synthesizer>>,
    catalog: RwLock<Arc<VoiceCatalog>>,
    observers: Arc<Mutex<Observers>>,
    prosody: Prosody,
    preferred_voice: Option<String>,
}

impl SpeechOutput {
    /// Create a speech output; `None` means synthesis is unavailable
    #[must_use]
    pub fn new(synthesizer: Option<Arc<dyn Synthesizer>>, prosody: Prosody) -> Self {
        let output = Self {
            synthesizer,
            catalog: RwLock::new(Arc::new(VoiceCatalog::default())),
            observers: Arc::new(Mutex::new(Observers::default())),
            prosody,
            preferred_voice: None,
        };

        tracing::debug!(supported = output.is_supported(), "speech output initialized");
        output.refresh_voices();
        output
    }

    /// Voice to request when a caller doesn't name one
    #[must_use]
    pub fn with_preferred_voice(mut self, voice: Option<String>) -> Self {
        self.preferred_voice = voice.filter(|v| !v.trim().is_empty());
        self
    }

    /// Whether a synthesis capability was found
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Register an observer for every spoken text
    pub fn on_speak<F>(&self, observer: F) -> SpeakSubscription
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let id = observers.next_id;
        observers.next_id += 1;
        observers.entries.push((id, Arc::new(observer)));

        SpeakSubscription {
            id,
            observers: Arc::downgrade(&self.observers),
        }
    }

    /// Speak `text`, replacing anything currently being spoken
    ///
    /// `voice_name` must match a catalog voice exactly; `None` (or empty)
    /// falls back to the preferred voice and then the selection chain.
    pub fn speak(&self, text: &str, voice_name: Option<&str>) {
        self.broadcast(text);

        let Some(synthesizer) = &self.synthesizer else {
            tracing::debug!(text, "no synthesizer, text only");
            return;
        };

        synthesizer.cancel();

        let requested = voice_name
            .filter(|n| !n.is_empty())
            .or(self.preferred_voice.as_deref());
        let catalog = self.voices();
        let voice = catalog.select(requested).cloned();

        tracing::debug!(
            text,
            voice = voice.as_ref().map_or("default", |v| v.name.as_str()),
            "speaking"
        );

        synthesizer.speak(Utterance {
            text: text.to_string(),
            voice,
            prosody: self.prosody,
        });
    }

    /// Speak with automatic voice selection
    pub fn say(&self, text: &str) {
        self.speak(text, None);
    }

    /// Stop whatever is being spoken; a no-op when idle
    pub fn cancel(&self) {
        if let Some(synthesizer) = &self.synthesizer {
            synthesizer.cancel();
        }
    }

    /// Current voice catalog, fetched directly if nothing has loaded yet
    #[must_use]
    pub fn voices(&self) -> Arc<VoiceCatalog> {
        let current = self.current_catalog();
        if !current.is_empty() {
            return current;
        }

        self.refresh_voices();
        self.current_catalog()
    }

    /// Replace the catalog with the platform's current voices
    ///
    /// Call when the platform signals that its voice list changed. An empty
    /// platform list keeps the previous catalog.
    pub fn refresh_voices(&self) {
        let Some(synthesizer) = &self.synthesizer else {
            return;
        };

        let voices = synthesizer.voices();
        if voices.is_empty() {
            return;
        }

        tracing::debug!(count = voices.len(), "voice catalog refreshed");
        let catalog = Arc::new(VoiceCatalog::new(voices));
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = catalog;
    }

    fn current_catalog(&self) -> Arc<VoiceCatalog> {
        Arc::clone(&self.catalog.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Invoke observers on a snapshot so they may unsubscribe mid-broadcast
    fn broadcast(&self, text: &str) {
        let snapshot: Vec<(u64, SpeakObserver)> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone();

        for (id, observer) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| observer(text))).is_err() {
                tracing::warn!(id, "speak observer panicked");
            }
        }
    }
}
