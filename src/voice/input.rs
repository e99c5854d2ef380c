//! Speech input: single-shot recognition sessions

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use thiserror::Error;

use crate::config::{DEFAULT_LANGUAGE, DEFAULT_RETRY_DELAY};

/// Why a recognition session ended without a transcript
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    /// No recognition capability on this platform
    #[error("speech recognition is not supported on this platform")]
    Unsupported,

    /// Session ended without detecting speech
    #[error("no speech detected")]
    NoSpeech,

    /// Recognition service unreachable
    #[error("network unavailable")]
    Network,

    /// Microphone access denied
    #[error("microphone permission denied")]
    NotAllowed,

    /// Microphone could not be opened or read
    #[error("audio capture failed")]
    AudioCapture,

    /// Session was aborted
    #[error("recognition aborted")]
    Aborted,

    /// A session was already running when start was requested
    #[error("recognition already started")]
    InvalidState,

    /// Any other platform error code
    #[error("recognition failed: {0}")]
    Other(String),
}

impl RecognitionError {
    /// Stable error code as reported by recognition platforms
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Unsupported => "not-supported",
            Self::NoSpeech => "no-speech",
            Self::Network => "network",
            Self::NotAllowed => "not-allowed",
            Self::AudioCapture => "audio-capture",
            Self::Aborted => "aborted",
            Self::InvalidState => "invalid-state",
            Self::Other(code) => code,
        }
    }

    /// Map a platform error code back onto an error
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-supported" => Self::Unsupported,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            "not-allowed" | "service-not-allowed" => Self::NotAllowed,
            "audio-capture" => Self::AudioCapture,
            "aborted" => Self::Aborted,
            "invalid-state" => Self::InvalidState,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Settings handed to the platform on every start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// Language tag (e.g. "en-US")
    pub language: String,

    /// Keep listening after the first result
    pub continuous: bool,

    /// Deliver partial transcripts
    pub interim_results: bool,
}

impl RecognitionConfig {
    /// Single final result in the given language
    #[must_use]
    pub fn single_shot(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            continuous: false,
            interim_results: false,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self::single_shot(DEFAULT_LANGUAGE)
    }
}

/// Something the platform reports about a running session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    /// Final transcript
    Transcript(String),
    /// Session failed
    Error(RecognitionError),
    /// Session ended (always last)
    End,
}

/// Callback the platform uses to report events for one start call
pub type RecognitionEvents = Arc<dyn Fn(RecognitionEvent) + Send + Sync>;

/// Platform speech recognition capability
pub trait Recognizer: Send + Sync {
    /// Begin a session, reporting its events through `events`
    ///
    /// # Errors
    ///
    /// Returns [`RecognitionError::InvalidState`] if a session is already
    /// running, or another error if the session cannot start
    fn start(
        &self,
        config: &RecognitionConfig,
        events: RecognitionEvents,
    ) -> Result<(), RecognitionError>;

    /// Abort the running session, if any
    fn abort(&self);
}

/// Recognition session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecognitionState {
    /// No session running
    Idle,
    /// Waiting for the platform to report
    Listening,
    /// Last session ended with an error
    Errored,
}

type ResultCallback = Box<dyn FnOnce(String) + Send>;
type ErrorCallback = Box<dyn FnOnce(RecognitionError) + Send>;

struct PendingSession {
    on_result: ResultCallback,
    on_error: ErrorCallback,
}

struct SessionSlot {
    generation: u64,
    state: RecognitionState,
    pending: Option<PendingSession>,
}

struct Inner {
    recognizer: Option<Arc<dyn Recognizer>>,
    config: RecognitionConfig,
    retry_delay: Duration,
    slot: Mutex<SessionSlot>,
}

/// Runs one recognition session at a time
///
/// Each [`start_listening`](Self::start_listening) supersedes the previous
/// session: its callbacks are dropped and at most one of the new callbacks
/// ever runs.
#[derive(Clone)]
pub struct SpeechInput {
    inner: Arc<Inner>,
}

impl SpeechInput {
    /// Create speech input; `None` means recognition is unavailable
    #[must_use]
    pub fn new(recognizer: Option<Arc<dyn Recognizer>>, config: RecognitionConfig) -> Self {
        Self::with_retry_delay(recognizer, config, DEFAULT_RETRY_DELAY)
    }

    /// Create speech input with a custom wait before the single start retry
    #[must_use]
    pub fn with_retry_delay(
        recognizer: Option<Arc<dyn Recognizer>>,
        config: RecognitionConfig,
        retry_delay: Duration,
    ) -> Self {
        tracing::debug!(
            supported = recognizer.is_some(),
            language = %config.language,
            "speech input initialized"
        );

        Self {
            inner: Arc::new(Inner {
                recognizer,
                config,
                retry_delay,
                slot: Mutex::new(SessionSlot {
                    generation: 0,
                    state: RecognitionState::Idle,
                    pending: None,
                }),
            }),
        }
    }

    /// Whether a recognition capability was found
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.inner.recognizer.is_some()
    }

    #[must_use]
    pub fn state(&self) -> RecognitionState {
        self.inner.lock_slot().state
    }

    /// Listen for one utterance
    ///
    /// Exactly one of `on_result`/`on_error` runs unless a later call
    /// supersedes this session first. Without a recognizer, `on_error`
    /// runs immediately with [`RecognitionError::Unsupported`]. A start that
    /// collides with a running session aborts it and retries once after the
    /// retry delay; this path needs a tokio runtime.
    pub fn start_listening<R, E>(&self, on_result: R, on_error: E)
    where
        R: FnOnce(String) + Send + 'static,
        E: FnOnce(RecognitionError) + Send + 'static,
    {
        let Some(recognizer) = self.inner.recognizer.clone() else {
            tracing::warn!("speech recognition unavailable");
            on_error(RecognitionError::Unsupported);
            return;
        };

        let generation = {
            let mut slot = self.inner.lock_slot();
            if slot.pending.is_some() {
                tracing::debug!(generation = slot.generation, "superseding recognition session");
            }
            slot.generation += 1;
            slot.state = RecognitionState::Listening;
            slot.pending = Some(PendingSession {
                on_result: Box::new(on_result),
                on_error: Box::new(on_error),
            });
            slot.generation
        };

        let events = Inner::events_for(&self.inner, generation);

        match recognizer.start(&self.inner.config, Arc::clone(&events)) {
            Ok(()) => tracing::debug!(generation, "listening"),
            Err(RecognitionError::InvalidState) => {
                tracing::debug!(generation, "recognizer busy, aborting stale session");
                recognizer.abort();
                self.schedule_retry(recognizer, generation, events);
            }
            Err(e) => self.inner.finish(generation, Err(e)),
        }
    }

    fn schedule_retry(
        &self,
        recognizer: Arc<dyn Recognizer>,
        generation: u64,
        events: RecognitionEvents,
    ) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no runtime to retry recognition start");
            self.inner
                .finish(generation, Err(RecognitionError::InvalidState));
            return;
        };

        let inner = Arc::clone(&self.inner);
        let delay = inner.retry_delay;
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            if inner.lock_slot().generation != generation {
                tracing::debug!(generation, "retry skipped, session superseded");
                return;
            }

            match recognizer.start(&inner.config, events) {
                Ok(()) => tracing::debug!(generation, "listening after retry"),
                Err(e) => {
                    tracing::warn!(generation, error = %e, "recognition retry failed");
                    inner.finish(generation, Err(e));
                }
            }
        });
    }
}

impl Inner {
    fn lock_slot(&self) -> std::sync::MutexGuard<'_, SessionSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Route platform events for `generation` back into the slot
    fn events_for(inner: &Arc<Self>, generation: u64) -> RecognitionEvents {
        let inner = Arc::downgrade(inner);
        Arc::new(move |event| {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            match event {
                RecognitionEvent::Transcript(text) => inner.finish(generation, Ok(text)),
                RecognitionEvent::Error(e) => inner.finish(generation, Err(e)),
                RecognitionEvent::End => inner.end(generation),
            }
        })
    }

    /// Deliver the session outcome at most once
    fn finish(&self, generation: u64, outcome: Result<String, RecognitionError>) {
        let pending = {
            let mut slot = self.lock_slot();
            if slot.generation != generation {
                tracing::trace!(generation, "dropping event from superseded session");
                return;
            }
            let Some(pending) = slot.pending.take() else {
                return;
            };
            slot.state = if outcome.is_ok() {
                RecognitionState::Idle
            } else {
                RecognitionState::Errored
            };
            pending
        };

        match outcome {
            Ok(transcript) => {
                tracing::info!(transcript = %transcript, "recognized speech");
                (pending.on_result)(transcript);
            }
            Err(e) => {
                tracing::debug!(code = e.code(), "recognition error");
                (pending.on_error)(e);
            }
        }
    }

    /// Session ended; a session that never reported ends silently
    fn end(&self, generation: u64) {
        let mut slot = self.lock_slot();
        if slot.generation != generation {
            return;
        }
        if slot.pending.take().is_some() {
            tracing::debug!(generation, "recognition ended without a result");
            slot.state = RecognitionState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Platform fake: one session at a time, abort reports to the stale sink
    #[derive(Default)]
    struct FakeRecognizer {
        busy: Mutex<bool>,
        sticky_busy: bool,
        sinks: Mutex<Vec<RecognitionEvents>>,
        starts: Mutex<usize>,
    }

    impl FakeRecognizer {
        fn emit(&self, event: RecognitionEvent) {
            let sink = self.sinks.lock().unwrap().last().cloned().unwrap();
            sink(event);
        }
    }

    impl Recognizer for FakeRecognizer {
        fn start(
            &self,
            _config: &RecognitionConfig,
            events: RecognitionEvents,
        ) -> Result<(), RecognitionError> {
            *self.starts.lock().unwrap() += 1;
            let mut busy = self.busy.lock().unwrap();
            if *busy {
                return Err(RecognitionError::InvalidState);
            }
            *busy = true;
            self.sinks.lock().unwrap().push(events);
            Ok(())
        }

        fn abort(&self) {
            if self.sticky_busy {
                return;
            }
            *self.busy.lock().unwrap() = false;
            let stale = self.sinks.lock().unwrap().last().cloned();
            if let Some(sink) = stale {
                sink(RecognitionEvent::Error(RecognitionError::Aborted));
                sink(RecognitionEvent::End);
            }
        }
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn listen(input: &SpeechInput, log: &Log, tag: &'static str) {
        let on_result = Arc::clone(log);
        let on_error = Arc::clone(log);
        input.start_listening(
            move |text| on_result.lock().unwrap().push(format!("{tag}:result:{text}")),
            move |e| on_error.lock().unwrap().push(format!("{tag}:error:{}", e.code())),
        );
    }

    fn input_with(recognizer: &Arc<FakeRecognizer>) -> SpeechInput {
        SpeechInput::new(
            Some(Arc::clone(recognizer) as Arc<dyn Recognizer>),
            RecognitionConfig::default(),
        )
    }

    #[test]
    fn test_unsupported_reports_synchronously() {
        let input = SpeechInput::new(None, RecognitionConfig::default());
        let log = Log::default();

        assert!(!input.is_supported());
        listen(&input, &log, "a");
        assert_eq!(*log.lock().unwrap(), vec!["a:error:not-supported"]);
        assert_eq!(input.state(), RecognitionState::Idle);
    }

    #[test]
    fn test_result_delivered_once() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let input = input_with(&recognizer);
        let log = Log::default();

        listen(&input, &log, "a");
        assert_eq!(input.state(), RecognitionState::Listening);

        recognizer.emit(RecognitionEvent::Transcript("hello there".to_string()));
        recognizer.emit(RecognitionEvent::Transcript("again".to_string()));
        recognizer.emit(RecognitionEvent::End);

        assert_eq!(*log.lock().unwrap(), vec!["a:result:hello there"]);
        assert_eq!(input.state(), RecognitionState::Idle);
    }

    #[test]
    fn test_error_delivered_once() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let input = input_with(&recognizer);
        let log = Log::default();

        listen(&input, &log, "a");
        recognizer.emit(RecognitionEvent::Error(RecognitionError::NoSpeech));
        recognizer.emit(RecognitionEvent::Transcript("late".to_string()));

        assert_eq!(*log.lock().unwrap(), vec!["a:error:no-speech"]);
        assert_eq!(input.state(), RecognitionState::Errored);
    }

    #[test]
    fn test_end_without_result_is_silent() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let input = input_with(&recognizer);
        let log = Log::default();

        listen(&input, &log, "a");
        recognizer.emit(RecognitionEvent::End);

        assert!(log.lock().unwrap().is_empty());
        assert_eq!(input.state(), RecognitionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_start_aborts_and_retries_once() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let input = input_with(&recognizer);
        let log = Log::default();

        listen(&input, &log, "first");
        listen(&input, &log, "second");

        // stale session's abort report is dropped, retry not yet run
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(*recognizer.starts.lock().unwrap(), 2);

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(*recognizer.starts.lock().unwrap(), 3);

        recognizer.emit(RecognitionEvent::Transcript("open youtube".to_string()));
        assert_eq!(*log.lock().unwrap(), vec!["second:result:open youtube"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_retry_reports_once() {
        let recognizer = Arc::new(FakeRecognizer {
            sticky_busy: true,
            ..FakeRecognizer::default()
        });
        let input = input_with(&recognizer);
        let log = Log::default();

        listen(&input, &log, "first");
        listen(&input, &log, "second");
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(*recognizer.starts.lock().unwrap(), 3);
        assert_eq!(*log.lock().unwrap(), vec!["second:error:invalid-state"]);
        assert_eq!(input.state(), RecognitionState::Errored);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_retry_delay() {
        let recognizer = Arc::new(FakeRecognizer::default());
        let input = SpeechInput::with_retry_delay(
            Some(Arc::clone(&recognizer) as Arc<dyn Recognizer>),
            RecognitionConfig::default(),
            Duration::from_secs(2),
        );
        let log = Log::default();

        listen(&input, &log, "first");
        listen(&input, &log, "second");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(*recognizer.starts.lock().unwrap(), 2);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*recognizer.starts.lock().unwrap(), 3);
    }

    #[test]
    fn test_busy_without_runtime_reports_error() {
        let recognizer = Arc::new(FakeRecognizer {
            sticky_busy: true,
            ..FakeRecognizer::default()
        });
        *recognizer.busy.lock().unwrap() = true;
        let input = input_with(&recognizer);
        let log = Log::default();

        listen(&input, &log, "a");
        assert_eq!(*log.lock().unwrap(), vec!["a:error:invalid-state"]);
    }

    #[test]
    fn test_error_codes_round_trip_known_values() {
        assert_eq!(RecognitionError::from_code("no-speech"), RecognitionError::NoSpeech);
        assert_eq!(
            RecognitionError::from_code("service-not-allowed"),
            RecognitionError::NotAllowed
        );
        assert_eq!(
            RecognitionError::from_code("bad-grammar").code(),
            "bad-grammar"
        );
    }
}
