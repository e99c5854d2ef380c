//! Voice I/O
//!
//! [`SpeechOutput`] and [`SpeechInput`] wrap optional platform capabilities
//! ([`Synthesizer`], [`Recognizer`]); the desktop backend implements both
//! on top of cpal and the `OpenAI` audio APIs.

mod capture;
mod catalog;
mod desktop;
mod detector;
mod input;
mod output;
mod playback;
mod stt;
mod tts;

pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use catalog::{GenderHint, Voice, VoiceCatalog};
pub use desktop::{DesktopRecognizer, DesktopSynthesizer};
pub use detector::{EndpointState, UtteranceDetector, calculate_energy};
pub use input::{
    RecognitionConfig, RecognitionError, RecognitionEvent, RecognitionEvents, RecognitionState,
    Recognizer, SpeechInput,
};
pub use output::{Prosody, SpeakSubscription, SpeechOutput, Synthesizer, Utterance};
pub use playback::{AudioPlayback, DecodedAudio, decode_mp3};
pub use stt::Transcriber;
pub use tts::{DEFAULT_OPENAI_VOICE, OPENAI_VOICES, SpeechClient};
