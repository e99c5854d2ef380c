//! OnIt - voice and text command assistant
//!
//! This library provides:
//! - Keyword command registry and first-match dispatcher
//! - Speech output with observers and voice selection
//! - Single-shot speech recognition with busy-start retry
//! - Exclusive camera capture sessions
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Input (typed / spoken)              │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │   Assistant  │  CommandDispatcher  │  ChatHistory   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │  SpeechOutput │ SpeechInput │ CameraManager │ Nav   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │  Platform traits (Synthesizer, Recognizer, ...)     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod assistant;
pub mod camera;
pub mod commands;
pub mod config;
pub mod error;
pub mod history;
pub mod navigation;
pub mod voice;

pub use assistant::{Assistant, Heard};
pub use camera::{CameraError, CameraManager, MediaDevices, MediaStream, MediaTrack, VideoSink};
pub use commands::{
    ActionContext, CommandAction, CommandDispatcher, CommandInfo, CommandPlugin, CommandRegistry,
    DispatchOutcome, Mood,
};
pub use config::Config;
pub use error::{Error, Result};
pub use history::{ChatEntry, ChatHistory, ChatRole};
pub use navigation::{Navigator, SystemNavigator};
pub use voice::{
    Prosody, RecognitionConfig, RecognitionError, Recognizer, SpeakSubscription, SpeechInput,
    SpeechOutput, Synthesizer, Voice, VoiceCatalog,
};
