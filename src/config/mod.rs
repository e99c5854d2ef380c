//! Configuration management for the assistant

pub mod file;

use std::time::Duration;

use crate::voice::Prosody;

/// Name used when none is configured
pub const DEFAULT_ASSISTANT_NAME: &str = "OnIt";

/// How the user is addressed when no display name is set
pub const DEFAULT_USER_NAME: &str = "Boss";

/// Recognition language when none is configured
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Wait before retrying a recognition start that collided with a live session
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(300);

/// Assistant configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Name the assistant uses for itself
    pub assistant_name: String,

    /// User preferences (display name, voice)
    pub preferences: Preferences,

    /// Recognition/synthesis tuning
    pub speech: SpeechConfig,

    /// Desktop voice backend configuration
    pub voice: VoiceConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// External navigation behavior
    pub navigation: NavigationConfig,
}

/// Plain-string user preferences; empty means "use the default"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    /// How the assistant addresses the user
    pub user_name: String,

    /// Preferred synthesis voice name
    pub preferred_voice: String,
}

impl Preferences {
    /// Display name, falling back to [`DEFAULT_USER_NAME`]
    #[must_use]
    pub fn display_name(&self) -> &str {
        let name = self.user_name.trim();
        if name.is_empty() { DEFAULT_USER_NAME } else { name }
    }

    /// Preferred voice, `None` when automatic selection should apply
    #[must_use]
    pub fn voice_name(&self) -> Option<&str> {
        let name = self.preferred_voice.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Recognition and synthesis tuning
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    /// Recognition language tag
    pub language: String,

    /// Delay before the single recognition retry
    pub retry_delay: Duration,

    /// Fixed prosody applied to every utterance
    pub prosody: Prosody,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            retry_delay: DEFAULT_RETRY_DELAY,
            prosody: Prosody::default(),
        }
    }
}

/// Desktop voice backend configuration
#[derive(Debug, Clone, Default)]
pub struct VoiceConfig {
    /// Enable microphone input and spoken output
    pub enabled: bool,

    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (for transcription and TTS)
    pub openai: Option<String>,
}

/// External navigation behavior
#[derive(Debug, Clone)]
pub struct NavigationConfig {
    /// Open links with the system opener; when false they are only logged
    pub open_links: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self { open_links: true }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            preferences: Preferences::default(),
            speech: SpeechConfig::default(),
            voice: VoiceConfig {
                enabled: true,
                stt_model: "whisper-1".to_string(),
                tts_model: "tts-1".to_string(),
            },
            api_keys: ApiKeys::default(),
            navigation: NavigationConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration (env > toml > default)
    #[must_use]
    pub fn load() -> Self {
        Self::load_with_options(false)
    }

    /// Load configuration with explicit voice disable option
    #[must_use]
    pub fn load_with_options(disable_voice: bool) -> Self {
        Self::from_file(file::load_config_file(), disable_voice)
    }

    /// Resolve a parsed config file against the environment and defaults
    #[must_use]
    pub fn from_file(fc: file::OnitConfigFile, disable_voice: bool) -> Self {
        let defaults = Self::default();

        let assistant_name = env_var("ONIT_ASSISTANT_NAME")
            .or(fc.assistant_name)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(defaults.assistant_name);

        let preferences = Preferences {
            user_name: env_var("ONIT_USER_NAME")
                .or(fc.user_name)
                .unwrap_or_default(),
            preferred_voice: env_var("ONIT_VOICE")
                .or(fc.preferred_voice)
                .unwrap_or_default(),
        };

        let default_prosody = defaults.speech.prosody;
        let speech = SpeechConfig {
            language: env_var("ONIT_LANGUAGE")
                .or(fc.speech.language)
                .unwrap_or(defaults.speech.language),
            retry_delay: fc
                .speech
                .retry_delay_ms
                .map_or(defaults.speech.retry_delay, Duration::from_millis),
            prosody: Prosody::new(
                fc.speech.rate.unwrap_or(default_prosody.rate),
                fc.speech.volume.unwrap_or(default_prosody.volume),
                fc.speech.pitch.unwrap_or(default_prosody.pitch),
            ),
        };

        let voice_enabled = if disable_voice || env_flag("ONIT_DISABLE_VOICE") == Some(true) {
            tracing::info!("voice explicitly disabled");
            false
        } else {
            fc.voice.enabled.unwrap_or(defaults.voice.enabled)
        };
        let voice = VoiceConfig {
            enabled: voice_enabled,
            stt_model: env_var("ONIT_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or(defaults.voice.stt_model),
            tts_model: env_var("ONIT_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or(defaults.voice.tts_model),
        };

        let api_keys = ApiKeys {
            openai: env_var("OPENAI_API_KEY").or(fc.api_keys.openai),
        };

        let navigation = NavigationConfig {
            open_links: env_flag("ONIT_OPEN_LINKS")
                .or(fc.navigation.open_links)
                .unwrap_or(defaults.navigation.open_links),
        };

        Self {
            assistant_name,
            preferences,
            speech,
            voice,
            api_keys,
            navigation,
        }
    }
}

/// Read a non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Read a boolean environment flag ("1"/"true" or "0"/"false")
fn env_flag(name: &str) -> Option<bool> {
    env_var(name).and_then(|v| match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}
