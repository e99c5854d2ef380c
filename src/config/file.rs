//! TOML configuration file loading
//!
//! Supports `~/.config/onit/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct OnitConfigFile {
    /// Name the assistant introduces itself with
    #[serde(default)]
    pub assistant_name: Option<String>,

    /// User display name (empty = default)
    #[serde(default)]
    pub user_name: Option<String>,

    /// Preferred synthesis voice name (empty = automatic selection)
    #[serde(default)]
    pub preferred_voice: Option<String>,

    /// Recognition and synthesis tuning
    #[serde(default)]
    pub speech: SpeechFileConfig,

    /// Desktop voice backend configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// External navigation behavior
    #[serde(default)]
    pub navigation: NavigationFileConfig,
}

/// Recognition language, retry timing and prosody
#[derive(Debug, Default, Deserialize)]
pub struct SpeechFileConfig {
    /// Recognition language tag (e.g. "en-US")
    pub language: Option<String>,

    /// Delay before retrying a recognition start that hit a busy session
    pub retry_delay_ms: Option<u64>,

    /// Speaking rate
    pub rate: Option<f32>,

    /// Output volume
    pub volume: Option<f32>,

    /// Voice pitch
    pub pitch: Option<f32>,
}

/// Voice processing configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Enable microphone input and spoken output
    pub enabled: Option<bool>,

    /// STT model (e.g. "whisper-1")
    pub stt_model: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub tts_model: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
}

/// Navigation configuration
#[derive(Debug, Default, Deserialize)]
pub struct NavigationFileConfig {
    /// Actually open links (false = log only)
    pub open_links: Option<bool>,
}

/// Load the TOML config file from the standard path
///
/// Returns `OnitConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> OnitConfigFile {
    config_file_path().map_or_else(OnitConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files yield defaults; problems are logged.
pub fn load_config_from(path: &Path) -> OnitConfigFile {
    if !path.exists() {
        return OnitConfigFile::default();
    }

    match read_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            OnitConfigFile::default()
        }
    }
}

/// Read and parse a config file
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file cannot be read and
/// [`crate::Error::Toml`] if it is not valid
pub fn read_config(path: &Path) -> Result<OnitConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/onit/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("onit").join("config.toml"))
}
