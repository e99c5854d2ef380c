//! Synthesis voice catalog and default voice selection

use serde::Serialize;

/// Exact voice names tried first when no voice is requested
const PREFERRED_VOICE_NAMES: &[&str] = &["Google UK English Female", "Google US English"];

/// Name fragments that mark a female voice, in selection priority order
const FEMALE_NAME_MARKERS: &[&str] = &["Female", "Zira", "Samantha"];

/// Name fragments that mark a male voice
const MALE_NAME_MARKERS: &[&str] = &["Male", "David", "Alex"];

/// Language prefix accepted as the last resort
const DEFAULT_LANG_PREFIX: &str = "en-";

/// Gender inferred from a voice name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderHint {
    Female,
    Male,
}

/// A synthesis voice known to the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    /// Platform voice name (unique within a catalog)
    pub name: String,

    /// BCP 47 language tag (e.g. "en-US")
    pub lang: String,

    /// Gender guessed from the name, if it says anything
    pub gender_hint: Option<GenderHint>,
}

impl Voice {
    /// Create a voice, inferring its gender hint from the name
    #[must_use]
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        let name = name.into();
        let gender_hint = infer_gender(&name);
        Self {
            name,
            lang: lang.into(),
            gender_hint,
        }
    }
}

/// "Female" contains "male", so female markers are checked first
fn infer_gender(name: &str) -> Option<GenderHint> {
    if FEMALE_NAME_MARKERS.iter().any(|m| name.contains(m)) {
        Some(GenderHint::Female)
    } else if MALE_NAME_MARKERS.iter().any(|m| name.contains(m)) {
        Some(GenderHint::Male)
    } else {
        None
    }
}

/// Immutable snapshot of the voices available for synthesis
///
/// Refreshes replace the whole snapshot; a catalog is never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceCatalog {
    voices: Vec<Voice>,
}

impl VoiceCatalog {
    #[must_use]
    pub const fn new(voices: Vec<Voice>) -> Self {
        Self { voices }
    }

    #[must_use]
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.voices.len()
    }

    /// Find a voice by exact name
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.name == name)
    }

    /// Resolve the voice for an utterance
    ///
    /// A requested name must match exactly; an unknown name yields `None`
    /// (platform default) without trying the fallback chain.
    #[must_use]
    pub fn select(&self, requested: Option<&str>) -> Option<&Voice> {
        match requested {
            Some(name) => self.find(name),
            None => self.preferred(),
        }
    }

    /// Walk the fallback chain: preferred names, female-sounding names,
    /// then any voice in the default language
    #[must_use]
    pub fn preferred(&self) -> Option<&Voice> {
        PREFERRED_VOICE_NAMES
            .iter()
            .find_map(|name| self.find(name))
            .or_else(|| {
                FEMALE_NAME_MARKERS
                    .iter()
                    .find_map(|marker| self.voices.iter().find(|v| v.name.contains(marker)))
            })
            .or_else(|| {
                self.voices
                    .iter()
                    .find(|v| v.lang.starts_with(DEFAULT_LANG_PREFIX))
            })
    }
}

impl From<Vec<Voice>> for VoiceCatalog {
    fn from(voices: Vec<Voice>) -> Self {
        Self::new(voices)
    }
}
