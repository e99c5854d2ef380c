//! Keyword commands
//!
//! A [`CommandPlugin`] pairs lowercase keywords with a [`CommandAction`].
//! The [`CommandDispatcher`] picks the first registered plugin whose
//! keyword appears anywhere in the input and runs its action.

mod builtin;
mod dispatcher;
mod registry;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

pub use builtin::builtin_plugins;
pub use dispatcher::{ActionContext, CommandDispatcher, DispatchOutcome};
pub use registry::CommandRegistry;

/// Caller-supplied action; receives the normalized input
pub type CustomAction = Arc<dyn Fn(&ActionContext<'_>, &str) + Send + Sync>;

/// What a plugin does when selected
#[derive(Clone)]
pub enum CommandAction {
    /// Speak a fixed reply
    Reply(String),

    /// Open a fixed destination, then speak
    Open { url: String, reply: String },

    /// Search YouTube for whatever follows "play"
    PlaySong,

    /// Respond to a stated mood
    Mood(Mood),

    /// Open the Wikipedia article named in the input
    Wikipedia,

    /// Web search for the whole input
    Search,

    Time,
    Date,

    /// List registered command names
    Help,

    OpenCamera,
    CloseCamera,

    Custom(CustomAction),
}

impl CommandAction {
    /// Build a [`CommandAction::Custom`] from a closure
    pub fn custom<F>(action: F) -> Self
    where
        F: Fn(&ActionContext<'_>, &str) + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(action))
    }
}

impl fmt::Debug for CommandAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reply(text) => f.debug_tuple("Reply").field(text).finish(),
            Self::Open { url, reply } => f
                .debug_struct("Open")
                .field("url", url)
                .field("reply", reply)
                .finish(),
            Self::PlaySong => f.write_str("PlaySong"),
            Self::Mood(mood) => f.debug_tuple("Mood").field(mood).finish(),
            Self::Wikipedia => f.write_str("Wikipedia"),
            Self::Search => f.write_str("Search"),
            Self::Time => f.write_str("Time"),
            Self::Date => f.write_str("Date"),
            Self::Help => f.write_str("Help"),
            Self::OpenCamera => f.write_str("OpenCamera"),
            Self::CloseCamera => f.write_str("CloseCamera"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Moods the assistant reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mood {
    Sad,
    Happy,
    Tired,
    Bored,
    Lonely,
    Angry,
    Excited,
}

impl Mood {
    pub const ALL: [Self; 7] = [
        Self::Sad,
        Self::Happy,
        Self::Tired,
        Self::Bored,
        Self::Lonely,
        Self::Angry,
        Self::Excited,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sad => "Sad",
            Self::Happy => "Happy",
            Self::Tired => "Tired",
            Self::Bored => "Bored",
            Self::Lonely => "Lonely",
            Self::Angry => "Angry",
            Self::Excited => "Excited",
        }
    }

    /// Phrases that state this mood
    #[must_use]
    pub const fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Sad => &["i am sad", "i'm feeling sad", "i'm sad", "feeling sad"],
            Self::Happy => &["i am happy", "i'm feeling happy", "i'm happy", "feeling happy"],
            Self::Tired => &["i'm feeling tired", "i'm sleepy", "i am tired", "feeling tired"],
            Self::Bored => &["i'm feeling bored", "i am bored", "feeling bored"],
            Self::Lonely => &["i'm feeling lonely", "i am lonely", "feeling lonely"],
            Self::Angry => &["i'm feeling angry", "i am angry", "feeling angry"],
            Self::Excited => &["i'm feeling excited", "i am excited", "feeling excited"],
        }
    }

    #[must_use]
    pub const fn reply(self) -> &'static str {
        match self {
            Self::Sad => "I'm sorry to hear that. I hope this music will make you feel better.",
            Self::Happy => "That's great to hear! Let's celebrate with some happy music.",
            Self::Tired => {
                "You should get some rest. Here are some relaxing sounds to help you sleep."
            }
            Self::Bored => "I have an idea. How about we play a game?",
            Self::Lonely => {
                "I'm here for you. Remember, you can always connect with your loved ones."
            }
            Self::Angry => {
                "Please take a deep breath. I hope these calming sounds will help you relax."
            }
            Self::Excited => {
                "That's fantastic! Let's listen to some energetic music to match your mood."
            }
        }
    }

    /// Where to send the user, if anywhere
    #[must_use]
    pub const fn destination(self) -> Option<&'static str> {
        match self {
            Self::Sad => Some("https://www.youtube.com/results?search_query=uplifting+music"),
            Self::Happy => Some("https://www.youtube.com/results?search_query=happy+music"),
            Self::Tired => Some("https://www.youtube.com/results?search_query=sleep+music"),
            Self::Bored => Some("https://www.google.com/search?q=online+games"),
            Self::Lonely => None,
            Self::Angry => Some("https://www.youtube.com/results?search_query=calming+sounds"),
            Self::Excited => Some("https://www.youtube.com/results?search_query=energetic+music"),
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Sad => "Plays uplifting music when sad.",
            Self::Happy => "Plays happy music when happy.",
            Self::Tired => "Plays sleep music when tired.",
            Self::Bored => "Suggests games when bored.",
            Self::Lonely => "Comforts when lonely.",
            Self::Angry => "Plays calming sounds when angry.",
            Self::Excited => "Plays energetic music when excited.",
        }
    }
}

/// A named keyword command; immutable once built
#[derive(Debug, Clone)]
pub struct CommandPlugin {
    name: String,
    keywords: Vec<String>,
    action: CommandAction,
    description: String,
}

impl CommandPlugin {
    /// Keywords are lowercased so matching against normalized input works
    pub fn new<I, K>(
        name: impl Into<String>,
        keywords: I,
        action: CommandAction,
        description: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Self {
            name: name.into(),
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
            action,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub const fn action(&self) -> &CommandAction {
        &self.action
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Plain substring test; no word boundaries
    #[must_use]
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && normalized.contains(k.as_str()))
    }

    #[must_use]
    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            name: self.name.clone(),
            keywords: self.keywords.clone(),
            description: self.description.clone(),
        }
    }
}

/// Serializable view of a plugin for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandInfo {
    pub name: String,
    pub keywords: Vec<String>,
    pub description: String,
}
