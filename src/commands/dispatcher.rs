use std::sync::{Arc, LazyLock};

use chrono::Local;
use regex::Regex;
use tokio::runtime::Handle;

use super::{CommandAction, CommandPlugin, CommandRegistry};
use crate::camera::{CameraError, CameraManager, VideoSink};
use crate::navigation::{Navigator, google_search, wikipedia_article, youtube_search};
use crate::voice::SpeechOutput;

static PLAY_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^play\s+").expect("valid regex"));

const CAMERA_ON: &str = "Camera is now on.";
const CAMERA_FAILED: &str = "Sorry, I can't access the camera.";
const CAMERA_OFF: &str = "Camera is now off.";

/// Which path a dispatch took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A plugin matched and its action ran
    Matched { plugin: String },
    /// Nothing matched; a web search was opened
    Fallback,
}

/// What custom actions may use
pub struct ActionContext<'a> {
    pub speech: &'a SpeechOutput,
    pub navigator: &'a dyn Navigator,
    pub registry: &'a CommandRegistry,
}

impl ActionContext<'_> {
    /// Open `url`, logging failures
    pub fn open(&self, url: &str) {
        if let Err(e) = self.navigator.open(url) {
            tracing::warn!(url, error = %e, "navigation failed");
        }
    }

    pub fn say(&self, text: &str) {
        self.speech.say(text);
    }
}

/// Routes text to the first matching command
pub struct CommandDispatcher {
    registry: CommandRegistry,
    speech: Arc<SpeechOutput>,
    navigator: Arc<dyn Navigator>,
    camera: Arc<CameraManager>,
    video_sink: Option<Arc<dyn VideoSink>>,
}

impl CommandDispatcher {
    #[must_use]
    pub fn new(
        registry: CommandRegistry,
        speech: Arc<SpeechOutput>,
        navigator: Arc<dyn Navigator>,
        camera: Arc<CameraManager>,
    ) -> Self {
        Self {
            registry,
            speech,
            navigator,
            camera,
            video_sink: None,
        }
    }

    /// Surface the camera preview renders into
    #[must_use]
    pub fn with_video_sink(mut self, sink: Arc<dyn VideoSink>) -> Self {
        self.video_sink = Some(sink);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Add a plugin after the existing ones
    pub fn register(&mut self, plugin: CommandPlugin) {
        self.registry.register(plugin);
    }

    #[must_use]
    pub fn camera(&self) -> &Arc<CameraManager> {
        &self.camera
    }

    /// Run exactly one action for `raw`
    pub fn dispatch(&self, raw: &str) -> DispatchOutcome {
        let normalized = raw.trim().to_lowercase();

        let Some(plugin) = self.registry.find_match(&normalized) else {
            tracing::debug!(input = %raw, "no command matched, searching the web");
            self.fallback(raw);
            return DispatchOutcome::Fallback;
        };

        tracing::debug!(command = plugin.name(), input = %normalized, "command matched");
        self.execute(plugin.action(), &normalized);

        DispatchOutcome::Matched {
            plugin: plugin.name().to_string(),
        }
    }

    fn context(&self) -> ActionContext<'_> {
        ActionContext {
            speech: &self.speech,
            navigator: self.navigator.as_ref(),
            registry: &self.registry,
        }
    }

    fn execute(&self, action: &CommandAction, text: &str) {
        let ctx = self.context();

        match action {
            CommandAction::Reply(reply) => ctx.say(reply),
            CommandAction::Open { url, reply } => {
                ctx.open(url);
                ctx.say(reply);
            }
            CommandAction::PlaySong => {
                let song = strip_play_prefix(text);
                if song.is_empty() {
                    ctx.say("What would you like me to play?");
                } else {
                    ctx.open(&youtube_search(song));
                    ctx.say(&format!("Playing {song} on YouTube"));
                }
            }
            CommandAction::Mood(mood) => {
                ctx.say(mood.reply());
                if let Some(url) = mood.destination() {
                    ctx.open(url);
                }
            }
            CommandAction::Wikipedia => {
                let query = text.replacen("wikipedia", "", 1);
                let query = query.trim();
                ctx.open(&wikipedia_article(query));
                ctx.say(&format!(
                    "This is what I found on Wikipedia regarding {query}"
                ));
            }
            CommandAction::Search => {
                ctx.open(&google_search(text));
                ctx.say(&format!(
                    "This is what I found on the internet regarding {text}"
                ));
            }
            CommandAction::Time => {
                let now = Local::now();
                ctx.say(&format!("The time is {}", now.format("%-I:%M %p")));
            }
            CommandAction::Date => {
                let now = Local::now();
                ctx.say(&format!("Today's date is {}", now.format("%B %-d, %Y")));
            }
            CommandAction::Help => {
                let names = self.registry.names().join(", ");
                ctx.say(&format!(
                    "I can help you with many things. Some commands I understand: {names}"
                ));
            }
            CommandAction::OpenCamera => self.open_camera(),
            CommandAction::CloseCamera => {
                self.camera.stop();
                ctx.say(CAMERA_OFF);
            }
            CommandAction::Custom(action) => action(&ctx, text),
        }
    }

    /// Start the preview in the background; the reply follows the outcome
    fn open_camera(&self) {
        let Some(sink) = self.video_sink.clone() else {
            tracing::warn!(error = %CameraError::NoSink, "camera requested");
            self.speech.say(CAMERA_FAILED);
            return;
        };
        if !self.camera.is_supported() {
            tracing::warn!(error = %CameraError::Unsupported, "camera requested");
            self.speech.say(CAMERA_FAILED);
            return;
        }
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("camera requested outside a runtime");
            self.speech.say(CAMERA_FAILED);
            return;
        };

        let camera = Arc::clone(&self.camera);
        let speech = Arc::clone(&self.speech);
        runtime.spawn(async move {
            match camera.start(sink.as_ref()).await {
                Ok(()) => speech.say(CAMERA_ON),
                Err(CameraError::Cancelled) => tracing::debug!("camera start cancelled"),
                Err(e) => {
                    tracing::warn!(error = %e, "camera failed to start");
                    speech.say(CAMERA_FAILED);
                }
            }
        });
    }

    fn fallback(&self, raw: &str) {
        let ctx = self.context();
        ctx.open(&google_search(raw));
        ctx.say(&format!("I found some information for {raw} on Google."));
    }
}

/// "play  hey jude " -> "hey jude"
fn strip_play_prefix(text: &str) -> &str {
    PLAY_PREFIX
        .find(text)
        .map_or(text, |m| &text[m.end()..])
        .trim()
}
