//! Opening destinations (web pages, app URIs) in the user's environment

use std::path::PathBuf;
use std::process::{Command, Stdio};

use url::Url;

use crate::{Error, Result};

pub const GOOGLE_HOME: &str = "https://google.com";
pub const YOUTUBE_HOME: &str = "https://youtube.com";
pub const FACEBOOK_HOME: &str = "https://facebook.com";
pub const WHATSAPP_WEB: &str = "https://web.whatsapp.com";
pub const CALCULATOR_URI: &str = "Calculator:///";

/// Opens a destination; opening is fire-and-forget
pub trait Navigator: Send + Sync {
    /// # Errors
    ///
    /// Returns error if the destination is malformed or cannot be handed off
    fn open(&self, url: &str) -> Result<()>;
}

/// Google results page for `query`
#[must_use]
pub fn google_search(query: &str) -> String {
    format!(
        "https://www.google.com/search?q={}",
        urlencoding::encode(query)
    )
}

/// YouTube results page for `query`
#[must_use]
pub fn youtube_search(query: &str) -> String {
    format!(
        "https://www.youtube.com/results?search_query={}",
        urlencoding::encode(query)
    )
}

/// English Wikipedia article for `topic`
#[must_use]
pub fn wikipedia_article(topic: &str) -> String {
    format!(
        "https://en.wikipedia.org/wiki/{}",
        urlencoding::encode(topic)
    )
}

/// Hands URLs to the desktop's default handler
pub struct SystemNavigator {
    opener: Option<PathBuf>,
    leading_args: &'static [&'static str],
    enabled: bool,
}

impl SystemNavigator {
    /// Locate the platform opener
    ///
    /// With `enabled` false (or no opener on `PATH`) destinations are only
    /// logged.
    #[must_use]
    pub fn detect(enabled: bool) -> Self {
        let (program, leading_args): (&str, &'static [&'static str]) = if cfg!(target_os = "macos")
        {
            ("open", &[])
        } else if cfg!(target_os = "windows") {
            ("cmd", &["/C", "start", ""])
        } else {
            ("xdg-open", &[])
        };

        let opener = which::which(program).ok();
        if enabled && opener.is_none() {
            tracing::warn!(program, "no URL opener found, links will only be logged");
        }

        Self {
            opener,
            leading_args,
            enabled,
        }
    }

    /// A navigator that never launches anything
    #[must_use]
    pub const fn log_only() -> Self {
        Self {
            opener: None,
            leading_args: &[],
            enabled: false,
        }
    }
}

impl Navigator for SystemNavigator {
    fn open(&self, url: &str) -> Result<()> {
        let parsed = Url::parse(url).map_err(|e| Error::Navigation(format!("{url}: {e}")))?;

        let Some(opener) = self.opener.as_ref().filter(|_| self.enabled) else {
            tracing::info!(url = %parsed, "open (not launched)");
            return Ok(());
        };

        let mut child = Command::new(opener)
            .args(self.leading_args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Navigation(format!("failed to launch opener: {e}")))?;

        // reap without blocking the caller
        std::thread::spawn(move || child.wait());

        tracing::info!(url = %parsed, "opened");
        Ok(())
    }
}
