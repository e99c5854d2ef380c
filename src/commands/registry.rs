use super::{CommandInfo, CommandPlugin, builtin_plugins};
use crate::Result;

/// Ordered plugin list; registration order is match priority
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    plugins: Vec<CommandPlugin>,
}

impl CommandRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }

    /// A registry preloaded with the built-in commands
    #[must_use]
    pub fn with_builtins(assistant_name: &str) -> Self {
        let mut registry = Self::new();
        for plugin in builtin_plugins(assistant_name) {
            registry.register(plugin);
        }
        registry
    }

    /// Append a plugin; duplicates are kept and the earlier one wins
    pub fn register(&mut self, plugin: CommandPlugin) {
        tracing::debug!(name = plugin.name(), keywords = ?plugin.keywords(), "command registered");
        self.plugins.push(plugin);
    }

    /// Plugins in registration order
    #[must_use]
    pub fn list(&self) -> &[CommandPlugin] {
        &self.plugins
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(CommandPlugin::name).collect()
    }

    #[must_use]
    pub fn infos(&self) -> Vec<CommandInfo> {
        self.plugins.iter().map(CommandPlugin::info).collect()
    }

    /// Pretty-printed JSON listing of [`Self::infos`]
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.infos())?)
    }

    /// First plugin registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CommandPlugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// First plugin with a keyword inside `normalized`
    #[must_use]
    pub fn find_match(&self, normalized: &str) -> Option<&CommandPlugin> {
        self.plugins.iter().find(|p| p.matches(normalized))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
