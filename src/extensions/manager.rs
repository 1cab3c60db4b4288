//! Extension manager - handles extension registration and activation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use crate::application::errors::{BotError, CommandError};
use crate::domain::entities::MessageEvent;
use crate::extensions::trait_def::{Extension, ExtensionInfo};

struct Registered {
    extension: Arc<dyn Extension>,
    enabled: AtomicBool,
    channels: Vec<String>,
}

impl Registered {
    fn allows(&self, channel: &str) -> bool {
        self.channels.is_empty() || self.channels.iter().any(|c| c == channel)
    }
}

/// Manages all extensions for the bot, in registration order
#[derive(Default)]
pub struct ExtensionManager {
    extensions: Vec<Registered>,
}

impl ExtensionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enabled extension, optionally limited to some channels
    pub fn register(&mut self, extension: Arc<dyn Extension>, channels: Vec<String>) -> Result<(), BotError> {
        let name = extension.name().to_string();

        if self.find(&name).is_some() {
            return Err(BotError::Extension(format!("Extension '{}' already registered", name)));
        }

        info!("Registering extension: {}", name);
        self.extensions.push(Registered {
            extension,
            enabled: AtomicBool::new(true),
            channels,
        });
        Ok(())
    }

    fn find(&self, name: &str) -> Option<&Registered> {
        self.extensions
            .iter()
            .find(|r| r.extension.name().eq_ignore_ascii_case(name))
    }

    fn set_enabled(&self, name: &str, enabled: bool) -> Result<String, CommandError> {
        let registered = self
            .find(name)
            .ok_or_else(|| CommandError::UnknownExtension(name.to_string()))?;
        registered.enabled.store(enabled, Ordering::SeqCst);

        let name = registered.extension.name().to_string();
        info!("Extension {} {}", name, if enabled { "enabled" } else { "disabled" });
        Ok(name)
    }

    /// Enable an extension; returns its canonical name
    pub fn enable(&self, name: &str) -> Result<String, CommandError> {
        self.set_enabled(name, true)
    }

    /// Disable an extension; returns its canonical name
    pub fn disable(&self, name: &str) -> Result<String, CommandError> {
        self.set_enabled(name, false)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.find(name)
            .map(|r| r.enabled.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Whether the extension may act in `channel`
    pub fn is_allowed_in(&self, name: &str, channel: &str) -> bool {
        self.find(name).map(|r| r.allows(channel)).unwrap_or(false)
    }

    /// Enabled extensions that should see `event`. Direct messages with the
    /// bot bypass channel restrictions.
    pub fn active_for(&self, event: &MessageEvent) -> Vec<Arc<dyn Extension>> {
        let direct = event.is_direct_message();
        self.extensions
            .iter()
            .filter(|r| r.enabled.load(Ordering::SeqCst) && (direct || r.allows(&event.channel)))
            .map(|r| r.extension.clone())
            .collect()
    }

    /// List all registered extensions
    pub fn list(&self) -> Vec<ExtensionInfo> {
        self.extensions
            .iter()
            .map(|r| ExtensionInfo {
                name: r.extension.name().to_string(),
                description: r.extension.description().to_string(),
                enabled: r.enabled.load(Ordering::SeqCst),
                channels: r.channels.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}
