//! Plugin trait and loader.
//!
//! A plugin stages its commands on a [`PluginRegistrar`]. The loader commits
//! the staged set into the registry only if the whole plugin registered
//! cleanly, so a failing plugin never leaves half its commands behind.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use caelum_types::config::{CaelumConfig, DuplicatePolicy};
use caelum_types::error::{CaelumError, ErrorKind, Result};

use crate::command::Command;
use crate::registry::{CommandEntry, CommandRegistry};

// -----------------------------------------------------------------------
// Plugin trait
// -----------------------------------------------------------------------

/// A named bundle of commands.
pub trait Plugin: Send + Sync {
    /// Unique name, also used in `disabled_plugins`.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Stage this plugin's commands.
    fn register(&self, reg: &mut PluginRegistrar) -> Result<()>;
}

// -----------------------------------------------------------------------
// PluginRegistrar
// -----------------------------------------------------------------------

/// Collects one plugin's commands before they are committed.
pub struct PluginRegistrar {
    plugin: String,
    staged: Vec<CommandEntry>,
}

impl PluginRegistrar {
    pub fn new(plugin: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            staged: Vec::new(),
        }
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    /// Stage a safe command.
    pub fn command(
        &mut self,
        phrase: &str,
        description: &str,
        handler: impl Command + 'static,
    ) -> Result<()> {
        let entry =
            CommandEntry::new(phrase, self.plugin.as_str(), handler)?.with_description(description);
        self.staged.push(entry);
        Ok(())
    }

    /// Stage a command that changes system state.
    pub fn unsafe_command(
        &mut self,
        phrase: &str,
        description: &str,
        handler: impl Command + 'static,
    ) -> Result<()> {
        let entry = CommandEntry::new(phrase, self.plugin.as_str(), handler)?
            .with_description(description)
            .mark_unsafe();
        self.staged.push(entry);
        Ok(())
    }

    pub fn staged_phrases(&self) -> Vec<&str> {
        self.staged.iter().map(CommandEntry::phrase).collect()
    }

    /// Move every staged entry into `registry`.
    ///
    /// Under [`DuplicatePolicy::Reject`] all phrases are checked first and
    /// nothing is committed if any collides.
    pub fn commit(self, registry: &mut CommandRegistry) -> Result<usize> {
        if registry.policy() == DuplicatePolicy::Reject {
            let mut seen = HashSet::new();
            for entry in &self.staged {
                if let Some(existing) = registry.get(entry.phrase()) {
                    return Err(CaelumError::DuplicateCommand(format!(
                        "'{}' (already registered by {})",
                        entry.phrase(),
                        existing.plugin()
                    )));
                }
                if !seen.insert(entry.phrase()) {
                    return Err(CaelumError::DuplicateCommand(format!(
                        "'{}' (staged twice by {})",
                        entry.phrase(),
                        self.plugin
                    )));
                }
            }
        }
        let count = self.staged.len();
        for entry in self.staged {
            registry.register(entry)?;
        }
        Ok(count)
    }
}

// -----------------------------------------------------------------------
// LoadReport
// -----------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPlugin {
    pub name: String,
    pub commands: usize,
}

/// A plugin that failed to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFailure {
    pub plugin: String,
    pub reason: String,
}

impl PluginFailure {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PluginLoadError
    }

    pub fn to_error(&self) -> CaelumError {
        CaelumError::PluginLoad {
            plugin: self.plugin.clone(),
            reason: self.reason.clone(),
        }
    }
}

impl std::fmt::Display for PluginFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_error())
    }
}

/// Outcome of [`PluginLoader::load_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<LoadedPlugin>,
    /// Plugins named in `disabled_plugins`.
    pub skipped: Vec<String>,
    pub failed: Vec<PluginFailure>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn command_count(&self) -> usize {
        self.loaded.iter().map(|p| p.commands).sum()
    }
}

// -----------------------------------------------------------------------
// PluginLoader
// -----------------------------------------------------------------------

/// Ordered set of plugins to register at startup.
#[derive(Default)]
pub struct PluginLoader {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugins(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Register every enabled plugin into `registry`.
    ///
    /// Errors and panics are isolated per plugin and collected in the
    /// report; loading always continues with the next plugin.
    pub fn load_all(&self, registry: &mut CommandRegistry, config: &CaelumConfig) -> LoadReport {
        let mut report = LoadReport::default();
        for plugin in &self.plugins {
            let name = plugin.name();
            if config.is_disabled(name) {
                log::info!("plugin {name} disabled by config");
                report.skipped.push(name.to_string());
                continue;
            }
            match load_one(plugin.as_ref(), registry) {
                Ok(commands) => {
                    log::info!("loaded plugin {name} ({commands} commands)");
                    report.loaded.push(LoadedPlugin {
                        name: name.to_string(),
                        commands,
                    });
                },
                Err(reason) => {
                    let failure = PluginFailure {
                        plugin: name.to_string(),
                        reason,
                    };
                    log::warn!("{failure}");
                    report.failed.push(failure);
                },
            }
        }
        report
    }
}

fn load_one(
    plugin: &dyn Plugin,
    registry: &mut CommandRegistry,
) -> std::result::Result<usize, String> {
    let mut registrar = PluginRegistrar::new(plugin.name());
    match panic::catch_unwind(AssertUnwindSafe(|| plugin.register(&mut registrar))) {
        Ok(Ok(())) => {
            log::debug!("{} staged {:?}", plugin.name(), registrar.staged_phrases());
            registrar.commit(registry).map_err(|e| e.to_string())
        },
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => Err(format!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
