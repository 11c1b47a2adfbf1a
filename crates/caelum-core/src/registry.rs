//! Phrase-to-handler bindings.

use std::collections::BTreeMap;
use std::sync::Arc;

use caelum_types::config::DuplicatePolicy;
use caelum_types::error::{CaelumError, Result};

use crate::command::Command;
use crate::matcher::{PhraseMatcher, Resolution};
use crate::template::Template;

/// A single phrase bound to a handler.
pub struct CommandEntry {
    phrase: String,
    plugin: String,
    description: String,
    safe: bool,
    template: Option<Template>,
    handler: Arc<dyn Command>,
}

impl CommandEntry {
    /// Build an entry, normalizing and compiling `phrase`.
    ///
    /// Entries are safe by default; see [`CommandEntry::mark_unsafe`].
    pub fn new(
        phrase: &str,
        plugin: impl Into<String>,
        handler: impl Command + 'static,
    ) -> Result<Self> {
        let (phrase, template) = Template::compile(phrase)?;
        Ok(Self {
            phrase,
            plugin: plugin.into(),
            description: String::new(),
            safe: true,
            template,
            handler: Arc::new(handler),
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Flag the command as changing system state; the dispatcher refuses it
    /// unless unsafe commands are allowed.
    pub fn mark_unsafe(mut self) -> Self {
        self.safe = false;
        self
    }

    /// Normalized phrase pattern (registry key).
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn handler(&self) -> &dyn Command {
        self.handler.as_ref()
    }
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("phrase", &self.phrase)
            .field("plugin", &self.plugin)
            .field("safe", &self.safe)
            .finish_non_exhaustive()
    }
}

/// Registry of commands keyed by normalized phrase pattern.
///
/// Populated while plugins load, read-only afterwards.
pub struct CommandRegistry {
    entries: BTreeMap<String, CommandEntry>,
    policy: DuplicatePolicy,
}

impl CommandRegistry {
    /// Create an empty registry that rejects duplicate phrases.
    pub fn new() -> Self {
        Self::with_policy(DuplicatePolicy::Reject)
    }

    pub fn with_policy(policy: DuplicatePolicy) -> Self {
        Self {
            entries: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Register a command.
    ///
    /// Under [`DuplicatePolicy::Reject`] a phrase already bound fails with
    /// `DuplicateCommand` and the existing entry is kept. Under
    /// [`DuplicatePolicy::Overwrite`] the new entry replaces it.
    pub fn register(&mut self, entry: CommandEntry) -> Result<()> {
        if let Some(existing) = self.entries.get(entry.phrase()) {
            match self.policy {
                DuplicatePolicy::Reject => {
                    return Err(CaelumError::DuplicateCommand(format!(
                        "'{}' (already registered by {})",
                        entry.phrase(),
                        existing.plugin()
                    )));
                },
                DuplicatePolicy::Overwrite => {
                    log::warn!(
                        "'{}' from {} overrides the binding from {}",
                        entry.phrase(),
                        entry.plugin(),
                        existing.plugin()
                    );
                },
            }
        }
        self.entries.insert(entry.phrase().to_string(), entry);
        Ok(())
    }

    pub fn contains(&self, phrase: &str) -> bool {
        self.entries.contains_key(&crate::template::normalize(phrase))
    }

    pub fn get(&self, phrase: &str) -> Option<&CommandEntry> {
        self.entries.get(&crate::template::normalize(phrase))
    }

    /// Resolve free text with default matching options.
    pub fn lookup(&self, input: &str) -> Result<Resolution<'_>> {
        PhraseMatcher::default().resolve(self, input)
    }

    /// All registered phrase patterns, sorted.
    pub fn phrases(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Entries in phrase order.
    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.values()
    }

    /// Entries grouped by plugin name, both levels sorted.
    pub fn by_plugin(&self) -> BTreeMap<&str, Vec<&CommandEntry>> {
        let mut groups: BTreeMap<&str, Vec<&CommandEntry>> = BTreeMap::new();
        for entry in self.entries.values() {
            groups.entry(entry.plugin()).or_default().push(entry);
        }
        groups
    }

    /// Phrases starting with `partial` (normalized).
    pub fn completions(&self, partial: &str) -> Vec<&str> {
        let lower = crate::template::normalize(partial);
        self.entries
            .keys()
            .filter(|phrase| phrase.starts_with(&lower))
            .map(String::as_str)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
