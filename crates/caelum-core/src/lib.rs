//! Command registry and dispatch core.
//!
//! Plugins register phrase patterns (`"get current time"`,
//! `"ping {host}"`) with handlers. The dispatcher normalizes free text,
//! resolves it through the registry's matching tiers, and invokes the bound
//! handler, shaping every failure into the `caelum_types` error taxonomy.

mod command;
mod dispatcher;
mod loader;
mod matcher;
mod registry;
mod template;

/// Captured template arguments with typed accessors.
pub use command::Args;
/// A handler bound to a phrase.
pub use command::Command;
/// Output produced by a command.
pub use command::CommandOutput;
/// Everything a handler sees when invoked.
pub use command::Invocation;
/// Resolves text and invokes handlers.
pub use dispatcher::{Dispatched, Dispatcher};
/// Process-wide dispatcher snapshot.
pub use dispatcher::{current, install, teardown};
/// Plugin trait, staging registrar, loader, and load report.
pub use loader::{
    LoadReport, LoadedPlugin, Plugin, PluginFailure, PluginLoader, PluginRegistrar,
};
/// How an input was resolved.
pub use matcher::{MatchKind, MatchOptions, PhraseMatcher, Resolution};
/// Phrase-to-handler bindings.
pub use registry::{CommandEntry, CommandRegistry};
/// Phrase normalization.
pub use template::{Template, normalize};
