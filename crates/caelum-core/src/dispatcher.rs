//! Resolve free text and invoke the bound handler.
//!
//! The dispatcher owns a loaded registry, the platform services handed to
//! handlers, and the config. One immutable dispatcher can be installed as the
//! process-wide snapshot; installing another swaps it atomically while calls
//! already in flight keep the `Arc` they started with.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use caelum_platform::Platform;
use caelum_types::config::CaelumConfig;
use caelum_types::error::{CaelumError, Result};
use parking_lot::RwLock;
use serde::Serialize;

use crate::command::{CommandOutput, Invocation};
use crate::loader::{LoadReport, PluginLoader, panic_message};
use crate::matcher::{MatchKind, MatchOptions, PhraseMatcher, Resolution};
use crate::registry::CommandRegistry;
use crate::template::normalize;

/// Maximum number of "did you mean" suggestions.
const MAX_SUGGESTIONS: usize = 5;

/// A successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dispatched {
    pub phrase: String,
    pub plugin: String,
    pub kind: MatchKind,
    pub output: CommandOutput,
}

pub struct Dispatcher {
    registry: CommandRegistry,
    platform: Arc<dyn Platform>,
    config: CaelumConfig,
    matcher: PhraseMatcher,
    report: LoadReport,
}

impl Dispatcher {
    /// Wrap an already populated registry.
    pub fn new(
        registry: CommandRegistry,
        platform: Arc<dyn Platform>,
        config: CaelumConfig,
    ) -> Self {
        let matcher = PhraseMatcher::new(MatchOptions::from(&config.matching));
        Self {
            registry,
            platform,
            config,
            matcher,
            report: LoadReport::default(),
        }
    }

    /// Build a registry from `loader` and wrap it.
    pub fn load(
        loader: &PluginLoader,
        platform: Arc<dyn Platform>,
        config: CaelumConfig,
    ) -> Self {
        let mut registry = CommandRegistry::with_policy(config.duplicate_policy);
        let report = loader.load_all(&mut registry, &config);
        log::debug!(
            "dispatcher ready: {} commands, {} plugin failures",
            registry.len(),
            report.failed.len()
        );
        let mut dispatcher = Self::new(registry, platform, config);
        dispatcher.report = report;
        dispatcher
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CaelumConfig {
        &self.config
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    pub fn platform(&self) -> &dyn Platform {
        self.platform.as_ref()
    }

    pub fn resolve(&self, input: &str) -> Result<Resolution<'_>> {
        self.matcher.resolve(&self.registry, input)
    }

    /// Resolve `input`, apply the safety gate, and run the handler.
    pub fn dispatch(&self, input: &str) -> Result<Dispatched> {
        let Resolution { entry, args, kind } = self.resolve(input)?;
        if !entry.is_safe() && !self.config.allow_unsafe {
            log::warn!("refusing unsafe command '{}'", entry.phrase());
            return Err(CaelumError::Blocked(entry.phrase().to_string()));
        }

        let inv = Invocation {
            input,
            phrase: entry.phrase(),
            args: &args,
            platform: self.platform.as_ref(),
            config: &self.config,
        };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry.handler().execute(&inv)));
        let output = match outcome {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(shape_error(entry.phrase(), e)),
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                log::error!("handler for '{}' panicked: {msg}", entry.phrase());
                return Err(CaelumError::Handler(format!(
                    "{}: panicked: {msg}",
                    entry.phrase()
                )));
            },
        };

        Ok(Dispatched {
            phrase: entry.phrase().to_string(),
            plugin: entry.plugin().to_string(),
            kind,
            output,
        })
    }

    /// Dispatch and keep only the output.
    pub fn run(&self, input: &str) -> Result<CommandOutput> {
        self.dispatch(input).map(|d| d.output)
    }

    /// Registered phrases completing `input`, then phrases sharing its first
    /// word.
    pub fn suggestions(&self, input: &str) -> Vec<&str> {
        let normalized = normalize(input);
        let Some(first) = normalized.split(' ').next().filter(|w| !w.is_empty()) else {
            return Vec::new();
        };
        let mut found = self.registry.completions(&normalized);
        for phrase in self.registry.phrases() {
            if phrase.split(' ').next() == Some(first) && !found.contains(&phrase) {
                found.push(phrase);
            }
        }
        found.truncate(MAX_SUGGESTIONS);
        found
    }
}

/// Map a handler failure into the caller-facing taxonomy.
///
/// `InvalidArgument` passes through; everything else becomes `Handler`
/// prefixed with the phrase.
fn shape_error(phrase: &str, err: CaelumError) -> CaelumError {
    match err {
        CaelumError::InvalidArgument(_) => err,
        CaelumError::Handler(msg) => CaelumError::Handler(format!("{phrase}: {msg}")),
        other => CaelumError::Handler(format!("{phrase}: {other}")),
    }
}

// -----------------------------------------------------------------------
// Process-wide snapshot
// -----------------------------------------------------------------------

static ACTIVE: RwLock<Option<Arc<Dispatcher>>> = parking_lot::const_rwlock(None);

/// Install `dispatcher` as the process-wide snapshot, replacing any previous one.
pub fn install(dispatcher: Dispatcher) -> Arc<Dispatcher> {
    let dispatcher = Arc::new(dispatcher);
    let previous = ACTIVE.write().replace(Arc::clone(&dispatcher));
    if previous.is_some() {
        log::debug!("replaced dispatcher snapshot");
    }
    dispatcher
}

/// The installed snapshot, if any. The lock is released before returning.
pub fn current() -> Option<Arc<Dispatcher>> {
    ACTIVE.read().clone()
}

/// Remove the installed snapshot, returning it.
pub fn teardown() -> Option<Arc<Dispatcher>> {
    ACTIVE.write().take()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Invocation;
    use crate::loader::{Plugin, PluginRegistrar};
    use caelum_platform::fake::{Effect, FakePlatform};
    use caelum_platform::MediaKey;
    use caelum_types::error::ErrorKind;

    fn hello(_: &Invocation<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::text("Hello!"))
    }

    fn now(inv: &Invocation<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::text(inv.platform.now_utc()?.to_rfc3339()))
    }

    fn echo(inv: &Invocation<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::text(inv.args.require("text")?))
    }

    fn wait(inv: &Invocation<'_>) -> Result<CommandOutput> {
        let secs: u64 = inv.args.parse("seconds")?;
        Ok(CommandOutput::text(format!("waited {secs}")))
    }

    fn broken(_: &Invocation<'_>) -> Result<CommandOutput> {
        Err(CaelumError::platform("device missing"))
    }

    fn explode(_: &Invocation<'_>) -> Result<CommandOutput> {
        panic!("handler blew up");
    }

    fn mute(inv: &Invocation<'_>) -> Result<CommandOutput> {
        inv.platform.press(MediaKey::Mute)?;
        Ok(CommandOutput::None)
    }

    struct TestPlugin;

    impl Plugin for TestPlugin {
        fn name(&self) -> &str {
            "test"
        }

        fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
            reg.command("say hello", "", hello)?;
            reg.command("get current time", "", now)?;
            reg.command("echo {text}", "", echo)?;
            reg.command("wait {seconds}", "", wait)?;
            reg.command("broken thing", "", broken)?;
            reg.command("explode", "", explode)?;
            reg.unsafe_command("mute volume", "", mute)?;
            Ok(())
        }
    }

    fn dispatcher_with(config: CaelumConfig) -> (Dispatcher, Arc<FakePlatform>) {
        let fake = Arc::new(FakePlatform::new());
        let platform: Arc<dyn Platform> = Arc::<FakePlatform>::clone(&fake);
        let loader = PluginLoader::with_plugins(vec![Box::new(TestPlugin)]);
        (Dispatcher::load(&loader, platform, config), fake)
    }

    fn dispatcher() -> Dispatcher {
        dispatcher_with(CaelumConfig::default()).0
    }

    #[test]
    fn dispatch_exact() {
        let d = dispatcher().dispatch("say hello").unwrap();
        assert_eq!(d.output, CommandOutput::text("Hello!"));
        assert_eq!(d.phrase, "say hello");
        assert_eq!(d.plugin, "test");
        assert_eq!(d.kind, MatchKind::Exact);
    }

    #[test]
    fn handler_uses_platform() {
        let out = dispatcher().run("get current time").unwrap();
        assert_eq!(out, CommandOutput::text("2026-02-13T14:30:45+00:00"));
    }

    #[test]
    fn dispatch_template_and_fuzzy() {
        let d = dispatcher();
        assert_eq!(
            d.run("echo Hi There").unwrap(),
            CommandOutput::text("Hi There")
        );
        let fuzzy = d.dispatch("say helo").unwrap();
        assert_eq!(fuzzy.kind, MatchKind::Fuzzy);
        assert_eq!(fuzzy.output, CommandOutput::text("Hello!"));
    }

    #[test]
    fn not_found_and_empty() {
        let d = dispatcher();
        assert_eq!(
            d.run("not a real command").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(d.run("   ").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn invalid_argument_passes_through() {
        let err = dispatcher().run("wait forever").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn platform_error_becomes_handler_error() {
        let err = dispatcher().run("broken thing").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerError);
        let msg = format!("{err}");
        assert!(msg.contains("broken thing"));
        assert!(msg.contains("device missing"));
    }

    #[test]
    fn handler_panic_is_caught() {
        let err = dispatcher().run("explode").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerError);
        assert!(format!("{err}").contains("handler blew up"));
    }

    #[test]
    fn unsafe_command_blocked_by_default() {
        let (d, fake) = dispatcher_with(CaelumConfig::default());
        let err = d.run("mute volume").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Blocked);
        assert!(fake.effects().is_empty());
    }

    #[test]
    fn unsafe_command_allowed_by_config() {
        let config = CaelumConfig {
            allow_unsafe: true,
            ..CaelumConfig::default()
        };
        let (d, fake) = dispatcher_with(config);
        assert_eq!(d.run("mute volume").unwrap(), CommandOutput::None);
        assert_eq!(fake.effects(), vec![Effect::Pressed(MediaKey::Mute)]);
    }

    #[test]
    fn suggestions_share_first_word() {
        let d = dispatcher();
        assert_eq!(d.suggestions("say something"), vec!["say hello"]);
        assert!(d.suggestions("").is_empty());
        assert!(d.suggestions("zzz").is_empty());
    }

    #[test]
    fn suggestions_complete_partial_input() {
        let d = dispatcher();
        assert_eq!(d.suggestions("wai"), vec!["wait {seconds}"]);
        assert_eq!(d.suggestions("Get Curr"), vec!["get current time"]);
    }

    #[test]
    fn shape_error_prefixes_phrase() {
        let err = shape_error("x", CaelumError::Handler("bad".into()));
        assert_eq!(format!("{err}"), "handler error: x: bad");
        let err = shape_error("x", CaelumError::invalid("nope"));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn snapshot_install_swap_and_teardown() {
        teardown();
        assert!(current().is_none());

        let first = install(dispatcher());
        let held = current().unwrap();
        assert!(Arc::ptr_eq(&first, &held));

        let second = install(dispatcher());
        assert!(Arc::ptr_eq(&second, &current().unwrap()));
        // The old snapshot stays usable for whoever still holds it.
        assert_eq!(held.run("say hello").unwrap(), CommandOutput::text("Hello!"));

        assert!(teardown().is_some());
        assert!(current().is_none());
    }
}
