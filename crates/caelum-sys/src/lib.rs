//! caelum-sys: turn a plain-English phrase into a system action.
//!
//! ```no_run
//! let out = caelum_sys::r#do("get current time")?;
//! println!("{}", out.render());
//! # Ok::<(), caelum_sys::CaelumError>(())
//! ```
//!
//! The first call to [`r#do`] loads the built-in plugins against the desktop
//! platform using the resolved config. Call [`init`] or [`init_with`] first to
//! control that, and [`teardown`] to drop the installed dispatcher.

use std::sync::Arc;

use caelum_core::{Dispatched, Dispatcher, Plugin, PluginLoader};
use caelum_platform::{DesktopPlatform, Platform};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;

pub use caelum_core::{CommandOutput, LoadReport, MatchKind};
pub use caelum_types::config::CaelumConfig;
pub use caelum_types::error::{CaelumError, ErrorKind, Result};

/// Crate version, as reported by `get caelum version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config resolved for lazy initialization. Resolved at most once per process.
static DEFAULT_CONFIG: OnceCell<CaelumConfig> = OnceCell::new();

/// Serializes lazy initialization so concurrent first calls load once.
static INIT_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Load the built-in plugins on the desktop platform and install the result.
pub fn init(config: CaelumConfig) -> LoadReport {
    install_from(
        &caelum_plugins::builtin_loader(),
        Arc::new(DesktopPlatform::new()),
        config,
    )
}

/// Load `plugins` against `platform` and install the result, replacing any
/// previously installed dispatcher.
pub fn init_with(
    config: CaelumConfig,
    platform: Arc<dyn Platform>,
    plugins: Vec<Box<dyn Plugin>>,
) -> LoadReport {
    install_from(&PluginLoader::with_plugins(plugins), platform, config)
}

fn install_from(
    loader: &PluginLoader,
    platform: Arc<dyn Platform>,
    config: CaelumConfig,
) -> LoadReport {
    let dispatcher = caelum_core::install(Dispatcher::load(loader, platform, config));
    log::info!(
        "caelum-sys {VERSION}: {} plugin(s), {} command(s)",
        dispatcher.report().loaded.len(),
        dispatcher.registry().len()
    );
    dispatcher.report().clone()
}

/// The installed dispatcher, initializing with the default config if none is.
pub fn snapshot() -> Result<Arc<Dispatcher>> {
    if let Some(dispatcher) = caelum_core::current() {
        return Ok(dispatcher);
    }
    let _guard = INIT_LOCK.lock();
    if let Some(dispatcher) = caelum_core::current() {
        return Ok(dispatcher);
    }
    let config = DEFAULT_CONFIG.get_or_try_init(|| CaelumConfig::resolve(None))?;
    log::debug!("no dispatcher installed; loading defaults");
    init(config.clone());
    caelum_core::current()
        .ok_or_else(|| CaelumError::Config("dispatcher was torn down during init".to_string()))
}

/// Run the command matching `text` and return its output.
pub fn r#do(text: &str) -> Result<CommandOutput> {
    dispatch(text).map(|d| d.output)
}

/// Like [`r#do`], also reporting which phrase matched and how.
pub fn dispatch(text: &str) -> Result<Dispatched> {
    snapshot()?.dispatch(text)
}

/// Every registered phrase pattern, sorted.
pub fn registered_phrases() -> Vec<String> {
    match snapshot() {
        Ok(dispatcher) => dispatcher
            .registry()
            .phrases()
            .into_iter()
            .map(str::to_string)
            .collect(),
        Err(e) => {
            log::warn!("cannot list phrases: {e}");
            Vec::new()
        },
    }
}

/// Drop the installed dispatcher. The next call re-initializes.
pub fn teardown() {
    if caelum_core::teardown().is_some() {
        log::debug!("dispatcher torn down");
    }
}
