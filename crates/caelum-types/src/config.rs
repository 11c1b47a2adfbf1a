//! Runtime configuration loaded from TOML.
//!
//! ```toml
//! duplicate_policy = "reject"   # or "overwrite"
//! allow_unsafe = false
//! disabled_plugins = ["media_controls"]
//!
//! [matching]
//! fuzzy = true
//! substring = true
//! min_fuzzy_score = 50
//!
//! [screenshot]
//! directory = "."
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CaelumError, Result};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CAELUM_CONFIG";

/// Upper bound accepted for `matching.min_fuzzy_score`.
const MAX_FUZZY_SCORE: i64 = 10_000;

/// What the registry does when a phrase is registered twice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail the second registration with `DuplicateCommand`.
    #[default]
    Reject,
    /// Replace the existing entry; last registration wins.
    Overwrite,
}

/// Phrase matcher tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Allow typo-tolerant matching as the last resolution tier.
    #[serde(default = "yes")]
    pub fuzzy: bool,
    /// Allow a known phrase embedded in longer input to resolve.
    #[serde(default = "yes")]
    pub substring: bool,
    /// Minimum skim score for a fuzzy match to count.
    #[serde(default = "default_min_fuzzy_score")]
    pub min_fuzzy_score: i64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            fuzzy: true,
            substring: true,
            min_fuzzy_score: default_min_fuzzy_score(),
        }
    }
}

/// Screenshot output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenshotConfig {
    /// Directory screenshots are written to (relative paths resolve against cwd).
    #[serde(default = "default_screenshot_dir")]
    pub directory: PathBuf,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            directory: default_screenshot_dir(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaelumConfig {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Permit commands flagged unsafe (shutdown, kill, delete, ...).
    #[serde(default)]
    pub allow_unsafe: bool,
    /// Plugin names to skip at load time.
    #[serde(default)]
    pub disabled_plugins: Vec<String>,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub screenshot: ScreenshotConfig,
}

fn yes() -> bool {
    true
}
fn default_min_fuzzy_score() -> i64 {
    50
}
fn default_screenshot_dir() -> PathBuf {
    PathBuf::from(".")
}

impl CaelumConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let config: Self = toml::from_str(src)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path).map_err(|e| {
            CaelumError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&src)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Resolve the config from an explicit path, `$CAELUM_CONFIG`, or the
    /// per-user config directory, falling back to defaults.
    ///
    /// An explicit path or env var that does not exist is an error; a missing
    /// per-user file is not.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check value ranges the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.screenshot.directory.as_os_str().is_empty() {
            return Err(CaelumError::Config(
                "screenshot.directory must not be empty".to_string(),
            ));
        }
        if !(0..=MAX_FUZZY_SCORE).contains(&self.matching.min_fuzzy_score) {
            return Err(CaelumError::Config(format!(
                "matching.min_fuzzy_score must be within 0..={MAX_FUZZY_SCORE}, got {}",
                self.matching.min_fuzzy_score
            )));
        }
        Ok(())
    }

    /// Whether the named plugin is disabled.
    pub fn is_disabled(&self, plugin: &str) -> bool {
        self.disabled_plugins.iter().any(|p| p == plugin)
    }
}

/// `config.toml` inside the platform's per-user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "caelum-sys")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
