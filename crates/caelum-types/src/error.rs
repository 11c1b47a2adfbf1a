//! Error types for caelum-sys.

use std::io;

/// Errors produced by the caelum-sys framework.
#[derive(Debug, thiserror::Error)]
pub enum CaelumError {
    #[error("no command matches '{0}'")]
    NotFound(String),

    #[error("duplicate command phrase: {0}")]
    DuplicateCommand(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("handler error: {0}")]
    Handler(String),

    #[error("plugin '{plugin}' failed to load: {reason}")]
    PluginLoad { plugin: String, reason: String },

    #[error("'{0}' is marked unsafe; rerun with --allow-unsafe or set allow_unsafe = true")]
    Blocked(String),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure category reported to callers and mapped to exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No registered command matched the input.
    NotFound,
    /// The handler (or the library it wraps) failed.
    HandlerError,
    /// The input or a captured argument was unusable.
    InvalidArgument,
    /// A plugin failed to register its commands.
    PluginLoadError,
    /// A phrase was registered twice under the reject policy.
    DuplicateCommand,
    /// An unsafe command was refused.
    Blocked,
    /// Configuration could not be loaded or is invalid.
    Config,
}

impl ErrorKind {
    /// Process exit code used by the CLI for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            Self::HandlerError | Self::PluginLoadError | Self::DuplicateCommand => 1,
            Self::NotFound => 3,
            Self::InvalidArgument => 4,
            Self::Blocked => 5,
            Self::Config => 6,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::NotFound => "not_found",
            Self::HandlerError => "handler_error",
            Self::InvalidArgument => "invalid_argument",
            Self::PluginLoadError => "plugin_load_error",
            Self::DuplicateCommand => "duplicate_command",
            Self::Blocked => "blocked",
            Self::Config => "config",
        };
        f.write_str(s)
    }
}

impl CaelumError {
    /// The taxonomy bucket this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::DuplicateCommand(_) => ErrorKind::DuplicateCommand,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::PluginLoad { .. } => ErrorKind::PluginLoadError,
            Self::Blocked(_) => ErrorKind::Blocked,
            Self::Config(_) | Self::TomlParse(_) => ErrorKind::Config,
            Self::Handler(_) | Self::Platform(_) | Self::Io(_) | Self::Json(_) => {
                ErrorKind::HandlerError
            },
        }
    }

    /// Shorthand for an `InvalidArgument` error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand for a `Platform` error.
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, CaelumError>;
