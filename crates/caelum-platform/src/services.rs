//! Platform service traits and the value types they exchange.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use caelum_types::error::Result;
use chrono::{DateTime, FixedOffset, Utc};

// ---------------------------------------------------------------------------
// Time service
// ---------------------------------------------------------------------------

/// Abstraction over wall-clock time.
pub trait TimeService {
    /// Current UTC time.
    fn now_utc(&self) -> Result<DateTime<Utc>>;

    /// Offset of the machine's local time zone from UTC.
    fn local_offset(&self) -> Result<FixedOffset>;

    /// Seconds since the machine booted (or the process started).
    fn uptime_secs(&self) -> Result<u64>;

    /// Block the caller for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Render an uptime as `up N day(s), HH:MM:SS` or `up HH:MM:SS`.
pub fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let mins = (secs % 3600) / 60;
    let s = secs % 60;
    if days > 0 {
        format!("up {days} day(s), {hours:02}:{mins:02}:{s:02}")
    } else {
        format!("up {hours:02}:{mins:02}:{s:02}")
    }
}

// ---------------------------------------------------------------------------
// System service
// ---------------------------------------------------------------------------

/// Static facts about the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    /// OS family (e.g. "Ubuntu", "Mac OS", "Windows").
    pub os: String,
    /// OS release string.
    pub os_version: String,
    /// CPU architecture (`std::env::consts::ARCH`).
    pub arch: String,
    pub hostname: String,
    pub username: String,
}

/// Abstraction over host identification.
pub trait SystemService {
    fn system_info(&self) -> Result<SystemInfo>;
}

// ---------------------------------------------------------------------------
// Process service
// ---------------------------------------------------------------------------

/// Physical memory totals in KiB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    pub total_kib: u64,
    pub available_kib: u64,
}

impl MemoryInfo {
    /// Memory in use, in KiB.
    pub fn used_kib(&self) -> u64 {
        self.total_kib.saturating_sub(self.available_kib)
    }

    /// Percentage of memory in use (0.0 when the total is unknown).
    pub fn used_percent(&self) -> f64 {
        if self.total_kib == 0 {
            return 0.0;
        }
        self.used_kib() as f64 * 100.0 / self.total_kib as f64
    }
}

/// One running process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    /// Resident set size in KiB (0 if unknown).
    pub rss_kib: u64,
}

/// Abstraction over process and resource inspection.
pub trait ProcessService {
    /// Aggregate CPU utilisation in percent over a short sampling window.
    fn cpu_usage_percent(&self) -> Result<f32>;

    fn memory_info(&self) -> Result<MemoryInfo>;

    /// Snapshot of running processes.
    fn processes(&self) -> Result<Vec<ProcessInfo>>;

    /// Terminate a process.
    fn kill(&self, pid: u32) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Clipboard service
// ---------------------------------------------------------------------------

/// Abstraction over the system clipboard.
pub trait ClipboardService {
    fn clipboard_text(&self) -> Result<String>;

    fn set_clipboard_text(&self, text: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Screen service
// ---------------------------------------------------------------------------

/// A rectangular screen region in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Abstraction over screen capture.
pub trait ScreenService {
    /// Capture the screen (or `region` of it) into an image file at `path`.
    fn capture(&self, path: &Path, region: Option<Region>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Media service
// ---------------------------------------------------------------------------

/// A media key the platform can synthesize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKey {
    PlayPause,
    Mute,
    VolumeUp,
    VolumeDown,
    Next,
    Previous,
}

impl std::fmt::Display for MediaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PlayPause => write!(f, "play/pause"),
            Self::Mute => write!(f, "mute"),
            Self::VolumeUp => write!(f, "volume up"),
            Self::VolumeDown => write!(f, "volume down"),
            Self::Next => write!(f, "next track"),
            Self::Previous => write!(f, "previous track"),
        }
    }
}

/// Abstraction over media playback and volume control.
pub trait MediaService {
    fn press(&self, key: MediaKey) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Network service
// ---------------------------------------------------------------------------

/// Abstraction over network queries.
pub trait NetworkService {
    /// Address of the interface used for outbound traffic.
    fn local_ip(&self) -> Result<IpAddr>;

    /// DNS lookup.
    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>>;

    /// Send a single echo request; returns the round-trip summary line.
    fn ping(&self, host: &str) -> Result<String>;

    /// Whether a TCP connection to `host:port` succeeds within `timeout`.
    fn port_open(&self, host: &str, port: u16, timeout: Duration) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Session service
// ---------------------------------------------------------------------------

/// Abstraction over session-level power actions.
pub trait SessionService {
    fn lock_screen(&self) -> Result<()>;

    /// Schedule a system shutdown `minutes` from now.
    fn schedule_shutdown(&self, minutes: u32) -> Result<()>;

    fn cancel_shutdown(&self) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Unified platform trait
// ---------------------------------------------------------------------------

/// Aggregate trait providing access to all platform services.
pub trait Platform:
    TimeService
    + SystemService
    + ProcessService
    + ClipboardService
    + ScreenService
    + MediaService
    + NetworkService
    + SessionService
    + Send
    + Sync
{
}

// ---------------------------------------------------------------------------
// In-module tests
// ---------------------------------------------------------------------------
