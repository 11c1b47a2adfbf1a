//! Deterministic in-memory platform for tests.
//!
//! Every query returns the values stored in public fields, and every side
//! effect is recorded so tests can assert on it. [`FakePlatform::failing`]
//! builds a platform whose fallible calls all return `Platform` errors.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use caelum_types::error::{CaelumError, Result};
use chrono::{DateTime, FixedOffset, Offset, TimeZone, Utc};
use parking_lot::Mutex;

use crate::services::*;

/// Recorded side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Slept(Duration),
    Killed(u32),
    Captured {
        path: PathBuf,
        region: Option<Region>,
    },
    Pressed(MediaKey),
    LockedScreen,
    ShutdownScheduled(u32),
    ShutdownCancelled,
}

pub struct FakePlatform {
    pub now: DateTime<Utc>,
    pub offset: FixedOffset,
    pub uptime: u64,
    pub info: SystemInfo,
    pub cpu: f32,
    pub memory: MemoryInfo,
    pub processes: Mutex<Vec<ProcessInfo>>,
    pub clipboard: Mutex<String>,
    pub local_ip: IpAddr,
    /// Hosts that resolve, with their addresses.
    pub hosts: Vec<(String, IpAddr)>,
    /// `(host, port)` pairs that accept connections.
    pub open_ports: Vec<(String, u16)>,
    pub effects: Mutex<Vec<Effect>>,
    fail: bool,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            now: Utc
                .with_ymd_and_hms(2026, 2, 13, 14, 30, 45)
                .single()
                .unwrap_or_default(),
            offset: Utc.fix(),
            uptime: 90_061,
            info: SystemInfo {
                os: "TestOS".into(),
                os_version: "1.0".into(),
                arch: "x86_64".into(),
                hostname: "TestNode".into(),
                username: "tester".into(),
            },
            cpu: 12.5,
            memory: MemoryInfo {
                total_kib: 8 * 1024 * 1024,
                available_kib: 2 * 1024 * 1024,
            },
            processes: Mutex::new(vec![
                ProcessInfo {
                    pid: 1,
                    name: "init".into(),
                    rss_kib: 4_096,
                },
                ProcessInfo {
                    pid: 420,
                    name: "firefox".into(),
                    rss_kib: 512_000,
                },
                ProcessInfo {
                    pid: 421,
                    name: "firefox".into(),
                    rss_kib: 128_000,
                },
                ProcessInfo {
                    pid: 777,
                    name: "bash".into(),
                    rss_kib: 5_000,
                },
            ]),
            clipboard: Mutex::new(String::new()),
            local_ip: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 23)),
            hosts: vec![
                ("example.com".into(), IpAddr::V4(Ipv4Addr::new(93, 184, 216, 34))),
                ("localhost".into(), IpAddr::V4(Ipv4Addr::LOCALHOST)),
            ],
            open_ports: vec![("example.com".into(), 443)],
            effects: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    /// A platform whose fallible calls all fail.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Snapshot of recorded side effects.
    pub fn effects(&self) -> Vec<Effect> {
        self.effects.lock().clone()
    }

    fn check(&self, what: &str) -> Result<()> {
        if self.fail {
            Err(CaelumError::platform(format!("{what} unavailable")))
        } else {
            Ok(())
        }
    }

    fn record(&self, effect: Effect) {
        self.effects.lock().push(effect);
    }

    fn lookup(&self, host: &str) -> Option<IpAddr> {
        self.hosts
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(host))
            .map(|(_, ip)| *ip)
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeService for FakePlatform {
    fn now_utc(&self) -> Result<DateTime<Utc>> {
        self.check("clock")?;
        Ok(self.now)
    }

    fn local_offset(&self) -> Result<FixedOffset> {
        self.check("clock")?;
        Ok(self.offset)
    }

    fn uptime_secs(&self) -> Result<u64> {
        self.check("uptime")?;
        Ok(self.uptime)
    }

    fn sleep(&self, duration: Duration) {
        self.record(Effect::Slept(duration));
    }
}

impl SystemService for FakePlatform {
    fn system_info(&self) -> Result<SystemInfo> {
        self.check("system info")?;
        Ok(self.info.clone())
    }
}

impl ProcessService for FakePlatform {
    fn cpu_usage_percent(&self) -> Result<f32> {
        self.check("cpu")?;
        Ok(self.cpu)
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        self.check("memory")?;
        Ok(self.memory)
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        self.check("process list")?;
        Ok(self.processes.lock().clone())
    }

    fn kill(&self, pid: u32) -> Result<()> {
        self.check("kill")?;
        let mut procs = self.processes.lock();
        let before = procs.len();
        procs.retain(|p| p.pid != pid);
        if procs.len() == before {
            return Err(CaelumError::platform(format!("no such process: {pid}")));
        }
        drop(procs);
        self.record(Effect::Killed(pid));
        Ok(())
    }
}

impl ClipboardService for FakePlatform {
    fn clipboard_text(&self) -> Result<String> {
        self.check("clipboard")?;
        Ok(self.clipboard.lock().clone())
    }

    fn set_clipboard_text(&self, text: &str) -> Result<()> {
        self.check("clipboard")?;
        *self.clipboard.lock() = text.to_string();
        Ok(())
    }
}

impl ScreenService for FakePlatform {
    fn capture(&self, path: &Path, region: Option<Region>) -> Result<()> {
        self.check("screen capture")?;
        self.record(Effect::Captured {
            path: path.to_path_buf(),
            region,
        });
        Ok(())
    }
}

impl MediaService for FakePlatform {
    fn press(&self, key: MediaKey) -> Result<()> {
        self.check("media keys")?;
        self.record(Effect::Pressed(key));
        Ok(())
    }
}

impl NetworkService for FakePlatform {
    fn local_ip(&self) -> Result<IpAddr> {
        self.check("network")?;
        Ok(self.local_ip)
    }

    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        self.check("dns")?;
        self.lookup(host)
            .map(|ip| vec![ip])
            .ok_or_else(|| CaelumError::platform(format!("cannot resolve {host}")))
    }

    fn ping(&self, host: &str) -> Result<String> {
        self.check("ping")?;
        match self.lookup(host) {
            Some(ip) => Ok(format!("64 bytes from {ip}: icmp_seq=1 time=1.0 ms")),
            None => Err(CaelumError::platform(format!("ping: unknown host {host}"))),
        }
    }

    fn port_open(&self, host: &str, port: u16, _timeout: Duration) -> Result<bool> {
        self.check("network")?;
        Ok(self
            .open_ports
            .iter()
            .any(|(h, p)| h.eq_ignore_ascii_case(host) && *p == port))
    }
}

impl SessionService for FakePlatform {
    fn lock_screen(&self) -> Result<()> {
        self.check("screen lock")?;
        self.record(Effect::LockedScreen);
        Ok(())
    }

    fn schedule_shutdown(&self, minutes: u32) -> Result<()> {
        self.check("shutdown")?;
        self.record(Effect::ShutdownScheduled(minutes));
        Ok(())
    }

    fn cancel_shutdown(&self) -> Result<()> {
        self.check("shutdown")?;
        self.record(Effect::ShutdownCancelled);
        Ok(())
    }
}

impl Platform for FakePlatform {}
