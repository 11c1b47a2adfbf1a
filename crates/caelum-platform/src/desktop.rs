//! Desktop implementation backed by `std`, `/proc`, and well-known CLI tools.
//!
//! GUI automation (clipboard, screenshots, media keys, screen lock) is
//! delegated to whichever helper binary is installed; `which` locates it.
//! When none is found the call fails with a `Platform` error naming the
//! tools that were tried.

use std::io::Write;
use std::net::{IpAddr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use caelum_types::error::{CaelumError, Result};
use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::services::*;

/// Window over which CPU utilisation is sampled.
const CPU_SAMPLE: Duration = Duration::from_millis(200);

/// Default platform implementation for desktop machines.
pub struct DesktopPlatform {
    start_time: Instant,
}

impl DesktopPlatform {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }
}

impl Default for DesktopPlatform {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Helper tool plumbing
// ---------------------------------------------------------------------------

/// First installed tool from `candidates`.
fn find_tool(purpose: &str, candidates: &[&'static str]) -> Result<(&'static str, PathBuf)> {
    candidates
        .iter()
        .find_map(|name| which::which(name).ok().map(|path| (*name, path)))
        .ok_or_else(|| {
            CaelumError::platform(format!(
                "no {purpose} tool found (tried {})",
                candidates.join(", ")
            ))
        })
}

/// Run a tool to completion and return its stdout.
fn run_tool(path: &Path, args: &[&str]) -> Result<String> {
    log::debug!("running {} {}", path.display(), args.join(" "));
    let output = Command::new(path).args(args).stderr(Stdio::piped()).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CaelumError::platform(format!(
            "{} exited with {}: {}",
            path.display(),
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a tool, feeding `input` on stdin.
fn run_tool_with_stdin(path: &Path, args: &[&str], input: &str) -> Result<()> {
    let mut child = Command::new(path)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;
    // Close stdin before waiting; reap the child even if the write failed.
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(input.as_bytes()),
        None => Ok(()),
    };
    let output = child.wait_with_output()?;
    written?;
    if !output.status.success() {
        return Err(CaelumError::platform(format!(
            "{} exited with {}",
            path.display(),
            output.status
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// /proc parsing
// ---------------------------------------------------------------------------

/// Extract `MemTotal` and `MemAvailable` from `/proc/meminfo` text.
pub(crate) fn parse_meminfo(text: &str) -> Option<MemoryInfo> {
    let mut total = None;
    let mut available = None;
    for line in text.lines() {
        let mut parts = line.split_whitespace();
        let key = parts.next();
        let value = parts.next().and_then(|v| v.parse::<u64>().ok());
        match key {
            Some("MemTotal:") => total = value,
            Some("MemAvailable:") => available = value,
            _ => {},
        }
    }
    Some(MemoryInfo {
        total_kib: total?,
        available_kib: available?,
    })
}

/// `(busy, total)` jiffies from the aggregate `cpu` line of `/proc/stat`.
pub(crate) fn parse_cpu_times(text: &str) -> Option<(u64, u64)> {
    let line = text.lines().find(|l| l.starts_with("cpu "))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .filter_map(|f| f.parse().ok())
        .collect();
    if fields.len() < 4 {
        return None;
    }
    let total: u64 = fields.iter().sum();
    // idle + iowait
    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    Some((total - idle, total))
}

/// `VmRSS` in KiB from `/proc/<pid>/status` text.
pub(crate) fn parse_status_rss(text: &str) -> u64 {
    text.lines()
        .find_map(|l| l.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

/// Pick the line of `ping` output worth showing to a user.
pub(crate) fn ping_summary(output: &str) -> String {
    output
        .lines()
        .rev()
        .find(|l| l.contains("rtt") || l.contains("round-trip") || l.contains("Average"))
        .or_else(|| output.lines().find(|l| l.contains("time=")))
        .unwrap_or("reply received")
        .trim()
        .to_string()
}

fn read_proc(path: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| CaelumError::platform(format!("cannot read {path}: {e}")))
}

// ---------------------------------------------------------------------------
// Service implementations
// ---------------------------------------------------------------------------

impl TimeService for DesktopPlatform {
    fn now_utc(&self) -> Result<DateTime<Utc>> {
        Ok(Utc::now())
    }

    fn local_offset(&self) -> Result<FixedOffset> {
        Ok(chrono::Local::now().offset().fix())
    }

    fn uptime_secs(&self) -> Result<u64> {
        // Prefer system uptime; fall back to process uptime off Linux.
        if let Ok(text) = std::fs::read_to_string("/proc/uptime")
            && let Some(secs) = text
                .split_whitespace()
                .next()
                .and_then(|s| s.parse::<f64>().ok())
        {
            return Ok(secs as u64);
        }
        Ok(self.start_time.elapsed().as_secs())
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl SystemService for DesktopPlatform {
    fn system_info(&self) -> Result<SystemInfo> {
        let info = os_info::get();
        let hostname = hostname::get()?.to_string_lossy().into_owned();
        let username = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        Ok(SystemInfo {
            os: info.os_type().to_string(),
            os_version: info.version().to_string(),
            arch: std::env::consts::ARCH.to_string(),
            hostname,
            username,
        })
    }
}

impl ProcessService for DesktopPlatform {
    fn cpu_usage_percent(&self) -> Result<f32> {
        let parse = |text: String| {
            parse_cpu_times(&text)
                .ok_or_else(|| CaelumError::platform("unrecognised /proc/stat format"))
        };
        let (busy_a, total_a) = parse(read_proc("/proc/stat")?)?;
        std::thread::sleep(CPU_SAMPLE);
        let (busy_b, total_b) = parse(read_proc("/proc/stat")?)?;
        let total = total_b.saturating_sub(total_a);
        if total == 0 {
            return Ok(0.0);
        }
        Ok(busy_b.saturating_sub(busy_a) as f32 * 100.0 / total as f32)
    }

    fn memory_info(&self) -> Result<MemoryInfo> {
        parse_meminfo(&read_proc("/proc/meminfo")?)
            .ok_or_else(|| CaelumError::platform("unrecognised /proc/meminfo format"))
    }

    fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let entries = std::fs::read_dir("/proc")
            .map_err(|e| CaelumError::platform(format!("process listing unavailable: {e}")))?;
        let mut procs = Vec::new();
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };
            // Processes can exit between readdir and read; skip them.
            let Ok(comm) = std::fs::read_to_string(entry.path().join("comm")) else {
                continue;
            };
            let rss_kib = std::fs::read_to_string(entry.path().join("status"))
                .map(|s| parse_status_rss(&s))
                .unwrap_or(0);
            procs.push(ProcessInfo {
                pid,
                name: comm.trim().to_string(),
                rss_kib,
            });
        }
        procs.sort_by_key(|p| p.pid);
        Ok(procs)
    }

    fn kill(&self, pid: u32) -> Result<()> {
        let pid = pid.to_string();
        if cfg!(windows) {
            let (_, tool) = find_tool("process termination", &["taskkill"])?;
            run_tool(&tool, &["/PID", &pid, "/F"])?;
        } else {
            let (_, tool) = find_tool("process termination", &["kill"])?;
            run_tool(&tool, &["-TERM", &pid])?;
        }
        Ok(())
    }
}

impl ClipboardService for DesktopPlatform {
    fn clipboard_text(&self) -> Result<String> {
        let (name, tool) = find_tool("clipboard", &["wl-paste", "xclip", "xsel", "pbpaste"])?;
        let args: &[&str] = match name {
            "wl-paste" => &["--no-newline"],
            "xclip" => &["-selection", "clipboard", "-o"],
            "xsel" => &["--clipboard", "--output"],
            _ => &[],
        };
        run_tool(&tool, args)
    }

    fn set_clipboard_text(&self, text: &str) -> Result<()> {
        let (name, tool) = find_tool("clipboard", &["wl-copy", "xclip", "xsel", "pbcopy"])?;
        let args: &[&str] = match name {
            "xclip" => &["-selection", "clipboard"],
            "xsel" => &["--clipboard", "--input"],
            _ => &[],
        };
        run_tool_with_stdin(&tool, args, text)
    }
}

impl ScreenService for DesktopPlatform {
    fn capture(&self, path: &Path, region: Option<Region>) -> Result<()> {
        let (name, tool) = find_tool("screenshot", &["grim", "scrot", "screencapture"])?;
        let target = path.to_string_lossy().into_owned();
        let geometry = region.map(|r| match name {
            "grim" => format!("{},{} {}x{}", r.x, r.y, r.width, r.height),
            _ => format!("{},{},{},{}", r.x, r.y, r.width, r.height),
        });
        let mut args: Vec<&str> = Vec::new();
        match (name, geometry.as_deref()) {
            ("grim", Some(g)) => args.extend(["-g", g]),
            ("scrot", Some(g)) => args.extend(["-a", g]),
            ("screencapture", Some(g)) => args.extend(["-x", "-R", g]),
            ("screencapture", None) => args.push("-x"),
            _ => {},
        }
        if name == "scrot" {
            args.push("-o");
        }
        args.push(&target);
        run_tool(&tool, &args)?;
        Ok(())
    }
}

impl MediaService for DesktopPlatform {
    fn press(&self, key: MediaKey) -> Result<()> {
        match key {
            MediaKey::PlayPause | MediaKey::Next | MediaKey::Previous => {
                let (_, tool) = find_tool("media", &["playerctl"])?;
                let verb = match key {
                    MediaKey::PlayPause => "play-pause",
                    MediaKey::Next => "next",
                    _ => "previous",
                };
                run_tool(&tool, &[verb])?;
            },
            MediaKey::Mute | MediaKey::VolumeUp | MediaKey::VolumeDown => {
                let (_, tool) = find_tool("volume", &["pactl"])?;
                let args: &[&str] = match key {
                    MediaKey::Mute => &["set-sink-mute", "@DEFAULT_SINK@", "toggle"],
                    MediaKey::VolumeUp => &["set-sink-volume", "@DEFAULT_SINK@", "+5%"],
                    _ => &["set-sink-volume", "@DEFAULT_SINK@", "-5%"],
                };
                run_tool(&tool, args)?;
            },
        }
        Ok(())
    }
}

impl NetworkService for DesktopPlatform {
    fn local_ip(&self) -> Result<IpAddr> {
        // Connecting a UDP socket selects a route without sending packets.
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect("8.8.8.8:80")?;
        Ok(socket.local_addr()?.ip())
    }

    fn resolve(&self, host: &str) -> Result<Vec<IpAddr>> {
        let addrs = (host, 0)
            .to_socket_addrs()
            .map_err(|e| CaelumError::platform(format!("cannot resolve {host}: {e}")))?;
        let mut ips: Vec<IpAddr> = addrs.map(|a| a.ip()).collect();
        ips.dedup();
        Ok(ips)
    }

    fn ping(&self, host: &str) -> Result<String> {
        if host.starts_with('-') {
            return Err(CaelumError::platform(format!("refusing option-like host '{host}'")));
        }
        let (_, tool) = find_tool("ping", &["ping"])?;
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };
        let output = run_tool(&tool, &[count_flag, "1", host])?;
        Ok(ping_summary(&output))
    }

    fn port_open(&self, host: &str, port: u16, timeout: Duration) -> Result<bool> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| CaelumError::platform(format!("cannot resolve {host}: {e}")))?
            .collect();
        Ok(addrs
            .iter()
            .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok()))
    }
}

impl SessionService for DesktopPlatform {
    fn lock_screen(&self) -> Result<()> {
        let (name, tool) = find_tool("screen lock", &["loginctl", "xdg-screensaver", "pmset"])?;
        let args: &[&str] = match name {
            "loginctl" => &["lock-session"],
            "xdg-screensaver" => &["lock"],
            _ => &["displaysleepnow"],
        };
        run_tool(&tool, args)?;
        Ok(())
    }

    fn schedule_shutdown(&self, minutes: u32) -> Result<()> {
        let (_, tool) = find_tool("shutdown", &["shutdown"])?;
        if cfg!(windows) {
            let secs = (u64::from(minutes) * 60).to_string();
            run_tool(&tool, &["/s", "/t", &secs])?;
        } else {
            let when = format!("+{minutes}");
            run_tool(&tool, &["-h", &when])?;
        }
        Ok(())
    }

    fn cancel_shutdown(&self) -> Result<()> {
        let (_, tool) = find_tool("shutdown", &["shutdown"])?;
        let flag = if cfg!(windows) { "/a" } else { "-c" };
        run_tool(&tool, &[flag])?;
        Ok(())
    }
}

impl Platform for DesktopPlatform {}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       16318000 kB\n\
                           MemFree:          512000 kB\n\
                           MemAvailable:    8159000 kB\n\
                           Buffers:          100000 kB\n";

    #[test]
    fn meminfo_parses_total_and_available() {
        let mem = parse_meminfo(MEMINFO).unwrap();
        assert_eq!(mem.total_kib, 16_318_000);
        assert_eq!(mem.available_kib, 8_159_000);
    }

    #[test]
    fn meminfo_missing_available_is_none() {
        assert!(parse_meminfo("MemTotal: 100 kB\n").is_none());
    }

    #[test]
    fn cpu_times_sum_busy_and_total() {
        let stat = "cpu  100 0 50 800 50 0 0 0 0 0\ncpu0 50 0 25 400 25 0 0 0 0 0\n";
        let (busy, total) = parse_cpu_times(stat).unwrap();
        assert_eq!(total, 1000);
        assert_eq!(busy, 150);
    }

    #[test]
    fn cpu_times_rejects_garbage() {
        assert!(parse_cpu_times("intr 1 2 3\n").is_none());
        assert!(parse_cpu_times("cpu  1 2\n").is_none());
    }

    #[test]
    fn status_rss_extracted() {
        let status = "Name:\tbash\nVmPeak:\t  9000 kB\nVmRSS:\t  4321 kB\n";
        assert_eq!(parse_status_rss(status), 4321);
        assert_eq!(parse_status_rss("Name:\tkthreadd\n"), 0);
    }

    #[test]
    fn ping_summary_prefers_rtt_line() {
        let out = "PING example.com (93.184.216.34) 56(84) bytes of data.\n\
                   64 bytes from 93.184.216.34: icmp_seq=1 ttl=56 time=11.2 ms\n\
                   \n\
                   rtt min/avg/max/mdev = 11.2/11.2/11.2/0.000 ms\n";
        assert!(ping_summary(out).starts_with("rtt min/avg/max"));
    }

    #[test]
    fn ping_summary_falls_back_to_reply_line() {
        let out = "64 bytes from 1.1.1.1: icmp_seq=1 ttl=56 time=3.1 ms\n";
        assert!(ping_summary(out).contains("time=3.1"));
        assert_eq!(ping_summary(""), "reply received");
    }

    #[test]
    fn ping_refuses_option_like_host() {
        let err = DesktopPlatform::new().ping("-f").unwrap_err();
        assert!(format!("{err}").contains("option-like"));
    }

    #[test]
    #[cfg(unix)]
    fn stdin_tool_is_reaped_when_it_exits_early() {
        // `true` exits without reading; a large write hits a closed pipe.
        let Ok(tool) = which::which("true") else {
            return;
        };
        let input = "x".repeat(1 << 20);
        if let Err(e) = run_tool_with_stdin(&tool, &[], &input) {
            assert!(matches!(e, CaelumError::Io(_)), "{e}");
        }
    }

    #[test]
    fn missing_tool_is_platform_error() {
        let err = find_tool("test", &["definitely-not-a-real-tool-xyz"]).unwrap_err();
        assert!(format!("{err}").contains("definitely-not-a-real-tool-xyz"));
    }

    #[test]
    fn desktop_time_is_sane() {
        let platform = DesktopPlatform::new();
        let now = platform.now_utc().unwrap();
        assert!(now.timestamp() > 1_600_000_000);
        let offset = platform.local_offset().unwrap();
        assert!(offset.local_minus_utc().abs() <= 14 * 3600);
    }

    #[test]
    fn desktop_system_info_has_arch() {
        let info = DesktopPlatform::default().system_info().unwrap();
        assert_eq!(info.arch, std::env::consts::ARCH);
        assert!(!info.os.is_empty());
    }
}
