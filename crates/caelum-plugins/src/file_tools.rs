//! File operations on the host filesystem.
//!
//! Relative paths resolve against the process working directory. Deleting
//! and copying are unsafe commands.

use std::fs::{self, File};
use std::io::{ErrorKind as IoKind, Read};
use std::path::Path;

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::{CaelumError, Result};

pub struct FileTools;

impl Plugin for FileTools {
    fn name(&self) -> &str {
        "file_tools"
    }

    fn description(&self) -> &str {
        "Create, inspect, list, copy and delete files"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("create file {path}", "Create an empty file", create_file)?;
        reg.command("read file {path}", "Print a text file", read_file)?;
        reg.command("file exists {path}", "Check whether a path exists", file_exists)?;
        reg.command("get file size {path}", "Size of a file", file_size)?;
        reg.command("list files in {dir}", "Directory listing", list_files)?;
        reg.unsafe_command("delete file {path}", "Remove a file", delete_file)?;
        reg.unsafe_command(
            "copy {source} to {destination}",
            "Copy a file, replacing the destination",
            copy_file,
        )?;
        Ok(())
    }
}

/// Bytes shown by `read file` before truncating.
const MAX_READ_BYTES: usize = 64 * 1024;

/// `1536` -> `1.5 KiB`.
fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for u in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = u;
    }
    format!("{value:.1} {unit}")
}

fn create_file(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let path = inv.args.require("path")?;
    match fs::OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(_) => Ok(CommandOutput::text(format!("Created file: {path}"))),
        Err(e) if e.kind() == IoKind::AlreadyExists => {
            Err(CaelumError::Handler(format!("{path} already exists")))
        },
        Err(e) => Err(e.into()),
    }
}

fn read_file(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let path = inv.args.require("path")?;
    let mut bytes = Vec::new();
    File::open(path)?
        .take(MAX_READ_BYTES as u64 + 1)
        .read_to_end(&mut bytes)?;
    let truncated = bytes.len() > MAX_READ_BYTES;
    bytes.truncate(MAX_READ_BYTES);
    let mut text = match String::from_utf8(bytes) {
        Ok(text) => text,
        // The cut may land inside a multi-byte char; drop the partial tail.
        Err(e) if truncated && e.utf8_error().error_len().is_none() => {
            let valid = e.utf8_error().valid_up_to();
            let mut bytes = e.into_bytes();
            bytes.truncate(valid);
            String::from_utf8(bytes).map_err(|e| CaelumError::Handler(e.to_string()))?
        },
        Err(_) => return Err(CaelumError::Handler(format!("{path} is not valid UTF-8 text"))),
    };
    if truncated {
        text.push_str("\n... (truncated)");
    }
    Ok(CommandOutput::Text(text))
}

fn file_exists(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let path = inv.args.require("path")?;
    let p = Path::new(path);
    let text = if p.is_dir() {
        format!("{path} exists (directory)")
    } else if p.exists() {
        format!("{path} exists")
    } else {
        format!("{path} does not exist")
    };
    Ok(CommandOutput::Text(text))
}

fn file_size(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let path = inv.args.require("path")?;
    let meta = fs::metadata(path)?;
    if meta.is_dir() {
        return Err(CaelumError::invalid(format!("{path} is a directory")));
    }
    Ok(CommandOutput::text(format!(
        "{path}: {} ({} bytes)",
        human_size(meta.len()),
        meta.len()
    )))
}

fn list_files(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let dir = inv.args.require("dir")?;
    let mut rows = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        let (kind, size) = if meta.is_dir() {
            ("dir", String::new())
        } else {
            ("file", human_size(meta.len()))
        };
        rows.push(vec![
            entry.file_name().to_string_lossy().into_owned(),
            kind.to_string(),
            size,
        ]);
    }
    if rows.is_empty() {
        return Ok(CommandOutput::text(format!("{dir} is empty")));
    }
    rows.sort();
    Ok(CommandOutput::Table {
        headers: vec!["NAME".into(), "TYPE".into(), "SIZE".into()],
        rows,
    })
}

fn delete_file(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let path = inv.args.require("path")?;
    if Path::new(path).is_dir() {
        return Err(CaelumError::invalid(format!(
            "{path} is a directory; only files can be deleted"
        )));
    }
    fs::remove_file(path)?;
    log::info!("deleted {path}");
    Ok(CommandOutput::text(format!("Deleted {path}")))
}

fn copy_file(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let source = inv.args.require("source")?;
    let destination = inv.args.require("destination")?;
    let bytes = fs::copy(source, destination)?;
    Ok(CommandOutput::text(format!(
        "Copied {source} to {destination} ({})",
        human_size(bytes)
    )))
}
