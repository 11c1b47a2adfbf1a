//! `caelum-sys` command-line entry point.
//!
//! Joins its positional words into one phrase, dispatches it, and prints the
//! output. Exit status follows [`ErrorKind::exit_code`]; usage errors exit 2.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use caelum_core::Dispatcher;
use caelum_sys::{CaelumConfig, CaelumError, ErrorKind};
use clap::Parser;
use serde_json::json;

/// Exit status for a command line that names no command.
const USAGE_EXIT: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "caelum-sys", version, about = "Run system actions from plain English")]
struct Cli {
    /// The command phrase, e.g. `get current time`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    text: Vec<String>,

    /// List every registered phrase, grouped by plugin.
    #[arg(long)]
    list: bool,

    /// Emit machine-readable JSON.
    #[arg(long)]
    json: bool,

    /// Config file (default: $CAELUM_CONFIG, then the per-user config dir).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Permit commands marked unsafe for this invocation.
    #[arg(long)]
    allow_unsafe: bool,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut config = match CaelumConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => return Ok(report_error(&cli, &e, &[])),
    };
    if cli.allow_unsafe {
        config.allow_unsafe = true;
    }

    let report = caelum_sys::init(config);
    log::debug!(
        "loaded {} plugin(s), skipped {:?}",
        report.loaded.len(),
        report.skipped
    );
    let dispatcher = caelum_sys::snapshot().context("no dispatcher installed after init")?;

    if cli.list {
        print_list(&dispatcher, cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let text = cli.text.join(" ");
    if text.trim().is_empty() {
        eprintln!("error: no command given");
        eprintln!("usage: caelum-sys [OPTIONS] <TEXT>...   (try `caelum-sys --list`)");
        return Ok(ExitCode::from(USAGE_EXIT));
    }

    match dispatcher.dispatch(&text) {
        Ok(done) => {
            if cli.json {
                println!("{}", json!({ "ok": true, "data": done }));
            } else {
                let rendered = done.output.render();
                if !rendered.is_empty() {
                    println!("{rendered}");
                }
            }
            Ok(ExitCode::SUCCESS)
        },
        Err(e) => {
            let suggestions = if e.kind() == ErrorKind::NotFound {
                dispatcher.suggestions(&text)
            } else {
                Vec::new()
            };
            Ok(report_error(&cli, &e, &suggestions))
        },
    }
}

/// Print `err` in the requested format and return its exit status.
fn report_error(cli: &Cli, err: &CaelumError, suggestions: &[&str]) -> ExitCode {
    let kind = err.kind();
    if cli.json {
        let mut error = json!({ "kind": kind, "message": err.to_string() });
        if !suggestions.is_empty() {
            error["suggestions"] = json!(suggestions);
        }
        println!("{}", json!({ "ok": false, "error": error }));
    } else {
        eprintln!("error: {err}");
        if !suggestions.is_empty() {
            eprintln!("did you mean:");
            for s in suggestions {
                eprintln!("  {s}");
            }
        }
    }
    ExitCode::from(kind.exit_code())
}

fn print_list(dispatcher: &Dispatcher, json: bool) -> Result<()> {
    let by_plugin = dispatcher.registry().by_plugin();
    if json {
        let plugins: serde_json::Map<String, serde_json::Value> = by_plugin
            .iter()
            .map(|(plugin, entries)| {
                let commands: Vec<_> = entries
                    .iter()
                    .map(|e| {
                        json!({
                            "phrase": e.phrase(),
                            "description": e.description(),
                            "safe": e.is_safe(),
                        })
                    })
                    .collect();
                (plugin.to_string(), json!(commands))
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "ok": true, "data": plugins }))
                .context("serializing command list")?
        );
        return Ok(());
    }

    for (plugin, entries) in by_plugin {
        println!("{plugin}:");
        let width = entries.iter().map(|e| e.phrase().len()).max().unwrap_or(0);
        for entry in entries {
            let flag = if entry.is_safe() { "" } else { " [unsafe]" };
            println!(
                "  {:<width$}  {}{flag}",
                entry.phrase(),
                entry.description()
            );
        }
    }
    Ok(())
}
