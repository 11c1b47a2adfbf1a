//! Process and resource inspection.

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_platform::ProcessInfo;
use caelum_types::error::{CaelumError, Result};

pub struct ProcessTools;

impl Plugin for ProcessTools {
    fn name(&self) -> &str {
        "process_tools"
    }

    fn description(&self) -> &str {
        "CPU, memory and process inspection"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("get cpu usage", "Overall CPU utilization", cpu_usage)?;
        reg.command("get memory usage", "Used and total memory", memory_usage)?;
        reg.command("list processes", "Running processes by memory use", list_processes)?;
        reg.command("get process count", "Number of running processes", process_count)?;
        reg.command("find process {name}", "Processes whose name contains {name}", find_process)?;
        reg.unsafe_command(
            "kill process by name {name}",
            "Terminate every process named {name}",
            kill_by_name,
        )?;
        Ok(())
    }
}

/// Rows shown by `list processes`.
const LIST_LIMIT: usize = 25;

fn cpu_usage(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let pct = inv.platform.cpu_usage_percent()?;
    Ok(CommandOutput::text(format!("CPU usage: {pct:.1}%")))
}

fn memory_usage(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let mem = inv.platform.memory_info()?;
    Ok(CommandOutput::text(format!(
        "Memory usage: {:.1}% ({} / {} MiB)",
        mem.used_percent(),
        mem.used_kib() / 1024,
        mem.total_kib / 1024
    )))
}

fn process_table(procs: &[ProcessInfo]) -> CommandOutput {
    CommandOutput::Table {
        headers: vec!["PID".into(), "NAME".into(), "RSS (MiB)".into()],
        rows: procs
            .iter()
            .map(|p| {
                vec![
                    p.pid.to_string(),
                    p.name.clone(),
                    format!("{:.1}", p.rss_kib as f64 / 1024.0),
                ]
            })
            .collect(),
    }
}

fn list_processes(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let mut procs = inv.platform.processes()?;
    procs.sort_by(|a, b| b.rss_kib.cmp(&a.rss_kib).then(a.pid.cmp(&b.pid)));
    procs.truncate(LIST_LIMIT);
    Ok(process_table(&procs))
}

fn process_count(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let count = inv.platform.processes()?.len();
    Ok(CommandOutput::text(format!("{count} processes running")))
}

fn find_process(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let needle = inv.args.require("name")?.to_lowercase();
    let procs: Vec<ProcessInfo> = inv
        .platform
        .processes()?
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect();
    if procs.is_empty() {
        return Ok(CommandOutput::text(format!("No process matching '{needle}'")));
    }
    Ok(process_table(&procs))
}

fn kill_by_name(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let name = inv.args.require("name")?;
    let targets: Vec<u32> = inv
        .platform
        .processes()?
        .into_iter()
        .filter(|p| p.name.eq_ignore_ascii_case(name))
        .map(|p| p.pid)
        .collect();
    if targets.is_empty() {
        return Err(CaelumError::Handler(format!("no process named '{name}'")));
    }
    for pid in &targets {
        inv.platform.kill(*pid)?;
        log::info!("killed {name} (pid {pid})");
    }
    Ok(CommandOutput::text(format!(
        "Terminated {} process(es) named '{name}'",
        targets.len()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use caelum_platform::fake::Effect;
    use caelum_types::error::ErrorKind;

    #[test]
    fn cpu_and_memory() {
        let h = Harness::new(ProcessTools);
        assert_eq!(h.text("get cpu usage"), "CPU usage: 12.5%");
        assert_eq!(h.text("get memory usage"), "Memory usage: 75.0% (6144 / 8192 MiB)");
    }

    #[test]
    fn list_sorted_by_memory() {
        let text = Harness::new(ProcessTools).text("list processes");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("PID"));
        assert!(lines[1].starts_with("420"));
        assert!(lines[4].starts_with("1 "));
    }

    #[test]
    fn count_and_find() {
        let h = Harness::new(ProcessTools);
        assert_eq!(h.text("get process count"), "4 processes running");
        let found = h.text("find process FIRE");
        assert!(found.contains("420"));
        assert!(found.contains("421"));
        assert!(!found.contains("bash"));
        assert!(h.text("find process nothing").starts_with("No process"));
    }

    #[test]
    fn kill_terminates_all_matches() {
        let h = Harness::new(ProcessTools);
        assert_eq!(
            h.text("kill process by name firefox"),
            "Terminated 2 process(es) named 'firefox'"
        );
        assert_eq!(h.fake.effects(), vec![Effect::Killed(420), Effect::Killed(421)]);
    }

    #[test]
    fn kill_unknown_name_fails() {
        let err = Harness::new(ProcessTools)
            .run("kill process by name ghost")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerError);
    }
}
