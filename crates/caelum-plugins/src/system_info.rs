//! Host identification: OS, hostname, user, architecture, uptime.

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_platform::format_uptime;
use caelum_types::error::Result;

pub struct SystemInfoPlugin;

impl Plugin for SystemInfoPlugin {
    fn name(&self) -> &str {
        "system_info"
    }

    fn description(&self) -> &str {
        "Facts about the host system"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("get system info", "OS, version, host, user and architecture", system_info)?;
        reg.command("get hostname", "Network name of this machine", hostname)?;
        reg.command("get os version", "Operating system and release", os_version)?;
        reg.command("get uptime", "Time since boot", uptime)?;
        reg.command("get username", "Current user", username)?;
        reg.command("get architecture", "CPU architecture", architecture)?;
        Ok(())
    }
}

fn system_info(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let info = inv.platform.system_info()?;
    Ok(CommandOutput::Table {
        headers: vec!["FIELD".into(), "VALUE".into()],
        rows: vec![
            vec!["System".into(), info.os],
            vec!["Release".into(), info.os_version],
            vec!["Node".into(), info.hostname],
            vec!["User".into(), info.username],
            vec!["Machine".into(), info.arch],
        ],
    })
}

fn hostname(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(inv.platform.system_info()?.hostname))
}

fn os_version(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let info = inv.platform.system_info()?;
    Ok(CommandOutput::text(format!("{} {}", info.os, info.os_version)))
}

fn uptime(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::text(format_uptime(inv.platform.uptime_secs()?)))
}

fn username(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(inv.platform.system_info()?.username))
}

fn architecture(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(inv.platform.system_info()?.arch))
}
