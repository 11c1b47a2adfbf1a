//! Network queries: local address, DNS, ping, port checks.

use std::time::Duration;

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::{CaelumError, Result};

pub struct NetworkTools;

impl Plugin for NetworkTools {
    fn name(&self) -> &str {
        "network_tools"
    }

    fn description(&self) -> &str {
        "Addresses, DNS, ping and connectivity checks"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("get my ip address", "Local address used for outbound traffic", my_ip)?;
        reg.command("resolve {host}", "DNS lookup", resolve)?;
        reg.command("ping {host}", "Send one echo request", ping)?;
        reg.command("check port {port} on {host}", "Test a TCP connection", check_port)?;
        reg.command("is internet available", "Check well-known DNS resolvers", internet)?;
        Ok(())
    }
}

const CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Endpoints tried by `is internet available`, in order.
const RESOLVERS: &[(&str, u16)] = &[("1.1.1.1", 53), ("8.8.8.8", 53)];

/// A host argument safe to hand to resolvers and external tools.
fn host_arg<'a>(inv: &'a Invocation<'_>) -> Result<&'a str> {
    let host = inv.args.require("host")?;
    if host.starts_with('-') || host.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(CaelumError::invalid(format!("'{host}' is not a host name or address")));
    }
    Ok(host)
}

fn my_ip(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::text(format!(
        "Local IP address: {}",
        inv.platform.local_ip()?
    )))
}

fn resolve(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let host = host_arg(inv)?;
    let addrs: Vec<String> = inv
        .platform
        .resolve(host)?
        .iter()
        .map(ToString::to_string)
        .collect();
    Ok(CommandOutput::text(format!(
        "{host} resolves to {}",
        addrs.join(", ")
    )))
}

fn ping(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let host = host_arg(inv)?;
    Ok(CommandOutput::Text(inv.platform.ping(host)?))
}

fn check_port(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let port: u16 = inv.args.parse("port")?;
    let host = host_arg(inv)?;
    let state = if inv.platform.port_open(host, port, CHECK_TIMEOUT)? {
        "open"
    } else {
        "closed"
    };
    Ok(CommandOutput::text(format!("Port {port} on {host} is {state}")))
}

fn internet(inv: &Invocation<'_>) -> Result<CommandOutput> {
    for (host, port) in RESOLVERS {
        if inv.platform.port_open(host, *port, CHECK_TIMEOUT)? {
            return Ok(CommandOutput::text(format!(
                "Internet is available (reached {host})"
            )));
        }
    }
    Ok(CommandOutput::text("No internet connection detected"))
}
