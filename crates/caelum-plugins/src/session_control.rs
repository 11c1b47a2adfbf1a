//! Screen lock and scheduled shutdown. Every command here is unsafe.

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::{CaelumError, Result};

pub struct SessionControl;

impl Plugin for SessionControl {
    fn name(&self) -> &str {
        "session_control"
    }

    fn description(&self) -> &str {
        "Lock the screen and schedule shutdowns"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.unsafe_command("lock screen", "Lock the current session", lock_screen)?;
        reg.unsafe_command(
            "shut down in {minutes} minutes",
            "Schedule a system shutdown",
            shutdown,
        )?;
        reg.unsafe_command("cancel shutdown", "Cancel a scheduled shutdown", cancel)?;
        Ok(())
    }
}

/// One day.
const MAX_SHUTDOWN_MINUTES: u32 = 24 * 60;

fn lock_screen(inv: &Invocation<'_>) -> Result<CommandOutput> {
    inv.platform.lock_screen()?;
    Ok(CommandOutput::text("Screen locked"))
}

fn shutdown(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let minutes: u32 = inv.args.parse("minutes")?;
    if minutes > MAX_SHUTDOWN_MINUTES {
        return Err(CaelumError::invalid(format!(
            "shutdown delay must be at most {MAX_SHUTDOWN_MINUTES} minutes"
        )));
    }
    inv.platform.schedule_shutdown(minutes)?;
    log::warn!("system shutdown scheduled in {minutes} minute(s)");
    Ok(CommandOutput::text(format!(
        "Shutdown scheduled in {minutes} minute(s)"
    )))
}

fn cancel(inv: &Invocation<'_>) -> Result<CommandOutput> {
    inv.platform.cancel_shutdown()?;
    Ok(CommandOutput::text("Scheduled shutdown cancelled"))
}
