//! Miscellaneous commands: greeting, clock, echo, version.

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::Result;

pub struct MiscCommands;

impl Plugin for MiscCommands {
    fn name(&self) -> &str {
        "misc_commands"
    }

    fn description(&self) -> &str {
        "Greeting, clock and version commands"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("say hello", "Print a greeting", say_hello)?;
        reg.command("get current time", "Local time (HH:MM:SS)", current_time)?;
        reg.command("get current date", "Local date (YYYY-MM-DD)", current_date)?;
        reg.command("get unix timestamp", "Seconds since the Unix epoch", unix_timestamp)?;
        reg.command("echo {text}", "Repeat the given text", echo)?;
        reg.command("get caelum version", "Version of this toolkit", version)?;
        Ok(())
    }
}

fn say_hello(_inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::text("Hello from Caelum-Sys!"))
}

fn current_time(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let now = inv.platform.now_utc()?.with_timezone(&inv.platform.local_offset()?);
    Ok(CommandOutput::text(format!(
        "Current time: {}",
        now.format("%H:%M:%S")
    )))
}

fn current_date(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let now = inv.platform.now_utc()?.with_timezone(&inv.platform.local_offset()?);
    Ok(CommandOutput::text(format!(
        "Today is {}",
        now.format("%Y-%m-%d (%A)")
    )))
}

fn unix_timestamp(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::text(inv.platform.now_utc()?.timestamp().to_string()))
}

fn echo(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::text(inv.args.require("text")?))
}

fn version(_inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::text(format!(
        "caelum-sys {}",
        env!("CARGO_PKG_VERSION")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use caelum_platform::fake::FakePlatform;
    use caelum_types::config::CaelumConfig;
    use caelum_types::error::ErrorKind;
    use chrono::FixedOffset;

    #[test]
    fn hello_mentions_caelum() {
        let text = Harness::new(MiscCommands).text("say hello");
        assert!(text.contains("Hello"));
        assert!(text.contains("Caelum"));
    }

    #[test]
    fn time_and_date_use_local_offset() {
        let mut fake = FakePlatform::new();
        fake.offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let h = Harness::with(MiscCommands, fake, CaelumConfig::default());
        assert_eq!(h.text("get current time"), "Current time: 16:30:45");
        assert_eq!(h.text("get current date"), "Today is 2026-02-13 (Friday)");
    }

    #[test]
    fn unix_timestamp_from_clock() {
        assert_eq!(
            Harness::new(MiscCommands).text("get unix timestamp"),
            "1770993045"
        );
    }

    #[test]
    fn echo_preserves_case() {
        assert_eq!(Harness::new(MiscCommands).text("echo Hello World"), "Hello World");
    }

    #[test]
    fn version_matches_package() {
        let text = Harness::new(MiscCommands).text("get caelum version");
        assert!(text.ends_with(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn clock_failure_is_handler_error() {
        let h = Harness::with(MiscCommands, FakePlatform::failing(), CaelumConfig::default());
        let err = h.run("get current time").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerError);
    }
}
