//! Time zones, conversions, and calendar arithmetic.
//!
//! Zones are fixed offsets: either a common abbreviation from [`ZONES`] or an
//! explicit offset such as `UTC+5`, `GMT-03:30`, or `+0930`. Daylight saving
//! is expressed by picking the matching abbreviation (`PST` vs `PDT`).

use chrono::{FixedOffset, NaiveDate, NaiveTime, Timelike};

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::{CaelumError, Result};

pub struct TimeTools;

impl Plugin for TimeTools {
    fn name(&self) -> &str {
        "time_tools"
    }

    fn description(&self) -> &str {
        "World clock, time conversion and date arithmetic"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("get time in {zone}", "Current time in a zone or offset", time_in)?;
        reg.command("list time zones", "Known zone abbreviations", list_zones)?;
        reg.command(
            "convert {time} from {from} to {to}",
            "Convert HH:MM between zones",
            convert,
        )?;
        reg.command("get day of week", "Local weekday", day_of_week)?;
        reg.command("days until {date}", "Days from today to YYYY-MM-DD", days_until)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Zone parsing
// ---------------------------------------------------------------------------

/// Abbreviation and offset east of UTC, in minutes.
const ZONES: &[(&str, i32)] = &[
    ("UTC", 0),
    ("GMT", 0),
    ("WET", 0),
    ("BST", 60),
    ("CET", 60),
    ("CEST", 120),
    ("EET", 120),
    ("EEST", 180),
    ("MSK", 180),
    ("GST", 240),
    ("PKT", 300),
    ("IST", 330),
    ("ICT", 420),
    ("HKT", 480),
    ("SGT", 480),
    ("AWST", 480),
    ("JST", 540),
    ("KST", 540),
    ("ACST", 570),
    ("AEST", 600),
    ("AEDT", 660),
    ("NZST", 720),
    ("NZDT", 780),
    ("HST", -600),
    ("AKST", -540),
    ("AKDT", -480),
    ("PST", -480),
    ("PDT", -420),
    ("MST", -420),
    ("MDT", -360),
    ("CST", -360),
    ("CDT", -300),
    ("EST", -300),
    ("EDT", -240),
    ("BRT", -180),
    ("ART", -180),
];

/// Largest accepted explicit offset, in minutes.
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

/// Resolve a zone name to a display label and offset.
fn parse_zone(raw: &str) -> Result<(String, FixedOffset)> {
    let upper = raw.trim().to_ascii_uppercase();
    let minutes = match ZONES.iter().find(|(abbr, _)| *abbr == upper) {
        Some((_, minutes)) => *minutes,
        None => {
            let rest = upper
                .strip_prefix("UTC")
                .or_else(|| upper.strip_prefix("GMT"))
                .unwrap_or(&upper);
            parse_offset_minutes(rest)
                .ok_or_else(|| CaelumError::invalid(format!("unknown time zone '{raw}'")))?
        },
    };
    let offset = FixedOffset::east_opt(minutes * 60)
        .ok_or_else(|| CaelumError::invalid(format!("offset out of range: '{raw}'")))?;
    let label = if ZONES.iter().any(|(abbr, _)| *abbr == upper) {
        upper
    } else {
        format!("UTC{offset}")
    };
    Ok((label, offset))
}

/// `+5`, `-03:30`, `+0930` to minutes east of UTC.
fn parse_offset_minutes(s: &str) -> Option<i32> {
    let (sign, digits) = match s.strip_prefix('+') {
        Some(rest) => (1, rest),
        None => (-1, s.strip_prefix('-')?),
    };
    // At most `HH:MM`; ASCII only so the byte slicing below stays on char boundaries.
    if digits.is_empty()
        || digits.len() > 5
        || !digits.bytes().all(|b| b.is_ascii_digit() || b == b':')
    {
        return None;
    }
    let (hours, mins): (i32, i32) = match digits.split_once(':') {
        Some((h, m)) => (h.parse().ok()?, m.parse().ok()?),
        None if digits.len() == 4 => (digits[..2].parse().ok()?, digits[2..].parse().ok()?),
        None => (digits.parse().ok()?, 0),
    };
    let total = hours.checked_mul(60)?.checked_add(mins)?;
    (mins < 60 && total <= MAX_OFFSET_MINUTES).then_some(sign * total)
}

fn parse_clock(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| CaelumError::invalid(format!("'{raw}' is not a HH:MM time")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn time_in(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let (label, offset) = parse_zone(inv.args.require("zone")?)?;
    let now = inv.platform.now_utc()?.with_timezone(&offset);
    Ok(CommandOutput::text(format!(
        "Time in {label}: {} (UTC{offset})",
        now.format("%H:%M:%S")
    )))
}

fn list_zones(_inv: &Invocation<'_>) -> Result<CommandOutput> {
    let rows = ZONES
        .iter()
        .filter_map(|(abbr, minutes)| {
            let offset = FixedOffset::east_opt(minutes * 60)?;
            Some(vec![abbr.to_string(), format!("UTC{offset}")])
        })
        .collect();
    Ok(CommandOutput::Table {
        headers: vec!["ZONE".into(), "OFFSET".into()],
        rows,
    })
}

fn convert(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let raw_time = inv.args.require("time")?;
    let time = parse_clock(raw_time)?;
    let (from_label, from) = parse_zone(inv.args.require("from")?)?;
    let (to_label, to) = parse_zone(inv.args.require("to")?)?;

    let secs = i64::from(time.num_seconds_from_midnight()) - i64::from(from.local_minus_utc())
        + i64::from(to.local_minus_utc());
    let day_shift = secs.div_euclid(86_400);
    let secs = secs.rem_euclid(86_400);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let shown = if time.second() == 0 {
        format!("{h:02}:{m:02}")
    } else {
        format!("{h:02}:{m:02}:{s:02}")
    };
    let note = match day_shift {
        1 => " (next day)",
        -1 => " (previous day)",
        _ => "",
    };
    Ok(CommandOutput::text(format!(
        "{raw_time} {from_label} is {shown} {to_label}{note}"
    )))
}

fn day_of_week(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let now = inv.platform.now_utc()?.with_timezone(&inv.platform.local_offset()?);
    Ok(CommandOutput::text(format!("Today is {}", now.format("%A"))))
}

fn days_until(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let raw = inv.args.require("date")?;
    let target = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CaelumError::invalid(format!("'{raw}' is not a YYYY-MM-DD date")))?;
    let today = inv
        .platform
        .now_utc()?
        .with_timezone(&inv.platform.local_offset()?)
        .date_naive();
    let days = (target - today).num_days();
    let text = match days {
        0 => format!("{target} is today"),
        d if d > 0 => format!("{d} day(s) until {target}"),
        d => format!("{target} was {} day(s) ago", -d),
    };
    Ok(CommandOutput::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use caelum_types::error::ErrorKind;

    #[test]
    fn zone_lookup() {
        assert_eq!(parse_zone("jst").unwrap().0, "JST");
        assert_eq!(parse_zone("PST").unwrap().1.local_minus_utc(), -8 * 3600);
        let (label, offset) = parse_zone("UTC+5:30").unwrap();
        assert_eq!(label, "UTC+05:30");
        assert_eq!(offset.local_minus_utc(), 19_800);
        assert_eq!(parse_zone("gmt-3").unwrap().1.local_minus_utc(), -3 * 3600);
        assert_eq!(parse_zone("+0930").unwrap().1.local_minus_utc(), 34_200);
        assert!(parse_zone("Mars/Olympus").is_err());
        assert!(parse_zone("UTC+15").is_err());
        assert!(parse_zone("UTC+5:75").is_err());
        assert!(parse_zone("UTC++5").is_err());
        assert!(parse_zone("+").is_err());
    }

    #[test]
    fn malformed_offsets_are_invalid_arguments() {
        let h = Harness::new(TimeTools);
        for input in [
            "get time in +aéb",
            "get time in +éé",
            "get time in UTC+99999999",
            "get time in UTC+71582789",
            "get time in -2147483648",
        ] {
            let err = h.run(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{input}: {err}");
        }
    }

    #[test]
    fn time_in_zone() {
        let h = Harness::new(TimeTools);
        assert_eq!(h.text("get time in JST"), "Time in JST: 23:30:45 (UTC+09:00)");
        assert_eq!(
            h.text("get time in utc-4"),
            "Time in UTC-04:00: 10:30:45 (UTC-04:00)"
        );
        let err = h.run("get time in nowhere").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn conversions_with_day_shift() {
        let h = Harness::new(TimeTools);
        assert_eq!(h.text("convert 14:30 from utc to jst"), "14:30 UTC is 23:30 JST");
        assert_eq!(
            h.text("convert 23:00 from PST to EST"),
            "23:00 PST is 02:00 EST (next day)"
        );
        assert_eq!(
            h.text("convert 01:00:30 from jst to utc"),
            "01:00:30 JST is 16:00:30 UTC (previous day)"
        );
        let err = h.run("convert noon from utc to jst").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn list_includes_offsets() {
        let text = Harness::new(TimeTools).text("list time zones");
        assert!(text.contains("IST   UTC+05:30"));
        assert!(text.starts_with("ZONE"));
    }

    #[test]
    fn calendar() {
        let h = Harness::new(TimeTools);
        assert_eq!(h.text("get day of week"), "Today is Friday");
        assert_eq!(h.text("days until 2026-12-25"), "315 day(s) until 2026-12-25");
        assert_eq!(h.text("days until 2026-02-13"), "2026-02-13 is today");
        assert_eq!(h.text("days until 2026-02-12"), "2026-02-12 was 1 day(s) ago");
        let err = h.run("days until christmas").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
