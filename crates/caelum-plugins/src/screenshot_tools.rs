//! Screen capture: full screen, delayed, region, custom filename or format.
//!
//! Files land in `screenshot.directory` from the config unless the caller
//! gives an absolute filename.

use std::path::{Path, PathBuf};
use std::time::Duration;

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_platform::Region;
use caelum_types::error::{CaelumError, Result};

pub struct ScreenshotTools;

impl Plugin for ScreenshotTools {
    fn name(&self) -> &str {
        "screenshot_tools"
    }

    fn description(&self) -> &str {
        "Capture the screen to PNG files"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("take screenshot", "Capture the full screen", full)?;
        reg.command(
            "take screenshot with delay",
            "Capture after a 3 second delay",
            delayed,
        )?;
        reg.command(
            "take screenshot with delay {seconds}",
            "Capture after {seconds} seconds",
            delayed,
        )?;
        reg.command(
            "take screenshot with region {x} {y} {width} {height}",
            "Capture a rectangle of the screen",
            region,
        )?;
        reg.command(
            "take screenshot with custom filename {filename}",
            "Capture the full screen to {filename}",
            custom_filename,
        )?;
        reg.command(
            "take screenshot with custom format",
            "Capture the full screen as PNG",
            custom_format,
        )?;
        reg.command(
            "take screenshot with custom format {format}",
            "Capture the full screen as png, jpg, jpeg or bmp",
            custom_format,
        )?;
        Ok(())
    }
}

const DEFAULT_DELAY_SECS: u64 = 3;
const MAX_DELAY_SECS: u64 = 300;
/// Image formats the capture tools can write.
const FORMATS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

fn output_path(inv: &Invocation<'_>, filename: &str) -> PathBuf {
    let name = Path::new(filename);
    if name.is_absolute() {
        name.to_path_buf()
    } else {
        inv.config.screenshot.directory.join(name)
    }
}

fn capture(inv: &Invocation<'_>, filename: &str, region: Option<Region>) -> Result<CommandOutput> {
    let path = output_path(inv, filename);
    inv.platform.capture(&path, region)?;
    Ok(CommandOutput::text(format!(
        "Screenshot saved as '{}'",
        path.display()
    )))
}

fn full(inv: &Invocation<'_>) -> Result<CommandOutput> {
    capture(inv, "screenshot.png", None)
}

fn delayed(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let secs = inv.args.parse_or("seconds", DEFAULT_DELAY_SECS)?;
    if secs > MAX_DELAY_SECS {
        return Err(CaelumError::invalid(format!(
            "delay of {secs}s exceeds the {MAX_DELAY_SECS}s limit"
        )));
    }
    inv.platform.sleep(Duration::from_secs(secs));
    capture(inv, "screenshot_delayed.png", None)
}

fn region(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let region = Region {
        x: inv.args.parse("x")?,
        y: inv.args.parse("y")?,
        width: inv.args.parse("width")?,
        height: inv.args.parse("height")?,
    };
    if region.width == 0 || region.height == 0 {
        return Err(CaelumError::invalid("region width and height must be positive"));
    }
    capture(inv, "screenshot_region.png", Some(region))
}

fn custom_filename(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let raw = inv.args.require("filename")?;
    let filename = if Path::new(raw).extension().is_some() {
        raw.to_string()
    } else {
        format!("{raw}.png")
    };
    capture(inv, &filename, None)
}

fn custom_format(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let format = inv
        .args
        .get("format")
        .unwrap_or("png")
        .trim_start_matches('.')
        .to_ascii_lowercase();
    if !FORMATS.contains(&format.as_str()) {
        return Err(CaelumError::invalid(format!(
            "unsupported image format '{format}' (expected one of {})",
            FORMATS.join(", ")
        )));
    }
    capture(inv, &format!("screenshot_custom.{format}"), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Harness, permissive};
    use caelum_core::MatchKind;
    use caelum_platform::fake::{Effect, FakePlatform};
    use caelum_types::error::ErrorKind;

    fn harness_in(dir: &str) -> Harness {
        let mut config = permissive();
        config.screenshot.directory = PathBuf::from(dir);
        Harness::with(ScreenshotTools, FakePlatform::new(), config)
    }

    #[test]
    fn full_screen_into_configured_directory() {
        let h = harness_in("/shots");
        assert_eq!(h.text("take screenshot"), "Screenshot saved as '/shots/screenshot.png'");
        assert_eq!(
            h.fake.effects(),
            vec![Effect::Captured {
                path: PathBuf::from("/shots/screenshot.png"),
                region: None
            }]
        );
    }

    #[test]
    fn default_delay_is_three_seconds() {
        let h = harness_in("out");
        h.text("take screenshot with delay");
        assert_eq!(h.fake.effects()[0], Effect::Slept(Duration::from_secs(3)));
    }

    #[test]
    fn explicit_delay() {
        let h = harness_in("out");
        h.text("take screenshot with delay 5");
        let effects = h.fake.effects();
        assert_eq!(effects[0], Effect::Slept(Duration::from_secs(5)));
        assert!(matches!(&effects[1], Effect::Captured { path, .. }
            if path.ends_with("screenshot_delayed.png")));
    }

    #[test]
    fn delay_limits() {
        let h = harness_in("out");
        let err = h.run("take screenshot with delay 301").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = h.run("take screenshot with delay soon").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(h.fake.effects().is_empty());
    }

    #[test]
    fn region_capture() {
        let h = harness_in("out");
        h.text("take screenshot with region 10 -20 300 200");
        assert_eq!(
            h.fake.effects(),
            vec![Effect::Captured {
                path: PathBuf::from("out/screenshot_region.png"),
                region: Some(Region {
                    x: 10,
                    y: -20,
                    width: 300,
                    height: 200
                })
            }]
        );
        let err = h.run("take screenshot with region 0 0 0 10").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn custom_filename_gets_png_extension() {
        let h = harness_in("out");
        assert_eq!(
            h.text("take screenshot with custom filename Desk"),
            "Screenshot saved as 'out/Desk.png'"
        );
        h.text("take screenshot with custom filename /tmp/a.jpg");
        assert!(matches!(&h.fake.effects()[1], Effect::Captured { path, .. }
            if path == Path::new("/tmp/a.jpg")));
    }

    #[test]
    fn custom_format() {
        let h = harness_in("out");
        assert_eq!(
            h.text("take screenshot with custom format"),
            "Screenshot saved as 'out/screenshot_custom.png'"
        );
        assert_eq!(
            h.text("take screenshot with custom format JPG"),
            "Screenshot saved as 'out/screenshot_custom.jpg'"
        );
        let err = h.run("take screenshot with custom format exe").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = h.run("take screenshot with custom format ../../x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(h.fake.effects().len(), 2);
    }

    #[test]
    fn malformed_region_falls_back_to_full_screen() {
        let h = harness_in("out");
        let d = h.dispatcher.dispatch("take screenshot with region 10 20 30").unwrap();
        assert_eq!(d.phrase, "take screenshot");
        assert_eq!(d.kind, MatchKind::Prefix);
        assert_eq!(
            h.fake.effects(),
            vec![Effect::Captured {
                path: PathBuf::from("out/screenshot.png"),
                region: None
            }]
        );
    }

    #[test]
    fn capture_failure_is_handler_error() {
        let h = Harness::with(ScreenshotTools, FakePlatform::failing(), permissive());
        let err = h.run("take screenshot").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerError);
    }
}
