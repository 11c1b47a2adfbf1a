//! Playback and volume keys.

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_platform::MediaKey;
use caelum_types::error::Result;

pub struct MediaControls;

impl Plugin for MediaControls {
    fn name(&self) -> &str {
        "media_controls"
    }

    fn description(&self) -> &str {
        "Media playback and system volume"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("pause music", "Toggle play/pause", pause_music)?;
        reg.command("mute volume", "Toggle mute", mute_volume)?;
        reg.command("volume up", "Raise volume one step", volume_up)?;
        reg.command("volume down", "Lower volume one step", volume_down)?;
        reg.command("next track", "Skip to the next track", next_track)?;
        reg.command("previous track", "Go back one track", previous_track)?;
        reg.command(
            "open media player",
            "Wake the active media player",
            open_media_player,
        )?;
        Ok(())
    }
}

fn press(inv: &Invocation<'_>, key: MediaKey, done: &str) -> Result<CommandOutput> {
    inv.platform.press(key)?;
    Ok(CommandOutput::text(done))
}

fn pause_music(inv: &Invocation<'_>) -> Result<CommandOutput> {
    press(inv, MediaKey::PlayPause, "Toggled play/pause.")
}

fn mute_volume(inv: &Invocation<'_>) -> Result<CommandOutput> {
    press(inv, MediaKey::Mute, "Volume muted/unmuted.")
}

fn volume_up(inv: &Invocation<'_>) -> Result<CommandOutput> {
    press(inv, MediaKey::VolumeUp, "Volume increased.")
}

fn volume_down(inv: &Invocation<'_>) -> Result<CommandOutput> {
    press(inv, MediaKey::VolumeDown, "Volume decreased.")
}

fn next_track(inv: &Invocation<'_>) -> Result<CommandOutput> {
    press(inv, MediaKey::Next, "Skipped to next track.")
}

fn previous_track(inv: &Invocation<'_>) -> Result<CommandOutput> {
    press(inv, MediaKey::Previous, "Went to previous track.")
}

fn open_media_player(inv: &Invocation<'_>) -> Result<CommandOutput> {
    press(
        inv,
        MediaKey::PlayPause,
        "Media player toggled (or opened if already running).",
    )
}
