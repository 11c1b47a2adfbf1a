//! Clipboard read/write.

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::Result;

pub struct ClipboardTools;

impl Plugin for ClipboardTools {
    fn name(&self) -> &str {
        "clipboard_tools"
    }

    fn description(&self) -> &str {
        "Read and write the system clipboard"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("get clipboard", "Current clipboard text", get_clipboard)?;
        reg.command("copy {text} to clipboard", "Place text on the clipboard", copy_text)?;
        reg.command("clear clipboard", "Empty the clipboard", clear_clipboard)?;
        Ok(())
    }
}

fn get_clipboard(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let text = inv.platform.clipboard_text()?;
    if text.is_empty() {
        Ok(CommandOutput::text("Clipboard is empty"))
    } else {
        Ok(CommandOutput::Text(text))
    }
}

fn copy_text(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let text = inv.args.require("text")?;
    inv.platform.set_clipboard_text(text)?;
    Ok(CommandOutput::text(format!("Copied to clipboard: {text}")))
}

fn clear_clipboard(inv: &Invocation<'_>) -> Result<CommandOutput> {
    inv.platform.set_clipboard_text("")?;
    Ok(CommandOutput::text("Clipboard cleared"))
}
