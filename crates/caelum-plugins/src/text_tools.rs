//! Small text transformations.

use caelum_core::{CommandOutput, Invocation, Plugin, PluginRegistrar};
use caelum_types::error::Result;

pub struct TextTools;

impl Plugin for TextTools {
    fn name(&self) -> &str {
        "text_tools"
    }

    fn description(&self) -> &str {
        "Case conversion, word count, reversal"
    }

    fn register(&self, reg: &mut PluginRegistrar) -> Result<()> {
        reg.command("uppercase {text}", "Convert to upper case", uppercase)?;
        reg.command("lowercase {text}", "Convert to lower case", lowercase)?;
        reg.command("count words in {text}", "Number of whitespace-separated words", count_words)?;
        reg.command("reverse text {text}", "Reverse characters", reverse)?;
        Ok(())
    }
}

fn uppercase(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(inv.args.require("text")?.to_uppercase()))
}

fn lowercase(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(inv.args.require("text")?.to_lowercase()))
}

fn count_words(inv: &Invocation<'_>) -> Result<CommandOutput> {
    let n = inv.args.require("text")?.split_whitespace().count();
    Ok(CommandOutput::text(format!("{n} word(s)")))
}

fn reverse(inv: &Invocation<'_>) -> Result<CommandOutput> {
    Ok(CommandOutput::Text(
        inv.args.require("text")?.chars().rev().collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;

    #[test]
    fn transformations() {
        let h = Harness::new(TextTools);
        assert_eq!(h.text("uppercase Hello World"), "HELLO WORLD");
        assert_eq!(h.text("LOWERCASE Hello World"), "hello world");
        assert_eq!(h.text("count words in the quick brown fox"), "4 word(s)");
        assert_eq!(h.text("reverse text abc déf"), "féd cba");
    }
}
