//! Tiered resolution of free text to a registry entry.
//!
//! Tiers run in order and the first one that matches wins:
//!
//! 1. exact: normalized input equals a registered pattern
//! 2. template: a `{placeholder}` pattern matches the whole input
//! 3. prefix/substring: a literal phrase appears in the input on word
//!    boundaries
//! 4. fuzzy: skim subsequence score against literal phrases
//!
//! Tiers 3 and 4 are "loose" and never resolve to an unsafe entry.

use caelum_types::config::MatchingConfig;
use caelum_types::error::{CaelumError, Result};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::Serialize;

use crate::command::Args;
use crate::registry::{CommandEntry, CommandRegistry};
use crate::template::{collapse_whitespace, normalize};

/// Minimum share of a phrase's length a fuzzy input must cover, in percent.
const FUZZY_MIN_COVERAGE: usize = 80;

/// Which tier resolved an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Template,
    Prefix,
    Substring,
    Fuzzy,
}

impl MatchKind {
    /// Whether this tier may resolve to an unsafe entry.
    pub fn is_strict(self) -> bool {
        matches!(self, Self::Exact | Self::Template)
    }
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Template => "template",
            Self::Prefix => "prefix",
            Self::Substring => "substring",
            Self::Fuzzy => "fuzzy",
        };
        f.write_str(s)
    }
}

/// Toggles for the loose tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    pub substring: bool,
    pub fuzzy: bool,
    pub min_fuzzy_score: i64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::from(&MatchingConfig::default())
    }
}

impl From<&MatchingConfig> for MatchOptions {
    fn from(cfg: &MatchingConfig) -> Self {
        Self {
            substring: cfg.substring,
            fuzzy: cfg.fuzzy,
            min_fuzzy_score: cfg.min_fuzzy_score,
        }
    }
}

/// A resolved entry with its captured arguments.
#[derive(Debug)]
pub struct Resolution<'r> {
    pub entry: &'r CommandEntry,
    pub args: Args,
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhraseMatcher {
    options: MatchOptions,
}

impl PhraseMatcher {
    pub fn new(options: MatchOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MatchOptions {
        self.options
    }

    /// Resolve `input` against `registry`.
    ///
    /// Fails with `InvalidArgument` for blank input and `NotFound` when no
    /// tier matches.
    pub fn resolve<'r>(
        &self,
        registry: &'r CommandRegistry,
        input: &str,
    ) -> Result<Resolution<'r>> {
        let normalized = normalize(input);
        if normalized.is_empty() {
            return Err(CaelumError::invalid("empty command"));
        }

        let resolution = self
            .exact(registry, &normalized)
            .or_else(|| self.template(registry, input))
            .or_else(|| self.substring(registry, &normalized))
            .or_else(|| self.fuzzy(registry, &normalized));

        match resolution {
            Some(res) => {
                log::debug!(
                    "'{}' resolved to '{}' ({})",
                    input,
                    res.entry.phrase(),
                    res.kind
                );
                Ok(res)
            },
            None => Err(CaelumError::NotFound(collapse_whitespace(input))),
        }
    }

    fn exact<'r>(
        &self,
        registry: &'r CommandRegistry,
        normalized: &str,
    ) -> Option<Resolution<'r>> {
        registry.get(normalized).map(|entry| Resolution {
            entry,
            args: Args::new(),
            kind: MatchKind::Exact,
        })
    }

    fn template<'r>(
        &self,
        registry: &'r CommandRegistry,
        input: &str,
    ) -> Option<Resolution<'r>> {
        let text = collapse_whitespace(input);
        let mut best: Option<(usize, &'r CommandEntry, Args)> = None;
        for entry in registry.entries() {
            let Some(template) = entry.template() else {
                continue;
            };
            let Some(args) = template.captures(&text) else {
                continue;
            };
            // Strictly greater keeps the lexically first pattern on ties.
            if best.as_ref().is_none_or(|(len, _, _)| template.literal_len() > *len) {
                best = Some((template.literal_len(), entry, args));
            }
        }
        best.map(|(_, entry, args)| Resolution {
            entry,
            args,
            kind: MatchKind::Template,
        })
    }

    fn substring<'r>(
        &self,
        registry: &'r CommandRegistry,
        normalized: &str,
    ) -> Option<Resolution<'r>> {
        if !self.options.substring {
            return None;
        }
        // (phrase length, is prefix, entry)
        let mut best: Option<(usize, bool, &'r CommandEntry)> = None;
        for entry in loose_candidates(registry) {
            let phrase = entry.phrase();
            let Some(pos) = find_on_word_boundary(normalized, phrase) else {
                continue;
            };
            let candidate = (phrase.len(), pos == 0, entry);
            let better = match &best {
                None => true,
                Some((len, prefix, _)) => (candidate.0, candidate.1) > (*len, *prefix),
            };
            if better {
                best = Some(candidate);
            }
        }
        best.map(|(_, prefix, entry)| Resolution {
            entry,
            args: Args::new(),
            kind: if prefix {
                MatchKind::Prefix
            } else {
                MatchKind::Substring
            },
        })
    }

    fn fuzzy<'r>(
        &self,
        registry: &'r CommandRegistry,
        normalized: &str,
    ) -> Option<Resolution<'r>> {
        if !self.options.fuzzy {
            return None;
        }
        let matcher = SkimMatcherV2::default();
        let input_len = normalized.chars().count();
        let mut best: Option<(i64, usize, &'r CommandEntry)> = None;
        for entry in loose_candidates(registry) {
            let phrase = entry.phrase();
            let phrase_len = phrase.chars().count();
            if input_len > phrase_len || input_len * 100 < phrase_len * FUZZY_MIN_COVERAGE {
                continue;
            }
            let Some(score) = matcher.fuzzy_match(phrase, normalized) else {
                continue;
            };
            if score < self.options.min_fuzzy_score {
                continue;
            }
            let better = match &best {
                None => true,
                Some((s, len, _)) => (score, phrase_len) > (*s, *len),
            };
            if better {
                best = Some((score, phrase_len, entry));
            }
        }
        best.map(|(score, _, entry)| {
            log::debug!("fuzzy score {score} for '{}'", entry.phrase());
            Resolution {
                entry,
                args: Args::new(),
                kind: MatchKind::Fuzzy,
            }
        })
    }
}

/// Safe, placeholder-free entries; the only ones loose tiers consider.
fn loose_candidates(registry: &CommandRegistry) -> impl Iterator<Item = &CommandEntry> {
    registry
        .entries()
        .filter(|e| e.is_safe() && e.template().is_none())
}

/// Byte offset of the first occurrence of `needle` in `haystack` that starts
/// and ends on a word boundary (string edge or space).
fn find_on_word_boundary(haystack: &str, needle: &str) -> Option<usize> {
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let end = pos + needle.len();
        let starts_clean = pos == 0 || haystack[..pos].ends_with(' ');
        let ends_clean = end == haystack.len() || haystack[end..].starts_with(' ');
        starts_clean && ends_clean
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutput, Invocation};
    use caelum_types::error::ErrorKind;
    use proptest::prelude::*;

    fn noop(_: &Invocation<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::None)
    }

    fn registry() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        for phrase in [
            "say hello",
            "get current time",
            "get current date",
            "take screenshot",
            "take screenshot with delay",
            "take screenshot with delay {seconds}",
            "ping {host}",
            "copy {text} to clipboard",
            "volume up",
        ] {
            reg.register(CommandEntry::new(phrase, "test", noop).unwrap())
                .unwrap();
        }
        reg.register(
            CommandEntry::new("copy {source} to {destination}", "files", noop)
                .unwrap()
                .mark_unsafe(),
        )
        .unwrap();
        reg.register(
            CommandEntry::new("lock screen", "session", noop)
                .unwrap()
                .mark_unsafe(),
        )
        .unwrap();
        reg
    }

    fn resolve(input: &str) -> Result<(String, MatchKind, Args)> {
        let reg = registry();
        let res = PhraseMatcher::default().resolve(&reg, input)?;
        Ok((res.entry.phrase().to_string(), res.kind, res.args))
    }

    #[test]
    fn exact_match_is_normalized() {
        let (phrase, kind, args) = resolve("  Get   CURRENT time ").unwrap();
        assert_eq!(phrase, "get current time");
        assert_eq!(kind, MatchKind::Exact);
        assert!(args.is_empty());
    }

    #[test]
    fn exact_beats_template() {
        let (phrase, kind, _) = resolve("take screenshot with delay").unwrap();
        assert_eq!(phrase, "take screenshot with delay");
        assert_eq!(kind, MatchKind::Exact);
    }

    #[test]
    fn template_extracts_arguments() {
        let (phrase, kind, args) = resolve("ping google.com").unwrap();
        assert_eq!(phrase, "ping {host}");
        assert_eq!(kind, MatchKind::Template);
        assert_eq!(args.get("host"), Some("google.com"));
    }

    #[test]
    fn template_keeps_argument_case() {
        let (_, _, args) = resolve("PING   Example.COM").unwrap();
        assert_eq!(args.get("host"), Some("Example.COM"));
    }

    #[test]
    fn most_literal_template_wins() {
        let (phrase, _, args) = resolve("copy hello world to clipboard").unwrap();
        assert_eq!(phrase, "copy {text} to clipboard");
        assert_eq!(args.get("text"), Some("hello world"));

        let (phrase, _, args) = resolve("copy file.txt to backup.txt").unwrap();
        assert_eq!(phrase, "copy {source} to {destination}");
        assert_eq!(args.get("source"), Some("file.txt"));
        assert_eq!(args.get("destination"), Some("backup.txt"));
    }

    #[test]
    fn template_beats_substring() {
        let (phrase, kind, args) = resolve("take screenshot with delay 5").unwrap();
        assert_eq!(phrase, "take screenshot with delay {seconds}");
        assert_eq!(kind, MatchKind::Template);
        assert_eq!(args.get("seconds"), Some("5"));
    }

    #[test]
    fn prefix_match() {
        let (phrase, kind, _) = resolve("take screenshot now").unwrap();
        assert_eq!(phrase, "take screenshot");
        assert_eq!(kind, MatchKind::Prefix);
    }

    #[test]
    fn longest_embedded_phrase_wins() {
        let (phrase, kind, _) = resolve("now take screenshot with delay").unwrap();
        assert_eq!(phrase, "take screenshot with delay");
        assert_eq!(kind, MatchKind::Substring);
    }

    #[test]
    fn interior_substring_on_word_boundary() {
        let (phrase, kind, _) = resolve("could you say hello now").unwrap();
        assert_eq!(phrase, "say hello");
        assert_eq!(kind, MatchKind::Substring);
        assert!(resolve("essay hellos").is_err());
    }

    #[test]
    fn fuzzy_tolerates_typo() {
        let (phrase, kind, _) = resolve("say helo").unwrap();
        assert_eq!(phrase, "say hello");
        assert_eq!(kind, MatchKind::Fuzzy);
    }

    #[test]
    fn fuzzy_requires_coverage() {
        let err = resolve("get cur").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn loose_tiers_skip_unsafe_entries() {
        assert_eq!(resolve("lock screen").unwrap().1, MatchKind::Exact);
        assert_eq!(
            resolve("please lock screen now").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(resolve("lock scren").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn disabled_loose_tiers() {
        let reg = registry();
        let strict = PhraseMatcher::new(MatchOptions {
            substring: false,
            fuzzy: false,
            min_fuzzy_score: 50,
        });
        assert!(strict.resolve(&reg, "say helo").is_err());
        assert!(strict.resolve(&reg, "could you say hello").is_err());
        assert!(strict.resolve(&reg, "say hello").is_ok());
    }

    #[test]
    fn empty_input_is_invalid() {
        assert_eq!(resolve("").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            resolve(" \t\n ").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn unknown_input_not_found() {
        let err = resolve("not a real command").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(format!("{err}").contains("not a real command"));
    }

    #[test]
    fn very_long_input_does_not_panic() {
        let long = "x".repeat(100_000);
        assert_eq!(resolve(&long).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn word_boundary_search() {
        assert_eq!(find_on_word_boundary("say hello", "say hello"), Some(0));
        assert_eq!(find_on_word_boundary("oh say hello", "say hello"), Some(3));
        assert_eq!(find_on_word_boundary("essay hello", "say hello"), None);
        assert_eq!(find_on_word_boundary("essay hello say hello", "say hello"), Some(12));
    }

    proptest! {
        #[test]
        fn every_registered_phrase_resolves_to_itself(idx in 0usize..11) {
            let reg = registry();
            let phrase = reg.phrases()[idx].to_string();
            let res = PhraseMatcher::default().resolve(&reg, &phrase).unwrap();
            prop_assert_eq!(res.entry.phrase(), phrase.as_str());
            prop_assert_eq!(res.kind, MatchKind::Exact);
        }

        #[test]
        fn arbitrary_input_never_panics(input in ".{0,200}") {
            let reg = registry();
            match PhraseMatcher::default().resolve(&reg, &input) {
                Ok(res) => prop_assert!(!res.entry.phrase().is_empty()),
                Err(e) => prop_assert!(matches!(
                    e.kind(),
                    ErrorKind::NotFound | ErrorKind::InvalidArgument
                )),
            }
        }

        #[test]
        fn loose_match_never_unsafe(input in "[a-z ]{1,40}") {
            let reg = registry();
            if let Ok(res) = PhraseMatcher::default().resolve(&reg, &input) {
                prop_assert!(res.kind.is_strict() || res.entry.is_safe());
            }
        }
    }
}
