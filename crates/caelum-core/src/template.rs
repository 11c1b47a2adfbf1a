//! Phrase normalization and `{placeholder}` templates.
//!
//! A phrase pattern such as `copy {source} to {destination}` compiles to an
//! anchored, case-insensitive regex. Literal words match case-insensitively
//! with any run of whitespace between them; each placeholder captures one or
//! more characters, shortest first, so literals that follow a placeholder
//! bound it.

use std::collections::HashSet;

use caelum_types::error::{CaelumError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::command::Args;

/// Trim, collapse whitespace runs to a single space, and lowercase.
pub fn normalize(input: &str) -> String {
    collapse_whitespace(input).to_lowercase()
}

/// Trim and collapse whitespace runs to a single space, keeping case.
pub(crate) fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([^{}]*)\}").expect("placeholder regex is valid"));

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// A compiled phrase pattern with at least one placeholder.
#[derive(Debug, Clone)]
pub struct Template {
    regex: Regex,
    names: Vec<String>,
    literal_len: usize,
}

impl Template {
    /// Normalize a phrase pattern and validate its placeholders.
    ///
    /// Returns the normalized pattern and, if it has placeholders, the
    /// compiled template.
    pub fn compile(pattern: &str) -> Result<(String, Option<Template>)> {
        let normalized = normalize(pattern);
        if normalized.is_empty() {
            return Err(CaelumError::invalid("command phrase must not be empty"));
        }

        let mut regex_src = String::from("(?i)^");
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        let mut literal_len = 0;
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&normalized) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let name = &caps[1];
            if !is_valid_name(name) {
                return Err(CaelumError::invalid(format!(
                    "bad placeholder '{{{name}}}' in '{normalized}'"
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(CaelumError::invalid(format!(
                    "placeholder '{{{name}}}' repeated in '{normalized}'"
                )));
            }
            literal_len += push_literal(&mut regex_src, &normalized[last..whole.start()])?;
            regex_src.push_str(&format!("(?P<{name}>.+?)"));
            names.push(name.to_string());
            last = whole.end();
        }

        if names.is_empty() {
            if normalized.contains(['{', '}']) {
                return Err(CaelumError::invalid(format!(
                    "unbalanced brace in '{normalized}'"
                )));
            }
            return Ok((normalized, None));
        }

        literal_len += push_literal(&mut regex_src, &normalized[last..])?;
        regex_src.push('$');
        let regex = Regex::new(&regex_src)
            .map_err(|e| CaelumError::invalid(format!("cannot compile '{normalized}': {e}")))?;
        Ok((
            normalized,
            Some(Template {
                regex,
                names,
                literal_len,
            }),
        ))
    }

    /// Match whitespace-collapsed input and capture its arguments.
    pub fn captures(&self, text: &str) -> Option<Args> {
        let caps = self.regex.captures(text)?;
        let mut args = Args::new();
        for name in &self.names {
            let value = caps.name(name)?.as_str().trim();
            if value.is_empty() {
                return None;
            }
            args.insert(name.as_str(), value);
        }
        Some(args)
    }

    /// Placeholder names in pattern order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Non-whitespace literal characters; more means more specific.
    pub fn literal_len(&self) -> usize {
        self.literal_len
    }
}

/// Append an escaped literal segment, returning its non-whitespace length.
fn push_literal(regex_src: &mut String, literal: &str) -> Result<usize> {
    if literal.contains(['{', '}']) {
        return Err(CaelumError::invalid(format!(
            "unbalanced brace near '{literal}'"
        )));
    }
    let mut len = 0;
    let mut chars = literal.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            while chars.peek().is_some_and(|c| c.is_whitespace()) {
                chars.next();
            }
            regex_src.push_str(r"\s+");
        } else {
            len += 1;
            regex_src.push_str(&regex::escape(ch.encode_utf8(&mut [0u8; 4])));
        }
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(pattern: &str) -> Template {
        Template::compile(pattern).unwrap().1.unwrap()
    }

    #[test]
    fn normalize_trims_collapses_and_lowercases() {
        assert_eq!(normalize("  Get   CURRENT\ttime \n"), "get current time");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn plain_phrase_has_no_template() {
        let (norm, tpl) = Template::compile("Say  Hello").unwrap();
        assert_eq!(norm, "say hello");
        assert!(tpl.is_none());
    }

    #[test]
    fn single_placeholder_extraction() {
        let args = template("ping {host}").captures("ping google.com").unwrap();
        assert_eq!(args.get("host"), Some("google.com"));
    }

    #[test]
    fn two_placeholder_extraction() {
        let args = template("copy {source} to {destination}")
            .captures("copy file.txt to backup.txt")
            .unwrap();
        assert_eq!(args.get("source"), Some("file.txt"));
        assert_eq!(args.get("destination"), Some("backup.txt"));
    }

    #[test]
    fn literals_match_case_insensitively_but_args_keep_case() {
        let args = template("create file {path}")
            .captures("CREATE File /tmp/Notes.TXT")
            .unwrap();
        assert_eq!(args.get("path"), Some("/tmp/Notes.TXT"));
    }

    #[test]
    fn placeholder_adjacent_to_literal() {
        let args = template("create blank image {width}x{height} at {path}")
            .captures("create blank image 640x480 at out.png")
            .unwrap();
        assert_eq!(args.get("width"), Some("640"));
        assert_eq!(args.get("height"), Some("480"));
        assert_eq!(args.get("path"), Some("out.png"));
    }

    #[test]
    fn regex_metacharacters_in_literals_are_escaped() {
        let t = template("what is {a} + {b}?");
        let args = t.captures("what is 2 + 3?").unwrap();
        assert_eq!(args.get("a"), Some("2"));
        assert!(t.captures("what is 2 3").is_none());
    }

    #[test]
    fn anchored_match_rejects_extra_prefix() {
        assert!(template("ping {host}").captures("please ping x").is_none());
        assert!(template("ping {host}").captures("ping").is_none());
    }

    #[test]
    fn literal_len_counts_non_whitespace() {
        assert_eq!(template("copy {text} to clipboard").literal_len(), 15);
        assert_eq!(template("copy {source} to {destination}").literal_len(), 6);
    }

    #[test]
    fn invalid_patterns_rejected() {
        assert!(Template::compile("").is_err());
        assert!(Template::compile("ping {1host}").is_err());
        assert!(Template::compile("ping {ho-st}").is_err());
        assert!(Template::compile("ping {host").is_err());
        assert!(Template::compile("ping host}").is_err());
        assert!(Template::compile("copy {a} to {a}").is_err());
        assert!(Template::compile("ping {}").is_err());
    }

    #[test]
    fn names_in_order() {
        let t = template("check port {port} on {host}");
        assert_eq!(t.names(), ["port".to_string(), "host".to_string()]);
    }
}
