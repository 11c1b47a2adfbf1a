//! Handler trait, invocation context, arguments, and command output.

use std::fmt::Display;
use std::str::FromStr;

use caelum_platform::Platform;
use caelum_types::config::CaelumConfig;
use caelum_types::error::{CaelumError, Result};
use serde::Serialize;

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CommandOutput {
    /// Plain text lines.
    Text(String),
    /// Tabular data (header row + data rows).
    Table {
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Command produced no visible output.
    None,
}

impl CommandOutput {
    /// Shorthand for `CommandOutput::Text`.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Human-readable rendering. Tables are padded into aligned columns.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::None => String::new(),
            Self::Table { headers, rows } => {
                let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
                for row in rows {
                    for (i, cell) in row.iter().enumerate() {
                        let w = cell.chars().count();
                        match widths.get_mut(i) {
                            Some(max) => *max = (*max).max(w),
                            None => widths.push(w),
                        }
                    }
                }
                let fmt_row = |cells: &[String]| {
                    cells
                        .iter()
                        .enumerate()
                        .map(|(i, c)| format!("{c:<width$}", width = widths[i]))
                        .collect::<Vec<_>>()
                        .join("  ")
                        .trim_end()
                        .to_string()
                };
                let mut lines = vec![fmt_row(headers.as_slice())];
                lines.extend(rows.iter().map(|r| fmt_row(r.as_slice())));
                lines.join("\n")
            },
        }
    }
}

/// Arguments captured from `{placeholder}` slots, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    values: Vec<(String, String)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The value of `name`, or `InvalidArgument` if it was not captured.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| CaelumError::invalid(format!("missing argument '{name}'")))
    }

    /// Parse a required argument.
    pub fn parse<T>(&self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.require(name)?;
        raw.parse()
            .map_err(|e| CaelumError::invalid(format!("{name} = '{raw}': {e}")))
    }

    /// Parse an optional argument, using `default` when absent.
    pub fn parse_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(name) {
            Some(_) => self.parse(name),
            None => Ok(default),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

/// Everything a handler receives when invoked.
pub struct Invocation<'a> {
    /// The raw text the user typed.
    pub input: &'a str,
    /// The registered phrase pattern that matched.
    pub phrase: &'a str,
    pub args: &'a Args,
    pub platform: &'a dyn Platform,
    pub config: &'a CaelumConfig,
}

/// A handler bound to a phrase.
///
/// Implemented for any `Fn(&Invocation) -> Result<CommandOutput>`, so plain
/// functions and closures register directly.
pub trait Command: Send + Sync {
    fn execute(&self, inv: &Invocation<'_>) -> Result<CommandOutput>;
}

impl<F> Command for F
where
    F: Fn(&Invocation<'_>) -> Result<CommandOutput> + Send + Sync,
{
    fn execute(&self, inv: &Invocation<'_>) -> Result<CommandOutput> {
        self(inv)
    }
}
