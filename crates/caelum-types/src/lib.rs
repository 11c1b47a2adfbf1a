//! Foundation types for caelum-sys.
//!
//! This crate holds the pieces every other layer shares: the error taxonomy
//! reported by the dispatcher and CLI, and the TOML-backed configuration.

pub mod config;
pub mod error;
