//! Platform service traits and their implementations.
//!
//! Handlers never touch the operating system directly; they go through the
//! [`Platform`] aggregate so the dispatcher can run against the real desktop
//! or against [`fake::FakePlatform`] in tests.

mod desktop;
#[cfg(feature = "fake")]
pub mod fake;
mod services;

pub use desktop::DesktopPlatform;
pub use services::*;
