//! Built-in plugin catalog.
//!
//! Each module is one plugin: a unit struct implementing
//! [`caelum_core::Plugin`] plus the handler functions it registers. Handlers
//! reach the host only through the [`caelum_platform::Platform`] services in
//! their invocation, so every plugin runs against `FakePlatform` in tests.

mod clipboard_tools;
mod file_tools;
mod image_tools;
mod media_controls;
mod misc_commands;
mod network_tools;
mod process_tools;
mod screenshot_tools;
mod session_control;
mod system_info;
mod text_tools;
mod time_tools;

pub use clipboard_tools::ClipboardTools;
pub use file_tools::FileTools;
pub use image_tools::ImageTools;
pub use media_controls::MediaControls;
pub use misc_commands::MiscCommands;
pub use network_tools::NetworkTools;
pub use process_tools::ProcessTools;
pub use screenshot_tools::ScreenshotTools;
pub use session_control::SessionControl;
pub use system_info::SystemInfoPlugin;
pub use text_tools::TextTools;
pub use time_tools::TimeTools;

use caelum_core::{Plugin, PluginLoader};

/// Every built-in plugin, in load order.
pub fn builtin_plugins() -> Vec<Box<dyn Plugin>> {
    vec![
        Box::new(MiscCommands),
        Box::new(SystemInfoPlugin),
        Box::new(ProcessTools),
        Box::new(NetworkTools),
        Box::new(ScreenshotTools),
        Box::new(MediaControls),
        Box::new(ClipboardTools),
        Box::new(TimeTools),
        Box::new(FileTools),
        Box::new(ImageTools),
        Box::new(TextTools),
        Box::new(SessionControl),
    ]
}

/// A loader preloaded with [`builtin_plugins`].
pub fn builtin_loader() -> PluginLoader {
    PluginLoader::with_plugins(builtin_plugins())
}
