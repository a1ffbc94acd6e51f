//! Configuration section definitions.
//!
//! Each module corresponds to a section in `plugkit.toml`:
//!
//! | Module   | TOML Section     | Purpose                              |
//! |----------|------------------|--------------------------------------|
//! | `plugin` | `[plugin]`       | Plugin name and extension id         |
//! | `build`  | `[build]`        | Sources, build commands, prefs files |
//! | `serve`  | `[serve]`        | Host application and runner mode     |
//! | `hooks`  | `[serve.hooks]`  | Lifecycle command hooks              |

pub mod build;
mod hooks;
mod plugin;
mod serve;

pub use build::BuildSectionConfig;
pub use hooks::{HookConfig, ServeHooksConfig};
pub use plugin::PluginSectionConfig;
pub use serve::ServeConfig;
