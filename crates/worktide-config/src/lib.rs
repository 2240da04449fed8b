//! # worktide-config
//!
//! TOML configuration types, loading, and validation for worktide.
//!
//! Configuration is read from `~/.worktide/config.toml` and then from the
//! repository's `.worktide/config.toml`, with later files overriding earlier
//! ones field by field.

mod loading;
mod validation;

pub mod errors;
pub mod types;

pub use errors::ConfigError;
pub use loading::{load_config_file, load_hierarchy, merge_configs, project_config_path};
pub use types::{ForgeConfig, RefreshConfig, WatchConfig, WorktideConfig};
pub use validation::validate_config;

impl WorktideConfig {
    /// Load configuration from the user/project hierarchy.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy(project_root: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        loading::load_hierarchy(project_root)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }
}
