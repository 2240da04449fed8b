//! Configuration validation logic.

use crate::errors::ConfigError;
use crate::types::WorktideConfig;

/// Validate a WorktideConfig, returning an error if any values are invalid.
///
/// # Validation Rules
///
/// - Debounce, backoff, poll, and timeout values must be greater than zero
/// - The focused poll period must not exceed the unfocused one
/// - `gh_path`, if set, must not be empty
pub fn validate_config(config: &WorktideConfig) -> Result<(), ConfigError> {
    let non_zero = [
        ("watch.branch_debounce_ms", config.watch.branch_debounce_ms),
        ("watch.files_debounce_ms", config.watch.files_debounce_ms),
        ("watch.restart_backoff_ms", config.watch.restart_backoff_ms),
        ("refresh.focused_poll_secs", config.refresh.focused_poll_secs),
        (
            "refresh.unfocused_poll_secs",
            config.refresh.unfocused_poll_secs,
        ),
        ("refresh.self_refresh_secs", config.refresh.self_refresh_secs),
        ("forge.command_timeout_secs", config.forge.command_timeout_secs),
    ];
    for (name, value) in non_zero {
        if value == Some(0) {
            return Err(ConfigError::InvalidConfiguration {
                message: format!("{name} must be > 0"),
            });
        }
    }

    if config.refresh.focused_poll() > config.refresh.unfocused_poll() {
        return Err(ConfigError::InvalidConfiguration {
            message: format!(
                "refresh.focused_poll_secs ({}) must not exceed refresh.unfocused_poll_secs ({})",
                config.refresh.focused_poll().as_secs(),
                config.refresh.unfocused_poll().as_secs()
            ),
        });
    }

    if let Some(ref gh_path) = config.forge.gh_path
        && gh_path.trim().is_empty()
    {
        return Err(ConfigError::InvalidConfiguration {
            message: "forge.gh_path must not be empty".to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ForgeConfig, RefreshConfig, WatchConfig};

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&WorktideConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_debounce_rejected() {
        let config = WorktideConfig {
            watch: WatchConfig {
                files_debounce_ms: Some(0),
                ..Default::default()
            },
            ..Default::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("watch.files_debounce_ms"));
    }

    #[test]
    fn test_focused_slower_than_unfocused_rejected() {
        let config = WorktideConfig {
            refresh: RefreshConfig {
                focused_poll_secs: Some(600),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_empty_gh_path_rejected() {
        let config = WorktideConfig {
            forge: ForgeConfig {
                gh_path: Some("  ".to_string()),
                command_timeout_secs: None,
            },
            ..Default::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
