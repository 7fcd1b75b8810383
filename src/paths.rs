/// Centralized platform-specific path computation
///
/// Follows the XDG Base Directory specification on Unix-like systems.
use std::path::PathBuf;

/// Prefix of temporary log files materialised from external commands
pub const TEMP_LOG_PREFIX: &str = "logmill-";

/// Platform-agnostic path utilities
pub struct PlatformPaths;

impl PlatformPaths {
    /// Get the appropriate config directory for the current platform
    ///
    /// - Windows: %APPDATA%
    /// - macOS: ~/Library/Application Support
    /// - Linux/Unix: $XDG_CONFIG_HOME or ~/.config
    pub fn config_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
        } else if cfg!(target_os = "macos") {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join("Library/Application Support"))
                .unwrap_or_else(|_| PathBuf::from("."))
        } else {
            std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|home| PathBuf::from(home).join(".config")))
                .unwrap_or_else(|_| PathBuf::from("."))
        }
    }

    /// Directory for temporary log files
    ///
    /// - Windows: %TEMP% / %TMP%
    /// - Unix: $TMPDIR or /tmp
    pub fn temp_dir() -> PathBuf {
        if cfg!(target_os = "windows") {
            std::env::var("TEMP")
                .or_else(|_| std::env::var("TMP"))
                .map(PathBuf::from)
                .unwrap_or_else(|_| std::env::temp_dir())
        } else {
            std::env::var("TMPDIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp"))
        }
    }

    /// Get default project-specific config directory
    ///
    /// Returns: {config_dir}/logmill
    pub fn project_config_dir() -> PathBuf {
        Self::config_dir().join("logmill")
    }

    /// Get default config file path
    ///
    /// Returns: {config_dir}/logmill/config.toml
    pub fn default_config_path() -> PathBuf {
        Self::project_config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_not_empty() {
        let dir = PlatformPaths::config_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_temp_dir_not_empty() {
        let dir = PlatformPaths::temp_dir();
        assert!(!dir.as_os_str().is_empty());
    }

    #[test]
    fn test_project_config_dir_is_subdirectory() {
        let config_dir = PlatformPaths::config_dir();
        let project_config = PlatformPaths::project_config_dir();

        assert!(project_config.starts_with(&config_dir));
        assert!(project_config.ends_with("logmill"));
    }

    #[test]
    fn test_default_config_path() {
        let path = PlatformPaths::default_config_path();
        assert!(path.to_string_lossy().contains("logmill"));
        assert!(path.ends_with("config.toml"));
    }
}
