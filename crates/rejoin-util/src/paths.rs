//! Default paths for rejoind components
//!
//! - Config: `$REJOIND_CONFIG`, else `$XDG_CONFIG_HOME/rejoind/config.toml`
//!   or `~/.config/rejoind/config.toml`
//! - Screenshot scratch file: `$TMPDIR/rejoind-screen.png`

use std::path::PathBuf;

/// Environment variable for overriding the config path
pub const REJOIND_CONFIG_ENV: &str = "REJOIND_CONFIG";

/// Application subdirectory name
const APP_DIR: &str = "rejoind";

const CONFIG_FILENAME: &str = "config.toml";

const SCREENSHOT_FILENAME: &str = "rejoind-screen.png";

/// Get the default configuration file path.
///
/// Order of precedence:
/// 1. `$REJOIND_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/rejoind/config.toml` (via `dirs::config_dir`)
/// 3. `./config.toml` when no config dir can be determined
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(REJOIND_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Config path without checking the `REJOIND_CONFIG` env var.
/// clap reads the env var itself, so its default must not.
pub fn config_path_without_env() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR).join(CONFIG_FILENAME),
        None => PathBuf::from(CONFIG_FILENAME),
    }
}

/// Scratch location for report screenshots.
pub fn default_screenshot_path() -> PathBuf {
    std::env::temp_dir().join(SCREENSHOT_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_app_file() {
        let path = config_path_without_env();
        assert!(path.ends_with(CONFIG_FILENAME));
    }

    #[test]
    fn screenshot_path_is_png() {
        let path = default_screenshot_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
    }
}
