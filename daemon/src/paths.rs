//! Canonical file paths for StatusPrompter data files.
//!
//! The config file lives under %APPDATA%\StatusPrompter\config.toml. When
//! APPDATA is unset (non-Windows development hosts) the working directory is
//! used instead.
use std::path::PathBuf;

const APP_DIR_NAME: &str = "StatusPrompter";
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Returns the StatusPrompter application data directory.
pub fn app_data_dir() -> PathBuf {
    match std::env::var_os("APPDATA") {
        Some(appdata) => PathBuf::from(appdata).join(APP_DIR_NAME),
        None => PathBuf::from("."),
    }
}

/// Returns the full path to the config file.
pub fn config_file_path() -> PathBuf {
    app_data_dir().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_path_has_correct_name() {
        let path = config_file_path();
        assert_eq!(path.file_name().unwrap(), CONFIG_FILE_NAME);
    }

    #[test]
    fn config_file_lives_in_app_data_dir() {
        assert_eq!(config_file_path().parent(), Some(app_data_dir().as_path()));
    }

    #[cfg(windows)]
    #[test]
    fn app_data_dir_is_inside_appdata() {
        let appdata = std::env::var("APPDATA").unwrap();
        let dir = app_data_dir();
        assert!(dir.starts_with(&appdata));
        assert_eq!(dir.file_name().unwrap(), APP_DIR_NAME);
    }
}
