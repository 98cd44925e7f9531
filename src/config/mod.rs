//! Configuration management.
//!
//! Settings come from four places, highest priority first:
//! 1. Command-line flags
//! 2. `CLOUDSAVER_*` environment variables
//! 3. The JSON config file (`~/.cloudsaver/config.json`, or `--config`)
//! 4. Built-in defaults
//!
//! clap already folds flags and environment variables into one `Option`
//! for most settings, so the `resolve_*` functions below take that value as
//! "explicit" and fall back to the file and the default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sync::DEFAULT_CONCURRENCY;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CLOUDSAVER_CONFIG";

/// Environment variable naming the local folder.
pub const LOCAL_FOLDER_ENV: &str = "CLOUDSAVER_LOCAL_FOLDER";

/// Environment variable naming the remote folder ID.
pub const FOLDER_ID_ENV: &str = "CLOUDSAVER_FOLDER_ID";

/// Environment variable holding the access token.
pub const TOKEN_ENV: &str = "CLOUDSAVER_TOKEN";

/// Contents of the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudSaverConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_folder: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub whitelist: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

/// Get the global CloudSaver directory (`~/.cloudsaver/`).
#[must_use]
pub fn global_cloudsaver_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".cloudsaver"))
}

/// Resolve the config file path.
///
/// Priority: explicit path (`--config` / `CLOUDSAVER_CONFIG`), then
/// `~/.cloudsaver/config.json`.
///
/// # Errors
///
/// Returns a config error if no explicit path is given and the home
/// directory cannot be determined.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    global_cloudsaver_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load the config file. A missing file yields the default config.
///
/// # Errors
///
/// Returns a config error if the file exists but cannot be read or parsed.
pub fn load_config(explicit: Option<&Path>) -> Result<CloudSaverConfig> {
    let path = config_path(explicit)?;

    if !path.exists() {
        return Ok(CloudSaverConfig::default());
    }

    let content = fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {e}", path.display())))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {e}", path.display())))
}

/// Resolve the local sync folder: flag/env > config file.
///
/// # Errors
///
/// Returns `InvalidArgument` when neither source provides a folder.
pub fn resolve_local_folder(explicit: Option<&Path>, config: &CloudSaverConfig) -> Result<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.local_folder.clone())
        .ok_or_else(|| {
            Error::InvalidArgument(
                "no local folder given (use --local-folder or CLOUDSAVER_LOCAL_FOLDER)".into(),
            )
        })
}

/// Resolve the remote root folder ID: flag/env > config file.
///
/// # Errors
///
/// Returns `InvalidArgument` when neither source provides a non-empty ID.
pub fn resolve_folder_id(explicit: Option<&str>, config: &CloudSaverConfig) -> Result<String> {
    non_empty(explicit)
        .or_else(|| non_empty(config.folder_id.as_deref()))
        .ok_or_else(|| {
            Error::InvalidArgument(
                "no remote folder ID given (use --folder-id or CLOUDSAVER_FOLDER_ID)".into(),
            )
        })
}

/// Resolve the access token: flag/env > config file.
///
/// # Errors
///
/// Returns `MissingCredentials` when no source provides a token.
pub fn resolve_token(explicit: Option<&str>, config: &CloudSaverConfig) -> Result<String> {
    non_empty(explicit)
        .or_else(|| non_empty(config.access_token.as_deref()))
        .ok_or(Error::MissingCredentials)
}

/// Resolve the whitelist: flags replace the config file list entirely.
#[must_use]
pub fn resolve_whitelist(explicit: &[String], config: &CloudSaverConfig) -> Vec<String> {
    if explicit.is_empty() {
        config.whitelist.clone()
    } else {
        explicit.to_vec()
    }
}

/// Resolve the job concurrency: flag > config file > default.
///
/// # Errors
///
/// Returns `InvalidArgument` for a concurrency of zero.
pub fn resolve_concurrency(explicit: Option<usize>, config: &CloudSaverConfig) -> Result<usize> {
    match explicit.or(config.concurrency).unwrap_or(DEFAULT_CONCURRENCY) {
        0 => Err(Error::InvalidArgument("concurrency must be at least 1".into())),
        n => Ok(n),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_config() -> CloudSaverConfig {
        CloudSaverConfig {
            local_folder: Some(PathBuf::from("/from/file")),
            folder_id: Some("file-folder".into()),
            access_token: Some("file-token".into()),
            whitelist: vec!["/docs".into()],
            concurrency: Some(4),
        }
    }

    #[test]
    fn test_missing_file_yields_default() {
        let dir = TempDir::new().unwrap();
        let config = load_config(Some(&dir.path().join("absent.json"))).unwrap();
        assert_eq!(config, CloudSaverConfig::default());
    }

    #[test]
    fn test_load_camel_case_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"localFolder": "/saves", "folderId": "abc", "whitelist": ["/docs/report.pdf"]}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.local_folder, Some(PathBuf::from("/saves")));
        assert_eq!(config.folder_id.as_deref(), Some("abc"));
        assert_eq!(config.whitelist, vec!["/docs/report.pdf".to_string()]);
        assert!(config.access_token.is_none());
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_explicit_values_win_over_file() {
        let config = file_config();

        assert_eq!(
            resolve_local_folder(Some(Path::new("/flag")), &config).unwrap(),
            PathBuf::from("/flag")
        );
        assert_eq!(resolve_folder_id(Some("flag-id"), &config).unwrap(), "flag-id");
        assert_eq!(resolve_token(Some("flag-token"), &config).unwrap(), "flag-token");
        assert_eq!(resolve_whitelist(&["/x".into()], &config), vec!["/x".to_string()]);
        assert_eq!(resolve_concurrency(Some(2), &config).unwrap(), 2);
    }

    #[test]
    fn test_file_values_fill_gaps() {
        let config = file_config();

        assert_eq!(
            resolve_local_folder(None, &config).unwrap(),
            PathBuf::from("/from/file")
        );
        assert_eq!(resolve_folder_id(Some("  "), &config).unwrap(), "file-folder");
        assert_eq!(resolve_token(None, &config).unwrap(), "file-token");
        assert_eq!(resolve_whitelist(&[], &config), vec!["/docs".to_string()]);
        assert_eq!(resolve_concurrency(None, &config).unwrap(), 4);
    }

    #[test]
    fn test_defaults_and_missing_values() {
        let config = CloudSaverConfig::default();

        assert_eq!(resolve_concurrency(None, &config).unwrap(), DEFAULT_CONCURRENCY);
        assert!(resolve_concurrency(Some(0), &config).is_err());
        assert!(matches!(resolve_token(None, &config), Err(Error::MissingCredentials)));
        assert!(matches!(
            resolve_folder_id(None, &config),
            Err(Error::InvalidArgument(_))
        ));
        assert!(resolve_local_folder(None, &config).is_err());
        assert!(resolve_whitelist(&[], &config).is_empty());
    }
}
