//! Configuration loading.
//!
//! The builder reads a single optional `config.toml` from its config
//! directory. A missing file means defaults; an unreadable or invalid one is
//! logged as a warning and also means defaults.

use std::io;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use tracing::{debug, warn};

use formflow_types::config::BuilderConfig;

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "FORMFLOW_CONFIG_DIR";

/// Environment variable holding the backend API token.
pub const API_TOKEN_ENV: &str = "FORMFLOW_API_TOKEN";

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Read `{config_dir}/config.toml` into a [`BuilderConfig`].
pub async fn load_builder_config(config_dir: &Path) -> BuilderConfig {
    let path = config_dir.join(CONFIG_FILE_NAME);

    let text = match read_if_present(&path).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            debug!(path = %path.display(), "No config file, using built-in settings");
            return BuilderConfig::default();
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Config file unreadable, using built-in settings");
            return BuilderConfig::default();
        }
    };

    toml::from_str(&text).unwrap_or_else(|err: toml::de::Error| {
        warn!(
            path = %path.display(),
            error = %err.message(),
            "Config file is not valid, using built-in settings"
        );
        BuilderConfig::default()
    })
}

/// `Ok(None)` when the file does not exist.
async fn read_if_present(path: &Path) -> io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Resolve the config directory.
///
/// Priority:
/// 1. `FORMFLOW_CONFIG_DIR` environment variable
/// 2. `~/.formflow`
pub fn resolve_config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".formflow");
    }

    // Last resort: current directory
    PathBuf::from(".formflow")
}

/// The API token from `FORMFLOW_API_TOKEN`, if set and non-empty.
pub fn resolve_api_token() -> Option<SecretString> {
    std::env::var(API_TOKEN_ENV)
        .ok()
        .filter(|token| !token.trim().is_empty())
        .map(SecretString::from)
}
