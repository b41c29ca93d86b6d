//! Configuration types for formflow.
//!
//! `BuilderConfig` represents the top-level `config.toml`: where the
//! form-version API lives and how the builder treats transitions it cannot
//! send.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
///
/// Loaded from `~/.formflow/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuilderConfig {
    #[serde(default)]
    pub api: ApiConfig,

    /// What to do with transitions that reference unsaved or deleted stages
    /// when building a save request.
    #[serde(default)]
    pub transition_policy: TransitionPolicy,
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Policy for transitions that cannot be sent to the backend because an
/// endpoint stage is unsaved or no longer exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Leave the transition out of the request, log it, and save the rest.
    #[default]
    DropAndWarn,
    /// Refuse to build the request and report every unsendable transition.
    Reject,
}
