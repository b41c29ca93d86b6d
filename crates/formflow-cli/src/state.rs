//! Application state wiring config, the backend client and the draft store.
//!
//! `AppState` pins the generic `SaveOrchestrator` to the concrete HTTP
//! implementation of `FormVersionApi`.

use anyhow::Context;
use tracing::debug;

use formflow_core::draft::DraftStore;
use formflow_core::service::SaveOrchestrator;
use formflow_infra::config::{load_builder_config, resolve_api_token, resolve_config_dir};
use formflow_infra::http::HttpFormVersionApi;
use formflow_types::config::{BuilderConfig, TransitionPolicy};

pub type ConcreteOrchestrator = SaveOrchestrator<HttpFormVersionApi>;

pub struct AppState {
    pub config: BuilderConfig,
    pub orchestrator: ConcreteOrchestrator,
}

impl AppState {
    /// Load config and wire the orchestrator. Command-line overrides win
    /// over `config.toml`.
    pub async fn init(
        api_url: Option<String>,
        policy: Option<TransitionPolicy>,
    ) -> anyhow::Result<Self> {
        let config_dir = resolve_config_dir();
        let mut config = load_builder_config(&config_dir).await;

        if let Some(url) = api_url {
            config.api.base_url = url;
        }
        if let Some(policy) = policy {
            config.transition_policy = policy;
        }
        debug!(
            config_dir = %config_dir.display(),
            base_url = %config.api.base_url,
            policy = ?config.transition_policy,
            "Resolved configuration"
        );

        let api = HttpFormVersionApi::new(&config.api, resolve_api_token())
            .context("failed to create HTTP client")?;
        let orchestrator = SaveOrchestrator::new(api, DraftStore::create(), config.transition_policy);

        Ok(Self {
            config,
            orchestrator,
        })
    }

    pub fn store(&self) -> &DraftStore {
        self.orchestrator.store()
    }
}
