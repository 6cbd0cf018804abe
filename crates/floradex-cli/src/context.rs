//! Shared wiring for commands: store, provider clients, and the alert
//! dispatcher.

use std::sync::Arc;

use floradex_core::{
    AlertConfig, AlertDispatcher, PermapeopleAdapter, ProviderClient, ProviderId, ProviderPolicy,
    ReqwestHttpClient, SyncConfig, SyncEngine, TrefleAdapter, WebhookNotifier,
};
use floradex_store::Store;

use crate::error::CliError;

pub struct AppContext {
    pub store: Store,
    clients: Vec<Arc<ProviderClient>>,
}

impl AppContext {
    pub fn build() -> Result<Self, CliError> {
        let store = Store::open_default()?;
        let http = Arc::new(ReqwestHttpClient::new());

        let clients = ProviderId::ALL
            .into_iter()
            .map(|provider| {
                let policy = ProviderPolicy::default_for(provider);
                let adapter: Arc<dyn floradex_core::ProviderAdapter> = match provider {
                    ProviderId::Trefle => Arc::new(TrefleAdapter::default()),
                    ProviderId::Permapeople => Arc::new(PermapeopleAdapter::default()),
                };
                Arc::new(ProviderClient::new(adapter, http.clone(), &policy))
            })
            .collect();

        Ok(Self { store, clients })
    }

    pub fn clients(&self) -> &[Arc<ProviderClient>] {
        &self.clients
    }

    pub fn client(&self, provider: ProviderId) -> Arc<ProviderClient> {
        self.clients
            .iter()
            .find(|client| client.provider() == provider)
            .cloned()
            .expect("a client exists for every provider")
    }

    pub fn engine(&self, provider: ProviderId, config: SyncConfig) -> SyncEngine {
        SyncEngine::new(
            self.client(provider),
            Arc::new(self.store.clone()),
            Arc::new(self.store.clone()),
            config,
        )
    }

    /// Dispatcher with the durable alert log and any configured channels.
    pub fn dispatcher(&self) -> Arc<AlertDispatcher> {
        let config = AlertConfig {
            email_to: non_empty_env("FLORADEX_ALERT_EMAIL"),
            webhook_url: non_empty_env("FLORADEX_ALERT_WEBHOOK"),
            ..AlertConfig::default()
        };

        let notifier = Arc::new(WebhookNotifier::new(Arc::new(ReqwestHttpClient::new())));

        Arc::new(
            AlertDispatcher::new(config)
                .with_notifier(notifier)
                .with_sink(Arc::new(self.store.clone())),
        )
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}
