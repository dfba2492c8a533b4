//! Shared handler state.

use std::sync::Arc;

use herald_core::auth::OAuth1Token;
use herald_core::{
    completion_provider, open_store, AuthStore, CompletionProvider, ContentGenerator,
    HeraldConfig, Result, TwitterExecutor, TwitterOAuth, VendorPoster,
};

/// Everything a request handler needs; cheap to clone
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuthStore>,
    pub oauth: Arc<TwitterOAuth>,
    pub generator: Arc<ContentGenerator>,
    pub poster: Arc<dyn VendorPoster>,
    /// Pre-provisioned OAuth 1.0a token used when a request has no stored token
    pub static_oauth1: Option<OAuth1Token>,
    pub frontend_url: String,
    pub client_id_configured: bool,
}

impl AppState {
    /// Wire the state from explicit parts (tests inject their own store and provider)
    pub fn new(
        config: &HeraldConfig,
        client: reqwest::Client,
        store: Arc<dyn AuthStore>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        let oauth = TwitterOAuth::new(config.twitter.clone(), client.clone(), store.clone());
        let poster = TwitterExecutor::new(client, config.twitter.api_base.clone());

        Self {
            store,
            oauth: Arc::new(oauth),
            generator: Arc::new(ContentGenerator::new(completion)),
            poster: Arc::new(poster),
            static_oauth1: config.twitter.static_oauth1_token(),
            frontend_url: config.server.frontend_url.clone(),
            client_id_configured: config.twitter.client_id.is_some(),
        }
    }

    /// Production wiring: configured store backend and completion provider
    pub fn from_config(config: &HeraldConfig) -> Result<Self> {
        let client = config.http.build_client()?;
        let store = open_store(&config.store)?;
        let completion = completion_provider(client.clone(), config.llm.clone());
        Ok(Self::new(config, client, store, completion))
    }
}
