//! Shared application state for the registry API

use anyhow::{Context, Result};
use yangbridge_client::ContextBrokerClient;

use crate::config::Config;

/// State shared by all API handlers
pub struct AppState {
    pub config: Config,
    pub broker: ContextBrokerClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let broker = ContextBrokerClient::new(&config.broker.uri, &config.broker.context_uri)
            .context("Failed to create context broker client")?;
        Ok(Self { config, broker })
    }
}
