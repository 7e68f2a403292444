//! Configuration loading and validation

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use yangbridge_core::RelationshipPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// NGSI-LD context broker URI
    #[serde(default = "default_broker_uri")]
    pub uri: String,
    /// JSON-LD context catalog URI, sent in the Link header
    #[serde(default = "default_context_uri")]
    pub context_uri: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            uri: default_broker_uri(),
            context_uri: default_context_uri(),
        }
    }
}

fn default_broker_uri() -> String {
    "http://localhost:9090".to_string()
}

fn default_context_uri() -> String {
    "http://context-catalog:8080/context.jsonld".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// YANG catalog API base URI
    #[serde(default = "default_catalog_uri")]
    pub uri: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            uri: default_catalog_uri(),
        }
    }
}

fn default_catalog_uri() -> String {
    yangbridge_client::catalog::DEFAULT_CATALOG_URL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Number of module records per upsert batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// One-sided or two-sided dependency graph edges
    #[serde(default)]
    pub relationship_policy: RelationshipPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            relationship_policy: RelationshipPolicy::default(),
        }
    }
}

fn default_batch_size() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Bind address for the registry API server
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}
