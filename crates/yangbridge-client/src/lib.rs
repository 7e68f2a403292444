//! Yangbridge Client - HTTP collaborators
//!
//! Two thin clients built on reqwest:
//! - [`YangCatalogClient`] pulls full catalog snapshots, retrying transient
//!   failures with exponential backoff
//! - [`ContextBrokerClient`] pushes entities to an NGSI-LD context broker
//!   (single create and batch upsert)

pub mod broker;
pub mod catalog;

pub use broker::{ContextBrokerClient, UpsertMode};
pub use catalog::YangCatalogClient;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} returned status {status}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("{url} still failing after {attempts} attempts")]
    RetriesExhausted { url: String, attempts: u32 },
}
