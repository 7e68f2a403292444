//! NGSI-LD context broker client
//!
//! Supports single entity creation and batch upsert. Every request carries
//! the JSON-LD context catalog URI in the `Link` header, as the broker
//! expects for `application/json` payloads. Submission calls do not retry;
//! the pipeline treats a failed batch as lost and moves on.

use std::time::Duration;
use tracing::debug;

use yangbridge_core::Entity;

use crate::ClientError;

/// Batch upsert behavior for entities that already exist in the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertMode {
    /// Merge attributes into the existing entity
    Update,
    /// Replace the existing entity wholesale
    Replace,
}

impl UpsertMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Update => "update",
            Self::Replace => "replace",
        }
    }
}

/// Client for an NGSI-LD context broker
pub struct ContextBrokerClient {
    client: reqwest::Client,
    base_url: String,
    context: String,
}

impl ContextBrokerClient {
    pub fn new(
        base_url: impl Into<String>,
        context: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            context: context.into(),
        })
    }

    /// Create a single entity.
    pub async fn create_entity(&self, entity: &Entity) -> Result<(), ClientError> {
        let url = format!("{}/ngsi-ld/v1/entities", self.base_url);
        debug!(id = %entity.id(), "Creating entity");
        let response = self
            .client
            .post(&url)
            .header("Link", self.link_header())
            .json(entity)
            .send()
            .await?;
        self.check(response, &url).await
    }

    /// Upsert a batch of entities in one call.
    pub async fn upsert_batch(
        &self,
        entities: &[Entity],
        mode: UpsertMode,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/ngsi-ld/v1/entityOperations/upsert?options={}",
            self.base_url,
            mode.as_str()
        );
        debug!(count = entities.len(), mode = mode.as_str(), "Upserting entity batch");
        let response = self
            .client
            .post(&url)
            .header("Link", self.link_header())
            .json(entities)
            .send()
            .await?;
        self.check(response, &url).await
    }

    fn link_header(&self) -> String {
        format!(
            "<{}>; rel=\"http://www.w3.org/ns/json-ld#context\"; type=\"application/ld+json\"",
            self.context
        )
    }

    async fn check(&self, response: reqwest::Response, url: &str) -> Result<(), ClientError> {
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ClientError::Status {
                status: response.status(),
                url: url.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_mode_strings() {
        assert_eq!(UpsertMode::Update.as_str(), "update");
        assert_eq!(UpsertMode::Replace.as_str(), "replace");
    }

    #[test]
    fn test_link_header_format() {
        let client = ContextBrokerClient::new(
            "http://localhost:9090/",
            "http://context-catalog:8080/context.jsonld",
        )
        .unwrap();
        assert_eq!(client.base_url, "http://localhost:9090");
        assert_eq!(
            client.link_header(),
            "<http://context-catalog:8080/context.jsonld>; \
             rel=\"http://www.w3.org/ns/json-ld#context\"; type=\"application/ld+json\""
        );
    }
}
