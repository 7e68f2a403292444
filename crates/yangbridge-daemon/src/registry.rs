//! Platform registration
//!
//! Turns one registration request (platform metadata plus the capability
//! documents its NETCONF/gNMI sessions reported) into linked entities:
//! Platform, one Protocol per declared management protocol, Credentials,
//! Module entities for every advertised YANG module, and a ModuleSet tying
//! them together with multi-instance `hasModule` relationships. Session
//! establishment itself happens outside this service; only the structured
//! capability records arrive here.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use yangbridge_client::UpsertMode;
use yangbridge_core::{canonical_id, Entity, EntityKind, Property, Relationship};

use crate::pipeline::{batches, EntitySink};

/// Known organization namespaces, matched by substring against a module's
/// namespace URI.
const ORG_NAMESPACES: &[(&str, &[&str])] = &[
    ("arista", &["http://arista.com", "urn:aristanetworks"]),
    ("cisco", &["http://cisco.com"]),
    ("ietf", &["urn:ietf:params:xml:ns"]),
    ("huawei", &["urn:huawei"]),
    ("openconfig", &["http://openconfig.net"]),
    ("opendaylight", &["urn:opendaylight"]),
];

/// Derive the owning organization from a module namespace URI.
pub fn organization_for_namespace(namespace: &str) -> Option<&'static str> {
    ORG_NAMESPACES
        .iter()
        .find(|(_, patterns)| patterns.iter().any(|p| namespace.contains(p)))
        .map(|(org, _)| *org)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub username: String,
    pub password: String,
}

/// A YANG module advertised in a session's capability list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleCapability {
    pub name: String,
    #[serde(default)]
    pub revision: Option<String>,
    pub namespace: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub deviations: Vec<String>,
}

/// Structured capability report from one management session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapabilityReport {
    /// Bare protocol capability URIs (non-module capabilities)
    #[serde(default)]
    pub protocol_capabilities: Vec<String>,
    /// Advertised YANG modules
    #[serde(default)]
    pub modules: Vec<ModuleCapability>,
    /// gNMI supported encodings, when applicable
    #[serde(default)]
    pub encodings: Option<Vec<String>>,
    /// Protocol version string, when applicable
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolRegistration {
    pub address: String,
    pub port: u16,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub capabilities: CapabilityReport,
}

/// Registration request for one network platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub platform_id: String,
    pub platform_name: String,
    pub vendor: String,
    pub software_version: String,
    #[serde(default)]
    pub software_flavor: Option<String>,
    #[serde(default)]
    pub os_version: Option<String>,
    #[serde(default)]
    pub os_type: Option<String>,
    #[serde(default)]
    pub netconf: Option<ProtocolRegistration>,
    #[serde(default)]
    pub gnmi: Option<ProtocolRegistration>,
}

/// Outcome of one platform registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSummary {
    pub platform_id: String,
    pub entities_submitted: usize,
    pub modules: usize,
}

/// Register a platform: build its entity graph and upsert it through the
/// sink in dependency order (platform, protocols, credentials, modules,
/// module set).
pub async fn register_platform<S: EntitySink>(
    sink: &S,
    registration: &Registration,
    batch_size: usize,
) -> Result<RegistrationSummary> {
    if registration.netconf.is_none() && registration.gnmi.is_none() {
        bail!("Registration must declare at least one management protocol");
    }

    let platform = build_platform(registration)?;
    info!(id = %platform.id(), "Registering platform");
    sink.upsert_batch(std::slice::from_ref(&platform), UpsertMode::Update)
        .await
        .context("Failed to submit platform entity")?;
    let mut submitted = 1;

    let mut module_entities = Vec::new();
    let mut has_module = Vec::new();

    for (protocol_name, protocol) in [
        ("netconf", registration.netconf.as_ref()),
        ("gnmi", registration.gnmi.as_ref()),
    ] {
        let Some(protocol) = protocol else { continue };

        let protocol_entity =
            build_protocol(&registration.platform_id, protocol_name, protocol, &platform)?;
        let credentials_entity = build_credentials(
            &registration.platform_id,
            &protocol.credentials,
            &protocol_entity,
        )?;
        info!(id = %protocol_entity.id(), "Registering protocol");
        sink.upsert_batch(
            &[protocol_entity, credentials_entity],
            UpsertMode::Update,
        )
        .await
        .context("Failed to submit protocol entities")?;
        submitted += 2;

        for capability in &protocol.capabilities.modules {
            let (module_entity, relationship) = build_module(capability)?;
            // The same module may be advertised over both protocols;
            // one entity and one relationship instance is enough.
            if !has_module
                .iter()
                .any(|r: &Relationship| r.object() == relationship.object())
            {
                module_entities.push(module_entity);
                has_module.push(relationship);
            }
        }
    }

    let module_count = module_entities.len();
    for (_, chunk) in batches(&module_entities, batch_size) {
        sink.upsert_batch(chunk, UpsertMode::Update)
            .await
            .context("Failed to submit module entities")?;
        submitted += chunk.len();
    }

    let module_set = build_module_set(&registration.platform_id, &platform, has_module)?;
    info!(id = %module_set.id(), modules = module_count, "Registering module set");
    sink.upsert_batch(std::slice::from_ref(&module_set), UpsertMode::Update)
        .await
        .context("Failed to submit module set entity")?;
    submitted += 1;

    Ok(RegistrationSummary {
        platform_id: registration.platform_id.clone(),
        entities_submitted: submitted,
        modules: module_count,
    })
}

fn build_platform(registration: &Registration) -> Result<Entity> {
    let entity = Entity::builder(
        EntityKind::Platform,
        format!("urn:ngsi-ld:Platform:{}", registration.platform_id),
    )
    .property("name", Property::new(registration.platform_name.as_str()))?
    .property("vendor", Property::new(registration.vendor.as_str()))?
    .property(
        "softwareVersion",
        Property::new(registration.software_version.as_str()),
    )?
    .maybe_property(
        "softwareFlavor",
        registration.software_flavor.as_deref().map(Property::new),
    )?
    .maybe_property(
        "osVersion",
        registration.os_version.as_deref().map(Property::new),
    )?
    .maybe_property(
        "osType",
        registration.os_type.as_deref().map(Property::new),
    )?
    .build()?;
    Ok(entity)
}

fn build_protocol(
    platform_id: &str,
    protocol_name: &str,
    protocol: &ProtocolRegistration,
    platform: &Entity,
) -> Result<Entity> {
    let mut builder = Entity::builder(
        EntityKind::Protocol,
        format!("urn:ngsi-ld:Protocol:{platform_id}:{protocol_name}"),
    )
    .property("name", Property::new(protocol_name))?
    .property("address", Property::new(protocol.address.as_str()))?
    .property("port", Property::new(protocol.port))?
    .relationship("supportedBy", Relationship::new(platform.id()))?;

    let capabilities = &protocol.capabilities;
    if !capabilities.protocol_capabilities.is_empty() {
        builder = builder.property(
            "capabilities",
            Property::new(json!(capabilities.protocol_capabilities)),
        )?;
    }
    if let Some(encodings) = &capabilities.encodings {
        builder = builder.property("encodingFormats", Property::new(json!(encodings)))?;
    }
    if let Some(version) = &capabilities.version {
        builder = builder.property("version", Property::new(version.as_str()))?;
    }
    Ok(builder.build()?)
}

fn build_credentials(
    platform_id: &str,
    credentials: &CredentialsConfig,
    protocol: &Entity,
) -> Result<Entity> {
    let entity = Entity::builder(
        EntityKind::Credentials,
        format!("urn:ngsi-ld:Credentials:{platform_id}"),
    )
    .property("username", Property::new(credentials.username.as_str()))?
    .property("password", Property::new(credentials.password.as_str()))?
    .relationship("hasProtocol", Relationship::new(protocol.id()))?
    .build()?;
    Ok(entity)
}

/// Build one advertised module's entity and its `hasModule` relationship
/// instance for the module set.
fn build_module(capability: &ModuleCapability) -> Result<(Entity, Relationship)> {
    let organization =
        organization_for_namespace(&capability.namespace).unwrap_or(yangbridge_core::resolve::UNKNOWN);
    let revision = capability
        .revision
        .as_deref()
        .unwrap_or(yangbridge_core::resolve::UNKNOWN);
    let id = canonical_id(EntityKind::Module, &capability.name, revision, organization);

    let entity = Entity::builder(EntityKind::Module, id.clone())
        .property("name", Property::new(capability.name.as_str()))?
        .property("revision", Property::new(revision))?
        .property("organization", Property::new(organization))?
        .property("namespace", Property::new(capability.namespace.as_str()))?
        .build()?;

    let mut relationship = Relationship::tagged(id);
    if !capability.features.is_empty() {
        relationship =
            relationship.with_annotation("feature", Property::new(json!(capability.features)));
    }
    if !capability.deviations.is_empty() {
        relationship =
            relationship.with_annotation("deviation", Property::new(json!(capability.deviations)));
    }
    Ok((entity, relationship))
}

fn build_module_set(
    platform_id: &str,
    platform: &Entity,
    has_module: Vec<Relationship>,
) -> Result<Entity> {
    let mut builder = Entity::builder(
        EntityKind::ModuleSet,
        format!("urn:ngsi-ld:ModuleSet:{platform_id}:default"),
    )
    .property("name", Property::new("default"))?
    .relationship("definedBy", Relationship::new(platform.id()))?;
    for relationship in has_module {
        builder = builder.relationship("hasModule", relationship)?;
    }
    Ok(builder.build()?)
}
