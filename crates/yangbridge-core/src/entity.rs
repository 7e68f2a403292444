//! NGSI-LD entity model
//!
//! Entities are constructed through [`EntityBuilder`], which validates
//! property and relationship names against a static schema per entity kind,
//! and serialize directly to the NGSI-LD wire shape:
//! `{id, type, <prop>: {"type": "Property", "value": ...},
//! <rel>: [{"type": "Relationship", "object": ..., "datasetId": ...}]}`.
//! Entities are never mutated after construction.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::catalog::ModuleType;

#[derive(Debug, Error, PartialEq)]
pub enum EntityError {
    #[error("Property '{name}' is not part of the {kind} schema")]
    UnknownProperty { kind: &'static str, name: String },
    #[error("Relationship '{name}' is not part of the {kind} schema")]
    UnknownRelationship { kind: &'static str, name: String },
    #[error("{kind} entity {id} is missing required property '{name}'")]
    MissingProperty {
        kind: &'static str,
        id: String,
        name: &'static str,
    },
}

/// Entity kinds understood by the broker mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Module,
    Submodule,
    Platform,
    Protocol,
    Credentials,
    ModuleSet,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "Module",
            Self::Submodule => "Submodule",
            Self::Platform => "Platform",
            Self::Protocol => "Protocol",
            Self::Credentials => "Credentials",
            Self::ModuleSet => "ModuleSet",
        }
    }

    fn allowed_properties(&self) -> &'static [&'static str] {
        match self {
            Self::Module | Self::Submodule => &[
                "name",
                "revision",
                "organization",
                "namespace",
                "ietfWg",
                "schema",
                "generatedFrom",
                "maturityLevel",
                "documentName",
                "authorEmail",
                "reference",
                "moduleClassification",
                "compilationStatus",
                "compilationResult",
                "prefix",
                "yangVersion",
                "description",
                "contact",
                "belongsTo",
                "treeType",
                "yangTree",
                "expires",
                "expired",
                "semanticVersion",
                "derivedSemanticVersion",
            ],
            Self::Platform => &[
                "name",
                "vendor",
                "softwareVersion",
                "softwareFlavor",
                "osVersion",
                "osType",
            ],
            Self::Protocol => &[
                "name",
                "address",
                "port",
                "capabilities",
                "encodingFormats",
                "version",
            ],
            Self::Credentials => &["username", "password"],
            Self::ModuleSet => &["name"],
        }
    }

    fn allowed_relationships(&self) -> &'static [&'static str] {
        match self {
            Self::Module | Self::Submodule => &[
                "hasDependency",
                "hasDependent",
                "includesSubmodule",
                "isDependencyOf",
                "isDependentOf",
                "isSubmoduleOf",
            ],
            Self::Platform => &["hasProtocol", "hasModuleSet"],
            Self::Protocol => &["hasCredentials", "supportedBy"],
            Self::Credentials => &["hasProtocol"],
            Self::ModuleSet => &["hasModule", "definedBy"],
        }
    }

    fn required_properties(&self) -> &'static [&'static str] {
        match self {
            Self::Module | Self::Submodule => &["name", "revision"],
            Self::Platform => &["name", "vendor", "softwareVersion"],
            Self::Protocol => &["name", "address", "port"],
            Self::Credentials => &["username", "password"],
            Self::ModuleSet => &["name"],
        }
    }
}

impl From<ModuleType> for EntityKind {
    fn from(module_type: ModuleType) -> Self {
        match module_type {
            ModuleType::Module => Self::Module,
            ModuleType::Submodule => Self::Submodule,
        }
    }
}

/// A property instance: a value wrapped for the broker, with room for
/// provenance metadata but no defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    value: Value,
}

impl Property {
    pub fn new(value: impl Into<Value>) -> Self {
        Self { value: value.into() }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl Serialize for Property {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("type", "Property")?;
        map.serialize_entry("value", &self.value)?;
        map.end()
    }
}

/// A relationship instance pointing at another entity.
///
/// `dataset_id` is the multi-instance discriminator: instances of the same
/// relationship name with distinct dataset ids coexist on one entity
/// instead of overwriting each other in the broker.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    object: String,
    dataset_id: Option<String>,
    annotations: BTreeMap<&'static str, Property>,
}

impl Relationship {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            dataset_id: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Multi-instance relationship tagged with its own target id
    pub fn tagged(object: impl Into<String>) -> Self {
        let object = object.into();
        Self {
            dataset_id: Some(object.clone()),
            object,
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_dataset_id(mut self, dataset_id: impl Into<String>) -> Self {
        self.dataset_id = Some(dataset_id.into());
        self
    }

    /// Attach an annotation property to this relationship instance
    /// (e.g. feature/deviation lists on a `hasModule` edge).
    pub fn with_annotation(mut self, name: &'static str, property: Property) -> Self {
        self.annotations.insert(name, property);
        self
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn dataset_id(&self) -> Option<&str> {
        self.dataset_id.as_deref()
    }
}

impl Serialize for Relationship {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("type", "Relationship")?;
        map.serialize_entry("object", &self.object)?;
        if let Some(dataset_id) = &self.dataset_id {
            map.serialize_entry("datasetId", dataset_id)?;
        }
        for (name, property) in &self.annotations {
            map.serialize_entry(name, property)?;
        }
        map.end()
    }
}

/// An NGSI-LD entity ready for submission to the broker
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: String,
    kind: EntityKind,
    properties: BTreeMap<String, Property>,
    relationships: BTreeMap<String, Vec<Relationship>>,
}

impl Entity {
    pub fn builder(kind: EntityKind, id: impl Into<String>) -> EntityBuilder {
        EntityBuilder {
            kind,
            id: id.into(),
            properties: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.get(name)
    }

    pub fn relationship(&self, name: &str) -> Option<&[Relationship]> {
        self.relationships.get(name).map(Vec::as_slice)
    }

    pub fn has_relationships(&self) -> bool {
        !self.relationships.is_empty()
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("type", self.kind.as_str())?;
        for (name, property) in &self.properties {
            map.serialize_entry(name, property)?;
        }
        for (name, relationships) in &self.relationships {
            map.serialize_entry(name, relationships)?;
        }
        map.end()
    }
}

/// Builder validating sparse property/relationship mappings against the
/// static schema for the target entity kind.
#[derive(Debug)]
pub struct EntityBuilder {
    kind: EntityKind,
    id: String,
    properties: BTreeMap<String, Property>,
    relationships: BTreeMap<String, Vec<Relationship>>,
}

impl EntityBuilder {
    pub fn property(
        mut self,
        name: &str,
        property: Property,
    ) -> Result<Self, EntityError> {
        if !self.kind.allowed_properties().contains(&name) {
            return Err(EntityError::UnknownProperty {
                kind: self.kind.as_str(),
                name: name.to_string(),
            });
        }
        self.properties.insert(name.to_string(), property);
        Ok(self)
    }

    /// Include a property only when the source field is populated;
    /// `None` leaves the mapping sparse.
    pub fn maybe_property(
        self,
        name: &str,
        property: Option<Property>,
    ) -> Result<Self, EntityError> {
        match property {
            Some(property) => self.property(name, property),
            None => Ok(self),
        }
    }

    pub fn relationship(
        mut self,
        name: &str,
        relationship: Relationship,
    ) -> Result<Self, EntityError> {
        if !self.kind.allowed_relationships().contains(&name) {
            return Err(EntityError::UnknownRelationship {
                kind: self.kind.as_str(),
                name: name.to_string(),
            });
        }
        self.relationships
            .entry(name.to_string())
            .or_default()
            .push(relationship);
        Ok(self)
    }

    pub fn relationships(
        mut self,
        name: &str,
        instances: Vec<Relationship>,
    ) -> Result<Self, EntityError> {
        for instance in instances {
            self = self.relationship(name, instance)?;
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Entity, EntityError> {
        for name in self.kind.required_properties() {
            if !self.properties.contains_key(*name) {
                return Err(EntityError::MissingProperty {
                    kind: self.kind.as_str(),
                    id: self.id,
                    name,
                });
            }
        }
        Ok(Entity {
            id: self.id,
            kind: self.kind,
            properties: self.properties,
            relationships: self.relationships,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn module_entity() -> Entity {
        Entity::builder(EntityKind::Module, "urn:ngsi-ld:Module:foo:2020-01-01:ietf")
            .property("name", Property::new("foo"))
            .unwrap()
            .property("revision", Property::new("2020-01-01"))
            .unwrap()
            .relationship(
                "hasDependency",
                Relationship::tagged("urn:ngsi-ld:Module:bar:unknown:unknown"),
            )
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(module_entity()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "urn:ngsi-ld:Module:foo:2020-01-01:ietf",
                "type": "Module",
                "name": {"type": "Property", "value": "foo"},
                "revision": {"type": "Property", "value": "2020-01-01"},
                "hasDependency": [{
                    "type": "Relationship",
                    "object": "urn:ngsi-ld:Module:bar:unknown:unknown",
                    "datasetId": "urn:ngsi-ld:Module:bar:unknown:unknown"
                }]
            })
        );
    }

    #[test]
    fn test_unknown_property_rejected() {
        let err = Entity::builder(EntityKind::Credentials, "urn:ngsi-ld:Credentials:x")
            .property("contact", Property::new("nobody"))
            .unwrap_err();
        assert_eq!(
            err,
            EntityError::UnknownProperty {
                kind: "Credentials",
                name: "contact".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_relationship_rejected() {
        let err = Entity::builder(EntityKind::Module, "urn:ngsi-ld:Module:x")
            .relationship("hasProtocol", Relationship::new("urn:ngsi-ld:Protocol:x"))
            .unwrap_err();
        assert!(matches!(err, EntityError::UnknownRelationship { .. }));
    }

    #[test]
    fn test_missing_required_property() {
        let err = Entity::builder(EntityKind::Module, "urn:ngsi-ld:Module:x")
            .property("name", Property::new("x"))
            .unwrap()
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            EntityError::MissingProperty { name: "revision", .. }
        ));
    }

    #[test]
    fn test_relationship_annotations() {
        let relationship = Relationship::tagged("urn:ngsi-ld:Module:m:r:o")
            .with_annotation("feature", Property::new(json!(["candidate"])));
        let value = serde_json::to_value(&relationship).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "Relationship",
                "object": "urn:ngsi-ld:Module:m:r:o",
                "datasetId": "urn:ngsi-ld:Module:m:r:o",
                "feature": {"type": "Property", "value": ["candidate"]}
            })
        );
    }

    #[test]
    fn test_entity_without_relationships_omits_keys() {
        let entity = Entity::builder(EntityKind::ModuleSet, "urn:ngsi-ld:ModuleSet:p:default")
            .property("name", Property::new("default"))
            .unwrap()
            .build()
            .unwrap();
        assert!(!entity.has_relationships());
        let value = serde_json::to_value(entity).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["id", "name", "type"]);
    }
}
