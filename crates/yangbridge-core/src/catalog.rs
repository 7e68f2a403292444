//! Wire model for YANG catalog snapshots
//!
//! The catalog service returns one large JSON document shaped
//! `{"yang-catalog:catalog": {"modules": {"module": [...]}}}`. Module
//! records use hyphenated field names on the wire; the serde model below
//! reproduces those names exactly.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse catalog record: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Catalog document has no module list")]
    MissingModuleList,
}

/// Whether a record describes a YANG module or submodule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleType {
    Module,
    Submodule,
}

impl Default for ModuleType {
    fn default() -> Self {
        Self::Module
    }
}

/// Top-level catalog document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(rename = "yang-catalog:catalog", alias = "catalog")]
    pub catalog: Catalog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub modules: ModuleList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleList {
    #[serde(default)]
    pub module: Vec<ModuleRecord>,
}

/// A reference to another module inside a record's dependency,
/// dependent or submodule list. Resolved against the [`ModuleIndex`]
/// at graph-build time, never persisted on its own.
///
/// [`ModuleIndex`]: crate::index::ModuleIndex
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// IETF-specific metadata block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IetfMeta {
    #[serde(default, rename = "ietf-wg", skip_serializing_if = "Option::is_none")]
    pub ietf_wg: Option<String>,
}

/// A raw module record as published by the catalog.
///
/// Immutable once loaded. `revision` is a `YYYY-MM-DD` string when the
/// catalog knows it; some records carry no revision at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleRecord {
    pub name: String,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub module_type: ModuleType,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub ietf: Option<IetfMeta>,
    #[serde(default)]
    pub generated_from: Option<String>,
    #[serde(default)]
    pub maturity_level: Option<String>,
    #[serde(default)]
    pub document_name: Option<String>,
    #[serde(default)]
    pub author_email: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub module_classification: Option<String>,
    #[serde(default)]
    pub compilation_status: Option<String>,
    #[serde(default)]
    pub compilation_result: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub yang_version: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub belongs_to: Option<String>,
    #[serde(default)]
    pub tree_type: Option<String>,
    #[serde(default)]
    pub yang_tree: Option<String>,
    #[serde(default)]
    pub expires: Option<String>,
    /// Either a boolean or the string "not-applicable" on the wire
    #[serde(default)]
    pub expired: Option<Value>,
    #[serde(default)]
    pub semantic_version: Option<String>,
    #[serde(default)]
    pub derived_semantic_version: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<DependencyReference>,
    #[serde(default)]
    pub dependents: Vec<DependencyReference>,
    #[serde(default)]
    pub submodule: Vec<DependencyReference>,
}

impl ModuleRecord {
    /// Deserialize one batch of raw records into typed records.
    ///
    /// Fails as a unit: a single malformed record poisons the whole
    /// batch, which the pipeline then skips.
    pub fn from_batch(raw: &[Value]) -> Result<Vec<ModuleRecord>, CatalogError> {
        raw.iter()
            .map(|value| serde_json::from_value(value.clone()).map_err(CatalogError::from))
            .collect()
    }
}

/// Extract the raw module array from an opaque catalog JSON document.
pub fn module_array(document: &Value) -> Result<&Vec<Value>, CatalogError> {
    let catalog = document
        .get("yang-catalog:catalog")
        .or_else(|| document.get("catalog"))
        .ok_or(CatalogError::MissingModuleList)?;
    catalog
        .get("modules")
        .and_then(|m| m.get("module"))
        .and_then(Value::as_array)
        .ok_or(CatalogError::MissingModuleList)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_wire_names() {
        let raw = json!({
            "name": "ietf-interfaces",
            "revision": "2018-02-20",
            "organization": "ietf",
            "module-type": "module",
            "namespace": "urn:ietf:params:xml:ns:yang:ietf-interfaces",
            "yang-version": "1.1",
            "maturity-level": "ratified",
            "derived-semantic-version": "3.0.0",
            "ietf": {"ietf-wg": "netmod"},
            "dependencies": [{"name": "ietf-yang-types", "revision": "2013-07-15"}]
        });

        let record: ModuleRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.name, "ietf-interfaces");
        assert_eq!(record.module_type, ModuleType::Module);
        assert_eq!(record.yang_version.as_deref(), Some("1.1"));
        assert_eq!(record.maturity_level.as_deref(), Some("ratified"));
        assert_eq!(record.derived_semantic_version.as_deref(), Some("3.0.0"));
        assert_eq!(
            record.ietf.unwrap().ietf_wg.as_deref(),
            Some("netmod")
        );
        assert_eq!(record.dependencies.len(), 1);
        assert_eq!(record.dependencies[0].name, "ietf-yang-types");
    }

    #[test]
    fn test_module_type_defaults_to_module() {
        let record: ModuleRecord =
            serde_json::from_value(json!({"name": "foo"})).unwrap();
        assert_eq!(record.module_type, ModuleType::Module);
    }

    #[test]
    fn test_document_accepts_both_catalog_keys() {
        let namespaced = json!({
            "yang-catalog:catalog": {"modules": {"module": [{"name": "a"}]}}
        });
        let plain = json!({
            "catalog": {"modules": {"module": [{"name": "a"}, {"name": "b"}]}}
        });

        let doc: CatalogDocument = serde_json::from_value(namespaced.clone()).unwrap();
        assert_eq!(doc.catalog.modules.module.len(), 1);
        let doc: CatalogDocument = serde_json::from_value(plain.clone()).unwrap();
        assert_eq!(doc.catalog.modules.module.len(), 2);

        assert_eq!(module_array(&namespaced).unwrap().len(), 1);
        assert_eq!(module_array(&plain).unwrap().len(), 2);
    }

    #[test]
    fn test_module_array_missing() {
        assert!(module_array(&json!({"something": "else"})).is_err());
    }

    #[test]
    fn test_batch_fails_on_malformed_record() {
        let raw = vec![json!({"name": "good"}), json!({"revision": "2020-01-01"})];
        assert!(ModuleRecord::from_batch(&raw).is_err());

        let raw = vec![json!({"name": "good"})];
        let records = ModuleRecord::from_batch(&raw).unwrap();
        assert_eq!(records.len(), 1);
    }
}
