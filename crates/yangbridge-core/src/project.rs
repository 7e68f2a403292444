//! Sparse property projection
//!
//! Maps the optional descriptive fields of a [`ModuleRecord`] onto the
//! camelCase property names used on the broker wire. A property appears in
//! the output iff the source field is populated; absent and empty fields
//! are omitted entirely rather than emitted as nulls. The name mapping is
//! a fixed 1:1 table and must stay byte-exact for wire compatibility.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::catalog::ModuleRecord;
use crate::entity::Property;

/// Project the populated descriptive fields of a record into a sparse
/// property mapping keyed by wire name.
pub fn project(record: &ModuleRecord) -> BTreeMap<&'static str, Property> {
    let mut properties = BTreeMap::new();

    let mut put = |name: &'static str, value: Option<&String>| {
        if let Some(value) = value {
            if !value.is_empty() {
                properties.insert(name, Property::new(value.as_str()));
            }
        }
    };

    put(
        "ietfWg",
        record.ietf.as_ref().and_then(|i| i.ietf_wg.as_ref()),
    );
    put("schema", record.schema.as_ref());
    put("generatedFrom", record.generated_from.as_ref());
    put("maturityLevel", record.maturity_level.as_ref());
    put("documentName", record.document_name.as_ref());
    put("authorEmail", record.author_email.as_ref());
    put("reference", record.reference.as_ref());
    put("moduleClassification", record.module_classification.as_ref());
    put("compilationStatus", record.compilation_status.as_ref());
    put("compilationResult", record.compilation_result.as_ref());
    put("prefix", record.prefix.as_ref());
    put("yangVersion", record.yang_version.as_ref());
    put("description", record.description.as_ref());
    put("contact", record.contact.as_ref());
    put("belongsTo", record.belongs_to.as_ref());
    put("treeType", record.tree_type.as_ref());
    put("yangTree", record.yang_tree.as_ref());
    put("expires", record.expires.as_ref());
    put("semanticVersion", record.semantic_version.as_ref());
    put(
        "derivedSemanticVersion",
        record.derived_semantic_version.as_ref(),
    );

    // `expired` can be a boolean or a string on the wire; only populated
    // values are projected (false and "" count as unpopulated).
    if let Some(expired) = &record.expired {
        if is_populated(expired) {
            properties.insert("expired", Property::new(expired.clone()));
        }
    }

    properties
}

fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}
