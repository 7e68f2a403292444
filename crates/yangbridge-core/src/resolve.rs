//! Canonical identity resolution
//!
//! Given a module reference (name, optional revision, optional schema URL)
//! and the snapshot index, produce the canonical entity identifier the
//! reference converges on. References to modules outside the snapshot
//! ("ghosts") still resolve to a usable identifier so the dependency graph
//! stays complete; a later run against a grown snapshot corrects the edge
//! without special-casing.

use chrono::NaiveDate;

use crate::catalog::ModuleType;
use crate::entity::EntityKind;
use crate::index::{IndexedModule, ModuleIndex};

pub const UNKNOWN: &str = "unknown";

/// Outcome of resolving a module reference
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    /// Canonical entity id: `urn:ngsi-ld:{Kind}:{name}:{revision}:{organization}`
    pub id: String,
    pub name: String,
    pub revision: String,
    pub organization: String,
    pub kind: EntityKind,
    /// True when the reference was not found in the snapshot
    pub ghost: bool,
}

/// Format the canonical, byte-stable entity identifier.
pub fn canonical_id(kind: EntityKind, name: &str, revision: &str, organization: &str) -> String {
    format!(
        "urn:ngsi-ld:{}:{}:{}:{}",
        kind.as_str(),
        name,
        revision,
        organization
    )
}

/// Resolve a module reference against the snapshot index.
///
/// Precedence: (A) exact (name, revision) when a revision is supplied;
/// (B) exact (name, schema), falling back to a revision date recovered from
/// the schema URL filename; (C) latest revision known for the name.
pub fn resolve(
    index: &ModuleIndex,
    name: &str,
    revision: Option<&str>,
    schema: Option<&str>,
) -> ResolvedIdentity {
    // (A) revision takes preference when identifying the module
    if let Some(revision) = revision {
        return match index.by_name_revision(name, revision) {
            Some(row) => found(name, revision, row),
            None => ghost(name, revision),
        };
    }

    // (B) identify the module by its schema URL
    if let Some(schema) = schema {
        if let Some(row) = index.by_name_schema(name, schema) {
            let revision = row.revision.clone().unwrap_or_else(|| UNKNOWN.to_string());
            return found(name, &revision, row);
        }
        // Recover a revision date from the `<name>@YYYY-MM-DD.yang`
        // filename convention and retry the exact lookup.
        return match revision_from_schema_url(schema) {
            Some(parsed) => match index.by_name_revision(name, &parsed) {
                Some(row) => found(name, &parsed, row),
                None => ghost(name, &parsed),
            },
            None => ghost(name, UNKNOWN),
        };
    }

    // (C) neither revision nor schema: latest revision policy
    match index.latest_by_name(name) {
        Some(row) => {
            let revision = row.revision.clone().unwrap_or_else(|| UNKNOWN.to_string());
            found(name, &revision, row)
        }
        None => ghost(name, UNKNOWN),
    }
}

fn found(name: &str, revision: &str, row: &IndexedModule) -> ResolvedIdentity {
    let organization = row
        .organization
        .clone()
        .unwrap_or_else(|| UNKNOWN.to_string());
    let kind = EntityKind::from(row.module_type);
    ResolvedIdentity {
        id: canonical_id(kind, name, revision, &organization),
        name: name.to_string(),
        revision: revision.to_string(),
        organization,
        kind,
        ghost: false,
    }
}

// Ghosts are never assumed to be submodules.
fn ghost(name: &str, revision: &str) -> ResolvedIdentity {
    let kind = EntityKind::from(ModuleType::Module);
    ResolvedIdentity {
        id: canonical_id(kind, name, revision, UNKNOWN),
        name: name.to_string(),
        revision: revision.to_string(),
        organization: UNKNOWN.to_string(),
        kind,
        ghost: true,
    }
}

/// Parse a revision date out of a schema URL whose filename follows the
/// `<modulename>@<YYYY-MM-DD>.yang` convention.
fn revision_from_schema_url(schema: &str) -> Option<String> {
    let filename = schema.trim_end_matches('/').rsplit('/').next()?;
    let after_at = filename.rsplit('@').next()?;
    let candidate = after_at.split('.').next()?;
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d").ok()?;
    Some(candidate.to_string())
}
