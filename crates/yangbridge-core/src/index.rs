//! Read-only lookup index over one catalog snapshot
//!
//! Built once per catalog load from the raw JSON module array, then shared
//! by every resolution call in the run. Only the columns the resolver needs
//! are kept. Records without a name cannot be indexed and are skipped.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::catalog::ModuleType;

/// One slim row of the index
#[derive(Debug, Clone)]
pub struct IndexedModule {
    pub name: String,
    pub revision: Option<String>,
    pub schema: Option<String>,
    pub organization: Option<String>,
    pub module_type: ModuleType,
}

impl IndexedModule {
    /// Revision parsed as a calendar date, if it is one
    fn revision_date(&self) -> Option<NaiveDate> {
        self.revision
            .as_deref()
            .and_then(|r| NaiveDate::parse_from_str(r, "%Y-%m-%d").ok())
    }
}

/// Queryable table over all module records in a catalog snapshot.
///
/// (name, revision) pairs are expected unique within one snapshot, but
/// duplicates are tolerated: lookups return the first match in catalog
/// order.
#[derive(Debug, Default)]
pub struct ModuleIndex {
    rows: Vec<IndexedModule>,
    by_name: HashMap<String, Vec<usize>>,
}

impl ModuleIndex {
    /// Build the index from the raw module array.
    pub fn build(modules: &[Value]) -> Self {
        let mut index = Self::default();
        for (position, module) in modules.iter().enumerate() {
            let Some(name) = module.get("name").and_then(Value::as_str) else {
                warn!(position, "Skipping unindexable catalog record without a name");
                continue;
            };
            let module_type = match module.get("module-type").and_then(Value::as_str) {
                Some("submodule") => ModuleType::Submodule,
                _ => ModuleType::Module,
            };
            let row = IndexedModule {
                name: name.to_string(),
                revision: string_field(module, "revision"),
                schema: string_field(module, "schema"),
                organization: string_field(module, "organization"),
                module_type,
            };
            index
                .by_name
                .entry(row.name.clone())
                .or_default()
                .push(index.rows.len());
            index.rows.push(row);
        }
        index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact lookup by (name, revision). Revision matching is exact string
    /// equality; a record without a revision never matches.
    pub fn by_name_revision(&self, name: &str, revision: &str) -> Option<&IndexedModule> {
        self.rows_for(name)
            .find(|row| row.revision.as_deref() == Some(revision))
    }

    /// Exact lookup by (name, schema URL)
    pub fn by_name_schema(&self, name: &str, schema: &str) -> Option<&IndexedModule> {
        self.rows_for(name)
            .find(|row| row.schema.as_deref() == Some(schema))
    }

    /// Most recent revision of a module, ordering revisions as calendar
    /// dates descending. Rows with an unparsable or missing revision sort
    /// last; ties keep the first row in catalog order.
    pub fn latest_by_name(&self, name: &str) -> Option<&IndexedModule> {
        let mut best: Option<(&IndexedModule, Option<NaiveDate>)> = None;
        for row in self.rows_for(name) {
            let date = row.revision_date();
            match &best {
                None => best = Some((row, date)),
                Some((_, best_date)) if date > *best_date => best = Some((row, date)),
                Some(_) => {}
            }
        }
        best.map(|(row, _)| row)
    }

    fn rows_for(&self, name: &str) -> impl Iterator<Item = &IndexedModule> {
        self.by_name
            .get(name)
            .map(|indices| indices.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(|&i| &self.rows[i])
    }
}

fn string_field(module: &Value, field: &str) -> Option<String> {
    module
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
