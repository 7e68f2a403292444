//! Batch synchronization pipeline
//!
//! Drives one full catalog snapshot into the broker: index the raw module
//! array once, then walk it in fixed-size batches. Each batch is
//! deserialized, every record projected and resolved, its relationship
//! graph built, and the assembled entities submitted in a single upsert
//! call. A failing batch is logged with its index and skipped; no batch
//! failure aborts the run.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, error, info};

use yangbridge_client::{ContextBrokerClient, UpsertMode};
use yangbridge_core::catalog::{module_array, ModuleRecord};
use yangbridge_core::graph::build_graph;
use yangbridge_core::resolve::resolve;
use yangbridge_core::{
    CatalogError, Entity, EntityError, EntityKind, ModuleIndex, Property, Relationship,
    RelationshipPolicy, ReverseEdge,
};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Entity(#[from] EntityError),
}

/// Where assembled entities go. The broker client implements this; tests
/// substitute a recording sink.
pub trait EntitySink {
    fn upsert_batch(
        &self,
        entities: &[Entity],
        mode: UpsertMode,
    ) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}

impl EntitySink for ContextBrokerClient {
    async fn upsert_batch(&self, entities: &[Entity], mode: UpsertMode) -> anyhow::Result<()> {
        ContextBrokerClient::upsert_batch(self, entities, mode).await?;
        Ok(())
    }
}

/// Fixed-size batch view over a slice. Yields `(batch_index, chunk)` and
/// signals exhaustion by ending, so a run can be restarted by building a
/// fresh iterator.
pub fn batches<T>(items: &[T], size: usize) -> impl Iterator<Item = (usize, &[T])> {
    items.chunks(size.max(1)).enumerate()
}

/// Outcome of one pipeline run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub total_modules: usize,
    pub batches_submitted: usize,
    pub batches_failed: usize,
    pub entities_submitted: usize,
}

/// Batch pipeline orchestrator
pub struct SyncPipeline<S> {
    sink: S,
    batch_size: usize,
    policy: RelationshipPolicy,
    mode: UpsertMode,
}

impl<S: EntitySink> SyncPipeline<S> {
    pub fn new(sink: S, batch_size: usize, policy: RelationshipPolicy) -> Self {
        Self {
            sink,
            batch_size,
            policy,
            mode: UpsertMode::Update,
        }
    }

    /// Run the full catalog document through the pipeline.
    pub async fn run(&self, catalog: &Value) -> Result<SyncReport, PipelineError> {
        let modules = module_array(catalog)?;
        let index = ModuleIndex::build(modules);
        info!(modules = index.len(), "Catalog snapshot indexed");

        let mut report = SyncReport {
            total_modules: modules.len(),
            ..Default::default()
        };

        for (batch_index, chunk) in batches(modules, self.batch_size) {
            let entities = match self.process_batch(&index, chunk) {
                Ok(entities) => entities,
                Err(e) => {
                    error!(batch = batch_index, error = %e, "Skipping malformed batch");
                    report.batches_failed += 1;
                    continue;
                }
            };
            match self.sink.upsert_batch(&entities, self.mode).await {
                Ok(()) => {
                    debug!(batch = batch_index, entities = entities.len(), "Batch submitted");
                    report.batches_submitted += 1;
                    report.entities_submitted += entities.len();
                }
                Err(e) => {
                    error!(batch = batch_index, error = %e, "Batch submission failed, skipping");
                    report.batches_failed += 1;
                }
            }
        }

        info!(
            batches = report.batches_submitted,
            failed = report.batches_failed,
            entities = report.entities_submitted,
            "Catalog synchronization completed"
        );
        Ok(report)
    }

    fn process_batch(
        &self,
        index: &ModuleIndex,
        raw: &[Value],
    ) -> Result<Vec<Entity>, PipelineError> {
        let records = ModuleRecord::from_batch(raw)?;
        let mut entities = Vec::with_capacity(records.len());
        let mut reverse_edges = Vec::new();
        for record in &records {
            let (entity, reverse) = self.build_module_entity(index, record)?;
            entities.push(entity);
            reverse_edges.extend(reverse);
        }
        entities.extend(reverse_entities(reverse_edges)?);
        Ok(entities)
    }

    /// Assemble the entity for one module record: projected properties,
    /// self identity, relationship graph.
    fn build_module_entity(
        &self,
        index: &ModuleIndex,
        record: &ModuleRecord,
    ) -> Result<(Entity, Vec<ReverseEdge>), PipelineError> {
        let identity = resolve(
            index,
            &record.name,
            record.revision.as_deref(),
            record.schema.as_deref(),
        );
        let graph = build_graph(index, record, &identity, self.policy);

        let mut builder = Entity::builder(identity.kind, identity.id.clone())
            .property("name", Property::new(identity.name.as_str()))?
            .property("revision", Property::new(identity.revision.as_str()))?
            .property("organization", Property::new(identity.organization.as_str()))?
            .maybe_property(
                "namespace",
                record.namespace.as_deref().map(Property::new),
            )?;
        for (name, property) in yangbridge_core::project(record) {
            builder = builder.property(name, property)?;
        }
        for (name, instances) in graph.forward {
            builder = builder.relationships(name, instances)?;
        }
        Ok((builder.build()?, graph.reverse))
    }
}

/// Reconstruct skeleton entities for the targets of complementary edges,
/// merging edges that share a target so each target appears once per batch.
fn reverse_entities(edges: Vec<ReverseEdge>) -> Result<Vec<Entity>, EntityError> {
    let mut grouped: BTreeMap<String, (EntityKind, Vec<(&'static str, Relationship)>)> =
        BTreeMap::new();
    let mut identities = BTreeMap::new();
    for edge in edges {
        identities
            .entry(edge.target.id.clone())
            .or_insert_with(|| edge.target.clone());
        grouped
            .entry(edge.target.id.clone())
            .or_insert_with(|| (edge.target.kind, Vec::new()))
            .1
            .push((edge.name, edge.edge));
    }

    let mut entities = Vec::with_capacity(grouped.len());
    for (id, (kind, edges)) in grouped {
        let identity = &identities[&id];
        let mut builder = Entity::builder(kind, id)
            .property("name", Property::new(identity.name.as_str()))?
            .property("revision", Property::new(identity.revision.as_str()))?
            .property("organization", Property::new(identity.organization.as_str()))?;
        for (name, edge) in edges {
            builder = builder.relationship(name, edge)?;
        }
        entities.push(builder.build()?);
    }
    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every submitted batch
    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<Vec<Entity>>>,
    }

    impl EntitySink for &RecordingSink {
        async fn upsert_batch(&self, entities: &[Entity], _mode: UpsertMode) -> anyhow::Result<()> {
            self.batches.lock().unwrap().push(entities.to_vec());
            Ok(())
        }
    }

    /// Fails submission of one specific batch ordinal
    struct FlakySink {
        fail_on_call: usize,
        calls: std::sync::atomic::AtomicUsize,
        inner: RecordingSink,
    }

    impl EntitySink for &FlakySink {
        async fn upsert_batch(&self, entities: &[Entity], mode: UpsertMode) -> anyhow::Result<()> {
            let call = self
                .calls
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == self.fail_on_call {
                anyhow::bail!("broker unavailable");
            }
            (&self.inner).upsert_batch(entities, mode).await
        }
    }

    fn catalog_of(count: usize) -> Value {
        let modules: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "name": format!("module-{i:03}"),
                    "revision": "2020-01-01",
                    "organization": "ietf",
                    "module-type": "module"
                })
            })
            .collect();
        json!({"yang-catalog:catalog": {"modules": {"module": modules}}})
    }

    #[tokio::test]
    async fn test_batch_completeness() {
        let sink = RecordingSink::default();
        let pipeline = SyncPipeline::new(&sink, 20, RelationshipPolicy::Forward);
        let report = pipeline.run(&catalog_of(45)).await.unwrap();

        assert_eq!(report.total_modules, 45);
        assert_eq!(report.batches_submitted, 3);
        assert_eq!(report.batches_failed, 0);
        assert_eq!(report.entities_submitted, 45);

        let submitted = sink.batches.lock().unwrap();
        let sizes: Vec<usize> = submitted.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![20, 20, 5]);

        let ids: std::collections::BTreeSet<String> = submitted
            .iter()
            .flatten()
            .map(|e| e.id().to_string())
            .collect();
        assert_eq!(ids.len(), 45);
        for entity in submitted.iter().flatten() {
            assert!(entity.id().starts_with("urn:ngsi-ld:Module:module-"));
            assert!(entity.id().ends_with(":2020-01-01:ietf"));
            assert!(!entity.has_relationships());
        }
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let mut catalog = catalog_of(45);
        // Poison one record in the second batch: no name field.
        catalog["yang-catalog:catalog"]["modules"]["module"][25] =
            json!({"revision": "2020-01-01"});

        let sink = RecordingSink::default();
        let pipeline = SyncPipeline::new(&sink, 20, RelationshipPolicy::Forward);
        let report = pipeline.run(&catalog).await.unwrap();

        assert_eq!(report.batches_submitted, 2);
        assert_eq!(report.batches_failed, 1);
        let sizes: Vec<usize> = sink.batches.lock().unwrap().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![20, 5]);
    }

    #[tokio::test]
    async fn test_submission_failure_does_not_abort_run() {
        let sink = FlakySink {
            fail_on_call: 0,
            calls: std::sync::atomic::AtomicUsize::new(0),
            inner: RecordingSink::default(),
        };
        let pipeline = SyncPipeline::new(&sink, 20, RelationshipPolicy::Forward);
        let report = pipeline.run(&catalog_of(45)).await.unwrap();

        assert_eq!(report.batches_submitted, 2);
        assert_eq!(report.batches_failed, 1);
    }

    #[tokio::test]
    async fn test_dependency_edges_on_entities() {
        let mut catalog = catalog_of(2);
        catalog["yang-catalog:catalog"]["modules"]["module"][0]["dependencies"] =
            json!([{"name": "module-001", "revision": "2020-01-01"}]);

        let sink = RecordingSink::default();
        let pipeline = SyncPipeline::new(&sink, 20, RelationshipPolicy::Forward);
        pipeline.run(&catalog).await.unwrap();

        let submitted = sink.batches.lock().unwrap();
        let entity = &submitted[0][0];
        let deps = entity.relationship("hasDependency").unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(
            deps[0].object(),
            "urn:ngsi-ld:Module:module-001:2020-01-01:ietf"
        );
        assert_eq!(deps[0].dataset_id(), deps.first().map(|d| d.object()));
    }

    #[tokio::test]
    async fn test_bidirectional_policy_emits_reverse_entities() {
        let sink = RecordingSink::default();
        let pipeline = SyncPipeline::new(&sink, 20, RelationshipPolicy::Bidirectional);
        let report = pipeline.run(&catalog_of_with_dep()).await.unwrap();
        assert_eq!(report.entities_submitted, 3);

        let submitted = sink.batches.lock().unwrap();
        let skeleton = submitted[0]
            .iter()
            .find(|e| {
                e.id() == "urn:ngsi-ld:Module:module-001:2020-01-01:ietf"
                    && e.relationship("isDependencyOf").is_some()
            })
            .expect("reverse skeleton entity");
        let back_edges = skeleton.relationship("isDependencyOf").unwrap();
        assert_eq!(
            back_edges[0].object(),
            "urn:ngsi-ld:Module:module-000:2020-01-01:ietf"
        );
    }

    fn catalog_of_with_dep() -> Value {
        let mut catalog = catalog_of(2);
        catalog["yang-catalog:catalog"]["modules"]["module"][0]["dependencies"] =
            json!([{"name": "module-001", "revision": "2020-01-01"}]);
        catalog
    }

    #[tokio::test]
    async fn test_ghost_dependency_survives_pipeline() {
        let mut catalog = catalog_of(1);
        catalog["yang-catalog:catalog"]["modules"]["module"][0]["dependencies"] =
            json!([{"name": "not-in-snapshot"}]);

        let sink = RecordingSink::default();
        let pipeline = SyncPipeline::new(&sink, 20, RelationshipPolicy::Forward);
        let report = pipeline.run(&catalog).await.unwrap();
        assert_eq!(report.batches_failed, 0);

        let submitted = sink.batches.lock().unwrap();
        let deps = submitted[0][0].relationship("hasDependency").unwrap();
        assert_eq!(
            deps[0].object(),
            "urn:ngsi-ld:Module:not-in-snapshot:unknown:unknown"
        );
    }
}
