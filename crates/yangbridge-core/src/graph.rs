//! Dependency/dependent relationship graph construction
//!
//! Walks a module's declared dependency, dependent and submodule lists,
//! resolves every reference through the identity resolver, and emits
//! relationship instances tagged with their target id as the dataset
//! discriminator. Ghost references still produce edges so the graph stays
//! complete across snapshot boundaries.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{DependencyReference, ModuleRecord};
use crate::entity::Relationship;
use crate::index::ModuleIndex;
use crate::resolve::{resolve, ResolvedIdentity};

pub const HAS_DEPENDENCY: &str = "hasDependency";
pub const HAS_DEPENDENT: &str = "hasDependent";
pub const INCLUDES_SUBMODULE: &str = "includesSubmodule";
pub const IS_DEPENDENCY_OF: &str = "isDependencyOf";
pub const IS_DEPENDENT_OF: &str = "isDependentOf";
pub const IS_SUBMODULE_OF: &str = "isSubmoduleOf";

/// Whether graph edges are emitted one-sided or two-sided.
///
/// `Forward` emits edges only on the declaring module's entity and relies
/// on the broker to answer reverse queries. `Bidirectional` additionally
/// emits complementary edges from reconstructed target entities back
/// toward the declaring module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipPolicy {
    Forward,
    Bidirectional,
}

impl Default for RelationshipPolicy {
    fn default() -> Self {
        Self::Forward
    }
}

/// A complementary edge to attach to a reconstructed target entity
#[derive(Debug, Clone, PartialEq)]
pub struct ReverseEdge {
    /// Identity of the entity that carries the edge
    pub target: ResolvedIdentity,
    /// Relationship name on the target entity
    pub name: &'static str,
    /// The edge itself, pointing back at the declaring module
    pub edge: Relationship,
}

/// Relationship graph of one module
#[derive(Debug, Default)]
pub struct ModuleGraph {
    /// Relationship name to instances, on the declaring module's entity
    pub forward: BTreeMap<&'static str, Vec<Relationship>>,
    /// Complementary edges, empty under [`RelationshipPolicy::Forward`]
    pub reverse: Vec<ReverseEdge>,
}

/// Build the relationship graph for one module record.
pub fn build_graph(
    index: &ModuleIndex,
    record: &ModuleRecord,
    self_identity: &ResolvedIdentity,
    policy: RelationshipPolicy,
) -> ModuleGraph {
    let mut graph = ModuleGraph::default();
    collect(
        index,
        &record.dependencies,
        HAS_DEPENDENCY,
        IS_DEPENDENCY_OF,
        self_identity,
        policy,
        &mut graph,
    );
    collect(
        index,
        &record.dependents,
        HAS_DEPENDENT,
        IS_DEPENDENT_OF,
        self_identity,
        policy,
        &mut graph,
    );
    collect(
        index,
        &record.submodule,
        INCLUDES_SUBMODULE,
        IS_SUBMODULE_OF,
        self_identity,
        policy,
        &mut graph,
    );
    graph
}

fn collect(
    index: &ModuleIndex,
    references: &[DependencyReference],
    forward_name: &'static str,
    reverse_name: &'static str,
    self_identity: &ResolvedIdentity,
    policy: RelationshipPolicy,
    graph: &mut ModuleGraph,
) {
    if references.is_empty() {
        return;
    }
    let instances = graph.forward.entry(forward_name).or_default();
    for reference in references {
        let target = resolve(
            index,
            &reference.name,
            reference.revision.as_deref(),
            reference.schema.as_deref(),
        );
        instances.push(Relationship::tagged(target.id.clone()));
        if policy == RelationshipPolicy::Bidirectional {
            graph.reverse.push(ReverseEdge {
                target,
                name: reverse_name,
                edge: Relationship::tagged(self_identity.id.clone()),
            });
        }
    }
}
