//! Yangbridge Core - catalog model, identity resolution and entity building
//!
//! This crate provides the foundational pieces for the yangbridge system:
//! - Wire model for YANG catalog snapshots and module records
//! - Read-only module index over one catalog snapshot
//! - Canonical identity resolution (including ghost references)
//! - Sparse property projection onto broker wire names
//! - Dependency/dependent relationship graph construction
//! - NGSI-LD entity model with schema-validated builders

pub mod catalog;
pub mod entity;
pub mod graph;
pub mod index;
pub mod project;
pub mod resolve;

pub use catalog::{
    CatalogDocument, CatalogError, DependencyReference, ModuleRecord, ModuleType,
};
pub use entity::{Entity, EntityBuilder, EntityError, EntityKind, Property, Relationship};
pub use graph::{build_graph, ModuleGraph, RelationshipPolicy, ReverseEdge};
pub use index::ModuleIndex;
pub use project::project;
pub use resolve::{canonical_id, resolve, ResolvedIdentity};
