//! Schema registry: table collection, cycle detection and creation order.

use super::classify::classify;
use super::table::TableDescriptor;
use super::EntityDecl;
use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::error;

/// The tables derived from every registered entity.
///
/// A registry is immutable. [`SchemaRegistry::merge`] builds a new one that
/// also covers additional entities, so a failed merge leaves the current
/// registry untouched.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    declarations: BTreeMap<String, EntityDecl>,
    entities: BTreeMap<String, Arc<TableDescriptor>>,
    order: Vec<Arc<TableDescriptor>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a registry covering the current entities plus `decls`.
    ///
    /// A declaration whose name is already registered replaces the previous
    /// one.
    ///
    /// # Errors
    ///
    /// Fails with a schema definition error if any declaration is malformed,
    /// or with [`CoreError::CyclicReference`] if the foreign keys between
    /// distinct entities form a cycle.
    pub fn merge(&self, decls: &[EntityDecl]) -> CoreResult<Self> {
        let mut declarations = self.declarations.clone();
        for decl in decls {
            declarations.insert(decl.name().to_string(), decl.clone());
        }
        let known: BTreeSet<String> = declarations.keys().cloned().collect();

        let mut entities = BTreeMap::new();
        let mut junctions = Vec::new();
        for (name, decl) in &declarations {
            let table = TableDescriptor::for_entity(name, classify(decl, &known)?);
            junctions.extend(
                table
                    .fields()
                    .iter()
                    .filter_map(|f| TableDescriptor::for_junction(name, f))
                    .map(Arc::new),
            );
            entities.insert(name.clone(), Arc::new(table));
        }

        let graph: BTreeMap<&str, Vec<&str>> = entities
            .iter()
            .map(|(name, table)| (name.as_str(), table.references()))
            .collect();

        if let Some(entity) = find_cycle(&graph) {
            let table = super::table_name(entity);
            error!(table = %table, "circular reference between entity tables");
            return Err(CoreError::CyclicReference { table });
        }

        let mut order: Vec<Arc<TableDescriptor>> = Vec::with_capacity(entities.len() + junctions.len());
        for entity in creation_order(graph)? {
            if let Some(table) = entities.get(entity) {
                order.push(Arc::clone(table));
            }
        }
        order.extend(junctions);

        Ok(Self {
            declarations,
            entities,
            order,
        })
    }

    /// Returns true if no entity is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The declaration registered under `entity`.
    #[must_use]
    pub fn declaration(&self, entity: &str) -> Option<&EntityDecl> {
        self.declarations.get(entity)
    }

    /// Names of the registered entities, sorted.
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    /// The table of an entity.
    #[must_use]
    pub fn entity_table(&self, entity: &str) -> Option<&Arc<TableDescriptor>> {
        self.entities.get(entity)
    }

    /// Any table, entity or junction, by table name.
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&Arc<TableDescriptor>> {
        self.order.iter().find(|t| t.name() == name)
    }

    /// Every table in creation order: entity tables so that referenced
    /// tables come first, then all junction tables.
    #[must_use]
    pub fn creation_order(&self) -> &[Arc<TableDescriptor>] {
        &self.order
    }

    /// The junction table behind `owner.attribute`.
    #[must_use]
    pub fn junction(&self, owner: &str, attribute: &str) -> Option<&Arc<TableDescriptor>> {
        self.junction_tables().find(|t| {
            t.relation()
                .is_some_and(|j| j.owner() == owner && j.attribute() == attribute)
        })
    }

    /// Junction tables whose related entity is `entity`.
    pub fn junctions_targeting<'a>(
        &'a self,
        entity: &'a str,
    ) -> impl Iterator<Item = &'a Arc<TableDescriptor>> + 'a {
        self.junction_tables()
            .filter(move |t| t.relation().is_some_and(|j| j.target() == entity))
    }

    /// Junction tables owned by `entity`.
    pub fn junctions_owned_by<'a>(
        &'a self,
        entity: &'a str,
    ) -> impl Iterator<Item = &'a Arc<TableDescriptor>> + 'a {
        self.junction_tables()
            .filter(move |t| t.relation().is_some_and(|j| j.owner() == entity))
    }

    fn junction_tables(&self) -> impl Iterator<Item = &Arc<TableDescriptor>> {
        self.order.iter().filter(|t| t.relation().is_some())
    }
}

/// Depth-first search for a cycle. Returns an entity on the cycle.
fn find_cycle<'a>(graph: &BTreeMap<&'a str, Vec<&'a str>>) -> Option<&'a str> {
    fn visit<'a>(
        node: &'a str,
        graph: &BTreeMap<&'a str, Vec<&'a str>>,
        visited: &mut HashSet<&'a str>,
        current_path: &mut HashSet<&'a str>,
    ) -> Option<&'a str> {
        if visited.contains(node) {
            return None;
        }
        if !current_path.insert(node) {
            return Some(node);
        }
        for next in graph.get(node).into_iter().flatten() {
            if let Some(found) = visit(*next, graph, visited, current_path) {
                return Some(found);
            }
        }
        current_path.remove(node);
        visited.insert(node);
        None
    }

    let mut visited = HashSet::new();
    for node in graph.keys() {
        let mut current_path = HashSet::new();
        if let Some(found) = visit(*node, graph, &mut visited, &mut current_path) {
            return Some(found);
        }
    }
    None
}

/// Kahn-style peeling: repeatedly takes every entity with no outstanding
/// references. Entities peeled in the same round are ordered by name.
fn creation_order<'a>(mut graph: BTreeMap<&'a str, Vec<&'a str>>) -> CoreResult<Vec<&'a str>> {
    let mut order = Vec::with_capacity(graph.len());
    while !graph.is_empty() {
        let ready: Vec<&str> = graph
            .iter()
            .filter(|(_, refs)| refs.is_empty())
            .map(|(name, _)| *name)
            .collect();
        let Some(first) = graph.keys().next().copied() else {
            break;
        };
        if ready.is_empty() {
            let table = super::table_name(first);
            error!(table = %table, "no table without outstanding references");
            return Err(CoreError::CyclicReference { table });
        }
        for name in &ready {
            graph.remove(name);
        }
        for refs in graph.values_mut() {
            refs.retain(|r| !ready.contains(r));
        }
        order.extend(ready);
    }
    Ok(order)
}
