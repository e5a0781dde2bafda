// crates/parity-core/src/runtime/plan.rs
// ============================================================================
// Module: Parity Plan Builder
// Description: Dependency-ordered execution plans over a query catalog.
// Purpose: Produce deterministic, topologically sorted query sequences.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The plan builder validates a query catalog (unique ids, valid definitions,
//! known dependencies, no cycles) and orders a selection of it so every query
//! follows its dependencies. Ties are broken by priority, then by declaration
//! order, so the same catalog always yields the same plan.
//!
//! Selecting a subset pulls in transitive dependencies; a query can only run
//! once everything it depends on has succeeded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::DefinitionError;
use crate::core::Priority;
use crate::core::QueryDefinition;
use crate::core::QueryId;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Plan construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Catalog contains no queries.
    #[error("query catalog is empty")]
    EmptyCatalog,
    /// Two definitions share an identifier.
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
    /// A definition failed validation.
    #[error(transparent)]
    InvalidDefinition(#[from] DefinitionError),
    /// A dependency names a query outside the catalog.
    #[error("query {query} depends on unknown query {dependency}")]
    UnknownDependency {
        /// Dependent query.
        query: String,
        /// Missing dependency.
        dependency: String,
    },
    /// A requested query is not in the catalog.
    #[error("unknown query id: {0}")]
    UnknownQuery(String),
    /// Dependencies form a cycle.
    #[error("dependency cycle among queries: {}", .0.join(", "))]
    Cycle(Vec<String>),
    /// Persisted run state no longer matches the catalog.
    #[error("plan corrupt: {0}")]
    Corrupt(String),
}

// ============================================================================
// SECTION: Plan
// ============================================================================

/// Dependency-ordered plan for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Query ids in execution order.
    pub order: Vec<QueryId>,
    /// Queries added because a selected query depends on them.
    pub added_dependencies: Vec<QueryId>,
}

impl ExecutionPlan {
    /// Builds a plan over the full catalog or a subset of it.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the catalog is invalid or a requested id is
    /// unknown.
    pub fn build(
        catalog: &[QueryDefinition],
        subset: Option<&[QueryId]>,
    ) -> Result<Self, PlanError> {
        let index = validate_catalog(catalog)?;
        let Some(subset) = subset else {
            let all: BTreeSet<QueryId> = catalog.iter().map(|query| query.id.clone()).collect();
            return Ok(Self {
                order: order_selection(catalog, &index, &all),
                added_dependencies: Vec::new(),
            });
        };

        let mut selected = BTreeSet::new();
        let mut pending: Vec<QueryId> = Vec::new();
        for id in subset {
            if !index.contains_key(id) {
                return Err(PlanError::UnknownQuery(id.to_string()));
            }
            if selected.insert(id.clone()) {
                pending.push(id.clone());
            }
        }
        let requested = selected.clone();
        while let Some(id) = pending.pop() {
            let Some(position) = index.get(&id) else {
                continue;
            };
            for dependency in &catalog[*position].dependencies {
                if selected.insert(dependency.clone()) {
                    pending.push(dependency.clone());
                }
            }
        }
        let order = order_selection(catalog, &index, &selected);
        let added_dependencies =
            order.iter().filter(|id| !requested.contains(*id)).cloned().collect();
        Ok(Self {
            order,
            added_dependencies,
        })
    }

    /// Orders an explicit selection without pulling in dependencies.
    ///
    /// Dependencies outside the selection are expected to be satisfied by
    /// earlier passes of the same run.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] when the catalog is invalid or a selected id is
    /// unknown.
    pub fn reseed(catalog: &[QueryDefinition], selection: &[QueryId]) -> Result<Self, PlanError> {
        let index = validate_catalog(catalog)?;
        let mut selected = BTreeSet::new();
        for id in selection {
            if !index.contains_key(id) {
                return Err(PlanError::Corrupt(format!("query {id} is no longer in the catalog")));
            }
            selected.insert(id.clone());
        }
        Ok(Self {
            order: order_selection(catalog, &index, &selected),
            added_dependencies: Vec::new(),
        })
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Validates a catalog and returns an id-to-position index.
///
/// # Errors
///
/// Returns [`PlanError`] for empty catalogs, duplicates, invalid definitions,
/// unknown dependencies, or cycles.
pub fn validate_catalog(
    catalog: &[QueryDefinition],
) -> Result<BTreeMap<QueryId, usize>, PlanError> {
    if catalog.is_empty() {
        return Err(PlanError::EmptyCatalog);
    }
    let mut index = BTreeMap::new();
    for (position, query) in catalog.iter().enumerate() {
        query.validate()?;
        if index.insert(query.id.clone(), position).is_some() {
            return Err(PlanError::DuplicateQuery(query.id.to_string()));
        }
    }
    for query in catalog {
        for dependency in &query.dependencies {
            if !index.contains_key(dependency) {
                return Err(PlanError::UnknownDependency {
                    query: query.id.to_string(),
                    dependency: dependency.to_string(),
                });
            }
        }
    }
    let all: BTreeSet<QueryId> = index.keys().cloned().collect();
    let order = order_selection(catalog, &index, &all);
    if order.len() < catalog.len() {
        let ordered: BTreeSet<&QueryId> = order.iter().collect();
        let cyclic =
            index.keys().filter(|id| !ordered.contains(id)).map(ToString::to_string).collect();
        return Err(PlanError::Cycle(cyclic));
    }
    Ok(index)
}

// ============================================================================
// SECTION: Ordering
// ============================================================================

/// Kahn's algorithm over the selected queries.
///
/// Edges to queries outside the selection are ignored. Ready queries are
/// taken by `(priority, declaration position)`. Queries on a cycle are left
/// out of the result.
fn order_selection(
    catalog: &[QueryDefinition],
    index: &BTreeMap<QueryId, usize>,
    selected: &BTreeSet<QueryId>,
) -> Vec<QueryId> {
    let mut in_degree: BTreeMap<usize, usize> = BTreeMap::new();
    let mut dependents: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for id in selected {
        let Some(position) = index.get(id).copied() else {
            continue;
        };
        let degree = in_degree.entry(position).or_insert(0);
        for dependency in &catalog[position].dependencies {
            if !selected.contains(dependency) {
                continue;
            }
            if let Some(dependency_position) = index.get(dependency).copied() {
                *degree += 1;
                dependents.entry(dependency_position).or_default().push(position);
            }
        }
    }

    let mut ready: BTreeSet<(Priority, usize)> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(position, _)| (catalog[*position].priority, *position))
        .collect();
    let mut order = Vec::with_capacity(in_degree.len());
    while let Some(next) = ready.pop_first() {
        let (_, position) = next;
        order.push(catalog[position].id.clone());
        for dependent in dependents.get(&position).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert((catalog[*dependent].priority, *dependent));
                }
            }
        }
    }
    order
}
