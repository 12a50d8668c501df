//! Direct subset resolution
//!
//! For every entity, finds the entities whose token span is strictly
//! contained in it, then keeps only the immediate children of that
//! containment order: a candidate already contained in another candidate
//! is dropped.

use std::collections::HashSet;
use std::sync::Arc;

use crate::entity::Entity;

/// Direct subsets as a side table: `table[i]` lists the positions (in the
/// input slice) of the direct subset members of entity `i`, in input order.
pub type SubsetTable = Vec<Vec<usize>>;

/// Compute the direct subset of every entity
pub fn compute_direct_subsets(entities: &[Entity]) -> SubsetTable {
    let token_sets: Vec<HashSet<usize>> = entities
        .iter()
        .map(|e| e.tokens().iter().map(|t| t.index).collect())
        .collect();

    let candidates: SubsetTable = token_sets
        .iter()
        .map(|outer| {
            token_sets
                .iter()
                .enumerate()
                .filter(|(_, inner)| inner.len() < outer.len() && inner.is_subset(outer))
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    candidates
        .iter()
        .map(|subset| {
            let covered: HashSet<usize> = subset
                .iter()
                .flat_map(|&member| candidates[member].iter().copied())
                .filter(|nested| subset.contains(nested))
                .collect();
            subset
                .iter()
                .copied()
                .filter(|member| !covered.contains(member))
                .collect()
        })
        .collect()
}

/// Attach the resolved subsets, binding smaller entities first
///
/// Every direct subset member is strictly smaller than its owner, so by
/// the time an entity is bound all of its members already are.
pub fn bind_subsets(entities: Vec<Entity>, table: &SubsetTable) -> Vec<Arc<Entity>> {
    let mut order: Vec<usize> = (0..entities.len()).collect();
    order.sort_by_key(|&i| entities[i].len());

    let mut pending: Vec<Option<Entity>> = entities.into_iter().map(Some).collect();
    let mut bound: Vec<Option<Arc<Entity>>> = vec![None; pending.len()];

    for i in order {
        let Some(entity) = pending[i].take() else {
            continue;
        };
        let subset = table
            .get(i)
            .map(|members| members.iter().filter_map(|&j| bound[j].clone()).collect())
            .unwrap_or_default();
        bound[i] = Some(Arc::new(entity.with_subset(subset)));
    }

    bound.into_iter().flatten().collect()
}

// ============================================================================
// Tests
// ============================================================================
