//! Entity splitting
//!
//! Decomposes a composite entity into its direct subset members and the
//! contiguous runs of tokens left over, picks the head among them, and
//! synthesizes one triple per remaining part that is linked to the head
//! by a dependency edge.

use std::cmp::{Ordering, Reverse};
use std::sync::Arc;

use ctxkg_core::{CleaningConfig, DependencyGraph};

use crate::entity::Entity;
use crate::relation::{Orientation, RelationTable};
use crate::triple::Triple;

// ============================================================================
// Head Ranking
// ============================================================================

/// Ordering key used to pick the main partial entity
///
/// A shallower tree level (closer to a root, i.e. the syntactic head of
/// the span) ranks higher; equal levels are broken by token count.
/// Entities unreachable from any root rank below everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HeadRank {
    level: Option<Reverse<usize>>,
    size: usize,
}

impl HeadRank {
    pub fn new(tree_level: Option<usize>, size: usize) -> Self {
        Self {
            level: tree_level.map(Reverse),
            size,
        }
    }

    pub fn of(entity: &Entity) -> Self {
        Self::new(entity.tree_level(), entity.len())
    }
}

/// Index of the highest-ranked item, keeping the first one on ties
pub fn max_rank_position<I>(ranks: I) -> Option<usize>
where
    I: IntoIterator<Item = HeadRank>,
{
    let mut best: Option<(usize, HeadRank)> = None;
    for (position, rank) in ranks.into_iter().enumerate() {
        match best {
            Some((_, current)) if rank.cmp(&current) != Ordering::Greater => {}
            _ => best = Some((position, rank)),
        }
    }
    best.map(|(position, _)| position)
}

// ============================================================================
// Splitter
// ============================================================================

/// Splits one entity using its bound direct subset
pub struct EntitySplitter<'a> {
    entity: &'a Entity,
    rules: &'a CleaningConfig,
}

impl<'a> EntitySplitter<'a> {
    pub fn new(entity: &'a Entity, rules: &'a CleaningConfig) -> Self {
        Self { entity, rules }
    }

    /// Remainder runs of the entity being split
    pub fn remainder_runs(&self) -> Vec<Arc<Entity>> {
        self.entity.remainder_runs().to_vec()
    }

    /// Direct subset members followed by remainder runs, minus droppable parts
    pub fn partial_entities(&self) -> Vec<Arc<Entity>> {
        self.entity
            .subset()
            .iter()
            .cloned()
            .chain(self.entity.remainder_runs().iter().cloned())
            .filter(|e| !e.can_be_dropped(self.rules))
            .collect()
    }

    /// The partial entity acting as head of the split
    pub fn main_partial_entity(&self) -> Option<Arc<Entity>> {
        let partials = self.partial_entities();
        let position = max_rank_position(partials.iter().map(|e| HeadRank::of(e)))?;
        partials.into_iter().nth(position)
    }

    /// Triples relating every other partial entity to the head
    pub fn build_derivative_triples(&self, relations: &RelationTable) -> Vec<Triple> {
        if self.entity.subset().is_empty() {
            return Vec::new();
        }

        let partials = self.partial_entities();
        let Some(main_position) = max_rank_position(partials.iter().map(|e| HeadRank::of(e)))
        else {
            return Vec::new();
        };
        let main = &partials[main_position];
        let main_final_id = main.final_entity(self.rules).id();

        let mut triples = Vec::new();
        for (position, partial) in partials.iter().enumerate() {
            if position == main_position || partial.final_entity(self.rules).id() == main_final_id {
                continue;
            }

            let Some(label) = find_relation(partial, main, self.entity.graph()) else {
                tracing::trace!(
                    partial = %partial,
                    main = %main,
                    "no dependency edge between partial entities"
                );
                continue;
            };

            let connector = relations.classify(label);
            let triple = match connector.orientation {
                Orientation::Unchanged => {
                    Triple::derived(Arc::clone(partial), connector.phrase, Arc::clone(main))
                }
                Orientation::Swapped => {
                    Triple::derived(Arc::clone(main), connector.phrase, Arc::clone(partial))
                }
            };
            triples.push(triple);
        }

        triples
    }
}

/// Label of the first edge joining the two entities, in either direction
pub fn find_relation<'g>(a: &Entity, b: &Entity, graph: &'g DependencyGraph) -> Option<&'g str> {
    graph
        .edges()
        .find(|edge| {
            (a.contains_index(edge.source.index) && b.contains_index(edge.target.index))
                || (b.contains_index(edge.source.index) && a.contains_index(edge.target.index))
        })
        .map(|edge| edge.relation)
}

// ============================================================================
// Tests
// ============================================================================
