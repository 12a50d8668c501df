//! Entity catalog
//!
//! Collects the candidate entities of one sentence: the subject and
//! object span of every raw triple, plus the named-entity mentions that
//! fall inside one of those spans.

use std::collections::HashSet;
use std::sync::Arc;

use ctxkg_core::{CleaningConfig, DependencyGraph, NamedEntityMention, RawTriple};
use uuid::Uuid;

use crate::entity::Entity;

/// Build the deduplicated entities of a sentence, in sentence order
///
/// Triple spans come first (subject before object, in triple order), each
/// interpreted against the triple's own dependency subtree when it has one.
/// A mention with exactly the span of a triple entity is attached to that
/// entity; a mention inside a triple entity becomes an entity of its own,
/// borrowing the graph of the first containing triple entity; any other
/// mention is discarded.
pub fn build_entities(
    graph: &Arc<DependencyGraph>,
    triples: &[RawTriple],
    mentions: &[NamedEntityMention],
    group_id: Uuid,
    rules: &CleaningConfig,
) -> Vec<Entity> {
    let mut entities: Vec<Entity> = Vec::new();
    let mut spans: HashSet<Vec<usize>> = HashSet::new();

    for triple in triples {
        let triple_graph = triple.tree.as_ref().unwrap_or(graph);
        for tokens in [&triple.subject, &triple.object] {
            let entity = Entity::from_tokens(tokens.clone(), Arc::clone(triple_graph), group_id);
            if spans.insert(entity.span()) {
                entities.push(entity);
            }
        }
    }

    let base_count = entities.len();

    for mention in mentions {
        if rules.skips_mention_type(&mention.entity_type) {
            continue;
        }

        let span: Vec<usize> = mention.tokens.iter().map(|t| t.index).collect();

        if let Some(exact) = entities[..base_count].iter_mut().find(|e| e.span() == span) {
            *exact = exact.clone().with_named_entity(mention.clone());
            continue;
        }

        let donor = entities[..base_count]
            .iter()
            .find(|e| span.iter().all(|&i| e.contains_index(i)))
            .map(|e| Arc::clone(e.graph()));

        match donor {
            Some(donor_graph) if spans.insert(span.clone()) => {
                entities.push(Entity::from_mention(mention.clone(), donor_graph, group_id));
            }
            Some(_) => {
                tracing::trace!(mention = %mention.text, "mention span already cataloged");
            }
            None => {
                tracing::trace!(mention = %mention.text, "mention outside every extracted span");
            }
        }
    }

    entities
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{car_sentence, mention, raw_triple};

    #[test]
    fn test_triple_spans_become_entities() {
        let sentence = car_sentence();
        let triples = vec![raw_triple(&sentence, 0.9, &[0, 1, 2], "is", &[4])];
        let entities = build_entities(
            &sentence.graph,
            &triples,
            &[],
            Uuid::nil(),
            &CleaningConfig::default(),
        );

        let texts: Vec<_> = entities.iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["The red car", "fast"]);
    }

    #[test]
    fn test_duplicate_spans_collapse() {
        let sentence = car_sentence();
        let triples = vec![
            raw_triple(&sentence, 0.9, &[0, 1, 2], "is", &[4]),
            raw_triple(&sentence, 0.5, &[2], "is", &[4]),
        ];
        let entities = build_entities(
            &sentence.graph,
            &triples,
            &[],
            Uuid::nil(),
            &CleaningConfig::default(),
        );
        assert_eq!(entities.len(), 3);
    }

    #[test]
    fn test_exact_mention_attaches_to_entity() {
        let sentence = car_sentence();
        let triples = vec![raw_triple(&sentence, 0.9, &[2], "is", &[4])];
        let mentions = vec![mention(&sentence, &[2], "VEHICLE", "car")];
        let entities = build_entities(
            &sentence.graph,
            &triples,
            &mentions,
            Uuid::nil(),
            &CleaningConfig::default(),
        );

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].id(), "NE-VEHICLE-car");
    }

    #[test]
    fn test_contained_mention_borrows_graph() {
        let sentence = car_sentence();
        let mut subtree = DependencyGraph::new();
        subtree.add_root(sentence.tokens[2].clone());
        subtree.add_edge(sentence.tokens[2].clone(), sentence.tokens[1].clone(), "amod");
        let subtree = Arc::new(subtree);

        let mut triple = raw_triple(&sentence, 0.9, &[0, 1, 2], "is", &[4]);
        triple.tree = Some(Arc::clone(&subtree));
        let mentions = vec![mention(&sentence, &[1], "COLOR", "red")];

        let entities = build_entities(
            &sentence.graph,
            &[triple],
            &mentions,
            Uuid::nil(),
            &CleaningConfig::default(),
        );

        assert_eq!(entities.len(), 3);
        let red = &entities[2];
        assert_eq!(red.id(), "NE-COLOR-red");
        assert!(Arc::ptr_eq(red.graph(), &subtree));
    }

    #[test]
    fn test_skipped_and_uncontained_mentions_ignored() {
        let sentence = car_sentence();
        let triples = vec![raw_triple(&sentence, 0.9, &[2], "is", &[4])];
        let mentions = vec![
            mention(&sentence, &[1], "COLOR", "red"),
            mention(&sentence, &[4], "NUMBER", "fast"),
        ];
        let entities = build_entities(
            &sentence.graph,
            &triples,
            &mentions,
            Uuid::nil(),
            &CleaningConfig::default(),
        );

        assert_eq!(entities.len(), 2);
        assert!(entities.iter().all(|e| e.mention().is_none()));
    }
}
